//! PostgreSQL user repository implementation
//!
//! The list pipeline is pushed down into SQL: filters become `ILIKE`
//! conditions, the enumerated sort field selects a fixed column name, and
//! pagination becomes `LIMIT`/`OFFSET`. Only bound parameters carry request
//! text.

use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};

use crate::domain::user::{
    round_two_decimals, Page, SortField, SortOrder, UpsertOutcome, User, UserDraft, UserFilter,
    UserId, UserPatch, UserQuery, UserRepository, UserSummary,
};
use crate::domain::DomainError;

const COLUMNS: &str =
    "id, first_name, last_name, company_name, city, state, zip, email, web, age";

/// PostgreSQL implementation of UserRepository
#[derive(Debug, Clone)]
pub struct PostgresUserRepository {
    pool: PgPool,
}

impl PostgresUserRepository {
    /// Create a new repository with the given connection pool
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserRepository for PostgresUserRepository {
    async fn get(&self, id: UserId) -> Result<Option<User>, DomainError> {
        let row = sqlx::query(&format!("SELECT {} FROM users WHERE id = $1", COLUMNS))
            .bind(id.value())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| store_error("get user", e))?;

        row.as_ref().map(row_to_user).transpose()
    }

    async fn create(&self, draft: &UserDraft) -> Result<User, DomainError> {
        let row = sqlx::query(&format!(
            r#"
            INSERT INTO users (first_name, last_name, company_name, city, state, zip, email, web, age)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING {}
            "#,
            COLUMNS
        ))
        .bind(&draft.first_name)
        .bind(&draft.last_name)
        .bind(&draft.company_name)
        .bind(&draft.city)
        .bind(&draft.state)
        .bind(i64::from(draft.zip))
        .bind(&draft.email)
        .bind(&draft.web)
        .bind(i64::from(draft.age))
        .fetch_one(&self.pool)
        .await
        .map_err(|e| write_error("create user", &draft.email, e))?;

        row_to_user(&row)
    }

    async fn replace(&self, id: UserId, draft: &UserDraft) -> Result<Option<User>, DomainError> {
        let row = sqlx::query(&format!(
            r#"
            UPDATE users
            SET first_name = $2, last_name = $3, company_name = $4, city = $5, state = $6,
                zip = $7, email = $8, web = $9, age = $10
            WHERE id = $1
            RETURNING {}
            "#,
            COLUMNS
        ))
        .bind(id.value())
        .bind(&draft.first_name)
        .bind(&draft.last_name)
        .bind(&draft.company_name)
        .bind(&draft.city)
        .bind(&draft.state)
        .bind(i64::from(draft.zip))
        .bind(&draft.email)
        .bind(&draft.web)
        .bind(i64::from(draft.age))
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| write_error("update user", &draft.email, e))?;

        row.as_ref().map(row_to_user).transpose()
    }

    async fn patch(&self, id: UserId, patch: &UserPatch) -> Result<Option<User>, DomainError> {
        // Dropping the transaction on any early return rolls it back
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| store_error("begin transaction", e))?;

        let row = sqlx::query(&format!(
            "SELECT {} FROM users WHERE id = $1 FOR UPDATE",
            COLUMNS
        ))
        .bind(id.value())
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| store_error("lock user", e))?;

        let Some(row) = row else {
            return Ok(None);
        };

        let mut user = row_to_user(&row)?;
        patch.apply_to(&mut user);

        let row = sqlx::query(&format!(
            r#"
            UPDATE users
            SET first_name = $2, last_name = $3, company_name = $4, city = $5, state = $6,
                zip = $7, email = $8, web = $9, age = $10
            WHERE id = $1
            RETURNING {}
            "#,
            COLUMNS
        ))
        .bind(id.value())
        .bind(user.first_name())
        .bind(user.last_name())
        .bind(user.company_name())
        .bind(user.city())
        .bind(user.state())
        .bind(i64::from(user.zip()))
        .bind(user.email())
        .bind(user.web())
        .bind(i64::from(user.age()))
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| write_error("update user", user.email(), e))?;

        let updated = row_to_user(&row)?;

        tx.commit()
            .await
            .map_err(|e| store_error("commit transaction", e))?;

        Ok(Some(updated))
    }

    async fn delete(&self, id: UserId) -> Result<bool, DomainError> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id.value())
            .execute(&self.pool)
            .await
            .map_err(|e| store_error("delete user", e))?;

        Ok(result.rows_affected() > 0)
    }

    async fn query(&self, query: &UserQuery) -> Result<Page<User>, DomainError> {
        let (where_sql, patterns) = build_where(&query.filter);

        let count_sql = format!("SELECT COUNT(*) FROM users{}", where_sql);
        let mut count_query = sqlx::query_scalar::<_, i64>(&count_sql);
        for pattern in &patterns {
            count_query = count_query.bind(pattern);
        }

        let total: i64 = count_query
            .fetch_one(&self.pool)
            .await
            .map_err(|e| store_error("count users", e))?;

        let param_idx = patterns.len() + 1;
        let select_sql = format!(
            "SELECT {} FROM users{} ORDER BY {} LIMIT ${} OFFSET ${}",
            COLUMNS,
            where_sql,
            order_by(&query.sort),
            param_idx,
            param_idx + 1
        );

        let mut select_query = sqlx::query(&select_sql);
        for pattern in &patterns {
            select_query = select_query.bind(pattern);
        }

        let limit = i64::try_from(query.pagination.limit()).unwrap_or(i64::MAX);
        let offset = i64::try_from(query.pagination.offset()).unwrap_or(i64::MAX);

        let rows = select_query
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| store_error("list users", e))?;

        let mut users = Vec::with_capacity(rows.len());

        for row in rows {
            users.push(row_to_user(&row)?);
        }

        let total_count = u64::try_from(total).unwrap_or(0);

        Ok(Page::new(users, query.pagination, total_count))
    }

    async fn summarize(&self) -> Result<UserSummary, DomainError> {
        let cities: Vec<(String, i64)> =
            sqlx::query_as("SELECT city, COUNT(*) FROM users GROUP BY city")
                .fetch_all(&self.pool)
                .await
                .map_err(|e| store_error("count users by city", e))?;

        let states: Vec<(String, i64)> =
            sqlx::query_as("SELECT state, COUNT(*) FROM users GROUP BY state")
                .fetch_all(&self.pool)
                .await
                .map_err(|e| store_error("count users by state", e))?;

        let (avg_age, max_age, min_age): (Option<f64>, Option<i64>, Option<i64>) =
            sqlx::query_as("SELECT AVG(age)::float8, MAX(age), MIN(age) FROM users")
                .fetch_one(&self.pool)
                .await
                .map_err(|e| store_error("aggregate ages", e))?;

        Ok(UserSummary {
            count_by_city: cities
                .into_iter()
                .map(|(city, n)| (city, u64::try_from(n).unwrap_or(0)))
                .collect(),
            count_by_state: states
                .into_iter()
                .map(|(state, n)| (state, u64::try_from(n).unwrap_or(0)))
                .collect(),
            avg_age: avg_age.map(round_two_decimals),
            max_age: max_age.map(|v| column_u32("age", v)).transpose()?,
            min_age: min_age.map(|v| column_u32("age", v)).transpose()?,
        })
    }

    async fn count(&self) -> Result<u64, DomainError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| store_error("count users", e))?;

        Ok(u64::try_from(count).unwrap_or(0))
    }

    async fn upsert_by_email(&self, draft: &UserDraft) -> Result<UpsertOutcome, DomainError> {
        let row = sqlx::query(&format!(
            r#"
            INSERT INTO users (first_name, last_name, company_name, city, state, zip, email, web, age)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            ON CONFLICT (email) DO UPDATE
            SET first_name = EXCLUDED.first_name, last_name = EXCLUDED.last_name,
                company_name = EXCLUDED.company_name, city = EXCLUDED.city,
                state = EXCLUDED.state, zip = EXCLUDED.zip, web = EXCLUDED.web,
                age = EXCLUDED.age
            RETURNING {}, (xmax = 0) AS inserted
            "#,
            COLUMNS
        ))
        .bind(&draft.first_name)
        .bind(&draft.last_name)
        .bind(&draft.company_name)
        .bind(&draft.city)
        .bind(&draft.state)
        .bind(i64::from(draft.zip))
        .bind(&draft.email)
        .bind(&draft.web)
        .bind(i64::from(draft.age))
        .fetch_one(&self.pool)
        .await
        .map_err(|e| store_error("upsert user", e))?;

        let inserted: bool = row
            .try_get("inserted")
            .map_err(|e| store_error("read upsert outcome", e))?;
        let user = row_to_user(&row)?;

        Ok(if inserted {
            UpsertOutcome::Inserted(user)
        } else {
            UpsertOutcome::Updated(user)
        })
    }
}

/// Build the `WHERE` clause for a filter together with the `ILIKE`
/// patterns to bind, numbered from `$1`
fn build_where(filter: &UserFilter) -> (String, Vec<String>) {
    let mut conditions = Vec::new();
    let mut patterns = Vec::new();

    if let Some(search) = &filter.search {
        patterns.push(like_pattern(search));
        let idx = patterns.len();
        conditions.push(format!(
            "(first_name ILIKE ${} OR last_name ILIKE ${})",
            idx, idx
        ));
    }

    if let Some(city) = &filter.city {
        patterns.push(like_pattern(city));
        conditions.push(format!("city ILIKE ${}", patterns.len()));
    }

    if conditions.is_empty() {
        (String::new(), patterns)
    } else {
        (format!(" WHERE {}", conditions.join(" AND ")), patterns)
    }
}

/// Substring pattern with `LIKE` wildcards in the needle escaped
fn like_pattern(needle: &str) -> String {
    let mut escaped = String::with_capacity(needle.len() + 2);
    escaped.push('%');

    for c in needle.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }

    escaped.push('%');
    escaped
}

fn store_error(action: &str, e: sqlx::Error) -> DomainError {
    DomainError::store_unavailable(format!("Failed to {}: {}", action, e))
}

fn write_error(action: &str, email: &str, e: sqlx::Error) -> DomainError {
    let unique_violation = e
        .as_database_error()
        .is_some_and(|db| db.is_unique_violation());

    if unique_violation {
        DomainError::conflict(format!("Email '{}' already exists", email))
    } else {
        store_error(action, e)
    }
}

/// ORDER BY clause; text columns compare byte-wise like the in-memory store
fn order_by(sort: &SortOrder) -> String {
    if sort.field == SortField::Id {
        return format!("id {}", sort.direction.as_sql());
    }

    let collate = match sort.field {
        SortField::Zip | SortField::Age => "",
        _ => " COLLATE \"C\"",
    };

    format!(
        "{}{} {}, id ASC",
        sort.field.as_str(),
        collate,
        sort.direction.as_sql()
    )
}

fn column_u32(column: &str, value: i64) -> Result<u32, DomainError> {
    u32::try_from(value).map_err(|_| {
        DomainError::internal(format!(
            "Column '{}' holds out-of-range value {}",
            column, value
        ))
    })
}

fn row_to_user(row: &PgRow) -> Result<User, DomainError> {
    let read_err = |e: sqlx::Error| store_error("read user row", e);

    let id: i64 = row.try_get("id").map_err(read_err)?;
    let zip: i64 = row.try_get("zip").map_err(read_err)?;
    let age: i64 = row.try_get("age").map_err(read_err)?;

    let draft = UserDraft {
        first_name: row.try_get("first_name").map_err(read_err)?,
        last_name: row.try_get("last_name").map_err(read_err)?,
        company_name: row.try_get("company_name").map_err(read_err)?,
        city: row.try_get("city").map_err(read_err)?,
        state: row.try_get("state").map_err(read_err)?,
        zip: column_u32("zip", zip)?,
        email: row.try_get("email").map_err(read_err)?,
        web: row.try_get("web").map_err(read_err)?,
        age: column_u32("age", age)?,
    };

    Ok(User::from_draft(UserId::new(id), draft))
}
