//! Database migrations infrastructure

use sqlx::postgres::PgPool;
use tracing::info;

use crate::domain::DomainError;

/// PostgreSQL migrator recording applied versions in `_migrations`
#[derive(Debug)]
pub struct PostgresMigrator {
    pool: PgPool,
}

impl PostgresMigrator {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Creates the migrations table if it doesn't exist
    async fn ensure_migrations_table(&self) -> Result<(), DomainError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS _migrations (
                version BIGINT PRIMARY KEY,
                description TEXT NOT NULL,
                installed_on TIMESTAMPTZ NOT NULL DEFAULT NOW()
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| {
            DomainError::store_unavailable(format!("Failed to create migrations table: {}", e))
        })?;

        Ok(())
    }

    /// Runs every pending migration, in version order
    pub async fn run_all(&self, migrations: &[Migration]) -> Result<(), DomainError> {
        let mut ordered: Vec<&Migration> = migrations.iter().collect();
        ordered.sort_by_key(|m| m.version);

        for migration in ordered {
            self.run_migration(migration).await?;
        }

        Ok(())
    }

    /// Runs a single migration inside a transaction
    pub async fn run_migration(&self, migration: &Migration) -> Result<(), DomainError> {
        self.ensure_migrations_table().await?;

        let mut tx = self.pool.begin().await.map_err(|e| {
            DomainError::store_unavailable(format!("Failed to begin migration: {}", e))
        })?;

        // Check if already applied
        let applied: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM _migrations WHERE version = $1)",
        )
        .bind(migration.version)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| {
            DomainError::store_unavailable(format!("Failed to check migration status: {}", e))
        })?;

        if applied {
            return Ok(());
        }

        sqlx::raw_sql(migration.up)
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                DomainError::store_unavailable(format!(
                    "Failed to run migration {}: {}",
                    migration.version, e
                ))
            })?;

        sqlx::query("INSERT INTO _migrations (version, description) VALUES ($1, $2)")
            .bind(migration.version)
            .bind(migration.description)
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                DomainError::store_unavailable(format!(
                    "Failed to record migration {}: {}",
                    migration.version, e
                ))
            })?;

        tx.commit().await.map_err(|e| {
            DomainError::store_unavailable(format!(
                "Failed to commit migration {}: {}",
                migration.version, e
            ))
        })?;

        info!(
            version = migration.version,
            description = migration.description,
            "Applied migration"
        );

        Ok(())
    }

    /// Returns the latest applied migration version
    pub async fn current_version(&self) -> Result<Option<i64>, DomainError> {
        self.ensure_migrations_table().await?;

        let version: Option<i64> = sqlx::query_scalar("SELECT MAX(version) FROM _migrations")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                DomainError::store_unavailable(format!("Failed to get migration version: {}", e))
            })?;

        Ok(version)
    }
}

/// Represents a database migration
#[derive(Debug, Clone, Copy)]
pub struct Migration {
    pub version: i64,
    pub description: &'static str,
    /// SQL to run when applying the migration
    pub up: &'static str,
}

/// Schema for the user store
pub fn user_migrations() -> Vec<Migration> {
    vec![Migration {
        version: 1,
        description: "Create users table",
        up: r#"
            CREATE TABLE IF NOT EXISTS users (
                id BIGSERIAL PRIMARY KEY,
                first_name TEXT NOT NULL CHECK (first_name <> ''),
                last_name TEXT NOT NULL,
                company_name TEXT NOT NULL,
                city TEXT NOT NULL,
                state TEXT NOT NULL,
                zip BIGINT NOT NULL CHECK (zip >= 0),
                email TEXT NOT NULL UNIQUE CHECK (email <> ''),
                web TEXT NOT NULL,
                age BIGINT NOT NULL CHECK (age >= 0)
            );
            CREATE INDEX IF NOT EXISTS idx_users_city ON users (city);
            CREATE INDEX IF NOT EXISTS idx_users_state ON users (state);
        "#,
    }]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_migrations_are_versioned() {
        let migrations = user_migrations();

        assert!(!migrations.is_empty());
        let mut versions: Vec<i64> = migrations.iter().map(|m| m.version).collect();
        versions.dedup();
        assert_eq!(versions.len(), migrations.len());
    }

    #[test]
    fn test_users_table_enforces_unique_email() {
        let sql = user_migrations()[0].up;
        assert!(sql.contains("email TEXT NOT NULL UNIQUE"));
        assert!(sql.contains("CHECK (age >= 0)"));
    }
}
