//! User list query: filter, sort and paginate
//!
//! Raw request parameters are parsed into a [`UserQuery`] up front, so that a
//! bad page number or an unknown sort key is rejected before the store is
//! touched. Repositories either run [`UserQuery::run`] over records they hold
//! in memory, or translate the same stages into their own query language.

use std::cmp::Ordering;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::entity::User;
use crate::domain::DomainError;

pub const DEFAULT_PAGE: u64 = 1;
pub const DEFAULT_LIMIT: u64 = 5;

/// Raw list parameters as they arrive on the query string
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserQueryParams {
    pub page: Option<String>,
    pub limit: Option<String>,
    pub search: Option<String>,
    pub sort: Option<String>,
    pub city: Option<String>,
}

/// Fields a user list can be ordered by
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SortField {
    Id,
    FirstName,
    LastName,
    CompanyName,
    City,
    State,
    Zip,
    Email,
    Web,
    Age,
}

impl SortField {
    pub const ALL: [SortField; 10] = [
        Self::Id,
        Self::FirstName,
        Self::LastName,
        Self::CompanyName,
        Self::City,
        Self::State,
        Self::Zip,
        Self::Email,
        Self::Web,
        Self::Age,
    ];

    /// Name used on the query string; also the column name in the users table
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Id => "id",
            Self::FirstName => "first_name",
            Self::LastName => "last_name",
            Self::CompanyName => "company_name",
            Self::City => "city",
            Self::State => "state",
            Self::Zip => "zip",
            Self::Email => "email",
            Self::Web => "web",
            Self::Age => "age",
        }
    }

    fn compare(&self, a: &User, b: &User) -> Ordering {
        match self {
            Self::Id => a.id().cmp(&b.id()),
            Self::FirstName => a.first_name().cmp(b.first_name()),
            Self::LastName => a.last_name().cmp(b.last_name()),
            Self::CompanyName => a.company_name().cmp(b.company_name()),
            Self::City => a.city().cmp(b.city()),
            Self::State => a.state().cmp(b.state()),
            Self::Zip => a.zip().cmp(&b.zip()),
            Self::Email => a.email().cmp(b.email()),
            Self::Web => a.web().cmp(b.web()),
            Self::Age => a.age().cmp(&b.age()),
        }
    }
}

impl FromStr for SortField {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|field| field.as_str() == s)
            .ok_or_else(|| DomainError::invalid_sort_field(s))
    }
}

impl std::fmt::Display for SortField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    #[default]
    Ascending,
    Descending,
}

impl SortDirection {
    pub fn as_sql(&self) -> &'static str {
        match self {
            Self::Ascending => "ASC",
            Self::Descending => "DESC",
        }
    }
}

/// Requested ordering; ties are always broken by ascending id
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortOrder {
    pub field: SortField,
    pub direction: SortDirection,
}

impl Default for SortOrder {
    fn default() -> Self {
        Self {
            field: SortField::Id,
            direction: SortDirection::Ascending,
        }
    }
}

impl SortOrder {
    /// Parse `field` or `-field`
    pub fn parse(raw: &str) -> Result<Self, DomainError> {
        let raw = raw.trim();

        if raw.is_empty() {
            return Ok(Self::default());
        }

        let (direction, name) = match raw.strip_prefix('-') {
            Some(name) => (SortDirection::Descending, name),
            None => (SortDirection::Ascending, raw),
        };

        Ok(Self {
            field: name.parse()?,
            direction,
        })
    }

    pub fn compare(&self, a: &User, b: &User) -> Ordering {
        let primary = match self.direction {
            SortDirection::Ascending => self.field.compare(a, b),
            SortDirection::Descending => self.field.compare(b, a),
        };

        primary.then_with(|| a.id().cmp(&b.id()))
    }
}

/// Case-insensitive substring filters
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserFilter {
    /// Matched against first name OR last name
    pub search: Option<String>,
    pub city: Option<String>,
}

impl UserFilter {
    pub fn matches(&self, user: &User) -> bool {
        let search_ok = self.search.as_deref().is_none_or(|needle| {
            contains_ignore_case(user.first_name(), needle)
                || contains_ignore_case(user.last_name(), needle)
        });

        let city_ok = self
            .city
            .as_deref()
            .is_none_or(|needle| contains_ignore_case(user.city(), needle));

        search_ok && city_ok
    }
}

fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

/// 1-indexed page selection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    page: u64,
    limit: u64,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            page: DEFAULT_PAGE,
            limit: DEFAULT_LIMIT,
        }
    }
}

impl Pagination {
    pub fn new(page: u64, limit: u64) -> Result<Self, DomainError> {
        if page == 0 {
            return Err(DomainError::invalid_pagination("page must be at least 1"));
        }
        if limit == 0 {
            return Err(DomainError::invalid_pagination("limit must be at least 1"));
        }
        Ok(Self { page, limit })
    }

    pub fn page(&self) -> u64 {
        self.page
    }

    pub fn limit(&self) -> u64 {
        self.limit
    }

    /// Number of records preceding this page
    pub fn offset(&self) -> u64 {
        (self.page - 1).saturating_mul(self.limit)
    }
}

fn parse_positive(name: &str, raw: Option<&str>, default: u64) -> Result<u64, DomainError> {
    let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
        return Ok(default);
    };

    match raw.parse::<u64>() {
        Ok(n) if n >= 1 => Ok(n),
        _ => Err(DomainError::invalid_pagination(format!(
            "{} must be a positive integer, got '{}'",
            name, raw
        ))),
    }
}

fn non_blank(raw: Option<&str>) -> Option<String> {
    raw.map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// A validated list query
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserQuery {
    pub filter: UserFilter,
    pub sort: SortOrder,
    pub pagination: Pagination,
}

impl UserQuery {
    pub fn from_params(params: &UserQueryParams) -> Result<Self, DomainError> {
        let page = parse_positive("page", params.page.as_deref(), DEFAULT_PAGE)?;
        let limit = parse_positive("limit", params.limit.as_deref(), DEFAULT_LIMIT)?;
        let sort = match params.sort.as_deref() {
            Some(raw) => SortOrder::parse(raw)?,
            None => SortOrder::default(),
        };

        Ok(Self {
            filter: UserFilter {
                search: non_blank(params.search.as_deref()),
                city: non_blank(params.city.as_deref()),
            },
            sort,
            pagination: Pagination::new(page, limit)?,
        })
    }

    /// Run filter, sort and paginate, in that order, over in-memory records
    pub fn run(&self, users: impl IntoIterator<Item = User>) -> Page<User> {
        let mut matching: Vec<User> = users
            .into_iter()
            .filter(|user| self.filter.matches(user))
            .collect();

        matching.sort_by(|a, b| self.sort.compare(a, b));

        let total_count = matching.len() as u64;
        let offset = usize::try_from(self.pagination.offset()).unwrap_or(usize::MAX);
        let limit = usize::try_from(self.pagination.limit()).unwrap_or(usize::MAX);

        let items = matching.into_iter().skip(offset).take(limit).collect();

        Page::new(items, self.pagination, total_count)
    }
}

/// A bounded slice of an ordered result set
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: u64,
    pub limit: u64,
    pub total_count: u64,
    pub total_pages: u64,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, pagination: Pagination, total_count: u64) -> Self {
        Self {
            items,
            page: pagination.page(),
            limit: pagination.limit(),
            total_count,
            total_pages: total_count.div_ceil(pagination.limit()),
        }
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            page: self.page,
            limit: self.limit,
            total_count: self.total_count,
            total_pages: self.total_pages,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::user::entity::{sample_draft, UserId};

    fn user(id: i64, first: &str, last: &str, city: &str, age: u32) -> User {
        let mut draft = sample_draft(first, last, &format!("user{}@example.com", id));
        draft.city = city.to_string();
        draft.age = age;
        User::from_draft(UserId::new(id), draft)
    }

    fn eight_users() -> Vec<User> {
        vec![
            user(1, "James", "Butt", "New Orleans", 70),
            user(2, "Josephine", "Darakjy", "Brighton", 48),
            user(3, "Art", "Venere", "Bridgeport", 32),
            user(4, "Lenna", "Paprocki", "Anchorage", 48),
            user(5, "Donette", "Foller", "Hamilton", 25),
            user(6, "Simona", "Morasca", "Ashland", 61),
            user(7, "Mitsue", "Tollner", "Chicago", 48),
            user(8, "Leota", "Dilliard", "San Jose", 19),
        ]
    }

    fn params(pairs: &[(&str, &str)]) -> UserQueryParams {
        let mut params = UserQueryParams::default();
        for (key, value) in pairs {
            let value = Some(value.to_string());
            match *key {
                "page" => params.page = value,
                "limit" => params.limit = value,
                "search" => params.search = value,
                "sort" => params.sort = value,
                "city" => params.city = value,
                _ => panic!("unknown param {}", key),
            }
        }
        params
    }

    fn run(pairs: &[(&str, &str)], users: Vec<User>) -> Page<User> {
        UserQuery::from_params(&params(pairs)).unwrap().run(users)
    }

    fn ids(page: &Page<User>) -> Vec<i64> {
        page.items.iter().map(|u| u.id().value()).collect()
    }

    #[test]
    fn test_defaults() {
        let query = UserQuery::from_params(&UserQueryParams::default()).unwrap();

        assert_eq!(query.pagination.page(), 1);
        assert_eq!(query.pagination.limit(), 5);
        assert_eq!(query.sort, SortOrder::default());
        assert_eq!(query.filter, UserFilter::default());
    }

    #[test]
    fn test_search_matches_last_name_case_insensitively() {
        let users = vec![
            user(1, "James", "Butt", "New Orleans", 70),
            user(2, "Anna", "Smith", "Boston", 30),
        ];

        let page = run(&[("search", "butt")], users);

        assert_eq!(ids(&page), vec![1]);
        assert_eq!(page.total_count, 1);
    }

    #[test]
    fn test_search_is_substring_on_either_name() {
        let page = run(&[("search", "ON")], eight_users());

        assert_eq!(ids(&page), vec![5, 6]);
    }

    #[test]
    fn test_blank_search_is_ignored() {
        let page = run(&[("search", "   "), ("limit", "10")], eight_users());
        assert_eq!(page.total_count, 8);
    }

    #[test]
    fn test_city_and_search_compose_with_and() {
        let page = run(&[("city", "bri"), ("search", "art")], eight_users());
        assert_eq!(ids(&page), vec![3]);

        let page = run(&[("city", "bri")], eight_users());
        assert_eq!(ids(&page), vec![2, 3]);
    }

    #[test]
    fn test_sort_descending_age_with_id_tiebreak() {
        let page = run(&[("sort", "-age"), ("limit", "8")], eight_users());

        let ages: Vec<u32> = page.items.iter().map(User::age).collect();
        assert!(ages.windows(2).all(|w| w[0] >= w[1]));
        assert_eq!(ids(&page), vec![1, 6, 2, 4, 7, 3, 5, 8]);
    }

    #[test]
    fn test_sort_ascending_by_name() {
        let page = run(&[("sort", "first_name"), ("limit", "3")], eight_users());
        assert_eq!(ids(&page), vec![3, 5, 1]);
    }

    #[test]
    fn test_text_sort_is_byte_order() {
        let users = vec![
            user(1, "anna", "Smith", "Boston", 30),
            user(2, "Zoe", "Brown", "Boston", 30),
            user(3, "Anna", "Jones", "Boston", 30),
        ];

        let page = run(&[("sort", "first_name")], users);
        assert_eq!(ids(&page), vec![3, 2, 1]);
    }

    #[test]
    fn test_unknown_sort_field_rejected() {
        let err = UserQuery::from_params(&params(&[("sort", "-password")])).unwrap_err();
        assert!(matches!(err, DomainError::InvalidSortField { field } if field == "password"));

        let err = UserQuery::from_params(&params(&[("sort", "-")])).unwrap_err();
        assert!(matches!(err, DomainError::InvalidSortField { .. }));
    }

    #[test]
    fn test_pages_are_disjoint_and_complete() {
        let first = run(&[("page", "1"), ("limit", "5")], eight_users());
        let second = run(&[("page", "2"), ("limit", "5")], eight_users());

        assert_eq!(first.items.len(), 5);
        assert_eq!(second.items.len(), 3);

        let mut all = ids(&first);
        all.extend(ids(&second));
        all.sort();
        assert_eq!(all, vec![1, 2, 3, 4, 5, 6, 7, 8]);
    }

    #[test]
    fn test_page_beyond_last_is_empty() {
        let page = run(&[("page", "100"), ("limit", "5")], eight_users());

        assert!(page.items.is_empty());
        assert_eq!(page.total_count, 8);
        assert_eq!(page.total_pages, 2);
        assert_eq!(page.page, 100);
    }

    #[test]
    fn test_sorting_happens_before_slicing() {
        let page = run(&[("sort", "-id"), ("page", "2"), ("limit", "3")], eight_users());
        assert_eq!(ids(&page), vec![5, 4, 3]);
    }

    #[test]
    fn test_invalid_pagination() {
        for (key, value) in [("page", "0"), ("page", "-1"), ("limit", "0"), ("limit", "abc")] {
            let err = UserQuery::from_params(&params(&[(key, value)])).unwrap_err();
            assert!(
                matches!(err, DomainError::InvalidPagination { .. }),
                "{}={} should be rejected",
                key,
                value
            );
        }
    }

    #[test]
    fn test_empty_result_has_zero_pages() {
        let page = run(&[], Vec::new());

        assert!(page.items.is_empty());
        assert_eq!(page.total_count, 0);
        assert_eq!(page.total_pages, 0);
    }

    #[test]
    fn test_sort_field_round_trips_through_name() {
        for field in SortField::ALL {
            assert_eq!(field.as_str().parse::<SortField>().unwrap(), field);
        }
    }
}
