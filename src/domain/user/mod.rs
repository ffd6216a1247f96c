//! User domain
//!
//! Person records, payload validation, the list query pipeline, summary
//! statistics and the repository trait the stores implement.

mod entity;
mod query;
mod repository;
mod summary;
mod validation;

pub use entity::{User, UserDraft, UserId, UserPatch};
pub use query::{
    Page, Pagination, SortDirection, SortField, SortOrder, UserFilter, UserQuery,
    UserQueryParams, DEFAULT_LIMIT, DEFAULT_PAGE,
};
pub use repository::{UpsertOutcome, UserRepository};
pub use summary::{round_two_decimals, UserSummary};
pub use validation::{
    validate, validate_full, UserValidationError, ValidationErrors, ValidationMode, USER_FIELDS,
};

#[cfg(test)]
pub(crate) use entity::sample_draft;
#[cfg(test)]
pub use repository::MockUserRepository;
