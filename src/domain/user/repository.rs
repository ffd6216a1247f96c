//! User repository trait

use async_trait::async_trait;
use std::fmt::Debug;

#[cfg(test)]
use mockall::automock;

use super::entity::{User, UserDraft, UserId, UserPatch};
use super::query::{Page, UserQuery};
use super::summary::UserSummary;
use crate::domain::DomainError;

/// Result of an upsert keyed by email
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpsertOutcome {
    Inserted(User),
    Updated(User),
}

impl UpsertOutcome {
    pub fn user(&self) -> &User {
        match self {
            Self::Inserted(user) | Self::Updated(user) => user,
        }
    }
}

/// Repository trait for user storage
///
/// Implementations own id assignment and the unique constraint on email:
/// a write that would duplicate an email fails with
/// [`DomainError::Conflict`] and leaves existing records untouched.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait UserRepository: Send + Sync + Debug {
    /// Get a user by id
    async fn get(&self, id: UserId) -> Result<Option<User>, DomainError>;

    /// Insert a new user, assigning its id
    async fn create(&self, draft: &UserDraft) -> Result<User, DomainError>;

    /// Replace every attribute of an existing user; `None` when absent
    async fn replace(&self, id: UserId, draft: &UserDraft) -> Result<Option<User>, DomainError>;

    /// Merge supplied attributes into an existing user; `None` when absent
    async fn patch(&self, id: UserId, patch: &UserPatch) -> Result<Option<User>, DomainError>;

    /// Delete a user, returning whether it existed
    async fn delete(&self, id: UserId) -> Result<bool, DomainError>;

    /// Filter, sort and paginate
    async fn query(&self, query: &UserQuery) -> Result<Page<User>, DomainError>;

    /// Aggregate statistics over all users
    async fn summarize(&self) -> Result<UserSummary, DomainError>;

    /// Count all users
    async fn count(&self) -> Result<u64, DomainError>;

    /// Insert, or overwrite the user holding the same email
    async fn upsert_by_email(&self, draft: &UserDraft) -> Result<UpsertOutcome, DomainError>;
}
