//! User service for directory management

use std::sync::Arc;

use serde_json::{Map, Value};
use tracing::{debug, info};

use crate::domain::user::{
    validate, validate_full, Page, User, UserId, UserQuery, UserQueryParams, UserRepository,
    UserSummary, ValidationMode,
};
use crate::domain::DomainError;

/// User service. Payloads are validated before the store is touched.
#[derive(Debug)]
pub struct UserService<R: UserRepository + ?Sized> {
    repository: Arc<R>,
}

impl<R: UserRepository + ?Sized> UserService<R> {
    /// Create a new user service
    pub fn new(repository: Arc<R>) -> Self {
        Self { repository }
    }

    /// Run the filter, sort and paginate pipeline over the stored users
    pub async fn list(&self, params: &UserQueryParams) -> Result<Page<User>, DomainError> {
        let query = UserQuery::from_params(params)?;
        debug!(
            page = query.pagination.page(),
            limit = query.pagination.limit(),
            sort = %query.sort.field,
            "Listing users"
        );

        self.repository.query(&query).await
    }

    /// Get a user by ID
    pub async fn get(&self, id: &str) -> Result<User, DomainError> {
        let user_id = UserId::parse(id)?;

        self.repository
            .get(user_id)
            .await?
            .ok_or_else(|| not_found(user_id))
    }

    /// Create a user from a full payload
    pub async fn create(&self, payload: &Map<String, Value>) -> Result<User, DomainError> {
        let draft = validate_full(payload)?;

        info!(email = %draft.email, "Creating user");
        let user = self.repository.create(&draft).await?;
        info!(id = %user.id(), "User created");

        Ok(user)
    }

    /// Replace every field of an existing user
    pub async fn replace(
        &self,
        id: &str,
        payload: &Map<String, Value>,
    ) -> Result<User, DomainError> {
        let user_id = UserId::parse(id)?;
        let draft = validate_full(payload)?;

        info!(id = %user_id, "Replacing user");
        self.repository
            .replace(user_id, &draft)
            .await?
            .ok_or_else(|| not_found(user_id))
    }

    /// Update the supplied fields of an existing user
    pub async fn patch(&self, id: &str, payload: &Map<String, Value>) -> Result<User, DomainError> {
        let user_id = UserId::parse(id)?;
        let patch = validate(payload, ValidationMode::Partial)?;

        info!(id = %user_id, "Patching user");
        self.repository
            .patch(user_id, &patch)
            .await?
            .ok_or_else(|| not_found(user_id))
    }

    /// Delete a user
    pub async fn delete(&self, id: &str) -> Result<(), DomainError> {
        let user_id = UserId::parse(id)?;

        info!(id = %user_id, "Deleting user");
        if self.repository.delete(user_id).await? {
            Ok(())
        } else {
            Err(not_found(user_id))
        }
    }

    /// Aggregate statistics over every stored user
    pub async fn summarize(&self) -> Result<UserSummary, DomainError> {
        self.repository.summarize().await
    }

    /// Count stored users
    pub async fn count(&self) -> Result<u64, DomainError> {
        self.repository.count().await
    }
}

fn not_found(id: UserId) -> DomainError {
    DomainError::not_found(format!("User '{}' not found", id))
}
