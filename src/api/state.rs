//! Application state for shared services

use std::sync::Arc;

use serde_json::{Map, Value};

use crate::config::RateLimitSettings;
use crate::domain::user::{Page, User, UserQueryParams, UserRepository, UserSummary};
use crate::domain::DomainError;
use crate::infrastructure::rate_limit::RateLimiter;
use crate::infrastructure::user::UserService;

/// Application state containing shared services using dynamic dispatch
#[derive(Clone)]
pub struct AppState {
    pub user_service: Arc<dyn UserServiceTrait>,
    pub rate_limiter: RateLimiter,
    pub rate_limits: RateLimitSettings,
}

impl AppState {
    pub fn new(user_service: Arc<dyn UserServiceTrait>, rate_limits: RateLimitSettings) -> Self {
        Self {
            user_service,
            rate_limiter: RateLimiter::new(),
            rate_limits,
        }
    }
}

/// Trait for user service operations
#[async_trait::async_trait]
pub trait UserServiceTrait: Send + Sync {
    async fn list(&self, params: &UserQueryParams) -> Result<Page<User>, DomainError>;
    async fn get(&self, id: &str) -> Result<User, DomainError>;
    async fn create(&self, payload: &Map<String, Value>) -> Result<User, DomainError>;
    async fn replace(&self, id: &str, payload: &Map<String, Value>) -> Result<User, DomainError>;
    async fn patch(&self, id: &str, payload: &Map<String, Value>) -> Result<User, DomainError>;
    async fn delete(&self, id: &str) -> Result<(), DomainError>;
    async fn summarize(&self) -> Result<UserSummary, DomainError>;
    async fn count(&self) -> Result<u64, DomainError>;
}

#[async_trait::async_trait]
impl<R: UserRepository + ?Sized + 'static> UserServiceTrait for UserService<R> {
    async fn list(&self, params: &UserQueryParams) -> Result<Page<User>, DomainError> {
        UserService::list(self, params).await
    }

    async fn get(&self, id: &str) -> Result<User, DomainError> {
        UserService::get(self, id).await
    }

    async fn create(&self, payload: &Map<String, Value>) -> Result<User, DomainError> {
        UserService::create(self, payload).await
    }

    async fn replace(&self, id: &str, payload: &Map<String, Value>) -> Result<User, DomainError> {
        UserService::replace(self, id, payload).await
    }

    async fn patch(&self, id: &str, payload: &Map<String, Value>) -> Result<User, DomainError> {
        UserService::patch(self, id, payload).await
    }

    async fn delete(&self, id: &str) -> Result<(), DomainError> {
        UserService::delete(self, id).await
    }

    async fn summarize(&self) -> Result<UserSummary, DomainError> {
        UserService::summarize(self).await
    }

    async fn count(&self) -> Result<u64, DomainError> {
        UserService::count(self).await
    }
}
