//! In-memory user repository implementation

use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::domain::user::{
    Page, UpsertOutcome, User, UserDraft, UserId, UserPatch, UserQuery, UserRepository,
    UserSummary,
};
use crate::domain::DomainError;

#[derive(Debug, Default)]
struct Tables {
    users: BTreeMap<UserId, User>,
    /// Index for email -> user id lookup
    email_index: HashMap<String, UserId>,
    last_id: i64,
}

impl Tables {
    fn next_id(&mut self) -> UserId {
        self.last_id += 1;
        UserId::new(self.last_id)
    }

    fn insert(&mut self, draft: &UserDraft) -> Result<User, DomainError> {
        if self.email_index.contains_key(&draft.email) {
            return Err(email_conflict(&draft.email));
        }

        let user = User::from_draft(self.next_id(), draft.clone());
        self.email_index.insert(user.email().to_string(), user.id());
        self.users.insert(user.id(), user.clone());

        Ok(user)
    }

    /// Store a modified copy of an existing user, keeping the email index
    /// consistent
    fn store(&mut self, updated: User) -> Result<User, DomainError> {
        let id = updated.id();
        let old_email = match self.users.get(&id) {
            Some(existing) => existing.email().to_string(),
            None => return Err(DomainError::not_found(format!("User '{}' not found", id))),
        };

        if old_email != updated.email() {
            if self.email_index.contains_key(updated.email()) {
                return Err(email_conflict(updated.email()));
            }

            self.email_index.remove(&old_email);
            self.email_index.insert(updated.email().to_string(), id);
        }

        self.users.insert(id, updated.clone());

        Ok(updated)
    }
}

fn email_conflict(email: &str) -> DomainError {
    DomainError::conflict(format!("Email '{}' already exists", email))
}

/// In-memory implementation of UserRepository
#[derive(Debug, Clone, Default)]
pub struct InMemoryUserRepository {
    tables: Arc<RwLock<Tables>>,
}

impl InMemoryUserRepository {
    /// Create a new empty repository
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a repository with initial users, assigning ids in order
    pub fn with_users(drafts: Vec<UserDraft>) -> Result<Self, DomainError> {
        let mut tables = Tables::default();

        for draft in &drafts {
            tables.insert(draft)?;
        }

        Ok(Self {
            tables: Arc::new(RwLock::new(tables)),
        })
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn get(&self, id: UserId) -> Result<Option<User>, DomainError> {
        let tables = self.tables.read().await;
        Ok(tables.users.get(&id).cloned())
    }

    async fn create(&self, draft: &UserDraft) -> Result<User, DomainError> {
        let mut tables = self.tables.write().await;
        tables.insert(draft)
    }

    async fn replace(&self, id: UserId, draft: &UserDraft) -> Result<Option<User>, DomainError> {
        let mut tables = self.tables.write().await;

        let Some(mut user) = tables.users.get(&id).cloned() else {
            return Ok(None);
        };

        user.replace(draft.clone());
        tables.store(user).map(Some)
    }

    async fn patch(&self, id: UserId, patch: &UserPatch) -> Result<Option<User>, DomainError> {
        let mut tables = self.tables.write().await;

        let Some(mut user) = tables.users.get(&id).cloned() else {
            return Ok(None);
        };

        patch.apply_to(&mut user);
        tables.store(user).map(Some)
    }

    async fn delete(&self, id: UserId) -> Result<bool, DomainError> {
        let mut tables = self.tables.write().await;

        if let Some(user) = tables.users.remove(&id) {
            tables.email_index.remove(user.email());
            Ok(true)
        } else {
            Ok(false)
        }
    }

    async fn query(&self, query: &UserQuery) -> Result<Page<User>, DomainError> {
        let tables = self.tables.read().await;
        Ok(query.run(tables.users.values().cloned()))
    }

    async fn summarize(&self) -> Result<UserSummary, DomainError> {
        let tables = self.tables.read().await;
        Ok(UserSummary::from_users(tables.users.values()))
    }

    async fn count(&self) -> Result<u64, DomainError> {
        let tables = self.tables.read().await;
        Ok(tables.users.len() as u64)
    }

    async fn upsert_by_email(&self, draft: &UserDraft) -> Result<UpsertOutcome, DomainError> {
        let mut tables = self.tables.write().await;

        match tables.email_index.get(&draft.email).copied() {
            Some(id) => {
                let user = User::from_draft(id, draft.clone());
                tables.store(user).map(UpsertOutcome::Updated)
            }
            None => tables.insert(draft).map(UpsertOutcome::Inserted),
        }
    }
}
