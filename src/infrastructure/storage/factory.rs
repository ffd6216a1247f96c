//! Storage factory for runtime backend selection

use std::sync::Arc;

use tracing::info;

use crate::domain::user::UserRepository;
use crate::domain::DomainError;
use crate::infrastructure::user::{InMemoryUserRepository, PostgresUserRepository};

use super::migrations::{user_migrations, PostgresMigrator};
use super::postgres::PostgresConfig;

/// Supported storage types
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageType {
    /// In-memory storage (for testing/development)
    InMemory,
    /// PostgreSQL storage
    Postgres,
}

impl StorageType {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "memory" | "inmemory" | "in-memory" | "in_memory" => Some(Self::InMemory),
            "postgres" | "postgresql" | "pg" => Some(Self::Postgres),
            _ => None,
        }
    }
}

/// Storage configuration
#[derive(Debug, Clone)]
pub enum StorageConfig {
    InMemory,
    Postgres(PostgresConfig),
}

impl StorageConfig {
    /// Returns the storage type
    pub fn storage_type(&self) -> StorageType {
        match self {
            Self::InMemory => StorageType::InMemory,
            Self::Postgres(_) => StorageType::Postgres,
        }
    }
}

/// Factory for creating user stores
#[derive(Debug)]
pub struct StorageFactory;

impl StorageFactory {
    /// Creates the user store described by the configuration. PostgreSQL
    /// stores are migrated before being handed out.
    pub async fn create_user_repository(
        config: &StorageConfig,
    ) -> Result<Arc<dyn UserRepository>, DomainError> {
        match config {
            StorageConfig::InMemory => {
                info!("Using in-memory user store");
                Ok(Arc::new(InMemoryUserRepository::new()))
            }
            StorageConfig::Postgres(pg_config) => {
                let pool = pg_config.connect().await?;

                let migrator = PostgresMigrator::new(pool.clone());
                migrator.run_all(&user_migrations()).await?;
                info!(
                    version = ?migrator.current_version().await?,
                    "Using PostgreSQL user store"
                );

                Ok(Arc::new(PostgresUserRepository::new(pool)))
            }
        }
    }
}
