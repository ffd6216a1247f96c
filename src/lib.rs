//! User Directory API
//!
//! A REST service managing person records with:
//! - Payload validation against a closed field set
//! - Search, city filter, sorting and pagination over the directory
//! - Aggregate statistics by city, state and age
//! - In-memory or PostgreSQL storage and bulk JSON import

pub mod api;
pub mod cli;
pub mod config;
pub mod domain;
pub mod infrastructure;

pub use config::AppConfig;

use std::sync::Arc;

use api::state::AppState;
use domain::user::UserRepository;
use infrastructure::{
    storage::StorageFactory,
    user::{UserImporter, UserService},
};
use tracing::info;

/// Create the application state with default configuration
pub async fn create_app_state() -> anyhow::Result<AppState> {
    create_app_state_with_config(&AppConfig::default()).await
}

/// Create the application state with custom configuration
pub async fn create_app_state_with_config(config: &AppConfig) -> anyhow::Result<AppState> {
    let repository = create_user_repository(config).await?;

    seed_if_empty(config, repository.clone()).await?;

    Ok(create_app_state_with_repository(
        repository,
        config.rate_limit.clone(),
    ))
}

/// Create the application state around an existing store
pub fn create_app_state_with_repository(
    repository: Arc<dyn UserRepository>,
    rate_limits: config::RateLimitSettings,
) -> AppState {
    let user_service = Arc::new(UserService::new(repository));
    AppState::new(user_service, rate_limits)
}

/// Open the configured user store
pub async fn create_user_repository(config: &AppConfig) -> anyhow::Result<Arc<dyn UserRepository>> {
    let storage_config = config.storage.resolve()?;
    info!("Storage backend: {:?}", storage_config.storage_type());

    Ok(StorageFactory::create_user_repository(&storage_config).await?)
}

/// Import the seed file when one is configured and the store has no users
async fn seed_if_empty(
    config: &AppConfig,
    repository: Arc<dyn UserRepository>,
) -> anyhow::Result<()> {
    let Some(path) = config.seed.file.as_deref() else {
        return Ok(());
    };

    let existing = repository.count().await?;
    if existing > 0 {
        info!(existing, "User store already populated, skipping seed");
        return Ok(());
    }

    let report = UserImporter::new(repository).import_file(path).await?;
    info!(
        inserted = report.inserted,
        skipped = report.skipped,
        "Seeded user store from {}",
        path
    );

    Ok(())
}
