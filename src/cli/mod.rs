//! CLI module for the user directory
//!
//! Provides subcommands:
//! - `serve`: run the HTTP API
//! - `import`: load a JSON file of user records into the configured store

pub mod import;
pub mod serve;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::config::AppConfig;
use crate::infrastructure::logging;

/// User Directory - REST service for person records
#[derive(Parser)]
#[command(name = "user-directory")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run the API server
    Serve,

    /// Import users from a JSON array file, matching existing users by email
    Import {
        /// Path to the JSON file
        file: PathBuf,
    },
}

/// Load `.env` and layered configuration, then install logging
pub(crate) fn bootstrap() -> anyhow::Result<AppConfig> {
    dotenvy::dotenv().ok();

    let config = AppConfig::load()?;
    logging::init_logging(&config.logging)?;

    Ok(config)
}
