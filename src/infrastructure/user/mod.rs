//! User infrastructure module
//!
//! Store implementations for the user directory, the service used by the
//! HTTP layer and the bulk importer.

mod import;
mod postgres_repository;
mod repository;
mod service;

pub use import::{ImportReport, UserImporter};
pub use postgres_repository::PostgresUserRepository;
pub use repository::InMemoryUserRepository;
pub use service::UserService;
