//! API middleware components

pub mod logging;
pub mod rate_limit;

pub use logging::logging_middleware;
pub use rate_limit::{list_rate_limit, read_rate_limit};
