//! Infrastructure layer - store implementations and process plumbing

pub mod logging;
pub mod rate_limit;
pub mod storage;
pub mod user;
