//! Subscriber setup for the service and the import command

use anyhow::Context;
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

use crate::config::{LogFormat, LoggingConfig};

/// Install the global subscriber. `RUST_LOG` takes precedence over the
/// configured level; a malformed configured level is an error.
pub fn init_logging(config: &LoggingConfig) -> anyhow::Result<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => level_filter(&config.level)?,
    };

    let registry = tracing_subscriber::registry().with(filter);
    let installed = match config.format {
        LogFormat::Json => registry
            .with(
                fmt::layer()
                    .json()
                    .flatten_event(true)
                    .with_current_span(false)
                    .with_span_events(FmtSpan::CLOSE),
            )
            .try_init(),
        LogFormat::Pretty => registry
            .with(fmt::layer().pretty().with_span_events(FmtSpan::CLOSE))
            .try_init(),
    };
    installed.context("Failed to install the tracing subscriber")?;

    tracing::debug!(level = %config.level, format = ?config.format, "Logging ready");
    Ok(())
}

/// Filter for the configured level, e.g. `info` or `user_directory=debug,sqlx=warn`
fn level_filter(level: &str) -> anyhow::Result<EnvFilter> {
    EnvFilter::try_new(level).with_context(|| format!("Invalid logging.level '{}'", level))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_filter_accepts_directives() {
        assert!(level_filter("info").is_ok());
        assert!(level_filter("user_directory=debug,sqlx=warn").is_ok());
    }

    #[test]
    fn test_level_filter_rejects_garbage() {
        let err = level_filter("user_directory=loud").unwrap_err();
        assert!(err.to_string().contains("logging.level"));
    }
}
