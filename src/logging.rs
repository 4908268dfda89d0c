//! Structured logging setup on top of `tracing`.
//!
//! Logs go to stderr so that stdout stays free for command output.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Registry};

use crate::config::AppConfig;
use crate::error::{AppError, Result};

/// Environment variable that overrides the configured filter.
pub const LOG_ENV: &str = "BFS_LOG";

/// Build the filter: `$BFS_LOG` wins over the configured level.
pub fn build_env_filter(level: &str) -> Result<EnvFilter> {
    if let Ok(filter) = EnvFilter::try_from_env(LOG_ENV) {
        return Ok(filter);
    }
    EnvFilter::try_new(level)
        .map_err(|e| AppError::Config(format!("invalid log level {:?}: {}", level, e)))
}

/// Install the global subscriber.
pub fn init_logging(config: &AppConfig) -> Result<()> {
    let filter = build_env_filter(config.log_level())?;
    let registry = Registry::default().with(filter);

    let installed = match config.log_format() {
        "json" => registry
            .with(
                fmt::layer()
                    .json()
                    .with_target(true)
                    .with_writer(std::io::stderr),
            )
            .try_init(),
        "text" => registry
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_writer(std::io::stderr),
            )
            .try_init(),
        other => {
            return Err(AppError::Config(format!(
                "unknown log format {:?} (expected text or json)",
                other
            )))
        }
    };
    installed.map_err(|e| AppError::Config(format!("failed to install logger: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LoggingConfig;

    #[test]
    fn known_levels_build_filters() {
        for level in ["trace", "debug", "info", "warn", "error", "off"] {
            assert!(build_env_filter(level).is_ok(), "level {}", level);
        }
    }

    #[test]
    fn unknown_format_is_rejected() {
        let config = AppConfig {
            logging: LoggingConfig {
                level: Some("info".into()),
                format: Some("xml".into()),
            },
            ..Default::default()
        };
        assert!(matches!(init_logging(&config), Err(AppError::Config(_))));
    }
}
