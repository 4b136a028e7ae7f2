//! Tracing configuration for the buf-setup CLI
//!
//! Human formats go to stderr. The `actions` format renders events as GitHub
//! Actions workflow commands on stdout, where the runner picks them up.

use std::io;

pub use tracing::Level;
use tracing_subscriber::{filter::EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

use crate::workflow::WorkflowCommandLayer;

/// Tracing output format options
#[derive(Debug, Clone, PartialEq, Eq, clap::ValueEnum)]
pub enum TracingFormat {
    /// Pretty-printed human-readable format
    Pretty,
    /// Compact single-line format
    Compact,
    /// Structured JSON format
    Json,
    /// GitHub Actions workflow commands
    Actions,
}

impl TracingFormat {
    /// `Actions` when running under GitHub Actions, `Pretty` otherwise.
    #[must_use]
    pub fn detect() -> Self {
        if std::env::var("GITHUB_ACTIONS").is_ok_and(|v| v == "true") {
            Self::Actions
        } else {
            Self::Pretty
        }
    }
}

/// Log level options for CLI
#[derive(Debug, Clone, PartialEq, Eq, clap::ValueEnum)]
pub enum LogLevel {
    /// Show all logs (trace level)
    Trace,
    /// Show debug and above
    Debug,
    /// Show info and above (default)
    Info,
    /// Show warnings and above
    Warn,
    /// Show errors only
    Error,
}

impl LogLevel {
    /// `Debug` when the runner has step debug logging enabled, `Info` otherwise.
    #[must_use]
    pub fn detect() -> Self {
        if std::env::var("RUNNER_DEBUG").is_ok_and(|v| v == "1") {
            Self::Debug
        } else {
            Self::Info
        }
    }
}

impl From<LogLevel> for Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Trace => Self::TRACE,
            LogLevel::Debug => Self::DEBUG,
            LogLevel::Info => Self::INFO,
            LogLevel::Warn => Self::WARN,
            LogLevel::Error => Self::ERROR,
        }
    }
}

/// Tracing configuration
#[derive(Debug, Clone)]
pub struct TracingConfig {
    /// Output format.
    pub format: TracingFormat,
    /// Most verbose level emitted.
    pub level: Level,
    /// Directive overriding `level`, in `EnvFilter` syntax.
    pub filter: Option<String>,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            format: TracingFormat::Pretty,
            level: Level::INFO,
            filter: None,
        }
    }
}

/// Global correlation ID for tracing request correlation
static CORRELATION_ID: std::sync::OnceLock<Uuid> = std::sync::OnceLock::new();

/// Get or create a correlation ID for the current session
pub fn correlation_id() -> Uuid {
    *CORRELATION_ID.get_or_init(Uuid::new_v4)
}

/// Build the filter: `RUST_LOG` wins, then an explicit filter, then the level
/// applied to the workspace crates.
fn env_filter(config: &TracingConfig) -> miette::Result<EnvFilter> {
    let filter = if let Ok(filter) = EnvFilter::try_from_default_env() {
        Ok(filter)
    } else if let Some(filter) = &config.filter {
        EnvFilter::try_new(filter)
    } else {
        let level_str = match config.level {
            Level::TRACE => "trace",
            Level::DEBUG => "debug",
            Level::INFO => "info",
            Level::WARN => "warn",
            Level::ERROR => "error",
        };
        EnvFilter::try_new(format!(
            "buf_setup={level_str},buf_setup_core={level_str},buf_setup_github={level_str}"
        ))
    };
    filter.map_err(|e| miette::miette!("Failed to create tracing filter: {e}"))
}

/// Initialize tracing with the given configuration
pub fn init_tracing(config: TracingConfig) -> miette::Result<()> {
    let correlation_id = correlation_id();
    let registry = tracing_subscriber::registry().with(env_filter(&config)?);

    match config.format {
        TracingFormat::Pretty => {
            let layer = tracing_subscriber::fmt::layer()
                .pretty()
                .with_writer(io::stderr)
                .with_target(false);

            registry.with(layer).init();
        }
        TracingFormat::Compact => {
            let layer = tracing_subscriber::fmt::layer()
                .compact()
                .with_writer(io::stderr)
                .with_target(false);

            registry.with(layer).init();
        }
        TracingFormat::Json => {
            let layer = tracing_subscriber::fmt::layer()
                .json()
                .with_writer(io::stderr)
                .with_current_span(true)
                .with_span_list(true);

            registry.with(layer).init();
        }
        TracingFormat::Actions => {
            registry.with(WorkflowCommandLayer::new(io::stdout)).init();
        }
    }

    tracing::debug!(
        correlation_id = %correlation_id,
        version = env!("CARGO_PKG_VERSION"),
        format = ?config.format,
        "Tracing initialized for buf-setup"
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_level_conversion() {
        assert_eq!(Level::from(LogLevel::Trace), Level::TRACE);
        assert_eq!(Level::from(LogLevel::Warn), Level::WARN);
        assert_eq!(Level::from(LogLevel::Error), Level::ERROR);
    }

    #[test]
    fn test_log_level_detects_runner_debug() {
        temp_env::with_var("RUNNER_DEBUG", Some("1"), || {
            assert_eq!(LogLevel::detect(), LogLevel::Debug);
        });
        temp_env::with_var("RUNNER_DEBUG", None::<&str>, || {
            assert_eq!(LogLevel::detect(), LogLevel::Info);
        });
    }

    #[test]
    fn test_correlation_id_is_stable() {
        assert_eq!(correlation_id(), correlation_id());
    }

    #[test]
    fn test_explicit_filter_is_used() {
        temp_env::with_var("RUST_LOG", None::<&str>, || {
            let config = TracingConfig {
                filter: Some("buf_setup=trace".into()),
                ..TracingConfig::default()
            };
            assert!(env_filter(&config).is_ok());

            let config = TracingConfig {
                filter: Some("buf_setup=[".into()),
                ..TracingConfig::default()
            };
            assert!(env_filter(&config).is_err());
        });
    }
}
