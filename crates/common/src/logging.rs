//! Logging initialization using tracing
//!
//! Production deployments emit JSON lines for log shippers; development
//! uses the human-readable formatter. `RUST_LOG` always wins over the
//! configured level.

use serde::{Deserialize, Serialize};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Output format for log records
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    /// JSON outside development, pretty inside
    #[default]
    Auto,
    /// One JSON object per line
    Json,
    /// Human-readable multi-line output
    Pretty,
}

impl LogFormat {
    /// Resolve `Auto` against the hosting environment
    pub fn resolve(self, development: bool) -> LogFormat {
        match self {
            LogFormat::Auto if development => LogFormat::Pretty,
            LogFormat::Auto => LogFormat::Json,
            other => other,
        }
    }
}

/// Build the filter used by `init_logging`
pub fn env_filter(default_level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level))
}

/// Install the global tracing subscriber
///
/// `format` must already be resolved; `Auto` is treated as JSON.
pub fn init_logging(
    default_level: &str,
    format: LogFormat,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let registry = tracing_subscriber::registry().with(env_filter(default_level));

    match format {
        LogFormat::Pretty => registry
            .with(fmt::layer().pretty().with_target(true))
            .try_init()?,
        LogFormat::Json | LogFormat::Auto => registry
            .with(
                fmt::layer()
                    .json()
                    .with_target(true)
                    .with_thread_ids(true)
                    .with_file(true)
                    .with_line_number(true),
            )
            .try_init()?,
    }

    Ok(())
}
