//! Logging setup.
//!
//! Logs go to stderr so the usage table and `--json` output stay clean on
//! stdout. Level and format are controlled by env vars with a CLI override.

use tracing_subscriber::EnvFilter;

const LOG_LEVEL_ENV: &str = "QPACE_LOG";
const LOG_FORMAT_ENV: &str = "QPACE_LOG_FORMAT";

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable logs.
    #[default]
    Human,
    /// JSON logs (one event per line).
    Json,
    /// Compact single-line logs.
    Compact,
}

impl LogFormat {
    /// Parse from string (case-insensitive).
    #[must_use]
    pub fn from_arg(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "human" => Some(Self::Human),
            "json" => Some(Self::Json),
            "compact" => Some(Self::Compact),
            _ => None,
        }
    }
}

/// Parse log format from the `QPACE_LOG_FORMAT` env var.
#[must_use]
pub fn format_from_env() -> LogFormat {
    std::env::var(LOG_FORMAT_ENV)
        .ok()
        .and_then(|v| LogFormat::from_arg(&v))
        .unwrap_or_default()
}

/// Initialize logging.
///
/// The filter comes from `QPACE_LOG` (falling back to `error`, or `debug`
/// with `--verbose`). Safe to call more than once; later calls are no-ops.
pub fn init(verbose: bool) {
    let default_level = if verbose { "debug" } else { "error" };
    let filter = std::env::var(LOG_LEVEL_ENV)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .map_or_else(
            || EnvFilter::new(format!("qpace={default_level}")),
            EnvFilter::new,
        );

    match format_from_env() {
        LogFormat::Json => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .json()
                .with_writer(std::io::stderr)
                .try_init()
                .ok();
        }
        LogFormat::Compact => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .compact()
                .with_writer(std::io::stderr)
                .with_target(true)
                .try_init()
                .ok();
        }
        LogFormat::Human => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .with_target(false)
                .without_time()
                .try_init()
                .ok();
        }
    }
}
