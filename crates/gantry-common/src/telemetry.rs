//! Logging initialization for harness binaries and test runs
//!
//! Structured tracing output with env-based filtering. JSON output is
//! switched on for CI via `GANTRY_LOG_FORMAT=json`.

use thiserror::Error;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Errors that can occur during logging initialization
#[derive(Debug, Error)]
pub enum TelemetryError {
    /// Failed to initialize tracing subscriber
    #[error("failed to initialize tracing subscriber: {0}")]
    SubscriberInit(String),
}

/// Default filter directives when RUST_LOG is not set
const DEFAULT_DIRECTIVES: &str = "info,gantry=debug,kube=info,tower=warn,hyper=warn";

/// Initialize logging for a harness process.
///
/// Respects `RUST_LOG` for filtering and `GANTRY_LOG_FORMAT=json` for
/// machine-readable output. Safe to call exactly once per process.
pub fn init_logging() -> Result<(), TelemetryError> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVES));

    let json = std::env::var("GANTRY_LOG_FORMAT").is_ok_and(|v| v == "json");

    let registry = tracing_subscriber::registry().with(env_filter);

    let result = if json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_target(true))
            .try_init()
    } else {
        registry.with(tracing_subscriber::fmt::layer()).try_init()
    };

    result.map_err(|e| TelemetryError::SubscriberInit(e.to_string()))
}
