//! Tracing subscriber setup for binaries and integration tests

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::error::DatabaseError;

/// Initializes the global tracing subscriber for structured logging.
///
/// `RUST_LOG` takes precedence over `log_level`; an unparsable level falls
/// back to `info`. With `json` set, events are emitted as JSON lines.
///
/// # Errors
///
/// Returns `DatabaseError::Telemetry` if a global subscriber is already set
pub fn init_tracing(log_level: &str, json: bool) -> Result<(), DatabaseError> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let (text, json) = if json {
        (None, Some(tracing_subscriber::fmt::layer().json().with_target(true)))
    } else {
        (Some(tracing_subscriber::fmt::layer().with_target(true)), None)
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(text)
        .with(json)
        .try_init()
        .map_err(|e| DatabaseError::Telemetry(e.to_string()))
}
