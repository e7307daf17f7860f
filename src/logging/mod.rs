// Logging module for structured logging using the tracing crate

use std::error::Error;
use tracing_subscriber::EnvFilter;

/// Initialize the tracing subscriber.
///
/// Filtering follows `RUST_LOG` (default `info`). Setting
/// `KUROGANE_LOG_FORMAT=json` switches to JSON output for log aggregation;
/// the default is human-readable text.
pub fn init_subscriber() -> Result<(), Box<dyn Error + Send + Sync>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let json = std::env::var("KUROGANE_LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);
    if json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .try_init()?;
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).try_init()?;
    }
    Ok(())
}
