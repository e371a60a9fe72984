//! `tracing` subscriber setup.

use crate::config::{LogFormat, LoggingConfig};
use crate::error::{BridgeError, BridgeResult};
use tracing_subscriber::EnvFilter;

/// Build the level filter: `RUST_LOG` when set, otherwise the configured level.
pub fn env_filter(config: &LoggingConfig) -> BridgeResult<EnvFilter> {
    match EnvFilter::try_from_default_env() {
        Ok(filter) => Ok(filter),
        Err(_) => EnvFilter::try_new(&config.level).map_err(|e| {
            BridgeError::Logging(format!("invalid log level '{}': {e}", config.level))
        }),
    }
}

/// Install the global subscriber, writing to stderr.
pub fn init(config: &LoggingConfig) -> BridgeResult<()> {
    let filter = env_filter(config)?;
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    let result = match config.format {
        LogFormat::Json => builder.json().try_init(),
        LogFormat::Pretty => builder.pretty().try_init(),
        LogFormat::Compact => builder.compact().try_init(),
    };
    result.map_err(|e| BridgeError::Logging(e.to_string()))
}
