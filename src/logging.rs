//! Logging setup for binaries embedding the engine
//!
//! The library only emits `tracing` events. Installing a subscriber is left
//! to the process entry point, which calls [`init_logging`] once.
//!
//! `RUST_LOG` takes precedence over [`LoggingConfig::filter`]. When a log
//! directory is configured, events are also written to a daily rolling file
//! through a non-blocking writer; keep the returned guard alive until exit
//! so buffered lines are flushed.

use crate::config::LoggingConfig;
use crate::error::{EngineError, Result};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// File name prefix of the rolling log
pub const LOG_FILE_PREFIX: &str = "streamfx.log";

/// Parse a filter directive such as `info,streamfx_rs=debug`
pub fn parse_filter(directive: &str) -> Result<EnvFilter> {
    EnvFilter::try_new(directive).map_err(|e| {
        EngineError::Config(format!("Invalid log filter '{}': {}", directive, e))
    })
}

/// Install the global subscriber
pub fn init_logging(config: &LoggingConfig) -> Result<Option<WorkerGuard>> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => parse_filter(&config.filter)?,
    };

    let (file_layer, guard) = match &config.directory {
        Some(dir) => {
            std::fs::create_dir_all(dir)?;
            let appender = tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer().with_writer(writer).with_ansi(false);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(file_layer)
        .try_init()
        .map_err(|e| EngineError::Config(format!("Logging already initialized: {}", e)))?;

    Ok(guard)
}
