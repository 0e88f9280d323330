//! Structured Logger
//!
//! Wraps `tracing` with a console layer and a daily rolling NDJSON file,
//! with `RUST_LOG` overriding the configured level.

use std::path::Path;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// File name prefix of the rolling log (`modhost.log.YYYY-MM-DD`).
pub const LOG_FILE_PREFIX: &str = "modhost.log";

/// Initialize the global logger. Returns false if one was already installed.
pub fn init_logger<P: AsRef<Path>>(log_dir: P, level: &str, json_console: bool) -> bool {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let file_appender = RollingFileAppender::new(Rotation::DAILY, log_dir, LOG_FILE_PREFIX);
    let file_layer = fmt::layer().json().with_writer(file_appender).with_ansi(false);

    let registry = tracing_subscriber::registry().with(env_filter).with(file_layer);
    let result = if json_console {
        registry.with(fmt::layer().json().with_writer(std::io::stderr)).try_init()
    } else {
        registry
            .with(fmt::layer().with_writer(std::io::stderr).with_target(false).with_ansi(true))
            .try_init()
    };
    result.is_ok()
}
