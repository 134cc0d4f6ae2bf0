//! Logging setup for the scrapper.
//!
//! `RUST_LOG` wins when set. Otherwise the configured level applies to the
//! scrapper itself while the HTTP and database stacks stay at `warn`.

use std::fs::{self, OpenOptions};
use std::path::Path;
use std::sync::Arc;

use tracing::Level;
use tracing_subscriber::fmt::writer::MakeWriterExt;
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

use crate::config::LoggingConfig;
use crate::{Result, ScrapperError};

/// Dependencies that are capped at `warn` unless tracing everything.
const QUIET_TARGETS: &[&str] = &["sqlx", "hyper", "hyper_util", "reqwest", "rustls", "h2"];

/// Parse log level string to tracing Level.
fn parse_level(level: &str) -> Level {
    match level.trim().to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" | "warning" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    }
}

fn default_filter(level: &str) -> EnvFilter {
    let level = parse_level(level);
    let mut directives = vec![level.as_str().to_lowercase()];
    if level != Level::TRACE {
        directives.extend(QUIET_TARGETS.iter().map(|target| format!("{target}=warn")));
    }
    EnvFilter::new(directives.join(","))
}

fn build_filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter(level))
}

/// Initialize logging to stdout and, unless `config.file` is empty, to an
/// append-only log file.
///
/// Fails if the log file cannot be opened or a global subscriber is
/// already installed.
pub fn init(config: &LoggingConfig) -> Result<()> {
    if config.file.is_empty() {
        return try_init_console(&config.level);
    }

    let path = Path::new(&config.file);
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent)?;
        }
    }

    let log_file = Arc::new(OpenOptions::new().create(true).append(true).open(path)?);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stdout.and(log_file))
                .with_ansi(false)
                .with_target(true),
        )
        .with(build_filter(&config.level))
        .try_init()
        .map_err(|e| ScrapperError::Config(format!("failed to install logger: {e}")))
}

fn try_init_console(level: &str) -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stdout)
                .with_target(true),
        )
        .with(build_filter(level))
        .try_init()
        .map_err(|e| ScrapperError::Config(format!("failed to install logger: {e}")))
}

/// Initialize console-only logging. Does nothing if a logger is already set.
pub fn init_console_only(level: &str) {
    let _ = try_init_console(level);
}
