//! Structured logging for lifecycle hooks.
//!
//! This module sets up a tracing subscriber from [`LoggingConfig`], supporting
//! different output formats and log levels. `RUST_LOG`, when set, overrides the
//! configured level with its own directives. Hook dispatch itself only emits
//! events; installing a subscriber is up to the application, through
//! [`init`] or [`crate::init`].


use crate::config::{LogFormat, LogLevel, LoggingConfig};
use std::path::Path;
use tracing::Level;
use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::writer::{BoxMakeWriter, MakeWriterExt};

/// Error type for logging operations
#[derive(Debug, thiserror::Error)]
pub enum LogError {
    /// IO error occurred
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Error parsing log level
    #[error("Invalid log level: {0}")]
    InvalidLogLevel(String),

    /// Error in subscriber setup
    #[error("Subscriber error: {0}")]
    SubscriberError(#[from] Box<dyn std::error::Error + Send + Sync>),
}

/// Result type for logging operations
pub type Result<T> = std::result::Result<T, LogError>;

/// Initialize the logging system with the given configuration.
///
/// When logging to a file, the returned guard must be kept alive for buffered
/// lines to be flushed. Calling this when a global subscriber is already set is
/// not an error.
pub fn init(config: &LoggingConfig) -> Result<Option<WorkerGuard>> {
    let filter = env_filter(log_level_to_level(&config.level));

    let result = match config.format {
        LogFormat::Json => init_json_logging(filter, config),
        LogFormat::Compact => init_compact_logging(filter, config),
        LogFormat::Pretty => init_pretty_logging(filter, config),
        LogFormat::Default => init_default_logging(filter, config),
    };

    // If the error is "already set", ignore it
    if let Err(LogError::SubscriberError(ref e)) = result
        && is_already_set(&**e)
    {
        return Ok(None);
    }

    result
}

fn env_filter(level: Level) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.as_str().to_ascii_lowercase()))
}

fn is_already_set(err: &(dyn std::error::Error + Send + Sync)) -> bool {
    let message = err.to_string();
    message.contains("SetGlobalDefaultError") || message.contains("already been set")
}

/// Writer for the configured outputs, and the file guard when a file is one
/// of them. `None` when no output is enabled.
fn make_writer(config: &LoggingConfig) -> Result<Option<(BoxMakeWriter, Option<WorkerGuard>)>> {
    match (&config.file, config.stdout) {
        (Some(file_path), false) => {
            let (writer, guard) = create_non_blocking_file(file_path)?;
            Ok(Some((BoxMakeWriter::new(writer), Some(guard))))
        }
        (Some(file_path), true) => {
            let (writer, guard) = create_non_blocking_file(file_path)?;
            Ok(Some((
                BoxMakeWriter::new(writer.and(std::io::stdout)),
                Some(guard),
            )))
        }
        (None, true) => Ok(Some((BoxMakeWriter::new(std::io::stdout), None))),
        (None, false) => Ok(None),
    }
}

// Escape codes only go to a terminal-only setup
macro_rules! install {
    ($subscriber:expr, $config:expr) => {{
        match make_writer($config)? {
            Some((writer, guard)) => {
                $subscriber
                    .with_ansi($config.file.is_none())
                    .with_writer(writer)
                    .try_init()?;
                Ok(guard)
            }
            None => Ok(None),
        }
    }};
}

/// Initialize logging with JSON formatting
fn init_json_logging(filter: EnvFilter, config: &LoggingConfig) -> Result<Option<WorkerGuard>> {
    install!(
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_target(true)
            .with_line_number(true)
            .with_thread_ids(true),
        config
    )
}

/// Initialize logging with compact formatting
fn init_compact_logging(filter: EnvFilter, config: &LoggingConfig) -> Result<Option<WorkerGuard>> {
    install!(
        tracing_subscriber::fmt()
            .compact()
            .with_env_filter(filter)
            .with_target(true)
            .with_line_number(true),
        config
    )
}

/// Initialize logging with pretty formatting
fn init_pretty_logging(filter: EnvFilter, config: &LoggingConfig) -> Result<Option<WorkerGuard>> {
    install!(
        tracing_subscriber::fmt()
            .pretty()
            .with_env_filter(filter)
            .with_target(true)
            .with_line_number(true)
            .with_thread_ids(true),
        config
    )
}

fn init_default_logging(filter: EnvFilter, config: &LoggingConfig) -> Result<Option<WorkerGuard>> {
    install!(
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true),
        config
    )
}

/// Create a non-blocking file writer.
fn create_non_blocking_file(path: impl AsRef<Path>) -> Result<(NonBlocking, WorkerGuard)> {
    let path = path.as_ref();

    // Ensure the directory exists
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
        && !parent.exists()
    {
        std::fs::create_dir_all(parent)?;
    }

    let file_appender = tracing_appender::rolling::never(
        path.parent().unwrap_or_else(|| Path::new(".")),
        path.file_name().unwrap_or_default(),
    );

    Ok(tracing_appender::non_blocking(file_appender))
}

/// Parse a log level string into a LogLevel enum.
pub fn parse_log_level(level: &str) -> Result<LogLevel> {
    level
        .parse()
        .map_err(|_| LogError::InvalidLogLevel(level.to_string()))
}

/// Convert a LogLevel to a tracing::Level.
pub fn log_level_to_level(level: &LogLevel) -> Level {
    match level {
        LogLevel::Trace => Level::TRACE,
        LogLevel::Debug => Level::DEBUG,
        LogLevel::Info => Level::INFO,
        LogLevel::Warn => Level::WARN,
        LogLevel::Error => Level::ERROR,
    }
}

/// Convert a tracing::Level to a LogLevel enum.
pub fn level_to_log_level(level: Level) -> LogLevel {
    match level {
        Level::TRACE => LogLevel::Trace,
        Level::DEBUG => LogLevel::Debug,
        Level::INFO => LogLevel::Info,
        Level::WARN => LogLevel::Warn,
        Level::ERROR => LogLevel::Error,
    }
}
