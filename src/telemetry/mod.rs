//! Tracing subscriber setup
//!
//! The crate only emits `tracing` events (targets under `wirelink::`).
//! Applications that do not install their own subscriber can use the
//! helpers here, available with the `telemetry` feature.
//!
//! ## Example
//!
//! ```rust,ignore
//! use wirelink::telemetry::{init_subscriber, OutputFormat, SubscriberConfig};
//!
//! let config = SubscriberConfig::builder()
//!     .log_level(tracing::Level::DEBUG)
//!     .output_format(OutputFormat::Json)
//!     .build();
//! let _guard = init_subscriber(config)?;
//! ```

use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::writer::BoxMakeWriter;

/// Environment variable holding the log level.
pub const LOG_LEVEL_ENV: &str = "WIRELINK_LOG_LEVEL";
/// Environment variable holding the output format.
pub const LOG_FORMAT_ENV: &str = "WIRELINK_LOG_FORMAT";
/// Environment variable holding the log file path.
pub const LOG_FILE_ENV: &str = "WIRELINK_LOG_FILE";

/// Subscriber setup failure.
#[derive(Error, Debug)]
pub enum TelemetryError {
    #[error("invalid log level '{0}', expected one of trace, debug, info, warn, error")]
    InvalidLevel(String),

    #[error("invalid log format '{0}', expected one of text, json, json-compact")]
    InvalidFormat(String),

    #[error("invalid log file path '{}'", .0.display())]
    InvalidLogFile(PathBuf),

    #[error("failed to initialize tracing: {0}")]
    Init(String),
}

/// Output format for log records
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// Human-readable text
    #[default]
    Text,
    /// JSON with span context
    Json,
    /// JSON with event fields flattened to the top level
    JsonCompact,
}

impl std::str::FromStr for OutputFormat {
    type Err = TelemetryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "text" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            "json-compact" => Ok(Self::JsonCompact),
            _ => Err(TelemetryError::InvalidFormat(s.to_string())),
        }
    }
}

/// Configuration for the tracing subscriber
#[derive(Debug, Clone, PartialEq)]
pub struct SubscriberConfig {
    pub log_level: tracing::Level,
    pub output_format: OutputFormat,
    /// Write to stdout when no log file is set
    pub enable_console: bool,
    /// Write to this file instead of stdout
    pub log_file: Option<PathBuf>,
}

impl Default for SubscriberConfig {
    fn default() -> Self {
        Self {
            log_level: tracing::Level::INFO,
            output_format: OutputFormat::Text,
            enable_console: true,
            log_file: None,
        }
    }
}

impl SubscriberConfig {
    pub fn builder() -> SubscriberConfigBuilder {
        SubscriberConfigBuilder::default()
    }

    /// Debug level text on stdout
    pub fn debug() -> Self {
        Self {
            log_level: tracing::Level::DEBUG,
            ..Self::default()
        }
    }

    /// Warn level JSON written to `log_file`
    pub fn production(log_file: PathBuf) -> Self {
        Self {
            log_level: tracing::Level::WARN,
            output_format: OutputFormat::Json,
            enable_console: false,
            log_file: Some(log_file),
        }
    }

    /// Defaults overridden by `WIRELINK_LOG_LEVEL`, `WIRELINK_LOG_FORMAT`
    /// and `WIRELINK_LOG_FILE`.
    pub fn from_env() -> Result<Self, TelemetryError> {
        let mut builder = Self::builder();
        if let Ok(level) = std::env::var(LOG_LEVEL_ENV) {
            builder = builder.log_level_str(&level)?;
        }
        if let Ok(format) = std::env::var(LOG_FORMAT_ENV) {
            builder = builder.output_format(format.parse()?);
        }
        if let Ok(path) = std::env::var(LOG_FILE_ENV) {
            builder = builder.log_file(PathBuf::from(path));
        }
        Ok(builder.build())
    }
}

/// Builder for `SubscriberConfig`
#[derive(Debug, Default)]
pub struct SubscriberConfigBuilder {
    log_level: Option<tracing::Level>,
    output_format: Option<OutputFormat>,
    enable_console: Option<bool>,
    log_file: Option<PathBuf>,
}

impl SubscriberConfigBuilder {
    pub fn log_level(mut self, level: tracing::Level) -> Self {
        self.log_level = Some(level);
        self
    }

    /// Sets the level from its name, case-insensitively.
    pub fn log_level_str(mut self, level: &str) -> Result<Self, TelemetryError> {
        let parsed = match level.trim().to_lowercase().as_str() {
            "trace" => tracing::Level::TRACE,
            "debug" => tracing::Level::DEBUG,
            "info" => tracing::Level::INFO,
            "warn" => tracing::Level::WARN,
            "error" => tracing::Level::ERROR,
            _ => return Err(TelemetryError::InvalidLevel(level.to_string())),
        };
        self.log_level = Some(parsed);
        Ok(self)
    }

    pub fn output_format(mut self, format: OutputFormat) -> Self {
        self.output_format = Some(format);
        self
    }

    pub fn enable_console(mut self, enable: bool) -> Self {
        self.enable_console = Some(enable);
        self
    }

    pub fn log_file(mut self, path: PathBuf) -> Self {
        self.log_file = Some(path);
        self
    }

    pub fn build(self) -> SubscriberConfig {
        SubscriberConfig {
            log_level: self.log_level.unwrap_or(tracing::Level::INFO),
            output_format: self.output_format.unwrap_or_default(),
            enable_console: self.enable_console.unwrap_or(true),
            log_file: self.log_file,
        }
    }
}

/// Installs a global subscriber for the `wirelink` targets.
///
/// Returns the file writer's guard when a log file is configured; it must be
/// kept alive for buffered records to be flushed. An already installed
/// global subscriber is not an error; nothing is set up in that case.
pub fn init_subscriber(config: SubscriberConfig) -> Result<Option<WorkerGuard>, TelemetryError> {
    if tracing::dispatcher::has_been_set() {
        tracing::debug!(target: "wirelink::telemetry", "global subscriber already installed");
        return Ok(None);
    }

    let filter = format!("wirelink={}", level_name(config.log_level));
    let (writer, guard) = match &config.log_file {
        Some(path) => {
            let (directory, file_name) = split_log_path(path)?;
            let appender = tracing_appender::rolling::never(directory, file_name);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (BoxMakeWriter::new(writer), Some(guard))
        }
        None if config.enable_console => (BoxMakeWriter::new(std::io::stdout), None),
        None => (BoxMakeWriter::new(std::io::sink), None),
    };

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_target(true);
    let init_result = match config.output_format {
        OutputFormat::Json => builder
            .with_thread_ids(true)
            .with_thread_names(true)
            .json()
            .try_init(),
        OutputFormat::JsonCompact => builder
            .with_thread_ids(true)
            .with_thread_names(true)
            .json()
            .flatten_event(true)
            .with_current_span(false)
            .try_init(),
        OutputFormat::Text => builder.try_init(),
    };

    init_result.map_err(|e| TelemetryError::Init(e.to_string()))?;
    Ok(guard)
}

fn level_name(level: tracing::Level) -> &'static str {
    match level {
        tracing::Level::TRACE => "trace",
        tracing::Level::DEBUG => "debug",
        tracing::Level::INFO => "info",
        tracing::Level::WARN => "warn",
        tracing::Level::ERROR => "error",
    }
}

fn split_log_path(path: &Path) -> Result<(&Path, &std::ffi::OsStr), TelemetryError> {
    let file_name = path
        .file_name()
        .ok_or_else(|| TelemetryError::InvalidLogFile(path.to_path_buf()))?;
    let directory = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    Ok((directory, file_name))
}

pub fn init_default() -> Result<Option<WorkerGuard>, TelemetryError> {
    init_subscriber(SubscriberConfig::default())
}

pub fn init_debug() -> Result<Option<WorkerGuard>, TelemetryError> {
    init_subscriber(SubscriberConfig::debug())
}

pub fn init_production(log_file: PathBuf) -> Result<Option<WorkerGuard>, TelemetryError> {
    init_subscriber(SubscriberConfig::production(log_file))
}

/// [`init_subscriber`] with [`SubscriberConfig::from_env`].
pub fn init_from_env() -> Result<Option<WorkerGuard>, TelemetryError> {
    init_subscriber(SubscriberConfig::from_env()?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_parses_levels_and_formats() {
        let config = SubscriberConfig::builder()
            .log_level_str("DEBUG")
            .unwrap()
            .output_format("json-compact".parse().unwrap())
            .enable_console(false)
            .build();
        assert_eq!(config.log_level, tracing::Level::DEBUG);
        assert_eq!(config.output_format, OutputFormat::JsonCompact);
        assert!(!config.enable_console);
    }

    #[test]
    fn rejects_unknown_names() {
        assert!(matches!(
            SubscriberConfig::builder().log_level_str("loud"),
            Err(TelemetryError::InvalidLevel(_))
        ));
        assert!(matches!(
            "yaml".parse::<OutputFormat>(),
            Err(TelemetryError::InvalidFormat(_))
        ));
    }

    #[test]
    fn log_paths_split_into_directory_and_file() {
        let (dir, file) = split_log_path(Path::new("logs/app.log")).unwrap();
        assert_eq!(dir, Path::new("logs"));
        assert_eq!(file, "app.log");
        let (dir, _) = split_log_path(Path::new("app.log")).unwrap();
        assert_eq!(dir, Path::new("."));
        assert!(split_log_path(Path::new("/")).is_err());
    }

    #[test]
    fn repeated_initialization_is_tolerated() {
        let _first = init_default();
        assert!(tracing::dispatcher::has_been_set());
        assert!(init_debug().unwrap().is_none());

        let dir = std::env::temp_dir().join("wirelink-telemetry-unused");
        assert!(init_production(dir.join("app.log")).unwrap().is_none());
        assert!(!dir.exists());
    }
}
