//! Automatic logging module for sshgate.
//!
//! Provides file-based logging with automatic cleanup, plus an optional
//! stderr layer enabled by `-v`. Logs are stored in `<home>/logs/`.

use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::{Duration, SystemTime};

use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, fmt};

/// Default log retention in hours.
pub const DEFAULT_LOG_RETENTION_HOURS: u32 = 24;

/// Default log level.
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogConfig {
    /// Directory holding log files.
    pub dir: PathBuf,
    /// Log retention period in hours.
    pub retention_hours: u32,
    /// Log level (trace, debug, info, warn, error).
    pub level: String,
    /// Whether file logging is enabled.
    pub enabled: bool,
    /// Stderr verbosity from `-v` flags (0 = silent).
    pub verbosity: u8,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("logs"),
            retention_hours: DEFAULT_LOG_RETENTION_HOURS,
            level: DEFAULT_LOG_LEVEL.to_string(),
            enabled: true,
            verbosity: 0,
        }
    }
}

impl LogConfig {
    /// Parses log level from string.
    #[must_use]
    pub fn parse_level(value: &str) -> String {
        match value.to_lowercase().as_str() {
            "trace" => "trace".to_string(),
            "debug" => "debug".to_string(),
            "info" => "info".to_string(),
            "warn" | "warning" => "warn".to_string(),
            "error" => "error".to_string(),
            "off" | "none" | "disabled" => "off".to_string(),
            _ => DEFAULT_LOG_LEVEL.to_string(),
        }
    }

    /// Parses retention hours from string.
    #[must_use]
    pub fn parse_retention(value: &str) -> u32 {
        value.trim().parse().unwrap_or(DEFAULT_LOG_RETENTION_HOURS)
    }

    /// Parses an on/off switch, keeping `default` for unknown values.
    #[must_use]
    pub fn parse_enabled(value: &str, default: bool) -> bool {
        match value.trim().to_lowercase().as_str() {
            "true" | "yes" | "1" | "on" => true,
            "false" | "no" | "0" | "off" => false,
            _ => default,
        }
    }

    fn stderr_level(&self) -> Option<LevelFilter> {
        match self.verbosity {
            0 => None,
            1 => Some(LevelFilter::INFO),
            2 => Some(LevelFilter::DEBUG),
            _ => Some(LevelFilter::TRACE),
        }
    }
}

/// Returns a fresh log file path inside `dir`.
#[must_use]
pub fn log_file_path(dir: &Path) -> PathBuf {
    let now = chrono::Local::now();
    let filename = format!("sshgate_{}.log", now.format("%Y-%m-%d_%H-%M-%S"));
    dir.join(filename)
}

/// Cleans up log files in `dir` older than the retention period.
///
/// # Errors
/// Returns error if directory cannot be read.
pub fn cleanup_old_logs(dir: &Path, retention_hours: u32) -> io::Result<u32> {
    if !dir.exists() {
        return Ok(0);
    }

    let retention_duration = Duration::from_secs(u64::from(retention_hours) * 3600);
    let now = SystemTime::now();
    let mut deleted_count = 0;

    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();

        // Only process .log files
        if path.extension().and_then(|e| e.to_str()) != Some("log") {
            continue;
        }

        let Ok(modified) = entry.metadata().and_then(|m| m.modified()) else {
            continue;
        };
        if let Ok(age) = now.duration_since(modified) {
            if age > retention_duration && fs::remove_file(&path).is_ok() {
                deleted_count += 1;
            }
        }
    }

    Ok(deleted_count)
}

/// Initializes the logging system.
///
/// Returns the path of the log file, if file logging is enabled.
///
/// # Errors
/// Returns error if the log file cannot be created or a global
/// subscriber is already installed.
pub fn init(config: &LogConfig) -> io::Result<Option<PathBuf>> {
    let file_enabled = config.enabled && config.level != "off";
    let stderr_level = config.stderr_level();
    if !file_enabled && stderr_level.is_none() {
        return Ok(None);
    }

    let mut deleted = 0;
    let mut log_path = None;
    let file_layer = if file_enabled {
        fs::create_dir_all(&config.dir)?;
        deleted = cleanup_old_logs(&config.dir, config.retention_hours)?;

        let path = log_file_path(&config.dir);
        let log_file = File::create(&path)?;
        log_path = Some(path);

        // RUST_LOG overrides the configured level
        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));
        Some(
            fmt::layer()
                .with_writer(Mutex::new(log_file))
                .with_ansi(false)
                .with_target(true)
                .with_thread_ids(false)
                .with_line_number(false)
                .with_filter(filter),
        )
    } else {
        None
    };

    let stderr_layer = stderr_level.map(|level| {
        fmt::layer()
            .compact()
            .with_writer(io::stderr)
            .with_target(false)
            .with_filter(level)
    });

    tracing_subscriber::registry()
        .with(file_layer)
        .with(stderr_layer)
        .try_init()
        .map_err(io::Error::other)?;

    tracing::info!("sshgate {} logging initialized", env!("CARGO_PKG_VERSION"));
    if let Some(ref path) = log_path {
        tracing::info!("Log file: {}", path.display());
        tracing::info!("Log level: {}", config.level);
        tracing::info!("Log retention: {} hours", config.retention_hours);
    }
    if deleted > 0 {
        tracing::info!("Cleaned up {} old log file(s)", deleted);
    }

    Ok(log_path)
}
