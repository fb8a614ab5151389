use std::path::PathBuf;

use directories::ProjectDirs;
use tracing::Level;
use tracing_appender::{
    non_blocking::WorkerGuard,
    rolling::{RollingFileAppender, Rotation},
};
use tracing_subscriber::{
    filter::EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt, Layer,
};

/// Configuration for the logging system
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Log level for console output
    pub console_level: Level,
    /// Log level for file output
    pub file_level: Level,
    /// Directory where log files should be written
    pub log_dir: Option<PathBuf>,
    /// Whether to enable JSON formatted logs for structured output
    pub json_format: bool,
    /// Whether to also log to stderr
    pub console: bool,
    /// Maximum number of log files to keep for rotation
    pub max_files: Option<usize>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            console_level: Level::WARN,
            file_level: Level::DEBUG,
            log_dir: Some(Self::default_log_dir()),
            json_format: false,
            console: false,
            max_files: Some(10),
        }
    }
}

impl LoggingConfig {
    /// Get the OS-appropriate default log directory
    pub fn default_log_dir() -> PathBuf {
        if let Some(proj_dirs) = ProjectDirs::from("", "", crate::TITLE) {
            // On Linux: ~/.cache/uanti
            // On macOS: ~/Library/Caches/uanti
            // On Windows: %LOCALAPPDATA%\uanti\cache
            proj_dirs.cache_dir().to_path_buf()
        } else {
            PathBuf::from("uanti-logs")
        }
    }

    /// Create logging configuration from environment variables
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(level) = std::env::var("UANTI_LOG_LEVEL") {
            config = config.with_level(&level);
        }

        if let Ok(log_dir) = std::env::var("UANTI_LOG_DIR") {
            config.log_dir = Some(PathBuf::from(log_dir));
        }

        if std::env::var("UANTI_NO_FILE_LOGS").is_ok() {
            config.log_dir = None;
        }

        if std::env::var("UANTI_JSON_LOGS").is_ok() {
            config.json_format = true;
        }

        if std::env::var("UANTI_CONSOLE_LOGS").is_ok() {
            config.console = true;
        }

        config
    }

    /// Use `level` for both outputs; unknown levels are ignored
    pub fn with_level(mut self, level: &str) -> Self {
        if let Ok(parsed_level) = level.parse::<Level>() {
            self.console_level = parsed_level;
            self.file_level = parsed_level;
        }
        self
    }
}

fn env_filter(level: Level) -> EnvFilter {
    EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy()
}

/// Initialize the logging system with the given configuration.
///
/// The returned guard flushes the file log when dropped.
pub fn init_logging(
    config: LoggingConfig,
) -> Result<Option<WorkerGuard>, Box<dyn std::error::Error>> {
    let mut layers = vec![];
    let mut guard = None;

    if let Some(log_dir) = &config.log_dir {
        std::fs::create_dir_all(log_dir)?;

        let mut appender = RollingFileAppender::builder()
            .rotation(Rotation::DAILY)
            .filename_prefix(crate::TITLE)
            .filename_suffix("log");
        if let Some(max_files) = config.max_files {
            appender = appender.max_log_files(max_files);
        }
        let (non_blocking, file_guard) = tracing_appender::non_blocking(appender.build(log_dir)?);
        guard = Some(file_guard);

        let file_layer = if config.json_format {
            fmt::layer()
                .json()
                .with_writer(non_blocking)
                .with_filter(env_filter(config.file_level))
                .boxed()
        } else {
            fmt::layer()
                .with_ansi(false)
                .with_writer(non_blocking)
                .with_filter(env_filter(config.file_level))
                .boxed()
        };

        layers.push(file_layer);
    }

    // stdout carries command output
    if config.console {
        let console_layer = fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(true)
            .with_file(false)
            .with_line_number(false)
            .with_filter(env_filter(config.console_level))
            .boxed();

        layers.push(console_layer);
    }

    tracing_subscriber::registry().with(layers).try_init()?;

    Ok(guard)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = LoggingConfig::default();
        assert_eq!(config.file_level, Level::DEBUG);
        assert!(!config.console);
        assert!(config.log_dir.is_some());
    }

    #[test]
    fn test_with_level() {
        let config = LoggingConfig::default().with_level("trace");
        assert_eq!(config.console_level, Level::TRACE);
        assert_eq!(config.file_level, Level::TRACE);

        let config = LoggingConfig::default().with_level("loud");
        assert_eq!(config.console_level, Level::WARN);
    }
}
