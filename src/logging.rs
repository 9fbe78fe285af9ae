//! Logging initialization for novel-wizard.
//!
//! TUI mode: logs to `<data>/logs/novel-wizard-{datetime}.log`
//! CLI mode: logs to stderr

use anyhow::Result;
use std::path::{Path, PathBuf};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Config;

/// Result of logging initialization
pub struct LoggingHandle {
    /// Guard that must be kept alive for the duration of the program.
    /// When dropped, ensures all buffered logs are flushed.
    pub _guard: Option<WorkerGuard>,

    /// Path to the log file (only set in TUI mode with file logging enabled)
    pub log_file_path: Option<PathBuf>,
}

/// Effective filter directive: `--debug` beats the configured level
fn log_level(config: &Config, debug_override: bool) -> String {
    if debug_override {
        "debug".to_string()
    } else {
        config.logging.level.clone()
    }
}

/// Timestamped log file name inside `logs_dir`
fn log_file_name(logs_dir: &Path) -> (String, PathBuf) {
    let timestamp = chrono::Utc::now().format("%Y%m%dT%H%M%SZ");
    let log_filename = format!("novel-wizard-{}.log", timestamp);
    let log_file_path = logs_dir.join(&log_filename);
    (log_filename, log_file_path)
}

/// Initialize logging based on mode and configuration.
///
/// Returns a `LoggingHandle` that must be kept alive for the duration of the
/// program.
pub fn init_logging(
    config: &Config,
    is_tui_mode: bool,
    debug_override: bool,
) -> Result<LoggingHandle> {
    let filter = tracing_subscriber::EnvFilter::new(
        std::env::var("RUST_LOG").unwrap_or(log_level(config, debug_override)),
    );

    if is_tui_mode && config.logging.to_file {
        // The terminal belongs to the wizard, so logs go to a file
        let logs_dir = config.logs_path();
        std::fs::create_dir_all(&logs_dir)?;

        let (log_filename, log_file_path) = log_file_name(&logs_dir);
        let file_appender = tracing_appender::rolling::never(&logs_dir, &log_filename);
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

        tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(false)
                    .with_ansi(false) // No ANSI codes in log files
                    .with_writer(non_blocking),
            )
            .init();

        Ok(LoggingHandle {
            _guard: Some(guard),
            log_file_path: Some(log_file_path),
        })
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(false)
                    .with_writer(std::io::stderr),
            )
            .init();

        Ok(LoggingHandle {
            _guard: None,
            log_file_path: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn test_config(temp_dir: &TempDir) -> Config {
        let mut config = Config::default();
        config.paths.data = temp_dir.path().to_string_lossy().to_string();
        config
    }

    #[test]
    fn test_logs_live_under_data_dir() {
        let temp_dir = TempDir::new().unwrap();
        let config = test_config(&temp_dir);

        let logs_dir = config.logs_path();
        assert!(logs_dir.ends_with("logs"));
        assert!(logs_dir.starts_with(temp_dir.path()));
    }

    #[test]
    fn test_log_file_name_format() {
        let temp_dir = TempDir::new().unwrap();
        let (name, path) = log_file_name(temp_dir.path());

        assert!(name.starts_with("novel-wizard-"));
        assert!(name.ends_with("Z.log"));
        assert_eq!(path, temp_dir.path().join(name));
    }

    #[test]
    fn test_debug_flag_overrides_level() {
        let temp_dir = TempDir::new().unwrap();
        let mut config = test_config(&temp_dir);
        config.logging.level = "warn".to_string();

        assert_eq!(log_level(&config, false), "warn");
        assert_eq!(log_level(&config, true), "debug");
    }
}
