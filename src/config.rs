use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Application directory name under the platform config and data dirs
pub const APP_DIR: &str = "novel-wizard";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub paths: PathsConfig,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub ui: UiConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    /// Directory holding storage.json and logs
    #[serde(default = "default_data_dir")]
    pub data: String,
    /// Directory exports are written to
    #[serde(default = "default_exports_dir")]
    pub exports: String,
}

fn default_data_dir() -> String {
    dirs::data_dir()
        .map(|dir| dir.join(APP_DIR).to_string_lossy().to_string())
        .unwrap_or_else(|| format!(".{}", APP_DIR))
}

fn default_exports_dir() -> String {
    dirs::download_dir()
        .map(|dir| dir.to_string_lossy().to_string())
        .unwrap_or_else(|| "exports".to_string())
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            data: default_data_dir(),
            exports: default_exports_dir(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Quiet period before an edit is written to storage (default: 1000)
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
}

fn default_debounce_ms() -> u64 {
    1000
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            debounce_ms: default_debounce_ms(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UiConfig {
    /// Event poll interval for the TUI loop
    #[serde(default = "default_tick_rate_ms")]
    pub tick_rate_ms: u64,
    /// Show the progress bar after a section is generated
    #[serde(default = "default_animate_progress")]
    pub animate_progress: bool,
    /// Delay between 5% progress steps
    #[serde(default = "default_progress_step_ms")]
    pub progress_step_ms: u64,
}

fn default_tick_rate_ms() -> u64 {
    100
}

fn default_animate_progress() -> bool {
    true
}

fn default_progress_step_ms() -> u64 {
    100
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            tick_rate_ms: default_tick_rate_ms(),
            animate_progress: default_animate_progress(),
            progress_step_ms: default_progress_step_ms(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Whether to log to file in TUI mode (false = stderr for debugging)
    #[serde(default = "default_log_to_file")]
    pub to_file: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_to_file() -> bool {
    true
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            to_file: default_log_to_file(),
        }
    }
}

impl Config {
    /// Path to the user config file, e.g. `~/.config/novel-wizard/config.toml`
    pub fn user_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(APP_DIR).join("config.toml"))
    }

    pub fn load(config_path: Option<&str>) -> Result<Self> {
        // Start with embedded defaults so the wizard works without config files
        let defaults = Config::default();
        let defaults_json =
            serde_json::to_string(&defaults).context("Failed to serialize default config")?;

        let mut builder = config::Config::builder().add_source(config::File::from_str(
            &defaults_json,
            config::FileFormat::Json,
        ));

        // User config (optional global overrides)
        if let Some(user_config) = Self::user_config_path() {
            if user_config.exists() {
                builder = builder.add_source(config::File::from(user_config));
            }
        }

        // Explicit config file (CLI override)
        if let Some(path) = config_path {
            builder = builder.add_source(config::File::with_name(path));
        }

        // Environment variables, e.g. NOVEL_WIZARD__SESSION__DEBOUNCE_MS=500
        builder = builder.add_source(
            config::Environment::with_prefix("NOVEL_WIZARD")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build().context("Failed to load configuration")?;
        config
            .try_deserialize()
            .context("Failed to deserialize configuration")
    }

    /// Save config to the user config file and return its path
    pub fn save(&self) -> Result<PathBuf> {
        let config_path =
            Self::user_config_path().context("Could not determine the user config directory")?;

        // Ensure parent directory exists
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        let toml_str =
            toml::to_string_pretty(self).context("Failed to serialize config to TOML")?;

        std::fs::write(&config_path, toml_str).context("Failed to write config file")?;

        Ok(config_path)
    }

    /// Get absolute path to data directory
    pub fn data_path(&self) -> PathBuf {
        absolute(&self.paths.data)
    }

    /// Get absolute path to exports directory
    pub fn exports_path(&self) -> PathBuf {
        absolute(&self.paths.exports)
    }

    /// Get absolute path to logs directory
    pub fn logs_path(&self) -> PathBuf {
        self.data_path().join("logs")
    }

    pub fn debounce_delay(&self) -> Duration {
        Duration::from_millis(self.session.debounce_ms)
    }

    /// Event poll timeout, never zero
    pub fn tick_rate(&self) -> Duration {
        Duration::from_millis(self.ui.tick_rate_ms.max(1))
    }

    /// Delay between progress frames, never zero
    pub fn progress_step(&self) -> Duration {
        Duration::from_millis(self.ui.progress_step_ms.max(1))
    }
}

fn absolute(path: &str) -> PathBuf {
    let path = PathBuf::from(path);
    if path.is_absolute() {
        path
    } else {
        std::env::current_dir().unwrap_or_default().join(path)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            paths: PathsConfig::default(),
            session: SessionConfig::default(),
            ui: UiConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}
