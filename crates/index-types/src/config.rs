//! Configuration loading for the posting index tools.
//!
//! Layered config: defaults -> config file -> env vars -> CLI flags.
//! The default config file lives at `~/.config/posting-index/config.toml`.
//! Environment variables use the `INDEX_` prefix and `__` for nesting,
//! e.g. `INDEX_DB_PATH` or `INDEX_RECONCILER__QUEUE_CAPACITY`.

use config::{Config, Environment, File};
use directories::{BaseDirs, ProjectDirs};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::error::TypesError;

const APP_NAME: &str = "posting-index";

/// Settings for the background reconciliation worker.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReconcilerConfig {
    /// Maximum number of pending notifications before producers are
    /// made to wait.
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,

    /// How often the drain wait re-checks the task counters (ms).
    #[serde(default = "default_drain_poll_interval")]
    pub drain_poll_interval_ms: u64,

    /// How long callers wait for the queue to drain before giving up (ms).
    #[serde(default = "default_drain_timeout")]
    pub drain_timeout_ms: u64,
}

fn default_queue_capacity() -> usize {
    1000
}

fn default_drain_poll_interval() -> u64 {
    100
}

fn default_drain_timeout() -> u64 {
    5000
}

impl Default for ReconcilerConfig {
    fn default() -> Self {
        Self {
            queue_capacity: default_queue_capacity(),
            drain_poll_interval_ms: default_drain_poll_interval(),
            drain_timeout_ms: default_drain_timeout(),
        }
    }
}

impl ReconcilerConfig {
    /// Set the queue capacity.
    pub fn with_queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity;
        self
    }

    /// Set the drain poll interval in milliseconds.
    pub fn with_drain_poll_interval_ms(mut self, interval_ms: u64) -> Self {
        self.drain_poll_interval_ms = interval_ms;
        self
    }

    /// Drain poll interval as a [`Duration`].
    pub fn drain_poll_interval(&self) -> Duration {
        Duration::from_millis(self.drain_poll_interval_ms)
    }

    /// Drain timeout as a [`Duration`].
    pub fn drain_timeout(&self) -> Duration {
        Duration::from_millis(self.drain_timeout_ms)
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), TypesError> {
        if self.queue_capacity == 0 {
            return Err(TypesError::Config(
                "reconciler.queue_capacity must be > 0".to_string(),
            ));
        }
        if self.drain_poll_interval_ms == 0 {
            return Err(TypesError::Config(
                "reconciler.drain_poll_interval_ms must be > 0".to_string(),
            ));
        }
        Ok(())
    }
}

/// Main application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Path to RocksDB storage directory
    #[serde(default = "default_db_path")]
    pub db_path: String,

    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Reconciliation worker settings
    #[serde(default)]
    pub reconciler: ReconcilerConfig,
}

fn default_db_path() -> String {
    ProjectDirs::from("", "", APP_NAME)
        .map(|p| p.data_local_dir().join("db"))
        .unwrap_or_else(|| PathBuf::from("./data"))
        .to_string_lossy()
        .to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            log_level: default_log_level(),
            reconciler: ReconcilerConfig::default(),
        }
    }
}

impl Settings {
    /// Load settings with layered precedence:
    /// 1. Built-in defaults
    /// 2. Config file (~/.config/posting-index/config.toml)
    /// 3. CLI-specified config file (optional)
    /// 4. Environment variables (INDEX_*)
    ///
    /// CLI flags should be applied by the caller after this returns.
    pub fn load(cli_config_path: Option<&str>) -> Result<Self, TypesError> {
        let config_dir = ProjectDirs::from("", "", APP_NAME)
            .map(|p| p.config_dir().to_path_buf())
            .unwrap_or_else(|| PathBuf::from("."));

        let default_config_path = config_dir.join("config");

        let mut builder = Config::builder()
            .set_default("db_path", default_db_path())
            .map_err(|e| TypesError::Config(e.to_string()))?
            .set_default("log_level", default_log_level())
            .map_err(|e| TypesError::Config(e.to_string()))?
            .set_default("reconciler.queue_capacity", default_queue_capacity() as i64)
            .map_err(|e| TypesError::Config(e.to_string()))?
            .set_default(
                "reconciler.drain_poll_interval_ms",
                default_drain_poll_interval() as i64,
            )
            .map_err(|e| TypesError::Config(e.to_string()))?
            .set_default("reconciler.drain_timeout_ms", default_drain_timeout() as i64)
            .map_err(|e| TypesError::Config(e.to_string()))?
            .add_source(File::with_name(&default_config_path.to_string_lossy()).required(false));

        if let Some(path) = cli_config_path {
            builder = builder.add_source(File::with_name(path).required(true));
        }

        builder = builder.add_source(
            Environment::with_prefix("INDEX")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder
            .build()
            .map_err(|e| TypesError::Config(e.to_string()))?;

        let settings: Settings = config
            .try_deserialize()
            .map_err(|e| TypesError::Config(e.to_string()))?;
        settings.reconciler.validate()?;
        Ok(settings)
    }

    /// Expand ~ in db_path to the user's home directory
    pub fn expanded_db_path(&self) -> PathBuf {
        if let Some(rest) = self.db_path.strip_prefix("~/") {
            if let Some(dirs) = BaseDirs::new() {
                return dirs.home_dir().join(rest);
            }
        }
        PathBuf::from(&self.db_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_default_settings() {
        let settings = Settings::default();
        assert_eq!(settings.log_level, "info");
        assert_eq!(settings.reconciler.queue_capacity, 1000);
        assert_eq!(settings.reconciler.drain_poll_interval_ms, 100);
    }

    #[test]
    fn test_load_with_defaults() {
        let settings = Settings::load(None).unwrap();
        assert!(settings.reconciler.queue_capacity > 0);
    }

    #[test]
    fn test_load_from_explicit_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("index.toml");
        fs::write(
            &path,
            "db_path = \"/tmp/postings\"\n\n[reconciler]\nqueue_capacity = 16\n",
        )
        .unwrap();

        let settings = Settings::load(Some(path.to_str().unwrap())).unwrap();
        assert_eq!(settings.db_path, "/tmp/postings");
        assert_eq!(settings.reconciler.queue_capacity, 16);
        assert_eq!(settings.reconciler.drain_poll_interval_ms, 100);
    }

    #[test]
    fn test_load_rejects_zero_capacity() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("index.toml");
        fs::write(&path, "[reconciler]\nqueue_capacity = 0\n").unwrap();

        let result = Settings::load(Some(path.to_str().unwrap()));
        assert!(matches!(result, Err(TypesError::Config(_))));
    }

    #[test]
    fn test_reconciler_config_validate() {
        assert!(ReconcilerConfig::default().validate().is_ok());
        assert!(ReconcilerConfig::default()
            .with_queue_capacity(0)
            .validate()
            .is_err());
        assert!(ReconcilerConfig::default()
            .with_drain_poll_interval_ms(0)
            .validate()
            .is_err());
    }

    #[test]
    fn test_expanded_db_path_plain() {
        let settings = Settings {
            db_path: "/var/lib/postings".to_string(),
            ..Default::default()
        };
        assert_eq!(
            settings.expanded_db_path(),
            PathBuf::from("/var/lib/postings")
        );
    }

    #[test]
    fn test_serde_roundtrip() {
        let config = ReconcilerConfig::default().with_queue_capacity(8);
        let json = serde_json::to_string(&config).unwrap();
        let parsed: ReconcilerConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, config);
    }
}
