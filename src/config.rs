//! Configuration file (`shelfwatch.json`)
//!
//! ```json
//! {
//!   "data_dir": "/var/lib/shelfwatch",
//!   "log_level": "info",
//!   "report_days_back": 30,
//!   "recent_items_days_back": 90,
//!   "retention": {"policy": "max_age", "days": 365}
//! }
//! ```
//!
//! Only `data_dir` is required.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::observability::{log_event_with_fields, Event, Logger, Severity};
use crate::report::{DEFAULT_RECENT_ITEMS_DAYS, DEFAULT_REPORT_DAYS};
use crate::retention::RetentionPolicy;

/// Environment variable overriding `log_level`
pub const LOG_LEVEL_ENV: &str = "SHELF_LOG_LEVEL";

/// Default config file name
pub const DEFAULT_CONFIG_FILE: &str = "shelfwatch.json";

pub type ConfigResult<T> = Result<T, ConfigError>;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Directory holding both data files (required)
    pub data_dir: PathBuf,

    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default = "default_report_days_back")]
    pub report_days_back: u32,

    #[serde(default = "default_recent_items_days_back")]
    pub recent_items_days_back: u32,

    #[serde(default)]
    pub retention: RetentionPolicy,
}

fn default_log_level() -> String {
    "info".to_string()
}
fn default_report_days_back() -> u32 {
    DEFAULT_REPORT_DAYS
}
fn default_recent_items_days_back() -> u32 {
    DEFAULT_RECENT_ITEMS_DAYS
}

impl Config {
    /// Config with defaults for everything but `data_dir`.
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            log_level: default_log_level(),
            report_days_back: default_report_days_back(),
            recent_items_days_back: default_recent_items_days_back(),
            retention: RetentionPolicy::default(),
        }
    }

    /// Load and validate configuration from file
    pub fn load(path: &Path) -> ConfigResult<Self> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        let config: Config = serde_json::from_str(&content)?;
        config.validate()?;

        let data_dir = config.data_dir.to_string_lossy();
        let config_path = path.to_string_lossy();
        log_event_with_fields(
            Event::ConfigLoaded,
            &[("data_dir", &*data_dir), ("path", &*config_path)],
        );

        Ok(config)
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if self.data_dir.as_os_str().is_empty() {
            return Err(ConfigError::Invalid("data_dir must not be empty".into()));
        }

        self.log_level
            .parse::<Severity>()
            .map_err(ConfigError::Invalid)?;

        if self.report_days_back == 0 {
            return Err(ConfigError::Invalid("report_days_back must be > 0".into()));
        }

        if self.recent_items_days_back == 0 {
            return Err(ConfigError::Invalid(
                "recent_items_days_back must be > 0".into(),
            ));
        }

        self.retention.validate().map_err(ConfigError::Invalid)
    }

    pub fn data_path(&self) -> &Path {
        &self.data_dir
    }

    /// Effective minimum log severity: `SHELF_LOG_LEVEL` if set and valid,
    /// otherwise `log_level`.
    pub fn effective_log_level(&self) -> Severity {
        env::var(LOG_LEVEL_ENV)
            .ok()
            .and_then(|level| level.parse().ok())
            .or_else(|| self.log_level.parse().ok())
            .unwrap_or(Severity::Info)
    }

    /// Install the effective log level process-wide.
    pub fn apply_log_level(&self) {
        Logger::set_min_severity(self.effective_log_level());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn write_config(dir: &TempDir, value: serde_json::Value) -> PathBuf {
        let path = dir.path().join(DEFAULT_CONFIG_FILE);
        fs::write(&path, value.to_string()).unwrap();
        path
    }

    #[test]
    fn test_config_defaults() {
        let dir = TempDir::new().unwrap();
        let path = write_config(&dir, json!({"data_dir": dir.path().join("data")}));

        let config = Config::load(&path).unwrap();
        assert_eq!(config.log_level, "info");
        assert_eq!(config.report_days_back, 30);
        assert_eq!(config.recent_items_days_back, 90);
        assert_eq!(config.retention, RetentionPolicy::KeepAll);
        assert_eq!(config, Config::new(dir.path().join("data")));
    }

    #[test]
    fn test_config_full() {
        let dir = TempDir::new().unwrap();
        let path = write_config(
            &dir,
            json!({
                "data_dir": "/srv/shelfwatch",
                "log_level": "warn",
                "report_days_back": 7,
                "recent_items_days_back": 14,
                "retention": {"policy": "max_age", "days": 365}
            }),
        );

        let config = Config::load(&path).unwrap();
        assert_eq!(config.data_path(), Path::new("/srv/shelfwatch"));
        assert_eq!(config.report_days_back, 7);
        assert_eq!(config.retention, RetentionPolicy::MaxAge { days: 365 });
    }

    #[test]
    fn test_config_requires_data_dir() {
        let dir = TempDir::new().unwrap();
        let path = write_config(&dir, json!({"log_level": "info"}));
        assert!(matches!(Config::load(&path), Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_config_rejects_zero_days() {
        let dir = TempDir::new().unwrap();
        let path = write_config(&dir, json!({"data_dir": "d", "report_days_back": 0}));
        assert!(matches!(Config::load(&path), Err(ConfigError::Invalid(_))));

        let path = write_config(
            &dir,
            json!({"data_dir": "d", "retention": {"policy": "max_age", "days": 0}}),
        );
        assert!(matches!(Config::load(&path), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_config_rejects_unknown_log_level() {
        let dir = TempDir::new().unwrap();
        let path = write_config(&dir, json!({"data_dir": "d", "log_level": "chatty"}));
        assert!(matches!(Config::load(&path), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_config_missing_file() {
        let dir = TempDir::new().unwrap();
        let result = Config::load(&dir.path().join("absent.json"));
        assert!(matches!(result, Err(ConfigError::Read { .. })));
    }
}
