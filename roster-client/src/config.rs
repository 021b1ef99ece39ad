//! Configuration loading for rostersync.
//!
//! Configuration is loaded from a TOML file. Every section and field is
//! optional.

use roster_core::{DebounceError, DelayConfig};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Root configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RosterConfig {
    /// Cache location.
    #[serde(default)]
    pub cache: CacheConfig,
    /// Write-back debouncing.
    #[serde(default)]
    pub writeback: WritebackConfig,
    /// Log output.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Cache configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CacheConfig {
    /// Root directory of the JSON cache (default: the platform cache dir).
    pub directory: Option<PathBuf>,
}

/// Write-back configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct WritebackConfig {
    /// Seconds after the latest change before writing (default: 1.0).
    #[serde(default = "default_delay_secs")]
    pub delay_secs: f64,
    /// Upper bound in seconds from the first change (default: 10.0).
    #[serde(default = "default_max_delay_secs")]
    pub max_delay_secs: Option<f64>,
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// `tracing` filter directive (default: "info").
    #[serde(default = "default_log_filter")]
    pub filter: String,
}

// Default value functions
fn default_delay_secs() -> f64 {
    1.0
}

fn default_max_delay_secs() -> Option<f64> {
    Some(10.0)
}

fn default_log_filter() -> String {
    "info".to_string()
}

impl Default for WritebackConfig {
    fn default() -> Self {
        Self {
            delay_secs: default_delay_secs(),
            max_delay_secs: default_max_delay_secs(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: default_log_filter(),
        }
    }
}

impl WritebackConfig {
    /// Validated debounce settings.
    pub fn delay_config(&self) -> Result<DelayConfig, ConfigError> {
        DelayConfig::from_secs_f64(self.delay_secs, self.max_delay_secs).map_err(ConfigError::Invalid)
    }
}

impl RosterConfig {
    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed, or if the
    /// write-back delays are invalid.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.to_path_buf(),
            source: e,
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            source: e,
        })?;
        config.writeback.delay_config()?;
        Ok(config)
    }
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read configuration file.
    #[error("failed to read config file {path}: {source}")]
    Read {
        /// Path to the configuration file.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
    /// Failed to parse configuration file.
    #[error("failed to parse config file {path}: {source}")]
    Parse {
        /// Path to the configuration file.
        path: PathBuf,
        /// Underlying TOML parse error.
        source: toml::de::Error,
    },
    /// A value is out of range.
    #[error("invalid writeback settings: {0}")]
    Invalid(#[source] DebounceError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn default_config_is_valid() {
        let config = RosterConfig::default();
        assert!(config.cache.directory.is_none());
        assert_eq!(config.logging.filter, "info");

        let delay = config.writeback.delay_config().unwrap();
        assert_eq!(delay.delay(), Duration::from_secs(1));
        assert_eq!(delay.max_delay(), Some(Duration::from_secs(10)));
    }

    #[test]
    fn config_from_toml_string() {
        let toml = r#"
[cache]
directory = "/var/cache/roster"

[writeback]
delay_secs = 0.25
max_delay_secs = 2.0

[logging]
filter = "roster_client=debug"
"#;

        let config: RosterConfig = toml::from_str(toml).unwrap();
        assert_eq!(
            config.cache.directory,
            Some(PathBuf::from("/var/cache/roster"))
        );
        assert_eq!(config.logging.filter, "roster_client=debug");

        let delay = config.writeback.delay_config().unwrap();
        assert_eq!(delay.delay(), Duration::from_millis(250));
        assert_eq!(delay.max_delay(), Some(Duration::from_secs(2)));
    }

    #[test]
    fn config_missing_sections_use_defaults() {
        let config: RosterConfig = toml::from_str("").unwrap();
        assert_eq!(config.writeback.delay_secs, 1.0);
        assert_eq!(config.writeback.max_delay_secs, Some(10.0));
    }

    #[test]
    fn negative_delay_is_rejected() {
        let toml = r#"
[writeback]
delay_secs = -1.0
"#;
        let config: RosterConfig = toml::from_str(toml).unwrap();
        assert!(matches!(
            config.writeback.delay_config(),
            Err(ConfigError::Invalid(DebounceError::NegativeDelay(_)))
        ));
    }

    #[test]
    fn from_file_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("roster.toml");

        match RosterConfig::from_file(&path) {
            Err(ConfigError::Read { path: p, .. }) => assert_eq!(p, path),
            other => panic!("expected read error, got {:?}", other),
        }

        std::fs::write(&path, "[writeback]\ndelay_secs = \"soon\"\n").unwrap();
        assert!(matches!(
            RosterConfig::from_file(&path),
            Err(ConfigError::Parse { .. })
        ));

        std::fs::write(&path, "[writeback]\nmax_delay_secs = -2.0\n").unwrap();
        assert!(matches!(
            RosterConfig::from_file(&path),
            Err(ConfigError::Invalid(_))
        ));
    }
}
