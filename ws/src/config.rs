//! winsync configuration types and loading

use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::heartbeat::{DEFAULT_INTERVAL_MS, DEFAULT_STALENESS_FACTOR, HeartbeatPolicy};
use crate::store::DEFAULT_KEY;

/// Main winsync configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR)
    #[serde(rename = "log-level")]
    pub log_level: Option<String>,

    /// Shared store configuration
    pub store: StoreConfig,

    /// Heartbeat cadence and staleness
    pub heartbeat: HeartbeatConfig,
}

impl Config {
    /// Validate configuration before use
    pub fn validate(&self) -> Result<()> {
        if self.heartbeat.interval_ms == 0 {
            return Err(eyre::eyre!("heartbeat.interval-ms must be greater than zero"));
        }
        if self.heartbeat.staleness_factor < 2 {
            return Err(eyre::eyre!(
                "heartbeat.staleness-factor must be at least 2 (got {})",
                self.heartbeat.staleness_factor
            ));
        }
        sharedstore::validate_key(&self.store.key).context("Invalid store.key")?;
        Ok(())
    }

    /// Load configuration with fallback chain
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        // If explicit config path provided, try to load it
        if let Some(path) = config_path {
            return Self::load_from_file(path).context(format!("Failed to load config from {}", path.display()));
        }

        for candidate in Self::default_paths() {
            if candidate.exists() {
                match Self::load_from_file(&candidate) {
                    Ok(config) => return Ok(config),
                    Err(e) => {
                        tracing::warn!("Failed to load config from {}: {}", candidate.display(), e);
                    }
                }
            }
        }

        // No config file found, use defaults
        tracing::debug!("No config file found, using defaults");
        Ok(Self::default())
    }

    /// Read only the log level, before logging is set up
    pub fn load_log_level(config_path: Option<&PathBuf>) -> Option<String> {
        let candidates = match config_path {
            Some(path) => vec![path.clone()],
            None => Self::default_paths(),
        };

        candidates
            .iter()
            .filter_map(|path| fs::read_to_string(path).ok())
            .find_map(|content| serde_yaml::from_str::<Config>(&content).ok())
            .and_then(|config| config.log_level)
    }

    /// Project-local `.winsync.yml`, then `~/.config/winsync/winsync.yml`
    fn default_paths() -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from(".winsync.yml")];
        if let Some(config_dir) = dirs::config_dir() {
            paths.push(config_dir.join("winsync").join("winsync.yml"));
        }
        paths
    }

    fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path).context("Failed to read config file")?;

        let config: Self = serde_yaml::from_str(&content).context("Failed to parse config file")?;

        tracing::info!("Loaded config from: {}", path.as_ref().display());
        Ok(config)
    }
}

/// Shared store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Directory shared by all instances
    pub path: PathBuf,

    /// Key holding the instance list
    pub key: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        // ~/.local/share/winsync/store on Linux
        let path = dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("winsync")
            .join("store");

        Self {
            path,
            key: DEFAULT_KEY.to_string(),
        }
    }
}

/// Heartbeat configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HeartbeatConfig {
    /// Time between updates in milliseconds
    #[serde(rename = "interval-ms")]
    pub interval_ms: u64,

    /// TTL as a multiple of the interval
    #[serde(rename = "staleness-factor")]
    pub staleness_factor: u32,
}

impl Default for HeartbeatConfig {
    fn default() -> Self {
        Self {
            interval_ms: DEFAULT_INTERVAL_MS,
            staleness_factor: DEFAULT_STALENESS_FACTOR,
        }
    }
}

impl HeartbeatConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    pub fn policy(&self) -> HeartbeatPolicy {
        HeartbeatPolicy::new(self.interval(), self.staleness_factor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = Config::default();

        assert_eq!(config.store.key, "windows");
        assert!(config.store.path.ends_with("winsync/store"));
        assert_eq!(config.heartbeat.interval_ms, 100);
        assert_eq!(config.heartbeat.staleness_factor, 3);
        assert!(config.log_level.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_deserialize_config() {
        let yaml = r#"
log-level: debug

store:
  path: /tmp/winsync-test
  key: demo-windows

heartbeat:
  interval-ms: 250
  staleness-factor: 4
"#;

        let config: Config = serde_yaml::from_str(yaml).unwrap();

        assert_eq!(config.log_level.as_deref(), Some("debug"));
        assert_eq!(config.store.path, PathBuf::from("/tmp/winsync-test"));
        assert_eq!(config.store.key, "demo-windows");
        assert_eq!(config.heartbeat.policy().ttl(), Duration::from_millis(1_000));
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let config: Config = serde_yaml::from_str("heartbeat:\n  interval-ms: 50\n").unwrap();

        assert_eq!(config.heartbeat.interval_ms, 50);
        assert_eq!(config.heartbeat.staleness_factor, 3);
        assert_eq!(config.store.key, "windows");
    }

    #[test]
    fn test_validate_rejects_bad_policy() {
        let mut config = Config::default();
        config.heartbeat.interval_ms = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.heartbeat.staleness_factor = 1;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.store.key = "a/b".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_explicit_path_and_log_level() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("winsync.yml");
        fs::write(&path, "log-level: WARN\nheartbeat:\n  staleness-factor: 5\n").unwrap();

        let config = Config::load(Some(&path)).unwrap();
        assert_eq!(config.heartbeat.staleness_factor, 5);
        assert_eq!(Config::load_log_level(Some(&path)).as_deref(), Some("WARN"));
    }

    #[test]
    fn test_load_missing_explicit_path_fails() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("missing.yml");
        assert!(Config::load(Some(&path)).is_err());
        assert!(Config::load_log_level(Some(&path)).is_none());
    }
}
