//! Configuration for speedstore

use eyre::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Directory holding the speed record
    #[serde(default = "default_store_path")]
    pub store_path: PathBuf,

    /// Poll interval for `watch`, in milliseconds
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

fn default_store_path() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("speedstore")
}

fn default_poll_interval_ms() -> u64 {
    500
}

impl Default for Config {
    fn default() -> Self {
        Self {
            store_path: default_store_path(),
            poll_interval_ms: default_poll_interval_ms(),
        }
    }
}

impl Config {
    /// Load config from file, or use defaults
    pub fn load(path: Option<&PathBuf>) -> Result<Self> {
        if let Some(config_path) = path {
            let content = std::fs::read_to_string(config_path)?;
            let config: Config = serde_yaml::from_str(&content)?;
            return Ok(config);
        }

        // Try default locations
        let default_paths = [
            dirs::config_dir().map(|p| p.join("speedstore").join("config.yml")),
            Some(PathBuf::from("speedstore.yml")),
        ];

        for path in default_paths.iter().flatten() {
            if path.exists() {
                let content = std::fs::read_to_string(path)?;
                let config: Config = serde_yaml::from_str(&content)?;
                return Ok(config);
            }
        }

        Ok(Config::default())
    }

    /// Save config to file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = serde_yaml::to_string(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Watch poll interval as a duration
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert!(config.store_path.ends_with("speedstore"));
        assert_eq!(config.poll_interval(), Duration::from_millis(500));
    }

    #[test]
    fn test_load_explicit_path() {
        let temp = TempDir::new().unwrap();
        let config_path = temp.path().join("config.yml");
        std::fs::write(&config_path, "store_path: /tmp/speeds\npoll_interval_ms: 50\n").unwrap();

        let config = Config::load(Some(&config_path)).unwrap();
        assert_eq!(config.store_path, PathBuf::from("/tmp/speeds"));
        assert_eq!(config.poll_interval_ms, 50);
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let temp = TempDir::new().unwrap();
        let config_path = temp.path().join("config.yml");
        std::fs::write(&config_path, "poll_interval_ms: 100\n").unwrap();

        let config = Config::load(Some(&config_path)).unwrap();
        assert!(config.store_path.ends_with("speedstore"));
        assert_eq!(config.poll_interval_ms, 100);
    }

    #[test]
    fn test_save_round_trips() {
        let temp = TempDir::new().unwrap();
        let config_path = temp.path().join("config.yml");

        let mut config = Config::default();
        config.store_path = PathBuf::from("/somewhere/else");
        config.save(&config_path).unwrap();

        let loaded = Config::load(Some(&config_path)).unwrap();
        assert_eq!(loaded.store_path, config.store_path);
    }
}
