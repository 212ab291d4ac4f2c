//! Configuration loading for speedsync

use std::path::PathBuf;

use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::coordinator::CoordinatorConfig;
use crate::page::PageConfig;

/// Top-level configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Directory holding the shared speed record. Defaults to the same
    /// location the `ss` tool uses, so both sides see one store.
    #[serde(rename = "store-path", default = "default_store_path")]
    pub store_path: PathBuf,

    /// Log level for the log file (TRACE, DEBUG, INFO, WARN, ERROR).
    /// The CLI `--log-level` flag takes precedence.
    #[serde(rename = "log-level", default)]
    pub log_level: Option<String>,

    /// Page synchronizer settings
    #[serde(default)]
    pub page: PageConfig,

    /// Coordinator settings
    #[serde(default)]
    pub coordinator: CoordinatorConfig,
}

fn default_store_path() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("speedstore")
}

impl Default for Config {
    fn default() -> Self {
        Self {
            store_path: default_store_path(),
            log_level: None,
            page: PageConfig::default(),
            coordinator: CoordinatorConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration.
    ///
    /// An explicit path must parse or loading fails. Without one, the
    /// candidates below are tried in order and unreadable or unparseable
    /// files are skipped with a warning:
    /// 1. `.speedsync.yml` in the current directory
    /// 2. `speedsync.yml` in the user config directory
    /// 3. built-in defaults
    pub fn load(path: Option<&PathBuf>) -> Result<Self> {
        if let Some(config_path) = path {
            let content = std::fs::read_to_string(config_path)
                .wrap_err_with(|| format!("Failed to read config: {}", config_path.display()))?;
            return serde_yaml::from_str(&content)
                .wrap_err_with(|| format!("Failed to parse config: {}", config_path.display()));
        }

        let candidates = [
            Some(PathBuf::from(".speedsync.yml")),
            dirs::config_dir().map(|dir| dir.join("speedsync").join("speedsync.yml")),
        ];

        for candidate in candidates.iter().flatten() {
            if !candidate.exists() {
                continue;
            }
            match std::fs::read_to_string(candidate) {
                Ok(content) => match serde_yaml::from_str(&content) {
                    Ok(config) => return Ok(config),
                    Err(err) => {
                        warn!(path = %candidate.display(), error = %err, "Ignoring unparseable config");
                    }
                },
                Err(err) => {
                    warn!(path = %candidate.display(), error = %err, "Ignoring unreadable config");
                }
            }
        }

        Ok(Config::default())
    }

    /// Read just the log level from the config file.
    ///
    /// Runs before logging is initialized, so any failure is silently
    /// treated as "no preference".
    pub fn load_log_level(path: Option<&PathBuf>) -> Option<String> {
        let candidate = match path {
            Some(path) => path.clone(),
            None => [
                Some(PathBuf::from(".speedsync.yml")),
                dirs::config_dir().map(|dir| dir.join("speedsync").join("speedsync.yml")),
            ]
            .into_iter()
            .flatten()
            .find(|candidate| candidate.exists())?,
        };

        let content = std::fs::read_to_string(candidate).ok()?;
        let value: serde_yaml::Value = serde_yaml::from_str(&content).ok()?;
        value.get("log-level")?.as_str().map(str::to_string)
    }
}
