//! Terminal adapter configuration.

use std::path::{Path, PathBuf};

use herald_core::DispatcherConfig;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// File looked up in the working directory when `--config` is not given.
pub const DEFAULT_CONFIG_FILE: &str = "herald.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error(transparent)]
    Dispatcher(#[from] herald_core::ConfigError),

    #[error("max_suggestions must be at least 1")]
    NoSuggestions,
}

/// Settings of the `herald` binary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CliConfig {
    /// Prompt printed before each line in the interactive loop.
    pub prompt: String,

    /// Log level used when neither `RUST_LOG` nor `--log-level` is set.
    pub log_level: String,

    pub json_logs: bool,

    /// Completions printed by `herald complete`.
    pub max_suggestions: usize,

    /// Dispatcher tunables.
    pub dispatcher: DispatcherConfig,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            prompt: "> ".to_string(),
            log_level: "warn".to_string(),
            json_logs: false,
            max_suggestions: 20,
            dispatcher: DispatcherConfig::default(),
        }
    }
}

impl CliConfig {
    /// Loads and validates a config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Loads `path` if given, else `herald.toml` in `dir` when present, else
    /// the defaults.
    pub fn discover(path: Option<&Path>, dir: &Path) -> Result<Self, ConfigError> {
        if let Some(path) = path {
            return Self::load(path);
        }
        let fallback = dir.join(DEFAULT_CONFIG_FILE);
        if fallback.is_file() {
            Self::load(fallback)
        } else {
            Ok(Self::default())
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_suggestions == 0 {
            return Err(ConfigError::NoSuggestions);
        }
        self.dispatcher.validate()?;
        Ok(())
    }
}
