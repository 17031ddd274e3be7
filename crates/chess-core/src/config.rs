//! Engine configuration.
//!
//! Every field has a default, so an empty YAML document is a valid
//! configuration and files only need to name what they change.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::logging::LoggingConfig;
use crate::move_index::IndexKind;
use crate::search::EngineKind;
use crate::search::options::{AlphaBetaOptions, MctsOptions};
use crate::search::time_control::{DEFAULT_MOVES_REMAINING, TimeControl, TimeManager};

/// Configuration loading errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// Root configuration structure.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct EngineConfig {
    pub engine: EngineSection,
    pub alphabeta: AlphaBetaOptions,
    pub mcts: MctsOptions,
    pub time: TimeConfig,
    pub logging: LoggingConfig,
}

/// Searcher selection.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct EngineSection {
    pub kind: EngineKind,
    /// Action space used by MCTS priors and oracles.
    pub index: IndexKind,
}

/// Clock settings.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeConfig {
    /// `base[+increment]` in seconds, or `inf`.
    pub control: String,
    pub moves_remaining: u32,
}

impl Default for TimeConfig {
    fn default() -> Self {
        Self {
            control: "inf".to_string(),
            moves_remaining: DEFAULT_MOVES_REMAINING,
        }
    }
}

impl TimeConfig {
    /// Parses the control string into a time manager.
    pub fn time_manager(&self) -> Result<TimeManager, ConfigError> {
        let control: TimeControl = self
            .control
            .parse()
            .map_err(|e| ConfigError::Invalid(format!("time.control: {e}")))?;
        Ok(TimeManager::new(control).with_moves_remaining(self.moves_remaining))
    }
}

impl EngineConfig {
    /// Load configuration from a YAML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&contents)
    }

    /// Load configuration from a YAML string and validate it.
    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        let config: EngineConfig = if yaml.trim().is_empty() {
            EngineConfig::default()
        } else {
            serde_yaml::from_str(yaml)?
        };
        config.validate()?;
        Ok(config)
    }

    pub fn to_yaml_string(&self) -> Result<String, ConfigError> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// Checks cross-field constraints serde cannot express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.alphabeta.max_depth == 0 {
            return Err(ConfigError::Invalid(
                "alphabeta.max_depth must be >= 1".to_string(),
            ));
        }
        self.mcts
            .validate()
            .map_err(|e| ConfigError::Invalid(format!("mcts: {e}")))?;
        if self.time.moves_remaining == 0 {
            return Err(ConfigError::Invalid(
                "time.moves_remaining must be >= 1".to_string(),
            ));
        }
        self.time.time_manager()?;
        self.logging.validate()?;
        Ok(())
    }
}
