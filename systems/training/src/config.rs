//! Training configuration loaded from TOML.

use std::{fs, path::Path};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tile_quest_system_learning::QTable;

/// Failures raised while reading a training configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("failed to read training config {path}: {source}")]
    Io {
        /// Path that failed to load.
        path: String,
        /// Underlying I/O failure.
        #[source]
        source: std::io::Error,
    },
    /// The configuration is not valid TOML or does not match the schema.
    #[error("failed to parse training config: {0}")]
    Parse(#[from] toml::de::Error),
    /// A value is outside its permitted range.
    #[error("invalid training config: {message}")]
    Invalid {
        /// Description of the rejected value.
        message: String,
    },
}

/// Exploration rate applied to each episode.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EpsilonSchedule {
    /// The same rate for every episode.
    Constant {
        /// Exploration rate.
        value: f64,
    },
    /// Multiplicative decay per episode, never dropping below `floor`.
    Decay {
        /// Rate of the first episode.
        start: f64,
        /// Factor applied after every episode.
        decay: f64,
        /// Lowest rate the schedule reaches.
        floor: f64,
    },
}

impl Default for EpsilonSchedule {
    fn default() -> Self {
        Self::Constant { value: 0.05 }
    }
}

impl EpsilonSchedule {
    /// Exploration rate of the provided zero-based episode.
    #[must_use]
    pub fn value_for(&self, episode: u32) -> f64 {
        match *self {
            Self::Constant { value } => value,
            Self::Decay {
                start,
                decay,
                floor,
            } => {
                let exponent = i32::try_from(episode).unwrap_or(i32::MAX);
                (start * decay.powi(exponent)).max(floor)
            }
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let in_unit_range = |value: f64| (0.0..=1.0).contains(&value);
        let valid = match *self {
            Self::Constant { value } => in_unit_range(value),
            Self::Decay {
                start,
                decay,
                floor,
            } => in_unit_range(start) && in_unit_range(decay) && in_unit_range(floor),
        };

        if valid {
            Ok(())
        } else {
            Err(ConfigError::Invalid {
                message: format!("epsilon schedule {self:?} must stay within [0, 1]"),
            })
        }
    }
}

/// Parameters of a training run.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TrainingConfig {
    /// Number of episodes to run.
    pub episodes: u32,
    /// Step budget of a single episode.
    pub max_steps: u32,
    /// Learning rate of the Q-table.
    pub alpha: f64,
    /// Discount factor of the Q-table.
    pub gamma: f64,
    /// Exploration schedule.
    pub epsilon: EpsilonSchedule,
    /// Seed of the exploration random source; entropy when absent.
    pub seed: Option<u64>,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            episodes: 12_000,
            max_steps: 70,
            alpha: 0.2,
            gamma: 0.9,
            epsilon: EpsilonSchedule::default(),
            seed: None,
        }
    }
}

impl TrainingConfig {
    /// Parses and validates a configuration from TOML text.
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&contents)
    }

    /// Checks that every rate lies within its permitted range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.alpha > 0.0 && self.alpha <= 1.0) {
            return Err(ConfigError::Invalid {
                message: format!("alpha {} must lie in (0, 1]", self.alpha),
            });
        }
        if !(0.0..=1.0).contains(&self.gamma) {
            return Err(ConfigError::Invalid {
                message: format!("gamma {} must lie in [0, 1]", self.gamma),
            });
        }
        self.epsilon.validate()
    }

    /// Creates an empty table carrying this run's hyperparameters.
    #[must_use]
    pub fn new_table(&self) -> QTable {
        QTable::new(self.alpha, self.gamma, self.epsilon.value_for(0))
    }
}
