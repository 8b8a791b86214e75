//! Pipeline configuration
//!
//! Every field has a default, so a partial JSON document (or none at all) is
//! a valid configuration.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::ConfigError;

pub const DEFAULT_MISSION: &str = "Protect the current operation.";

/// Isolation forest parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    /// Seed for the forest's RNG. Fixed so decisions are reproducible.
    pub seed: u64,
    /// Number of isolation trees
    pub n_estimators: usize,
    /// Upper bound on rows sampled per tree
    pub max_samples: usize,
    /// Expected share of outliers; sets the decision-score offset
    pub contamination: f64,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            n_estimators: 100,
            max_samples: 256,
            contamination: 0.1,
        }
    }
}

impl ScoringConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.n_estimators == 0 {
            return Err(ConfigError::Invalid("n_estimators must be at least 1".into()));
        }
        if self.max_samples == 0 {
            return Err(ConfigError::Invalid("max_samples must be at least 1".into()));
        }
        if !(self.contamination > 0.0 && self.contamination <= 0.5) {
            return Err(ConfigError::Invalid(format!(
                "contamination must be in (0, 0.5], got {}",
                self.contamination
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub scoring: ScoringConfig,
    /// Mission brief used when the caller supplies none
    pub default_mission: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            scoring: ScoringConfig::default(),
            default_mission: DEFAULT_MISSION.to_string(),
        }
    }
}

impl PipelineConfig {
    pub fn from_json_str(raw: &str) -> Result<Self, ConfigError> {
        let config: PipelineConfig = serde_json::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json_str(&raw)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.default_mission.trim().is_empty() {
            return Err(ConfigError::Invalid("default_mission must not be blank".into()));
        }
        self.scoring.validate()
    }
}
