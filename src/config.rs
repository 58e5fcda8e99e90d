//! Analysis configuration
//!
//! Every policy the sizing and cost estimate depend on (delta-v split,
//! regression form, consensus threshold and trial count) lives here with
//! a default, so a report can state exactly what it assumed.
//!
//! ```json
//! {
//!   "sizer": { "allocation": { "policy": "uniform" } },
//!   "estimator": {
//!     "form": "linear_in_period",
//!     "threshold": { "absolute": 50.0 },
//!     "max_trials": 100,
//!     "exhaustive_limit": 64,
//!     "seed": 24301
//!   }
//! }
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::constants::estimator;
use crate::cost::{RegressionForm, ResidualThreshold};
use crate::error::ConfigError;
use crate::sizing::DeltaVAllocation;

/// Settings for the stage sizer
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SizerConfig {
    pub allocation: DeltaVAllocation,
}

/// Settings for the consensus cost fit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EstimatorConfig {
    pub form: RegressionForm,
    pub threshold: ResidualThreshold,
    /// Random candidate pairs tried when the search is not exhaustive
    pub max_trials: usize,
    /// Datasets up to this size try every pair
    pub exhaustive_limit: usize,
    pub seed: u64,
}

impl Default for EstimatorConfig {
    fn default() -> Self {
        Self {
            form: RegressionForm::default(),
            threshold: ResidualThreshold::default(),
            max_trials: estimator::DEFAULT_MAX_TRIALS,
            exhaustive_limit: estimator::DEFAULT_EXHAUSTIVE_LIMIT,
            seed: estimator::DEFAULT_SEED,
        }
    }
}

impl EstimatorConfig {
    pub fn with_form(mut self, form: RegressionForm) -> Self {
        self.form = form;
        self
    }

    pub fn with_threshold(mut self, threshold: ResidualThreshold) -> Self {
        self.threshold = threshold;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_exhaustive_limit(mut self, limit: usize) -> Self {
        self.exhaustive_limit = limit;
        self
    }

    pub fn with_max_trials(mut self, trials: usize) -> Self {
        self.max_trials = trials;
        self
    }
}

/// Full configuration for a sizing + cost analysis
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub sizer: SizerConfig,
    pub estimator: EstimatorConfig,
}

impl AnalysisConfig {
    /// Parse and validate a JSON configuration; missing keys take defaults
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: AnalysisConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Read a JSON configuration file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let config = Self::from_json_str(&json)?;
        tracing::debug!(path = %path.display(), ?config, "loaded analysis config");
        Ok(config)
    }

    /// Reject values that would make a fit or sizing meaningless
    ///
    /// Per-stage weight counts are checked at sizing time, since the
    /// config does not know the design.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let DeltaVAllocation::Weighted(weights) = &self.sizer.allocation {
            if weights.iter().any(|w| !w.is_finite() || *w < 0.0) {
                return Err(ConfigError::Invalid {
                    key: "sizer.allocation.weights".to_string(),
                    message: "weights must be finite and non-negative".to_string(),
                });
            }
            if weights.iter().all(|w| *w == 0.0) {
                return Err(ConfigError::Invalid {
                    key: "sizer.allocation.weights".to_string(),
                    message: "at least one weight must be positive".to_string(),
                });
            }
        }

        if let ResidualThreshold::Absolute(t) = self.estimator.threshold {
            if !t.is_finite() || t <= 0.0 {
                return Err(ConfigError::Invalid {
                    key: "estimator.threshold".to_string(),
                    message: format!("absolute threshold {t} must be finite and positive"),
                });
            }
        }

        if self.estimator.max_trials == 0 {
            return Err(ConfigError::Invalid {
                key: "estimator.max_trials".to_string(),
                message: "at least one trial is required".to_string(),
            });
        }
        Ok(())
    }
}
