use thiserror::Error;

/// Errors from sizing a stack of stages against a mission requirement
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SizingError {
    /// A stage or the requirement is not physically meaningful
    #[error("invalid stage specification{}: {}", stage_label(.stage), .reason)]
    InvalidSpec {
        /// Index of the offending stage, `None` for requirement-level problems
        stage: Option<usize>,
        reason: String,
    },

    /// The stages cannot reach the target delta-v
    #[error("infeasible design{}: {}", stage_label(.stage), .reason)]
    InfeasibleDesign {
        stage: Option<usize>,
        reason: String,
    },
}

fn stage_label(stage: &Option<usize>) -> String {
    match stage {
        Some(index) => format!(" (stage {})", index + 1),
        None => String::new(),
    }
}

impl SizingError {
    pub(crate) fn invalid(stage: Option<usize>, reason: impl Into<String>) -> Self {
        SizingError::InvalidSpec {
            stage,
            reason: reason.into(),
        }
    }

    pub(crate) fn infeasible(stage: Option<usize>, reason: impl Into<String>) -> Self {
        SizingError::InfeasibleDesign {
            stage,
            reason: reason.into(),
        }
    }
}

/// Errors from fitting or evaluating a cost model
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CostError {
    #[error("insufficient data: need at least 2 points, got {found}")]
    InsufficientData { found: usize },

    #[error("invalid data point: production rate {production_rate}, cost per mass {cost_per_mass}")]
    InvalidDataPoint {
        production_rate: f64,
        cost_per_mass: f64,
    },

    #[error("invalid production rate {0}: must be finite and positive")]
    InvalidRate(f64),

    #[error("invalid residual threshold {0}: must be finite and positive")]
    InvalidThreshold(f64),

    #[error("invalid production rate range {low}..{high}: upper bound below lower")]
    InvalidRateRange { low: f64, high: f64 },

    #[error("invalid noise sigma {0}: must be finite and non-negative")]
    InvalidNoise(f64),

    /// Every pair of points shares the same regressor value
    #[error("degenerate data: no two points have distinct production rates")]
    DegenerateData,
}

/// Errors from reading an analysis configuration or dataset file
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid configuration value for {key}: {message}")]
    Invalid { key: String, message: String },
}

/// Any failure in an end-to-end analysis
#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error(transparent)]
    Sizing(#[from] SizingError),

    #[error(transparent)]
    Cost(#[from] CostError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_label_is_one_based() {
        let err = SizingError::invalid(Some(0), "structural fraction 1.2 must be below 1");
        assert_eq!(
            err.to_string(),
            "invalid stage specification (stage 1): structural fraction 1.2 must be below 1"
        );
    }

    #[test]
    fn test_requirement_level_error_has_no_stage() {
        let err = SizingError::infeasible(None, "needs 20000 m/s, stages can reach 9000 m/s");
        assert_eq!(
            err.to_string(),
            "infeasible design: needs 20000 m/s, stages can reach 9000 m/s"
        );
    }

    #[test]
    fn test_analysis_error_wraps_cost_error() {
        let err: AnalysisError = CostError::InsufficientData { found: 1 }.into();
        assert!(err.to_string().contains("got 1"));
    }
}
