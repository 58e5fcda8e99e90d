//! Sizing and unit-cost estimation for a dedicated nanosatellite launcher.
//!
//! [`sizing`] turns a delta-v requirement and per-stage propulsion
//! parameters into a liftoff mass. [`cost`] fits a robust cost-per-kilogram
//! trend against production rate from historical vehicles. The two are
//! independent; a report multiplies one's mass by the other's rate.

pub mod config;
pub mod constants;
pub mod cost;
pub mod dataset;
pub mod error;
pub mod logging;
pub mod sizing;
pub mod stage;
pub mod vehicle;

pub use config::{AnalysisConfig, EstimatorConfig, SizerConfig};
pub use cost::{
    CostEstimate, CostEstimator, CostModel, ExtrapolationWarning, RegressionForm,
    ResidualThreshold, UnitCostEstimate,
};
pub use dataset::LaunchDataPoint;
pub use error::{AnalysisError, ConfigError, CostError, SizingError};
pub use sizing::{DeltaVAllocation, MissionRequirement, SizingResult, StageMass, StageSizer};
pub use stage::StageSpec;
