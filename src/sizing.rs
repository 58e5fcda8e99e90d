use serde::{Deserialize, Serialize};

use crate::config::SizerConfig;
use crate::constants::solver;
use crate::error::SizingError;
use crate::stage::StageSpec;

/// How the required delta-v is split across stages
///
/// The split is a policy choice, not a property of the vehicle. `Uniform`
/// is the default because it needs no knowledge beyond the stage count.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "policy", content = "weights", rename_all = "snake_case")]
pub enum DeltaVAllocation {
    /// Every stage gets Δv / n
    #[default]
    Uniform,
    /// Stage i gets Δv × wᵢ / Σw (one weight per stage)
    Weighted(Vec<f64>),
    /// Lagrange-optimal split that minimises liftoff mass
    ///
    /// Exact when interface masses are zero. Needs every structural
    /// fraction to be positive.
    MinimumMass,
}

impl DeltaVAllocation {
    pub fn name(&self) -> &'static str {
        match self {
            DeltaVAllocation::Uniform => "uniform",
            DeltaVAllocation::Weighted(_) => "weighted",
            DeltaVAllocation::MinimumMass => "minimum-mass",
        }
    }
}

/// Target the vehicle must meet
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MissionRequirement {
    /// Total ideal delta-v in m/s
    pub delta_v_ms: f64,
    pub payload_mass_kg: f64,
}

impl MissionRequirement {
    pub fn new(delta_v_ms: f64, payload_mass_kg: f64) -> Self {
        Self {
            delta_v_ms,
            payload_mass_kg,
        }
    }

    fn validate(&self) -> Result<(), SizingError> {
        if !self.delta_v_ms.is_finite() || self.delta_v_ms < 0.0 {
            return Err(SizingError::invalid(
                None,
                format!("target delta-v {} m/s must be finite and non-negative", self.delta_v_ms),
            ));
        }
        if !self.payload_mass_kg.is_finite() || self.payload_mass_kg <= 0.0 {
            return Err(SizingError::invalid(
                None,
                format!("payload mass {} kg must be finite and positive", self.payload_mass_kg),
            ));
        }
        Ok(())
    }
}

/// Mass breakdown of one sized stage
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct StageMass {
    /// Position in burn order (0 = first to burn)
    pub index: usize,
    /// Delta-v allocated to this stage in m/s
    pub delta_v_ms: f64,
    pub mass_ratio: f64,
    pub structure_mass_kg: f64,
    pub propellant_mass_kg: f64,
    pub interface_mass_kg: f64,
    /// Everything above this stage, its interface mass included
    pub carried_mass_kg: f64,
    /// Mass at this stage's ignition (carried + own mass)
    pub ignition_mass_kg: f64,
}

impl StageMass {
    /// Structure + propellant, without the interface mass
    pub fn stage_mass_kg(&self) -> f64 {
        self.structure_mass_kg + self.propellant_mass_kg
    }
}

/// Sized vehicle
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SizingResult {
    /// Payload + every stage + every interface mass
    pub liftoff_mass_kg: f64,
    pub payload_mass_kg: f64,
    pub target_delta_v_ms: f64,
    /// Recomputed forward from the sized masses
    pub achieved_delta_v_ms: f64,
    /// In burn order
    pub stages: Vec<StageMass>,
    pub allocation: DeltaVAllocation,
}

impl SizingResult {
    pub fn stage_count(&self) -> usize {
        self.stages.len()
    }

    pub fn total_propellant_mass_kg(&self) -> f64 {
        self.stages.iter().map(|s| s.propellant_mass_kg).sum()
    }

    pub fn total_structure_mass_kg(&self) -> f64 {
        self.stages.iter().map(|s| s.structure_mass_kg).sum()
    }

    /// Payload mass / liftoff mass
    pub fn payload_fraction(&self) -> f64 {
        self.payload_mass_kg / self.liftoff_mass_kg
    }

    /// Achieved delta-v reaches the target within solver tolerance
    pub fn meets_target(&self) -> bool {
        self.achieved_delta_v_ms
            >= self.target_delta_v_ms * (1.0 - solver::DELTA_V_RELATIVE_TOLERANCE)
    }
}

/// Asymptotic delta-v of a stack of stages in m/s
///
/// No amount of propellant lets the stack reach this value; any target at
/// or above it is infeasible.
pub fn max_delta_v(stages: &[StageSpec]) -> f64 {
    stages.iter().map(StageSpec::delta_v_limit).sum()
}

/// Sizes stages backward from the payload using the rocket equation
#[derive(Debug, Clone, Default)]
pub struct StageSizer {
    config: SizerConfig,
}

impl StageSizer {
    pub fn new(config: SizerConfig) -> Self {
        Self { config }
    }

    pub fn with_allocation(allocation: DeltaVAllocation) -> Self {
        Self::new(SizerConfig { allocation })
    }

    pub fn allocation(&self) -> &DeltaVAllocation {
        &self.config.allocation
    }

    /// Size a vehicle to meet `requirement` with `stages` (index 0 burns first)
    ///
    /// # Errors
    /// * `InvalidSpec` - a stage or the requirement is not physically meaningful
    /// * `InfeasibleDesign` - the stack cannot reach the target at any mass, or
    ///   the chosen split asks a stage for more than its structure allows
    pub fn size(
        &self,
        requirement: &MissionRequirement,
        stages: &[StageSpec],
    ) -> Result<SizingResult, SizingError> {
        requirement.validate()?;
        if stages.is_empty() {
            return Err(SizingError::invalid(None, "design has no stages"));
        }
        for (index, stage) in stages.iter().enumerate() {
            stage.validate(index)?;
        }

        let limit = max_delta_v(stages);
        if requirement.delta_v_ms >= limit {
            return Err(SizingError::infeasible(
                None,
                format!(
                    "target {:.0} m/s is beyond the {:.0} m/s these stages reach at any mass",
                    requirement.delta_v_ms, limit
                ),
            ));
        }

        let allocations = self.allocate(requirement.delta_v_ms, stages)?;

        // Walk from the top stage down; each stage carries everything above it
        let mut sized = Vec::with_capacity(stages.len());
        let mut above = requirement.payload_mass_kg;
        for (index, stage) in stages.iter().enumerate().rev() {
            let delta_v = allocations[index];
            let carried = above + stage.interface_mass_kg;
            let mass = stage.stage_mass_for(carried, delta_v).ok_or_else(|| {
                SizingError::infeasible(
                    Some(index),
                    format!(
                        "{:.0} m/s needs mass ratio {:.3}, structural fraction {} allows below {:.3}",
                        delta_v,
                        stage.mass_ratio_for(delta_v),
                        stage.structural_fraction,
                        1.0 / stage.structural_fraction
                    ),
                )
            })?;

            let ignition = carried + mass;
            tracing::debug!(
                stage = index + 1,
                delta_v,
                carried,
                mass,
                "sized stage"
            );
            sized.push(StageMass {
                index,
                delta_v_ms: delta_v,
                mass_ratio: stage.mass_ratio_for(delta_v),
                structure_mass_kg: stage.structural_fraction * mass,
                propellant_mass_kg: (1.0 - stage.structural_fraction) * mass,
                interface_mass_kg: stage.interface_mass_kg,
                carried_mass_kg: carried,
                ignition_mass_kg: ignition,
            });
            above = ignition;
        }
        sized.reverse();

        let achieved: f64 = sized
            .iter()
            .zip(stages)
            .map(|(s, spec)| spec.delta_v(s.carried_mass_kg, s.stage_mass_kg()))
            .sum();

        let result = SizingResult {
            liftoff_mass_kg: above,
            payload_mass_kg: requirement.payload_mass_kg,
            target_delta_v_ms: requirement.delta_v_ms,
            achieved_delta_v_ms: achieved,
            stages: sized,
            allocation: self.config.allocation.clone(),
        };

        if !result.meets_target() {
            return Err(SizingError::infeasible(
                None,
                format!(
                    "achieved {:.3} m/s falls short of {:.3} m/s",
                    achieved, requirement.delta_v_ms
                ),
            ));
        }

        tracing::info!(
            liftoff_mass_kg = result.liftoff_mass_kg,
            achieved_delta_v = result.achieved_delta_v_ms,
            allocation = self.config.allocation.name(),
            "sized vehicle"
        );
        Ok(result)
    }

    /// Per-stage delta-v in burn order
    fn allocate(&self, delta_v: f64, stages: &[StageSpec]) -> Result<Vec<f64>, SizingError> {
        let n = stages.len();
        match &self.config.allocation {
            DeltaVAllocation::Uniform => Ok(vec![delta_v / n as f64; n]),
            DeltaVAllocation::Weighted(weights) => {
                if weights.len() != n {
                    return Err(SizingError::invalid(
                        None,
                        format!("{} allocation weights for {} stages", weights.len(), n),
                    ));
                }
                if let Some(index) = weights.iter().position(|w| !w.is_finite() || *w < 0.0) {
                    return Err(SizingError::invalid(
                        Some(index),
                        format!("allocation weight {} must be finite and non-negative", weights[index]),
                    ));
                }
                let total: f64 = weights.iter().sum();
                if total <= 0.0 {
                    return Err(SizingError::invalid(None, "allocation weights sum to zero"));
                }
                Ok(weights.iter().map(|w| delta_v * w / total).collect())
            }
            DeltaVAllocation::MinimumMass => minimum_mass_allocation(delta_v, stages),
        }
    }
}

/// Size with the default (uniform) allocation
pub fn size(
    requirement: &MissionRequirement,
    stages: &[StageSpec],
) -> Result<SizingResult, SizingError> {
    StageSizer::default().size(requirement, stages)
}

/// Optimal staging by Lagrange multiplier
///
/// Minimising ln(liftoff / payload) subject to Σ cᵢ ln Rᵢ = Δv gives
/// Rᵢ = (λcᵢ − 1) / (λcᵢfᵢ), clamped at 1 for stages the optimum leaves
/// unburned. Δv(λ) is monotone, so λ is found by bisection. Caller has
/// already checked Δv is below the stack limit.
fn minimum_mass_allocation(delta_v: f64, stages: &[StageSpec]) -> Result<Vec<f64>, SizingError> {
    if let Some(index) = stages.iter().position(|s| s.structural_fraction <= 0.0) {
        return Err(SizingError::invalid(
            Some(index),
            "minimum-mass allocation needs a positive structural fraction",
        ));
    }
    if delta_v == 0.0 {
        return Ok(vec![0.0; stages.len()]);
    }

    let split = |lambda: f64| -> Vec<f64> {
        stages
            .iter()
            .map(|s| {
                let c = s.exhaust_velocity_ms();
                let ratio = ((lambda * c - 1.0) / (lambda * c * s.structural_fraction)).max(1.0);
                c * ratio.ln()
            })
            .collect()
    };
    let total = |lambda: f64| -> f64 { split(lambda).iter().sum() };

    // Below this every stage has R <= 1
    let mut lo = stages
        .iter()
        .map(|s| 1.0 / (s.exhaust_velocity_ms() * (1.0 - s.structural_fraction)))
        .fold(f64::INFINITY, f64::min);
    let mut hi = lo * 2.0;
    let mut doublings = 0;
    while total(hi) < delta_v {
        hi *= 2.0;
        doublings += 1;
        if doublings > 1000 || !hi.is_finite() {
            return Err(SizingError::infeasible(
                None,
                "minimum-mass multiplier search diverged",
            ));
        }
    }

    for _ in 0..solver::BISECTION_ITERATIONS {
        let mid = 0.5 * (lo + hi);
        if total(mid) < delta_v {
            lo = mid;
        } else {
            hi = mid;
        }
    }

    // hi overshoots by a hair; scaling down keeps every stage inside its limit
    let allocations = split(hi);
    let sum: f64 = allocations.iter().sum();
    Ok(allocations.into_iter().map(|dv| dv * delta_v / sum).collect())
}
