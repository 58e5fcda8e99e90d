use serde::{Deserialize, Serialize};

use crate::constants::physics;
use crate::error::SizingError;

/// Propulsion parameters of one stage in a sizing problem
///
/// A design is an ordered slice of these; index 0 is the first stage to burn.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StageSpec {
    /// Specific impulse in seconds
    pub specific_impulse_s: f64,
    /// Non-propellant share of the stage's own mass (tanks, engines, casing)
    pub structural_fraction: f64,
    /// Fixed adapter mass between this stage and what it carries, in kg
    #[serde(default)]
    pub interface_mass_kg: f64,
}

impl StageSpec {
    pub fn new(specific_impulse_s: f64, structural_fraction: f64) -> Self {
        Self {
            specific_impulse_s,
            structural_fraction,
            interface_mass_kg: 0.0,
        }
    }

    /// Attach a fixed interface mass carried by this stage
    pub fn with_interface_mass(mut self, interface_mass_kg: f64) -> Self {
        self.interface_mass_kg = interface_mass_kg;
        self
    }

    /// Exhaust velocity in m/s (Isp × g0)
    pub fn exhaust_velocity_ms(&self) -> f64 {
        self.specific_impulse_s * physics::G0
    }

    /// Check the stage is physically meaningful
    ///
    /// # Arguments
    /// * `index` - Position of the stage, used in the error
    pub fn validate(&self, index: usize) -> Result<(), SizingError> {
        let isp = self.specific_impulse_s;
        if !isp.is_finite() || isp <= 0.0 {
            return Err(SizingError::invalid(
                Some(index),
                format!("specific impulse {isp} s must be finite and positive"),
            ));
        }

        let f = self.structural_fraction;
        if !f.is_finite() || f < 0.0 {
            return Err(SizingError::invalid(
                Some(index),
                format!("structural fraction {f} must be finite and non-negative"),
            ));
        }
        if f >= 1.0 {
            // No room left for propellant
            return Err(SizingError::invalid(
                Some(index),
                format!("structural fraction {f} must be below 1"),
            ));
        }

        let interface = self.interface_mass_kg;
        if !interface.is_finite() || interface < 0.0 {
            return Err(SizingError::invalid(
                Some(index),
                format!("interface mass {interface} kg must be finite and non-negative"),
            ));
        }
        Ok(())
    }

    /// Asymptotic delta-v limit of this stage in m/s
    ///
    /// As stage mass grows without bound the mass ratio approaches 1/f,
    /// so the stage can never exceed Ve × ln(1/f). Infinite for f = 0.
    pub fn delta_v_limit(&self) -> f64 {
        if self.structural_fraction <= 0.0 {
            f64::INFINITY
        } else {
            self.exhaust_velocity_ms() * (1.0 / self.structural_fraction).ln()
        }
    }

    /// Mass ratio R = m0/mf needed for a delta-v allocation
    pub fn mass_ratio_for(&self, delta_v: f64) -> f64 {
        (delta_v / self.exhaust_velocity_ms()).exp()
    }

    /// Stage mass (structure + propellant) that gives `delta_v` while carrying `carried_kg`
    ///
    /// Solves R = (carried + m) / (carried + f × m) for m:
    /// m = carried × (R − 1) / (1 − R × f)
    ///
    /// Returns `None` when 1 − R × f ≤ 0: the structure alone is too heavy
    /// for the required mass ratio at any size.
    pub fn stage_mass_for(&self, carried_kg: f64, delta_v: f64) -> Option<f64> {
        let ratio = self.mass_ratio_for(delta_v);
        let denominator = 1.0 - ratio * self.structural_fraction;
        if denominator <= 0.0 {
            return None;
        }
        Some(carried_kg * (ratio - 1.0) / denominator)
    }

    /// Delta-v this stage provides at a given stage mass
    ///
    /// # Arguments
    /// * `carried_kg` - Mass above this stage, including its interface mass
    /// * `stage_mass_kg` - Structure + propellant of this stage
    pub fn delta_v(&self, carried_kg: f64, stage_mass_kg: f64) -> f64 {
        let m0 = carried_kg + stage_mass_kg;
        let mf = carried_kg + self.structural_fraction * stage_mass_kg;
        // Tsiolkovsky: Δv = Ve × ln(m0/mf)
        self.exhaust_velocity_ms() * (m0 / mf).ln()
    }
}
