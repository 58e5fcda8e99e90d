use std::f64::consts::PI;

use serde::Serialize;

use crate::constants::{materials, physics};
use crate::stage::StageSpec;

/// A built stage with a pressurised cylindrical tank
///
/// Used for forward analysis: given hardware, how much delta-v does it give.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TankedStage {
    pub diameter_m: f64,
    pub propellant_mass_kg: f64,
    /// Engines, avionics, and other inert mass outside the tank
    pub non_tank_mass_kg: f64,
    pub specific_impulse_s: f64,
    pub propellant_density_kg_m3: f64,
    pub tank_pressure_pa: f64,
    /// Max tensile stress of the tank wall material
    pub wall_max_stress_pa: f64,
    pub wall_density_kg_m3: f64,
}

impl TankedStage {
    /// Create a stage with aluminium tanks and liquid propellant
    pub fn new(
        diameter_m: f64,
        propellant_mass_kg: f64,
        non_tank_mass_kg: f64,
        specific_impulse_s: f64,
    ) -> Self {
        Self {
            diameter_m,
            propellant_mass_kg,
            non_tank_mass_kg,
            specific_impulse_s,
            propellant_density_kg_m3: materials::LIQUID_PROPELLANT_DENSITY_KG_M3,
            tank_pressure_pa: materials::TANK_PRESSURE_PA,
            wall_max_stress_pa: materials::ALUMINIUM_MAX_STRESS_PA,
            wall_density_kg_m3: materials::ALUMINIUM_DENSITY_KG_M3,
        }
    }

    /// Solid motor: dense propellant in a composite casing
    pub fn solid_motor(self) -> Self {
        Self {
            propellant_density_kg_m3: materials::SOLID_PROPELLANT_DENSITY_KG_M3,
            wall_max_stress_pa: materials::COMPOSITE_MAX_STRESS_PA,
            wall_density_kg_m3: materials::COMPOSITE_DENSITY_KG_M3,
            ..self
        }
    }

    /// Titanium alloy tank walls
    pub fn titanium_tanks(self) -> Self {
        Self {
            wall_max_stress_pa: materials::TITANIUM_MAX_STRESS_PA,
            wall_density_kg_m3: materials::TITANIUM_DENSITY_KG_M3,
            ..self
        }
    }

    pub fn radius_m(&self) -> f64 {
        self.diameter_m / 2.0
    }

    /// Axial length of the propellant tank in m
    pub fn tank_length_m(&self) -> f64 {
        let volume = self.propellant_mass_kg / self.propellant_density_kg_m3;
        volume / (PI * self.radius_m().powi(2))
    }

    /// Wall thickness to hold tank pressure (thin-wall hoop stress) in m
    pub fn wall_thickness_m(&self) -> f64 {
        self.tank_pressure_pa * self.radius_m() / self.wall_max_stress_pa
    }

    /// Dry mass of the tank in kg
    ///
    /// Barrel plus domes; the dome area is 1.5 × a sphere of the tank radius.
    pub fn tank_mass_kg(&self) -> f64 {
        let r = self.radius_m();
        let surface_area = self.tank_length_m() * 2.0 * PI * r + 1.5 * (4.0 * PI * r.powi(2));
        surface_area * self.wall_thickness_m() * self.wall_density_kg_m3
    }

    /// Tank + non-tank inert mass
    pub fn dry_mass_kg(&self) -> f64 {
        self.tank_mass_kg() + self.non_tank_mass_kg
    }

    pub fn total_mass_kg(&self) -> f64 {
        self.dry_mass_kg() + self.propellant_mass_kg
    }

    /// Propellant / total stage mass
    pub fn propellant_fraction(&self) -> f64 {
        self.propellant_mass_kg / self.total_mass_kg()
    }

    /// Delta-v this stage provides given the mass above it
    ///
    /// # Arguments
    /// * `payload_mass_kg` - Mass above this stage (payload + upper stages)
    pub fn delta_v(&self, payload_mass_kg: f64) -> f64 {
        let mf = self.dry_mass_kg() + payload_mass_kg;
        let m0 = mf + self.propellant_mass_kg;
        self.specific_impulse_s * physics::G0 * (m0 / mf).ln()
    }

    /// Equivalent sizing parameters: Isp and dry / total as structural fraction
    pub fn to_stage_spec(&self) -> StageSpec {
        StageSpec::new(self.specific_impulse_s, self.dry_mass_kg() / self.total_mass_kg())
    }
}

/// Per-stage performance for a report
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StagePerformance {
    /// 1-based stage number
    pub stage: usize,
    pub total_mass_kg: f64,
    pub propellant_mass_kg: f64,
    pub propellant_fraction: f64,
    pub tank_length_m: f64,
    pub diameter_m: f64,
    pub specific_impulse_s: f64,
    pub delta_v_ms: f64,
}

/// A stack of built stages with a payload on top
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MultiStageVehicle {
    /// Index 0 is the first stage to burn
    pub stages: Vec<TankedStage>,
    pub payload_mass_kg: f64,
}

impl MultiStageVehicle {
    pub fn new(stages: Vec<TankedStage>, payload_mass_kg: f64) -> Self {
        Self {
            stages,
            payload_mass_kg,
        }
    }

    /// Mass carried by a stage: payload plus every stage above it
    ///
    /// An index at or past the top stage carries only the payload.
    pub fn mass_above_stage(&self, stage_index: usize) -> f64 {
        self.payload_mass_kg
            + self
                .stages
                .iter()
                .skip(stage_index.saturating_add(1))
                .map(TankedStage::total_mass_kg)
                .sum::<f64>()
    }

    /// Delta-v of each stage, counting everything above as its payload
    pub fn stage_delta_v(&self) -> Vec<f64> {
        (0..self.stages.len())
            .map(|i| self.stages[i].delta_v(self.mass_above_stage(i)))
            .collect()
    }

    pub fn total_delta_v(&self) -> f64 {
        self.stage_delta_v().iter().sum()
    }

    /// Stage masses only, without payload
    pub fn pad_mass_kg(&self) -> f64 {
        self.stages.iter().map(TankedStage::total_mass_kg).sum()
    }

    pub fn liftoff_mass_kg(&self) -> f64 {
        self.pad_mass_kg() + self.payload_mass_kg
    }

    pub fn stage_specs(&self) -> Vec<StageSpec> {
        self.stages.iter().map(TankedStage::to_stage_spec).collect()
    }

    pub fn performance(&self) -> Vec<StagePerformance> {
        self.stages
            .iter()
            .zip(self.stage_delta_v())
            .enumerate()
            .map(|(i, (stage, delta_v))| StagePerformance {
                stage: i + 1,
                total_mass_kg: stage.total_mass_kg(),
                propellant_mass_kg: stage.propellant_mass_kg,
                propellant_fraction: stage.propellant_fraction(),
                tank_length_m: stage.tank_length_m(),
                diameter_m: stage.diameter_m,
                specific_impulse_s: stage.specific_impulse_s,
                delta_v_ms: delta_v,
            })
            .collect()
    }
}

/// Four-stage nanosat launcher for a 10 kg payload
///
/// Three composite-cased solid motors and a pressure-fed liquid upper stage
/// with titanium tanks.
pub fn reference_nanosat_launcher() -> MultiStageVehicle {
    let booster = TankedStage::new(0.8, 1.5e3, 100.0, 230.0).solid_motor();
    let sustainer = TankedStage::new(0.5, 750.0, 50.0, 230.0).solid_motor();
    let sustainer_2 = TankedStage::new(0.5, 500.0, 25.0, 230.0).solid_motor();
    let upper = TankedStage::new(0.5, 200.0, 20.0, 320.0).titanium_tanks();
    MultiStageVehicle::new(vec![booster, sustainer, sustainer_2, upper], 10.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sizing::{size, MissionRequirement};

    #[test]
    fn test_tank_geometry() {
        let stage = TankedStage::new(0.5, 200.0, 20.0, 320.0);
        // 200 kg / 800 kg/m³ = 0.25 m³ over π × 0.25² m² ≈ 1.273 m
        assert!((stage.tank_length_m() - 1.2732).abs() < 1e-3);
        // 5 MPa × 0.25 m / 200 MPa = 6.25 mm
        assert!((stage.wall_thickness_m() - 0.00625).abs() < 1e-12);
    }

    #[test]
    fn test_tank_mass() {
        let stage = TankedStage::new(0.8, 1.5e3, 100.0, 230.0).solid_motor();
        // L ≈ 2.487 m, t = 5 mm
        // area = 2.487 × 2π × 0.4 + 1.5 × 4π × 0.16 ≈ 6.250 + 3.016 = 9.266 m²
        // mass = 9.266 × 0.005 × 2000 ≈ 92.66 kg
        assert!(
            (stage.tank_mass_kg() - 92.66).abs() < 0.05,
            "Expected ~92.66 kg, got {}",
            stage.tank_mass_kg()
        );
        assert!((stage.total_mass_kg() - 1692.66).abs() < 0.05);
    }

    #[test]
    fn test_titanium_tanks_are_thinner() {
        let aluminium = TankedStage::new(0.5, 200.0, 20.0, 320.0);
        let titanium = aluminium.clone().titanium_tanks();
        assert!(titanium.wall_thickness_m() < aluminium.wall_thickness_m());
        assert_eq!(titanium.propellant_density_kg_m3, aluminium.propellant_density_kg_m3);
    }

    #[test]
    fn test_delta_v_decreases_with_payload() {
        let stage = TankedStage::new(0.5, 200.0, 20.0, 320.0);
        assert!(stage.delta_v(10.0) > stage.delta_v(100.0));
    }

    #[test]
    fn test_reference_launcher_performance() {
        let vehicle = reference_nanosat_launcher();
        let delta_v = vehicle.total_delta_v();
        assert!(
            (delta_v - 9474.0).abs() < 5.0,
            "Expected ~9474 m/s, got {}",
            delta_v
        );
        let pad = vehicle.pad_mass_kg();
        assert!((pad - 3334.3).abs() < 1.0, "Expected ~3334 kg, got {}", pad);
        assert!((vehicle.liftoff_mass_kg() - pad - 10.0).abs() < 1e-9);

        let stage_dv = vehicle.stage_delta_v();
        // Upper stage does the most work
        assert!((stage_dv[3] - 4611.4).abs() < 1.0, "upper stage {}", stage_dv[3]);
        assert!(stage_dv[0] < stage_dv[3]);
    }

    #[test]
    fn test_mass_above_stage() {
        let vehicle = reference_nanosat_launcher();
        let upper = vehicle.stages[3].total_mass_kg();
        assert!((vehicle.mass_above_stage(2) - (10.0 + upper)).abs() < 1e-9);
        assert_eq!(vehicle.mass_above_stage(3), 10.0);
        // Past the top of the stack
        assert_eq!(vehicle.mass_above_stage(4), 10.0);
        assert_eq!(vehicle.mass_above_stage(usize::MAX), 10.0);
    }

    #[test]
    fn test_performance_rows() {
        let vehicle = reference_nanosat_launcher();
        let rows = vehicle.performance();
        assert_eq!(rows.len(), 4);
        assert_eq!(rows[0].stage, 1);
        assert_eq!(rows[3].specific_impulse_s, 320.0);
        for row in &rows {
            assert!(row.propellant_fraction > 0.8 && row.propellant_fraction < 1.0);
        }
    }

    #[test]
    fn test_resizing_reference_design_recovers_mass() {
        // Built stages, turned into sizing parameters and sized to the same
        // per-stage delta-v, give back the same liftoff mass
        let vehicle = reference_nanosat_launcher();
        let specs = vehicle.stage_specs();
        let stage_dv = vehicle.stage_delta_v();
        let total: f64 = stage_dv.iter().sum();

        let sizer = crate::sizing::StageSizer::with_allocation(
            crate::sizing::DeltaVAllocation::Weighted(stage_dv.clone()),
        );
        let result = sizer
            .size(&MissionRequirement::new(total, vehicle.payload_mass_kg), &specs)
            .unwrap();
        assert!(
            (result.liftoff_mass_kg - vehicle.liftoff_mass_kg()).abs() < 1e-6,
            "{} vs {}",
            result.liftoff_mass_kg,
            vehicle.liftoff_mass_kg()
        );

        // Uniform split of the same total on the same hardware class
        let uniform = size(&MissionRequirement::new(total, 10.0), &specs).unwrap();
        assert!(uniform.meets_target());
    }
}
