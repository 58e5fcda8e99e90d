/// Physical constants shared by the sizing and vehicle analysis
pub mod physics {
    /// Standard gravity used to convert specific impulse to exhaust velocity in m/s²
    pub const G0: f64 = 9.81;
}

/// Default tank and material properties for a tank-based stage
pub mod materials {
    /// Liquid propellant effective combined density in kg/m³
    pub const LIQUID_PROPELLANT_DENSITY_KG_M3: f64 = 800.0;

    /// Solid propellant density in kg/m³
    pub const SOLID_PROPELLANT_DENSITY_KG_M3: f64 = 1200.0;

    /// Tank operating pressure in Pa
    pub const TANK_PRESSURE_PA: f64 = 5e6;

    /// Max tensile stress of an aluminium tank wall in Pa
    pub const ALUMINIUM_MAX_STRESS_PA: f64 = 200e6;
    /// Aluminium wall density in kg/m³
    pub const ALUMINIUM_DENSITY_KG_M3: f64 = 3000.0;

    /// Composite motor casing
    pub const COMPOSITE_MAX_STRESS_PA: f64 = 400e6;
    pub const COMPOSITE_DENSITY_KG_M3: f64 = 2000.0;

    /// Titanium alloy tanks
    pub const TITANIUM_MAX_STRESS_PA: f64 = 600e6;
    pub const TITANIUM_DENSITY_KG_M3: f64 = 4500.0;
}

/// Consensus-fit defaults
pub mod estimator {
    /// Candidate fits drawn when the pair search is not exhaustive
    pub const DEFAULT_MAX_TRIALS: usize = 100;

    /// Datasets up to this size try every pair (64 points is 2016 pairs)
    pub const DEFAULT_EXHAUSTIVE_LIMIT: usize = 64;

    /// Least-squares refits allowed while the inlier set settles
    pub const MAX_REFITS: usize = 50;

    /// Seed for the candidate sampler
    pub const DEFAULT_SEED: u64 = 0x5eed;

    /// Floor for a median-absolute-deviation threshold (all-equal costs give MAD = 0)
    pub const MIN_RESIDUAL_THRESHOLD: f64 = 1e-9;
}

/// Sizing solver settings
pub mod solver {
    /// Relative tolerance on achieved vs requested delta-v
    pub const DELTA_V_RELATIVE_TOLERANCE: f64 = 1e-6;

    /// Bisection iterations for the minimum-mass multiplier
    pub const BISECTION_ITERATIONS: usize = 200;
}
