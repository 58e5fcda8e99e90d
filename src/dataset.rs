use rand::Rng;
use rand_distr::{Distribution, LogNormal};
use serde::{Deserialize, Serialize};

use crate::cost::RegressionForm;
use crate::error::{ConfigError, CostError};

/// One historical (production rate, cost per mass) observation
///
/// Validated on construction: both values are finite and positive.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawDataPoint")]
pub struct LaunchDataPoint {
    production_rate: f64,
    cost_per_mass: f64,
}

#[derive(Deserialize)]
struct RawDataPoint {
    production_rate: f64,
    cost_per_mass: f64,
}

impl TryFrom<RawDataPoint> for LaunchDataPoint {
    type Error = CostError;

    fn try_from(raw: RawDataPoint) -> Result<Self, Self::Error> {
        LaunchDataPoint::new(raw.production_rate, raw.cost_per_mass)
    }
}

impl LaunchDataPoint {
    /// # Arguments
    /// * `production_rate` - Units built per year
    /// * `cost_per_mass` - Unit cost per liftoff kilogram in USD/kg
    pub fn new(production_rate: f64, cost_per_mass: f64) -> Result<Self, CostError> {
        let valid = |v: f64| v.is_finite() && v > 0.0;
        if !valid(production_rate) || !valid(cost_per_mass) {
            return Err(CostError::InvalidDataPoint {
                production_rate,
                cost_per_mass,
            });
        }
        Ok(Self {
            production_rate,
            cost_per_mass,
        })
    }

    /// Units per year
    pub fn production_rate(&self) -> f64 {
        self.production_rate
    }

    /// Years per unit
    pub fn production_period(&self) -> f64 {
        1.0 / self.production_rate
    }

    /// USD per liftoff kg
    pub fn cost_per_mass(&self) -> f64 {
        self.cost_per_mass
    }
}

/// A flown launch vehicle, as collected for the cost regression
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LaunchVehicleRecord {
    pub name: &'static str,
    pub liftoff_mass_kg: f64,
    pub unit_cost_usd: f64,
    /// Units flown per year over the vehicle's service life
    pub production_rate: f64,
}

impl LaunchVehicleRecord {
    const fn new(
        name: &'static str,
        liftoff_mass_kg: f64,
        unit_cost_usd: f64,
        production_rate: f64,
    ) -> Self {
        Self {
            name,
            liftoff_mass_kg,
            unit_cost_usd,
            production_rate,
        }
    }

    pub fn cost_per_mass(&self) -> f64 {
        self.unit_cost_usd / self.liftoff_mass_kg
    }

    pub fn to_data_point(&self) -> Result<LaunchDataPoint, CostError> {
        LaunchDataPoint::new(self.production_rate, self.cost_per_mass())
    }
}

/// Historical vehicles: liftoff mass, unit cost, and flights per year of service
///
/// Rates are total units over years in service, counted up to 2015 for
/// vehicles still flying then.
pub fn historical_vehicles() -> Vec<LaunchVehicleRecord> {
    vec![
        // Reference point outside launch: a high-rate airliner
        LaunchVehicleRecord::new("747", 240e3, 350e6, 1500.0 / 47.0),
        LaunchVehicleRecord::new("Delta IV H", 730e3, 400e6, 8.0 / 10.0),
        LaunchVehicleRecord::new("Atlas V", 334.5e3, 173e6, 58.0 / 13.0),
        LaunchVehicleRecord::new("Falcon 9", 505.8e3, 61e6, 19.0 / 5.0),
        LaunchVehicleRecord::new("Falcon 1", 38e3, 7.9e6, 5.0 / 3.0),
        LaunchVehicleRecord::new("Electron", 6e3, 5e6, 1.0),
        LaunchVehicleRecord::new("Minotaur I", 36e3, 28.8e6, 11.0 / 15.0),
        LaunchVehicleRecord::new("Minotaur IV", 86.3e3, 50e6, 5.0 / 5.0),
        LaunchVehicleRecord::new("Proton M", 712.8e3, 83e6, 117.0 / 14.0),
        LaunchVehicleRecord::new("Vega", 137e3, 23e6, 5.0 / 3.0),
        LaunchVehicleRecord::new("Ariane 5", 777e3, 220e6, 82.0 / 19.0),
        LaunchVehicleRecord::new("Dnepr", 211e3, 14e6, 22.0 / 16.0),
        LaunchVehicleRecord::new("Shavit", 50e3, 15e6, 9.0 / 27.0),
        LaunchVehicleRecord::new("Delta II", 200e3, 107e6, 153.0 / 26.0),
        LaunchVehicleRecord::new("Energia", 2400e3, 240e6, 2.0),
        LaunchVehicleRecord::new("Shuttle", 2030e3, 1e9, 135.0 / 30.0),
        LaunchVehicleRecord::new("Titan IV", 943e3, 432e6, 39.0 / 16.0),
    ]
}

/// Cost regression dataset built from [`historical_vehicles`]
pub fn historical_dataset() -> Vec<LaunchDataPoint> {
    historical_vehicles()
        .iter()
        .filter_map(|v| v.to_data_point().ok())
        .collect()
}

/// Parse a dataset from a JSON array of `{production_rate, cost_per_mass}`
pub fn dataset_from_json(json: &str) -> Result<Vec<LaunchDataPoint>, ConfigError> {
    Ok(serde_json::from_str(json)?)
}

/// Draw a noisy dataset around a known line for sweeps and robustness checks
///
/// Points are spread log-uniformly over `rate_range` and scattered by a
/// multiplicative log-normal factor with standard deviation `noise_sigma` in
/// log space. The first `outliers` points are then multiplied by
/// `outlier_factor`.
///
/// # Errors
/// * `InvalidRate` - a bound of `rate_range` that is not finite and positive
/// * `InvalidRateRange` - the upper bound is below the lower
/// * `InvalidNoise` - a negative or non-finite `noise_sigma`
#[allow(clippy::too_many_arguments)]
pub fn synthetic_dataset<R: Rng + ?Sized>(
    rng: &mut R,
    form: RegressionForm,
    intercept: f64,
    slope: f64,
    rate_range: (f64, f64),
    count: usize,
    noise_sigma: f64,
    outliers: usize,
    outlier_factor: f64,
) -> Result<Vec<LaunchDataPoint>, CostError> {
    let (lo, hi) = rate_range;
    for bound in [lo, hi] {
        if !bound.is_finite() || bound <= 0.0 {
            return Err(CostError::InvalidRate(bound));
        }
    }
    if hi < lo {
        return Err(CostError::InvalidRateRange { low: lo, high: hi });
    }
    if !noise_sigma.is_finite() || noise_sigma < 0.0 {
        return Err(CostError::InvalidNoise(noise_sigma));
    }
    let noise =
        LogNormal::new(0.0, noise_sigma).map_err(|_| CostError::InvalidNoise(noise_sigma))?;

    (0..count)
        .map(|i| {
            let rate = (lo.ln() + rng.gen::<f64>() * (hi.ln() - lo.ln())).exp();
            let clean = form.cost_from_response(intercept + slope * form.regressor(rate));
            let mut cost = clean * noise.sample(&mut *rng);
            if i < outliers {
                cost *= outlier_factor;
            }
            LaunchDataPoint::new(rate, cost)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn test_data_point_validation() {
        assert!(LaunchDataPoint::new(6.0, 150.0).is_ok());
        assert!(LaunchDataPoint::new(0.0, 150.0).is_err());
        assert!(LaunchDataPoint::new(6.0, -1.0).is_err());
        assert!(LaunchDataPoint::new(f64::INFINITY, 150.0).is_err());
    }

    #[test]
    fn test_production_period() {
        let point = LaunchDataPoint::new(4.0, 100.0).unwrap();
        assert_eq!(point.production_period(), 0.25);
    }

    #[test]
    fn test_historical_cost_per_mass() {
        let vehicles = historical_vehicles();
        assert_eq!(vehicles.len(), 17);
        let falcon9 = vehicles.iter().find(|v| v.name == "Falcon 9").unwrap();
        // $61M / 505.8 t ≈ $120.6/kg
        assert!((falcon9.cost_per_mass() - 120.6).abs() < 0.1);
        assert_eq!(historical_dataset().len(), 17);
    }

    #[test]
    fn test_dataset_from_json() {
        let json = r#"[
            {"production_rate": 1.0, "cost_per_mass": 600.0},
            {"production_rate": 4.0, "cost_per_mass": 225.0}
        ]"#;
        let dataset = dataset_from_json(json).unwrap();
        assert_eq!(dataset.len(), 2);
        assert_eq!(dataset[1].production_rate(), 4.0);
    }

    #[test]
    fn test_dataset_from_json_rejects_bad_point() {
        let json = r#"[{"production_rate": -1.0, "cost_per_mass": 600.0}]"#;
        assert!(dataset_from_json(json).is_err());
    }

    #[test]
    fn test_synthetic_dataset_without_noise_lies_on_line() {
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let data = synthetic_dataset(
            &mut rng,
            RegressionForm::LinearInPeriod,
            100.0,
            500.0,
            (0.5, 10.0),
            8,
            0.0,
            0,
            1.0,
        )
        .unwrap();
        assert_eq!(data.len(), 8);
        for p in &data {
            assert!(p.production_rate() >= 0.5 && p.production_rate() <= 10.0);
            let expected = 100.0 + 500.0 * p.production_period();
            assert!((p.cost_per_mass() - expected).abs() < 1e-9);
        }
    }

    #[test]
    fn test_synthetic_dataset_rejects_bad_inputs() {
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let mut draw = |range: (f64, f64), sigma: f64| {
            synthetic_dataset(
                &mut rng,
                RegressionForm::LinearInPeriod,
                100.0,
                500.0,
                range,
                4,
                sigma,
                0,
                1.0,
            )
        };
        assert!(matches!(
            draw((0.5, f64::NAN), 0.1).unwrap_err(),
            CostError::InvalidRate(v) if v.is_nan()
        ));
        assert_eq!(draw((0.0, 10.0), 0.1).unwrap_err(), CostError::InvalidRate(0.0));
        assert_eq!(draw((0.5, -2.0), 0.1).unwrap_err(), CostError::InvalidRate(-2.0));
        assert_eq!(
            draw((10.0, 0.5), 0.1).unwrap_err(),
            CostError::InvalidRateRange { low: 10.0, high: 0.5 }
        );
        assert_eq!(draw((0.5, 10.0), -0.1).unwrap_err(), CostError::InvalidNoise(-0.1));
        assert!(draw((0.5, 10.0), f64::INFINITY).is_err());
    }

    #[test]
    fn test_synthetic_dataset_outliers() {
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let data = synthetic_dataset(
            &mut rng,
            RegressionForm::LinearInPeriod,
            100.0,
            500.0,
            (0.5, 10.0),
            8,
            0.0,
            2,
            10.0,
        )
        .unwrap();
        let expected = 100.0 + 500.0 * data[0].production_period();
        assert!((data[0].cost_per_mass() / expected - 10.0).abs() < 1e-9);
    }
}
