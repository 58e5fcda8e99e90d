//! Consensus-based cost-per-mass regression
//!
//! Launch cost data is sparse and noisy: a handful of vehicles, a few of
//! which sit far from any trend. The estimator fits an exact line through
//! each candidate pair of points, keeps the line most of the data agrees
//! with, and refits that agreeing set by ordinary least squares until the
//! set stops changing. Datasets of up to a few dozen points try every pair,
//! so the result does not depend on sampling.

use std::fmt;

use rand::seq::index;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::config::EstimatorConfig;
use crate::constants::estimator;
use crate::dataset::LaunchDataPoint;
use crate::error::CostError;

/// Shape of the cost-vs-rate line, y = a + b·x
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegressionForm {
    /// x = 1/rate (years per unit), y = cost per kg
    ///
    /// Fixed costs spread over fewer units per year show up as a slope
    /// in production period.
    #[default]
    LinearInPeriod,
    /// x = rate, y = cost per kg
    Linear,
    /// x = ln(rate), y = ln(cost per kg), a power law
    LogLog,
}

impl RegressionForm {
    pub fn name(&self) -> &'static str {
        match self {
            RegressionForm::LinearInPeriod => "linear-in-period",
            RegressionForm::Linear => "linear",
            RegressionForm::LogLog => "log-log",
        }
    }

    /// Regressor x for a production rate
    pub fn regressor(&self, production_rate: f64) -> f64 {
        match self {
            RegressionForm::LinearInPeriod => 1.0 / production_rate,
            RegressionForm::Linear => production_rate,
            RegressionForm::LogLog => production_rate.ln(),
        }
    }

    /// Response y for a cost per mass; residuals are measured in this scale
    pub fn response(&self, cost_per_mass: f64) -> f64 {
        match self {
            RegressionForm::LinearInPeriod | RegressionForm::Linear => cost_per_mass,
            RegressionForm::LogLog => cost_per_mass.ln(),
        }
    }

    /// Inverse of [`response`](Self::response)
    pub fn cost_from_response(&self, response: f64) -> f64 {
        match self {
            RegressionForm::LinearInPeriod | RegressionForm::Linear => response,
            RegressionForm::LogLog => response.exp(),
        }
    }
}

/// Residual below which a point supports a candidate line
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResidualThreshold {
    /// Median absolute deviation of the responses
    #[default]
    MedianAbsoluteDeviation,
    /// Fixed threshold in the form's response scale
    Absolute(f64),
}

impl ResidualThreshold {
    fn resolve(&self, responses: &[f64]) -> Result<f64, CostError> {
        match *self {
            ResidualThreshold::Absolute(t) => {
                if t.is_finite() && t > 0.0 {
                    Ok(t)
                } else {
                    Err(CostError::InvalidThreshold(t))
                }
            }
            ResidualThreshold::MedianAbsoluteDeviation => {
                let center = median(responses.to_vec());
                let deviations = responses.iter().map(|y| (y - center).abs()).collect();
                Ok(median(deviations).max(estimator::MIN_RESIDUAL_THRESHOLD))
            }
        }
    }
}

fn median(mut values: Vec<f64>) -> f64 {
    values.sort_by(f64::total_cmp);
    let mid = values.len() / 2;
    if values.len() % 2 == 0 {
        0.5 * (values[mid - 1] + values[mid])
    } else {
        values[mid]
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Line {
    intercept: f64,
    slope: f64,
}

impl Line {
    /// Exact line through two points; `None` if they share an x
    fn through((x1, y1): (f64, f64), (x2, y2): (f64, f64)) -> Option<Self> {
        let dx = x2 - x1;
        if dx == 0.0 || !dx.is_finite() {
            return None;
        }
        let slope = (y2 - y1) / dx;
        Some(Self {
            intercept: y1 - slope * x1,
            slope,
        })
    }

    /// Ordinary least squares; `None` without spread in x
    fn least_squares(points: &[(f64, f64)]) -> Option<Self> {
        let n = points.len() as f64;
        let mean_x = points.iter().map(|p| p.0).sum::<f64>() / n;
        let mean_y = points.iter().map(|p| p.1).sum::<f64>() / n;
        let sxx: f64 = points.iter().map(|(x, _)| (x - mean_x).powi(2)).sum();
        let sxy: f64 = points.iter().map(|(x, y)| (x - mean_x) * (y - mean_y)).sum();
        if sxx <= 0.0 {
            return None;
        }
        let slope = sxy / sxx;
        Some(Self {
            intercept: mean_y - slope * mean_x,
            slope,
        })
    }

    fn eval(&self, x: f64) -> f64 {
        self.intercept + self.slope * x
    }
}

/// Fitted cost model
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CostModel {
    pub form: RegressionForm,
    /// In the form's response scale
    pub intercept: f64,
    pub slope: f64,
    /// Indices into the fitted dataset, ascending
    pub inliers: Vec<usize>,
    /// Resolved threshold in the response scale
    pub residual_threshold: f64,
    pub dataset_len: usize,
    /// Candidate lines evaluated
    pub candidates_tried: usize,
    /// Whether every pair was tried
    pub exhaustive: bool,
    pub inlier_rate_min: f64,
    pub inlier_rate_max: f64,
}

impl CostModel {
    pub fn inlier_count(&self) -> usize {
        self.inliers.len()
    }

    pub fn is_inlier(&self, index: usize) -> bool {
        self.inliers.binary_search(&index).is_ok()
    }

    /// Dataset indices the fit rejected
    pub fn outliers(&self) -> Vec<usize> {
        (0..self.dataset_len).filter(|i| !self.is_inlier(*i)).collect()
    }

    /// Predict cost per mass at a production rate
    ///
    /// # Errors
    /// `InvalidRate` if the rate is not finite and positive. A rate outside
    /// the inlier range is not an error; the estimate carries an
    /// [`ExtrapolationWarning`].
    pub fn predict(&self, production_rate: f64) -> Result<CostEstimate, CostError> {
        if !production_rate.is_finite() || production_rate <= 0.0 {
            return Err(CostError::InvalidRate(production_rate));
        }

        let line = Line {
            intercept: self.intercept,
            slope: self.slope,
        };
        let response = line.eval(self.form.regressor(production_rate));

        let extrapolation = if production_rate < self.inlier_rate_min
            || production_rate > self.inlier_rate_max
        {
            let warning = ExtrapolationWarning {
                production_rate,
                inlier_min_rate: self.inlier_rate_min,
                inlier_max_rate: self.inlier_rate_max,
            };
            tracing::warn!(%warning, "cost prediction extrapolates");
            Some(warning)
        } else {
            None
        };

        // Costs below zero are meaningless, the band floors at zero
        let low = self
            .form
            .cost_from_response(response - self.residual_threshold)
            .max(0.0);
        let high = self.form.cost_from_response(response + self.residual_threshold);

        Ok(CostEstimate {
            production_rate,
            cost_per_mass: self.form.cost_from_response(response),
            cost_per_mass_low: low,
            cost_per_mass_high: high,
            form: self.form,
            inlier_count: self.inlier_count(),
            extrapolation,
        })
    }
}

/// The requested rate lies outside the production rates that support the fit
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ExtrapolationWarning {
    pub production_rate: f64,
    pub inlier_min_rate: f64,
    pub inlier_max_rate: f64,
}

impl fmt::Display for ExtrapolationWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "rate {:.3}/yr is outside the fitted range {:.3}-{:.3}/yr",
            self.production_rate, self.inlier_min_rate, self.inlier_max_rate
        )
    }
}

/// Predicted cost per liftoff kilogram at one production rate
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CostEstimate {
    pub production_rate: f64,
    /// USD per liftoff kg
    pub cost_per_mass: f64,
    /// Prediction minus the residual threshold, floored at zero
    pub cost_per_mass_low: f64,
    /// Prediction plus the residual threshold
    pub cost_per_mass_high: f64,
    pub form: RegressionForm,
    pub inlier_count: usize,
    pub extrapolation: Option<ExtrapolationWarning>,
}

impl CostEstimate {
    pub fn is_extrapolated(&self) -> bool {
        self.extrapolation.is_some()
    }

    /// Unit cost of a vehicle with this liftoff mass
    pub fn total_cost(&self, liftoff_mass_kg: f64) -> f64 {
        self.cost_per_mass * liftoff_mass_kg
    }

    /// Combine with a sized vehicle's masses
    pub fn for_vehicle(&self, liftoff_mass_kg: f64, payload_mass_kg: f64) -> UnitCostEstimate {
        UnitCostEstimate {
            liftoff_mass_kg,
            payload_mass_kg,
            production_rate: self.production_rate,
            unit_cost_usd: self.cost_per_mass * liftoff_mass_kg,
            unit_cost_low_usd: self.cost_per_mass_low * liftoff_mass_kg,
            unit_cost_high_usd: self.cost_per_mass_high * liftoff_mass_kg,
            extrapolation: self.extrapolation,
        }
    }
}

/// Cost of one vehicle
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct UnitCostEstimate {
    pub liftoff_mass_kg: f64,
    pub payload_mass_kg: f64,
    pub production_rate: f64,
    pub unit_cost_usd: f64,
    pub unit_cost_low_usd: f64,
    pub unit_cost_high_usd: f64,
    pub extrapolation: Option<ExtrapolationWarning>,
}

impl UnitCostEstimate {
    /// Launch price per kilogram of payload, the figure rideshare prices compare to
    pub fn cost_per_payload_kg(&self) -> f64 {
        self.unit_cost_usd / self.payload_mass_kg
    }

    /// Yearly spend at the production rate
    pub fn annual_cost_usd(&self) -> f64 {
        self.unit_cost_usd * self.production_rate
    }
}

struct Candidate {
    line: Line,
    inliers: Vec<usize>,
    residual_sum: f64,
}

impl Candidate {
    fn beats(&self, other: &Candidate) -> bool {
        self.inliers.len() > other.inliers.len()
            || (self.inliers.len() == other.inliers.len() && self.residual_sum < other.residual_sum)
    }
}

/// Fits cost models by consensus over candidate point pairs
#[derive(Debug, Clone, Default)]
pub struct CostEstimator {
    config: EstimatorConfig,
}

impl CostEstimator {
    pub fn new(config: EstimatorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &EstimatorConfig {
        &self.config
    }

    /// Fit a cost model to `dataset`
    ///
    /// # Errors
    /// * `InsufficientData` - fewer than 2 points
    /// * `InvalidThreshold` - a non-positive absolute threshold
    /// * `DegenerateData` - no pair of points with distinct regressors
    pub fn fit(&self, dataset: &[LaunchDataPoint]) -> Result<CostModel, CostError> {
        let n = dataset.len();
        if n < 2 {
            return Err(CostError::InsufficientData { found: n });
        }

        let form = self.config.form;
        let points: Vec<(f64, f64)> = dataset
            .iter()
            .map(|p| (form.regressor(p.production_rate()), form.response(p.cost_per_mass())))
            .collect();
        let responses: Vec<f64> = points.iter().map(|p| p.1).collect();
        let threshold = self.config.threshold.resolve(&responses)?;

        let (pairs, exhaustive) = self.candidate_pairs(n);

        let mut best: Option<Candidate> = None;
        let mut tried = 0;
        for (i, j) in pairs {
            let Some(line) = Line::through(points[i], points[j]) else {
                continue;
            };
            tried += 1;

            let mut candidate = Candidate {
                line,
                inliers: Vec::new(),
                residual_sum: 0.0,
            };
            for (k, (x, y)) in points.iter().enumerate() {
                let residual = (y - line.eval(*x)).abs();
                if residual < threshold {
                    candidate.inliers.push(k);
                    candidate.residual_sum += residual;
                }
            }

            if best.as_ref().map_or(true, |b| candidate.beats(b)) {
                best = Some(candidate);
            }
        }

        let best = best.ok_or(CostError::DegenerateData)?;
        let (line, inliers) = refit(&points, threshold, best.line, best.inliers);

        let rates = inliers.iter().map(|&k| dataset[k].production_rate());
        let inlier_rate_min = rates.clone().fold(f64::INFINITY, f64::min);
        let inlier_rate_max = rates.fold(f64::NEG_INFINITY, f64::max);

        let model = CostModel {
            form,
            intercept: line.intercept,
            slope: line.slope,
            inliers,
            residual_threshold: threshold,
            dataset_len: n,
            candidates_tried: tried,
            exhaustive,
            inlier_rate_min,
            inlier_rate_max,
        };
        tracing::info!(
            form = form.name(),
            intercept = model.intercept,
            slope = model.slope,
            inliers = model.inlier_count(),
            points = n,
            threshold,
            "fitted cost model"
        );
        Ok(model)
    }

    /// Pairs to try, and whether they cover every pair
    fn candidate_pairs(&self, n: usize) -> (Vec<(usize, usize)>, bool) {
        let all_pairs = n * (n - 1) / 2;
        if n <= self.config.exhaustive_limit || self.config.max_trials >= all_pairs {
            let pairs = (0..n)
                .flat_map(|i| (i + 1..n).map(move |j| (i, j)))
                .collect();
            return (pairs, true);
        }

        let mut rng = ChaCha8Rng::seed_from_u64(self.config.seed);
        let pairs = (0..self.config.max_trials)
            .map(|_| {
                let picked = index::sample(&mut rng, n, 2);
                let (a, b) = (picked.index(0), picked.index(1));
                (a.min(b), a.max(b))
            })
            .collect();
        tracing::debug!(trials = self.config.max_trials, points = n, "sampling candidate pairs");
        (pairs, false)
    }
}

/// Points strictly within `threshold` of `line`
fn members_of(points: &[(f64, f64)], line: &Line, threshold: f64) -> Vec<usize> {
    points
        .iter()
        .enumerate()
        .filter(|(_, (x, y))| (y - line.eval(*x)).abs() < threshold)
        .map(|(k, _)| k)
        .collect()
}

/// Least-squares refit of a consensus set until the set stops changing
///
/// The refit line can leave a member outside the threshold or take in new
/// points, so members are recomputed after every refit. The returned set is
/// always exactly the points within threshold of the returned line. If the
/// set never settles, or shrinks below two points, the last line that had a
/// usable set of at least two members is returned with that set.
fn refit(
    points: &[(f64, f64)],
    threshold: f64,
    seed_line: Line,
    seed_inliers: Vec<usize>,
) -> (Line, Vec<usize>) {
    // Both points defining the seed line are members (residual 0)
    let mut settled = (seed_line, seed_inliers);
    for round in 0..estimator::MAX_REFITS {
        let set: Vec<(f64, f64)> = settled.1.iter().map(|&k| points[k]).collect();
        let Some(line) = Line::least_squares(&set) else {
            break;
        };
        let members = members_of(points, &line, threshold);
        if members.len() < 2 {
            break;
        }
        let unchanged = members == settled.1;
        settled = (line, members);
        if unchanged {
            return settled;
        }
        tracing::debug!(round, inliers = settled.1.len(), "consensus set changed on refit");
    }
    settled
}

/// Fit with the default configuration
pub fn fit(dataset: &[LaunchDataPoint]) -> Result<CostModel, CostError> {
    CostEstimator::default().fit(dataset)
}

pub fn predict(model: &CostModel, production_rate: f64) -> Result<CostEstimate, CostError> {
    model.predict(production_rate)
}
