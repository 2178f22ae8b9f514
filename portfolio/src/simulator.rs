//! Monte Carlo portfolio simulator
//!
//! Draws correlated daily log returns through the Cholesky factor of the
//! covariance matrix, projects them onto the portfolio weights and compounds
//! them into value paths. The caller owns the random source: one seed per
//! path is drawn from it up front, so the result does not depend on whether
//! paths are generated sequentially or on the rayon pool.

use nalgebra::{DMatrix, DVector};
use rand::rngs::StdRng;
use rand::{Rng, RngCore, SeedableRng};
use rand_distr::{Distribution, StandardNormal};
#[cfg(feature = "parallel")]
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::{PortfolioError, Result};

/// Simulation configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Number of simulated paths
    pub simulations: usize,

    /// Horizon in trading days
    pub horizon_days: usize,

    /// Master seed for reproducible runs (None = random)
    pub seed: Option<u64>,

    /// Generate paths on the rayon pool when the `parallel` feature is on
    pub parallel: bool,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            simulations: 5_000,
            horizon_days: 252,
            seed: None,
            parallel: true,
        }
    }
}

impl SimulationConfig {
    /// Random source for a run: seeded when `seed` is set, otherwise from entropy
    pub fn rng(&self) -> StdRng {
        match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        }
    }
}

/// Days × simulations matrix of portfolio values; column `s` is path `s`
#[derive(Debug, Clone)]
pub struct SimulationResult {
    values: DMatrix<f64>,
    initial_investment: f64,
}

impl SimulationResult {
    /// Wrap precomputed paths (rows = days, columns = paths)
    pub fn from_values(values: DMatrix<f64>, initial_investment: f64) -> Result<Self> {
        if values.nrows() == 0 || values.ncols() == 0 {
            return Err(PortfolioError::InsufficientData(
                "Simulation matrix is empty".to_string(),
            ));
        }

        Ok(Self {
            values,
            initial_investment,
        })
    }

    pub fn values(&self) -> &DMatrix<f64> {
        &self.values
    }

    pub fn initial_investment(&self) -> f64 {
        self.initial_investment
    }

    pub fn num_days(&self) -> usize {
        self.values.nrows()
    }

    pub fn num_simulations(&self) -> usize {
        self.values.ncols()
    }

    /// Portfolio values on the last simulated day, one per path
    pub fn terminal_values(&self) -> Vec<f64> {
        let last = self.values.nrows() - 1;
        self.values.row(last).iter().copied().collect()
    }

    /// One simulated path
    pub fn path(&self, index: usize) -> Option<DVector<f64>> {
        (index < self.values.ncols()).then(|| self.values.column(index).into_owned())
    }

    /// The first `count` paths, for plotting
    pub fn sample_paths(&self, count: usize) -> DMatrix<f64> {
        let count = count.min(self.values.ncols());
        self.values.columns(0, count).into_owned()
    }
}

/// Lower-triangular Cholesky factor `L` with `covariance = L Lᵀ`
pub fn cholesky_factor(covariance: &DMatrix<f64>) -> Result<DMatrix<f64>> {
    if !covariance.is_square() {
        return Err(PortfolioError::DimensionMismatch {
            expected: covariance.nrows(),
            actual: covariance.ncols(),
        });
    }

    let n = covariance.nrows();
    for i in 0..n {
        for j in 0..i {
            let (a, b) = (covariance[(i, j)], covariance[(j, i)]);
            if (a - b).abs() > 1e-12 * a.abs().max(b.abs()).max(1.0) {
                return Err(PortfolioError::SingularCovariance(format!(
                    "matrix is not symmetric at ({}, {})",
                    i, j
                )));
            }
        }
    }

    covariance
        .clone()
        .cholesky()
        .map(|chol| chol.l())
        .ok_or_else(|| {
            PortfolioError::SingularCovariance(
                "Cholesky factorization failed; regularization was insufficient".to_string(),
            )
        })
}

/// Read-only inputs shared by every path
struct PathGenerator {
    /// `Lᵀ w`: maps independent draws straight to the portfolio return
    loading: DVector<f64>,
    drift: f64,
    horizon_days: usize,
    initial_investment: f64,
}

impl PathGenerator {
    fn path(&self, seed: u64) -> Vec<f64> {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut path = Vec::with_capacity(self.horizon_days);
        let mut cumulative = 0.0;

        for _ in 0..self.horizon_days {
            // (z Lᵀ + μ) · w  ==  z · (Lᵀ w) + μ · w
            let daily = self.drift
                + self
                    .loading
                    .iter()
                    .map(|l| {
                        let z: f64 = StandardNormal.sample(&mut rng);
                        l * z
                    })
                    .sum::<f64>();

            cumulative += daily;
            path.push(self.initial_investment * cumulative.exp());
        }

        path
    }
}

/// Monte Carlo simulator
pub struct MonteCarloSimulator {
    config: SimulationConfig,
}

impl MonteCarloSimulator {
    pub fn new(config: SimulationConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    /// Simulate portfolio value paths
    ///
    /// `mean` and `covariance` are daily log-return statistics, `weights` the
    /// portfolio weights in the same asset order.
    pub fn simulate<R>(
        &self,
        mean: &DVector<f64>,
        covariance: &DMatrix<f64>,
        weights: &[f64],
        initial_investment: f64,
        rng: &mut R,
    ) -> Result<SimulationResult>
    where
        R: Rng + ?Sized,
    {
        self.validate(mean, covariance, weights, initial_investment)?;

        let chol = cholesky_factor(covariance)?;
        let w = DVector::from_column_slice(weights);

        let generator = PathGenerator {
            loading: chol.transpose() * &w,
            drift: mean.dot(&w),
            horizon_days: self.config.horizon_days,
            initial_investment,
        };

        let seeds: Vec<u64> = (0..self.config.simulations)
            .map(|_| rng.next_u64())
            .collect();

        let paths = self.generate(&generator, &seeds);

        tracing::debug!(
            simulations = self.config.simulations,
            horizon_days = self.config.horizon_days,
            "Generated Monte Carlo paths"
        );

        Ok(SimulationResult {
            values: DMatrix::from_iterator(
                self.config.horizon_days,
                self.config.simulations,
                paths.into_iter().flatten(),
            ),
            initial_investment,
        })
    }

    #[cfg(feature = "parallel")]
    fn generate(&self, generator: &PathGenerator, seeds: &[u64]) -> Vec<Vec<f64>> {
        if self.config.parallel {
            seeds.par_iter().map(|&seed| generator.path(seed)).collect()
        } else {
            seeds.iter().map(|&seed| generator.path(seed)).collect()
        }
    }

    #[cfg(not(feature = "parallel"))]
    fn generate(&self, generator: &PathGenerator, seeds: &[u64]) -> Vec<Vec<f64>> {
        seeds.iter().map(|&seed| generator.path(seed)).collect()
    }

    fn validate(
        &self,
        mean: &DVector<f64>,
        covariance: &DMatrix<f64>,
        weights: &[f64],
        initial_investment: f64,
    ) -> Result<()> {
        if self.config.simulations == 0 {
            return Err(PortfolioError::InvalidParameter(
                "Number of simulations must be positive".to_string(),
            ));
        }

        if self.config.horizon_days == 0 {
            return Err(PortfolioError::InvalidParameter(
                "Horizon must be at least one day".to_string(),
            ));
        }

        if !(initial_investment.is_finite() && initial_investment > 0.0) {
            return Err(PortfolioError::InvalidParameter(format!(
                "Initial investment must be positive, got {}",
                initial_investment
            )));
        }

        let n = weights.len();
        if mean.len() != n {
            return Err(PortfolioError::DimensionMismatch {
                expected: n,
                actual: mean.len(),
            });
        }

        if covariance.nrows() != n || covariance.ncols() != n {
            return Err(PortfolioError::DimensionMismatch {
                expected: n,
                actual: covariance.nrows(),
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn two_asset_inputs() -> (DVector<f64>, DMatrix<f64>) {
        let mean = DVector::from_vec(vec![0.0004, 0.0002]);
        let cov = DMatrix::from_row_slice(2, 2, &[0.0004, 0.0001, 0.0001, 0.0009]);
        (mean, cov)
    }

    fn simulator(simulations: usize, horizon_days: usize, parallel: bool) -> MonteCarloSimulator {
        MonteCarloSimulator::new(SimulationConfig {
            simulations,
            horizon_days,
            seed: Some(42),
            parallel,
        })
    }

    #[test]
    fn test_cholesky_matches_analytic_factor() {
        let (_, cov) = two_asset_inputs();
        let l = cholesky_factor(&cov).unwrap();

        // L = [[a, 0], [b, c]] with a = √0.0004, b = 0.0001 / a, c = √(0.0009 - b²)
        let a = 0.0004f64.sqrt();
        let b = 0.0001 / a;
        let c = (0.0009 - b * b).sqrt();

        assert_relative_eq!(l[(0, 0)], a, epsilon = 1e-12);
        assert_eq!(l[(0, 1)], 0.0);
        assert_relative_eq!(l[(1, 0)], b, epsilon = 1e-12);
        assert_relative_eq!(l[(1, 1)], c, epsilon = 1e-12);
        assert_relative_eq!(&l * l.transpose(), cov, epsilon = 1e-15);
    }

    #[test]
    fn test_cholesky_rejects_indefinite_matrix() {
        let cov = DMatrix::from_row_slice(2, 2, &[1.0, 2.0, 2.0, 1.0]);
        assert!(matches!(
            cholesky_factor(&cov),
            Err(PortfolioError::SingularCovariance(_))
        ));

        let asymmetric = DMatrix::from_row_slice(2, 2, &[1.0, 0.5, 0.1, 1.0]);
        assert!(cholesky_factor(&asymmetric).is_err());
    }

    #[test]
    fn test_result_shape_and_first_day() {
        let (mean, cov) = two_asset_inputs();
        let sim = simulator(100, 10, false);
        let mut rng = sim.config().rng();

        let result = sim
            .simulate(&mean, &cov, &[0.5, 0.5], 10_000.0, &mut rng)
            .unwrap();

        assert_eq!(result.num_days(), 10);
        assert_eq!(result.num_simulations(), 100);
        assert_eq!(result.terminal_values().len(), 100);
        assert!(result.values().iter().all(|v| v.is_finite() && *v > 0.0));
        assert_eq!(result.sample_paths(20).ncols(), 20);
        assert!(result.path(100).is_none());
    }

    #[test]
    fn test_same_seed_same_paths() {
        let (mean, cov) = two_asset_inputs();
        let sim = simulator(200, 30, true);

        let a = sim
            .simulate(&mean, &cov, &[0.5, 0.5], 1.0, &mut sim.config().rng())
            .unwrap();
        let b = sim
            .simulate(&mean, &cov, &[0.5, 0.5], 1.0, &mut sim.config().rng())
            .unwrap();

        assert_eq!(a.values(), b.values());
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let (mean, cov) = two_asset_inputs();
        let par = simulator(300, 20, true);
        let seq = simulator(300, 20, false);

        let a = par
            .simulate(&mean, &cov, &[0.3, 0.7], 1.0, &mut par.config().rng())
            .unwrap();
        let b = seq
            .simulate(&mean, &cov, &[0.3, 0.7], 1.0, &mut seq.config().rng())
            .unwrap();

        assert_eq!(a.values(), b.values());
    }

    #[test]
    fn test_terminal_mean_matches_lognormal_expectation() {
        let (mean, cov) = two_asset_inputs();
        let w = DVector::from_vec(vec![0.5, 0.5]);
        let days = 252;
        let sim = simulator(5_000, days, true);

        let result = sim
            .simulate(&mean, &cov, w.as_slice(), 10_000.0, &mut sim.config().rng())
            .unwrap();

        let terminal = result.terminal_values();
        let observed = terminal.iter().sum::<f64>() / terminal.len() as f64;

        let mu_p = mean.dot(&w);
        let var_p = (w.transpose() * &cov * &w)[(0, 0)];
        let expected = 10_000.0 * (days as f64 * mu_p + 0.5 * days as f64 * var_p).exp();

        assert!(
            ((observed - expected) / expected).abs() < 0.05,
            "observed {} vs expected {}",
            observed,
            expected
        );
    }

    #[test]
    fn test_invalid_inputs() {
        let (mean, cov) = two_asset_inputs();
        let sim = simulator(10, 5, false);
        let mut rng = sim.config().rng();

        assert!(sim.simulate(&mean, &cov, &[1.0], 1.0, &mut rng).is_err());
        assert!(sim.simulate(&mean, &cov, &[0.5, 0.5], 0.0, &mut rng).is_err());

        let empty = simulator(0, 5, false);
        assert!(empty
            .simulate(&mean, &cov, &[0.5, 0.5], 1.0, &mut rng)
            .is_err());
    }
}
