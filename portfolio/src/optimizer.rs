//! Long-only minimum-variance optimizer
//!
//! Minimizes annualized portfolio volatility `√(wᵀ Σ w)` subject to
//! `Σ w = 1` and `0 ≤ w ≤ 1`. The feasible set is the unit simplex, so the
//! solver is an accelerated projected gradient method: a gradient step on the
//! variance followed by Euclidean projection back onto the simplex. Every
//! iterate is feasible; the returned status says whether the step size fell
//! below tolerance before the iteration budget ran out.

use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};

use crate::error::{PortfolioError, Result};

/// Optimizer configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OptimizerConfig {
    /// Iteration budget
    pub max_iterations: usize,

    /// Converged once an iteration moves the weights less than this (L2 norm)
    pub tolerance: f64,

    /// Treat a result that hit the iteration budget as an error
    pub require_convergence: bool,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            max_iterations: 10_000,
            tolerance: 1e-10,
            require_convergence: false,
        }
    }
}

/// Outcome of the solver
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConvergenceStatus {
    Converged,
    MaxIterationsReached,
}

/// Minimum-variance allocation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizationResult {
    /// Optimal weights in input asset order
    pub weights: Vec<f64>,

    /// Annualized volatility at the optimum
    pub annual_volatility: f64,

    /// Annualized expected return at the optimum
    pub expected_return: f64,

    pub iterations: usize,
    pub status: ConvergenceStatus,
}

impl OptimizationResult {
    pub fn converged(&self) -> bool {
        self.status == ConvergenceStatus::Converged
    }

    /// Turn a non-converged result into an error
    pub fn require_converged(self) -> Result<Self> {
        match self.status {
            ConvergenceStatus::Converged => Ok(self),
            ConvergenceStatus::MaxIterationsReached => {
                Err(PortfolioError::OptimizerNonconvergence {
                    iterations: self.iterations,
                })
            }
        }
    }
}

/// Minimum-variance optimizer
pub struct MinVarianceOptimizer {
    config: OptimizerConfig,
}

impl MinVarianceOptimizer {
    pub fn new(config: OptimizerConfig) -> Self {
        Self { config }
    }

    /// Solve for the minimum-volatility fully-invested long-only weights
    ///
    /// Inputs are annualized (daily × 252). The search starts from equal weights.
    pub fn optimize(
        &self,
        annual_mean: &DVector<f64>,
        annual_covariance: &DMatrix<f64>,
    ) -> Result<OptimizationResult> {
        let n = annual_mean.len();
        if n == 0 {
            return Err(PortfolioError::InsufficientData(
                "No assets to optimize".to_string(),
            ));
        }

        if annual_covariance.nrows() != n || annual_covariance.ncols() != n {
            return Err(PortfolioError::DimensionMismatch {
                expected: n,
                actual: annual_covariance.nrows(),
            });
        }

        if !(self.config.tolerance.is_finite() && self.config.tolerance > 0.0) {
            return Err(PortfolioError::InvalidParameter(format!(
                "Tolerance must be positive, got {}",
                self.config.tolerance
            )));
        }

        let lambda_max = annual_covariance.symmetric_eigenvalues().max();

        if !lambda_max.is_finite() {
            return Err(PortfolioError::InvalidParameter(
                "Covariance matrix has non-finite eigenvalues".to_string(),
            ));
        }

        let mut w = DVector::from_element(n, 1.0 / n as f64);

        // Single asset, or a flat objective: equal weights are optimal
        if n == 1 || lambda_max <= 0.0 {
            return Ok(self.finish(
                w,
                annual_mean,
                annual_covariance,
                0,
                ConvergenceStatus::Converged,
            ));
        }

        // ∇(wᵀΣw) = 2Σw is Lipschitz with constant 2λmax
        let step = 1.0 / (2.0 * lambda_max);
        let variance = |x: &DVector<f64>| x.dot(&(annual_covariance * x));

        let mut y = w.clone();
        let mut momentum = 1.0_f64;
        let mut status = ConvergenceStatus::MaxIterationsReached;
        let mut iterations = 0;

        while iterations < self.config.max_iterations {
            iterations += 1;

            let gradient = annual_covariance * &y * 2.0;
            let next = project_simplex(&(&y - gradient * step));

            if momentum > 1.0 && variance(&next) > variance(&w) {
                // Objective went up: restart from the last iterate without momentum
                momentum = 1.0;
                y = w.clone();
                continue;
            }

            let next_momentum = (1.0 + (1.0 + 4.0 * momentum * momentum).sqrt()) / 2.0;
            y = &next + (&next - &w) * ((momentum - 1.0) / next_momentum);
            momentum = next_momentum;

            let moved = (&next - &w).norm();
            w = next;

            if moved < self.config.tolerance {
                status = ConvergenceStatus::Converged;
                break;
            }
        }

        if status == ConvergenceStatus::MaxIterationsReached {
            tracing::warn!(
                iterations,
                "Minimum-variance optimizer reached its iteration budget"
            );
        } else {
            tracing::debug!(iterations, "Minimum-variance optimizer converged");
        }

        Ok(self.finish(w, annual_mean, annual_covariance, iterations, status))
    }

    fn finish(
        &self,
        w: DVector<f64>,
        annual_mean: &DVector<f64>,
        annual_covariance: &DMatrix<f64>,
        iterations: usize,
        status: ConvergenceStatus,
    ) -> OptimizationResult {
        let variance = w.dot(&(annual_covariance * &w)).max(0.0);

        OptimizationResult {
            annual_volatility: variance.sqrt(),
            expected_return: w.dot(annual_mean),
            weights: w.iter().copied().collect(),
            iterations,
            status,
        }
    }
}

/// Euclidean projection onto `{w : Σ w = 1, w ≥ 0}`
fn project_simplex(v: &DVector<f64>) -> DVector<f64> {
    let mut sorted: Vec<f64> = v.iter().copied().collect();
    sorted.sort_by(|a, b| b.total_cmp(a));

    let mut cumulative = 0.0;
    let mut theta = 0.0;
    for (i, u) in sorted.iter().enumerate() {
        cumulative += u;
        let candidate = (cumulative - 1.0) / (i + 1) as f64;
        if u - candidate > 0.0 {
            theta = candidate;
        }
    }

    v.map(|x| (x - theta).clamp(0.0, 1.0))
}
