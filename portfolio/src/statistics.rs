//! Return statistics
//!
//! Estimates per-asset mean daily log returns and the sample covariance
//! matrix, regularized on the diagonal so the simulator can always factorize
//! it. Also derives the annualized per-asset figures used by the
//! recommendation engine and the correlation matrix handed to plotting.

use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics as _;

use crate::asset::Asset;
use crate::error::{PortfolioError, Result};
use crate::limits::{self, TRADING_DAYS_PER_YEAR};
use crate::series::ReturnMatrix;

/// Statistics estimator configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StatisticsConfig {
    /// Added to the covariance diagonal (default: 1e-8)
    pub regularization: f64,
}

impl Default for StatisticsConfig {
    fn default() -> Self {
        Self {
            regularization: 1e-8,
        }
    }
}

/// Daily return statistics for a set of assets
#[derive(Debug, Clone)]
pub struct Statistics {
    assets: Vec<Asset>,
    mean: DVector<f64>,
    covariance: DMatrix<f64>,
    std_devs: DVector<f64>,
    correlation: DMatrix<f64>,
    num_observations: usize,
}

/// Annualized figures for one asset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetStatistics {
    pub asset_id: String,
    pub annual_return: f64,
    pub annual_volatility: f64,
    pub sharpe_ratio: f64,
}

/// Mean/covariance estimator
pub struct StatisticsEstimator {
    config: StatisticsConfig,
}

impl StatisticsEstimator {
    pub fn new(config: StatisticsConfig) -> Self {
        Self { config }
    }

    /// Estimate mean and regularized sample covariance of daily log returns
    pub fn estimate(&self, returns: &ReturnMatrix) -> Result<Statistics> {
        if self.config.regularization < 0.0 || !self.config.regularization.is_finite() {
            return Err(PortfolioError::InvalidParameter(format!(
                "Regularization must be non-negative, got {}",
                self.config.regularization
            )));
        }

        let t = returns.num_observations();
        let n = returns.num_assets();

        if n == 0 {
            return Err(PortfolioError::InsufficientData(
                "Return matrix has no assets".to_string(),
            ));
        }

        if t < 2 {
            return Err(PortfolioError::InsufficientData(format!(
                "Need at least 2 return observations, got {}",
                t
            )));
        }

        if t <= n {
            tracing::warn!(
                observations = t,
                assets = n,
                "Fewer observations than assets; covariance estimate may be degenerate"
            );
        }

        let columns: Vec<DVector<f64>> = (0..n).map(|j| returns.column(j)).collect();

        let mean = DVector::from_iterator(n, columns.iter().map(|c| c.iter().mean()));
        let std_devs = DVector::from_iterator(n, columns.iter().map(|c| c.iter().std_dev()));

        // Sample covariance (divisor T - 1)
        let mut covariance = DMatrix::zeros(n, n);
        for i in 0..n {
            for j in i..n {
                let cov: f64 = columns[i]
                    .iter()
                    .zip(columns[j].iter())
                    .map(|(r_i, r_j)| (r_i - mean[i]) * (r_j - mean[j]))
                    .sum::<f64>()
                    / (t - 1) as f64;

                covariance[(i, j)] = cov;
                covariance[(j, i)] = cov;
            }
        }

        let correlation = correlation_from_covariance(&covariance);

        // Add regularization to diagonal for numerical stability
        for i in 0..n {
            covariance[(i, i)] += self.config.regularization;
        }

        tracing::debug!(observations = t, assets = n, "Estimated return statistics");

        Ok(Statistics {
            assets: returns.assets().to_vec(),
            mean,
            covariance,
            std_devs,
            correlation,
            num_observations: t,
        })
    }
}

/// Pearson correlation from an unregularized covariance matrix
///
/// Pairs involving a constant series have correlation 0; the diagonal is 1.
fn correlation_from_covariance(covariance: &DMatrix<f64>) -> DMatrix<f64> {
    let n = covariance.nrows();
    DMatrix::from_fn(n, n, |i, j| {
        if i == j {
            return 1.0;
        }
        let denom = (covariance[(i, i)] * covariance[(j, j)]).sqrt();
        limits::ratio_or_zero(covariance[(i, j)], denom)
    })
}

impl Statistics {
    pub fn assets(&self) -> &[Asset] {
        &self.assets
    }

    /// Mean daily log return per asset
    pub fn mean(&self) -> &DVector<f64> {
        &self.mean
    }

    /// Regularized daily covariance
    pub fn covariance(&self) -> &DMatrix<f64> {
        &self.covariance
    }

    /// Sample standard deviation of daily log returns per asset
    pub fn std_devs(&self) -> &DVector<f64> {
        &self.std_devs
    }

    /// Pearson correlation of daily log returns
    pub fn correlation(&self) -> &DMatrix<f64> {
        &self.correlation
    }

    pub fn num_observations(&self) -> usize {
        self.num_observations
    }

    pub fn num_assets(&self) -> usize {
        self.assets.len()
    }

    /// Mean scaled by 252 trading days
    pub fn annual_mean(&self) -> DVector<f64> {
        &self.mean * TRADING_DAYS_PER_YEAR
    }

    /// Covariance scaled by 252 trading days
    pub fn annual_covariance(&self) -> DMatrix<f64> {
        &self.covariance * TRADING_DAYS_PER_YEAR
    }

    /// Annualized return, volatility and Sharpe ratio of each asset
    pub fn asset_statistics(&self) -> Vec<AssetStatistics> {
        let sqrt_days = TRADING_DAYS_PER_YEAR.sqrt();

        self.assets
            .iter()
            .enumerate()
            .map(|(i, asset)| {
                let annual_return = self.mean[i] * TRADING_DAYS_PER_YEAR;
                let annual_volatility = self.std_devs[i] * sqrt_days;
                AssetStatistics {
                    asset_id: asset.id().to_string(),
                    annual_return,
                    annual_volatility,
                    sharpe_ratio: limits::sharpe(annual_return, annual_volatility),
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use chrono::NaiveDate;

    fn returns(columns: &[(&str, Vec<f64>)]) -> ReturnMatrix {
        let rows = columns[0].1.len();
        let assets = columns
            .iter()
            .map(|(id, _)| Asset::parse(id).unwrap())
            .collect();
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let dates = (0..rows)
            .map(|d| start + chrono::Duration::days(d as i64))
            .collect();
        let values = DMatrix::from_fn(rows, columns.len(), |t, j| columns[j].1[t]);
        ReturnMatrix::new(assets, dates, values).unwrap()
    }

    #[test]
    fn test_mean_and_covariance() {
        let r = returns(&[
            ("A", vec![0.01, 0.02, -0.01, 0.03, -0.02]),
            ("B", vec![0.02, 0.01, -0.02, 0.02, -0.01]),
        ]);

        let stats = StatisticsEstimator::new(StatisticsConfig::default())
            .estimate(&r)
            .unwrap();

        assert_relative_eq!(stats.mean()[0], 0.006, epsilon = 1e-12);
        assert_relative_eq!(stats.mean()[1], 0.004, epsilon = 1e-12);

        // var(A) = sum((x - 0.006)^2) / 4
        let var_a = [0.004f64, 0.014, -0.016, 0.024, -0.026]
            .iter()
            .map(|d| d * d)
            .sum::<f64>()
            / 4.0;
        assert_relative_eq!(stats.covariance()[(0, 0)], var_a + 1e-8, epsilon = 1e-15);
        assert_relative_eq!(stats.std_devs()[0], var_a.sqrt(), epsilon = 1e-12);

        // Symmetric
        assert_eq!(stats.covariance()[(0, 1)], stats.covariance()[(1, 0)]);
    }

    #[test]
    fn test_regularized_matrix_factorizes_for_duplicate_series() {
        let series = vec![0.01, -0.02, 0.015, 0.0, 0.005, -0.01];
        let r = returns(&[("A", series.clone()), ("B", series)]);

        let stats = StatisticsEstimator::new(StatisticsConfig::default())
            .estimate(&r)
            .unwrap();

        assert!(stats.covariance().clone().cholesky().is_some());
        assert_relative_eq!(stats.correlation()[(0, 1)], 1.0, epsilon = 1e-9);
    }

    #[test]
    fn test_constant_series_has_zero_correlation_and_sharpe() {
        let r = returns(&[
            ("A", vec![0.0, 0.0, 0.0, 0.0]),
            ("B", vec![0.01, -0.01, 0.02, 0.0]),
        ]);

        let stats = StatisticsEstimator::new(StatisticsConfig::default())
            .estimate(&r)
            .unwrap();

        assert_eq!(stats.correlation()[(0, 1)], 0.0);
        assert_eq!(stats.correlation()[(0, 0)], 1.0);

        let per_asset = stats.asset_statistics();
        assert_eq!(per_asset[0].annual_volatility, 0.0);
        assert_eq!(per_asset[0].sharpe_ratio, 0.0);
    }

    #[test]
    fn test_annualization() {
        let r = returns(&[("A", vec![0.001, 0.003, 0.002])]);
        let stats = StatisticsEstimator::new(StatisticsConfig::default())
            .estimate(&r)
            .unwrap();

        assert_relative_eq!(stats.annual_mean()[0], 0.002 * 252.0, epsilon = 1e-12);
        assert_relative_eq!(
            stats.annual_covariance()[(0, 0)],
            stats.covariance()[(0, 0)] * 252.0,
            epsilon = 1e-15
        );

        let a = &stats.asset_statistics()[0];
        assert_relative_eq!(a.annual_volatility, 0.001 * 252f64.sqrt(), epsilon = 1e-12);
        assert_relative_eq!(a.sharpe_ratio, a.annual_return / a.annual_volatility);
    }

    #[test]
    fn test_insufficient_observations() {
        let r = returns(&[("A", vec![0.01])]);
        let result = StatisticsEstimator::new(StatisticsConfig::default()).estimate(&r);
        assert!(matches!(result, Err(PortfolioError::InsufficientData(_))));
    }

    #[test]
    fn test_negative_regularization_rejected() {
        let r = returns(&[("A", vec![0.01, 0.02, 0.03])]);
        let result = StatisticsEstimator::new(StatisticsConfig {
            regularization: -1.0,
        })
        .estimate(&r);
        assert!(result.is_err());
    }
}
