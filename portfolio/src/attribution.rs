//! Risk attribution
//!
//! Euler decomposition of portfolio volatility σ = √(wᵀ Σ w):
//! marginal contribution ∂σ/∂w_i = (Σ w)_i / σ and component contribution
//! w_i · ∂σ/∂w_i. Components sum to σ because σ is homogeneous of degree one
//! in w.

use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};

use crate::asset::Asset;
use crate::error::{PortfolioError, Result};
use crate::limits;

/// Risk contribution for a single asset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskContribution {
    pub asset_id: String,

    /// Change in portfolio volatility per unit change in weight
    pub marginal_contribution: f64,

    /// Weight × marginal contribution
    pub component_contribution: f64,

    /// Percentage of total portfolio volatility
    pub risk_pct: f64,
}

/// Attribution of portfolio volatility across assets
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttributionResult {
    pub portfolio_volatility: f64,
    pub contributions: Vec<RiskContribution>,

    /// Portfolio volatility was exactly zero; every contribution is defined as 0
    pub degenerate: bool,
}

impl AttributionResult {
    /// Sum of component contributions (equals `portfolio_volatility`)
    pub fn total_component(&self) -> f64 {
        self.contributions
            .iter()
            .map(|c| c.component_contribution)
            .sum()
    }
}

/// Decomposes portfolio volatility into per-asset contributions
#[derive(Debug, Default)]
pub struct RiskAttributor;

impl RiskAttributor {
    pub fn new() -> Self {
        Self
    }

    /// Attribute annualized volatility of `weights` under `annual_covariance`
    pub fn attribute(
        &self,
        assets: &[Asset],
        weights: &[f64],
        annual_covariance: &DMatrix<f64>,
    ) -> Result<AttributionResult> {
        let n = assets.len();
        if n == 0 {
            return Err(PortfolioError::InsufficientData(
                "No assets provided".to_string(),
            ));
        }

        if weights.len() != n {
            return Err(PortfolioError::DimensionMismatch {
                expected: n,
                actual: weights.len(),
            });
        }

        if annual_covariance.nrows() != n || annual_covariance.ncols() != n {
            return Err(PortfolioError::DimensionMismatch {
                expected: n,
                actual: annual_covariance.nrows(),
            });
        }

        let w = DVector::from_column_slice(weights);
        let sigma_w = annual_covariance * &w;
        let variance = w.dot(&sigma_w);

        if variance < 0.0 {
            return Err(PortfolioError::InvalidParameter(format!(
                "Negative portfolio variance: {}",
                variance
            )));
        }

        let portfolio_volatility = variance.sqrt();
        let degenerate = portfolio_volatility == 0.0;

        if degenerate {
            tracing::warn!("Portfolio volatility is zero; risk contributions reported as zero");
        }

        let contributions = assets
            .iter()
            .enumerate()
            .map(|(i, asset)| {
                let marginal = limits::ratio_or_zero(sigma_w[i], portfolio_volatility);
                let component = w[i] * marginal;
                RiskContribution {
                    asset_id: asset.id().to_string(),
                    marginal_contribution: marginal,
                    component_contribution: component,
                    risk_pct: limits::ratio_or_zero(component, portfolio_volatility) * 100.0,
                }
            })
            .collect();

        Ok(AttributionResult {
            portfolio_volatility,
            contributions,
            degenerate,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use proptest::prelude::*;

    fn assets(n: usize) -> Vec<Asset> {
        (0..n)
            .map(|i| Asset::parse(&format!("A{}", i)).unwrap())
            .collect()
    }

    #[test]
    fn test_two_asset_contributions() {
        let cov = DMatrix::from_row_slice(2, 2, &[0.04, 0.02, 0.02, 0.09]);
        let result = RiskAttributor::new()
            .attribute(&assets(2), &[0.6, 0.4], &cov)
            .unwrap();

        // σ² = 0.36·0.04 + 2·0.24·0.02 + 0.16·0.09 = 0.0384
        let vol = 0.0384f64.sqrt();
        assert_relative_eq!(result.portfolio_volatility, vol, epsilon = 1e-12);

        // Σw = [0.032, 0.048]
        assert_relative_eq!(result.contributions[0].marginal_contribution, 0.032 / vol, epsilon = 1e-12);
        assert_relative_eq!(result.contributions[1].component_contribution, 0.4 * 0.048 / vol, epsilon = 1e-12);

        assert_relative_eq!(result.total_component(), vol, epsilon = 1e-12);
        let pct: f64 = result.contributions.iter().map(|c| c.risk_pct).sum();
        assert_relative_eq!(pct, 100.0, epsilon = 1e-9);
        assert!(!result.degenerate);
    }

    #[test]
    fn test_zero_weights_are_degenerate() {
        let cov = DMatrix::from_row_slice(2, 2, &[0.04, 0.02, 0.02, 0.09]);
        let result = RiskAttributor::new()
            .attribute(&assets(2), &[0.0, 0.0], &cov)
            .unwrap();

        assert!(result.degenerate);
        assert_eq!(result.portfolio_volatility, 0.0);
        assert!(result
            .contributions
            .iter()
            .all(|c| c.marginal_contribution == 0.0 && c.component_contribution == 0.0));
        assert_eq!(result.total_component(), result.portfolio_volatility);
    }

    #[test]
    fn test_dimension_checks() {
        let cov = DMatrix::identity(2, 2);
        assert!(RiskAttributor::new().attribute(&assets(2), &[1.0], &cov).is_err());
        assert!(RiskAttributor::new().attribute(&assets(3), &[0.3, 0.3, 0.4], &cov).is_err());
    }

    proptest! {
        #[test]
        fn prop_euler_identity(
            factors in prop::collection::vec(-1.0f64..1.0, 3 * 3),
            raw in prop::collection::vec(0.01f64..1.0, 3),
        ) {
            let a = DMatrix::from_row_slice(3, 3, &factors);
            let cov = &a * a.transpose() + DMatrix::identity(3, 3) * 1e-4;
            let total: f64 = raw.iter().sum();
            let weights: Vec<f64> = raw.iter().map(|w| w / total).collect();

            let result = RiskAttributor::new().attribute(&assets(3), &weights, &cov).unwrap();
            let rel = (result.total_component() - result.portfolio_volatility).abs()
                / result.portfolio_volatility;
            prop_assert!(rel < 1e-6);
        }
    }
}
