//! Rebalancing recommendations
//!
//! Each asset is classified by a fixed rule list, evaluated top to bottom,
//! first match wins:
//!
//! 1. negative annual return → SELL
//! 2. Sharpe below `min_sharpe` (0.5) → REDUCE
//! 3. current weight more than `rebalance_band` (0.05) below optimal → INCREASE
//! 4. current weight more than `rebalance_band` above optimal → REDUCE
//! 5. otherwise → KEEP

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{PortfolioError, Result};
use crate::statistics::AssetStatistics;

pub const DEFAULT_MIN_SHARPE: f64 = 0.5;
pub const DEFAULT_REBALANCE_BAND: f64 = 0.05;

/// Recommended action for one asset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Action {
    Sell,
    Reduce,
    Increase,
    Keep,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Action::Sell => "SELL",
            Action::Reduce => "REDUCE",
            Action::Increase => "INCREASE",
            Action::Keep => "KEEP",
        };
        f.write_str(label)
    }
}

/// Which rule produced the action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Reason {
    NegativeReturn,
    LowSharpe,
    Underweight,
    Overweight,
    WithinBand,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recommendation {
    pub action: Action,
    pub reason: Reason,
}

impl Recommendation {
    fn new(action: Action, reason: Reason) -> Self {
        Self { action, reason }
    }
}

/// Rule thresholds
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RecommendationRules {
    /// Sharpe ratio below which a position is reduced
    pub min_sharpe: f64,

    /// Allowed absolute deviation from the optimal weight
    pub rebalance_band: f64,
}

impl Default for RecommendationRules {
    fn default() -> Self {
        Self {
            min_sharpe: DEFAULT_MIN_SHARPE,
            rebalance_band: DEFAULT_REBALANCE_BAND,
        }
    }
}

/// Per-asset row combining statistics, allocation and recommendation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetAnalysis {
    pub asset_id: String,
    pub current_weight: f64,
    pub optimal_weight: f64,
    pub annual_return: f64,
    pub annual_volatility: f64,
    pub sharpe_ratio: f64,

    /// current_weight - optimal_weight
    pub deviation: f64,

    pub recommendation: Recommendation,
}

/// Stateless rule engine
pub struct RecommendationEngine {
    rules: RecommendationRules,
}

impl RecommendationEngine {
    pub fn new(rules: RecommendationRules) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &RecommendationRules {
        &self.rules
    }

    /// Classify one asset
    ///
    /// # Example
    ///
    /// ```
    /// use ag_portfolio::{Action, RecommendationEngine, RecommendationRules};
    ///
    /// let engine = RecommendationEngine::new(RecommendationRules::default());
    /// assert_eq!(engine.classify(-0.01, 1.2, 0.0).action, Action::Sell);
    /// assert_eq!(engine.classify(0.05, 0.8, -0.10).action, Action::Increase);
    /// ```
    pub fn classify(&self, annual_return: f64, sharpe_ratio: f64, deviation: f64) -> Recommendation {
        if annual_return < 0.0 {
            Recommendation::new(Action::Sell, Reason::NegativeReturn)
        } else if sharpe_ratio < self.rules.min_sharpe {
            Recommendation::new(Action::Reduce, Reason::LowSharpe)
        } else if deviation < -self.rules.rebalance_band {
            Recommendation::new(Action::Increase, Reason::Underweight)
        } else if deviation > self.rules.rebalance_band {
            Recommendation::new(Action::Reduce, Reason::Overweight)
        } else {
            Recommendation::new(Action::Keep, Reason::WithinBand)
        }
    }

    /// Build the per-asset analysis for a portfolio
    ///
    /// `asset_stats`, `current_weights` and `optimal_weights` share asset order.
    pub fn recommend(
        &self,
        asset_stats: &[AssetStatistics],
        current_weights: &[f64],
        optimal_weights: &[f64],
    ) -> Result<Vec<AssetAnalysis>> {
        let n = asset_stats.len();
        for len in [current_weights.len(), optimal_weights.len()] {
            if len != n {
                return Err(PortfolioError::DimensionMismatch {
                    expected: n,
                    actual: len,
                });
            }
        }

        let analyses = asset_stats
            .iter()
            .zip(current_weights.iter().zip(optimal_weights.iter()))
            .map(|(stats, (&current, &optimal))| {
                let deviation = current - optimal;
                AssetAnalysis {
                    asset_id: stats.asset_id.clone(),
                    current_weight: current,
                    optimal_weight: optimal,
                    annual_return: stats.annual_return,
                    annual_volatility: stats.annual_volatility,
                    sharpe_ratio: stats.sharpe_ratio,
                    deviation,
                    recommendation: self.classify(stats.annual_return, stats.sharpe_ratio, deviation),
                }
            })
            .collect();

        Ok(analyses)
    }
}
