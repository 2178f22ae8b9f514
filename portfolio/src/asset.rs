//! Assets, portfolios and caller-supplied portfolio definitions

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{PortfolioError, Result};

/// Kind of instrument, resolved once from the identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AssetKind {
    /// Exchange-traded equity or ETF priced by adjusted close
    EquityOrEtf,

    /// Mutual fund identified by a numeric scheme code and priced by NAV
    MutualFund,
}

impl AssetKind {
    /// Purely numeric identifiers are mutual-fund scheme codes
    pub fn from_identifier(id: &str) -> Self {
        if !id.is_empty() && id.chars().all(|c| c.is_ascii_digit()) {
            AssetKind::MutualFund
        } else {
            AssetKind::EquityOrEtf
        }
    }
}

/// A portfolio constituent
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Asset {
    id: String,
    kind: AssetKind,
}

impl Asset {
    /// Parse an identifier as typed by a user
    ///
    /// Surrounding whitespace is trimmed and tickers are upper-cased.
    ///
    /// # Example
    ///
    /// ```
    /// use ag_portfolio::{Asset, AssetKind};
    ///
    /// let fund = Asset::parse("120503").unwrap();
    /// assert_eq!(fund.kind(), AssetKind::MutualFund);
    ///
    /// let etf = Asset::parse(" spy ").unwrap();
    /// assert_eq!(etf.id(), "SPY");
    /// assert_eq!(etf.kind(), AssetKind::EquityOrEtf);
    /// ```
    pub fn parse(identifier: &str) -> Result<Self> {
        let id = identifier.trim().to_uppercase();
        if id.is_empty() {
            return Err(PortfolioError::InvalidParameter(
                "Asset identifier is empty".to_string(),
            ));
        }

        let kind = AssetKind::from_identifier(&id);
        Ok(Self { id, kind })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn kind(&self) -> AssetKind {
        self.kind
    }

    pub fn is_mutual_fund(&self) -> bool {
        self.kind == AssetKind::MutualFund
    }
}

impl fmt::Display for Asset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.id)
    }
}

/// Portfolio as supplied by the caller
///
/// Weights are percentages; they are normalized when the portfolio is built.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortfolioSpec {
    /// Asset identifiers in portfolio order
    pub assets: Vec<String>,

    /// Weights in percent, parallel to `assets`
    pub weights_pct: Vec<f64>,

    /// Amount invested at the start of the horizon
    pub initial_investment: f64,
}

impl PortfolioSpec {
    /// Validate the definition and build a normalized portfolio
    pub fn to_portfolio(&self) -> Result<Portfolio> {
        if !(self.initial_investment.is_finite() && self.initial_investment > 0.0) {
            return Err(PortfolioError::InvalidParameter(format!(
                "Initial investment must be positive, got {}",
                self.initial_investment
            )));
        }

        let assets = self
            .assets
            .iter()
            .map(|id| Asset::parse(id))
            .collect::<Result<Vec<_>>>()?;

        let fractions: Vec<f64> = self.weights_pct.iter().map(|w| w / 100.0).collect();
        Portfolio::new(assets, fractions)
    }
}

/// Ordered assets with a parallel weight vector summing to 1
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Portfolio {
    assets: Vec<Asset>,
    weights: Vec<f64>,
}

impl Portfolio {
    /// Build a portfolio, normalizing `weights` to sum to 1
    ///
    /// Weights are not clamped to [0, 1]; only their sum is fixed.
    pub fn new(assets: Vec<Asset>, weights: Vec<f64>) -> Result<Self> {
        if assets.is_empty() {
            return Err(PortfolioError::InsufficientData(
                "Portfolio has no assets".to_string(),
            ));
        }

        if assets.len() != weights.len() {
            return Err(PortfolioError::DimensionMismatch {
                expected: assets.len(),
                actual: weights.len(),
            });
        }

        for (i, asset) in assets.iter().enumerate() {
            if assets[..i].contains(asset) {
                return Err(PortfolioError::InvalidParameter(format!(
                    "Duplicate asset: {}",
                    asset
                )));
            }
        }

        if weights.iter().any(|w| !w.is_finite()) {
            return Err(PortfolioError::InvalidParameter(
                "Weights must be finite".to_string(),
            ));
        }

        let total: f64 = weights.iter().sum();
        if total <= 0.0 {
            return Err(PortfolioError::InvalidParameter(format!(
                "Weights must have a positive sum, got {}",
                total
            )));
        }

        let weights = weights.into_iter().map(|w| w / total).collect();
        Ok(Self { assets, weights })
    }

    pub fn assets(&self) -> &[Asset] {
        &self.assets
    }

    pub fn weights(&self) -> &[f64] {
        &self.weights
    }

    pub fn len(&self) -> usize {
        self.assets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }

    /// Weight of an asset by identifier
    pub fn weight_of(&self, id: &str) -> Option<f64> {
        self.assets
            .iter()
            .position(|a| a.id() == id)
            .map(|i| self.weights[i])
    }

    /// Keep only the assets accepted by `keep`, renormalizing the survivors
    pub fn retain<F>(&self, mut keep: F) -> Result<Self>
    where
        F: FnMut(&Asset) -> bool,
    {
        let (assets, weights): (Vec<_>, Vec<_>) = self
            .assets
            .iter()
            .zip(self.weights.iter())
            .filter(|(asset, _)| keep(asset))
            .map(|(asset, w)| (asset.clone(), *w))
            .unzip();

        if assets.is_empty() {
            return Err(PortfolioError::NoDataFetched);
        }

        Self::new(assets, weights)
    }
}
