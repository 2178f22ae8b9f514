//! Price data provider interface
//!
//! Retrieval of prices and NAVs lives outside this crate. Providers implement
//! [`PriceProvider`]; [`fetch_all`] queries every asset and recovers from
//! per-asset failures by skipping the asset.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::asset::Asset;
use crate::error::{PortfolioError, Result};
use crate::series::PriceSeries;

/// Source of historical prices
///
/// Traded instruments are expected to provide one adjusted close per trading
/// day; mutual funds provide one NAV per published date.
pub trait PriceProvider: Send + Sync {
    /// Fetch the price history for an asset
    ///
    /// # Returns
    /// * `Ok(Some(series))` - Prices are available
    /// * `Ok(None)` - The provider has no data for this asset
    /// * `Err(PortfolioError)` - The fetch failed
    fn fetch(&self, asset: &Asset) -> Result<Option<PriceSeries>>;
}

/// An asset left out of the run and why
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkippedAsset {
    pub asset_id: String,
    pub reason: String,
}

/// Series that were fetched, in portfolio order, plus the skipped assets
#[derive(Debug, Clone)]
pub struct FetchOutcome {
    pub series: Vec<(Asset, PriceSeries)>,
    pub skipped: Vec<SkippedAsset>,
}

/// Fetch every asset, skipping the ones without data
///
/// Fails with [`PortfolioError::NoDataFetched`] only when no asset could be fetched.
pub fn fetch_all(provider: &dyn PriceProvider, assets: &[Asset]) -> Result<FetchOutcome> {
    let mut series = Vec::with_capacity(assets.len());
    let mut skipped = Vec::new();

    for asset in assets {
        let fetched = match provider.fetch(asset) {
            Ok(Some(s)) if !s.is_empty() => Ok(s),
            Ok(_) => Err(PortfolioError::DataUnavailable {
                asset: asset.id().to_string(),
                reason: "provider returned no data".to_string(),
            }),
            Err(e) => Err(PortfolioError::DataUnavailable {
                asset: asset.id().to_string(),
                reason: e.to_string(),
            }),
        };

        match fetched {
            Ok(s) => {
                tracing::debug!(asset = %asset, kind = ?asset.kind(), points = s.len(), "Fetched price series");
                series.push((asset.clone(), s));
            }
            Err(e) => {
                tracing::warn!(asset = %asset, error = %e, "Skipping asset");
                skipped.push(SkippedAsset {
                    asset_id: asset.id().to_string(),
                    reason: e.to_string(),
                });
            }
        }
    }

    if series.is_empty() {
        return Err(PortfolioError::NoDataFetched);
    }

    Ok(FetchOutcome { series, skipped })
}

/// Provider backed by series held in memory
#[derive(Debug, Clone, Default)]
pub struct InMemoryPriceProvider {
    series: HashMap<String, PriceSeries>,
}

impl InMemoryPriceProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a series under an identifier (normalized like [`Asset::parse`])
    pub fn insert(&mut self, identifier: &str, series: PriceSeries) -> Result<()> {
        let asset = Asset::parse(identifier)?;
        self.series.insert(asset.id().to_string(), series);
        Ok(())
    }

    /// Register a mutual-fund NAV payload
    pub fn insert_nav_payload(&mut self, identifier: &str, json: &str) -> Result<()> {
        self.insert(identifier, PriceSeries::from_nav_payload(json)?)
    }

    pub fn with_series(mut self, identifier: &str, series: PriceSeries) -> Result<Self> {
        self.insert(identifier, series)?;
        Ok(self)
    }
}

impl PriceProvider for InMemoryPriceProvider {
    fn fetch(&self, asset: &Asset) -> Result<Option<PriceSeries>> {
        Ok(self.series.get(asset.id()).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    struct FailingProvider;

    impl PriceProvider for FailingProvider {
        fn fetch(&self, asset: &Asset) -> Result<Option<PriceSeries>> {
            Err(PortfolioError::Parse(format!("bad response for {}", asset)))
        }
    }

    fn series() -> PriceSeries {
        let d = |day| NaiveDate::from_ymd_opt(2024, 1, day).unwrap();
        PriceSeries::new(vec![(d(1), 10.0), (d(2), 10.5), (d(3), 10.2)]).unwrap()
    }

    #[test]
    fn test_missing_assets_are_skipped() {
        let provider = InMemoryPriceProvider::new()
            .with_series("spy", series())
            .unwrap();
        let assets = vec![Asset::parse("SPY").unwrap(), Asset::parse("QQQ").unwrap()];

        let outcome = fetch_all(&provider, &assets).unwrap();

        assert_eq!(outcome.series.len(), 1);
        assert_eq!(outcome.series[0].0.id(), "SPY");
        assert_eq!(outcome.skipped.len(), 1);
        assert_eq!(outcome.skipped[0].asset_id, "QQQ");
    }

    #[test]
    fn test_empty_series_is_skipped() {
        let provider = InMemoryPriceProvider::new()
            .with_series("A", series())
            .unwrap()
            .with_series("B", PriceSeries::new(vec![]).unwrap())
            .unwrap();
        let assets = vec![Asset::parse("A").unwrap(), Asset::parse("B").unwrap()];

        let outcome = fetch_all(&provider, &assets).unwrap();
        assert_eq!(outcome.skipped[0].asset_id, "B");
    }

    #[test]
    fn test_all_failures_are_fatal() {
        let assets = vec![Asset::parse("A").unwrap(), Asset::parse("123456").unwrap()];
        assert!(matches!(
            fetch_all(&FailingProvider, &assets),
            Err(PortfolioError::NoDataFetched)
        ));
    }

    #[test]
    fn test_nav_payload_registration() {
        let mut provider = InMemoryPriceProvider::new();
        provider
            .insert_nav_payload(
                "120503",
                r#"{"data": [{"date": "02-01-2024", "nav": "11.0"}, {"date": "01-01-2024", "nav": "10.0"}]}"#,
            )
            .unwrap();

        let fund = Asset::parse("120503").unwrap();
        let fetched = provider.fetch(&fund).unwrap().unwrap();
        assert_eq!(fetched.len(), 2);
    }
}
