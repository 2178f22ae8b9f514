//! Price series and log-return matrices
//!
//! A [`PriceSeries`] holds one asset's prices keyed by date. A
//! [`ReturnMatrix`] aligns several series on the dates they all share and
//! turns consecutive prices into log returns `ln(P[t] / P[t-1])`.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use nalgebra::{DMatrix, DVector};
use serde::Deserialize;

use crate::asset::Asset;
use crate::error::{PortfolioError, Result};

/// Date format used by mutual-fund NAV payloads
pub const NAV_DATE_FORMAT: &str = "%d-%m-%Y";

/// Prices for a single asset, ordered by date
#[derive(Debug, Clone, PartialEq)]
pub struct PriceSeries {
    points: BTreeMap<NaiveDate, f64>,
}

/// NAV payload as served by the mutual-fund data provider
#[derive(Debug, Clone, Deserialize)]
struct NavPayload {
    data: Vec<NavRecord>,
}

/// One NAV observation; providers send the NAV as text or as a number
#[derive(Debug, Clone, Deserialize)]
pub struct NavRecord {
    pub date: String,
    pub nav: NavValue,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum NavValue {
    Number(f64),
    Text(String),
}

impl NavValue {
    fn to_f64(&self) -> Result<f64> {
        match self {
            NavValue::Number(v) => Ok(*v),
            NavValue::Text(s) => s
                .trim()
                .parse::<f64>()
                .map_err(|e| PortfolioError::Parse(format!("NAV {:?}: {}", s, e))),
        }
    }
}

impl PriceSeries {
    /// Build a series from (date, price) points in any order
    ///
    /// Duplicate dates and non-positive or non-finite prices are rejected.
    pub fn new(points: Vec<(NaiveDate, f64)>) -> Result<Self> {
        let mut map = BTreeMap::new();

        for (date, price) in points {
            if !(price.is_finite() && price > 0.0) {
                return Err(PortfolioError::InvalidPrice {
                    date: date.to_string(),
                    price,
                });
            }

            if map.insert(date, price).is_some() {
                return Err(PortfolioError::InvalidParameter(format!(
                    "Duplicate price date: {}",
                    date
                )));
            }
        }

        Ok(Self { points: map })
    }

    /// Decode a mutual-fund NAV payload (`{"data": [{"date": "dd-mm-yyyy", "nav": "..."}]}`)
    pub fn from_nav_payload(json: &str) -> Result<Self> {
        let payload: NavPayload = serde_json::from_str(json)?;
        Self::from_nav_records(&payload.data)
    }

    /// Convert NAV records, parsing `dd-mm-yyyy` dates and numeric NAVs
    pub fn from_nav_records(records: &[NavRecord]) -> Result<Self> {
        let points = records
            .iter()
            .map(|record| {
                let date = NaiveDate::parse_from_str(record.date.trim(), NAV_DATE_FORMAT)
                    .map_err(|e| {
                        PortfolioError::Parse(format!("NAV date {:?}: {}", record.date, e))
                    })?;
                Ok((date, record.nav.to_f64()?))
            })
            .collect::<Result<Vec<_>>>()?;

        Self::new(points)
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn get(&self, date: &NaiveDate) -> Option<f64> {
        self.points.get(date).copied()
    }

    pub fn dates(&self) -> impl Iterator<Item = &NaiveDate> {
        self.points.keys()
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.points.keys().next().copied()
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.points.keys().next_back().copied()
    }
}

/// Dates × assets matrix of daily log returns with no missing values
#[derive(Debug, Clone)]
pub struct ReturnMatrix {
    assets: Vec<Asset>,
    dates: Vec<NaiveDate>,
    values: DMatrix<f64>,
}

impl ReturnMatrix {
    /// Wrap an existing matrix (rows = dates, columns = assets)
    pub fn new(assets: Vec<Asset>, dates: Vec<NaiveDate>, values: DMatrix<f64>) -> Result<Self> {
        if values.ncols() != assets.len() {
            return Err(PortfolioError::DimensionMismatch {
                expected: assets.len(),
                actual: values.ncols(),
            });
        }

        if values.nrows() != dates.len() {
            return Err(PortfolioError::DimensionMismatch {
                expected: dates.len(),
                actual: values.nrows(),
            });
        }

        if values.iter().any(|v| !v.is_finite()) {
            return Err(PortfolioError::InvalidParameter(
                "Return matrix contains non-finite values".to_string(),
            ));
        }

        Ok(Self {
            assets,
            dates,
            values,
        })
    }

    /// Align price series on their common dates and compute log returns
    ///
    /// A date survives only if every asset has a price for it. Each row is
    /// labelled with the later of the two dates it spans.
    pub fn from_prices(series: &[(Asset, PriceSeries)]) -> Result<Self> {
        if series.is_empty() {
            return Err(PortfolioError::NoDataFetched);
        }

        let common_dates: Vec<NaiveDate> = series[0]
            .1
            .dates()
            .filter(|date| series[1..].iter().all(|(_, s)| s.get(date).is_some()))
            .copied()
            .collect();

        if common_dates.len() < 2 {
            return Err(PortfolioError::InsufficientData(format!(
                "Need at least 2 common price dates, got {}",
                common_dates.len()
            )));
        }

        let rows = common_dates.len() - 1;
        let cols = series.len();
        let mut values = DMatrix::zeros(rows, cols);

        for (j, (_, prices)) in series.iter().enumerate() {
            for (t, pair) in common_dates.windows(2).enumerate() {
                // Both dates come from the intersection, so the lookups succeed
                let (Some(prev), Some(curr)) = (prices.get(&pair[0]), prices.get(&pair[1])) else {
                    continue;
                };
                values[(t, j)] = (curr / prev).ln();
            }
        }

        Self::new(
            series.iter().map(|(asset, _)| asset.clone()).collect(),
            common_dates[1..].to_vec(),
            values,
        )
    }

    pub fn assets(&self) -> &[Asset] {
        &self.assets
    }

    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    pub fn values(&self) -> &DMatrix<f64> {
        &self.values
    }

    /// Number of return observations (rows)
    pub fn num_observations(&self) -> usize {
        self.values.nrows()
    }

    pub fn num_assets(&self) -> usize {
        self.values.ncols()
    }

    /// Return series of one asset
    pub fn column(&self, index: usize) -> DVector<f64> {
        self.values.column(index).into_owned()
    }
}
