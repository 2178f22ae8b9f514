//! # ag-portfolio: Monte Carlo Risk Engine for Multi-Asset Portfolios
//!
//! This library estimates the risk of a weighted portfolio of equities, ETFs
//! and mutual funds from historical prices, and recommends how to rebalance it.
//!
//! ## Core Components
//!
//! - **ReturnMatrix**: Date-aligned daily log returns
//! - **StatisticsEstimator**: Mean, regularized covariance and correlation
//! - **MonteCarloSimulator**: Correlated return paths via Cholesky factorization
//! - **RiskReporter**: VaR / CVaR / Sharpe over terminal portfolio values
//! - **MinVarianceOptimizer**: Long-only fully-invested minimum-volatility weights
//! - **RiskAttributor**: Euler decomposition of portfolio volatility
//! - **RecommendationEngine**: SELL / REDUCE / INCREASE / KEEP per asset
//! - **RiskPipeline**: Runs all of the above against a [`PriceProvider`]
//!
//! ## Example Usage
//!
//! ```rust
//! use ag_portfolio::{
//!     InMemoryPriceProvider, PipelineConfig, PortfolioSpec, PriceSeries, RiskPipeline,
//! };
//! use chrono::NaiveDate;
//!
//! let day = |d| NaiveDate::from_ymd_opt(2024, 3, d).unwrap();
//! let stock = PriceSeries::new(vec![
//!     (day(1), 100.0), (day(4), 101.5), (day(5), 100.8), (day(6), 102.0), (day(7), 103.1),
//! ]).unwrap();
//! let bonds = PriceSeries::new(vec![
//!     (day(1), 50.0), (day(4), 50.1), (day(5), 50.3), (day(6), 50.2), (day(7), 50.4),
//! ]).unwrap();
//!
//! let provider = InMemoryPriceProvider::new()
//!     .with_series("SPY", stock).unwrap()
//!     .with_series("AGG", bonds).unwrap();
//!
//! let config = PipelineConfig::from_yaml(r#"
//! simulation:
//!   simulations: 500
//!   horizon_days: 21
//!   seed: 42
//! "#).unwrap();
//!
//! let spec = PortfolioSpec {
//!     assets: vec!["SPY".to_string(), "AGG".to_string()],
//!     weights_pct: vec![60.0, 40.0],
//!     initial_investment: 10_000.0,
//! };
//!
//! let report = RiskPipeline::new(config).run(&spec, &provider).unwrap();
//! assert!(report.risk.cvar <= report.risk.var);
//! assert_eq!(report.analyses.len(), 2);
//! ```

pub mod asset;
pub mod attribution;
pub mod config;
pub mod error;
pub mod limits;
pub mod optimizer;
pub mod pipeline;
pub mod provider;
pub mod recommendation;
pub mod report;
pub mod series;
pub mod simulator;
pub mod statistics;

pub use asset::{Asset, AssetKind, Portfolio, PortfolioSpec};
pub use attribution::{AttributionResult, RiskAttributor, RiskContribution};
pub use config::PipelineConfig;
pub use error::{PipelineStage, PortfolioError, Result};
pub use optimizer::{
    ConvergenceStatus, MinVarianceOptimizer, OptimizationResult, OptimizerConfig,
};
pub use pipeline::{PipelineReport, RiskPipeline};
pub use provider::{fetch_all, FetchOutcome, InMemoryPriceProvider, PriceProvider, SkippedAsset};
pub use recommendation::{
    Action, AssetAnalysis, Reason, Recommendation, RecommendationEngine, RecommendationRules,
};
pub use report::{ReportConfig, RiskReport, RiskReporter};
pub use series::{PriceSeries, ReturnMatrix};
pub use simulator::{cholesky_factor, MonteCarloSimulator, SimulationConfig, SimulationResult};
pub use statistics::{AssetStatistics, Statistics, StatisticsConfig, StatisticsEstimator};

// Initialize tracing
pub fn init_tracing() {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env())
        .init();
}
