//! End-to-end risk pipeline
//!
//! fetch → returns → statistics → simulation → report → optimization →
//! attribution → recommendations. Per-asset fetch failures are recovered by
//! dropping the asset and renormalizing the remaining weights; any other
//! failure aborts the run with the stage attached.

use std::collections::HashSet;

use nalgebra::DMatrix;
use rand::Rng;

use crate::asset::{Portfolio, PortfolioSpec};
use crate::attribution::{AttributionResult, RiskAttributor};
use crate::config::PipelineConfig;
use crate::error::{PipelineStage, Result};
use crate::optimizer::{MinVarianceOptimizer, OptimizationResult};
use crate::provider::{fetch_all, PriceProvider, SkippedAsset};
use crate::recommendation::{AssetAnalysis, RecommendationEngine};
use crate::report::{RiskReport, RiskReporter};
use crate::series::ReturnMatrix;
use crate::simulator::{MonteCarloSimulator, SimulationResult};
use crate::statistics::{AssetStatistics, Statistics, StatisticsEstimator};

/// Everything a run produces
#[derive(Debug, Clone)]
pub struct PipelineReport {
    /// Portfolio actually analysed, after dropping skipped assets
    pub portfolio: Portfolio,
    pub initial_investment: f64,
    pub skipped: Vec<SkippedAsset>,

    pub statistics: Statistics,
    pub asset_statistics: Vec<AssetStatistics>,

    pub simulation: SimulationResult,
    pub risk: RiskReport,

    /// Minimum-variance allocation
    pub optimal: OptimizationResult,

    /// Attribution of the current allocation
    pub attribution: AttributionResult,

    pub analyses: Vec<AssetAnalysis>,
}

impl PipelineReport {
    /// Correlation of daily log returns, for heatmaps
    pub fn correlation(&self) -> &DMatrix<f64> {
        self.statistics.correlation()
    }
}

/// Runs the full analysis for one portfolio
pub struct RiskPipeline {
    config: PipelineConfig,
}

impl RiskPipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Run with the random source described by `simulation.seed`
    pub fn run(
        &self,
        spec: &PortfolioSpec,
        provider: &dyn PriceProvider,
    ) -> Result<PipelineReport> {
        let mut rng = self.config.simulation.rng();
        self.run_with_rng(spec, provider, &mut rng)
    }

    /// Run with a caller-owned random source
    pub fn run_with_rng<R>(
        &self,
        spec: &PortfolioSpec,
        provider: &dyn PriceProvider,
        rng: &mut R,
    ) -> Result<PipelineReport>
    where
        R: Rng + ?Sized,
    {
        self.config.validate()?;
        let requested = spec.to_portfolio()?;

        let fetched =
            fetch_all(provider, requested.assets()).map_err(|e| e.at(PipelineStage::Fetch))?;
        let available: HashSet<&str> = fetched.series.iter().map(|(a, _)| a.id()).collect();
        let portfolio = requested
            .retain(|asset| available.contains(asset.id()))
            .map_err(|e| e.at(PipelineStage::Fetch))?;

        tracing::info!(
            assets = portfolio.len(),
            skipped = fetched.skipped.len(),
            "Fetched price data"
        );

        let returns = ReturnMatrix::from_prices(&fetched.series)
            .map_err(|e| e.at(PipelineStage::Returns))?;
        tracing::info!(
            observations = returns.num_observations(),
            "Computed log returns"
        );

        let statistics = StatisticsEstimator::new(self.config.statistics.clone())
            .estimate(&returns)
            .map_err(|e| e.at(PipelineStage::Statistics))?;
        let asset_statistics = statistics.asset_statistics();

        let simulation = MonteCarloSimulator::new(self.config.simulation.clone())
            .simulate(
                statistics.mean(),
                statistics.covariance(),
                portfolio.weights(),
                spec.initial_investment,
                rng,
            )
            .map_err(|e| e.at(PipelineStage::Simulation))?;

        let risk = RiskReporter::new(self.config.report.clone())
            .report(&simulation)
            .map_err(|e| e.at(PipelineStage::Report))?;
        tracing::info!(
            expected_value = risk.expected_value,
            var = risk.var,
            cvar = risk.cvar,
            "Simulated portfolio outcomes"
        );

        let annual_mean = statistics.annual_mean();
        let annual_covariance = statistics.annual_covariance();

        let mut optimal = MinVarianceOptimizer::new(self.config.optimizer.clone())
            .optimize(&annual_mean, &annual_covariance)
            .map_err(|e| e.at(PipelineStage::Optimization))?;
        if self.config.optimizer.require_convergence {
            optimal = optimal
                .require_converged()
                .map_err(|e| e.at(PipelineStage::Optimization))?;
        } else if !optimal.converged() {
            tracing::warn!(
                iterations = optimal.iterations,
                "Using best feasible allocation from a non-converged optimizer run"
            );
        }
        tracing::info!(
            annual_volatility = optimal.annual_volatility,
            expected_return = optimal.expected_return,
            "Optimized allocation"
        );

        let attribution = RiskAttributor::new()
            .attribute(portfolio.assets(), portfolio.weights(), &annual_covariance)
            .map_err(|e| e.at(PipelineStage::Attribution))?;

        let analyses = RecommendationEngine::new(self.config.rules.clone())
            .recommend(&asset_statistics, portfolio.weights(), &optimal.weights)
            .map_err(|e| e.at(PipelineStage::Recommendation))?;

        for analysis in &analyses {
            tracing::debug!(
                asset = %analysis.asset_id,
                action = %analysis.recommendation.action,
                deviation = analysis.deviation,
                "Recommendation"
            );
        }

        Ok(PipelineReport {
            portfolio,
            initial_investment: spec.initial_investment,
            skipped: fetched.skipped,
            statistics,
            asset_statistics,
            simulation,
            risk,
            optimal,
            attribution,
            analyses,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PortfolioError;
    use crate::provider::InMemoryPriceProvider;
    use crate::series::PriceSeries;
    use chrono::NaiveDate;

    fn series(prices: &[f64]) -> PriceSeries {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        PriceSeries::new(
            prices
                .iter()
                .enumerate()
                .map(|(i, p)| (start + chrono::Duration::days(i as i64), *p))
                .collect(),
        )
        .unwrap()
    }

    fn config() -> PipelineConfig {
        let mut config = PipelineConfig::default();
        config.simulation.simulations = 200;
        config.simulation.horizon_days = 20;
        config.simulation.seed = Some(11);
        config
    }

    #[test]
    fn test_invalid_spec_is_rejected_before_fetch() {
        let spec = PortfolioSpec {
            assets: vec!["A".to_string()],
            weights_pct: vec![100.0],
            initial_investment: 0.0,
        };
        let result = RiskPipeline::new(config()).run(&spec, &InMemoryPriceProvider::new());
        assert!(matches!(result, Err(PortfolioError::InvalidParameter(_))));
    }

    #[test]
    fn test_short_history_fails_in_returns_stage() {
        let provider = InMemoryPriceProvider::new()
            .with_series("A", series(&[10.0]))
            .unwrap();
        let spec = PortfolioSpec {
            assets: vec!["A".to_string()],
            weights_pct: vec![100.0],
            initial_investment: 1000.0,
        };

        match RiskPipeline::new(config()).run(&spec, &provider) {
            Err(PortfolioError::StageFailed { stage, .. }) => {
                assert_eq!(stage, PipelineStage::Returns)
            }
            other => panic!("Expected a returns stage failure, got {:?}", other),
        }
    }

    #[test]
    fn test_skipped_asset_weights_renormalized() {
        let provider = InMemoryPriceProvider::new()
            .with_series("A", series(&[10.0, 10.2, 10.1, 10.4, 10.3, 10.6]))
            .unwrap()
            .with_series("B", series(&[20.0, 19.8, 20.3, 20.1, 20.5, 20.4]))
            .unwrap();
        let spec = PortfolioSpec {
            assets: vec!["A".to_string(), "MISSING".to_string(), "B".to_string()],
            weights_pct: vec![25.0, 50.0, 25.0],
            initial_investment: 1000.0,
        };

        let report = RiskPipeline::new(config()).run(&spec, &provider).unwrap();

        assert_eq!(report.skipped.len(), 1);
        assert_eq!(report.portfolio.weights(), &[0.5, 0.5]);
        assert_eq!(report.analyses.len(), 2);
        assert_eq!(report.correlation().nrows(), 2);
    }
}
