//! Pipeline configuration
//!
//! One document covers every stage. All sections and fields are optional and
//! fall back to their defaults, so an empty YAML document is a valid config.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{PortfolioError, Result};
use crate::optimizer::OptimizerConfig;
use crate::recommendation::RecommendationRules;
use crate::report::ReportConfig;
use crate::simulator::SimulationConfig;
use crate::statistics::StatisticsConfig;

/// Complete pipeline configuration
///
/// ```
/// use ag_portfolio::PipelineConfig;
///
/// let yaml = r#"
/// simulation:
///   simulations: 1000
///   seed: 42
/// report:
///   confidence_level: 0.99
/// "#;
///
/// let config = PipelineConfig::from_yaml(yaml).unwrap();
/// assert_eq!(config.simulation.simulations, 1000);
/// assert_eq!(config.simulation.horizon_days, 252);
/// assert_eq!(config.rules.min_sharpe, 0.5);
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub simulation: SimulationConfig,
    pub statistics: StatisticsConfig,
    pub optimizer: OptimizerConfig,
    pub report: ReportConfig,
    pub rules: RecommendationRules,
}

impl PipelineConfig {
    /// Parse and validate a YAML document
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Parse and validate a JSON document
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a `.yaml`, `.yml` or `.json` file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)?;

        match path.extension().and_then(|ext| ext.to_str()) {
            Some("yaml") | Some("yml") => Self::from_yaml(&contents),
            Some("json") => Self::from_json(&contents),
            _ => Err(PortfolioError::InvalidParameter(format!(
                "Unsupported config file extension: {}",
                path.display()
            ))),
        }
    }

    /// Check parameter ranges across all sections
    pub fn validate(&self) -> Result<()> {
        if self.simulation.simulations == 0 {
            return Err(invalid("simulation.simulations must be positive"));
        }
        if self.simulation.horizon_days == 0 {
            return Err(invalid("simulation.horizon_days must be positive"));
        }

        let regularization = self.statistics.regularization;
        if !(regularization.is_finite() && regularization >= 0.0) {
            return Err(invalid("statistics.regularization must be non-negative"));
        }

        let tolerance = self.optimizer.tolerance;
        if !(tolerance.is_finite() && tolerance > 0.0) {
            return Err(invalid("optimizer.tolerance must be positive"));
        }

        let confidence = self.report.confidence_level;
        if !(confidence > 0.0 && confidence < 1.0) {
            return Err(invalid("report.confidence_level must be in (0, 1)"));
        }

        if !self.rules.min_sharpe.is_finite() {
            return Err(invalid("rules.min_sharpe must be finite"));
        }
        let band = self.rules.rebalance_band;
        if !(band.is_finite() && band >= 0.0) {
            return Err(invalid("rules.rebalance_band must be non-negative"));
        }

        Ok(())
    }
}

fn invalid(message: &str) -> PortfolioError {
    PortfolioError::InvalidParameter(message.to_string())
}
