//! Risk report over simulated terminal values
//!
//! - VaR: empirical lower-tail percentile of terminal portfolio value
//! - CVaR: mean of the terminal values at or below VaR
//! - Annualized return / volatility relative to the initial investment
//! - Sharpe ratio with the zero-volatility limit from [`crate::limits`]

use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics as _;

use crate::error::{PortfolioError, Result};
use crate::limits;
use crate::simulator::SimulationResult;

/// Reporter configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    /// VaR / CVaR confidence level (default: 0.95)
    pub confidence_level: f64,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            confidence_level: 0.95,
        }
    }
}

/// Summary of the simulated terminal distribution
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskReport {
    pub initial_investment: f64,

    /// Mean terminal portfolio value
    pub expected_value: f64,

    /// Population standard deviation of terminal values
    pub std_dev: f64,

    /// Confidence level used for VaR / CVaR
    pub confidence_level: f64,

    /// Terminal value at the (1 - confidence) percentile
    pub var: f64,

    /// Mean terminal value at or below `var`
    pub cvar: f64,

    pub annual_return: f64,
    pub annual_volatility: f64,
    pub sharpe_ratio: f64,
}

impl RiskReport {
    /// Loss versus the initial investment at the VaR level
    pub fn var_loss(&self) -> f64 {
        self.initial_investment - self.var
    }

    /// Loss versus the initial investment at the CVaR level
    pub fn cvar_loss(&self) -> f64 {
        self.initial_investment - self.cvar
    }
}

/// Reduces a [`SimulationResult`] to a [`RiskReport`]
pub struct RiskReporter {
    config: ReportConfig,
}

impl RiskReporter {
    pub fn new(config: ReportConfig) -> Self {
        Self { config }
    }

    pub fn report(&self, simulation: &SimulationResult) -> Result<RiskReport> {
        let confidence_level = self.config.confidence_level;
        if !(confidence_level > 0.0 && confidence_level < 1.0) {
            return Err(PortfolioError::InvalidParameter(format!(
                "Confidence level must be between 0 and 1, got {}",
                confidence_level
            )));
        }

        let initial = simulation.initial_investment();
        let mut terminal = simulation.terminal_values();
        if terminal.is_empty() {
            return Err(PortfolioError::InsufficientData(
                "No simulated paths to report on".to_string(),
            ));
        }

        let expected_value = terminal.iter().mean();
        let std_dev = terminal.iter().population_std_dev();

        terminal.sort_by(|a, b| a.total_cmp(b));
        let var = percentile_sorted(&terminal, 1.0 - confidence_level);

        let tail: Vec<f64> = terminal.iter().copied().take_while(|v| *v <= var).collect();
        // Mean of the tail can round above its maximum when values are equal
        let cvar = tail.iter().mean().min(var);

        let annual_return = expected_value / initial - 1.0;
        let annual_volatility = std_dev / initial;

        Ok(RiskReport {
            initial_investment: initial,
            expected_value,
            std_dev,
            confidence_level,
            var,
            cvar,
            annual_return,
            annual_volatility,
            sharpe_ratio: limits::sharpe(annual_return, annual_volatility),
        })
    }
}

/// Percentile `q` in [0, 1] of sorted data, interpolating linearly between ranks
pub fn percentile_sorted(sorted: &[f64], q: f64) -> f64 {
    let position = q * (sorted.len() - 1) as f64;
    let lower = position.floor() as usize;
    let upper = position.ceil() as usize;
    let frac = position - lower as f64;

    sorted[lower] + (sorted[upper] - sorted[lower]) * frac
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulator::{MonteCarloSimulator, SimulationConfig};
    use approx::assert_relative_eq;
    use nalgebra::{DMatrix, DVector};
    use proptest::prelude::*;

    fn simulate(mean: f64, variance: f64, simulations: usize) -> SimulationResult {
        let sim = MonteCarloSimulator::new(SimulationConfig {
            simulations,
            horizon_days: 20,
            seed: Some(7),
            parallel: false,
        });
        sim.simulate(
            &DVector::from_vec(vec![mean]),
            &DMatrix::from_element(1, 1, variance),
            &[1.0],
            10_000.0,
            &mut sim.config().rng(),
        )
        .unwrap()
    }

    #[test]
    fn test_percentile_interpolation() {
        let data: Vec<f64> = (1..=101).map(|x| x as f64).collect();
        assert_relative_eq!(percentile_sorted(&data, 0.05), 6.0, epsilon = 1e-9);
        assert_relative_eq!(percentile_sorted(&data, 0.0), 1.0);
        assert_relative_eq!(percentile_sorted(&data, 1.0), 101.0);

        let small = [10.0, 20.0, 30.0, 40.0];
        // position = 0.05 * 3 = 0.15
        assert_relative_eq!(percentile_sorted(&small, 0.05), 11.5, epsilon = 1e-9);
    }

    #[test]
    fn test_report_fields() {
        let simulation = simulate(0.0005, 0.0001, 2_000);
        let report = RiskReporter::new(ReportConfig::default())
            .report(&simulation)
            .unwrap();

        assert_eq!(report.confidence_level, 0.95);
        assert!(report.var >= report.cvar);
        assert!(report.var < report.expected_value);
        assert_relative_eq!(report.annual_return, report.expected_value / 10_000.0 - 1.0);
        assert_relative_eq!(report.annual_volatility, report.std_dev / 10_000.0);
        assert_relative_eq!(
            report.sharpe_ratio,
            report.annual_return / report.annual_volatility
        );
        assert_relative_eq!(report.var_loss(), 10_000.0 - report.var);
    }

    #[test]
    fn test_zero_volatility_sharpe_is_zero() {
        let values = DMatrix::from_element(5, 50, 10_500.0);
        let simulation = SimulationResult::from_values(values, 10_000.0).unwrap();
        let report = RiskReporter::new(ReportConfig::default())
            .report(&simulation)
            .unwrap();

        assert_eq!(report.std_dev, 0.0);
        assert_eq!(report.sharpe_ratio, 0.0);
        assert_relative_eq!(report.var, report.cvar, epsilon = 1e-9);
    }

    #[test]
    fn test_invalid_confidence() {
        let simulation = simulate(0.0, 0.0001, 10);
        let reporter = RiskReporter::new(ReportConfig {
            confidence_level: 1.0,
        });
        assert!(reporter.report(&simulation).is_err());
    }

    proptest! {
        #[test]
        fn prop_var_not_below_cvar(values in prop::collection::vec(1.0f64..1e6, 1..300)) {
            let mut sorted = values;
            sorted.sort_by(|a, b| a.total_cmp(b));
            let var = percentile_sorted(&sorted, 0.05);
            let tail: Vec<f64> = sorted.iter().copied().take_while(|v| *v <= var).collect();
            let cvar = tail.iter().sum::<f64>() / tail.len() as f64;
            prop_assert!(!tail.is_empty());
            prop_assert!(var >= cvar);
        }
    }
}
