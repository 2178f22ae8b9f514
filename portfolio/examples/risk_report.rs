//! Portfolio risk report example
//!
//! Runs the full pipeline on synthetic prices for two ETFs and a mutual fund,
//! then prints the simulated risk, the minimum-variance allocation, the risk
//! attribution and the rebalancing advice.
//!
//! Run with: cargo run --example risk_report
//! Set RUST_LOG=ag_portfolio=debug to see stage logging.

use ag_portfolio::{
    init_tracing, InMemoryPriceProvider, PipelineConfig, PortfolioSpec, PriceSeries,
    RiskPipeline,
};
use chrono::{Duration, NaiveDate};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    println!("=== Portfolio Risk Report Example ===\n");

    // 1. Historical prices (simulated)
    let start = NaiveDate::from_ymd_opt(2023, 1, 2).ok_or("invalid start date")?;
    let days = 500;

    let path = |drift: f64, wave: f64, period: f64, shift: f64| -> Vec<(NaiveDate, f64)> {
        let mut price = 100.0;
        (0..days)
            .map(|d| {
                let t = d as f64;
                let r = drift
                    + wave * (t / period + shift).sin()
                    + 0.004 * ((d * 37 % 101) as f64 / 101.0 - 0.5);
                price *= f64::exp(r);
                (start + Duration::days(d as i64), price)
            })
            .collect()
    };

    let mut provider = InMemoryPriceProvider::new();
    provider.insert("SPY", PriceSeries::new(path(0.0005, 0.012, 3.0, 0.0))?)?;
    provider.insert("TLT", PriceSeries::new(path(-0.0001, 0.006, 5.0, 1.3))?)?;

    // Mutual funds arrive as NAV payloads with dd-mm-yyyy dates
    let records: Vec<String> = path(0.0003, 0.008, 4.0, 0.4)
        .iter()
        .map(|(date, nav)| {
            format!(
                r#"{{"date": "{}", "nav": "{:.4}"}}"#,
                date.format(ag_portfolio::series::NAV_DATE_FORMAT),
                nav
            )
        })
        .collect();
    provider.insert_nav_payload("120503", &format!(r#"{{"data": [{}]}}"#, records.join(",")))?;

    // 2. Portfolio and configuration
    let spec = PortfolioSpec {
        assets: vec!["SPY".to_string(), "TLT".to_string(), "120503".to_string()],
        weights_pct: vec![60.0, 30.0, 10.0],
        initial_investment: 100_000.0,
    };

    let config_path = concat!(env!("CARGO_MANIFEST_DIR"), "/config/default.yaml");
    let mut config = PipelineConfig::from_file(config_path)?;
    config.simulation.seed = Some(42);

    // 3. Run
    let report = RiskPipeline::new(config).run(&spec, &provider)?;

    println!("Simulated one-year outcome ({} paths):", report.simulation.num_simulations());
    let risk = &report.risk;
    println!("  Initial investment: ${:>12.2}", risk.initial_investment);
    println!("  Expected value:     ${:>12.2}", risk.expected_value);
    println!(
        "  VaR {:.0}%:            ${:>12.2} (loss ${:.2})",
        risk.confidence_level * 100.0,
        risk.var,
        risk.var_loss()
    );
    println!(
        "  CVaR {:.0}%:           ${:>12.2} (loss ${:.2})",
        risk.confidence_level * 100.0,
        risk.cvar,
        risk.cvar_loss()
    );
    println!("  Annual return:       {:>12.2}%", risk.annual_return * 100.0);
    println!("  Annual volatility:   {:>12.2}%", risk.annual_volatility * 100.0);
    println!("  Sharpe ratio:        {:>12.3}", risk.sharpe_ratio);
    println!();

    println!(
        "Minimum-variance allocation ({:?} after {} iterations):",
        report.optimal.status, report.optimal.iterations
    );
    println!(
        "  Expected return {:.2}%, volatility {:.2}%",
        report.optimal.expected_return * 100.0,
        report.optimal.annual_volatility * 100.0
    );
    println!();

    println!(
        "Risk attribution (portfolio volatility {:.2}%):",
        report.attribution.portfolio_volatility * 100.0
    );
    for c in &report.attribution.contributions {
        println!(
            "  {:<8} marginal {:>7.4}  component {:>7.4}  share {:>6.2}%",
            c.asset_id, c.marginal_contribution, c.component_contribution, c.risk_pct
        );
    }
    println!();

    println!("Recommendations:");
    for a in &report.analyses {
        println!(
            "  {:<8} {:<8} current {:>6.2}%  optimal {:>6.2}%  return {:>7.2}%  sharpe {:>6.3}",
            a.asset_id,
            a.recommendation.action.to_string(),
            a.current_weight * 100.0,
            a.optimal_weight * 100.0,
            a.annual_return * 100.0,
            a.sharpe_ratio
        );
    }

    Ok(())
}
