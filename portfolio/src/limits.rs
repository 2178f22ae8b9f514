//! Defined limits for degenerate divisions
//!
//! Every ratio whose denominator can legitimately be zero (Sharpe with zero
//! volatility, risk contribution with zero portfolio volatility) goes through
//! this module so that all components share one behavior: the ratio is 0.

/// Trading days used to annualize daily statistics
pub const TRADING_DAYS_PER_YEAR: f64 = 252.0;

/// `numerator / denominator`, or 0 when the denominator is exactly zero
#[inline]
pub fn ratio_or_zero(numerator: f64, denominator: f64) -> f64 {
    if denominator == 0.0 {
        0.0
    } else {
        numerator / denominator
    }
}

/// Sharpe ratio (no risk-free rate) with the zero-volatility limit
#[inline]
pub fn sharpe(annual_return: f64, annual_volatility: f64) -> f64 {
    ratio_or_zero(annual_return, annual_volatility)
}
