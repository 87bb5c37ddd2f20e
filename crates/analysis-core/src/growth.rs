//! Growth-rate guard rails shared by the advisor and the valuation engines.

use crate::numeric::finite;

/// Highest long-term growth allowed into a valuation (keeps g well below WACC).
pub const MAX_GROWTH_RATE: f64 = 0.04;
/// Steepest decline accepted for a shrinking business.
pub const MIN_GROWTH_RATE: f64 = -0.20;
/// Used whenever no usable estimate exists.
pub const DEFAULT_GROWTH_RATE: f64 = 0.03;

/// Clamp a decimal growth rate into `[-0.20, 0.04]`. Non-finite input yields the default.
pub fn clamp_growth_rate(rate: f64) -> f64 {
    finite(rate)
        .unwrap_or(DEFAULT_GROWTH_RATE)
        .clamp(MIN_GROWTH_RATE, MAX_GROWTH_RATE)
}

/// Re-check an already capped rate against an explicit WACC. A rate at or above
/// WACC would make `NOPAT / (WACC - g)` explode, so it is pulled to one point
/// below WACC. Negative rates pass through untouched.
pub fn validate_growth_rate(rate: f64, wacc: f64) -> f64 {
    let rate = finite(rate).unwrap_or(DEFAULT_GROWTH_RATE);
    if rate >= wacc {
        wacc - 0.01
    } else {
        rate
    }
}
