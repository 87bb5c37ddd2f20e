//! Numeric helpers shared by the calculators.
//!
//! Upstream market data routinely carries NaN, infinities and nulls. Calculators
//! never propagate those: they are collapsed to `None` (or 0 when summing) here.

/// Returns `Some(v)` only for finite values.
pub fn finite(value: f64) -> Option<f64> {
    if value.is_finite() {
        Some(value)
    } else {
        None
    }
}

/// Flattens an optional input, dropping NaN/Inf.
pub fn finite_opt(value: Option<f64>) -> Option<f64> {
    value.and_then(finite)
}

/// Optional input treated as 0 when absent or non-finite.
pub fn or_zero(value: Option<f64>) -> f64 {
    finite_opt(value).unwrap_or(0.0)
}

/// Compute the mean of a data slice.
pub fn mean(data: &[f64]) -> f64 {
    if data.is_empty() {
        return 0.0;
    }
    data.iter().sum::<f64>() / data.len() as f64
}

/// Percentage change of `value` relative to `base`. `None` unless `base > 0`.
pub fn pct_change(value: f64, base: f64) -> Option<f64> {
    if base > 0.0 {
        finite((value - base) / base * 100.0)
    } else {
        None
    }
}

/// Round to a fixed number of decimals (for display strings and stable comparisons).
pub fn round_to(value: f64, decimals: u32) -> f64 {
    let factor = 10f64.powi(decimals as i32);
    (value * factor).round() / factor
}
