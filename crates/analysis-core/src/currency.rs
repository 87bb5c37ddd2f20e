//! Reporting-currency normalization.
//!
//! Foreign filers report statements in their home currency while prices are quoted
//! in USD. Statement amounts are converted before any valuation so per-share values
//! compare against the USD price.

use serde::{Deserialize, Serialize};

use crate::numeric::finite_opt;
use crate::{BalanceSheet, FinancialPeriod};

/// Fallback USD conversion rates (multiply by the rate to get USD), used when no
/// live rate is supplied by the caller.
const FALLBACK_USD_RATES: &[(&str, f64)] = &[
    ("CNY", 1.0 / 7.0),
    ("HKD", 1.0 / 7.8),
    ("JPY", 1.0 / 150.0),
    ("EUR", 1.1),
    ("GBP", 1.27),
    ("INR", 1.0 / 83.0),
    ("SGD", 1.0 / 1.35),
    ("AUD", 1.0 / 1.55),
    ("CAD", 1.0 / 1.38),
    ("CHF", 1.1),
    ("SEK", 1.0 / 10.5),
    ("NZD", 1.0 / 1.75),
    ("MXN", 1.0 / 17.0),
    ("BRL", 1.0 / 5.0),
    ("ZAR", 1.0 / 18.0),
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrencyInfo {
    pub reporting_currency: String,
    pub conversion_applied: bool,
    pub conversion_rate: f64,
}

impl Default for CurrencyInfo {
    fn default() -> Self {
        Self {
            reporting_currency: "USD".to_string(),
            conversion_applied: false,
            conversion_rate: 1.0,
        }
    }
}

pub fn fallback_usd_rate(currency_code: &str) -> Option<f64> {
    let code = currency_code.trim().to_uppercase();
    FALLBACK_USD_RATES
        .iter()
        .find(|(c, _)| *c == code)
        .map(|(_, rate)| *rate)
}

/// Resolve the conversion for a reporting currency. A positive finite
/// `override_rate` (e.g. a live quote) wins over the fallback table; unknown
/// currencies are left unconverted.
pub fn currency_info(reporting_currency: Option<&str>, override_rate: Option<f64>) -> CurrencyInfo {
    let code = reporting_currency
        .map(|c| c.trim().to_uppercase())
        .filter(|c| !c.is_empty())
        .unwrap_or_else(|| "USD".to_string());

    if code == "USD" {
        return CurrencyInfo::default();
    }

    let rate = finite_opt(override_rate)
        .filter(|r| *r > 0.0)
        .or_else(|| fallback_usd_rate(&code));

    match rate {
        Some(rate) => CurrencyInfo {
            reporting_currency: code,
            conversion_applied: true,
            conversion_rate: rate,
        },
        None => CurrencyInfo {
            reporting_currency: code,
            conversion_applied: false,
            conversion_rate: 1.0,
        },
    }
}

fn scale(value: Option<f64>, rate: f64) -> Option<f64> {
    value.map(|v| v * rate)
}

impl FinancialPeriod {
    pub fn scaled(&self, rate: f64) -> Self {
        Self {
            period_end: self.period_end,
            revenue: scale(self.revenue, rate),
            net_income: scale(self.net_income, rate),
            operating_income: scale(self.operating_income, rate),
            operating_cash_flow: scale(self.operating_cash_flow, rate),
            capital_expenditures: scale(self.capital_expenditures, rate),
            gross_profit: scale(self.gross_profit, rate),
        }
    }
}

impl BalanceSheet {
    /// Converts monetary items; share count is not a currency amount.
    pub fn scaled(&self, rate: f64) -> Self {
        Self {
            total_assets: scale(self.total_assets, rate),
            current_liabilities: scale(self.current_liabilities, rate),
            total_liabilities: scale(self.total_liabilities, rate),
            total_debt: scale(self.total_debt, rate),
            cash: scale(self.cash, rate),
            diluted_shares_outstanding: self.diluted_shares_outstanding,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use chrono::NaiveDate;

    #[test]
    fn test_usd_is_never_converted() {
        let info = currency_info(Some("usd"), Some(2.0));
        assert!(!info.conversion_applied);
        assert_eq!(info.conversion_rate, 1.0);
        assert_eq!(currency_info(None, None), CurrencyInfo::default());
    }

    #[test]
    fn test_fallback_and_override_rates() {
        let info = currency_info(Some("eur"), None);
        assert!(info.conversion_applied);
        assert_relative_eq!(info.conversion_rate, 1.1);

        let info = currency_info(Some("CNY"), Some(0.14));
        assert_relative_eq!(info.conversion_rate, 0.14);

        // Garbage override falls back to the table
        let info = currency_info(Some("JPY"), Some(f64::NAN));
        assert_relative_eq!(info.conversion_rate, 1.0 / 150.0);
    }

    #[test]
    fn test_unknown_currency_left_as_is() {
        let info = currency_info(Some("XYZ"), None);
        assert_eq!(info.reporting_currency, "XYZ");
        assert!(!info.conversion_applied);
        assert_eq!(info.conversion_rate, 1.0);
    }

    #[test]
    fn test_scaling_keeps_share_count() {
        let mut period = FinancialPeriod::empty(NaiveDate::from_ymd_opt(2024, 12, 31).unwrap());
        period.revenue = Some(700.0);
        let scaled = period.scaled(1.0 / 7.0);
        assert_relative_eq!(scaled.revenue.unwrap(), 100.0);
        assert_eq!(scaled.net_income, None);

        let bs = BalanceSheet {
            total_assets: Some(70.0),
            diluted_shares_outstanding: Some(10.0),
            ..Default::default()
        };
        let scaled = bs.scaled(1.0 / 7.0);
        assert_relative_eq!(scaled.total_assets.unwrap(), 10.0);
        assert_eq!(scaled.diluted_shares_outstanding, Some(10.0));
    }
}
