//! DCF-lite: five years of TTM free cash flow per share plus a Gordon terminal value.

use std::collections::BTreeMap;

use analysis_core::numeric::{finite, finite_opt, pct_change};
use analysis_core::{clamp_growth_rate, validate_growth_rate, Assessment, ValuationMethodResult};

use crate::epv::{price_assessment, WACC};
use crate::method::{ValuationInput, ValuationMethod};

pub const PROJECTION_YEARS: i32 = 5;
pub const MAX_TERMINAL_GROWTH: f64 = 0.025;

const METHOD_NAME: &str = "DCF-Lite";

/// Present value per share of `fcf_per_share` grown at `growth_rate` for five years,
/// with terminal growth capped at 2.5%.
pub fn dcf_lite_value(fcf_per_share: f64, growth_rate: f64, discount_rate: f64) -> Option<f64> {
    let terminal_growth = growth_rate.min(MAX_TERMINAL_GROWTH);
    if discount_rate - terminal_growth <= 0.0 {
        return None;
    }

    let projected_fcf: f64 = (1_i32..=PROJECTION_YEARS)
        .map(|i| {
            fcf_per_share * (1.0_f64 + growth_rate).powi(i)
                / (1.0_f64 + discount_rate).powi(i)
        })
        .sum();
    let terminal_value = fcf_per_share
        * (1.0_f64 + growth_rate).powi(PROJECTION_YEARS)
        * (1.0_f64 + terminal_growth)
        / (discount_rate - terminal_growth);
    let terminal_pv = terminal_value / (1.0_f64 + discount_rate).powi(PROJECTION_YEARS);

    finite(projected_fcf + terminal_pv)
}

#[derive(Debug, Clone, Copy, Default)]
pub struct DcfLiteMethod;

impl DcfLiteMethod {
    pub fn new() -> Self {
        Self
    }

    fn unable(&self, reason: &str, confidence: f64) -> ValuationMethodResult {
        ValuationMethodResult {
            name: METHOD_NAME.to_string(),
            intrinsic_value: 0.0,
            upside: None,
            assessment: Assessment::UnableToValue,
            confidence,
            narrative: format!("Discounted cash flow could not be estimated: {}.", reason),
            assumptions: BTreeMap::new(),
            limitations: vec![reason.to_string()],
            scenarios: None,
        }
    }
}

impl ValuationMethod for DcfLiteMethod {
    fn name(&self) -> &'static str {
        METHOD_NAME
    }

    fn value(&self, input: &ValuationInput) -> ValuationMethodResult {
        let confidence = if input.ttm.is_partial() { 0.35 } else { 0.5 };

        let shares = match finite_opt(input.balance_sheet.diluted_shares_outstanding) {
            Some(s) if s > 0.0 => s,
            _ => return self.unable("diluted share count unavailable", confidence),
        };
        let price = finite_opt(input.current_price).filter(|p| *p > 0.0);
        let annual_fcf = input.ttm.free_cash_flow * input.ttm.annualization_factor().unwrap_or(0.0);
        let fcf_per_share = match finite(annual_fcf / shares) {
            Some(f) if f > 0.0 => f,
            _ => return self.unable("trailing free cash flow is not positive", confidence),
        };

        let growth_rate = validate_growth_rate(clamp_growth_rate(input.growth.rate), WACC);
        let fair_value = match dcf_lite_value(fcf_per_share, growth_rate, WACC) {
            Some(v) if v > 0.0 => v,
            _ => return self.unable("projection did not produce a positive value", confidence),
        };

        let assessment = price_assessment(price, fair_value);

        let mut assumptions = BTreeMap::new();
        assumptions.insert("discount_rate".to_string(), format!("{:.1}%", WACC * 100.0));
        assumptions.insert(
            "growth_rate".to_string(),
            format!("{:.2}%", growth_rate * 100.0),
        );
        assumptions.insert(
            "terminal_growth".to_string(),
            format!("{:.2}%", growth_rate.min(MAX_TERMINAL_GROWTH) * 100.0),
        );
        assumptions.insert(
            "projection_years".to_string(),
            PROJECTION_YEARS.to_string(),
        );
        assumptions.insert("ttm_basis".to_string(), input.ttm.period_label());

        let mut limitations = vec![
            "Projects a single year of free cash flow forward; lumpy capital spending distorts it"
                .to_string(),
            "Terminal value dominates the estimate".to_string(),
        ];
        if input.ttm.is_partial() {
            limitations.push(format!(
                "Free cash flow is annualized from a {} aggregate",
                input.ttm.period_label()
            ));
        }

        ValuationMethodResult {
            name: METHOD_NAME.to_string(),
            intrinsic_value: fair_value,
            upside: price.and_then(|p| pct_change(fair_value, p)),
            assessment,
            confidence,
            narrative: match price {
                Some(p) => format!(
                    "Free cash flow of ${:.2} per share grown at {:.1}% for {} years and discounted at {:.0}% implies ${:.2} per share, so the stock looks {} at ${:.2}.",
                    fcf_per_share,
                    growth_rate * 100.0,
                    PROJECTION_YEARS,
                    WACC * 100.0,
                    fair_value,
                    assessment.to_label(),
                    p
                ),
                None => format!(
                    "Free cash flow of ${:.2} per share grown at {:.1}% for {} years and discounted at {:.0}% implies ${:.2} per share; no current price is available for comparison.",
                    fcf_per_share,
                    growth_rate * 100.0,
                    PROJECTION_YEARS,
                    WACC * 100.0,
                    fair_value
                ),
            },
            assumptions,
            limitations,
            scenarios: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use analysis_core::{BalanceSheet, GrowthConfidence, GrowthEstimate, TtmAggregate};
    use approx::assert_relative_eq;

    fn input(fcf: f64, shares: Option<f64>, price: Option<f64>, data_points: u8) -> ValuationInput {
        ValuationInput {
            ticker: "TEST".to_string(),
            periods: vec![],
            ttm: TtmAggregate {
                free_cash_flow: fcf,
                data_points,
                ..Default::default()
            },
            current_price: price,
            balance_sheet: BalanceSheet {
                diluted_shares_outstanding: shares,
                ..Default::default()
            },
            growth: GrowthEstimate::new(0.03, GrowthConfidence::Medium, "test"),
        }
    }

    #[test]
    fn test_zero_growth_matches_perpetuity() {
        // With g = 0 the projection collapses to fcf / r
        let v = dcf_lite_value(9.0, 0.0, 0.09).unwrap();
        assert_relative_eq!(v, 100.0, epsilon = 1e-9);
    }

    #[test]
    fn test_value_rises_with_growth() {
        let low = dcf_lite_value(5.0, 0.0, 0.09).unwrap();
        let high = dcf_lite_value(5.0, 0.04, 0.09).unwrap();
        assert!(high > low);
    }

    #[test]
    fn test_dcf_method_result() {
        let result = DcfLiteMethod::new().value(&input(500.0, Some(100.0), Some(60.0), 4));
        assert_eq!(result.name, "DCF-Lite");
        assert!(result.intrinsic_value > 60.0);
        assert_eq!(result.assessment, Assessment::Undervalued);
        assert_relative_eq!(result.confidence, 0.5);
        assert!(result.upside.unwrap() > 0.0);
        assert_eq!(result.limitations.len(), 2);
    }

    #[test]
    fn test_partial_ttm_lowers_confidence() {
        let result = DcfLiteMethod::new().value(&input(375.0, Some(100.0), Some(60.0), 3));
        assert_relative_eq!(result.confidence, 0.35);
        assert_eq!(result.limitations.len(), 3);
        assert!(result.limitations[2].contains("Partial (3 of 4 quarters)"));

        // Three quarters of 375 annualize to the same 500 as a full year
        let full = DcfLiteMethod::new().value(&input(500.0, Some(100.0), Some(60.0), 4));
        assert_relative_eq!(result.intrinsic_value, full.intrinsic_value, epsilon = 1e-9);
    }

    #[test]
    fn test_values_without_price() {
        let result = DcfLiteMethod::new().value(&input(500.0, Some(100.0), None, 4));
        assert!(result.intrinsic_value > 0.0);
        assert_eq!(result.assessment, Assessment::FairlyValued);
        assert_eq!(result.upside, None);
        assert!(result.narrative.contains("no current price"));
    }

    #[test]
    fn test_unable_cases() {
        let method = DcfLiteMethod::new();
        for inp in [
            input(-10.0, Some(100.0), Some(60.0), 4),
            input(500.0, None, Some(60.0), 4),
        ] {
            let result = method.value(&inp);
            assert_eq!(result.assessment, Assessment::UnableToValue);
            assert_eq!(result.upside, None);
            assert_eq!(result.limitations.len(), 1);
        }
    }
}
