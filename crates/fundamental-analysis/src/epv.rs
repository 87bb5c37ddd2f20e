//! Earning Power Value (EPV).
//!
//! Capitalizes normalized after-tax operating earnings at a fixed cost of capital,
//! once with zero growth ("Conservative") and once with the capped market growth
//! rate ("Base Case"). Steps run strictly in order: NOPAT → scenarios →
//! confidence → summary.

use std::collections::BTreeMap;

use analysis_core::numeric::{finite, finite_opt, mean, or_zero, pct_change};
use analysis_core::{
    clamp_growth_rate, validate_growth_rate, Assessment, EpvScenario, FinancialPeriod,
    GrowthConfidence, GrowthEstimate, NormalizedEarnings, ValuationMethodResult, ValueRange,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::method::{ValuationInput, ValuationMethod};

pub const WACC: f64 = 0.09;
pub const EPV_TAX_RATE: f64 = 0.15;
/// TTM plus up to three prior fiscal years.
pub const MAX_EPV_PERIODS: usize = 4;

pub const CONSERVATIVE_SCENARIO: &str = "Conservative";
pub const BASE_CASE_SCENARIO: &str = "Base Case";

const METHOD_NAME: &str = "Earning Power Value";

/// Confidence given up when the leading row is an annualized partial TTM.
pub const PARTIAL_TTM_PENALTY: f64 = 0.1;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EpvInput {
    /// Most recent TTM first, then up to three prior fiscal years.
    pub periods: Vec<FinancialPeriod>,
    pub current_price: Option<f64>,
    pub total_debt: Option<f64>,
    pub non_operating_cash: Option<f64>,
    pub diluted_shares_outstanding: Option<f64>,
    pub growth: GrowthEstimate,
    /// Label of the leading row when it was annualized from fewer than four
    /// quarters, e.g. "Partial (2 of 4 quarters)".
    #[serde(default)]
    pub partial_ttm_label: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpvValuation {
    pub normalized: NormalizedEarnings,
    pub conservative: EpvScenario,
    pub base_case: EpvScenario,
    pub range: ValueRange,
    pub conservative_upside: Option<f64>,
    pub base_case_upside: Option<f64>,
    pub margin_of_safety: Option<f64>,
    pub confidence: f64,
    pub narrative: String,
    pub limitations: Vec<String>,
    pub assumptions: BTreeMap<String, String>,
}

/// Step 1: average operating income over the periods that report it (negative
/// periods included) and tax it. A non-positive average means no valuable
/// operating base, so NOPAT is floored at zero.
pub fn normalize_earnings(periods: &[FinancialPeriod]) -> NormalizedEarnings {
    let values: Vec<f64> = periods
        .iter()
        .take(MAX_EPV_PERIODS)
        .filter_map(|p| finite_opt(p.operating_income))
        .collect();

    let average = mean(&values);
    let nopat = if average > 0.0 {
        average * (1.0 - EPV_TAX_RATE)
    } else {
        0.0
    };

    NormalizedEarnings {
        average_operating_income: average,
        nopat,
        tax_rate: EPV_TAX_RATE,
        periods_used: values.len(),
        has_negative_periods: values.iter().any(|v| *v < 0.0),
    }
}

/// Without a price there is nothing to compare against, so a valued scenario
/// reads as fairly valued and carries no upside.
pub(crate) fn price_assessment(price: Option<f64>, per_share: f64) -> Assessment {
    match price {
        _ if !per_share.is_finite() || per_share <= 0.0 => Assessment::UnableToValue,
        Some(p) => Assessment::from_price(p, per_share),
        None => Assessment::FairlyValued,
    }
}

/// Step 2 for one growth assumption.
#[allow(clippy::too_many_arguments)]
pub fn compute_scenario(
    name: &str,
    nopat: f64,
    growth_rate: f64,
    wacc: f64,
    total_debt: f64,
    non_operating_cash: f64,
    diluted_shares: Option<f64>,
    current_price: Option<f64>,
) -> EpvScenario {
    let unable = || EpvScenario {
        name: name.to_string(),
        growth_rate,
        nopat,
        epv: 0.0,
        equity_value: 0.0,
        intrinsic_value_per_share: 0.0,
        assessment: Assessment::UnableToValue,
    };

    if wacc - growth_rate <= 0.0 {
        return unable();
    }

    let epv = if growth_rate > 0.0 {
        nopat / (wacc - growth_rate)
    } else {
        nopat / wacc
    };
    let equity_value = epv - total_debt + non_operating_cash;
    // A missing share count degrades to 1 so the calculation still completes
    let shares = finite_opt(diluted_shares).filter(|s| *s > 0.0).unwrap_or(1.0);

    let (epv, equity_value, per_share) = match (
        finite(epv),
        finite(equity_value),
        finite(equity_value / shares),
    ) {
        (Some(e), Some(eq), Some(ps)) => (e, eq, ps),
        _ => return unable(),
    };

    EpvScenario {
        name: name.to_string(),
        growth_rate,
        nopat,
        epv,
        equity_value,
        intrinsic_value_per_share: per_share,
        assessment: price_assessment(current_price, per_share),
    }
}

/// Step 3: confidence from data depth and the growth estimate's own confidence.
pub fn epv_confidence(periods_used: usize, growth_confidence: GrowthConfidence) -> f64 {
    let mut confidence: f64 = 0.6;
    confidence += match periods_used {
        n if n >= 4 => 0.2,
        3 => 0.1,
        2 => 0.0,
        _ => -0.1,
    };
    confidence += match growth_confidence {
        GrowthConfidence::High => 0.1,
        GrowthConfidence::Medium => 0.0,
        GrowthConfidence::Low => -0.1,
    };
    confidence.clamp(0.3, 0.9)
}

fn narrative(
    price: Option<f64>,
    conservative: &EpvScenario,
    base_case: &EpvScenario,
) -> String {
    let cons = conservative.intrinsic_value_per_share;
    let base = base_case.intrinsic_value_per_share;

    if conservative.assessment == Assessment::UnableToValue
        && base_case.assessment == Assessment::UnableToValue
        && (cons <= 0.0 && base <= 0.0)
    {
        return "Normalized operating earnings net of debt do not support a positive equity value, so earning power cannot be valued.".to_string();
    }

    let base_growth = base_case.growth_rate * 100.0;
    match price {
        None => format!(
            "Earning power supports ${:.2} per share with no growth and ${:.2} at {:.1}% growth; no current price is available for comparison.",
            cons, base, base_growth
        ),
        Some(p) if p < cons => format!(
            "At ${:.2} the shares trade below even the zero-growth EPV of ${:.2} (base case ${:.2} at {:.1}% growth), so the market price assumes earning power will shrink.",
            p, cons, base, base_growth
        ),
        Some(p) if p <= base => format!(
            "At ${:.2} the price sits between the zero-growth EPV of ${:.2} and the base case of ${:.2}, implying the market expects growth below {:.1}%.",
            p, cons, base, base_growth
        ),
        Some(p) => format!(
            "At ${:.2} the price exceeds the base-case EPV of ${:.2} ({:.1}% growth; ${:.2} with no growth), so the market is pricing in growth beyond what current earning power supports.",
            p, base, base_growth, cons
        ),
    }
}

fn limitations(normalized: &NormalizedEarnings, partial_ttm_label: Option<&str>) -> Vec<String> {
    let mut limits = vec![
        "EPV assumes current earning power persists indefinitely".to_string(),
        format!(
            "Uses a fixed {:.0}% cost of capital and {:.0}% tax rate rather than company-specific figures",
            WACC * 100.0,
            EPV_TAX_RATE * 100.0
        ),
        "Ignores value created by reinvestment beyond the capped growth rate".to_string(),
    ];

    if normalized.periods_used < MAX_EPV_PERIODS {
        limits.push(format!(
            "Only {} of {} periods reported operating income; normalization is less reliable",
            normalized.periods_used, MAX_EPV_PERIODS
        ));
    }
    if normalized.nopat <= 0.0 {
        limits.push(
            "Normalized NOPAT is not positive; the company is not generating a valuable operating base"
                .to_string(),
        );
    }
    if normalized.has_negative_periods {
        limits.push("One or more periods reported an operating loss".to_string());
    }
    if let Some(label) = partial_ttm_label {
        limits.push(format!(
            "Most recent period is annualized from a {} aggregate",
            label
        ));
    }
    limits
}

#[derive(Debug, Clone, Copy, Default)]
pub struct EpvEngine;

impl EpvEngine {
    pub fn new() -> Self {
        Self
    }

    pub fn value_epv(&self, input: &EpvInput) -> EpvValuation {
        let price = finite_opt(input.current_price).filter(|p| *p > 0.0);
        let total_debt = or_zero(input.total_debt);
        let cash = or_zero(input.non_operating_cash);

        // Step 1
        let normalized = normalize_earnings(&input.periods);

        // Step 2
        let market_growth = validate_growth_rate(clamp_growth_rate(input.growth.rate), WACC);
        let conservative = compute_scenario(
            CONSERVATIVE_SCENARIO,
            normalized.nopat,
            0.0,
            WACC,
            total_debt,
            cash,
            input.diluted_shares_outstanding,
            price,
        );
        let base_case = compute_scenario(
            BASE_CASE_SCENARIO,
            normalized.nopat,
            market_growth,
            WACC,
            total_debt,
            cash,
            input.diluted_shares_outstanding,
            price,
        );

        // Step 3
        let mut confidence = epv_confidence(normalized.periods_used, input.growth.confidence);
        if input.partial_ttm_label.is_some() {
            confidence = (confidence - PARTIAL_TTM_PENALTY).clamp(0.3, 0.9);
        }
        debug!(
            nopat = normalized.nopat,
            growth = market_growth,
            conservative = conservative.intrinsic_value_per_share,
            base_case = base_case.intrinsic_value_per_share,
            "EPV scenarios computed"
        );

        // Step 4
        let cons_value = conservative.intrinsic_value_per_share;
        let base_value = base_case.intrinsic_value_per_share;
        let low = cons_value.min(base_value);
        let high = cons_value.max(base_value);

        let upside = |value: f64| {
            if value > 0.0 {
                price.and_then(|p| pct_change(value, p))
            } else {
                None
            }
        };
        let margin_of_safety = match price {
            Some(p) if cons_value > 0.0 => finite((cons_value - p) / cons_value * 100.0),
            _ => None,
        };

        let mut assumptions = BTreeMap::new();
        assumptions.insert("wacc".to_string(), format!("{:.1}%", WACC * 100.0));
        assumptions.insert("tax_rate".to_string(), format!("{:.1}%", EPV_TAX_RATE * 100.0));
        assumptions.insert(
            "market_growth_rate".to_string(),
            format!("{:.2}%", market_growth * 100.0),
        );
        assumptions.insert(
            "growth_confidence".to_string(),
            input.growth.confidence.as_str().to_string(),
        );
        assumptions.insert(
            "normalized_nopat".to_string(),
            format!("{:.2}", normalized.nopat),
        );
        assumptions.insert(
            "periods_used".to_string(),
            normalized.periods_used.to_string(),
        );

        EpvValuation {
            narrative: narrative(price, &conservative, &base_case),
            limitations: limitations(&normalized, input.partial_ttm_label.as_deref()),
            conservative_upside: upside(cons_value),
            base_case_upside: upside(base_value),
            range: ValueRange {
                low,
                high,
                midpoint: (low + high) / 2.0,
            },
            margin_of_safety,
            confidence,
            assumptions,
            normalized,
            conservative,
            base_case,
        }
    }
}

impl EpvValuation {
    /// Collapse into the common method contract. The point estimate is the base
    /// case, or the conservative scenario when the base case cannot be valued.
    pub fn to_method_result(&self) -> ValuationMethodResult {
        let headline = if self.base_case.assessment != Assessment::UnableToValue {
            (&self.base_case, self.base_case_upside)
        } else {
            (&self.conservative, self.conservative_upside)
        };

        ValuationMethodResult {
            name: METHOD_NAME.to_string(),
            intrinsic_value: headline.0.intrinsic_value_per_share,
            upside: headline.1,
            assessment: headline.0.assessment,
            confidence: self.confidence,
            narrative: self.narrative.clone(),
            assumptions: self.assumptions.clone(),
            limitations: self.limitations.clone(),
            scenarios: Some(vec![self.conservative.clone(), self.base_case.clone()]),
        }
    }
}

impl ValuationMethod for EpvEngine {
    fn name(&self) -> &'static str {
        METHOD_NAME
    }

    fn value(&self, input: &ValuationInput) -> ValuationMethodResult {
        let epv_input = EpvInput {
            periods: input.periods.iter().take(MAX_EPV_PERIODS).cloned().collect(),
            current_price: input.current_price,
            total_debt: input.balance_sheet.total_debt,
            non_operating_cash: input.balance_sheet.cash,
            diluted_shares_outstanding: input.balance_sheet.diluted_shares_outstanding,
            growth: input.growth.clone(),
            partial_ttm_label: (input.ttm.is_partial() && input.ttm.data_points > 0)
                .then(|| input.ttm.period_label()),
        };
        self.value_epv(&epv_input).to_method_result()
    }
}
