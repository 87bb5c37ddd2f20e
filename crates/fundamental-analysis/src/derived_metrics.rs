//! Secondary metrics computed from a single period's figures.
//!
//! Each calculation returns a nullable value with a 0-1 confidence and notes on
//! data quality. Missing inputs produce `None`, extreme-but-valid values are kept
//! with a confidence penalty, and nothing here ever fails.

use analysis_core::numeric::{finite, finite_opt};
use analysis_core::{DerivedMetricsResult, MetricConfidence};
use serde::{Deserialize, Serialize};

pub const DEFAULT_TAX_RATE: f64 = 0.15;

const ROIC_BASE_CONFIDENCE: f64 = 0.9;
const ROIC_PROXY_CONFIDENCE_CAP: f64 = 0.6;
const EXTREME_PENALTY: f64 = 0.3;
const CONFIDENCE_FLOOR: f64 = 0.3;

const PAYOUT_BASE_CONFIDENCE: f64 = 0.9;
const NO_DIVIDEND_CONFIDENCE: f64 = 0.95;
const PAYOUT_OVER_100_CONFIDENCE: f64 = 0.7;

const DIVIDEND_GROWTH_BASE_CONFIDENCE: f64 = 0.85;
const DIVIDEND_GROWTH_EXTREME_CONFIDENCE: f64 = 0.6;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricResult {
    pub value: Option<f64>,
    pub confidence: f64,
    pub notes: Vec<String>,
}

impl MetricResult {
    fn unavailable(note: impl Into<String>) -> Self {
        Self {
            value: None,
            confidence: 0.0,
            notes: vec![note.into()],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PayoutResult {
    pub payout_ratio: Option<f64>,
    pub retention_ratio: Option<f64>,
    pub confidence: f64,
    pub notes: Vec<String>,
}

impl PayoutResult {
    fn unavailable(note: impl Into<String>) -> Self {
        Self {
            payout_ratio: None,
            retention_ratio: None,
            confidence: 0.0,
            notes: vec![note.into()],
        }
    }
}

/// Inputs for one period's derived metrics.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DerivedMetricsInput {
    pub operating_income: Option<f64>,
    pub total_assets: Option<f64>,
    pub current_liabilities: Option<f64>,
    pub tax_rate: Option<f64>,
    pub dividend_per_share: Option<f64>,
    pub previous_dividend_per_share: Option<f64>,
    pub eps: Option<f64>,
}

/// ROIC (%) = operating income × (1 − tax) / (total assets − current liabilities) × 100
pub fn calculate_roic(
    operating_income: Option<f64>,
    total_assets: Option<f64>,
    current_liabilities: Option<f64>,
    tax_rate: f64,
) -> MetricResult {
    let operating_income = match finite_opt(operating_income) {
        Some(oi) if oi != 0.0 => oi,
        _ => return MetricResult::unavailable("ROIC unavailable: no operating income reported"),
    };
    let total_assets = match finite_opt(total_assets) {
        Some(ta) if ta != 0.0 => ta,
        _ => return MetricResult::unavailable("ROIC unavailable: no total assets reported"),
    };

    let mut notes = Vec::new();
    let mut confidence = ROIC_BASE_CONFIDENCE;

    let tax_rate = if tax_rate.is_finite() && (0.0..1.0).contains(&tax_rate) {
        tax_rate
    } else {
        notes.push(format!(
            "Invalid tax rate {}; using {:.0}%",
            tax_rate,
            DEFAULT_TAX_RATE * 100.0
        ));
        DEFAULT_TAX_RATE
    };

    let current_liabilities = match finite_opt(current_liabilities) {
        Some(cl) => cl,
        None => {
            notes.push(
                "Current liabilities missing; assumed 50% of total assets as a conservative proxy"
                    .to_string(),
            );
            confidence = confidence.min(ROIC_PROXY_CONFIDENCE_CAP);
            total_assets * 0.5
        }
    };

    let invested_capital = total_assets - current_liabilities;
    if invested_capital <= 0.0 {
        return MetricResult::unavailable(format!(
            "ROIC unavailable: invested capital is non-positive ({:.2})",
            invested_capital
        ));
    }

    let nopat = operating_income * (1.0 - tax_rate);
    let roic = match finite(nopat / invested_capital * 100.0) {
        Some(r) => r,
        None => return MetricResult::unavailable("ROIC unavailable: calculation produced a non-finite value"),
    };

    if !(-100.0..=500.0).contains(&roic) {
        notes.push(format!(
            "ROIC of {:.1}% is an extreme value; verify the underlying balance sheet",
            roic
        ));
        confidence = (confidence - EXTREME_PENALTY).max(CONFIDENCE_FLOOR);
    }

    MetricResult {
        value: Some(roic),
        confidence,
        notes,
    }
}

/// Payout (%) = DPS / EPS × 100, retention = 100 − payout.
pub fn calculate_payout_ratio(dividend_per_share: Option<f64>, eps: Option<f64>) -> PayoutResult {
    let dps = match finite_opt(dividend_per_share) {
        Some(d) => d,
        None => return PayoutResult::unavailable("Payout ratio unavailable: no dividend data"),
    };
    if dps < 0.0 {
        return PayoutResult::unavailable(format!(
            "Payout ratio unavailable: negative dividend per share ({:.2})",
            dps
        ));
    }
    if dps == 0.0 {
        return PayoutResult {
            payout_ratio: Some(0.0),
            retention_ratio: Some(100.0),
            confidence: NO_DIVIDEND_CONFIDENCE,
            notes: vec!["Company pays no dividend; all earnings retained".to_string()],
        };
    }

    let eps = match finite_opt(eps) {
        Some(e) if e > 0.0 => e,
        Some(e) => {
            return PayoutResult::unavailable(format!(
                "Payout ratio undefined for non-positive EPS ({:.2})",
                e
            ))
        }
        None => return PayoutResult::unavailable("Payout ratio unavailable: no EPS reported"),
    };

    let payout = match finite(dps / eps * 100.0) {
        Some(p) => p,
        None => return PayoutResult::unavailable("Payout ratio unavailable: calculation produced a non-finite value"),
    };

    let mut notes = Vec::new();
    let mut confidence = PAYOUT_BASE_CONFIDENCE;
    if payout > 100.0 {
        notes.push(format!(
            "Payout ratio of {:.1}% exceeds 100% of earnings; dividend may be unsustainable",
            payout
        ));
        confidence = PAYOUT_OVER_100_CONFIDENCE;
    }

    PayoutResult {
        payout_ratio: Some(payout),
        retention_ratio: Some(100.0 - payout),
        confidence,
        notes,
    }
}

/// Dividend growth (%) = (current − previous) / previous × 100
pub fn calculate_dividend_growth(current_dps: Option<f64>, previous_dps: Option<f64>) -> MetricResult {
    let (current, previous) = match (finite_opt(current_dps), finite_opt(previous_dps)) {
        (Some(c), Some(p)) => (c, p),
        _ => return MetricResult::unavailable("Dividend growth unavailable: need current and prior dividend"),
    };
    if current < 0.0 || previous < 0.0 {
        return MetricResult::unavailable("Dividend growth unavailable: negative dividend reported");
    }
    if previous == 0.0 {
        return MetricResult::unavailable("Dividend growth undefined: no prior dividend");
    }

    let growth = match finite((current - previous) / previous * 100.0) {
        Some(g) => g,
        None => return MetricResult::unavailable("Dividend growth unavailable: calculation produced a non-finite value"),
    };

    let mut notes = Vec::new();
    let mut confidence = DIVIDEND_GROWTH_BASE_CONFIDENCE;
    if growth.abs() > 500.0 {
        notes.push(format!(
            "Dividend growth of {:.1}% is extreme; likely a special dividend or data error",
            growth
        ));
        confidence = DIVIDEND_GROWTH_EXTREME_CONFIDENCE;
    }

    MetricResult {
        value: Some(growth),
        confidence,
        notes,
    }
}

/// Interest coverage (×) = EBIT / |interest expense|
pub fn calculate_interest_coverage(ebit: Option<f64>, interest_expense: Option<f64>) -> MetricResult {
    let (ebit, expense) = match (finite_opt(ebit), finite_opt(interest_expense)) {
        (Some(e), Some(i)) if i != 0.0 => (e, i.abs()),
        _ => return MetricResult::unavailable("Interest coverage unavailable: no interest expense reported"),
    };
    MetricResult {
        value: finite(ebit / expense),
        confidence: 0.85,
        notes: Vec::new(),
    }
}

/// Run ROIC, payout and dividend growth for one period.
pub fn calculate_derived_metrics(input: &DerivedMetricsInput) -> DerivedMetricsResult {
    let roic = calculate_roic(
        input.operating_income,
        input.total_assets,
        input.current_liabilities,
        input.tax_rate.unwrap_or(DEFAULT_TAX_RATE),
    );
    let payout = calculate_payout_ratio(input.dividend_per_share, input.eps);
    let growth = calculate_dividend_growth(input.dividend_per_share, input.previous_dividend_per_share);

    let mut notes = roic.notes;
    notes.extend(payout.notes);
    notes.extend(growth.notes);

    DerivedMetricsResult {
        roic: roic.value,
        payout_ratio: payout.payout_ratio,
        retention_ratio: payout.retention_ratio,
        dividend_growth: growth.value,
        confidence: MetricConfidence {
            roic: roic.confidence,
            payout_ratio: payout.confidence,
            dividend_growth: growth.confidence,
        },
        notes,
    }
}
