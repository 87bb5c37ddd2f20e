use analysis_core::{BalanceSheet, FinancialPeriod, GrowthEstimate, TtmAggregate, ValuationMethodResult};
use serde::{Deserialize, Serialize};

/// Everything a valuation method may look at for one ticker.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValuationInput {
    pub ticker: String,
    /// Most recent TTM row first (annualized when partial), then prior fiscal
    /// years (newest first).
    pub periods: Vec<FinancialPeriod>,
    pub ttm: TtmAggregate,
    pub current_price: Option<f64>,
    pub balance_sheet: BalanceSheet,
    pub growth: GrowthEstimate,
}

/// A valuation approach producing a `ValuationMethodResult`.
///
/// Methods are deterministic: any external advice (growth) is already resolved
/// into the input.
pub trait ValuationMethod: Send + Sync {
    fn name(&self) -> &'static str;

    fn value(&self, input: &ValuationInput) -> ValuationMethodResult;
}
