use analysis_core::{
    BalanceSheet, ConsensusValuation, CurrencyInfo, DerivedMetricsResult, DividendData,
    FinancialPeriod, GrowthEstimate, Persona, PersonaScoreResult, RatioSnapshot, TtmAggregate,
    TtmConfidence, ValuationMethodResult,
};
use chrono::{DateTime, Utc};
use fundamental_analysis::{DataQualityFlags, EpvValuation};
use serde::{Deserialize, Serialize};

/// Everything the market-data collaborator knows about one company.
///
/// Amounts are in `reporting_currency`; the price is in USD. Every numeric field
/// may be absent.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CompanySnapshot {
    pub ticker: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub price: Option<f64>,
    #[serde(default)]
    pub quarterly: Vec<FinancialPeriod>,
    #[serde(default)]
    pub annual: Vec<FinancialPeriod>,
    #[serde(default)]
    pub balance_sheet: BalanceSheet,
    #[serde(default)]
    pub dividends: DividendData,
    #[serde(default)]
    pub ratios: RatioSnapshot,
    #[serde(default)]
    pub tax_rate: Option<f64>,
    /// Latest annual interest expense, for coverage when the feed omits it.
    #[serde(default)]
    pub interest_expense: Option<f64>,
    #[serde(default)]
    pub reporting_currency: Option<String>,
    /// Live FX quote (USD per unit of `reporting_currency`).
    #[serde(default)]
    pub fx_rate: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompanyAnalysis {
    pub ticker: String,
    pub name: Option<String>,
    pub currency: CurrencyInfo,
    pub ttm: TtmAggregate,
    pub ttm_confidence: TtmConfidence,
    pub derived_metrics: DerivedMetricsResult,
    /// Ratio snapshot after filling gaps from derived metrics.
    pub ratios: RatioSnapshot,
    pub growth: GrowthEstimate,
    pub epv: EpvValuation,
    pub valuations: Vec<ValuationMethodResult>,
    pub consensus: ConsensusValuation,
    pub data_quality: DataQualityFlags,
    pub persona_scores: Vec<PersonaScoreResult>,
    pub analyzed_at: DateTime<Utc>,
}

impl CompanyAnalysis {
    pub fn persona_score(&self, persona: Persona) -> Option<&PersonaScoreResult> {
        self.persona_scores.iter().find(|s| s.persona == persona)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_snapshot_json_loads() {
        let json = r#"{
            "ticker": "SONY",
            "reporting_currency": "JPY",
            "annual": [{"period_end": "2024-03-31", "operating_income": 1200000.0}],
            "dividends": {"dividend_per_share": 0.6}
        }"#;
        let snapshot: CompanySnapshot = serde_json::from_str(json).unwrap();
        assert_eq!(snapshot.ticker, "SONY");
        assert!(snapshot.quarterly.is_empty());
        assert_eq!(snapshot.annual[0].revenue, None);
        assert_eq!(snapshot.balance_sheet, BalanceSheet::default());
        assert_eq!(snapshot.dividends.dividend_per_share, Some(0.6));
        assert_eq!(snapshot.fx_rate, None);
    }

    #[test]
    fn test_missing_ticker_is_rejected() {
        assert!(serde_json::from_str::<CompanySnapshot>(r#"{"price": 10.0}"#).is_err());
    }
}
