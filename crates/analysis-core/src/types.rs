use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// One reporting period (quarter, fiscal year, or a synthesized TTM row).
///
/// Amounts are in a consistent currency unit, typically millions. Every figure is
/// optional: the market-data feed regularly omits fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinancialPeriod {
    pub period_end: NaiveDate,
    #[serde(default)]
    pub revenue: Option<f64>,
    #[serde(default)]
    pub net_income: Option<f64>,
    #[serde(default)]
    pub operating_income: Option<f64>,
    #[serde(default)]
    pub operating_cash_flow: Option<f64>,
    /// Capital expenditures as a positive outflow.
    #[serde(default)]
    pub capital_expenditures: Option<f64>,
    #[serde(default)]
    pub gross_profit: Option<f64>,
}

impl FinancialPeriod {
    /// Period with no figures reported yet.
    pub fn empty(period_end: NaiveDate) -> Self {
        Self {
            period_end,
            revenue: None,
            net_income: None,
            operating_income: None,
            operating_cash_flow: None,
            capital_expenditures: None,
            gross_profit: None,
        }
    }
}

/// Point-in-time balance sheet items used by ROIC and EPV.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BalanceSheet {
    #[serde(default)]
    pub total_assets: Option<f64>,
    #[serde(default)]
    pub current_liabilities: Option<f64>,
    #[serde(default)]
    pub total_liabilities: Option<f64>,
    #[serde(default)]
    pub total_debt: Option<f64>,
    /// Cash and short-term investments not needed for operations.
    #[serde(default)]
    pub cash: Option<f64>,
    #[serde(default)]
    pub diluted_shares_outstanding: Option<f64>,
}

/// Per-share dividend and earnings figures for payout and dividend growth.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DividendData {
    #[serde(default)]
    pub dividend_per_share: Option<f64>,
    #[serde(default)]
    pub previous_dividend_per_share: Option<f64>,
    #[serde(default)]
    pub eps: Option<f64>,
}

/// Ratio snapshot as supplied by the market-data collaborator.
///
/// Percent-denominated fields (`roe`, margins, yields, growth) use 0–100 scale.
/// `debt_to_equity`, `current_ratio` and `interest_coverage` are plain multiples.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RatioSnapshot {
    #[serde(default)]
    pub pe: Option<f64>,
    #[serde(default)]
    pub pb: Option<f64>,
    #[serde(default)]
    pub ps: Option<f64>,
    #[serde(default)]
    pub current_ratio: Option<f64>,
    #[serde(default)]
    pub debt_to_equity: Option<f64>,
    #[serde(default)]
    pub interest_coverage: Option<f64>,
    #[serde(default)]
    pub roe: Option<f64>,
    #[serde(default)]
    pub roic: Option<f64>,
    #[serde(default)]
    pub roa: Option<f64>,
    #[serde(default)]
    pub gross_margin: Option<f64>,
    #[serde(default)]
    pub operating_margin: Option<f64>,
    #[serde(default)]
    pub net_margin: Option<f64>,
    #[serde(default)]
    pub dividend_yield: Option<f64>,
    #[serde(default)]
    pub payout_ratio: Option<f64>,
    #[serde(default)]
    pub revenue_growth: Option<f64>,
    #[serde(default)]
    pub earnings_growth: Option<f64>,
    #[serde(default)]
    pub market_cap: Option<f64>,
}

/// Trailing-twelve-month aggregate built from up to four quarters.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TtmAggregate {
    pub revenue: f64,
    pub net_income: f64,
    pub operating_income: f64,
    pub operating_cash_flow: f64,
    pub capital_expenditures: f64,
    pub gross_profit: f64,
    pub free_cash_flow: f64,
    /// Quarters actually summed (0–4).
    pub data_points: u8,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

impl TtmAggregate {
    /// Fewer than four quarters were available, so this is not a true TTM.
    pub fn is_partial(&self) -> bool {
        self.data_points < 4
    }

    pub fn period_label(&self) -> String {
        if self.is_partial() {
            format!("Partial ({} of 4 quarters)", self.data_points)
        } else {
            "TTM".to_string()
        }
    }

    /// Multiplier that scales a partial sum up to a full year; `None` when no
    /// quarter was summed.
    pub fn annualization_factor(&self) -> Option<f64> {
        match self.data_points {
            0 => None,
            n => Some(4.0 / f64::from(n.min(4))),
        }
    }

    /// The aggregate as a full-year period row, scaling a partial sum by
    /// `annualization_factor`.
    pub fn annualized_period(&self) -> Option<FinancialPeriod> {
        let factor = self.annualization_factor()?;
        self.as_period().map(|p| p.scaled(factor))
    }

    /// The aggregate as a period row, for feeding the valuation engines.
    pub fn as_period(&self) -> Option<FinancialPeriod> {
        let end = self.end_date?;
        Some(FinancialPeriod {
            period_end: end,
            revenue: Some(self.revenue),
            net_income: Some(self.net_income),
            operating_income: Some(self.operating_income),
            operating_cash_flow: Some(self.operating_cash_flow),
            capital_expenditures: Some(self.capital_expenditures),
            gross_profit: Some(self.gross_profit),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfidenceTier {
    High,
    Medium,
    Low,
}

/// Advisory metadata on how well the TTM quarters line up with the calendar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TtmConfidence {
    pub tier: ConfidenceTier,
    pub quarters_found: Vec<String>,
    pub quarters_missing: Vec<String>,
    pub reason: String,
}

/// Multi-period normalized operating earnings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedEarnings {
    pub average_operating_income: f64,
    pub nopat: f64,
    pub tax_rate: f64,
    pub periods_used: usize,
    pub has_negative_periods: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GrowthConfidence {
    High,
    Medium,
    Low,
}

impl GrowthConfidence {
    pub fn as_str(&self) -> &'static str {
        match self {
            GrowthConfidence::High => "high",
            GrowthConfidence::Medium => "medium",
            GrowthConfidence::Low => "low",
        }
    }
}

impl FromStr for GrowthConfidence {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "high" => Ok(GrowthConfidence::High),
            "medium" => Ok(GrowthConfidence::Medium),
            "low" => Ok(GrowthConfidence::Low),
            other => Err(format!("Unknown growth confidence: {}", other)),
        }
    }
}

/// Long-term growth estimate for a company.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GrowthEstimate {
    /// Decimal rate, e.g. 0.04 for 4%.
    pub rate: f64,
    pub confidence: GrowthConfidence,
    pub sources: Vec<String>,
    pub reasoning: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub caveats: Option<Vec<String>>,
}

impl GrowthEstimate {
    pub fn new(rate: f64, confidence: GrowthConfidence, reasoning: impl Into<String>) -> Self {
        Self {
            rate,
            confidence,
            sources: Vec::new(),
            reasoning: reasoning.into(),
            caveats: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Assessment {
    Undervalued,
    FairlyValued,
    Overvalued,
    UnableToValue,
}

impl Assessment {
    /// Price vs. a per-share value with a ±10% fair band.
    pub fn from_price(price: f64, value: f64) -> Self {
        if !value.is_finite() || value <= 0.0 {
            Assessment::UnableToValue
        } else if price < value * 0.9 {
            Assessment::Undervalued
        } else if price > value * 1.1 {
            Assessment::Overvalued
        } else {
            Assessment::FairlyValued
        }
    }

    pub fn to_label(&self) -> &'static str {
        match self {
            Assessment::Undervalued => "undervalued",
            Assessment::FairlyValued => "fairly valued",
            Assessment::Overvalued => "overvalued",
            Assessment::UnableToValue => "unable to value",
        }
    }
}

/// One EPV growth scenario.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpvScenario {
    pub name: String,
    pub growth_rate: f64,
    pub nopat: f64,
    pub epv: f64,
    pub equity_value: f64,
    pub intrinsic_value_per_share: f64,
    pub assessment: Assessment,
}

/// Per-metric confidence (0.0 to 1.0).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricConfidence {
    pub roic: f64,
    pub payout_ratio: f64,
    pub dividend_growth: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DerivedMetricsResult {
    pub roic: Option<f64>,
    pub payout_ratio: Option<f64>,
    pub retention_ratio: Option<f64>,
    pub dividend_growth: Option<f64>,
    pub confidence: MetricConfidence,
    pub notes: Vec<String>,
}

/// Common result contract for every valuation method.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValuationMethodResult {
    pub name: String,
    pub intrinsic_value: f64,
    /// Percent upside vs. current price; `None` without a usable price.
    pub upside: Option<f64>,
    pub assessment: Assessment,
    pub confidence: f64, // 0.0 to 1.0
    pub narrative: String,
    pub assumptions: BTreeMap<String, String>,
    pub limitations: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scenarios: Option<Vec<EpvScenario>>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ValueRange {
    pub low: f64,
    pub high: f64,
    pub midpoint: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MethodAgreement {
    Strong,
    Moderate,
    Weak,
    Divergent,
}

impl MethodAgreement {
    /// Classify by relative spread `(high - low) / midpoint`.
    pub fn from_spread(spread: f64) -> Self {
        match spread {
            s if s < 0.10 => MethodAgreement::Strong,
            s if s < 0.25 => MethodAgreement::Moderate,
            s if s < 0.50 => MethodAgreement::Weak,
            _ => MethodAgreement::Divergent,
        }
    }
}

/// Pooled view across all valuation methods and scenarios.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsensusValuation {
    pub range: ValueRange,
    pub consensus_upside: Option<f64>,
    pub margin_of_safety: Option<f64>,
    pub method_agreement: MethodAgreement,
    pub overall_assessment: Assessment,
    /// 0 to 100
    pub confidence: f64,
    pub confidence_narrative: String,
    pub warnings: Vec<String>,
    pub methods_used: Vec<String>,
}

/// Closed set of investor archetypes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Persona {
    Buffett,
    Graham,
    Lynch,
    DividendIncome,
}

impl Persona {
    pub const ALL: [Persona; 4] = [
        Persona::Buffett,
        Persona::Graham,
        Persona::Lynch,
        Persona::DividendIncome,
    ];

    pub fn id(&self) -> &'static str {
        match self {
            Persona::Buffett => "buffett",
            Persona::Graham => "graham",
            Persona::Lynch => "lynch",
            Persona::DividendIncome => "dividend_income",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Persona::Buffett => "Warren Buffett (Quality Compounder)",
            Persona::Graham => "Benjamin Graham (Defensive Value)",
            Persona::Lynch => "Peter Lynch (Growth at a Reasonable Price)",
            Persona::DividendIncome => "Dividend Income",
        }
    }
}

impl fmt::Display for Persona {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for Persona {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "buffett" | "warren_buffett" => Ok(Persona::Buffett),
            "graham" | "benjamin_graham" => Ok(Persona::Graham),
            "lynch" | "peter_lynch" => Ok(Persona::Lynch),
            "dividend_income" | "dividend" | "income" => Ok(Persona::DividendIncome),
            other => Err(format!("Unknown persona: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CriterionStatus {
    Pass,
    Partial,
    Fail,
}

impl CriterionStatus {
    pub fn multiplier(&self) -> f64 {
        match self {
            CriterionStatus::Pass => 1.0,
            CriterionStatus::Partial => 0.5,
            CriterionStatus::Fail => 0.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersonaCriterionResult {
    pub name: String,
    pub weight: u8,
    pub status: CriterionStatus,
    pub metrics_used: Vec<String>,
    pub explanation: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Verdict {
    #[serde(rename = "Strong Fit")]
    StrongFit,
    #[serde(rename = "Fit")]
    Fit,
    #[serde(rename = "Borderline")]
    Borderline,
    #[serde(rename = "Not a Fit")]
    NotAFit,
    #[serde(rename = "Insufficient Data")]
    InsufficientData,
}

impl Verdict {
    pub fn from_score(score: u8) -> Self {
        match score {
            s if s >= 80 => Verdict::StrongFit,
            s if s >= 65 => Verdict::Fit,
            s if s >= 50 => Verdict::Borderline,
            _ => Verdict::NotAFit,
        }
    }

    pub fn to_label(&self) -> &'static str {
        match self {
            Verdict::StrongFit => "Strong Fit",
            Verdict::Fit => "Fit",
            Verdict::Borderline => "Borderline",
            Verdict::NotAFit => "Not a Fit",
            Verdict::InsufficientData => "Insufficient Data",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersonaScoreResult {
    pub persona: Persona,
    /// 0 to 100
    pub score: u8,
    pub verdict: Verdict,
    pub confidence: f64, // 0.0 to 1.0
    pub criteria: Vec<PersonaCriterionResult>,
    pub key_risks: Vec<String>,
    pub what_would_change_mind: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_assessment_bands() {
        assert_eq!(Assessment::from_price(80.0, 100.0), Assessment::Undervalued);
        assert_eq!(Assessment::from_price(95.0, 100.0), Assessment::FairlyValued);
        assert_eq!(Assessment::from_price(111.0, 100.0), Assessment::Overvalued);
        assert_eq!(Assessment::from_price(50.0, 0.0), Assessment::UnableToValue);
        assert_eq!(Assessment::from_price(50.0, -3.0), Assessment::UnableToValue);
    }

    #[test]
    fn test_method_agreement_bands() {
        assert_eq!(MethodAgreement::from_spread(0.05), MethodAgreement::Strong);
        assert_eq!(MethodAgreement::from_spread(0.10), MethodAgreement::Moderate);
        assert_eq!(MethodAgreement::from_spread(0.40), MethodAgreement::Weak);
        assert_eq!(MethodAgreement::from_spread(0.50), MethodAgreement::Divergent);
    }

    #[test]
    fn test_verdict_bands() {
        assert_eq!(Verdict::from_score(80), Verdict::StrongFit);
        assert_eq!(Verdict::from_score(79), Verdict::Fit);
        assert_eq!(Verdict::from_score(65), Verdict::Fit);
        assert_eq!(Verdict::from_score(50), Verdict::Borderline);
        assert_eq!(Verdict::from_score(49), Verdict::NotAFit);
    }

    #[test]
    fn test_serde_labels() {
        assert_eq!(
            serde_json::to_string(&Assessment::UnableToValue).unwrap(),
            "\"UNABLE_TO_VALUE\""
        );
        assert_eq!(
            serde_json::to_string(&Verdict::InsufficientData).unwrap(),
            "\"Insufficient Data\""
        );
        assert_eq!(
            serde_json::to_string(&GrowthConfidence::Medium).unwrap(),
            "\"medium\""
        );
    }

    #[test]
    fn test_persona_parsing() {
        assert_eq!("Warren-Buffett".parse::<Persona>(), Ok(Persona::Buffett));
        assert_eq!("dividend".parse::<Persona>(), Ok(Persona::DividendIncome));
        assert!("soros".parse::<Persona>().is_err());
    }

    #[test]
    fn test_partial_ttm_label() {
        let ttm = TtmAggregate {
            data_points: 3,
            ..Default::default()
        };
        assert!(ttm.is_partial());
        assert_eq!(ttm.period_label(), "Partial (3 of 4 quarters)");
        assert!(ttm.as_period().is_none());
    }

    #[test]
    fn test_partial_ttm_annualizes() {
        let ttm = TtmAggregate {
            operating_income: 25.0,
            free_cash_flow: 10.0,
            data_points: 1,
            end_date: NaiveDate::from_ymd_opt(2025, 6, 30),
            ..Default::default()
        };
        assert_eq!(ttm.annualization_factor(), Some(4.0));
        let row = ttm.annualized_period().unwrap();
        assert_eq!(row.operating_income, Some(100.0));
        assert_eq!(row.operating_cash_flow, Some(0.0));

        let full = TtmAggregate {
            operating_income: 100.0,
            data_points: 4,
            end_date: NaiveDate::from_ymd_opt(2025, 6, 30),
            ..Default::default()
        };
        assert_eq!(full.annualized_period(), full.as_period());
        assert_eq!(TtmAggregate::default().annualization_factor(), None);
    }
}
