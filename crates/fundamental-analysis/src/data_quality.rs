use analysis_core::numeric::finite_opt;
use analysis_core::RatioSnapshot;
use serde::{Deserialize, Serialize};

/// Suspicious values in a ratio snapshot. Raised flags become consensus warnings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataQualityFlags {
    pub high_leverage: bool,
    pub roic_missing: bool,
    pub interest_coverage_missing: bool,
    pub negative_earnings: bool,
    pub market_cap_missing: bool,
    pub abnormal_pb: bool,
    pub extreme_pe: bool,
    pub negative_roe: bool,
    pub abnormal_current_ratio: bool,
}

impl DataQualityFlags {
    pub fn from_ratios(ratios: &RatioSnapshot) -> Self {
        let pe = finite_opt(ratios.pe);
        let pb = finite_opt(ratios.pb);
        let zero_or_missing = |v: Option<f64>| finite_opt(v).map_or(true, |x| x == 0.0);

        Self {
            high_leverage: finite_opt(ratios.debt_to_equity).map_or(false, |d| d > 2.0),
            roic_missing: zero_or_missing(ratios.roic),
            interest_coverage_missing: zero_or_missing(ratios.interest_coverage),
            negative_earnings: pe.map_or(false, |p| p < 0.0),
            market_cap_missing: zero_or_missing(ratios.market_cap),
            abnormal_pb: pb.map_or(false, |p| !(0.0..=100.0).contains(&p)),
            extreme_pe: pe.map_or(false, |p| p > 200.0),
            negative_roe: finite_opt(ratios.roe).map_or(false, |r| r < 0.0),
            abnormal_current_ratio: finite_opt(ratios.current_ratio)
                .map_or(false, |c| !(0.5..=50.0).contains(&c)),
        }
    }

    pub fn any(&self) -> bool {
        !self.warnings().is_empty()
    }

    pub fn warnings(&self) -> Vec<String> {
        [
            (self.high_leverage, "Debt-to-equity above 2.0x; leverage is high"),
            (self.roic_missing, "ROIC unavailable or zero"),
            (
                self.interest_coverage_missing,
                "Interest coverage unavailable or zero",
            ),
            (
                self.negative_earnings,
                "Negative P/E; the company is currently unprofitable",
            ),
            (self.market_cap_missing, "Market capitalization unavailable"),
            (
                self.abnormal_pb,
                "Price-to-book outside 0-100; book value may be distorted",
            ),
            (self.extreme_pe, "P/E above 200; earnings are depressed or noisy"),
            (self.negative_roe, "Negative return on equity"),
            (
                self.abnormal_current_ratio,
                "Current ratio outside 0.5-50; liquidity data may be unreliable",
            ),
        ]
        .iter()
        .filter(|(raised, _)| *raised)
        .map(|(_, msg)| msg.to_string())
        .collect()
    }
}
