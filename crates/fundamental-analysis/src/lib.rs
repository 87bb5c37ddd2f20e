//! Deterministic fundamental valuation: TTM normalization, derived metrics,
//! Earning Power Value, DCF-lite and the cross-method consensus.

pub mod consensus;
pub mod data_quality;
pub mod dcf;
pub mod derived_metrics;
pub mod epv;
pub mod method;
pub mod ttm;

pub use consensus::{build_consensus, ValuationConsensusAggregator};
pub use data_quality::DataQualityFlags;
pub use dcf::DcfLiteMethod;
pub use derived_metrics::{
    calculate_derived_metrics, calculate_dividend_growth, calculate_interest_coverage,
    calculate_payout_ratio, calculate_roic, DerivedMetricsInput, MetricResult, PayoutResult,
};
pub use epv::{EpvEngine, EpvInput, EpvValuation, WACC};
pub use method::{ValuationInput, ValuationMethod};
pub use ttm::{calculate_ttm, calculate_ttm_at, ttm_confidence};
