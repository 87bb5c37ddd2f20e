use async_trait::async_trait;
use crate::GrowthEstimate;

/// Source of long-term growth estimates.
///
/// Implementations must not fail: on any upstream problem they return a
/// documented fallback estimate instead.
#[async_trait]
pub trait GrowthEstimator: Send + Sync {
    async fn estimate_growth(&self, ticker: &str, company_description: &str) -> GrowthEstimate;
}
