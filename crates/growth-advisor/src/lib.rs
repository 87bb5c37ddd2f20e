pub mod advisor;
pub mod client;
pub mod config;
pub mod error;
pub mod parse;

pub use advisor::{build_prompt, fallback_estimate, FixedGrowthEstimator, GrowthRateAdvisor};
pub use analysis_core::{clamp_growth_rate, validate_growth_rate};
pub use client::{HttpTextGenerator, TextGenerator};
pub use config::AdvisorConfig;
pub use error::{AdvisorError, AdvisorResult};
pub use parse::{extract_json_object, parse_growth_response, validate_estimate};

use analysis_core::GrowthEstimator;
use std::sync::Arc;
use tracing::{info, warn};

/// The HTTP-backed advisor when credentials are configured, otherwise the
/// conservative fixed estimator.
pub fn estimator_from_config(config: AdvisorConfig) -> Arc<dyn GrowthEstimator> {
    if !config.is_configured() {
        info!("LLM_API_KEY not set; using conservative growth default");
        return Arc::new(FixedGrowthEstimator::conservative());
    }

    let model = config.model.clone();
    match GrowthRateAdvisor::from_config(config) {
        Ok(advisor) => {
            info!(model = %model, "Growth advisor using text-generation backend");
            Arc::new(advisor)
        }
        Err(e) => {
            warn!(error = %e, "Failed to build text-generation client; using conservative growth default");
            Arc::new(FixedGrowthEstimator::conservative())
        }
    }
}
