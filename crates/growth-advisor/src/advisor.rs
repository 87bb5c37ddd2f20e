use std::time::Duration;

use analysis_core::{GrowthConfidence, GrowthEstimate, GrowthEstimator, DEFAULT_GROWTH_RATE};
use async_trait::async_trait;
use tracing::{debug, warn};

use crate::client::{HttpTextGenerator, TextGenerator};
use crate::config::AdvisorConfig;
use crate::error::{AdvisorError, AdvisorResult};
use crate::parse::parse_growth_response;

const SYSTEM_PROMPT: &str = "You are an equity analyst estimating sustainable long-term growth \
rates for public companies. Answer with a single JSON object and nothing else.";

/// Conservative estimate used whenever the backend cannot be reached or understood.
pub fn fallback_estimate(reason: &str) -> GrowthEstimate {
    GrowthEstimate {
        rate: DEFAULT_GROWTH_RATE,
        confidence: GrowthConfidence::Low,
        sources: vec!["Conservative default".to_string()],
        reasoning: "Long-term growth could not be estimated; using a conservative 3% default"
            .to_string(),
        caveats: Some(vec![format!("Growth estimate unavailable: {}", reason)]),
    }
}

pub fn build_prompt(ticker: &str, company_description: &str) -> String {
    format!(
        "Estimate the sustainable long-term (10+ year) annual growth rate of earnings for {ticker}.\n\
         Company description: {description}\n\n\
         Respond with JSON of the form:\n\
         {{\"growthRate\": <percent, e.g. 2.5>, \"confidence\": \"high\" | \"medium\" | \"low\", \
         \"sources\": [<strings>], \"reasoning\": <string>, \"caveats\": [<strings>]}}\n\
         Long-run growth above nominal GDP (about 4%) is not sustainable.",
        ticker = ticker,
        description = if company_description.trim().is_empty() {
            "not provided"
        } else {
            company_description.trim()
        },
    )
}

/// Wraps a `TextGenerator` with prompt construction, timeout, parsing and
/// validation. Never fails: every error becomes `fallback_estimate`.
pub struct GrowthRateAdvisor<G: TextGenerator> {
    generator: G,
    timeout: Duration,
}

impl<G: TextGenerator> GrowthRateAdvisor<G> {
    pub fn new(generator: G, timeout: Duration) -> Self {
        Self { generator, timeout }
    }

    async fn request_estimate(
        &self,
        ticker: &str,
        company_description: &str,
    ) -> AdvisorResult<GrowthEstimate> {
        let prompt = build_prompt(ticker, company_description);
        let reply = tokio::time::timeout(
            self.timeout,
            self.generator.generate(SYSTEM_PROMPT, &prompt),
        )
        .await
        .map_err(|_| AdvisorError::Timeout(self.timeout))??;

        parse_growth_response(&reply)
    }
}

impl GrowthRateAdvisor<HttpTextGenerator> {
    pub fn from_config(config: AdvisorConfig) -> AdvisorResult<Self> {
        let timeout = config.timeout;
        Ok(Self::new(HttpTextGenerator::new(config)?, timeout))
    }
}

#[async_trait]
impl<G: TextGenerator> GrowthEstimator for GrowthRateAdvisor<G> {
    async fn estimate_growth(&self, ticker: &str, company_description: &str) -> GrowthEstimate {
        match self.request_estimate(ticker, company_description).await {
            Ok(estimate) => {
                debug!(
                    ticker,
                    rate = estimate.rate,
                    confidence = estimate.confidence.as_str(),
                    backend = self.generator.backend_name(),
                    "Growth estimate received"
                );
                estimate
            }
            Err(e) => {
                warn!(ticker, error = %e, "Growth estimate failed, using conservative default");
                fallback_estimate(&e.to_string())
            }
        }
    }
}

/// Returns the same estimate for every company.
#[derive(Debug, Clone)]
pub struct FixedGrowthEstimator {
    estimate: GrowthEstimate,
}

impl FixedGrowthEstimator {
    pub fn new(estimate: GrowthEstimate) -> Self {
        Self { estimate }
    }

    /// The conservative default, for running without a text-generation backend.
    pub fn conservative() -> Self {
        Self::new(fallback_estimate("no text-generation backend configured"))
    }
}

#[async_trait]
impl GrowthEstimator for FixedGrowthEstimator {
    async fn estimate_growth(&self, _ticker: &str, _company_description: &str) -> GrowthEstimate {
        self.estimate.clone()
    }
}
