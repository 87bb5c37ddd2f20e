use super::{AnalysisOrchestrator, CompanyAnalysis, CompanySnapshot};
use analysis_core::{AnalysisError, Assessment, Persona, Verdict};
use persona_scoring::ScoringConfig;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScreenedCompany {
    pub ticker: String,
    pub name: Option<String>,
    pub persona: Persona,
    pub score: u8,
    pub verdict: Verdict,
    pub confidence: f64,
    pub overall_assessment: Assessment,
    pub consensus_upside: Option<f64>,
    pub key_highlights: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScreenerResult {
    pub persona: Persona,
    pub min_score: u8,
    pub matches: Vec<ScreenedCompany>,
    pub total_analyzed: usize,
    pub total_qualified: usize,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

/// Finds the companies that fit one investor persona.
pub struct PersonaScreener {
    orchestrator: Arc<AnalysisOrchestrator>,
    config: ScoringConfig,
}

impl PersonaScreener {
    pub fn new(orchestrator: Arc<AnalysisOrchestrator>, config: ScoringConfig) -> Self {
        Self {
            orchestrator,
            config,
        }
    }

    pub async fn screen(
        &self,
        snapshots: Vec<CompanySnapshot>,
        persona: Persona,
        limit: usize,
        concurrency: usize,
    ) -> Result<ScreenerResult, anyhow::Error> {
        let total_analyzed = snapshots.len();
        let min_score = self.config.min_score(persona);

        tracing::info!(
            "Screening {} companies for {} (min score {}, concurrency {})",
            total_analyzed,
            persona.display_name(),
            min_score,
            concurrency
        );

        let semaphore = Arc::new(Semaphore::new(concurrency.max(1)));
        let mut tasks = JoinSet::new();

        for snapshot in snapshots {
            let orchestrator = Arc::clone(&self.orchestrator);
            let semaphore = Arc::clone(&semaphore);
            tasks.spawn(async move {
                let result = match semaphore.acquire().await {
                    Ok(_permit) => orchestrator.analyze(&snapshot).await,
                    Err(e) => Err(AnalysisError::TaskFailed(e.to_string())),
                };
                (snapshot.ticker, result)
            });
        }

        let mut matches = Vec::new();

        while let Some(result) = tasks.join_next().await {
            match result {
                Ok((_ticker, Ok(analysis))) => {
                    if let Some(screened) = self.qualify(&analysis, persona) {
                        matches.push(screened);
                    }
                }
                Ok((ticker, Err(e))) => {
                    tracing::warn!("Failed to analyze {}: {}", ticker, e);
                }
                Err(e) => {
                    tracing::error!("Task error: {}", e);
                }
            }
        }

        let total_qualified = matches.len();

        // Highest score first; ties by ticker for a stable order
        matches.sort_by(|a, b| b.score.cmp(&a.score).then_with(|| a.ticker.cmp(&b.ticker)));
        matches.truncate(limit);

        tracing::info!(
            "Screen complete: {}/{} companies qualified for {}, returning top {}",
            total_qualified,
            total_analyzed,
            persona.id(),
            matches.len()
        );

        Ok(ScreenerResult {
            persona,
            min_score,
            matches,
            total_analyzed,
            total_qualified,
            timestamp: chrono::Utc::now(),
        })
    }

    fn qualify(&self, analysis: &CompanyAnalysis, persona: Persona) -> Option<ScreenedCompany> {
        let score = analysis.persona_score(persona)?;
        if !self.config.qualifies(score) {
            return None;
        }

        let key_highlights = score
            .criteria
            .iter()
            .filter(|c| c.status == analysis_core::CriterionStatus::Pass)
            .map(|c| c.explanation.clone())
            .collect();

        Some(ScreenedCompany {
            ticker: analysis.ticker.clone(),
            name: analysis.name.clone(),
            persona,
            score: score.score,
            verdict: score.verdict,
            confidence: score.confidence,
            overall_assessment: analysis.consensus.overall_assessment,
            consensus_upside: analysis.consensus.consensus_upside,
            key_highlights,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use analysis_core::{GrowthConfidence, GrowthEstimate, GrowthEstimator, RatioSnapshot};
    use growth_advisor::FixedGrowthEstimator;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn company(ticker: &str, pe: f64, pb: f64, current_ratio: f64) -> CompanySnapshot {
        CompanySnapshot {
            ticker: ticker.to_string(),
            ratios: RatioSnapshot {
                pe: Some(pe),
                pb: Some(pb),
                current_ratio: Some(current_ratio),
                debt_to_equity: Some(0.3),
                dividend_yield: Some(2.5),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    fn screener(config: ScoringConfig) -> PersonaScreener {
        let orchestrator = AnalysisOrchestrator::new(Arc::new(FixedGrowthEstimator::new(
            GrowthEstimate::new(0.03, GrowthConfidence::Medium, "preset"),
        )));
        PersonaScreener::new(Arc::new(orchestrator), config)
    }

    #[tokio::test]
    async fn test_graham_screen_ranks_and_filters() {
        let snapshots = vec![
            // all six criteria pass → 100
            company("DEEP", 10.0, 1.0, 2.5),
            // P/E partial, P/B partial, product 36 fail, CR partial → 53
            company("MID", 18.0, 2.0, 1.6),
            // expensive on every multiple → 20
            company("RICH", 40.0, 8.0, 1.0),
            // empty ticker is a structural error and is skipped
            company("", 10.0, 1.0, 2.5),
        ];

        let result = screener(ScoringConfig::default())
            .screen(snapshots, Persona::Graham, 10, 4)
            .await
            .unwrap();

        assert_eq!(result.total_analyzed, 4);
        assert_eq!(result.min_score, 60);
        assert_eq!(result.total_qualified, 1);
        assert_eq!(result.matches[0].ticker, "DEEP");
        assert_eq!(result.matches[0].score, 100);
        assert_eq!(result.matches[0].key_highlights.len(), 6);
    }

    /// Counts how many growth lookups are in flight at once.
    struct CountingEstimator {
        in_flight: AtomicUsize,
        peak: AtomicUsize,
    }

    #[async_trait::async_trait]
    impl GrowthEstimator for CountingEstimator {
        async fn estimate_growth(&self, _ticker: &str, _description: &str) -> GrowthEstimate {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(20)).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            GrowthEstimate::new(0.03, GrowthConfidence::Medium, "counted")
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_screen_respects_concurrency() {
        let estimator = Arc::new(CountingEstimator {
            in_flight: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        });
        let orchestrator = AnalysisOrchestrator::new(estimator.clone());
        let screener = PersonaScreener::new(Arc::new(orchestrator), ScoringConfig::default());

        let snapshots = (0..12)
            .map(|i| company(&format!("T{:02}", i), 10.0, 1.0, 2.5))
            .collect();
        let result = screener
            .screen(snapshots, Persona::Graham, 20, 3)
            .await
            .unwrap();

        assert_eq!(result.total_qualified, 12);
        let peak = estimator.peak.load(Ordering::SeqCst);
        assert!((1..=3).contains(&peak), "peak in-flight lookups was {}", peak);
    }

    #[tokio::test]
    async fn test_threshold_comes_from_config() {
        let snapshots = vec![company("DEEP", 10.0, 1.0, 2.5), company("MID", 18.0, 2.0, 1.6)];
        let config = ScoringConfig::default().with_min_score(Persona::Graham, 50);

        let result = screener(config)
            .screen(snapshots, Persona::Graham, 1, 4)
            .await
            .unwrap();

        assert_eq!(result.total_qualified, 2);
        assert_eq!(result.matches.len(), 1);
        assert_eq!(result.matches[0].ticker, "DEEP");
    }
}
