use analysis_core::{currency_info, AnalysisError, AnalysisResult, FinancialPeriod, GrowthEstimator};
use chrono::{NaiveDate, Utc};
use fundamental_analysis::derived_metrics::calculate_interest_coverage;
use fundamental_analysis::epv::MAX_EPV_PERIODS;
use fundamental_analysis::{
    build_consensus, calculate_derived_metrics, calculate_ttm_at, ttm_confidence,
    DataQualityFlags, DcfLiteMethod, DerivedMetricsInput, EpvEngine, EpvInput,
    ValuationConsensusAggregator, ValuationInput,
};
use persona_scoring::score_all;
use std::sync::Arc;
use tokio::sync::Semaphore;

pub mod screener;
pub mod snapshot;

pub use screener::{PersonaScreener, ScreenedCompany, ScreenerResult};
pub use snapshot::{CompanyAnalysis, CompanySnapshot};

/// Max concurrent tickers in a batch
pub const DEFAULT_CONCURRENCY: usize = 8;

/// Runs the full valuation and persona pipeline for one company at a time.
///
/// Steps within one ticker are sequential; parallelism only happens across
/// tickers in `analyze_batch`.
pub struct AnalysisOrchestrator {
    growth_estimator: Arc<dyn GrowthEstimator>,
    epv_engine: EpvEngine,
    /// Methods pooled alongside EPV in the consensus.
    additional_methods: ValuationConsensusAggregator,
}

impl AnalysisOrchestrator {
    pub fn new(growth_estimator: Arc<dyn GrowthEstimator>) -> Self {
        Self {
            growth_estimator,
            epv_engine: EpvEngine::new(),
            additional_methods: ValuationConsensusAggregator::new(vec![Box::new(
                DcfLiteMethod::new(),
            )]),
        }
    }

    pub async fn analyze(&self, snapshot: &CompanySnapshot) -> AnalysisResult<CompanyAnalysis> {
        self.analyze_at(snapshot, Utc::now().date_naive()).await
    }

    /// `analyze` with an explicit "today" for TTM quarter selection.
    pub async fn analyze_at(
        &self,
        snapshot: &CompanySnapshot,
        today: NaiveDate,
    ) -> AnalysisResult<CompanyAnalysis> {
        let ticker = snapshot.ticker.trim();
        if ticker.is_empty() {
            return Err(AnalysisError::InvalidInput("ticker is empty".to_string()));
        }
        tracing::info!("Starting valuation for {}", ticker);

        // Currency normalization
        let currency = currency_info(snapshot.reporting_currency.as_deref(), snapshot.fx_rate);
        let rate = currency.conversion_rate;
        let quarterly: Vec<FinancialPeriod> =
            snapshot.quarterly.iter().map(|p| p.scaled(rate)).collect();
        let mut annual: Vec<FinancialPeriod> =
            snapshot.annual.iter().map(|p| p.scaled(rate)).collect();
        annual.sort_by(|a, b| b.period_end.cmp(&a.period_end));
        let balance_sheet = snapshot.balance_sheet.scaled(rate);

        // TTM
        let ttm = calculate_ttm_at(&quarterly, today);
        let ttm_conf = ttm_confidence(&quarterly, today);
        tracing::debug!("{} TTM: {} ({})", ticker, ttm.period_label(), ttm_conf.reason);

        // TTM row first, annualized when fewer than four quarters were summed
        let mut periods: Vec<FinancialPeriod> = ttm.annualized_period().into_iter().collect();
        let partial_ttm_label =
            (ttm.is_partial() && ttm.data_points > 0).then(|| ttm.period_label());
        let remaining = MAX_EPV_PERIODS - periods.len();
        periods.extend(annual.iter().take(remaining).cloned());

        // Derived metrics
        let operating_income = periods.first().and_then(|p| p.operating_income);
        let derived_metrics = calculate_derived_metrics(&DerivedMetricsInput {
            operating_income,
            total_assets: balance_sheet.total_assets,
            current_liabilities: balance_sheet.current_liabilities,
            tax_rate: snapshot.tax_rate,
            dividend_per_share: snapshot.dividends.dividend_per_share,
            previous_dividend_per_share: snapshot.dividends.previous_dividend_per_share,
            eps: snapshot.dividends.eps,
        });

        let mut ratios = snapshot.ratios.clone();
        if ratios.roic.is_none() {
            ratios.roic = derived_metrics.roic;
        }
        if ratios.payout_ratio.is_none() {
            ratios.payout_ratio = derived_metrics.payout_ratio;
        }
        if ratios.interest_coverage.is_none() {
            ratios.interest_coverage =
                calculate_interest_coverage(operating_income, snapshot.interest_expense).value;
        }

        // Growth
        let growth = self
            .growth_estimator
            .estimate_growth(ticker, &snapshot.description)
            .await;

        // EPV
        let epv = self.epv_engine.value_epv(&EpvInput {
            periods: periods.clone(),
            current_price: snapshot.price,
            total_debt: balance_sheet.total_debt,
            non_operating_cash: balance_sheet.cash,
            diluted_shares_outstanding: balance_sheet.diluted_shares_outstanding,
            growth: growth.clone(),
            partial_ttm_label,
        });

        let input = ValuationInput {
            ticker: ticker.to_string(),
            periods,
            ttm: ttm.clone(),
            current_price: snapshot.price,
            balance_sheet,
            growth: growth.clone(),
        };
        let mut valuations = vec![epv.to_method_result()];
        valuations.extend(self.additional_methods.run(&input));

        // Consensus
        let data_quality = DataQualityFlags::from_ratios(&ratios);
        let mut warnings = data_quality.warnings();
        if ttm.data_points == 0 {
            warnings.push("No quarterly reports; valuation relies on annual data only".to_string());
        } else if ttm.is_partial() {
            warnings.push(format!(
                "Trailing figures are {}, not a full year",
                ttm.period_label()
            ));
        }
        if currency.conversion_applied && snapshot.fx_rate.is_none() {
            warnings.push(format!(
                "Financials converted from {} using a fallback rate of {:.4}",
                currency.reporting_currency, currency.conversion_rate
            ));
        }
        let consensus = build_consensus(&valuations, snapshot.price.unwrap_or(0.0), &warnings);

        // Personas
        let persona_scores = score_all(&ratios);

        tracing::info!(
            "Valuation complete for {}: {} ({} methods, confidence {:.0})",
            ticker,
            consensus.overall_assessment.to_label(),
            consensus.methods_used.len(),
            consensus.confidence
        );

        Ok(CompanyAnalysis {
            ticker: ticker.to_string(),
            name: snapshot.name.clone(),
            currency,
            ttm,
            ttm_confidence: ttm_conf,
            derived_metrics,
            ratios,
            growth,
            epv,
            valuations,
            consensus,
            data_quality,
            persona_scores,
            analyzed_at: Utc::now(),
        })
    }

    /// Analyze many companies with at most `concurrency` in flight. Results keep
    /// input order.
    pub async fn analyze_batch(
        self: Arc<Self>,
        snapshots: Vec<CompanySnapshot>,
        concurrency: usize,
    ) -> Vec<(String, AnalysisResult<CompanyAnalysis>)> {
        let semaphore = Arc::new(Semaphore::new(concurrency.max(1)));
        let total = snapshots.len();
        let mut handles = Vec::with_capacity(total);

        for snapshot in snapshots {
            let orchestrator = Arc::clone(&self);
            let semaphore = Arc::clone(&semaphore);
            let ticker = snapshot.ticker.clone();

            let handle = tokio::spawn(async move {
                let _permit = semaphore
                    .acquire()
                    .await
                    .map_err(|e| AnalysisError::TaskFailed(e.to_string()))?;
                orchestrator.analyze(&snapshot).await
            });
            handles.push((ticker, handle));
        }

        let mut results = Vec::with_capacity(total);
        for (done, (ticker, handle)) in handles.into_iter().enumerate() {
            let result = match handle.await {
                Ok(result) => result,
                Err(e) => Err(AnalysisError::TaskFailed(e.to_string())),
            };
            match &result {
                Ok(_) => tracing::info!("[{}/{}] {} analyzed", done + 1, total, ticker),
                Err(e) => tracing::warn!("[{}/{}] {} failed: {}", done + 1, total, ticker, e),
            }
            results.push((ticker, result));
        }
        results
    }
}
