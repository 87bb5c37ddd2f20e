use analysis_core::numeric::round_to;
use analysis_core::{
    CriterionStatus, Persona, PersonaCriterionResult, PersonaScoreResult, RatioSnapshot, Verdict,
};
use tracing::debug;

use crate::rubric::{rubric, Criterion};

/// Scores a ratio snapshot against one investor archetype.
pub trait PersonaEvaluator {
    fn evaluate(&self, ratios: &RatioSnapshot) -> PersonaScoreResult;
}

impl PersonaEvaluator for Persona {
    fn evaluate(&self, ratios: &RatioSnapshot) -> PersonaScoreResult {
        score_rubric(*self, rubric(*self), ratios)
    }
}

/// Every persona, in `Persona::ALL` order.
pub fn score_all(ratios: &RatioSnapshot) -> Vec<PersonaScoreResult> {
    Persona::ALL.iter().map(|p| p.evaluate(ratios)).collect()
}

fn score_rubric(persona: Persona, criteria: &[Criterion], ratios: &RatioSnapshot) -> PersonaScoreResult {
    let mut results = Vec::with_capacity(criteria.len());
    let mut key_risks = Vec::new();
    let mut what_would_change_mind = Vec::new();
    let mut weighted = 0.0_f64;
    let mut available_weight = 0u32;
    let mut total_weight = 0u32;
    let mut missing_required = false;

    for criterion in criteria {
        total_weight += criterion.weight as u32;
        let metrics_used = criterion.metrics.iter().map(|m| m.to_string()).collect();

        let (status, explanation) = match (criterion.evaluate)(ratios) {
            Some(eval) => {
                available_weight += criterion.weight as u32;
                weighted += criterion.weight as f64 * eval.status.multiplier();
                if eval.status == CriterionStatus::Fail {
                    key_risks.push(format!("{}: {}", criterion.name, eval.explanation));
                }
                (eval.status, eval.explanation)
            }
            None => {
                missing_required |= criterion.required;
                key_risks.push(format!(
                    "{} could not be assessed: missing {}",
                    criterion.name,
                    criterion.metrics.join("/")
                ));
                (
                    CriterionStatus::Fail,
                    format!("Data unavailable ({})", criterion.metrics.join(", ")),
                )
            }
        };

        if status != CriterionStatus::Pass {
            what_would_change_mind.push(criterion.pass_condition.to_string());
        }

        results.push(PersonaCriterionResult {
            name: criterion.name.to_string(),
            weight: criterion.weight,
            status,
            metrics_used,
            explanation,
        });
    }

    let confidence = if total_weight == 0 {
        0.0
    } else {
        round_to(available_weight as f64 / total_weight as f64, 2)
    };

    let (score, verdict) = if missing_required {
        (0, Verdict::InsufficientData)
    } else {
        let score = weighted.round().clamp(0.0, 100.0) as u8;
        (score, Verdict::from_score(score))
    };

    debug!(
        persona = persona.id(),
        score,
        verdict = verdict.to_label(),
        confidence,
        "Persona scored"
    );

    PersonaScoreResult {
        persona,
        score,
        verdict,
        confidence,
        criteria: results,
        key_risks,
        what_would_change_mind,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn quality_compounder() -> RatioSnapshot {
        RatioSnapshot {
            pe: Some(18.0),
            pb: Some(6.0),
            current_ratio: Some(1.2),
            debt_to_equity: Some(0.4),
            interest_coverage: Some(25.0),
            roe: Some(28.5),
            roic: Some(22.0),
            gross_margin: Some(55.0),
            net_margin: Some(21.0),
            dividend_yield: Some(1.1),
            payout_ratio: Some(25.0),
            revenue_growth: Some(8.0),
            earnings_growth: Some(12.0),
            market_cap: Some(900_000.0),
            ..Default::default()
        }
    }

    fn utility() -> RatioSnapshot {
        RatioSnapshot {
            pe: Some(16.0),
            pb: Some(1.8),
            debt_to_equity: Some(1.4),
            interest_coverage: Some(3.5),
            dividend_yield: Some(4.2),
            payout_ratio: Some(70.0),
            earnings_growth: Some(3.0),
            ..Default::default()
        }
    }

    #[test]
    fn test_buffett_strong_fit() {
        let result = Persona::Buffett.evaluate(&quality_compounder());
        assert_eq!(result.score, 100);
        assert_eq!(result.verdict, Verdict::StrongFit);
        assert_relative_eq!(result.confidence, 1.0);
        assert!(result.key_risks.is_empty());
        assert!(result.what_would_change_mind.is_empty());
        assert_eq!(result.criteria.len(), 6);
        assert!(result.criteria[0].explanation.contains("28.5%"));
    }

    #[test]
    fn test_graham_rejects_expensive_quality() {
        let result = Persona::Graham.evaluate(&quality_compounder());
        // P/E 18 partial (12.5), P/B fail, product 108 fail, CR 1.2 fail,
        // D/E pass (10), yield partial (5)
        assert_eq!(result.score, 28);
        assert_eq!(result.verdict, Verdict::NotAFit);
        assert_eq!(result.key_risks.len(), 3);
        assert!(result.key_risks[0].contains("P/B of 6.00"));
    }

    #[test]
    fn test_dividend_income_partial_scores() {
        let result = Persona::DividendIncome.evaluate(&utility());
        // yield pass 30, payout partial 12.5, coverage fail, D/E partial 7.5, growth partial 7.5
        assert_eq!(result.score, 58);
        assert_eq!(result.verdict, Verdict::Borderline);
        assert_eq!(result.what_would_change_mind.len(), 4);
    }

    #[test]
    fn test_missing_required_metric_is_insufficient_data() {
        let ratios = RatioSnapshot {
            pe: Some(12.0),
            debt_to_equity: Some(0.3),
            ..Default::default()
        };
        let result = Persona::Buffett.evaluate(&ratios);
        assert_eq!(result.verdict, Verdict::InsufficientData);
        assert_eq!(result.score, 0);
        assert_relative_eq!(result.confidence, 0.35);
        assert!(result
            .key_risks
            .iter()
            .any(|r| r.contains("missing roe/roic")));
    }

    #[test]
    fn test_missing_optional_metric_scores_as_fail() {
        let mut ratios = quality_compounder();
        ratios.gross_margin = None;
        let result = Persona::Buffett.evaluate(&ratios);
        assert_eq!(result.score, 85);
        assert_eq!(result.verdict, Verdict::StrongFit);
        assert_relative_eq!(result.confidence, 0.85);
        assert_eq!(result.criteria[3].explanation, "Data unavailable (gross_margin)");
    }

    #[test]
    fn test_score_all_covers_every_persona() {
        let results = score_all(&quality_compounder());
        let personas: Vec<Persona> = results.iter().map(|r| r.persona).collect();
        assert_eq!(personas, Persona::ALL.to_vec());
    }

    #[test]
    fn test_scoring_is_deterministic() {
        let ratios = utility();
        assert_eq!(Persona::Lynch.evaluate(&ratios), Persona::Lynch.evaluate(&ratios));
    }

    #[test]
    fn test_result_serializes_verdict_label() {
        let result = Persona::Buffett.evaluate(&RatioSnapshot::default());
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["verdict"], "Insufficient Data");
        assert_eq!(json["persona"], "buffett");
    }
}
