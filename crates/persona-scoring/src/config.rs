use analysis_core::{Persona, PersonaScoreResult, Verdict};
use anyhow::{bail, Context, Result};
use std::collections::BTreeMap;
use std::env;

pub const DEFAULT_MIN_SCORE: u8 = 60;

/// Minimum persona score for a company to qualify in a screen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScoringConfig {
    min_scores: BTreeMap<Persona, u8>,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            min_scores: Persona::ALL
                .iter()
                .map(|p| (*p, DEFAULT_MIN_SCORE))
                .collect(),
        }
    }
}

fn env_key(persona: Persona) -> String {
    format!("PERSONA_MIN_SCORE_{}", persona.id().to_uppercase())
}

impl ScoringConfig {
    /// Reads `PERSONA_MIN_SCORE_BUFFETT`, `..._GRAHAM`, `..._LYNCH` and
    /// `..._DIVIDEND_INCOME`.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        for persona in Persona::ALL {
            let key = env_key(persona);
            if let Some(raw) = lookup(&key) {
                let score: u8 = raw
                    .trim()
                    .parse()
                    .with_context(|| format!("{} must be an integer between 0 and 100", key))?;
                if score > 100 {
                    bail!("{} must be between 0 and 100, got {}", key, score);
                }
                config.min_scores.insert(persona, score);
            }
        }
        Ok(config)
    }

    pub fn with_min_score(mut self, persona: Persona, score: u8) -> Self {
        self.min_scores.insert(persona, score.min(100));
        self
    }

    pub fn min_score(&self, persona: Persona) -> u8 {
        self.min_scores
            .get(&persona)
            .copied()
            .unwrap_or(DEFAULT_MIN_SCORE)
    }

    /// Insufficient Data never qualifies.
    pub fn qualifies(&self, result: &PersonaScoreResult) -> bool {
        result.verdict != Verdict::InsufficientData && result.score >= self.min_score(result.persona)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn result(persona: Persona, score: u8, verdict: Verdict) -> PersonaScoreResult {
        PersonaScoreResult {
            persona,
            score,
            verdict,
            confidence: 1.0,
            criteria: vec![],
            key_risks: vec![],
            what_would_change_mind: vec![],
        }
    }

    #[test]
    fn test_defaults() {
        let config = ScoringConfig::from_lookup(|_| None).unwrap();
        for persona in Persona::ALL {
            assert_eq!(config.min_score(persona), 60);
        }
    }

    #[test]
    fn test_overrides_from_lookup() {
        let vars: HashMap<&str, &str> = [
            ("PERSONA_MIN_SCORE_GRAHAM", "55"),
            ("PERSONA_MIN_SCORE_DIVIDEND_INCOME", " 65 "),
        ]
        .into_iter()
        .collect();
        let config = ScoringConfig::from_lookup(|k| vars.get(k).map(|v| v.to_string())).unwrap();
        assert_eq!(config.min_score(Persona::Graham), 55);
        assert_eq!(config.min_score(Persona::DividendIncome), 65);
        assert_eq!(config.min_score(Persona::Buffett), 60);
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(ScoringConfig::from_lookup(|k| {
            (k == "PERSONA_MIN_SCORE_LYNCH").then(|| "high".to_string())
        })
        .is_err());
        assert!(ScoringConfig::from_lookup(|k| {
            (k == "PERSONA_MIN_SCORE_LYNCH").then(|| "120".to_string())
        })
        .is_err());
    }

    #[test]
    fn test_qualifies() {
        let config = ScoringConfig::default().with_min_score(Persona::Lynch, 70);
        assert!(config.qualifies(&result(Persona::Buffett, 60, Verdict::Borderline)));
        assert!(!config.qualifies(&result(Persona::Lynch, 65, Verdict::Fit)));
        assert!(!config.qualifies(&result(Persona::Graham, 0, Verdict::InsufficientData)));
    }
}
