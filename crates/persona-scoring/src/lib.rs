//! Weighted persona rubrics over a ratio snapshot.

pub mod config;
pub mod evaluator;
pub mod rubric;

pub use config::{ScoringConfig, DEFAULT_MIN_SCORE};
pub use evaluator::{score_all, PersonaEvaluator};
pub use rubric::{rubric, Criterion};
