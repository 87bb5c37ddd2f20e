use thiserror::Error;

/// Structural failures. Calculators never return these; only the orchestration
/// boundary does, when a request cannot be processed at all.
#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Task failed: {0}")]
    TaskFailed(String),
}

pub type AnalysisResult<T> = Result<T, AnalysisError>;
