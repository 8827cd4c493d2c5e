//! Error types for the finance chat orchestrator

use thiserror::Error;

/// Result type alias for orchestrator operations
pub type Result<T> = std::result::Result<T, OrchestrationError>;

/// Domain errors raised by the calculators.
///
/// Degenerate inputs (zero or negative amounts) never produce one of these;
/// they yield zeroed results instead. Only assumption sets that make a
/// formula undefined are rejected.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CalculationError {
    #[error("Invalid assumption: {0}")]
    InvalidAssumption(String),
}

#[derive(Error, Debug)]
pub enum OrchestrationError {

    // =============================
    // Core Pipeline Errors
    // =============================

    #[error("Classification error: {0}")]
    ClassificationError(String),

    #[error("Explanation error: {0}")]
    ExplanationError(String),

    #[error("LLM error: {0}")]
    LlmError(String),

    #[error("Calculation error: {0}")]
    Calculation(#[from] CalculationError),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    // =============================
    // External Library Conversions
    // =============================

    #[error("HTTP client error: {0}")]
    HttpError(#[from] reqwest::Error),
}
