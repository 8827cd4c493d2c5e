//! Intent classification
//!
//! Maps free text to an [`IntentExtraction`]: an intent tag plus whatever
//! numeric parameters could be pulled out of the query. Two implementations:
//! - `GeminiIntentClassifier`: delegates extraction to the model
//! - `KeywordIntentClassifier`: deterministic heuristics, no network

use crate::models::IntentExtraction;
use crate::Result;
use async_trait::async_trait;

pub mod gemini;
pub mod keyword;

pub use gemini::GeminiIntentClassifier;
pub use keyword::KeywordIntentClassifier;

/// Trait for intent classification (best-effort, may omit fields)
#[async_trait]
pub trait IntentClassifier: Send + Sync {
    fn name(&self) -> &'static str;

    /// Classify a query. Ambiguous queries must come back as `GENERAL`.
    async fn classify(&self, query: &str) -> Result<IntentExtraction>;
}
