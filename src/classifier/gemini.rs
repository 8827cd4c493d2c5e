//! Gemini-powered intent classifier
//!
//! Asks the model for a single JSON object matching `IntentExtraction`.

use super::IntentClassifier;
use crate::error::OrchestrationError;
use crate::gemini::{strip_code_fence, LanguageModel};
use crate::models::IntentExtraction;
use crate::Result;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{info, warn};

const CLASSIFIER_INSTRUCTION: &str = r#"You classify personal-finance questions from Indian users.

Return ONLY a JSON object, no prose, no code fences.

"intent" must be one of:
TAX, SIP, REVERSE_SIP, EMI, COMPOUND_INTEREST, BUDGET, FD, RD, RETIREMENT_CORPUS, GENERAL

Optional fields (numbers in plain rupees, rates in percent, omit when not stated):
- TAX: "income", "regime" ("new" | "old" | "both" when the user compares regimes)
- SIP: "sip_monthly", "sip_years", "sip_rate"
- REVERSE_SIP: "sip_target", "sip_years", "sip_rate"
- EMI: "emi_principal", "emi_years", "emi_rate"
- COMPOUND_INTEREST: "ci_principal", "ci_years", "ci_rate", "ci_frequency" (times per year)
- FD: "fd_principal", "fd_years", "fd_rate"
- RD: "rd_monthly", "rd_months", "rd_rate"
- RETIREMENT_CORPUS: "ret_current_age", "ret_retire_age", "ret_monthly_exp"
- BUDGET: "income" (monthly)

Convert Indian units: 1 lakh / 1L = 100000, 1 crore / 1cr = 10000000, 1k = 1000.
Never invent values the user did not give.
When unsure, use "GENERAL"."#;

pub struct GeminiIntentClassifier {
    model: Arc<dyn LanguageModel>,
}

impl GeminiIntentClassifier {
    pub fn new(model: Arc<dyn LanguageModel>) -> Self {
        Self { model }
    }
}

#[async_trait]
impl IntentClassifier for GeminiIntentClassifier {
    fn name(&self) -> &'static str {
        "gemini"
    }

    async fn classify(&self, query: &str) -> Result<IntentExtraction> {
        let prompt = format!("User query:\n{}", query);
        let response = self
            .model
            .generate(&prompt, Some(CLASSIFIER_INSTRUCTION))
            .await?;

        let extraction = parse_extraction(&response)?;
        info!(intent = ?extraction.intent, "Query classified");
        Ok(extraction)
    }
}

/// Parse the model's JSON answer into an extraction.
fn parse_extraction(response: &str) -> Result<IntentExtraction> {
    let cleaned = strip_code_fence(response);

    // Some answers carry a sentence before the object; keep the outermost braces.
    let candidate = match (cleaned.find('{'), cleaned.rfind('}')) {
        (Some(start), Some(end)) if start < end => &cleaned[start..=end],
        _ => cleaned,
    };

    serde_json::from_str::<IntentExtraction>(candidate).map_err(|e| {
        warn!("Unparseable classifier output: {}", response);
        OrchestrationError::ClassificationError(format!(
            "Failed to parse classifier response: {} | raw={}",
            e, response
        ))
    })
}
