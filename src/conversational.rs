//! General question handler
//!
//! Everything that is not a calculator request lands here. Answers are
//! grounded in the knowledge base when it has something relevant, fall back
//! to the model's general knowledge otherwise, and never come back empty.

use crate::gemini::LanguageModel;
use crate::knowledge::{KnowledgeBase, KnowledgeSnippet};
use crate::models::Source;
use crate::Result;
use std::sync::Arc;
use tracing::{info, warn};

pub const FALLBACK_APOLOGY: &str = "I'm sorry, I couldn't find an answer to that. Try asking about income tax, SIPs, loans, deposits or retirement planning.";

const GENERAL_INSTRUCTION: &str = r#"You are a professional Indian personal-finance assistant.

Guidelines:
- Provide accurate and educational financial information
- Be structured and concise, use markdown
- Prefer the provided reference notes when they are relevant
- Do not recommend specific stocks or guarantee returns"#;

/// Response for general (non-calculator) questions
#[derive(Debug, Clone, PartialEq)]
pub struct GeneralAnswer {
    pub answer: String,
    /// Empty when the answer did not come from the knowledge base.
    pub sources: Vec<Source>,
}

pub struct GeneralResponder {
    knowledge: KnowledgeBase,
    model: Option<Arc<dyn LanguageModel>>,
}

impl GeneralResponder {
    pub fn new(knowledge: KnowledgeBase, model: Option<Arc<dyn LanguageModel>>) -> Self {
        Self { knowledge, model }
    }

    /// Answer a free-text question.
    ///
    /// Tries a grounded model answer, then the model without reference
    /// notes, then the top snippet, then [`FALLBACK_APOLOGY`]. Model failures
    /// propagate so the caller can surface them; an empty answer is not a
    /// failure.
    pub async fn respond(&self, query: &str) -> Result<GeneralAnswer> {
        let snippets = self.knowledge.search(query);
        info!(snippet_count = snippets.len(), "Knowledge lookup complete");

        if let Some(model) = &self.model {
            let prompt = build_prompt(query, &snippets);
            let answer = model.generate(&prompt, Some(GENERAL_INSTRUCTION)).await?;

            if !answer.trim().is_empty() {
                return Ok(GeneralAnswer {
                    answer,
                    sources: snippets.iter().map(KnowledgeSnippet::to_source).collect(),
                });
            }

            if !snippets.is_empty() {
                warn!("Grounded answer was empty, retrying without reference notes");
                let prompt = build_prompt(query, &[]);
                let answer = model.generate(&prompt, Some(GENERAL_INSTRUCTION)).await?;
                if !answer.trim().is_empty() {
                    return Ok(GeneralAnswer {
                        answer,
                        sources: Vec::new(),
                    });
                }
            }
            warn!("Model returned an empty answer, falling back");
        }

        if let Some(top) = snippets.first() {
            return Ok(GeneralAnswer {
                answer: format!("**{}**\n\n{}", top.source_name, top.content),
                sources: vec![top.to_source()],
            });
        }

        Ok(GeneralAnswer {
            answer: FALLBACK_APOLOGY.to_string(),
            sources: Vec::new(),
        })
    }
}

fn build_prompt(query: &str, snippets: &[KnowledgeSnippet]) -> String {
    let mut prompt = String::new();
    if snippets.is_empty() {
        prompt.push_str("No reference notes matched; answer from general knowledge.\n\n");
    } else {
        prompt.push_str("Reference notes:\n\n");
        for snippet in snippets {
            prompt.push_str(&format!("- [{}] {}\n", snippet.source_name, snippet.content));
        }
        prompt.push_str("\n---\n\n");
    }
    prompt.push_str("Answer this question: ");
    prompt.push_str(query);
    prompt
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::OrchestrationError;
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct RecordingModel {
        answer: &'static str,
        prompts: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl LanguageModel for RecordingModel {
        async fn generate(&self, prompt: &str, _system: Option<&str>) -> Result<String> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            Ok(self.answer.to_string())
        }
    }

    struct FailingModel;

    #[async_trait]
    impl LanguageModel for FailingModel {
        async fn generate(&self, _prompt: &str, _system: Option<&str>) -> Result<String> {
            Err(OrchestrationError::LlmError("quota exhausted".to_string()))
        }
    }

    fn recording(answer: &'static str) -> Arc<RecordingModel> {
        Arc::new(RecordingModel {
            answer,
            prompts: Mutex::new(Vec::new()),
        })
    }

    #[tokio::test]
    async fn test_grounded_answer_cites_sources() {
        let model = recording("PPF is a 15-year scheme.");
        let responder = GeneralResponder::new(KnowledgeBase::default(), Some(model.clone()));

        let answer = responder.respond("what is ppf?").await.unwrap();
        assert_eq!(answer.answer, "PPF is a 15-year scheme.");
        assert_eq!(answer.sources.len(), 1);
        assert!(model.prompts.lock().unwrap()[0].contains("Reference notes"));
    }

    #[tokio::test]
    async fn test_general_knowledge_without_hits() {
        let model = recording("Gold is a hedge.");
        let responder = GeneralResponder::new(KnowledgeBase::default(), Some(model.clone()));

        let answer = responder.respond("zzz qqq").await.unwrap();
        assert_eq!(answer.answer, "Gold is a hedge.");
        assert!(answer.sources.is_empty());
        assert!(model.prompts.lock().unwrap()[0].contains("general knowledge"));
    }

    #[tokio::test]
    async fn test_empty_model_answer_falls_back() {
        let responder =
            GeneralResponder::new(KnowledgeBase::default(), Some(recording("   ")));
        let answer = responder.respond("zzz qqq").await.unwrap();
        assert_eq!(answer.answer, FALLBACK_APOLOGY);

        let with_snippet = responder.respond("what is ppf").await.unwrap();
        assert!(with_snippet.answer.contains("Public Provident Fund"));
    }

    /// Answers only prompts without reference notes.
    struct UngroundedOnlyModel;

    #[async_trait]
    impl LanguageModel for UngroundedOnlyModel {
        async fn generate(&self, prompt: &str, _system: Option<&str>) -> Result<String> {
            if prompt.contains("Reference notes") {
                Ok(String::new())
            } else {
                Ok("PPF locks money in for 15 years.".to_string())
            }
        }
    }

    #[tokio::test]
    async fn test_empty_grounded_answer_retries_without_notes() {
        let model = recording("");
        let responder = GeneralResponder::new(KnowledgeBase::default(), Some(model.clone()));
        responder.respond("what is ppf").await.unwrap();
        assert_eq!(model.prompts.lock().unwrap().len(), 2);

        let responder =
            GeneralResponder::new(KnowledgeBase::default(), Some(Arc::new(UngroundedOnlyModel)));
        let answer = responder.respond("what is ppf").await.unwrap();
        assert_eq!(answer.answer, "PPF locks money in for 15 years.");
        assert!(answer.sources.is_empty());
    }

    #[tokio::test]
    async fn test_offline_uses_snippets() {
        let responder = GeneralResponder::new(KnowledgeBase::default(), None);
        let answer = responder.respond("how does term insurance work").await.unwrap();
        assert!(answer.answer.contains("Term insurance"));
        assert_eq!(answer.sources.len(), 1);
    }

    #[tokio::test]
    async fn test_model_error_propagates() {
        let responder = GeneralResponder::new(KnowledgeBase::default(), Some(Arc::new(FailingModel)));
        let err = responder.respond("what is ppf").await.unwrap_err();
        assert!(err.to_string().contains("quota exhausted"));
    }
}
