//! Personal-finance chat orchestrator
//!
//! Answers Indian personal-finance questions:
//! - Classifies a query into a calculator intent (Gemini or keyword heuristics)
//! - Runs deterministic closed-form calculators (tax, SIP, EMI, FD, RD, ...)
//! - Explains tax results and compares regimes
//! - Falls back to knowledge lookup + generation for everything else
//!
//! FLOW:
//! QUERY → CLASSIFY → RESOLVE INTENT → CALCULATE → EXPLAIN → RESPONSE

pub mod agent;
pub mod api;
pub mod calculators;
pub mod classifier;
pub mod config;
pub mod conversational;
pub mod error;
pub mod explainer;
pub mod gemini;
pub mod knowledge;
pub mod models;
pub mod preferences;

pub use error::Result;

// Re-export common types
pub use agent::{create_default_orchestrator, Orchestrator};
pub use classifier::IntentClassifier;
pub use config::AppConfig;
pub use models::*;
