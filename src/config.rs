//! Runtime configuration
//!
//! Everything is read from the environment (optionally seeded from a `.env`
//! file by the binaries). Missing values fall back to sensible defaults so the
//! service runs offline with the keyword classifier and template explainer.

use crate::error::OrchestrationError;
use crate::Result;
use std::env;

pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.0-flash";
pub const DEFAULT_FISCAL_YEAR: &str = "2024-25";
pub const DEFAULT_SIP_RATE: f64 = 12.0;
pub const DEFAULT_PORT: u16 = 8080;

#[derive(Debug, Clone)]
pub struct AppConfig {
    /// `None` when unset or still the `.env.example` placeholder.
    pub gemini_api_key: Option<String>,
    pub gemini_model: String,
    pub port: u16,
    pub fiscal_year: String,
    pub default_sip_rate: f64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            gemini_api_key: None,
            gemini_model: DEFAULT_GEMINI_MODEL.to_string(),
            port: DEFAULT_PORT,
            fiscal_year: DEFAULT_FISCAL_YEAR.to_string(),
            default_sip_rate: DEFAULT_SIP_RATE,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        let gemini_api_key = env::var("GEMINI_API_KEY")
            .ok()
            .map(|key| key.trim().to_string())
            .filter(|key| !key.is_empty() && key != "your_gemini_api_key_here");

        let gemini_model = env::var("GEMINI_MODEL")
            .ok()
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_GEMINI_MODEL.to_string());

        let port = match env::var("PORT").or_else(|_| env::var("API_PORT")) {
            Ok(raw) => raw.trim().parse::<u16>().map_err(|e| {
                OrchestrationError::ConfigError(format!("Invalid PORT '{}': {}", raw, e))
            })?,
            Err(_) => DEFAULT_PORT,
        };

        let fiscal_year = env::var("FISCAL_YEAR")
            .ok()
            .filter(|fy| !fy.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_FISCAL_YEAR.to_string());

        let default_sip_rate = match env::var("DEFAULT_SIP_RATE") {
            Ok(raw) => raw.trim().parse::<f64>().map_err(|e| {
                OrchestrationError::ConfigError(format!(
                    "Invalid DEFAULT_SIP_RATE '{}': {}",
                    raw, e
                ))
            })?,
            Err(_) => DEFAULT_SIP_RATE,
        };

        Ok(Self {
            gemini_api_key,
            gemini_model,
            port,
            fiscal_year,
            default_sip_rate,
        })
    }

    pub fn has_llm(&self) -> bool {
        self.gemini_api_key.is_some()
    }
}
