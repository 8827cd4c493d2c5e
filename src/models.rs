//! Core data models for the finance chat orchestrator

use crate::calculators::{
    BudgetAllocationResult, CompoundInterestResult, DtiResult, EmiCalculationResult,
    FdCalculationResult, FireCalculationResult, HraResult, PortfolioAllocationResult,
    RdCalculationResult, RetirementCorpusResult, ReverseSipResult, SavingsRatioResult,
    SipCalculationResult, TaxCalculationResult, TaxComparison, TaxRegime, TermInsuranceResult,
};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

//
// ================= Enums =================
//

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RiskTolerance {
    Low,
    Medium,
    High,
}

impl RiskTolerance {
    /// Lenient parse; unknown values fall back to medium.
    pub fn parse(value: &str) -> Self {
        match value.trim().to_lowercase().as_str() {
            "low" | "conservative" => RiskTolerance::Low,
            "high" | "aggressive" => RiskTolerance::High,
            _ => RiskTolerance::Medium,
        }
    }
}

impl fmt::Display for RiskTolerance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RiskTolerance::Low => "Low",
            RiskTolerance::Medium => "Medium",
            RiskTolerance::High => "High",
        };
        write!(f, "{}", s)
    }
}

/// Regime requested by the user; `Both` asks for a side-by-side comparison.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RegimeChoice {
    New,
    Old,
    Both,
}

impl RegimeChoice {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "new" => Some(RegimeChoice::New),
            "old" => Some(RegimeChoice::Old),
            "both" | "compare" | "old vs new" | "new vs old" => Some(RegimeChoice::Both),
            _ => None,
        }
    }
}

//
// ================= Intent =================
//

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IntentTag {
    Tax,
    Sip,
    ReverseSip,
    Emi,
    CompoundInterest,
    Budget,
    Fd,
    Rd,
    RetirementCorpus,
    #[default]
    #[serde(other)]
    General,
}

/// Raw, best-effort output of a classifier. Any field may be missing.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct IntentExtraction {
    pub intent: IntentTag,
    #[serde(deserialize_with = "lenient_number", skip_serializing_if = "Option::is_none")]
    pub income: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub regime: Option<String>,
    #[serde(deserialize_with = "lenient_number", skip_serializing_if = "Option::is_none")]
    pub sip_monthly: Option<f64>,
    #[serde(deserialize_with = "lenient_number", skip_serializing_if = "Option::is_none")]
    pub sip_years: Option<f64>,
    #[serde(deserialize_with = "lenient_number", skip_serializing_if = "Option::is_none")]
    pub sip_rate: Option<f64>,
    #[serde(deserialize_with = "lenient_number", skip_serializing_if = "Option::is_none")]
    pub sip_target: Option<f64>,
    #[serde(deserialize_with = "lenient_number", skip_serializing_if = "Option::is_none")]
    pub emi_principal: Option<f64>,
    #[serde(deserialize_with = "lenient_number", skip_serializing_if = "Option::is_none")]
    pub emi_years: Option<f64>,
    #[serde(deserialize_with = "lenient_number", skip_serializing_if = "Option::is_none")]
    pub emi_rate: Option<f64>,
    #[serde(deserialize_with = "lenient_number", skip_serializing_if = "Option::is_none")]
    pub ci_principal: Option<f64>,
    #[serde(deserialize_with = "lenient_number", skip_serializing_if = "Option::is_none")]
    pub ci_years: Option<f64>,
    #[serde(deserialize_with = "lenient_number", skip_serializing_if = "Option::is_none")]
    pub ci_rate: Option<f64>,
    #[serde(deserialize_with = "lenient_number", skip_serializing_if = "Option::is_none")]
    pub ci_frequency: Option<f64>,
    #[serde(deserialize_with = "lenient_number", skip_serializing_if = "Option::is_none")]
    pub fd_principal: Option<f64>,
    #[serde(deserialize_with = "lenient_number", skip_serializing_if = "Option::is_none")]
    pub fd_years: Option<f64>,
    #[serde(deserialize_with = "lenient_number", skip_serializing_if = "Option::is_none")]
    pub fd_rate: Option<f64>,
    #[serde(deserialize_with = "lenient_number", skip_serializing_if = "Option::is_none")]
    pub rd_monthly: Option<f64>,
    #[serde(deserialize_with = "lenient_number", skip_serializing_if = "Option::is_none")]
    pub rd_months: Option<f64>,
    #[serde(deserialize_with = "lenient_number", skip_serializing_if = "Option::is_none")]
    pub rd_rate: Option<f64>,
    #[serde(deserialize_with = "lenient_number", skip_serializing_if = "Option::is_none")]
    pub ret_current_age: Option<f64>,
    #[serde(deserialize_with = "lenient_number", skip_serializing_if = "Option::is_none")]
    pub ret_retire_age: Option<f64>,
    #[serde(deserialize_with = "lenient_number", skip_serializing_if = "Option::is_none")]
    pub ret_monthly_exp: Option<f64>,
}

impl IntentExtraction {
    pub fn general() -> Self {
        Self::default()
    }
}

/// Models sometimes quote numbers ("1500000") or emit null; accept both.
fn lenient_number<'de, D>(deserializer: D) -> std::result::Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::Number(n)) => n.as_f64(),
        Some(serde_json::Value::String(s)) => s.replace(',', "").trim().parse::<f64>().ok(),
        _ => None,
    })
}

/// A classified intent with every parameter its handler needs.
///
/// Built from an [`IntentExtraction`] by the dispatcher; a calculator intent
/// missing any required field becomes `General`.
#[derive(Debug, Clone, PartialEq)]
pub enum Intent {
    Tax {
        income: f64,
        regime: RegimeChoice,
    },
    Sip {
        monthly: f64,
        years: f64,
        rate: f64,
    },
    ReverseSip {
        target: f64,
        years: f64,
        rate: f64,
    },
    Emi {
        principal: f64,
        years: f64,
        rate: f64,
    },
    CompoundInterest {
        principal: f64,
        years: f64,
        rate: f64,
        frequency: u32,
    },
    Budget {
        monthly_income: f64,
    },
    Fd {
        principal: f64,
        years: f64,
        rate: f64,
    },
    Rd {
        monthly: f64,
        months: u32,
        rate: f64,
    },
    RetirementCorpus {
        current_age: u32,
        retirement_age: u32,
        monthly_expenses: f64,
    },
    General,
}

impl Intent {
    pub fn tag(&self) -> IntentTag {
        match self {
            Intent::Tax { .. } => IntentTag::Tax,
            Intent::Sip { .. } => IntentTag::Sip,
            Intent::ReverseSip { .. } => IntentTag::ReverseSip,
            Intent::Emi { .. } => IntentTag::Emi,
            Intent::CompoundInterest { .. } => IntentTag::CompoundInterest,
            Intent::Budget { .. } => IntentTag::Budget,
            Intent::Fd { .. } => IntentTag::Fd,
            Intent::Rd { .. } => IntentTag::Rd,
            Intent::RetirementCorpus { .. } => IntentTag::RetirementCorpus,
            Intent::General => IntentTag::General,
        }
    }
}

//
// ================= Results =================
//

/// Citation attached to a generated answer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Source {
    pub name: String,
    pub url: String,
    pub last_updated: String,
}

/// Context handed to the explanation step alongside the numbers.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TaxContext {
    pub income: f64,
    pub fiscal_year: String,
    pub regime: Option<TaxRegime>,
}

/// Structured payload for the presentation layer: `{ "type": ..., "data": ... }`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum CalculationResult {
    Tax(TaxCalculationResult),
    TaxComparison(TaxComparison),
    Sip(SipCalculationResult),
    ReverseSip(ReverseSipResult),
    Emi(EmiCalculationResult),
    CompoundInterest(CompoundInterestResult),
    Budget(BudgetAllocationResult),
    Fd(FdCalculationResult),
    Rd(RdCalculationResult),
    RetirementCorpus(RetirementCorpusResult),
    Fire(FireCalculationResult),
    Dti(DtiResult),
    SavingsRatio(SavingsRatioResult),
    PortfolioAllocation(PortfolioAllocationResult),
    TermInsurance(TermInsuranceResult),
    Hra(HraResult),
}

//
// ================= Final Result =================
//

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OrchestrationResponse {
    pub response: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sources: Option<Vec<Source>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub calculation_result: Option<CalculationResult>,
}

impl OrchestrationResponse {
    pub fn text(response: impl Into<String>) -> Self {
        Self {
            response: response.into(),
            sources: None,
            calculation_result: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extraction_parses_loose_model_output() {
        let raw = r#"{
            "intent": "TAX",
            "income": "15,00,000",
            "regime": "both",
            "sip_rate": null,
            "unexpected": 1
        }"#;
        let extraction: IntentExtraction = serde_json::from_str(raw).unwrap();
        assert_eq!(extraction.intent, IntentTag::Tax);
        assert_eq!(extraction.income, Some(1_500_000.0));
        assert_eq!(extraction.regime.as_deref(), Some("both"));
        assert_eq!(extraction.sip_rate, None);
    }

    #[test]
    fn test_unknown_intent_is_general() {
        let extraction: IntentExtraction =
            serde_json::from_str(r#"{"intent": "STOCK_TIPS"}"#).unwrap();
        assert_eq!(extraction.intent, IntentTag::General);
    }

    #[test]
    fn test_calculation_result_shape() {
        let result = CalculationResult::Budget(BudgetAllocationResult {
            monthly_income: 100.0,
            needs: 50.0,
            wants: 30.0,
            savings: 20.0,
        });
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["type"], "budget");
        assert_eq!(json["data"]["needs"], 50.0);
    }

    #[test]
    fn test_response_omits_empty_fields() {
        let json = serde_json::to_value(OrchestrationResponse::text("hello")).unwrap();
        assert_eq!(json, serde_json::json!({ "response": "hello" }));
    }

    #[test]
    fn test_regime_parse() {
        assert_eq!(RegimeChoice::parse("NEW"), Some(RegimeChoice::New));
        assert_eq!(RegimeChoice::parse("both"), Some(RegimeChoice::Both));
        assert_eq!(RegimeChoice::parse("maybe"), None);
        assert_eq!(RiskTolerance::parse("aggressive"), RiskTolerance::High);
    }
}
