//! Main orchestrator - routes a query to exactly one handler
//!
//! INPUT → CLASSIFY → RESOLVE → CALCULATE → EXPLAIN → RESPOND

use crate::calculators::{
    calculate_budget_allocation, calculate_compound_interest, calculate_emi, calculate_fd,
    calculate_rd, calculate_retirement_corpus, calculate_reverse_sip, calculate_sip,
    calculate_tax, RetirementAssumptions, TaxComparison, TaxRegime, FD_DEFAULT_FREQUENCY,
};
use crate::classifier::{GeminiIntentClassifier, IntentClassifier, KeywordIntentClassifier};
use crate::config::AppConfig;
use crate::conversational::GeneralResponder;
use crate::explainer::{format_inr, GeminiTaxExplainer, TaxExplainer, TemplateTaxExplainer};
use crate::gemini::{GeminiClient, LanguageModel};
use crate::knowledge::{rate_for, KnowledgeBase, RateKind};
use crate::models::{
    CalculationResult, Intent, IntentExtraction, IntentTag, OrchestrationResponse, RegimeChoice,
    TaxContext,
};
use crate::Result;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};
use uuid::Uuid;

const DEFAULT_CI_FREQUENCY: u32 = 1;
const CLASSIFIER_TEMPERATURE: f32 = 0.1;

/// Values filled in when the user leaves an optional parameter out.
#[derive(Debug, Clone, PartialEq)]
pub struct DispatchDefaults {
    pub fiscal_year: String,
    pub sip_rate: f64,
    pub fd_rate: f64,
    pub rd_rate: f64,
}

impl DispatchDefaults {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            fiscal_year: config.fiscal_year.clone(),
            sip_rate: config.default_sip_rate,
            fd_rate: rate_for(RateKind::FixedDeposit),
            rd_rate: rate_for(RateKind::RecurringDeposit),
        }
    }
}

impl Default for DispatchDefaults {
    fn default() -> Self {
        Self::from_config(&AppConfig::default())
    }
}

fn whole(value: f64) -> u32 {
    value.max(0.0).round() as u32
}

/// Turn a best-effort extraction into a fully-specified intent.
///
/// A calculator intent missing any required field resolves to `General`.
pub fn resolve_intent(extraction: &IntentExtraction, defaults: &DispatchDefaults) -> Intent {
    let e = extraction;
    let resolved = match e.intent {
        IntentTag::Tax => e.income.map(|income| Intent::Tax {
            income,
            regime: e
                .regime
                .as_deref()
                .and_then(RegimeChoice::parse)
                .unwrap_or(RegimeChoice::New),
        }),
        IntentTag::Sip => match (e.sip_monthly, e.sip_years) {
            (Some(monthly), Some(years)) => Some(Intent::Sip {
                monthly,
                years,
                rate: e.sip_rate.unwrap_or(defaults.sip_rate),
            }),
            _ => None,
        },
        IntentTag::ReverseSip => match (e.sip_target, e.sip_years) {
            (Some(target), Some(years)) => Some(Intent::ReverseSip {
                target,
                years,
                rate: e.sip_rate.unwrap_or(defaults.sip_rate),
            }),
            _ => None,
        },
        IntentTag::Emi => match (e.emi_principal, e.emi_years, e.emi_rate) {
            (Some(principal), Some(years), Some(rate)) => Some(Intent::Emi {
                principal,
                years,
                rate,
            }),
            _ => None,
        },
        IntentTag::CompoundInterest => match (e.ci_principal, e.ci_years, e.ci_rate) {
            (Some(principal), Some(years), Some(rate)) => Some(Intent::CompoundInterest {
                principal,
                years,
                rate,
                frequency: e
                    .ci_frequency
                    .map(|f| whole(f).max(1))
                    .unwrap_or(DEFAULT_CI_FREQUENCY),
            }),
            _ => None,
        },
        IntentTag::Budget => e.income.map(|monthly_income| Intent::Budget { monthly_income }),
        IntentTag::Fd => match (e.fd_principal, e.fd_years) {
            (Some(principal), Some(years)) => Some(Intent::Fd {
                principal,
                years,
                rate: e.fd_rate.unwrap_or(defaults.fd_rate),
            }),
            _ => None,
        },
        IntentTag::Rd => match (e.rd_monthly, e.rd_months) {
            (Some(monthly), Some(months)) => Some(Intent::Rd {
                monthly,
                months: whole(months),
                rate: e.rd_rate.unwrap_or(defaults.rd_rate),
            }),
            _ => None,
        },
        IntentTag::RetirementCorpus => {
            match (e.ret_current_age, e.ret_retire_age, e.ret_monthly_exp) {
                (Some(current), Some(retire), Some(expenses)) => Some(Intent::RetirementCorpus {
                    current_age: whole(current),
                    retirement_age: whole(retire),
                    monthly_expenses: expenses,
                }),
                _ => None,
            }
        }
        IntentTag::General => None,
    };

    match resolved {
        Some(intent) => intent,
        None => {
            if e.intent != IntentTag::General {
                debug!(intent = ?e.intent, "Required fields missing, routing to general");
            }
            Intent::General
        }
    }
}

/// Main orchestrator that coordinates classification, calculation and answer
pub struct Orchestrator {
    classifier: Box<dyn IntentClassifier>,
    explainer: Box<dyn TaxExplainer>,
    responder: GeneralResponder,
    defaults: DispatchDefaults,
}

impl Orchestrator {
    pub fn new(
        classifier: Box<dyn IntentClassifier>,
        explainer: Box<dyn TaxExplainer>,
        responder: GeneralResponder,
        defaults: DispatchDefaults,
    ) -> Self {
        Self {
            classifier,
            explainer,
            responder,
            defaults,
        }
    }

    pub fn defaults(&self) -> &DispatchDefaults {
        &self.defaults
    }

    /// Answer a single query. Never fails: errors become an apology that
    /// carries the error text.
    pub async fn orchestrate(&self, query: &str) -> OrchestrationResponse {
        let request_id = Uuid::new_v4();
        let start_time = Instant::now();

        info!(
            request_id = %request_id,
            classifier = self.classifier.name(),
            query = %query,
            "Orchestrator: query received"
        );

        match self.run(query).await {
            Ok(response) => {
                info!(
                    request_id = %request_id,
                    elapsed_ms = start_time.elapsed().as_millis() as u64,
                    has_calculation = response.calculation_result.is_some(),
                    "Orchestrator: response ready"
                );
                response
            }
            Err(e) => {
                warn!(request_id = %request_id, error = %e, "Orchestrator: request failed");
                OrchestrationResponse::text(format!(
                    "I'm sorry, I ran into a problem while processing your request: {}",
                    e
                ))
            }
        }
    }

    async fn run(&self, query: &str) -> Result<OrchestrationResponse> {
        let extraction = self.classifier.classify(query).await?;
        let intent = resolve_intent(&extraction, &self.defaults);
        info!(intent = ?intent.tag(), "Intent resolved");

        self.dispatch(query, intent).await
    }

    async fn dispatch(&self, query: &str, intent: Intent) -> Result<OrchestrationResponse> {
        let (response, calculation) = match intent {
            Intent::Tax { income, regime } => return self.handle_tax(income, regime).await,

            Intent::Sip {
                monthly,
                years,
                rate,
            } => {
                let r = calculate_sip(monthly, years, rate);
                let text = format!(
                    "### SIP projection\n\nInvesting {} every month for {} years at {}% a year grows to about **{}**.\n\n- Total invested: {}\n- Estimated gains: {}\n\n_Returns from market-linked funds are not guaranteed._",
                    format_inr(r.monthly_investment),
                    r.years,
                    r.annual_rate,
                    format_inr(r.future_value),
                    format_inr(r.total_invested),
                    format_inr(r.total_gain)
                );
                (text, CalculationResult::Sip(r))
            }

            Intent::ReverseSip {
                target,
                years,
                rate,
            } => {
                let r = calculate_reverse_sip(target, years, rate);
                let text = format!(
                    "### Monthly SIP needed\n\nTo reach {} in {} years at {}% a year, invest about **{}** every month.\n\n- Total invested: {}\n- Estimated gains: {}",
                    format_inr(r.future_value),
                    r.years,
                    r.annual_rate,
                    format_inr(r.monthly_investment),
                    format_inr(r.total_invested),
                    format_inr(r.total_gain)
                );
                (text, CalculationResult::ReverseSip(r))
            }

            Intent::Emi {
                principal,
                years,
                rate,
            } => {
                let r = calculate_emi(principal, years, rate);
                let text = format!(
                    "### Loan EMI\n\nA loan of {} at {}% for {} years ({} months) costs **{}** a month.\n\n- Total payment: {}\n- Total interest: {}",
                    format_inr(r.principal),
                    r.annual_rate,
                    r.years,
                    r.tenure_months,
                    format_inr(r.emi),
                    format_inr(r.total_payment),
                    format_inr(r.total_interest)
                );
                (text, CalculationResult::Emi(r))
            }

            Intent::CompoundInterest {
                principal,
                years,
                rate,
                frequency,
            } => {
                let r = calculate_compound_interest(principal, rate, years, frequency);
                let text = format!(
                    "### Compound interest\n\n{} at {}% compounded {} time(s) a year for {} years grows to **{}**, earning {} in interest.",
                    format_inr(r.principal),
                    r.annual_rate,
                    r.compounding_frequency,
                    r.years,
                    format_inr(r.future_value),
                    format_inr(r.total_interest)
                );
                (text, CalculationResult::CompoundInterest(r))
            }

            Intent::Budget { monthly_income } => {
                let r = calculate_budget_allocation(monthly_income);
                let text = format!(
                    "### 50/30/20 budget\n\nFor a monthly income of {}:\n\n- Needs (50%): {}\n- Wants (30%): {}\n- Savings (20%): {}",
                    format_inr(r.monthly_income),
                    format_inr(r.needs),
                    format_inr(r.wants),
                    format_inr(r.savings)
                );
                (text, CalculationResult::Budget(r))
            }

            Intent::Fd {
                principal,
                years,
                rate,
            } => {
                let r = calculate_fd(principal, rate, years, FD_DEFAULT_FREQUENCY);
                let text = format!(
                    "### Fixed deposit\n\nA deposit of {} at {}% for {} years (compounded quarterly) matures to **{}**, earning {} in interest.\n\n_Interest is taxable at your slab rate._",
                    format_inr(r.principal),
                    r.annual_rate,
                    r.years,
                    format_inr(r.future_value),
                    format_inr(r.total_interest)
                );
                (text, CalculationResult::Fd(r))
            }

            Intent::Rd {
                monthly,
                months,
                rate,
            } => {
                let r = calculate_rd(monthly, months, rate);
                let text = format!(
                    "### Recurring deposit\n\nDepositing {} a month for {} months at {}% matures to **{}**.\n\n- Total deposited: {}\n- Interest earned: {}",
                    format_inr(r.monthly_deposit),
                    r.months,
                    r.annual_rate,
                    format_inr(r.future_value),
                    format_inr(r.total_deposited),
                    format_inr(r.total_interest)
                );
                (text, CalculationResult::Rd(r))
            }

            Intent::RetirementCorpus {
                current_age,
                retirement_age,
                monthly_expenses,
            } => {
                let r = calculate_retirement_corpus(
                    current_age,
                    retirement_age,
                    monthly_expenses,
                    RetirementAssumptions::default(),
                )?;
                let text = format!(
                    "### Retirement corpus\n\nTo cover today's {} a month from age {} you need about **{}**.\n\n- Years to retirement: {}\n- Annual expenses at retirement: {}\n- Monthly SIP needed at {}%: {}\n\nAssumes {}% inflation and {}% return after retirement.",
                    format_inr(r.monthly_expenses),
                    r.retirement_age,
                    format_inr(r.required_corpus),
                    r.years_to_retirement,
                    format_inr(r.future_annual_expenses),
                    r.assumptions.pre_retirement_return,
                    format_inr(r.monthly_sip_required),
                    r.assumptions.inflation_rate,
                    r.assumptions.post_retirement_return
                );
                (text, CalculationResult::RetirementCorpus(r))
            }

            Intent::General => {
                let answer = self.responder.respond(query).await?;
                return Ok(OrchestrationResponse {
                    response: answer.answer,
                    sources: (!answer.sources.is_empty()).then_some(answer.sources),
                    calculation_result: None,
                });
            }
        };

        debug!("Calculator template rendered");

        Ok(OrchestrationResponse {
            response,
            sources: None,
            calculation_result: Some(calculation),
        })
    }

    async fn handle_tax(&self, income: f64, regime: RegimeChoice) -> Result<OrchestrationResponse> {
        let fiscal_year = self.defaults.fiscal_year.clone();

        let (explanation, calculation) = match regime {
            RegimeChoice::Both => {
                let comparison = TaxComparison {
                    new: calculate_tax(income, &fiscal_year, TaxRegime::New),
                    old: calculate_tax(income, &fiscal_year, TaxRegime::Old),
                };
                let context = TaxContext {
                    income,
                    fiscal_year,
                    regime: None,
                };
                let explanation = self.explainer.compare(&comparison, &context).await?;
                (explanation, CalculationResult::TaxComparison(comparison))
            }
            RegimeChoice::New | RegimeChoice::Old => {
                let regime = if regime == RegimeChoice::Old {
                    TaxRegime::Old
                } else {
                    TaxRegime::New
                };
                let result = calculate_tax(income, &fiscal_year, regime);
                let context = TaxContext {
                    income,
                    fiscal_year,
                    regime: Some(regime),
                };
                let explanation = self.explainer.explain(&result, &context).await?;
                (explanation, CalculationResult::Tax(result))
            }
        };

        Ok(OrchestrationResponse {
            response: explanation.text,
            sources: Some(explanation.sources),
            calculation_result: Some(calculation),
        })
    }
}

/// Wire the orchestrator from configuration.
///
/// With a Gemini key every collaborator is model-backed; without one the
/// keyword classifier, template explainer and knowledge-only responder are
/// used so the service still answers offline.
pub fn create_default_orchestrator(config: &AppConfig) -> Result<Orchestrator> {
    let defaults = DispatchDefaults::from_config(config);

    if config.has_llm() {
        let model: Arc<dyn LanguageModel> = Arc::new(GeminiClient::from_config(config)?);
        let extractor: Arc<dyn LanguageModel> =
            Arc::new(GeminiClient::from_config(config)?.with_temperature(CLASSIFIER_TEMPERATURE));
        info!(model = %config.gemini_model, "Using Gemini collaborators");

        return Ok(Orchestrator::new(
            Box::new(GeminiIntentClassifier::new(extractor)),
            Box::new(GeminiTaxExplainer::new(model.clone())),
            GeneralResponder::new(KnowledgeBase::default(), Some(model)),
            defaults,
        ));
    }

    warn!("GEMINI_API_KEY not set, using keyword classifier and templates");
    Ok(Orchestrator::new(
        Box::new(KeywordIntentClassifier),
        Box::new(TemplateTaxExplainer),
        GeneralResponder::new(KnowledgeBase::default(), None),
        defaults,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::OrchestrationError;
    use async_trait::async_trait;

    /// Returns a fixed extraction (or error) whatever the query.
    struct ScriptedClassifier(std::result::Result<IntentExtraction, String>);

    #[async_trait]
    impl IntentClassifier for ScriptedClassifier {
        fn name(&self) -> &'static str {
            "scripted"
        }

        async fn classify(&self, _query: &str) -> Result<IntentExtraction> {
            self.0
                .clone()
                .map_err(OrchestrationError::ClassificationError)
        }
    }

    fn orchestrator(extraction: IntentExtraction) -> Orchestrator {
        Orchestrator::new(
            Box::new(ScriptedClassifier(Ok(extraction))),
            Box::new(TemplateTaxExplainer),
            GeneralResponder::new(KnowledgeBase::default(), None),
            DispatchDefaults::default(),
        )
    }

    fn tax(income: f64, regime: Option<&str>) -> IntentExtraction {
        IntentExtraction {
            intent: IntentTag::Tax,
            income: Some(income),
            regime: regime.map(str::to_string),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_tax_on_15_lakh() {
        let response = orchestrator(tax(1_500_000.0, None))
            .orchestrate("how much tax on 15L")
            .await;

        assert!(response.response.contains("₹1,45,600"));
        assert_eq!(response.sources.as_ref().map(Vec::len), Some(2));
        match response.calculation_result {
            Some(CalculationResult::Tax(result)) => {
                assert_eq!(result.total_tax, 145_600.0);
                assert_eq!(result.taxable_income, 1_450_000.0);
                assert_eq!(result.breakdown_amount("Cess"), Some(5_600.0));
            }
            other => panic!("expected tax result, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_both_regimes_compared() {
        let response = orchestrator(tax(1_500_000.0, Some("both")))
            .orchestrate("15L old vs new")
            .await;

        match response.calculation_result {
            Some(CalculationResult::TaxComparison(comparison)) => {
                assert_eq!(comparison.new.total_tax, 145_600.0);
                assert_eq!(comparison.old.total_tax, 257_400.0);
            }
            other => panic!("expected comparison, got {:?}", other),
        }
        assert!(response.response.contains("saves you"));
    }

    #[tokio::test]
    async fn test_sip_rate_defaults_to_twelve() {
        let extraction = IntentExtraction {
            intent: IntentTag::Sip,
            sip_monthly: Some(5_000.0),
            sip_years: Some(10.0),
            ..Default::default()
        };
        let response = orchestrator(extraction).orchestrate("SIP of 5000 for 10 years").await;

        match response.calculation_result {
            Some(CalculationResult::Sip(result)) => {
                assert_eq!(result.annual_rate, 12.0);
                assert_eq!(result.total_invested, 600_000.0);
            }
            other => panic!("expected SIP result, got {:?}", other),
        }
        assert!(response.sources.is_none());
    }

    #[test]
    fn test_missing_fields_resolve_to_general() {
        let defaults = DispatchDefaults::default();
        let cases = [
            IntentExtraction {
                intent: IntentTag::Tax,
                ..Default::default()
            },
            IntentExtraction {
                intent: IntentTag::Emi,
                emi_principal: Some(1_000_000.0),
                emi_years: Some(20.0),
                ..Default::default()
            },
            IntentExtraction {
                intent: IntentTag::RetirementCorpus,
                ret_current_age: Some(30.0),
                ret_monthly_exp: Some(50_000.0),
                ..Default::default()
            },
        ];
        for extraction in &cases {
            assert_eq!(resolve_intent(extraction, &defaults), Intent::General);
        }
    }

    #[test]
    fn test_deposit_rates_default_to_dynamic_table() {
        let defaults = DispatchDefaults::default();
        let fd = IntentExtraction {
            intent: IntentTag::Fd,
            fd_principal: Some(100_000.0),
            fd_years: Some(5.0),
            ..Default::default()
        };
        assert_eq!(
            resolve_intent(&fd, &defaults),
            Intent::Fd {
                principal: 100_000.0,
                years: 5.0,
                rate: 7.0
            }
        );

        let rd = IntentExtraction {
            intent: IntentTag::Rd,
            rd_monthly: Some(2_000.0),
            rd_months: Some(24.0),
            ..Default::default()
        };
        assert_eq!(
            resolve_intent(&rd, &defaults),
            Intent::Rd {
                monthly: 2_000.0,
                months: 24,
                rate: 6.5
            }
        );
    }

    #[test]
    fn test_unknown_regime_defaults_to_new() {
        let intent = resolve_intent(&tax(900_000.0, Some("whatever")), &DispatchDefaults::default());
        assert_eq!(
            intent,
            Intent::Tax {
                income: 900_000.0,
                regime: RegimeChoice::New
            }
        );
    }

    #[tokio::test]
    async fn test_general_query_uses_knowledge() {
        let response = orchestrator(IntentExtraction::general())
            .orchestrate("what is ppf")
            .await;
        assert!(response.response.contains("Public Provident Fund"));
        assert!(response.calculation_result.is_none());
        assert_eq!(response.sources.as_ref().map(Vec::len), Some(1));
    }

    #[tokio::test]
    async fn test_classifier_failure_becomes_apology() {
        let orchestrator = Orchestrator::new(
            Box::new(ScriptedClassifier(Err("model unavailable".to_string()))),
            Box::new(TemplateTaxExplainer),
            GeneralResponder::new(KnowledgeBase::default(), None),
            DispatchDefaults::default(),
        );
        let response = orchestrator.orchestrate("tax on 15L").await;
        assert!(response.response.starts_with("I'm sorry"));
        assert!(response.response.contains("model unavailable"));
        assert!(response.calculation_result.is_none());
    }

    #[tokio::test]
    async fn test_retirement_corpus_dispatch() {
        let extraction = IntentExtraction {
            intent: IntentTag::RetirementCorpus,
            ret_current_age: Some(30.0),
            ret_retire_age: Some(60.0),
            ret_monthly_exp: Some(50_000.0),
            ..Default::default()
        };
        let response = orchestrator(extraction).orchestrate("retire at 60").await;
        match response.calculation_result {
            Some(CalculationResult::RetirementCorpus(result)) => {
                assert_eq!(result.years_to_retirement, 30);
                assert!(result.required_corpus > 0.0);
            }
            other => panic!("expected retirement result, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_offline_orchestrator_end_to_end() {
        let orchestrator = create_default_orchestrator(&AppConfig::default()).unwrap();
        let response = orchestrator.orchestrate("How much tax on 15L income?").await;
        match response.calculation_result {
            Some(CalculationResult::Tax(result)) => assert_eq!(result.total_tax, 145_600.0),
            other => panic!("expected tax result, got {:?}", other),
        }
    }
}
