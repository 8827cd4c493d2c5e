//! REST API Server for the finance chat orchestrator
//!
//! Exposes chat, direct calculators, reference rates and display
//! preferences over HTTP for the frontend UI.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};

use crate::agent::{DispatchDefaults, Orchestrator};
use crate::calculators::{
    calculate_budget_allocation, calculate_compound_interest, calculate_dti, calculate_emi,
    calculate_fd, calculate_fire, calculate_hra, calculate_portfolio_allocation, calculate_rd,
    calculate_retirement_corpus, calculate_reverse_sip, calculate_sip, calculate_savings_ratio,
    calculate_tax, calculate_term_insurance, RetirementAssumptions, TaxComparison, TaxRegime,
    FD_DEFAULT_FREQUENCY,
};
use crate::knowledge::{dynamic_rates, rate_for, RateKind};
use crate::models::{CalculationResult, RegimeChoice, RiskTolerance};
use crate::preferences::{Preferences, PreferencesStore};

/// =============================
/// Request Models
/// =============================

#[derive(Debug, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

/// Either a transcript (the last user turn is answered) or a bare query.
#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    pub messages: Vec<ChatMessage>,
    pub query: Option<String>,
}

impl ChatRequest {
    fn user_query(&self) -> Option<&str> {
        self.messages
            .iter()
            .rev()
            .find(|m| m.role == "user")
            .map(|m| m.content.as_str())
            .or(self.query.as_deref())
            .filter(|q| !q.trim().is_empty())
    }
}

/// Direct calculator invocation, tagged by `calculator`.
#[derive(Debug, Deserialize)]
#[serde(tag = "calculator", rename_all = "snake_case")]
pub enum CalculationRequest {
    Tax {
        income: f64,
        regime: Option<String>,
    },
    Sip {
        monthly_investment: f64,
        years: f64,
        annual_rate: Option<f64>,
    },
    ReverseSip {
        target_amount: f64,
        years: f64,
        annual_rate: Option<f64>,
    },
    Emi {
        principal: f64,
        years: f64,
        annual_rate: f64,
    },
    CompoundInterest {
        principal: f64,
        years: f64,
        annual_rate: f64,
        compounding_frequency: Option<u32>,
    },
    Budget {
        monthly_income: f64,
    },
    Fd {
        principal: f64,
        years: f64,
        annual_rate: Option<f64>,
        compounding_frequency: Option<u32>,
    },
    Rd {
        monthly_deposit: f64,
        months: u32,
        annual_rate: Option<f64>,
    },
    RetirementCorpus {
        current_age: u32,
        retirement_age: u32,
        monthly_expenses: f64,
        assumptions: Option<RetirementAssumptions>,
    },
    Fire {
        current_age: u32,
        monthly_expenses: f64,
        #[serde(default)]
        current_corpus: f64,
        #[serde(default)]
        monthly_investment: f64,
        expected_return: Option<f64>,
        inflation_rate: Option<f64>,
    },
    Dti {
        monthly_emi: f64,
        monthly_income: f64,
    },
    SavingsRatio {
        monthly_savings: f64,
        monthly_income: f64,
    },
    PortfolioAllocation {
        age: u32,
        risk_tolerance: Option<String>,
    },
    TermInsurance {
        annual_income: f64,
    },
    Hra {
        basic_salary: f64,
        hra_received: f64,
        rent_paid: f64,
        #[serde(default)]
        metro: bool,
    },
}

impl CalculationRequest {
    pub fn compute(self, defaults: &DispatchDefaults) -> crate::Result<CalculationResult> {
        let result = match self {
            CalculationRequest::Tax { income, regime } => {
                let fy = defaults.fiscal_year.as_str();
                match regime.as_deref().and_then(RegimeChoice::parse) {
                    Some(RegimeChoice::Both) => CalculationResult::TaxComparison(TaxComparison {
                        new: calculate_tax(income, fy, TaxRegime::New),
                        old: calculate_tax(income, fy, TaxRegime::Old),
                    }),
                    Some(RegimeChoice::Old) => {
                        CalculationResult::Tax(calculate_tax(income, fy, TaxRegime::Old))
                    }
                    _ => CalculationResult::Tax(calculate_tax(income, fy, TaxRegime::New)),
                }
            }
            CalculationRequest::Sip {
                monthly_investment,
                years,
                annual_rate,
            } => CalculationResult::Sip(calculate_sip(
                monthly_investment,
                years,
                annual_rate.unwrap_or(defaults.sip_rate),
            )),
            CalculationRequest::ReverseSip {
                target_amount,
                years,
                annual_rate,
            } => CalculationResult::ReverseSip(calculate_reverse_sip(
                target_amount,
                years,
                annual_rate.unwrap_or(defaults.sip_rate),
            )),
            CalculationRequest::Emi {
                principal,
                years,
                annual_rate,
            } => CalculationResult::Emi(calculate_emi(principal, years, annual_rate)),
            CalculationRequest::CompoundInterest {
                principal,
                years,
                annual_rate,
                compounding_frequency,
            } => CalculationResult::CompoundInterest(calculate_compound_interest(
                principal,
                annual_rate,
                years,
                compounding_frequency.unwrap_or(1),
            )),
            CalculationRequest::Budget { monthly_income } => {
                CalculationResult::Budget(calculate_budget_allocation(monthly_income))
            }
            CalculationRequest::Fd {
                principal,
                years,
                annual_rate,
                compounding_frequency,
            } => CalculationResult::Fd(calculate_fd(
                principal,
                annual_rate.unwrap_or(defaults.fd_rate),
                years,
                compounding_frequency.unwrap_or(FD_DEFAULT_FREQUENCY),
            )),
            CalculationRequest::Rd {
                monthly_deposit,
                months,
                annual_rate,
            } => CalculationResult::Rd(calculate_rd(
                monthly_deposit,
                months,
                annual_rate.unwrap_or(defaults.rd_rate),
            )),
            CalculationRequest::RetirementCorpus {
                current_age,
                retirement_age,
                monthly_expenses,
                assumptions,
            } => CalculationResult::RetirementCorpus(calculate_retirement_corpus(
                current_age,
                retirement_age,
                monthly_expenses,
                assumptions.unwrap_or_default(),
            )?),
            CalculationRequest::Fire {
                current_age,
                monthly_expenses,
                current_corpus,
                monthly_investment,
                expected_return,
                inflation_rate,
            } => CalculationResult::Fire(calculate_fire(
                current_age,
                monthly_expenses,
                current_corpus,
                monthly_investment,
                expected_return.unwrap_or(defaults.sip_rate),
                inflation_rate.unwrap_or_else(|| rate_for(RateKind::Inflation)),
            )),
            CalculationRequest::Dti {
                monthly_emi,
                monthly_income,
            } => CalculationResult::Dti(calculate_dti(monthly_emi, monthly_income)),
            CalculationRequest::SavingsRatio {
                monthly_savings,
                monthly_income,
            } => CalculationResult::SavingsRatio(calculate_savings_ratio(
                monthly_savings,
                monthly_income,
            )),
            CalculationRequest::PortfolioAllocation {
                age,
                risk_tolerance,
            } => CalculationResult::PortfolioAllocation(calculate_portfolio_allocation(
                age,
                risk_tolerance
                    .as_deref()
                    .map(RiskTolerance::parse)
                    .unwrap_or(RiskTolerance::Medium),
            )),
            CalculationRequest::TermInsurance { annual_income } => {
                CalculationResult::TermInsurance(calculate_term_insurance(annual_income))
            }
            CalculationRequest::Hra {
                basic_salary,
                hra_received,
                rent_paid,
                metro,
            } => CalculationResult::Hra(calculate_hra(basic_salary, hra_received, rent_paid, metro)),
        };
        Ok(result)
    }
}

/// =============================
/// Response Wrapper
/// =============================

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse {
    pub success: bool,
    pub data: Option<serde_json::Value>,
    pub error: Option<String>,
    pub timestamp: String,
}

impl ApiResponse {
    pub fn success<T: Serialize>(data: T) -> Self {
        Self {
            success: true,
            data: serde_json::to_value(data).ok(),
            error: None,
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }

    pub fn error(message: String) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// =============================
/// API State
/// =============================

#[derive(Clone)]
pub struct ApiState {
    pub orchestrator: Arc<Orchestrator>,
    pub preferences: Arc<dyn PreferencesStore>,
}

/// =============================
/// Helpers - Client Ids
/// =============================

fn stable_uuid_from_string(input: &str) -> uuid::Uuid {
    use sha2::{Digest, Sha256};

    let hash = Sha256::digest(input.as_bytes());
    let mut bytes = [0u8; 16];
    bytes.copy_from_slice(&hash[..16]);

    // Set UUID version (4) and variant (RFC4122) bits.
    bytes[6] = (bytes[6] & 0x0f) | 0x40;
    bytes[8] = (bytes[8] & 0x3f) | 0x80;

    uuid::Uuid::from_bytes(bytes)
}

/// Clients may send a UUID or any opaque string; the latter maps to a
/// stable UUID so the same client always hits the same preferences.
fn parse_or_stable_uuid(value: &str) -> uuid::Uuid {
    let value = value.trim();
    uuid::Uuid::parse_str(value).unwrap_or_else(|_| stable_uuid_from_string(value))
}

/// =============================
/// Health Endpoint
/// =============================

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

/// =============================
/// Chat Endpoint
/// =============================

async fn chat_handler(
    State(state): State<ApiState>,
    Json(req): Json<ChatRequest>,
) -> (StatusCode, Json<ApiResponse>) {
    let Some(query) = req.user_query() else {
        return (
            StatusCode::BAD_REQUEST,
            Json(ApiResponse::error("No user message found".into())),
        );
    };

    info!("Received chat query: {}", query);
    let response = state.orchestrator.orchestrate(query).await;

    (StatusCode::OK, Json(ApiResponse::success(response)))
}

/// =============================
/// Calculator Endpoint
/// =============================

async fn calculate_handler(
    State(state): State<ApiState>,
    Json(req): Json<CalculationRequest>,
) -> (StatusCode, Json<ApiResponse>) {
    match req.compute(state.orchestrator.defaults()) {
        Ok(result) => (StatusCode::OK, Json(ApiResponse::success(result))),
        Err(e) => {
            warn!(error = %e, "Calculation rejected");
            (
                StatusCode::BAD_REQUEST,
                Json(ApiResponse::error(e.to_string())),
            )
        }
    }
}

async fn rates_handler() -> Json<ApiResponse> {
    Json(ApiResponse::success(dynamic_rates()))
}

/// =============================
/// Preferences Endpoints
/// =============================

async fn get_preferences(
    State(state): State<ApiState>,
    Path(client_id): Path<String>,
) -> (StatusCode, Json<ApiResponse>) {
    let id = parse_or_stable_uuid(&client_id);
    match state.preferences.load(id).await {
        Ok(preferences) => (
            StatusCode::OK,
            Json(ApiResponse::success(serde_json::json!({
                "client_id": id.to_string(),
                "preferences": preferences,
            }))),
        ),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ApiResponse::error(format!("Failed to load preferences: {}", e))),
        ),
    }
}

async fn put_preferences(
    State(state): State<ApiState>,
    Path(client_id): Path<String>,
    Json(preferences): Json<Preferences>,
) -> (StatusCode, Json<ApiResponse>) {
    let id = parse_or_stable_uuid(&client_id);
    match state.preferences.save(id, preferences).await {
        Ok(()) => (
            StatusCode::OK,
            Json(ApiResponse::success(serde_json::json!({
                "client_id": id.to_string(),
                "preferences": preferences,
            }))),
        ),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ApiResponse::error(format!("Failed to save preferences: {}", e))),
        ),
    }
}

/// =============================
/// Router
/// =============================

pub fn create_router(state: ApiState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/chat", post(chat_handler))
        .route("/api/calculate", post(calculate_handler))
        .route("/api/rates", get(rates_handler))
        .route(
            "/api/preferences/:client_id",
            get(get_preferences).put(put_preferences),
        )
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

/// =============================
/// Server Startup
/// =============================

pub async fn start_server(
    state: ApiState,
    port: u16,
) -> std::result::Result<(), Box<dyn std::error::Error>> {
    let router = create_router(state);

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port)).await?;

    info!("API Server listening on http://0.0.0.0:{}", port);
    info!("Local: http://127.0.0.1:{}", port);

    axum::serve(listener, router).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::create_default_orchestrator;
    use crate::config::AppConfig;
    use crate::preferences::InMemoryPreferencesStore;
    use axum::body::Body;
    use axum::http::{Method, Request};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    fn app() -> Router {
        let orchestrator = create_default_orchestrator(&AppConfig::default()).unwrap();
        create_router(ApiState {
            orchestrator: Arc::new(orchestrator),
            preferences: Arc::new(InMemoryPreferencesStore::new()),
        })
    }

    async fn send(app: Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_health() {
        let (status, body) = send(app(), Method::GET, "/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
    }

    #[tokio::test]
    async fn test_chat_answers_last_user_message() {
        let request = json!({
            "messages": [
                { "role": "user", "content": "what is ppf" },
                { "role": "assistant", "content": "..." },
                { "role": "user", "content": "how much tax on 15L" }
            ]
        });
        let (status, body) = send(app(), Method::POST, "/api/chat", Some(request)).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        assert_eq!(body["data"]["calculationResult"]["type"], "tax");
        assert_eq!(body["data"]["calculationResult"]["data"]["total_tax"], 145_600.0);
    }

    #[tokio::test]
    async fn test_chat_accepts_bare_query() {
        let (status, body) = send(
            app(),
            Method::POST,
            "/api/chat",
            Some(json!({ "query": "budget for 100000 monthly income" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["calculationResult"]["type"], "budget");
        assert_eq!(body["data"]["calculationResult"]["data"]["needs"], 50_000.0);
    }

    #[tokio::test]
    async fn test_chat_without_user_message() {
        let request = json!({ "messages": [{ "role": "assistant", "content": "hi" }] });
        let (status, body) = send(app(), Method::POST, "/api/chat", Some(request)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);
    }

    #[tokio::test]
    async fn test_calculate_emi() {
        let request = json!({
            "calculator": "emi",
            "principal": 1_000_000.0,
            "years": 20.0,
            "annual_rate": 8.5
        });
        let (status, body) = send(app(), Method::POST, "/api/calculate", Some(request)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["type"], "emi");
        assert_eq!(body["data"]["data"]["emi"], 8678.23);
    }

    #[tokio::test]
    async fn test_calculate_rejects_invalid_assumptions() {
        let request = json!({
            "calculator": "retirement_corpus",
            "current_age": 30,
            "retirement_age": 60,
            "monthly_expenses": 50_000.0,
            "assumptions": {
                "inflation_rate": 6.0,
                "life_expectancy": 85,
                "pre_retirement_return": 12.0,
                "post_retirement_return": 5.0
            }
        });
        let (status, body) = send(app(), Method::POST, "/api/calculate", Some(request)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("inflation"));
    }

    #[test]
    fn test_fd_request_uses_dynamic_rate() {
        let req: CalculationRequest = serde_json::from_value(json!({
            "calculator": "fd",
            "principal": 100_000.0,
            "years": 1.0
        }))
        .unwrap();
        match req.compute(&DispatchDefaults::default()).unwrap() {
            CalculationResult::Fd(result) => {
                assert_eq!(result.annual_rate, 7.0);
                assert_eq!(result.compounding_frequency, FD_DEFAULT_FREQUENCY);
            }
            other => panic!("expected FD result, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_rates() {
        let (status, body) = send(app(), Method::GET, "/api/rates", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"].as_array().map(Vec::len), Some(6));
    }

    #[tokio::test]
    async fn test_preferences_round_trip() {
        let app = app();
        let (status, _) = send(
            app.clone(),
            Method::PUT,
            "/api/preferences/browser-abc",
            Some(json!({ "theme": "dark", "font_size": "large" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let (status, body) = send(app, Method::GET, "/api/preferences/browser-abc", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["preferences"]["theme"], "dark");
        assert_eq!(body["data"]["preferences"]["font_size"], "large");
    }

    #[test]
    fn test_stable_client_ids() {
        let a = parse_or_stable_uuid("browser-abc");
        assert_eq!(a, parse_or_stable_uuid(" browser-abc "));
        assert_ne!(a, parse_or_stable_uuid("browser-xyz"));

        let explicit = uuid::Uuid::new_v4();
        assert_eq!(parse_or_stable_uuid(&explicit.to_string()), explicit);
    }
}
