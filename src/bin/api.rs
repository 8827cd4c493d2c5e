use finance_chat_orchestrator::{
    agent::create_default_orchestrator,
    api::{start_server, ApiState},
    config::AppConfig,
    preferences::InMemoryPreferencesStore,
};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load environment variables
    dotenv::dotenv().ok();

    // Initialize tracing (RUST_LOG overrides the default level)
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = AppConfig::from_env()?;
    if !config.has_llm() {
        eprintln!("⚠️  GEMINI_API_KEY not set in .env, running with offline classifier");
        eprintln!("📌 See .env.example for setup instructions");
    }

    info!("🚀 Finance Chat Orchestrator - API Server");
    info!("📍 Port: {}", config.port);
    info!("📅 Fiscal year: {}", config.fiscal_year);

    let orchestrator = Arc::new(create_default_orchestrator(&config)?);
    let state = ApiState {
        orchestrator,
        preferences: Arc::new(InMemoryPreferencesStore::new()),
    };

    info!("✅ Orchestrator initialized");
    info!("📡 Starting API server...");

    start_server(state, config.port).await?;

    Ok(())
}
