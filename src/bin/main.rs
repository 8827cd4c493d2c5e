use finance_chat_orchestrator::{agent::create_default_orchestrator, config::AppConfig};
use tracing::info;
use tracing_subscriber::EnvFilter;

const USAGE: &str = "usage: orchestrator <question...>\n\nexample: orchestrator \"how much tax on 15L under the new regime\"";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    let query = std::env::args().skip(1).collect::<Vec<_>>().join(" ");
    if query.trim().is_empty() {
        eprintln!("{}", USAGE);
        std::process::exit(2);
    }

    let config = AppConfig::from_env()?;
    let orchestrator = create_default_orchestrator(&config)?;

    info!(query = %query, "Running orchestrator");
    let response = orchestrator.orchestrate(&query).await;

    println!("{}", response.response);

    if let Some(sources) = &response.sources {
        println!("\nSources:");
        for source in sources {
            println!("  - {} ({}, updated {})", source.name, source.url, source.last_updated);
        }
    }

    if let Some(calculation) = &response.calculation_result {
        println!("\n=== CALCULATION ===");
        println!("{}", serde_json::to_string_pretty(calculation)?);
    }

    Ok(())
}
