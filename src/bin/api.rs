use finance_planner::{
    api::start_server,
    config::AppConfig,
    generator::gemini::GeminiGenerator,
    orchestrator::PlanOrchestrator,
    state::{InMemoryPlanStore, PlanStore, PostgresPlanStore},
};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = AppConfig::from_env()?;

    info!("Finance Planner - API Server");
    info!("Port: {}", config.port);
    info!("Model: {}", config.gemini_model);

    let api_key = config.gemini_api_key.clone().unwrap_or_else(|| {
        warn!("GEMINI_API_KEY not set; plan generation requests will fail");
        String::new()
    });
    let generator = Box::new(GeminiGenerator::new(api_key, &config.gemini_model));

    let store: Box<dyn PlanStore> = match &config.database_url {
        Some(url) => Box::new(PostgresPlanStore::connect_lazy(url)?),
        None => {
            info!("DATABASE_URL not set; plans are kept in memory");
            Box::new(InMemoryPlanStore::new())
        }
    };

    let orchestrator = Arc::new(PlanOrchestrator::new(generator, store));

    info!("Orchestrator initialized");

    start_server(orchestrator, config.port).await?;

    Ok(())
}
