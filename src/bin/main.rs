//! One-shot planner: reads a money description from the arguments, one line
//! per argument (or stdin when none are given) and prints the reconciled
//! plan as JSON.

use finance_planner::{
    config::AppConfig,
    generator::{gemini::GeminiGenerator, Generator, StaticGenerator},
    orchestrator::PlanOrchestrator,
    state::InMemoryPlanStore,
};
use std::io::Read;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

const CLI_USER: &str = "cli-user";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Logs go to stderr so stdout stays valid JSON
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = AppConfig::from_env()?;

    let args: Vec<String> = std::env::args().skip(1).collect();
    let text = if args.is_empty() {
        let mut buffer = String::new();
        std::io::stdin().read_to_string(&mut buffer)?;
        buffer
    } else {
        text_from_args(&args)
    };

    // Without a key the plan is built from extraction and defaults alone
    let generator: Box<dyn Generator> = match config.gemini_api_key {
        Some(key) => Box::new(GeminiGenerator::new(key, &config.gemini_model)),
        None => {
            warn!("GEMINI_API_KEY not set; building plan from extracted figures only");
            Box::new(StaticGenerator::empty())
        }
    };

    let orchestrator = PlanOrchestrator::new(generator, Box::new(InMemoryPlanStore::new()));

    info!(chars = text.len(), "Generating plan");
    let data = orchestrator.generate(CLI_USER, &text).await?;

    println!("{}", serde_json::to_string_pretty(&data)?);

    Ok(())
}

/// Each argument is one line of the description
fn text_from_args(args: &[String]) -> String {
    args.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use finance_planner::extract;

    #[test]
    fn test_each_argument_is_a_line() {
        let args = vec!["Rent: $1500".to_string(), "Groceries: $400".to_string()];
        let extracted = extract(&text_from_args(&args));
        assert_eq!(extracted.expenses.len(), 2);
    }
}
