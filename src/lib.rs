//! Personal Finance Planner
//!
//! Turns a loose description of someone's money situation into a structured
//! monthly plan and keeps it consistent across incremental edits:
//! - Normalizes amounts quoted per week or per year to monthly figures
//! - Extracts income, savings and expenses from free text without a model
//! - Reconciles partial generator output against known-good fallback data
//! - Serializes updates per user so a plan never regresses on failure
//!
//! UPDATE LOOP:
//! INTENT → PROMPT → GENERATE → RECONCILE → COMMIT

pub mod api;
pub mod config;
pub mod error;
pub mod extractor;
pub mod gemini;
pub mod generator;
pub mod intents;
pub mod models;
pub mod normalize;
pub mod orchestrator;
pub mod prompts;
pub mod reconcile;
pub mod state;

pub use error::{PlannerError, Result};

// Re-export common types
pub use extractor::{extract, ExtractedFinancials};
pub use models::*;
pub use normalize::{normalize, Period};
pub use orchestrator::{PlanOrchestrator, UpdateStatus};
pub use reconcile::{reconcile, Fallback};
