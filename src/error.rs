//! Error types for the finance planner

use thiserror::Error;

/// Result type alias for planner operations
pub type Result<T> = std::result::Result<T, PlannerError>;

#[derive(Error, Debug)]
pub enum PlannerError {

    // =============================
    // Generator Errors
    // =============================

    #[error("Generation failed: {0}")]
    GenerationFailed(String),

    #[error("Generator unavailable: {0}")]
    GeneratorUnavailable(String),

    // =============================
    // Update Errors
    // =============================

    #[error("Nothing to update: no field differs from the current plan")]
    NothingToUpdate,

    #[error("An update is already in progress for this user")]
    UpdateInProgress,

    #[error("No plan exists yet for this user")]
    NoPlan,

    #[error("Item not found: {0}")]
    ItemNotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    // =============================
    // Storage & Config Errors
    // =============================

    #[error("State persistence error: {0}")]
    StateError(String),

    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Configuration error: {0}")]
    Config(String),

    // =============================
    // External Library Conversions
    // =============================

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("HTTP client error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl PlannerError {
    /// True for failures of the external generator call. These are local to
    /// one request and never touch reconciled state.
    pub fn is_generator_error(&self) -> bool {
        matches!(
            self,
            PlannerError::GenerationFailed(_)
                | PlannerError::GeneratorUnavailable(_)
                | PlannerError::HttpError(_)
        )
    }
}
