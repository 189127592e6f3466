//! Environment configuration
//!
//! Values come from the process environment, optionally seeded from `.env`.

use crate::error::PlannerError;
use crate::gemini::DEFAULT_MODEL;
use crate::Result;

pub const DEFAULT_PORT: u16 = 8080;

#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    /// Missing key: the server starts, generation calls fail
    pub gemini_api_key: Option<String>,
    pub gemini_model: String,
    pub port: u16,
    /// Postgres when set, in-memory store otherwise
    pub database_url: Option<String>,
}

impl AppConfig {
    /// Load `.env` (if present) and read the environment
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let port = match non_empty("PORT").or_else(|| non_empty("API_PORT")) {
            Some(raw) => raw
                .trim()
                .parse()
                .map_err(|_| PlannerError::Config(format!("Invalid port: {}", raw)))?,
            None => DEFAULT_PORT,
        };

        Ok(Self {
            gemini_api_key: non_empty("GEMINI_API_KEY"),
            gemini_model: non_empty("GEMINI_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            port,
            database_url: non_empty("DATABASE_URL"),
        })
    }
}
