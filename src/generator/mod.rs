//! Generator trait and implementations
//!
//! The generator is an external LLM that turns a prompt into a JSON plan.
//! Its output is untrusted: only JSON-parse success is checked here, the
//! reconciler absorbs everything else.

use crate::error::PlannerError;
use crate::Result;
use async_trait::async_trait;
use serde_json::Value;
use tracing::warn;

pub mod gemini;
pub use gemini::GeminiGenerator;

/// Trait for plan generation (LLM controlled)
#[async_trait]
pub trait Generator: Send + Sync {
    /// Return the raw response text for a prompt
    async fn generate(&self, prompt: &str) -> Result<String>;
}

/// Canned generator for development & testing.
/// Keeps the system functional without an LLM dependency.
pub struct StaticGenerator {
    response: String,
}

impl StaticGenerator {
    pub fn new(response: impl Into<String>) -> Self {
        Self {
            response: response.into(),
        }
    }

    /// Always answers `{}`, leaving the plan to the extractor fallback
    pub fn empty() -> Self {
        Self::new("{}")
    }
}

#[async_trait]
impl Generator for StaticGenerator {
    async fn generate(&self, _prompt: &str) -> Result<String> {
        Ok(self.response.clone())
    }
}

/// Parse a generator response into JSON.
///
/// Markdown fences and text around the outermost object are tolerated.
pub fn parse_generator_response(response: &str) -> Result<Value> {
    let cleaned = response
        .trim()
        .trim_start_matches("```json")
        .trim_start_matches("```")
        .trim_end_matches("```")
        .trim();

    if let Ok(value) = serde_json::from_str::<Value>(cleaned) {
        return Ok(value);
    }

    // Prose around the object
    let object = match (cleaned.find('{'), cleaned.rfind('}')) {
        (Some(start), Some(end)) if start < end => &cleaned[start..=end],
        _ => cleaned,
    };

    serde_json::from_str(object).map_err(|e| {
        warn!(error = %e, "Generator returned unparseable response");
        PlannerError::GenerationFailed(format!(
            "Failed to parse generator response: {} | raw={}",
            e, response
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_plain_json() {
        let value = parse_generator_response(r#"{"income": 4000}"#).unwrap();
        assert_eq!(value["income"], 4000);
    }

    #[test]
    fn test_parse_fenced_json() {
        let value = parse_generator_response("```json\n{\"income\": 4000}\n```").unwrap();
        assert_eq!(value["income"], 4000);
    }

    #[test]
    fn test_parse_json_with_prose() {
        let value =
            parse_generator_response("Here is your plan:\n{\"income\": 4000}\nEnjoy!").unwrap();
        assert_eq!(value["income"], 4000);
    }

    #[test]
    fn test_parse_failure_is_generation_error() {
        let err = parse_generator_response("I cannot help with that").unwrap_err();
        assert!(matches!(err, PlannerError::GenerationFailed(_)));
        assert!(err.is_generator_error());
    }

    #[tokio::test]
    async fn test_static_generator() {
        let generator = StaticGenerator::empty();
        let response = generator.generate("anything").await.unwrap();
        assert_eq!(parse_generator_response(&response).unwrap(), serde_json::json!({}));
    }
}
