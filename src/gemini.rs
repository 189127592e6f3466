//! Gemini API client
//!
//! Thin REST client used by the plan generator. Uses a long-lived
//! reqwest::Client for connection pooling.

use crate::error::PlannerError;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{error, info, warn};

const BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/models";
pub const DEFAULT_MODEL: &str = "gemini-2.0-flash";

/// Reusable Gemini client (connection-pooled)
pub struct GeminiClient {
    client: Client,
    api_key: String,
    url: String,
}

impl GeminiClient {
    pub fn new(api_key: String, model: &str) -> Self {
        let client = Client::builder()
            .pool_idle_timeout(Duration::from_secs(90))
            .pool_max_idle_per_host(8)
            .timeout(Duration::from_secs(120))
            .build()
            .unwrap_or_default();

        Self {
            client,
            api_key,
            url: format!("{}/{}:generateContent", BASE_URL, model),
        }
    }

    /// Send one prompt and return the raw text of the first candidate.
    /// The model is asked for a JSON response body.
    pub async fn generate(&self, prompt: &str) -> crate::Result<String> {
        if self.api_key.is_empty() {
            return Err(PlannerError::GeneratorUnavailable(
                "GEMINI_API_KEY not configured".to_string(),
            ));
        }

        let url = format!("{}?key={}", self.url, self.api_key);

        let request = GeminiRequest {
            contents: vec![Content {
                parts: vec![Part {
                    text: prompt.to_string(),
                }],
            }],
            generation_config: GenerationConfig {
                temperature: 0.4,
                top_p: 0.9,
                top_k: 40,
                max_output_tokens: 4096,
                response_mime_type: "application/json".to_string(),
            },
        };

        info!(prompt_chars = prompt.len(), "Calling Gemini API");

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                error!("Gemini API request failed: {}", e);
                PlannerError::GenerationFailed(format!("Gemini API error: {}", e))
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            error!(%status, "Gemini API error response: {}", error_text);
            return Err(PlannerError::GenerationFailed(format!(
                "Gemini API error ({}): {}",
                status, error_text
            )));
        }

        let gemini_response: GeminiResponse = response.json().await.map_err(|e| {
            error!("Failed to parse Gemini response: {}", e);
            PlannerError::GenerationFailed(format!("Gemini parse error: {}", e))
        })?;

        let candidate = gemini_response.candidates.into_iter().next().ok_or_else(|| {
            PlannerError::GenerationFailed("No response from Gemini API".to_string())
        })?;

        if candidate.finish_reason.as_deref() != Some("STOP") {
            warn!(
                finish_reason = ?candidate.finish_reason,
                "Gemini response did not finish cleanly"
            );
        }

        let text = candidate
            .content
            .parts
            .into_iter()
            .next()
            .map(|p| p.text)
            .ok_or_else(|| PlannerError::GenerationFailed("Empty response from Gemini".to_string()))?;

        info!(response_chars = text.len(), "Gemini response received");

        Ok(text)
    }
}

#[derive(Debug, Serialize)]
struct GeminiRequest {
    contents: Vec<Content>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Part {
    text: String,
}

#[derive(Debug, Serialize)]
struct GenerationConfig {
    temperature: f32,
    top_p: f32,
    top_k: i32,
    max_output_tokens: i32,
    response_mime_type: String,
}

#[derive(Debug, Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Content,
    #[serde(alias = "finishReason")]
    finish_reason: Option<String>,
}
