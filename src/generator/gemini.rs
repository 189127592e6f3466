//! Gemini-powered plan generator

use crate::gemini::GeminiClient;
use crate::Result;
use async_trait::async_trait;

pub struct GeminiGenerator {
    client: GeminiClient,
}

impl GeminiGenerator {
    pub fn new(api_key: String, model: &str) -> Self {
        Self {
            client: GeminiClient::new(api_key, model),
        }
    }
}

#[async_trait]
impl crate::generator::Generator for GeminiGenerator {
    async fn generate(&self, prompt: &str) -> Result<String> {
        self.client.generate(prompt).await
    }
}
