use async_trait::async_trait;
use log::warn;
use serde_json::Value;
use std::sync::Arc;

use crate::core::config::{LlmConfig, LlmProviderKind};

pub mod gemini;

pub use gemini::GeminiClient;

#[async_trait]
pub trait LLMProvider: Send + Sync {
    async fn generate(
        &self,
        prompt: &str,
        config: &Value,
    ) -> Result<String, Box<dyn std::error::Error + Send + Sync>>;
}

pub struct OpenAIClient {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl OpenAIClient {
    pub const DEFAULT_MODEL: &'static str = "gpt-4o-mini";

    pub fn new(api_key: String, base_url: Option<String>, model: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
            base_url: base_url.unwrap_or_else(|| "https://api.openai.com".to_string()),
            model: model.unwrap_or_else(|| Self::DEFAULT_MODEL.to_string()),
        }
    }
}

#[async_trait]
impl LLMProvider for OpenAIClient {
    async fn generate(
        &self,
        prompt: &str,
        config: &Value,
    ) -> Result<String, Box<dyn std::error::Error + Send + Sync>> {
        let max_tokens = config["max_tokens"].as_u64().unwrap_or(32);
        let response = self
            .client
            .post(format!("{}/v1/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&serde_json::json!({
                "model": self.model,
                "messages": [{"role": "user", "content": prompt}],
                "max_tokens": max_tokens
            }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            warn!("OpenAI API error ({}): {}", status, error_text);
            return Err(format!("OpenAI API error: {status}").into());
        }

        let result: Value = response.json().await?;
        result["choices"][0]["message"]["content"]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| "OpenAI response carried no message content".into())
    }
}

/// Builds the configured summarization provider, or `None` when no API key is set.
pub fn build_provider(config: &LlmConfig) -> Option<Arc<dyn LLMProvider>> {
    let api_key = config.api_key()?.to_string();
    let provider: Arc<dyn LLMProvider> = match config.provider {
        LlmProviderKind::Gemini => Arc::new(GeminiClient::new(
            api_key,
            config.base_url.clone(),
            config.model.clone(),
        )),
        LlmProviderKind::OpenAI => Arc::new(OpenAIClient::new(
            api_key,
            config.base_url.clone(),
            config.model.clone(),
        )),
    };
    Some(provider)
}
