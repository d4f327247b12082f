//! Chat-completion clients used to phrase answers.
//!
//! The engine only sees the [`GenerationProvider`] trait. The concrete
//! [`OpenAICompatibleGenerator`] talks to any `/chat/completions` endpoint:
//! Groq by default, OpenAI, or a custom base URL.

use std::time::Duration;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use docbot_core::models::TokenUsage;

use crate::config::LlmConfig;
use crate::http;

/// One completion call: a system prompt plus the user's message.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    pub system_prompt: String,
    pub user_message: String,
    pub max_tokens: u32,
    pub temperature: f32,
}

/// Generated text and the tokens it cost.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Completion {
    pub text: String,
    pub usage: TokenUsage,
}

/// A text-generation backend.
#[async_trait]
pub trait GenerationProvider: Send + Sync {
    /// Model identifier, for logs.
    fn model_name(&self) -> &str;

    async fn complete(&self, request: &CompletionRequest) -> Result<Completion>;
}

/// Client for OpenAI-style chat completion APIs.
pub struct OpenAICompatibleGenerator {
    model: String,
    endpoint: String,
    api_key: String,
    max_retries: u32,
    timeout: Duration,
    client: reqwest::Client,
}

impl OpenAICompatibleGenerator {
    /// # Errors
    ///
    /// Fails when the API key environment variable for the configured
    /// provider is unset or empty.
    pub fn new(config: &LlmConfig) -> Result<Self> {
        let key_var = config.resolved_api_key_env();
        let api_key = std::env::var(&key_var)
            .ok()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| anyhow!("{} environment variable not set", key_var))?;

        Ok(Self {
            model: config.model.clone(),
            endpoint: format!("{}/chat/completions", config.resolved_base_url()),
            api_key,
            max_retries: config.max_retries,
            timeout: Duration::from_secs(config.timeout_secs),
            client: http::client(config.timeout_secs)?,
        })
    }
}

#[async_trait]
impl GenerationProvider for OpenAICompatibleGenerator {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<Completion> {
        let body = serde_json::json!({
            "model": self.model,
            "messages": [
                {"role": "system", "content": request.system_prompt},
                {"role": "user", "content": request.user_message},
            ],
            "max_tokens": request.max_tokens,
            "temperature": request.temperature,
        });

        // The per-request client timeout bounds each attempt; this bounds
        // the whole retry sequence.
        let total = self.timeout.saturating_mul(self.max_retries.saturating_add(1));
        let json = tokio::time::timeout(
            total,
            http::post_json_with_retry(
                &self.client,
                &self.endpoint,
                Some(&self.api_key),
                &body,
                self.max_retries,
                "LLM",
            ),
        )
        .await
        .map_err(|_| anyhow!("LLM request timed out after {:?}", total))??;

        parse_chat_response(&json)
    }
}

fn parse_chat_response(json: &serde_json::Value) -> Result<Completion> {
    let text = json
        .pointer("/choices/0/message/content")
        .and_then(|c| c.as_str())
        .ok_or_else(|| anyhow!("Invalid LLM response: missing choices[0].message.content"))?
        .trim()
        .to_string();

    let usage = json
        .get("usage")
        .map(|u| TokenUsage {
            input_tokens: u.get("prompt_tokens").and_then(|v| v.as_u64()).unwrap_or(0),
            output_tokens: u
                .get("completion_tokens")
                .and_then(|v| v.as_u64())
                .unwrap_or(0),
            requests: 1,
        })
        .unwrap_or(TokenUsage {
            requests: 1,
            ..TokenUsage::default()
        });

    Ok(Completion { text, usage })
}
