//! Local Ollama provider (secondary tier)
//!
//! Sends one plain-text prompt to the `/api/generate` endpoint of a local
//! model server. The whole exchange runs under a hard timeout; when it
//! elapses the in-flight request future is dropped, which aborts it.

use super::types::{Completion, ProviderOutcome, Source};
use super::{ChatProvider, LlmError};
use crate::chat::ChatRequest;
use crate::prompt::build_local_prompt;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const DEFAULT_ENDPOINT: &str = "http://localhost:11434/api/generate";
pub const DEFAULT_MODEL: &str = "llama3.2:1b";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Endpoint, model and decoding parameters for the local provider
#[derive(Debug, Clone)]
pub struct OllamaConfig {
    pub endpoint: String,
    pub model: String,
    pub timeout: Duration,
    pub temperature: f32,
    pub top_p: f32,
    pub max_tokens: u32,
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            model: DEFAULT_MODEL.to_string(),
            timeout: DEFAULT_TIMEOUT,
            temperature: 0.5,
            top_p: 0.8,
            max_tokens: 500,
        }
    }
}

/// Local model server client
pub struct OllamaService {
    client: Client,
    config: OllamaConfig,
}

impl OllamaService {
    pub fn new(config: OllamaConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    fn translate_request(&self, request: &ChatRequest) -> GenerateRequest {
        GenerateRequest {
            model: self.config.model.clone(),
            prompt: build_local_prompt(&request.message, request.context.as_deref()),
            stream: false,
            options: GenerateOptions {
                temperature: self.config.temperature,
                top_p: self.config.top_p,
                max_tokens: self.config.max_tokens,
            },
        }
    }

    /// Generate a completion, bounded by the configured timeout
    pub async fn complete(&self, request: &ChatRequest) -> Result<Completion, LlmError> {
        let body = self.translate_request(request);

        tokio::time::timeout(self.config.timeout, self.send(&body))
            .await
            .map_err(|_| {
                LlmError::timeout(format!(
                    "No response from {} within {}s",
                    self.config.endpoint,
                    self.config.timeout.as_secs_f32()
                ))
            })?
    }

    async fn send(&self, body: &GenerateRequest) -> Result<Completion, LlmError> {
        let response = self
            .client
            .post(&self.config.endpoint)
            .json(body)
            .send()
            .await
            .map_err(|e| LlmError::from_transport(&e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(LlmError::from_status(status, "Ollama API error"));
        }

        let generated: GenerateResponse = response
            .json()
            .await
            .map_err(|e| LlmError::malformed(format!("Failed to parse response: {e}")))?;

        let text = generated
            .response
            .ok_or_else(|| LlmError::malformed("Response has no `response` field"))?;

        Ok(Completion {
            text,
            model: self.config.model.clone(),
        })
    }
}

#[async_trait]
impl ChatProvider for OllamaService {
    async fn generate(&self, request: &ChatRequest) -> ProviderOutcome {
        self.complete(request).await.into()
    }

    fn source(&self) -> Source {
        Source::Secondary
    }

    fn name(&self) -> &str {
        "ollama"
    }
}

// Wire types

#[derive(Debug, Serialize)]
struct GenerateRequest {
    model: String,
    prompt: String,
    stream: bool,
    options: GenerateOptions,
}

#[derive(Debug, Serialize)]
struct GenerateOptions {
    temperature: f32,
    top_p: f32,
    max_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    response: Option<String>,
}
