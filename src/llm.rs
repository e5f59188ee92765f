//! AI provider abstraction
//!
//! Each provider is a strategy that answers a homework question or reports
//! itself unavailable. The `ProviderChain` tries them in order.

mod error;
pub mod models;
pub mod ollama;
pub mod openai;
mod registry;
mod types;

pub use error::{LlmError, LlmErrorKind};
pub use models::{all_models, find_model, ModelDef, DEFAULT_MODEL};
pub use ollama::{OllamaConfig, OllamaService};
pub use openai::{OpenAIConfig, OpenAIService};
pub use registry::{LlmConfig, ProviderChain};
pub use types::*;

use crate::chat::ChatRequest;
use async_trait::async_trait;
use std::sync::Arc;

/// Common interface for AI providers
#[async_trait]
pub trait ChatProvider: Send + Sync {
    /// Attempt to answer. Failures of any kind come back as `Unavailable`.
    async fn generate(&self, request: &ChatRequest) -> ProviderOutcome;

    /// Cascade tier this provider belongs to
    fn source(&self) -> Source;

    /// Short name for logs
    fn name(&self) -> &str;
}

/// Logging wrapper for providers
pub struct LoggingProvider {
    inner: Arc<dyn ChatProvider>,
    name: String,
}

impl LoggingProvider {
    pub fn new(inner: Arc<dyn ChatProvider>) -> Self {
        let name = inner.name().to_string();
        Self { inner, name }
    }
}

#[async_trait]
impl ChatProvider for LoggingProvider {
    async fn generate(&self, request: &ChatRequest) -> ProviderOutcome {
        let start = std::time::Instant::now();
        let outcome = self.inner.generate(request).await;
        let duration = start.elapsed();

        match &outcome {
            ProviderOutcome::Success { text, model } => {
                tracing::info!(
                    provider = %self.name,
                    model = %model,
                    duration_ms = %duration.as_millis(),
                    response_len = text.len(),
                    "Provider answered"
                );
            }
            ProviderOutcome::Unavailable { reason } => {
                tracing::warn!(
                    provider = %self.name,
                    duration_ms = %duration.as_millis(),
                    reason = %reason,
                    "Provider unavailable"
                );
            }
        }

        outcome
    }

    fn source(&self) -> Source {
        self.inner.source()
    }

    fn name(&self) -> &str {
        &self.name
    }
}
