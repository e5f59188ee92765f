//! Provider configuration and the ordered provider cascade

use super::{
    ChatProvider, Dispatched, LoggingProvider, OllamaConfig, OllamaService, OpenAIConfig,
    OpenAIService, ProviderOutcome,
};
use crate::chat::ChatRequest;
use std::sync::Arc;

/// Configuration for AI providers
#[derive(Debug, Clone, Default)]
pub struct LlmConfig {
    /// Hosted provider settings; `None` skips the primary tier entirely
    pub openai: Option<OpenAIConfig>,
    /// Local provider settings; `None` skips the secondary tier
    pub ollama: Option<OllamaConfig>,
}

impl LlmConfig {
    pub fn from_env() -> Self {
        let openai = std::env::var("OPENAI_API_KEY")
            .ok()
            .filter(|key| !key.is_empty())
            .map(|key| {
                let mut config = OpenAIConfig::new(key);
                if let Ok(base_url) = std::env::var("OPENAI_BASE_URL") {
                    config.base_url = base_url;
                }
                config
            });

        let mut ollama = OllamaConfig::default();
        if let Ok(endpoint) = std::env::var("OLLAMA_URL") {
            ollama.endpoint = endpoint;
        }
        if let Ok(model) = std::env::var("OLLAMA_MODEL") {
            ollama.model = model;
        }

        Self {
            openai,
            ollama: Some(ollama),
        }
    }
}

/// Ordered list of providers; the first success wins
#[derive(Clone, Default)]
pub struct ProviderChain {
    providers: Vec<Arc<dyn ChatProvider>>,
}

impl ProviderChain {
    /// Chain from explicit strategies, tried in the given order
    pub fn new(providers: Vec<Arc<dyn ChatProvider>>) -> Self {
        Self { providers }
    }

    /// Build the production cascade: hosted first, then local
    pub fn from_config(config: &LlmConfig) -> Self {
        let mut providers: Vec<Arc<dyn ChatProvider>> = Vec::new();

        if let Some(openai) = &config.openai {
            match OpenAIService::new(openai) {
                Ok(service) => providers.push(Arc::new(LoggingProvider::new(Arc::new(service)))),
                Err(e) => tracing::warn!(error = %e, "Hosted provider disabled"),
            }
        }

        if let Some(ollama) = &config.ollama {
            let service = OllamaService::new(ollama.clone());
            providers.push(Arc::new(LoggingProvider::new(Arc::new(service))));
        }

        Self { providers }
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    /// Provider names in cascade order
    pub fn names(&self) -> Vec<String> {
        self.providers.iter().map(|p| p.name().to_string()).collect()
    }

    /// Try each provider in turn, one at a time. `None` means every
    /// provider was unavailable.
    pub async fn dispatch(&self, request: &ChatRequest) -> Option<Dispatched> {
        for provider in &self.providers {
            match provider.generate(request).await {
                ProviderOutcome::Success { text, model } => {
                    return Some(Dispatched {
                        source: provider.source(),
                        text,
                        model,
                    });
                }
                ProviderOutcome::Unavailable { reason } => {
                    tracing::debug!(provider = %provider.name(), %reason, "Trying next provider");
                }
            }
        }
        None
    }
}
