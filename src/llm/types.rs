//! Common types for provider interactions

use super::LlmError;
use serde::{Deserialize, Serialize};

/// Which tier of the cascade produced an answer.
///
/// Serialized with the names clients see in the `source` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Source {
    /// Hosted chat-completion API
    #[serde(rename = "openai")]
    Primary,
    /// Local model server
    #[serde(rename = "ollama")]
    Secondary,
    /// Built-in template responder
    #[serde(rename = "built-in")]
    Fallback,
}

impl Source {
    pub fn as_str(self) -> &'static str {
        match self {
            Source::Primary => "openai",
            Source::Secondary => "ollama",
            Source::Fallback => "built-in",
        }
    }
}

/// Text produced by a provider, with the model that produced it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completion {
    pub text: String,
    pub model: String,
}

/// Tagged result of a single provider attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderOutcome {
    Success { text: String, model: String },
    Unavailable { reason: String },
}

impl ProviderOutcome {
    pub fn unavailable(reason: impl Into<String>) -> Self {
        ProviderOutcome::Unavailable {
            reason: reason.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, ProviderOutcome::Success { .. })
    }
}

impl From<Result<Completion, LlmError>> for ProviderOutcome {
    fn from(result: Result<Completion, LlmError>) -> Self {
        match result {
            Ok(Completion { text, model }) => ProviderOutcome::Success { text, model },
            Err(e) => ProviderOutcome::Unavailable {
                reason: format!("{}: {}", e.kind.as_str(), e.message),
            },
        }
    }
}

/// Answer chosen by the provider cascade
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dispatched {
    pub source: Source,
    pub text: String,
    pub model: String,
}
