//! Chat request handling
//!
//! Validates a homework question, records best-effort activity events, runs
//! the provider cascade and falls back to the built-in responder when every
//! provider is unavailable. Provider failures never reach the caller.

use crate::activity::{log_user_activity, ActivitySink, RequestMeta, UserSession};
use crate::fallback::generate_fallback_response;
use crate::llm::{ProviderChain, Source, DEFAULT_MODEL};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use thiserror::Error;

pub const ACTION_CHAT_REQUEST: &str = "AI_CHAT_REQUEST";
pub const ACTION_CHAT_RESPONSE: &str = "AI_CHAT_RESPONSE";
pub const ACTION_CHAT_FALLBACK: &str = "AI_CHAT_FALLBACK";

/// Model reported for built-in answers
pub const FALLBACK_MODEL: &str = "fallback";

/// Advisory note attached to built-in answers
pub const FALLBACK_NOTE: &str =
    "AI service temporarily unavailable. Install Ollama for full AI features.";

const FALLBACK_REASON: &str = "ollama_unavailable";

/// Descriptor of a submitted file
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    pub name: String,
    pub mime_type: String,
    pub size: u64,
    /// Decoded text or data URL, when the client sent one
    pub content: Option<String>,
}

impl Attachment {
    pub fn is_text(&self) -> bool {
        self.mime_type.starts_with("text/")
    }
}

/// A homework question as received from a client
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChatRequest {
    pub message: String,
    pub context: Option<String>,
    pub model: String,
    pub attachments: Vec<Attachment>,
}

impl ChatRequest {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            context: None,
            model: DEFAULT_MODEL.to_string(),
            attachments: Vec::new(),
        }
    }

    pub fn has_context(&self) -> bool {
        self.context.as_deref().is_some_and(|c| !c.is_empty())
    }

    pub fn has_attachments(&self) -> bool {
        !self.attachments.is_empty()
    }

    fn validate(&self) -> Result<(), ChatError> {
        if self.message.is_empty() && self.attachments.is_empty() {
            return Err(ChatError::Validation("Message is required".to_string()));
        }
        Ok(())
    }
}

/// Uniform answer envelope
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatResponse {
    pub text: String,
    pub model_used: String,
    pub source: Source,
    pub note: Option<String>,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ChatError {
    #[error("{0}")]
    Validation(String),
}

/// Who is asking, for activity attribution
#[derive(Debug, Clone, Default)]
pub struct Caller {
    pub session: Option<UserSession>,
    pub meta: RequestMeta,
}

impl Caller {
    pub fn anonymous() -> Self {
        Self::default()
    }
}

/// Provider cascade plus activity recording
#[derive(Clone)]
pub struct ChatService {
    providers: ProviderChain,
    activity: Arc<dyn ActivitySink>,
}

impl ChatService {
    pub fn new(providers: ProviderChain, activity: Arc<dyn ActivitySink>) -> Self {
        Self {
            providers,
            activity,
        }
    }

    pub fn providers(&self) -> &ProviderChain {
        &self.providers
    }

    /// Answer one request. Only validation can fail.
    pub async fn respond(
        &self,
        request: &ChatRequest,
        caller: &Caller,
    ) -> Result<ChatResponse, ChatError> {
        request.validate()?;

        self.record(
            caller,
            ACTION_CHAT_REQUEST,
            json!({
                "messageLength": request.message.chars().count(),
                "hasContext": request.has_context(),
                "model": request.model,
                "hasAttachments": request.has_attachments(),
                "timestamp": chrono::Utc::now().to_rfc3339(),
            }),
        );

        if let Some(dispatched) = self.providers.dispatch(request).await {
            self.record(
                caller,
                ACTION_CHAT_RESPONSE,
                json!({
                    "responseLength": dispatched.text.chars().count(),
                    "model": dispatched.model,
                    "success": true,
                    "hasAttachments": request.has_attachments(),
                }),
            );
            return Ok(ChatResponse {
                text: dispatched.text,
                model_used: dispatched.model,
                source: dispatched.source,
                note: None,
            });
        }

        tracing::info!(
            message_len = request.message.len(),
            "All providers unavailable, using built-in responder"
        );
        self.record(
            caller,
            ACTION_CHAT_FALLBACK,
            json!({
                "reason": FALLBACK_REASON,
                "messageLength": request.message.chars().count(),
            }),
        );

        Ok(ChatResponse {
            text: generate_fallback_response(&request.message, request.context.as_deref()),
            model_used: FALLBACK_MODEL.to_string(),
            source: Source::Fallback,
            note: Some(FALLBACK_NOTE.to_string()),
        })
    }

    fn record(&self, caller: &Caller, action: &str, details: Value) {
        if let Err(e) = log_user_activity(
            self.activity.as_ref(),
            caller.session.as_ref(),
            action,
            details,
            Some(&caller.meta),
        ) {
            tracing::debug!(error = %e, action, "Activity logging failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::activity::MemoryActivityLog;
    use crate::llm::ChatProvider;
    use crate::runtime::testing::{FailingActivitySink, FakeProvider};

    fn caller() -> Caller {
        Caller {
            session: Some(UserSession {
                id: Some("u-1".to_string()),
                email: Some("student@example.com".to_string()),
                name: Some("Student".to_string()),
            }),
            meta: RequestMeta::default(),
        }
    }

    fn service(
        providers: Vec<Arc<dyn ChatProvider>>,
        log: Arc<MemoryActivityLog>,
    ) -> ChatService {
        ChatService::new(ProviderChain::new(providers), log)
    }

    #[tokio::test]
    async fn test_empty_message_without_attachments_is_rejected() {
        let log = Arc::new(MemoryActivityLog::default());
        let chat = service(vec![], log.clone());

        let err = chat
            .respond(&ChatRequest::new(""), &caller())
            .await
            .unwrap_err();
        assert_eq!(err, ChatError::Validation("Message is required".to_string()));
        assert!(log.is_empty());
    }

    #[tokio::test]
    async fn test_whitespace_message_is_answered() {
        let log = Arc::new(MemoryActivityLog::default());
        let chat = service(vec![], log.clone());

        let response = chat
            .respond(&ChatRequest::new("   \n"), &caller())
            .await
            .unwrap();
        assert_eq!(response.source, Source::Fallback);
        assert!(!response.text.is_empty());
    }

    #[tokio::test]
    async fn test_attachment_only_request_is_accepted() {
        let log = Arc::new(MemoryActivityLog::default());
        let chat = service(vec![], log);
        let mut request = ChatRequest::new("");
        request.attachments.push(Attachment {
            name: "notes.txt".to_string(),
            mime_type: "text/plain".to_string(),
            size: 12,
            content: Some("cell biology".to_string()),
        });

        let response = chat.respond(&request, &caller()).await.unwrap();
        assert_eq!(response.source, Source::Fallback);
    }

    #[tokio::test]
    async fn test_primary_success_has_no_note() {
        let log = Arc::new(MemoryActivityLog::default());
        let primary = Arc::new(FakeProvider::answering(Source::Primary, "Plants use light."));
        let chat = service(vec![primary as Arc<dyn ChatProvider>], log.clone());

        let response = chat
            .respond(&ChatRequest::new("Explain photosynthesis"), &caller())
            .await
            .unwrap();
        assert_eq!(response.text, "Plants use light.");
        assert_eq!(response.source, Source::Primary);
        assert_eq!(response.model_used, "fake-model");
        assert!(response.note.is_none());

        assert_eq!(log.by_action(ACTION_CHAT_REQUEST).unwrap().len(), 1);
        let responses = log.by_action(ACTION_CHAT_RESPONSE).unwrap();
        assert_eq!(responses.len(), 1);
        assert_eq!(responses[0].details["responseLength"], 17);
        assert!(log.by_action(ACTION_CHAT_FALLBACK).unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_all_providers_unavailable_uses_fallback() {
        let log = Arc::new(MemoryActivityLog::default());
        let chat = service(
            vec![
                Arc::new(FakeProvider::unavailable(Source::Primary)) as Arc<dyn ChatProvider>,
                Arc::new(FakeProvider::unavailable(Source::Secondary)),
            ],
            log.clone(),
        );
        let mut request = ChatRequest::new("How do I solve this equation: 2x + 5 = 13?");
        request.context = Some("Algebra homework".to_string());

        let response = chat.respond(&request, &caller()).await.unwrap();
        assert_eq!(response.source, Source::Fallback);
        assert_eq!(response.model_used, "fallback");
        assert_eq!(response.note.as_deref(), Some(FALLBACK_NOTE));
        assert!(response.text.contains("Algebra homework"));

        let fallback = log.by_action(ACTION_CHAT_FALLBACK).unwrap();
        assert_eq!(fallback.len(), 1);
        assert_eq!(fallback[0].details["reason"], "ollama_unavailable");
        assert!(log.by_action(ACTION_CHAT_RESPONSE).unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_request_event_details() {
        let log = Arc::new(MemoryActivityLog::default());
        let chat = service(vec![], log.clone());
        let mut request = ChatRequest::new("essay help");
        request.context = Some("English".to_string());
        request.model = "gpt-4o".to_string();

        chat.respond(&request, &caller()).await.unwrap();
        let entries = log.by_action(ACTION_CHAT_REQUEST).unwrap();
        let details = &entries[0].details;
        assert_eq!(details["messageLength"], 10);
        assert_eq!(details["hasContext"], true);
        assert_eq!(details["model"], "gpt-4o");
        assert_eq!(details["hasAttachments"], false);
        assert!(details["timestamp"].is_string());
        assert_eq!(entries[0].user_id, "u-1");
    }

    #[tokio::test]
    async fn test_activity_failures_are_swallowed() {
        let primary = Arc::new(FakeProvider::answering(Source::Primary, "answer"));
        let chat = ChatService::new(
            ProviderChain::new(vec![primary as Arc<dyn ChatProvider>]),
            Arc::new(FailingActivitySink::default()),
        );

        let response = chat
            .respond(&ChatRequest::new("What is a cell?"), &caller())
            .await
            .unwrap();
        assert_eq!(response.text, "answer");
    }

    #[tokio::test]
    async fn test_anonymous_caller_is_not_logged() {
        let log = Arc::new(MemoryActivityLog::default());
        let chat = service(vec![], log.clone());
        chat.respond(&ChatRequest::new("hello"), &Caller::anonymous())
            .await
            .unwrap();
        assert!(log.is_empty());
    }

    #[tokio::test]
    async fn test_fallback_is_idempotent() {
        let chat = service(vec![], Arc::new(MemoryActivityLog::default()));
        let request = ChatRequest::new("Help with my science experiment");
        let first = chat.respond(&request, &caller()).await.unwrap();
        let second = chat.respond(&request, &caller()).await.unwrap();
        assert_eq!(first, second);
    }
}
