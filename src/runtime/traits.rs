//! Trait abstractions for runtime I/O
//!
//! These traits enable testing the client with mock implementations.

use crate::api::{ChatResponseBody, ErrorResponse, OutgoingChatBody};
use crate::chat::{Caller, ChatError, ChatRequest, ChatResponse, ChatService};
use crate::db::{Conversation, Database};
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("Chat service unreachable: {0}")]
    Transport(String),
    #[error("Chat service returned {status}: {message}")]
    Status { status: u16, message: String },
    #[error("Request rejected: {0}")]
    Rejected(String),
}

/// Something that answers chat requests
#[async_trait]
pub trait ChatBackend: Send + Sync {
    async fn send(&self, request: &ChatRequest) -> Result<ChatResponse, BackendError>;
}

/// Durable storage for conversations
#[async_trait]
pub trait ConversationStore: Send + Sync {
    /// Write the conversation and all of its messages
    async fn save(&self, conversation: &Conversation) -> Result<(), String>;

    /// Every stored conversation, newest first
    async fn load_all(&self) -> Result<Vec<Conversation>, String>;

    async fn delete(&self, conversation_id: &str) -> Result<(), String>;
}

// ============================================================================
// Arc implementations for trait objects
// ============================================================================

#[async_trait]
impl<T: ChatBackend + ?Sized> ChatBackend for Arc<T> {
    async fn send(&self, request: &ChatRequest) -> Result<ChatResponse, BackendError> {
        (**self).send(request).await
    }
}

#[async_trait]
impl<T: ConversationStore + ?Sized> ConversationStore for Arc<T> {
    async fn save(&self, conversation: &Conversation) -> Result<(), String> {
        (**self).save(conversation).await
    }

    async fn load_all(&self) -> Result<Vec<Conversation>, String> {
        (**self).load_all().await
    }

    async fn delete(&self, conversation_id: &str) -> Result<(), String> {
        (**self).delete(conversation_id).await
    }
}

// ============================================================================
// Production Adapters
// ============================================================================

/// Talks to a running server over `POST {base}/api/chat`
pub struct HttpChatBackend {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpChatBackend {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: format!("{}/api/chat", base_url.trim_end_matches('/')),
        }
    }
}

#[async_trait]
impl ChatBackend for HttpChatBackend {
    async fn send(&self, request: &ChatRequest) -> Result<ChatResponse, BackendError> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(&OutgoingChatBody::from(request))
            .send()
            .await
            .map_err(|e| BackendError::Transport(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            let body: ChatResponseBody = response
                .json()
                .await
                .map_err(|e| BackendError::Transport(format!("Malformed response: {e}")))?;
            return Ok(body.into());
        }

        let message = response
            .json::<ErrorResponse>()
            .await
            .map_or_else(|_| status.to_string(), |e| e.error);
        Err(BackendError::Status {
            status: status.as_u16(),
            message,
        })
    }
}

/// Runs the chat service in-process
#[derive(Clone)]
pub struct ServiceBackend {
    service: ChatService,
    caller: Caller,
}

impl ServiceBackend {
    pub fn new(service: ChatService, caller: Caller) -> Self {
        Self { service, caller }
    }
}

#[async_trait]
impl ChatBackend for ServiceBackend {
    async fn send(&self, request: &ChatRequest) -> Result<ChatResponse, BackendError> {
        self.service
            .respond(request, &self.caller)
            .await
            .map_err(|ChatError::Validation(message)| BackendError::Rejected(message))
    }
}

/// Adapter to use Database as a conversation store
#[derive(Clone)]
pub struct DatabaseStore {
    db: Database,
}

impl DatabaseStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

#[async_trait]
impl ConversationStore for DatabaseStore {
    async fn save(&self, conversation: &Conversation) -> Result<(), String> {
        self.db
            .save_conversation(conversation)
            .map_err(|e| e.to_string())
    }

    async fn load_all(&self) -> Result<Vec<Conversation>, String> {
        self.db.list_conversations().map_err(|e| e.to_string())
    }

    async fn delete(&self, conversation_id: &str) -> Result<(), String> {
        self.db
            .delete_conversation(conversation_id)
            .map_err(|e| e.to_string())
    }
}
