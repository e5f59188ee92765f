//! Mock implementations for testing
//!
//! These mocks enable integration testing without real I/O.

use super::traits::*;
use crate::activity::{ActivityEntry, ActivityError, ActivityResult, ActivitySink};
use crate::chat::{ChatRequest, ChatResponse};
use crate::db::Conversation;
use crate::llm::{ChatProvider, ProviderOutcome, Source};
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

// ============================================================================
// Fake Provider
// ============================================================================

/// Provider with a fixed answer, or none at all
pub struct FakeProvider {
    source: Source,
    answer: Option<String>,
    calls: AtomicUsize,
    requests: Mutex<Vec<ChatRequest>>,
}

impl FakeProvider {
    pub fn answering(source: Source, answer: impl Into<String>) -> Self {
        Self {
            source,
            answer: Some(answer.into()),
            calls: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn unavailable(source: Source) -> Self {
        Self {
            source,
            answer: None,
            calls: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Number of `generate` calls so far
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Requests received, in call order
    pub fn requests(&self) -> Vec<ChatRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChatProvider for FakeProvider {
    async fn generate(&self, request: &ChatRequest) -> ProviderOutcome {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().unwrap().push(request.clone());
        match &self.answer {
            Some(text) => ProviderOutcome::Success {
                text: text.clone(),
                model: "fake-model".to_string(),
            },
            None => ProviderOutcome::unavailable("fake provider is down"),
        }
    }

    fn source(&self) -> Source {
        self.source
    }

    fn name(&self) -> &str {
        "fake"
    }
}

// ============================================================================
// Mock Chat Backend
// ============================================================================

/// Backend that returns queued responses, optionally after a delay
#[derive(Default)]
pub struct MockChatBackend {
    responses: Mutex<VecDeque<Result<ChatResponse, BackendError>>>,
    delay: Duration,
    /// Record of all requests made
    requests: Mutex<Vec<ChatRequest>>,
}

impl MockChatBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Queue a hosted-provider answer with no note
    pub fn queue_text(&self, text: impl Into<String>) {
        self.queue_response(ChatResponse {
            text: text.into(),
            model_used: "gpt-4o-mini".to_string(),
            source: Source::Primary,
            note: None,
        });
    }

    pub fn queue_response(&self, response: ChatResponse) {
        self.responses.lock().unwrap().push_back(Ok(response));
    }

    pub fn queue_error(&self, error: BackendError) {
        self.responses.lock().unwrap().push_back(Err(error));
    }

    pub fn recorded_requests(&self) -> Vec<ChatRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChatBackend for MockChatBackend {
    async fn send(&self, request: &ChatRequest) -> Result<ChatResponse, BackendError> {
        self.requests.lock().unwrap().push(request.clone());
        let next = self.responses.lock().unwrap().pop_front();
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        next.unwrap_or_else(|| Err(BackendError::Transport("No mock response queued".into())))
    }
}

// ============================================================================
// In-Memory Store
// ============================================================================

/// In-memory conversation store for testing
#[derive(Default)]
pub struct MemoryStore {
    conversations: Mutex<HashMap<String, Conversation>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a conversation as if persisted by an earlier session
    pub fn insert(&self, conversation: Conversation) {
        self.conversations
            .lock()
            .unwrap()
            .insert(conversation.id.clone(), conversation);
    }

    /// Last saved copy of a conversation
    pub fn saved(&self, conversation_id: &str) -> Option<Conversation> {
        self.conversations
            .lock()
            .unwrap()
            .get(conversation_id)
            .cloned()
    }
}

#[async_trait]
impl ConversationStore for MemoryStore {
    async fn save(&self, conversation: &Conversation) -> Result<(), String> {
        self.insert(conversation.clone());
        Ok(())
    }

    async fn load_all(&self) -> Result<Vec<Conversation>, String> {
        let mut all: Vec<_> = self.conversations.lock().unwrap().values().cloned().collect();
        all.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(all)
    }

    async fn delete(&self, conversation_id: &str) -> Result<(), String> {
        self.conversations
            .lock()
            .unwrap()
            .remove(conversation_id)
            .map(|_| ())
            .ok_or_else(|| format!("Conversation not found: {conversation_id}"))
    }
}

// ============================================================================
// Failing Activity Sink
// ============================================================================

/// Sink whose every write fails
#[derive(Default)]
pub struct FailingActivitySink;

impl ActivitySink for FailingActivitySink {
    fn record(&self, _entry: ActivityEntry) -> ActivityResult<()> {
        Err(ActivityError::Poisoned)
    }
}
