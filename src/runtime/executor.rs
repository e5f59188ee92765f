//! Chat client runtime
//!
//! A single owner holds every conversation and its controller state. Backend
//! calls and typing timers run as spawned tasks that only post events back
//! over the channel, so all state changes happen in `handle_next`.

use super::traits::{BackendError, ChatBackend, ConversationStore};
use crate::attachments::{load_attachment, AttachmentError};
use crate::chat::{Attachment, ChatRequest, ChatResponse};
use crate::db::{Conversation, Message, Role};
use crate::llm::{find_model, DEFAULT_MODEL};
use crate::state_machine::{
    transition, welcome_message, ConvContext, ConvState, Effect, Event, TaskContext,
    TransitionError,
};
use crate::title_generator::derive_title;
use chrono::Utc;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{broadcast, mpsc};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

const EVENT_BUFFER: usize = 64;
const UPDATE_BUFFER: usize = 1024;

/// Events posted back by spawned tasks
#[derive(Debug)]
enum ClientEvent {
    Response {
        conversation_id: String,
        request_id: u64,
        result: Result<ChatResponse, BackendError>,
    },
    Tick {
        conversation_id: String,
        render_token: u64,
    },
}

/// Changes observers render
#[derive(Debug, Clone)]
pub enum ClientUpdate {
    MessageAppended {
        conversation_id: String,
        message: Message,
    },
    MessageUpdated {
        conversation_id: String,
        message_id: String,
        content: String,
        is_final: bool,
    },
    Note {
        conversation_id: String,
        text: String,
    },
    StateChanged {
        conversation_id: String,
        busy: bool,
    },
    /// A conversation was created, renamed or deleted
    ConversationsChanged,
}

#[derive(Debug, Error)]
pub enum ClientError {
    #[error(transparent)]
    Transition(#[from] TransitionError),
    #[error("Storage error: {0}")]
    Store(String),
    #[error(transparent)]
    Attachment(#[from] AttachmentError),
    #[error("Unknown model: {0}")]
    UnknownModel(String),
    #[error("Conversation not found: {0}")]
    ConversationNotFound(String),
}

/// Conversation list, selection and controller state for one user
pub struct ChatClient<B, S>
where
    B: ChatBackend + 'static,
    S: ConversationStore,
{
    backend: Arc<B>,
    store: S,
    model: String,
    task: Option<TaskContext>,
    conversations: HashMap<String, Conversation>,
    states: HashMap<String, ConvState>,
    selected: Option<String>,
    /// Files to send with the next message
    staged: Vec<Attachment>,
    next_request_id: u64,
    next_render_token: u64,
    /// Cancels pending typing ticks; replaced whenever a render is abandoned
    typing_cancel: CancellationToken,
    event_tx: mpsc::Sender<ClientEvent>,
    event_rx: mpsc::Receiver<ClientEvent>,
    updates: broadcast::Sender<ClientUpdate>,
}

impl<B, S> ChatClient<B, S>
where
    B: ChatBackend + 'static,
    S: ConversationStore,
{
    pub fn new(backend: B, store: S) -> Self {
        let (event_tx, event_rx) = mpsc::channel(EVENT_BUFFER);
        let (updates, _) = broadcast::channel(UPDATE_BUFFER);
        Self {
            backend: Arc::new(backend),
            store,
            model: DEFAULT_MODEL.to_string(),
            task: None,
            conversations: HashMap::new(),
            states: HashMap::new(),
            selected: None,
            staged: Vec::new(),
            next_request_id: 1,
            next_render_token: 1,
            typing_cancel: CancellationToken::new(),
            event_tx,
            event_rx,
            updates,
        }
    }

    /// Attach the task the student is working on
    pub fn with_task(mut self, task: Option<TaskContext>) -> Self {
        self.task = task;
        self
    }

    /// Load stored history and select the most recent conversation.
    ///
    /// Messages left mid-typing by an earlier session are marked final.
    pub async fn load(&mut self) -> Result<usize, ClientError> {
        let stored = self.store.load_all().await.map_err(ClientError::Store)?;
        let count = stored.len();

        for mut conversation in stored {
            for message in &mut conversation.messages {
                message.is_final = true;
            }
            self.states.insert(conversation.id.clone(), ConvState::Idle);
            self.conversations.insert(conversation.id.clone(), conversation);
        }

        self.selected = self.newest_id();
        tracing::info!(count, "Loaded conversations");
        self.notify(ClientUpdate::ConversationsChanged);
        Ok(count)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ClientUpdate> {
        self.updates.subscribe()
    }

    /// All conversations, most recently updated first
    pub fn conversations(&self) -> Vec<&Conversation> {
        let mut all: Vec<_> = self.conversations.values().collect();
        all.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        all
    }

    pub fn conversation(&self, conversation_id: &str) -> Option<&Conversation> {
        self.conversations.get(conversation_id)
    }

    pub fn selected(&self) -> Option<&Conversation> {
        self.selected
            .as_deref()
            .and_then(|id| self.conversations.get(id))
    }

    pub fn state(&self, conversation_id: &str) -> Option<&ConvState> {
        self.states.get(conversation_id)
    }

    /// Whether the selected conversation has a question outstanding
    pub fn is_busy(&self) -> bool {
        self.selected
            .as_deref()
            .and_then(|id| self.states.get(id))
            .is_some_and(ConvState::is_busy)
    }

    pub fn welcome(&self) -> String {
        welcome_message(self.task.as_ref())
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Switch to a model from the catalog
    pub fn set_model(&mut self, model_id: &str) -> Result<(), ClientError> {
        let model =
            find_model(model_id).ok_or_else(|| ClientError::UnknownModel(model_id.to_string()))?;
        self.model = model.id.to_string();
        Ok(())
    }

    // ==================== Conversations ====================

    /// Create an empty conversation and select it
    pub async fn new_conversation(&mut self) -> String {
        self.abandon_render().await;

        let id = format!("conv-{}", Uuid::new_v4());
        self.conversations
            .insert(id.clone(), Conversation::new(id.clone(), Utc::now()));
        self.states.insert(id.clone(), ConvState::Idle);
        self.selected = Some(id.clone());
        self.persist(&id).await;

        tracing::debug!(conv_id = %id, "Created conversation");
        self.notify(ClientUpdate::ConversationsChanged);
        id
    }

    pub async fn switch_to(&mut self, conversation_id: &str) -> Result<(), ClientError> {
        if !self.conversations.contains_key(conversation_id) {
            return Err(ClientError::ConversationNotFound(conversation_id.to_string()));
        }
        if self.selected.as_deref() == Some(conversation_id) {
            return Ok(());
        }
        self.abandon_render().await;
        self.selected = Some(conversation_id.to_string());
        Ok(())
    }

    /// Delete a conversation. A response still in flight for it is dropped.
    pub async fn delete(&mut self, conversation_id: &str) -> Result<(), ClientError> {
        if !self.conversations.contains_key(conversation_id) {
            return Err(ClientError::ConversationNotFound(conversation_id.to_string()));
        }
        if self.selected.as_deref() == Some(conversation_id) {
            self.abandon_render().await;
        }

        self.store
            .delete(conversation_id)
            .await
            .map_err(ClientError::Store)?;
        self.conversations.remove(conversation_id);
        self.states.remove(conversation_id);

        if self.selected.as_deref() == Some(conversation_id) {
            self.selected = self.newest_id();
        }
        self.notify(ClientUpdate::ConversationsChanged);
        Ok(())
    }

    // ==================== Attachments ====================

    pub fn stage_attachment(&mut self, attachment: Attachment) {
        self.staged.push(attachment);
    }

    /// Read a file from disk and stage it
    pub async fn stage_file(&mut self, path: &Path) -> Result<&Attachment, ClientError> {
        let attachment = load_attachment(path).await?;
        self.staged.push(attachment);
        Ok(&self.staged[self.staged.len() - 1])
    }

    pub fn remove_attachment(&mut self, index: usize) -> Option<Attachment> {
        (index < self.staged.len()).then(|| self.staged.remove(index))
    }

    pub fn staged(&self) -> &[Attachment] {
        &self.staged
    }

    // ==================== Sending ====================

    /// Send a message with the staged attachments to the selected
    /// conversation, creating one if none is selected.
    pub async fn submit(&mut self, text: &str) -> Result<(), ClientError> {
        if text.trim().is_empty() && self.staged.is_empty() {
            return Err(TransitionError::EmptyMessage.into());
        }

        let conversation_id = match self.selected.clone() {
            Some(id) => id,
            None => self.new_conversation().await,
        };

        let request_id = self.next_request_id;
        self.next_request_id += 1;

        let event = Event::UserSubmit {
            text: text.to_string(),
            attachments: self.staged.clone(),
            message_id: format!("user-{}", Uuid::new_v4()),
            request_id,
            timestamp: Utc::now(),
        };
        self.process(&conversation_id, event).await?;
        self.staged.clear();
        Ok(())
    }

    /// Wait for the next posted event and apply it
    pub async fn handle_next(&mut self) {
        let Some(event) = self.event_rx.recv().await else {
            return;
        };

        match event {
            ClientEvent::Response {
                conversation_id,
                request_id,
                result,
            } => self.on_response(conversation_id, request_id, result).await,
            ClientEvent::Tick {
                conversation_id,
                render_token,
            } => {
                self.dispatch(&conversation_id, Event::TypingTick { render_token })
                    .await;
            }
        }
    }

    /// Process events until no conversation is waiting or typing
    pub async fn run_until_idle(&mut self) {
        while self.states.values().any(ConvState::is_busy) {
            self.handle_next().await;
        }
    }

    async fn on_response(
        &mut self,
        conversation_id: String,
        request_id: u64,
        result: Result<ChatResponse, BackendError>,
    ) {
        let event = match result {
            Ok(response) => {
                let render_token = self.next_render_token;
                self.next_render_token += 1;
                Event::ResponseReceived {
                    request_id,
                    response,
                    message_id: format!("ai-{}", Uuid::new_v4()),
                    // Off-screen conversations get the full text at once
                    animate: self.selected.as_deref() == Some(conversation_id.as_str()),
                    render_token,
                    timestamp: Utc::now(),
                }
            }
            Err(e) => {
                tracing::warn!(conv_id = %conversation_id, error = %e, "Chat request failed");
                Event::ResponseFailed {
                    request_id,
                    message_id: format!("error-{}", Uuid::new_v4()),
                    timestamp: Utc::now(),
                }
            }
        };
        self.dispatch(&conversation_id, event).await;
    }

    /// Finish the selected conversation's animation immediately
    async fn abandon_render(&mut self) {
        self.typing_cancel.cancel();
        self.typing_cancel = CancellationToken::new();

        if let Some(id) = self.selected.clone() {
            if self.states.get(&id).is_some_and(ConvState::is_typing) {
                self.dispatch(&id, Event::RenderAbandoned).await;
            }
        }
    }

    // ==================== State Machine ====================

    /// Apply an event posted by a background task; failures are logged
    async fn dispatch(&mut self, conversation_id: &str, event: Event) {
        if !self.conversations.contains_key(conversation_id) {
            tracing::debug!(conv_id = %conversation_id, "Dropping event for deleted conversation");
            return;
        }
        if let Err(e) = self.process(conversation_id, event).await {
            tracing::warn!(conv_id = %conversation_id, error = %e, "Dropping event");
        }
    }

    async fn process(&mut self, conversation_id: &str, event: Event) -> Result<(), ClientError> {
        let state = self.states.get(conversation_id).cloned().unwrap_or_default();
        let context = ConvContext::new(conversation_id, self.model.clone())
            .with_task(self.task.clone());

        let result = transition(&state, &context, event)?;

        let busy = result.new_state.is_busy();
        self.states
            .insert(conversation_id.to_string(), result.new_state);
        if state.is_busy() != busy {
            self.notify(ClientUpdate::StateChanged {
                conversation_id: conversation_id.to_string(),
                busy,
            });
        }

        for effect in result.effects {
            self.execute_effect(conversation_id, effect).await;
        }
        Ok(())
    }

    async fn execute_effect(&mut self, conversation_id: &str, effect: Effect) {
        match effect {
            Effect::AppendMessage { message } => self.append_message(conversation_id, message),

            Effect::UpdateMessage {
                message_id,
                content,
                is_final,
            } => {
                if let Some(message) = self
                    .conversations
                    .get_mut(conversation_id)
                    .and_then(|c| c.message_mut(&message_id))
                {
                    message.content.clone_from(&content);
                    message.is_final = is_final;
                }
                self.notify(ClientUpdate::MessageUpdated {
                    conversation_id: conversation_id.to_string(),
                    message_id,
                    content,
                    is_final,
                });
            }

            Effect::SendRequest {
                request_id,
                request,
            } => self.spawn_request(conversation_id, request_id, request),

            Effect::ScheduleTypingTick {
                render_token,
                delay,
            } => self.spawn_tick(conversation_id, render_token, delay),

            Effect::ShowNote { text } => self.notify(ClientUpdate::Note {
                conversation_id: conversation_id.to_string(),
                text,
            }),

            Effect::PersistConversation => self.persist(conversation_id).await,
        }
    }

    fn append_message(&mut self, conversation_id: &str, message: Message) {
        let Some(conversation) = self.conversations.get_mut(conversation_id) else {
            return;
        };

        let first_question = message.role == Role::User && !conversation.has_user_message();
        if first_question {
            conversation.title = derive_title(&message.content, &message.attachments);
        }
        conversation.updated_at = message.timestamp;
        conversation.messages.push(message.clone());

        self.notify(ClientUpdate::MessageAppended {
            conversation_id: conversation_id.to_string(),
            message,
        });
        if first_question {
            self.notify(ClientUpdate::ConversationsChanged);
        }
    }

    fn spawn_request(&self, conversation_id: &str, request_id: u64, request: ChatRequest) {
        let backend = self.backend.clone();
        let tx = self.event_tx.clone();
        let conversation_id = conversation_id.to_string();

        tokio::spawn(async move {
            let result = backend.send(&request).await;
            let _ = tx
                .send(ClientEvent::Response {
                    conversation_id,
                    request_id,
                    result,
                })
                .await;
        });
    }

    fn spawn_tick(&self, conversation_id: &str, render_token: u64, delay: Duration) {
        let cancel = self.typing_cancel.clone();
        let tx = self.event_tx.clone();
        let conversation_id = conversation_id.to_string();

        tokio::spawn(async move {
            tokio::select! {
                () = cancel.cancelled() => {}
                () = tokio::time::sleep(delay) => {
                    let _ = tx
                        .send(ClientEvent::Tick {
                            conversation_id,
                            render_token,
                        })
                        .await;
                }
            }
        });
    }

    async fn persist(&self, conversation_id: &str) {
        let Some(conversation) = self.conversations.get(conversation_id) else {
            return;
        };
        if let Err(e) = self.store.save(conversation).await {
            tracing::warn!(conv_id = %conversation_id, error = %e, "Failed to persist conversation");
        }
    }

    fn newest_id(&self) -> Option<String> {
        self.conversations
            .values()
            .max_by_key(|c| c.updated_at)
            .map(|c| c.id.clone())
    }

    fn notify(&self, update: ClientUpdate) {
        // No subscribers is fine
        let _ = self.updates.send(update);
    }
}
