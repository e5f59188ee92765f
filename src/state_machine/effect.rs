//! Effects produced by state transitions

use crate::chat::ChatRequest;
use crate::db::Message;
use std::time::Duration;

/// Effects to be executed after state transition
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Append a message to the conversation
    AppendMessage { message: Message },

    /// Replace the content of an existing message
    UpdateMessage {
        message_id: String,
        content: String,
        is_final: bool,
    },

    /// Send the request to the chat backend
    SendRequest { request_id: u64, request: ChatRequest },

    /// Post a `TypingTick` after `delay`
    ScheduleTypingTick { render_token: u64, delay: Duration },

    /// Show an advisory line under the conversation
    ShowNote { text: String },

    /// Write the conversation to the store
    PersistConversation,
}

impl Effect {
    pub fn append(message: Message) -> Self {
        Effect::AppendMessage { message }
    }

    pub fn finalize(message_id: impl Into<String>, content: impl Into<String>) -> Self {
        Effect::UpdateMessage {
            message_id: message_id.into(),
            content: content.into(),
            is_final: true,
        }
    }

    pub fn note(text: impl Into<String>) -> Self {
        Effect::ShowNote { text: text.into() }
    }
}
