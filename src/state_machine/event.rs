//! Events that can occur in a conversation

use crate::chat::{Attachment, ChatResponse};
use chrono::{DateTime, Utc};

/// Events that trigger state transitions.
///
/// Identifiers and timestamps are generated by the runtime and carried in
/// the event so the transition function stays pure.
#[derive(Debug, Clone)]
pub enum Event {
    // User events
    UserSubmit {
        text: String,
        attachments: Vec<Attachment>,
        message_id: String,
        request_id: u64,
        timestamp: DateTime<Utc>,
    },

    // Backend events
    ResponseReceived {
        request_id: u64,
        response: ChatResponse,
        message_id: String,
        /// False when the conversation is not on screen
        animate: bool,
        render_token: u64,
        timestamp: DateTime<Utc>,
    },
    ResponseFailed {
        request_id: u64,
        message_id: String,
        timestamp: DateTime<Utc>,
    },

    // Typing simulation
    TypingTick {
        render_token: u64,
    },
    /// The user left the conversation while it was typing
    RenderAbandoned,
}
