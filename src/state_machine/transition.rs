//! Pure state transition function

use super::state::word_delay;
use super::{ConvContext, ConvState, Effect, Event};
use crate::chat::{Attachment, ChatRequest, ChatResponse};
use crate::db::{AttachmentMeta, Message};
use chrono::{DateTime, Utc};
use std::time::Duration;
use thiserror::Error;

/// Assistant message appended when a request fails
pub const APOLOGY_MESSAGE: &str = "I apologize, but I'm having trouble responding right now. Please try asking your question again, or consider these study resources:

• Khan Academy for math and science
• Purdue OWL for writing help
• Your textbook and class notes
• Study groups with classmates";

/// Note shown when a request fails
pub const ERROR_NOTE: &str = "Sorry, I encountered an error. Please try again.";

/// Result of a state transition
#[derive(Debug)]
pub struct TransitionResult {
    pub new_state: ConvState,
    pub effects: Vec<Effect>,
}

impl TransitionResult {
    pub fn new(state: ConvState) -> Self {
        Self {
            new_state: state,
            effects: vec![],
        }
    }

    /// Stay in `state` and do nothing
    pub fn unchanged(state: &ConvState) -> Self {
        Self::new(state.clone())
    }

    pub fn with_effect(mut self, effect: Effect) -> Self {
        self.effects.push(effect);
        self
    }

    pub fn with_effects(mut self, effects: impl IntoIterator<Item = Effect>) -> Self {
        self.effects.extend(effects);
        self
    }
}

/// Errors that can occur during transition
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TransitionError {
    #[error("Still answering the previous question")]
    Busy,
    #[error("Type a message or attach a file first")]
    EmptyMessage,
    #[error("Invalid transition: {0}")]
    InvalidTransition(String),
}

/// Pure transition function.
///
/// Given the same inputs it always produces the same outputs; all I/O is
/// described by the returned effects.
pub fn transition(
    state: &ConvState,
    context: &ConvContext,
    event: Event,
) -> Result<TransitionResult, TransitionError> {
    match (state, event) {
        // ============================================================
        // Submitting
        // ============================================================
        (
            ConvState::Idle,
            Event::UserSubmit {
                text,
                attachments,
                message_id,
                request_id,
                timestamp,
            },
        ) => submit(context, &text, attachments, message_id, request_id, timestamp),

        (ConvState::AwaitingResponse { .. } | ConvState::Typing { .. }, Event::UserSubmit { .. }) => {
            Err(TransitionError::Busy)
        }

        // ============================================================
        // Responses
        // ============================================================
        (
            ConvState::AwaitingResponse { request_id: pending },
            Event::ResponseReceived {
                request_id,
                response,
                message_id,
                animate,
                render_token,
                timestamp,
            },
        ) if *pending == request_id => Ok(if animate {
            start_typing(response, message_id, render_token, timestamp)
        } else {
            append_final(response, message_id, timestamp)
        }),

        (
            ConvState::AwaitingResponse { request_id: pending },
            Event::ResponseFailed {
                request_id,
                message_id,
                timestamp,
            },
        ) if *pending == request_id => Ok(TransitionResult::new(ConvState::Idle)
            .with_effect(Effect::append(Message::assistant(
                message_id,
                APOLOGY_MESSAGE,
                timestamp,
            )))
            .with_effect(Effect::note(ERROR_NOTE))
            .with_effect(Effect::PersistConversation)),

        (_, Event::ResponseReceived { request_id, .. } | Event::ResponseFailed { request_id, .. }) => {
            Err(TransitionError::InvalidTransition(format!(
                "no pending request {request_id}"
            )))
        }

        // ============================================================
        // Typing simulation
        // ============================================================
        (
            ConvState::Typing {
                message_id,
                words,
                revealed,
                render_token,
                model,
                source,
                note,
            },
            Event::TypingTick {
                render_token: tick_token,
            },
        ) if *render_token == tick_token => {
            if *revealed < words.len() {
                let revealed = revealed + 1;
                let delay = words
                    .get(revealed - 1)
                    .map_or(Duration::ZERO, |word| word_delay(word));
                Ok(TransitionResult::new(ConvState::Typing {
                    message_id: message_id.clone(),
                    words: words.clone(),
                    revealed,
                    render_token: *render_token,
                    model: model.clone(),
                    source: *source,
                    note: note.clone(),
                })
                .with_effect(Effect::UpdateMessage {
                    message_id: message_id.clone(),
                    content: words.iter().take(revealed).cloned().collect::<Vec<_>>().join(" "),
                    is_final: false,
                })
                .with_effect(Effect::ScheduleTypingTick {
                    render_token: *render_token,
                    delay,
                }))
            } else {
                Ok(finish_typing(message_id, words, note.as_deref()))
            }
        }

        // Stale or early ticks
        (_, Event::TypingTick { .. }) => Ok(TransitionResult::unchanged(state)),

        (
            ConvState::Typing {
                message_id,
                words,
                note,
                ..
            },
            Event::RenderAbandoned,
        ) => Ok(finish_typing(message_id, words, note.as_deref())),

        (_, Event::RenderAbandoned) => Ok(TransitionResult::unchanged(state)),
    }
}

fn submit(
    context: &ConvContext,
    text: &str,
    attachments: Vec<Attachment>,
    message_id: String,
    request_id: u64,
    timestamp: DateTime<Utc>,
) -> Result<TransitionResult, TransitionError> {
    let text = text.trim();
    if text.is_empty() && attachments.is_empty() {
        return Err(TransitionError::EmptyMessage);
    }

    let meta = attachments.iter().map(AttachmentMeta::from).collect();
    let request = ChatRequest {
        message: text.to_string(),
        context: context.request_context(),
        model: context.model.clone(),
        attachments,
    };

    Ok(
        TransitionResult::new(ConvState::AwaitingResponse { request_id })
            .with_effect(Effect::append(Message::user(message_id, text, meta, timestamp)))
            .with_effect(Effect::PersistConversation)
            .with_effect(Effect::SendRequest {
                request_id,
                request,
            }),
    )
}

fn start_typing(
    response: ChatResponse,
    message_id: String,
    render_token: u64,
    timestamp: DateTime<Utc>,
) -> TransitionResult {
    let message = Message::assistant(message_id.clone(), "", timestamp)
        .with_origin(response.model_used.clone(), response.source)
        .in_progress();

    TransitionResult::new(ConvState::Typing {
        message_id,
        words: response.text.split(' ').map(String::from).collect(),
        revealed: 0,
        render_token,
        model: response.model_used,
        source: response.source,
        note: response.note,
    })
    .with_effect(Effect::append(message))
    .with_effect(Effect::ScheduleTypingTick {
        render_token,
        delay: Duration::ZERO,
    })
}

fn append_final(
    response: ChatResponse,
    message_id: String,
    timestamp: DateTime<Utc>,
) -> TransitionResult {
    let message = Message::assistant(message_id, response.text, timestamp)
        .with_origin(response.model_used, response.source);

    TransitionResult::new(ConvState::Idle)
        .with_effect(Effect::append(message))
        .with_effects(response.note.map(Effect::note))
        .with_effect(Effect::PersistConversation)
}

fn finish_typing(message_id: &str, words: &[String], note: Option<&str>) -> TransitionResult {
    TransitionResult::new(ConvState::Idle)
        .with_effect(Effect::finalize(message_id, words.join(" ")))
        .with_effects(note.map(Effect::note))
        .with_effect(Effect::PersistConversation)
}
