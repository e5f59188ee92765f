//! Conversation state types

use crate::llm::{Source, DEFAULT_MODEL};
use std::time::Duration;

/// Delay after revealing a word longer than `LONG_WORD_CHARS`
pub const LONG_WORD_DELAY: Duration = Duration::from_millis(80);
/// Delay after revealing any other word
pub const SHORT_WORD_DELAY: Duration = Duration::from_millis(40);
const LONG_WORD_CHARS: usize = 6;

/// Pause that follows revealing `word`
pub fn word_delay(word: &str) -> Duration {
    if word.chars().count() > LONG_WORD_CHARS {
        LONG_WORD_DELAY
    } else {
        SHORT_WORD_DELAY
    }
}

/// Per-conversation controller state
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ConvState {
    /// Ready for input
    #[default]
    Idle,

    /// Request in flight; only the matching response is accepted
    AwaitingResponse { request_id: u64 },

    /// Assistant message being revealed word by word
    Typing {
        message_id: String,
        words: Vec<String>,
        revealed: usize,
        render_token: u64,
        model: String,
        source: Source,
        note: Option<String>,
    },
}

impl ConvState {
    /// Submitting is disabled in every state but `Idle`
    pub fn is_busy(&self) -> bool {
        !matches!(self, ConvState::Idle)
    }

    pub fn is_typing(&self) -> bool {
        matches!(self, ConvState::Typing { .. })
    }
}

/// Task the student is working on, used as request context
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskContext {
    pub title: String,
    pub category: String,
    pub description: Option<String>,
}

impl TaskContext {
    /// `Current task: <title> (<category>)[ - <description>]`
    pub fn context_line(&self) -> String {
        match self.description.as_deref().filter(|d| !d.is_empty()) {
            Some(description) => format!(
                "Current task: {} ({}) - {description}",
                self.title, self.category
            ),
            None => format!("Current task: {} ({})", self.title, self.category),
        }
    }

    /// Parse `title|category[|description]`
    pub fn parse(raw: &str) -> Option<Self> {
        let mut parts = raw.splitn(3, '|').map(str::trim);
        let title = parts.next().filter(|t| !t.is_empty())?.to_string();
        let category = parts.next().filter(|c| !c.is_empty())?.to_string();
        let description = parts.next().filter(|d| !d.is_empty()).map(String::from);
        Some(Self {
            title,
            category,
            description,
        })
    }
}

/// Immutable settings a conversation's requests are built from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConvContext {
    pub conversation_id: String,
    pub model: String,
    pub task: Option<TaskContext>,
}

impl ConvContext {
    pub fn new(conversation_id: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            conversation_id: conversation_id.into(),
            model: model.into(),
            task: None,
        }
    }

    pub fn with_task(mut self, task: Option<TaskContext>) -> Self {
        self.task = task;
        self
    }

    pub fn request_context(&self) -> Option<String> {
        self.task.as_ref().map(TaskContext::context_line)
    }
}

impl Default for ConvContext {
    fn default() -> Self {
        Self::new(String::new(), DEFAULT_MODEL)
    }
}

/// Greeting shown at the top of an empty conversation
pub fn welcome_message(task: Option<&TaskContext>) -> String {
    let closing = match task {
        Some(task) => format!(
            "I see you're working on \"{}\" in {}. How can I help with this task?",
            task.title, task.category
        ),
        None => "What homework can I help you with today?".to_string(),
    };
    format!(
        "Hi! I'm your AI homework assistant. I can help you with:

• **Math problems** - Step-by-step solutions
• **Essay writing** - Structure and tips
• **Science concepts** - Clear explanations
• **Study strategies** - Effective learning methods
• **Research help** - Finding reliable sources
• **File analysis** - Upload documents, images, or PDFs

{closing}"
    )
}
