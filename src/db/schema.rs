//! Database schema and conversation types

use crate::chat::Attachment;
use crate::llm::Source;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// SQL schema for initialization
pub const SCHEMA: &str = r"
CREATE TABLE IF NOT EXISTS conversations (
    id TEXT PRIMARY KEY,
    title TEXT NOT NULL,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_conversations_updated ON conversations(updated_at DESC);

CREATE TABLE IF NOT EXISTS messages (
    id TEXT PRIMARY KEY,
    conversation_id TEXT NOT NULL,
    sequence_id INTEGER NOT NULL,
    role TEXT NOT NULL,
    content TEXT NOT NULL,
    attachments TEXT NOT NULL DEFAULT '[]',
    model TEXT,
    source TEXT,
    is_final BOOLEAN NOT NULL DEFAULT 1,
    created_at TEXT NOT NULL,

    FOREIGN KEY (conversation_id) REFERENCES conversations(id) ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS idx_messages_conversation ON messages(conversation_id, sequence_id);
";

/// Title used until the first user message arrives
pub const DEFAULT_TITLE: &str = "New Chat";

/// Who wrote a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Assistant,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::User => write!(f, "user"),
            Role::Assistant => write!(f, "assistant"),
        }
    }
}

impl Role {
    pub fn parse(s: &str) -> Self {
        match s {
            "user" => Role::User,
            _ => Role::Assistant,
        }
    }
}

/// Metadata of a file sent with a message; contents are not stored
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttachmentMeta {
    pub name: String,
    pub mime_type: String,
    pub size: u64,
}

impl From<&Attachment> for AttachmentMeta {
    fn from(attachment: &Attachment) -> Self {
        Self {
            name: attachment.name.clone(),
            mime_type: attachment.mime_type.clone(),
            size: attachment.size,
        }
    }
}

/// A single chat message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub role: Role,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub attachments: Vec<AttachmentMeta>,
    pub model: Option<String>,
    pub source: Option<Source>,
    /// False only while the typing simulation is still revealing the text
    pub is_final: bool,
}

impl Message {
    pub fn user(
        id: impl Into<String>,
        content: impl Into<String>,
        attachments: Vec<AttachmentMeta>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            role: Role::User,
            content: content.into(),
            timestamp,
            attachments,
            model: None,
            source: None,
            is_final: true,
        }
    }

    pub fn assistant(
        id: impl Into<String>,
        content: impl Into<String>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            role: Role::Assistant,
            content: content.into(),
            timestamp,
            attachments: Vec::new(),
            model: None,
            source: None,
            is_final: true,
        }
    }

    pub fn with_origin(mut self, model: impl Into<String>, source: Source) -> Self {
        self.model = Some(model.into());
        self.source = Some(source);
        self
    }

    pub fn in_progress(mut self) -> Self {
        self.is_final = false;
        self
    }
}

/// Titled, timestamped sequence of messages
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conversation {
    pub id: String,
    pub title: String,
    pub messages: Vec<Message>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Conversation {
    pub fn new(id: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            title: DEFAULT_TITLE.to_string(),
            messages: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn has_user_message(&self) -> bool {
        self.messages.iter().any(|m| m.role == Role::User)
    }

    pub fn message_mut(&mut self, id: &str) -> Option<&mut Message> {
        self.messages.iter_mut().find(|m| m.id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_roundtrip_through_text() {
        assert_eq!(Role::parse(&Role::User.to_string()), Role::User);
        assert_eq!(Role::parse(&Role::Assistant.to_string()), Role::Assistant);
    }

    #[test]
    fn test_attachment_meta_drops_content() {
        let attachment = Attachment {
            name: "lab.txt".to_string(),
            mime_type: "text/plain".to_string(),
            size: 42,
            content: Some("observations".to_string()),
        };
        let meta = AttachmentMeta::from(&attachment);
        assert_eq!(meta.name, "lab.txt");
        assert_eq!(meta.size, 42);
    }

    #[test]
    fn test_new_conversation_has_default_title() {
        let conv = Conversation::new("c-1", Utc::now());
        assert_eq!(conv.title, DEFAULT_TITLE);
        assert!(!conv.has_user_message());
    }
}
