//! Database module for the chat client
//!
//! Provides durable storage for conversations and their messages.

mod schema;

pub use schema::*;

use crate::llm::Source;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DbError {
    #[error("Database error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("Failed to encode column: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Conversation not found: {0}")]
    ConversationNotFound(String),
    #[error("Database lock poisoned")]
    Poisoned,
}

pub type DbResult<T> = Result<T, DbError>;

/// Thread-safe database handle
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    /// Open or create database at the given path
    pub fn open<P: AsRef<Path>>(path: P) -> DbResult<Self> {
        let conn = Connection::open(path)?;
        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        db.run_migrations()?;
        Ok(db)
    }

    /// Open an in-memory database
    pub fn open_in_memory() -> DbResult<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        db.run_migrations()?;
        Ok(db)
    }

    fn lock(&self) -> DbResult<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| DbError::Poisoned)
    }

    fn run_migrations(&self) -> DbResult<()> {
        let conn = self.lock()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        conn.execute_batch(SCHEMA)?;
        Ok(())
    }

    // ==================== Conversation Operations ====================

    /// Insert or replace a conversation together with all of its messages
    pub fn save_conversation(&self, conversation: &Conversation) -> DbResult<()> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;

        tx.execute(
            "INSERT INTO conversations (id, title, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(id) DO UPDATE SET title = excluded.title, updated_at = excluded.updated_at",
            params![
                conversation.id,
                conversation.title,
                conversation.created_at.to_rfc3339(),
                conversation.updated_at.to_rfc3339(),
            ],
        )?;

        tx.execute(
            "DELETE FROM messages WHERE conversation_id = ?1",
            params![conversation.id],
        )?;

        {
            let mut insert = tx.prepare(
                "INSERT INTO messages (id, conversation_id, sequence_id, role, content, attachments, model, source, is_final, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            )?;
            for (seq, message) in conversation.messages.iter().enumerate() {
                insert.execute(params![
                    message.id,
                    conversation.id,
                    i64::try_from(seq).unwrap_or(i64::MAX),
                    message.role.to_string(),
                    message.content,
                    serde_json::to_string(&message.attachments)?,
                    message.model,
                    message.source.map(Source::as_str),
                    message.is_final,
                    message.timestamp.to_rfc3339(),
                ])?;
            }
        }

        tx.commit()?;
        Ok(())
    }

    /// Get conversation by ID, including messages
    pub fn get_conversation(&self, id: &str) -> DbResult<Conversation> {
        let conn = self.lock()?;
        let mut conversation = conn
            .query_row(
                "SELECT id, title, created_at, updated_at FROM conversations WHERE id = ?1",
                params![id],
                parse_conversation_row,
            )
            .map_err(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => {
                    DbError::ConversationNotFound(id.to_string())
                }
                other => DbError::Sqlite(other),
            })?;
        conversation.messages = load_messages(&conn, id)?;
        Ok(conversation)
    }

    /// List all conversations, most recently updated first
    pub fn list_conversations(&self) -> DbResult<Vec<Conversation>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT id, title, created_at, updated_at FROM conversations
             ORDER BY updated_at DESC",
        )?;
        let mut conversations = stmt
            .query_map([], parse_conversation_row)?
            .collect::<Result<Vec<_>, _>>()?;

        for conversation in &mut conversations {
            conversation.messages = load_messages(&conn, &conversation.id)?;
        }
        Ok(conversations)
    }

    /// Delete a conversation and its messages
    pub fn delete_conversation(&self, id: &str) -> DbResult<()> {
        let conn = self.lock()?;
        conn.execute("DELETE FROM messages WHERE conversation_id = ?1", params![id])?;
        let deleted = conn.execute("DELETE FROM conversations WHERE id = ?1", params![id])?;
        if deleted == 0 {
            return Err(DbError::ConversationNotFound(id.to_string()));
        }
        Ok(())
    }
}

fn load_messages(conn: &Connection, conversation_id: &str) -> DbResult<Vec<Message>> {
    let mut stmt = conn.prepare(
        "SELECT id, role, content, attachments, model, source, is_final, created_at
         FROM messages WHERE conversation_id = ?1 ORDER BY sequence_id",
    )?;
    let messages = stmt
        .query_map(params![conversation_id], parse_message_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(messages)
}

fn parse_conversation_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Conversation> {
    Ok(Conversation {
        id: row.get(0)?,
        title: row.get(1)?,
        messages: Vec::new(),
        created_at: parse_datetime(&row.get::<_, String>(2)?),
        updated_at: parse_datetime(&row.get::<_, String>(3)?),
    })
}

fn parse_message_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Message> {
    let attachments: String = row.get(3)?;
    Ok(Message {
        id: row.get(0)?,
        role: Role::parse(&row.get::<_, String>(1)?),
        content: row.get(2)?,
        attachments: serde_json::from_str(&attachments).unwrap_or_default(),
        model: row.get(4)?,
        source: row
            .get::<_, Option<String>>(5)?
            .and_then(|s| parse_source(&s)),
        is_final: row.get(6)?,
        timestamp: parse_datetime(&row.get::<_, String>(7)?),
    })
}

fn parse_source(s: &str) -> Option<Source> {
    match s {
        "openai" => Some(Source::Primary),
        "ollama" => Some(Source::Secondary),
        "built-in" => Some(Source::Fallback),
        _ => None,
    }
}

fn parse_datetime(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s).map_or_else(|_| Utc::now(), |dt| dt.with_timezone(&Utc))
}
