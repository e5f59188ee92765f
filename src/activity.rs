//! User activity log
//!
//! Append-only record of user actions, kept in a bounded in-memory ring
//! buffer. The chat handler receives it as an injected `ActivitySink` and
//! treats every write as best-effort.

use axum::http::HeaderMap;
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::Mutex;
use thiserror::Error;

/// Default number of retained entries
pub const DEFAULT_CAPACITY: usize = 1000;

#[derive(Debug, Error)]
pub enum ActivityError {
    #[error("Activity log lock poisoned")]
    Poisoned,
    #[error("Activity log has zero capacity")]
    Disabled,
}

pub type ActivityResult<T> = Result<T, ActivityError>;

/// Identity of the signed-in user, as asserted by the auth layer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserSession {
    pub id: Option<String>,
    pub email: Option<String>,
    pub name: Option<String>,
}

impl UserSession {
    /// Read `x-user-id`, `x-user-email` and `x-user-name`. Returns `None`
    /// when none is present.
    pub fn from_headers(headers: &HeaderMap) -> Option<Self> {
        let session = Self {
            id: header_value(headers, "x-user-id"),
            email: header_value(headers, "x-user-email"),
            name: header_value(headers, "x-user-name"),
        };
        if session.id.is_none() && session.email.is_none() && session.name.is_none() {
            None
        } else {
            Some(session)
        }
    }
}

/// Client network details attached to an entry
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestMeta {
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

impl RequestMeta {
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let ip_address = header_value(headers, "x-forwarded-for")
            .and_then(|v| v.split(',').next().map(|ip| ip.trim().to_string()))
            .filter(|ip| !ip.is_empty())
            .or_else(|| header_value(headers, "x-real-ip"))
            .or_else(|| header_value(headers, "cf-connecting-ip"));

        Self {
            ip_address,
            user_agent: header_value(headers, "user-agent"),
        }
    }
}

fn header_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(String::from)
}

/// A single logged action
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityEntry {
    pub id: String,
    pub user_id: String,
    pub user_email: String,
    pub user_name: String,
    pub action: String,
    pub details: Value,
    pub timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ip_address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
}

impl ActivityEntry {
    /// Build an entry for a session. User id falls back to the email and the
    /// name to "Unknown User".
    pub fn for_session(
        session: &UserSession,
        action: &str,
        details: Value,
        meta: Option<&RequestMeta>,
    ) -> Self {
        let email = session.email.clone().unwrap_or_else(|| "unknown".to_string());
        Self {
            id: format!("log-{}", uuid::Uuid::new_v4()),
            user_id: session.id.clone().unwrap_or_else(|| email.clone()),
            user_email: email,
            user_name: session
                .name
                .clone()
                .unwrap_or_else(|| "Unknown User".to_string()),
            action: action.to_string(),
            details,
            timestamp: Utc::now(),
            ip_address: meta.and_then(|m| m.ip_address.clone()),
            user_agent: meta.and_then(|m| m.user_agent.clone()),
        }
    }
}

/// Destination for activity entries
pub trait ActivitySink: Send + Sync {
    fn record(&self, entry: ActivityEntry) -> ActivityResult<()>;
}

/// Record an action for the current user. Anonymous requests are not logged.
pub fn log_user_activity(
    sink: &dyn ActivitySink,
    session: Option<&UserSession>,
    action: &str,
    details: Value,
    meta: Option<&RequestMeta>,
) -> ActivityResult<()> {
    let Some(session) = session else {
        return Ok(());
    };
    let entry = ActivityEntry::for_session(session, action, details, meta);
    tracing::info!(
        target: "activity",
        user = %entry.user_email,
        action = %entry.action,
        details = %entry.details,
        "Activity"
    );
    sink.record(entry)
}

/// Bounded in-memory log; the oldest entry is evicted first
pub struct MemoryActivityLog {
    entries: Mutex<VecDeque<ActivityEntry>>,
    capacity: usize,
}

impl Default for MemoryActivityLog {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }
}

impl MemoryActivityLog {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.entries.lock().map_or(0, |e| e.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn select(&self, keep: impl Fn(&ActivityEntry) -> bool) -> ActivityResult<Vec<ActivityEntry>> {
        let entries = self.entries.lock().map_err(|_| ActivityError::Poisoned)?;
        let mut selected: Vec<ActivityEntry> = entries.iter().filter(|e| keep(e)).cloned().collect();
        selected.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        Ok(selected)
    }

    /// All entries, newest first
    pub fn all(&self) -> ActivityResult<Vec<ActivityEntry>> {
        self.select(|_| true)
    }

    pub fn for_user(&self, user_id: &str) -> ActivityResult<Vec<ActivityEntry>> {
        self.select(|e| e.user_id == user_id)
    }

    pub fn by_action(&self, action: &str) -> ActivityResult<Vec<ActivityEntry>> {
        self.select(|e| e.action == action)
    }

    /// Entries newer than `hours` ago. A window reaching past the
    /// representable range keeps everything.
    pub fn recent(&self, hours: i64) -> ActivityResult<Vec<ActivityEntry>> {
        let cutoff = Duration::try_hours(hours).and_then(|d| Utc::now().checked_sub_signed(d));
        match cutoff {
            Some(cutoff) => self.select(|e| e.timestamp > cutoff),
            None => self.all(),
        }
    }

    pub fn clear(&self) -> ActivityResult<()> {
        self.entries
            .lock()
            .map_err(|_| ActivityError::Poisoned)?
            .clear();
        Ok(())
    }
}

impl ActivitySink for MemoryActivityLog {
    fn record(&self, entry: ActivityEntry) -> ActivityResult<()> {
        if self.capacity == 0 {
            return Err(ActivityError::Disabled);
        }
        let mut entries = self.entries.lock().map_err(|_| ActivityError::Poisoned)?;
        while entries.len() >= self.capacity {
            entries.pop_front();
        }
        entries.push_back(entry);
        Ok(())
    }
}
