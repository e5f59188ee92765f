//! HTTP API for the homework assistant

mod extract;
mod handlers;
mod types;

pub use handlers::create_router;
pub use types::*;

use crate::activity::MemoryActivityLog;
use crate::chat::ChatService;
use crate::llm::ProviderChain;
use std::sync::Arc;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub chat: ChatService,
    pub activity: Arc<MemoryActivityLog>,
    /// Only this identity may read the activity log
    pub admin_email: Option<String>,
}

impl AppState {
    pub fn new(
        providers: ProviderChain,
        activity: Arc<MemoryActivityLog>,
        admin_email: Option<String>,
    ) -> Self {
        Self {
            chat: ChatService::new(providers, activity.clone()),
            activity,
            admin_email,
        }
    }
}
