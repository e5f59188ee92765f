//! STUDEX Tutor - AI homework assistant
//!
//! The `/chat` service with its provider cascade and offline fallback, and
//! the conversation controller used by chat clients.

#![allow(clippy::missing_errors_doc, clippy::must_use_candidate)]

pub mod activity;
pub mod api;
pub mod attachments;
pub mod chat;
pub mod db;
pub mod fallback;
pub mod llm;
pub mod prompt;
pub mod runtime;
pub mod state_machine;
pub mod title_generator;
