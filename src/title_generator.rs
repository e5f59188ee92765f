//! Conversation title derivation
//!
//! Titles come from the first user message: whitespace collapsed, cut to
//! fit `MAX_TITLE_LENGTH` characters with a trailing ellipsis when cut.

use crate::db::{AttachmentMeta, DEFAULT_TITLE};

pub const MAX_TITLE_LENGTH: usize = 40;

const ELLIPSIS: &str = "...";

/// Derive a title from the first user message. Attachment-only messages are
/// titled after the first file.
pub fn derive_title(message: &str, attachments: &[AttachmentMeta]) -> String {
    let collapsed = message.split_whitespace().collect::<Vec<_>>().join(" ");
    let source = if collapsed.is_empty() {
        match attachments.first() {
            Some(attachment) => attachment.name.clone(),
            None => return DEFAULT_TITLE.to_string(),
        }
    } else {
        collapsed
    };
    truncate_title(&source)
}

fn truncate_title(text: &str) -> String {
    if text.chars().count() <= MAX_TITLE_LENGTH {
        return text.to_string();
    }
    let keep = MAX_TITLE_LENGTH - ELLIPSIS.len();
    let cut: String = text.chars().take(keep).collect();
    format!("{}{ELLIPSIS}", cut.trim_end())
}
