//! Tutor prompt construction
//!
//! Builds the persona instruction, the user turn for the hosted provider
//! (context line, question, attachment summary) and the single plain-text
//! prompt the local model receives.

use crate::chat::{Attachment, ChatRequest};
use std::fmt::Write;

/// Persona for the hosted provider's system message
pub const TUTOR_SYSTEM_PROMPT: &str = "You are a helpful AI tutor assistant for students. Help with homework, explain concepts clearly, and provide step-by-step solutions. Be encouraging and educational. Keep responses concise but thorough. If files are attached, analyze them and provide relevant help.";

/// Persona line leading the local model prompt
const LOCAL_PERSONA: &str =
    "You are a helpful AI tutor for students. Give concise, clear homework help.";

/// Characters of each text attachment included in the prompt
pub const ATTACHMENT_PREVIEW_CHARS: usize = 1000;

/// Build the user turn sent to the hosted provider
pub fn build_user_content(request: &ChatRequest) -> String {
    let mut content = String::new();

    if let Some(context) = request.context.as_deref().filter(|c| !c.is_empty()) {
        let _ = write!(content, "Context: I'm working on \"{context}\"\n\n");
    }
    content.push_str(&request.message);
    content.push_str(&summarize_attachments(&request.attachments));

    content
}

/// Render the attachment list. Text attachments with inline content also
/// contribute a preview of their first characters.
pub fn summarize_attachments(attachments: &[Attachment]) -> String {
    if attachments.is_empty() {
        return String::new();
    }

    let mut summary = String::from("\n\nAttached files:\n");
    for attachment in attachments {
        let _ = writeln!(summary, "- {} ({})", attachment.name, attachment.mime_type);
        if let Some(content) = attachment.content.as_deref().filter(|_| attachment.is_text()) {
            let _ = writeln!(summary, "Content: {}", preview(content));
        }
    }
    summary
}

/// First `ATTACHMENT_PREVIEW_CHARS` characters, with an ellipsis when cut
fn preview(content: &str) -> String {
    let mut chars = content.chars();
    let head: String = chars.by_ref().take(ATTACHMENT_PREVIEW_CHARS).collect();
    if chars.next().is_some() {
        format!("{head}...")
    } else {
        head
    }
}

/// Build the single prompt sent to the local model
pub fn build_local_prompt(message: &str, context: Option<&str>) -> String {
    let mut prompt = format!("{LOCAL_PERSONA}\n\n");
    if let Some(context) = context.filter(|c| !c.is_empty()) {
        let _ = write!(prompt, "Task: {context}\n\n");
    }
    let _ = write!(prompt, "Question: {message}\n\nAnswer:");
    prompt
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(message: &str, context: Option<&str>, attachments: Vec<Attachment>) -> ChatRequest {
        ChatRequest {
            message: message.to_string(),
            context: context.map(String::from),
            model: "gpt-4o-mini".to_string(),
            attachments,
        }
    }

    #[test]
    fn test_user_content_with_context() {
        let content = build_user_content(&request("What is 2+2?", Some("Algebra HW"), vec![]));
        assert_eq!(content, "Context: I'm working on \"Algebra HW\"\n\nWhat is 2+2?");
    }

    #[test]
    fn test_user_content_without_context() {
        let content = build_user_content(&request("What is 2+2?", None, vec![]));
        assert_eq!(content, "What is 2+2?");
    }

    #[test]
    fn test_text_attachment_preview_is_truncated() {
        let long = "a".repeat(ATTACHMENT_PREVIEW_CHARS + 50);
        let attachments = vec![
            Attachment {
                name: "notes.txt".to_string(),
                mime_type: "text/plain".to_string(),
                size: long.len() as u64,
                content: Some(long),
            },
            Attachment {
                name: "diagram.png".to_string(),
                mime_type: "image/png".to_string(),
                size: 2048,
                content: Some("data:image/png;base64,AAAA".to_string()),
            },
        ];
        let summary = summarize_attachments(&attachments);

        assert!(summary.starts_with("\n\nAttached files:\n- notes.txt (text/plain)\n"));
        let expected_preview = format!("Content: {}...\n", "a".repeat(ATTACHMENT_PREVIEW_CHARS));
        assert!(summary.contains(&expected_preview));
        assert!(summary.contains("- diagram.png (image/png)\n"));
        // Non-text content never reaches the prompt
        assert!(!summary.contains("base64"));
    }

    #[test]
    fn test_short_attachment_has_no_ellipsis() {
        let attachments = vec![Attachment {
            name: "a.md".to_string(),
            mime_type: "text/markdown".to_string(),
            size: 5,
            content: Some("hello".to_string()),
        }];
        assert!(summarize_attachments(&attachments).ends_with("Content: hello\n"));
    }

    #[test]
    fn test_local_prompt_layout() {
        let prompt = build_local_prompt("Why is the sky blue?", Some("Physics"));
        assert_eq!(
            prompt,
            format!("{LOCAL_PERSONA}\n\nTask: Physics\n\nQuestion: Why is the sky blue?\n\nAnswer:")
        );
        let bare = build_local_prompt("Why?", None);
        assert!(!bare.contains("Task:"));
    }
}
