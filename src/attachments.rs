//! Staging files for a chat message
//!
//! Text and PDF files are read as text, images become base64 data URLs,
//! anything else is refused. Files above `MAX_ATTACHMENT_BYTES` are refused
//! before being read.

use crate::chat::Attachment;
use base64::Engine;
use std::path::Path;
use thiserror::Error;

/// 10 MB
pub const MAX_ATTACHMENT_BYTES: u64 = 10 * 1024 * 1024;

#[derive(Debug, Error)]
pub enum AttachmentError {
    #[error("File size must be less than 10MB")]
    TooLarge { size: u64 },
    #[error("Unsupported file type: {0}")]
    UnsupportedType(String),
    #[error("Failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// How a file's bytes are carried in the request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Encoding {
    Text,
    DataUrl,
}

fn encoding_for(mime_type: &str) -> Option<Encoding> {
    if mime_type.starts_with("text/") || mime_type == "application/pdf" {
        Some(Encoding::Text)
    } else if mime_type.starts_with("image/") {
        Some(Encoding::DataUrl)
    } else {
        None
    }
}

/// Build an attachment from raw bytes
pub fn attachment_from_bytes(
    name: impl Into<String>,
    mime_type: impl Into<String>,
    bytes: &[u8],
) -> Result<Attachment, AttachmentError> {
    let mime_type = mime_type.into();
    let size = bytes.len() as u64;
    if size > MAX_ATTACHMENT_BYTES {
        return Err(AttachmentError::TooLarge { size });
    }

    let content = match encoding_for(&mime_type) {
        Some(Encoding::Text) => String::from_utf8_lossy(bytes).into_owned(),
        Some(Encoding::DataUrl) => format!(
            "data:{mime_type};base64,{}",
            base64::engine::general_purpose::STANDARD.encode(bytes)
        ),
        None => return Err(AttachmentError::UnsupportedType(mime_type)),
    };

    Ok(Attachment {
        name: name.into(),
        mime_type,
        size,
        content: Some(content),
    })
}

/// Read a file from disk into an attachment, guessing its type from the name
pub async fn load_attachment(path: &Path) -> Result<Attachment, AttachmentError> {
    let display = path.display().to_string();
    let io_err = |source: std::io::Error| AttachmentError::Io {
        path: display.clone(),
        source,
    };

    let metadata = tokio::fs::metadata(path).await.map_err(io_err)?;
    if metadata.len() > MAX_ATTACHMENT_BYTES {
        return Err(AttachmentError::TooLarge {
            size: metadata.len(),
        });
    }

    let mime_type = mime_guess::from_path(path)
        .first()
        .map_or_else(|| "application/octet-stream".to_string(), |m| m.essence_str().to_string());
    if encoding_for(&mime_type).is_none() {
        return Err(AttachmentError::UnsupportedType(mime_type));
    }

    let bytes = tokio::fs::read(path).await.map_err(io_err)?;
    let name = path
        .file_name()
        .map_or_else(|| display.clone(), |n| n.to_string_lossy().into_owned());
    attachment_from_bytes(name, mime_type, &bytes)
}
