//! Chat request decoding
//!
//! The chat endpoint accepts JSON and multipart bodies. Any other content
//! type decodes to an empty request, which validation then rejects.

use super::handlers::AppError;
use super::types::ChatRequestBody;
use crate::chat::{Attachment, ChatRequest};
use axum::{
    async_trait,
    extract::{FromRequest, Multipart, Request},
    http::header::CONTENT_TYPE,
    Json,
};

const OCTET_STREAM: &str = "application/octet-stream";

/// Chat request decoded from whichever body format the client used
pub(crate) struct ChatPayload(pub ChatRequest);

#[async_trait]
impl<S> FromRequest<S> for ChatPayload
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let content_type = req
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_ascii_lowercase();

        if content_type.contains("application/json") {
            let Json(body) = Json::<ChatRequestBody>::from_request(req, state)
                .await
                .map_err(|e| AppError::Internal(format!("Invalid JSON body: {e}")))?;
            Ok(Self(body.into_request()))
        } else if content_type.contains("multipart/form-data") {
            let multipart = Multipart::from_request(req, state)
                .await
                .map_err(|e| AppError::Internal(format!("Invalid multipart body: {e}")))?;
            Ok(Self(read_multipart(multipart).await?))
        } else {
            Ok(Self(ChatRequestBody::default().into_request()))
        }
    }
}

/// Text fields fill the request; file parts become descriptors without content
async fn read_multipart(mut multipart: Multipart) -> Result<ChatRequest, AppError> {
    let mut body = ChatRequestBody::default();
    let mut attachments = Vec::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Internal(format!("Invalid multipart field: {e}")))?
    {
        let field_name = field.name().unwrap_or_default().to_string();
        let file_name = field.file_name().map(String::from);
        let part_type = field.content_type().map(String::from);

        if file_name.is_some() || part_type.is_some() {
            let bytes = field
                .bytes()
                .await
                .map_err(|e| AppError::Internal(format!("Failed to read upload: {e}")))?;
            let name = file_name.filter(|n| !n.is_empty()).unwrap_or(field_name);
            let mime_type = part_type
                .filter(|t| !t.is_empty())
                .or_else(|| {
                    mime_guess::from_path(&name)
                        .first()
                        .map(|m| m.essence_str().to_string())
                })
                .unwrap_or_else(|| OCTET_STREAM.to_string());
            attachments.push(Attachment {
                name,
                mime_type,
                size: bytes.len() as u64,
                content: None,
            });
            continue;
        }

        let text = field
            .text()
            .await
            .map_err(|e| AppError::Internal(format!("Failed to read field: {e}")))?;
        match field_name.as_str() {
            "message" => body.message = Some(text),
            "context" => body.context = Some(text),
            "model" => body.model = Some(text),
            other => tracing::debug!(field = other, "Ignoring multipart field"),
        }
    }

    let mut request = body.into_request();
    request.attachments = attachments;
    Ok(request)
}
