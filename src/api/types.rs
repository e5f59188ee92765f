//! API request and response types

use crate::chat::{Attachment, ChatRequest, ChatResponse};
use crate::llm::{ModelDef, Source, DEFAULT_MODEL};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// JSON body of `POST /chat`
#[derive(Debug, Default, Deserialize)]
pub struct ChatRequestBody {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub context: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    /// Anything other than an array is treated as no attachments
    #[serde(default)]
    pub attachments: Value,
}

/// Attachment as sent by the web client
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttachmentBody {
    pub name: String,
    #[serde(rename = "type", default)]
    pub mime_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
}

impl From<AttachmentBody> for Attachment {
    fn from(body: AttachmentBody) -> Self {
        let size = body
            .size
            .or_else(|| body.content.as_ref().map(|c| c.len() as u64))
            .unwrap_or(0);
        Attachment {
            name: body.name,
            mime_type: body.mime_type,
            size,
            content: body.content,
        }
    }
}

impl From<&Attachment> for AttachmentBody {
    fn from(attachment: &Attachment) -> Self {
        AttachmentBody {
            name: attachment.name.clone(),
            mime_type: attachment.mime_type.clone(),
            content: attachment.content.clone(),
            size: Some(attachment.size),
        }
    }
}

impl ChatRequestBody {
    pub fn into_request(self) -> ChatRequest {
        let attachments = match self.attachments {
            Value::Array(items) => items
                .into_iter()
                .filter_map(|item| serde_json::from_value::<AttachmentBody>(item).ok())
                .map(Attachment::from)
                .collect(),
            _ => Vec::new(),
        };

        ChatRequest {
            message: self.message.unwrap_or_default(),
            context: self.context.filter(|c| !c.is_empty()),
            model: normalize_model(self.model),
            attachments,
        }
    }
}

/// Empty or missing model ids select the default
pub fn normalize_model(model: Option<String>) -> String {
    model
        .filter(|m| !m.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_MODEL.to_string())
}

/// Outgoing JSON body, used by the HTTP chat backend
#[derive(Debug, Serialize)]
pub struct OutgoingChatBody<'a> {
    pub message: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<&'a str>,
    pub model: &'a str,
    pub attachments: Vec<AttachmentBody>,
}

impl<'a> From<&'a ChatRequest> for OutgoingChatBody<'a> {
    fn from(request: &'a ChatRequest) -> Self {
        Self {
            message: &request.message,
            context: request.context.as_deref(),
            model: &request.model,
            attachments: request.attachments.iter().map(AttachmentBody::from).collect(),
        }
    }
}

/// Response for a chat request
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChatResponseBody {
    pub response: String,
    pub model: String,
    pub source: Source,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl From<ChatResponse> for ChatResponseBody {
    fn from(response: ChatResponse) -> Self {
        Self {
            response: response.text,
            model: response.model_used,
            source: response.source,
            note: response.note,
        }
    }
}

impl From<ChatResponseBody> for ChatResponse {
    fn from(body: ChatResponseBody) -> Self {
        Self {
            text: body.response,
            model_used: body.model,
            source: body.source,
            note: body.note,
        }
    }
}

/// Response for model list
#[derive(Debug, Serialize)]
pub struct ModelsResponse {
    pub models: Vec<ModelDef>,
    pub default: String,
}

/// Filters for `GET /api/activity`; the first present one applies
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityQuery {
    pub user_id: Option<String>,
    pub action: Option<String>,
    pub hours: Option<i64>,
}

/// Error response
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            error: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_defaults_and_lenient_attachments() {
        let body: ChatRequestBody =
            serde_json::from_value(json!({ "message": "hi", "attachments": "nope" })).unwrap();
        let request = body.into_request();
        assert_eq!(request.model, "gpt-4o-mini");
        assert!(request.attachments.is_empty());
        assert!(request.context.is_none());

        let body: ChatRequestBody = serde_json::from_value(json!({ "model": "" })).unwrap();
        assert_eq!(body.into_request().model, "gpt-4o-mini");
    }

    #[test]
    fn test_attachment_size_from_content() {
        let body: ChatRequestBody = serde_json::from_value(json!({
            "message": "",
            "attachments": [
                { "name": "a.txt", "type": "text/plain", "content": "hello" },
                { "name": "b.png", "type": "image/png", "size": 2048 }
            ]
        }))
        .unwrap();
        let request = body.into_request();
        assert_eq!(request.attachments.len(), 2);
        assert_eq!(request.attachments[0].size, 5);
        assert_eq!(request.attachments[0].mime_type, "text/plain");
        assert_eq!(request.attachments[1].size, 2048);
    }

    #[test]
    fn test_response_body_omits_missing_note() {
        let body = ChatResponseBody::from(ChatResponse {
            text: "Hi".to_string(),
            model_used: "gpt-4o".to_string(),
            source: Source::Primary,
            note: None,
        });
        assert_eq!(
            serde_json::to_value(&body).unwrap(),
            json!({ "response": "Hi", "model": "gpt-4o", "source": "openai" })
        );
    }
}
