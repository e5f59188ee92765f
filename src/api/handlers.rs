//! HTTP request handlers

use super::extract::ChatPayload;
use super::types::{ActivityQuery, ChatResponseBody, ErrorResponse, ModelsResponse};
use super::AppState;
use crate::activity::{ActivityEntry, RequestMeta, UserSession};
use crate::chat::{Caller, ChatError};
use crate::llm::{all_models, DEFAULT_MODEL};
use axum::{
    extract::{DefaultBodyLimit, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use std::any::Any;
use tower_http::catch_panic::CatchPanicLayer;

/// Room for several attachments at the 10 MB client limit
const MAX_BODY_BYTES: usize = 32 * 1024 * 1024;

/// Create the API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Homework assistant
        .route("/chat", post(send_chat))
        .route("/api/chat", post(send_chat))
        // Model catalog
        .route("/api/models", get(list_models))
        // Admin activity log
        .route("/api/activity", get(list_activity))
        // Version
        .route("/version", get(get_version))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(CatchPanicLayer::custom(panic_response))
        .with_state(state)
}

// ============================================================
// Chat
// ============================================================

async fn send_chat(
    State(state): State<AppState>,
    headers: HeaderMap,
    ChatPayload(request): ChatPayload,
) -> Result<Json<ChatResponseBody>, AppError> {
    let caller = Caller {
        session: UserSession::from_headers(&headers),
        meta: RequestMeta::from_headers(&headers),
    };

    let response = state
        .chat
        .respond(&request, &caller)
        .await
        .map_err(|ChatError::Validation(message)| AppError::BadRequest(message))?;

    Ok(Json(response.into()))
}

// ============================================================
// Model Info
// ============================================================

async fn list_models() -> Json<ModelsResponse> {
    Json(ModelsResponse {
        models: all_models().to_vec(),
        default: DEFAULT_MODEL.to_string(),
    })
}

// ============================================================
// Activity Log
// ============================================================

async fn list_activity(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<ActivityQuery>,
) -> Result<Json<Vec<ActivityEntry>>, AppError> {
    let email = UserSession::from_headers(&headers)
        .and_then(|session| session.email)
        .ok_or(AppError::Unauthorized)?;

    if state.admin_email.as_deref() != Some(email.as_str()) {
        return Err(AppError::Forbidden);
    }

    let log = &state.activity;
    let entries = if let Some(user_id) = query.user_id {
        log.for_user(&user_id)
    } else if let Some(action) = query.action {
        log.by_action(&action)
    } else if let Some(hours) = query.hours {
        if hours < 0 {
            return Err(AppError::BadRequest("hours must not be negative".to_string()));
        }
        log.recent(hours)
    } else {
        log.all()
    }
    .map_err(|e| AppError::Internal(e.to_string()))?;

    Ok(Json(entries))
}

async fn get_version() -> &'static str {
    concat!("studex-tutor ", env!("CARGO_PKG_VERSION"))
}

// ============================================================
// Error Handling
// ============================================================

const INTERNAL_ERROR: &str = "Internal server error";

pub(crate) enum AppError {
    BadRequest(String),
    Unauthorized,
    Forbidden,
    /// Detail is logged, never returned
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::Unauthorized => (StatusCode::UNAUTHORIZED, "Unauthorized".to_string()),
            AppError::Forbidden => (StatusCode::FORBIDDEN, "Admin access required".to_string()),
            AppError::Internal(detail) => {
                tracing::error!(error = %detail, "Request failed");
                (StatusCode::INTERNAL_SERVER_ERROR, INTERNAL_ERROR.to_string())
            }
        };

        let body = Json(ErrorResponse::new(message));
        (status, body).into_response()
    }
}

#[allow(clippy::needless_pass_by_value)] // signature required by CatchPanicLayer
fn panic_response(panic: Box<dyn Any + Send + 'static>) -> Response {
    let detail = panic
        .downcast_ref::<String>()
        .cloned()
        .or_else(|| panic.downcast_ref::<&str>().map(|s| (*s).to_string()))
        .unwrap_or_else(|| "unknown panic".to_string());
    AppError::Internal(format!("Handler panicked: {detail}")).into_response()
}
