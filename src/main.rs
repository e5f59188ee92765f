//! STUDEX Tutor server
//!
//! Serves the homework assistant API.

use std::net::SocketAddr;
use std::sync::Arc;
use studex_tutor::activity::{MemoryActivityLog, DEFAULT_CAPACITY};
use studex_tutor::api::{create_router, AppState};
use studex_tutor::llm::{LlmConfig, ProviderChain};
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "studex_tutor=info,tower_http=debug".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(false)
                .with_span_list(false),
        )
        .init();

    // Configuration
    let port: u16 = std::env::var("STUDEX_PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(8000);

    let admin_email = std::env::var("STUDEX_ADMIN_EMAIL")
        .ok()
        .filter(|e| !e.is_empty());
    if admin_email.is_none() {
        tracing::warn!("STUDEX_ADMIN_EMAIL not set; activity log is not readable");
    }

    let capacity = std::env::var("STUDEX_ACTIVITY_CAPACITY")
        .ok()
        .and_then(|c| c.parse().ok())
        .unwrap_or(DEFAULT_CAPACITY);

    // Provider cascade
    let llm_config = LlmConfig::from_env();
    if llm_config.openai.is_none() {
        tracing::warn!("OPENAI_API_KEY not set; hosted provider disabled");
    }
    let providers = ProviderChain::from_config(&llm_config);
    tracing::info!(providers = ?providers.names(), "Provider cascade initialized");

    // Create application state
    let activity = Arc::new(MemoryActivityLog::with_capacity(capacity));
    let state = AppState::new(providers, activity, admin_email);

    // Create router
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let compression = CompressionLayer::new()
        .gzip(true)
        .br(true)
        .deflate(true)
        .zstd(true);

    let app = create_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(compression);

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("STUDEX Tutor listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
