//! HTTP API for the relay.
//!
//! Routes:
//! - `POST /v1/chat/completions` — relay a conversation through the chain
//! - `GET /v1/models` — chain entries as virtual models
//! - `GET /health` — service liveness
//! - `GET /health/providers` — per-provider cooldown state

mod chat;
pub mod types;

use std::sync::Arc;

use axum::{
    extract::State,
    response::Json,
    routing::{get, post},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::config::Config;
use crate::health::{ProviderHealthSnapshot, ProviderHealthTracker};
use crate::llm::{CompletionRouter, HttpUpstreamClient};
use crate::providers::resolve_entries;

use types::HealthResponse;

/// Shared state for all handlers.
pub(crate) struct AppState {
    pub router: CompletionRouter,
    pub started_at: chrono::DateTime<chrono::Utc>,
}

/// Build the router and serve until shutdown.
pub async fn serve(config: Config) -> anyhow::Result<()> {
    let entries = resolve_entries(&config)?;
    tracing::info!(
        chain = %entries
            .iter()
            .map(|e| format!("{}:{}", e.provider, e.model))
            .collect::<Vec<_>>()
            .join(","),
        "Resolved provider chain"
    );

    let health = Arc::new(ProviderHealthTracker::new());
    let client = Arc::new(HttpUpstreamClient::new()?);
    let router = CompletionRouter::new(entries, health, client);

    let state = Arc::new(AppState {
        router,
        started_at: chrono::Utc::now(),
    });

    let app = app(state);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(addr = %addr, "Listening");
    axum::serve(listener, app).await?;
    Ok(())
}

fn app(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/v1/chat/completions", post(chat::chat_completions))
        .route("/v1/models", get(chat::list_models))
        .route("/health", get(health_check))
        .route("/health/providers", get(provider_health))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

async fn provider_health(
    State(state): State<Arc<AppState>>,
) -> Json<Vec<ProviderHealthSnapshot>> {
    // Report every chain provider, including ones that have never failed.
    let mut snapshots = Vec::new();
    let mut seen = std::collections::HashSet::new();
    for entry in state.router.entries() {
        if seen.insert(entry.provider.id()) {
            snapshots.push(state.router.health().snapshot(entry.provider.id()).await);
        }
    }
    Json(snapshots)
}
