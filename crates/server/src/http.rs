//! HTTP endpoints

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::state::AppState;
use crate::websocket::ws_handler;

/// Create the application router
pub fn create_router(state: AppState) -> Router {
    let mut router = Router::new()
        // Voice session socket
        .route("/ws", get(ws_handler))
        // Session introspection
        .route("/api/sessions", get(list_sessions))
        .route("/api/sessions/:id", get(get_session))
        // Tool introspection
        .route("/api/tools", get(list_tools))
        // Health and metrics
        .route("/health", get(health_check))
        .route("/ready", get(readiness_check))
        .route("/metrics", get(render_metrics))
        // Middleware
        .layer(TraceLayer::new_for_http());

    if state.config.server.cors_enabled {
        router = router.layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        );
    }

    router.with_state(state)
}

async fn health_check() -> &'static str {
    "ok"
}

async fn readiness_check(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "sessions": state.registry.count(),
        "capacity": state.config.server.max_sessions,
    }))
}

async fn list_sessions(State(state): State<AppState>) -> Json<serde_json::Value> {
    let sessions = state.registry.list();
    Json(serde_json::json!({
        "count": sessions.len(),
        "sessions": sessions,
    }))
}

async fn get_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, StatusCode> {
    let bridge = state.registry.get(&id).ok_or(StatusCode::NOT_FOUND)?;

    Ok(Json(serde_json::json!({
        "session_id": bridge.session_id(),
        "user": bridge.context().user_id,
        "role": bridge.context().role,
        "state": bridge.state().as_str(),
    })))
}

async fn list_tools(State(state): State<AppState>) -> Json<serde_json::Value> {
    let tools: Vec<serde_json::Value> = state
        .gateway
        .list()
        .into_iter()
        .map(|(name, description)| {
            serde_json::json!({
                "name": name,
                "description": description,
            })
        })
        .collect();

    Json(serde_json::json!({ "tools": tools }))
}

async fn render_metrics(State(state): State<AppState>) -> impl IntoResponse {
    match &state.metrics {
        Some(handle) => handle.render().into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use voice_bridge_config::Settings;
    use voice_bridge_tools::{create_document_gateway, InMemoryDocumentStore};

    #[tokio::test]
    async fn test_router_builds_with_defaults() {
        let store = Arc::new(InMemoryDocumentStore::new());
        let state = AppState::new(
            Settings::default(),
            Arc::new(crate::echo::EchoPipeline::new()),
            Arc::new(create_document_gateway(store)),
        );
        let _router = create_router(state);
    }
}
