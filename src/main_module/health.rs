//! Health check handlers

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use log::warn;
use std::sync::Arc;

use crate::core::shared::state::AppState;

pub async fn health_check(State(state): State<Arc<AppState>>) -> (StatusCode, Json<serde_json::Value>) {
    let db_ok = match state.store.ping().await {
        Ok(()) => true,
        Err(e) => {
            warn!("Health check store ping failed: {}", e);
            false
        }
    };

    let status = if db_ok { "healthy" } else { "degraded" };
    let code = if db_ok {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        code,
        Json(serde_json::json!({
            "status": status,
            "service": "fmserver",
            "version": env!("CARGO_PKG_VERSION"),
            "database": db_ok,
            "summarizer": state.config.llm.api_key().is_some()
        })),
    )
}

pub async fn health_check_simple() -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::OK,
        Json(serde_json::json!({
            "status": "ok",
            "service": "fmserver",
            "version": env!("CARGO_PKG_VERSION")
        })),
    )
}
