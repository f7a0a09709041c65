//! HTTP server initialization and routing

use axum::routing::get;
use axum::Router;
use log::{error, info};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::core::shared::state::AppState;
use crate::core::urls::ApiUrls;

use super::{health_check, health_check_simple, shutdown_signal};

pub fn create_router(app_state: Arc<AppState>) -> Router {
    Router::new()
        .route(ApiUrls::HEALTH, get(health_check_simple))
        .route(ApiUrls::API_HEALTH, get(health_check))
        .merge(crate::channels::configure())
        .with_state(app_state)
        .layer(TraceLayer::new_for_http())
}

pub async fn run_axum_server(app_state: Arc<AppState>) -> std::io::Result<()> {
    let host = app_state.config.server.host.clone();
    let port = app_state.config.server.port;
    let addr: SocketAddr = format!("{host}:{port}").parse().map_err(|e| {
        std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            format!("invalid listen address {host}:{port}: {e}"),
        )
    })?;

    let app = create_router(app_state);

    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(l) => l,
        Err(e) => {
            error!(
                "Failed to bind to {}: {} - is another instance running?",
                addr, e
            );
            return Err(e);
        }
    };
    info!("HTTP server listening on {}", addr);
    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(std::io::Error::other)
}
