//! HTTP server initialization and routing

use axum::{extract::Request, routing::get, Router, ServiceExt};
use log::{error, info};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::normalize_path::NormalizePath;
use tower_http::trace::TraceLayer;

use crate::core::shared::state::AppState;
use crate::tickets::configure_tickets_routes;

use super::{health_check, shutdown_signal};

pub fn build_router(app_state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/api/health", get(health_check))
        .merge(configure_tickets_routes())
        .with_state(app_state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

/// Wraps the router so `/api/tickets/` and `/api/tickets` reach the same
/// handler. Normalization has to run before routing, hence outside the
/// router.
pub fn build_app(app_state: Arc<AppState>) -> NormalizePath<Router> {
    NormalizePath::trim_trailing_slash(build_router(app_state))
}

pub async fn run_axum_server(app_state: Arc<AppState>, addr: &str) -> std::io::Result<()> {
    let app = build_app(app_state);

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
    axum::serve(listener, ServiceExt::<Request>::into_make_service(app))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(std::io::Error::other)
}
