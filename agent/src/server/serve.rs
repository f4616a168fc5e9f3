//! HTTP server setup

use std::future::Future;
use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::app::options::ServerOptions;
use crate::errors::AgentError;
use crate::server::handlers::{
    attendance_handler, cms_handler, config_handler, css_handler, health_handler,
    reload_handler, session_handler, update_check_handler, update_status_handler,
    version_handler,
};
use crate::server::state::ServerState;

/// Build the router for the kiosk UI
pub fn router(state: Arc<ServerState>) -> Router {
    Router::new()
        // Health and version
        .route("/health", get(health_handler))
        .route("/version", get(version_handler))
        // Configuration and content
        .route("/config", get(config_handler))
        .route("/config/cms", get(cms_handler))
        .route("/config/css", get(css_handler))
        // Updates
        .route("/update/check", post(update_check_handler))
        .route("/update/status", get(update_status_handler))
        // Live session
        .route("/session", get(session_handler))
        .route("/attendance", get(attendance_handler))
        .route("/events/reload", get(reload_handler))
        // State and middleware
        .with_state(state)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
}

/// Start the HTTP server
pub async fn serve(
    options: &ServerOptions,
    state: Arc<ServerState>,
    shutdown_signal: impl Future<Output = ()> + Send + 'static,
) -> Result<JoinHandle<Result<(), AgentError>>, AgentError> {
    let app = router(state);

    let addr = format!("{}:{}", options.host, options.port);
    info!("Starting HTTP server on {}", addr);

    let listener = TcpListener::bind(&addr)
        .await
        .map_err(|e| AgentError::ServerError(e.to_string()))?;

    let handle = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal)
            .await
            .map_err(|e| AgentError::ServerError(e.to_string()))
    });

    Ok(handle)
}
