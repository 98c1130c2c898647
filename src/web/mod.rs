//! Presentation shell: an HTTP server around the background removal processor
//!
//! Routes:
//! - `GET /` upload page
//! - `POST /remove` form submission, answers with the result or error page
//! - `POST /api/remove` returns the PNG as an attachment, JSON on failure
//! - `GET /health` liveness and segmenter name

mod handlers;
pub mod page;

pub use handlers::UPLOAD_FIELD;

use crate::{config::AppConfig, error::BgRemovalError, processor::BackgroundRemovalProcessor};
use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{info, warn};

/// Shared, read-only state handed to every request
#[derive(Clone, Debug)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub processor: BackgroundRemovalProcessor,
}

impl AppState {
    #[must_use]
    pub fn new(config: AppConfig, processor: BackgroundRemovalProcessor) -> Self {
        Self {
            config: Arc::new(config),
            processor,
        }
    }
}

/// Build the router
///
/// The request body limit is the configured upload limit.
pub fn router(state: AppState) -> Router {
    let body_limit = state.config.server.max_upload_bytes();

    Router::new()
        .route("/", get(handlers::index))
        .route("/remove", post(handlers::remove_form))
        .route("/api/remove", post(handlers::remove_api))
        .route("/health", get(handlers::health))
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(state)
}

/// Bind the configured address and serve until Ctrl-C
///
/// # Errors
/// - Address cannot be bound
/// - Server I/O failures
pub async fn serve(state: AppState) -> crate::Result<()> {
    let address = state.config.server.bind_address();
    let listener = TcpListener::bind(&address)
        .await
        .map_err(|e| BgRemovalError::network_error(format!("Failed to bind {address}"), e))?;

    let local = listener.local_addr()?;
    info!(
        address = %local,
        segmenter = %state.processor.segmenter_name(),
        "Monk is listening on http://{local}"
    );

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for Ctrl-C; shutting down");
    }
}
