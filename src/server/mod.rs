//! HTTP interface.
//!
//! Endpoints:
//! - POST /predict - multipart `email` + `audio`, requires `X-API-KEY`
//! - GET /health   - liveness and model identity, unauthenticated

pub mod handlers;
pub mod protocol;

use crate::auth::Authenticator;
use crate::error::{LafalError, Result};
use crate::pipeline::Pipeline;
use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<Pipeline>,
    pub auth: Arc<dyn Authenticator>,
    pub max_upload_bytes: usize,
}

impl AppState {
    pub fn new(pipeline: Arc<Pipeline>, auth: Arc<dyn Authenticator>, max_upload_bytes: usize) -> Self {
        Self {
            pipeline,
            auth,
            max_upload_bytes,
        }
    }
}

/// Build the application router.
pub fn router(state: AppState) -> Router {
    let protected = Router::new()
        .route("/predict", post(handlers::predict))
        .route_layer(axum::middleware::from_fn_with_state(
            state.clone(),
            handlers::require_api_key,
        ));

    Router::new()
        .route("/health", get(handlers::health))
        .merge(protected)
        .layer(DefaultBodyLimit::max(state.max_upload_bytes))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Parse a bind address; a bare `:port` binds all interfaces.
pub fn parse_addr(addr: &str) -> Result<SocketAddr> {
    let addr = if addr.starts_with(':') {
        format!("0.0.0.0{addr}")
    } else {
        addr.to_string()
    };
    addr.parse().map_err(|e| LafalError::ConfigInvalidValue {
        key: "server.bind".to_string(),
        message: format!("'{addr}': {e}"),
    })
}

pub async fn bind(addr: &str) -> Result<TcpListener> {
    let addr = parse_addr(addr)?;
    Ok(TcpListener::bind(addr).await?)
}

/// Serve `app` on `listener` until `shutdown` resolves.
///
/// In-flight requests finish before this returns.
pub async fn serve<F>(listener: TcpListener, app: Router, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    if let Ok(addr) = listener.local_addr() {
        tracing::info!(%addr, "Listening");
    }
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;
    tracing::info!("Server stopped");
    Ok(())
}

/// Resolves on Ctrl-C.
pub async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {e}");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown requested");
}
