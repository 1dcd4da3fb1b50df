//! Manifest and trigger HTTP server.
//!
//! Serves the plugin catalog over HTTP:
//!
//! - `GET  /health` - liveness plus backend connection state
//! - `GET  /manifest` - the plugin manifest
//! - `POST /actions/{name}` - run an action; body is its props object
//! - `POST /triggers/{name}/poll` - poll a trigger; body is `{ props, cursor? }`
//!
//! Every request goes through the one [`HulyApi`] handed to [`router`], so
//! all concurrent HTTP calls share a single backend connection.

mod handlers;

use std::future::Future;
use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use tokio::net::TcpListener;

use crate::catalog::Manifest;
use crate::huly::HulyApi;

pub use handlers::ApiError;

/// State shared by all handlers.
#[derive(Clone)]
pub struct AppState {
    pub api: HulyApi,
    pub manifest: Arc<Manifest>,
}

impl AppState {
    pub fn new(api: HulyApi) -> Self {
        Self {
            api,
            manifest: Arc::new(Manifest::build()),
        }
    }
}

/// Build the HTTP router.
pub fn router(api: HulyApi) -> Router {
    // ---
    Router::new()
        .route("/health", get(handlers::health))
        .route("/manifest", get(handlers::manifest))
        .route("/actions/{name}", post(handlers::run_action))
        .route("/triggers/{name}/poll", post(handlers::poll_trigger))
        .with_state(AppState::new(api))
}

/// Serve `router(api)` on `listener` until `shutdown` resolves.
pub async fn serve<F>(listener: TcpListener, api: HulyApi, shutdown: F) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    // ---
    if let Ok(addr) = listener.local_addr() {
        log_info!("manifest server listening on http://{addr} (manifest at /manifest)");
    }

    axum::serve(listener, router(api))
        .with_graceful_shutdown(shutdown)
        .await
}
