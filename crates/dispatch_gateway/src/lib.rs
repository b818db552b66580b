//! WebSocket gateway for the dispatch engine.
//!
//! One engine instance lives behind a mutex; each socket frame becomes one
//! engine command, and a periodic tick task drives the engine's timers. All
//! outbound delivery goes through per-connection writer channels.

pub mod config;
pub mod error;
pub mod protocol;
pub mod state;
pub mod ws;

use std::sync::Arc;

use axum::routing::get;
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Builds the HTTP router: the websocket endpoint plus a liveness probe.
pub fn app(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/ws", get(ws::ws_handler))
        .route("/healthz", get(|| async { "ok" }))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
