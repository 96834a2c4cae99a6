//! Parlor server library logic.
//!
//! All authoritative state lives in one [`parlor_rooms::Directory`]
//! behind a single async mutex. Every inbound socket event locks it,
//! runs to completion, collects the frames to fan out, and only sends
//! after the lock is released. That gives each event transactional
//! visibility without per-structure locking.

pub mod api_ws;
pub mod config;

use axum::{routing::get, Extension, Json, Router};
use parlor_rooms::Directory;
use serde_json::{json, Value};
use std::sync::Arc;
use tokio::sync::Mutex;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Application state shared across all request handlers.
pub struct AppState {
    /// The room directory: sessions, rooms, channels, messages.
    pub hub: Mutex<Directory>,
    /// Connection manager for WebSockets.
    pub connections: api_ws::ConnectionManager,
}

impl AppState {
    /// State with the default room list seeded.
    pub fn new() -> Self {
        Self {
            hub: Mutex::new(Directory::seeded()),
            connections: api_ws::ConnectionManager::new(),
        }
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}

/// Health check handler.
async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// Builds the application router with all routes.
pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/ws", get(api_ws::ws_handler))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(Extension(Arc::new(state)))
}
