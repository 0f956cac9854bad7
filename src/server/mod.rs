//! HTTP surface
//!
//! A small JSON API for the web chat client: send a message, read or clear a
//! session, and browse what Nova remembers.

pub mod api;
pub mod error;
pub mod http;

pub use error::ApiError;
pub use http::HttpServer;

use crate::chat::{Assistant, SessionRegistry};
use axum::{routing::get, Extension, Router};
use std::sync::Arc;

/// Everything the handlers share
pub struct AppState {
    pub assistant: Arc<Assistant>,
    pub sessions: SessionRegistry,
}

impl AppState {
    pub fn new(assistant: Arc<Assistant>) -> Self {
        Self {
            assistant,
            sessions: SessionRegistry::new(),
        }
    }
}

pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .nest("/api", api::router())
        .layer(Extension(state))
}

async fn health_check() -> &'static str {
    "OK"
}
