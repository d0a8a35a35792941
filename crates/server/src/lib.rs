//! The chat proxy: a single streaming endpoint in front of a model
//! provider, plus static serving of the UI.

#[macro_use]
extern crate tracing;

mod chat;
pub mod config;
mod error;

use std::path::Path;
use std::sync::Arc;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::routing::post;
use persona_chat_core::api::CHAT_PATH;
use persona_chat_core::{ModelClient, PromptOptions};
use tower_http::services::{ServeDir, ServeFile};
use tower_http::trace::TraceLayer;

pub use config::{ConfigError, ServerConfig};
pub use error::ChatError;

/// Largest accepted request body.
pub const BODY_LIMIT: usize = 1024 * 1024;

/// Shared, read-only state of the request handlers.
#[derive(Clone)]
pub struct AppState {
    pub(crate) model_client: ModelClient,
    pub(crate) prompt_options: PromptOptions,
}

impl AppState {
    #[inline]
    pub fn new(model_client: ModelClient, prompt_options: PromptOptions) -> Self {
        Self {
            model_client,
            prompt_options,
        }
    }
}

/// Builds the application router.
///
/// Requests other than the chat endpoint are served from `static_dir`.
/// Paths that don't name a file get `index.html`, so client-side routes
/// survive a reload.
pub fn app(state: AppState, static_dir: &Path) -> Router {
    let assets = ServeDir::new(static_dir)
        .fallback(ServeFile::new(static_dir.join("index.html")));

    Router::new()
        .route(CHAT_PATH, post(chat::chat))
        .layer(DefaultBodyLimit::max(BODY_LIMIT))
        .fallback_service(assets)
        .layer(TraceLayer::new_for_http())
        .with_state(Arc::new(state))
}
