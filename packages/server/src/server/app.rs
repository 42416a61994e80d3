//! Application setup and server configuration.

use std::sync::Arc;

use axum::{
    extract::Extension,
    routing::{get, post, put},
    Router,
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::server::routes::{
    add_field_handler, chat_handler, create_session_handler, delete_session_handler,
    download_handler, health_handler, remove_field_handler, reset_handler, session_handler,
    update_field_handler,
};
use crate::server::static_files::serve_ui;
use crate::sessions::SessionRegistry;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<SessionRegistry>,
}

/// Build the Axum application router
pub fn build_app(registry: Arc<SessionRegistry>) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/api/sessions", post(create_session_handler))
        .route(
            "/api/sessions/:id",
            get(session_handler).delete(delete_session_handler),
        )
        .route("/api/sessions/:id/fields", post(add_field_handler))
        .route(
            "/api/sessions/:id/fields/:index",
            put(update_field_handler).delete(remove_field_handler),
        )
        .route("/api/sessions/:id/chat", post(chat_handler))
        .route("/api/sessions/:id/reset", post(reset_handler))
        .route(
            "/api/sessions/:id/turns/:turn/download/:kind",
            get(download_handler),
        )
        .fallback(serve_ui)
        .layer(Extension(AppState { registry }))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}
