pub mod config;
pub mod error;
pub mod handlers;
pub mod metadata;
pub mod models;
pub mod state;
pub mod storage;
pub mod ui;
pub mod utils;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    http::{HeaderValue, Method, header},
    routing::{delete, get, post},
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::{
    handlers::{delete_file, download_file, health_check, list_files, upload_files},
    state::AppState,
    ui::index,
};

/// Build the application router over `state`.
pub fn router(state: AppState) -> Router {
    let body_limit = usize::try_from(state.config.max_upload_size).unwrap_or(usize::MAX);
    let cors = cors_layer(&state.config.allowed_origins);

    Router::new()
        .route("/", get(index))
        .route("/health", get(health_check))
        .route("/upload", post(upload_files))
        .route("/files", get(list_files))
        .route("/download/{id}", get(download_file))
        .route("/delete/{id}", delete(delete_file))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// CORS for the configured origins. An empty list means any origin, without credentials.
/// Entries that are not valid header values never match.
pub fn cors_layer(origins: &[String]) -> CorsLayer {
    let methods = [Method::GET, Method::POST, Method::DELETE];

    if origins.is_empty() {
        return CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(methods)
            .allow_headers(Any);
    }

    let parsed: Vec<HeaderValue> = origins.iter().filter_map(|o| o.parse().ok()).collect();

    CorsLayer::new()
        .allow_origin(parsed)
        .allow_methods(methods)
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT])
        .allow_credentials(true)
}
