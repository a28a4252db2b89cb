pub mod health;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};

use crate::state::AppState;
use crate::summary::handlers;

pub fn build_router(state: AppState) -> Router {
    let upload_limit = state.config.max_upload_bytes;

    Router::new()
        .route("/health", get(health::health_handler))
        .route(
            "/generate_summary",
            post(handlers::handle_generate_summary).layer(DefaultBodyLimit::max(upload_limit)),
        )
        .with_state(state)
}
