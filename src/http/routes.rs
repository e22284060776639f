use super::handlers;
use super::state::AppState;
use axum::{
    routing::{get, post, put},
    Router,
};
use tower_http::trace::TraceLayer;

/// Create the HTTP router with all routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Readiness
        .route("/health", get(handlers::health_check))
        // Recording control
        .route("/session/start", post(handlers::start_session))
        .route("/session/stop", post(handlers::stop_session))
        .route("/session/toggle", post(handlers::toggle_session))
        .route("/session/write-complete", post(handlers::poll_write_complete))
        .route("/session/status", get(handlers::get_status))
        // Phrase context
        .route("/phrase", put(handlers::set_phrase))
        // Live preview
        .route("/preview.jpg", get(handlers::get_preview))
        // Add tracing middleware for request logging
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
