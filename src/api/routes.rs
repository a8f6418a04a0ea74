//! API Routes
//!
//! Configures the Axum router with all document service endpoints.

use axum::{
    routing::{delete, get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::handlers::{
    clear_handler, diagnostics_handler, document_handler, health_handler, reset_health_handler,
    stats_handler, sync_handler, AppState,
};

/// Creates the main router with all endpoints configured.
///
/// # Endpoints
/// - `GET /documents/:doc_type/:filename` - Fetch a document, `?ttl=secs` overrides caching
/// - `POST /sync/:doc_type` - Invalidate stale documents from a listing
/// - `DELETE /cache` - Clear the document cache
/// - `GET /stats` - Cache statistics
/// - `GET /health` - Service health
/// - `POST /health/reset` - Zero the request counters
/// - `GET /diagnostics` - Health, cache statistics and breaker states
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/documents/:doc_type/:filename", get(document_handler))
        .route("/sync/:doc_type", post(sync_handler))
        .route("/cache", delete(clear_handler))
        .route("/stats", get(stats_handler))
        .route("/health", get(health_handler))
        .route("/health/reset", post(reset_health_handler))
        .route("/diagnostics", get(diagnostics_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
