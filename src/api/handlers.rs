//! API Handlers
//!
//! HTTP request handlers for each document service endpoint.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    Json,
};

use crate::cache::CacheStats;
use crate::content::{ContentService, Document, DocumentType, ServiceDiagnostics, ServiceHealth};
use crate::error::{CacheError, Result};
use crate::models::{ClearResponse, DocumentQuery, ResetResponse, SyncRequest, SyncResponse};

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<ContentService>,
}

impl AppState {
    pub fn new(service: ContentService) -> Self {
        Self {
            service: Arc::new(service),
        }
    }
}

/// Handler for GET /documents/:doc_type/:filename
///
/// Every retrieval failure surfaces as 404; `/health` and `/diagnostics`
/// carry the cause.
pub async fn document_handler(
    State(state): State<AppState>,
    Path((doc_type, filename)): Path<(String, String)>,
    Query(query): Query<DocumentQuery>,
) -> Result<Json<Document>> {
    let doc_type: DocumentType = doc_type.parse()?;
    if let Some(error_msg) = query.validate() {
        return Err(CacheError::Validation(error_msg));
    }

    state
        .service
        .get_document(doc_type, &filename, query.ttl_override())
        .await
        .map(Json)
        .ok_or_else(|| CacheError::NotFound(format!("{}/{}", doc_type.directory(), filename)))
}

/// Handler for POST /sync/:doc_type
pub async fn sync_handler(
    State(state): State<AppState>,
    Path(doc_type): Path<String>,
    Json(req): Json<SyncRequest>,
) -> Result<Json<SyncResponse>> {
    let doc_type: DocumentType = doc_type.parse()?;
    let invalidated = state.service.sync_listing(doc_type, &req.files).await;

    Ok(Json(SyncResponse::new(doc_type, req.files.len(), invalidated)))
}

/// Handler for DELETE /cache
pub async fn clear_handler(State(state): State<AppState>) -> Json<ClearResponse> {
    let cache = state.service.cache();
    let cleared = cache.len().await;
    cache.clear().await;

    Json(ClearResponse::new(cleared))
}

/// Handler for GET /stats
pub async fn stats_handler(State(state): State<AppState>) -> Json<CacheStats> {
    Json(state.service.cache().stats().await)
}

/// Handler for GET /health
pub async fn health_handler(State(state): State<AppState>) -> Json<ServiceHealth> {
    Json(state.service.get_health_status().await)
}

/// Handler for POST /health/reset
pub async fn reset_health_handler(State(state): State<AppState>) -> Json<ResetResponse> {
    state.service.reset_health();
    Json(ResetResponse::health_reset())
}

/// Handler for GET /diagnostics
pub async fn diagnostics_handler(State(state): State<AppState>) -> Json<ServiceDiagnostics> {
    Json(state.service.get_service_diagnostics().await)
}
