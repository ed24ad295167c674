// trust-gate-sidecar/src/server.rs
// ============================================================================
// Module: Sidecar HTTP Surface
// Description: Axum routes for ingest, reads, export, and admin actions.
// Purpose: Expose the evidence sidecar behind JWT-scoped endpoints.
// Dependencies: axum, tokio, trust-gate-config, trust-gate-core
// ============================================================================

//! ## Overview
//! Every non-health endpoint requires a verified bearer token with a specific
//! scope. Handlers translate store and pack errors into the `{detail}` error
//! taxonomy and record one audit event per request. Download streams the
//! finished archive; packs that are not ready answer 409.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use axum::Json;
use axum::Router;
use axum::extract::Path;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::http::StatusCode;
use axum::http::header;
use axum::response::IntoResponse;
use axum::response::Response;
use axum::routing::get;
use axum::routing::post;
use serde::Deserialize;
use serde_json::Value;
use serde_json::json;
use thiserror::Error;

use trust_gate_config::SidecarSettings;
use trust_gate_core::PackId;
use trust_gate_core::time::UtcTime;

use crate::audit::RequestAuditEvent;
use crate::audit::RequestAuditSink;
use crate::auth::JwtVerifier;
use crate::auth::SCOPE_ADMIN;
use crate::auth::SCOPE_EXPORT;
use crate::auth::SCOPE_INGEST;
use crate::auth::SCOPE_READ;
use crate::auth::require_any_scope;
use crate::auth::require_scope;
use crate::error::ApiError;
use crate::pack::PackError;
use crate::pack::build_audit_pack;
use crate::store::SidecarStore;
use crate::store::SidecarStoreError;

// ============================================================================
// SECTION: App State
// ============================================================================

/// Shared state behind all sidecar routes.
#[derive(Clone)]
pub struct AppState {
    /// Relational store.
    pub store: Arc<SidecarStore>,
    /// JWT verifier.
    pub verifier: Arc<JwtVerifier>,
    /// Service settings.
    pub settings: SidecarSettings,
    /// Request audit sink.
    pub audit: Arc<dyn RequestAuditSink>,
}

impl AppState {
    /// Records a request audit event.
    fn audit_request(&self, method: &str, path: &str, status: u16) {
        self.audit.record(&RequestAuditEvent::new(method, path, status));
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Server startup errors.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Listener binding failed.
    #[error("failed to bind listener: {0}")]
    Bind(String),
    /// Serving failed.
    #[error("server failure: {0}")]
    Serve(String),
}

impl From<SidecarStoreError> for ApiError {
    fn from(err: SidecarStoreError) -> Self {
        match err {
            SidecarStoreError::NotFound(what) => Self::NotFound(format!("{what} not found")),
            SidecarStoreError::InvalidEvent(detail) => Self::Unprocessable(detail),
            SidecarStoreError::Database(detail) => Self::Internal(detail),
        }
    }
}

impl From<PackError> for ApiError {
    fn from(err: PackError) -> Self {
        match err {
            PackError::Store(store) => store.into(),
            other => Self::Internal(other.to_string()),
        }
    }
}

// ============================================================================
// SECTION: Router
// ============================================================================

/// Builds the sidecar router.
#[must_use]
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/v1/health", get(health))
        .route("/v1/events", post(ingest_events))
        .route("/v1/traces/{trace_id}", get(get_trace))
        .route("/v1/traces/{trace_id}/audit-pack", post(create_audit_pack))
        .route("/v1/audit-packs/{pack_id}/download", get(download_audit_pack))
        .route(
            "/v1/admin/traces/{trace_id}/legal-hold",
            post(set_legal_hold).delete(clear_legal_hold),
        )
        .route("/v1/admin/retention/run", post(run_retention))
        .with_state(state)
}

/// Serves the sidecar on the given address until shutdown.
///
/// # Errors
///
/// Returns [`ServerError`] when binding or serving fails.
pub async fn serve(addr: SocketAddr, state: AppState) -> Result<(), ServerError> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|err| ServerError::Bind(err.to_string()))?;
    axum::serve(listener, router(state))
        .await
        .map_err(|err| ServerError::Serve(err.to_string()))
}

// ============================================================================
// SECTION: Request Types
// ============================================================================

/// Body of the ingest endpoint.
#[derive(Debug, Deserialize)]
struct IngestBatch {
    /// Batched events.
    #[serde(default)]
    events: Vec<Value>,
}

/// Extracts the bearer header value from request headers.
fn bearer(headers: &HeaderMap) -> Option<&str> {
    headers.get(header::AUTHORIZATION).and_then(|value| value.to_str().ok())
}

// ============================================================================
// SECTION: Handlers
// ============================================================================

/// Health endpoint; the only unauthenticated route.
async fn health(State(state): State<AppState>) -> Json<Value> {
    state.audit_request("GET", "/v1/health", 200);
    Json(json!({ "status": "ok", "mode": state.settings.mode.as_str() }))
}

/// Ingests a batch of turn events.
async fn ingest_events(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(batch): Json<IngestBatch>,
) -> Result<Json<Value>, ApiError> {
    let result = async {
        let claims = state.verifier.verify_bearer(bearer(&headers))?;
        require_scope(&claims, SCOPE_INGEST)?;
        let inserted = state.store.ingest_batch(&batch.events)?;
        Ok::<Json<Value>, ApiError>(Json(json!({ "status": "accepted", "inserted": inserted })))
    }
    .await;
    state.audit_request("POST", "/v1/events", status_of(&result));
    result
}

/// Returns the per-trace summary.
async fn get_trace(
    State(state): State<AppState>,
    Path(trace_id): Path<String>,
    headers: HeaderMap,
) -> Result<Json<Value>, ApiError> {
    let result = async {
        let claims = state.verifier.verify_bearer(bearer(&headers))?;
        require_scope(&claims, SCOPE_READ)?;
        let summary = state.store.trace_summary(&trace_id)?;
        serde_json::to_value(summary)
            .map(Json)
            .map_err(|err| ApiError::Internal(err.to_string()))
    }
    .await;
    state.audit_request("GET", "/v1/traces/{trace_id}", status_of(&result));
    result
}

/// Creates and builds an audit pack for a trace.
async fn create_audit_pack(
    State(state): State<AppState>,
    Path(trace_id): Path<String>,
    headers: HeaderMap,
) -> Result<Json<Value>, ApiError> {
    let result = async {
        let claims = state.verifier.verify_bearer(bearer(&headers))?;
        require_scope(&claims, SCOPE_EXPORT)?;

        let pack_id = PackId::generate(&trace_id);
        state.store.create_audit_pack_record(pack_id.as_str(), &trace_id)?;

        let packs_dir = PathBuf::from(&state.settings.packs_dir);
        match build_audit_pack(&trace_id, &state.store, &packs_dir, &pack_id) {
            Ok(zip_path) => {
                state
                    .store
                    .mark_audit_pack_ready(pack_id.as_str(), &zip_path.to_string_lossy())?;
                Ok(Json(json!({
                    "pack_id": pack_id.as_str(),
                    "trace_id": trace_id,
                    "status": "ready",
                })))
            }
            Err(err) => {
                state.store.mark_audit_pack_failed(pack_id.as_str())?;
                Err(err.into())
            }
        }
    }
    .await;
    state.audit_request("POST", "/v1/traces/{trace_id}/audit-pack", status_of(&result));
    result
}

/// Streams a finished audit pack archive.
async fn download_audit_pack(
    State(state): State<AppState>,
    Path(pack_id): Path<String>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let result = async {
        let claims = state.verifier.verify_bearer(bearer(&headers))?;
        require_any_scope(&claims, &[SCOPE_READ, SCOPE_EXPORT])?;

        let record = state.store.audit_pack_record(&pack_id)?;
        if record.status != "ready" {
            return Err(ApiError::Conflict("Audit pack not ready".to_string()));
        }
        let storage_path = record
            .storage_path
            .ok_or_else(|| ApiError::NotFound("Audit pack file missing".to_string()))?;
        let bytes = std::fs::read(&storage_path)
            .map_err(|_| ApiError::NotFound("Audit pack file missing".to_string()))?;

        let disposition = format!("attachment; filename=\"{pack_id}.zip\"");
        Ok((
            StatusCode::OK,
            [
                (header::CONTENT_TYPE, "application/zip".to_string()),
                (header::CONTENT_DISPOSITION, disposition),
            ],
            bytes,
        )
            .into_response())
    }
    .await;
    state.audit_request(
        "GET",
        "/v1/audit-packs/{pack_id}/download",
        match &result {
            Ok(_) => 200,
            Err(err) => err.status().as_u16(),
        },
    );
    result
}

/// Sets the legal hold on a trace and its packs.
async fn set_legal_hold(
    State(state): State<AppState>,
    Path(trace_id): Path<String>,
    headers: HeaderMap,
) -> Result<Json<Value>, ApiError> {
    legal_hold(&state, &trace_id, &headers, true)
}

/// Clears the legal hold on a trace and its packs.
async fn clear_legal_hold(
    State(state): State<AppState>,
    Path(trace_id): Path<String>,
    headers: HeaderMap,
) -> Result<Json<Value>, ApiError> {
    legal_hold(&state, &trace_id, &headers, false)
}

/// Shared legal-hold toggle implementation.
fn legal_hold(
    state: &AppState,
    trace_id: &str,
    headers: &HeaderMap,
    enabled: bool,
) -> Result<Json<Value>, ApiError> {
    let result = (|| {
        let claims = state.verifier.verify_bearer(bearer(headers))?;
        require_scope(&claims, SCOPE_ADMIN)?;
        state.store.set_legal_hold(trace_id, enabled)?;
        Ok(Json(json!({ "trace_id": trace_id, "legal_hold": enabled })))
    })();
    state.audit_request(
        if enabled { "POST" } else { "DELETE" },
        "/v1/admin/traces/{trace_id}/legal-hold",
        status_of(&result),
    );
    result
}

/// Runs the retention sweep.
async fn run_retention(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Value>, ApiError> {
    let result = async {
        let claims = state.verifier.verify_bearer(bearer(&headers))?;
        require_scope(&claims, SCOPE_ADMIN)?;
        let report = state
            .store
            .run_retention(state.settings.retention_days, UtcTime::now())?;
        serde_json::to_value(report)
            .map(Json)
            .map_err(|err| ApiError::Internal(err.to_string()))
    }
    .await;
    state.audit_request("POST", "/v1/admin/retention/run", status_of(&result));
    result
}

/// Returns the status code of a handler result for auditing.
fn status_of<T>(result: &Result<T, ApiError>) -> u16 {
    match result {
        Ok(_) => 200,
        Err(err) => err.status().as_u16(),
    }
}
