// trust-gate-sidecar/src/error.rs
// ============================================================================
// Module: Sidecar API Errors
// Description: Error taxonomy with stable HTTP status mapping.
// Purpose: Surface every failure as a `{detail}` body with the right code.
// Dependencies: axum, serde_json, thiserror
// ============================================================================

//! ## Overview
//! Every endpoint failure maps onto one taxonomy variant: 401 for auth
//! failures, 403 for missing scopes, 404 for unknown resources, 409 for
//! packs that are not ready, 422 for malformed events, and 500 for anything
//! unexpected. Error bodies are always `{"detail": "..."}`.

// ============================================================================
// SECTION: Imports
// ============================================================================

use axum::Json;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::response::Response;
use serde_json::json;
use thiserror::Error;

// ============================================================================
// SECTION: API Error
// ============================================================================

/// Sidecar endpoint errors with stable HTTP mappings.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Missing, malformed, expired, or invalid-signature token.
    #[error("{0}")]
    Unauthorized(String),
    /// Authenticated caller lacks a required scope.
    #[error("{0}")]
    Forbidden(String),
    /// Referenced resource does not exist.
    #[error("{0}")]
    NotFound(String),
    /// Resource exists but is not in a servable state.
    #[error("{0}")]
    Conflict(String),
    /// Request payload failed validation.
    #[error("{0}")]
    Unprocessable(String),
    /// Unexpected internal failure.
    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    /// Returns the HTTP status code for this error.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Unprocessable(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = json!({ "detail": self.to_string() });
        (self.status(), Json(body)).into_response()
    }
}
