// trust-gate-core/src/core/identifiers.rs
// ============================================================================
// Module: Trust Gate Identifiers
// Description: Validated identifier newtypes for traces and audit packs.
// Purpose: Keep trace anchors stable, unique, and auditable.
// Dependencies: serde, uuid
// ============================================================================

//! ## Overview
//! Trace identifiers are UUIDv4 values generated once per gated turn and
//! referenced by trace records, event logs, audit packs, and replay reports.
//! Pack identifiers bind a sidecar-built archive to its trace with a short
//! random suffix so repeated exports never collide.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Errors raised when validating identifiers.
#[derive(Debug, Error)]
pub enum IdentifierError {
    /// Value is not a valid UUIDv4 trace identifier.
    #[error("invalid trace id: {0}")]
    InvalidTraceId(String),
}

// ============================================================================
// SECTION: Trace Id
// ============================================================================

/// UUIDv4 trace identifier anchoring one gated turn.
///
/// # Invariants
/// - The inner value parses as a UUID with version 4.
/// - Values are globally unique per gate invocation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TraceId(String);

impl TraceId {
    /// Generates a fresh random trace identifier.
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Validates and wraps an existing trace identifier.
    ///
    /// # Errors
    ///
    /// Returns [`IdentifierError::InvalidTraceId`] when the value is not a
    /// version-4 UUID.
    pub fn parse(value: &str) -> Result<Self, IdentifierError> {
        let uuid = Uuid::parse_str(value)
            .map_err(|_| IdentifierError::InvalidTraceId(value.to_string()))?;
        if uuid.get_version_num() != 4 {
            return Err(IdentifierError::InvalidTraceId(value.to_string()));
        }
        Ok(Self(value.to_string()))
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TraceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ============================================================================
// SECTION: Pack Id
// ============================================================================

/// Audit-pack identifier bound to a trace.
///
/// # Invariants
/// - Generated values follow `pack_<trace_id>_<10 hex chars>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PackId(String);

impl PackId {
    /// Generates a fresh pack identifier for a trace.
    #[must_use]
    pub fn generate(trace_id: &str) -> Self {
        let suffix = Uuid::new_v4().simple().to_string();
        Self(format!("pack_{trace_id}_{}", &suffix[..10]))
    }

    /// Wraps an existing pack identifier without validation.
    #[must_use]
    pub fn from_raw(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
