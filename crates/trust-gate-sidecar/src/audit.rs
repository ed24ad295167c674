// trust-gate-sidecar/src/audit.rs
// ============================================================================
// Module: Sidecar Request Audit Logging
// Description: Structured audit events for sidecar request handling.
// Purpose: Emit redacted request logs without hard logging dependencies.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! This module defines audit event payloads and sinks for sidecar request
//! logging. It is intentionally lightweight so deployments can route events
//! to their preferred logging pipeline without redesign. Bodies and tokens
//! never appear in audit events.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::io;
use std::io::Write;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use serde::Serialize;

// ============================================================================
// SECTION: Event Type
// ============================================================================

/// Sidecar request audit event payload.
#[derive(Debug, Clone, Serialize)]
pub struct RequestAuditEvent {
    /// Event identifier.
    pub event: &'static str,
    /// Event timestamp (milliseconds since epoch).
    pub timestamp_ms: u128,
    /// HTTP method.
    pub method: String,
    /// Request path.
    pub path: String,
    /// Response status code.
    pub status: u16,
    /// Normalized outcome label.
    pub outcome: &'static str,
}

impl RequestAuditEvent {
    /// Builds a request audit event stamped with the current time.
    #[must_use]
    pub fn new(method: &str, path: &str, status: u16) -> Self {
        let timestamp_ms = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|duration| duration.as_millis())
            .unwrap_or_default();
        let outcome = if status < 400 { "ok" } else { "error" };
        Self {
            event: "sidecar_request",
            timestamp_ms,
            method: method.to_string(),
            path: path.to_string(),
            status,
            outcome,
        }
    }
}

// ============================================================================
// SECTION: Sinks
// ============================================================================

/// Audit sink for sidecar request events.
pub trait RequestAuditSink: Send + Sync {
    /// Records one request audit event.
    fn record(&self, event: &RequestAuditEvent);
}

/// Sink discarding all events.
pub struct NoopAuditSink;

impl RequestAuditSink for NoopAuditSink {
    fn record(&self, _event: &RequestAuditEvent) {}
}

/// Sink writing JSON lines to stderr.
pub struct StderrAuditSink;

impl RequestAuditSink for StderrAuditSink {
    fn record(&self, event: &RequestAuditEvent) {
        if let Ok(line) = serde_json::to_string(event) {
            let mut stderr = io::stderr().lock();
            let _ = writeln!(stderr, "{line}");
        }
    }
}
