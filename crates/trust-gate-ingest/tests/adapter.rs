// trust-gate-ingest/tests/adapter.rs
// ============================================================================
// Module: Ingest Adapter Tests
// Description: Tests for event composition, buffering, and validation.
// ============================================================================
//! ## Overview
//! Validates common-field enforcement, payload hashing, and buffer behavior
//! below the flush threshold (network delivery is exercised by deployments).

#![allow(
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only output and panic-based assertions are permitted."
)]

use serde_json::json;
use trust_gate_config::IngestSettings;
use trust_gate_ingest::IngestAdapter;
use trust_gate_ingest::IngestError;
use trust_gate_ingest::NoopWarningSink;
use trust_gate_ingest::create_trace_id;
use trust_gate_ingest::default_common_fields;

/// Settings with a large batch size so tests never hit the network.
fn settings() -> IngestSettings {
    IngestSettings {
        sidecar_url: "http://127.0.0.1:1".to_string(),
        ingest_token: Some("opaque-token".to_string()),
        jwt_secret: None,
        batch_size: 100,
        max_retries: 1,
    }
}

/// Builds an adapter with warnings silenced.
fn adapter() -> IngestAdapter {
    IngestAdapter::with_warning_sink(settings(), Box::new(NoopWarningSink))
}

// ============================================================================
// SECTION: Composition
// ============================================================================

/// Tests trace identifiers follow the sidecar format.
#[test]
fn test_trace_id_format() {
    let trace_id = create_trace_id();
    assert!(trace_id.starts_with("tr_"));
    assert_eq!(trace_id.len(), 3 + 32);
}

/// Tests the common-field helper carries every required key.
#[test]
fn test_default_common_fields_complete() {
    let fields = default_common_fields(
        "tr_1", "sp_1", None, "onyx", "1.0", "sess-1", "user-1",
    );
    let object = fields.as_object().unwrap();
    for key in [
        "trace_id", "span_id", "parent_span_id", "ts", "host",
        "host_version", "session_id", "user_id", "schema_version",
    ] {
        assert!(object.contains_key(key), "missing {key}");
    }
}

/// Tests emission buffers events below the batch threshold.
#[test]
fn test_emit_buffers_below_threshold() {
    let adapter = adapter();
    let fields = default_common_fields(
        "tr_1", "sp_1", None, "onyx", "1.0", "sess-1", "user-1",
    );
    adapter.emit_event("retrieval_batch", &fields, &json!({"docs": 2})).unwrap();
    adapter.emit_event("tool_call", &fields, &json!({"tool": "search_docs"})).unwrap();
    assert_eq!(adapter.pending_len(), 2);
}

/// Tests incomplete common fields are rejected with the missing keys.
#[test]
fn test_missing_common_fields_rejected() {
    let adapter = adapter();
    let err = adapter
        .emit_event("tool_call", &json!({"trace_id": "tr_1"}), &json!({}))
        .unwrap_err();
    match err {
        IngestError::MissingCommonFields(missing) => {
            assert!(missing.contains("span_id"));
            assert!(missing.contains("user_id"));
            assert!(!missing.contains("trace_id"));
        }
        other => panic!("unexpected error: {other}"),
    }
}

/// Tests flush on an empty buffer is a no-op.
#[test]
fn test_flush_empty_buffer() {
    let adapter = adapter();
    adapter.flush_events().unwrap();
    assert_eq!(adapter.pending_len(), 0);
}

/// Tests delivery failure drops the batch fail-open.
#[test]
fn test_failed_delivery_is_fail_open() {
    let adapter = IngestAdapter::with_warning_sink(
        IngestSettings {
            batch_size: 1,
            ..settings()
        },
        Box::new(NoopWarningSink),
    );
    let fields = default_common_fields(
        "tr_1", "sp_1", None, "onyx", "1.0", "sess-1", "user-1",
    );
    adapter.emit_event("tool_call", &fields, &json!({})).unwrap();
    assert_eq!(adapter.pending_len(), 0);
}
