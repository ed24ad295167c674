// trust-gate-store-fs/tests/file_store.rs
// ============================================================================
// Module: Filesystem Store Tests
// Description: Tests for trace persistence, hashes, and legal-hold deletes.
// ============================================================================
//! ## Overview
//! Validates the on-disk record/event layout and retention protections.

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
use trust_gate_core::StoreError;
use trust_gate_core::TraceStore;
use trust_gate_core::hashing::hash_canonical_json;
use trust_gate_core::interfaces::LegalHoldStore;
use trust_gate_core::validate_chain;
use trust_gate_store_fs::LegalHoldFileStore;
use trust_gate_store_fs::TraceFileStore;

/// Minimal response payload with incidents for event derivation.
fn response_payload(legal_hold: bool) -> serde_json::Value {
    json!({
        "answer_text": "safe answer",
        "decision_record": {
            "incidents": [
                {"incident_type": "EVIDENCE_FAILURE", "severity": "MEDIUM"},
                {"incident_type": "HALLUCINATION_SPIKE", "severity": "HIGH"}
            ],
            "retention": {
                "retention_policy": if legal_hold { "LEGAL_HOLD" } else { "30_DAYS" },
                "retention_reason": "AUDIT",
                "legal_hold": legal_hold,
                "expiry_at": null
            }
        }
    })
}

// ============================================================================
// SECTION: Persistence
// ============================================================================

/// Tests stored records carry matching content hashes.
#[test]
fn test_store_and_load_with_hashes() {
    let dir = tempfile::tempdir().unwrap();
    let store = TraceFileStore::new(dir.path()).unwrap();
    let payload = response_payload(false);
    let context = json!({"request_metadata": {}});
    let replay = json!({"sanitized_prompt": "safe answer"});

    let record = store.store("trace-1", &payload, &context, &replay).unwrap();
    assert_eq!(record.response_hash, hash_canonical_json(&payload).unwrap());
    assert_eq!(record.context_hash, hash_canonical_json(&context).unwrap());
    assert_eq!(record.replay_inputs_hash, hash_canonical_json(&replay).unwrap());

    let loaded = store.load("trace-1").unwrap();
    assert_eq!(loaded, record);
}

/// Tests one event is chained per incident.
#[test]
fn test_events_derived_from_incidents() {
    let dir = tempfile::tempdir().unwrap();
    let store = TraceFileStore::new(dir.path()).unwrap();
    store
        .store("trace-2", &response_payload(false), &json!({}), &json!({}))
        .unwrap();

    let events = store.load_events("trace-2").unwrap();
    assert_eq!(events.len(), 2);
    assert!(events.iter().all(|event| event.event_type == "incident"));
    assert!(validate_chain(&events));
}

/// Tests incident-free responses chain a single trace_created event.
#[test]
fn test_trace_created_fallback_event() {
    let dir = tempfile::tempdir().unwrap();
    let store = TraceFileStore::new(dir.path()).unwrap();
    store
        .store("trace-3", &json!({"answer_text": "x", "decision_record": {}}), &json!({}), &json!({}))
        .unwrap();

    let events = store.load_events("trace-3").unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].event_type, "trace_created");
}

/// Tests loading an unknown trace fails.
#[test]
fn test_load_unknown_trace() {
    let dir = tempfile::tempdir().unwrap();
    let store = TraceFileStore::new(dir.path()).unwrap();
    assert!(matches!(store.load("missing"), Err(StoreError::NotFound(_))));
}

// ============================================================================
// SECTION: Deletion & Legal Hold
// ============================================================================

/// Tests deletion removes both artifacts.
#[test]
fn test_delete_removes_artifacts() {
    let dir = tempfile::tempdir().unwrap();
    let store = TraceFileStore::new(dir.path()).unwrap();
    store
        .store("trace-4", &response_payload(false), &json!({}), &json!({}))
        .unwrap();

    store.delete("trace-4").unwrap();
    assert!(matches!(store.load("trace-4"), Err(StoreError::NotFound(_))));
    assert!(matches!(store.load_events("trace-4"), Err(StoreError::NotFound(_))));
}

/// Tests legal-hold deletion fails explicitly.
#[test]
fn test_legal_hold_blocks_delete() {
    let dir = tempfile::tempdir().unwrap();
    let store = TraceFileStore::new(dir.path()).unwrap();
    store
        .store("trace-5", &response_payload(true), &json!({}), &json!({}))
        .unwrap();

    let err = store.delete("trace-5").unwrap_err();
    assert!(matches!(err, StoreError::LegalHold(_)));
    assert!(store.load("trace-5").is_ok());
}

/// Tests deleting an unknown trace is a no-op.
#[test]
fn test_delete_unknown_is_noop() {
    let dir = tempfile::tempdir().unwrap();
    let store = TraceFileStore::new(dir.path()).unwrap();
    assert!(store.delete("missing").is_ok());
}

/// Tests the legal-hold store round-trips unredacted copies.
#[test]
fn test_legal_hold_store_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let store = LegalHoldFileStore::new(dir.path()).unwrap();
    store
        .store_unredacted("trace-6", "answer with pii", &json!([{"id": "e1"}]), "narrative")
        .unwrap();

    let copy = store.load("trace-6").unwrap();
    assert_eq!(
        copy.get("unredacted_answer").and_then(serde_json::Value::as_str),
        Some("answer with pii")
    );
}
