// trust-gate-sidecar/tests/store.rs
// ============================================================================
// Module: Sidecar Store Tests
// Description: Tests for ingest atomicity, summaries, holds, and retention.
// ============================================================================
//! ## Overview
//! Validates the relational store's batch-atomic ingest and sweep rules.

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

use serde_json::Value;
use serde_json::json;
use trust_gate_core::hashing::hash_canonical_json;
use trust_gate_core::time::UtcTime;
use trust_gate_sidecar::SidecarStore;
use trust_gate_sidecar::SidecarStoreError;

/// Builds a valid ingest event.
fn event(trace_id: &str, span: &str, event_type: &str, ts: &str, payload: Value) -> Value {
    let payload_hash = hash_canonical_json(&payload).unwrap();
    json!({
        "trace_id": trace_id,
        "span_id": span,
        "parent_span_id": null,
        "ts": ts,
        "host": "onyx",
        "host_version": "1.0",
        "session_id": "sess-1",
        "user_id": "user-1",
        "event_type": event_type,
        "payload": payload,
        "payload_hash": payload_hash,
        "schema_version": "1.0.0",
    })
}

// ============================================================================
// SECTION: Ingest
// ============================================================================

/// Tests a valid batch inserts every event.
#[test]
fn test_ingest_batch_inserts() {
    let store = SidecarStore::open_in_memory().unwrap();
    let batch = vec![
        event("tr_1", "sp_1", "retrieval_batch", "2026-03-01T00:00:00Z", json!({"k": 1})),
        event("tr_1", "sp_2", "citations_resolved", "2026-03-01T00:00:01Z", json!({"citations": []})),
    ];
    assert_eq!(store.ingest_batch(&batch).unwrap(), 2);

    let events = store.events_for_trace("tr_1").unwrap();
    assert_eq!(events.len(), 2);
    assert_eq!(events[0].event_type, "retrieval_batch");
}

/// Tests a payload-hash mismatch rejects the event.
#[test]
fn test_payload_hash_mismatch_rejected() {
    let store = SidecarStore::open_in_memory().unwrap();
    let mut bad = event("tr_2", "sp_1", "retrieval_batch", "2026-03-01T00:00:00Z", json!({"k": 1}));
    bad["payload_hash"] = Value::String("0".repeat(64));

    let err = store.ingest_batch(&[bad]).unwrap_err();
    assert!(matches!(err, SidecarStoreError::InvalidEvent(_)));
    assert!(err.to_string().contains("payload_hash"));
}

/// Tests batch failure leaves no partial rows behind.
#[test]
fn test_batch_failure_is_atomic() {
    let store = SidecarStore::open_in_memory().unwrap();
    let good = event("tr_3", "sp_1", "retrieval_batch", "2026-03-01T00:00:00Z", json!({"k": 1}));
    let bad = json!({"trace_id": "tr_3", "span_id": "sp_2"});

    assert!(store.ingest_batch(&[good, bad]).is_err());
    assert!(store.events_for_trace("tr_3").unwrap().is_empty());
    assert!(matches!(
        store.trace_summary("tr_3"),
        Err(SidecarStoreError::NotFound(_))
    ));
}

/// Tests missing required fields are listed in the rejection.
#[test]
fn test_missing_fields_listed() {
    let store = SidecarStore::open_in_memory().unwrap();
    let err = store.ingest_batch(&[json!({"trace_id": "tr_4"})]).unwrap_err();
    let message = err.to_string();
    assert!(message.contains("missing required fields"));
    assert!(message.contains("payload_hash"));
}

// ============================================================================
// SECTION: Summaries
// ============================================================================

/// Tests evidence status transitions none -> partial -> complete.
#[test]
fn test_evidence_status_transitions() {
    let store = SidecarStore::open_in_memory().unwrap();
    store
        .ingest_batch(&[event("tr_5", "sp_1", "tool_call", "2026-03-01T00:00:00Z", json!({}))])
        .unwrap();
    assert_eq!(store.trace_summary("tr_5").unwrap().evidence_status, "partial");

    store
        .ingest_batch(&[
            event("tr_5", "sp_2", "retrieval_batch", "2026-03-01T00:00:01Z", json!({})),
            event("tr_5", "sp_3", "citations_resolved", "2026-03-01T00:00:02Z", json!({})),
        ])
        .unwrap();
    let summary = store.trace_summary("tr_5").unwrap();
    assert_eq!(summary.evidence_status, "complete");
    assert_eq!(summary.total_events, 3);
    assert_eq!(summary.event_counts.get("tool_call"), Some(&1));
}

// ============================================================================
// SECTION: Legal Hold & Retention
// ============================================================================

/// Tests legal hold cascades to audit packs.
#[test]
fn test_legal_hold_cascades() {
    let store = SidecarStore::open_in_memory().unwrap();
    store
        .ingest_batch(&[event("tr_6", "sp_1", "tool_call", "2026-03-01T00:00:00Z", json!({}))])
        .unwrap();
    store.create_audit_pack_record("pack_tr_6", "tr_6").unwrap();

    store.set_legal_hold("tr_6", true).unwrap();
    assert!(store.trace_summary("tr_6").unwrap().legal_hold);
    assert!(store.audit_pack_record("pack_tr_6").unwrap().legal_hold);
}

/// Tests unknown traces cannot be held.
#[test]
fn test_legal_hold_unknown_trace() {
    let store = SidecarStore::open_in_memory().unwrap();
    assert!(matches!(
        store.set_legal_hold("missing", true),
        Err(SidecarStoreError::NotFound(_))
    ));
}

/// Tests the sweep deletes aged traces but skips held ones.
#[test]
fn test_retention_skips_held_traces() {
    let store = SidecarStore::open_in_memory().unwrap();
    let old_ts = "2020-01-01T00:00:00Z";
    store
        .ingest_batch(&[event("tr_old", "sp_1", "tool_call", old_ts, json!({}))])
        .unwrap();
    store
        .ingest_batch(&[event("tr_held", "sp_1", "tool_call", old_ts, json!({}))])
        .unwrap();
    store.set_legal_hold("tr_held", true).unwrap();

    let report = store.run_retention(30, UtcTime::now()).unwrap();
    assert_eq!(report.deleted_traces, 1);
    assert!(matches!(store.trace_summary("tr_old"), Err(SidecarStoreError::NotFound(_))));
    assert!(store.trace_summary("tr_held").is_ok());
}

/// Tests retention with a zero-day window removes non-held items.
#[test]
fn test_retention_zero_days() {
    let store = SidecarStore::open_in_memory().unwrap();
    store
        .ingest_batch(&[event("tr_now", "sp_1", "tool_call", "2020-01-01T00:00:00Z", json!({}))])
        .unwrap();

    let report = store.run_retention(0, UtcTime::now()).unwrap();
    assert_eq!(report.deleted_traces, 1);
    assert_eq!(report.retention_days, 0);
}

/// Tests held packs survive the sweep alongside their trace.
#[test]
fn test_held_packs_survive_sweep() {
    let store = SidecarStore::open_in_memory().unwrap();
    store
        .ingest_batch(&[event("tr_packy", "sp_1", "tool_call", "2020-01-01T00:00:00Z", json!({}))])
        .unwrap();
    store.create_audit_pack_record("pack_a", "tr_packy").unwrap();
    store.set_legal_hold("tr_packy", true).unwrap();

    let report = store.run_retention(0, UtcTime::now()).unwrap();
    assert_eq!(report.deleted_traces, 0);
    assert_eq!(report.deleted_packs, 0);
    assert!(store.trace_summary("tr_packy").is_ok());
    assert!(store.audit_pack_record("pack_a").is_ok());
}
