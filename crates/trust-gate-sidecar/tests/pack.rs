// trust-gate-sidecar/tests/pack.rs
// ============================================================================
// Module: Sidecar Pack Builder Tests
// Description: Tests for archive layout, manifest, and the integrity chain.
// ============================================================================
//! ## Overview
//! Validates the sidecar archive layout and its standalone integrity chain.

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

use std::io::Read;

use serde_json::Value;
use serde_json::json;
use trust_gate_core::PackId;
use trust_gate_core::hashing::hash_canonical_json;
use trust_gate_sidecar::SidecarStore;
use trust_gate_sidecar::build_audit_pack;
use trust_gate_sidecar::verify_chain_jsonl;

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

/// Seeds a store with a representative event stream.
fn seeded_store(trace_id: &str) -> SidecarStore {
    let store = SidecarStore::open_in_memory().unwrap();
    store
        .ingest_batch(&[
            event(trace_id, "sp_1", "retrieval_batch", "2026-03-01T00:00:00Z", json!({"docs": 3})),
            event(trace_id, "sp_2", "tool_call", "2026-03-01T00:00:01Z", json!({"tool": "search_docs"})),
            event(
                trace_id,
                "sp_3",
                "citations_resolved",
                "2026-03-01T00:00:02Z",
                json!({"citations": [{"citation_number": 1, "source_id": "s1"}]}),
            ),
            event(trace_id, "sp_4", "policy_decision", "2026-03-01T00:00:03Z", json!({"passed": true})),
        ])
        .unwrap();
    store
}

/// Reads one archive entry as bytes.
fn read_entry(zip_path: &std::path::Path, name: &str) -> Vec<u8> {
    let file = std::fs::File::open(zip_path).unwrap();
    let mut archive = zip::ZipArchive::new(file).unwrap();
    let mut entry = archive.by_name(name).unwrap();
    let mut bytes = Vec::new();
    entry.read_to_end(&mut bytes).unwrap();
    bytes
}

// ============================================================================
// SECTION: Layout
// ============================================================================

/// Tests the archive carries the sidecar layout names.
#[test]
fn test_archive_layout() {
    let store = seeded_store("tr_pack");
    let dir = tempfile::tempdir().unwrap();
    let pack_id = PackId::from_raw("pack_tr_pack_0000000000");
    let zip_path = build_audit_pack("tr_pack", &store, dir.path(), &pack_id).unwrap();

    let file = std::fs::File::open(&zip_path).unwrap();
    let archive = zip::ZipArchive::new(file).unwrap();
    let names: Vec<&str> = archive.file_names().collect();
    for expected in [
        "contract.json",
        "evidence/events.jsonl",
        "retrieval/retrieval_events.json",
        "tools/tool_events.json",
        "citations.json",
        "policy.json",
        "integrity/manifest.json",
        "integrity/chain.jsonl",
    ] {
        assert!(names.contains(&expected), "missing {expected}");
    }
}

/// Tests citations are flattened from resolution events.
#[test]
fn test_citations_flattened() {
    let store = seeded_store("tr_cite");
    let dir = tempfile::tempdir().unwrap();
    let pack_id = PackId::from_raw("pack_tr_cite_0000000000");
    let zip_path = build_audit_pack("tr_cite", &store, dir.path(), &pack_id).unwrap();

    let citations: Value =
        serde_json::from_slice(&read_entry(&zip_path, "citations.json")).unwrap();
    let list = citations.as_array().unwrap();
    assert_eq!(list.len(), 1);
    assert_eq!(list[0].get("source_id").and_then(Value::as_str), Some("s1"));
}

/// Tests the integrity manifest binds every payload hash.
#[test]
fn test_integrity_manifest() {
    let store = seeded_store("tr_man");
    let dir = tempfile::tempdir().unwrap();
    let pack_id = PackId::from_raw("pack_tr_man_0000000000");
    let zip_path = build_audit_pack("tr_man", &store, dir.path(), &pack_id).unwrap();

    let manifest: Value =
        serde_json::from_slice(&read_entry(&zip_path, "integrity/manifest.json")).unwrap();
    assert_eq!(manifest.get("event_count").and_then(Value::as_u64), Some(4));
    let entries = manifest.get("events").and_then(Value::as_array).unwrap();
    assert!(entries
        .iter()
        .all(|entry| entry.get("payload_hash").and_then(Value::as_str).is_some()));
}

// ============================================================================
// SECTION: Integrity Chain
// ============================================================================

/// Tests the packaged chain verifies and rejects tampering.
#[test]
fn test_chain_verifies_and_detects_tampering() {
    let store = seeded_store("tr_chain");
    let dir = tempfile::tempdir().unwrap();
    let pack_id = PackId::from_raw("pack_tr_chain_0000000000");
    let zip_path = build_audit_pack("tr_chain", &store, dir.path(), &pack_id).unwrap();

    let chain = String::from_utf8(read_entry(&zip_path, "integrity/chain.jsonl")).unwrap();
    assert!(verify_chain_jsonl(&chain));

    let tampered = chain.replace("retrieval_batch", "tampered_type");
    assert!(!verify_chain_jsonl(&tampered));
}

/// Tests the placeholder contract reports evidence status.
#[test]
fn test_contract_placeholder() {
    let store = seeded_store("tr_contract");
    let dir = tempfile::tempdir().unwrap();
    let pack_id = PackId::from_raw("pack_tr_contract_0000000000");
    let zip_path = build_audit_pack("tr_contract", &store, dir.path(), &pack_id).unwrap();

    let contract: Value =
        serde_json::from_slice(&read_entry(&zip_path, "contract.json")).unwrap();
    assert_eq!(
        contract.get("evidence_status").and_then(Value::as_str),
        Some("complete")
    );
}
