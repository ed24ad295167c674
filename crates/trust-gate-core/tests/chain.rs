// trust-gate-core/tests/chain.rs
// ============================================================================
// Module: Hash Chain Tests
// Description: Tests for event hash-chain build, validation, and JSONL codec.
// ============================================================================
//! ## Overview
//! Validates tamper evidence of the per-trace event chain.

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

use proptest::prelude::*;
use serde_json::json;
use trust_gate_core::chain::EventInput;
use trust_gate_core::chain::GENESIS_HASH;
use trust_gate_core::chain::build_chain;
use trust_gate_core::chain::decode_events_jsonl;
use trust_gate_core::chain::encode_events_jsonl;
use trust_gate_core::chain::validate_chain;

/// Builds a small event list for chain tests.
fn sample_events() -> Vec<EventInput> {
    vec![
        EventInput {
            ts: Some("2026-03-01T00:00:00Z".to_string()),
            event_type: "incident".to_string(),
            payload: json!({"incident_type": "EVIDENCE_FAILURE", "severity": "MEDIUM"}),
        },
        EventInput {
            ts: Some("2026-03-01T00:00:01Z".to_string()),
            event_type: "incident".to_string(),
            payload: json!({"incident_type": "HALLUCINATION_SPIKE", "severity": "HIGH"}),
        },
    ]
}

// ============================================================================
// SECTION: Build & Validate
// ============================================================================

/// Tests a freshly built chain validates.
#[test]
fn test_built_chain_validates() {
    let chain = build_chain(&sample_events(), "2026-03-01T00:00:00Z").unwrap();
    assert_eq!(chain.len(), 2);
    assert_eq!(chain[0].seq, 1);
    assert_eq!(chain[0].prev_hash, GENESIS_HASH);
    assert_eq!(chain[1].prev_hash, chain[0].hash);
    assert!(validate_chain(&chain));
}

/// Tests the empty chain validates trivially.
#[test]
fn test_empty_chain_validates() {
    assert!(validate_chain(&[]));
}

/// Tests payload tampering is detected.
#[test]
fn test_tampered_payload_fails_validation() {
    let mut chain = build_chain(&sample_events(), "2026-03-01T00:00:00Z").unwrap();
    chain[0].payload = json!({"incident_type": "TAMPERED"});
    assert!(!validate_chain(&chain));
}

/// Tests sequence tampering is detected.
#[test]
fn test_tampered_sequence_fails_validation() {
    let mut chain = build_chain(&sample_events(), "2026-03-01T00:00:00Z").unwrap();
    chain[1].seq = 3;
    assert!(!validate_chain(&chain));
}

/// Tests linkage tampering is detected.
#[test]
fn test_tampered_prev_hash_fails_validation() {
    let mut chain = build_chain(&sample_events(), "2026-03-01T00:00:00Z").unwrap();
    chain[1].prev_hash = GENESIS_HASH.to_string();
    assert!(!validate_chain(&chain));
}

// ============================================================================
// SECTION: JSONL Codec
// ============================================================================

/// Tests JSONL round-trip preserves chain validity.
#[test]
fn test_jsonl_round_trip_preserves_validity() {
    let chain = build_chain(&sample_events(), "2026-03-01T00:00:00Z").unwrap();
    let encoded = encode_events_jsonl(&chain).unwrap();
    assert!(encoded.ends_with('\n'));

    let decoded = decode_events_jsonl(&encoded).unwrap();
    assert_eq!(decoded, chain);
    assert!(validate_chain(&decoded));
}

/// Tests the empty chain encodes to an empty string.
#[test]
fn test_empty_chain_encodes_empty() {
    assert_eq!(encode_events_jsonl(&[]).unwrap(), "");
}

// ============================================================================
// SECTION: Properties
// ============================================================================

proptest! {
    /// Any built chain validates, and any single-byte field flip fails.
    #[test]
    fn prop_build_then_validate(
        types in proptest::collection::vec("[a-z_]{1,12}", 1..6),
        flip_index in 0usize..6
    ) {
        let events: Vec<EventInput> = types
            .iter()
            .map(|event_type| EventInput {
                ts: Some("2026-03-01T00:00:00Z".to_string()),
                event_type: event_type.clone(),
                payload: serde_json::json!({"label": event_type}),
            })
            .collect();
        let chain = build_chain(&events, "2026-03-01T00:00:00Z").unwrap();
        prop_assert!(validate_chain(&chain));

        let mut tampered = chain.clone();
        let target = flip_index % tampered.len();
        tampered[target].event_type.push('x');
        prop_assert!(!validate_chain(&tampered));
    }
}
