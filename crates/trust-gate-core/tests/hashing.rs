// trust-gate-core/tests/hashing.rs
// ============================================================================
// Module: Hashing Tests
// Description: Tests for canonical JSON hashing.
// ============================================================================
//! ## Overview
//! Validates deterministic hashing under RFC 8785 canonicalization.

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
use trust_gate_core::hashing::hash_bytes;
use trust_gate_core::hashing::hash_canonical_json;
use trust_gate_core::hashing::hash_text;

// ============================================================================
// SECTION: Canonical Hashing
// ============================================================================

/// Tests canonical json hash ignores key insertion order.
#[test]
fn test_canonical_json_hash_is_order_independent() {
    let value_a = json!({"b": 1, "a": 2, "nested": {"y": true, "x": false}});
    let value_b = json!({"nested": {"x": false, "y": true}, "a": 2, "b": 1});

    let hash_a = hash_canonical_json(&value_a).unwrap();
    let hash_b = hash_canonical_json(&value_b).unwrap();

    assert_eq!(hash_a, hash_b);
}

/// Tests hex digests are lowercase and 64 characters.
#[test]
fn test_digest_shape() {
    let digest = hash_text("trust gate");
    assert_eq!(digest.len(), 64);
    assert!(digest.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
}

/// Tests byte and text hashing agree on UTF-8 input.
#[test]
fn test_text_and_byte_hashing_agree() {
    assert_eq!(hash_text("payload"), hash_bytes(b"payload"));
}

// ============================================================================
// SECTION: Properties
// ============================================================================

proptest! {
    /// Equal mappings hash identically regardless of construction order.
    #[test]
    fn prop_equal_maps_hash_equal(
        keys in proptest::collection::btree_set("[a-z]{1,8}", 1..8),
        value in 0i64..1000
    ) {
        let forward: serde_json::Map<String, serde_json::Value> = keys
            .iter()
            .map(|k| (k.clone(), serde_json::Value::from(value)))
            .collect();
        let reverse: serde_json::Map<String, serde_json::Value> = keys
            .iter()
            .rev()
            .map(|k| (k.clone(), serde_json::Value::from(value)))
            .collect();

        let hash_a = hash_canonical_json(&forward).unwrap();
        let hash_b = hash_canonical_json(&reverse).unwrap();
        prop_assert_eq!(hash_a, hash_b);
    }
}
