// trust-gate-core/tests/evidence.rs
// ============================================================================
// Module: Evidence Normalizer Tests
// Description: Tests for raw-item normalization rules.
// ============================================================================
//! ## Overview
//! Validates identifier stabilization, deduplication, trust forcing, and
//! explicit defaulting in the evidence normalizer.

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

use std::collections::BTreeSet;

use serde_json::json;
use trust_gate_core::evidence::DataClassification;
use trust_gate_core::evidence::EvidenceOrigin;
use trust_gate_core::evidence::Jurisdiction;
use trust_gate_core::evidence::TrustLevel;
use trust_gate_core::evidence::normalize_raw_evidence;

/// Returns the default trusted-tool set for tests.
fn trusted() -> BTreeSet<String> {
    let mut tools = BTreeSet::new();
    tools.insert("search_docs".to_string());
    tools
}

// ============================================================================
// SECTION: Dropping & Identity
// ============================================================================

/// Tests items with blank snippets are dropped.
#[test]
fn test_blank_snippet_items_are_dropped() {
    let items = vec![
        json!({"id": "keep", "snippet": "content"}),
        json!({"id": "drop", "snippet": "   "}),
        json!({"id": "also-drop"}),
    ];
    let sources = normalize_raw_evidence(&items, &trusted());
    assert_eq!(sources.len(), 1);
    assert_eq!(sources[0].id, "keep");
}

/// Tests explicit identifier preference order.
#[test]
fn test_identifier_preference_order() {
    let items = vec![
        json!({"document_id": "doc-9", "snippet": "a"}),
        json!({"uri": "https://example.com/b", "snippet": "b"}),
        json!({"snippet": "c"}),
    ];
    let sources = normalize_raw_evidence(&items, &trusted());
    assert_eq!(sources[0].id, "doc-9");
    assert_eq!(sources[1].id, "https://example.com/b");
    assert_eq!(sources[2].id, "source_3");
}

/// Tests connector metadata derives a stable hashed identifier.
#[test]
fn test_connector_metadata_derives_id() {
    let item = json!({
        "snippet": "derived content",
        "provenance": {"connector_id": "conn-1", "source_identifier": "src-7"}
    });
    let sources = normalize_raw_evidence(std::slice::from_ref(&item), &trusted());
    assert!(sources[0].id.starts_with("derived:"));
    assert_eq!(sources[0].id.len(), "derived:".len() + 16);

    let again = normalize_raw_evidence(std::slice::from_ref(&item), &trusted());
    assert_eq!(sources[0].id, again[0].id);
}

/// Tests later duplicates on (id, hash) are dropped.
#[test]
fn test_duplicates_are_dropped() {
    let items = vec![
        json!({"id": "dup", "snippet": "same text"}),
        json!({"id": "dup", "snippet": "same text"}),
        json!({"id": "dup", "snippet": "different text"}),
    ];
    let sources = normalize_raw_evidence(&items, &trusted());
    assert_eq!(sources.len(), 2);
}

// ============================================================================
// SECTION: Trust & Defaults
// ============================================================================

/// Tests untrusted tool evidence is forced to the unverified lane.
#[test]
fn test_untrusted_tool_forced_unverified() {
    let items = vec![
        json!({"id": "t1", "snippet": "tool says", "origin": "TOOL", "tool_name": "rogue_tool", "trust_level": "PRIMARY"}),
        json!({"id": "t2", "snippet": "tool says", "origin": "TOOL", "tool_name": "search_docs", "trust_level": "PRIMARY"}),
    ];
    let sources = normalize_raw_evidence(&items, &trusted());
    assert_eq!(sources[0].trust_level, TrustLevel::Unverified);
    assert_eq!(sources[1].trust_level, TrustLevel::Primary);
}

/// Tests invalid trust labels fall back to secondary.
#[test]
fn test_invalid_trust_defaults_secondary() {
    let items = vec![json!({"id": "s", "snippet": "x", "trust_level": "GOLD"})];
    let sources = normalize_raw_evidence(&items, &trusted());
    assert_eq!(sources[0].trust_level, TrustLevel::Secondary);
    assert!((sources[0].confidence_weight - 0.6).abs() < f64::EPSILON);
}

/// Tests confidence weights are clamped into the unit interval.
#[test]
fn test_confidence_weight_clamped() {
    let items = vec![
        json!({"id": "hi", "snippet": "x", "confidence_weight": 3.5}),
        json!({"id": "lo", "snippet": "x", "confidence_weight": -1.0}),
    ];
    let sources = normalize_raw_evidence(&items, &trusted());
    assert!((sources[0].confidence_weight - 1.0).abs() < f64::EPSILON);
    assert!(sources[1].confidence_weight.abs() < f64::EPSILON);
}

/// Tests sovereignty fields receive explicit defaults.
#[test]
fn test_sovereignty_defaults() {
    let items = vec![json!({"id": "d", "snippet": "x"})];
    let sources = normalize_raw_evidence(&items, &trusted());
    assert_eq!(sources[0].jurisdiction, Jurisdiction::Unknown);
    assert_eq!(sources[0].data_classification, DataClassification::Internal);
    assert_eq!(sources[0].origin, EvidenceOrigin::ThirdParty);
    assert_eq!(
        sources[0].allowed_scopes,
        vec!["response_generation", "retrieval", "enforcement"]
    );
}

/// Tests provided scopes are deduplicated and sorted.
#[test]
fn test_provided_scopes_sorted_deduped() {
    let items = vec![json!({
        "id": "s",
        "snippet": "x",
        "allowed_scopes": ["retrieval", "enforcement", "retrieval"]
    })];
    let sources = normalize_raw_evidence(&items, &trusted());
    assert_eq!(sources[0].allowed_scopes, vec!["enforcement", "retrieval"]);
}
