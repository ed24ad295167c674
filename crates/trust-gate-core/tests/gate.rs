// trust-gate-core/tests/gate.rs
// ============================================================================
// Module: Gate Pipeline Tests
// Description: End-to-end tests for the gate orchestrator.
// ============================================================================
//! ## Overview
//! Exercises the full pipeline: fail-closed verdicts, refusals, redaction,
//! contract shape, citation integrity, and kill-switch behavior.

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

use std::sync::Arc;

use serde_json::Value;
use serde_json::json;
use trust_gate_core::CONTRACT_KEYS;
use trust_gate_core::Decision;
use trust_gate_core::GateContext;
use trust_gate_core::GateDependencies;
use trust_gate_core::InMemoryLegalHoldStore;
use trust_gate_core::InMemoryTraceStore;
use trust_gate_core::KillSwitch;
use trust_gate_core::KillSwitchMode;
use trust_gate_core::TraceStore;
use trust_gate_core::TrustEvidenceGate;
use trust_gate_core::default_trusted_tools;

/// Builds a gate over fresh in-memory stores.
fn gate_with_stores() -> (TrustEvidenceGate, Arc<InMemoryTraceStore>, Arc<InMemoryLegalHoldStore>) {
    let trace_store = Arc::new(InMemoryTraceStore::new());
    let legal_hold_store = Arc::new(InMemoryLegalHoldStore::new());
    let trace_store_dyn: Arc<dyn TraceStore> = Arc::clone(&trace_store) as _;
    let legal_hold_store_dyn: Arc<dyn trust_gate_core::LegalHoldStore> = Arc::clone(&legal_hold_store) as _;
    let gate = TrustEvidenceGate::new(GateDependencies {
        trace_store: trace_store_dyn,
        legal_hold_store: legal_hold_store_dyn,
        kill_switch: Arc::new(KillSwitch::new()),
        trusted_tools: default_trusted_tools(),
    });
    (gate, trace_store, legal_hold_store)
}

// ============================================================================
// SECTION: Fail-Closed Verdicts
// ============================================================================

/// Tests a factual draft with no evidence yields UNKNOWN.
#[test]
fn test_no_evidence_yields_unknown() {
    let (gate, _, _) = gate_with_stores();
    let response = gate
        .gate_response("Paris is the capital of France.", &[], &GateContext::default())
        .unwrap();

    assert!(response.answer_text.starts_with("UNKNOWN:"));
    assert_eq!(Decision::from_answer(&response.answer_text), Decision::Unknown);
    let modes = &response.decision_record.failure_modes;
    assert!(modes.iter().any(|m| m == "no_supporting_evidence_found"));
    assert!(modes.iter().any(|m| m == "NO_EVIDENCE"));
}

/// Tests a single secondary source is insufficient for a factual claim.
#[test]
fn test_one_secondary_yields_unknown() {
    let (gate, _, _) = gate_with_stores();
    let evidence = vec![json!({
        "id": "s1", "snippet": "Saturn has rings.",
        "trust_level": "SECONDARY", "origin": "THIRD_PARTY"
    })];
    let response = gate
        .gate_response("Saturn has rings.", &evidence, &GateContext::default())
        .unwrap();
    assert!(response.answer_text.starts_with("UNKNOWN:"));
}

/// Tests two secondary sources allow the claim with ordered citations.
#[test]
fn test_two_secondaries_allow_with_citations() {
    let (gate, _, _) = gate_with_stores();
    let evidence = vec![
        json!({"id": "s1", "snippet": "Saturn has rings.", "trust_level": "SECONDARY", "origin": "THIRD_PARTY"}),
        json!({"id": "s2", "snippet": "Saturn has rings.", "trust_level": "SECONDARY", "origin": "THIRD_PARTY"}),
    ];
    let response = gate
        .gate_response("Saturn has rings.", &evidence, &GateContext::default())
        .unwrap();

    assert_eq!(Decision::from_answer(&response.answer_text), Decision::Allow);
    assert!(!response.answer_text.starts_with("UNKNOWN:"));
    let citations = &response.evidence_bundle_user.citations;
    assert_eq!(citations.len(), 2);
    assert_eq!(citations[0].citation_number, 1);
    assert_eq!(citations[0].source_id, "s1");
    assert_eq!(citations[1].citation_number, 2);
    assert_eq!(citations[1].source_id, "s2");
}

// ============================================================================
// SECTION: Refusals
// ============================================================================

/// Tests disallowed-jurisdiction evidence refuses the turn.
#[test]
fn test_jurisdiction_violation_refuses() {
    let (gate, _, _) = gate_with_stores();
    let evidence = vec![json!({
        "id": "eu1", "snippet": "Saturn has rings.",
        "trust_level": "PRIMARY", "jurisdiction": "EU"
    })];
    let context = GateContext {
        allowed_jurisdictions: Some(vec!["US".to_string()]),
        ..GateContext::default()
    };
    let response = gate
        .gate_response("Saturn has rings.", &evidence, &context)
        .unwrap();

    assert!(response
        .answer_text
        .starts_with("REFUSE: jurisdiction_violation_disallowed_evidence"));
    assert_eq!(Decision::from_answer(&response.answer_text), Decision::Refuse);
    assert!(response
        .decision_record
        .failure_modes
        .iter()
        .any(|m| m == "jurisdiction_violation"));
}

/// Tests an allowlist naming no known jurisdiction still refuses.
#[test]
fn test_unrecognized_allowlist_refuses() {
    let (gate, _, _) = gate_with_stores();
    let evidence = vec![json!({
        "id": "us1", "snippet": "Saturn has rings.",
        "trust_level": "PRIMARY", "jurisdiction": "US"
    })];
    let context = GateContext {
        allowed_jurisdictions: Some(vec!["FR".to_string()]),
        ..GateContext::default()
    };
    let response = gate
        .gate_response("Saturn has rings.", &evidence, &context)
        .unwrap();

    assert!(response
        .answer_text
        .starts_with("REFUSE: jurisdiction_violation_disallowed_evidence"));
    assert!(response
        .evidence_bundle_user
        .retrieval_metadata
        .jurisdiction_compliance
        .rejected_evidence
        .iter()
        .any(|record| record.source_id == "us1"));
}

/// Tests jurisdiction metadata echoes the caller's labels uppercased.
#[test]
fn test_allowed_jurisdiction_labels_echoed() {
    let (gate, _, _) = gate_with_stores();
    let context = GateContext {
        allowed_jurisdictions: Some(vec!["us".to_string(), "FR".to_string()]),
        ..GateContext::default()
    };
    let response = gate
        .gate_response("Saturn has rings.", &[], &context)
        .unwrap();

    assert_eq!(
        response
            .evidence_bundle_user
            .retrieval_metadata
            .jurisdiction_compliance
            .allowed_jurisdictions,
        vec!["FR".to_string(), "US".to_string()]
    );
}

/// Tests an active kill switch refuses with its reason.
#[test]
fn test_kill_switch_refusal() {
    let (gate, _, _) = gate_with_stores();
    gate.kill_switch().activate(
        KillSwitchMode::SystemHalt,
        "incident response drill",
        None,
        None,
    );
    let response = gate
        .gate_response("Saturn has rings.", &[], &GateContext::default())
        .unwrap();

    assert!(response
        .answer_text
        .starts_with("REFUSE: kill_switch_active (incident response drill)"));
    assert!(response
        .decision_record
        .failure_modes
        .iter()
        .any(|m| m == "kill_switch_active"));
}

/// Tests missing critical provenance refuses only in enforce mode.
#[test]
fn test_missing_provenance_enforce_refuses() {
    let (gate, _, _) = gate_with_stores();
    let evidence = vec![json!({
        "id": "p1", "snippet": "Saturn has rings.", "trust_level": "PRIMARY",
        "provenance": {"missing_fields": ["connector_id", "jurisdiction"]}
    })];

    let observe = GateContext {
        trust_mode_effective: Some("observe".to_string()),
        ..GateContext::default()
    };
    let response = gate.gate_response("Saturn has rings.", &evidence, &observe).unwrap();
    assert!(!response.answer_text.starts_with("REFUSE:"));

    let enforce = GateContext {
        trust_mode_effective: Some("enforce".to_string()),
        ..GateContext::default()
    };
    let response = gate.gate_response("Saturn has rings.", &evidence, &enforce).unwrap();
    assert!(response.answer_text.contains("REFUSE: critical_provenance_missing"));
    assert!(response
        .decision_record
        .failure_modes
        .iter()
        .any(|m| m == "critical_provenance_missing"));
}

// ============================================================================
// SECTION: Redaction & Contract
// ============================================================================

/// Tests PII in the answer and snippets is masked with events recorded.
#[test]
fn test_pii_redaction_in_gate() {
    let (gate, _, _) = gate_with_stores();
    let evidence = vec![json!({
        "id": "p1",
        "snippet": "Email john.doe@example.com and SSN 123-45-6789",
        "trust_level": "PRIMARY", "origin": "INTERNAL"
    })];
    let response = gate
        .gate_response(
            "Contact john.doe@example.com or MRN-123456.",
            &evidence,
            &GateContext::default(),
        )
        .unwrap();

    assert!(response.answer_text.contains("[REDACTED_EMAIL]"));
    assert!(response.answer_text.contains("[REDACTED_MEDICAL_RECORD]"));
    assert!(!response.decision_record.redaction_events.is_empty());
    assert!(response.evidence_bundle_user.sources[0]
        .snippet
        .contains("[REDACTED_EMAIL]"));
}

/// Tests the serialized contract carries the fixed key order.
#[test]
fn test_contract_key_order_is_fixed() {
    let (gate, _, _) = gate_with_stores();
    let response = gate
        .gate_response("The sky is blue.", &[json!({"id": "d1", "snippet": "The sky is blue."})], &GateContext::default())
        .unwrap();

    let payload = response.to_ordered_value().unwrap();
    let keys: Vec<&str> = payload.as_object().unwrap().keys().map(String::as_str).collect();
    assert_eq!(keys, CONTRACT_KEYS);
}

/// Tests every citation references a bundled source.
#[test]
fn test_citations_reference_known_sources() {
    let (gate, _, _) = gate_with_stores();
    let evidence = vec![
        json!({"id": "a", "snippet": "Alpha metric rose sharply.", "trust_level": "PRIMARY"}),
        json!({"id": "b", "snippet": "Beta metric rose sharply.", "trust_level": "PRIMARY"}),
    ];
    let response = gate
        .gate_response("Alpha metric rose sharply.", &evidence, &GateContext::default())
        .unwrap();

    let ids: Vec<&str> = response
        .evidence_bundle_user
        .sources
        .iter()
        .map(|s| s.id.as_str())
        .collect();
    for citation in &response.evidence_bundle_user.citations {
        assert!(ids.contains(&citation.source_id.as_str()));
    }
}

// ============================================================================
// SECTION: Persistence
// ============================================================================

/// Tests the trace is persisted with matching hashes and a valid chain.
#[test]
fn test_trace_persisted_with_valid_chain() {
    let (gate, trace_store, _) = gate_with_stores();
    let response = gate
        .gate_response("Paris is the capital of France.", &[], &GateContext::default())
        .unwrap();

    let record = trace_store.load(&response.trace_id).unwrap();
    assert_eq!(record.trace_id, response.trace_id);

    let events = trace_store.load_events(&response.trace_id).unwrap();
    assert_eq!(record.events_count as usize, events.len());
    assert!(!events.is_empty());
    assert!(trust_gate_core::validate_chain(&events));
}

/// Tests legal-hold turns write an unredacted copy.
#[test]
fn test_legal_hold_writes_unredacted_copy() {
    let (gate, _, legal_hold_store) = gate_with_stores();
    let context = GateContext {
        legal_hold: true,
        retention_policy: Some("LEGAL_HOLD".to_string()),
        ..GateContext::default()
    };
    let response = gate
        .gate_response("Contact john.doe@example.com now.", &[], &context)
        .unwrap();

    let copy = legal_hold_store.get(&response.trace_id).unwrap();
    let answer = copy.get("unredacted_answer").and_then(Value::as_str).unwrap();
    assert!(answer.contains("john.doe@example.com"));
}
