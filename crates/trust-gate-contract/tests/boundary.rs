// trust-gate-contract/tests/boundary.rs
// ============================================================================
// Module: Boundary Canary Tests
// Description: Tests for bypass detection and the safe fallback contract.
// ============================================================================
//! ## Overview
//! Validates the gate-bypass canary and the halt escalation it triggers.

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
use trust_gate_contract::assert_no_bypass_inputs;
use trust_gate_contract::guarded_gate_response;
use trust_gate_contract::safe_bypass_contract;
use trust_gate_core::CONTRACT_KEYS;
use trust_gate_core::GateContext;
use trust_gate_core::GateDependencies;
use trust_gate_core::InMemoryLegalHoldStore;
use trust_gate_core::InMemoryTraceStore;
use trust_gate_core::KillSwitch;
use trust_gate_core::KillSwitchMode;
use trust_gate_core::TrustEvidenceGate;
use trust_gate_core::assert_contract_shape;
use trust_gate_core::default_trusted_tools;

/// Builds a gate over in-memory stores.
fn gate() -> TrustEvidenceGate {
    TrustEvidenceGate::new(GateDependencies {
        trace_store: Arc::new(InMemoryTraceStore::new()),
        legal_hold_store: Arc::new(InMemoryLegalHoldStore::new()),
        kill_switch: Arc::new(KillSwitch::new()),
        trusted_tools: default_trusted_tools(),
    })
}

// ============================================================================
// SECTION: Canary
// ============================================================================

/// Tests raw model output in the host context raises a bypass error.
#[test]
fn test_raw_model_output_raises() {
    let host_context = json!({"raw_model_output": "unsafe"});
    let err = assert_no_bypass_inputs(&host_context, &GateContext::default()).unwrap_err();
    assert!(err.to_string().starts_with("TRUST_GATE_BYPASS_ATTEMPT"));
}

/// Tests a stream request at the enforce boundary raises a bypass error.
#[test]
fn test_stream_request_raises_bypass() {
    let context = GateContext {
        stream_requested: true,
        ..GateContext::default()
    };
    assert!(assert_no_bypass_inputs(&json!({}), &context).is_err());
}

/// Tests clean inputs pass the canary.
#[test]
fn test_clean_inputs_pass() {
    assert!(assert_no_bypass_inputs(&json!({}), &GateContext::default()).is_ok());
}

// ============================================================================
// SECTION: Safe Contract
// ============================================================================

/// Tests the safe contract keeps the fixed key order and bypass label.
#[test]
fn test_safe_contract_shape() {
    let payload = safe_bypass_contract();
    assert!(assert_contract_shape(&payload).is_ok());

    let keys: Vec<&str> = payload.as_object().unwrap().keys().map(String::as_str).collect();
    assert_eq!(keys, CONTRACT_KEYS);
    assert_eq!(
        payload.get("failure_mode").and_then(Value::as_str),
        Some("TRUST_GATE_BYPASS_ATTEMPT")
    );
    assert_eq!(payload.get("decision").and_then(Value::as_str), Some("REFUSE"));
}

// ============================================================================
// SECTION: Guarded Invocation
// ============================================================================

/// Tests the canary converts bypass inputs into the safe contract and halt.
#[test]
fn test_guarded_bypass_activates_halt() {
    let gate = gate();
    let host_context = json!({"raw_model_output": "unsafe"});
    let payload = guarded_gate_response(
        &gate,
        &host_context,
        "any draft",
        &[],
        &GateContext::default(),
    )
    .unwrap();

    assert_eq!(
        payload.get("failure_mode").and_then(Value::as_str),
        Some("TRUST_GATE_BYPASS_ATTEMPT")
    );
    assert_eq!(gate.kill_switch().snapshot().mode, Some(KillSwitchMode::SystemHalt));
}

/// Tests clean turns pass through the guard with a valid contract.
#[test]
fn test_guarded_clean_turn_passes() {
    let gate = gate();
    let payload = guarded_gate_response(
        &gate,
        &json!({}),
        "Saturn has rings.",
        &[json!({"id": "p1", "snippet": "Saturn has rings.", "trust_level": "PRIMARY"})],
        &GateContext::default(),
    )
    .unwrap();

    assert!(assert_contract_shape(&payload).is_ok());
    assert_eq!(payload.get("decision").and_then(Value::as_str), Some("ALLOW"));
}
