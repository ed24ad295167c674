// trust-gate-contract/src/boundary.rs
// ============================================================================
// Module: Trust Boundary Canary
// Description: Bypass-input assertions and the safe fallback contract.
// Purpose: Guarantee no raw model output ever crosses the trust boundary.
// Dependencies: trust-gate-core, serde_json
// ============================================================================

//! ## Overview
//! The boundary is the one place in the system that raises instead of
//! recording: a host context carrying raw model output, or a stream request
//! reaching the enforce path, is a bypass attempt. The caller-level wrapper
//! converts the raised error into a fixed-shape safe contract and lets the
//! incident classifier activate the system halt.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde_json::Map;
use serde_json::Value;
use thiserror::Error;

use trust_gate_core::CONTRACT_KEYS;
use trust_gate_core::CONTRACT_VERSION;
use trust_gate_core::ClaimMetrics;
use trust_gate_core::ContractError;
use trust_gate_core::GateContext;
use trust_gate_core::GateError;
use trust_gate_core::TrustEvidenceGate;
use trust_gate_core::assert_contract_shape;
use trust_gate_core::classify_incidents;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Failure-mode label for bypass attempts.
pub const BYPASS_FAILURE_MODE: &str = "TRUST_GATE_BYPASS_ATTEMPT";

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Errors raised at the trust boundary.
#[derive(Debug, Error)]
pub enum BoundaryError {
    /// A bypass input reached the boundary.
    #[error("TRUST_GATE_BYPASS_ATTEMPT: {0}")]
    Bypass(String),
}

// ============================================================================
// SECTION: Assertions
// ============================================================================

/// Asserts the host context and request carry no bypass inputs.
///
/// # Errors
///
/// Returns [`BoundaryError::Bypass`] when raw model output is attached or a
/// stream request reaches the enforce path.
pub fn assert_no_bypass_inputs(
    host_context: &Value,
    context: &GateContext,
) -> Result<(), BoundaryError> {
    if host_context.get("raw_model_output").is_some_and(|value| !value.is_null()) {
        return Err(BoundaryError::Bypass("raw model output attached".to_string()));
    }
    if context.stream_requested {
        return Err(BoundaryError::Bypass("stream request at enforce boundary".to_string()));
    }
    Ok(())
}

/// Asserts a payload about to leave the boundary has the contract shape.
///
/// # Errors
///
/// Returns [`ContractError::BypassShape`] on any deviation.
pub fn assert_no_raw_output(payload: &Value) -> Result<(), ContractError> {
    assert_contract_shape(payload)
}

// ============================================================================
// SECTION: Safe Contract
// ============================================================================

/// Builds the fixed-shape safe contract emitted after a bypass attempt.
///
/// The payload is a refusal carrying `failure_mode` set to the bypass label
/// and no evidence; it satisfies the contract shape assertion.
#[must_use]
pub fn safe_bypass_contract() -> Value {
    let empty_bundle = {
        let mut bundle = Map::new();
        bundle.insert("sources".into(), Value::Array(Vec::new()));
        bundle.insert("citations".into(), Value::Array(Vec::new()));
        bundle.insert("retrieval_metadata".into(), Value::Object(Map::new()));
        Value::Object(bundle)
    };
    let decision_record = {
        let mut record = Map::new();
        record.insert(
            "failure_modes".into(),
            Value::Array(vec![Value::String(BYPASS_FAILURE_MODE.to_string())]),
        );
        record.insert("claims".into(), Value::Array(Vec::new()));
        record.insert("incidents".into(), Value::Array(Vec::new()));
        Value::Object(record)
    };

    let answer = format!("REFUSE: {BYPASS_FAILURE_MODE}");
    let mut payload = Map::new();
    payload.insert("contract_version".into(), Value::String(CONTRACT_VERSION.to_string()));
    payload.insert("decision".into(), Value::String("REFUSE".to_string()));
    payload.insert("answer".into(), Value::String(answer.clone()));
    payload.insert("citations".into(), Value::Array(Vec::new()));
    payload.insert("attribution".into(), Value::Array(Vec::new()));
    payload.insert("audit_pack_ref".into(), Value::String(String::new()));
    payload.insert("policy_trace".into(), Value::Array(Vec::new()));
    payload.insert("failure_mode".into(), Value::String(BYPASS_FAILURE_MODE.to_string()));
    payload.insert("answer_text".into(), Value::String(answer));
    payload.insert("evidence_bundle_user".into(), empty_bundle);
    payload.insert("decision_record".into(), decision_record);
    payload.insert("trace_id".into(), Value::String(String::new()));
    debug_assert_eq!(payload.len(), CONTRACT_KEYS.len());
    Value::Object(payload)
}

// ============================================================================
// SECTION: Guarded Invocation
// ============================================================================

/// Gates a turn behind the boundary canary.
///
/// Bypass inputs never reach the gate: the incident classifier records the
/// attempt (activating the system halt) and the safe contract is returned in
/// place of any model output.
///
/// # Errors
///
/// Returns [`GateError`] when the gate pipeline itself fails; boundary
/// violations are not errors at this level.
pub fn guarded_gate_response(
    gate: &TrustEvidenceGate,
    host_context: &Value,
    draft_answer_text: &str,
    retrieved_evidence: &[Value],
    context: &GateContext,
) -> Result<Value, GateError> {
    if assert_no_bypass_inputs(host_context, context).is_err() {
        let metrics = ClaimMetrics {
            num_claims_total: 0,
            num_claims_unsupported: 0,
            pct_suppressed: 0.0,
        };
        let _incidents = classify_incidents(
            "",
            &[BYPASS_FAILURE_MODE.to_string()],
            &metrics,
            true,
            gate.kill_switch(),
        );
        return Ok(safe_bypass_contract());
    }

    let response = gate.gate_response(draft_answer_text, retrieved_evidence, context)?;
    let payload = response.to_ordered_value()?;
    assert_no_raw_output(&payload)?;
    Ok(payload)
}
