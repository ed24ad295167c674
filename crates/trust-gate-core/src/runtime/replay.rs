// trust-gate-core/src/runtime/replay.rs
// ============================================================================
// Module: Trust Gate Replay Evaluator
// Description: Offline re-evaluation of stored traces for equivalence checks.
// Purpose: Prove the claim engine reproduces the recorded decision.
// Dependencies: crate::{core, interfaces}, serde, serde_json
// ============================================================================

//! ## Overview
//! Replay loads a stored trace, re-normalizes the recorded evidence inputs,
//! and re-runs the claim engine over the sanitized prompt. The report states
//! whether claims, failure modes, and metrics match the original decision
//! record exactly. The exporter runs this independently; the incident
//! classifier consumes the result as `replay_consistent`.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::collections::BTreeSet;

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::core::claims::ClaimMetrics;
use crate::core::claims::ClaimRecord;
use crate::core::claims::enforce_claims;
use crate::core::evidence::DataClassification;
use crate::core::evidence::EvidenceOrigin;
use crate::core::evidence::EvidenceSource;
use crate::core::evidence::Jurisdiction;
use crate::core::evidence::TrustLevel;
use crate::core::evidence::normalize_raw_evidence;
use crate::core::policy::policy_versions_map;
use crate::core::system_claims::active_system_claims;
use crate::interfaces::StoreError;
use crate::interfaces::TraceStore;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Trust layer version recorded with every trace.
pub const TRUST_LAYER_VERSION: &str = "1.2.0";

/// Maximum characters kept from the sanitized prompt.
const SANITIZED_PROMPT_MAX_CHARS: usize = 500;

// ============================================================================
// SECTION: Replay Inputs
// ============================================================================

/// Minimal evidence shape stored for replay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplayEvidence {
    /// Stable source identifier.
    pub id: String,
    /// Evidence snippet.
    pub snippet: String,
    /// Content hash of the normalized source.
    pub hash: String,
    /// Trust classification.
    pub trust_level: TrustLevel,
    /// Origin classification.
    pub origin: EvidenceOrigin,
    /// Governing jurisdiction.
    pub jurisdiction: Jurisdiction,
    /// Data-handling classification.
    pub data_classification: DataClassification,
    /// Allowed usage scopes.
    pub allowed_scopes: Vec<String>,
}

/// Stored inputs sufficient to re-run the claim engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplayInputs {
    /// Whitespace-collapsed prompt window.
    pub sanitized_prompt: String,
    /// Normalized evidence snapshot.
    pub retrieved_evidence: Vec<ReplayEvidence>,
    /// Policy versions active at gate time.
    pub policy_versions: BTreeMap<String, String>,
    /// Trust layer version at gate time.
    pub trust_layer_version: String,
}

/// Builds replay inputs from the draft and raw evidence.
#[must_use]
pub fn build_replay_inputs(
    draft_answer_text: &str,
    retrieved_evidence: &[Value],
    trusted_tools: &BTreeSet<String>,
) -> ReplayInputs {
    let sanitized: String = draft_answer_text
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .chars()
        .take(SANITIZED_PROMPT_MAX_CHARS)
        .collect();

    let evidence = normalize_raw_evidence(retrieved_evidence, trusted_tools)
        .into_iter()
        .map(replay_evidence_from)
        .collect();

    ReplayInputs {
        sanitized_prompt: sanitized,
        retrieved_evidence: evidence,
        policy_versions: policy_versions_map(),
        trust_layer_version: TRUST_LAYER_VERSION.to_string(),
    }
}

/// Projects a normalized source into its replay snapshot.
fn replay_evidence_from(source: EvidenceSource) -> ReplayEvidence {
    ReplayEvidence {
        id: source.id,
        snippet: source.snippet,
        hash: source.hash,
        trust_level: source.trust_level,
        origin: source.origin,
        jurisdiction: source.jurisdiction,
        data_classification: source.data_classification,
        allowed_scopes: source.allowed_scopes,
    }
}

// ============================================================================
// SECTION: Replay Report
// ============================================================================

/// Result of replaying a stored trace.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplayReport {
    /// Replayed trace identifier.
    pub trace_id: String,
    /// True when claims, failure modes, and metrics all match.
    pub equivalent: bool,
    /// Re-derived claim records.
    pub replayed_claims: Vec<ClaimRecord>,
    /// Re-derived failure modes.
    pub replayed_failure_modes: Vec<String>,
    /// Re-derived metrics.
    pub replayed_metrics: ClaimMetrics,
    /// Policy versions recorded at gate time.
    pub policy_versions: BTreeMap<String, String>,
    /// Trust layer version recorded at gate time.
    pub trust_layer_version: Option<String>,
}

/// Errors raised during replay.
#[derive(Debug, Error)]
pub enum ReplayError {
    /// Trace loading failed.
    #[error(transparent)]
    Store(#[from] StoreError),
    /// Replayed values failed to serialize for comparison.
    #[error("replay serialization failed: {0}")]
    Serialization(String),
}

// ============================================================================
// SECTION: Replay
// ============================================================================

/// Replays a stored trace and compares against the recorded decision.
///
/// # Errors
///
/// Returns [`ReplayError`] when the trace cannot be loaded or compared.
pub fn replay(
    trace_id: &str,
    store: &dyn TraceStore,
    trusted_tools: &BTreeSet<String>,
) -> Result<ReplayReport, ReplayError> {
    let record = store.load(trace_id)?;
    let replay_inputs = &record.replay_inputs;

    let prompt = replay_inputs
        .get("sanitized_prompt")
        .and_then(Value::as_str)
        .unwrap_or_default();
    let evidence_inputs: Vec<Value> = replay_inputs
        .get("retrieved_evidence")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();

    let normalized = normalize_raw_evidence(&evidence_inputs, trusted_tools);
    let enforcement = enforce_claims(prompt, &normalized, &active_system_claims());

    let original = record
        .response
        .get("decision_record")
        .cloned()
        .unwrap_or(Value::Null);
    let claims_value = to_value(&enforcement.claims)?;
    let modes_value = to_value(&enforcement.failure_modes)?;
    let metrics_value = to_value(&enforcement.metrics)?;

    let equivalent = original.get("claims") == Some(&claims_value)
        && original.get("failure_modes") == Some(&modes_value)
        && original.get("metrics") == Some(&metrics_value);

    let policy_versions: BTreeMap<String, String> = replay_inputs
        .get("policy_versions")
        .cloned()
        .and_then(|value| serde_json::from_value(value).ok())
        .unwrap_or_default();
    let trust_layer_version = replay_inputs
        .get("trust_layer_version")
        .and_then(Value::as_str)
        .map(ToString::to_string);

    Ok(ReplayReport {
        trace_id: trace_id.to_string(),
        equivalent,
        replayed_claims: enforcement.claims,
        replayed_failure_modes: enforcement.failure_modes,
        replayed_metrics: enforcement.metrics,
        policy_versions,
        trust_layer_version,
    })
}

/// Serializes a replayed component for comparison.
fn to_value<T: Serialize>(value: &T) -> Result<Value, ReplayError> {
    serde_json::to_value(value).map_err(|err| ReplayError::Serialization(err.to_string()))
}
