// trust-gate-core/src/core/response.rs
// ============================================================================
// Module: Trust Gate Response Contract
// Description: Decision record shapes and the fixed-order response contract.
// Purpose: Serialize gated responses with a stable, testable key order.
// Dependencies: crate::core::*, serde, serde_json
// ============================================================================

//! ## Overview
//! The user-visible payload is a versioned mapping with a fixed top-level key
//! order. The order is part of the contract: callers and downstream tooling
//! assert it, and any deviation is treated as a gate bypass attempt rather
//! than a formatting bug.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use serde::Deserialize;
use serde::Serialize;
use serde_json::Map;
use serde_json::Value;
use thiserror::Error;

use crate::core::claims::ClaimGraphEdge;
use crate::core::claims::ClaimMetrics;
use crate::core::claims::ClaimRecord;
use crate::core::claims::EvidenceLink;
use crate::core::claims::HallucinationEvent;
use crate::core::claims::SystemClaimRef;
use crate::core::evidence::EvidenceSource;
use crate::core::incidents::Incident;
use crate::core::policy::PolicyChangeLogEntry;
use crate::core::policy::PolicyCheck;
use crate::core::redaction::RedactionEvent;
use crate::core::retention::RetentionMetadata;
use crate::core::sovereignty::JurisdictionRecord;
use crate::core::threats::ThreatSignal;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Contract version emitted on every response.
pub const CONTRACT_VERSION: &str = "1.0";

/// Fixed top-level key order of the serialized response contract.
pub const CONTRACT_KEYS: [&str; 12] = [
    "contract_version",
    "decision",
    "answer",
    "citations",
    "attribution",
    "audit_pack_ref",
    "policy_trace",
    "failure_mode",
    "answer_text",
    "evidence_bundle_user",
    "decision_record",
    "trace_id",
];

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Errors raised when building or asserting the response contract.
#[derive(Debug, Error)]
pub enum ContractError {
    /// Serialized payload violated the fixed contract shape.
    #[error("TRUST_GATE_BYPASS_ATTEMPT: invalid contract shape")]
    BypassShape,
    /// Contract serialization failed.
    #[error("contract serialization failed: {0}")]
    Serialization(String),
}

// ============================================================================
// SECTION: Decision
// ============================================================================

/// Top-level decision derived from the enforced answer prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Decision {
    /// Answer allowed through.
    Allow,
    /// Answer replaced by one or more UNKNOWN lines.
    Unknown,
    /// Answer refused outright.
    Refuse,
}

impl Decision {
    /// Derives the decision from an enforced answer.
    #[must_use]
    pub fn from_answer(answer_text: &str) -> Self {
        if answer_text.starts_with("REFUSE:") {
            Self::Refuse
        } else if answer_text.starts_with("UNKNOWN:") {
            Self::Unknown
        } else {
            Self::Allow
        }
    }
}

// ============================================================================
// SECTION: Bundle Types
// ============================================================================

/// Citation entry mapping an ordinal to a source identifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Citation {
    /// 1-based citation ordinal.
    pub citation_number: usize,
    /// Cited evidence source identifier.
    pub source_id: String,
}

/// Attribution entry for the host-facing contract surface.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributionItem {
    /// Evidence source identifier.
    pub source_id: String,
    /// Source title when provided.
    pub title: Option<String>,
    /// Source URI when provided.
    pub uri: Option<String>,
}

/// Compact per-policy trace entry for the host-facing contract surface.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyTraceEntry {
    /// Policy identifier.
    pub policy_id: String,
    /// Whether the policy passed.
    pub passed: bool,
    /// Policy version.
    pub version: String,
}

/// Jurisdiction-compliance block embedded in retrieval metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JurisdictionCompliance {
    /// Sorted uppercase jurisdictions allowed for the turn.
    pub allowed_jurisdictions: Vec<String>,
    /// Decision metadata for accepted evidence.
    pub accepted_evidence: Vec<JurisdictionRecord>,
    /// Decision metadata for rejected evidence.
    pub rejected_evidence: Vec<JurisdictionRecord>,
}

/// Minimal host context echoed in retrieval metadata.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostContextSummary {
    /// Chat session identifier from the host.
    pub chat_session_id: Option<String>,
    /// Host message identifier.
    pub message_id: Option<i64>,
    /// Request origin label.
    pub origin: Option<String>,
    /// Whether the host requested streaming.
    pub stream_requested: Option<bool>,
    /// Request path at the host boundary.
    pub request_path: Option<String>,
    /// Failure modes supplied by the host context.
    pub failure_modes: Vec<String>,
    /// Domain label for kill-switch scoping.
    pub domain: String,
}

/// Retrieval metadata block of the user evidence bundle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetrievalMetadata {
    /// Contract version.
    pub contract_version: String,
    /// Count of evidence sources surviving the pipeline.
    pub evidence_count: usize,
    /// True when any raw item declared missing critical provenance.
    pub missing_critical_provenance: bool,
    /// Count of raw items with missing critical provenance.
    pub missing_provenance_count: usize,
    /// Jurisdiction decisions for the turn.
    pub jurisdiction_compliance: JurisdictionCompliance,
    /// Minimal host context echo.
    pub host_context: HostContextSummary,
}

/// User-facing evidence bundle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvidenceBundleUser {
    /// Normalized, redacted evidence sources.
    pub sources: Vec<EvidenceSource>,
    /// Citations over the sources, in order.
    pub citations: Vec<Citation>,
    /// Retrieval metadata for the turn.
    pub retrieval_metadata: RetrievalMetadata,
}

// ============================================================================
// SECTION: Decision Record
// ============================================================================

/// Replay metadata recorded on the decision record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplayMetadata {
    /// Policy versions active at gate time.
    pub policy_versions: BTreeMap<String, String>,
    /// Policy version change log.
    pub policy_change_log: Vec<PolicyChangeLogEntry>,
    /// Trust layer version at gate time.
    pub trust_layer_version: String,
    /// Replay availability status.
    pub replay_status: String,
}

/// Decision-record timestamps.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecisionTimestamps {
    /// Gate completion timestamp.
    pub gated_at: String,
}

/// Full decision record for a gated turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionRecord {
    /// Verified claims in draft order.
    pub claims: Vec<ClaimRecord>,
    /// Derivation edges.
    pub claim_graph: Vec<ClaimGraphEdge>,
    /// SYSTEM-claim registry references.
    pub system_claim_references: Vec<SystemClaimRef>,
    /// Claim-to-source links.
    pub evidence_links: Vec<EvidenceLink>,
    /// Evaluated policy checks.
    pub policy_checks: Vec<PolicyCheck>,
    /// Suppression events.
    pub hallucination_events: Vec<HallucinationEvent>,
    /// Classified threat signals.
    pub threat_signals: Vec<ThreatSignal>,
    /// Classified incidents.
    pub incidents: Vec<Incident>,
    /// Bound risk identifiers.
    pub risk_references: Vec<String>,
    /// Redaction events.
    pub redaction_events: Vec<RedactionEvent>,
    /// Replay metadata.
    pub replay_metadata: ReplayMetadata,
    /// Aggregate claim metrics.
    pub metrics: ClaimMetrics,
    /// Deduplicated, sorted failure modes.
    pub failure_modes: Vec<String>,
    /// Decision timestamps.
    pub timestamps: DecisionTimestamps,
    /// Retention metadata.
    pub retention: RetentionMetadata,
}

// ============================================================================
// SECTION: Response
// ============================================================================

/// Gated response bound to one trace.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrustEvidenceResponse {
    /// Enforced answer text.
    pub answer_text: String,
    /// User-facing evidence bundle.
    pub evidence_bundle_user: EvidenceBundleUser,
    /// Full decision record.
    pub decision_record: DecisionRecord,
    /// Trace identifier.
    pub trace_id: String,
}

impl TrustEvidenceResponse {
    /// Builds the fixed-order contract payload.
    ///
    /// # Errors
    ///
    /// Returns [`ContractError::Serialization`] when a component fails to
    /// serialize.
    pub fn to_ordered_value(&self) -> Result<Value, ContractError> {
        let decision = Decision::from_answer(&self.answer_text);
        let policy_trace: Vec<PolicyTraceEntry> = self
            .decision_record
            .policy_checks
            .iter()
            .map(|check| PolicyTraceEntry {
                policy_id: check.policy_id.clone(),
                passed: check.passed,
                version: check.version.clone(),
            })
            .collect();
        let attribution: Vec<AttributionItem> = self
            .evidence_bundle_user
            .sources
            .iter()
            .map(|source| AttributionItem {
                source_id: source.id.clone(),
                title: source.title.clone(),
                uri: source.uri.clone(),
            })
            .collect();
        let failure_mode = self
            .decision_record
            .failure_modes
            .first()
            .cloned()
            .unwrap_or_else(|| "none".to_string());

        let mut payload = Map::new();
        payload.insert("contract_version".into(), Value::String(CONTRACT_VERSION.into()));
        payload.insert("decision".into(), to_value(&decision)?);
        payload.insert("answer".into(), Value::String(self.answer_text.clone()));
        payload.insert("citations".into(), to_value(&self.evidence_bundle_user.citations)?);
        payload.insert("attribution".into(), to_value(&attribution)?);
        payload.insert(
            "audit_pack_ref".into(),
            Value::String(format!("/trust/audit-packs/{}", self.trace_id)),
        );
        payload.insert("policy_trace".into(), to_value(&policy_trace)?);
        payload.insert("failure_mode".into(), Value::String(failure_mode));
        payload.insert("answer_text".into(), Value::String(self.answer_text.clone()));
        payload.insert(
            "evidence_bundle_user".into(),
            to_value(&self.evidence_bundle_user)?,
        );
        payload.insert("decision_record".into(), to_value(&self.decision_record)?);
        payload.insert("trace_id".into(), Value::String(self.trace_id.clone()));

        Ok(Value::Object(payload))
    }
}

/// Serializes a contract component into a JSON value.
fn to_value<T: Serialize>(value: &T) -> Result<Value, ContractError> {
    serde_json::to_value(value).map_err(|err| ContractError::Serialization(err.to_string()))
}

// ============================================================================
// SECTION: Shape Assertion
// ============================================================================

/// Asserts the payload carries exactly the fixed contract keys, in order.
///
/// # Errors
///
/// Returns [`ContractError::BypassShape`] on any deviation.
pub fn assert_contract_shape(payload: &Value) -> Result<(), ContractError> {
    let Some(object) = payload.as_object() else {
        return Err(ContractError::BypassShape);
    };
    if object.len() != CONTRACT_KEYS.len() {
        return Err(ContractError::BypassShape);
    }
    for (actual, expected) in object.keys().zip(CONTRACT_KEYS.iter()) {
        if actual != expected {
            return Err(ContractError::BypassShape);
        }
    }
    Ok(())
}
