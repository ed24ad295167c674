// trust-gate-core/src/runtime/gate.rs
// ============================================================================
// Module: Trust Gate Orchestrator
// Description: Deterministic pipeline from draft + evidence to the contract.
// Purpose: Compose normalization, enforcement, redaction, and persistence.
// Dependencies: crate::{core, interfaces}, serde, serde_json
// ============================================================================

//! ## Overview
//! The gate is a single synchronous pipeline with no side effects until the
//! final persist step: normalize evidence, enforce jurisdiction, classify and
//! contain threats, verify claims, evaluate the kill switch, redact, evaluate
//! policies, decide refuse/unknown/allow, then write the trace exactly once.
//! All failure signals become `failure_modes` on the decision record; the
//! gate itself never surfaces raw model output.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;
use std::sync::Arc;

use serde::Deserialize;
use serde::Serialize;
use serde_json::Map;
use serde_json::Value;
use thiserror::Error;

use crate::core::claims::ClaimType;
use crate::core::claims::VerificationStatus;
use crate::core::claims::enforce_claims;
use crate::core::evidence::normalize_raw_evidence;
use crate::core::identifiers::TraceId;
use crate::core::incidents::classify_incidents;
use crate::core::kill_switch::KillSwitch;
use crate::core::policy::PolicyInputs;
use crate::core::policy::evaluate_policy_checks;
use crate::core::policy::policy_change_log;
use crate::core::policy::policy_versions_map;
use crate::core::redaction::redact_text;
use crate::core::response::CONTRACT_VERSION;
use crate::core::response::Citation;
use crate::core::response::ContractError;
use crate::core::response::DecisionRecord;
use crate::core::response::DecisionTimestamps;
use crate::core::response::EvidenceBundleUser;
use crate::core::response::HostContextSummary;
use crate::core::response::JurisdictionCompliance;
use crate::core::response::ReplayMetadata;
use crate::core::response::RetrievalMetadata;
use crate::core::response::TrustEvidenceResponse;
use crate::core::response::assert_contract_shape;
use crate::core::retention::RetentionMetadata;
use crate::core::risk::bind_applicable_risks;
use crate::core::sovereignty::DEFAULT_ALLOWED_JURISDICTIONS;
use crate::core::sovereignty::enforce_jurisdiction;
use crate::core::system_claims::active_system_claims;
use crate::core::threats::apply_threat_containment;
use crate::core::threats::classify_threat_signals;
use crate::core::time::UtcTime;
use crate::interfaces::LegalHoldStore;
use crate::interfaces::StoreError;
use crate::interfaces::TraceStore;
use crate::runtime::replay::TRUST_LAYER_VERSION;
use crate::runtime::replay::build_replay_inputs;

// ============================================================================
// SECTION: Gate Context
// ============================================================================

/// Request context supplied by the host for one gated turn.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GateContext {
    /// Jurisdictions allowed to support this turn; defaults to all.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allowed_jurisdictions: Option<Vec<String>>,
    /// Domain label for kill-switch scoping.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
    /// Chat session identifier from the host.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chat_session_id: Option<String>,
    /// Host message identifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_id: Option<i64>,
    /// Request origin label.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin: Option<String>,
    /// Whether the host requested a streaming response.
    #[serde(default)]
    pub stream_requested: bool,
    /// Request path at the host boundary.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_path: Option<String>,
    /// Failure modes injected by the host integration layer.
    #[serde(default)]
    pub failure_modes: Vec<String>,
    /// Retention policy label override.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retention_policy: Option<String>,
    /// Retention reason label override.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retention_reason: Option<String>,
    /// Legal-hold flag for the turn.
    #[serde(default)]
    pub legal_hold: bool,
    /// Effective trust mode resolved by the integration layer.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trust_mode_effective: Option<String>,
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Errors raised by the gate pipeline.
#[derive(Debug, Error)]
pub enum GateError {
    /// Contract assembly or shape assertion failed.
    #[error(transparent)]
    Contract(#[from] ContractError),
    /// Trace persistence failed.
    #[error(transparent)]
    Store(#[from] StoreError),
}

// ============================================================================
// SECTION: Gate Dependencies
// ============================================================================

/// Injected dependencies for the gate.
pub struct GateDependencies {
    /// Trace store receiving the persisted record.
    pub trace_store: Arc<dyn TraceStore>,
    /// Legal-hold store receiving unredacted copies.
    pub legal_hold_store: Arc<dyn LegalHoldStore>,
    /// Shared kill switch.
    pub kill_switch: Arc<KillSwitch>,
    /// Trusted tool names for evidence normalization.
    pub trusted_tools: BTreeSet<String>,
}

/// Returns the default trusted-tool set.
#[must_use]
pub fn default_trusted_tools() -> BTreeSet<String> {
    let mut tools = BTreeSet::new();
    tools.insert("search_docs".to_string());
    tools
}

// ============================================================================
// SECTION: Gate
// ============================================================================

/// Scope evidence must grant for response generation.
const REQUIRED_SCOPE: &str = "response_generation";

/// Deterministic trust-and-evidence gate.
pub struct TrustEvidenceGate {
    /// Trace store receiving the persisted record.
    trace_store: Arc<dyn TraceStore>,
    /// Legal-hold store receiving unredacted copies.
    legal_hold_store: Arc<dyn LegalHoldStore>,
    /// Shared kill switch.
    kill_switch: Arc<KillSwitch>,
    /// Trusted tool names for evidence normalization.
    trusted_tools: BTreeSet<String>,
}

impl TrustEvidenceGate {
    /// Creates a gate from injected dependencies.
    #[must_use]
    pub fn new(deps: GateDependencies) -> Self {
        Self {
            trace_store: deps.trace_store,
            legal_hold_store: deps.legal_hold_store,
            kill_switch: deps.kill_switch,
            trusted_tools: deps.trusted_tools,
        }
    }

    /// Returns the shared kill switch.
    #[must_use]
    pub fn kill_switch(&self) -> &Arc<KillSwitch> {
        &self.kill_switch
    }

    /// Gates a draft answer against retrieved evidence.
    ///
    /// # Errors
    ///
    /// Returns [`GateError`] when contract assembly or persistence fails.
    /// Enforcement outcomes are never errors; they surface as failure modes
    /// on the decision record.
    pub fn gate_response(
        &self,
        draft_answer_text: &str,
        retrieved_evidence: &[Value],
        context: &GateContext,
    ) -> Result<TrustEvidenceResponse, GateError> {
        let trace_id = TraceId::generate();
        let now = UtcTime::now();

        let normalized = normalize_raw_evidence(retrieved_evidence, &self.trusted_tools);

        let allowed_jurisdictions = resolve_allowed_jurisdictions(context);
        let outcome =
            enforce_jurisdiction(normalized, &allowed_jurisdictions, REQUIRED_SCOPE);
        let jurisdiction_violation = outcome.violation;

        let threat_signals = classify_threat_signals(draft_answer_text, &outcome.accepted);
        let evidence_sources = apply_threat_containment(outcome.accepted, &threat_signals);

        let system_claims = active_system_claims();
        let enforcement =
            enforce_claims(draft_answer_text, &evidence_sources, &system_claims);

        let mut claim_types: Vec<ClaimType> =
            enforcement.claims.iter().map(|claim| claim.claim_type).collect();
        claim_types.sort_unstable();
        claim_types.dedup();
        let domain = context.domain.clone().unwrap_or_else(|| "general".to_string());
        let halt_reason = self.kill_switch.should_halt(&domain, &claim_types);

        let mut failure_modes: BTreeSet<String> =
            enforcement.failure_modes.iter().cloned().collect();
        for mode in &context.failure_modes {
            failure_modes.insert(mode.clone());
        }

        let (missing_critical_provenance, missing_provenance_count) =
            missing_critical_provenance(retrieved_evidence);
        let enforce_mode =
            context.trust_mode_effective.as_deref() == Some("enforce");
        if missing_critical_provenance && enforce_mode {
            failure_modes.insert("critical_provenance_missing".to_string());
        }

        let unsupported_count = enforcement.metrics.num_claims_unsupported;
        let factual_violations = enforcement
            .claims
            .iter()
            .filter(|claim| {
                claim.claim_type == ClaimType::Factual
                    && claim.verification_status != VerificationStatus::Supported
            })
            .count();
        let stream_blocked = !context.stream_requested;

        let mut redaction_events = Vec::new();
        let (redacted_answer, answer_redactions) =
            redact_text(&enforcement.enforced_answer);
        redaction_events.extend(answer_redactions);

        let evidence_sources: Vec<_> = evidence_sources
            .into_iter()
            .map(|mut source| {
                let (redacted_snippet, snippet_redactions) = redact_text(&source.snippet);
                redaction_events.extend(snippet_redactions);
                source.snippet = redacted_snippet;
                source
            })
            .collect();

        let policy_checks = evaluate_policy_checks(
            &PolicyInputs {
                evidence_count: evidence_sources.len(),
                unsupported_claim_count: unsupported_count,
                factual_trust_violations: factual_violations,
                stream_blocked,
                jurisdiction_violation,
                redaction_applied: !redaction_events.is_empty(),
            },
            &now,
        );

        let citations: Vec<Citation> = evidence_sources
            .iter()
            .enumerate()
            .map(|(index, source)| Citation {
                citation_number: index + 1,
                source_id: source.id.clone(),
            })
            .collect();

        let mut refusal_reasons = Vec::new();
        if jurisdiction_violation {
            refusal_reasons
                .push("REFUSE: jurisdiction_violation_disallowed_evidence".to_string());
            failure_modes.insert("jurisdiction_violation".to_string());
        }
        if let Some(reason) = &halt_reason {
            refusal_reasons.push(format!("REFUSE: kill_switch_active ({reason})"));
            failure_modes.insert("kill_switch_active".to_string());
        }
        if missing_critical_provenance && enforce_mode {
            refusal_reasons.push("REFUSE: critical_provenance_missing".to_string());
        }

        let final_answer = if refusal_reasons.is_empty() {
            let fallback_needed = evidence_sources.is_empty()
                && unsupported_count > 0
                && !redacted_answer.trim().to_lowercase().starts_with("unknown:");
            if fallback_needed {
                "UNKNOWN: no supporting evidence found.".to_string()
            } else {
                redacted_answer
            }
        } else {
            refusal_reasons.join("\n")
        };

        let retention = RetentionMetadata::from_context(
            context.retention_policy.as_deref(),
            context.retention_reason.as_deref(),
            context.legal_hold,
            now,
        );
        let replay_inputs = serde_json::to_value(build_replay_inputs(
            draft_answer_text,
            retrieved_evidence,
            &self.trusted_tools,
        ))
        .map_err(|err| ContractError::Serialization(err.to_string()))?;
        let replay_metadata = ReplayMetadata {
            policy_versions: policy_versions_map(),
            policy_change_log: policy_change_log(),
            trust_layer_version: TRUST_LAYER_VERSION.to_string(),
            replay_status: "available".to_string(),
        };

        let failure_modes: Vec<String> = failure_modes.into_iter().collect();
        let incidents = classify_incidents(
            trace_id.as_str(),
            &failure_modes,
            &enforcement.metrics,
            true,
            &self.kill_switch,
        );
        let risk_references = bind_applicable_risks(&threat_signals, &failure_modes);

        let response = TrustEvidenceResponse {
            answer_text: final_answer,
            evidence_bundle_user: EvidenceBundleUser {
                citations,
                retrieval_metadata: RetrievalMetadata {
                    contract_version: CONTRACT_VERSION.to_string(),
                    evidence_count: evidence_sources.len(),
                    missing_critical_provenance,
                    missing_provenance_count,
                    jurisdiction_compliance: JurisdictionCompliance {
                        allowed_jurisdictions: sorted_labels(&allowed_jurisdictions),
                        accepted_evidence: outcome.accepted_meta,
                        rejected_evidence: outcome.rejected_meta,
                    },
                    host_context: HostContextSummary {
                        chat_session_id: context.chat_session_id.clone(),
                        message_id: context.message_id,
                        origin: context.origin.clone(),
                        stream_requested: Some(context.stream_requested),
                        request_path: context.request_path.clone(),
                        failure_modes: context.failure_modes.clone(),
                        domain,
                    },
                },
                sources: evidence_sources,
            },
            decision_record: DecisionRecord {
                claims: enforcement.claims,
                claim_graph: enforcement.claim_graph,
                system_claim_references: enforcement.system_claim_refs,
                evidence_links: enforcement.evidence_links,
                policy_checks,
                hallucination_events: enforcement.hallucination_events,
                threat_signals,
                incidents,
                risk_references,
                redaction_events,
                replay_metadata,
                metrics: enforcement.metrics,
                failure_modes,
                timestamps: DecisionTimestamps {
                    gated_at: now.rfc3339(),
                },
                retention: retention.clone(),
            },
            trace_id: trace_id.as_str().to_string(),
        };

        let payload = response.to_ordered_value()?;
        assert_contract_shape(&payload)?;

        let context_minimal = build_context_minimal(
            context,
            retrieved_evidence.len(),
            &self.kill_switch,
        )?;
        self.trace_store.store(
            trace_id.as_str(),
            &payload,
            &context_minimal,
            &replay_inputs,
        )?;

        if retention.legal_hold {
            self.legal_hold_store.store_unredacted(
                trace_id.as_str(),
                &enforcement.enforced_answer,
                &Value::Array(retrieved_evidence.to_vec()),
                "",
            )?;
        }

        Ok(response)
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Resolves the allowed-jurisdiction labels for a turn.
///
/// The default allowlist applies only when the context provides no labels at
/// all. A present list is carried as-is, so an allowlist naming no known
/// jurisdiction rejects every source instead of falling open.
fn resolve_allowed_jurisdictions(context: &GateContext) -> Vec<String> {
    match context.allowed_jurisdictions.as_deref() {
        Some(labels) if !labels.is_empty() => labels.to_vec(),
        _ => DEFAULT_ALLOWED_JURISDICTIONS.iter().map(ToString::to_string).collect(),
    }
}

/// Returns the provided labels uppercased, sorted, and deduplicated.
fn sorted_labels(allowed_jurisdictions: &[String]) -> Vec<String> {
    let labels: BTreeSet<String> = allowed_jurisdictions
        .iter()
        .map(|label| label.to_ascii_uppercase())
        .collect();
    labels.into_iter().collect()
}

/// Detects raw items declaring missing critical provenance.
fn missing_critical_provenance(raw_evidence: &[Value]) -> (bool, usize) {
    let mut missing_count = 0usize;
    for item in raw_evidence {
        let missing = item
            .get("provenance")
            .and_then(|prov| prov.get("missing_fields"))
            .and_then(Value::as_array)
            .is_some_and(|fields| !fields.is_empty());
        if missing {
            missing_count += 1;
        }
    }
    (missing_count > 0, missing_count)
}

/// Builds the minimal context payload persisted with the trace.
fn build_context_minimal(
    context: &GateContext,
    retrieved_evidence_count: usize,
    kill_switch: &KillSwitch,
) -> Result<Value, ContractError> {
    let mut minimal = Map::new();
    minimal.insert(
        "request_metadata".into(),
        serde_json::to_value(context)
            .map_err(|err| ContractError::Serialization(err.to_string()))?,
    );
    minimal.insert(
        "retrieved_evidence_count".into(),
        Value::from(retrieved_evidence_count),
    );
    minimal.insert(
        "kill_switch_state".into(),
        serde_json::to_value(kill_switch.snapshot())
            .map_err(|err| ContractError::Serialization(err.to_string()))?,
    );
    Ok(Value::Object(minimal))
}
