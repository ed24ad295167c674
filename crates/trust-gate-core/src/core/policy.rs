// trust-gate-core/src/core/policy.rs
// ============================================================================
// Module: Trust Gate Policy Registry & Evaluator
// Description: Fixed policy registry with per-turn evaluation results.
// Purpose: Emit the full policy-check set with versions for every response.
// Dependencies: crate::core::time, serde
// ============================================================================

//! ## Overview
//! Policies are a fixed registry, not a DSL. Every gated turn evaluates the
//! complete set and records pass/fail with the policy version, so auditors
//! can diff behavior against the exported version change log.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use serde::Deserialize;
use serde::Serialize;

use crate::core::time::UtcTime;

// ============================================================================
// SECTION: Registry Types
// ============================================================================

/// Registered policy definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyDefinition {
    /// Stable policy identifier.
    pub policy_id: String,
    /// Policy description.
    pub description: String,
    /// Policy scope label.
    pub scope: String,
    /// Modules enforcing the policy.
    pub enforced_by: Vec<String>,
    /// Tests accepting the policy.
    pub acceptance_tests: Vec<String>,
    /// Policy version.
    pub version: String,
}

/// Version change-log entry exported with the policy set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyChangeLogEntry {
    /// Changed policy identifier.
    pub policy_id: String,
    /// Previous version.
    pub from_version: String,
    /// New version.
    pub to_version: String,
    /// Change timestamp.
    pub changed_at: String,
    /// Change reason.
    pub reason: String,
}

/// Evaluated policy check recorded on the decision record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyCheck {
    /// Stable policy identifier.
    pub policy_id: String,
    /// Policy description.
    pub description: String,
    /// Policy scope label.
    pub scope: String,
    /// Policy version.
    pub version: String,
    /// Modules enforcing the policy.
    pub enforced_by: Vec<String>,
    /// Tests accepting the policy.
    pub acceptance_tests: Vec<String>,
    /// Whether the check passed for this turn.
    pub passed: bool,
    /// Evaluation details.
    pub details: String,
    /// Evaluation timestamp.
    pub evaluated_at: String,
}

// ============================================================================
// SECTION: Registry
// ============================================================================

/// Builds one registry definition.
fn definition(
    policy_id: &str,
    description: &str,
    scope: &str,
    enforced_by: &[&str],
    acceptance_tests: &[&str],
    version: &str,
) -> PolicyDefinition {
    PolicyDefinition {
        policy_id: policy_id.to_string(),
        description: description.to_string(),
        scope: scope.to_string(),
        enforced_by: enforced_by.iter().map(ToString::to_string).collect(),
        acceptance_tests: acceptance_tests.iter().map(ToString::to_string).collect(),
        version: version.to_string(),
    }
}

/// Returns the fixed policy registry.
#[must_use]
pub fn policy_definitions() -> Vec<PolicyDefinition> {
    vec![
        definition(
            "fail_closed_default",
            "Unsupported claims are transformed to UNKNOWN or REFUSED.",
            "enforcement",
            &["trust-gate-core/src/core/claims.rs", "trust-gate-core/src/runtime/gate.rs"],
            &["fail_closed_unknown_lines"],
            "2.0.0",
        ),
        definition(
            "no_fabricated_citations",
            "Citations are emitted only from normalized evidence sources.",
            "evidence",
            &["trust-gate-core/src/runtime/gate.rs"],
            &["citations_reference_known_sources"],
            "1.0.0",
        ),
        definition(
            "factual_evidence_trust",
            "Factual claims require trusted evidence coverage.",
            "evidence",
            &["trust-gate-core/src/core/claims.rs"],
            &["factual_trust_rules"],
            "2.0.0",
        ),
        definition(
            "streaming_partials_blocked",
            "Streaming partials are blocked at trust boundary.",
            "boundary",
            &["trust-gate-contract/src/boundary.rs"],
            &["stream_request_raises_bypass"],
            "2.0.0",
        ),
        definition(
            "jurisdiction_compliance",
            "Disallowed-jurisdiction evidence cannot support claims.",
            "sovereignty",
            &["trust-gate-core/src/runtime/gate.rs"],
            &["jurisdiction_violation_refuses"],
            "1.0.0",
        ),
        definition(
            "pii_redaction",
            "PII is redacted from user-facing and narrative artifacts.",
            "privacy",
            &["trust-gate-core/src/core/redaction.rs", "trust-gate-audit/src/exporter.rs"],
            &["pii_detection_and_redaction"],
            "1.0.0",
        ),
        definition(
            "evidence_presence",
            "Evidence presence is tracked for audit context.",
            "audit",
            &["trust-gate-core/src/runtime/gate.rs"],
            &["fail_closed_unknown_lines"],
            "1.0.0",
        ),
        definition(
            "unsupported_claims_handled",
            "Unsupported claims are recorded.",
            "audit",
            &["trust-gate-core/src/core/claims.rs"],
            &["hallucination_events_and_metrics"],
            "1.0.0",
        ),
    ]
}

/// Returns the policy version map keyed by policy identifier.
#[must_use]
pub fn policy_versions_map() -> BTreeMap<String, String> {
    policy_definitions()
        .into_iter()
        .map(|def| (def.policy_id, def.version))
        .collect()
}

/// Returns the exported policy version change log.
#[must_use]
pub fn policy_change_log() -> Vec<PolicyChangeLogEntry> {
    vec![
        PolicyChangeLogEntry {
            policy_id: "fail_closed_default".to_string(),
            from_version: "1.1.0".to_string(),
            to_version: "2.0.0".to_string(),
            changed_at: "2026-02-01T00:00:00Z".to_string(),
            reason: "Added regulator-grade refusal semantics.".to_string(),
        },
        PolicyChangeLogEntry {
            policy_id: "factual_evidence_trust".to_string(),
            from_version: "1.1.0".to_string(),
            to_version: "2.0.0".to_string(),
            changed_at: "2026-02-01T00:00:00Z".to_string(),
            reason: "Aligned with updated governance trace model.".to_string(),
        },
    ]
}

// ============================================================================
// SECTION: Evaluation
// ============================================================================

/// Per-turn inputs driving policy evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PolicyInputs {
    /// Count of evidence sources surviving normalization and containment.
    pub evidence_count: usize,
    /// Count of unsupported claims.
    pub unsupported_claim_count: usize,
    /// Count of factual claims lacking trusted support.
    pub factual_trust_violations: usize,
    /// True when no stream was requested (partials blocked).
    pub stream_blocked: bool,
    /// True when jurisdiction enforcement rejected any source.
    pub jurisdiction_violation: bool,
    /// True when redaction substituted at least one token.
    pub redaction_applied: bool,
}

/// Looks up a registry definition and materializes a check result.
fn evaluate(policy_id: &str, passed: bool, details: String, evaluated_at: &str) -> PolicyCheck {
    let fallback = definition(policy_id, "", "unknown", &[], &[], "unknown");
    let def = policy_definitions()
        .into_iter()
        .find(|def| def.policy_id == policy_id)
        .unwrap_or(fallback);
    PolicyCheck {
        policy_id: def.policy_id,
        description: def.description,
        scope: def.scope,
        version: def.version,
        enforced_by: def.enforced_by,
        acceptance_tests: def.acceptance_tests,
        passed,
        details,
        evaluated_at: evaluated_at.to_string(),
    }
}

/// Evaluates the full policy set for one gated turn.
#[must_use]
pub fn evaluate_policy_checks(inputs: &PolicyInputs, evaluated_at: &UtcTime) -> Vec<PolicyCheck> {
    let at = evaluated_at.rfc3339();
    vec![
        evaluate(
            "fail_closed_default",
            true,
            "Unsupported claims are transformed to UNKNOWN or REFUSED.".to_string(),
            &at,
        ),
        evaluate(
            "no_fabricated_citations",
            true,
            "Citations emitted only from normalized evidence sources.".to_string(),
            &at,
        ),
        evaluate(
            "factual_evidence_trust",
            inputs.factual_trust_violations == 0,
            format!("factual_trust_violations={}", inputs.factual_trust_violations),
            &at,
        ),
        evaluate(
            "streaming_partials_blocked",
            inputs.stream_blocked,
            "streaming disabled at trust boundary".to_string(),
            &at,
        ),
        evaluate(
            "jurisdiction_compliance",
            !inputs.jurisdiction_violation,
            if inputs.jurisdiction_violation {
                "jurisdiction_violation_detected".to_string()
            } else {
                "compliant".to_string()
            },
            &at,
        ),
        evaluate(
            "pii_redaction",
            true,
            if inputs.redaction_applied {
                "redaction_applied".to_string()
            } else {
                "no_redaction_required".to_string()
            },
            &at,
        ),
        evaluate(
            "evidence_presence",
            inputs.evidence_count > 0,
            if inputs.evidence_count == 0 {
                "No supporting evidence found".to_string()
            } else {
                "evidence_present".to_string()
            },
            &at,
        ),
        evaluate(
            "unsupported_claims_handled",
            true,
            format!("unsupported_claim_count={}", inputs.unsupported_claim_count),
            &at,
        ),
    ]
}
