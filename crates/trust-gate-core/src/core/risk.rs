// trust-gate-core/src/core/risk.rs
// ============================================================================
// Module: Trust Gate Risk Register
// Description: Accepted residual risks and per-trace risk binding.
// Purpose: Reference the owned risks a trace's failure modes exercise.
// Dependencies: crate::core::threats, serde
// ============================================================================

//! ## Overview
//! The register records residual risks that were consciously accepted: the
//! lexical claim-matching heuristic and the deterministic threat classifier.
//! Traces whose failure modes or threat signals exercise a risk carry its
//! identifier so auditors can connect incidents to the register.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;

use serde::Deserialize;
use serde::Serialize;

use crate::core::threats::ThreatSignal;

// ============================================================================
// SECTION: Register Entries
// ============================================================================

/// Accepted residual risk entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResidualRisk {
    /// Stable risk identifier.
    pub risk_id: String,
    /// Risk description.
    pub description: String,
    /// Mitigation summary.
    pub mitigation: String,
    /// Accepting authority.
    pub accepted_by: String,
    /// Review cadence.
    pub review_cycle: String,
    /// Register status.
    pub status: String,
}

/// Returns the active risk register.
#[must_use]
pub fn active_risks() -> Vec<ResidualRisk> {
    vec![
        ResidualRisk {
            risk_id: "RISK-001".to_string(),
            description: "Lexical heuristics may miss nuanced entailment.".to_string(),
            mitigation: "Fail-closed suppression and periodic rule review.".to_string(),
            accepted_by: "Chief Risk Officer".to_string(),
            review_cycle: "quarterly".to_string(),
            status: "accepted".to_string(),
        },
        ResidualRisk {
            risk_id: "RISK-002".to_string(),
            description:
                "Threat classification is deterministic and may under-detect advanced attacks."
                    .to_string(),
            mitigation:
                "Escalate suspicious traces and add model-based detection in roadmap.".to_string(),
            accepted_by: "Security Governance Board".to_string(),
            review_cycle: "monthly".to_string(),
            status: "accepted".to_string(),
        },
    ]
}

// ============================================================================
// SECTION: Risk Binding
// ============================================================================

/// Failure modes that exercise the lexical-matching risk.
const LEXICAL_RISK_MODES: [&str; 3] =
    ["unsupported_claim", "OUT_OF_SCOPE", "NO_EVIDENCE"];

/// Binds applicable risk identifiers for a trace.
#[must_use]
pub fn bind_applicable_risks(
    threat_signals: &[ThreatSignal],
    failure_modes: &[String],
) -> Vec<String> {
    let mut bound: BTreeSet<String> = BTreeSet::new();
    if failure_modes
        .iter()
        .any(|mode| LEXICAL_RISK_MODES.contains(&mode.as_str()))
    {
        bound.insert("RISK-001".to_string());
    }
    if !threat_signals.is_empty() {
        bound.insert("RISK-002".to_string());
    }
    bound.into_iter().collect()
}
