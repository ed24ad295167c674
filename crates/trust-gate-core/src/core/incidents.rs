// trust-gate-core/src/core/incidents.rs
// ============================================================================
// Module: Trust Gate Incident Classification
// Description: Maps failure signals to incident events and halt activation.
// Purpose: Escalate evidence failures, suppression spikes, and bypasses.
// Dependencies: crate::core::{claims, kill_switch}, serde
// ============================================================================

//! ## Overview
//! Incident classification runs at the end of the gate pipeline. A detected
//! bypass attempt is the only classification that writes the kill switch:
//! it activates a system halt so subsequent turns refuse until an operator
//! intervenes.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;

use crate::core::claims::ClaimMetrics;
use crate::core::kill_switch::KillSwitch;
use crate::core::kill_switch::KillSwitchMode;

// ============================================================================
// SECTION: Incident Types
// ============================================================================

/// Incident classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IncidentType {
    /// No supporting evidence was found for the turn.
    EvidenceFailure,
    /// Half or more of the claims were suppressed.
    HallucinationSpike,
    /// A gate bypass was attempted.
    TrustGateBypassAttempt,
    /// Replay of stored inputs diverged from the recorded decision.
    ReplayInconsistency,
}

/// Incident severity beyond claim-level severities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IncidentSeverity {
    /// Critical incident requiring a halt.
    Critical,
    /// High-severity incident.
    High,
    /// Medium-severity incident.
    Medium,
}

/// Classified incident recorded on the decision record and event log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Incident {
    /// Incident classification.
    pub incident_type: IncidentType,
    /// Incident severity.
    pub severity: IncidentSeverity,
    /// Trace this incident belongs to.
    pub trace_id: String,
    /// Human-readable incident description.
    pub description: String,
}

// ============================================================================
// SECTION: Classification
// ============================================================================

/// Suppression ratio at or above which a hallucination spike is raised.
const HALLUCINATION_SPIKE_THRESHOLD: f64 = 0.5;

/// Classifies incidents for a gated turn.
///
/// A bypass-attempt failure mode activates the system halt on the provided
/// kill switch.
#[must_use]
pub fn classify_incidents(
    trace_id: &str,
    failure_modes: &[String],
    metrics: &ClaimMetrics,
    replay_consistent: bool,
    kill_switch: &KillSwitch,
) -> Vec<Incident> {
    let mut incidents = Vec::new();

    if failure_modes.iter().any(|mode| mode == "no_supporting_evidence_found") {
        incidents.push(Incident {
            incident_type: IncidentType::EvidenceFailure,
            severity: IncidentSeverity::Medium,
            trace_id: trace_id.to_string(),
            description: "no supporting evidence found for gated turn".to_string(),
        });
    }

    if metrics.pct_suppressed >= HALLUCINATION_SPIKE_THRESHOLD {
        incidents.push(Incident {
            incident_type: IncidentType::HallucinationSpike,
            severity: IncidentSeverity::High,
            trace_id: trace_id.to_string(),
            description: format!(
                "suppressed claim ratio {} at or above threshold",
                metrics.pct_suppressed
            ),
        });
    }

    if failure_modes.iter().any(|mode| mode.contains("TRUST_GATE_BYPASS_ATTEMPT")) {
        incidents.push(Incident {
            incident_type: IncidentType::TrustGateBypassAttempt,
            severity: IncidentSeverity::Critical,
            trace_id: trace_id.to_string(),
            description: "gate bypass attempt detected at boundary".to_string(),
        });
        kill_switch.activate(
            KillSwitchMode::SystemHalt,
            "trust gate bypass attempt",
            None,
            None,
        );
    }

    if !replay_consistent {
        incidents.push(Incident {
            incident_type: IncidentType::ReplayInconsistency,
            severity: IncidentSeverity::High,
            trace_id: trace_id.to_string(),
            description: "replay of stored inputs diverged from recorded decision".to_string(),
        });
    }

    incidents
}
