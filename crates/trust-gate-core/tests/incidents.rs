// trust-gate-core/tests/incidents.rs
// ============================================================================
// Module: Incident Classification Tests
// Description: Tests for incident mapping and kill-switch auto-activation.
// ============================================================================
//! ## Overview
//! Validates incident emission rules and the bypass-driven system halt.

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

use trust_gate_core::ClaimMetrics;
use trust_gate_core::IncidentSeverity;
use trust_gate_core::IncidentType;
use trust_gate_core::KillSwitch;
use trust_gate_core::KillSwitchMode;
use trust_gate_core::classify_incidents;

/// Metrics helper for incident tests.
fn metrics(total: usize, unsupported: usize, pct: f64) -> ClaimMetrics {
    ClaimMetrics {
        num_claims_total: total,
        num_claims_unsupported: unsupported,
        pct_suppressed: pct,
    }
}

// ============================================================================
// SECTION: Classification Rules
// ============================================================================

/// Tests missing evidence maps to a medium evidence failure.
#[test]
fn test_evidence_failure_incident() {
    let switch = KillSwitch::new();
    let incidents = classify_incidents(
        "trace-1",
        &["no_supporting_evidence_found".to_string()],
        &metrics(1, 1, 1.0),
        true,
        &switch,
    );
    let failure = incidents
        .iter()
        .find(|i| i.incident_type == IncidentType::EvidenceFailure)
        .unwrap();
    assert_eq!(failure.severity, IncidentSeverity::Medium);
}

/// Tests the suppression-ratio threshold raises a spike.
#[test]
fn test_hallucination_spike_threshold() {
    let switch = KillSwitch::new();
    let below = classify_incidents("t", &[], &metrics(4, 1, 0.25), true, &switch);
    assert!(below.iter().all(|i| i.incident_type != IncidentType::HallucinationSpike));

    let at = classify_incidents("t", &[], &metrics(4, 2, 0.5), true, &switch);
    assert!(at.iter().any(|i| i.incident_type == IncidentType::HallucinationSpike));
}

/// Tests replay inconsistency raises a high incident without halting.
#[test]
fn test_replay_inconsistency_incident() {
    let switch = KillSwitch::new();
    let incidents = classify_incidents("t", &[], &metrics(1, 0, 0.0), false, &switch);
    let replayed = incidents
        .iter()
        .find(|i| i.incident_type == IncidentType::ReplayInconsistency)
        .unwrap();
    assert_eq!(replayed.severity, IncidentSeverity::High);
    assert!(switch.snapshot().mode.is_none());
}

// ============================================================================
// SECTION: Bypass Escalation
// ============================================================================

/// Tests a bypass attempt is critical and activates the system halt.
#[test]
fn test_bypass_attempt_activates_system_halt() {
    let switch = KillSwitch::new();
    let incidents = classify_incidents(
        "t",
        &["TRUST_GATE_BYPASS_ATTEMPT".to_string()],
        &metrics(0, 0, 0.0),
        true,
        &switch,
    );
    let bypass = incidents
        .iter()
        .find(|i| i.incident_type == IncidentType::TrustGateBypassAttempt)
        .unwrap();
    assert_eq!(bypass.severity, IncidentSeverity::Critical);
    assert_eq!(switch.snapshot().mode, Some(KillSwitchMode::SystemHalt));

    let halted = switch.should_halt("general", &[]);
    assert!(halted.is_some());
}
