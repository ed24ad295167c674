// trust-gate-contract/tests/controls.rs
// ============================================================================
// Module: Integration Controls Tests
// Description: Tests for trust-mode resolution and streaming downgrade.
// ============================================================================
//! ## Overview
//! Validates the per-request enforcement plan matrix.

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

use trust_gate_contract::ControlsConfig;
use trust_gate_contract::STREAMING_ENFORCEMENT_BYPASS_MODE;
use trust_gate_contract::TrustMode;
use trust_gate_contract::plan_enforcement;

// ============================================================================
// SECTION: Mode Resolution
// ============================================================================

/// Tests the disabled layer never enforces.
#[test]
fn test_disabled_layer_is_off() {
    let config = ControlsConfig {
        enabled: false,
        mode: TrustMode::Enforce,
        enforce_on_streaming: true,
    };
    let plan = plan_enforcement(&config, false);
    assert_eq!(plan.effective_mode, TrustMode::Off);
    assert!(!plan.enforce_output);
}

/// Tests observe mode records without replacing output.
#[test]
fn test_observe_mode_never_replaces() {
    let config = ControlsConfig {
        enabled: true,
        mode: TrustMode::Observe,
        enforce_on_streaming: false,
    };
    let plan = plan_enforcement(&config, false);
    assert_eq!(plan.effective_mode, TrustMode::Observe);
    assert!(!plan.enforce_output);
    assert!(plan.context_failure_modes.is_empty());
}

/// Tests enforce mode replaces output on non-streaming requests.
#[test]
fn test_enforce_replaces_output() {
    let config = ControlsConfig {
        enabled: true,
        mode: TrustMode::Enforce,
        enforce_on_streaming: false,
    };
    let plan = plan_enforcement(&config, false);
    assert_eq!(plan.effective_mode, TrustMode::Enforce);
    assert!(plan.enforce_output);
}

// ============================================================================
// SECTION: Streaming Downgrade
// ============================================================================

/// Tests streaming downgrades enforce to observe and records the bypass.
#[test]
fn test_streaming_downgrade_records_bypass() {
    let config = ControlsConfig {
        enabled: true,
        mode: TrustMode::Enforce,
        enforce_on_streaming: false,
    };
    let plan = plan_enforcement(&config, true);
    assert_eq!(plan.effective_mode, TrustMode::Observe);
    assert!(!plan.enforce_output);
    assert_eq!(
        plan.context_failure_modes,
        vec![STREAMING_ENFORCEMENT_BYPASS_MODE.to_string()]
    );
    assert_eq!(plan.bypass_reason.as_deref(), Some("streaming_enforce_disabled"));
}

/// Tests explicit streaming enforcement keeps enforce mode.
#[test]
fn test_streaming_enforcement_enabled() {
    let config = ControlsConfig {
        enabled: true,
        mode: TrustMode::Enforce,
        enforce_on_streaming: true,
    };
    let plan = plan_enforcement(&config, true);
    assert_eq!(plan.effective_mode, TrustMode::Enforce);
    assert!(plan.enforce_output);
    assert!(plan.context_failure_modes.is_empty());
}

/// Tests mode label parsing.
#[test]
fn test_mode_parsing() {
    assert_eq!(TrustMode::parse("Enforce"), Some(TrustMode::Enforce));
    assert_eq!(TrustMode::parse(" observe "), Some(TrustMode::Observe));
    assert_eq!(TrustMode::parse("bogus"), None);
}
