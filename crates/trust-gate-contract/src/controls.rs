// trust-gate-contract/src/controls.rs
// ============================================================================
// Module: Integration Controls
// Description: Trust-mode resolution and streaming enforcement policy.
// Purpose: Decide per-request whether the gate's contract replaces output.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! The host integration layer consults these controls before every turn.
//! Enforce mode on a streaming request downgrades to observe unless streaming
//! enforcement is explicitly enabled; the downgrade is recorded as a failure
//! mode so offline audit can see the native response went out unenforced.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;

// ============================================================================
// SECTION: Trust Mode
// ============================================================================

/// Failure mode recorded when streaming bypasses enforcement.
pub const STREAMING_ENFORCEMENT_BYPASS_MODE: &str = "streaming_enforcement_bypassed";

/// Trust layer operating mode.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrustMode {
    /// Trust layer disabled.
    #[default]
    Off,
    /// Gate runs and records; the host's native response is returned.
    Observe,
    /// Gate output replaces the host's native response.
    Enforce,
}

impl TrustMode {
    /// Parses a raw mode label, case-insensitively.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "off" => Some(Self::Off),
            "observe" => Some(Self::Observe),
            "enforce" => Some(Self::Enforce),
            _ => None,
        }
    }

    /// Returns the canonical lowercase label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Off => "off",
            Self::Observe => "observe",
            Self::Enforce => "enforce",
        }
    }
}

// ============================================================================
// SECTION: Controls Config
// ============================================================================

/// Integration controls configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControlsConfig {
    /// Master enable flag; off disables the trust layer entirely.
    pub enabled: bool,
    /// Configured trust mode.
    pub mode: TrustMode,
    /// Allow enforcement on streaming requests.
    pub enforce_on_streaming: bool,
}

impl ControlsConfig {
    /// Returns the effective mode with the enable flag applied.
    #[must_use]
    pub const fn effective_mode(&self) -> TrustMode {
        if self.enabled { self.mode } else { TrustMode::Off }
    }
}

// ============================================================================
// SECTION: Enforcement Plan
// ============================================================================

/// Per-request enforcement decision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnforcementPlan {
    /// Mode after streaming downgrade rules.
    pub effective_mode: TrustMode,
    /// True when the gate contract replaces the host's native response.
    pub enforce_output: bool,
    /// Failure modes the integration layer must inject into the gate context.
    pub context_failure_modes: Vec<String>,
    /// Reason recorded when enforcement was bypassed.
    pub bypass_reason: Option<String>,
}

/// Resolves the enforcement plan for one request.
#[must_use]
pub fn plan_enforcement(config: &ControlsConfig, stream_requested: bool) -> EnforcementPlan {
    let mode = config.effective_mode();
    if mode == TrustMode::Off {
        return EnforcementPlan {
            effective_mode: TrustMode::Off,
            enforce_output: false,
            context_failure_modes: Vec::new(),
            bypass_reason: None,
        };
    }

    let downgrade = stream_requested
        && mode == TrustMode::Enforce
        && !config.enforce_on_streaming;

    if downgrade {
        return EnforcementPlan {
            effective_mode: TrustMode::Observe,
            enforce_output: false,
            context_failure_modes: vec![STREAMING_ENFORCEMENT_BYPASS_MODE.to_string()],
            bypass_reason: Some("streaming_enforce_disabled".to_string()),
        };
    }

    EnforcementPlan {
        effective_mode: mode,
        enforce_output: mode == TrustMode::Enforce,
        context_failure_modes: Vec::new(),
        bypass_reason: None,
    }
}
