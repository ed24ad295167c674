// trust-gate-core/src/core/kill_switch.rs
// ============================================================================
// Module: Trust Gate Kill Switch
// Description: Mutex-guarded global halt state with scoped modes.
// Purpose: Let operators halt responses by system, domain, or claim type.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! The kill switch is a small state struct guarded by a mutex and injected at
//! gate construction; there is no process-global. Once a halt mode is set it
//! stays set until an operator clears it, and concurrent gate invocations
//! always observe the latest write.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Mutex;
use std::sync::PoisonError;

use serde::Deserialize;
use serde::Serialize;

use crate::core::claims::ClaimType;

// ============================================================================
// SECTION: State Types
// ============================================================================

/// Halt mode granularity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum KillSwitchMode {
    /// Halt every response.
    SystemHalt,
    /// Halt responses for a matching domain.
    DomainHalt,
    /// Halt responses containing a matching claim type.
    ClaimTypeHalt,
}

/// Kill switch state snapshot.
///
/// # Invariants
/// - `mode == None` means no halt is active and the qualifiers are unset.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KillSwitchState {
    /// Active halt mode, if any.
    pub mode: Option<KillSwitchMode>,
    /// Domain qualifier for domain halts.
    pub domain: Option<String>,
    /// Claim-type qualifier for claim-type halts.
    pub claim_type: Option<ClaimType>,
    /// Operator-supplied activation reason.
    pub reason: Option<String>,
}

// ============================================================================
// SECTION: Kill Switch
// ============================================================================

/// Mutex-guarded kill switch shared across gate invocations.
#[derive(Debug, Default)]
pub struct KillSwitch {
    /// Guarded halt state.
    state: Mutex<KillSwitchState>,
}

impl KillSwitch {
    /// Creates a cleared kill switch.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Activates a halt mode with qualifiers.
    pub fn activate(
        &self,
        mode: KillSwitchMode,
        reason: &str,
        domain: Option<String>,
        claim_type: Option<ClaimType>,
    ) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        *state = KillSwitchState {
            mode: Some(mode),
            domain,
            claim_type,
            reason: Some(reason.to_string()),
        };
    }

    /// Clears any active halt.
    pub fn clear(&self) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        *state = KillSwitchState::default();
    }

    /// Returns a copy of the current state.
    #[must_use]
    pub fn snapshot(&self) -> KillSwitchState {
        self.state.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Returns the halt reason when the switch halts this turn.
    #[must_use]
    pub fn should_halt(&self, domain: &str, claim_types: &[ClaimType]) -> Option<String> {
        let state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        match state.mode {
            Some(KillSwitchMode::SystemHalt) => Some(
                state.reason.clone().unwrap_or_else(|| "system halt active".to_string()),
            ),
            Some(KillSwitchMode::DomainHalt) => {
                if state.domain.as_deref().is_some_and(|halted| halted == domain) {
                    Some(state.reason.clone().unwrap_or_else(|| "domain halt active".to_string()))
                } else {
                    None
                }
            }
            Some(KillSwitchMode::ClaimTypeHalt) => {
                if state.claim_type.is_some_and(|halted| claim_types.contains(&halted)) {
                    Some(
                        state
                            .reason
                            .clone()
                            .unwrap_or_else(|| "claim type halt active".to_string()),
                    )
                } else {
                    None
                }
            }
            None => None,
        }
    }
}
