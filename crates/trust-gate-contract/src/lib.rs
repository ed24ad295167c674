// trust-gate-contract/src/lib.rs
// ============================================================================
// Module: Trust Gate Contract Library
// Description: Host-facing boundary canary and integration controls.
// Purpose: Keep the host integration surface separate from the core pipeline.
// Dependencies: trust-gate-core
// ============================================================================

//! ## Overview
//! This crate is the seam between a chat host and the gate: the boundary
//! assertions that refuse raw model output, the safe fallback contract, and
//! the per-request trust-mode controls that decide whether the gate's
//! contract replaces the host's native response.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod boundary;
pub mod controls;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use boundary::BYPASS_FAILURE_MODE;
pub use boundary::BoundaryError;
pub use boundary::assert_no_bypass_inputs;
pub use boundary::assert_no_raw_output;
pub use boundary::guarded_gate_response;
pub use boundary::safe_bypass_contract;
pub use controls::ControlsConfig;
pub use controls::EnforcementPlan;
pub use controls::STREAMING_ENFORCEMENT_BYPASS_MODE;
pub use controls::TrustMode;
pub use controls::plan_enforcement;
