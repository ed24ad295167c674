// trust-gate-config/src/lib.rs
// ============================================================================
// Module: Trust Gate Config Library
// Description: Validated configuration model for all trust-gate components.
// Purpose: Keep environment parsing and fail-closed validation in one place.
// Dependencies: trust-gate-contract
// ============================================================================

//! ## Overview
//! Typed settings for the gate controls, trace store, JWT verification,
//! ingest adapter, and sidecar service, parsed from a plain string map so
//! hosts own the actual environment access.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod config;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use config::ConfigError;
pub use config::DEFAULT_INGEST_BATCH_SIZE;
pub use config::DEFAULT_INGEST_MAX_RETRIES;
pub use config::IngestSettings;
pub use config::JwtSettings;
pub use config::SidecarSettings;
pub use config::StoreBackend;
pub use config::StoreSettings;
pub use config::TrustGateConfig;
