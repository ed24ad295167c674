// trust-gate-sidecar/src/lib.rs
// ============================================================================
// Module: Trust Gate Sidecar Library
// Description: Evidence sidecar service: ingest, reads, export, retention.
// Purpose: Persist turn-event streams and serve audit packs over HTTP.
// Dependencies: axum, rusqlite, jsonwebtoken, trust-gate-core
// ============================================================================

//! ## Overview
//! The sidecar receives batched turn events from host adapters over
//! JWT-authenticated endpoints, persists them into a relational store with
//! canonical payload-hash verification, exposes per-trace summaries, builds
//! audit packs on demand, and runs a retention sweep that respects legal
//! holds.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod audit;
pub mod auth;
pub mod error;
pub mod pack;
pub mod server;
pub mod store;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use audit::NoopAuditSink;
pub use audit::RequestAuditEvent;
pub use audit::RequestAuditSink;
pub use audit::StderrAuditSink;
pub use auth::JwtVerifier;
pub use auth::SCOPE_ADMIN;
pub use auth::SCOPE_EXPORT;
pub use auth::SCOPE_INGEST;
pub use auth::SCOPE_READ;
pub use auth::TokenClaims;
pub use error::ApiError;
pub use pack::build_audit_pack;
pub use pack::verify_chain_jsonl;
pub use server::AppState;
pub use server::ServerError;
pub use server::router;
pub use server::serve;
pub use store::AuditPackRecord;
pub use store::EventRow;
pub use store::RetentionReport;
pub use store::SidecarStore;
pub use store::SidecarStoreError;
pub use store::TraceSummary;
