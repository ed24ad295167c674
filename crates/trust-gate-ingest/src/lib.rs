// trust-gate-ingest/src/lib.rs
// ============================================================================
// Module: Trust Gate Ingest Library
// Description: In-host event emitter for the evidence sidecar.
// Purpose: Buffer, hash, batch, and deliver turn events fail-open.
// Dependencies: jsonwebtoken, reqwest, trust-gate-core
// ============================================================================

//! ## Overview
//! Hosts embed this adapter to stream turn events toward the sidecar without
//! coupling request latency to ingestion: events are buffered in process,
//! canonically hashed, batched by size, and delivered with capped retries.
//! Failed batches are dropped with a warning (at-most-once from a single
//! emitter); at-least-once delivery requires external persistence.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod adapter;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use adapter::IngestAdapter;
pub use adapter::IngestError;
pub use adapter::IngestWarningSink;
pub use adapter::NoopWarningSink;
pub use adapter::SCHEMA_VERSION;
pub use adapter::StderrWarningSink;
pub use adapter::create_trace_id;
pub use adapter::default_common_fields;
