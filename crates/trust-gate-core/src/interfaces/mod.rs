// trust-gate-core/src/interfaces/mod.rs
// ============================================================================
// Module: Trust Gate Interfaces
// Description: Backend-agnostic interfaces for trace and legal-hold storage.
// Purpose: Define the storage surfaces used by the gate and exporter.
// Dependencies: crate::core, serde
// ============================================================================

//! ## Overview
//! Interfaces define how the gate persists traces without embedding a storage
//! backend. Implementations must be append-only at the record level: a trace
//! is written exactly once, events are chained at write time, and deletion is
//! refused under legal hold.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::core::chain::ChainEvent;

// ============================================================================
// SECTION: Trace Record
// ============================================================================

/// Persisted per-trace record.
///
/// # Invariants
/// - The three content hashes match their payloads under canonical JSON.
/// - `events_count` matches the length of the stored event chain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceRecord {
    /// Trace identifier.
    pub trace_id: String,
    /// Record creation timestamp.
    pub created_at: String,
    /// Retention metadata copied from the response.
    pub retention: Value,
    /// Full response contract payload.
    pub response: Value,
    /// Minimal request context.
    pub context: Value,
    /// Replay inputs for offline re-evaluation.
    pub replay_inputs: Value,
    /// Canonical hash of `response`.
    pub response_hash: String,
    /// Canonical hash of `context`.
    pub context_hash: String,
    /// Canonical hash of `replay_inputs`.
    pub replay_inputs_hash: String,
    /// Count of chained events stored alongside the record.
    pub events_count: u64,
    /// Hash-chain construction version.
    pub events_hash_chain_version: String,
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Errors raised by trace and legal-hold stores.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Trace was not found.
    #[error("trace not found: {0}")]
    NotFound(String),
    /// Deletion blocked by legal hold.
    #[error("deletion blocked by legal hold: {0}")]
    LegalHold(String),
    /// Underlying I/O failure.
    #[error("store io failure: {0}")]
    Io(String),
    /// Record serialization or decoding failure.
    #[error("store serialization failure: {0}")]
    Serialization(String),
    /// Stored artifact failed an integrity check.
    #[error("store integrity failure: {0}")]
    Corrupt(String),
}

// ============================================================================
// SECTION: Trace Store
// ============================================================================

/// Backend-agnostic trace store.
pub trait TraceStore: Send + Sync {
    /// Persists a trace record and its event chain exactly once.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when hashing, chaining, or writing fails.
    fn store(
        &self,
        trace_id: &str,
        response_payload: &Value,
        raw_context_minimal: &Value,
        replay_inputs: &Value,
    ) -> Result<TraceRecord, StoreError>;

    /// Loads a stored trace record.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] for unknown traces.
    fn load(&self, trace_id: &str) -> Result<TraceRecord, StoreError>;

    /// Loads the stored event chain for a trace.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] for unknown traces.
    fn load_events(&self, trace_id: &str) -> Result<Vec<ChainEvent>, StoreError>;

    /// Deletes a trace unless legal hold blocks it.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::LegalHold`] when the trace is held.
    fn delete(&self, trace_id: &str) -> Result<(), StoreError>;
}

// ============================================================================
// SECTION: Legal Hold Store
// ============================================================================

/// Store for unredacted legal-hold copies.
pub trait LegalHoldStore: Send + Sync {
    /// Persists the unredacted artifacts for a held trace.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when writing fails.
    fn store_unredacted(
        &self,
        trace_id: &str,
        unredacted_answer: &str,
        unredacted_evidence: &Value,
        unredacted_narrative: &str,
    ) -> Result<(), StoreError>;
}
