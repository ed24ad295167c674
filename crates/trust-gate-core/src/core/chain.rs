// trust-gate-core/src/core/chain.rs
// ============================================================================
// Module: Trust Gate Event Hash Chain
// Description: Tamper-evident per-trace event log construction and validation.
// Purpose: Bind ordered trace events into a hash chain anchored at genesis.
// Dependencies: crate::core::hashing, serde, serde_json
// ============================================================================

//! ## Overview
//! Each trace carries an append-only event log organized as a hash chain:
//! events are assigned a dense 1-based `seq`, linked through `prev_hash`, and
//! hashed over the canonical JSON of the materialized event without its own
//! `hash` field. The chain anchors at a fixed genesis value so a verifier can
//! replay the whole log offline and detect any bit flip.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::core::hashing::HashError;
use crate::core::hashing::hash_canonical_json;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Genesis value for `prev_hash` of the first chain event.
pub const GENESIS_HASH: &str =
    "0000000000000000000000000000000000000000000000000000000000000000";

/// Version label recorded on trace records for the chain construction.
pub const EVENTS_HASH_CHAIN_VERSION: &str = "1.0.0";

// ============================================================================
// SECTION: Event Types
// ============================================================================

/// Unchained event input supplied by callers.
///
/// # Invariants
/// - `ts` must be an RFC 3339 UTC timestamp when provided.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventInput {
    /// Event timestamp; the chain builder substitutes the fallback when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ts: Option<String>,
    /// Stable event type label.
    pub event_type: String,
    /// Structured event payload.
    pub payload: Value,
}

/// Chained event with sequence, linkage, and content hash.
///
/// # Invariants
/// - `seq` is dense and 1-based within a trace.
/// - `prev_hash` equals the preceding event's `hash`, or genesis for seq 1.
/// - `hash` is the canonical hash of the event materialized without `hash`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainEvent {
    /// 1-based monotonic sequence number.
    pub seq: u64,
    /// RFC 3339 UTC event timestamp.
    pub ts: String,
    /// Stable event type label.
    pub event_type: String,
    /// Structured event payload.
    pub payload: Value,
    /// Hash of the preceding event, or genesis.
    pub prev_hash: String,
    /// Canonical hash of this event.
    pub hash: String,
}

/// Materialized event body hashed during chain build and validation.
#[derive(Debug, Serialize)]
struct ChainEventBody<'a> {
    /// 1-based monotonic sequence number.
    seq: u64,
    /// RFC 3339 UTC event timestamp.
    ts: &'a str,
    /// Stable event type label.
    event_type: &'a str,
    /// Structured event payload.
    payload: &'a Value,
    /// Hash of the preceding event, or genesis.
    prev_hash: &'a str,
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Errors raised while building or encoding hash chains.
#[derive(Debug, Error)]
pub enum ChainError {
    /// Canonical hashing of an event failed.
    #[error(transparent)]
    Hash(#[from] HashError),
    /// A JSONL line failed to decode into a chain event.
    #[error("invalid chain event line {line}: {reason}")]
    Decode {
        /// 1-based line number of the invalid entry.
        line: usize,
        /// Parse failure description.
        reason: String,
    },
}

// ============================================================================
// SECTION: Chain Build
// ============================================================================

/// Builds a hash chain from ordered event inputs.
///
/// Events without a timestamp receive `fallback_ts`.
///
/// # Errors
///
/// Returns [`ChainError::Hash`] when an event payload cannot be canonicalized.
pub fn build_chain(events: &[EventInput], fallback_ts: &str) -> Result<Vec<ChainEvent>, ChainError> {
    let mut chain = Vec::with_capacity(events.len());
    let mut prev_hash = GENESIS_HASH.to_string();

    for (index, event) in events.iter().enumerate() {
        let seq = index as u64 + 1;
        let ts = event.ts.clone().unwrap_or_else(|| fallback_ts.to_string());
        let body = ChainEventBody {
            seq,
            ts: &ts,
            event_type: &event.event_type,
            payload: &event.payload,
            prev_hash: &prev_hash,
        };
        let hash = hash_canonical_json(&body)?;
        chain.push(ChainEvent {
            seq,
            ts,
            event_type: event.event_type.clone(),
            payload: event.payload.clone(),
            prev_hash: prev_hash.clone(),
            hash: hash.clone(),
        });
        prev_hash = hash;
    }

    Ok(chain)
}

// ============================================================================
// SECTION: Chain Validation
// ============================================================================

/// Validates sequence density, linkage, and per-event hashes.
///
/// Returns false on any mismatch, including hash recomputation failures.
#[must_use]
pub fn validate_chain(events: &[ChainEvent]) -> bool {
    let mut prev_hash = GENESIS_HASH.to_string();
    let mut expected_seq = 1u64;

    for event in events {
        if event.seq != expected_seq || event.prev_hash != prev_hash {
            return false;
        }
        let body = ChainEventBody {
            seq: event.seq,
            ts: &event.ts,
            event_type: &event.event_type,
            payload: &event.payload,
            prev_hash: &event.prev_hash,
        };
        let Ok(expected_hash) = hash_canonical_json(&body) else {
            return false;
        };
        if event.hash != expected_hash {
            return false;
        }
        prev_hash = expected_hash;
        expected_seq = expected_seq.saturating_add(1);
    }

    true
}

// ============================================================================
// SECTION: JSONL Encoding
// ============================================================================

/// Encodes a chain as canonical JSONL with a trailing newline when non-empty.
///
/// # Errors
///
/// Returns [`ChainError::Hash`] when an event cannot be canonicalized.
pub fn encode_events_jsonl(events: &[ChainEvent]) -> Result<String, ChainError> {
    let mut out = String::new();
    for event in events {
        let bytes = crate::core::hashing::canonical_json_bytes(event)?;
        out.push_str(&String::from_utf8_lossy(&bytes));
        out.push('\n');
    }
    Ok(out)
}

/// Decodes JSONL text into chain events, skipping blank lines.
///
/// # Errors
///
/// Returns [`ChainError::Decode`] when a line is not a valid chain event.
pub fn decode_events_jsonl(text: &str) -> Result<Vec<ChainEvent>, ChainError> {
    let mut events = Vec::new();
    for (index, line) in text.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let event: ChainEvent = serde_json::from_str(line).map_err(|err| ChainError::Decode {
            line: index + 1,
            reason: err.to_string(),
        })?;
        events.push(event);
    }
    Ok(events)
}
