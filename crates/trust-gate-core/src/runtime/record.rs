// trust-gate-core/src/runtime/record.rs
// ============================================================================
// Module: Trace Record Construction
// Description: Shared trace-record and event-chain assembly for stores.
// Purpose: Keep every TraceStore backend hashing and chaining identically.
// Dependencies: crate::{core, interfaces}, serde_json
// ============================================================================

//! ## Overview
//! Stores differ only in where bytes land. Record construction is shared so
//! content hashes, event derivation, and chain building cannot drift between
//! backends: one event per incident on the decision record, or a single
//! `trace_created` event when the turn raised none.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde_json::Value;

use crate::core::chain::ChainEvent;
use crate::core::chain::EVENTS_HASH_CHAIN_VERSION;
use crate::core::chain::EventInput;
use crate::core::chain::build_chain;
use crate::core::hashing::hash_canonical_json;
use crate::core::retention::RetentionMetadata;
use crate::core::time::UtcTime;
use crate::interfaces::StoreError;
use crate::interfaces::TraceRecord;

// ============================================================================
// SECTION: Record Assembly
// ============================================================================

/// Builds the persistable trace record and its event chain.
///
/// # Errors
///
/// Returns [`StoreError::Serialization`] when hashing or chaining fails.
pub fn build_trace_record(
    trace_id: &str,
    response_payload: &Value,
    raw_context_minimal: &Value,
    replay_inputs: &Value,
) -> Result<(TraceRecord, Vec<ChainEvent>), StoreError> {
    let now = UtcTime::now();

    let retention = response_payload
        .get("decision_record")
        .and_then(|record| record.get("retention"))
        .filter(|value| value.is_object())
        .cloned()
        .map_or_else(|| default_retention(now), Ok)?;

    let events = derive_events(trace_id, response_payload);
    let chain = build_chain(&events, &now.rfc3339())
        .map_err(|err| StoreError::Serialization(err.to_string()))?;

    let record = TraceRecord {
        trace_id: trace_id.to_string(),
        created_at: now.rfc3339(),
        retention,
        response: response_payload.clone(),
        context: raw_context_minimal.clone(),
        replay_inputs: replay_inputs.clone(),
        response_hash: hash_of(response_payload)?,
        context_hash: hash_of(raw_context_minimal)?,
        replay_inputs_hash: hash_of(replay_inputs)?,
        events_count: chain.len() as u64,
        events_hash_chain_version: EVENTS_HASH_CHAIN_VERSION.to_string(),
    };

    Ok((record, chain))
}

/// Canonically hashes a stored payload.
fn hash_of(value: &Value) -> Result<String, StoreError> {
    hash_canonical_json(value).map_err(|err| StoreError::Serialization(err.to_string()))
}

/// Builds the default retention block for records without one.
fn default_retention(now: UtcTime) -> Result<Value, StoreError> {
    serde_json::to_value(RetentionMetadata::from_context(None, None, false, now))
        .map_err(|err| StoreError::Serialization(err.to_string()))
}

/// Derives chain-event inputs from the response's incidents.
fn derive_events(trace_id: &str, response_payload: &Value) -> Vec<EventInput> {
    let incidents = response_payload
        .get("decision_record")
        .and_then(|record| record.get("incidents"))
        .and_then(Value::as_array);

    match incidents {
        Some(list) if !list.is_empty() => list
            .iter()
            .map(|incident| EventInput {
                ts: None,
                event_type: "incident".to_string(),
                payload: incident.clone(),
            })
            .collect(),
        _ => vec![EventInput {
            ts: None,
            event_type: "trace_created".to_string(),
            payload: serde_json::json!({ "trace_id": trace_id }),
        }],
    }
}
