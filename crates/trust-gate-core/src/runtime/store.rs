// trust-gate-core/src/runtime/store.rs
// ============================================================================
// Module: In-Memory Trace Store
// Description: Mutex-guarded trace store for tests and embedded hosts.
// Purpose: Provide a default TraceStore without filesystem dependencies.
// Dependencies: crate::{core, interfaces}, serde_json
// ============================================================================

//! ## Overview
//! The in-memory store mirrors the filesystem store's record construction:
//! the same hashes, the same incident-derived event chain, the same
//! legal-hold delete refusal. It exists so the gate can be exercised without
//! touching disk.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::sync::Mutex;
use std::sync::PoisonError;

use serde_json::Value;

use crate::core::chain::ChainEvent;
use crate::interfaces::LegalHoldStore;
use crate::interfaces::StoreError;
use crate::interfaces::TraceRecord;
use crate::interfaces::TraceStore;
use crate::runtime::record::build_trace_record;

// ============================================================================
// SECTION: In-Memory Trace Store
// ============================================================================

/// In-memory trace store guarded by a single mutex.
#[derive(Debug, Default)]
pub struct InMemoryTraceStore {
    /// Stored records and chains keyed by trace id.
    entries: Mutex<BTreeMap<String, (TraceRecord, Vec<ChainEvent>)>>,
}

impl InMemoryTraceStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl TraceStore for InMemoryTraceStore {
    fn store(
        &self,
        trace_id: &str,
        response_payload: &Value,
        raw_context_minimal: &Value,
        replay_inputs: &Value,
    ) -> Result<TraceRecord, StoreError> {
        let (record, events) =
            build_trace_record(trace_id, response_payload, raw_context_minimal, replay_inputs)?;
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.insert(trace_id.to_string(), (record.clone(), events));
        Ok(record)
    }

    fn load(&self, trace_id: &str) -> Result<TraceRecord, StoreError> {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries
            .get(trace_id)
            .map(|(record, _)| record.clone())
            .ok_or_else(|| StoreError::NotFound(trace_id.to_string()))
    }

    fn load_events(&self, trace_id: &str) -> Result<Vec<ChainEvent>, StoreError> {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries
            .get(trace_id)
            .map(|(_, events)| events.clone())
            .ok_or_else(|| StoreError::NotFound(trace_id.to_string()))
    }

    fn delete(&self, trace_id: &str) -> Result<(), StoreError> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        let Some((record, _)) = entries.get(trace_id) else {
            return Ok(());
        };
        let held = record
            .retention
            .get("legal_hold")
            .and_then(Value::as_bool)
            .unwrap_or(false);
        if held {
            return Err(StoreError::LegalHold(trace_id.to_string()));
        }
        entries.remove(trace_id);
        Ok(())
    }
}

// ============================================================================
// SECTION: In-Memory Legal Hold Store
// ============================================================================

/// In-memory legal-hold store for tests and embedded hosts.
#[derive(Debug, Default)]
pub struct InMemoryLegalHoldStore {
    /// Unredacted copies keyed by trace id.
    entries: Mutex<BTreeMap<String, Value>>,
}

impl InMemoryLegalHoldStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the unredacted copy for a trace, if held.
    #[must_use]
    pub fn get(&self, trace_id: &str) -> Option<Value> {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.get(trace_id).cloned()
    }
}

impl LegalHoldStore for InMemoryLegalHoldStore {
    fn store_unredacted(
        &self,
        trace_id: &str,
        unredacted_answer: &str,
        unredacted_evidence: &Value,
        unredacted_narrative: &str,
    ) -> Result<(), StoreError> {
        let mut payload = serde_json::Map::new();
        payload.insert("trace_id".into(), Value::String(trace_id.to_string()));
        payload.insert(
            "unredacted_answer".into(),
            Value::String(unredacted_answer.to_string()),
        );
        payload.insert("unredacted_evidence".into(), unredacted_evidence.clone());
        payload.insert(
            "unredacted_narrative".into(),
            Value::String(unredacted_narrative.to_string()),
        );
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.insert(trace_id.to_string(), Value::Object(payload));
        Ok(())
    }
}
