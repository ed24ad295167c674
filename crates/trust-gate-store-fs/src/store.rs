// trust-gate-store-fs/src/store.rs
// ============================================================================
// Module: Filesystem Trace Store
// Description: Durable TraceStore writing per-trace JSON and event JSONL.
// Purpose: Persist trace records with hash-chained event logs on disk.
// Dependencies: trust-gate-core, serde_json
// ============================================================================

//! ## Overview
//! Each trace lands as two artifacts under the store directory:
//! `<trace_id>.json` holding the record (payloads plus content hashes) and
//! `<trace_id>.events.jsonl` holding the hash-chained event log. Writes use
//! create-or-replace semantics; records are written exactly once per trace.
//! Deletion honors legal hold and fails closed.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs;
use std::path::Path;
use std::path::PathBuf;

use serde_json::Value;

use trust_gate_core::StoreError;
use trust_gate_core::TraceRecord;
use trust_gate_core::TraceStore;
use trust_gate_core::chain::ChainEvent;
use trust_gate_core::chain::decode_events_jsonl;
use trust_gate_core::chain::encode_events_jsonl;
use trust_gate_core::interfaces::LegalHoldStore;
use trust_gate_core::runtime::build_trace_record;

// ============================================================================
// SECTION: Trace File Store
// ============================================================================

/// Filesystem-backed trace store.
#[derive(Debug, Clone)]
pub struct TraceFileStore {
    /// Directory receiving trace artifacts.
    base_dir: PathBuf,
}

impl TraceFileStore {
    /// Creates a store rooted at the given directory, creating it if needed.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Io`] when the directory cannot be created.
    pub fn new(base_dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let base_dir = base_dir.into();
        fs::create_dir_all(&base_dir).map_err(|err| StoreError::Io(err.to_string()))?;
        Ok(Self {
            base_dir,
        })
    }

    /// Returns the store's base directory.
    #[must_use]
    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Returns the record path for a trace.
    fn record_path(&self, trace_id: &str) -> PathBuf {
        self.base_dir.join(format!("{trace_id}.json"))
    }

    /// Returns the event-log path for a trace.
    fn events_path(&self, trace_id: &str) -> PathBuf {
        self.base_dir.join(format!("{trace_id}.events.jsonl"))
    }

    /// Reads and decodes a stored record.
    fn read_record(&self, trace_id: &str) -> Result<TraceRecord, StoreError> {
        let path = self.record_path(trace_id);
        if !path.exists() {
            return Err(StoreError::NotFound(trace_id.to_string()));
        }
        let text = fs::read_to_string(&path).map_err(|err| StoreError::Io(err.to_string()))?;
        serde_json::from_str(&text).map_err(|err| StoreError::Serialization(err.to_string()))
    }
}

impl TraceStore for TraceFileStore {
    fn store(
        &self,
        trace_id: &str,
        response_payload: &Value,
        raw_context_minimal: &Value,
        replay_inputs: &Value,
    ) -> Result<TraceRecord, StoreError> {
        let (record, events) =
            build_trace_record(trace_id, response_payload, raw_context_minimal, replay_inputs)?;

        let record_text = serde_json::to_string_pretty(&record)
            .map_err(|err| StoreError::Serialization(err.to_string()))?;
        fs::write(self.record_path(trace_id), record_text)
            .map_err(|err| StoreError::Io(err.to_string()))?;

        let events_text = encode_events_jsonl(&events)
            .map_err(|err| StoreError::Serialization(err.to_string()))?;
        fs::write(self.events_path(trace_id), events_text)
            .map_err(|err| StoreError::Io(err.to_string()))?;

        Ok(record)
    }

    fn load(&self, trace_id: &str) -> Result<TraceRecord, StoreError> {
        self.read_record(trace_id)
    }

    fn load_events(&self, trace_id: &str) -> Result<Vec<ChainEvent>, StoreError> {
        let path = self.events_path(trace_id);
        if !path.exists() {
            return Err(StoreError::NotFound(trace_id.to_string()));
        }
        let text = fs::read_to_string(&path).map_err(|err| StoreError::Io(err.to_string()))?;
        decode_events_jsonl(&text).map_err(|err| StoreError::Corrupt(err.to_string()))
    }

    fn delete(&self, trace_id: &str) -> Result<(), StoreError> {
        let record_path = self.record_path(trace_id);
        if !record_path.exists() {
            return Ok(());
        }
        let record = self.read_record(trace_id)?;
        let held = record
            .retention
            .get("legal_hold")
            .and_then(Value::as_bool)
            .unwrap_or(false);
        if held {
            return Err(StoreError::LegalHold(trace_id.to_string()));
        }
        fs::remove_file(&record_path).map_err(|err| StoreError::Io(err.to_string()))?;
        let events_path = self.events_path(trace_id);
        if events_path.exists() {
            fs::remove_file(&events_path).map_err(|err| StoreError::Io(err.to_string()))?;
        }
        Ok(())
    }
}

// ============================================================================
// SECTION: Legal Hold File Store
// ============================================================================

/// Filesystem store for unredacted legal-hold copies.
#[derive(Debug, Clone)]
pub struct LegalHoldFileStore {
    /// Directory receiving legal-hold artifacts.
    base_dir: PathBuf,
}

impl LegalHoldFileStore {
    /// Creates a store rooted at the given directory, creating it if needed.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Io`] when the directory cannot be created.
    pub fn new(base_dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let base_dir = base_dir.into();
        fs::create_dir_all(&base_dir).map_err(|err| StoreError::Io(err.to_string()))?;
        Ok(Self {
            base_dir,
        })
    }

    /// Returns the artifact path for a held trace.
    fn hold_path(&self, trace_id: &str) -> PathBuf {
        self.base_dir.join(format!("{trace_id}.legal_hold.json"))
    }

    /// Loads the unredacted copy for a held trace.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] when no copy exists.
    pub fn load(&self, trace_id: &str) -> Result<Value, StoreError> {
        let path = self.hold_path(trace_id);
        if !path.exists() {
            return Err(StoreError::NotFound(trace_id.to_string()));
        }
        let text = fs::read_to_string(&path).map_err(|err| StoreError::Io(err.to_string()))?;
        serde_json::from_str(&text).map_err(|err| StoreError::Serialization(err.to_string()))
    }
}

impl LegalHoldStore for LegalHoldFileStore {
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
        let text = serde_json::to_string_pretty(&Value::Object(payload))
            .map_err(|err| StoreError::Serialization(err.to_string()))?;
        fs::write(self.hold_path(trace_id), text)
            .map_err(|err| StoreError::Io(err.to_string()))
    }
}
