// trust-gate-sidecar/src/pack.rs
// ============================================================================
// Module: Sidecar Audit Pack Builder
// Description: On-demand archive assembly from ingested event streams.
// Purpose: Package per-trace events, citations, and integrity chain into zip.
// Dependencies: trust-gate-core, serde_json, zip
// ============================================================================

//! ## Overview
//! Sidecar packs are built from the relational event stream rather than a
//! gate trace record: the archive groups events by concern (retrieval, tools,
//! citations, policy), binds every payload hash into an integrity manifest,
//! and derives a hash chain over the ordered event rows so the archive is
//! tamper-evident on its own.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs;
use std::io::Write;
use std::path::Path;
use std::path::PathBuf;

use serde_json::Map;
use serde_json::Value;
use thiserror::Error;
use zip::CompressionMethod;
use zip::ZipWriter;
use zip::write::FileOptions;

use trust_gate_core::GENESIS_HASH;
use trust_gate_core::PackId;
use trust_gate_core::hashing::HashError;
use trust_gate_core::hashing::canonical_json_bytes;
use trust_gate_core::hashing::hash_bytes;

use crate::store::EventRow;
use crate::store::SidecarStore;
use crate::store::SidecarStoreError;
use crate::store::TraceSummary;

// ============================================================================
// SECTION: Archive Names
// ============================================================================

/// Archive name for the response contract snapshot.
const CONTRACT: &str = "contract.json";
/// Archive name for the full event log.
const EVIDENCE_EVENTS: &str = "evidence/events.jsonl";
/// Archive name for retrieval events.
const RETRIEVAL_EVENTS: &str = "retrieval/retrieval_events.json";
/// Archive name for tool events.
const TOOL_EVENTS: &str = "tools/tool_events.json";
/// Archive name for resolved citations.
const CITATIONS: &str = "citations.json";
/// Archive name for policy decisions.
const POLICY: &str = "policy.json";
/// Archive name for the integrity manifest.
const INTEGRITY_MANIFEST: &str = "integrity/manifest.json";
/// Archive name for the integrity chain.
const INTEGRITY_CHAIN: &str = "integrity/chain.jsonl";

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Errors raised while building a sidecar pack.
#[derive(Debug, Error)]
pub enum PackError {
    /// Store reads failed.
    #[error(transparent)]
    Store(#[from] SidecarStoreError),
    /// Canonical serialization failed.
    #[error(transparent)]
    Hash(#[from] HashError),
    /// Filesystem failure while writing the archive.
    #[error("pack io failure: {0}")]
    Io(String),
    /// Zip assembly failure.
    #[error("pack zip failure: {0}")]
    Zip(String),
}

// ============================================================================
// SECTION: Pack Build
// ============================================================================

/// Builds the audit pack for a trace and returns the archive path.
///
/// # Errors
///
/// Returns [`PackError`] when the trace is unknown or packaging fails.
pub fn build_audit_pack(
    trace_id: &str,
    store: &SidecarStore,
    packs_dir: &Path,
    pack_id: &PackId,
) -> Result<PathBuf, PackError> {
    fs::create_dir_all(packs_dir).map_err(|err| PackError::Io(err.to_string()))?;
    let zip_path = packs_dir.join(format!("{}.zip", pack_id.as_str()));

    let summary = store.trace_summary(trace_id)?;
    let events = store.events_for_trace(trace_id)?;

    let file = fs::File::create(&zip_path).map_err(|err| PackError::Io(err.to_string()))?;
    let mut writer = ZipWriter::new(file);
    let options = FileOptions::default().compression_method(CompressionMethod::Deflated);

    write_entry(
        &mut writer,
        options,
        CONTRACT,
        &pretty(&contract_snapshot(trace_id, &summary, &events))?,
    )?;
    write_entry(&mut writer, options, EVIDENCE_EVENTS, events_jsonl(&events)?.as_bytes())?;

    let retrieval: Vec<&EventRow> =
        events.iter().filter(|event| event.event_type == "retrieval_batch").collect();
    write_entry(&mut writer, options, RETRIEVAL_EVENTS, &pretty(&rows_value(&retrieval)?)?)?;

    let tools: Vec<&EventRow> = events
        .iter()
        .filter(|event| matches!(event.event_type.as_str(), "tool_call" | "tool_result"))
        .collect();
    write_entry(&mut writer, options, TOOL_EVENTS, &pretty(&rows_value(&tools)?)?)?;

    write_entry(&mut writer, options, CITATIONS, &pretty(&flattened_citations(&events))?)?;

    let policy: Vec<&EventRow> =
        events.iter().filter(|event| event.event_type == "policy_decision").collect();
    write_entry(&mut writer, options, POLICY, &pretty(&rows_value(&policy)?)?)?;

    write_entry(&mut writer, options, INTEGRITY_MANIFEST, &pretty(&integrity_manifest(&events))?)?;
    write_entry(&mut writer, options, INTEGRITY_CHAIN, build_chain_jsonl(&events)?.as_bytes())?;

    writer.finish().map_err(|err| PackError::Zip(err.to_string()))?;
    Ok(zip_path)
}

/// Writes one archive entry.
fn write_entry(
    writer: &mut ZipWriter<fs::File>,
    options: FileOptions,
    name: &str,
    bytes: &[u8],
) -> Result<(), PackError> {
    writer
        .start_file(name.to_string(), options)
        .map_err(|err| PackError::Zip(err.to_string()))?;
    writer.write_all(bytes).map_err(|err| PackError::Io(err.to_string()))
}

// ============================================================================
// SECTION: Artifact Assembly
// ============================================================================

/// Serializes a value to pretty JSON bytes.
fn pretty(value: &Value) -> Result<Vec<u8>, PackError> {
    serde_json::to_vec_pretty(value).map_err(|err| PackError::Io(err.to_string()))
}

/// Serializes event rows into a JSON array value.
fn rows_value(rows: &[&EventRow]) -> Result<Value, PackError> {
    serde_json::to_value(rows).map_err(|err| PackError::Io(err.to_string()))
}

/// Builds the contract snapshot from a `contract` event or a placeholder.
fn contract_snapshot(trace_id: &str, summary: &TraceSummary, events: &[EventRow]) -> Value {
    if let Some(event) = events.iter().rev().find(|event| event.event_type == "contract") {
        return event.payload.clone();
    }
    let mut contract = Map::new();
    contract.insert("trace_id".into(), Value::String(trace_id.to_string()));
    contract.insert("answer".into(), Value::String(String::new()));
    contract.insert("policy_summary".into(), Value::String(String::new()));
    contract.insert(
        "evidence_status".into(),
        Value::String(summary.evidence_status.clone()),
    );
    contract.insert(
        "warnings".into(),
        Value::Array(vec![Value::String(
            "placeholder contract: host contract event unavailable".to_string(),
        )]),
    );
    Value::Object(contract)
}

/// Encodes every event row as canonical JSONL.
fn events_jsonl(events: &[EventRow]) -> Result<String, PackError> {
    let mut out = String::new();
    for event in events {
        let bytes = canonical_json_bytes(event)?;
        out.push_str(&String::from_utf8_lossy(&bytes));
        out.push('\n');
    }
    Ok(out)
}

/// Flattens citation lists from `citations_resolved` payloads.
fn flattened_citations(events: &[EventRow]) -> Value {
    let mut citations = Vec::new();
    for event in events {
        if event.event_type != "citations_resolved" {
            continue;
        }
        if let Some(list) = event.payload.get("citations").and_then(Value::as_array) {
            citations.extend(list.iter().cloned());
        }
    }
    Value::Array(citations)
}

/// Builds the integrity manifest over event payload hashes.
fn integrity_manifest(events: &[EventRow]) -> Value {
    let entries: Vec<Value> = events
        .iter()
        .map(|event| {
            let mut entry = Map::new();
            entry.insert("id".into(), Value::from(event.id));
            entry.insert("type".into(), Value::String(event.event_type.clone()));
            entry.insert("ts".into(), Value::String(event.ts.clone()));
            entry.insert("payload_hash".into(), Value::String(event.payload_hash.clone()));
            Value::Object(entry)
        })
        .collect();

    let mut manifest = Map::new();
    manifest.insert("manifest_version".into(), Value::String("1.0.0".to_string()));
    manifest.insert("event_count".into(), Value::from(events.len()));
    manifest.insert("events".into(), Value::Array(entries));
    Value::Object(manifest)
}

// ============================================================================
// SECTION: Integrity Chain
// ============================================================================

/// Chain line materialized for hashing, without its own hash.
#[derive(serde::Serialize)]
struct ChainLineBody<'a> {
    /// 1-based chain index.
    index: usize,
    /// Source event row identifier.
    event_id: i64,
    /// Event type label.
    #[serde(rename = "type")]
    event_type: &'a str,
    /// Event timestamp.
    ts: &'a str,
    /// Canonical payload hash.
    payload_hash: &'a str,
    /// Hash of the preceding line, or genesis.
    prev_hash: &'a str,
}

/// Builds the hash-chain JSONL over ordered event rows.
fn build_chain_jsonl(events: &[EventRow]) -> Result<String, PackError> {
    let mut prev_hash = GENESIS_HASH.to_string();
    let mut out = String::new();

    for (index, event) in events.iter().enumerate() {
        let body = ChainLineBody {
            index: index + 1,
            event_id: event.id,
            event_type: &event.event_type,
            ts: &event.ts,
            payload_hash: &event.payload_hash,
            prev_hash: &prev_hash,
        };
        let body_bytes = canonical_json_bytes(&body)?;
        let line_hash = hash_bytes(&body_bytes);

        let mut line: Map<String, Value> = serde_json::from_slice(&body_bytes)
            .map_err(|err| PackError::Io(err.to_string()))?;
        line.insert("hash".into(), Value::String(line_hash.clone()));
        let line_bytes = canonical_json_bytes(&Value::Object(line))?;
        out.push_str(&String::from_utf8_lossy(&line_bytes));
        out.push('\n');

        prev_hash = line_hash;
    }

    Ok(out)
}

/// Verifies a chain JSONL produced by [`build_chain_jsonl`].
#[must_use]
pub fn verify_chain_jsonl(chain: &str) -> bool {
    let mut prev_hash = GENESIS_HASH.to_string();
    for (index, line) in chain.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let Ok(object) = serde_json::from_str::<Map<String, Value>>(line) else {
            return false;
        };
        if object.get("index").and_then(Value::as_u64) != Some(index as u64 + 1) {
            return false;
        }
        if object.get("prev_hash").and_then(Value::as_str) != Some(prev_hash.as_str()) {
            return false;
        }
        let mut body = object.clone();
        body.remove("hash");
        let Ok(body_bytes) = canonical_json_bytes(&Value::Object(body)) else {
            return false;
        };
        let expected = hash_bytes(&body_bytes);
        if object.get("hash").and_then(Value::as_str) != Some(expected.as_str()) {
            return false;
        }
        prev_hash = expected;
    }
    true
}
