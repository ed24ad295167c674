// trust-gate-audit/src/exporter.rs
// ============================================================================
// Module: Audit Pack Exporter
// Description: Hash re-verification, artifact assembly, narrative, and zip.
// Purpose: Produce tamper-evident offline audit packs for stored traces.
// Dependencies: trust-gate-core, serde_json, zip
// ============================================================================

//! ## Overview
//! Export re-verifies everything before a single byte is packaged: the trace
//! identifier, the three content hashes, and the event hash chain. Artifacts
//! are written to a per-trace staging directory, individually hashed, bound
//! into a manifest together with the redacted chain-of-custody narrative, and
//! zipped with DEFLATE. A partial crash leaves recoverable intermediates but
//! never corrupts a previously exported pack.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;

use serde_json::Map;
use serde_json::Value;
use thiserror::Error;
use zip::CompressionMethod;
use zip::ZipWriter;
use zip::write::FileOptions;

use trust_gate_core::LegalHoldStore;
use trust_gate_core::StoreError;
use trust_gate_core::TraceStore;
use trust_gate_core::active_risks;
use trust_gate_core::active_system_claims;
use trust_gate_core::chain::encode_events_jsonl;
use trust_gate_core::chain::validate_chain;
use trust_gate_core::hashing::AlgoVersions;
use trust_gate_core::hashing::hash_bytes;
use trust_gate_core::hashing::hash_canonical_json;
use trust_gate_core::policy_change_log;
use trust_gate_core::policy_definitions;
use trust_gate_core::redact_text;
use trust_gate_core::time::UtcTime;

// ============================================================================
// SECTION: Artifact Names
// ============================================================================

/// Archive name for the full response payload.
const FINAL_RESPONSE: &str = "final_response.json";
/// Archive name for the decision record.
const DECISION_RECORD: &str = "decision_record.json";
/// Archive name for the evidence sources.
const EVIDENCE_SOURCES: &str = "evidence_sources.json";
/// Archive name for retrieval metadata.
const RETRIEVAL_METADATA: &str = "retrieval_metadata.json";
/// Archive name for policy evaluation results.
const POLICY_RESULTS: &str = "policy_evaluation_results.json";
/// Archive name for incident events.
const INCIDENT_EVENTS: &str = "incident_events.json";
/// Archive name for the minimal request context.
const RAW_CONTEXT: &str = "raw_context_minimal.json";
/// Archive name for retention metadata.
const RETENTION_METADATA: &str = "retention_metadata.json";
/// Archive name for replay inputs.
const REPLAY_INPUTS: &str = "replay_inputs.json";
/// Archive name for the system-claims snapshot.
const SYSTEM_CLAIMS_SNAPSHOT: &str = "system_claims_snapshot.json";
/// Archive name for the risk-register snapshot.
const RISK_REGISTER_SNAPSHOT: &str = "risk_register_snapshot.json";
/// Archive name for the jurisdiction-compliance block.
const JURISDICTION_COMPLIANCE: &str = "jurisdiction_compliance.json";
/// Archive name for the policy-registry snapshot.
const POLICY_REGISTRY_SNAPSHOT: &str = "policy_registry_snapshot.json";
/// Archive name for the attestation artifact.
const ATTESTATION_ARTIFACT: &str = "attestation_artifact.json";
/// Archive name for the redacted narrative.
const CHAIN_OF_CUSTODY: &str = "chain_of_custody.md";
/// Archive name for the event log.
const EVENTS_JSONL: &str = "events.jsonl";
/// Archive name for the chain-summary artifact.
const HASH_CHAIN_SUMMARY: &str = "hash_chain.json";
/// Archive name for the integrity chain copy.
const INTEGRITY_CHAIN: &str = "integrity/chain.jsonl";
/// Archive name for the manifest.
const MANIFEST: &str = "manifest.json";

/// Test commands attested in the pack.
const TESTS_EXECUTED: [&str; 1] = ["cargo test --workspace"];

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Errors raised during audit-pack export. Any failure aborts the export.
#[derive(Debug, Error)]
pub enum ExportError {
    /// Trace loading failed.
    #[error(transparent)]
    Store(#[from] StoreError),
    /// Stored record's trace identifier does not match the request.
    #[error("trace id mismatch in stored record")]
    TraceIdMismatch,
    /// A stored content hash does not match its payload.
    #[error("{field} hash mismatch in stored record")]
    HashMismatch {
        /// Name of the mismatching record field.
        field: &'static str,
    },
    /// Stored event log failed hash chain validation.
    #[error("hash chain validation failed for stored events")]
    HashChain,
    /// Filesystem failure while staging or zipping.
    #[error("export io failure: {0}")]
    Io(String),
    /// Artifact serialization failure.
    #[error("export serialization failure: {0}")]
    Serialization(String),
    /// Zip assembly failure.
    #[error("zip assembly failure: {0}")]
    Zip(String),
}

// ============================================================================
// SECTION: Exporter
// ============================================================================

/// Audit-pack exporter over a trace store.
pub struct AuditPackExporter {
    /// Trace store providing records and event chains.
    store: Arc<dyn TraceStore>,
    /// Legal-hold store receiving unredacted narrative copies.
    legal_hold_store: Arc<dyn LegalHoldStore>,
    /// Directory receiving staged artifacts and finished packs.
    output_dir: PathBuf,
}

impl AuditPackExporter {
    /// Creates an exporter writing packs under the output directory.
    #[must_use]
    pub fn new(
        store: Arc<dyn TraceStore>,
        legal_hold_store: Arc<dyn LegalHoldStore>,
        output_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            store,
            legal_hold_store,
            output_dir: output_dir.into(),
        }
    }

    /// Exports the audit pack for a stored trace and returns the zip path.
    ///
    /// # Errors
    ///
    /// Returns [`ExportError`] when verification, staging, or zipping fails;
    /// no pack is emitted on failure.
    pub fn export_audit_pack(&self, trace_id: &str) -> Result<PathBuf, ExportError> {
        let record = self.store.load(trace_id)?;
        if record.trace_id != trace_id {
            return Err(ExportError::TraceIdMismatch);
        }

        verify_hash(&record.response, &record.response_hash, "response")?;
        verify_hash(&record.context, &record.context_hash, "context")?;
        verify_hash(&record.replay_inputs, &record.replay_inputs_hash, "replay_inputs")?;

        let events = self.store.load_events(trace_id)?;
        if !validate_chain(&events) {
            return Err(ExportError::HashChain);
        }

        let out_dir = self.output_dir.join(format!("audit_{trace_id}"));
        fs::create_dir_all(out_dir.join("integrity"))
            .map_err(|err| ExportError::Io(err.to_string()))?;

        let response = &record.response;
        let decision_record = response.get("decision_record").cloned().unwrap_or_default();
        let bundle = response.get("evidence_bundle_user").cloned().unwrap_or_default();
        let retrieval_metadata =
            bundle.get("retrieval_metadata").cloned().unwrap_or_default();

        let mut staged: Vec<(String, Vec<u8>)> = Vec::new();
        stage_json(&mut staged, FINAL_RESPONSE, response)?;
        stage_json(&mut staged, DECISION_RECORD, &decision_record)?;
        stage_json(
            &mut staged,
            EVIDENCE_SOURCES,
            &bundle.get("sources").cloned().unwrap_or_default(),
        )?;
        stage_json(&mut staged, RETRIEVAL_METADATA, &retrieval_metadata)?;
        stage_json(
            &mut staged,
            POLICY_RESULTS,
            &decision_record.get("policy_checks").cloned().unwrap_or_default(),
        )?;
        stage_json(
            &mut staged,
            INCIDENT_EVENTS,
            &decision_record.get("incidents").cloned().unwrap_or_default(),
        )?;
        stage_json(&mut staged, RAW_CONTEXT, &record.context)?;
        stage_json(&mut staged, RETENTION_METADATA, &record.retention)?;
        stage_json(&mut staged, REPLAY_INPUTS, &record.replay_inputs)?;
        stage_json(
            &mut staged,
            SYSTEM_CLAIMS_SNAPSHOT,
            &to_value(&active_system_claims())?,
        )?;
        stage_json(&mut staged, RISK_REGISTER_SNAPSHOT, &to_value(&active_risks())?)?;
        stage_json(
            &mut staged,
            JURISDICTION_COMPLIANCE,
            &retrieval_metadata
                .get("jurisdiction_compliance")
                .cloned()
                .unwrap_or_default(),
        )?;
        stage_json(
            &mut staged,
            POLICY_REGISTRY_SNAPSHOT,
            &to_value(&policy_definitions())?,
        )?;
        stage_json(&mut staged, ATTESTATION_ARTIFACT, &attestation_artifact()?)?;

        let events_jsonl = encode_events_jsonl(&events)
            .map_err(|err| ExportError::Serialization(err.to_string()))?;
        staged.push((EVENTS_JSONL.to_string(), events_jsonl.clone().into_bytes()));
        staged.push((INTEGRITY_CHAIN.to_string(), events_jsonl.into_bytes()));

        let chain_summary = serde_json::json!({
            "chain_valid": true,
            "event_count": events.len(),
        });
        stage_json(&mut staged, HASH_CHAIN_SUMMARY, &chain_summary)?;

        let mut artifact_hashes: BTreeMap<String, String> = staged
            .iter()
            .map(|(name, bytes)| (name.clone(), hash_bytes(bytes)))
            .collect();

        let unredacted_narrative =
            build_chain_of_custody_narrative(response, &record.context, &artifact_hashes);
        let (narrative, _) = redact_text(&unredacted_narrative);
        let narrative_hash = hash_bytes(narrative.as_bytes());
        staged.push((CHAIN_OF_CUSTODY.to_string(), narrative.clone().into_bytes()));
        artifact_hashes.insert(CHAIN_OF_CUSTODY.to_string(), narrative_hash.clone());

        let legal_hold = record
            .retention
            .get("legal_hold")
            .and_then(Value::as_bool)
            .unwrap_or(false);
        if legal_hold {
            let answer = response
                .get("answer_text")
                .and_then(Value::as_str)
                .unwrap_or_default();
            let sources = bundle.get("sources").cloned().unwrap_or_default();
            self.legal_hold_store.store_unredacted(
                trace_id,
                answer,
                &sources,
                &unredacted_narrative,
            )?;
        }

        let manifest = build_manifest(
            trace_id,
            &record.retention,
            &narrative_hash,
            &artifact_hashes,
            staged.len(),
            events.len(),
        );
        let manifest_bytes = pretty_bytes(&manifest)?;
        staged.push((MANIFEST.to_string(), manifest_bytes));

        for (name, bytes) in &staged {
            let path = out_dir.join(name);
            fs::write(&path, bytes).map_err(|err| ExportError::Io(err.to_string()))?;
        }

        let zip_path = self.output_dir.join(format!("audit_{trace_id}.zip"));
        write_zip(&zip_path, &staged)?;
        Ok(zip_path)
    }
}

// ============================================================================
// SECTION: Verification Helpers
// ============================================================================

/// Verifies a stored hash against its payload.
fn verify_hash(payload: &Value, stored: &str, field: &'static str) -> Result<(), ExportError> {
    let actual = hash_canonical_json(payload)
        .map_err(|err| ExportError::Serialization(err.to_string()))?;
    if actual != stored {
        return Err(ExportError::HashMismatch {
            field,
        });
    }
    Ok(())
}

// ============================================================================
// SECTION: Staging Helpers
// ============================================================================

/// Serializes a value to pretty JSON bytes.
fn pretty_bytes(value: &Value) -> Result<Vec<u8>, ExportError> {
    serde_json::to_vec_pretty(value).map_err(|err| ExportError::Serialization(err.to_string()))
}

/// Serializes a component into a JSON value.
fn to_value<T: serde::Serialize>(value: &T) -> Result<Value, ExportError> {
    serde_json::to_value(value).map_err(|err| ExportError::Serialization(err.to_string()))
}

/// Stages one JSON artifact for hashing and packaging.
fn stage_json(
    staged: &mut Vec<(String, Vec<u8>)>,
    name: &str,
    value: &Value,
) -> Result<(), ExportError> {
    staged.push((name.to_string(), pretty_bytes(value)?));
    Ok(())
}

/// Builds the attestation artifact payload.
fn attestation_artifact() -> Result<Value, ExportError> {
    let mut payload = Map::new();
    payload.insert("system_claims".into(), to_value(&active_system_claims())?);
    payload.insert("policies".into(), to_value(&policy_definitions())?);
    payload.insert("policy_change_log".into(), to_value(&policy_change_log())?);
    payload.insert("risk_register".into(), to_value(&active_risks())?);
    payload.insert("tests_executed".into(), to_value(&TESTS_EXECUTED.to_vec())?);
    payload.insert(
        "last_evaluation_timestamp".into(),
        Value::String(UtcTime::now().rfc3339()),
    );
    Ok(Value::Object(payload))
}

// ============================================================================
// SECTION: Narrative
// ============================================================================

/// Maximum characters kept from the request summary.
const SUMMARY_MAX_CHARS: usize = 220;

/// Collapses whitespace and truncates the narrative summary.
fn sanitize_summary(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .chars()
        .take(SUMMARY_MAX_CHARS)
        .collect()
}

/// Composes the chain-of-custody narrative before redaction.
fn build_chain_of_custody_narrative(
    response: &Value,
    context: &Value,
    artifact_hashes: &BTreeMap<String, String>,
) -> String {
    let decision = response.get("decision_record").cloned().unwrap_or_default();
    let empty = Vec::new();
    let claims = decision.get("claims").and_then(Value::as_array).unwrap_or(&empty);
    let suppressed: Vec<&Value> = claims
        .iter()
        .filter(|claim| {
            claim.get("verification_status").and_then(Value::as_str) == Some("UNSUPPORTED")
        })
        .collect();

    let summary = sanitize_summary(
        response.get("answer_text").and_then(Value::as_str).unwrap_or_default(),
    );

    let mut lines = vec![
        "# Chain of Custody Narrative".to_string(),
        String::new(),
        "## User Request Summary (sanitized)".to_string(),
        format!("- {summary}"),
        String::new(),
        "## Claims asserted vs suppressed".to_string(),
        format!("- total_claims: {}", claims.len()),
        format!("- suppressed_claims: {}", suppressed.len()),
    ];
    for claim in &suppressed {
        lines.push(format!(
            "- suppressed: {} -> {}",
            claim.get("claim_id").and_then(Value::as_str).unwrap_or_default(),
            claim.get("claim_text").and_then(Value::as_str).unwrap_or_default()
        ));
    }

    lines.extend([String::new(), "## Evidence flow (source -> claim)".to_string()]);
    for link in decision.get("evidence_links").and_then(Value::as_array).unwrap_or(&empty) {
        lines.push(format!(
            "- {} -> {}",
            link.get("source_id").and_then(Value::as_str).unwrap_or_default(),
            link.get("claim_id").and_then(Value::as_str).unwrap_or_default()
        ));
    }

    lines.extend([String::new(), "## Policy decisions applied".to_string()]);
    for policy in decision.get("policy_checks").and_then(Value::as_array).unwrap_or(&empty) {
        lines.push(format!(
            "- {}: passed={} version={} details={}",
            policy.get("policy_id").and_then(Value::as_str).unwrap_or_default(),
            policy.get("passed").and_then(Value::as_bool).unwrap_or_default(),
            policy.get("version").and_then(Value::as_str).unwrap_or_default(),
            policy.get("details").and_then(Value::as_str).unwrap_or_default()
        ));
    }

    let compliance = response
        .get("evidence_bundle_user")
        .and_then(|bundle| bundle.get("retrieval_metadata"))
        .and_then(|metadata| metadata.get("jurisdiction_compliance"))
        .cloned()
        .unwrap_or_default();
    lines.extend([String::new(), "## Jurisdiction Compliance".to_string()]);
    lines.push(format!(
        "- allowed_jurisdictions: {}",
        compliance.get("allowed_jurisdictions").cloned().unwrap_or_default()
    ));
    lines.push(format!(
        "- accepted_evidence_count: {}",
        compliance
            .get("accepted_evidence")
            .and_then(Value::as_array)
            .map_or(0, Vec::len)
    ));
    lines.push(format!(
        "- rejected_evidence_count: {}",
        compliance
            .get("rejected_evidence")
            .and_then(Value::as_array)
            .map_or(0, Vec::len)
    ));

    lines.extend([String::new(), "## Failure modes encountered".to_string()]);
    for mode in decision.get("failure_modes").and_then(Value::as_array).unwrap_or(&empty) {
        lines.push(format!("- {}", mode.as_str().unwrap_or_default()));
    }

    lines.extend([String::new(), "## Artifact hash references".to_string()]);
    for (name, digest) in artifact_hashes {
        lines.push(format!("- {name}: {digest}"));
    }

    lines.extend([
        String::new(),
        "## Context summary".to_string(),
        format!(
            "- request_metadata: {}",
            context.get("request_metadata").cloned().unwrap_or_default()
        ),
    ]);

    let mut narrative = lines.join("\n");
    narrative.push('\n');
    narrative
}

// ============================================================================
// SECTION: Manifest & Zip
// ============================================================================

/// Builds the manifest binding artifact hashes and counts.
fn build_manifest(
    trace_id: &str,
    retention: &Value,
    narrative_hash: &str,
    artifact_hashes: &BTreeMap<String, String>,
    artifact_count: usize,
    event_count: usize,
) -> Value {
    let mut counts = Map::new();
    counts.insert("artifacts".into(), Value::from(artifact_count));
    counts.insert("events".into(), Value::from(event_count));

    let mut manifest = Map::new();
    manifest.insert("trace_id".into(), Value::String(trace_id.to_string()));
    manifest.insert("retention".into(), retention.clone());
    manifest.insert("narrative_hash".into(), Value::String(narrative_hash.to_string()));
    manifest.insert(
        "artifacts".into(),
        Value::Object(
            artifact_hashes
                .iter()
                .map(|(name, digest)| (name.clone(), Value::String(digest.clone())))
                .collect(),
        ),
    );
    manifest.insert("counts".into(), Value::Object(counts));
    manifest.insert(
        "algo_versions".into(),
        serde_json::to_value(AlgoVersions::default()).unwrap_or_default(),
    );
    Value::Object(manifest)
}

/// Writes the finished archive with DEFLATE compression.
fn write_zip(zip_path: &Path, staged: &[(String, Vec<u8>)]) -> Result<(), ExportError> {
    let file = fs::File::create(zip_path).map_err(|err| ExportError::Io(err.to_string()))?;
    let mut writer = ZipWriter::new(file);
    let options = FileOptions::default().compression_method(CompressionMethod::Deflated);

    for (name, bytes) in staged {
        writer
            .start_file(name.clone(), options)
            .map_err(|err| ExportError::Zip(err.to_string()))?;
        writer.write_all(bytes).map_err(|err| ExportError::Io(err.to_string()))?;
    }
    writer.finish().map_err(|err| ExportError::Zip(err.to_string()))?;
    Ok(())
}
