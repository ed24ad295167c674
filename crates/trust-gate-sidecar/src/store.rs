// trust-gate-sidecar/src/store.rs
// ============================================================================
// Module: Sidecar Relational Store
// Description: SQLite-backed traces, spans, events, and audit-pack records.
// Purpose: Persist ingested event streams behind batch-atomic transactions.
// Dependencies: rusqlite, serde, serde_json, trust-gate-core
// ============================================================================

//! ## Overview
//! The sidecar store keeps four tables: `traces`, `spans`, `events`, and
//! `audit_packs`. Event batches commit atomically at the batch boundary:
//! either every accepted row is visible or none is. Canonical payload hashes
//! are recomputed on ingest and mismatches are rejected before any row lands.
//! The retention sweep deletes expired packs and traces while never touching
//! anything under legal hold.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::PoisonError;

use rusqlite::Connection;
use rusqlite::OptionalExtension;
use rusqlite::params;
use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use trust_gate_core::hashing::hash_canonical_json;
use trust_gate_core::time::UtcTime;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Schema version recorded in `schema_meta`.
const SCHEMA_VERSION: i64 = 1;

/// Required fields on every ingested event.
const REQUIRED_EVENT_FIELDS: [&str; 12] = [
    "event_type",
    "host",
    "host_version",
    "parent_span_id",
    "payload",
    "payload_hash",
    "schema_version",
    "session_id",
    "span_id",
    "trace_id",
    "ts",
    "user_id",
];

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Errors raised by the sidecar store.
#[derive(Debug, Error)]
pub enum SidecarStoreError {
    /// Referenced row does not exist.
    #[error("{0} not found")]
    NotFound(&'static str),
    /// Ingested event failed validation.
    #[error("{0}")]
    InvalidEvent(String),
    /// Underlying database failure.
    #[error("database failure: {0}")]
    Database(String),
}

impl From<rusqlite::Error> for SidecarStoreError {
    fn from(err: rusqlite::Error) -> Self {
        Self::Database(err.to_string())
    }
}

// ============================================================================
// SECTION: Row Types
// ============================================================================

/// Stored event row, decoded for summaries and pack building.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventRow {
    /// Insertion-ordered row identifier.
    pub id: i64,
    /// Owning trace identifier.
    pub trace_id: String,
    /// Span identifier.
    pub span_id: String,
    /// Parent span identifier, when present.
    pub parent_span_id: Option<String>,
    /// Event timestamp.
    pub ts: String,
    /// Event type label.
    pub event_type: String,
    /// Structured event payload.
    pub payload: Value,
    /// Canonical payload hash.
    pub payload_hash: String,
    /// Event schema version.
    pub schema_version: String,
}

/// Per-trace summary for the read endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraceSummary {
    /// Trace identifier.
    pub trace_id: String,
    /// Event counts keyed by type.
    pub event_counts: BTreeMap<String, u64>,
    /// Total event count.
    pub total_events: u64,
    /// Evidence completeness classification.
    pub evidence_status: String,
    /// Retention deadline, when set.
    pub retention_until: Option<String>,
    /// Legal-hold flag.
    pub legal_hold: bool,
}

/// Audit-pack record row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditPackRecord {
    /// Pack identifier.
    pub pack_id: String,
    /// Owning trace identifier.
    pub trace_id: String,
    /// Lifecycle status: queued, ready, or failed.
    pub status: String,
    /// Built archive path, when ready.
    pub storage_path: Option<String>,
    /// Record creation timestamp.
    pub created_at: String,
    /// Build completion timestamp, when ready.
    pub ready_at: Option<String>,
    /// Retention deadline, when set.
    pub retention_until: Option<String>,
    /// Legal-hold flag.
    pub legal_hold: bool,
}

/// Retention sweep report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetentionReport {
    /// Traces deleted with their dependent rows.
    pub deleted_traces: u64,
    /// Audit-pack rows deleted.
    pub deleted_packs: u64,
    /// Audit-pack files removed from disk.
    pub deleted_pack_files: u64,
    /// Retention window applied, in days.
    pub retention_days: u32,
}

// ============================================================================
// SECTION: Store
// ============================================================================

/// SQLite-backed sidecar store behind a single connection mutex.
pub struct SidecarStore {
    /// Guarded database connection.
    conn: Arc<Mutex<Connection>>,
}

impl SidecarStore {
    /// Opens (or creates) the store at the given path and applies the schema.
    ///
    /// # Errors
    ///
    /// Returns [`SidecarStoreError::Database`] when opening or migrating fails.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, SidecarStoreError> {
        if let Some(parent) = path.as_ref().parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .map_err(|err| SidecarStoreError::Database(err.to_string()))?;
            }
        }
        let conn = Connection::open(path)?;
        apply_schema(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Opens an in-memory store for tests.
    ///
    /// # Errors
    ///
    /// Returns [`SidecarStoreError::Database`] when opening fails.
    pub fn open_in_memory() -> Result<Self, SidecarStoreError> {
        let conn = Connection::open_in_memory()?;
        apply_schema(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Locks the connection, recovering from poisoned locks.
    fn lock(&self) -> std::sync::MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // ------------------------------------------------------------------
    // Ingest
    // ------------------------------------------------------------------

    /// Ingests a batch of events atomically.
    ///
    /// Every event is validated and its canonical payload hash recomputed
    /// before any row is committed; a single failure rolls the batch back.
    ///
    /// # Errors
    ///
    /// Returns [`SidecarStoreError::InvalidEvent`] for malformed events and
    /// hash mismatches.
    pub fn ingest_batch(&self, events: &[Value]) -> Result<u64, SidecarStoreError> {
        let mut conn = self.lock();
        let tx = conn
            .transaction()
            .map_err(|err| SidecarStoreError::Database(err.to_string()))?;

        let mut inserted = 0u64;
        for event in events {
            validate_event(event)?;

            let payload = event.get("payload").cloned().unwrap_or(Value::Null);
            let computed = hash_canonical_json(&payload)
                .map_err(|err| SidecarStoreError::InvalidEvent(err.to_string()))?;
            let supplied = event.get("payload_hash").and_then(Value::as_str).unwrap_or_default();
            if !supplied.is_empty() && supplied != computed {
                return Err(SidecarStoreError::InvalidEvent(
                    "payload_hash does not match canonical payload hash".to_string(),
                ));
            }

            let trace_id = str_field(event, "trace_id");
            tx.execute(
                "INSERT INTO traces(trace_id, host, host_version, session_id, user_id, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                 ON CONFLICT(trace_id) DO NOTHING",
                params![
                    trace_id,
                    str_field(event, "host"),
                    str_field(event, "host_version"),
                    str_field(event, "session_id"),
                    str_field(event, "user_id"),
                    UtcTime::now().rfc3339(),
                ],
            )?;
            tx.execute(
                "INSERT INTO spans(trace_id, span_id, parent_span_id, ts)
                 VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(trace_id, span_id) DO NOTHING",
                params![
                    trace_id,
                    str_field(event, "span_id"),
                    opt_str_field(event, "parent_span_id"),
                    str_field(event, "ts"),
                ],
            )?;
            tx.execute(
                "INSERT INTO events(trace_id, span_id, parent_span_id, ts, event_type,
                                    payload_json, payload_hash, schema_version)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    trace_id,
                    str_field(event, "span_id"),
                    opt_str_field(event, "parent_span_id"),
                    str_field(event, "ts"),
                    str_field(event, "event_type"),
                    payload.to_string(),
                    computed,
                    str_field(event, "schema_version"),
                ],
            )?;
            inserted += 1;
        }

        tx.commit().map_err(|err| SidecarStoreError::Database(err.to_string()))?;
        Ok(inserted)
    }

    // ------------------------------------------------------------------
    // Reads
    // ------------------------------------------------------------------

    /// Returns the summary for a trace.
    ///
    /// # Errors
    ///
    /// Returns [`SidecarStoreError::NotFound`] for unknown traces.
    pub fn trace_summary(&self, trace_id: &str) -> Result<TraceSummary, SidecarStoreError> {
        let conn = self.lock();
        let trace_row = conn
            .query_row(
                "SELECT retention_until, legal_hold FROM traces WHERE trace_id = ?1",
                params![trace_id],
                |row| {
                    Ok((row.get::<_, Option<String>>(0)?, row.get::<_, i64>(1)?))
                },
            )
            .optional()?;
        let Some((retention_until, legal_hold)) = trace_row else {
            return Err(SidecarStoreError::NotFound("trace"));
        };

        let mut stmt =
            conn.prepare("SELECT event_type FROM events WHERE trace_id = ?1")?;
        let mut event_counts: BTreeMap<String, u64> = BTreeMap::new();
        let rows = stmt.query_map(params![trace_id], |row| row.get::<_, String>(0))?;
        for event_type in rows {
            *event_counts.entry(event_type?).or_insert(0) += 1;
        }

        let total_events: u64 = event_counts.values().sum();
        let retrieval = event_counts.get("retrieval_batch").copied().unwrap_or(0);
        let citations = event_counts.get("citations_resolved").copied().unwrap_or(0);
        let evidence_status = if retrieval >= 1 && citations >= 1 {
            "complete"
        } else if total_events > 0 {
            "partial"
        } else {
            "none"
        };

        Ok(TraceSummary {
            trace_id: trace_id.to_string(),
            event_counts,
            total_events,
            evidence_status: evidence_status.to_string(),
            retention_until,
            legal_hold: legal_hold != 0,
        })
    }

    /// Returns a trace's events sorted by `(ts asc, id asc)`.
    ///
    /// # Errors
    ///
    /// Returns [`SidecarStoreError::Database`] on query failures.
    pub fn events_for_trace(&self, trace_id: &str) -> Result<Vec<EventRow>, SidecarStoreError> {
        let conn = self.lock();
        let mut stmt = conn.prepare(
            "SELECT id, trace_id, span_id, parent_span_id, ts, event_type,
                    payload_json, payload_hash, schema_version
             FROM events
             WHERE trace_id = ?1
             ORDER BY ts ASC, id ASC",
        )?;
        let rows = stmt.query_map(params![trace_id], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, Option<String>>(3)?,
                row.get::<_, String>(4)?,
                row.get::<_, String>(5)?,
                row.get::<_, String>(6)?,
                row.get::<_, String>(7)?,
                row.get::<_, String>(8)?,
            ))
        })?;

        let mut events = Vec::new();
        for row in rows {
            let (id, trace, span, parent, ts, event_type, payload_json, payload_hash, schema) =
                row?;
            let payload = serde_json::from_str(&payload_json)
                .map_err(|err| SidecarStoreError::Database(err.to_string()))?;
            events.push(EventRow {
                id,
                trace_id: trace,
                span_id: span,
                parent_span_id: parent,
                ts,
                event_type,
                payload,
                payload_hash,
                schema_version: schema,
            });
        }
        Ok(events)
    }

    // ------------------------------------------------------------------
    // Audit packs
    // ------------------------------------------------------------------

    /// Creates a queued audit-pack record.
    ///
    /// # Errors
    ///
    /// Returns [`SidecarStoreError::Database`] on insert failures.
    pub fn create_audit_pack_record(
        &self,
        pack_id: &str,
        trace_id: &str,
    ) -> Result<(), SidecarStoreError> {
        let conn = self.lock();
        conn.execute(
            "INSERT INTO audit_packs(pack_id, trace_id, status, storage_path, created_at,
                                     retention_until, legal_hold)
             VALUES (?1, ?2, 'queued', NULL, ?3, NULL, 0)",
            params![pack_id, trace_id, UtcTime::now().rfc3339()],
        )?;
        Ok(())
    }

    /// Marks a pack ready with its archive path.
    ///
    /// # Errors
    ///
    /// Returns [`SidecarStoreError::NotFound`] for unknown packs.
    pub fn mark_audit_pack_ready(
        &self,
        pack_id: &str,
        storage_path: &str,
    ) -> Result<(), SidecarStoreError> {
        let conn = self.lock();
        let updated = conn.execute(
            "UPDATE audit_packs SET status = 'ready', storage_path = ?1, ready_at = ?2
             WHERE pack_id = ?3",
            params![storage_path, UtcTime::now().rfc3339(), pack_id],
        )?;
        if updated == 0 {
            return Err(SidecarStoreError::NotFound("audit pack"));
        }
        Ok(())
    }

    /// Marks a pack failed after a build error.
    ///
    /// # Errors
    ///
    /// Returns [`SidecarStoreError::Database`] on update failures.
    pub fn mark_audit_pack_failed(&self, pack_id: &str) -> Result<(), SidecarStoreError> {
        let conn = self.lock();
        conn.execute(
            "UPDATE audit_packs SET status = 'failed' WHERE pack_id = ?1",
            params![pack_id],
        )?;
        Ok(())
    }

    /// Returns an audit-pack record.
    ///
    /// # Errors
    ///
    /// Returns [`SidecarStoreError::NotFound`] for unknown packs.
    pub fn audit_pack_record(&self, pack_id: &str) -> Result<AuditPackRecord, SidecarStoreError> {
        let conn = self.lock();
        conn.query_row(
            "SELECT pack_id, trace_id, status, storage_path, created_at, ready_at,
                    retention_until, legal_hold
             FROM audit_packs WHERE pack_id = ?1",
            params![pack_id],
            |row| {
                Ok(AuditPackRecord {
                    pack_id: row.get(0)?,
                    trace_id: row.get(1)?,
                    status: row.get(2)?,
                    storage_path: row.get(3)?,
                    created_at: row.get(4)?,
                    ready_at: row.get(5)?,
                    retention_until: row.get(6)?,
                    legal_hold: row.get::<_, i64>(7)? != 0,
                })
            },
        )
        .optional()?
        .ok_or(SidecarStoreError::NotFound("audit pack"))
    }

    // ------------------------------------------------------------------
    // Legal hold & retention
    // ------------------------------------------------------------------

    /// Sets or clears the legal hold on a trace, cascading to its packs.
    ///
    /// # Errors
    ///
    /// Returns [`SidecarStoreError::NotFound`] for unknown traces.
    pub fn set_legal_hold(&self, trace_id: &str, enabled: bool) -> Result<(), SidecarStoreError> {
        let conn = self.lock();
        let hold = i64::from(enabled);
        let updated = conn.execute(
            "UPDATE traces SET legal_hold = ?1 WHERE trace_id = ?2",
            params![hold, trace_id],
        )?;
        if updated == 0 {
            return Err(SidecarStoreError::NotFound("trace"));
        }
        conn.execute(
            "UPDATE audit_packs SET legal_hold = ?1 WHERE trace_id = ?2",
            params![hold, trace_id],
        )?;
        Ok(())
    }

    /// Runs the retention sweep.
    ///
    /// Packs and traces under legal hold are never deleted; traces also stay
    /// while any of their packs remains held.
    ///
    /// # Errors
    ///
    /// Returns [`SidecarStoreError::Database`] on query failures.
    pub fn run_retention(
        &self,
        retention_days: u32,
        now: UtcTime,
    ) -> Result<RetentionReport, SidecarStoreError> {
        let cutoff = now.minus_days(i64::from(retention_days));
        let mut deleted_pack_files = 0u64;
        let mut deleted_packs = 0u64;
        let mut deleted_traces = 0u64;

        let expired_packs: Vec<(String, Option<String>)> = {
            let conn = self.lock();
            let mut stmt = conn.prepare(
                "SELECT pack_id, storage_path, retention_until, created_at
                 FROM audit_packs WHERE legal_hold = 0",
            )?;
            let rows = stmt.query_map([], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, Option<String>>(1)?,
                    row.get::<_, Option<String>>(2)?,
                    row.get::<_, String>(3)?,
                ))
            })?;
            let mut expired = Vec::new();
            for row in rows {
                let (pack_id, storage_path, retention_until, created_at) = row?;
                if is_expired(retention_until.as_deref(), &created_at, now, cutoff) {
                    expired.push((pack_id, storage_path));
                }
            }
            expired
        };

        for (pack_id, storage_path) in &expired_packs {
            if let Some(path) = storage_path {
                let path = PathBuf::from(path);
                if path.exists() && std::fs::remove_file(&path).is_ok() {
                    deleted_pack_files += 1;
                }
            }
            let conn = self.lock();
            deleted_packs += conn.execute(
                "DELETE FROM audit_packs WHERE pack_id = ?1 AND legal_hold = 0",
                params![pack_id],
            )? as u64;
        }

        let expired_traces: Vec<String> = {
            let conn = self.lock();
            let mut stmt = conn.prepare(
                "SELECT t.trace_id, t.retention_until, t.created_at,
                        (SELECT MIN(e.ts) FROM events e WHERE e.trace_id = t.trace_id)
                 FROM traces t
                 WHERE t.legal_hold = 0
                   AND NOT EXISTS (
                     SELECT 1 FROM audit_packs ap
                     WHERE ap.trace_id = t.trace_id AND ap.legal_hold = 1
                   )",
            )?;
            let rows = stmt.query_map([], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, Option<String>>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, Option<String>>(3)?,
                ))
            })?;
            let mut expired = Vec::new();
            for row in rows {
                let (trace_id, retention_until, created_at, earliest_ts) = row?;
                let anchor = earliest_ts.unwrap_or(created_at);
                if is_expired(retention_until.as_deref(), &anchor, now, cutoff) {
                    expired.push(trace_id);
                }
            }
            expired
        };

        for trace_id in &expired_traces {
            let conn = self.lock();
            conn.execute("DELETE FROM events WHERE trace_id = ?1", params![trace_id])?;
            conn.execute("DELETE FROM spans WHERE trace_id = ?1", params![trace_id])?;
            conn.execute(
                "DELETE FROM audit_packs WHERE trace_id = ?1 AND legal_hold = 0",
                params![trace_id],
            )?;
            deleted_traces += conn
                .execute("DELETE FROM traces WHERE trace_id = ?1", params![trace_id])?
                as u64;
        }

        Ok(RetentionReport {
            deleted_traces,
            deleted_packs,
            deleted_pack_files,
            retention_days,
        })
    }
}

// ============================================================================
// SECTION: Schema
// ============================================================================

/// Applies the store schema to a fresh or existing connection.
fn apply_schema(conn: &Connection) -> Result<(), SidecarStoreError> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_meta (
           version INTEGER NOT NULL
         );
         CREATE TABLE IF NOT EXISTS traces (
           trace_id TEXT PRIMARY KEY,
           host TEXT NOT NULL,
           host_version TEXT NOT NULL,
           session_id TEXT NOT NULL,
           user_id TEXT NOT NULL,
           created_at TEXT NOT NULL,
           retention_until TEXT,
           legal_hold INTEGER NOT NULL DEFAULT 0
         );
         CREATE TABLE IF NOT EXISTS spans (
           trace_id TEXT NOT NULL,
           span_id TEXT NOT NULL,
           parent_span_id TEXT,
           ts TEXT NOT NULL,
           PRIMARY KEY (trace_id, span_id)
         );
         CREATE TABLE IF NOT EXISTS events (
           id INTEGER PRIMARY KEY AUTOINCREMENT,
           trace_id TEXT NOT NULL,
           span_id TEXT NOT NULL,
           parent_span_id TEXT,
           ts TEXT NOT NULL,
           event_type TEXT NOT NULL,
           payload_json TEXT NOT NULL,
           payload_hash TEXT NOT NULL,
           schema_version TEXT NOT NULL
         );
         CREATE INDEX IF NOT EXISTS idx_events_trace ON events(trace_id, ts, id);
         CREATE TABLE IF NOT EXISTS audit_packs (
           pack_id TEXT PRIMARY KEY,
           trace_id TEXT NOT NULL,
           status TEXT NOT NULL,
           storage_path TEXT,
           created_at TEXT NOT NULL,
           ready_at TEXT,
           retention_until TEXT,
           legal_hold INTEGER NOT NULL DEFAULT 0
         );",
    )?;

    let version: Option<i64> = conn
        .query_row("SELECT version FROM schema_meta LIMIT 1", [], |row| row.get(0))
        .optional()?;
    if version.is_none() {
        conn.execute("INSERT INTO schema_meta(version) VALUES (?1)", params![SCHEMA_VERSION])?;
    }
    Ok(())
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Validates required fields on an ingested event.
fn validate_event(event: &Value) -> Result<(), SidecarStoreError> {
    let Some(object) = event.as_object() else {
        return Err(SidecarStoreError::InvalidEvent("event must be an object".to_string()));
    };
    let missing: Vec<&str> = REQUIRED_EVENT_FIELDS
        .iter()
        .copied()
        .filter(|field| !object.contains_key(*field))
        .collect();
    if !missing.is_empty() {
        return Err(SidecarStoreError::InvalidEvent(format!(
            "Event missing required fields: {}",
            missing.join(", ")
        )));
    }
    Ok(())
}

/// Returns a string field or empty.
fn str_field(event: &Value, key: &str) -> String {
    event.get(key).and_then(Value::as_str).unwrap_or_default().to_string()
}

/// Returns an optional string field.
fn opt_str_field(event: &Value, key: &str) -> Option<String> {
    event.get(key).and_then(Value::as_str).map(ToString::to_string)
}

/// Decides expiry from an explicit deadline or an age anchor.
fn is_expired(
    retention_until: Option<&str>,
    anchor: &str,
    now: UtcTime,
    cutoff: UtcTime,
) -> bool {
    match retention_until {
        Some(deadline) => UtcTime::parse(deadline).is_ok_and(|deadline| deadline <= now),
        None => UtcTime::parse(anchor).is_ok_and(|anchor| anchor <= cutoff),
    }
}
