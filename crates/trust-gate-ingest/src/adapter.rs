// trust-gate-ingest/src/adapter.rs
// ============================================================================
// Module: Ingest Adapter
// Description: Buffered, batched event emission toward the evidence sidecar.
// Purpose: Deliver canonical-hashed turn events with capped retry semantics.
// Dependencies: jsonwebtoken, reqwest, trust-gate-core, trust-gate-config
// ============================================================================

//! ## Overview
//! The adapter keeps a mutex-guarded in-process buffer of pending events.
//! Each emitted event is validated against the required common fields and
//! stamped with the canonical hash of its payload. When the buffer reaches
//! the batch size it is copied out under the lock, cleared, and posted to
//! the sidecar without holding the lock. Delivery is fail-open: after the
//! retry cap the batch is dropped and a warning is surfaced to the sink;
//! user traffic is never blocked on ingestion.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::io;
use std::io::Write as _;
use std::sync::Mutex;
use std::sync::PoisonError;
use std::thread;
use std::time::Duration;

use jsonwebtoken::Algorithm;
use jsonwebtoken::EncodingKey;
use jsonwebtoken::Header;
use jsonwebtoken::encode;
use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use time::OffsetDateTime;
use uuid::Uuid;

use trust_gate_config::IngestSettings;
use trust_gate_core::hashing::hash_canonical_json;
use trust_gate_core::time::UtcTime;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Event schema version stamped on emitted events.
pub const SCHEMA_VERSION: &str = "1.0.0";

/// Subject claim used for minted ingest tokens.
const TOKEN_SUBJECT: &str = "trust-gate-ingest";
/// Scope claim carried by minted ingest tokens.
const TOKEN_SCOPE: &str = "trust:ingest";
/// Lifetime of minted ingest tokens, in seconds.
const TOKEN_TTL_SECONDS: i64 = 300;
/// Transport timeout for sidecar posts.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);
/// Backoff unit multiplied by the attempt number.
const BACKOFF_UNIT: Duration = Duration::from_millis(200);

/// Required common fields on every emitted event.
const REQUIRED_COMMON_FIELDS: [&str; 8] = [
    "host",
    "host_version",
    "parent_span_id",
    "session_id",
    "span_id",
    "trace_id",
    "ts",
    "user_id",
];

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Errors raised by the ingest adapter.
#[derive(Debug, Error)]
pub enum IngestError {
    /// Common fields are incomplete.
    #[error("common_fields missing required values: {0}")]
    MissingCommonFields(String),
    /// Payload could not be canonicalized.
    #[error("payload canonicalization failed: {0}")]
    Canonicalization(String),
    /// No credential is configured for delivery.
    #[error("TRUST_INGEST_TOKEN or TRUST_JWT_SECRET must be configured")]
    MissingCredential,
    /// Token minting failed.
    #[error("token minting failed: {0}")]
    TokenMinting(String),
    /// Sidecar answered with a non-retryable client error.
    #[error("sidecar rejected batch with status {0}")]
    Permanent(u16),
    /// Delivery kept failing after the retry cap.
    #[error("sidecar delivery failed after {attempts} attempts: {reason}")]
    Transient {
        /// Attempts performed.
        attempts: u32,
        /// Last failure description.
        reason: String,
    },
}

// ============================================================================
// SECTION: Warning Sink
// ============================================================================

/// Sink receiving fail-open delivery warnings.
pub trait IngestWarningSink: Send + Sync {
    /// Records one dropped-batch warning.
    fn warn(&self, dropped_events: usize, error: &IngestError);
}

/// Sink writing JSON-line warnings to stderr.
pub struct StderrWarningSink;

impl IngestWarningSink for StderrWarningSink {
    fn warn(&self, dropped_events: usize, error: &IngestError) {
        let line = serde_json::json!({
            "event": "ingest_batch_dropped",
            "dropped_events": dropped_events,
            "error": error.to_string(),
        });
        let mut stderr = io::stderr().lock();
        let _ = writeln!(stderr, "{line}");
    }
}

/// Sink discarding warnings.
pub struct NoopWarningSink;

impl IngestWarningSink for NoopWarningSink {
    fn warn(&self, _dropped_events: usize, _error: &IngestError) {}
}

// ============================================================================
// SECTION: Token Claims
// ============================================================================

/// Claims minted into short-lived ingest tokens.
#[derive(Debug, Serialize, Deserialize)]
struct IngestTokenClaims {
    /// Token subject.
    sub: String,
    /// Ingest scope.
    scope: String,
    /// Issued-at time as Unix seconds.
    iat: i64,
    /// Expiry as Unix seconds.
    exp: i64,
}

// ============================================================================
// SECTION: Adapter
// ============================================================================

/// Buffered ingest adapter posting event batches to the sidecar.
pub struct IngestAdapter {
    /// Delivery settings.
    settings: IngestSettings,
    /// Pending event buffer.
    pending: Mutex<Vec<Value>>,
    /// Blocking HTTP client with a bounded timeout.
    client: reqwest::blocking::Client,
    /// Warning sink for dropped batches.
    warnings: Box<dyn IngestWarningSink>,
}

impl IngestAdapter {
    /// Creates an adapter with the stderr warning sink.
    #[must_use]
    pub fn new(settings: IngestSettings) -> Self {
        Self::with_warning_sink(settings, Box::new(StderrWarningSink))
    }

    /// Creates an adapter with a custom warning sink.
    #[must_use]
    pub fn with_warning_sink(
        settings: IngestSettings,
        warnings: Box<dyn IngestWarningSink>,
    ) -> Self {
        let client = reqwest::blocking::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_default();
        Self {
            settings,
            pending: Mutex::new(Vec::new()),
            client,
            warnings,
        }
    }

    /// Returns the pending buffer length.
    #[must_use]
    pub fn pending_len(&self) -> usize {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Queues an event; flushes when the batch size is reached.
    ///
    /// Delivery failures are fail-open: the batch is dropped with a warning
    /// and `Ok(())` is returned so host traffic is never blocked.
    ///
    /// # Errors
    ///
    /// Returns [`IngestError`] only for malformed inputs, never for delivery
    /// failures.
    pub fn emit_event(
        &self,
        event_type: &str,
        common_fields: &Value,
        payload: &Value,
    ) -> Result<(), IngestError> {
        let event = normalize_event(event_type, common_fields, payload)?;

        let flush_batch = {
            let mut pending = self.pending.lock().unwrap_or_else(PoisonError::into_inner);
            pending.push(event);
            if pending.len() >= self.settings.batch_size {
                let batch = pending.clone();
                pending.clear();
                Some(batch)
            } else {
                None
            }
        };

        if let Some(batch) = flush_batch {
            self.deliver_fail_open(batch);
        }
        Ok(())
    }

    /// Flushes pending events immediately.
    ///
    /// # Errors
    ///
    /// Never returns an error today; the fail-open contract mirrors
    /// [`Self::emit_event`].
    pub fn flush_events(&self) -> Result<(), IngestError> {
        let batch = {
            let mut pending = self.pending.lock().unwrap_or_else(PoisonError::into_inner);
            if pending.is_empty() {
                return Ok(());
            }
            let batch = pending.clone();
            pending.clear();
            batch
        };
        self.deliver_fail_open(batch);
        Ok(())
    }

    /// Delivers a batch, surfacing failures only to the warning sink.
    fn deliver_fail_open(&self, batch: Vec<Value>) {
        let dropped = batch.len();
        if let Err(error) = self.send_batch(&batch) {
            self.warnings.warn(dropped, &error);
        }
    }

    /// Posts one batch with capped retries and linear backoff.
    fn send_batch(&self, events: &[Value]) -> Result<(), IngestError> {
        let url = format!(
            "{}/v1/events",
            self.settings.sidecar_url.trim_end_matches('/')
        );
        let token = self.build_ingest_token()?;
        let body = serde_json::json!({ "events": events });

        let max_retries = self.settings.max_retries.max(1);
        let mut last_reason = String::new();

        for attempt in 1..=max_retries {
            let response = self
                .client
                .post(&url)
                .bearer_auth(&token)
                .json(&body)
                .send();

            match response {
                Ok(response) => {
                    let status = response.status();
                    if status.is_success() {
                        return Ok(());
                    }
                    if status.is_client_error() {
                        return Err(IngestError::Permanent(status.as_u16()));
                    }
                    last_reason = format!("status {status}");
                }
                Err(err) => {
                    last_reason = err.to_string();
                }
            }

            if attempt < max_retries {
                thread::sleep(BACKOFF_UNIT * attempt);
            }
        }

        Err(IngestError::Transient {
            attempts: max_retries,
            reason: last_reason,
        })
    }

    /// Returns the configured opaque token or mints a short-lived JWT.
    fn build_ingest_token(&self) -> Result<String, IngestError> {
        if let Some(token) = &self.settings.ingest_token {
            return Ok(token.clone());
        }
        let secret = self
            .settings
            .jwt_secret
            .as_ref()
            .ok_or(IngestError::MissingCredential)?;

        let now = OffsetDateTime::now_utc().unix_timestamp();
        let claims = IngestTokenClaims {
            sub: TOKEN_SUBJECT.to_string(),
            scope: TOKEN_SCOPE.to_string(),
            iat: now,
            exp: now + TOKEN_TTL_SECONDS,
        };
        encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .map_err(|err| IngestError::TokenMinting(err.to_string()))
    }
}

// ============================================================================
// SECTION: Event Composition
// ============================================================================

/// Creates a sidecar-compatible trace identifier.
#[must_use]
pub fn create_trace_id() -> String {
    format!("tr_{}", Uuid::new_v4().simple())
}

/// Builds the shared common-field block for one span.
#[must_use]
pub fn default_common_fields(
    trace_id: &str,
    span_id: &str,
    parent_span_id: Option<&str>,
    host: &str,
    host_version: &str,
    session_id: &str,
    user_id: &str,
) -> Value {
    serde_json::json!({
        "trace_id": trace_id,
        "span_id": span_id,
        "parent_span_id": parent_span_id,
        "ts": UtcTime::now().rfc3339(),
        "host": host,
        "host_version": host_version,
        "session_id": session_id,
        "user_id": user_id,
        "schema_version": SCHEMA_VERSION,
    })
}

/// Validates common fields and composes the wire event.
fn normalize_event(
    event_type: &str,
    common_fields: &Value,
    payload: &Value,
) -> Result<Value, IngestError> {
    let Some(fields) = common_fields.as_object() else {
        return Err(IngestError::MissingCommonFields(
            REQUIRED_COMMON_FIELDS.join(", "),
        ));
    };
    let missing: Vec<&str> = REQUIRED_COMMON_FIELDS
        .iter()
        .copied()
        .filter(|field| !fields.contains_key(*field))
        .collect();
    if !missing.is_empty() {
        return Err(IngestError::MissingCommonFields(missing.join(", ")));
    }

    let payload_hash = hash_canonical_json(payload)
        .map_err(|err| IngestError::Canonicalization(err.to_string()))?;

    let mut event = fields.clone();
    event.insert("event_type".into(), Value::String(event_type.to_string()));
    event.insert("payload".into(), payload.clone());
    event.insert("payload_hash".into(), Value::String(payload_hash));
    event
        .entry("schema_version".to_string())
        .or_insert_with(|| Value::String(SCHEMA_VERSION.to_string()));
    Ok(Value::Object(event))
}
