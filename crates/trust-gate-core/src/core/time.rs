// trust-gate-core/src/core/time.rs
// ============================================================================
// Module: Trust Gate Time Model
// Description: RFC 3339 UTC timestamps for records, events, and retention.
// Purpose: Provide one clock idiom shared by the gate, stores, and exporter.
// Dependencies: serde, time
// ============================================================================

//! ## Overview
//! All persisted timestamps are RFC 3339 UTC strings. [`UtcTime`] wraps the
//! underlying instant so retention arithmetic and cutoff comparisons parse and
//! format through a single code path.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;
use time::Duration;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Errors raised when parsing stored timestamps.
#[derive(Debug, Error)]
pub enum TimeError {
    /// Value is not a valid RFC 3339 timestamp.
    #[error("invalid rfc3339 timestamp: {0}")]
    InvalidTimestamp(String),
}

// ============================================================================
// SECTION: Utc Time
// ============================================================================

/// UTC instant with RFC 3339 persistence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UtcTime(#[serde(with = "time::serde::rfc3339")] OffsetDateTime);

impl UtcTime {
    /// Returns the current UTC instant.
    #[must_use]
    pub fn now() -> Self {
        Self(OffsetDateTime::now_utc())
    }

    /// Parses an RFC 3339 timestamp.
    ///
    /// # Errors
    ///
    /// Returns [`TimeError::InvalidTimestamp`] when the value does not parse.
    pub fn parse(value: &str) -> Result<Self, TimeError> {
        OffsetDateTime::parse(value, &Rfc3339)
            .map(Self)
            .map_err(|_| TimeError::InvalidTimestamp(value.to_string()))
    }

    /// Returns the instant shifted forward by whole days.
    #[must_use]
    pub fn plus_days(self, days: i64) -> Self {
        Self(self.0.saturating_add(Duration::days(days)))
    }

    /// Returns the instant shifted backward by whole days.
    #[must_use]
    pub fn minus_days(self, days: i64) -> Self {
        Self(self.0.saturating_sub(Duration::days(days)))
    }

    /// Formats the instant as an RFC 3339 UTC string.
    #[must_use]
    pub fn rfc3339(&self) -> String {
        self.0.format(&Rfc3339).unwrap_or_default()
    }
}
