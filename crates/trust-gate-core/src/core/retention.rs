// trust-gate-core/src/core/retention.rs
// ============================================================================
// Module: Trust Gate Retention Model
// Description: Retention policies and per-trace retention metadata.
// Purpose: Drive trace expiry and legal-hold protection consistently.
// Dependencies: crate::core::time, serde
// ============================================================================

//! ## Overview
//! Every trace carries retention metadata derived from request context. Legal
//! hold overrides expiry: held traces and their audit packs are never deleted
//! until the hold is lifted.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;

use crate::core::time::UtcTime;

// ============================================================================
// SECTION: Policies
// ============================================================================

/// Retention policy window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RetentionPolicy {
    /// Thirty-day retention.
    #[serde(rename = "30_DAYS")]
    ThirtyDays,
    /// Ninety-day retention.
    #[serde(rename = "90_DAYS")]
    NinetyDays,
    /// Indefinite retention under legal hold.
    #[serde(rename = "LEGAL_HOLD")]
    LegalHold,
}

impl RetentionPolicy {
    /// Parses a raw policy label.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "30_DAYS" => Some(Self::ThirtyDays),
            "90_DAYS" => Some(Self::NinetyDays),
            "LEGAL_HOLD" => Some(Self::LegalHold),
            _ => None,
        }
    }

    /// Returns the expiry window in days, when bounded.
    #[must_use]
    pub const fn window_days(self) -> Option<i64> {
        match self {
            Self::ThirtyDays => Some(30),
            Self::NinetyDays => Some(90),
            Self::LegalHold => None,
        }
    }
}

// ============================================================================
// SECTION: Metadata
// ============================================================================

/// Per-trace retention metadata.
///
/// # Invariants
/// - `expiry_at` is absent for legal-hold retention.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetentionMetadata {
    /// Retention policy label.
    pub retention_policy: RetentionPolicy,
    /// Retention reason label.
    pub retention_reason: String,
    /// Legal-hold flag blocking deletion.
    pub legal_hold: bool,
    /// Expiry timestamp for bounded policies.
    pub expiry_at: Option<String>,
}

impl RetentionMetadata {
    /// Builds retention metadata from request context fields.
    #[must_use]
    pub fn from_context(
        policy: Option<&str>,
        reason: Option<&str>,
        legal_hold: bool,
        now: UtcTime,
    ) -> Self {
        let retention_policy = policy
            .and_then(RetentionPolicy::parse)
            .unwrap_or(RetentionPolicy::ThirtyDays);
        let expiry_at = retention_policy
            .window_days()
            .map(|days| now.plus_days(days).rfc3339());
        Self {
            retention_policy,
            retention_reason: reason.unwrap_or("AUDIT").to_string(),
            legal_hold,
            expiry_at,
        }
    }
}
