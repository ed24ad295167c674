// trust-gate-core/src/core/sovereignty.rs
// ============================================================================
// Module: Trust Gate Jurisdiction Enforcement
// Description: Jurisdiction and scope gating for normalized evidence.
// Purpose: Keep disallowed-jurisdiction evidence out of claim verification.
// Dependencies: crate::core::evidence, serde
// ============================================================================

//! ## Overview
//! Jurisdiction enforcement partitions evidence into accepted and rejected
//! sets before any claim matching happens. A single rejection flags the whole
//! turn as a jurisdiction violation, which the gate converts into a refusal.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;

use serde::Deserialize;
use serde::Serialize;

use crate::core::evidence::DataClassification;
use crate::core::evidence::EvidenceSource;
use crate::core::evidence::Jurisdiction;

// ============================================================================
// SECTION: Allowed Jurisdictions
// ============================================================================

/// Default allowlist applied when a request provides no jurisdictions.
pub const DEFAULT_ALLOWED_JURISDICTIONS: [&str; 5] = ["US", "EU", "UK", "CA", "UNKNOWN"];

// ============================================================================
// SECTION: Records
// ============================================================================

/// Per-source jurisdiction decision metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JurisdictionRecord {
    /// Evidence source identifier.
    pub source_id: String,
    /// Source jurisdiction.
    pub jurisdiction: Jurisdiction,
    /// Source data classification.
    pub data_classification: DataClassification,
    /// Scope the gate required for this turn.
    pub required_scope: String,
    /// Rejection reason; absent for accepted sources.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Outcome of jurisdiction enforcement over a turn's evidence.
#[derive(Debug, Clone, PartialEq)]
pub struct JurisdictionOutcome {
    /// Sources that passed jurisdiction and scope checks.
    pub accepted: Vec<EvidenceSource>,
    /// Decision metadata for accepted sources.
    pub accepted_meta: Vec<JurisdictionRecord>,
    /// Decision metadata for rejected sources.
    pub rejected_meta: Vec<JurisdictionRecord>,
    /// True when at least one source was rejected.
    pub violation: bool,
}

// ============================================================================
// SECTION: Enforcement
// ============================================================================

/// Rejection reason for a jurisdiction outside the allowed set.
const REASON_DISALLOWED_JURISDICTION: &str = "disallowed_jurisdiction";
/// Rejection reason for a missing required scope.
const REASON_SCOPE_NOT_ALLOWED: &str = "scope_not_allowed";

/// Partitions evidence by allowed jurisdictions and a required scope.
///
/// The allowlist is matched as uppercased labels so an allowlist naming no
/// known jurisdiction rejects every source instead of admitting any; the
/// caller substitutes [`DEFAULT_ALLOWED_JURISDICTIONS`] only when no labels
/// were provided at all.
#[must_use]
pub fn enforce_jurisdiction(
    evidence_sources: Vec<EvidenceSource>,
    allowed_jurisdictions: &[String],
    required_scope: &str,
) -> JurisdictionOutcome {
    let allowed: BTreeSet<String> = allowed_jurisdictions
        .iter()
        .map(|label| label.to_ascii_uppercase())
        .collect();

    let mut accepted = Vec::new();
    let mut accepted_meta = Vec::new();
    let mut rejected_meta = Vec::new();

    for source in evidence_sources {
        let jurisdiction_ok = allowed.contains(source.jurisdiction.as_str());
        let scope_ok = source.allowed_scopes.iter().any(|scope| scope == required_scope);

        let mut record = JurisdictionRecord {
            source_id: source.id.clone(),
            jurisdiction: source.jurisdiction,
            data_classification: source.data_classification,
            required_scope: required_scope.to_string(),
            reason: None,
        };

        if jurisdiction_ok && scope_ok {
            accepted.push(source);
            accepted_meta.push(record);
        } else {
            let reason = if jurisdiction_ok {
                REASON_SCOPE_NOT_ALLOWED
            } else {
                REASON_DISALLOWED_JURISDICTION
            };
            record.reason = Some(reason.to_string());
            rejected_meta.push(record);
        }
    }

    let violation = !rejected_meta.is_empty();
    JurisdictionOutcome {
        accepted,
        accepted_meta,
        rejected_meta,
        violation,
    }
}
