// trust-gate-core/src/core/system_claims.rs
// ============================================================================
// Module: Trust Gate System Behavior Claims
// Description: Registry of claims the system may truthfully make about itself.
// Purpose: Bind SYSTEM-type claims to attested behavior entries.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! Answers sometimes describe the gate itself ("unsupported statements are
//! rendered as UNKNOWN"). Such claims cannot be backed by retrieval evidence;
//! instead they must match an entry in this registry, which records where the
//! behavior is enforced and which tests attest it.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;

use serde::Deserialize;
use serde::Serialize;

// ============================================================================
// SECTION: Registry Entries
// ============================================================================

/// Attested system-behavior claim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SystemBehaviorClaim {
    /// Stable registry identifier.
    pub system_claim_id: String,
    /// Canonical claim text.
    pub claim_text: String,
    /// Behavior scope label.
    pub scope: String,
    /// Modules enforcing the behavior.
    pub enforced_by: Vec<String>,
    /// Tests attesting the behavior.
    pub evidence: Vec<String>,
    /// Registry entry version.
    pub version: String,
}

/// Builds one registry entry.
fn entry(
    system_claim_id: &str,
    claim_text: &str,
    scope: &str,
    enforced_by: &[&str],
    evidence: &[&str],
) -> SystemBehaviorClaim {
    SystemBehaviorClaim {
        system_claim_id: system_claim_id.to_string(),
        claim_text: claim_text.to_string(),
        scope: scope.to_string(),
        enforced_by: enforced_by.iter().map(ToString::to_string).collect(),
        evidence: evidence.iter().map(ToString::to_string).collect(),
        version: "1.0.0".to_string(),
    }
}

/// Returns the active system-behavior claim registry.
#[must_use]
pub fn active_system_claims() -> Vec<SystemBehaviorClaim> {
    vec![
        entry(
            "SC-001",
            "Unsupported claims are rendered as UNKNOWN or refused by the gate.",
            "enforcement",
            &["trust-gate-core/src/core/claims.rs"],
            &["fail_closed_unknown_lines"],
        ),
        entry(
            "SC-002",
            "The response contract is emitted in a fixed, versioned key order.",
            "boundary",
            &["trust-gate-core/src/core/response.rs"],
            &["contract_key_order_is_fixed"],
        ),
        entry(
            "SC-003",
            "Streaming partial tokens are blocked at the trust boundary.",
            "boundary",
            &["trust-gate-contract/src/boundary.rs"],
            &["stream_request_raises_bypass"],
        ),
        entry(
            "SC-004",
            "Evidence from disallowed jurisdictions cannot support any claim.",
            "sovereignty",
            &["trust-gate-core/src/core/sovereignty.rs"],
            &["jurisdiction_violation_refuses"],
        ),
        entry(
            "SC-005",
            "A global kill switch can halt responses by system, domain, or claim type.",
            "enforcement",
            &["trust-gate-core/src/core/kill_switch.rs"],
            &["kill_switch_refusal"],
        ),
    ]
}

// ============================================================================
// SECTION: Matching
// ============================================================================

/// Minimum token length counted toward registry keyword overlap.
const MATCH_TOKEN_MIN_LEN: usize = 5;
/// Minimum shared-token count for a registry match.
const MATCH_TOKEN_HITS: usize = 3;

/// Extracts lowercase alphanumeric tokens above the match length floor.
fn match_tokens(text: &str) -> BTreeSet<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|token| token.len() >= MATCH_TOKEN_MIN_LEN)
        .map(ToString::to_string)
        .collect()
}

/// Matches a claim against the registry.
///
/// A claim matches when it is a substring of the registry text (either
/// direction) or shares enough long tokens with it.
#[must_use]
pub fn match_system_claim<'a>(
    claim_text: &str,
    system_claims: &'a [SystemBehaviorClaim],
) -> Option<&'a SystemBehaviorClaim> {
    let claim = claim_text.to_lowercase();
    let claim_tokens = match_tokens(claim_text);

    system_claims.iter().find(|candidate| {
        let registered = candidate.claim_text.to_lowercase();
        if registered.contains(&claim) || claim.contains(&registered) {
            return true;
        }
        let shared = claim_tokens
            .intersection(&match_tokens(&candidate.claim_text))
            .count();
        shared >= MATCH_TOKEN_HITS
    })
}
