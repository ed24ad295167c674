// trust-gate-core/src/core/claims.rs
// ============================================================================
// Module: Trust Gate Claim Engine
// Description: Claim decomposition, classification, and lexical verification.
// Purpose: Decide per-claim verdicts against normalized evidence.
// Dependencies: crate::core::{evidence, system_claims}, regex, serde
// ============================================================================

//! ## Overview
//! The claim engine splits a draft answer into sentences, classifies each as
//! factual, derived, interpretive, or system, and verifies it against the
//! contained evidence set. Matching is a documented lexical heuristic
//! (substring or keyword overlap), not semantic entailment: the verdict must
//! be deterministic and replayable from stored inputs. Unsupported claims are
//! rewritten as `UNKNOWN:` lines and recorded as suppression events.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;
use std::sync::LazyLock;

use regex::Regex;
use serde::Deserialize;
use serde::Serialize;

use crate::core::evidence::EvidenceSource;
use crate::core::evidence::TrustLevel;
use crate::core::system_claims::SystemBehaviorClaim;
use crate::core::system_claims::match_system_claim;

// ============================================================================
// SECTION: Claim Types
// ============================================================================

/// Classification of an asserted claim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ClaimType {
    /// Plain factual assertion requiring evidence.
    Factual,
    /// Conclusion derived from earlier supported claims.
    Derived,
    /// Hedged or interpretive assertion.
    Interpretive,
    /// Claim about the system's own behavior.
    System,
}

impl ClaimType {
    /// Returns the canonical uppercase label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Factual => "FACTUAL",
            Self::Derived => "DERIVED",
            Self::Interpretive => "INTERPRETIVE",
            Self::System => "SYSTEM",
        }
    }
}

/// Per-claim verification verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VerificationStatus {
    /// Claim is fully supported.
    Supported,
    /// Claim is partially supported and emitted with a `PARTIAL:` prefix.
    Partial,
    /// Claim is unsupported and emitted as an `UNKNOWN:` line.
    Unsupported,
}

/// Reason an unsupported or partial claim was flagged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HallucinationMode {
    /// No evidence matched the claim at all.
    NoEvidence,
    /// Evidence contradicts the claim.
    Contradicted,
    /// Matches exist but do not meet the trust bar.
    OutOfScope,
    /// Only untrusted tool evidence matched.
    ToolUntrusted,
}

impl HallucinationMode {
    /// Returns the canonical uppercase label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::NoEvidence => "NO_EVIDENCE",
            Self::Contradicted => "CONTRADICTED",
            Self::OutOfScope => "OUT_OF_SCOPE",
            Self::ToolUntrusted => "TOOL_UNTRUSTED",
        }
    }
}

/// Suppression-event severity by claim type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Severity {
    /// Factual or system claim suppressed.
    High,
    /// Derived claim suppressed.
    Medium,
    /// Interpretive claim suppressed.
    Low,
}

// ============================================================================
// SECTION: Claim Records
// ============================================================================

/// Verified claim entry on the decision record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClaimRecord {
    /// Claim identifier (`claim_<n>`).
    pub claim_id: String,
    /// Claim sentence text.
    pub claim_text: String,
    /// Claim classification.
    pub claim_type: ClaimType,
    /// False only for conversational openers.
    pub evidence_required: bool,
    /// Verification verdict.
    pub verification_status: VerificationStatus,
}

/// Derivation edge between a derived claim and a supporting parent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClaimGraphEdge {
    /// Derived claim identifier.
    pub claim_id: String,
    /// Parent claim identifier.
    pub derived_from: String,
}

/// Link between a claim and an evidence source that matched it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvidenceLink {
    /// Claim identifier.
    pub claim_id: String,
    /// Evidence source identifier.
    pub source_id: String,
}

/// Reference from a verified SYSTEM claim to its registry entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SystemClaimRef {
    /// Claim identifier.
    pub claim_id: String,
    /// Registry entry identifier.
    pub system_claim_id: String,
}

/// Suppression event emitted for flagged claims.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HallucinationEvent {
    /// Event type label (`HALLUCINATION_SUPPRESSED`).
    pub event_type: String,
    /// Event severity derived from the claim type.
    pub severity: Severity,
    /// Flagged claim identifier.
    pub claim_id: String,
    /// Flag reason.
    pub mode: HallucinationMode,
}

/// Aggregate claim metrics for a gated turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClaimMetrics {
    /// Total claims extracted from the draft.
    pub num_claims_total: usize,
    /// Claims with an unsupported verdict.
    pub num_claims_unsupported: usize,
    /// Unsupported share rounded to four decimals.
    pub pct_suppressed: f64,
}

/// Full output of claim enforcement over a draft answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClaimEnforcement {
    /// Enforced answer with per-claim prefixes applied.
    pub enforced_answer: String,
    /// Verified claim records in draft order.
    pub claims: Vec<ClaimRecord>,
    /// Claim-to-source evidence links.
    pub evidence_links: Vec<EvidenceLink>,
    /// Derivation edges for derived claims.
    pub claim_graph: Vec<ClaimGraphEdge>,
    /// Deduplicated, sorted failure-mode labels.
    pub failure_modes: Vec<String>,
    /// Suppression events for flagged claims.
    pub hallucination_events: Vec<HallucinationEvent>,
    /// Aggregate metrics.
    pub metrics: ClaimMetrics,
    /// SYSTEM-claim registry references.
    pub system_claim_refs: Vec<SystemClaimRef>,
}

// ============================================================================
// SECTION: Marker Lists
// ============================================================================

/// Prefixes marking a conversational opener (no evidence required).
const CONVERSATIONAL_PREFIXES: [&str; 6] =
    ["hi", "hello", "thanks", "thank you", "you're welcome", "how can i help"];

/// Markers classifying an interpretive claim.
const INTERPRETIVE_MARKERS: [&str; 7] =
    ["suggests", "likely", "recommend", "appears", "possibly", "probably", "seems"];

/// Markers classifying a system claim.
const SYSTEM_MARKERS: [&str; 7] =
    ["system", "policy", "tool", "capability", "gate", "unknown", "response contract"];

/// Prefixes classifying a derived claim.
const DERIVED_PREFIXES: [&str; 7] =
    ["therefore", "thus", "hence", "as a result", "this means", "so ", "based on"];

/// Minimum keyword-overlap hits for a lexical match.
const MINIMUM_KEYWORD_HITS: usize = 1;
/// Minimum token length counted as a keyword.
const KEYWORD_MIN_LEN: usize = 4;

/// Alphanumeric token extractor shared by keyword matching.
#[allow(clippy::expect_used, reason = "pattern is a compile-time constant")]
static WORD_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new("[A-Za-z0-9]+").expect("word pattern"));

// ============================================================================
// SECTION: Splitting & Classification
// ============================================================================

/// Splits a draft answer into claim sentences.
///
/// Sentences end at terminal punctuation followed by whitespace, or at
/// newlines. Falls back to the whole trimmed draft when nothing splits.
#[must_use]
pub fn split_claims(answer_text: &str) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut chars = answer_text.chars().peekable();

    while let Some(c) = chars.next() {
        if c == '\n' {
            push_chunk(&mut chunks, &mut current);
            continue;
        }
        current.push(c);
        if matches!(c, '.' | '!' | '?') && chars.peek().is_some_and(|next| next.is_whitespace()) {
            push_chunk(&mut chunks, &mut current);
        }
    }
    push_chunk(&mut chunks, &mut current);

    if chunks.is_empty() {
        let trimmed = answer_text.trim();
        if !trimmed.is_empty() {
            chunks.push(trimmed.to_string());
        }
    }
    chunks
}

/// Pushes a trimmed non-empty chunk and clears the accumulator.
fn push_chunk(chunks: &mut Vec<String>, current: &mut String) {
    let trimmed = current.trim();
    if !trimmed.is_empty() {
        chunks.push(trimmed.to_string());
    }
    current.clear();
}

/// Returns true when a claim is a conversational opener.
#[must_use]
pub fn is_conversational_claim(claim: &str) -> bool {
    let lowered = claim.trim().to_lowercase();
    CONVERSATIONAL_PREFIXES.iter().any(|prefix| lowered.starts_with(prefix))
}

/// Classifies a claim sentence; first matching rule wins.
#[must_use]
pub fn classify_claim_type(claim_text: &str) -> ClaimType {
    let lowered = claim_text.trim().to_lowercase();
    if DERIVED_PREFIXES.iter().any(|prefix| lowered.starts_with(prefix)) {
        return ClaimType::Derived;
    }
    if INTERPRETIVE_MARKERS.iter().any(|marker| lowered.contains(marker)) {
        return ClaimType::Interpretive;
    }
    if SYSTEM_MARKERS.iter().any(|marker| lowered.contains(marker)) {
        return ClaimType::System;
    }
    ClaimType::Factual
}

// ============================================================================
// SECTION: Lexical Matching
// ============================================================================

/// Extracts lowercase keywords of at least the minimum length.
fn keywords(text: &str) -> BTreeSet<String> {
    WORD_RE
        .find_iter(text)
        .map(|token| token.as_str().to_lowercase())
        .filter(|token| token.len() >= KEYWORD_MIN_LEN)
        .collect()
}

/// Returns true when exactly one side carries an embedded negation token.
fn check_contradiction(claim_text: &str, snippet: &str) -> bool {
    let claim_negated = claim_text.to_lowercase().contains(" not ");
    let snippet_negated = snippet.to_lowercase().contains(" not ");
    claim_negated != snippet_negated
}

/// Finds evidence sources lexically matching a claim.
///
/// A source matches when the lowercased claim is a substring of its snippet,
/// or when the keyword overlap reaches the minimum hit count. Returns the
/// matches plus a contradiction flag.
fn find_lexical_matches<'a>(
    claim_text: &str,
    evidence_sources: &'a [EvidenceSource],
) -> (Vec<&'a EvidenceSource>, bool) {
    let claim_lower = claim_text.to_lowercase();
    let claim_keywords = keywords(claim_text);
    let mut matches = Vec::new();
    let mut contradicted = false;

    for source in evidence_sources {
        let snippet_lower = source.snippet.to_lowercase();
        if snippet_lower.contains(&claim_lower) {
            matches.push(source);
            contradicted = contradicted || check_contradiction(claim_text, &source.snippet);
            continue;
        }
        if !claim_keywords.is_empty() {
            let overlap = claim_keywords.intersection(&keywords(&snippet_lower)).count();
            if overlap >= MINIMUM_KEYWORD_HITS {
                matches.push(source);
                contradicted = contradicted || check_contradiction(claim_text, &source.snippet);
            }
        }
    }

    (matches, contradicted)
}

// ============================================================================
// SECTION: Per-Type Verification
// ============================================================================

/// Verifies a factual claim against its lexical matches.
fn verification_for_factual(
    matches: &[&EvidenceSource],
) -> (VerificationStatus, Option<HallucinationMode>) {
    let primary = matches.iter().filter(|m| m.trust_level == TrustLevel::Primary).count();
    let secondary = matches.iter().filter(|m| m.trust_level == TrustLevel::Secondary).count();
    if primary > 0 || secondary >= 2 {
        return (VerificationStatus::Supported, None);
    }
    if !matches.is_empty()
        && matches.iter().all(|m| m.trust_level == TrustLevel::Unverified)
    {
        return (VerificationStatus::Unsupported, Some(HallucinationMode::ToolUntrusted));
    }
    if !matches.is_empty() {
        return (VerificationStatus::Unsupported, Some(HallucinationMode::OutOfScope));
    }
    (VerificationStatus::Unsupported, Some(HallucinationMode::NoEvidence))
}

/// Verifies an interpretive claim against its lexical matches.
fn verification_for_interpretive(
    matches: &[&EvidenceSource],
) -> (VerificationStatus, Option<HallucinationMode>) {
    if matches.is_empty() {
        return (VerificationStatus::Unsupported, Some(HallucinationMode::NoEvidence));
    }
    let trusted = matches.iter().any(|m| {
        matches!(m.trust_level, TrustLevel::Primary | TrustLevel::Secondary)
    });
    if trusted {
        (VerificationStatus::Partial, None)
    } else {
        (VerificationStatus::Partial, Some(HallucinationMode::ToolUntrusted))
    }
}

/// Returns the suppression severity for a claim type.
const fn severity_for(claim_type: ClaimType) -> Severity {
    match claim_type {
        ClaimType::Factual | ClaimType::System => Severity::High,
        ClaimType::Derived => Severity::Medium,
        ClaimType::Interpretive => Severity::Low,
    }
}

// ============================================================================
// SECTION: Enforcement
// ============================================================================

/// Failure mode recorded per unsupported claim.
const MODE_UNSUPPORTED_CLAIM: &str = "unsupported_claim";
/// Failure mode recorded when the evidence list is empty.
const MODE_NO_SUPPORTING_EVIDENCE: &str = "no_supporting_evidence_found";
/// Failure mode recorded for an empty draft.
const MODE_EMPTY_DRAFT: &str = "empty_draft_answer";
/// Sentinel answer emitted for an empty draft.
const EMPTY_DRAFT_ANSWER: &str = "UNKNOWN: no answer content generated.";
/// Event type label for suppression events.
const EVENT_HALLUCINATION_SUPPRESSED: &str = "HALLUCINATION_SUPPRESSED";

/// Rounds a ratio to four decimal places.
fn round4(value: f64) -> f64 {
    (value * 10_000.0).round() / 10_000.0
}

/// Enforces per-claim verification over a draft answer.
///
/// Supported claims pass through verbatim, partial claims gain a `PARTIAL:`
/// prefix, and unsupported claims become `UNKNOWN:` lines. Failure modes are
/// deduplicated and sorted.
#[must_use]
pub fn enforce_claims(
    draft_answer_text: &str,
    evidence_sources: &[EvidenceSource],
    system_claims: &[SystemBehaviorClaim],
) -> ClaimEnforcement {
    let claim_texts = split_claims(draft_answer_text);

    if claim_texts.is_empty() {
        return ClaimEnforcement {
            enforced_answer: EMPTY_DRAFT_ANSWER.to_string(),
            claims: Vec::new(),
            evidence_links: Vec::new(),
            claim_graph: Vec::new(),
            failure_modes: vec![MODE_EMPTY_DRAFT.to_string()],
            hallucination_events: Vec::new(),
            metrics: ClaimMetrics {
                num_claims_total: 0,
                num_claims_unsupported: 0,
                pct_suppressed: 0.0,
            },
            system_claim_refs: Vec::new(),
        };
    }

    let mut output_lines = Vec::new();
    let mut claims = Vec::new();
    let mut evidence_links = Vec::new();
    let mut claim_graph = Vec::new();
    let mut failure_modes: BTreeSet<String> = BTreeSet::new();
    let mut hallucination_events = Vec::new();
    let mut system_claim_refs = Vec::new();
    let mut supported_claim_ids: Vec<String> = Vec::new();

    for (index, claim_text) in claim_texts.iter().enumerate() {
        let claim_id = format!("claim_{}", index + 1);
        let claim_type = classify_claim_type(claim_text);
        let evidence_required = !is_conversational_claim(claim_text);

        let (matches, contradicted) = find_lexical_matches(claim_text, evidence_sources);
        let source_ids: Vec<String> = matches.iter().map(|m| m.id.clone()).collect();

        let (mut verification_status, mut hallucination_mode) = match claim_type {
            ClaimType::System => match match_system_claim(claim_text, system_claims) {
                Some(matched) => {
                    system_claim_refs.push(SystemClaimRef {
                        claim_id: claim_id.clone(),
                        system_claim_id: matched.system_claim_id.clone(),
                    });
                    (VerificationStatus::Supported, None)
                }
                None => (VerificationStatus::Unsupported, Some(HallucinationMode::OutOfScope)),
            },
            ClaimType::Interpretive => verification_for_interpretive(&matches),
            ClaimType::Derived => {
                let parents: Vec<String> =
                    supported_claim_ids.iter().rev().take(2).rev().cloned().collect();
                for parent in &parents {
                    claim_graph.push(ClaimGraphEdge {
                        claim_id: claim_id.clone(),
                        derived_from: parent.clone(),
                    });
                }
                if parents.is_empty() {
                    (VerificationStatus::Unsupported, Some(HallucinationMode::OutOfScope))
                } else {
                    (VerificationStatus::Supported, None)
                }
            }
            ClaimType::Factual => verification_for_factual(&matches),
        };

        if contradicted && verification_status != VerificationStatus::Supported {
            hallucination_mode = Some(HallucinationMode::Contradicted);
        }

        if !evidence_required {
            verification_status = VerificationStatus::Supported;
            hallucination_mode = None;
        }

        match verification_status {
            VerificationStatus::Supported => {
                output_lines.push(claim_text.clone());
                supported_claim_ids.push(claim_id.clone());
            }
            VerificationStatus::Partial => {
                output_lines.push(format!("PARTIAL: {claim_text}"));
                supported_claim_ids.push(claim_id.clone());
            }
            VerificationStatus::Unsupported => {
                output_lines.push(format!("UNKNOWN: {claim_text}"));
                failure_modes.insert(MODE_UNSUPPORTED_CLAIM.to_string());
            }
        }

        if let Some(mode) = hallucination_mode {
            failure_modes.insert(mode.as_str().to_string());
            hallucination_events.push(HallucinationEvent {
                event_type: EVENT_HALLUCINATION_SUPPRESSED.to_string(),
                severity: severity_for(claim_type),
                claim_id: claim_id.clone(),
                mode,
            });
        }

        claims.push(ClaimRecord {
            claim_id: claim_id.clone(),
            claim_text: claim_text.clone(),
            claim_type,
            evidence_required,
            verification_status,
        });

        for source_id in source_ids {
            evidence_links.push(EvidenceLink {
                claim_id: claim_id.clone(),
                source_id,
            });
        }
    }

    if evidence_sources.is_empty() {
        failure_modes.insert(MODE_NO_SUPPORTING_EVIDENCE.to_string());
    }

    let total = claims.len();
    let unsupported = claims
        .iter()
        .filter(|claim| claim.verification_status == VerificationStatus::Unsupported)
        .count();
    let pct_suppressed = if total == 0 {
        0.0
    } else {
        round4(unsupported as f64 / total as f64)
    };

    ClaimEnforcement {
        enforced_answer: output_lines.join("\n"),
        claims,
        evidence_links,
        claim_graph,
        failure_modes: failure_modes.into_iter().collect(),
        hallucination_events,
        metrics: ClaimMetrics {
            num_claims_total: total,
            num_claims_unsupported: unsupported,
            pct_suppressed,
        },
        system_claim_refs,
    }
}
