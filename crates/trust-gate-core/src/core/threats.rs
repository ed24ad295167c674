// trust-gate-core/src/core/threats.rs
// ============================================================================
// Module: Trust Gate Threat Classification
// Description: Deterministic prompt-injection and poisoning detection.
// Purpose: Classify threat signals and contain compromised evidence lanes.
// Dependencies: crate::core::evidence, serde
// ============================================================================

//! ## Overview
//! Threat classification is intentionally deterministic: fixed phrase lists
//! over the draft answer and evidence snippets. The residual risk of
//! under-detection is owned by the risk register; the value here is that the
//! same inputs always produce the same signals, so traces replay exactly.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;

use crate::core::evidence::EvidenceSource;
use crate::core::evidence::TrustLevel;

// ============================================================================
// SECTION: Signal Types
// ============================================================================

/// Threat signal classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ThreatType {
    /// Draft answer carries prompt-injection phrasing.
    PromptInjectionAttempt,
    /// Evidence snippets carry poisoning markers.
    EvidencePoisoningSuspected,
}

/// Detection confidence for a threat signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ThreatConfidence {
    /// High-confidence detection.
    High,
    /// Medium-confidence detection.
    Medium,
}

/// Classified threat signal recorded on the decision record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThreatSignal {
    /// Threat classification.
    pub threat_type: ThreatType,
    /// Detection confidence.
    pub confidence: ThreatConfidence,
    /// Matched indicator phrases.
    pub indicators: Vec<String>,
}

// ============================================================================
// SECTION: Indicator Phrases
// ============================================================================

/// Prompt-injection phrases matched against the draft answer.
const INJECTION_PHRASES: [&str; 3] =
    ["ignore previous instructions", "system prompt", "override policy"];

/// Poisoning markers matched against evidence snippets.
const POISONING_MARKERS: [&str; 4] =
    ["jailbreak", "fabricated", "poison", "do not trust policy"];

// ============================================================================
// SECTION: Classification
// ============================================================================

/// Classifies threat signals over the draft answer and accepted evidence.
#[must_use]
pub fn classify_threat_signals(
    draft_answer_text: &str,
    evidence_sources: &[EvidenceSource],
) -> Vec<ThreatSignal> {
    let mut signals = Vec::new();

    let answer = draft_answer_text.to_lowercase();
    let injection_hits: Vec<String> = INJECTION_PHRASES
        .iter()
        .filter(|phrase| answer.contains(*phrase))
        .map(ToString::to_string)
        .collect();
    if !injection_hits.is_empty() {
        signals.push(ThreatSignal {
            threat_type: ThreatType::PromptInjectionAttempt,
            confidence: ThreatConfidence::High,
            indicators: injection_hits,
        });
    }

    let mut poisoning_hits: Vec<String> = Vec::new();
    for source in evidence_sources {
        let snippet = source.snippet.to_lowercase();
        for marker in POISONING_MARKERS {
            if snippet.contains(marker) {
                poisoning_hits.push(marker.to_string());
            }
        }
    }
    if !poisoning_hits.is_empty() {
        let confidence = if poisoning_hits.len() >= 2 {
            ThreatConfidence::High
        } else {
            ThreatConfidence::Medium
        };
        signals.push(ThreatSignal {
            threat_type: ThreatType::EvidencePoisoningSuspected,
            confidence,
            indicators: poisoning_hits,
        });
    }

    signals
}

// ============================================================================
// SECTION: Containment
// ============================================================================

/// Confidence-weight penalty applied while any threat signal is active.
const THREAT_WEIGHT_PENALTY: f64 = 0.3;

/// Applies threat containment to surviving evidence sources.
///
/// Suspected poisoning demotes every source to the unverified lane; any
/// signal reduces confidence weights by the fixed penalty, floored at zero.
#[must_use]
pub fn apply_threat_containment(
    evidence_sources: Vec<EvidenceSource>,
    signals: &[ThreatSignal],
) -> Vec<EvidenceSource> {
    if signals.is_empty() {
        return evidence_sources;
    }

    let poisoning = signals
        .iter()
        .any(|signal| signal.threat_type == ThreatType::EvidencePoisoningSuspected);

    evidence_sources
        .into_iter()
        .map(|mut source| {
            if poisoning {
                source.trust_level = TrustLevel::Unverified;
            }
            source.confidence_weight =
                (source.confidence_weight - THREAT_WEIGHT_PENALTY).max(0.0);
            source
        })
        .collect()
}
