// trust-gate-core/src/core/redaction.rs
// ============================================================================
// Module: Trust Gate PII Redaction
// Description: Regex-based PII masking with per-detector event counts.
// Purpose: Keep PII out of user-facing answers, snippets, and narratives.
// Dependencies: regex, serde
// ============================================================================

//! ## Overview
//! Redaction runs a fixed, ordered detector list over text and substitutes
//! `[REDACTED_<LABEL>]` tokens. Replacement tokens contain no detectable
//! material, so redaction is idempotent. Each detector with at least one hit
//! produces a redaction event carried on the decision record.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::LazyLock;

use regex::Regex;
use serde::Deserialize;
use serde::Serialize;

// ============================================================================
// SECTION: Events
// ============================================================================

/// Per-detector redaction event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RedactionEvent {
    /// Governing policy identifier.
    pub policy_id: String,
    /// Detector label.
    pub detector: String,
    /// Number of substitutions performed.
    pub count: usize,
}

/// Policy identifier stamped on redaction events.
const REDACTION_POLICY_ID: &str = "pii_redaction";

// ============================================================================
// SECTION: Detectors
// ============================================================================

/// A named PII detector.
struct Detector {
    /// Detector label used in events and replacement tokens.
    label: &'static str,
    /// Compiled detection pattern.
    pattern: Regex,
}

/// Ordered detector list: EMAIL, PHONE, NATIONAL_ID, MEDICAL_RECORD.
#[allow(clippy::expect_used, reason = "detector patterns are compile-time constants")]
static DETECTORS: LazyLock<Vec<Detector>> = LazyLock::new(|| {
    let build = |label: &'static str, pattern: &str| Detector {
        label,
        pattern: Regex::new(pattern).expect("detector pattern"),
    };
    vec![
        build("EMAIL", r"[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}"),
        build(
            "PHONE",
            r"(?:\+\d{1,3}[ \-]?)?(?:\(\d{3}\)|\d{3})[ \-]?\d{3}[ \-]?\d{4}",
        ),
        build("NATIONAL_ID", r"\b\d{3}-\d{2}-\d{4}\b"),
        build("MEDICAL_RECORD", r"(?i)\bMRN[-:\s]?\d{6,}\b"),
    ]
});

// ============================================================================
// SECTION: Redaction
// ============================================================================

/// Redacts PII from text, returning the masked text and detector events.
#[must_use]
pub fn redact_text(text: &str) -> (String, Vec<RedactionEvent>) {
    let mut masked = text.to_string();
    let mut events = Vec::new();

    for detector in DETECTORS.iter() {
        let count = detector.pattern.find_iter(&masked).count();
        if count == 0 {
            continue;
        }
        let token = format!("[REDACTED_{}]", detector.label);
        masked = detector.pattern.replace_all(&masked, token.as_str()).into_owned();
        events.push(RedactionEvent {
            policy_id: REDACTION_POLICY_ID.to_string(),
            detector: detector.label.to_string(),
            count,
        });
    }

    (masked, events)
}
