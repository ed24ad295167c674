// trust-gate-core/src/core/evidence.rs
// ============================================================================
// Module: Trust Gate Evidence Model
// Description: Normalized evidence sources and the raw-item normalizer.
// Purpose: Turn heterogeneous retrieval payloads into closed, trusted shapes.
// Dependencies: crate::core::hashing, serde, serde_json
// ============================================================================

//! ## Overview
//! Retrieval backends hand the gate free-form JSON mappings. Normalization is
//! the only place that lossy mapping happens: everything downstream consumes
//! the closed [`EvidenceSource`] shape. Items without usable snippets are
//! dropped, identifiers are stabilized (including derivation from connector
//! metadata), duplicates are removed, and trust, jurisdiction, classification,
//! and scope fields are defaulted explicitly.
//!
//! Security posture: raw evidence is untrusted input; tool-origin items whose
//! tool is not in the trusted-tool set are forced to the unverified lane.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

use crate::core::hashing::hash_text;

// ============================================================================
// SECTION: Trust Levels
// ============================================================================

/// Evidence trust classification.
///
/// # Invariants
/// - `Primary` is strictly more trusted than `Secondary`, which is strictly
///   more trusted than `Unverified`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TrustLevel {
    /// First-party, verified evidence.
    Primary,
    /// Corroborating evidence requiring a second source for factual support.
    Secondary,
    /// Evidence from untrusted tools or contained threats.
    Unverified,
}

impl TrustLevel {
    /// Parses a raw trust label, case-insensitively.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.to_ascii_uppercase().as_str() {
            "PRIMARY" => Some(Self::Primary),
            "SECONDARY" => Some(Self::Secondary),
            "UNVERIFIED" => Some(Self::Unverified),
            _ => None,
        }
    }

    /// Returns the default confidence weight for this trust level.
    #[must_use]
    pub const fn default_weight(self) -> f64 {
        match self {
            Self::Primary => 0.9,
            Self::Secondary => 0.6,
            Self::Unverified => 0.2,
        }
    }
}

// ============================================================================
// SECTION: Origins
// ============================================================================

/// Origin of an evidence item relative to the deployment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EvidenceOrigin {
    /// Internal first-party corpus.
    Internal,
    /// Customer-supplied content.
    Customer,
    /// External third-party content.
    ThirdParty,
    /// Output of a retrieval or agent tool.
    Tool,
}

impl EvidenceOrigin {
    /// Parses a raw origin label, case-insensitively.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.to_ascii_uppercase().as_str() {
            "INTERNAL" => Some(Self::Internal),
            "CUSTOMER" => Some(Self::Customer),
            "THIRD_PARTY" => Some(Self::ThirdParty),
            "TOOL" => Some(Self::Tool),
            _ => None,
        }
    }
}

// ============================================================================
// SECTION: Jurisdiction & Classification
// ============================================================================

/// Jurisdiction an evidence item is governed by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Jurisdiction {
    /// European Union.
    Eu,
    /// United States.
    Us,
    /// United Kingdom.
    Uk,
    /// Canada.
    Ca,
    /// Jurisdiction not declared by the source.
    Unknown,
}

impl Jurisdiction {
    /// Parses a raw jurisdiction label, case-insensitively.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.to_ascii_uppercase().as_str() {
            "EU" => Some(Self::Eu),
            "US" => Some(Self::Us),
            "UK" => Some(Self::Uk),
            "CA" => Some(Self::Ca),
            "UNKNOWN" => Some(Self::Unknown),
            _ => None,
        }
    }

    /// Returns the canonical uppercase label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Eu => "EU",
            Self::Us => "US",
            Self::Uk => "UK",
            Self::Ca => "CA",
            Self::Unknown => "UNKNOWN",
        }
    }
}

/// Data-handling classification of an evidence item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DataClassification {
    /// Public content.
    Public,
    /// Internal business content.
    Internal,
    /// Confidential content.
    Confidential,
    /// Regulated content subject to sector rules.
    Regulated,
}

impl DataClassification {
    /// Parses a raw classification label, case-insensitively.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.to_ascii_uppercase().as_str() {
            "PUBLIC" => Some(Self::Public),
            "INTERNAL" => Some(Self::Internal),
            "CONFIDENTIAL" => Some(Self::Confidential),
            "REGULATED" => Some(Self::Regulated),
            _ => None,
        }
    }
}

// ============================================================================
// SECTION: Evidence Source
// ============================================================================

/// Default scope set for evidence without explicit scope metadata.
pub const DEFAULT_ALLOWED_SCOPES: [&str; 3] =
    ["response_generation", "retrieval", "enforcement"];

/// Normalized evidence source consumed by the claim engine.
///
/// # Invariants
/// - `snippet` is non-empty after whitespace trim.
/// - `hash` is the SHA-256 of `id|title|snippet` (absent title contributes an
///   empty segment).
/// - `confidence_weight` stays within `[0.0, 1.0]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvidenceSource {
    /// Stable source identifier.
    pub id: String,
    /// Human-readable title when provided.
    pub title: Option<String>,
    /// Source URI or path when provided.
    pub uri: Option<String>,
    /// Evidence text excerpt.
    pub snippet: String,
    /// Optional character offsets into the origin document.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offsets: Option<Value>,
    /// Content hash binding id, title, and snippet.
    pub hash: String,
    /// Trust classification.
    pub trust_level: TrustLevel,
    /// Origin classification.
    pub origin: EvidenceOrigin,
    /// Confidence weight in `[0, 1]`.
    pub confidence_weight: f64,
    /// Governing jurisdiction.
    pub jurisdiction: Jurisdiction,
    /// Data-handling classification.
    pub data_classification: DataClassification,
    /// Scopes this evidence may be used for.
    pub allowed_scopes: Vec<String>,
}

// ============================================================================
// SECTION: Raw Field Access
// ============================================================================

/// Returns a non-empty trimmed string field from a raw item.
fn raw_str(item: &Value, key: &str) -> Option<String> {
    item.get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(ToString::to_string)
}

/// Returns a non-empty string from the item root or its provenance block.
fn raw_str_with_provenance(item: &Value, key: &str) -> Option<String> {
    raw_str(item, key)
        .or_else(|| item.get("provenance").and_then(|prov| raw_str(prov, key)))
}

// ============================================================================
// SECTION: Identifier Derivation
// ============================================================================

/// Resolves the stable identifier for a raw item.
///
/// Preference order: explicit `id`, `document_id`, or `uri`; else a digest of
/// connector metadata; else a positional `source_<n>` identifier.
fn resolve_id(item: &Value, position: usize) -> String {
    for key in ["id", "document_id", "uri"] {
        if let Some(value) = raw_str(item, key) {
            return value;
        }
    }

    let connector_id = raw_str_with_provenance(item, "connector_id");
    let source_identifier = raw_str_with_provenance(item, "source_identifier");
    let uri = raw_str_with_provenance(item, "uri");
    if connector_id.is_some() || source_identifier.is_some() || uri.is_some() {
        let material = format!(
            "{}|{}|{}",
            connector_id.unwrap_or_default(),
            source_identifier.unwrap_or_default(),
            uri.unwrap_or_default()
        );
        let digest = hash_text(&material);
        return format!("derived:{}", &digest[..16]);
    }

    format!("source_{position}")
}

// ============================================================================
// SECTION: Normalization
// ============================================================================

/// Normalizes raw retrieval items into evidence sources.
///
/// Items with empty snippets are dropped; later `(id, hash)` duplicates are
/// dropped; tool-origin items without a trusted `tool_name` are forced to
/// [`TrustLevel::Unverified`].
#[must_use]
pub fn normalize_raw_evidence(
    items: &[Value],
    trusted_tools: &BTreeSet<String>,
) -> Vec<EvidenceSource> {
    let mut sources: Vec<EvidenceSource> = Vec::new();
    let mut seen: BTreeSet<(String, String)> = BTreeSet::new();

    for (index, item) in items.iter().enumerate() {
        let Some(snippet) = raw_str(item, "snippet") else {
            continue;
        };

        let id = resolve_id(item, index + 1);
        let title = raw_str(item, "title");
        let uri = raw_str(item, "uri").or_else(|| raw_str(item, "uri_or_path"));
        let hash = hash_text(&format!(
            "{id}|{}|{snippet}",
            title.clone().unwrap_or_default()
        ));

        if !seen.insert((id.clone(), hash.clone())) {
            continue;
        }

        let origin = raw_str(item, "origin")
            .and_then(|value| EvidenceOrigin::parse(&value))
            .unwrap_or(EvidenceOrigin::ThirdParty);

        let mut trust_level = raw_str(item, "trust_level")
            .and_then(|value| TrustLevel::parse(&value))
            .unwrap_or(TrustLevel::Secondary);
        if origin == EvidenceOrigin::Tool {
            let tool_trusted = raw_str(item, "tool_name")
                .is_some_and(|name| trusted_tools.contains(&name));
            if !tool_trusted {
                trust_level = TrustLevel::Unverified;
            }
        }

        let confidence_weight = item
            .get("confidence_weight")
            .and_then(Value::as_f64)
            .map_or_else(|| trust_level.default_weight(), |value| value.clamp(0.0, 1.0));

        let jurisdiction = raw_str(item, "jurisdiction")
            .and_then(|value| Jurisdiction::parse(&value))
            .unwrap_or(Jurisdiction::Unknown);

        let data_classification = raw_str(item, "data_classification")
            .and_then(|value| DataClassification::parse(&value))
            .unwrap_or(DataClassification::Internal);

        let allowed_scopes = normalize_allowed_scopes(item.get("allowed_scopes"));

        sources.push(EvidenceSource {
            id,
            title,
            uri,
            snippet,
            offsets: item.get("offsets").cloned(),
            hash,
            trust_level,
            origin,
            confidence_weight,
            jurisdiction,
            data_classification,
            allowed_scopes,
        });
    }

    sources
}

/// Normalizes the allowed-scope set, defaulting when absent or malformed.
fn normalize_allowed_scopes(raw: Option<&Value>) -> Vec<String> {
    match raw.and_then(Value::as_array) {
        Some(values) => {
            let scopes: BTreeSet<String> = values
                .iter()
                .filter_map(Value::as_str)
                .map(ToString::to_string)
                .collect();
            scopes.into_iter().collect()
        }
        None => DEFAULT_ALLOWED_SCOPES.iter().map(ToString::to_string).collect(),
    }
}
