// trust-gate-core/src/core/hashing.rs
// ============================================================================
// Module: Trust Gate Canonical Hashing
// Description: RFC 8785 JSON canonicalization and content hashing utilities.
// Purpose: Provide deterministic hashes for responses, contexts, and events.
// Dependencies: serde, serde_jcs, sha2
// ============================================================================

//! ## Overview
//! Trust Gate hashes all canonical JSON using RFC 8785 (JCS) to guarantee
//! stable, replayable digests. Raw text and file bytes are hashed directly.
//! Every stored hash in a trace record or audit manifest is produced by this
//! module so an external auditor can recompute it offline.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;
use sha2::Digest;
use sha2::Sha256;
use thiserror::Error;

// ============================================================================
// SECTION: Algorithm Labels
// ============================================================================

/// Stable label for the digest algorithm used across the workspace.
pub const HASH_ALGO: &str = "sha256";
/// Stable label for the canonical JSON encoding.
pub const CANONICAL_JSON_ALGO: &str = "json_sort_keys_utf8_compact_v1";
/// Stable label for the event hash-chain construction.
pub const HASH_CHAIN_ALGO: &str = "prev_hash_plus_canonical_event_v1";

/// Algorithm version block embedded in audit-pack manifests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlgoVersions {
    /// Digest algorithm label.
    pub hash_algo: String,
    /// Canonical JSON encoding label.
    pub canonical_json_algo: String,
    /// Hash-chain construction label.
    pub hash_chain_algo: String,
}

impl Default for AlgoVersions {
    fn default() -> Self {
        Self {
            hash_algo: HASH_ALGO.to_string(),
            canonical_json_algo: CANONICAL_JSON_ALGO.to_string(),
            hash_chain_algo: HASH_CHAIN_ALGO.to_string(),
        }
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Errors raised when computing canonical hashes.
#[derive(Debug, Error)]
pub enum HashError {
    /// JSON canonicalization failed.
    #[error("failed to canonicalize json: {0}")]
    Canonicalization(String),
}

// ============================================================================
// SECTION: Hashing Helpers
// ============================================================================

/// Returns canonical JSON bytes for a serializable value using RFC 8785.
///
/// # Errors
///
/// Returns [`HashError::Canonicalization`] when serialization fails.
pub fn canonical_json_bytes<T: Serialize + ?Sized>(value: &T) -> Result<Vec<u8>, HashError> {
    serde_jcs::to_vec(value).map_err(|err| HashError::Canonicalization(err.to_string()))
}

/// Hashes the canonical JSON encoding of a serializable value.
///
/// # Errors
///
/// Returns [`HashError::Canonicalization`] when serialization fails.
pub fn hash_canonical_json<T: Serialize + ?Sized>(value: &T) -> Result<String, HashError> {
    let bytes = canonical_json_bytes(value)?;
    Ok(hash_bytes(&bytes))
}

/// Hashes raw bytes and returns the lowercase hex digest.
#[must_use]
pub fn hash_bytes(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex_encode(&hasher.finalize())
}

/// Hashes UTF-8 text and returns the lowercase hex digest.
#[must_use]
pub fn hash_text(text: &str) -> String {
    hash_bytes(text.as_bytes())
}

// ============================================================================
// SECTION: Hex Encoding
// ============================================================================

/// Encodes bytes as a lowercase hex string.
fn hex_encode(bytes: &[u8]) -> String {
    const HEX: &[u8; 16] = b"0123456789abcdef";
    let mut out = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        out.push(HEX[(byte >> 4) as usize] as char);
        out.push(HEX[(byte & 0x0f) as usize] as char);
    }
    out
}
