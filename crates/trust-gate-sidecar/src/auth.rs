// trust-gate-sidecar/src/auth.rs
// ============================================================================
// Module: Sidecar JWT Authentication
// Description: Bearer-token verification and scope enforcement.
// Purpose: Fail-closed authn/authz for every non-health endpoint.
// Dependencies: jsonwebtoken, serde, serde_json, time
// ============================================================================

//! ## Overview
//! The sidecar accepts HS256 or RS256 bearer tokens. Verification requires a
//! matching issuer, an audience match (string equality or array membership),
//! a valid signature, and an unexpired `exp` when present. Scopes are read
//! from `scope` (space-separated), `scopes` (array), or `roles` (array).
//! All checks fail closed with 401/403 semantics.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;

use jsonwebtoken::Algorithm;
use jsonwebtoken::DecodingKey;
use jsonwebtoken::Validation;
use jsonwebtoken::decode;
use jsonwebtoken::decode_header;
use serde::Deserialize;
use serde_json::Value;
use time::OffsetDateTime;

use trust_gate_config::JwtSettings;

use crate::error::ApiError;

// ============================================================================
// SECTION: Scopes
// ============================================================================

/// Scope required to ingest events.
pub const SCOPE_INGEST: &str = "trust:ingest";
/// Scope required to read traces.
pub const SCOPE_READ: &str = "trust:read";
/// Scope required to export audit packs.
pub const SCOPE_EXPORT: &str = "trust:export";
/// Scope required for admin actions.
pub const SCOPE_ADMIN: &str = "trust:admin";

// ============================================================================
// SECTION: Claims
// ============================================================================

/// Decoded token claims consulted by the sidecar.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenClaims {
    /// Token issuer.
    pub iss: Option<String>,
    /// Token audience (string or array).
    pub aud: Option<Value>,
    /// Expiry as Unix seconds, when present.
    pub exp: Option<i64>,
    /// Subject identifier.
    pub sub: Option<String>,
    /// Space-separated scope string.
    pub scope: Option<String>,
    /// Scope array.
    pub scopes: Option<Vec<String>>,
    /// Role array.
    pub roles: Option<Vec<String>>,
}

impl TokenClaims {
    /// Returns the union of scopes from all recognized claim forms.
    #[must_use]
    pub fn scope_set(&self) -> BTreeSet<String> {
        let mut set = BTreeSet::new();
        if let Some(scope) = &self.scope {
            set.extend(scope.split_whitespace().map(ToString::to_string));
        }
        if let Some(scopes) = &self.scopes {
            set.extend(scopes.iter().cloned());
        }
        if let Some(roles) = &self.roles {
            set.extend(roles.iter().cloned());
        }
        set
    }
}

// ============================================================================
// SECTION: Verifier
// ============================================================================

/// JWT verifier over the configured issuer, audience, and keys.
pub struct JwtVerifier {
    /// Required issuer.
    issuer: String,
    /// Accepted audience.
    audience: String,
    /// HS256 verification key, when configured.
    hs256: Option<DecodingKey>,
    /// RS256 verification key, when configured.
    rs256: Option<DecodingKey>,
}

impl JwtVerifier {
    /// Builds a verifier from JWT settings.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Unauthorized`] when an RS256 key fails to parse;
    /// key-material problems must never fall back to accepting tokens.
    pub fn from_settings(settings: &JwtSettings) -> Result<Self, ApiError> {
        let hs256 = settings
            .hs256_secret
            .as_ref()
            .map(|secret| DecodingKey::from_secret(secret.as_bytes()));
        let rs256 = settings
            .rs256_public_key
            .as_ref()
            .map(|pem| {
                DecodingKey::from_rsa_pem(pem.as_bytes())
                    .map_err(|err| ApiError::Unauthorized(format!("invalid RS256 key: {err}")))
            })
            .transpose()?;
        Ok(Self {
            issuer: settings.issuer.clone(),
            audience: settings.audience.clone(),
            hs256,
            rs256,
        })
    }

    /// Verifies a bearer `Authorization` header and returns the claims.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Unauthorized`] for missing, malformed, expired,
    /// or invalid-signature tokens.
    pub fn verify_bearer(&self, authorization: Option<&str>) -> Result<TokenClaims, ApiError> {
        let header_value = authorization
            .ok_or_else(|| ApiError::Unauthorized("Missing bearer token".to_string()))?;
        let token = header_value
            .strip_prefix("Bearer ")
            .ok_or_else(|| ApiError::Unauthorized("Missing bearer token".to_string()))?;

        let header = decode_header(token)
            .map_err(|_| ApiError::Unauthorized("Malformed JWT".to_string()))?;
        let key = match header.alg {
            Algorithm::HS256 => self.hs256.as_ref(),
            Algorithm::RS256 => self.rs256.as_ref(),
            _ => {
                return Err(ApiError::Unauthorized("Unsupported JWT algorithm".to_string()));
            }
        }
        .ok_or_else(|| ApiError::Unauthorized("JWT trust configuration missing".to_string()))?;

        let mut validation = Validation::new(header.alg);
        validation.validate_exp = false;
        validation.validate_aud = false;
        validation.required_spec_claims.clear();

        let decoded = decode::<TokenClaims>(token, key, &validation)
            .map_err(|_| ApiError::Unauthorized("Invalid JWT signature".to_string()))?;
        let claims = decoded.claims;

        if claims.iss.as_deref() != Some(self.issuer.as_str()) {
            return Err(ApiError::Unauthorized("Invalid JWT issuer".to_string()));
        }
        if !audience_matches(claims.aud.as_ref(), &self.audience) {
            return Err(ApiError::Unauthorized("Invalid JWT audience".to_string()));
        }
        if let Some(exp) = claims.exp {
            if exp < OffsetDateTime::now_utc().unix_timestamp() {
                return Err(ApiError::Unauthorized("JWT expired".to_string()));
            }
        }

        Ok(claims)
    }
}

/// Checks audience equality or membership.
fn audience_matches(aud: Option<&Value>, audience: &str) -> bool {
    match aud {
        Some(Value::String(value)) => value == audience,
        Some(Value::Array(values)) => values
            .iter()
            .any(|value| value.as_str() == Some(audience)),
        _ => false,
    }
}

// ============================================================================
// SECTION: Scope Enforcement
// ============================================================================

/// Requires a single scope on the claims.
///
/// # Errors
///
/// Returns [`ApiError::Forbidden`] when the scope is absent.
pub fn require_scope(claims: &TokenClaims, required: &str) -> Result<(), ApiError> {
    if claims.scope_set().contains(required) {
        Ok(())
    } else {
        Err(ApiError::Forbidden("Missing required scope".to_string()))
    }
}

/// Requires any of the listed scopes on the claims.
///
/// # Errors
///
/// Returns [`ApiError::Forbidden`] when none of the scopes is present.
pub fn require_any_scope(claims: &TokenClaims, required: &[&str]) -> Result<(), ApiError> {
    let scopes = claims.scope_set();
    if required.iter().any(|scope| scopes.contains(*scope)) {
        Ok(())
    } else {
        Err(ApiError::Forbidden("Missing required scope".to_string()))
    }
}
