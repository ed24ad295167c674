// trust-gate-config/src/config.rs
// ============================================================================
// Module: Trust Gate Configuration
// Description: Typed settings for the gate, sidecar, and ingest adapter.
// Purpose: Parse an environment snapshot into validated, fail-closed config.
// Dependencies: serde, thiserror, trust-gate-contract, url
// ============================================================================

//! ## Overview
//! Configuration is parsed from a plain string map so hosts decide where the
//! values come from (process env, secret manager, test fixtures). Every
//! section validates fail-closed: a missing JWT secret or a malformed
//! sidecar URL is an error at startup, never a silent fallback at request
//! time. A `postgres` store DSN is recognized but rejected; this build wires
//! the filesystem and `SQLite` backends only.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;
use trust_gate_contract::ControlsConfig;
use trust_gate_contract::TrustMode;
use url::Url;

// ============================================================================
// SECTION: Environment Keys
// ============================================================================

/// Env key enabling the trust layer.
pub const ENV_EVIDENCE_ENABLED: &str = "TRUST_EVIDENCE_ENABLED";
/// Env key selecting the trust mode.
pub const ENV_EVIDENCE_MODE: &str = "TRUST_EVIDENCE_MODE";
/// Env key enabling enforcement on streaming requests.
pub const ENV_ENFORCE_ON_STREAMING: &str = "TRUST_EVIDENCE_ENFORCE_ON_STREAMING";
/// Env key selecting the trace-store backend.
pub const ENV_STORE_BACKEND: &str = "TRUST_STORE_BACKEND";
/// Env key for the filesystem store directory.
pub const ENV_STORE_FILESYSTEM_DIR: &str = "TRUST_STORE_FILESYSTEM_DIR";
/// Env key for the postgres store DSN.
pub const ENV_STORE_POSTGRES_DSN: &str = "TRUST_STORE_POSTGRES_DSN";
/// Env key for retention days.
pub const ENV_RETENTION_DAYS: &str = "TRUST_RETENTION_DAYS";
/// Env key for the JWT issuer.
pub const ENV_JWT_ISSUER: &str = "TRUST_JWT_ISSUER";
/// Env key for the JWT audience.
pub const ENV_JWT_AUDIENCE: &str = "TRUST_JWT_AUDIENCE";
/// Env key for the HS256 verification secret.
pub const ENV_JWT_HS256_SECRET: &str = "TRUST_JWT_HS256_SECRET";
/// Env key for the legacy shared HS256 secret.
pub const ENV_JWT_SECRET: &str = "TRUST_JWT_SECRET";
/// Env key for the RS256 public key (PEM).
pub const ENV_JWT_PUBLIC_KEY: &str = "TRUST_JWT_PUBLIC_KEY";
/// Env key for the sidecar base URL.
pub const ENV_SIDECAR_URL: &str = "TRUST_SIDECAR_URL";
/// Env key for the opaque ingest token.
pub const ENV_INGEST_TOKEN: &str = "TRUST_INGEST_TOKEN";
/// Env key for the ingest batch size.
pub const ENV_INGEST_BATCH_SIZE: &str = "TRUST_INGEST_BATCH_SIZE";
/// Env key for the ingest retry cap.
pub const ENV_INGEST_MAX_RETRIES: &str = "TRUST_INGEST_MAX_RETRIES";
/// Env key for the audit-pack output directory.
pub const ENV_PACKS_DIR: &str = "TRUST_PACKS_DIR";
/// Env key for the sidecar database URL.
pub const ENV_SIDECAR_DATABASE_URL: &str = "SIDECAR_DATABASE_URL";

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Configuration validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A required key is absent.
    #[error("missing required configuration: {0}")]
    Missing(&'static str),
    /// A key holds an unparseable value.
    #[error("invalid configuration value for {key}: {reason}")]
    Invalid {
        /// Offending configuration key.
        key: &'static str,
        /// Parse failure description.
        reason: String,
    },
    /// The configured backend is recognized but not wired in this build.
    #[error("store backend not wired in this build: {0}")]
    UnwiredBackend(String),
}

// ============================================================================
// SECTION: Store Settings
// ============================================================================

/// Trace-store backend selector.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreBackend {
    /// Filesystem JSON artifacts.
    Filesystem,
    /// Relational store behind a postgres DSN (recognized, not wired).
    Postgres,
}

/// Trace-store settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreSettings {
    /// Selected backend.
    pub backend: StoreBackend,
    /// Filesystem store directory.
    pub filesystem_dir: String,
    /// Retention window in days for the sweep.
    pub retention_days: u32,
}

// ============================================================================
// SECTION: JWT Settings
// ============================================================================

/// JWT verification settings for the sidecar surface.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JwtSettings {
    /// Required token issuer.
    pub issuer: String,
    /// Accepted token audience.
    pub audience: String,
    /// HS256 shared secret, when symmetric verification is configured.
    pub hs256_secret: Option<String>,
    /// RS256 public key PEM, when asymmetric verification is configured.
    pub rs256_public_key: Option<String>,
}

impl JwtSettings {
    /// Validates that at least one verification key is configured.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Missing`] when neither key form is present.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.hs256_secret.is_none() && self.rs256_public_key.is_none() {
            return Err(ConfigError::Missing(ENV_JWT_HS256_SECRET));
        }
        Ok(())
    }
}

// ============================================================================
// SECTION: Ingest Settings
// ============================================================================

/// Default ingest batch size.
pub const DEFAULT_INGEST_BATCH_SIZE: usize = 10;
/// Default ingest retry cap.
pub const DEFAULT_INGEST_MAX_RETRIES: u32 = 3;

/// Ingest adapter settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestSettings {
    /// Sidecar base URL receiving event batches.
    pub sidecar_url: String,
    /// Opaque bearer token, when configured.
    pub ingest_token: Option<String>,
    /// HS256 secret for minting short-lived tokens.
    pub jwt_secret: Option<String>,
    /// Buffer flush threshold.
    pub batch_size: usize,
    /// Retry cap for transient failures.
    pub max_retries: u32,
}

impl IngestSettings {
    /// Validates URL shape and credential presence.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the URL is malformed or no credential is
    /// configured.
    pub fn validate(&self) -> Result<(), ConfigError> {
        Url::parse(&self.sidecar_url).map_err(|err| ConfigError::Invalid {
            key: ENV_SIDECAR_URL,
            reason: err.to_string(),
        })?;
        if self.ingest_token.is_none() && self.jwt_secret.is_none() {
            return Err(ConfigError::Missing(ENV_INGEST_TOKEN));
        }
        if self.batch_size == 0 {
            return Err(ConfigError::Invalid {
                key: ENV_INGEST_BATCH_SIZE,
                reason: "batch size must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}

// ============================================================================
// SECTION: Sidecar Settings
// ============================================================================

/// Sidecar service settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SidecarSettings {
    /// Database URL (`sqlite:///path` form).
    pub database_url: String,
    /// Directory receiving built audit packs.
    pub packs_dir: String,
    /// Retention window in days for the sweep.
    pub retention_days: u32,
    /// Reported operating mode for the health endpoint.
    pub mode: TrustMode,
}

impl SidecarSettings {
    /// Resolves the `SQLite` path from the database URL.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::UnwiredBackend`] for postgres URLs.
    pub fn sqlite_path(&self) -> Result<String, ConfigError> {
        if let Some(path) = self.database_url.strip_prefix("sqlite:///") {
            return Ok(path.to_string());
        }
        if self.database_url.starts_with("postgres") {
            return Err(ConfigError::UnwiredBackend("postgres".to_string()));
        }
        Ok(self.database_url.clone())
    }
}

// ============================================================================
// SECTION: Root Config
// ============================================================================

/// Full trust-gate configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrustGateConfig {
    /// Integration controls for the host boundary.
    pub controls: ControlsConfig,
    /// Trace-store settings.
    pub store: StoreSettings,
    /// JWT verification settings.
    pub jwt: JwtSettings,
    /// Ingest adapter settings.
    pub ingest: IngestSettings,
    /// Sidecar service settings.
    pub sidecar: SidecarSettings,
}

impl TrustGateConfig {
    /// Parses configuration from an environment snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] for malformed values; presence validation is
    /// deferred to [`Self::validate`] so observe-only deployments can omit
    /// unused sections.
    pub fn from_env_map(env: &BTreeMap<String, String>) -> Result<Self, ConfigError> {
        let enabled = env_bool(env, ENV_EVIDENCE_ENABLED);
        let mode = env
            .get(ENV_EVIDENCE_MODE)
            .map(|raw| {
                TrustMode::parse(raw).ok_or_else(|| ConfigError::Invalid {
                    key: ENV_EVIDENCE_MODE,
                    reason: format!("unknown mode: {raw}"),
                })
            })
            .transpose()?
            .unwrap_or(TrustMode::Off);

        let backend = match env.get(ENV_STORE_BACKEND).map(String::as_str) {
            None | Some("filesystem") => StoreBackend::Filesystem,
            Some("postgres") => StoreBackend::Postgres,
            Some(other) => {
                return Err(ConfigError::Invalid {
                    key: ENV_STORE_BACKEND,
                    reason: format!("unknown backend: {other}"),
                });
            }
        };

        Ok(Self {
            controls: ControlsConfig {
                enabled,
                mode,
                enforce_on_streaming: env_bool(env, ENV_ENFORCE_ON_STREAMING),
            },
            store: StoreSettings {
                backend,
                filesystem_dir: env
                    .get(ENV_STORE_FILESYSTEM_DIR)
                    .cloned()
                    .unwrap_or_else(|| ".trust_evidence".to_string()),
                retention_days: env_u32(env, ENV_RETENTION_DAYS, 30)?,
            },
            jwt: JwtSettings {
                issuer: env.get(ENV_JWT_ISSUER).cloned().unwrap_or_default(),
                audience: env.get(ENV_JWT_AUDIENCE).cloned().unwrap_or_default(),
                hs256_secret: env
                    .get(ENV_JWT_HS256_SECRET)
                    .or_else(|| env.get(ENV_JWT_SECRET))
                    .cloned(),
                rs256_public_key: env.get(ENV_JWT_PUBLIC_KEY).cloned(),
            },
            ingest: IngestSettings {
                sidecar_url: env.get(ENV_SIDECAR_URL).cloned().unwrap_or_default(),
                ingest_token: env.get(ENV_INGEST_TOKEN).cloned(),
                jwt_secret: env.get(ENV_JWT_SECRET).cloned(),
                batch_size: env_usize(env, ENV_INGEST_BATCH_SIZE, DEFAULT_INGEST_BATCH_SIZE)?
                    .max(1),
                max_retries: env_u32(env, ENV_INGEST_MAX_RETRIES, DEFAULT_INGEST_MAX_RETRIES)?,
            },
            sidecar: SidecarSettings {
                database_url: env
                    .get(ENV_SIDECAR_DATABASE_URL)
                    .cloned()
                    .unwrap_or_else(|| "sqlite:///trust_evidence_sidecar.db".to_string()),
                packs_dir: env
                    .get(ENV_PACKS_DIR)
                    .cloned()
                    .unwrap_or_else(|| ".trust_packs".to_string()),
                retention_days: env_u32(env, ENV_RETENTION_DAYS, 30)?,
                mode,
            },
        })
    }

    /// Validates the sections required by an enforcing deployment.
    ///
    /// # Errors
    ///
    /// Returns the first [`ConfigError`] encountered.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.store.backend == StoreBackend::Postgres {
            return Err(ConfigError::UnwiredBackend("postgres".to_string()));
        }
        if self.jwt.issuer.is_empty() {
            return Err(ConfigError::Missing(ENV_JWT_ISSUER));
        }
        if self.jwt.audience.is_empty() {
            return Err(ConfigError::Missing(ENV_JWT_AUDIENCE));
        }
        self.jwt.validate()?;
        self.ingest.validate()?;
        self.sidecar.sqlite_path().map(|_| ())
    }
}

// ============================================================================
// SECTION: Parse Helpers
// ============================================================================

/// Truthy value set accepted for boolean keys.
const TRUTHY: [&str; 4] = ["1", "true", "yes", "on"];

/// Parses a boolean key, defaulting to false.
fn env_bool(env: &BTreeMap<String, String>, key: &str) -> bool {
    env.get(key)
        .map(|raw| TRUTHY.contains(&raw.trim().to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

/// Parses an unsigned integer key with a default.
fn env_u32(
    env: &BTreeMap<String, String>,
    key: &'static str,
    default: u32,
) -> Result<u32, ConfigError> {
    env.get(key)
        .map(|raw| {
            raw.trim().parse::<u32>().map_err(|err| ConfigError::Invalid {
                key,
                reason: err.to_string(),
            })
        })
        .transpose()
        .map(|value| value.unwrap_or(default))
}

/// Parses a usize key with a default.
fn env_usize(
    env: &BTreeMap<String, String>,
    key: &'static str,
    default: usize,
) -> Result<usize, ConfigError> {
    env.get(key)
        .map(|raw| {
            raw.trim().parse::<usize>().map_err(|err| ConfigError::Invalid {
                key,
                reason: err.to_string(),
            })
        })
        .transpose()
        .map(|value| value.unwrap_or(default))
}
