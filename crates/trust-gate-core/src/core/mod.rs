// trust-gate-core/src/core/mod.rs
// ============================================================================
// Module: Trust Gate Core Types
// Description: Core model modules for the trust-and-evidence gate.
// Purpose: Organize hashing, evidence, claims, policy, and contract shapes.
// Dependencies: crate-internal modules
// ============================================================================

//! ## Overview
//! The core module owns every deterministic building block of the gate:
//! canonical hashing and hash chains, the normalized evidence model,
//! jurisdiction and threat handling, the claim engine, redaction, the policy
//! and risk registries, the kill switch, incident classification, retention,
//! and the fixed-order response contract shapes.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod chain;
pub mod claims;
pub mod evidence;
pub mod hashing;
pub mod identifiers;
pub mod incidents;
pub mod kill_switch;
pub mod policy;
pub mod redaction;
pub mod response;
pub mod retention;
pub mod risk;
pub mod sovereignty;
pub mod system_claims;
pub mod threats;
pub mod time;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use chain::ChainEvent;
pub use chain::EventInput;
pub use chain::GENESIS_HASH;
pub use chain::build_chain;
pub use chain::decode_events_jsonl;
pub use chain::encode_events_jsonl;
pub use chain::validate_chain;
pub use claims::ClaimEnforcement;
pub use claims::ClaimGraphEdge;
pub use claims::ClaimMetrics;
pub use claims::ClaimRecord;
pub use claims::ClaimType;
pub use claims::EvidenceLink;
pub use claims::HallucinationEvent;
pub use claims::HallucinationMode;
pub use claims::Severity;
pub use claims::SystemClaimRef;
pub use claims::VerificationStatus;
pub use claims::enforce_claims;
pub use evidence::DataClassification;
pub use evidence::EvidenceOrigin;
pub use evidence::EvidenceSource;
pub use evidence::Jurisdiction;
pub use evidence::TrustLevel;
pub use evidence::normalize_raw_evidence;
pub use identifiers::PackId;
pub use identifiers::TraceId;
pub use incidents::Incident;
pub use incidents::IncidentSeverity;
pub use incidents::IncidentType;
pub use incidents::classify_incidents;
pub use kill_switch::KillSwitch;
pub use kill_switch::KillSwitchMode;
pub use kill_switch::KillSwitchState;
pub use policy::PolicyChangeLogEntry;
pub use policy::PolicyCheck;
pub use policy::PolicyDefinition;
pub use policy::PolicyInputs;
pub use policy::evaluate_policy_checks;
pub use policy::policy_change_log;
pub use policy::policy_definitions;
pub use policy::policy_versions_map;
pub use redaction::RedactionEvent;
pub use redaction::redact_text;
pub use response::AttributionItem;
pub use response::CONTRACT_KEYS;
pub use response::CONTRACT_VERSION;
pub use response::Citation;
pub use response::ContractError;
pub use response::Decision;
pub use response::DecisionRecord;
pub use response::EvidenceBundleUser;
pub use response::PolicyTraceEntry;
pub use response::TrustEvidenceResponse;
pub use response::assert_contract_shape;
pub use retention::RetentionMetadata;
pub use retention::RetentionPolicy;
pub use risk::ResidualRisk;
pub use risk::active_risks;
pub use risk::bind_applicable_risks;
pub use sovereignty::DEFAULT_ALLOWED_JURISDICTIONS;
pub use sovereignty::JurisdictionOutcome;
pub use sovereignty::JurisdictionRecord;
pub use sovereignty::enforce_jurisdiction;
pub use system_claims::SystemBehaviorClaim;
pub use system_claims::active_system_claims;
pub use system_claims::match_system_claim;
pub use threats::ThreatConfidence;
pub use threats::ThreatSignal;
pub use threats::ThreatType;
pub use threats::apply_threat_containment;
pub use threats::classify_threat_signals;
pub use time::UtcTime;
