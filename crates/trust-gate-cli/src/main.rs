#![cfg_attr(
    test,
    allow(
        clippy::panic,
        clippy::print_stdout,
        clippy::print_stderr,
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::use_debug,
        clippy::dbg_macro,
        clippy::panic_in_result_fn,
        clippy::unwrap_in_result,
        reason = "Test-only output and panic-based assertions are permitted."
    )
)]
// trust-gate-cli/src/main.rs
// ============================================================================
// Module: Trust Gate CLI Entry Point
// Description: Command dispatcher for export, replay, serving, and retention.
// Purpose: Provide the administrative surface over stores and the sidecar.
// Dependencies: clap, trust-gate-audit, trust-gate-core, trust-gate-sidecar
// ============================================================================

//! ## Overview
//! The CLI drives the offline workflows: audit-pack export, trace replay,
//! policy-bundle validation, gate dry runs against fixtures, the sidecar
//! server, the retention sweep, and legal-hold administration. Every command
//! exits zero on success and prints a single-line error otherwise.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::io;
use std::io::Write;
use std::net::SocketAddr;
use std::path::Path;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Args;
use clap::Parser;
use clap::Subcommand;
use clap::ValueEnum;
use serde_json::Value;
use thiserror::Error;

use trust_gate_audit::AuditPackExporter;
use trust_gate_config::TrustGateConfig;
use trust_gate_core::GateContext;
use trust_gate_core::GateDependencies;
use trust_gate_core::KillSwitch;
use trust_gate_core::TrustEvidenceGate;
use trust_gate_core::default_trusted_tools;
use trust_gate_core::replay;
use trust_gate_core::time::UtcTime;
use trust_gate_sidecar::AppState;
use trust_gate_sidecar::JwtVerifier;
use trust_gate_sidecar::SidecarStore;
use trust_gate_sidecar::StderrAuditSink;
use trust_gate_store_fs::LegalHoldFileStore;
use trust_gate_store_fs::TraceFileStore;

// ============================================================================
// SECTION: CLI Types
// ============================================================================

/// Top-level CLI definition.
#[derive(Parser, Debug)]
#[command(name = "trust-gate", arg_required_else_help = true)]
struct Cli {
    /// Selected subcommand to execute.
    #[command(subcommand)]
    command: Commands,
}

/// Supported CLI subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Export the audit pack for a stored trace.
    Export(ExportCommand),
    /// Replay a stored trace and report equivalence.
    Replay(ReplayCommand),
    /// Validate a policy bundle file.
    ValidatePolicy(ValidatePolicyCommand),
    /// Run the gate against a JSON fixture.
    DryRun(DryRunCommand),
    /// Serve the evidence sidecar.
    Serve(ServeCommand),
    /// Run the sidecar retention sweep once.
    RetentionRun,
    /// Set or clear the legal hold on a sidecar trace.
    LegalHold(LegalHoldCommand),
}

/// Arguments for the `export` command.
#[derive(Args, Debug)]
struct ExportCommand {
    /// Trace identifier to export.
    #[arg(long)]
    trace_id: String,
    /// Trace store directory override.
    #[arg(long)]
    store_dir: Option<PathBuf>,
    /// Output directory override for the pack.
    #[arg(long)]
    out_dir: Option<PathBuf>,
}

/// Arguments for the `replay` command.
#[derive(Args, Debug)]
struct ReplayCommand {
    /// Trace identifier to replay.
    #[arg(long)]
    trace_id: String,
    /// Trace store directory override.
    #[arg(long)]
    store_dir: Option<PathBuf>,
}

/// Arguments for the `validate-policy` command.
#[derive(Args, Debug)]
struct ValidatePolicyCommand {
    /// Policy bundle path (JSON or YAML).
    bundle: PathBuf,
}

/// Arguments for the `dry-run` command.
#[derive(Args, Debug)]
struct DryRunCommand {
    /// Fixture path with draft, evidence, and context.
    #[arg(long)]
    input: PathBuf,
    /// Policy bundle validated before the run.
    #[arg(long)]
    policy: PathBuf,
}

/// Arguments for the `serve` command.
#[derive(Args, Debug)]
struct ServeCommand {
    /// Listen address for the sidecar.
    #[arg(long, default_value = "127.0.0.1:8085")]
    addr: SocketAddr,
}

/// Legal-hold toggle values.
#[derive(Debug, Clone, Copy, ValueEnum)]
enum HoldState {
    /// Enable the hold.
    On,
    /// Clear the hold.
    Off,
}

/// Arguments for the `legal-hold` command.
#[derive(Args, Debug)]
struct LegalHoldCommand {
    /// Trace identifier to modify.
    #[arg(long)]
    trace_id: String,
    /// Desired hold state.
    #[arg(value_enum)]
    state: HoldState,
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// CLI-level errors printed as a single line.
#[derive(Debug, Error)]
enum CliError {
    /// Configuration parsing or validation failed.
    #[error("config error: {0}")]
    Config(String),
    /// File reading or parsing failed.
    #[error("input error: {0}")]
    Input(String),
    /// A command operation failed.
    #[error("{0}")]
    Operation(String),
}

// ============================================================================
// SECTION: Entry Point
// ============================================================================

/// Process entry point.
fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            let mut stderr = io::stderr().lock();
            let _ = writeln!(stderr, "trust-gate: {err}");
            ExitCode::FAILURE
        }
    }
}

/// Dispatches the parsed command.
fn run(cli: Cli) -> Result<(), CliError> {
    match cli.command {
        Commands::Export(args) => run_export(&args),
        Commands::Replay(args) => run_replay(&args),
        Commands::ValidatePolicy(args) => run_validate_policy(&args.bundle),
        Commands::DryRun(args) => run_dry_run(&args),
        Commands::Serve(args) => run_serve(&args),
        Commands::RetentionRun => run_retention(),
        Commands::LegalHold(args) => run_legal_hold(&args),
    }
}

/// Loads configuration from the process environment.
fn load_config() -> Result<TrustGateConfig, CliError> {
    let env: BTreeMap<String, String> = std::env::vars().collect();
    TrustGateConfig::from_env_map(&env).map_err(|err| CliError::Config(err.to_string()))
}

/// Writes one line to stdout.
fn emit(line: &str) -> Result<(), CliError> {
    let mut stdout = io::stdout().lock();
    writeln!(stdout, "{line}").map_err(|err| CliError::Operation(err.to_string()))
}

// ============================================================================
// SECTION: Commands
// ============================================================================

/// Runs the audit-pack export.
fn run_export(args: &ExportCommand) -> Result<(), CliError> {
    let config = load_config()?;
    let store_dir = args
        .store_dir
        .clone()
        .unwrap_or_else(|| PathBuf::from(&config.store.filesystem_dir));
    let out_dir = args.out_dir.clone().unwrap_or_else(|| store_dir.clone());

    let store = Arc::new(
        TraceFileStore::new(&store_dir).map_err(|err| CliError::Operation(err.to_string()))?,
    );
    let holds = Arc::new(
        LegalHoldFileStore::new(store_dir.join("legal_hold"))
            .map_err(|err| CliError::Operation(err.to_string()))?,
    );
    let exporter = AuditPackExporter::new(store, holds, out_dir);
    let zip_path = exporter
        .export_audit_pack(&args.trace_id)
        .map_err(|err| CliError::Operation(err.to_string()))?;
    emit(&zip_path.display().to_string())
}

/// Runs trace replay and prints the report.
fn run_replay(args: &ReplayCommand) -> Result<(), CliError> {
    let config = load_config()?;
    let store_dir = args
        .store_dir
        .clone()
        .unwrap_or_else(|| PathBuf::from(&config.store.filesystem_dir));
    let store =
        TraceFileStore::new(&store_dir).map_err(|err| CliError::Operation(err.to_string()))?;

    let report = replay(&args.trace_id, &store, &default_trusted_tools())
        .map_err(|err| CliError::Operation(err.to_string()))?;
    let rendered = serde_json::to_string_pretty(&report)
        .map_err(|err| CliError::Operation(err.to_string()))?;
    emit(&rendered)
}

/// Validates a policy bundle file.
fn run_validate_policy(bundle_path: &Path) -> Result<(), CliError> {
    let bundle = load_structured(bundle_path)?;
    validate_policy_bundle(&bundle)?;
    emit("bundle valid")
}

/// Runs the gate against a fixture after validating the policy bundle.
fn run_dry_run(args: &DryRunCommand) -> Result<(), CliError> {
    let bundle = load_structured(&args.policy)?;
    validate_policy_bundle(&bundle)?;

    let fixture = load_structured(&args.input)?;
    let draft = fixture
        .get("draft_answer_text")
        .and_then(Value::as_str)
        .unwrap_or_default();
    let evidence = fixture
        .get("retrieved_evidence")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();
    let context: GateContext = fixture
        .get("context")
        .cloned()
        .map(serde_json::from_value)
        .transpose()
        .map_err(|err| CliError::Input(err.to_string()))?
        .unwrap_or_default();

    let config = load_config()?;
    let store_dir = PathBuf::from(&config.store.filesystem_dir);
    let gate = TrustEvidenceGate::new(GateDependencies {
        trace_store: Arc::new(
            TraceFileStore::new(&store_dir)
                .map_err(|err| CliError::Operation(err.to_string()))?,
        ),
        legal_hold_store: Arc::new(
            LegalHoldFileStore::new(store_dir.join("legal_hold"))
                .map_err(|err| CliError::Operation(err.to_string()))?,
        ),
        kill_switch: Arc::new(KillSwitch::new()),
        trusted_tools: default_trusted_tools(),
    });

    let response = gate
        .gate_response(draft, &evidence, &context)
        .map_err(|err| CliError::Operation(err.to_string()))?;
    let payload = response
        .to_ordered_value()
        .map_err(|err| CliError::Operation(err.to_string()))?;
    let rendered = serde_json::to_string_pretty(&payload)
        .map_err(|err| CliError::Operation(err.to_string()))?;
    emit(&rendered)
}

/// Serves the sidecar until interrupted.
fn run_serve(args: &ServeCommand) -> Result<(), CliError> {
    let config = load_config()?;
    config.validate().map_err(|err| CliError::Config(err.to_string()))?;
    let state = sidecar_state(&config)?;

    let runtime = tokio::runtime::Runtime::new()
        .map_err(|err| CliError::Operation(err.to_string()))?;
    runtime
        .block_on(trust_gate_sidecar::serve(args.addr, state))
        .map_err(|err| CliError::Operation(err.to_string()))
}

/// Runs one retention sweep against the sidecar store.
fn run_retention() -> Result<(), CliError> {
    let config = load_config()?;
    let store = sidecar_store(&config)?;
    let report = store
        .run_retention(config.sidecar.retention_days, UtcTime::now())
        .map_err(|err| CliError::Operation(err.to_string()))?;
    let rendered = serde_json::to_string(&report)
        .map_err(|err| CliError::Operation(err.to_string()))?;
    emit(&rendered)
}

/// Sets or clears a legal hold in the sidecar store.
fn run_legal_hold(args: &LegalHoldCommand) -> Result<(), CliError> {
    let config = load_config()?;
    let store = sidecar_store(&config)?;
    let enabled = matches!(args.state, HoldState::On);
    store
        .set_legal_hold(&args.trace_id, enabled)
        .map_err(|err| CliError::Operation(err.to_string()))?;
    emit(&format!("trace_id={} legal_hold={enabled}", args.trace_id))
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Opens the sidecar store from configuration.
fn sidecar_store(config: &TrustGateConfig) -> Result<SidecarStore, CliError> {
    let path = config
        .sidecar
        .sqlite_path()
        .map_err(|err| CliError::Config(err.to_string()))?;
    SidecarStore::open(path).map_err(|err| CliError::Operation(err.to_string()))
}

/// Builds the sidecar application state from configuration.
fn sidecar_state(config: &TrustGateConfig) -> Result<AppState, CliError> {
    let store = Arc::new(sidecar_store(config)?);
    let verifier = Arc::new(
        JwtVerifier::from_settings(&config.jwt)
            .map_err(|err| CliError::Config(err.to_string()))?,
    );
    Ok(AppState {
        store,
        verifier,
        settings: config.sidecar.clone(),
        audit: Arc::new(StderrAuditSink),
    })
}

/// Loads a JSON or YAML document from disk.
fn load_structured(path: &Path) -> Result<Value, CliError> {
    let text =
        std::fs::read_to_string(path).map_err(|err| CliError::Input(err.to_string()))?;
    let is_yaml = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| matches!(ext.to_ascii_lowercase().as_str(), "yaml" | "yml"));
    if is_yaml {
        serde_yaml::from_str(&text).map_err(|err| CliError::Input(err.to_string()))
    } else {
        serde_json::from_str(&text).map_err(|err| CliError::Input(err.to_string()))
    }
}

/// Validates the shape of a policy bundle document.
fn validate_policy_bundle(bundle: &Value) -> Result<(), CliError> {
    let Some(object) = bundle.as_object() else {
        return Err(CliError::Input("bundle must be an object".to_string()));
    };
    if !object.contains_key("bundle_version") || !object.contains_key("policies") {
        return Err(CliError::Input(
            "invalid bundle: missing bundle_version or policies".to_string(),
        ));
    }
    let Some(policies) = object.get("policies").and_then(Value::as_array) else {
        return Err(CliError::Input("invalid bundle: policies must be an array".to_string()));
    };
    for policy in policies {
        let Some(entry) = policy.as_object() else {
            return Err(CliError::Input("invalid policy entry".to_string()));
        };
        for field in ["policy_id", "version", "description"] {
            if !entry.contains_key(field) {
                return Err(CliError::Input(format!("invalid policy entry missing {field}")));
            }
        }
    }
    Ok(())
}

// ============================================================================
// SECTION: Tests
// ============================================================================
