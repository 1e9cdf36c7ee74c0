// SPDX-License-Identifier: MIT OR Apache-2.0
#![deny(unsafe_code)]
//! Command-line front end over the four pipeline stages: validate, compile,
//! lease, execute. Each subcommand runs the prefix of the pipeline it needs
//! and prints the resulting JSON value (or a structured error) to stdout.

mod host;

use std::fs;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use pda_executor::{ExecutorRuntime, InMemoryIdempotencyStore, ResourceBudget};
use pda_executors::{AppLaunchExecutor, FileExecutor, MediaExecutor, NavigationExecutor, SearchExecutor};
use pda_lease::{SigningKey, VerificationKey};
use tracing_subscriber::EnvFilter;

use host::{CliAppHost, CliNavigationHost, CliSearchSource};

/// Exit code for pipeline/runtime failures surfaced as structured rejections.
const EXIT_PIPELINE_ERROR: i32 = 1;

#[derive(Parser, Debug)]
#[command(name = "pda", version, about = "Personal Digital Authority kernel CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to the static TOML configuration file.
    #[arg(long, global = true)]
    config: PathBuf,

    /// Enable debug logging.
    #[arg(long, global = true)]
    debug: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Validate a DSL statement and print its AST.
    Validate {
        /// Path to a file containing one DSL statement.
        file: PathBuf,
    },
    /// Validate and compile a DSL statement and print its manifest.
    Compile {
        /// Path to a file containing one DSL statement.
        file: PathBuf,
    },
    /// Validate, compile, and lease a DSL statement.
    Lease {
        /// Path to a file containing one DSL statement.
        file: PathBuf,
        /// Current trust score in [0, 1].
        #[arg(long)]
        trust_score: f64,
        /// Minimum trust score required.
        #[arg(long)]
        minimum_trust: f64,
        /// Current time, milliseconds since epoch.
        #[arg(long)]
        now: i64,
        /// Whether a hardware-rooted confirmation was obtained.
        #[arg(long)]
        hrc_confirmed: bool,
    },
    /// Run the full pipeline through a reference executor.
    Execute {
        /// Path to a file containing one DSL statement.
        file: PathBuf,
        /// Current trust score in [0, 1].
        #[arg(long)]
        trust_score: f64,
        /// Minimum trust score required.
        #[arg(long)]
        minimum_trust: f64,
        /// Current time, milliseconds since epoch.
        #[arg(long)]
        now: i64,
        /// Whether a hardware-rooted confirmation was obtained.
        #[arg(long)]
        hrc_confirmed: bool,
    },
}

fn main() {
    let cli = Cli::parse();

    let filter = if cli.debug {
        EnvFilter::new("pda=debug")
    } else {
        EnvFilter::new("pda=info")
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let result = run(cli);

    if let Err(message) = result {
        eprintln!("error: {message}");
        std::process::exit(EXIT_PIPELINE_ERROR);
    }
}

fn run(cli: Cli) -> Result<(), String> {
    let config = pda_config::load_config(&cli.config).map_err(|e| e.to_string())?;
    pda_config::validate_config(&config).map_err(|e| e.to_string())?;

    match cli.command {
        Commands::Validate { file } => cmd_validate(&file, &config),
        Commands::Compile { file } => cmd_compile(&file, &config),
        Commands::Lease {
            file,
            trust_score,
            minimum_trust,
            now,
            hrc_confirmed,
        } => cmd_lease(&file, &config, trust_score, minimum_trust, now, hrc_confirmed),
        Commands::Execute {
            file,
            trust_score,
            minimum_trust,
            now,
            hrc_confirmed,
        } => cmd_execute(&file, &config, trust_score, minimum_trust, now, hrc_confirmed),
    }
}

fn read_statement(file: &PathBuf) -> Result<String, String> {
    fs::read_to_string(file).map_err(|e| format!("failed to read {}: {e}", file.display()))
}

fn hard_no_policy(config: &pda_config::PdaConfig) -> (Vec<String>, Vec<String>, Vec<String>) {
    (
        config.effective_credential_actions(),
        config.effective_credential_object_prefixes(),
        config.effective_financial_mutation_actions(),
    )
}

fn validate_statement(text: &str, config: &pda_config::PdaConfig) -> Result<pda_types::Ast, String> {
    let (credential_actions, credential_object_prefixes, financial_mutation_actions) = hard_no_policy(config);
    let policy = pda_validate::HardNoPolicy {
        credential_actions: &credential_actions,
        credential_object_prefixes: &credential_object_prefixes,
        financial_mutation_actions: &financial_mutation_actions,
    };
    pda_validate::validate(text, &policy).map_err(|e| format!("{} ({})", e, e.code()))
}

fn cmd_validate(file: &PathBuf, config: &pda_config::PdaConfig) -> Result<(), String> {
    let text = read_statement(file)?;
    let ast = validate_statement(&text, config)?;
    print_json(&ast)
}

fn cmd_compile(file: &PathBuf, config: &pda_config::PdaConfig) -> Result<(), String> {
    let text = read_statement(file)?;
    let ast = validate_statement(&text, config)?;
    let manifest = pda_compile::compile(&ast, config.task_id_scheme).map_err(|e| format!("{} ({})", e, e.code()))?;
    print_json(&manifest)
}

fn load_signing_key_from(source: &pda_config::SecretKeySource) -> Result<SigningKey, String> {
    match source {
        pda_config::SecretKeySource::Hmac { key_env_var } => {
            let hex = std::env::var(key_env_var)
                .map_err(|_| format!("environment variable '{key_env_var}' is not set"))?;
            let secret = decode_hex(&hex)?;
            Ok(SigningKey::Hmac(secret))
        }
        pda_config::SecretKeySource::Ed25519 { private_key_path } => {
            let hex = fs::read_to_string(private_key_path)
                .map_err(|e| format!("failed to read {}: {e}", private_key_path.display()))?;
            let bytes = decode_hex(hex.trim())?;
            let seed: [u8; 32] = bytes
                .try_into()
                .map_err(|_| "Ed25519 private key must be exactly 32 bytes".to_string())?;
            Ok(SigningKey::Ed25519(Box::new(ed25519_dalek::SigningKey::from_bytes(&seed))))
        }
    }
}

/// The kernel's own lease-issuing/verifying key. Never handed to an executor.
fn load_signing_key(config: &pda_config::PdaConfig) -> Result<SigningKey, String> {
    load_signing_key_from(&config.secret_key_source)
}

/// An executor's own result-signing key, distinct from the kernel's lease
/// key so an executor can never forge the leases it consumes.
fn load_executor_signing_key(config: &pda_config::PdaConfig) -> Result<SigningKey, String> {
    load_signing_key_from(&config.executor_secret_key_source)
}

fn verification_key_for(signer: &SigningKey) -> VerificationKey {
    match signer {
        SigningKey::Hmac(secret) => VerificationKey::Hmac(secret.clone()),
        SigningKey::Ed25519(signing_key) => VerificationKey::Ed25519(signing_key.verifying_key()),
    }
}

fn decode_hex(s: &str) -> Result<Vec<u8>, String> {
    if s.len() % 2 != 0 {
        return Err("hex-encoded key must have an even number of characters".to_string());
    }
    (0..s.len())
        .step_by(2)
        .map(|i| u8::from_str_radix(&s[i..i + 2], 16).map_err(|e| e.to_string()))
        .collect()
}

#[allow(clippy::too_many_arguments)]
fn build_lease(
    file: &PathBuf,
    config: &pda_config::PdaConfig,
    trust_score: f64,
    minimum_trust: f64,
    now: i64,
    hrc_confirmed: bool,
) -> Result<(pda_types::TaskManifest, pda_types::LeaseToken, SigningKey), String> {
    let text = read_statement(file)?;
    let ast = validate_statement(&text, config)?;
    let manifest = pda_compile::compile(&ast, config.task_id_scheme).map_err(|e| format!("{} ({})", e, e.code()))?;

    let trust = pda_types::TrustSnapshot {
        trust_score,
        minimum_required: minimum_trust,
    };
    let hrc = hrc_confirmed.then_some(pda_types::HrcToken {
        confirmed: true,
        confirmed_at: now,
    });
    let signer = load_signing_key(config)?;
    let lease = pda_lease::evaluate(
        &manifest,
        &trust,
        now,
        hrc.as_ref(),
        &pda_lease::NoRevocations,
        &signer,
        config.lease_duration_ms as i64,
        None,
    )
    .map_err(|e| format!("{} ({})", e, e.code()))?;

    Ok((manifest, lease, signer))
}

fn cmd_lease(
    file: &PathBuf,
    config: &pda_config::PdaConfig,
    trust_score: f64,
    minimum_trust: f64,
    now: i64,
    hrc_confirmed: bool,
) -> Result<(), String> {
    let (_, lease, _) = build_lease(file, config, trust_score, minimum_trust, now, hrc_confirmed)?;
    print_json(&lease)
}

fn cmd_execute(
    file: &PathBuf,
    config: &pda_config::PdaConfig,
    trust_score: f64,
    minimum_trust: f64,
    now: i64,
    hrc_confirmed: bool,
) -> Result<(), String> {
    let (manifest, lease, kernel_signer) = build_lease(file, config, trust_score, minimum_trust, now, hrc_confirmed)?;
    let vkey = verification_key_for(&kernel_signer);
    // The executor signs its own results with its own key, never the
    // kernel's lease key — it only ever verifies leases with `vkey`.
    let executor_signer = load_executor_signing_key(config)?;
    let budget = ResourceBudget {
        max_wall_clock: std::time::Duration::from_secs(5),
    };

    let result = if manifest.capability_id.starts_with("FILE_") {
        let executor = FileExecutor::new(config.allowed_base_dirs.clone());
        ExecutorRuntime::new(executor, vkey, executor_signer, Box::new(InMemoryIdempotencyStore::default()), budget)
            .execute(&manifest, &lease, now)
    } else if manifest.capability_id.starts_with("MEDIA_") {
        let executor = MediaExecutor::new(config.device_allowlist.clone());
        ExecutorRuntime::new(executor, vkey, executor_signer, Box::new(InMemoryIdempotencyStore::default()), budget)
            .execute(&manifest, &lease, now)
    } else if manifest.capability_id.starts_with("APP_") {
        let app_host = CliAppHost::default();
        let allowlist = config.app_allowlist.iter().map(|a| a.app_id.clone()).collect();
        let executor = AppLaunchExecutor::new(allowlist, &app_host);
        ExecutorRuntime::new(executor, vkey, executor_signer, Box::new(InMemoryIdempotencyStore::default()), budget)
            .execute(&manifest, &lease, now)
    } else if manifest.capability_id.starts_with("NAVIGATE_") {
        let nav_host = CliNavigationHost;
        let executor = NavigationExecutor::new(config.url_scheme_allowlist.clone(), &nav_host);
        ExecutorRuntime::new(executor, vkey, executor_signer, Box::new(InMemoryIdempotencyStore::default()), budget)
            .execute(&manifest, &lease, now)
    } else if manifest.capability_id.starts_with("SEARCH_") {
        let root = config.allowed_base_dirs.first().cloned().unwrap_or_default();
        let source = CliSearchSource::new(root);
        let executor = SearchExecutor::new(config.scope_allowlist.clone(), &source);
        ExecutorRuntime::new(executor, vkey, executor_signer, Box::new(InMemoryIdempotencyStore::default()), budget)
            .execute(&manifest, &lease, now)
    } else {
        return Err(format!("no reference executor registered for capability {}", manifest.capability_id));
    };

    let result = result.map_err(|e| format!("{} ({})", e, e.code()))?;
    print_json(&result)
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<(), String> {
    let json = serde_json::to_string_pretty(value).map_err(|e| e.to_string())?;
    println!("{json}");
    Ok(())
}
