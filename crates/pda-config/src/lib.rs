// SPDX-License-Identifier: MIT OR Apache-2.0
#![deny(unsafe_code)]
#![warn(missing_docs)]
//! Static startup configuration for the kernel. Loaded once, immutable
//! thereafter: this crate offers no setters once a [`PdaConfig`] exists.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use pda_canon::TaskIdScheme;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Errors that can occur loading or validating a [`PdaConfig`].
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The requested configuration file was not found.
    #[error("config file not found: {path}")]
    FileNotFound {
        /// Path that was requested.
        path: String,
    },
    /// The file could not be parsed as valid TOML.
    #[error("failed to parse config: {reason}")]
    ParseError {
        /// Detail from the TOML parser.
        reason: String,
    },
    /// One or more structural problems make the configuration unusable.
    #[error("config validation failed: {reasons:?}")]
    ValidationError {
        /// Individual validation failure messages.
        reasons: Vec<String>,
    },
}

/// Advisory-level issues that do not prevent startup but deserve attention.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigWarning {
    /// No credential Hard-No list was configured; the default list applies.
    NoCredentialListConfigured,
    /// No financial-mutation Hard-No list was configured; the default
    /// list applies.
    NoFinancialActionListConfigured,
    /// No URL scheme allowlist was configured; `NAVIGATE_URL` will always
    /// fail `NAVIGATION_BLOCKED`.
    NoUrlSchemeAllowlistConfigured,
}

impl std::fmt::Display for ConfigWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigWarning::NoCredentialListConfigured => {
                write!(f, "no credential_actions/credential_object_prefixes configured; using defaults")
            }
            ConfigWarning::NoFinancialActionListConfigured => {
                write!(f, "no financial_mutation_actions configured; using defaults")
            }
            ConfigWarning::NoUrlSchemeAllowlistConfigured => {
                write!(f, "no url_scheme_allowlist configured; NAVIGATE_URL will always be blocked")
            }
        }
    }
}

/// One entry of the static app allowlist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct AppAllowlistEntry {
    /// The exact `app_id` string accepted by `APP_LAUNCH`/`APP_FOCUS`/`APP_CLOSE`.
    pub app_id: String,
    /// Human-readable display name, never used for matching.
    #[serde(default)]
    pub display_name: Option<String>,
}

/// Where the kernel's signing key material comes from. Never the key
/// itself: this only names the source, resolved at startup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "scheme", rename_all = "snake_case")]
pub enum SecretKeySource {
    /// Read a hex-encoded HMAC secret from the named environment variable.
    Hmac {
        /// Environment variable holding the hex-encoded secret.
        key_env_var: String,
    },
    /// Read a hex-encoded Ed25519 private key from a file on disk.
    Ed25519 {
        /// Path to the hex-encoded 32-byte seed.
        private_key_path: PathBuf,
    },
}

const DEFAULT_CREDENTIAL_ACTIONS: &[&str] =
    &["rotate_credential", "delete_credential", "export_credential", "read_credential"];
const DEFAULT_CREDENTIAL_OBJECT_PREFIXES: &[&str] = &["cred:", "secret:", "token:"];
const DEFAULT_FINANCIAL_MUTATION_ACTIONS: &[&str] =
    &["transfer_funds", "withdraw", "pay_invoice", "wire_transfer"];
const DEFAULT_LEASE_DURATION_MS: u64 = 60_000;

/// Top-level, immutable startup configuration for the kernel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct PdaConfig {
    /// FILE executor confinement roots. Every successful file operation's
    /// path must descend from one of these.
    #[serde(default)]
    pub allowed_base_dirs: Vec<PathBuf>,
    /// MEDIA executor's static device allowlist.
    #[serde(default)]
    pub device_allowlist: Vec<String>,
    /// APP_LAUNCH executor's static app allowlist.
    #[serde(default)]
    pub app_allowlist: Vec<AppAllowlistEntry>,
    /// SEARCH executor's static scope allowlist.
    #[serde(default)]
    pub scope_allowlist: Vec<String>,
    /// Actions that trigger the credential Hard-No regardless of trust.
    #[serde(default)]
    pub credential_actions: Vec<String>,
    /// Object-ID prefixes that trigger the credential Hard-No.
    #[serde(default)]
    pub credential_object_prefixes: Vec<String>,
    /// Actions treated as financial mutations for the HRC Hard-No.
    #[serde(default)]
    pub financial_mutation_actions: Vec<String>,
    /// `task_id` derivation scheme for the compiler.
    #[serde(default)]
    pub task_id_scheme: TaskIdScheme,
    /// Lease validity window, in milliseconds, from issuance.
    #[serde(default = "default_lease_duration_ms")]
    pub lease_duration_ms: u64,
    /// Where the kernel's lease-signing key material is read from. Executors
    /// verify leases against this key's public/shared half; they must never
    /// be handed the key itself.
    pub secret_key_source: SecretKeySource,
    /// Where an executor's own result-signing key material is read from.
    /// Deliberately a distinct source from `secret_key_source`: an executor
    /// that signed results with the kernel's lease key could forge leases
    /// it was only meant to consume.
    pub executor_secret_key_source: SecretKeySource,
    /// URL schemes `NAVIGATE_URL` is permitted to resolve.
    #[serde(default)]
    pub url_scheme_allowlist: Vec<String>,
}

fn default_lease_duration_ms() -> u64 {
    DEFAULT_LEASE_DURATION_MS
}

impl PdaConfig {
    /// The configured credential action list, or the documented default if empty.
    pub fn effective_credential_actions(&self) -> Vec<String> {
        if self.credential_actions.is_empty() {
            DEFAULT_CREDENTIAL_ACTIONS.iter().map(|s| s.to_string()).collect()
        } else {
            self.credential_actions.clone()
        }
    }

    /// The configured credential object-prefix list, or the documented default if empty.
    pub fn effective_credential_object_prefixes(&self) -> Vec<String> {
        if self.credential_object_prefixes.is_empty() {
            DEFAULT_CREDENTIAL_OBJECT_PREFIXES.iter().map(|s| s.to_string()).collect()
        } else {
            self.credential_object_prefixes.clone()
        }
    }

    /// The configured financial-mutation action list, or the documented default if empty.
    pub fn effective_financial_mutation_actions(&self) -> Vec<String> {
        if self.financial_mutation_actions.is_empty() {
            DEFAULT_FINANCIAL_MUTATION_ACTIONS.iter().map(|s| s.to_string()).collect()
        } else {
            self.financial_mutation_actions.clone()
        }
    }
}

/// Load a [`PdaConfig`] from a TOML file on disk.
pub fn load_config(path: &Path) -> Result<PdaConfig, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|_| ConfigError::FileNotFound {
        path: path.display().to_string(),
    })?;
    parse_toml(&content)
}

/// Parse a TOML string into a [`PdaConfig`].
pub fn parse_toml(content: &str) -> Result<PdaConfig, ConfigError> {
    toml::from_str(content).map_err(|e| ConfigError::ParseError {
        reason: e.to_string(),
    })
}

fn check_secret_key_source(source: &SecretKeySource, field: &str, errors: &mut Vec<String>) {
    match source {
        SecretKeySource::Hmac { key_env_var } if key_env_var.trim().is_empty() => {
            errors.push(format!("{field}.key_env_var must not be empty"));
        }
        SecretKeySource::Ed25519 { private_key_path } if private_key_path.as_os_str().is_empty() => {
            errors.push(format!("{field}.private_key_path must not be empty"));
        }
        _ => {}
    }
}

/// Validate a parsed configuration, returning advisory warnings.
///
/// Hard errors (non-absolute base directories, duplicate allowlist
/// entries, an empty `key_env_var`/unreadable `private_key_path` name)
/// come back as [`ConfigError::ValidationError`]; soft issues come back as
/// [`ConfigWarning`]s.
pub fn validate_config(config: &PdaConfig) -> Result<Vec<ConfigWarning>, ConfigError> {
    let mut errors: Vec<String> = Vec::new();
    let mut warnings: Vec<ConfigWarning> = Vec::new();

    for dir in &config.allowed_base_dirs {
        if !dir.is_absolute() {
            errors.push(format!("allowed_base_dirs entry '{}' must be absolute", dir.display()));
        }
    }

    let mut seen_devices = BTreeSet::new();
    for device in &config.device_allowlist {
        if !seen_devices.insert(device) {
            errors.push(format!("device_allowlist contains duplicate entry '{device}'"));
        }
    }

    let mut seen_apps = BTreeSet::new();
    for app in &config.app_allowlist {
        if app.app_id.is_empty() {
            errors.push("app_allowlist entry has an empty app_id".into());
        }
        if !seen_apps.insert(&app.app_id) {
            errors.push(format!("app_allowlist contains duplicate app_id '{}'", app.app_id));
        }
    }

    check_secret_key_source(&config.secret_key_source, "secret_key_source", &mut errors);
    check_secret_key_source(
        &config.executor_secret_key_source,
        "executor_secret_key_source",
        &mut errors,
    );
    if config.secret_key_source == config.executor_secret_key_source {
        errors.push(
            "secret_key_source and executor_secret_key_source must not be the same key; \
             an executor signing results with the kernel's lease key could forge leases"
                .into(),
        );
    }

    if config.lease_duration_ms == 0 {
        errors.push("lease_duration_ms must be greater than zero".into());
    }

    if config.credential_actions.is_empty() && config.credential_object_prefixes.is_empty() {
        warnings.push(ConfigWarning::NoCredentialListConfigured);
    }
    if config.financial_mutation_actions.is_empty() {
        warnings.push(ConfigWarning::NoFinancialActionListConfigured);
    }
    if config.url_scheme_allowlist.is_empty() {
        warnings.push(ConfigWarning::NoUrlSchemeAllowlistConfigured);
    }

    if errors.is_empty() {
        Ok(warnings)
    } else {
        Err(ConfigError::ValidationError { reasons: errors })
    }
}
