// SPDX-License-Identifier: MIT OR Apache-2.0
#![deny(unsafe_code)]
#![warn(missing_docs)]
#![doc = "Unified error taxonomy, partitioned by stage, for the PDA kernel."]

//! Every stage of the kernel (validator, compiler, lease manager, executor)
//! returns its own closed, stage-local error enum so the signature itself
//! documents the exhaustive failure set (see `pda-validate::ValidationError`
//! and friends). This crate supplies the stable [`ErrorCode`] those enums map
//! onto, and [`PdaError`]: the single carrier type used at boundaries that
//! need to report across stages (the CLI, cross-stage glue, logs) without
//! losing the originating code, message, or diagnostic context.

use std::collections::BTreeMap;
use std::error::Error as StdError;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Which pipeline stage a code belongs to.
///
/// `LeaseExpired` is emitted by both the lease manager (at issuance-time
/// window checks) and the executor (at the pre-execution gate); it is
/// categorized under [`ErrorCategory::LeaseManager`] since that is where the
/// expiry window is defined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// DSL validator (spec §4.1, §7).
    Validator,
    /// Blueprint compiler (spec §4.2, §7).
    Compiler,
    /// Lease manager (spec §4.3, §7).
    LeaseManager,
    /// Executor contract, shared across capability families (spec §4.4, §7).
    Executor,
    /// Codes specific to one or more reference executors (spec §4.4.x, §7).
    ExecutorSpecific,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorCategory::Validator => "validator",
            ErrorCategory::Compiler => "compiler",
            ErrorCategory::LeaseManager => "lease_manager",
            ErrorCategory::Executor => "executor",
            ErrorCategory::ExecutorSpecific => "executor_specific",
        };
        f.write_str(s)
    }
}

/// The closed, stable set of machine-readable error codes the kernel can
/// ever produce. Serializes as the literal `SCREAMING_SNAKE_CASE` spelling
/// used on the wire and in spec §7.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // --- Validator ---
    /// Lexing/parsing failed against the grammar.
    SyntaxError,
    /// `subject.type` not in `{USER, SYSTEM}`.
    UnknownSubjectType,
    /// `object.type` not in the closed object-type set.
    UnknownObjectType,
    /// `verb.class` not in `{MUTATE, TRANSFORM, DISSEMINATE}`.
    UnknownVerbClass,
    /// A required block or metadata field is absent.
    MissingRequiredField,
    /// A metadata value failed its closed-set or boolean check.
    InvalidMetadataValue,
    /// `scope` is empty or names more than one scope.
    AmbiguousScope,
    /// An absolute, trust-independent invariant was triggered.
    HardNoViolation,

    // --- Compiler ---
    /// No capability table entry for `(verb.class, object.type, verb.action)`.
    UnknownCapability,
    /// The table entry exists but the action is malformed for it.
    UnsupportedAction,
    /// A required input key has no source value in the AST.
    InvalidBinding,
    /// Compilation failed for a reason not covered by a more specific code.
    CompilationFailure,

    // --- Lease manager ---
    /// The manifest is missing required fields or has an empty `task_id`.
    InvalidManifest,
    /// The lease's or evaluation's time window has elapsed.
    LeaseExpired,
    /// `trust_snapshot.trust_score < trust_snapshot.minimum_required`.
    InsufficientTrust,
    /// `hrc_required = true` but no confirmed HRC token was supplied.
    HrcRequired,
    /// `task_id` appears in the revocation view.
    LeaseRevoked,

    // --- Executor (shared) ---
    /// The lease signature or its binding to the manifest failed to verify.
    InvalidLease,
    /// `manifest.capability_id` is outside the executor's closed set.
    UnsupportedCapability,
    /// The capability-specific effect could not be completed.
    ExecutionFailed,
    /// A host-enforced resource bound was breached.
    ResourceExhausted,

    // --- Executor-specific ---
    /// Search query failed length, UTF-8, or trim validation.
    InvalidQuery,
    /// `target_scope` is not on the static scope allowlist.
    ScopeNotAllowed,
    /// The scope is allowed but currently unavailable to the host.
    ScopeUnavailable,
    /// Navigation/resolution target does not exist.
    TargetNotFound,
    /// Navigation/resolution target exists but is not permitted.
    TargetNotAccessible,
    /// Navigation to the target is blocked (e.g. unsupported URL scheme).
    NavigationBlocked,
}

impl ErrorCode {
    /// The stage this code is reported from.
    pub fn category(&self) -> ErrorCategory {
        use ErrorCode::*;
        match self {
            SyntaxError | UnknownSubjectType | UnknownObjectType | UnknownVerbClass
            | MissingRequiredField | InvalidMetadataValue | AmbiguousScope | HardNoViolation => {
                ErrorCategory::Validator
            }
            UnknownCapability | UnsupportedAction | InvalidBinding | CompilationFailure => {
                ErrorCategory::Compiler
            }
            InvalidManifest | LeaseExpired | InsufficientTrust | HrcRequired | LeaseRevoked => {
                ErrorCategory::LeaseManager
            }
            InvalidLease | UnsupportedCapability | ExecutionFailed | ResourceExhausted => {
                ErrorCategory::Executor
            }
            InvalidQuery | ScopeNotAllowed | ScopeUnavailable | TargetNotFound
            | TargetNotAccessible | NavigationBlocked => ErrorCategory::ExecutorSpecific,
        }
    }

    /// The exact `SCREAMING_SNAKE_CASE` wire spelling.
    pub fn as_str(&self) -> &'static str {
        use ErrorCode::*;
        match self {
            SyntaxError => "SYNTAX_ERROR",
            UnknownSubjectType => "UNKNOWN_SUBJECT_TYPE",
            UnknownObjectType => "UNKNOWN_OBJECT_TYPE",
            UnknownVerbClass => "UNKNOWN_VERB_CLASS",
            MissingRequiredField => "MISSING_REQUIRED_FIELD",
            InvalidMetadataValue => "INVALID_METADATA_VALUE",
            AmbiguousScope => "AMBIGUOUS_SCOPE",
            HardNoViolation => "HARD_NO_VIOLATION",
            UnknownCapability => "UNKNOWN_CAPABILITY",
            UnsupportedAction => "UNSUPPORTED_ACTION",
            InvalidBinding => "INVALID_BINDING",
            CompilationFailure => "COMPILATION_FAILURE",
            InvalidManifest => "INVALID_MANIFEST",
            LeaseExpired => "LEASE_EXPIRED",
            InsufficientTrust => "INSUFFICIENT_TRUST",
            HrcRequired => "HRC_REQUIRED",
            LeaseRevoked => "LEASE_REVOKED",
            InvalidLease => "INVALID_LEASE",
            UnsupportedCapability => "UNSUPPORTED_CAPABILITY",
            ExecutionFailed => "EXECUTION_FAILED",
            ResourceExhausted => "RESOURCE_EXHAUSTED",
            InvalidQuery => "INVALID_QUERY",
            ScopeNotAllowed => "SCOPE_NOT_ALLOWED",
            ScopeUnavailable => "SCOPE_UNAVAILABLE",
            TargetNotFound => "TARGET_NOT_FOUND",
            TargetNotAccessible => "TARGET_NOT_ACCESSIBLE",
            NavigationBlocked => "NAVIGATION_BLOCKED",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Every code the kernel can produce, for exhaustiveness tests and schema
/// generation. Kept in sync with [`ErrorCode`] by the test in this module.
pub const ALL_CODES: &[ErrorCode] = &[
    ErrorCode::SyntaxError,
    ErrorCode::UnknownSubjectType,
    ErrorCode::UnknownObjectType,
    ErrorCode::UnknownVerbClass,
    ErrorCode::MissingRequiredField,
    ErrorCode::InvalidMetadataValue,
    ErrorCode::AmbiguousScope,
    ErrorCode::HardNoViolation,
    ErrorCode::UnknownCapability,
    ErrorCode::UnsupportedAction,
    ErrorCode::InvalidBinding,
    ErrorCode::CompilationFailure,
    ErrorCode::InvalidManifest,
    ErrorCode::LeaseExpired,
    ErrorCode::InsufficientTrust,
    ErrorCode::HrcRequired,
    ErrorCode::LeaseRevoked,
    ErrorCode::InvalidLease,
    ErrorCode::UnsupportedCapability,
    ErrorCode::ExecutionFailed,
    ErrorCode::ResourceExhausted,
    ErrorCode::InvalidQuery,
    ErrorCode::ScopeNotAllowed,
    ErrorCode::ScopeUnavailable,
    ErrorCode::TargetNotFound,
    ErrorCode::TargetNotAccessible,
    ErrorCode::NavigationBlocked,
];

/// The unified error type for boundaries that must report across stages.
///
/// Pure-stage functions do not return this directly; they return their
/// stage-local `thiserror` enum so the closed set for that stage is visible
/// in the function signature. `PdaError` is what those enums convert into
/// when a caller (the CLI, cross-stage glue) needs one carrier type.
pub struct PdaError {
    code: ErrorCode,
    message: String,
    source: Option<Box<dyn StdError + Send + Sync>>,
    context: BTreeMap<String, serde_json::Value>,
}

impl PdaError {
    /// Construct a new error with no source and no context.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            source: None,
            context: BTreeMap::new(),
        }
    }

    /// Attach a diagnostic context key. Later calls with the same key
    /// overwrite earlier ones.
    pub fn with_context(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }

    /// Attach an underlying cause.
    pub fn with_source(mut self, source: impl StdError + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    /// The error code.
    pub fn code(&self) -> ErrorCode {
        self.code
    }

    /// The stage category this error belongs to.
    pub fn category(&self) -> ErrorCategory {
        self.code.category()
    }

    /// The human-readable message.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// The attached diagnostic context.
    pub fn context(&self) -> &BTreeMap<String, serde_json::Value> {
        &self.context
    }
}

impl fmt::Debug for PdaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PdaError")
            .field("code", &self.code)
            .field("message", &self.message)
            .field("context", &self.context)
            .field("source", &self.source.as_ref().map(|s| s.to_string()))
            .finish()
    }
}

impl fmt::Display for PdaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

impl StdError for PdaError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source
            .as_ref()
            .map(|s| s.as_ref() as &(dyn StdError + 'static))
    }
}

/// A serializable snapshot of a [`PdaError`], suitable for wire transport
/// (the `source` chain is flattened into `message` since `dyn Error` is not
/// itself serializable).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PdaErrorDto {
    /// The stable error code.
    pub error_code: ErrorCode,
    /// Human-readable message.
    pub message: String,
    /// Attached diagnostic context.
    #[serde(default)]
    pub context: BTreeMap<String, serde_json::Value>,
}

impl From<&PdaError> for PdaErrorDto {
    fn from(e: &PdaError) -> Self {
        PdaErrorDto {
            error_code: e.code,
            message: e.message.clone(),
            context: e.context.clone(),
        }
    }
}

impl From<PdaError> for PdaErrorDto {
    fn from(e: PdaError) -> Self {
        PdaErrorDto::from(&e)
    }
}
