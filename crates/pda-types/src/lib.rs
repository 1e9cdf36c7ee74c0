// SPDX-License-Identifier: MIT OR Apache-2.0
#![deny(unsafe_code)]
#![warn(missing_docs)]
#![doc = "Closed-world data model shared by every stage of the kernel."]

//! Every entity here is immutable once constructed and owned by its producer
//! until handed to the next stage. There is no shared mutable state: the
//! validator produces an [`Ast`], the compiler turns that into a
//! [`TaskManifest`], the lease manager turns a manifest into a [`LeaseToken`],
//! and an executor turns a manifest plus a lease into an [`ExecutionResult`].
//!
//! All enumerated sets are exhaustive by construction: unknown string values
//! never deserialize into one of these types, they simply fail to parse.

use std::collections::BTreeMap;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Identity of the party issuing a statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
pub enum SubjectType {
    /// A human principal.
    #[serde(rename = "USER")]
    User,
    /// The system acting on its own behalf (e.g. a scheduled housekeeping task).
    #[serde(rename = "SYSTEM")]
    System,
}

/// The broad class of side effect a verb produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
pub enum VerbClass {
    /// Changes state (moves, copies, deletes, launches, closes...).
    #[serde(rename = "MUTATE")]
    Mutate,
    /// Reads and reshapes data without external effect (media control, search).
    #[serde(rename = "TRANSFORM")]
    Transform,
    /// Surfaces something to the user (navigation, focus).
    #[serde(rename = "DISSEMINATE")]
    Disseminate,
}

/// The kind of thing a verb acts upon.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
pub enum ObjectType {
    /// A single regular file.
    #[serde(rename = "FILE")]
    File,
    /// A directory subtree.
    #[serde(rename = "FOLDER")]
    Folder,
    /// An email message or thread.
    #[serde(rename = "EMAIL")]
    Email,
    /// A structured dataset.
    #[serde(rename = "DATASET")]
    Dataset,
    /// A physical or logical device (media player, app surface).
    #[serde(rename = "DEVICE")]
    Device,
}

/// Closed sensitivity tiers assigned to a statement's metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema)]
pub enum Sensitivity {
    /// No special handling required.
    #[serde(rename = "LOW")]
    Low,
    /// Worth a confirmation prompt upstream, not gated by the kernel alone.
    #[serde(rename = "MEDIUM")]
    Medium,
    /// Gated: combined with `hrc_required = false` on a financial mutation,
    /// this is a Hard-No.
    #[serde(rename = "HIGH")]
    High,
}

/// The `SUBJECT(type, id)` block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Subject {
    /// Closed subject type.
    #[serde(rename = "type")]
    pub subject_type: SubjectType,
    /// Opaque identifier with no embedded whitespace or free text.
    pub id: String,
}

/// The `VERB(class, action)` block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Verb {
    /// Closed verb class.
    pub class: VerbClass,
    /// Action name: letters, digits, `_`, `-` only.
    pub action: String,
}

/// The `OBJECT(type, id[, secondary_id])` block.
///
/// `secondary_id` is not part of the base three-field `OBJECT` production;
/// it is populated only when the DSL's `OBJECT` production
/// supplies a third comma-separated component, letting capabilities that
/// need two identifiers (`FILE_MOVE`'s destination, `MEDIA_SEEK`'s position)
/// carry the second value without inventing a fifth top-level block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Object {
    /// Closed object type.
    #[serde(rename = "type")]
    pub object_type: ObjectType,
    /// Primary identifier.
    pub id: String,
    /// Optional secondary identifier, present only when the statement
    /// supplied a third `OBJECT` component.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secondary_id: Option<String>,
}

/// The `META(scope, reversible, sensitivity, hrc_required)` block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Metadata {
    /// Non-empty, unambiguous scope identifier (no comma-separated multi-scopes).
    pub scope: String,
    /// Whether the effect can be undone.
    pub reversible: bool,
    /// Closed sensitivity tier.
    pub sensitivity: Sensitivity,
    /// Whether hardware-rooted confirmation is required before granting a lease.
    pub hrc_required: bool,
}

/// The typed, normalized tree produced by the validator.
///
/// Field order here is for ergonomics only; canonical serialization (see
/// `pda_canon`) always sorts object keys independent of struct field order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Ast {
    /// Who is asking.
    pub subject: Subject,
    /// What class of action, and which one.
    pub verb: Verb,
    /// What is being acted upon.
    pub object: Object,
    /// Constraints and sensitivity classification.
    pub metadata: Metadata,
}

/// The four metadata fields, copied byte-for-byte into a compiled manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Constraints {
    /// Copied verbatim from `Metadata::scope`.
    pub scope: String,
    /// Copied verbatim from `Metadata::reversible`.
    pub reversible: bool,
    /// Copied verbatim from `Metadata::sensitivity`.
    pub sensitivity: Sensitivity,
    /// Copied verbatim from `Metadata::hrc_required`.
    pub hrc_required: bool,
}

/// Hash provenance attached to a compiled manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Provenance {
    /// Hex SHA-256 of the canonical AST bytes, independent of `task_id` scheme.
    pub ast_hash: String,
}

/// The compiled, immutable description of what will execute and under what
/// constraints. Produced once by the compiler; consumed by the lease manager
/// and the executor; never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct TaskManifest {
    /// Deterministic fingerprint of the canonical AST.
    pub task_id: String,
    /// Resolved capability identifier from the closed capability table.
    pub capability_id: String,
    /// Identifier name to verbatim AST value, per the capability's schema.
    pub inputs: BTreeMap<String, String>,
    /// The four metadata fields, copied verbatim.
    pub constraints: Constraints,
    /// Hash provenance.
    pub provenance: Provenance,
}

/// Read-only input to the lease manager: the caller's current trust posture.
///
/// The lease manager never writes back to this; it is a snapshot taken at
/// the instant of evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct TrustSnapshot {
    /// Current trust score.
    pub trust_score: f64,
    /// Minimum score required to grant a lease for this manifest.
    pub minimum_required: f64,
}

/// Optional hardware-rooted confirmation evidence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct HrcToken {
    /// Whether the physical device acknowledged the action.
    pub confirmed: bool,
    /// Millisecond-resolution UTC timestamp of confirmation.
    pub confirmed_at: i64,
}

/// A cryptographically verifiable, time-bounded execution authorization for
/// exactly one `task_id`. Non-transferable; inert outside
/// `[issued_at, expires_at)` regardless of signature validity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct LeaseToken {
    /// The manifest this lease authorizes, and only that manifest.
    pub task_id: String,
    /// Millisecond UTC timestamp the lease was issued.
    pub issued_at: i64,
    /// Millisecond UTC timestamp after which the lease is inert.
    pub expires_at: i64,
    /// Hex-encoded signature over `task_id || issued_at || expires_at`.
    pub signature: String,
}

/// Terminal status of an execution attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExecutionStatus {
    /// The effect was applied (or, for idempotent replay, previously was).
    Success,
    /// The effect was not applied.
    Failure,
}

/// A structured failure reported by an executor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ExecutionError {
    /// Stable machine-readable code from the executor's closed error set.
    pub error_code: String,
    /// Human-readable detail. Never parsed by callers.
    pub message: String,
}

/// The product of an executor invocation.
///
/// `output` and `error` are mutually exclusive on presence: exactly one is
/// `Some` depending on `status`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ExecutionResult {
    /// The manifest this result belongs to.
    pub task_id: String,
    /// The capability that was invoked.
    pub capability_id: String,
    /// SUCCESS or FAILURE.
    pub status: ExecutionStatus,
    /// Present iff `status == Success`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<serde_json::Value>,
    /// Present iff `status == Failure`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ExecutionError>,
    /// Hex-encoded signature over
    /// `task_id || capability_id || status || canonical(output|error)`.
    pub signature: String,
}

impl ExecutionResult {
    /// `true` exactly when `output` and `error` presence matches `status`.
    pub fn is_well_formed(&self) -> bool {
        match self.status {
            ExecutionStatus::Success => self.output.is_some() && self.error.is_none(),
            ExecutionStatus::Failure => self.output.is_none() && self.error.is_some(),
        }
    }
}
