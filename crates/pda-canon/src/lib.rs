// SPDX-License-Identifier: MIT OR Apache-2.0
#![deny(unsafe_code)]
#![warn(missing_docs)]
#![doc = "Canonical JSON serialization, SHA-256 hashing, and task_id derivation."]

//! This is the cross-cutting primitive worth a small, well-tested library:
//! one canonical byte sequence that `task_id`,
//! `provenance.ast_hash`, lease signatures, and result signatures all derive
//! from. Getting it wrong anywhere breaks determinism everywhere.
//!
//! Canonical form: UTF-8, no whitespace, object keys sorted by Unicode
//! code-point order, arrays in source order, booleans as literal
//! `true`/`false`, numbers in minimal decimal form, no derived fields.
//! `serde_json::Value` already stores objects as a `BTreeMap` (this crate
//! does not enable the `preserve_order` feature anywhere in the workspace),
//! so `serde_json::to_string` on a `Value` produced via `to_value` already
//! satisfies the key-ordering requirement; the work this crate does is make
//! that guarantee explicit and give it a name call sites can rely on.

use std::fmt;

use pda_types::Ast;
use serde::Serialize;
use sha2::{Digest, Sha256};
use uuid::Uuid;

/// Failure producing a canonical form or hash.
#[derive(Debug)]
pub enum CanonError {
    /// The value could not be serialized to JSON.
    Serialize(serde_json::Error),
}

impl fmt::Display for CanonError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CanonError::Serialize(e) => write!(f, "canonicalization failed: {e}"),
        }
    }
}

impl std::error::Error for CanonError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CanonError::Serialize(e) => Some(e),
        }
    }
}

impl From<serde_json::Error> for CanonError {
    fn from(e: serde_json::Error) -> Self {
        CanonError::Serialize(e)
    }
}

/// Serialize `value` to its canonical JSON byte form.
///
/// # Errors
///
/// Returns [`CanonError::Serialize`] if `value` cannot be represented as
/// JSON (never the case for any type in this workspace, which are all
/// plain data).
pub fn canonical_json<T: Serialize>(value: &T) -> Result<Vec<u8>, CanonError> {
    let v = serde_json::to_value(value)?;
    Ok(serde_json::to_string(&v)?.into_bytes())
}

/// Hex-encoded SHA-256 of arbitrary bytes.
pub fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

/// Canonicalize and hash an AST in one step; the result is
/// `provenance.ast_hash`, independent of `task_id` scheme.
///
/// # Errors
///
/// Returns [`CanonError::Serialize`] if the AST cannot be canonicalized.
pub fn ast_hash(ast: &Ast) -> Result<String, CanonError> {
    Ok(sha256_hex(&canonical_json(ast)?))
}

/// The two `task_id` derivation schemes this kernel permits. Exactly one
/// is chosen and fixed per deployment (`pda_config::PdaConfig::task_id_scheme`);
/// switching schemes mid-deployment would change every downstream `task_id`.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize, schemars::JsonSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum TaskIdScheme {
    /// `SHA-256(canonical_ast_bytes)` rendered as lower-case hex. The default
    /// used in the literal end-to-end scenarios this kernel is tested against.
    #[default]
    Sha256,
    /// UUID v5 over [`TASK_ID_NAMESPACE`] and the canonical bytes.
    UuidV5,
}

/// Fixed namespace UUID for the `UuidV5` task_id scheme. A constant, not a
/// per-call random value: UUID v4 or any time/random source would make
/// `task_id` derivation non-deterministic.
pub const TASK_ID_NAMESPACE: Uuid = Uuid::from_bytes([
    0x5f, 0x1a, 0x2b, 0x3c, 0x4d, 0x5e, 0x4f, 0x11, 0x8a, 0x22, 0x00, 0x1a, 0x2b, 0x3c, 0x4d, 0x5e,
]);

/// Derive a `task_id` from canonical AST bytes under the configured scheme.
pub fn derive_task_id(scheme: TaskIdScheme, canonical_ast_bytes: &[u8]) -> String {
    match scheme {
        TaskIdScheme::Sha256 => sha256_hex(canonical_ast_bytes),
        TaskIdScheme::UuidV5 => Uuid::new_v5(&TASK_ID_NAMESPACE, canonical_ast_bytes)
            .hyphenated()
            .to_string(),
    }
}

/// Length-prefixed binary encoding used for signature inputs: each field
/// is preceded by its length as a big-endian
/// `u32`, so no delimiter ambiguity is possible between adjacent
/// variable-length fields.
pub fn length_prefixed_concat(fields: &[&[u8]]) -> Vec<u8> {
    let mut out = Vec::new();
    for field in fields {
        out.extend_from_slice(&(field.len() as u32).to_be_bytes());
        out.extend_from_slice(field);
    }
    out
}
