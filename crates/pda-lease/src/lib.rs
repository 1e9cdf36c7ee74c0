// SPDX-License-Identifier: MIT OR Apache-2.0
#![deny(unsafe_code)]
#![warn(missing_docs)]
#![doc = "The lease manager: issues and verifies cryptographically signed execution authority."]

//! `evaluate(...)` is pure: no I/O, no retries, no trust inference, no
//! manifest mutation. Revocation and trust are consumed as read-only
//! snapshots; the manager never writes back to either.

use ed25519_dalek::{Signer, Verifier};
use hmac::{Hmac, Mac};
use pda_canon::length_prefixed_concat;
use pda_error::ErrorCode;
use pda_types::{HrcToken, LeaseToken, TaskManifest, TrustSnapshot};
use sha2::Sha256;

/// The closed, stage-local failure set of the lease manager.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LeaseError {
    /// Required manifest fields are absent or `task_id` is empty.
    #[error("invalid manifest: {reason}")]
    InvalidManifest {
        /// Detail.
        reason: String,
    },
    /// The caller-supplied expected expiry has already elapsed.
    #[error("lease window expired")]
    LeaseExpired,
    /// `trust_snapshot.trust_score < trust_snapshot.minimum_required`.
    #[error("insufficient trust: {trust_score} < {minimum_required}")]
    InsufficientTrust {
        /// Observed score.
        trust_score: f64,
        /// Required minimum.
        minimum_required: f64,
    },
    /// `hrc_required = true` but no confirmed HRC token was supplied.
    #[error("hardware-rooted confirmation required")]
    HrcRequired,
    /// `task_id` appears in the revocation view.
    #[error("lease revoked for task {task_id}")]
    LeaseRevoked {
        /// The revoked task.
        task_id: String,
    },
}

impl LeaseError {
    /// The stable error code this variant reports as.
    pub fn code(&self) -> ErrorCode {
        match self {
            LeaseError::InvalidManifest { .. } => ErrorCode::InvalidManifest,
            LeaseError::LeaseExpired => ErrorCode::LeaseExpired,
            LeaseError::InsufficientTrust { .. } => ErrorCode::InsufficientTrust,
            LeaseError::HrcRequired => ErrorCode::HrcRequired,
            LeaseError::LeaseRevoked { .. } => ErrorCode::LeaseRevoked,
        }
    }
}

/// Read-only view over the revocation list, consulted once per evaluation.
/// Fail-closed: implementations should treat any doubt about a `task_id` as
/// revoked.
pub trait RevocationView {
    /// Whether `task_id` is currently revoked.
    fn is_revoked(&self, task_id: &str) -> bool;
}

/// A revocation view over nothing; every `task_id` is live. Useful for
/// tests and deployments with no revocation source configured yet.
pub struct NoRevocations;

impl RevocationView for NoRevocations {
    fn is_revoked(&self, _task_id: &str) -> bool {
        false
    }
}

/// The two signing schemes this kernel permits. HMAC suits
/// self-contained deployments where the kernel also invokes the executor;
/// Ed25519 suits executors running in a separate trust domain, since the
/// kernel's private key never needs to leave the lease manager's process.
pub enum SigningKey {
    /// Symmetric key shared with the verifying executor.
    Hmac(Vec<u8>),
    /// Kernel's private key; executors verify with the matching public key.
    Ed25519(Box<ed25519_dalek::SigningKey>),
}

/// The verification-side counterpart of [`SigningKey`].
#[derive(Clone)]
pub enum VerificationKey {
    /// The same symmetric key used to sign.
    Hmac(Vec<u8>),
    /// The kernel's public key.
    Ed25519(ed25519_dalek::VerifyingKey),
}

fn message_bytes(task_id: &str, issued_at: i64, expires_at: i64) -> Vec<u8> {
    length_prefixed_concat(&[
        task_id.as_bytes(),
        &issued_at.to_be_bytes(),
        &expires_at.to_be_bytes(),
    ])
}

/// Sign an arbitrary message under either scheme. Shared by lease issuance
/// here and by executor result signing in `pda-executor`, which reuses this
/// crate's [`SigningKey`]/[`VerificationKey`] rather than inventing a second
/// pair of crypto wrapper types for the same two schemes.
pub fn sign_message(key: &SigningKey, message: &[u8]) -> String {
    match key {
        SigningKey::Hmac(secret) => {
            let mut mac = Hmac::<Sha256>::new_from_slice(secret).expect("HMAC accepts any key length");
            mac.update(message);
            hex::encode(mac.finalize().into_bytes())
        }
        SigningKey::Ed25519(signing_key) => {
            let sig = signing_key.sign(message);
            hex::encode(sig.to_bytes())
        }
    }
}

/// Verify an arbitrary message's signature under either scheme. Returns
/// `false` (never panics) on malformed hex or wrong-length signatures.
pub fn verify_message(message: &[u8], signature_hex: &str, key: &VerificationKey) -> bool {
    let Ok(sig_bytes) = hex::decode(signature_hex) else {
        return false;
    };
    match key {
        VerificationKey::Hmac(secret) => {
            let Ok(mut mac) = Hmac::<Sha256>::new_from_slice(secret) else {
                return false;
            };
            mac.update(message);
            mac.verify_slice(&sig_bytes).is_ok()
        }
        VerificationKey::Ed25519(verifying_key) => {
            let Ok(sig_array): Result<[u8; 64], _> = sig_bytes.try_into() else {
                return false;
            };
            let sig = ed25519_dalek::Signature::from_bytes(&sig_array);
            verifying_key.verify(message, &sig).is_ok()
        }
    }
}

/// Verify a lease's signature and its binding to `manifest_task_id`.
///
/// Returns `false` (never panics) on malformed hex, wrong-length
/// signatures, or a mismatched `task_id` binding — the lease-binding
/// invariant the executor's pre-execution gate relies on.
pub fn verify_lease(lease: &LeaseToken, manifest_task_id: &str, key: &VerificationKey) -> bool {
    if lease.task_id != manifest_task_id {
        return false;
    }
    let message = message_bytes(&lease.task_id, lease.issued_at, lease.expires_at);
    verify_message(&message, &lease.signature, key)
}

/// Evaluate a manifest against trust, HRC, and revocation state, granting a
/// signed, time-bounded lease on success.
///
/// `expected_expiry`, if supplied by the caller, is an additional upper
/// bound checked before trust/HRC/revocation; pass `None` when the caller
/// has no prior expectation to enforce.
///
/// Pure: no I/O, no logging, no trust inference, no manifest mutation.
#[allow(clippy::too_many_arguments)]
pub fn evaluate(
    manifest: &TaskManifest,
    trust: &TrustSnapshot,
    now: i64,
    hrc: Option<&HrcToken>,
    revocation: &dyn RevocationView,
    signer: &SigningKey,
    lease_duration_ms: i64,
    expected_expiry: Option<i64>,
) -> Result<LeaseToken, LeaseError> {
    if manifest.task_id.is_empty() {
        return Err(LeaseError::InvalidManifest {
            reason: "task_id is empty".into(),
        });
    }

    if let Some(expiry) = expected_expiry {
        if now >= expiry {
            return Err(LeaseError::LeaseExpired);
        }
    }

    if trust.trust_score < trust.minimum_required {
        return Err(LeaseError::InsufficientTrust {
            trust_score: trust.trust_score,
            minimum_required: trust.minimum_required,
        });
    }

    if manifest.constraints.hrc_required {
        let confirmed = hrc.map(|t| t.confirmed).unwrap_or(false);
        if !confirmed {
            return Err(LeaseError::HrcRequired);
        }
    }

    if revocation.is_revoked(&manifest.task_id) {
        return Err(LeaseError::LeaseRevoked {
            task_id: manifest.task_id.clone(),
        });
    }

    let issued_at = now;
    let expires_at = now + lease_duration_ms;
    let message = message_bytes(&manifest.task_id, issued_at, expires_at);
    let signature = sign_message(signer, &message);

    Ok(LeaseToken {
        task_id: manifest.task_id.clone(),
        issued_at,
        expires_at,
        signature,
    })
}

/// Minimal hex codec so this crate does not pull in a dedicated dependency
/// for a handful of encode/decode calls; kept private to the crate.
mod hex {
    pub fn encode(bytes: impl AsRef<[u8]>) -> String {
        bytes.as_ref().iter().map(|b| format!("{b:02x}")).collect()
    }

    pub fn decode(s: &str) -> Result<Vec<u8>, ()> {
        if s.len() % 2 != 0 {
            return Err(());
        }
        (0..s.len())
            .step_by(2)
            .map(|i| u8::from_str_radix(&s[i..i + 2], 16).map_err(|_| ()))
            .collect()
    }
}
