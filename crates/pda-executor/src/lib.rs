// SPDX-License-Identifier: MIT OR Apache-2.0
#![deny(unsafe_code)]
#![warn(missing_docs)]
//! The synchronous shell that wraps a capability-specific [`Executor`]:
//! pre-execution gate, idempotency cache, result signing, and wall-clock
//! budget enforcement. Capability logic itself never touches any of this —
//! it only implements `execute_inner`.

use std::collections::BTreeMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use pda_error::ErrorCode;
use pda_lease::{verify_message, VerificationKey};
use pda_types::{ExecutionError, ExecutionResult, ExecutionStatus, LeaseToken, TaskManifest};

/// The closed, executor-shared failure set (spec-listed as "Executor
/// shared"): these are the outcomes the gate itself can produce, before
/// a concrete executor ever runs.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ExecutorError {
    /// The lease signature does not verify, or does not bind to the manifest.
    #[error("invalid lease")]
    InvalidLease,
    /// `now >= lease.expires_at`.
    #[error("lease expired")]
    LeaseExpired,
    /// `manifest.capability_id` is not one this executor implements.
    #[error("unsupported capability: {capability_id}")]
    UnsupportedCapability {
        /// The capability that was requested.
        capability_id: String,
    },
    /// Capability-specific input validation, or the effect itself, failed.
    #[error("execution failed: {reason}")]
    ExecutionFailed {
        /// Detail, surfaced as the result's error message.
        reason: String,
    },
    /// The wall-clock budget elapsed before `execute_inner` returned.
    #[error("resource exhausted")]
    ResourceExhausted,
}

impl ExecutorError {
    /// The stable error code this variant reports as.
    pub fn code(&self) -> ErrorCode {
        match self {
            ExecutorError::InvalidLease => ErrorCode::InvalidLease,
            ExecutorError::LeaseExpired => ErrorCode::LeaseExpired,
            ExecutorError::UnsupportedCapability { .. } => ErrorCode::UnsupportedCapability,
            ExecutorError::ExecutionFailed { .. } => ErrorCode::ExecutionFailed,
            ExecutorError::ResourceExhausted => ErrorCode::ResourceExhausted,
        }
    }
}

/// A capability-specific error, raised from inside `execute_inner`. Carries
/// its own error code since capability executors surface codes outside the
/// shared set too (e.g. `INVALID_QUERY`, `TARGET_NOT_FOUND`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapabilityFailure {
    /// The specific code this capability failed with.
    pub code: ErrorCode,
    /// Human-readable detail.
    pub message: String,
}

impl CapabilityFailure {
    /// Build a new capability failure.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

/// A successful effect, expressed as a JSON value plus optional undo metadata.
#[derive(Debug, Clone)]
pub struct ExecutorOutput {
    /// Capability-specific success payload.
    pub output: serde_json::Value,
    /// Present only when `constraints.reversible = true` and the capability
    /// captured enough state to undo the effect.
    pub undo_metadata: Option<serde_json::Value>,
}

impl ExecutorOutput {
    /// Build an output with no undo metadata.
    pub fn new(output: serde_json::Value) -> Self {
        Self {
            output,
            undo_metadata: None,
        }
    }

    /// Attach undo metadata to an existing output.
    pub fn with_undo(mut self, undo_metadata: serde_json::Value) -> Self {
        self.undo_metadata = Some(undo_metadata);
        self
    }
}

/// A concrete capability implementation. Implementors only provide the
/// closed capability set they answer for and the effect itself;
/// [`ExecutorRuntime`] owns everything else in the contract.
pub trait Executor {
    /// The capability IDs this executor accepts, checked against
    /// `manifest.capability_id` by the pre-execution gate (step 4).
    fn capability_ids(&self) -> &[&str];

    /// Capability-specific input schema validation and the effect itself
    /// (gate step 5 and the effect call are one synchronous operation here,
    /// since neither has a meaningful boundary worth splitting without a
    /// host sandbox to cross).
    fn execute_inner(&self, manifest: &TaskManifest) -> Result<ExecutorOutput, CapabilityFailure>;
}

/// Opaque store of prior signed results, keyed by `task_id`. Executors that
/// want re-execution to be a verbatim replay rather than a re-run should
/// populate this; the core persists nothing on its own behalf.
pub trait IdempotencyStore {
    /// Look up a previously recorded result for `task_id`.
    fn get(&self, task_id: &str) -> Option<ExecutionResult>;
    /// Record a result for `task_id`, overwriting any prior entry.
    fn put(&self, task_id: &str, result: ExecutionResult);
}

/// An in-memory idempotency store. Suitable for a single executor process's
/// lifetime; a persistent deployment would back this with durable storage
/// behind the same trait.
#[derive(Default)]
pub struct InMemoryIdempotencyStore {
    entries: Mutex<BTreeMap<String, ExecutionResult>>,
}

impl IdempotencyStore for InMemoryIdempotencyStore {
    fn get(&self, task_id: &str) -> Option<ExecutionResult> {
        self.entries.lock().unwrap().get(task_id).cloned()
    }

    fn put(&self, task_id: &str, result: ExecutionResult) {
        self.entries.lock().unwrap().insert(task_id.to_string(), result);
    }
}

/// The one bound the runtime can check without a host sandbox: wall-clock
/// elapsed around `execute_inner`. Memory, handle, and I/O caps remain the
/// host's responsibility.
#[derive(Debug, Clone, Copy)]
pub struct ResourceBudget {
    /// Maximum time `execute_inner` may run before the runtime records
    /// `RESOURCE_EXHAUSTED` and discards whatever it returns.
    pub max_wall_clock: Duration,
}

/// Wraps a concrete [`Executor`] with the pre-execution gate, idempotency
/// cache, result signing, and wall-clock budget from the executor contract.
pub struct ExecutorRuntime<E: Executor> {
    executor: E,
    verification_key: VerificationKey,
    signer: pda_lease::SigningKey,
    idempotency: Box<dyn IdempotencyStore>,
    budget: ResourceBudget,
}

fn result_message_bytes(
    task_id: &str,
    capability_id: &str,
    status: &ExecutionStatus,
    output: &Option<serde_json::Value>,
    error: &Option<ExecutionError>,
) -> Result<Vec<u8>, pda_canon::CanonError> {
    let status_bytes = match status {
        ExecutionStatus::Success => b"SUCCESS".to_vec(),
        ExecutionStatus::Failure => b"FAILURE".to_vec(),
    };
    let payload_bytes = if let Some(output) = output {
        pda_canon::canonical_json(output)?
    } else if let Some(error) = error {
        pda_canon::canonical_json(error)?
    } else {
        Vec::new()
    };
    Ok(pda_canon::length_prefixed_concat(&[
        task_id.as_bytes(),
        capability_id.as_bytes(),
        &status_bytes,
        &payload_bytes,
    ]))
}

impl<E: Executor> ExecutorRuntime<E> {
    /// Construct a runtime around `executor`. `verification_key` checks
    /// incoming leases; `signer` signs this executor's own results;
    /// `idempotency` stores prior results; `budget` bounds wall-clock time.
    pub fn new(
        executor: E,
        verification_key: VerificationKey,
        signer: pda_lease::SigningKey,
        idempotency: Box<dyn IdempotencyStore>,
        budget: ResourceBudget,
    ) -> Self {
        Self {
            executor,
            verification_key,
            signer,
            idempotency,
            budget,
        }
    }

    /// Run the full contract: pre-execution gate, idempotency check, the
    /// effect itself under the wall-clock budget, then a signed result.
    /// Never panics; every failure path produces a signed `Failure` result
    /// except gate failures, which are returned as an `ExecutorError`
    /// before any result exists to sign.
    pub fn execute(&self, manifest: &TaskManifest, lease: &LeaseToken, now: i64) -> Result<ExecutionResult, ExecutorError> {
        self.gate(manifest, lease, now)?;

        if let Some(cached) = self.idempotency.get(&manifest.task_id) {
            return Ok(cached);
        }

        let start = Instant::now();
        let outcome = self.executor.execute_inner(manifest);
        let elapsed = start.elapsed();

        let result = if elapsed > self.budget.max_wall_clock {
            self.build_result(
                manifest,
                ExecutionStatus::Failure,
                None,
                Some(ExecutionError {
                    error_code: ErrorCode::ResourceExhausted.as_str().to_string(),
                    message: "wall-clock budget exceeded".to_string(),
                }),
            )
        } else {
            match outcome {
                Ok(output) => self.build_result(manifest, ExecutionStatus::Success, Some(output.output), None),
                Err(failure) => self.build_result(
                    manifest,
                    ExecutionStatus::Failure,
                    None,
                    Some(ExecutionError {
                        error_code: failure.code.as_str().to_string(),
                        message: failure.message,
                    }),
                ),
            }
        };

        self.idempotency.put(&manifest.task_id, result.clone());
        Ok(result)
    }

    fn gate(&self, manifest: &TaskManifest, lease: &LeaseToken, now: i64) -> Result<(), ExecutorError> {
        if lease.task_id != manifest.task_id {
            return Err(ExecutorError::InvalidLease);
        }
        let message = pda_canon::length_prefixed_concat(&[
            lease.task_id.as_bytes(),
            &lease.issued_at.to_be_bytes(),
            &lease.expires_at.to_be_bytes(),
        ]);
        if !verify_message(&message, &lease.signature, &self.verification_key) {
            return Err(ExecutorError::InvalidLease);
        }
        if now >= lease.expires_at {
            return Err(ExecutorError::LeaseExpired);
        }
        if !self.executor.capability_ids().contains(&manifest.capability_id.as_str()) {
            return Err(ExecutorError::UnsupportedCapability {
                capability_id: manifest.capability_id.clone(),
            });
        }
        Ok(())
    }

    fn build_result(
        &self,
        manifest: &TaskManifest,
        status: ExecutionStatus,
        output: Option<serde_json::Value>,
        error: Option<ExecutionError>,
    ) -> ExecutionResult {
        let message_bytes =
            result_message_bytes(&manifest.task_id, &manifest.capability_id, &status, &output, &error)
                .unwrap_or_default();
        let signature = pda_lease::sign_message(&self.signer, &message_bytes);
        ExecutionResult {
            task_id: manifest.task_id.clone(),
            capability_id: manifest.capability_id.clone(),
            status,
            output,
            error,
            signature,
        }
    }
}
