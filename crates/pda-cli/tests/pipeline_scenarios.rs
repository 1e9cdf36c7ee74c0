// SPDX-License-Identifier: MIT OR Apache-2.0
//! End-to-end pipeline scenarios exercising validate → compile → lease →
//! execute together, through the library crates the `pda` binary wires up.

use pda_executor::{ExecutorRuntime, InMemoryIdempotencyStore, ResourceBudget};
use pda_executors::FileExecutor;
use pda_lease::{SigningKey, VerificationKey};
use pda_types::{ExecutionStatus, HrcToken, TrustSnapshot};
use std::time::Duration;

fn policy() -> pda_validate::HardNoPolicy<'static> {
    pda_validate::HardNoPolicy {
        credential_actions: &[],
        credential_object_prefixes: &[],
        financial_mutation_actions: &[],
    }
}

/// The kernel's own lease-issuing/verifying keypair.
fn keypair() -> (SigningKey, VerificationKey) {
    (SigningKey::Hmac(b"scenario-secret".to_vec()), VerificationKey::Hmac(b"scenario-secret".to_vec()))
}

/// A distinct key an executor signs results with. Must never equal the
/// kernel's lease keypair — an executor holding the lease key could forge
/// leases instead of merely consuming them.
fn executor_signer() -> SigningKey {
    SigningKey::Hmac(b"executor-secret".to_vec())
}

#[test]
fn scenario_happy_path_file_move() {
    let dir = tempfile::tempdir().unwrap();
    let source = dir.path().join("a.txt");
    std::fs::write(&source, b"contents").unwrap();
    let dest = dir.path().join("out").join("a.txt");
    std::fs::create_dir_all(dest.parent().unwrap()).unwrap();

    let text = format!(
        "SUBJECT(USER,alice) VERB(MUTATE,MOVE) OBJECT(FILE,{},{}) META(home,true,LOW,false)",
        source.display(),
        dest.display()
    );
    let ast = pda_validate::validate(&text, &policy()).unwrap();
    let manifest = pda_compile::compile(&ast, pda_canon::TaskIdScheme::Sha256).unwrap();
    assert_eq!(manifest.capability_id, "FILE_MOVE");

    let (signer, vkey) = keypair();
    let trust = TrustSnapshot {
        trust_score: 0.8,
        minimum_required: 0.5,
    };
    let lease = pda_lease::evaluate(&manifest, &trust, 1_000, None, &pda_lease::NoRevocations, &signer, 60_000, None)
        .unwrap();

    let executor = FileExecutor::new(vec![dir.path().to_path_buf()]);
    let runtime = ExecutorRuntime::new(
        executor,
        vkey,
        executor_signer(),
        Box::new(InMemoryIdempotencyStore::default()),
        ResourceBudget {
            max_wall_clock: Duration::from_secs(5),
        },
    );
    let result = runtime.execute(&manifest, &lease, 1_001).unwrap();
    assert_eq!(result.status, ExecutionStatus::Success);
    let undo = result.undo_metadata.unwrap();
    assert_eq!(undo["original_path"], source.display().to_string());
}

#[test]
fn scenario_expired_lease_never_reaches_executor() {
    let text = "SUBJECT(USER,alice) VERB(MUTATE,MOVE) OBJECT(FILE,/home/alice/in/a.txt,/home/alice/out/a.txt) META(home,true,LOW,false)";
    let ast = pda_validate::validate(text, &policy()).unwrap();
    let manifest = pda_compile::compile(&ast, pda_canon::TaskIdScheme::Sha256).unwrap();

    let (signer, vkey) = keypair();
    let trust = TrustSnapshot {
        trust_score: 0.8,
        minimum_required: 0.5,
    };
    let lease = pda_lease::evaluate(&manifest, &trust, 0, None, &pda_lease::NoRevocations, &signer, 60_000, None)
        .unwrap();
    assert_eq!(lease.expires_at, 60_000);

    let executor = FileExecutor::new(vec![std::path::PathBuf::from("/home/alice")]);
    let runtime = ExecutorRuntime::new(
        executor,
        vkey,
        executor_signer(),
        Box::new(InMemoryIdempotencyStore::default()),
        ResourceBudget {
            max_wall_clock: Duration::from_secs(5),
        },
    );
    let err = runtime.execute(&manifest, &lease, 60_001).unwrap_err();
    assert_eq!(err.code(), pda_error::ErrorCode::LeaseExpired);
}

#[test]
fn scenario_hrc_gated_action_is_denied_without_token() {
    let text = "SUBJECT(USER,alice) VERB(MUTATE,DELETE) OBJECT(FILE,/home/alice/in/a.txt) META(home,true,HIGH,true)";
    let ast = pda_validate::validate(text, &policy()).unwrap();
    let manifest = pda_compile::compile(&ast, pda_canon::TaskIdScheme::Sha256).unwrap();
    assert!(manifest.constraints.hrc_required);

    let (signer, _vkey) = keypair();
    let trust = TrustSnapshot {
        trust_score: 1.0,
        minimum_required: 0.0,
    };
    let err = pda_lease::evaluate(&manifest, &trust, 1_000, None, &pda_lease::NoRevocations, &signer, 60_000, None)
        .unwrap_err();
    assert_eq!(err.code(), pda_error::ErrorCode::HrcRequired);
}

#[test]
fn scenario_hrc_confirmed_token_is_granted() {
    let text = "SUBJECT(USER,alice) VERB(MUTATE,DELETE) OBJECT(FILE,/home/alice/in/a.txt) META(home,true,HIGH,true)";
    let ast = pda_validate::validate(text, &policy()).unwrap();
    let manifest = pda_compile::compile(&ast, pda_canon::TaskIdScheme::Sha256).unwrap();

    let (signer, _vkey) = keypair();
    let trust = TrustSnapshot {
        trust_score: 1.0,
        minimum_required: 0.0,
    };
    let hrc = HrcToken {
        confirmed: true,
        confirmed_at: 999,
    };
    let lease = pda_lease::evaluate(
        &manifest,
        &trust,
        1_000,
        Some(&hrc),
        &pda_lease::NoRevocations,
        &signer,
        60_000,
        None,
    )
    .unwrap();
    assert_eq!(lease.task_id, manifest.task_id);
}

#[test]
fn scenario_reexecution_is_idempotent_for_file_copy() {
    let dir = tempfile::tempdir().unwrap();
    let source = dir.path().join("a.txt");
    std::fs::write(&source, b"contents").unwrap();
    let dest = dir.path().join("copy.txt");

    let text = format!(
        "SUBJECT(USER,alice) VERB(MUTATE,COPY) OBJECT(FILE,{},{}) META(home,true,LOW,false)",
        source.display(),
        dest.display()
    );
    let ast = pda_validate::validate(&text, &policy()).unwrap();
    let manifest = pda_compile::compile(&ast, pda_canon::TaskIdScheme::Sha256).unwrap();
    assert_eq!(manifest.capability_id, "FILE_COPY");

    let (signer, vkey) = keypair();
    let trust = TrustSnapshot {
        trust_score: 0.8,
        minimum_required: 0.5,
    };
    let lease = pda_lease::evaluate(&manifest, &trust, 1_000, None, &pda_lease::NoRevocations, &signer, 60_000, None)
        .unwrap();

    let executor = FileExecutor::new(vec![dir.path().to_path_buf()]);
    let runtime = ExecutorRuntime::new(
        executor,
        vkey,
        executor_signer(),
        Box::new(InMemoryIdempotencyStore::default()),
        ResourceBudget {
            max_wall_clock: Duration::from_secs(5),
        },
    );
    let first = runtime.execute(&manifest, &lease, 1_001).unwrap();
    assert!(dest.exists());
    std::fs::remove_file(&dest).unwrap();

    let second = runtime.execute(&manifest, &lease, 1_002).unwrap();
    assert_eq!(first.signature, second.signature);
    assert!(!dest.exists(), "idempotent replay must not re-run the effect");
}
