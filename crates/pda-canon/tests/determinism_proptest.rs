// SPDX-License-Identifier: MIT OR Apache-2.0
//! Property-based coverage of canonicalization determinism across arbitrary
//! ASTs, separate from the crate's inline unit tests.

use pda_canon::{ast_hash, canonical_json, derive_task_id, TaskIdScheme};
use pda_types::{Ast, Metadata, Object, ObjectType, Sensitivity, Subject, SubjectType, Verb, VerbClass};
use proptest::prelude::*;

fn arb_subject_type() -> impl Strategy<Value = SubjectType> {
    prop_oneof![Just(SubjectType::User), Just(SubjectType::System)]
}

fn arb_verb_class() -> impl Strategy<Value = VerbClass> {
    prop_oneof![
        Just(VerbClass::Mutate),
        Just(VerbClass::Transform),
        Just(VerbClass::Disseminate),
    ]
}

fn arb_object_type() -> impl Strategy<Value = ObjectType> {
    prop_oneof![
        Just(ObjectType::File),
        Just(ObjectType::Folder),
        Just(ObjectType::Email),
        Just(ObjectType::Dataset),
        Just(ObjectType::Device),
    ]
}

fn arb_sensitivity() -> impl Strategy<Value = Sensitivity> {
    prop_oneof![Just(Sensitivity::Low), Just(Sensitivity::Medium), Just(Sensitivity::High)]
}

fn arb_ast() -> impl Strategy<Value = Ast> {
    (
        arb_subject_type(),
        "[a-z]{1,16}",
        arb_verb_class(),
        "[A-Z]{1,12}",
        arb_object_type(),
        "[a-zA-Z0-9_/-]{1,48}",
        proptest::option::of("[a-zA-Z0-9_/-]{1,48}"),
        "[a-z]{1,10}",
        any::<bool>(),
        arb_sensitivity(),
        any::<bool>(),
    )
        .prop_map(
            |(subject_type, subject_id, class, action, object_type, object_id, secondary_id, scope, reversible, sensitivity, hrc_required)| {
                Ast {
                    subject: Subject {
                        subject_type,
                        id: subject_id,
                    },
                    verb: Verb { class, action },
                    object: Object {
                        object_type,
                        id: object_id,
                        secondary_id,
                    },
                    metadata: Metadata {
                        scope,
                        reversible,
                        sensitivity,
                        hrc_required,
                    },
                }
            },
        )
}

proptest! {
    #[test]
    fn ast_hash_is_stable_across_repeated_calls(ast in arb_ast()) {
        let a = ast_hash(&ast).unwrap();
        let b = ast_hash(&ast).unwrap();
        prop_assert_eq!(a, b);
    }

    #[test]
    fn canonical_json_is_stable_across_repeated_calls(ast in arb_ast()) {
        let a = canonical_json(&ast).unwrap();
        let b = canonical_json(&ast).unwrap();
        prop_assert_eq!(a, b);
    }

    #[test]
    fn different_asts_with_different_object_ids_hash_differently(mut ast in arb_ast()) {
        let before = ast_hash(&ast).unwrap();
        ast.object.id = format!("{}-distinct-suffix", ast.object.id);
        let after = ast_hash(&ast).unwrap();
        prop_assert_ne!(before, after);
    }

    #[test]
    fn task_id_derivation_never_panics_under_either_scheme(ast in arb_ast()) {
        let bytes = canonical_json(&ast).unwrap();
        let _ = derive_task_id(TaskIdScheme::Sha256, &bytes);
        let _ = derive_task_id(TaskIdScheme::UuidV5, &bytes);
    }
}
