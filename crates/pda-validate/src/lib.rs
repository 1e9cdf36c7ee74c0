// SPDX-License-Identifier: MIT OR Apache-2.0
#![deny(unsafe_code)]
#![warn(missing_docs)]
#![doc = "The DSL validator: turns statement text into a typed, normalized AST."]

//! `validate(text, policy)` is pure: no I/O, no logging, no randomness,
//! deterministic over identical input bytes. The pipeline runs in a fixed
//! order and halts on the first failure:
//! lex/parse → structural → enum → completeness → scope sanity → Hard-No.

mod scanner;

use pda_error::ErrorCode;
use pda_types::{Ast, Metadata, Object, ObjectType, Sensitivity, Subject, SubjectType, Verb, VerbClass};
use scanner::RawStatement;

/// The closed, stage-local failure set of the validator.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    /// Lexing/parsing failed; carries a source location.
    #[error("syntax error at line {line}, column {column}: {message}")]
    Syntax {
        /// 1-indexed line.
        line: usize,
        /// 1-indexed column.
        column: usize,
        /// Detail.
        message: String,
    },
    /// A required block or metadata field was absent.
    #[error("missing required field: {field}")]
    MissingRequiredField {
        /// Which field.
        field: String,
    },
    /// `subject.type` was not `USER` or `SYSTEM`.
    #[error("unknown subject type: {value}")]
    UnknownSubjectType {
        /// The offending raw value.
        value: String,
    },
    /// `object.type` was not one of the closed object types.
    #[error("unknown object type: {value}")]
    UnknownObjectType {
        /// The offending raw value.
        value: String,
    },
    /// `verb.class` was not one of the closed verb classes.
    #[error("unknown verb class: {value}")]
    UnknownVerbClass {
        /// The offending raw value.
        value: String,
    },
    /// A metadata value failed its closed-set or boolean check.
    #[error("invalid metadata value for {field}: {value}")]
    InvalidMetadataValue {
        /// Which metadata field.
        field: String,
        /// The offending raw value.
        value: String,
    },
    /// `scope` is empty or names more than one scope.
    #[error("ambiguous scope: {scope}")]
    AmbiguousScope {
        /// The offending scope value.
        scope: String,
    },
    /// An absolute, trust-independent invariant was triggered.
    #[error("hard-no violation: {reason}")]
    HardNoViolation {
        /// Which invariant fired.
        reason: String,
    },
}

impl ValidationError {
    /// The stable error code this variant reports as.
    pub fn code(&self) -> ErrorCode {
        match self {
            ValidationError::Syntax { .. } => ErrorCode::SyntaxError,
            ValidationError::MissingRequiredField { .. } => ErrorCode::MissingRequiredField,
            ValidationError::UnknownSubjectType { .. } => ErrorCode::UnknownSubjectType,
            ValidationError::UnknownObjectType { .. } => ErrorCode::UnknownObjectType,
            ValidationError::UnknownVerbClass { .. } => ErrorCode::UnknownVerbClass,
            ValidationError::InvalidMetadataValue { .. } => ErrorCode::InvalidMetadataValue,
            ValidationError::AmbiguousScope { .. } => ErrorCode::AmbiguousScope,
            ValidationError::HardNoViolation { .. } => ErrorCode::HardNoViolation,
        }
    }
}

/// The deployment-documented closed lists the Hard-No rules check against.
/// Owned by configuration, not the validator, since both lists are
/// implementer-defined.
#[derive(Debug, Clone)]
pub struct HardNoPolicy<'a> {
    /// Action names that imply credential access on their own.
    pub credential_actions: &'a [String],
    /// Identifier prefixes (matched against `object.id`) that imply
    /// credential access regardless of action name.
    pub credential_object_prefixes: &'a [String],
    /// Action names treated as financial mutations.
    pub financial_mutation_actions: &'a [String],
}

fn action_suggests_delete(action: &str) -> bool {
    action.to_ascii_uppercase().contains("DELETE")
}

fn touches_credentials(object: &Object, action: &str, policy: &HardNoPolicy) -> bool {
    if policy.credential_actions.iter().any(|a| a == action) {
        return true;
    }
    policy
        .credential_object_prefixes
        .iter()
        .any(|prefix| object.id.starts_with(prefix.as_str()))
}

fn is_financial_mutation(action: &str, policy: &HardNoPolicy) -> bool {
    policy.financial_mutation_actions.iter().any(|a| a == action)
}

fn check_hard_no(ast: &Ast, policy: &HardNoPolicy) -> Result<(), ValidationError> {
    if ast.verb.class == VerbClass::Mutate
        && action_suggests_delete(&ast.verb.action)
        && !ast.metadata.reversible
    {
        return Err(ValidationError::HardNoViolation {
            reason: "irreversible deletion".into(),
        });
    }
    if touches_credentials(&ast.object, &ast.verb.action, policy) {
        return Err(ValidationError::HardNoViolation {
            reason: "credential access".into(),
        });
    }
    if is_financial_mutation(&ast.verb.action, policy)
        && ast.metadata.sensitivity == Sensitivity::High
        && !ast.metadata.hrc_required
    {
        return Err(ValidationError::HardNoViolation {
            reason: "unconfirmed high-sensitivity financial mutation".into(),
        });
    }
    Ok(())
}

fn parse_subject_type(raw: &str) -> Result<SubjectType, ValidationError> {
    match raw {
        "USER" => Ok(SubjectType::User),
        "SYSTEM" => Ok(SubjectType::System),
        other => Err(ValidationError::UnknownSubjectType {
            value: other.to_string(),
        }),
    }
}

fn parse_object_type(raw: &str) -> Result<ObjectType, ValidationError> {
    match raw {
        "FILE" => Ok(ObjectType::File),
        "FOLDER" => Ok(ObjectType::Folder),
        "EMAIL" => Ok(ObjectType::Email),
        "DATASET" => Ok(ObjectType::Dataset),
        "DEVICE" => Ok(ObjectType::Device),
        other => Err(ValidationError::UnknownObjectType {
            value: other.to_string(),
        }),
    }
}

fn parse_verb_class(raw: &str) -> Result<VerbClass, ValidationError> {
    match raw {
        "MUTATE" => Ok(VerbClass::Mutate),
        "TRANSFORM" => Ok(VerbClass::Transform),
        "DISSEMINATE" => Ok(VerbClass::Disseminate),
        other => Err(ValidationError::UnknownVerbClass {
            value: other.to_string(),
        }),
    }
}

fn parse_sensitivity(raw: &str) -> Result<Sensitivity, ValidationError> {
    match raw {
        "LOW" => Ok(Sensitivity::Low),
        "MEDIUM" => Ok(Sensitivity::Medium),
        "HIGH" => Ok(Sensitivity::High),
        other => Err(ValidationError::InvalidMetadataValue {
            field: "sensitivity".into(),
            value: other.to_string(),
        }),
    }
}

fn parse_bool_field(field: &str, raw: &str) -> Result<bool, ValidationError> {
    match raw {
        "true" => Ok(true),
        "false" => Ok(false),
        other => Err(ValidationError::InvalidMetadataValue {
            field: field.into(),
            value: other.to_string(),
        }),
    }
}

fn check_scope(scope: &str) -> Result<(), ValidationError> {
    if scope.is_empty() || scope.contains(',') {
        return Err(ValidationError::AmbiguousScope {
            scope: scope.to_string(),
        });
    }
    Ok(())
}

fn to_ast(raw: RawStatement) -> Result<Ast, ValidationError> {
    // Structural: exactly one of each block, each with the arity its
    // production demands. The parser already enforces this; we check again
    // explicitly since a hand-rolled scanner gives no structural guarantee
    // beyond what call sites assert for themselves.
    if raw.subject.len() != 2 {
        return Err(ValidationError::MissingRequiredField {
            field: "subject".into(),
        });
    }
    if raw.verb.len() != 2 {
        return Err(ValidationError::MissingRequiredField {
            field: "verb".into(),
        });
    }
    if raw.object.len() < 2 {
        return Err(ValidationError::MissingRequiredField {
            field: "object".into(),
        });
    }
    if raw.meta.len() != 4 {
        return Err(ValidationError::MissingRequiredField {
            field: "metadata".into(),
        });
    }

    let subject_type = parse_subject_type(&raw.subject[0])?;
    let object_type = parse_object_type(&raw.object[0])?;
    let verb_class = parse_verb_class(&raw.verb[0])?;
    let sensitivity = parse_sensitivity(&raw.meta[2])?;
    let reversible = parse_bool_field("reversible", &raw.meta[1])?;
    let hrc_required = parse_bool_field("hrc_required", &raw.meta[3])?;

    // Completeness: every metadata field must be non-empty. The grammar's
    // `ident` production already forbids empty tokens, so this can only
    // fail to compile away; it stays an explicit, independently testable
    // step rather than an assumption leaning on parser internals.
    for (field, value) in [
        ("scope", raw.meta[0].as_str()),
        ("sensitivity", raw.meta[2].as_str()),
    ] {
        if value.is_empty() {
            return Err(ValidationError::MissingRequiredField {
                field: field.into(),
            });
        }
    }

    check_scope(&raw.meta[0])?;

    let object = Object {
        object_type,
        id: raw.object[1].clone(),
        secondary_id: raw.object.get(2).cloned(),
    };

    let ast = Ast {
        subject: Subject {
            subject_type,
            id: raw.subject[1].clone(),
        },
        verb: Verb {
            class: verb_class,
            action: raw.verb[1].clone(),
        },
        object,
        metadata: Metadata {
            scope: raw.meta[0].clone(),
            reversible,
            sensitivity,
            hrc_required,
        },
    };

    Ok(ast)
}

/// Validate `text` against the grammar and the Hard-No invariants, producing
/// a normalized [`Ast`] on success.
///
/// Pure: no I/O, no logging, no randomness. Deterministic over identical
/// input bytes and an identical `policy`.
pub fn validate(text: &str, policy: &HardNoPolicy) -> Result<Ast, ValidationError> {
    let raw = scanner::parse(text).map_err(|e| ValidationError::Syntax {
        line: e.line,
        column: e.column,
        message: e.message,
    })?;
    let ast = to_ast(raw)?;
    check_hard_no(&ast, policy)?;
    Ok(ast)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn empty_policy() -> HardNoPolicy<'static> {
        HardNoPolicy {
            credential_actions: &[],
            credential_object_prefixes: &[],
            financial_mutation_actions: &[],
        }
    }

    #[test]
    fn happy_path_file_move() {
        let ast = validate(
            "SUBJECT(USER,alice) VERB(MUTATE,MOVE) OBJECT(FILE,/home/alice/in/a.txt,/home/alice/out/a.txt) META(home,true,LOW,false)",
            &empty_policy(),
        )
        .unwrap();
        assert_eq!(ast.object.secondary_id.as_deref(), Some("/home/alice/out/a.txt"));
        assert_eq!(ast.verb.class, VerbClass::Mutate);
    }

    #[test]
    fn irreversible_delete_is_hard_no() {
        let err = validate(
            "SUBJECT(USER,alice) VERB(MUTATE,DELETE) OBJECT(FILE,/home/alice/in/a.txt) META(home,false,LOW,false)",
            &empty_policy(),
        )
        .unwrap_err();
        assert_eq!(err.code(), ErrorCode::HardNoViolation);
    }

    #[test]
    fn reversible_delete_is_allowed() {
        let ast = validate(
            "SUBJECT(USER,alice) VERB(MUTATE,DELETE) OBJECT(FILE,/home/alice/in/a.txt) META(home,true,LOW,false)",
            &empty_policy(),
        )
        .unwrap();
        assert!(ast.metadata.reversible);
    }

    #[test]
    fn credential_action_is_hard_no() {
        let policy = HardNoPolicy {
            credential_actions: &["rotate_credential".to_string()],
            credential_object_prefixes: &[],
            financial_mutation_actions: &[],
        };
        let err = validate(
            "SUBJECT(USER,alice) VERB(MUTATE,rotate_credential) OBJECT(DEVICE,vault) META(home,true,LOW,false)",
            &policy,
        )
        .unwrap_err();
        assert_eq!(err.code(), ErrorCode::HardNoViolation);
    }

    #[test]
    fn credential_object_prefix_is_hard_no() {
        let policy = HardNoPolicy {
            credential_actions: &[],
            credential_object_prefixes: &["cred:".to_string()],
            financial_mutation_actions: &[],
        };
        let err = validate(
            "SUBJECT(USER,alice) VERB(TRANSFORM,READ) OBJECT(DATASET,cred:vault-1) META(home,true,LOW,false)",
            &policy,
        )
        .unwrap_err();
        assert_eq!(err.code(), ErrorCode::HardNoViolation);
    }

    #[test]
    fn financial_high_sensitivity_without_hrc_is_hard_no() {
        let policy = HardNoPolicy {
            credential_actions: &[],
            credential_object_prefixes: &[],
            financial_mutation_actions: &["transfer_funds".to_string()],
        };
        let err = validate(
            "SUBJECT(USER,alice) VERB(MUTATE,transfer_funds) OBJECT(DATASET,acct-1) META(home,false,HIGH,false)",
            &policy,
        )
        .unwrap_err();
        assert_eq!(err.code(), ErrorCode::HardNoViolation);
    }

    #[test]
    fn financial_high_sensitivity_with_hrc_is_allowed() {
        let policy = HardNoPolicy {
            credential_actions: &[],
            credential_object_prefixes: &[],
            financial_mutation_actions: &["transfer_funds".to_string()],
        };
        let ast = validate(
            "SUBJECT(USER,alice) VERB(MUTATE,transfer_funds) OBJECT(DATASET,acct-1) META(home,false,HIGH,true)",
            &policy,
        )
        .unwrap();
        assert!(ast.metadata.hrc_required);
    }

    #[test]
    fn unknown_subject_type_is_rejected() {
        let err = validate(
            "SUBJECT(ROBOT,alice) VERB(MUTATE,MOVE) OBJECT(FILE,/a) META(home,true,LOW,false)",
            &empty_policy(),
        )
        .unwrap_err();
        assert_eq!(err.code(), ErrorCode::UnknownSubjectType);
    }

    #[test]
    fn invalid_boolean_literal_is_invalid_metadata_value() {
        let err = validate(
            "SUBJECT(USER,alice) VERB(MUTATE,MOVE) OBJECT(FILE,/a) META(home,yes,LOW,false)",
            &empty_policy(),
        )
        .unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidMetadataValue);
    }

    #[test]
    fn syntax_error_carries_location() {
        let err = validate("not a statement", &empty_policy()).unwrap_err();
        match err {
            ValidationError::Syntax { line, column, .. } => {
                assert_eq!(line, 1);
                assert!(column >= 1);
            }
            other => panic!("expected Syntax, got {other:?}"),
        }
    }

    #[test]
    fn determinism_across_repeated_calls() {
        let text = "SUBJECT(USER,alice) VERB(MUTATE,MOVE) OBJECT(FILE,/a,/b) META(home,true,LOW,false)";
        let a = validate(text, &empty_policy()).unwrap();
        let b = validate(text, &empty_policy()).unwrap();
        assert_eq!(a, b);
    }

    proptest::proptest! {
        #[test]
        fn validator_never_panics_on_arbitrary_text(s in ".{0,200}") {
            let _ = validate(&s, &empty_policy());
        }
    }
}
