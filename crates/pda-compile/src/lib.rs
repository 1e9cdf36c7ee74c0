// SPDX-License-Identifier: MIT OR Apache-2.0
#![deny(unsafe_code)]
#![warn(missing_docs)]
#![doc = "The blueprint compiler: deterministically derives a task manifest from an AST."]

//! `compile(ast, scheme)` is pure: no I/O, no logging, no randomness.
//! Identical ASTs compile to byte-identical manifests; any other outcome is
//! a defect.

use std::collections::BTreeMap;

use pda_canon::{ast_hash, canonical_json, derive_task_id, TaskIdScheme};
use pda_error::ErrorCode;
use pda_types::{Ast, Constraints, ObjectType, Provenance, TaskManifest, VerbClass};

/// The closed, stage-local failure set of the compiler.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CompileError {
    /// No capability table entry for `(verb.class, object.type, verb.action)`.
    #[error("unknown capability for {verb_class:?}/{object_type:?}/{action}")]
    UnknownCapability {
        /// The AST's verb class.
        verb_class: VerbClass,
        /// The AST's object type.
        object_type: ObjectType,
        /// The AST's verb action.
        action: String,
    },
    /// The `(class, type)` pair is registered but `action` does not match
    /// any capability in that bucket.
    #[error("unsupported action '{action}' for {verb_class:?}/{object_type:?}")]
    UnsupportedAction {
        /// The AST's verb class.
        verb_class: VerbClass,
        /// The AST's object type.
        object_type: ObjectType,
        /// The offending action.
        action: String,
    },
    /// A required input key had no source value in the AST.
    #[error("no source value for required input key '{key}'")]
    InvalidBinding {
        /// The unsatisfied key.
        key: String,
    },
    /// Compilation failed for a reason not covered above (canonicalization
    /// failure; never expected to trigger for any well-formed `Ast`).
    #[error("compilation failed: {message}")]
    CompilationFailure {
        /// Detail.
        message: String,
    },
}

impl CompileError {
    /// The stable error code this variant reports as.
    pub fn code(&self) -> ErrorCode {
        match self {
            CompileError::UnknownCapability { .. } => ErrorCode::UnknownCapability,
            CompileError::UnsupportedAction { .. } => ErrorCode::UnsupportedAction,
            CompileError::InvalidBinding { .. } => ErrorCode::InvalidBinding,
            CompileError::CompilationFailure { .. } => ErrorCode::CompilationFailure,
        }
    }
}

impl From<pda_canon::CanonError> for CompileError {
    fn from(e: pda_canon::CanonError) -> Self {
        CompileError::CompilationFailure {
            message: e.to_string(),
        }
    }
}

/// One entry of the closed, static `(verb.class, object.type, verb.action)
/// → capability_id` table. `secondary_key` names the input
/// key sourced from `object.secondary_id`, required when present.
/// `scope_key` names the input key sourced from `metadata.scope`. `fixed`
/// lists per-capability constants emitted into every manifest regardless of
/// AST content (see `SPEC_FULL.md` §4.3.1 for why this is not "inference").
struct CapabilitySchema {
    capability_id: &'static str,
    primary_key: &'static str,
    secondary_key: Option<&'static str>,
    scope_key: Option<&'static str>,
    fixed: &'static [(&'static str, &'static str)],
}

const NAV_FIXED_STEAL: &[(&str, &str)] = &[
    ("target_type", "app"),
    ("navigation_mode", "foreground"),
    ("focus_policy", "steal"),
];
const NAV_WINDOW_FIXED: &[(&str, &str)] = &[
    ("target_type", "window"),
    ("navigation_mode", "foreground"),
    ("focus_policy", "steal"),
];
const NAV_URL_FIXED: &[(&str, &str)] = &[
    ("target_type", "url"),
    ("navigation_mode", "foreground"),
    ("focus_policy", "request"),
];
const NAV_FILE_FIXED: &[(&str, &str)] = &[
    ("target_type", "file"),
    ("navigation_mode", "foreground"),
    ("focus_policy", "steal"),
];

fn resolve(
    verb_class: VerbClass,
    object_type: ObjectType,
    action: &str,
) -> Result<CapabilitySchema, CompileError> {
    use ObjectType::*;
    use VerbClass::*;

    let bucket: &[(&str, CapabilitySchema)] = match (verb_class, object_type) {
        (Mutate, File) => &[],
        (Mutate, Device) => &[],
        (Transform, Device) => &[],
        (Disseminate, Folder) => &[],
        (Disseminate, File) => &[],
        (Transform, File) => &[],
        (Transform, Email) => &[],
        (Transform, Dataset) => &[],
        _ => {
            return Err(CompileError::UnknownCapability {
                verb_class,
                object_type,
                action: action.to_string(),
            });
        }
    };
    // The match above exists only to decide UnknownCapability vs.
    // UnsupportedAction by bucket membership; the actual schema lookup
    // below is the single source of truth for the capability table.
    let _ = bucket;

    let schema = match (verb_class, object_type, action) {
        (Mutate, File, "MOVE") => Some(CapabilitySchema {
            capability_id: "FILE_MOVE",
            primary_key: "source_path",
            secondary_key: Some("destination_path"),
            scope_key: None,
            fixed: &[],
        }),
        (Mutate, File, "COPY") => Some(CapabilitySchema {
            capability_id: "FILE_COPY",
            primary_key: "source_path",
            secondary_key: Some("destination_path"),
            scope_key: None,
            fixed: &[],
        }),
        (Mutate, File, "DELETE") => Some(CapabilitySchema {
            capability_id: "FILE_DELETE",
            primary_key: "target_path",
            secondary_key: None,
            scope_key: None,
            fixed: &[],
        }),
        (Transform, Device, "PLAY") => Some(CapabilitySchema {
            capability_id: "MEDIA_PLAY",
            primary_key: "media_uri",
            secondary_key: Some("target_device"),
            scope_key: None,
            fixed: &[],
        }),
        (Transform, Device, "PAUSE") => Some(CapabilitySchema {
            capability_id: "MEDIA_PAUSE",
            primary_key: "target_device",
            secondary_key: None,
            scope_key: None,
            fixed: &[],
        }),
        (Transform, Device, "STOP") => Some(CapabilitySchema {
            capability_id: "MEDIA_STOP",
            primary_key: "target_device",
            secondary_key: None,
            scope_key: None,
            fixed: &[],
        }),
        (Transform, Device, "SEEK") => Some(CapabilitySchema {
            capability_id: "MEDIA_SEEK",
            primary_key: "target_device",
            secondary_key: Some("position_seconds"),
            scope_key: None,
            fixed: &[],
        }),
        (Mutate, Device, "LAUNCH") => Some(CapabilitySchema {
            capability_id: "APP_LAUNCH",
            primary_key: "app_id",
            secondary_key: Some("target_environment"),
            scope_key: None,
            fixed: &[],
        }),
        (Mutate, Device, "FOCUS") => Some(CapabilitySchema {
            capability_id: "APP_FOCUS",
            primary_key: "app_id",
            secondary_key: Some("target_environment"),
            scope_key: None,
            fixed: &[],
        }),
        (Mutate, Device, "CLOSE") => Some(CapabilitySchema {
            capability_id: "APP_CLOSE",
            primary_key: "app_id",
            secondary_key: Some("target_environment"),
            scope_key: None,
            fixed: &[],
        }),
        (Disseminate, Folder, "NAVIGATE") => Some(CapabilitySchema {
            capability_id: "NAVIGATE_APP",
            primary_key: "target_id",
            secondary_key: None,
            scope_key: None,
            fixed: NAV_FIXED_STEAL,
        }),
        (Disseminate, Folder, "NAVIGATE_WINDOW") => Some(CapabilitySchema {
            capability_id: "NAVIGATE_WINDOW",
            primary_key: "target_id",
            secondary_key: None,
            scope_key: None,
            fixed: NAV_WINDOW_FIXED,
        }),
        (Disseminate, Folder, "NAVIGATE_URL") => Some(CapabilitySchema {
            capability_id: "NAVIGATE_URL",
            primary_key: "target_id",
            secondary_key: None,
            scope_key: None,
            fixed: NAV_URL_FIXED,
        }),
        (Disseminate, File, "NAVIGATE_FILE") => Some(CapabilitySchema {
            capability_id: "NAVIGATE_FILE",
            primary_key: "target_id",
            secondary_key: None,
            scope_key: None,
            fixed: NAV_FILE_FIXED,
        }),
        (Transform, File, "SEARCH") => Some(CapabilitySchema {
            capability_id: "SEARCH_FILES",
            primary_key: "query",
            secondary_key: Some("max_results"),
            scope_key: Some("target_scope"),
            fixed: &[],
        }),
        (Transform, Email, "SEARCH") => Some(CapabilitySchema {
            capability_id: "SEARCH_EMAILS",
            primary_key: "query",
            secondary_key: Some("max_results"),
            scope_key: Some("target_scope"),
            fixed: &[],
        }),
        (Transform, Dataset, "SEARCH") => Some(CapabilitySchema {
            capability_id: "SEARCH_DATASETS",
            primary_key: "query",
            secondary_key: Some("max_results"),
            scope_key: Some("target_scope"),
            fixed: &[],
        }),
        _ => None,
    };

    match schema {
        Some(s) => Ok(s),
        None => {
            // Distinguish "no entries at all for this (class, type) pair"
            // (UnknownCapability) from "entries exist, action doesn't
            // match" (UnsupportedAction) by checking registered actions
            // for the pair.
            let known_actions: &[&str] = match (verb_class, object_type) {
                (Mutate, File) => &["MOVE", "COPY", "DELETE"],
                (Transform, Device) => &["PLAY", "PAUSE", "STOP", "SEEK"],
                (Mutate, Device) => &["LAUNCH", "FOCUS", "CLOSE"],
                (Disseminate, Folder) => &["NAVIGATE", "NAVIGATE_WINDOW", "NAVIGATE_URL"],
                (Disseminate, File) => &["NAVIGATE_FILE"],
                (Transform, File) => &["SEARCH"],
                (Transform, Email) => &["SEARCH"],
                (Transform, Dataset) => &["SEARCH"],
                _ => &[],
            };
            if known_actions.is_empty() {
                Err(CompileError::UnknownCapability {
                    verb_class,
                    object_type,
                    action: action.to_string(),
                })
            } else {
                Err(CompileError::UnsupportedAction {
                    verb_class,
                    object_type,
                    action: action.to_string(),
                })
            }
        }
    }
}

fn bind_inputs(ast: &Ast, schema: &CapabilitySchema) -> Result<BTreeMap<String, String>, CompileError> {
    let mut inputs = BTreeMap::new();
    inputs.insert(schema.primary_key.to_string(), ast.object.id.clone());

    if let Some(key) = schema.secondary_key {
        let value = ast.object.secondary_id.clone().ok_or_else(|| CompileError::InvalidBinding {
            key: key.to_string(),
        })?;
        inputs.insert(key.to_string(), value);
    }

    if let Some(key) = schema.scope_key {
        inputs.insert(key.to_string(), ast.metadata.scope.clone());
    }

    for (key, value) in schema.fixed {
        inputs.insert(key.to_string(), value.to_string());
    }

    Ok(inputs)
}

/// Compile `ast` into a [`TaskManifest`] under the deployment's chosen
/// `task_id` derivation scheme.
///
/// Pure, deterministic: identical `(ast, scheme)` always produces a
/// byte-identical manifest.
pub fn compile(ast: &Ast, scheme: TaskIdScheme) -> Result<TaskManifest, CompileError> {
    let schema = resolve(ast.verb.class, ast.object.object_type, &ast.verb.action)?;
    let inputs = bind_inputs(ast, &schema)?;

    let canonical_bytes = canonical_json(ast)?;
    let task_id = derive_task_id(scheme, &canonical_bytes);
    let provenance_hash = ast_hash(ast)?;

    Ok(TaskManifest {
        task_id,
        capability_id: schema.capability_id.to_string(),
        inputs,
        constraints: Constraints {
            scope: ast.metadata.scope.clone(),
            reversible: ast.metadata.reversible,
            sensitivity: ast.metadata.sensitivity,
            hrc_required: ast.metadata.hrc_required,
        },
        provenance: Provenance {
            ast_hash: provenance_hash,
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pda_types::{Metadata, Object, ObjectType, Sensitivity, Subject, SubjectType, Verb};

    fn file_move_ast() -> Ast {
        Ast {
            subject: Subject {
                subject_type: SubjectType::User,
                id: "alice".into(),
            },
            verb: Verb {
                class: VerbClass::Mutate,
                action: "MOVE".into(),
            },
            object: Object {
                object_type: ObjectType::File,
                id: "/home/alice/in/a.txt".into(),
                secondary_id: Some("/home/alice/out/a.txt".into()),
            },
            metadata: Metadata {
                scope: "home".into(),
                reversible: true,
                sensitivity: Sensitivity::Low,
                hrc_required: false,
            },
        }
    }

    #[test]
    fn resolves_file_move_and_binds_both_paths() {
        let manifest = compile(&file_move_ast(), TaskIdScheme::Sha256).unwrap();
        assert_eq!(manifest.capability_id, "FILE_MOVE");
        assert_eq!(manifest.inputs["source_path"], "/home/alice/in/a.txt");
        assert_eq!(manifest.inputs["destination_path"], "/home/alice/out/a.txt");
        assert_eq!(manifest.task_id.len(), 64);
    }

    #[test]
    fn missing_secondary_id_is_invalid_binding() {
        let mut ast = file_move_ast();
        ast.object.secondary_id = None;
        let err = compile(&ast, TaskIdScheme::Sha256).unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidBinding);
    }

    #[test]
    fn unknown_class_type_pair_is_unknown_capability() {
        let mut ast = file_move_ast();
        ast.object.object_type = ObjectType::Email;
        ast.object.secondary_id = None;
        let err = compile(&ast, TaskIdScheme::Sha256).unwrap_err();
        assert_eq!(err.code(), ErrorCode::UnknownCapability);
    }

    #[test]
    fn known_pair_unknown_action_is_unsupported_action() {
        let mut ast = file_move_ast();
        ast.verb.action = "RENAME".into();
        let err = compile(&ast, TaskIdScheme::Sha256).unwrap_err();
        assert_eq!(err.code(), ErrorCode::UnsupportedAction);
    }

    #[test]
    fn determinism_identical_ast_identical_manifest() {
        let a = compile(&file_move_ast(), TaskIdScheme::Sha256).unwrap();
        let b = compile(&file_move_ast(), TaskIdScheme::Sha256).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn task_id_matches_sha256_of_canonical_ast() {
        let manifest = compile(&file_move_ast(), TaskIdScheme::Sha256).unwrap();
        let expected = pda_canon::sha256_hex(&canonical_json(&file_move_ast()).unwrap());
        assert_eq!(manifest.task_id, expected);
    }

    #[test]
    fn navigate_url_binds_fixed_request_focus_policy() {
        let ast = Ast {
            subject: Subject {
                subject_type: SubjectType::User,
                id: "alice".into(),
            },
            verb: Verb {
                class: VerbClass::Disseminate,
                action: "NAVIGATE_URL".into(),
            },
            object: Object {
                object_type: ObjectType::Folder,
                id: "browser-1".into(),
                secondary_id: None,
            },
            metadata: Metadata {
                scope: "home".into(),
                reversible: false,
                sensitivity: Sensitivity::Low,
                hrc_required: false,
            },
        };
        let manifest = compile(&ast, TaskIdScheme::Sha256).unwrap();
        assert_eq!(manifest.capability_id, "NAVIGATE_URL");
        assert_eq!(manifest.inputs["focus_policy"], "request");
        assert_eq!(manifest.inputs["target_type"], "url");
    }

    #[test]
    fn search_files_binds_scope_as_target_scope() {
        let ast = Ast {
            subject: Subject {
                subject_type: SubjectType::User,
                id: "alice".into(),
            },
            verb: Verb {
                class: VerbClass::Transform,
                action: "SEARCH".into(),
            },
            object: Object {
                object_type: ObjectType::File,
                id: "md".into(),
                secondary_id: Some("2".into()),
            },
            metadata: Metadata {
                scope: "documents".into(),
                reversible: false,
                sensitivity: Sensitivity::Low,
                hrc_required: false,
            },
        };
        let manifest = compile(&ast, TaskIdScheme::Sha256).unwrap();
        assert_eq!(manifest.capability_id, "SEARCH_FILES");
        assert_eq!(manifest.inputs["target_scope"], "documents");
        assert_eq!(manifest.inputs["max_results"], "2");
    }
}
