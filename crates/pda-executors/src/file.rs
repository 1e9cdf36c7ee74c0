// SPDX-License-Identifier: MIT OR Apache-2.0
//! `FILE_MOVE`, `FILE_COPY`, `FILE_DELETE`: base-directory-confined,
//! symlink-rejecting filesystem effects over regular files only.

use std::fs;
use std::path::{Path, PathBuf};

use pda_error::ErrorCode;
use pda_executor::{CapabilityFailure, Executor, ExecutorOutput};
use pda_types::TaskManifest;

/// Filesystem executor for `FILE_MOVE`, `FILE_COPY`, `FILE_DELETE`.
pub struct FileExecutor {
    allowed_base_dirs: Vec<PathBuf>,
}

impl FileExecutor {
    /// Build an executor confined to descendants of `allowed_base_dirs`.
    pub fn new(allowed_base_dirs: Vec<PathBuf>) -> Self {
        Self { allowed_base_dirs }
    }

    fn confined(&self, path: &Path) -> Result<PathBuf, CapabilityFailure> {
        if !path.is_absolute() {
            return Err(fail("path must be absolute"));
        }
        if path.components().any(|c| matches!(c, std::path::Component::ParentDir)) {
            return Err(fail("path must not contain '..'"));
        }
        // Lexical containment below only rules out `..`; a symlinked
        // intermediate directory (e.g. base/evildir -> /etc) would still
        // pass a `starts_with(base)` check while the OS resolves through
        // it, so every existing ancestor — not just the leaf — is checked.
        for ancestor in path.ancestors() {
            if ancestor
                .symlink_metadata()
                .map(|m| m.file_type().is_symlink())
                .unwrap_or(false)
            {
                return Err(fail("path must not pass through a symlink"));
            }
        }
        let in_base = self
            .allowed_base_dirs
            .iter()
            .any(|base| path.starts_with(base));
        if !in_base {
            return Err(fail("path is outside every allowed base directory"));
        }
        Ok(path.to_path_buf())
    }

    fn require_regular_file(&self, path: &Path) -> Result<(), CapabilityFailure> {
        let meta = fs::symlink_metadata(path).map_err(|_| fail("target does not exist"))?;
        if meta.file_type().is_symlink() {
            return Err(fail("target must not be a symlink"));
        }
        if !meta.is_file() {
            return Err(fail("target must be a regular file"));
        }
        Ok(())
    }

    fn input<'a>(&self, manifest: &'a TaskManifest, key: &str) -> Result<&'a str, CapabilityFailure> {
        manifest
            .inputs
            .get(key)
            .map(String::as_str)
            .ok_or_else(|| fail(&format!("missing input '{key}'")))
    }

    fn move_or_copy(&self, manifest: &TaskManifest, copy: bool) -> Result<ExecutorOutput, CapabilityFailure> {
        let source = self.confined(Path::new(self.input(manifest, "source_path")?))?;
        let destination = self.confined(Path::new(self.input(manifest, "destination_path")?))?;
        self.require_regular_file(&source)?;
        if destination.exists() {
            return Err(fail("destination already exists"));
        }

        if copy {
            fs::copy(&source, &destination).map_err(|e| fail(&format!("copy failed: {e}")))?;
        } else {
            fs::rename(&source, &destination).map_err(|e| fail(&format!("move failed: {e}")))?;
        }

        let undo = serde_json::json!({ "original_path": source.to_string_lossy() });
        Ok(ExecutorOutput::new(serde_json::json!({
            "source_path": source.to_string_lossy(),
            "destination_path": destination.to_string_lossy(),
        }))
        .with_undo(undo))
    }
}

fn fail(message: &str) -> CapabilityFailure {
    CapabilityFailure::new(ErrorCode::ExecutionFailed, message)
}

impl Executor for FileExecutor {
    fn capability_ids(&self) -> &[&str] {
        &["FILE_MOVE", "FILE_COPY", "FILE_DELETE"]
    }

    fn execute_inner(&self, manifest: &TaskManifest) -> Result<ExecutorOutput, CapabilityFailure> {
        match manifest.capability_id.as_str() {
            "FILE_MOVE" => self.move_or_copy(manifest, false),
            "FILE_COPY" => self.move_or_copy(manifest, true),
            "FILE_DELETE" => {
                if !manifest.constraints.reversible {
                    return Err(fail("irreversible delete is forbidden"));
                }
                let target = self.confined(Path::new(self.input(manifest, "target_path")?))?;
                self.require_regular_file(&target)?;
                let recovery_dir = target
                    .parent()
                    .map(|p| p.join(".pda-recovery"))
                    .ok_or_else(|| fail("target has no parent directory"))?;
                fs::create_dir_all(&recovery_dir).map_err(|e| fail(&format!("recovery capture failed: {e}")))?;
                let recovery_path = recovery_dir.join(target.file_name().unwrap());
                fs::copy(&target, &recovery_path).map_err(|e| fail(&format!("recovery capture failed: {e}")))?;
                fs::remove_file(&target).map_err(|e| fail(&format!("delete failed: {e}")))?;
                Ok(ExecutorOutput::new(serde_json::json!({
                    "target_path": target.to_string_lossy(),
                }))
                .with_undo(serde_json::json!({ "recovery_path": recovery_path.to_string_lossy() })))
            }
            other => Err(CapabilityFailure::new(
                ErrorCode::UnsupportedCapability,
                format!("unsupported capability {other}"),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pda_types::{Constraints, Provenance, Sensitivity};
    use std::io::Write;
    use tempfile::tempdir;

    fn manifest(capability_id: &str, inputs: &[(&str, &str)], reversible: bool) -> TaskManifest {
        let mut map = std::collections::BTreeMap::new();
        for (k, v) in inputs {
            map.insert(k.to_string(), v.to_string());
        }
        TaskManifest {
            task_id: "t1".into(),
            capability_id: capability_id.into(),
            inputs: map,
            constraints: Constraints {
                scope: "home".into(),
                reversible,
                sensitivity: Sensitivity::Low,
                hrc_required: false,
            },
            provenance: Provenance {
                ast_hash: "deadbeef".into(),
            },
        }
    }

    #[test]
    fn moves_file_within_allowed_base() {
        let dir = tempdir().unwrap();
        let src = dir.path().join("a.txt");
        let dst = dir.path().join("b.txt");
        let mut f = fs::File::create(&src).unwrap();
        writeln!(f, "hello").unwrap();

        let exec = FileExecutor::new(vec![dir.path().to_path_buf()]);
        let m = manifest(
            "FILE_MOVE",
            &[
                ("source_path", src.to_str().unwrap()),
                ("destination_path", dst.to_str().unwrap()),
            ],
            true,
        );
        let out = exec.execute_inner(&m).unwrap();
        assert!(dst.exists());
        assert!(!src.exists());
        assert!(out.undo_metadata.is_some());
    }

    #[test]
    fn delete_requires_reversible() {
        let dir = tempdir().unwrap();
        let target = dir.path().join("a.txt");
        fs::File::create(&target).unwrap();

        let exec = FileExecutor::new(vec![dir.path().to_path_buf()]);
        let m = manifest("FILE_DELETE", &[("target_path", target.to_str().unwrap())], false);
        let err = exec.execute_inner(&m).unwrap_err();
        assert_eq!(err.code, ErrorCode::ExecutionFailed);
        assert!(target.exists());
    }

    #[test]
    fn reversible_delete_captures_recovery_copy() {
        let dir = tempdir().unwrap();
        let target = dir.path().join("a.txt");
        fs::File::create(&target).unwrap();

        let exec = FileExecutor::new(vec![dir.path().to_path_buf()]);
        let m = manifest("FILE_DELETE", &[("target_path", target.to_str().unwrap())], true);
        let out = exec.execute_inner(&m).unwrap();
        assert!(!target.exists());
        assert!(out.undo_metadata.is_some());
    }

    #[test]
    fn path_outside_base_dir_is_rejected() {
        let dir = tempdir().unwrap();
        let outside = tempdir().unwrap();
        let src = outside.path().join("a.txt");
        fs::File::create(&src).unwrap();
        let dst = dir.path().join("b.txt");

        let exec = FileExecutor::new(vec![dir.path().to_path_buf()]);
        let m = manifest(
            "FILE_MOVE",
            &[
                ("source_path", src.to_str().unwrap()),
                ("destination_path", dst.to_str().unwrap()),
            ],
            true,
        );
        let err = exec.execute_inner(&m).unwrap_err();
        assert_eq!(err.code, ErrorCode::ExecutionFailed);
    }

    #[test]
    fn path_with_parent_dir_component_is_rejected() {
        let dir = tempdir().unwrap();
        let exec = FileExecutor::new(vec![dir.path().to_path_buf()]);
        let src = dir.path().join("sub/../a.txt");
        let dst = dir.path().join("b.txt");
        let m = manifest(
            "FILE_MOVE",
            &[
                ("source_path", src.to_str().unwrap()),
                ("destination_path", dst.to_str().unwrap()),
            ],
            true,
        );
        let err = exec.execute_inner(&m).unwrap_err();
        assert_eq!(err.code, ErrorCode::ExecutionFailed);
    }

    #[test]
    fn path_through_symlinked_intermediate_directory_is_rejected() {
        let dir = tempdir().unwrap();
        let outside = tempdir().unwrap();
        fs::File::create(outside.path().join("passwd")).unwrap();

        let evil_link = dir.path().join("evildir");
        std::os::unix::fs::symlink(outside.path(), &evil_link).unwrap();

        let exec = FileExecutor::new(vec![dir.path().to_path_buf()]);
        let src = evil_link.join("passwd");
        let dst = dir.path().join("b.txt");
        let m = manifest(
            "FILE_MOVE",
            &[
                ("source_path", src.to_str().unwrap()),
                ("destination_path", dst.to_str().unwrap()),
            ],
            true,
        );
        let err = exec.execute_inner(&m).unwrap_err();
        assert_eq!(err.code, ErrorCode::ExecutionFailed);
        assert!(outside.path().join("passwd").exists());
    }

    #[test]
    fn destination_already_existing_is_rejected() {
        let dir = tempdir().unwrap();
        let src = dir.path().join("a.txt");
        let dst = dir.path().join("b.txt");
        fs::File::create(&src).unwrap();
        fs::File::create(&dst).unwrap();

        let exec = FileExecutor::new(vec![dir.path().to_path_buf()]);
        let m = manifest(
            "FILE_COPY",
            &[
                ("source_path", src.to_str().unwrap()),
                ("destination_path", dst.to_str().unwrap()),
            ],
            true,
        );
        let err = exec.execute_inner(&m).unwrap_err();
        assert_eq!(err.code, ErrorCode::ExecutionFailed);
    }
}
