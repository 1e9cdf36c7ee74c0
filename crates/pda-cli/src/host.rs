// SPDX-License-Identifier: MIT OR Apache-2.0
//! Minimal host-adapter implementations wired into the CLI's `execute`
//! command. These are reference stubs, not a real desktop shell: a host
//! integration swaps these out behind the same traits.

use std::cell::RefCell;
use std::collections::BTreeSet;
use std::fs;
use std::path::PathBuf;

use pda_executors::{
    AppHostAdapter, DatasetEntry, EmailEntry, FileEntry, HostAdapter, HostCapabilities,
    SearchSource, TargetResolution,
};

/// App lifecycle state scoped to a single CLI invocation; a real host
/// would track this across the process's actual running applications.
#[derive(Default)]
pub struct CliAppHost {
    running: RefCell<BTreeSet<String>>,
}

impl AppHostAdapter for CliAppHost {
    fn is_running(&self, app_id: &str) -> bool {
        self.running.borrow().contains(app_id)
    }
    fn launch(&self, app_id: &str) -> Result<(), String> {
        self.running.borrow_mut().insert(app_id.to_string());
        Ok(())
    }
    fn bring_to_front(&self, app_id: &str) -> Result<(), String> {
        if self.running.borrow().contains(app_id) {
            Ok(())
        } else {
            Err("app is not running".into())
        }
    }
    fn close(&self, app_id: &str) -> Result<(), String> {
        self.running.borrow_mut().remove(app_id);
        Ok(())
    }
}

/// Resolves any target by reporting it present; a real host would query its
/// actual window/app/file registry.
pub struct CliNavigationHost;

impl HostAdapter for CliNavigationHost {
    fn resolve_target(&self, _target_type: &str, target_id: &str) -> TargetResolution {
        if target_id.is_empty() {
            TargetResolution::NotFound
        } else {
            TargetResolution::Resolved(target_id.to_string())
        }
    }

    fn get_host_capabilities(&self) -> HostCapabilities {
        HostCapabilities {
            adapter_version: "pda-cli-reference/0.1".into(),
        }
    }
}

/// Maps each allowed scope to a directory of the same name under
/// `root`; file search reads directory entries, other search kinds have no
/// backing corpus in this reference CLI.
pub struct CliSearchSource {
    root: PathBuf,
}

impl CliSearchSource {
    /// Build a search source rooted at `root`.
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }
}

impl SearchSource for CliSearchSource {
    fn list_files(&self, scope: &str) -> Option<Vec<FileEntry>> {
        let dir = self.root.join(scope);
        let entries = fs::read_dir(&dir).ok()?;
        let mut files = Vec::new();
        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_file() {
                let content = fs::read_to_string(&path).unwrap_or_default();
                let filename = path.file_name()?.to_string_lossy().to_string();
                files.push(FileEntry { filename, content });
            }
        }
        Some(files)
    }

    fn list_emails(&self, _scope: &str) -> Option<Vec<EmailEntry>> {
        None
    }

    fn list_datasets(&self, _scope: &str) -> Option<Vec<DatasetEntry>> {
        None
    }
}
