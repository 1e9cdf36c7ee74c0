// SPDX-License-Identifier: MIT OR Apache-2.0
//! `NAVIGATE_APP`, `NAVIGATE_WINDOW`, `NAVIGATE_URL`, `NAVIGATE_FILE`:
//! target resolution delegated entirely to the host adapter.

use pda_error::ErrorCode;
use pda_executor::{CapabilityFailure, Executor, ExecutorOutput};
use pda_types::TaskManifest;

use crate::host::{HostAdapter, TargetResolution};

/// Navigation executor. `target_type`/`navigation_mode`/`focus_policy` are
/// read from the manifest's fixed per-capability inputs rather than
/// re-derived here, so this executor is a pure dispatcher over host
/// resolution plus the URL scheme check.
pub struct NavigationExecutor<'a> {
    url_scheme_allowlist: Vec<String>,
    host: &'a dyn HostAdapter,
}

impl<'a> NavigationExecutor<'a> {
    /// Build an executor permitting only `url_scheme_allowlist` schemes for
    /// `NAVIGATE_URL`.
    pub fn new(url_scheme_allowlist: Vec<String>, host: &'a dyn HostAdapter) -> Self {
        Self {
            url_scheme_allowlist,
            host,
        }
    }

    fn scheme_of(url: &str) -> Option<&str> {
        url.split_once("://").map(|(scheme, _)| scheme)
    }
}

fn fail(code: ErrorCode, message: &str) -> CapabilityFailure {
    CapabilityFailure::new(code, message)
}

impl<'a> Executor for NavigationExecutor<'a> {
    fn capability_ids(&self) -> &[&str] {
        &["NAVIGATE_APP", "NAVIGATE_WINDOW", "NAVIGATE_URL", "NAVIGATE_FILE"]
    }

    fn execute_inner(&self, manifest: &TaskManifest) -> Result<ExecutorOutput, CapabilityFailure> {
        let target_id = manifest
            .inputs
            .get("target_id")
            .map(String::as_str)
            .ok_or_else(|| fail(ErrorCode::ExecutionFailed, "missing input 'target_id'"))?;
        let target_type = manifest
            .inputs
            .get("target_type")
            .map(String::as_str)
            .ok_or_else(|| fail(ErrorCode::ExecutionFailed, "missing input 'target_type'"))?;

        if target_type == "url" {
            let scheme = Self::scheme_of(target_id)
                .ok_or_else(|| fail(ErrorCode::NavigationBlocked, "url has no scheme"))?;
            if !self.url_scheme_allowlist.iter().any(|s| s == scheme) {
                return Err(fail(ErrorCode::NavigationBlocked, "url scheme is not allowed"));
            }
        }

        match self.host.resolve_target(target_type, target_id) {
            TargetResolution::Resolved(handle) => Ok(ExecutorOutput::new(serde_json::json!({
                "target_type": target_type,
                "target_id": target_id,
                "resolved_handle": handle,
            }))),
            TargetResolution::NotFound => Err(fail(ErrorCode::TargetNotFound, "target does not exist")),
            TargetResolution::NotAccessible => {
                Err(fail(ErrorCode::TargetNotAccessible, "target is not accessible"))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pda_types::{Constraints, Provenance, Sensitivity};
    use std::collections::BTreeMap;

    struct FakeHost;
    impl HostAdapter for FakeHost {
        fn resolve_target(&self, _target_type: &str, target_id: &str) -> TargetResolution {
            match target_id {
                "missing" => TargetResolution::NotFound,
                "forbidden" => TargetResolution::NotAccessible,
                other => TargetResolution::Resolved(format!("handle:{other}")),
            }
        }
        fn get_host_capabilities(&self) -> crate::host::HostCapabilities {
            crate::host::HostCapabilities {
                adapter_version: "test-1".into(),
            }
        }
    }

    fn manifest(capability_id: &str, inputs: &[(&str, &str)]) -> TaskManifest {
        let mut map = BTreeMap::new();
        for (k, v) in inputs {
            map.insert(k.to_string(), v.to_string());
        }
        TaskManifest {
            task_id: "t1".into(),
            capability_id: capability_id.into(),
            inputs: map,
            constraints: Constraints {
                scope: "home".into(),
                reversible: false,
                sensitivity: Sensitivity::Low,
                hrc_required: false,
            },
            provenance: Provenance {
                ast_hash: "deadbeef".into(),
            },
        }
    }

    #[test]
    fn resolves_app_target() {
        let host = FakeHost;
        let exec = NavigationExecutor::new(vec!["https".into()], &host);
        let m = manifest(
            "NAVIGATE_APP",
            &[("target_id", "notes"), ("target_type", "app"), ("navigation_mode", "foreground"), ("focus_policy", "steal")],
        );
        assert!(exec.execute_inner(&m).is_ok());
    }

    #[test]
    fn unresolved_target_is_target_not_found() {
        let host = FakeHost;
        let exec = NavigationExecutor::new(vec!["https".into()], &host);
        let m = manifest(
            "NAVIGATE_WINDOW",
            &[("target_id", "missing"), ("target_type", "window"), ("navigation_mode", "foreground"), ("focus_policy", "steal")],
        );
        let err = exec.execute_inner(&m).unwrap_err();
        assert_eq!(err.code, ErrorCode::TargetNotFound);
    }

    #[test]
    fn inaccessible_target_is_target_not_accessible() {
        let host = FakeHost;
        let exec = NavigationExecutor::new(vec!["https".into()], &host);
        let m = manifest(
            "NAVIGATE_FILE",
            &[("target_id", "forbidden"), ("target_type", "file"), ("navigation_mode", "foreground"), ("focus_policy", "steal")],
        );
        let err = exec.execute_inner(&m).unwrap_err();
        assert_eq!(err.code, ErrorCode::TargetNotAccessible);
    }

    #[test]
    fn disallowed_url_scheme_is_navigation_blocked() {
        let host = FakeHost;
        let exec = NavigationExecutor::new(vec!["https".into()], &host);
        let m = manifest(
            "NAVIGATE_URL",
            &[("target_id", "ftp://example.com/file"), ("target_type", "url"), ("navigation_mode", "foreground"), ("focus_policy", "request")],
        );
        let err = exec.execute_inner(&m).unwrap_err();
        assert_eq!(err.code, ErrorCode::NavigationBlocked);
    }

    #[test]
    fn allowed_url_scheme_resolves() {
        let host = FakeHost;
        let exec = NavigationExecutor::new(vec!["https".into()], &host);
        let m = manifest(
            "NAVIGATE_URL",
            &[("target_id", "https://example.com"), ("target_type", "url"), ("navigation_mode", "foreground"), ("focus_policy", "request")],
        );
        assert!(exec.execute_inner(&m).is_ok());
    }
}
