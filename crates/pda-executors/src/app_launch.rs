// SPDX-License-Identifier: MIT OR Apache-2.0
//! `APP_LAUNCH`, `APP_FOCUS`, `APP_CLOSE`: allowlisted app IDs only, over a
//! closed set of target environments.

use pda_error::ErrorCode;
use pda_executor::{CapabilityFailure, Executor, ExecutorOutput};
use pda_types::TaskManifest;

const TARGET_ENVIRONMENTS: &[&str] = &["desktop", "mobile", "tv"];

/// Capability-specific effect calls `APP_LAUNCH`/`APP_FOCUS`/`APP_CLOSE`
/// delegate to the host. Force-kill has no member here: `APP_CLOSE` is
/// graceful-only by contract, so there is nothing else to expose.
pub trait AppHostAdapter {
    /// Whether `app_id` currently has a running instance.
    fn is_running(&self, app_id: &str) -> bool;
    /// Start a new instance of `app_id`.
    fn launch(&self, app_id: &str) -> Result<(), String>;
    /// Bring an already-running `app_id` to the foreground.
    fn bring_to_front(&self, app_id: &str) -> Result<(), String>;
    /// Request graceful termination of `app_id`.
    fn close(&self, app_id: &str) -> Result<(), String>;
}

/// App lifecycle executor confined to a static app allowlist.
pub struct AppLaunchExecutor<'a> {
    app_allowlist: Vec<String>,
    host: &'a dyn AppHostAdapter,
}

impl<'a> AppLaunchExecutor<'a> {
    /// Build an executor that only accepts apps in `app_allowlist`.
    pub fn new(app_allowlist: Vec<String>, host: &'a dyn AppHostAdapter) -> Self {
        Self { app_allowlist, host }
    }

    fn require_app<'m>(&self, manifest: &'m TaskManifest) -> Result<(&'m str, &'m str), CapabilityFailure> {
        let app_id = manifest
            .inputs
            .get("app_id")
            .map(String::as_str)
            .ok_or_else(|| fail("missing input 'app_id'"))?;
        if !self.app_allowlist.iter().any(|a| a == app_id) {
            return Err(fail("app_id is not on the static allowlist"));
        }
        let target_environment = manifest
            .inputs
            .get("target_environment")
            .map(String::as_str)
            .ok_or_else(|| fail("missing input 'target_environment'"))?;
        if !TARGET_ENVIRONMENTS.contains(&target_environment) {
            return Err(fail("target_environment must be one of desktop, mobile, tv"));
        }
        Ok((app_id, target_environment))
    }
}

fn fail(message: &str) -> CapabilityFailure {
    CapabilityFailure::new(ErrorCode::ExecutionFailed, message)
}

impl<'a> Executor for AppLaunchExecutor<'a> {
    fn capability_ids(&self) -> &[&str] {
        &["APP_LAUNCH", "APP_FOCUS", "APP_CLOSE"]
    }

    fn execute_inner(&self, manifest: &TaskManifest) -> Result<ExecutorOutput, CapabilityFailure> {
        let (app_id, target_environment) = self.require_app(manifest)?;

        match manifest.capability_id.as_str() {
            // Already-running behavior is fixed at build time, not inferred
            // per call: bring-to-front, never a silent no-op, so the
            // caller's request is always visibly honored.
            "APP_LAUNCH" => {
                if self.host.is_running(app_id) {
                    self.host.bring_to_front(app_id).map_err(|e| fail(&e))?;
                    Ok(ExecutorOutput::new(serde_json::json!({
                        "app_id": app_id,
                        "target_environment": target_environment,
                        "outcome": "brought_to_front",
                    })))
                } else {
                    self.host.launch(app_id).map_err(|e| fail(&e))?;
                    Ok(ExecutorOutput::new(serde_json::json!({
                        "app_id": app_id,
                        "target_environment": target_environment,
                        "outcome": "launched",
                    })))
                }
            }
            "APP_FOCUS" => {
                if !self.host.is_running(app_id) {
                    return Err(fail("app is not running"));
                }
                self.host.bring_to_front(app_id).map_err(|e| fail(&e))?;
                Ok(ExecutorOutput::new(serde_json::json!({
                    "app_id": app_id,
                    "target_environment": target_environment,
                    "outcome": "focused",
                })))
            }
            "APP_CLOSE" => {
                if !self.host.is_running(app_id) {
                    return Ok(ExecutorOutput::new(serde_json::json!({
                        "app_id": app_id,
                        "target_environment": target_environment,
                        "outcome": "not_running",
                    })));
                }
                self.host.close(app_id).map_err(|e| fail(&e))?;
                Ok(ExecutorOutput::new(serde_json::json!({
                    "app_id": app_id,
                    "target_environment": target_environment,
                    "outcome": "closed",
                })))
            }
            other => Err(CapabilityFailure::new(
                ErrorCode::UnsupportedCapability,
                format!("unsupported capability {other}"),
            )),
        }
    }
}
