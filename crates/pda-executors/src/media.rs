// SPDX-License-Identifier: MIT OR Apache-2.0
//! `MEDIA_PLAY`, `MEDIA_PAUSE`, `MEDIA_STOP`, `MEDIA_SEEK`: explicit URI and
//! allowlisted device only, no content discovery or inference.

use pda_error::ErrorCode;
use pda_executor::{CapabilityFailure, Executor, ExecutorOutput};
use pda_types::TaskManifest;

/// Media-control executor confined to a static device allowlist.
pub struct MediaExecutor {
    device_allowlist: Vec<String>,
}

impl MediaExecutor {
    /// Build an executor that only accepts devices in `device_allowlist`.
    pub fn new(device_allowlist: Vec<String>) -> Self {
        Self { device_allowlist }
    }

    fn require_device<'a>(&self, manifest: &'a TaskManifest) -> Result<&'a str, CapabilityFailure> {
        let device = manifest
            .inputs
            .get("target_device")
            .map(String::as_str)
            .ok_or_else(|| fail("missing input 'target_device'"))?;
        if !self.device_allowlist.iter().any(|d| d == device) {
            return Err(fail("target_device is not on the static allowlist"));
        }
        Ok(device)
    }
}

fn fail(message: &str) -> CapabilityFailure {
    CapabilityFailure::new(ErrorCode::ExecutionFailed, message)
}

impl Executor for MediaExecutor {
    fn capability_ids(&self) -> &[&str] {
        &["MEDIA_PLAY", "MEDIA_PAUSE", "MEDIA_STOP", "MEDIA_SEEK"]
    }

    fn execute_inner(&self, manifest: &TaskManifest) -> Result<ExecutorOutput, CapabilityFailure> {
        match manifest.capability_id.as_str() {
            "MEDIA_PLAY" => {
                let uri = manifest
                    .inputs
                    .get("media_uri")
                    .ok_or_else(|| fail("missing input 'media_uri'"))?;
                if uri.contains('?') {
                    return Err(fail("media_uri must not contain a query string"));
                }
                let device = self.require_device(manifest)?;
                Ok(ExecutorOutput::new(serde_json::json!({
                    "media_uri": uri,
                    "target_device": device,
                    "transport_state": "playing",
                })))
            }
            "MEDIA_PAUSE" => {
                let device = self.require_device(manifest)?;
                Ok(ExecutorOutput::new(serde_json::json!({
                    "target_device": device,
                    "transport_state": "paused",
                })))
            }
            "MEDIA_STOP" => {
                let device = self.require_device(manifest)?;
                Ok(ExecutorOutput::new(serde_json::json!({
                    "target_device": device,
                    "transport_state": "stopped",
                })))
            }
            "MEDIA_SEEK" => {
                let device = self.require_device(manifest)?;
                let position: &str = manifest
                    .inputs
                    .get("position_seconds")
                    .ok_or_else(|| fail("missing input 'position_seconds'"))?;
                let position: f64 = position
                    .parse()
                    .map_err(|_| fail("position_seconds must be numeric"))?;
                if position < 0.0 {
                    return Err(fail("position_seconds must be >= 0"));
                }
                Ok(ExecutorOutput::new(serde_json::json!({
                    "target_device": device,
                    "position_seconds": position,
                })))
            }
            other => Err(CapabilityFailure::new(
                ErrorCode::UnsupportedCapability,
                format!("unsupported capability {other}"),
            )),
        }
    }
}
