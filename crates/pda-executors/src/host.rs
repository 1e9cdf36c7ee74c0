// SPDX-License-Identifier: MIT OR Apache-2.0
//! The synchronous, stateless host-adapter boundary every reference
//! executor delegates target resolution and static capability discovery
//! through. Concrete hosts (a real desktop shell, a test double) implement
//! this; executors hold only a `&dyn` reference, never ownership.

/// Outcome of resolving a navigation target through the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TargetResolution {
    /// The target exists and is permitted; carries an opaque host handle.
    Resolved(String),
    /// The target does not exist.
    NotFound,
    /// The target exists but the caller may not reach it.
    NotAccessible,
}

/// Static description of what a host supports, returned once and never
/// expected to change within a process lifetime (spec: "no dynamic
/// capability discovery").
#[derive(Debug, Clone, Default)]
pub struct HostCapabilities {
    /// Adapter implementation version, surfaced for diagnostics only.
    pub adapter_version: String,
}

/// The four synchronous, stateless, exception-free operation families a
/// host exposes to executors. Lease-signature verification is handled by
/// `pda-executor`'s runtime directly rather than through this trait, since
/// the runtime already owns the kernel's verification key.
pub trait HostAdapter {
    /// Resolve `(target_type, target_id)` to a host-side handle.
    fn resolve_target(&self, target_type: &str, target_id: &str) -> TargetResolution;

    /// Static, unchanging description of this host's capabilities.
    fn get_host_capabilities(&self) -> HostCapabilities;
}
