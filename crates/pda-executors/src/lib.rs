// SPDX-License-Identifier: MIT OR Apache-2.0
#![deny(unsafe_code)]
#![warn(missing_docs)]
#![doc = "The five reference capability executors: FILE, MEDIA, APP_LAUNCH, NAVIGATION, SEARCH."]

//! Each executor implements `pda_executor::Executor` and nothing else; the
//! pre-execution gate, idempotency, signing, and wall-clock budget all live
//! in `pda-executor` and are never duplicated here.

mod app_launch;
mod file;
mod host;
mod media;
mod navigation;
mod search;

pub use app_launch::{AppHostAdapter, AppLaunchExecutor};
pub use file::FileExecutor;
pub use host::{HostAdapter, HostCapabilities, TargetResolution};
pub use media::MediaExecutor;
pub use navigation::NavigationExecutor;
pub use search::{DatasetEntry, EmailEntry, FileEntry, SearchExecutor, SearchSource};
