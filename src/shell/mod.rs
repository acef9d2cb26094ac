//! Offline availability for the application shell.
//!
//! A versioned, generational cache of the shell's static assets, kept on the
//! filesystem and deliberately decoupled from the record store. Lifecycle:
//! install pre-caches the manifest into the generation named for the current
//! version, activate deletes every other generation, and fetch routing
//! answers requests cache-first (same origin) or network-first (font
//! providers) with an offline shell fallback.

mod fetch;
mod generations;
mod manifest;

pub use fetch::{AssetRequest, AssetResponse, InstallReport, ResponseSource, ShellCache};
pub use generations::{CacheGeneration, StoredAsset};
pub use manifest::{ShellManifest, DEFAULT_SHELL_ASSETS};
