//! Manifest generation.
//!
//! This module turns one graph node plus the published results of its
//! dependencies into a `Cargo.toml`:
//! - `relocate` copies external sources next to the manifest
//! - `render` produces the manifest text
//! - `manifest` orchestrates both and publishes a [`ManifestResult`]

pub mod errors;
pub mod manifest;
pub mod relocate;
pub mod render;

pub use errors::{GenerateError, RelocateError};
pub use manifest::{
    DepOutcome, ManifestGenerator, ManifestResult, VersionPolicy, DEFAULT_GENERATOR_NAME,
    DEFAULT_VERSION, MANIFEST_FILE_NAME,
};
pub use relocate::{relocate, RelocationResult, StagedRelocation};
pub use render::{render_manifest, ManifestContent, TargetSection};
