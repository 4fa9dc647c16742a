//! Berth - Cargo manifests for crates built by another build system
//!
//! This crate walks a host build graph bottom-up and writes a standalone
//! `Cargo.toml` for every Rust crate in it, so the crates can be opened and
//! built with Cargo and its tooling.

pub mod core;
pub mod generator;
pub mod ops;
pub mod util;

pub use core::{BuildGraph, CrateInfo, GraphNode, Label, NodeKind};
pub use generator::{ManifestGenerator, ManifestResult};
pub use util::context::GlobalContext;
