//! Core data structures for Berth.
//!
//! This module contains the foundational types used throughout Berth:
//! - Labels identifying graph nodes
//! - Graph nodes and the crate payload of supported kinds
//! - The dependency graph and its on-disk description

pub mod graph;
pub mod graph_file;
pub mod label;
pub mod node;

pub use graph::{BuildGraph, GraphError};
pub use graph_file::{GraphFile, GraphFileError, GRAPH_FILE_NAME};
pub use label::Label;
pub use node::{CrateInfo, Edition, GraphNode, LibraryKind, NodeKind, SourceOrigin};
