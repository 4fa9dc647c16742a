//! Graph nodes - one buildable unit each.
//!
//! A node is either a crate the generator understands (a library or a
//! binary, both carrying a [`CrateInfo`]) or an unsupported rule that only
//! exists so the graph stays complete.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::core::graph::GraphError;
use crate::core::label::Label;

/// Rust language edition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Edition {
    #[serde(rename = "2015")]
    E2015,
    #[serde(rename = "2018")]
    E2018,
    #[serde(rename = "2021")]
    E2021,
    #[serde(rename = "2024")]
    E2024,
}

impl Default for Edition {
    fn default() -> Self {
        Edition::E2021
    }
}

impl Edition {
    /// The edition as it appears in a manifest.
    pub fn as_str(&self) -> &'static str {
        match self {
            Edition::E2015 => "2015",
            Edition::E2018 => "2018",
            Edition::E2021 => "2021",
            Edition::E2024 => "2024",
        }
    }
}

impl FromStr for Edition {
    type Err = EditionParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "2015" => Ok(Edition::E2015),
            "2018" => Ok(Edition::E2018),
            "2021" => Ok(Edition::E2021),
            "2024" => Ok(Edition::E2024),
            _ => Err(EditionParseError(s.to_string())),
        }
    }
}

impl fmt::Display for Edition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an invalid edition string.
#[derive(Debug, Clone, thiserror::Error)]
#[error("invalid edition '{0}', valid values: 2015, 2018, 2021, 2024")]
pub struct EditionParseError(pub String);

/// Flavour of a library node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LibraryKind {
    /// Plain Rust library
    #[serde(rename = "library")]
    Rlib,
    /// Shared/dynamic library
    SharedLibrary,
    /// Static library
    StaticLibrary,
}

/// Where a node's source files live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceOrigin {
    /// Inside the primary workspace; sources are referenced in place.
    Workspace,
    /// Under an external-dependency root; sources are relocated before use.
    External { root: PathBuf },
}

impl SourceOrigin {
    /// Check if this origin requires relocation.
    pub fn is_external(&self) -> bool {
        matches!(self, SourceOrigin::External { .. })
    }
}

/// Everything the generator needs to know about a crate.
#[derive(Debug, Clone)]
pub struct CrateInfo {
    /// Crate name used for `[package]`, the target section and dependents' keys
    pub crate_name: String,

    /// Declared version, if the host knows one
    pub version: Option<String>,

    /// Language edition
    pub edition: Edition,

    /// All source files of the crate
    pub srcs: Vec<PathBuf>,

    /// Entry-point source file, a member of `srcs`
    pub root: PathBuf,

    /// Where the sources live
    pub origin: SourceOrigin,

    /// Build descriptor the node was declared in
    pub descriptor: PathBuf,
}

impl CrateInfo {
    /// Create crate info for a workspace crate with a single source file.
    pub fn new(crate_name: impl Into<String>, root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        CrateInfo {
            crate_name: crate_name.into(),
            version: None,
            edition: Edition::default(),
            srcs: vec![root.clone()],
            root,
            origin: SourceOrigin::Workspace,
            descriptor: PathBuf::from("BUILD"),
        }
    }

    /// Set the declared version.
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    /// Set the edition.
    pub fn with_edition(mut self, edition: Edition) -> Self {
        self.edition = edition;
        self
    }

    /// Add source files. The entry point is always kept.
    pub fn with_srcs(mut self, srcs: impl IntoIterator<Item = impl Into<PathBuf>>) -> Self {
        for src in srcs {
            let src = src.into();
            if !self.srcs.contains(&src) {
                self.srcs.push(src);
            }
        }
        self
    }

    /// Mark the sources as living under an external root.
    pub fn with_external_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.origin = SourceOrigin::External { root: root.into() };
        self
    }

    /// Check if the entry point is one of the sources.
    pub fn has_root_in_srcs(&self) -> bool {
        self.srcs.iter().any(|s| s == &self.root)
    }

    /// The external root, if this crate's sources are external.
    pub fn external_root(&self) -> Option<&Path> {
        match &self.origin {
            SourceOrigin::External { root } => Some(root),
            SourceOrigin::Workspace => None,
        }
    }
}

/// What a node is, as far as the generator is concerned.
#[derive(Debug, Clone)]
pub enum NodeKind {
    /// A library crate, rendered with a `[lib]` section
    Library { info: CrateInfo, kind: LibraryKind },
    /// A binary crate, rendered with a `[[bin]]` section
    Binary { info: CrateInfo },
    /// Any other rule; produces no manifest
    Unsupported { rule: String },
}

impl NodeKind {
    /// Crate info for supported kinds.
    pub fn crate_info(&self) -> Option<&CrateInfo> {
        match self {
            NodeKind::Library { info, .. } | NodeKind::Binary { info } => Some(info),
            NodeKind::Unsupported { .. } => None,
        }
    }

    /// Check if the generator produces a manifest for this kind.
    pub fn is_supported(&self) -> bool {
        self.crate_info().is_some()
    }

    /// Short kind name, as used in graph files.
    pub fn name(&self) -> &str {
        match self {
            NodeKind::Library { kind, .. } => match kind {
                LibraryKind::Rlib => "library",
                LibraryKind::SharedLibrary => "shared-library",
                LibraryKind::StaticLibrary => "static-library",
            },
            NodeKind::Binary { .. } => "binary",
            NodeKind::Unsupported { rule } => rule,
        }
    }
}

/// A unit in the dependency graph.
#[derive(Debug, Clone)]
pub struct GraphNode {
    /// Unique identifier
    pub label: Label,

    /// Kind and, for supported kinds, the crate payload
    pub kind: NodeKind,

    /// Ordered dependency edges
    pub deps: Vec<Label>,
}

impl GraphNode {
    /// Create a library node.
    pub fn library(label: Label, info: CrateInfo) -> Self {
        Self::with_kind(label, NodeKind::Library { info, kind: LibraryKind::Rlib })
    }

    /// Create a binary node.
    pub fn binary(label: Label, info: CrateInfo) -> Self {
        Self::with_kind(label, NodeKind::Binary { info })
    }

    /// Create an unsupported node.
    pub fn unsupported(label: Label, rule: impl Into<String>) -> Self {
        Self::with_kind(label, NodeKind::Unsupported { rule: rule.into() })
    }

    /// Create a node of any kind.
    pub fn with_kind(label: Label, kind: NodeKind) -> Self {
        GraphNode {
            label,
            kind,
            deps: Vec::new(),
        }
    }

    /// Add dependency edges.
    pub fn with_deps(mut self, deps: impl IntoIterator<Item = Label>) -> Self {
        self.deps.extend(deps);
        self
    }

    /// Check the node's own invariants.
    pub fn validate(&self) -> Result<(), GraphError> {
        if let Some(info) = self.kind.crate_info() {
            if !info.has_root_in_srcs() {
                return Err(GraphError::RootNotInSources {
                    label: self.label.to_string(),
                    root: info.root.clone(),
                });
            }
        }
        Ok(())
    }
}
