//! Per-node manifest generation.
//!
//! [`ManifestGenerator::generate`] runs once per node, after every
//! dependency of the node has been generated. It never looks at more than
//! the node itself and the published results of its direct dependencies.

use std::collections::{BTreeSet, HashSet};
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::core::label::Label;
use crate::core::node::{CrateInfo, GraphNode, NodeKind};
use crate::generator::errors::GenerateError;
use crate::generator::relocate::relocate;
use crate::generator::render::{render_manifest, DependencyLine, ManifestContent, TargetSection};
use crate::util::fs::write_atomic;
use crate::util::relpath::relativize;

/// File name of every generated manifest.
pub const MANIFEST_FILE_NAME: &str = "Cargo.toml";

/// Default generator name shown in manifest headers.
pub const DEFAULT_GENERATOR_NAME: &str = "berth";

/// Version used when a node declares none and the policy allows a default.
pub const DEFAULT_VERSION: &str = "0.0.0";

/// What to do when a node declares no version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VersionPolicy {
    /// Use the given version
    Default(String),
    /// Fail the node
    Require,
}

impl Default for VersionPolicy {
    fn default() -> Self {
        VersionPolicy::Default(DEFAULT_VERSION.to_string())
    }
}

/// The published output of one node.
///
/// Immutable once created; dependents only ever read it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ManifestResult {
    /// Node the manifest was generated for
    pub label: Label,

    /// Crate name dependents use as their dependency key
    pub crate_name: String,

    /// Path of the written manifest
    pub manifest: PathBuf,

    /// This manifest, every relocated source, and the files of all
    /// transitive dependencies
    pub files: BTreeSet<PathBuf>,
}

impl ManifestResult {
    /// Directory holding the manifest; what dependents point their `path` at.
    pub fn manifest_dir(&self) -> &Path {
        self.manifest.parent().unwrap_or_else(|| Path::new("."))
    }
}

/// A dependency edge as seen by the generator: the dependency's label and
/// its published result, `None` when the dependency produced no manifest.
pub type DepOutcome<'a> = (&'a Label, Option<&'a ManifestResult>);

/// Renders and writes manifests under one output root.
#[derive(Debug, Clone)]
pub struct ManifestGenerator {
    output_root: PathBuf,
    generator_name: String,
    version_policy: VersionPolicy,
}

impl ManifestGenerator {
    /// Create a generator writing below `output_root`.
    pub fn new(output_root: impl Into<PathBuf>) -> Self {
        ManifestGenerator {
            output_root: output_root.into(),
            generator_name: DEFAULT_GENERATOR_NAME.to_string(),
            version_policy: VersionPolicy::default(),
        }
    }

    /// Set the name shown in manifest headers.
    pub fn generator_name(mut self, name: impl Into<String>) -> Self {
        self.generator_name = name.into();
        self
    }

    /// Set the policy for nodes without a version.
    pub fn version_policy(mut self, policy: VersionPolicy) -> Self {
        self.version_policy = policy;
        self
    }

    /// The output root.
    pub fn output_root(&self) -> &Path {
        &self.output_root
    }

    /// Directory that holds everything generated for `label`.
    pub fn output_dir(&self, label: &Label) -> PathBuf {
        self.output_root.join(label.output_key())
    }

    /// Path of the manifest generated for `label`.
    pub fn manifest_path(&self, label: &Label) -> PathBuf {
        self.output_dir(label).join(MANIFEST_FILE_NAME)
    }

    /// Generate the manifest of one node.
    ///
    /// Returns `Ok(None)` for unsupported kinds. On error the node's output
    /// directory is left as it was.
    pub fn generate(
        &self,
        node: &GraphNode,
        deps: &[DepOutcome<'_>],
    ) -> Result<Option<ManifestResult>, GenerateError> {
        let (info, section) = match &node.kind {
            NodeKind::Library { info, .. } => (info, TargetSection::Lib),
            NodeKind::Binary { info } => (info, TargetSection::Bin),
            NodeKind::Unsupported { rule } => {
                tracing::debug!("Skipping {} ({} is not a crate)", node.label, rule);
                return Ok(None);
            }
        };

        let version = self.resolve_version(&node.label, info)?;

        let out_dir = self.output_dir(&node.label);
        let manifest = out_dir.join(MANIFEST_FILE_NAME);

        let retained = retained_deps(&node.label, deps);
        let mut dependencies = Vec::with_capacity(retained.len());
        let mut names = HashSet::new();
        for dep in &retained {
            if !names.insert(dep.crate_name.as_str()) {
                return Err(GenerateError::DuplicateDependency {
                    label: node.label.to_string(),
                    name: dep.crate_name.clone(),
                });
            }
            dependencies.push(DependencyLine {
                name: dep.crate_name.clone(),
                path: relativize(dep.manifest_dir(), &out_dir)?,
            });
        }

        let staged = if info.origin.is_external() {
            Some(relocate(&node.label, info, &out_dir)?)
        } else {
            None
        };
        let entry_point = match &staged {
            Some(staged) => relativize(staged.root(), &out_dir)?,
            None => relativize(&info.root, &out_dir)?,
        };

        let text = render_manifest(&ManifestContent {
            generator: self.generator_name.clone(),
            label: node.label.to_string(),
            descriptor: info.descriptor.to_string_lossy().replace('\\', "/"),
            name: info.crate_name.clone(),
            version,
            edition: info.edition.to_string(),
            section,
            entry_point,
            dependencies,
        });

        let io_err = |source| GenerateError::Io {
            path: manifest.clone(),
            source,
        };
        let mut files = BTreeSet::new();
        match staged {
            // The manifest joins the relocated sources and lands with them.
            Some(staged) => {
                staged.write_file(MANIFEST_FILE_NAME, &text).map_err(io_err)?;
                files.extend(staged.commit()?.files);
            }
            None => {
                if write_atomic(&manifest, &text).map_err(io_err)? {
                    tracing::debug!("Wrote {}", manifest.display());
                } else {
                    tracing::debug!("{} is up to date", manifest.display());
                }
            }
        }

        files.insert(manifest.clone());
        for dep in &retained {
            files.extend(dep.files.iter().cloned());
        }

        Ok(Some(ManifestResult {
            label: node.label.clone(),
            crate_name: info.crate_name.clone(),
            manifest,
            files,
        }))
    }

    fn resolve_version(&self, label: &Label, info: &CrateInfo) -> Result<String, GenerateError> {
        let version = match (&info.version, &self.version_policy) {
            (Some(version), _) => version.clone(),
            (None, VersionPolicy::Default(default)) => default.clone(),
            (None, VersionPolicy::Require) => {
                return Err(GenerateError::MissingVersion {
                    label: label.to_string(),
                })
            }
        };

        semver::Version::parse(&version).map_err(|source| GenerateError::InvalidVersion {
            label: label.to_string(),
            version: version.clone(),
            source,
        })?;
        Ok(version)
    }
}

/// Dependencies that produced a manifest, each once, in edge order.
fn retained_deps<'a>(label: &Label, deps: &[DepOutcome<'a>]) -> Vec<&'a ManifestResult> {
    let mut seen = HashSet::new();
    let mut retained = Vec::new();
    for (dep_label, outcome) in deps {
        match outcome {
            Some(result) => {
                if seen.insert(*dep_label) {
                    retained.push(*result);
                }
            }
            None => tracing::debug!("{}: dropping edge to {} (no manifest)", label, dep_label),
        }
    }
    retained
}
