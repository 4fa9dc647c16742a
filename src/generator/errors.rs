//! Generation error types and diagnostics.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::util::diagnostic::Diagnostic;
use crate::util::relpath::InvalidPathError;

/// Error while relocating external sources.
#[derive(Debug, Error)]
pub enum RelocateError {
    #[error("`{label}` does not have external sources")]
    NotExternal { label: String },

    #[error("entry point `{}` of `{label}` is not among its relocated sources", root.display())]
    EntryPointNotFound { label: String, root: PathBuf },

    #[error("source `{}` of `{label}` is outside its external root `{}`", src.display(), root.display())]
    SourceOutsideRoot {
        label: String,
        src: PathBuf,
        root: PathBuf,
    },

    #[error("failed to copy `{}` to `{}`", from.display(), to.display())]
    Io {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to stage relocated sources next to `{}`", out_dir.display())]
    Stage {
        out_dir: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to move relocated sources into `{}`", out_dir.display())]
    Replace {
        out_dir: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Error while generating the manifest of a single node.
///
/// Any of these aborts the node: no manifest is written and no result is
/// published.
#[derive(Debug, Error)]
pub enum GenerateError {
    #[error(transparent)]
    InvalidPath(#[from] InvalidPathError),

    #[error(transparent)]
    Relocate(#[from] RelocateError),

    #[error("`{label}` does not declare a version")]
    MissingVersion { label: String },

    #[error("`{label}` declares invalid version `{version}`")]
    InvalidVersion {
        label: String,
        version: String,
        #[source]
        source: semver::Error,
    },

    #[error("`{label}` depends on more than one crate named `{name}`")]
    DuplicateDependency { label: String, name: String },

    #[error("failed to write manifest `{}`", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl GenerateError {
    /// Convert to a user-friendly diagnostic.
    pub fn to_diagnostic(&self) -> Diagnostic {
        match self {
            GenerateError::InvalidPath(e) => Diagnostic::error(e.to_string())
                .with_context("manifests reference files through relative paths only")
                .with_suggestion("Use an absolute output directory, or a relative one inside the workspace"),

            GenerateError::Relocate(RelocateError::EntryPointNotFound { label, root }) => {
                Diagnostic::error(format!("cannot relocate `{}`", label))
                    .with_context(format!("entry point `{}` is not one of its sources", root.display()))
                    .with_suggestion("Check that the host lists the crate root in `srcs`")
            }

            GenerateError::Relocate(RelocateError::SourceOutsideRoot { label, src, root }) => {
                Diagnostic::error(format!("cannot relocate `{}`", label))
                    .with_context(format!(
                        "`{}` is not under `{}`",
                        src.display(),
                        root.display()
                    ))
                    .with_suggestion("Check the node's `external` root")
            }

            GenerateError::Relocate(e) => Diagnostic::error(e.to_string()),

            GenerateError::MissingVersion { label } => {
                Diagnostic::error(format!("`{}` does not declare a version", label))
                    .with_suggestion("Add `version = \"x.y.z\"` to the node")
                    .with_suggestion("Set `version-policy = \"default\"` in .berth/config.toml")
            }

            GenerateError::InvalidVersion { label, version, source } => {
                Diagnostic::error(format!("`{}` declares invalid version `{}`", label, version))
                    .with_context(source.to_string())
                    .with_suggestion("Cargo requires a full semver version such as `1.2.3`")
            }

            GenerateError::DuplicateDependency { label, name } => Diagnostic::error(format!(
                "`{}` depends on more than one crate named `{}`",
                label, name
            ))
            .with_suggestion("Give one of the dependencies a distinct `crate_name`"),

            GenerateError::Io { path, source } => {
                Diagnostic::error(format!("failed to write `{}`", path.display()))
                    .with_context(source.to_string())
                    .with_location(path.clone())
            }
        }
    }
}
