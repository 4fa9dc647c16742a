//! Portable relative paths between generated files.
//!
//! Manifests reference their entry point and their dependencies' manifest
//! directories through relative paths only, so a tree of manifests stays
//! valid wherever the output root ends up on disk.

use std::path::{Component, Path, PathBuf};

use thiserror::Error;

/// Two paths that cannot be expressed relative to each other.
#[derive(Debug, Clone, Error)]
#[error(
    "cannot express `{}` relative to `{}`: the paths share no common root",
    target.display(),
    base.display()
)]
pub struct InvalidPathError {
    pub target: PathBuf,
    pub base: PathBuf,
}

/// Lexically normalize a path: drop `.` segments and fold `..` into the
/// preceding segment where there is one. The filesystem is not consulted.
pub fn normalize(path: &Path) -> PathBuf {
    let mut out: Vec<Component<'_>> = Vec::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match out.last() {
                Some(Component::Normal(_)) => {
                    out.pop();
                }
                // `/..` is `/`
                Some(Component::RootDir) | Some(Component::Prefix(_)) => {}
                _ => out.push(component),
            },
            other => out.push(other),
        }
    }
    out.iter().collect()
}

/// The leading prefix/root components of a path.
fn anchor(path: &Path) -> Vec<Component<'_>> {
    path.components()
        .take_while(|c| matches!(c, Component::Prefix(_) | Component::RootDir))
        .collect()
}

/// Express `target` relative to the directory `base`.
///
/// Returns the shortest path, using `..` segments as needed and `/` as the
/// separator, such that joining it onto `base` leads back to `target`. Equal
/// paths yield `"."`.
pub fn relativize(target: &Path, base: &Path) -> Result<String, InvalidPathError> {
    let invalid = || InvalidPathError {
        target: target.to_path_buf(),
        base: base.to_path_buf(),
    };

    let target_norm = normalize(target);
    let base_norm = normalize(base);

    if anchor(&target_norm) != anchor(&base_norm) {
        return Err(invalid());
    }
    // A base that climbs out of its own root has no known location.
    if base_norm
        .components()
        .any(|c| matches!(c, Component::ParentDir))
    {
        return Err(invalid());
    }

    let diff = pathdiff::diff_paths(&target_norm, &base_norm).ok_or_else(invalid)?;

    let segments: Vec<String> = diff
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();

    if segments.is_empty() {
        Ok(".".to_string())
    } else {
        Ok(segments.join("/"))
    }
}
