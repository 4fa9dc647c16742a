//! External source relocation.
//!
//! Sources of external crates live under a volatile external-dependency root
//! whose position relative to the output tree is not stable. Before such a
//! crate gets a manifest, its sources are copied into the crate's own output
//! directory, keeping their layout below the external root.
//!
//! Copies go to a staging directory next to the output directory first. The
//! staged tree replaces the output directory in one rename once it is
//! complete, so a failure at any point leaves the previous tree untouched
//! and files dropped from `srcs` do not linger.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tempfile::TempDir;

use crate::core::label::Label;
use crate::core::node::CrateInfo;
use crate::generator::errors::RelocateError;
use crate::util::fs::{copy_file, same_tree};

/// Name of the staged tree inside its temporary directory.
const STAGED_DIR: &str = "node";

/// Files produced by relocating one crate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelocationResult {
    /// Every relocated file at its final location, in source order
    pub files: Vec<PathBuf>,

    /// The copy of the crate's entry point
    pub root: PathBuf,
}

/// Relocated sources waiting to replace a crate's output directory.
///
/// Dropping it without [`commit`](StagedRelocation::commit) discards the
/// staged files and leaves the output directory as it was.
#[derive(Debug)]
pub struct StagedRelocation {
    staging: TempDir,
    out_dir: PathBuf,
    result: RelocationResult,
}

/// One planned copy; `rel` is the path below the external root.
#[derive(Debug)]
struct CopyStep {
    from: PathBuf,
    rel: PathBuf,
}

/// Stage the sources of an external crate for `out_dir`.
///
/// The whole batch is planned and checked before anything is written.
pub fn relocate(
    label: &Label,
    info: &CrateInfo,
    out_dir: &Path,
) -> Result<StagedRelocation, RelocateError> {
    let plan = plan(label, info)?;

    let root = plan
        .iter()
        .find(|step| step.from == info.root)
        .map(|step| out_dir.join(&step.rel))
        .ok_or_else(|| RelocateError::EntryPointNotFound {
            label: label.to_string(),
            root: info.root.clone(),
        })?;

    let stage_err = |source: io::Error| RelocateError::Stage {
        out_dir: out_dir.to_path_buf(),
        source,
    };
    let parent = out_dir.parent().unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(parent).map_err(stage_err)?;
    let staging = tempfile::Builder::new()
        .prefix(".berth-stage")
        .tempdir_in(parent)
        .map_err(stage_err)?;
    let staged = staging.path().join(STAGED_DIR);
    fs::create_dir_all(&staged).map_err(stage_err)?;

    let mut files = Vec::with_capacity(plan.len());
    for step in &plan {
        let to = staged.join(&step.rel);
        copy_file(&step.from, &to).map_err(|source| RelocateError::Io {
            from: step.from.clone(),
            to,
            source,
        })?;
        files.push(out_dir.join(&step.rel));
    }

    tracing::debug!(
        "Staged {} source(s) of {} for {}",
        files.len(),
        label,
        out_dir.display()
    );

    Ok(StagedRelocation {
        staging,
        out_dir: out_dir.to_path_buf(),
        result: RelocationResult { files, root },
    })
}

impl StagedRelocation {
    /// Where the crate's entry point will live after the commit.
    pub fn root(&self) -> &Path {
        &self.result.root
    }

    /// Write an additional file, such as the manifest, into the staged tree.
    pub fn write_file(&self, name: &str, contents: &str) -> io::Result<()> {
        fs::write(self.staged_dir().join(name), contents)
    }

    /// Replace the output directory with the staged tree.
    ///
    /// Nothing is moved when the output directory already holds the same
    /// files. If the swap fails, the previous output directory is restored.
    pub fn commit(self) -> Result<RelocationResult, RelocateError> {
        let staged = self.staged_dir();
        let out_dir = &self.out_dir;

        if same_tree(&staged, out_dir) {
            tracing::debug!("{} is up to date", out_dir.display());
            return Ok(self.result);
        }

        let replace_err = |source: io::Error| RelocateError::Replace {
            out_dir: out_dir.clone(),
            source,
        };

        // The previous tree is parked next to the staging directory and
        // removed with it.
        let backup = self.staging.path().join("previous");
        let had_previous = out_dir.exists();
        if had_previous {
            fs::rename(out_dir, &backup).map_err(replace_err)?;
        }

        if let Err(source) = fs::rename(&staged, out_dir) {
            if had_previous {
                if let Err(e) = fs::rename(&backup, out_dir) {
                    tracing::warn!(
                        "Could not restore {} after a failed update: {}",
                        out_dir.display(),
                        e
                    );
                }
            }
            return Err(replace_err(source));
        }

        tracing::debug!(
            "Relocated {} source(s) into {}",
            self.result.files.len(),
            out_dir.display()
        );
        Ok(self.result)
    }

    fn staged_dir(&self) -> PathBuf {
        self.staging.path().join(STAGED_DIR)
    }
}

fn plan(label: &Label, info: &CrateInfo) -> Result<Vec<CopyStep>, RelocateError> {
    let external_root = info
        .external_root()
        .ok_or_else(|| RelocateError::NotExternal {
            label: label.to_string(),
        })?;

    info.srcs
        .iter()
        .map(|src| {
            let rel = src
                .strip_prefix(external_root)
                .map_err(|_| RelocateError::SourceOutsideRoot {
                    label: label.to_string(),
                    src: src.clone(),
                    root: external_root.to_path_buf(),
                })?;
            Ok(CopyStep {
                from: src.clone(),
                rel: rel.to_path_buf(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn label() -> Label {
        "@dep//:dep".parse().unwrap()
    }

    fn external_crate(tmp: &TempDir) -> CrateInfo {
        let ext = tmp.path().join("external/dep");
        fs::create_dir_all(ext.join("src/b")).unwrap();
        fs::write(ext.join("src/a.rs"), "mod b;").unwrap();
        fs::write(ext.join("src/b/c.rs"), "pub fn c() {}").unwrap();

        CrateInfo::new("dep", ext.join("src/a.rs"))
            .with_srcs([ext.join("src/b/c.rs")])
            .with_external_root(&ext)
    }

    /// Entries of `dir` other than the given names.
    fn leftovers(dir: &Path, expected: &[&str]) -> Vec<String> {
        fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .filter(|name| !expected.contains(&name.as_str()))
            .collect()
    }

    #[test]
    fn test_relocate_mirrors_layout() {
        let tmp = TempDir::new().unwrap();
        let info = external_crate(&tmp);
        let out = tmp.path().join("out/dep.cargo");

        let staged = relocate(&label(), &info, &out).unwrap();
        assert_eq!(staged.root(), out.join("src/a.rs"));
        assert!(!out.exists());

        let result = staged.commit().unwrap();
        assert_eq!(result.files, vec![out.join("src/a.rs"), out.join("src/b/c.rs")]);
        assert_eq!(result.root, out.join("src/a.rs"));
        assert_eq!(fs::read_to_string(out.join("src/b/c.rs")).unwrap(), "pub fn c() {}");
        assert!(leftovers(&tmp.path().join("out"), &["dep.cargo"]).is_empty());
    }

    #[test]
    fn test_relocate_rejects_workspace_crate() {
        let tmp = TempDir::new().unwrap();
        let info = CrateInfo::new("local", tmp.path().join("src/lib.rs"));

        let err = relocate(&label(), &info, tmp.path()).unwrap_err();
        assert!(matches!(err, RelocateError::NotExternal { .. }));
    }

    #[test]
    fn test_missing_entry_point_writes_nothing() {
        let tmp = TempDir::new().unwrap();
        let mut info = external_crate(&tmp);
        info.root = tmp.path().join("external/dep/src/missing.rs");
        let out = tmp.path().join("out/dep.cargo");

        let err = relocate(&label(), &info, &out).unwrap_err();
        assert!(matches!(err, RelocateError::EntryPointNotFound { .. }));
        assert!(!tmp.path().join("out").exists());
    }

    #[test]
    fn test_source_outside_root() {
        let tmp = TempDir::new().unwrap();
        let info = external_crate(&tmp).with_srcs([tmp.path().join("elsewhere.rs")]);
        let out = tmp.path().join("out/dep.cargo");

        let err = relocate(&label(), &info, &out).unwrap_err();
        assert!(matches!(err, RelocateError::SourceOutsideRoot { .. }));
        assert!(!tmp.path().join("out").exists());
    }

    #[test]
    fn test_failed_copy_leaves_no_trace() {
        let tmp = TempDir::new().unwrap();
        // The second source does not exist on disk, so its copy fails.
        let info = external_crate(&tmp).with_srcs([tmp.path().join("external/dep/src/z.rs")]);
        let out = tmp.path().join("out/dep.cargo");

        let err = relocate(&label(), &info, &out).unwrap_err();
        assert!(matches!(err, RelocateError::Io { .. }));
        assert!(!out.exists());
        assert!(leftovers(&tmp.path().join("out"), &[]).is_empty());
    }

    #[test]
    fn test_failed_rerun_keeps_previous_tree() {
        let tmp = TempDir::new().unwrap();
        let info = external_crate(&tmp);
        let out = tmp.path().join("out/dep.cargo");
        relocate(&label(), &info, &out).unwrap().commit().unwrap();

        let broken = info.with_srcs([tmp.path().join("external/dep/src/z.rs")]);
        relocate(&label(), &broken, &out).unwrap_err();

        assert_eq!(fs::read_to_string(out.join("src/a.rs")).unwrap(), "mod b;");
        assert_eq!(fs::read_to_string(out.join("src/b/c.rs")).unwrap(), "pub fn c() {}");
        assert!(leftovers(&tmp.path().join("out"), &["dep.cargo"]).is_empty());
    }

    #[test]
    fn test_uncommitted_stage_is_discarded() {
        let tmp = TempDir::new().unwrap();
        let info = external_crate(&tmp);
        let out = tmp.path().join("out/dep.cargo");

        let staged = relocate(&label(), &info, &out).unwrap();
        staged.write_file("Cargo.toml", "[package]\n").unwrap();
        drop(staged);

        assert!(!out.exists());
        assert!(leftovers(&tmp.path().join("out"), &[]).is_empty());
    }

    #[test]
    fn test_dropped_sources_are_pruned() {
        let tmp = TempDir::new().unwrap();
        let info = external_crate(&tmp);
        let out = tmp.path().join("out/dep.cargo");
        relocate(&label(), &info, &out).unwrap().commit().unwrap();
        assert!(out.join("src/b/c.rs").exists());

        let mut shrunk = info;
        shrunk.srcs.retain(|src| !src.ends_with("b/c.rs"));
        let result = relocate(&label(), &shrunk, &out).unwrap().commit().unwrap();

        assert_eq!(result.files, vec![out.join("src/a.rs")]);
        assert!(out.join("src/a.rs").exists());
        assert!(!out.join("src/b/c.rs").exists());
    }

    #[test]
    fn test_unchanged_tree_is_not_replaced() {
        let tmp = TempDir::new().unwrap();
        let info = external_crate(&tmp);
        let out = tmp.path().join("out/dep.cargo");
        relocate(&label(), &info, &out).unwrap().commit().unwrap();

        let before = fs::metadata(out.join("src/a.rs")).unwrap().modified().unwrap();
        relocate(&label(), &info, &out).unwrap().commit().unwrap();
        let after = fs::metadata(out.join("src/a.rs")).unwrap().modified().unwrap();

        assert_eq!(before, after);
    }
}
