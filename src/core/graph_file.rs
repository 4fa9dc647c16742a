//! Graph description files.
//!
//! The host build system describes its graph in a TOML file with one
//! `[[node]]` table per buildable unit:
//!
//! ```toml
//! [workspace]
//! root = "."
//!
//! [[node]]
//! label = "//:lib1"
//! kind = "library"
//! version = "0.1.0"
//! srcs = ["lib1/src/**/*.rs"]
//! root = "lib1/src/lib.rs"
//! deps = ["//:lib2"]
//! ```

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use miette::{Diagnostic as MietteDiagnostic, NamedSource, SourceSpan};
use serde::Deserialize;
use thiserror::Error;

use crate::core::graph::BuildGraph;
use crate::core::label::Label;
use crate::core::node::{CrateInfo, Edition, GraphNode, LibraryKind, NodeKind, SourceOrigin};
use crate::util::fs::glob_files;

/// Canonical graph file name.
pub const GRAPH_FILE_NAME: &str = "Berth.graph.toml";

/// Graph file that could not be parsed.
#[derive(Debug, Error, MietteDiagnostic)]
#[error("failed to parse graph file `{path}`: {message}")]
#[diagnostic(
    code(berth::graph::parse),
    help("Each node needs at least `label` and `kind`; see `[[node]]` tables")
)]
pub struct GraphFileError {
    pub path: String,
    pub message: String,
    #[source_code]
    pub src: NamedSource<String>,
    #[label("here")]
    pub span: Option<SourceSpan>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawGraphFile {
    #[serde(default)]
    workspace: RawWorkspace,

    #[serde(default, rename = "node")]
    nodes: Vec<RawNode>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawWorkspace {
    root: Option<PathBuf>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawNode {
    label: Label,
    kind: String,
    version: Option<String>,
    edition: Option<Edition>,
    crate_name: Option<String>,
    #[serde(default)]
    srcs: Vec<String>,
    root: Option<PathBuf>,
    #[serde(default)]
    deps: Vec<Label>,
    descriptor: Option<PathBuf>,
    external: Option<PathBuf>,
}

/// A graph loaded from a description file.
#[derive(Debug)]
pub struct GraphFile {
    /// Path of the description file
    pub path: PathBuf,

    /// Primary workspace root
    pub workspace_root: PathBuf,

    /// The assembled graph
    pub graph: BuildGraph,
}

impl GraphFile {
    /// Load and assemble a graph description.
    ///
    /// `default_edition` applies to nodes that declare none.
    pub fn load(path: &Path, default_edition: Edition) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read graph file: {}", path.display()))?;
        Self::parse(path, &contents, default_edition)
    }

    /// Parse a graph description from a string.
    pub fn parse(path: &Path, contents: &str, default_edition: Edition) -> Result<Self> {
        let raw: RawGraphFile = toml::from_str(contents).map_err(|e| GraphFileError {
            path: path.display().to_string(),
            message: e.message().to_string(),
            src: NamedSource::new(path.display().to_string(), contents.to_string()),
            span: e.span().map(SourceSpan::from),
        })?;

        let file_dir = path.parent().unwrap_or_else(|| Path::new("."));
        let workspace_root = match &raw.workspace.root {
            Some(root) => file_dir.join(root),
            None => file_dir.to_path_buf(),
        };

        let mut nodes = Vec::with_capacity(raw.nodes.len());
        for raw_node in raw.nodes {
            let label = raw_node.label.to_string();
            let node = build_node(raw_node, file_dir, &workspace_root, default_edition)
                .with_context(|| format!("invalid node `{}` in {}", label, path.display()))?;
            nodes.push(node);
        }

        tracing::debug!("Loaded {} node(s) from {}", nodes.len(), path.display());

        let graph = BuildGraph::from_nodes(nodes)
            .with_context(|| format!("invalid graph in {}", path.display()))?;

        Ok(GraphFile {
            path: path.to_path_buf(),
            workspace_root,
            graph,
        })
    }
}

/// Supported kind names, with the aliases host rules commonly use.
enum CrateKind {
    Library(LibraryKind),
    Binary,
}

fn parse_kind(kind: &str) -> Option<CrateKind> {
    match kind {
        "library" | "lib" | "rlib" => Some(CrateKind::Library(LibraryKind::Rlib)),
        "shared-library" | "dylib" | "cdylib" => {
            Some(CrateKind::Library(LibraryKind::SharedLibrary))
        }
        "static-library" | "staticlib" => Some(CrateKind::Library(LibraryKind::StaticLibrary)),
        "binary" | "bin" => Some(CrateKind::Binary),
        _ => None,
    }
}

fn build_node(
    raw: RawNode,
    file_dir: &Path,
    workspace_root: &Path,
    default_edition: Edition,
) -> Result<GraphNode> {
    let Some(kind) = parse_kind(&raw.kind) else {
        return Ok(GraphNode::unsupported(raw.label, raw.kind).with_deps(raw.deps));
    };

    let (origin, src_base) = match &raw.external {
        Some(external) => {
            let root = file_dir.join(external);
            (SourceOrigin::External { root: root.clone() }, root)
        }
        None => (SourceOrigin::Workspace, workspace_root.to_path_buf()),
    };

    let srcs = expand_srcs(&src_base, &raw.srcs)?;
    let root = match raw.root {
        Some(root) => src_base.join(root),
        None => default_root(&srcs, matches!(kind, CrateKind::Binary))?,
    };

    let descriptor = raw.descriptor.unwrap_or_else(|| {
        let mut descriptor = PathBuf::from(raw.label.package());
        descriptor.push("BUILD");
        descriptor
    });

    let info = CrateInfo {
        crate_name: raw
            .crate_name
            .unwrap_or_else(|| raw.label.default_crate_name()),
        version: raw.version,
        edition: raw.edition.unwrap_or(default_edition),
        srcs,
        root,
        origin,
        descriptor,
    };

    let kind = match kind {
        CrateKind::Library(kind) => NodeKind::Library { info, kind },
        CrateKind::Binary => NodeKind::Binary { info },
    };
    Ok(GraphNode::with_kind(raw.label, kind).with_deps(raw.deps))
}

/// Expand source entries. Entries without glob metacharacters are taken
/// verbatim so that not-yet-existing files can still be declared.
fn expand_srcs(base: &Path, entries: &[String]) -> Result<Vec<PathBuf>> {
    let mut srcs = Vec::new();
    for entry in entries {
        if entry.contains(['*', '?', '[']) {
            srcs.extend(glob_files(base, std::slice::from_ref(entry))?);
        } else {
            srcs.push(base.join(entry));
        }
    }
    srcs.sort();
    srcs.dedup();
    Ok(srcs)
}

/// Pick the entry point when none is declared: the only source, or the
/// conventional `lib.rs` / `main.rs`.
fn default_root(srcs: &[PathBuf], binary: bool) -> Result<PathBuf> {
    if let [only] = srcs {
        return Ok(only.clone());
    }

    let conventional = if binary { "main.rs" } else { "lib.rs" };
    let candidates: Vec<&PathBuf> = srcs
        .iter()
        .filter(|s| s.file_name().is_some_and(|n| n == conventional))
        .collect();

    match candidates.as_slice() {
        [root] => Ok((*root).clone()),
        [] => bail!("no `root` given and no `{}` among the sources", conventional),
        _ => bail!(
            "no `root` given and {} sources are named `{}`",
            candidates.len(),
            conventional
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn parse(contents: &str) -> Result<GraphFile> {
        GraphFile::parse(Path::new("/ws/Berth.graph.toml"), contents, Edition::E2021)
    }

    #[test]
    fn test_parse_basic_graph() {
        let file = parse(
            r#"
            [[node]]
            label = "//:lib1"
            kind = "library"
            version = "0.1.0"
            srcs = ["lib1/src/lib.rs"]
            root = "lib1/src/lib.rs"

            [[node]]
            label = "//app:app"
            kind = "binary"
            edition = "2018"
            srcs = ["app/main.rs"]
            deps = ["//:lib1", "//proto:gen"]

            [[node]]
            label = "//proto:gen"
            kind = "genrule"
            "#,
        )
        .unwrap();

        assert_eq!(file.workspace_root, PathBuf::from("/ws"));
        assert_eq!(file.graph.len(), 3);

        let lib = file.graph.node(&"//:lib1".parse().unwrap()).unwrap();
        let info = lib.kind.crate_info().unwrap();
        assert_eq!(info.root, PathBuf::from("/ws/lib1/src/lib.rs"));
        assert_eq!(info.version.as_deref(), Some("0.1.0"));
        assert_eq!(info.descriptor, PathBuf::from("BUILD"));

        let app = file.graph.node(&"//app:app".parse().unwrap()).unwrap();
        let info = app.kind.crate_info().unwrap();
        assert!(matches!(app.kind, NodeKind::Binary { .. }));
        assert_eq!(info.edition, Edition::E2018);
        assert_eq!(info.root, PathBuf::from("/ws/app/main.rs"));
        assert_eq!(info.descriptor, PathBuf::from("app/BUILD"));
        assert_eq!(app.deps.len(), 2);

        let gen = file.graph.node(&"//proto:gen".parse().unwrap()).unwrap();
        assert!(!gen.kind.is_supported());
    }

    #[test]
    fn test_external_node() {
        let file = parse(
            r#"
            [[node]]
            label = "@dep//:dep"
            kind = "static-library"
            external = "../cache/dep"
            crate_name = "dep_sys"
            srcs = ["src/lib.rs", "src/ffi.rs"]
            root = "src/lib.rs"
            "#,
        )
        .unwrap();

        let node = file.graph.node(&"@dep//:dep".parse().unwrap()).unwrap();
        let NodeKind::Library { info, kind } = &node.kind else {
            panic!("expected a library");
        };
        assert_eq!(*kind, LibraryKind::StaticLibrary);
        assert_eq!(info.crate_name, "dep_sys");
        assert_eq!(info.external_root(), Some(Path::new("/ws/../cache/dep")));
        assert_eq!(info.root, PathBuf::from("/ws/../cache/dep/src/lib.rs"));
    }

    #[test]
    fn test_globbed_sources_and_default_root() {
        let tmp = TempDir::new().unwrap();
        let src = tmp.path().join("lib1/src");
        std::fs::create_dir_all(src.join("nested")).unwrap();
        std::fs::write(src.join("lib.rs"), "").unwrap();
        std::fs::write(src.join("nested/mod.rs"), "").unwrap();

        let path = tmp.path().join(GRAPH_FILE_NAME);
        std::fs::write(
            &path,
            r#"
            [[node]]
            label = "//:lib1"
            kind = "library"
            srcs = ["lib1/src/**/*.rs"]
            "#,
        )
        .unwrap();

        let file = GraphFile::load(&path, Edition::E2024).unwrap();
        let node = file.graph.node(&"//:lib1".parse().unwrap()).unwrap();
        let info = node.kind.crate_info().unwrap();
        assert_eq!(info.srcs.len(), 2);
        assert_eq!(info.root, src.join("lib.rs"));
        assert_eq!(info.edition, Edition::E2024);
    }

    #[test]
    fn test_root_outside_sources_is_rejected() {
        let err = parse(
            r#"
            [[node]]
            label = "//:a"
            kind = "library"
            srcs = ["a/lib.rs"]
            root = "a/other.rs"
            "#,
        )
        .unwrap_err();
        assert!(format!("{:#}", err).contains("is not one of its sources"));
    }

    #[test]
    fn test_syntax_error_has_span() {
        let err = parse("[[node]]\nlabel = \n").unwrap_err();
        let err = err.downcast::<GraphFileError>().unwrap();
        assert!(err.span.is_some());
    }

    #[test]
    fn test_unknown_field_is_rejected() {
        assert!(parse("[[node]]\nlabel = \"//:a\"\nkind = \"library\"\nbogus = 1\n").is_err());
    }
}
