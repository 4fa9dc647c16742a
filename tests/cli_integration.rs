//! CLI integration tests for Berth.
//!
//! These tests run the binary against small graph descriptions written into
//! temporary workspaces.

use std::fs;
use std::path::Path;
use std::process::Command;

use assert_cmd::prelude::*;
use predicates::prelude::*;
use tempfile::TempDir;

/// Get the berth binary command, isolated from the user's global config.
fn berth(home: &Path) -> Command {
    let mut cmd = Command::cargo_bin("berth").unwrap();
    cmd.env("HOME", home).env_remove("BERTH_GRAPH");
    cmd
}

/// Create a temporary directory for test workspaces.
fn temp_dir() -> TempDir {
    TempDir::new().unwrap()
}

fn write(root: &Path, rel: &str, contents: &str) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, contents).unwrap();
}

/// A workspace with two libraries, a binary, a genrule and one external crate.
fn sample_workspace() -> TempDir {
    let tmp = temp_dir();
    let root = tmp.path();

    write(root, "lib1/src/lib.rs", "pub fn one() -> u32 { 1 }\n");
    write(root, "lib2/src/lib.rs", "pub fn two() -> u32 { lib1::one() + 1 }\n");
    write(root, "lib2/src/util.rs", "\n");
    write(root, "app/main.rs", "fn main() {}\n");
    write(root, "ext/dep/src/lib.rs", "pub fn dep() {}\n");
    write(
        root,
        "Berth.graph.toml",
        r#"
[workspace]
root = "."

[[node]]
label = "//:lib1"
kind = "library"
version = "0.1.0"
srcs = ["lib1/src/lib.rs"]

[[node]]
label = "//:lib2"
kind = "library"
version = "0.2.0"
srcs = ["lib2/src/*.rs"]
deps = ["//:lib1", "//:gen"]

[[node]]
label = "//:gen"
kind = "genrule"

[[node]]
label = "//app:app"
kind = "binary"
version = "1.0.0"
edition = "2018"
srcs = ["app/main.rs"]
deps = ["//:lib2", "@dep//:dep"]

[[node]]
label = "@dep//:dep"
kind = "library"
version = "0.3.0"
srcs = ["src/lib.rs"]
external = "ext/dep"
"#,
    );

    tmp
}

// ============================================================================
// berth generate
// ============================================================================

#[test]
fn test_generate_writes_manifests() {
    let tmp = sample_workspace();
    let root = tmp.path();

    berth(root)
        .arg("generate")
        .current_dir(root)
        .assert()
        .success()
        .stderr(predicate::str::contains("Finished 4 manifest(s)"));

    let out = root.join("berth-out");
    let lib1 = fs::read_to_string(out.join("lib1.cargo/Cargo.toml")).unwrap();
    assert!(lib1.starts_with("# Generated by berth from `//:lib1` in `BUILD`\n"));
    assert!(lib1.contains("name = \"lib1\""));
    assert!(lib1.contains("version = \"0.1.0\""));
    assert!(lib1.contains("[lib]"));
    assert!(lib1.contains("path = \"../../lib1/src/lib.rs\""));
    assert!(lib1.contains("[dependencies]"));

    let lib2 = fs::read_to_string(out.join("lib2.cargo/Cargo.toml")).unwrap();
    assert!(lib2.contains("lib1 = { path = \"../lib1.cargo\" }"));
    assert!(!lib2.contains("gen ="));

    let app = fs::read_to_string(out.join("app/app.cargo/Cargo.toml")).unwrap();
    assert!(app.contains("[[bin]]"));
    assert!(app.contains("edition = \"2018\""));
    assert!(app.contains("path = \"../../../app/main.rs\""));
    assert!(app.contains("lib2 = { path = \"../../lib2.cargo\" }"));
    assert!(app.contains("dep = { path = \"../../external~dep/dep.cargo\" }"));
    assert!(!out.join("gen.cargo").exists());
}

#[test]
fn test_generate_relocates_external_sources() {
    let tmp = sample_workspace();
    let root = tmp.path();

    berth(root)
        .arg("generate")
        .current_dir(root)
        .assert()
        .success();

    let dep_dir = root.join("berth-out/external~dep/dep.cargo");
    assert_eq!(
        fs::read_to_string(dep_dir.join("src/lib.rs")).unwrap(),
        "pub fn dep() {}\n"
    );
    let manifest = fs::read_to_string(dep_dir.join("Cargo.toml")).unwrap();
    assert!(manifest.contains("path = \"src/lib.rs\""));
}

#[test]
fn test_generate_is_idempotent() {
    let tmp = sample_workspace();
    let root = tmp.path();

    berth(root).arg("generate").current_dir(root).assert().success();
    let manifest = root.join("berth-out/lib2.cargo/Cargo.toml");
    let first = fs::read_to_string(&manifest).unwrap();

    berth(root).arg("generate").current_dir(root).assert().success();
    assert_eq!(fs::read_to_string(&manifest).unwrap(), first);
}

#[test]
fn test_generate_target_selects_dependencies_only() {
    let tmp = sample_workspace();
    let root = tmp.path();

    berth(root)
        .args(["generate", "--target", "//:lib2"])
        .current_dir(root)
        .assert()
        .success();

    let out = root.join("berth-out");
    assert!(out.join("lib1.cargo/Cargo.toml").exists());
    assert!(out.join("lib2.cargo/Cargo.toml").exists());
    assert!(!out.join("app/app.cargo").exists());
}

#[test]
fn test_generate_json_events() {
    let tmp = sample_workspace();
    let root = tmp.path();

    berth(root)
        .args(["generate", "--message-format", "json"])
        .current_dir(root)
        .assert()
        .success()
        .stdout(predicate::str::contains("\"reason\":\"generate-started\""))
        .stdout(predicate::str::contains("\"reason\":\"node-skipped\""))
        .stdout(predicate::str::contains("\"reason\":\"generate-finished\""))
        .stdout(predicate::str::contains("\"success\":true"));
}

#[test]
fn test_generate_custom_output_dir() {
    let tmp = sample_workspace();
    let root = tmp.path();

    berth(root)
        .args(["generate", "--out", "custom"])
        .current_dir(root)
        .assert()
        .success();

    assert!(root.join("custom/lib1.cargo/Cargo.toml").exists());
    assert!(!root.join("berth-out").exists());
}

#[test]
fn test_generate_without_graph_fails() {
    let tmp = temp_dir();

    berth(tmp.path())
        .arg("generate")
        .current_dir(tmp.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("could not find Berth.graph.toml"));
}

#[test]
fn test_generate_reports_graph_syntax_error() {
    let tmp = temp_dir();
    write(tmp.path(), "Berth.graph.toml", "[[node]\nlabel = \"//:a\"\n");

    berth(tmp.path())
        .arg("generate")
        .current_dir(tmp.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("berth::graph::parse"));
}

#[test]
fn test_generate_missing_version_under_require_policy() {
    let tmp = temp_dir();
    let root = tmp.path();
    write(root, "a/lib.rs", "\n");
    write(root, "b/lib.rs", "\n");
    write(root, "c/lib.rs", "\n");
    write(
        root,
        ".berth/config.toml",
        "[generate]\nversion-policy = \"require\"\n",
    );
    write(
        root,
        "Berth.graph.toml",
        r#"
[[node]]
label = "//:a"
kind = "library"
srcs = ["a/lib.rs"]

[[node]]
label = "//:b"
kind = "library"
version = "0.1.0"
srcs = ["b/lib.rs"]
deps = ["//:a"]

[[node]]
label = "//:c"
kind = "library"
version = "0.1.0"
srcs = ["c/lib.rs"]
"#,
    );

    berth(root)
        .args(["generate", "--keep-going"])
        .current_dir(root)
        .assert()
        .failure()
        .stderr(predicate::str::contains("`//:a` does not declare a version"))
        .stderr(predicate::str::contains("could not generate 1 node(s)"));

    // Independent work still happened; the dependent was blocked.
    assert!(root.join("berth-out/c.cargo/Cargo.toml").exists());
    assert!(!root.join("berth-out/b.cargo").exists());
}

// ============================================================================
// berth files
// ============================================================================

#[test]
fn test_files_lists_transitive_file_set() {
    let tmp = sample_workspace();
    let root = tmp.path();
    let out = root.join("berth-out");

    berth(root)
        .args(["files", "//app:app"])
        .current_dir(root)
        .assert()
        .success()
        .stdout(predicate::str::contains(
            out.join("app/app.cargo/Cargo.toml").display().to_string(),
        ))
        .stdout(predicate::str::contains(
            out.join("lib1.cargo/Cargo.toml").display().to_string(),
        ))
        .stdout(predicate::str::contains(
            out.join("external~dep/dep.cargo/src/lib.rs").display().to_string(),
        ));
}

#[test]
fn test_files_json() {
    let tmp = sample_workspace();
    let root = tmp.path();

    let output = berth(root)
        .args(["files", "//:lib1", "--json"])
        .current_dir(root)
        .output()
        .unwrap();
    assert!(output.status.success());

    let files: Vec<String> = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(files.len(), 1);
    assert!(files[0].ends_with("Cargo.toml"));
}

#[test]
fn test_files_defaults_to_graph_roots() {
    let tmp = sample_workspace();
    let root = tmp.path();
    let out = root.join("berth-out");

    let output = berth(root)
        .args(["files", "--json"])
        .current_dir(root)
        .output()
        .unwrap();
    assert!(output.status.success());

    // `//app:app` is the only node nothing depends on.
    let files: Vec<String> = serde_json::from_slice(&output.stdout).unwrap();
    assert!(files.contains(&out.join("app/app.cargo/Cargo.toml").display().to_string()));
    assert!(files.contains(&out.join("lib1.cargo/Cargo.toml").display().to_string()));
    assert!(files.contains(
        &out.join("external~dep/dep.cargo/src/lib.rs").display().to_string()
    ));
}

#[test]
fn test_files_warns_on_non_crate_label() {
    let tmp = sample_workspace();

    berth(tmp.path())
        .args(["files", "//:gen"])
        .current_dir(tmp.path())
        .assert()
        .success()
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::contains(
            "warning: `//:gen` is not a crate and has no manifest",
        ));
}

#[test]
fn test_files_rejects_bad_label() {
    let tmp = sample_workspace();

    berth(tmp.path())
        .args(["files", "lib1"])
        .current_dir(tmp.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid label `lib1`"));
}

#[test]
fn test_files_rejects_unknown_label() {
    let tmp = sample_workspace();

    berth(tmp.path())
        .args(["files", "//:nope"])
        .current_dir(tmp.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("`//:nope` is not in the graph"));
}

// ============================================================================
// berth clean
// ============================================================================

#[test]
fn test_clean_removes_output() {
    let tmp = sample_workspace();
    let root = tmp.path();

    berth(root).arg("generate").current_dir(root).assert().success();
    assert!(root.join("berth-out").exists());

    berth(root)
        .arg("clean")
        .current_dir(root)
        .assert()
        .success()
        .stderr(predicate::str::contains("Removed"));

    assert!(!root.join("berth-out").exists());
}

// ============================================================================
// berth completions
// ============================================================================

#[test]
fn test_completions_bash() {
    let tmp = temp_dir();

    berth(tmp.path())
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("berth"));
}
