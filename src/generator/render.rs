//! Manifest text rendering.

use std::fmt::Write;

/// Target section of a manifest.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetSection {
    /// `[lib]`
    Lib,
    /// `[[bin]]`
    Bin,
}

impl TargetSection {
    /// The section header line.
    pub fn header(&self) -> &'static str {
        match self {
            TargetSection::Lib => "[lib]",
            TargetSection::Bin => "[[bin]]",
        }
    }
}

/// A path dependency line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencyLine {
    pub name: String,
    pub path: String,
}

/// Everything that goes into one manifest.
#[derive(Debug, Clone)]
pub struct ManifestContent {
    pub generator: String,
    pub label: String,
    pub descriptor: String,
    pub name: String,
    pub version: String,
    pub edition: String,
    pub section: TargetSection,
    pub entry_point: String,
    pub dependencies: Vec<DependencyLine>,
}

/// Render a manifest.
pub fn render_manifest(content: &ManifestContent) -> String {
    let mut out = String::new();

    // Writing into a String cannot fail.
    let _ = writeln!(
        out,
        "# Generated by {} from `{}` in `{}`",
        comment_text(&content.generator),
        comment_text(&content.label),
        comment_text(&content.descriptor)
    );
    out.push_str("[package]\n");
    let _ = writeln!(out, "name = {}", quote(&content.name));
    let _ = writeln!(out, "version = {}", quote(&content.version));
    let _ = writeln!(out, "edition = {}", quote(&content.edition));
    out.push('\n');

    out.push_str(content.section.header());
    out.push('\n');
    let _ = writeln!(out, "name = {}", quote(&content.name));
    let _ = writeln!(out, "path = {}", quote(&content.entry_point));
    out.push('\n');

    out.push_str("[dependencies]\n");
    for dep in &content.dependencies {
        let _ = writeln!(out, "{} = {{ path = {} }}", key(&dep.name), quote(&dep.path));
    }

    out
}

/// A TOML string value.
fn quote(s: &str) -> String {
    toml::Value::String(s.to_string()).to_string()
}

/// A TOML key, bare when possible.
fn key(s: &str) -> String {
    toml_edit::Key::new(s).to_string()
}

/// Text for the header comment; control characters would end the comment
/// line, so they are shown escaped.
fn comment_text(s: &str) -> String {
    s.chars()
        .map(|c| {
            if c.is_control() {
                c.escape_default().to_string()
            } else {
                c.to_string()
            }
        })
        .collect()
}
