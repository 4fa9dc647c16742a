//! Configuration file support for Berth.
//!
//! Berth reads two configuration files:
//! - Global: `~/.berth/config.toml` - User-wide defaults
//! - Project: `.berth/config.toml` - Project-specific overrides
//!
//! Project config takes precedence over global config; command-line flags
//! take precedence over both.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::core::node::Edition;
use crate::generator::{VersionPolicy, DEFAULT_GENERATOR_NAME, DEFAULT_VERSION};

/// Output directory used when nothing else is configured.
pub const DEFAULT_OUTPUT_DIR: &str = "berth-out";

/// Berth configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Generation settings
    pub generate: GenerateConfig,
}

/// How nodes without a declared version are handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VersionPolicyKind {
    /// Fall back to `default-version`
    Default,
    /// Fail the node
    Require,
}

/// Generation-related configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct GenerateConfig {
    /// Output root, relative to the project root unless absolute
    pub output_dir: Option<PathBuf>,

    /// Name shown in generated manifest headers
    pub generator_name: Option<String>,

    /// Edition for nodes that declare none
    pub default_edition: Option<Edition>,

    /// Policy for nodes without a version
    pub version_policy: Option<VersionPolicyKind>,

    /// Version used under the `default` policy
    pub default_version: Option<String>,

    /// Worker threads
    pub jobs: Option<usize>,

    /// Continue with independent nodes after a failure
    pub keep_going: Option<bool>,
}

impl Config {
    /// Load configuration from a file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config: {}", path.display()))?;

        toml::from_str(&contents)
            .with_context(|| format!("failed to parse config: {}", path.display()))
    }

    /// Load configuration with fallback to defaults if the file doesn't exist
    /// or cannot be read.
    pub fn load_or_default(path: &Path) -> Self {
        if path.exists() {
            Self::load(path).unwrap_or_else(|e| {
                tracing::warn!("Failed to load config from {}: {:#}", path.display(), e);
                Self::default()
            })
        } else {
            Self::default()
        }
    }

    /// Merge another config into this one (other takes precedence).
    pub fn merge(&mut self, other: Config) {
        let ours = &mut self.generate;
        let theirs = other.generate;

        if theirs.output_dir.is_some() {
            ours.output_dir = theirs.output_dir;
        }
        if theirs.generator_name.is_some() {
            ours.generator_name = theirs.generator_name;
        }
        if theirs.default_edition.is_some() {
            ours.default_edition = theirs.default_edition;
        }
        if theirs.version_policy.is_some() {
            ours.version_policy = theirs.version_policy;
        }
        if theirs.default_version.is_some() {
            ours.default_version = theirs.default_version;
        }
        if theirs.jobs.is_some() {
            ours.jobs = theirs.jobs;
        }
        if theirs.keep_going.is_some() {
            ours.keep_going = theirs.keep_going;
        }
    }
}

impl GenerateConfig {
    /// Output root relative to `project_root`.
    pub fn output_dir(&self, project_root: &Path) -> PathBuf {
        let dir = self
            .output_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_DIR));
        project_root.join(dir)
    }

    /// Generator name for manifest headers.
    pub fn generator_name(&self) -> &str {
        self.generator_name.as_deref().unwrap_or(DEFAULT_GENERATOR_NAME)
    }

    /// Edition for nodes that declare none.
    pub fn default_edition(&self) -> Edition {
        self.default_edition.unwrap_or_default()
    }

    /// The effective version policy.
    pub fn version_policy(&self) -> VersionPolicy {
        match self.version_policy.unwrap_or(VersionPolicyKind::Default) {
            VersionPolicyKind::Require => VersionPolicy::Require,
            VersionPolicyKind::Default => VersionPolicy::Default(
                self.default_version
                    .clone()
                    .unwrap_or_else(|| DEFAULT_VERSION.to_string()),
            ),
        }
    }

    /// Whether to continue after failures.
    pub fn keep_going(&self) -> bool {
        self.keep_going.unwrap_or(false)
    }
}

/// Load merged configuration from global and project locations.
///
/// Order of precedence (highest to lowest):
/// 1. Project config (.berth/config.toml)
/// 2. Global config (~/.berth/config.toml)
/// 3. Defaults
pub fn load_config(global_path: Option<&Path>, project_path: &Path) -> Config {
    let mut config = Config::default();

    if let Some(global_path) = global_path {
        config.merge(Config::load_or_default(global_path));
    }
    config.merge(Config::load_or_default(project_path));

    config
}

/// Get the global berth config directory (~/.berth).
pub fn global_config_dir() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|b| b.home_dir().join(".berth"))
}

/// Get the global config path (~/.berth/config.toml).
pub fn global_config_path() -> Option<PathBuf> {
    global_config_dir().map(|dir| dir.join("config.toml"))
}

/// Get the project config path (.berth/config.toml).
pub fn project_config_path(project_root: &Path) -> PathBuf {
    project_root.join(".berth").join("config.toml")
}
