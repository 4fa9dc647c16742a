//! Global context for Berth operations.
//!
//! Provides centralized access to configuration, paths, and environment.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::core::graph_file::GRAPH_FILE_NAME;
use crate::generator::ManifestGenerator;
use crate::util::config::{global_config_path, load_config, project_config_path, Config};
use crate::util::diagnostic::suggestions;
use crate::util::relpath::normalize;

/// Global context shared by all commands.
#[derive(Debug, Clone)]
pub struct GlobalContext {
    /// Current working directory
    cwd: PathBuf,

    /// Directory of the graph file; configuration and relative output
    /// directories are resolved against it
    project_root: PathBuf,

    /// Merged configuration
    config: Config,
}

impl GlobalContext {
    /// Create a context for the current directory.
    pub fn new() -> Result<Self> {
        let cwd = std::env::current_dir().context("failed to get current directory")?;
        Ok(Self::with_cwd(cwd))
    }

    /// Create a context for a specific directory.
    pub fn with_cwd(cwd: PathBuf) -> Self {
        let config = load_config(global_config_path().as_deref(), &project_config_path(&cwd));
        GlobalContext {
            project_root: cwd.clone(),
            cwd,
            config,
        }
    }

    /// Re-root the context at the directory of `graph_file`, reloading the
    /// project configuration from there.
    pub fn for_graph_file(mut self, graph_file: &Path) -> Self {
        let graph_file = self.cwd.join(graph_file);
        let root = graph_file
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| self.cwd.clone());

        if root != self.project_root {
            self.config = load_config(global_config_path().as_deref(), &project_config_path(&root));
            self.project_root = root;
        }
        self
    }

    /// Get the current working directory.
    pub fn cwd(&self) -> &Path {
        &self.cwd
    }

    /// Get the project root.
    pub fn project_root(&self) -> &Path {
        &self.project_root
    }

    /// Get the merged configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Find the graph file, starting from cwd and searching upward.
    pub fn find_graph_file(&self) -> Option<PathBuf> {
        let mut current = self.cwd.clone();
        loop {
            let candidate = current.join(GRAPH_FILE_NAME);
            if candidate.is_file() {
                return Some(candidate);
            }
            if !current.pop() {
                return None;
            }
        }
    }

    /// Resolve the graph file from an explicit path or by searching upward.
    pub fn graph_file(&self, explicit: Option<&Path>) -> Result<PathBuf> {
        match explicit {
            Some(path) => Ok(normalize(&self.cwd.join(path))),
            None => self.find_graph_file().ok_or_else(|| {
                anyhow::anyhow!(
                    "could not find {} in {} or any parent directory\n{}",
                    GRAPH_FILE_NAME,
                    self.cwd.display(),
                    suggestions::NO_GRAPH_FILE
                )
            }),
        }
    }

    /// Absolute output root, from an explicit override or the configuration.
    pub fn output_dir(&self, explicit: Option<&Path>) -> PathBuf {
        match explicit {
            Some(dir) => normalize(&self.cwd.join(dir)),
            None => self.config.generate.output_dir(&self.project_root),
        }
    }

    /// A manifest generator configured from this context.
    pub fn generator(&self, output_dir: PathBuf) -> ManifestGenerator {
        let generate = &self.config.generate;
        ManifestGenerator::new(output_dir)
            .generator_name(generate.generator_name())
            .version_policy(generate.version_policy())
    }
}
