//! Generation event types for JSON output.
//!
//! These events are emitted when using `--message-format=json`, one JSON
//! object per line.
//!
//! # Event Types
//!
//! - `generate-started`: A run is starting
//! - `manifest-generated`: A node's manifest was written (or already current)
//! - `node-skipped`: A node is not a crate and produced no manifest
//! - `node-failed`: A node's generation failed
//! - `node-blocked`: A node was not attempted because a dependency failed
//! - `generate-finished`: The run completed

use std::path::PathBuf;

use serde::Serialize;

/// An event emitted during a generation run.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "reason")]
pub enum GenerateEvent {
    #[serde(rename = "generate-started")]
    Started {
        /// Number of nodes in the graph
        nodes: usize,
        /// Output root
        output_dir: PathBuf,
    },

    #[serde(rename = "manifest-generated")]
    ManifestGenerated {
        label: String,
        manifest: PathBuf,
        /// Size of the node's published file set
        files: usize,
    },

    #[serde(rename = "node-skipped")]
    NodeSkipped {
        label: String,
        /// Kind of the node, e.g. `genrule`
        rule: String,
    },

    #[serde(rename = "node-failed")]
    NodeFailed { label: String, message: String },

    #[serde(rename = "node-blocked")]
    NodeBlocked {
        label: String,
        /// The failed node that blocks this one
        failed_dependency: String,
    },

    #[serde(rename = "generate-finished")]
    Finished {
        success: bool,
        generated: usize,
        skipped: usize,
        failed: usize,
        blocked: usize,
        duration_ms: u64,
    },
}

impl GenerateEvent {
    /// Check if this event concludes work on one node.
    pub fn is_node_event(&self) -> bool {
        matches!(
            self,
            GenerateEvent::ManifestGenerated { .. }
                | GenerateEvent::NodeSkipped { .. }
                | GenerateEvent::NodeFailed { .. }
                | GenerateEvent::NodeBlocked { .. }
        )
    }

    /// Serialize this event to a JSON string.
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }
}
