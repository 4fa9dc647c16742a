//! BuildGraph - the immutable dependency graph handed over by the host.
//!
//! Edges point from a dependent to its dependency. Once built, the graph is
//! read-only for the duration of a generation run.

use std::collections::{HashMap, HashSet};
use std::path::PathBuf;

use petgraph::algo::toposort;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::Direction;
use thiserror::Error;

use crate::core::label::Label;
use crate::core::node::GraphNode;

/// Error while assembling the dependency graph.
#[derive(Debug, Error)]
pub enum GraphError {
    #[error("duplicate node `{label}`")]
    DuplicateLabel { label: String },

    #[error("`{from}` depends on unknown node `{to}`")]
    UnknownDependency { from: String, to: String },

    #[error("cycle detected in dependency graph at `{label}`")]
    Cycle { label: String },

    #[error("entry point `{}` of `{label}` is not one of its sources", root.display())]
    RootNotInSources { label: String, root: PathBuf },
}

/// The dependency graph of all nodes in a generation run.
#[derive(Debug, Clone, Default)]
pub struct BuildGraph {
    /// Edge structure
    graph: DiGraph<Label, ()>,

    /// Map from label to graph index
    label_to_index: HashMap<Label, NodeIndex>,

    /// Node payloads
    nodes: HashMap<Label, GraphNode>,
}

impl BuildGraph {
    /// Create a new empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a graph from a full node set, wiring every declared dependency.
    pub fn from_nodes(nodes: impl IntoIterator<Item = GraphNode>) -> Result<Self, GraphError> {
        let mut graph = BuildGraph::new();
        for node in nodes {
            graph.add_node(node)?;
        }

        let edges: Vec<(Label, Label)> = graph
            .nodes
            .values()
            .flat_map(|node| node.deps.iter().map(|dep| (node.label.clone(), dep.clone())))
            .collect();
        for (from, to) in edges {
            graph.add_edge(&from, &to)?;
        }

        // Surface cycles now rather than in the middle of a run.
        graph.topological_order()?;
        Ok(graph)
    }

    /// Add a node. Its edges are wired separately with [`BuildGraph::add_edge`].
    pub fn add_node(&mut self, node: GraphNode) -> Result<(), GraphError> {
        if self.label_to_index.contains_key(&node.label) {
            return Err(GraphError::DuplicateLabel {
                label: node.label.to_string(),
            });
        }
        node.validate()?;

        let index = self.graph.add_node(node.label.clone());
        self.label_to_index.insert(node.label.clone(), index);
        self.nodes.insert(node.label.clone(), node);
        Ok(())
    }

    /// Add a dependency edge: `from` depends on `to`.
    pub fn add_edge(&mut self, from: &Label, to: &Label) -> Result<(), GraphError> {
        let unknown = |label: &Label| GraphError::UnknownDependency {
            from: from.to_string(),
            to: label.to_string(),
        };
        let from_index = *self.label_to_index.get(from).ok_or_else(|| unknown(from))?;
        let to_index = *self.label_to_index.get(to).ok_or_else(|| unknown(to))?;

        if !self.graph.contains_edge(from_index, to_index) {
            self.graph.add_edge(from_index, to_index, ());
        }
        Ok(())
    }

    /// Get a node by label.
    pub fn node(&self, label: &Label) -> Option<&GraphNode> {
        self.nodes.get(label)
    }

    /// Check if a label is in the graph.
    pub fn contains(&self, label: &Label) -> bool {
        self.label_to_index.contains_key(label)
    }

    /// Get the number of nodes.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Check if empty.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Direct dependencies of a node, in declaration order.
    pub fn deps(&self, label: &Label) -> &[Label] {
        self.nodes
            .get(label)
            .map(|node| node.deps.as_slice())
            .unwrap_or_default()
    }

    /// Nodes nothing else depends on.
    pub fn roots(&self) -> Vec<Label> {
        let mut roots: Vec<Label> = self
            .graph
            .node_indices()
            .filter(|&n| {
                self.graph
                    .neighbors_directed(n, Direction::Incoming)
                    .next()
                    .is_none()
            })
            .map(|n| self.graph[n].clone())
            .collect();
        roots.sort();
        roots
    }

    /// Labels with dependencies before dependents.
    pub fn topological_order(&self) -> Result<Vec<Label>, GraphError> {
        let order = toposort(&self.graph, None).map_err(|cycle| GraphError::Cycle {
            label: self.graph[cycle.node_id()].to_string(),
        })?;

        // toposort yields dependents first since edges point at dependencies.
        Ok(order
            .into_iter()
            .rev()
            .map(|n| self.graph[n].clone())
            .collect())
    }

    /// Partition the graph into waves.
    ///
    /// Every node's dependencies are in strictly earlier waves, so the nodes
    /// of one wave can be processed independently of each other.
    pub fn levels(&self) -> Result<Vec<Vec<Label>>, GraphError> {
        let mut depth: HashMap<Label, usize> = HashMap::new();
        let mut levels: Vec<Vec<Label>> = Vec::new();

        for label in self.topological_order()? {
            let level = self
                .deps(&label)
                .iter()
                .filter_map(|dep| depth.get(dep))
                .map(|d| d + 1)
                .max()
                .unwrap_or(0);

            if levels.len() <= level {
                levels.resize_with(level + 1, Vec::new);
            }
            levels[level].push(label.clone());
            depth.insert(label, level);
        }

        for level in &mut levels {
            level.sort();
        }
        Ok(levels)
    }

    /// All transitive dependencies of a node, excluding the node itself.
    pub fn transitive_deps(&self, label: &Label) -> HashSet<Label> {
        let mut visited = HashSet::new();
        let mut stack = vec![label.clone()];

        while let Some(current) = stack.pop() {
            if visited.insert(current.clone()) {
                stack.extend(self.deps(&current).iter().cloned());
            }
        }

        visited.remove(label);
        visited
    }
}
