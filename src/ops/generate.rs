//! Generate manifests for a whole graph.
//!
//! The graph is walked in waves: every node's dependencies live in earlier
//! waves, so the nodes of one wave run in parallel and each node runs exactly
//! once, after all of its dependencies have published their outcome.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::path::PathBuf;
use std::time::{Duration, Instant};

use anyhow::{bail, Context, Result};
use rayon::prelude::*;

use crate::core::graph::BuildGraph;
use crate::core::label::Label;
use crate::core::node::NodeKind;
use crate::generator::{DepOutcome, GenerateError, ManifestGenerator, ManifestResult};
use crate::ops::events::GenerateEvent;

/// Options for a generation run.
#[derive(Debug, Clone, Default)]
pub struct GenerateOptions {
    /// Worker threads; defaults to the number of CPUs
    pub jobs: Option<usize>,

    /// Continue with independent nodes after a failure
    pub keep_going: bool,

    /// Only generate these nodes and their transitive dependencies;
    /// everything when empty
    pub targets: Vec<Label>,
}

/// What happened to one node.
#[derive(Debug)]
pub enum NodeOutcome {
    /// A manifest was generated
    Generated(ManifestResult),
    /// The node is not a crate
    Skipped,
    /// Generation failed
    Failed(GenerateError),
    /// Not attempted because the given dependency failed
    Blocked { by: Label },
}

impl NodeOutcome {
    /// The published result, if any.
    pub fn result(&self) -> Option<&ManifestResult> {
        match self {
            NodeOutcome::Generated(result) => Some(result),
            _ => None,
        }
    }

    /// The failed node responsible for this outcome, if it is a failure.
    fn failure_root<'a>(&'a self, label: &'a Label) -> Option<&'a Label> {
        match self {
            NodeOutcome::Failed(_) => Some(label),
            NodeOutcome::Blocked { by } => Some(by),
            _ => None,
        }
    }
}

/// Outcome of a generation run.
#[derive(Debug, Default)]
pub struct GenerateReport {
    outcomes: HashMap<Label, NodeOutcome>,
    duration: Duration,
}

impl GenerateReport {
    /// The outcome for a node, if it was reached.
    pub fn outcome(&self, label: &Label) -> Option<&NodeOutcome> {
        self.outcomes.get(label)
    }

    /// The published result for a node.
    pub fn result(&self, label: &Label) -> Option<&ManifestResult> {
        self.outcomes.get(label).and_then(NodeOutcome::result)
    }

    /// All published results.
    pub fn results(&self) -> impl Iterator<Item = &ManifestResult> {
        self.outcomes.values().filter_map(NodeOutcome::result)
    }

    /// Failed nodes with their errors, sorted by label.
    pub fn failures(&self) -> Vec<(&Label, &GenerateError)> {
        let mut failures: Vec<_> = self
            .outcomes
            .iter()
            .filter_map(|(label, outcome)| match outcome {
                NodeOutcome::Failed(e) => Some((label, e)),
                _ => None,
            })
            .collect();
        failures.sort_by(|a, b| a.0.cmp(b.0));
        failures
    }

    /// Number of generated manifests.
    pub fn generated(&self) -> usize {
        self.count(|o| matches!(o, NodeOutcome::Generated(_)))
    }

    /// Number of skipped nodes.
    pub fn skipped(&self) -> usize {
        self.count(|o| matches!(o, NodeOutcome::Skipped))
    }

    /// Number of blocked nodes.
    pub fn blocked(&self) -> usize {
        self.count(|o| matches!(o, NodeOutcome::Blocked { .. }))
    }

    /// Check if no node failed.
    pub fn is_success(&self) -> bool {
        self.failures().is_empty()
    }

    /// Wall time of the run.
    pub fn duration(&self) -> Duration {
        self.duration
    }

    /// Every file needed to materialize the manifests of `labels`.
    ///
    /// Nodes that are not crates contribute nothing; other nodes without a
    /// published result are an error.
    pub fn files_for(&self, labels: &[Label]) -> Result<BTreeSet<PathBuf>> {
        let mut files = BTreeSet::new();
        for label in labels {
            match self.outcomes.get(label) {
                Some(NodeOutcome::Generated(result)) => files.extend(result.files.iter().cloned()),
                Some(NodeOutcome::Skipped) => {}
                Some(NodeOutcome::Failed(_)) | Some(NodeOutcome::Blocked { .. }) => {
                    bail!("no manifest for `{}`: generation failed", label)
                }
                None => bail!("no manifest for `{}`: node was not generated", label),
            }
        }
        Ok(files)
    }

    fn count(&self, pred: impl Fn(&NodeOutcome) -> bool) -> usize {
        self.outcomes.values().filter(|o| pred(o)).count()
    }
}

/// Generate manifests for every selected node of `graph`.
///
/// Node failures are recorded in the report rather than returned; the
/// caller decides what a failed node means for the run. Errors returned
/// from here concern the run itself (bad selection, thread pool setup).
pub fn generate_all(
    graph: &BuildGraph,
    generator: &ManifestGenerator,
    opts: &GenerateOptions,
    observer: &mut dyn FnMut(&GenerateEvent),
) -> Result<GenerateReport> {
    let start = Instant::now();
    let selected = select(graph, &opts.targets)?;
    let levels = graph.levels()?;

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(opts.jobs.unwrap_or(0))
        .build()
        .context("failed to start worker threads")?;

    observer(&GenerateEvent::Started {
        nodes: selected.as_ref().map_or(graph.len(), HashSet::len),
        output_dir: generator.output_root().to_path_buf(),
    });

    let mut report = GenerateReport::default();

    for level in levels {
        let wave: Vec<&Label> = level
            .iter()
            .filter(|label| selected.as_ref().map_or(true, |s| s.contains(*label)))
            .collect();

        let mut ready = Vec::with_capacity(wave.len());
        for label in wave {
            match blocking_dependency(graph, &report, label) {
                Some(by) => {
                    observer(&GenerateEvent::NodeBlocked {
                        label: label.to_string(),
                        failed_dependency: by.to_string(),
                    });
                    report
                        .outcomes
                        .insert(label.clone(), NodeOutcome::Blocked { by });
                }
                None => ready.push(label),
            }
        }

        let outcomes = &report.outcomes;
        let results: Vec<(Label, Result<Option<ManifestResult>, GenerateError>)> =
            pool.install(|| {
                ready
                    .par_iter()
                    .filter_map(|label| graph.node(label))
                    .map(|node| {
                        let deps: Vec<DepOutcome<'_>> = node
                            .deps
                            .iter()
                            .map(|dep| (dep, outcomes.get(dep).and_then(NodeOutcome::result)))
                            .collect();
                        (node.label.clone(), generator.generate(node, &deps))
                    })
                    .collect()
            });

        let mut failed = false;
        for (label, result) in results {
            let outcome = match result {
                Ok(Some(result)) => {
                    tracing::debug!("Generated {}", label);
                    observer(&GenerateEvent::ManifestGenerated {
                        label: label.to_string(),
                        manifest: result.manifest.clone(),
                        files: result.files.len(),
                    });
                    NodeOutcome::Generated(result)
                }
                Ok(None) => {
                    let rule = match graph.node(&label).map(|n| &n.kind) {
                        Some(NodeKind::Unsupported { rule }) => rule.clone(),
                        _ => String::new(),
                    };
                    observer(&GenerateEvent::NodeSkipped {
                        label: label.to_string(),
                        rule,
                    });
                    NodeOutcome::Skipped
                }
                Err(e) => {
                    tracing::warn!("Failed to generate {}: {}", label, e);
                    observer(&GenerateEvent::NodeFailed {
                        label: label.to_string(),
                        message: e.to_string(),
                    });
                    failed = true;
                    NodeOutcome::Failed(e)
                }
            };
            report.outcomes.insert(label, outcome);
        }

        if failed && !opts.keep_going {
            break;
        }
    }

    report.duration = start.elapsed();
    observer(&GenerateEvent::Finished {
        success: report.is_success(),
        generated: report.generated(),
        skipped: report.skipped(),
        failed: report.failures().len(),
        blocked: report.blocked(),
        duration_ms: report.duration.as_millis() as u64,
    });

    Ok(report)
}

/// The failed node, if any, that prevents `label` from running.
fn blocking_dependency(graph: &BuildGraph, report: &GenerateReport, label: &Label) -> Option<Label> {
    graph.deps(label).iter().find_map(|dep| {
        report
            .outcomes
            .get(dep)
            .and_then(|outcome| outcome.failure_root(dep))
            .cloned()
    })
}

/// The requested nodes plus their transitive dependencies; `None` selects
/// the whole graph.
fn select(graph: &BuildGraph, targets: &[Label]) -> Result<Option<HashSet<Label>>> {
    if targets.is_empty() {
        return Ok(None);
    }

    let mut selected = HashSet::new();
    for target in targets {
        if !graph.contains(target) {
            bail!("`{}` is not in the graph", target);
        }
        selected.insert(target.clone());
        selected.extend(graph.transitive_deps(target));
    }
    Ok(Some(selected))
}
