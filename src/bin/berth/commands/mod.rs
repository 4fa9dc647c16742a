//! Command implementations

pub mod clean;
pub mod completions;
pub mod files;
pub mod generate;

use anyhow::{Context, Result};

use berth::core::{GraphFile, Label};
use berth::generator::ManifestGenerator;
use berth::ops::GenerateReport;
use berth::util::diagnostic::{emit, suggestions};
use berth::util::GlobalContext;

use crate::cli::GraphArgs;

/// A loaded graph together with a generator configured for it.
pub struct Session {
    pub ctx: GlobalContext,
    pub graph_file: GraphFile,
    pub generator: ManifestGenerator,
}

impl Session {
    /// Locate and load the graph, then resolve the output directory.
    pub fn open(args: &GraphArgs) -> Result<Self> {
        let ctx = GlobalContext::new()?;
        let path = ctx.graph_file(args.graph.as_deref())?;
        let ctx = ctx.for_graph_file(&path);

        let graph_file = GraphFile::load(&path, ctx.config().generate.default_edition())?;
        let generator = ctx.generator(ctx.output_dir(args.out.as_deref()));

        Ok(Session {
            ctx,
            graph_file,
            generator,
        })
    }
}

/// Parse command-line labels.
pub fn parse_labels(labels: &[String]) -> Result<Vec<Label>> {
    labels
        .iter()
        .map(|s| {
            s.parse::<Label>()
                .with_context(|| format!("invalid label `{}`\n{}", s, suggestions::UNKNOWN_LABEL))
        })
        .collect()
}

/// Print a diagnostic for every failed node.
pub fn emit_failures(report: &GenerateReport, color: bool) {
    for (_, error) in report.failures() {
        emit(&error.to_diagnostic(), color);
    }
}
