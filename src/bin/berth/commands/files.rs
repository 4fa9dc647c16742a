//! `berth files` command
//!
//! Generates the manifests for the given labels, then prints every file a
//! Cargo build of them needs.

use anyhow::{bail, Result};

use berth::ops::{generate_all, GenerateEvent, GenerateOptions, NodeOutcome};
use berth::util::diagnostic::{emit, Diagnostic};

use super::{emit_failures, parse_labels, Session};
use crate::cli::FilesArgs;

pub fn execute(args: FilesArgs, color: bool) -> Result<()> {
    let session = Session::open(&args.graph)?;
    let graph = &session.graph_file.graph;

    let labels = if args.labels.is_empty() {
        graph.roots()
    } else {
        parse_labels(&args.labels)?
    };

    let opts = GenerateOptions {
        jobs: session.ctx.config().generate.jobs,
        keep_going: false,
        targets: labels.clone(),
    };

    let mut quiet = |_: &GenerateEvent| {};
    let report = generate_all(graph, &session.generator, &opts, &mut quiet)?;
    if !report.is_success() {
        emit_failures(&report, color);
        bail!("could not generate {} node(s)", report.failures().len());
    }

    for label in &labels {
        if let Some(NodeOutcome::Skipped) = report.outcome(label) {
            let warning =
                Diagnostic::warning(format!("`{}` is not a crate and has no manifest", label));
            emit(&warning, color);
        }
    }

    let files = report.files_for(&labels)?;
    if args.json {
        println!("{}", serde_json::to_string_pretty(&files)?);
    } else {
        for file in &files {
            println!("{}", file.display());
        }
    }

    Ok(())
}
