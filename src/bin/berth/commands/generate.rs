//! `berth generate` command

use anyhow::{bail, Result};
use indicatif::{ProgressBar, ProgressStyle};

use berth::ops::{generate_all, GenerateEvent, GenerateOptions};
use berth::util::diagnostic::suggestions;

use super::{emit_failures, parse_labels, Session};
use crate::cli::{GenerateArgs, MessageFormat};

pub fn execute(args: GenerateArgs, color: bool) -> Result<()> {
    let session = Session::open(&args.graph)?;
    let config = &session.ctx.config().generate;

    // CLI > config > auto-detect
    let opts = GenerateOptions {
        jobs: args.jobs.or(config.jobs),
        keep_going: args.keep_going || config.keep_going(),
        targets: parse_labels(&args.target)?,
    };

    let graph = &session.graph_file.graph;
    let generator = &session.generator;
    let report = match args.message_format {
        MessageFormat::Json => {
            let mut print = |event: &GenerateEvent| println!("{}", event.to_json());
            generate_all(graph, generator, &opts, &mut print)?
        }
        MessageFormat::Human => {
            let mut progress: Option<ProgressBar> = None;
            let mut draw = |event: &GenerateEvent| observe(&mut progress, event);
            let report = generate_all(graph, generator, &opts, &mut draw)?;
            if let Some(pb) = progress {
                pb.finish_and_clear();
            }

            emit_failures(&report, color);
            eprintln!(
                "    Finished {} manifest(s) in {:.2}s ({} skipped, {} failed, {} blocked)",
                report.generated(),
                report.duration().as_secs_f64(),
                report.skipped(),
                report.failures().len(),
                report.blocked()
            );
            eprintln!("      Output {}", generator.output_root().display());
            report
        }
    };

    if !report.is_success() {
        if opts.keep_going {
            bail!("could not generate {} node(s)", report.failures().len());
        }
        bail!(
            "could not generate {} node(s)\n{}",
            report.failures().len(),
            suggestions::GENERATE_FAILED
        );
    }

    Ok(())
}

fn observe(progress: &mut Option<ProgressBar>, event: &GenerateEvent) {
    match event {
        GenerateEvent::Started { nodes, .. } => {
            let pb = ProgressBar::new(*nodes as u64);
            let style = ProgressStyle::default_bar()
                .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
                .map(|style| style.progress_chars("#>-"))
                .unwrap_or_else(|_| ProgressStyle::default_bar());
            pb.set_style(style);
            *progress = Some(pb);
        }
        GenerateEvent::ManifestGenerated { label, .. } => {
            tracing::debug!("Generated {}", label);
            if let Some(pb) = progress {
                pb.set_message(label.clone());
            }
        }
        GenerateEvent::NodeSkipped { label, rule } => {
            tracing::debug!("Skipped {} ({})", label, rule);
        }
        GenerateEvent::NodeBlocked {
            label,
            failed_dependency,
        } => {
            tracing::info!("Blocked {} by failed {}", label, failed_dependency);
        }
        GenerateEvent::NodeFailed { .. } | GenerateEvent::Finished { .. } => {}
    }

    if event.is_node_event() {
        if let Some(pb) = progress {
            pb.inc(1);
        }
    }
}
