//! `berth clean` command

use anyhow::Result;

use berth::util::fs::remove_dir_all_if_exists;
use berth::util::GlobalContext;

use crate::cli::CleanArgs;

pub fn execute(args: CleanArgs) -> Result<()> {
    let mut ctx = GlobalContext::new()?;

    // The configured output directory is relative to the graph file.
    if args.out.is_none() {
        if let Some(graph_file) = ctx.find_graph_file() {
            ctx = ctx.for_graph_file(&graph_file);
        }
    }

    let out_dir = ctx.output_dir(args.out.as_deref());
    remove_dir_all_if_exists(&out_dir)?;
    eprintln!("     Removed {}", out_dir.display());

    Ok(())
}
