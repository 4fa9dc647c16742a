//! CLI definitions using clap.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use clap_complete::Shell;

/// Berth - Cargo manifests for crates built by another build system
#[derive(Parser)]
#[command(name = "berth")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Generate a Cargo.toml for every crate in the graph
    Generate(GenerateArgs),

    /// Print the files needed to build the given crates with Cargo
    Files(FilesArgs),

    /// Remove generated manifests
    Clean(CleanArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

/// Where the graph comes from and where manifests go.
#[derive(Args)]
pub struct GraphArgs {
    /// Graph description (defaults to the nearest Berth.graph.toml)
    #[arg(long, env = "BERTH_GRAPH")]
    pub graph: Option<PathBuf>,

    /// Output directory for generated manifests
    #[arg(long)]
    pub out: Option<PathBuf>,
}

#[derive(Args)]
pub struct GenerateArgs {
    #[command(flatten)]
    pub graph: GraphArgs,

    /// Only generate these labels and their dependencies
    #[arg(long)]
    pub target: Vec<String>,

    /// Number of parallel jobs
    #[arg(short, long)]
    pub jobs: Option<usize>,

    /// Keep generating independent nodes after a failure
    #[arg(long)]
    pub keep_going: bool,

    /// Output format
    #[arg(long, value_enum, default_value_t = MessageFormat::Human)]
    pub message_format: MessageFormat,
}

#[derive(Args)]
pub struct FilesArgs {
    #[command(flatten)]
    pub graph: GraphArgs,

    /// Labels whose file sets to print (defaults to every node nothing
    /// else depends on)
    pub labels: Vec<String>,

    /// Print a JSON array instead of one path per line
    #[arg(long)]
    pub json: bool,
}

#[derive(Args)]
pub struct CleanArgs {
    /// Output directory to remove
    #[arg(long)]
    pub out: Option<PathBuf>,
}

#[derive(Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    #[arg(value_enum)]
    pub shell: Shell,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum MessageFormat {
    /// Progress bar and summary on stderr
    Human,
    /// One JSON event per line on stdout
    Json,
}
