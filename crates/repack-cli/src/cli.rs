//! CLI argument parsing using clap.

use clap::Parser;
use clap::Subcommand;
use clap::ValueEnum;
use repack_core::FilterStrategy;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "repack")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress non-error output
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Safely extract a model archive
    Extract(ExtractArgs),
    /// Merge a model archive with inference code into an output tree
    Run(RunArgs),
}

/// Safety filter selection.
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum FilterArg {
    /// Prefer the platform filter, fall back to the member filter
    Auto,
    /// Always delegate to the platform unpacker's policy
    Delegated,
    /// Always run the member classifier (per-member diagnostics)
    Members,
}

impl From<FilterArg> for FilterStrategy {
    fn from(arg: FilterArg) -> Self {
        match arg {
            FilterArg::Auto => Self::Auto,
            FilterArg::Delegated => Self::Delegated,
            FilterArg::Members => Self::Members,
        }
    }
}

#[derive(clap::Args)]
pub struct ExtractArgs {
    /// Path to the archive file (gzip-compressed tar)
    #[arg(value_name = "ARCHIVE")]
    pub archive: PathBuf,

    /// Output directory (default: current directory)
    #[arg(value_name = "OUTPUT_DIR")]
    pub output_dir: Option<PathBuf>,

    /// Safety filter selection
    #[arg(long, value_enum, default_value = "auto")]
    pub filter: FilterArg,
}

#[derive(clap::Args)]
pub struct RunArgs {
    /// Path to the model archive (gzip-compressed tar)
    #[arg(long, value_name = "ARCHIVE")]
    pub model_archive: PathBuf,

    /// Directory holding the uploaded user code
    #[arg(long, value_name = "DIR")]
    pub code_dir: PathBuf,

    /// Entry point script, relative to the code directory
    #[arg(long, value_name = "SCRIPT", default_value = "inference.py")]
    pub inference_script: PathBuf,

    /// Dependency file or directory, relative to the code directory
    /// (can be repeated)
    #[arg(long = "dependency", short = 'd', value_name = "PATH")]
    pub dependencies: Vec<PathBuf>,

    /// Copy the whole code directory instead of just the entry point
    #[arg(long)]
    pub source_dir: bool,

    /// Directory the merged tree is written into
    #[arg(long, value_name = "DIR")]
    pub output_dir: PathBuf,

    /// Safety filter selection for the archive extraction
    #[arg(long, value_enum, default_value = "auto")]
    pub filter: FilterArg,
}
