use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "tfm",
    about = "Text file metrics: scan text objects and persist line, word, and character counts",
    version,
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Log at debug level
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,

    /// Configuration file (defaults to ./tfm.toml when present)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// Process an object-created notification batch
    Process(ProcessArgs),
    /// Scan local files or directories and print their metrics
    Scan(ScanArgs),
    /// Show the stored record for an object
    Show(ShowArgs),
    /// Rewrite the metrics journal keeping only live records
    Compact,
}

#[derive(Args)]
pub struct ProcessArgs {
    /// Notification JSON file, or `-` for stdin
    #[arg(short, long)]
    pub event: PathBuf,
}

#[derive(Args)]
pub struct ScanArgs {
    /// Files to scan; directories are walked for eligible files
    #[arg(required = true)]
    pub paths: Vec<PathBuf>,
}

#[derive(Args)]
pub struct ShowArgs {
    #[arg(short, long)]
    pub bucket: String,
    #[arg(short, long)]
    pub key: String,
}
