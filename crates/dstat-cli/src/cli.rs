use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "dstatus",
    about = "Data-versioning status for a repository, from recorded query output",
    version,
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,

    /// Directory holding list.json, diff.json, status.json and untracked.json
    #[arg(long, global = true, default_value = ".")]
    pub fixtures: PathBuf,

    /// Repository root the recorded paths are relative to (defaults to the fixtures directory)
    #[arg(long, global = true)]
    pub root: Option<PathBuf>,

    /// TOML file with refresh settings
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// Show source-control resource groups
    Status(StatusArgs),
    /// Print the tracked tree with decorations
    Tree(TreeArgs),
    /// List every decorated path
    Decorations,
    /// Resolve a selection to the tracked paths an action would target
    Targets(TargetsArgs),
}

#[derive(Args)]
pub struct StatusArgs {
    /// Print every status set instead of the resource groups
    #[arg(long)]
    pub sets: bool,
}

#[derive(Args)]
pub struct TreeArgs {
    /// Subtree to print, relative to the root
    pub path: Option<String>,
}

#[derive(Args)]
pub struct TargetsArgs {
    /// The item the action was invoked on, relative to the root ("." for the root)
    pub invoked: String,
    /// Other selected items, relative to the root
    #[arg(short, long)]
    pub selected: Vec<String>,
}
