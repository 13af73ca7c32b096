use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// repograph - build a code graph of definitions and references
#[derive(Parser, Debug)]
#[command(name = "repograph", version, about)]
pub struct Cli {
    /// Output results as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress progress output and lower the log level to warnings
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Scan a repository and assemble its code graph
    Build(BuildArgs),

    /// Show the tags extracted from a single file
    Tags(TagsArgs),
}

#[derive(clap::Args, Debug)]
pub struct BuildArgs {
    /// Repository root to scan
    #[arg(default_value = ".")]
    pub path: PathBuf,

    /// Repository id stamped on every node and edge (defaults to a digest
    /// of the canonical root path)
    #[arg(long)]
    pub repo_id: Option<String>,

    /// Write the graph as JSON to this file
    #[arg(long, short)]
    pub out: Option<PathBuf>,
}

#[derive(clap::Args, Debug)]
pub struct TagsArgs {
    /// Source file to extract tags from
    pub file: PathBuf,
}

pub fn parse() -> Cli {
    Cli::parse()
}
