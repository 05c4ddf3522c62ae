//! CLI argument definitions using clap derive

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::cli::commands::{
    completions::CompletionsArgs, config::ConfigCommands, generate::GenerateArgs, init::InitArgs,
    scan::ScanArgs,
};

#[derive(Parser)]
#[command(name = "docfill")]
#[command(author, version, about = "Fill placeholders in legacy document templates")]
#[command(long_about = "Finds {{Name}}, <<Name>>, [Name] and $Name placeholders in binary word-processor templates of unknown text encoding and writes filled-out copies without disturbing the surrounding container bytes.")]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[command(flatten)]
    pub global: GlobalOpts,
}

#[derive(clap::Args, Clone, Debug)]
pub struct GlobalOpts {
    /// Output format
    #[arg(long, short = 'f', global = true, default_value = "auto")]
    pub format: OutputFormat,

    /// Suppress non-essential output (logs only errors)
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Enable verbose output (debug logging)
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,

    /// Workspace root (default: auto-detect by finding .docfill/)
    #[arg(long, global = true)]
    pub workspace: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize a new docfill workspace
    Init(InitArgs),

    /// Generate a document by filling a template's placeholders
    Generate(GenerateArgs),

    /// Show how templates decode: per-encoding placeholder counts and inventory
    Scan(ScanArgs),

    /// View and modify configuration
    #[command(subcommand)]
    Config(ConfigCommands),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable summary or table
    #[default]
    Auto,
    /// YAML format (full fidelity)
    Yaml,
    /// JSON format (for programming)
    Json,
}
