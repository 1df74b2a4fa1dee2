//! CLI argument definitions using clap.

use clap::{Args, Parser, Subcommand};
use exreview::llm::ProviderKind;
use std::path::PathBuf;

/// exreview: idempotent LLM quality review for exercise records
#[derive(Parser)]
#[command(name = "exreview")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Review the next batch of exercises without a successful result
    Run(RunArgs),

    /// Show how many exercises have been reviewed and what failed
    Status {
        /// Path to a TOML config file
        #[arg(short, long, env = "EXREVIEW_CONFIG")]
        config: Option<PathBuf>,

        /// Directory holding the result files
        #[arg(short, long)]
        output_dir: Option<PathBuf>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Args)]
pub struct RunArgs {
    /// Path to a TOML config file
    #[arg(short, long, env = "EXREVIEW_CONFIG")]
    pub config: Option<PathBuf>,

    /// Maximum exercises to review in this run
    #[arg(short = 'n', long)]
    pub count: Option<usize>,

    /// Only review exercises with this ID or higher
    #[arg(long, value_name = "ID")]
    pub start: Option<String>,

    /// Only review exercises in this category
    #[arg(long, value_name = "ID")]
    pub category: Option<String>,

    /// Maximum model calls in flight at once
    #[arg(short = 'j', long)]
    pub concurrency: Option<usize>,

    /// Pause before each model call, in milliseconds
    #[arg(long, value_name = "MS")]
    pub delay_ms: Option<u64>,

    /// Directory for the result files
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,

    /// Model provider (gemini, anthropic, openai, ollama, mock)
    #[arg(long, env = "EXREVIEW_PROVIDER")]
    pub provider: Option<ProviderKind>,

    /// Model to use (provider-specific, e.g., "gemini-2.0-flash", "gpt-4o")
    #[arg(long)]
    pub model: Option<String>,

    /// Read exercises from a JSON array export
    #[arg(long, value_name = "PATH", conflicts_with = "source_sqlite")]
    pub source_json: Option<PathBuf>,

    /// Read exercises from a SQLite database URL
    #[arg(long, value_name = "URL")]
    pub source_sqlite: Option<String>,

    /// Table holding the exercises (with --source-sqlite)
    #[arg(long, requires = "source_sqlite")]
    pub table: Option<String>,
}
