//! CLI module for Briefsmith
//!
//! Provides command-line interface parsing for the briefsmith binary.
//! Uses clap for argument parsing and owo-colors for colored terminal output.

pub mod init;
pub mod output;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Briefsmith - research briefs from a single query
#[derive(Parser, Debug)]
#[command(
    name = "briefsmith",
    version,
    about = "Briefsmith - research briefs from a single query",
    long_about = "Decomposes a research query into sub-tasks, gathers web evidence for each,\n\
                  synthesizes cited findings and assembles them into a structured brief.",
    after_help = "EXAMPLES:\n    \
                  briefsmith init                                   # Write briefsmith.toml\n    \
                  briefsmith research \"Renewable energy trends\"     # Print a brief\n    \
                  briefsmith research \"...\" --json -o brief.json    # Save the brief as JSON\n    \
                  briefsmith serve --port 8080                      # Start the HTTP API"
)]
pub struct Cli {
    /// Path to the configuration file
    #[arg(short, long, default_value = "briefsmith.toml", global = true)]
    pub config: PathBuf,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    pub log_json: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Research a query and print the brief
    Research {
        /// The research query
        query: String,

        /// Task pipelines to run at once
        #[arg(long)]
        concurrency: Option<usize>,

        /// Overall deadline in seconds
        #[arg(long)]
        deadline: Option<u64>,

        /// Print the brief as JSON instead of text
        #[arg(long)]
        json: bool,

        /// Write the brief to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Start the HTTP API server
    Serve {
        /// Host address (overrides server.host)
        #[arg(long)]
        host: Option<String>,

        /// Port (overrides server.port)
        #[arg(long)]
        port: Option<u16>,
    },

    /// Show configuration information
    Config {
        /// Also check that required environment variables are set
        #[arg(long)]
        validate: bool,
    },

    /// Write briefsmith.toml and .env.example
    Init {
        /// Directory to initialize (defaults to current directory)
        #[arg(default_value = ".")]
        path: PathBuf,

        /// Overwrite existing files
        #[arg(short, long)]
        force: bool,

        /// LLM provider to configure
        #[arg(long, default_value = "ollama", value_parser = ["ollama", "openai"])]
        provider: String,

        /// Search backend to configure
        #[arg(long, default_value = "duckduckgo", value_parser = ["duckduckgo", "google"])]
        search: String,
    },
}

impl Cli {
    /// Parse CLI arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
