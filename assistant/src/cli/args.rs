//! CLI argument definitions
//!
//! Contains the main CLI struct and Commands enum for clap parsing.

use std::path::PathBuf;

use clap::{ArgAction, Parser, Subcommand};

#[derive(Parser)]
#[command(name = "sql-assistant")]
#[command(about = "SQL agent with human approval and resumable conversations")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Config file (default: nearest .sql-assistant.toml)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Ollama server URL (default: from config or http://localhost:11434)
    #[arg(long, env = "OLLAMA_URL", global = true)]
    pub ollama_url: Option<String>,

    /// Model to use
    #[arg(short = 'm', long, env = "OLLAMA_MODEL", global = true)]
    pub model: Option<String>,

    /// Database the agent queries
    #[arg(long, global = true)]
    pub database: Option<PathBuf>,

    /// Keep checkpoints in memory instead of SQLite
    #[arg(long, global = true)]
    pub ephemeral: bool,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Increase verbosity (-v info, -vv debug, -vvv trace). Default is warn.
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Interactive session with approval prompts
    Chat {
        /// Continue an existing thread
        #[arg(long)]
        thread: Option<String>,
    },
    /// Send a single message and print the result
    Ask {
        /// Message to send
        message: String,
        /// Continue an existing thread
        #[arg(long)]
        thread: Option<String>,
        /// Execute a proposed query without asking
        #[arg(long)]
        auto_execute: bool,
    },
    /// Approve or reject the pending query of a thread
    Approve {
        /// Thread waiting for approval
        thread: String,
        /// Reject instead of approving
        #[arg(long)]
        reject: bool,
        /// Feedback for the agent when rejecting
        #[arg(long, short)]
        feedback: Option<String>,
    },
    /// List stored threads
    Threads,
    /// Show the message log of a thread
    History {
        thread: String,
    },
    /// Create the sample business tables the bundled skills describe
    Seed {
        /// Number of orders to generate
        #[arg(long, default_value_t = 300)]
        orders: usize,
        /// Fixed RNG seed for reproducible data
        #[arg(long)]
        rng_seed: Option<u64>,
    },
    /// Start the HTTP API server
    #[cfg(feature = "web")]
    Serve {
        /// Port to listen on
        #[arg(long, short, default_value = "8000")]
        port: u16,
    },
}
