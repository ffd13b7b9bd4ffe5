//! CLI interface for Valet
//!
//! Command-line interface using clap's derive API: one-shot questions, an
//! interactive REPL, and memory inspection commands.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Valet Personal Assistant Engine
///
/// A local-first assistant backend: classifies what you ask for, plans and
/// runs the matching skills, and remembers your preferences across sessions.
#[derive(Parser, Debug)]
#[command(name = "valet")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Set log level (error, warn, info, debug, trace)
    #[arg(long, global = true, value_name = "LEVEL")]
    pub log: Option<String>,

    /// Specify alternate configuration file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Ask a single question or give a command
    Ask {
        /// The question or command
        query: String,

        /// Emit incremental status lines while processing
        #[arg(long)]
        stream: bool,
    },

    /// Start an interactive session
    Repl,

    /// Show recent conversation history
    History {
        /// Number of turns to show
        #[arg(short, long, default_value = "10")]
        limit: i64,
    },

    /// Show stored preferences and facts
    Memory,
}
