//! CLI interface for Fractonix
//!
//! This module provides the command-line interface using clap's derive API.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Fractonix Discord bot
///
/// Bridges Discord slash commands to Gemini with per-user conversation
/// memory.
#[derive(Parser, Debug)]
#[command(name = "fractonix")]
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
    /// Run the Discord interactions and keep-alive server
    Serve,

    /// Ask a question from the terminal
    Ask {
        /// The question or prompt
        question: String,

        /// User whose memory is used
        #[arg(short, long, default_value = "cli")]
        user: String,

        /// URL of an image to analyze
        #[arg(short, long, value_name = "URL")]
        image: Option<String>,
    },

    /// Print a user's stored memory as JSON
    Memory {
        /// User id
        user: String,
    },
}
