//! Command-line interface for slidebench.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Slidebench - drive language models through sliding-tile puzzles
#[derive(Parser, Debug)]
#[command(name = "slidebench")]
#[command(about = "Benchmark harness for LLMs on n-puzzles", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Subcommand to run
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the HTTP API with the WebSocket event stream
    Serve {
        /// Path to the configuration file
        #[arg(short, long, default_value = "slidebench.toml")]
        config: PathBuf,

        /// Host to bind to (overrides the configuration)
        #[arg(long)]
        host: Option<String>,

        /// Port to bind to (overrides the configuration)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Execute one run to completion and print it as JSON
    Run {
        /// Path to the configuration file
        #[arg(short, long, default_value = "slidebench.toml")]
        config: PathBuf,

        /// Model to benchmark (defaults to the configured model)
        #[arg(short, long)]
        model: Option<String>,

        /// Board edge length, clamped to 2..=6
        #[arg(long, default_value = "4")]
        size: i64,

        /// Move budget, clamped to 10..=500
        #[arg(long, default_value = "200")]
        max_moves: i64,

        /// Scramble walk length, clamped to 1..=200
        #[arg(long, default_value = "50")]
        scramble_depth: i64,

        /// Pause between steps in milliseconds
        #[arg(long, default_value = "0")]
        delay_ms: u64,

        /// Seed for a reproducible scramble
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Print aggregate statistics of the configured store
    Stats {
        /// Path to the configuration file
        #[arg(short, long, default_value = "slidebench.toml")]
        config: PathBuf,
    },
}
