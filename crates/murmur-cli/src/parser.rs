//! Main CLI parser and top-level argument handling.

use std::path::PathBuf;

use clap::Parser;

use crate::commands::Commands;
use crate::config::CONFIG_ENV;

/// Command-line interface for the murmur speech session manager.
#[derive(Parser)]
#[command(name = "murmur")]
#[command(about = "Drive a speech session with ducking from the terminal")]
#[command(version)]
pub struct Cli {
    /// JSON configuration file
    #[arg(long = "config", global = true, env = CONFIG_ENV)]
    pub config: Option<PathBuf>,

    /// Enable verbose/debug output
    #[arg(short = 'v', long = "verbose", global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}
