#![doc = include_str!(concat!(env!("OUT_DIR"), "/README_GENERATED.md"))]
#![deny(unused_crate_dependencies)]

// Used by the binary only
use anyhow as _;
use dotenvy as _;

// Config file tests
#[cfg(test)]
use tempfile as _;

pub mod audio;
pub mod commands;
pub mod config;
pub mod error;
pub mod handlers;
pub mod logging;
pub mod parser;

// Re-export primary types for convenient access
pub use audio::LoggingAudioSession;
pub use commands::{Commands, SpeakCommand};
pub use config::CliConfig;
pub use error::CliError;
pub use parser::Cli;
