//! Command handlers.
//!
//! Each handler takes the loaded [`CliConfig`](crate::config::CliConfig),
//! its parsed arguments and an output writer, and returns a [`CliError`](crate::error::CliError)
//! on failure. Machine-readable output goes to the writer; diagnostics go
//! through `tracing`.

pub mod config;
pub mod speak;
