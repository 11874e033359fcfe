//! CLI-specific error types and mappings.
//!
//! Maps session and configuration failures to exit codes and user-facing
//! messages.

use murmur_core::SpeechError;
use thiserror::Error;

/// CLI-specific error type.
#[derive(Debug, Error)]
pub enum CliError {
    /// Invalid text, options or identifiers given on the command line.
    #[error("Invalid arguments: {0}")]
    Arguments(String),

    /// The synthesis engine refused a request.
    #[error("Engine error: {0}")]
    Engine(String),

    /// IO error (file not found, closed stdout, etc.).
    #[error("IO error: {0}")]
    Io(String),

    /// Configuration file or environment error.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl CliError {
    /// Map error to appropriate exit code.
    ///
    /// Exit codes follow Unix conventions:
    /// - 0: Success
    /// - 2: Misuse of shell command (invalid arguments)
    /// - 64-78: Reserved for specific error categories (see sysexits.h)
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::Arguments(_) => 2, // EX_USAGE
            Self::Engine(_) => 69,   // EX_UNAVAILABLE
            Self::Io(_) => 74,       // EX_IOERR
            Self::Config(_) => 78,   // EX_CONFIG
        }
    }
}

impl From<SpeechError> for CliError {
    fn from(err: SpeechError) -> Self {
        match err {
            SpeechError::Engine(engine_err) => Self::Engine(engine_err.to_string()),
            SpeechError::EmptyText | SpeechError::Options(_) | SpeechError::Registry(_) => {
                Self::Arguments(err.to_string())
            }
        }
    }
}

impl From<std::io::Error> for CliError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

impl From<serde_json::Error> for CliError {
    fn from(err: serde_json::Error) -> Self {
        Self::Io(err.to_string())
    }
}
