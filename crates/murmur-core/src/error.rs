//! Error taxonomy shared by every murmur crate.
//!
//! | Error                 | Origin         | Handling                                  |
//! |-----------------------|----------------|-------------------------------------------|
//! | `DuplicateIdentifier` | caller         | returned to the caller (programmer error) |
//! | `AlreadyTerminal`     | engine races   | logged at debug level, never surfaced     |
//! | `AudioSessionError`   | audio host     | surfaced as a `DuckingWarning` event      |
//! | `EngineError`         | synthesis host | surfaced as an `Error` event              |
//!
//! Nothing here is fatal: a failed utterance or a failed duck call never
//! prevents later utterances from being processed.

use thiserror::Error;

use crate::domain::UtteranceId;

/// Errors reported by the utterance registry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// The identifier is already tracked by a live utterance.
    #[error("Utterance identifier already in use: {0}")]
    DuplicateIdentifier(UtteranceId),

    /// The utterance already reached a terminal state, or was never
    /// registered. Tolerates duplicate and late engine callbacks.
    #[error("Utterance {0} is unknown or already terminal")]
    AlreadyTerminal(UtteranceId),
}

impl RegistryError {
    /// Whether this is an expected race rather than a caller mistake.
    #[must_use]
    pub const fn is_benign(&self) -> bool {
        matches!(self, Self::AlreadyTerminal(_))
    }
}

/// Failure of the platform audio session's begin-duck / end-duck calls.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AudioSessionError {
    /// The host refused the focus or ducking request.
    #[error("Audio session request rejected: {0}")]
    Rejected(String),

    /// The audio host is not reachable.
    #[error("Audio session unavailable: {0}")]
    Unavailable(String),
}

/// Failure reported synchronously by the synthesis engine.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    /// The engine refused the request.
    #[error("Synthesis engine rejected request: {0}")]
    Rejected(String),

    /// The engine is not running.
    #[error("Synthesis engine unavailable: {0}")]
    Unavailable(String),
}

/// Invalid speech option values.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum OptionsError {
    /// Speaking rate outside `[0.1, 2.0]`, or not finite.
    #[error("Rate must be between 0.1 and 2.0, got {0}")]
    InvalidRate(f32),

    /// Pitch multiplier outside `[0.5, 2.0]`, or not finite.
    #[error("Pitch must be between 0.5 and 2.0, got {0}")]
    InvalidPitch(f32),

    /// Volume outside `[0.0, 1.0]`, or not finite.
    #[error("Volume must be between 0.0 and 1.0, got {0}")]
    InvalidVolume(f32),

    /// A voice was given but it is blank.
    #[error("Voice identifier cannot be empty")]
    EmptyVoice,
}

/// Errors returned by the session controller's caller-facing operations.
#[derive(Debug, Error)]
pub enum SpeechError {
    /// `speak` was called with blank text.
    #[error("Cannot speak empty text")]
    EmptyText,

    /// Option validation failed.
    #[error(transparent)]
    Options(#[from] OptionsError),

    /// Registry rejected the request.
    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// The engine rejected a forwarded command.
    #[error(transparent)]
    Engine(#[from] EngineError),
}
