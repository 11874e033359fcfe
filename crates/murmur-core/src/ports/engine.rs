//! Synthesis engine port.

use serde::{Deserialize, Serialize};

use crate::domain::{Utterance, UtteranceId};
use crate::error::EngineError;

/// Asynchronous notification produced by a synthesis engine.
///
/// Engines deliver these from their own execution context (an audio thread,
/// a platform delegate, a runtime task). They may arrive in any order
/// relative to session commands, and may repeat.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EngineEvent {
    /// Playback of the utterance began.
    Started { id: UtteranceId },
    /// Playback reached the end.
    Finished { id: UtteranceId },
    /// The engine acknowledged a cancellation.
    Cancelled { id: UtteranceId },
    /// The engine acknowledged a pause.
    Paused { id: UtteranceId },
    /// The engine acknowledged a resume.
    Resumed { id: UtteranceId },
    /// Synthesis failed.
    Error { id: UtteranceId, reason: String },
}

impl EngineEvent {
    /// The utterance this notification refers to.
    #[must_use]
    pub const fn id(&self) -> &UtteranceId {
        match self {
            Self::Started { id }
            | Self::Finished { id }
            | Self::Cancelled { id }
            | Self::Paused { id }
            | Self::Resumed { id }
            | Self::Error { id, .. } => id,
        }
    }

    /// Short label used in logs.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Started { .. } => "started",
            Self::Finished { .. } => "finished",
            Self::Cancelled { .. } => "cancelled",
            Self::Paused { .. } => "paused",
            Self::Resumed { .. } => "resumed",
            Self::Error { .. } => "error",
        }
    }
}

/// Backend-agnostic text-to-speech engine.
///
/// All methods return as soon as the request is handed over. Outcomes are
/// reported later through the engine's notification channel, never by
/// calling back into the session synchronously: the session holds its state
/// lock while it talks to the engine.
pub trait SynthesisEngine: Send + Sync {
    /// Queue an utterance for playback. Its `options` are already merged.
    fn enqueue(&self, utterance: &Utterance) -> Result<(), EngineError>;

    /// Request cancellation. Acknowledged with [`EngineEvent::Cancelled`].
    fn cancel(&self, id: &UtteranceId) -> Result<(), EngineError>;

    /// Request a pause. Acknowledged with [`EngineEvent::Paused`].
    fn pause(&self, id: &UtteranceId) -> Result<(), EngineError>;

    /// Request a resume. Acknowledged with [`EngineEvent::Resumed`].
    fn resume(&self, id: &UtteranceId) -> Result<(), EngineError>;
}
