//! Utterance identity and lifecycle.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::options::SpeechOptions;

/// Stable identifier of one speech request.
///
/// This is the handle callers, engines and late callbacks use to refer to an
/// utterance. It never borrows the utterance itself, so a callback that
/// outlives the utterance resolves to "unknown" instead of dangling.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UtteranceId(String);

impl UtteranceId {
    /// Create an identifier from a caller-chosen string.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generate a fresh random identifier (UUID v4).
    #[must_use]
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    /// Borrow the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UtteranceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for UtteranceId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for UtteranceId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Lifecycle state of an utterance.
///
/// ```text
///   Pending ──► Speaking ──► Finished
///      │           │
///      │           ├──────► Cancelled
///      │           └──────► Failed
///      ├──────────────────► Cancelled
///      ├──────────────────► Failed
///      └──────────────────► Finished (implicit start)
/// ```
///
/// Both live states claim the audio channel: an utterance is active from
/// registration until it reaches a terminal state.
///
/// Terminal states have no outgoing transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UtteranceState {
    /// Registered, waiting for the engine to acknowledge playback start.
    Pending,
    /// The engine is playing it.
    Speaking,
    /// Played to the end.
    Finished,
    /// Cancelled before or during playback.
    Cancelled,
    /// The engine reported an error.
    Failed,
}

impl UtteranceState {
    /// Whether no further transitions are possible.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Finished | Self::Cancelled | Self::Failed)
    }

    /// Whether the utterance claims the audio channel.
    #[must_use]
    pub const fn is_active(self) -> bool {
        !self.is_terminal()
    }

    /// Lowercase label used in logs and status output.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Speaking => "speaking",
            Self::Finished => "finished",
            Self::Cancelled => "cancelled",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for UtteranceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One speech request tracked through its lifecycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Utterance {
    /// Stable identifier.
    pub id: UtteranceId,

    /// Source text to synthesize.
    pub text: String,

    /// Effective options (per-call overrides already merged over the
    /// global defaults). Opaque to the ducking coordinator.
    pub options: SpeechOptions,

    /// Current lifecycle state.
    pub state: UtteranceState,

    /// When the utterance was created.
    pub enqueued_at: DateTime<Utc>,

    /// Whether the engine acknowledged a pause. A paused utterance stays
    /// `Speaking` and keeps its claim on the audio channel.
    pub paused: bool,

    /// Failure reason, set when the state becomes `Failed`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<String>,
}

impl Utterance {
    /// Create a new `Pending` utterance stamped with the current time.
    pub fn new(id: UtteranceId, text: impl Into<String>, options: SpeechOptions) -> Self {
        Self {
            id,
            text: text.into(),
            options,
            state: UtteranceState::Pending,
            enqueued_at: Utc::now(),
            paused: false,
            failure: None,
        }
    }

    /// Number of whitespace-separated words in the text.
    #[must_use]
    pub fn word_count(&self) -> usize {
        self.text.split_whitespace().count()
    }
}
