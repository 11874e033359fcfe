//! Caller-facing utterance lifecycle events.
//!
//! # Wire Format
//!
//! Events are serialized with a `type` tag so binding layers can forward
//! them unchanged:
//!
//! ```json
//! { "type": "error", "id": "3f1c…", "reason": "voice not installed" }
//! ```

use serde::{Deserialize, Serialize};

use crate::domain::UtteranceId;

/// Which audio-session call a ducking warning refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DuckOperation {
    /// Attenuating other audio.
    Begin,
    /// Restoring other audio.
    End,
}

impl DuckOperation {
    /// Lowercase label used in logs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Begin => "begin",
            Self::End => "end",
        }
    }
}

/// Events emitted by the session controller to its subscribers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SpeechEvent {
    /// The engine began playing the utterance.
    Started {
        /// Utterance identifier.
        id: UtteranceId,
    },

    /// The utterance played to the end.
    Finished {
        /// Utterance identifier.
        id: UtteranceId,
    },

    /// The utterance was cancelled.
    Cancelled {
        /// Utterance identifier.
        id: UtteranceId,
    },

    /// The engine paused the utterance.
    Paused {
        /// Utterance identifier.
        id: UtteranceId,
    },

    /// The engine resumed the utterance.
    Resumed {
        /// Utterance identifier.
        id: UtteranceId,
    },

    /// Synthesis failed; the utterance is terminal.
    Error {
        /// Utterance identifier.
        id: UtteranceId,
        /// Engine-supplied reason.
        reason: String,
    },

    /// A begin-duck or end-duck call failed. Speech continues.
    DuckingWarning {
        /// Which call failed.
        operation: DuckOperation,
        /// Error description.
        message: String,
    },
}

impl SpeechEvent {
    /// The utterance this event refers to, if any.
    #[must_use]
    pub const fn utterance_id(&self) -> Option<&UtteranceId> {
        match self {
            Self::Started { id }
            | Self::Finished { id }
            | Self::Cancelled { id }
            | Self::Paused { id }
            | Self::Resumed { id }
            | Self::Error { id, .. } => Some(id),
            Self::DuckingWarning { .. } => None,
        }
    }

    /// Whether this event ends the utterance's lifecycle.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Finished { .. } | Self::Cancelled { .. } | Self::Error { .. }
        )
    }
}
