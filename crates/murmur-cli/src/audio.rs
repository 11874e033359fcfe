//! Audio session used by the CLI.
//!
//! There is no platform mixer behind a terminal, so [`LoggingAudioSession`]
//! records the focus request it would make and logs it. The request shape
//! mirrors what a mobile host asks for when speaking over other audio: a
//! transient focus gain that lets other players duck instead of pausing.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use murmur_core::{AudioSession, AudioSessionError};
use serde::Serialize;

/// Parameters of the audio-focus request issued while speech is active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FocusPolicy {
    /// What the audio is for.
    pub usage: &'static str,
    /// What the audio contains.
    pub content_type: &'static str,
    /// Whether other players should pause rather than lower their volume.
    pub pause_when_ducked: bool,
    /// Whether a delayed focus grant is acceptable.
    pub accepts_delayed_gain: bool,
}

/// Transient may-duck focus for accessibility speech.
pub const SPEECH_FOCUS: FocusPolicy = FocusPolicy {
    usage: "assistance_accessibility",
    content_type: "speech",
    pause_when_ducked: false,
    accepts_delayed_gain: false,
};

/// Audio session that logs focus requests instead of talking to a mixer.
#[derive(Debug)]
pub struct LoggingAudioSession {
    policy: FocusPolicy,
    held: AtomicBool,
    requests: AtomicU64,
}

impl LoggingAudioSession {
    /// Create a session using [`SPEECH_FOCUS`].
    pub const fn new() -> Self {
        Self::with_policy(SPEECH_FOCUS)
    }

    /// Create a session that requests focus with `policy`.
    pub const fn with_policy(policy: FocusPolicy) -> Self {
        Self {
            policy,
            held: AtomicBool::new(false),
            requests: AtomicU64::new(0),
        }
    }

    /// The focus policy sent with each request.
    pub const fn policy(&self) -> FocusPolicy {
        self.policy
    }

    /// Whether a focus request is currently held.
    pub fn is_held(&self) -> bool {
        self.held.load(Ordering::Acquire)
    }

    /// Focus requests made so far.
    pub fn requests(&self) -> u64 {
        self.requests.load(Ordering::Acquire)
    }
}

impl Default for LoggingAudioSession {
    fn default() -> Self {
        Self::new()
    }
}

impl AudioSession for LoggingAudioSession {
    fn begin_duck(&self) -> Result<(), AudioSessionError> {
        if self.held.swap(true, Ordering::AcqRel) {
            tracing::debug!("Audio focus already held");
            return Ok(());
        }
        let request = self.requests.fetch_add(1, Ordering::AcqRel) + 1;
        tracing::info!(
            request,
            usage = self.policy.usage,
            content_type = self.policy.content_type,
            pause_when_ducked = self.policy.pause_when_ducked,
            "Requesting transient audio focus (may duck)"
        );
        Ok(())
    }

    fn end_duck(&self) -> Result<(), AudioSessionError> {
        // Abandoning focus that was never requested is a no-op.
        if !self.held.swap(false, Ordering::AcqRel) {
            tracing::debug!("No audio focus to abandon");
            return Ok(());
        }
        tracing::info!("Abandoning audio focus");
        Ok(())
    }
}
