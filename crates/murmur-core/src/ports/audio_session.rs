//! Audio session port: temporary attenuation ("ducking") of other audio.

use crate::error::AudioSessionError;

/// Platform audio session that can duck other audio output.
///
/// On mobile hosts this maps to a transient, may-duck audio focus request
/// with speech content type; on desktop hosts to a mixer policy. The
/// coordinator calls these at most once per 0↔non-0 transition of the
/// active utterance count.
pub trait AudioSession: Send + Sync {
    /// Start attenuating other audio.
    fn begin_duck(&self) -> Result<(), AudioSessionError>;

    /// Restore other audio.
    fn end_duck(&self) -> Result<(), AudioSessionError>;
}

/// An audio session that does nothing, for hosts without ducking support
/// and for tests that don't inspect audio calls.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopAudioSession;

impl NoopAudioSession {
    /// Create a new no-op session.
    pub const fn new() -> Self {
        Self
    }
}

impl AudioSession for NoopAudioSession {
    fn begin_duck(&self) -> Result<(), AudioSessionError> {
        Ok(())
    }

    fn end_duck(&self) -> Result<(), AudioSessionError> {
        Ok(())
    }
}
