//! Ducking coordinator: attenuates other audio while speech is active.
//!
//! Ducking is driven by occupancy of the active set, not by individual
//! utterance completion. With two overlapping utterances, unducking after
//! the first one finishes would let ambient audio come back while the second
//! is still speaking. The registry therefore only notifies the coordinator on
//! 0→1 and 1→0 transitions, and the coordinator ignores requests for the
//! state it is already in.
//!
//! The `is_ducking` flag tracks *intended* state. When the audio session
//! rejects a call the flag still moves, the failure is logged and queued for
//! the controller to surface as a warning, and the next transition goes
//! through normally.

use std::sync::Arc;

use murmur_core::{AudioSession, AudioSessionError, DuckOperation, SpeechEvent};

use crate::registry::OccupancyObserver;

/// A begin-duck or end-duck call that the audio session rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DuckFailure {
    /// Which call failed.
    pub operation: DuckOperation,
    /// What the audio session reported.
    pub error: AudioSessionError,
}

impl DuckFailure {
    /// Convert into the caller-facing warning event.
    pub fn into_event(self) -> SpeechEvent {
        SpeechEvent::DuckingWarning {
            operation: self.operation,
            message: self.error.to_string(),
        }
    }
}

/// Owns the process-wide ducking flag for one session.
pub struct DuckingCoordinator {
    audio: Arc<dyn AudioSession>,
    is_ducking: bool,
    begin_calls: u64,
    end_calls: u64,
    failures: Vec<DuckFailure>,
}

impl DuckingCoordinator {
    /// Create a coordinator (initially not ducking).
    pub fn new(audio: Arc<dyn AudioSession>) -> Self {
        Self {
            audio,
            is_ducking: false,
            begin_calls: 0,
            end_calls: 0,
            failures: Vec::new(),
        }
    }

    /// Whether other audio is (intended to be) attenuated.
    pub const fn is_ducking(&self) -> bool {
        self.is_ducking
    }

    /// Number of begin-duck calls issued, including failed ones.
    pub const fn begin_calls(&self) -> u64 {
        self.begin_calls
    }

    /// Number of end-duck calls issued, including failed ones.
    pub const fn end_calls(&self) -> u64 {
        self.end_calls
    }

    /// Drain failures recorded since the last call.
    pub fn take_failures(&mut self) -> Vec<DuckFailure> {
        std::mem::take(&mut self.failures)
    }

    fn begin(&mut self) {
        self.begin_calls += 1;
        self.is_ducking = true;
        match self.audio.begin_duck() {
            Ok(()) => tracing::debug!("Ducking: other audio attenuated"),
            Err(error) => self.record_failure(DuckOperation::Begin, error),
        }
    }

    fn end(&mut self) {
        self.end_calls += 1;
        self.is_ducking = false;
        match self.audio.end_duck() {
            Ok(()) => tracing::debug!("Ducking: other audio restored"),
            Err(error) => self.record_failure(DuckOperation::End, error),
        }
    }

    fn record_failure(&mut self, operation: DuckOperation, error: AudioSessionError) {
        tracing::warn!(
            operation = operation.as_str(),
            error = %error,
            "Audio session call failed; keeping intended ducking state"
        );
        self.failures.push(DuckFailure { operation, error });
    }
}

impl OccupancyObserver for DuckingCoordinator {
    fn on_active_transition(&mut self, now_active: bool) {
        match (now_active, self.is_ducking) {
            (true, false) => self.begin(),
            (false, true) => self.end(),
            _ => tracing::trace!(now_active, "Redundant ducking transition ignored"),
        }
    }
}
