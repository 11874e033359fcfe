//! Session controller: the public face of a speech session.
//!
//! A [`SpeechSession`] accepts speak / stop / pause / resume requests,
//! drives the [`UtteranceRegistry`] and [`DuckingCoordinator`], forwards work
//! to the [`SynthesisEngine`], and relays lifecycle events to subscribers.
//!
//! # Locking discipline
//!
//! Registry state, the ducking flag, the global options and the subscriber
//! list live behind one `std::sync::Mutex`. Every mutation, every engine call
//! and every event emission happens while that lock is held, so commands
//! from callers and notifications from the engine are applied one at a time
//! and subscribers observe a single total order. The lock is never held
//! across an `.await` point and no operation blocks on the engine.
//!
//! # Engine notifications
//!
//! Engines report progress through an [`EngineEventSink`]. The session
//! drains the matching stream on a background task (see
//! [`SpeechSession::spawn_event_loop`]) or, for hosts that deliver callbacks
//! on their own thread, through [`SpeechSession::handle_engine_event`].
//! Duplicate or late notifications resolve to
//! [`RegistryError::AlreadyTerminal`] and are dropped after a debug log.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use murmur_core::{
    AudioSession, EngineEvent, RegistryError, SpeechError, SpeechEvent, SpeechOptions,
    SynthesisEngine, Utterance, UtteranceId, validate_options,
};
use serde::Serialize;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::ducking::DuckingCoordinator;
use crate::registry::UtteranceRegistry;

/// Sending half handed to an engine for its notifications.
pub type EngineEventSink = mpsc::UnboundedSender<EngineEvent>;

/// Receiving half drained by the session's event loop.
pub type EngineEventStream = mpsc::UnboundedReceiver<EngineEvent>;

/// Create the channel that carries engine notifications into a session.
pub fn engine_channel() -> (EngineEventSink, EngineEventStream) {
    mpsc::unbounded_channel()
}

// ── Status DTO ─────────────────────────────────────────────────────

/// Point-in-time view of a session.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionStatus {
    /// Live utterances claiming the audio channel, pending or speaking.
    pub active_count: usize,
    /// Utterances waiting for the engine to start them.
    pub pending_count: usize,
    /// Whether other audio is attenuated.
    pub is_ducking: bool,
    /// Defaults applied to every new utterance.
    pub global_options: SpeechOptions,
}

// ── Shared state ───────────────────────────────────────────────────

struct SessionState {
    registry: UtteranceRegistry<DuckingCoordinator>,
    global: SpeechOptions,
    subscribers: Vec<mpsc::UnboundedSender<SpeechEvent>>,
}

impl SessionState {
    /// Fan out to every live subscriber, pruning closed ones.
    fn emit(&mut self, event: SpeechEvent) {
        self.subscribers
            .retain(|tx| tx.send(event.clone()).is_ok());
    }

    /// Surface audio-session failures recorded by the coordinator.
    fn flush_duck_failures(&mut self) {
        for failure in self.registry.observer_mut().take_failures() {
            self.emit(failure.into_event());
        }
    }

    /// Translate one engine notification into a registry transition and
    /// re-emit it. Nothing is emitted when the transition is rejected.
    fn apply(&mut self, event: EngineEvent) -> Result<(), RegistryError> {
        match event {
            EngineEvent::Started { id } => {
                if self.registry.mark_speaking(&id)? {
                    debug!(id = %id, active = self.registry.active_count(), "Utterance started");
                    self.emit(SpeechEvent::Started { id });
                } else {
                    debug!(id = %id, "Duplicate start notification ignored");
                }
            }
            EngineEvent::Finished { id } => {
                self.registry.mark_finished(&id)?;
                debug!(id = %id, active = self.registry.active_count(), "Utterance finished");
                self.emit(SpeechEvent::Finished { id });
            }
            EngineEvent::Cancelled { id } => {
                self.registry.mark_cancelled(&id)?;
                debug!(id = %id, active = self.registry.active_count(), "Utterance cancelled");
                self.emit(SpeechEvent::Cancelled { id });
            }
            EngineEvent::Error { id, reason } => {
                self.registry.mark_failed(&id, reason.clone())?;
                warn!(id = %id, reason = %reason, "Utterance failed");
                self.emit(SpeechEvent::Error { id, reason });
            }
            EngineEvent::Paused { id } => {
                self.registry.set_paused(&id, true)?;
                self.emit(SpeechEvent::Paused { id });
            }
            EngineEvent::Resumed { id } => {
                self.registry.set_paused(&id, false)?;
                self.emit(SpeechEvent::Resumed { id });
            }
        }
        Ok(())
    }
}

struct Inner {
    state: Mutex<SessionState>,
    engine: Arc<dyn SynthesisEngine>,
}

// ── Session controller ─────────────────────────────────────────────

/// Orchestrates one speech session.
///
/// Cheap to clone; clones share the same state. The session is the single
/// logical owner of its engine: callers never talk to the engine directly.
#[derive(Clone)]
pub struct SpeechSession {
    inner: Arc<Inner>,
}

impl SpeechSession {
    /// Create a session with default global options.
    pub fn new(engine: Arc<dyn SynthesisEngine>, audio: Arc<dyn AudioSession>) -> Self {
        Self::build(engine, audio, SpeechOptions::with_defaults())
    }

    /// Create a session with explicit global options.
    pub fn with_global_options(
        engine: Arc<dyn SynthesisEngine>,
        audio: Arc<dyn AudioSession>,
        global: SpeechOptions,
    ) -> Result<Self, SpeechError> {
        validate_options(&global)?;
        Ok(Self::build(engine, audio, global))
    }

    fn build(
        engine: Arc<dyn SynthesisEngine>,
        audio: Arc<dyn AudioSession>,
        global: SpeechOptions,
    ) -> Self {
        let state = SessionState {
            registry: UtteranceRegistry::new(DuckingCoordinator::new(audio)),
            global,
            subscribers: Vec::new(),
        };
        info!("Speech session created");
        Self {
            inner: Arc::new(Inner {
                state: Mutex::new(state),
                engine,
            }),
        }
    }

    // ── Commands ───────────────────────────────────────────────────

    /// Speak `text` under a freshly generated identifier.
    ///
    /// The utterance claims the audio channel as soon as it is registered,
    /// so the first speak on an idle session ducks other audio before the
    /// engine starts playback. Returns as soon as the utterance is handed to
    /// the engine; progress arrives as [`SpeechEvent`]s.
    pub fn speak(&self, text: &str, overrides: &SpeechOptions) -> Result<UtteranceId, SpeechError> {
        self.speak_with_id(UtteranceId::generate(), text, overrides)
    }

    /// Speak `text` under a caller-chosen identifier.
    ///
    /// Fails with [`RegistryError::DuplicateIdentifier`] when `id` belongs to
    /// a live utterance. If the engine refuses the utterance it is marked
    /// failed, an `Error` event is emitted, and the id is still returned.
    pub fn speak_with_id(
        &self,
        id: UtteranceId,
        text: &str,
        overrides: &SpeechOptions,
    ) -> Result<UtteranceId, SpeechError> {
        if text.trim().is_empty() {
            return Err(SpeechError::EmptyText);
        }
        validate_options(overrides)?;

        let mut state = self.lock();
        let options = overrides.merged_over(&state.global);
        let utterance = Utterance::new(id, text, options);
        let id = state.registry.register(utterance.clone())?;

        match self.inner.engine.enqueue(&utterance) {
            Ok(()) => debug!(id = %id, words = utterance.word_count(), "Utterance enqueued"),
            Err(err) => {
                warn!(id = %id, error = %err, "Engine refused utterance");
                let reason = err.to_string();
                if state.registry.mark_failed(&id, reason.clone()).is_ok() {
                    state.emit(SpeechEvent::Error {
                        id: id.clone(),
                        reason,
                    });
                }
            }
        }
        state.flush_duck_failures();

        Ok(id)
    }

    /// Ask the engine to cancel one utterance.
    ///
    /// Returns `Ok(false)` without contacting the engine when the utterance
    /// is unknown or already terminal. The registry transition happens when
    /// the engine acknowledges; if the utterance finishes first, the late
    /// acknowledgement is ignored.
    pub fn stop(&self, id: &UtteranceId) -> Result<bool, SpeechError> {
        let state = self.lock();
        if state.registry.get(id).is_none() {
            debug!(id = %id, "Stop ignored: utterance not live");
            return Ok(false);
        }
        self.inner.engine.cancel(id)?;
        drop(state);
        debug!(id = %id, "Cancellation requested");
        Ok(true)
    }

    /// Ask the engine to cancel every live utterance.
    ///
    /// Every utterance is attempted even if one request fails; the first
    /// failure is returned. Otherwise returns how many were requested.
    pub fn stop_all(&self) -> Result<usize, SpeechError> {
        let state = self.lock();
        let mut requested = 0;
        let mut first_error = None;

        for id in state.registry.live_ids() {
            match self.inner.engine.cancel(&id) {
                Ok(()) => requested += 1,
                Err(err) => {
                    warn!(id = %id, error = %err, "Cancellation request failed");
                    first_error.get_or_insert(err);
                }
            }
        }
        drop(state);

        match first_error {
            Some(err) => Err(err.into()),
            None => {
                debug!(requested, "Cancellation requested for all utterances");
                Ok(requested)
            }
        }
    }

    /// Forward a pause request. Neither the active count nor ducking change.
    pub fn pause(&self, id: &UtteranceId) -> Result<bool, SpeechError> {
        let state = self.lock();
        if state.registry.get(id).is_none() {
            debug!(id = %id, "Pause ignored: utterance not live");
            return Ok(false);
        }
        self.inner.engine.pause(id)?;
        drop(state);
        Ok(true)
    }

    /// Forward a resume request.
    pub fn resume(&self, id: &UtteranceId) -> Result<bool, SpeechError> {
        let state = self.lock();
        if state.registry.get(id).is_none() {
            debug!(id = %id, "Resume ignored: utterance not live");
            return Ok(false);
        }
        self.inner.engine.resume(id)?;
        drop(state);
        Ok(true)
    }

    /// Replace the global options. Already-registered utterances keep the
    /// options they were created with.
    pub fn set_global_options(&self, options: SpeechOptions) -> Result<(), SpeechError> {
        validate_options(&options)?;
        self.lock().global = options;
        info!("Global speech options replaced");
        Ok(())
    }

    /// Restore the built-in global options.
    pub fn reset_global_options(&self) {
        self.lock().global = SpeechOptions::with_defaults();
        info!("Global speech options reset to defaults");
    }

    /// Subscribe to lifecycle events. Dropping the receiver unsubscribes.
    pub fn subscribe(&self) -> mpsc::UnboundedReceiver<SpeechEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.lock().subscribers.push(tx);
        rx
    }

    /// Cancel everything and release the audio channel.
    ///
    /// Unlike [`stop_all`](Self::stop_all) this does not wait for the engine:
    /// every live utterance is marked cancelled immediately, so ducking ends
    /// before this returns. Later engine acknowledgements are ignored.
    pub fn shutdown(&self) -> usize {
        let mut state = self.lock();
        let ids = state.registry.live_ids();

        for id in &ids {
            if let Err(err) = self.inner.engine.cancel(id) {
                warn!(id = %id, error = %err, "Cancellation request failed during shutdown");
            }
            if state.registry.mark_cancelled(id).is_ok() {
                state.emit(SpeechEvent::Cancelled { id: id.clone() });
            }
        }
        state.flush_duck_failures();
        drop(state);

        info!(cancelled = ids.len(), "Speech session shut down");
        ids.len()
    }

    // ── Engine notifications ───────────────────────────────────────

    /// Apply one engine notification.
    ///
    /// Returns [`RegistryError::AlreadyTerminal`] for duplicate or late
    /// callbacks; callers can treat that as informational.
    pub fn handle_engine_event(&self, event: EngineEvent) -> Result<(), RegistryError> {
        let mut state = self.lock();
        let result = state.apply(event);
        state.flush_duck_failures();
        result
    }

    /// Drain `events` on a background task.
    ///
    /// The task holds only a weak reference, so it ends when the stream
    /// closes or when the last `SpeechSession` handle is dropped.
    ///
    /// # Panics
    ///
    /// Panics if called outside the context of a tokio runtime. Hosts
    /// without a runtime feed notifications through
    /// [`SpeechSession::handle_engine_event`] instead.
    pub fn spawn_event_loop(&self, events: EngineEventStream) -> JoinHandle<()> {
        let session = Arc::downgrade(&self.inner);
        tokio::spawn(pump_engine_events(session, events))
    }

    // ── Queries ────────────────────────────────────────────────────

    /// Number of live utterances claiming the audio channel.
    pub fn active_count(&self) -> usize {
        self.lock().registry.active_count()
    }

    /// Whether other audio is attenuated.
    pub fn is_ducking(&self) -> bool {
        self.lock().registry.observer().is_ducking()
    }

    /// Whether at least one utterance is live.
    pub fn is_speaking(&self) -> bool {
        self.active_count() > 0
    }

    /// Snapshot of a live utterance.
    pub fn utterance(&self, id: &UtteranceId) -> Option<Utterance> {
        self.lock().registry.get(id).cloned()
    }

    /// Current global options.
    pub fn global_options(&self) -> SpeechOptions {
        self.lock().global.clone()
    }

    /// Point-in-time status.
    pub fn status(&self) -> SessionStatus {
        let state = self.lock();
        SessionStatus {
            active_count: state.registry.active_count(),
            pending_count: state.registry.pending_count(),
            is_ducking: state.registry.observer().is_ducking(),
            global_options: state.global.clone(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, SessionState> {
        lock_state(&self.inner)
    }
}

// Every mutation completes before the guard is released, so a poisoned
// lock still guards consistent state.
fn lock_state(inner: &Inner) -> MutexGuard<'_, SessionState> {
    inner.state.lock().unwrap_or_else(PoisonError::into_inner)
}

async fn pump_engine_events(session: Weak<Inner>, mut events: EngineEventStream) {
    while let Some(event) = events.recv().await {
        let Some(inner) = session.upgrade() else {
            break;
        };

        let kind = event.kind();
        let result = {
            let mut state = lock_state(&inner);
            let result = state.apply(event);
            state.flush_duck_failures();
            result
        };

        match result {
            Ok(()) => {}
            Err(err) if err.is_benign() => {
                debug!(event = kind, error = %err, "Ignoring late engine notification");
            }
            Err(err) => warn!(event = kind, error = %err, "Engine notification rejected"),
        }
    }
    debug!("Engine event loop finished");
}

#[cfg(test)]
mod tests {
    use super::*;
    use murmur_core::{EngineError, NoopAudioSession, OptionsError};

    #[derive(Debug, Clone, PartialEq)]
    enum Call {
        Enqueue(UtteranceId, SpeechOptions),
        Cancel(UtteranceId),
        Pause(UtteranceId),
        Resume(UtteranceId),
    }

    /// Engine that records calls and never reports anything on its own.
    #[derive(Default)]
    struct RecordingEngine {
        calls: Mutex<Vec<Call>>,
        refuse_enqueue: bool,
        refuse_cancel_of: Option<UtteranceId>,
    }

    impl RecordingEngine {
        fn calls(&self) -> Vec<Call> {
            self.calls.lock().unwrap().clone()
        }
    }

    impl SynthesisEngine for RecordingEngine {
        fn enqueue(&self, utterance: &Utterance) -> Result<(), EngineError> {
            self.calls
                .lock()
                .unwrap()
                .push(Call::Enqueue(utterance.id.clone(), utterance.options.clone()));
            if self.refuse_enqueue {
                return Err(EngineError::Rejected("voice not installed".into()));
            }
            Ok(())
        }

        fn cancel(&self, id: &UtteranceId) -> Result<(), EngineError> {
            self.calls.lock().unwrap().push(Call::Cancel(id.clone()));
            if self.refuse_cancel_of.as_ref() == Some(id) {
                return Err(EngineError::Unavailable("busy".into()));
            }
            Ok(())
        }

        fn pause(&self, id: &UtteranceId) -> Result<(), EngineError> {
            self.calls.lock().unwrap().push(Call::Pause(id.clone()));
            Ok(())
        }

        fn resume(&self, id: &UtteranceId) -> Result<(), EngineError> {
            self.calls.lock().unwrap().push(Call::Resume(id.clone()));
            Ok(())
        }
    }

    fn session_with(engine: RecordingEngine) -> (SpeechSession, Arc<RecordingEngine>) {
        let engine = Arc::new(engine);
        let session = SpeechSession::new(engine.clone(), Arc::new(NoopAudioSession::new()));
        (session, engine)
    }

    fn drain(rx: &mut mpsc::UnboundedReceiver<SpeechEvent>) -> Vec<SpeechEvent> {
        std::iter::from_fn(|| rx.try_recv().ok()).collect()
    }

    #[test]
    fn speak_hands_merged_options_to_engine() {
        let (session, engine) = session_with(RecordingEngine::default());
        session
            .set_global_options(SpeechOptions::with_defaults().voice("en-US"))
            .unwrap();

        let id = session
            .speak_with_id("a".into(), "hello", &SpeechOptions::default().rate(0.5))
            .unwrap();

        assert_eq!(id.as_str(), "a");
        let expected = SpeechOptions {
            voice: Some("en-US".into()),
            rate: Some(0.5),
            pitch: Some(1.0),
            volume: Some(1.0),
        };
        assert_eq!(engine.calls(), vec![Call::Enqueue("a".into(), expected)]);
        assert_eq!(session.status().pending_count, 1);
        assert_eq!(session.active_count(), 1);
        assert!(session.is_ducking());
    }

    #[test]
    fn refused_enqueue_releases_the_channel() {
        let (session, _engine) = session_with(RecordingEngine {
            refuse_enqueue: true,
            ..RecordingEngine::default()
        });

        session.speak("hello", &SpeechOptions::default()).unwrap();

        assert_eq!(session.active_count(), 0);
        assert!(!session.is_ducking());
    }

    #[test]
    fn blank_text_and_bad_options_never_reach_engine() {
        let (session, engine) = session_with(RecordingEngine::default());

        assert!(matches!(
            session.speak("   ", &SpeechOptions::default()),
            Err(SpeechError::EmptyText)
        ));
        assert!(matches!(
            session.speak("hi", &SpeechOptions::default().rate(9.0)),
            Err(SpeechError::Options(OptionsError::InvalidRate(_)))
        ));
        assert!(engine.calls().is_empty());
    }

    #[test]
    fn duplicate_live_identifier_is_rejected() {
        let (session, _engine) = session_with(RecordingEngine::default());
        session
            .speak_with_id("a".into(), "one", &SpeechOptions::default())
            .unwrap();

        let err = session
            .speak_with_id("a".into(), "two", &SpeechOptions::default())
            .unwrap_err();
        assert!(matches!(
            err,
            SpeechError::Registry(RegistryError::DuplicateIdentifier(_))
        ));
    }

    #[test]
    fn engine_refusal_fails_utterance_with_event() {
        let (session, _engine) = session_with(RecordingEngine {
            refuse_enqueue: true,
            ..RecordingEngine::default()
        });
        let mut events = session.subscribe();

        let id = session.speak("hello", &SpeechOptions::default()).unwrap();

        assert!(session.utterance(&id).is_none());
        match drain(&mut events).as_slice() {
            [SpeechEvent::Error { id: failed, reason }] => {
                assert_eq!(failed, &id);
                assert!(reason.contains("voice not installed"));
            }
            other => panic!("unexpected events {other:?}"),
        }
    }

    #[test]
    fn stop_waits_for_engine_acknowledgement() {
        let (session, engine) = session_with(RecordingEngine::default());
        let id = session
            .speak_with_id("a".into(), "hello", &SpeechOptions::default())
            .unwrap();
        session
            .handle_engine_event(EngineEvent::Started { id: id.clone() })
            .unwrap();

        assert!(session.stop(&id).unwrap());
        assert!(engine.calls().contains(&Call::Cancel(id.clone())));
        assert_eq!(session.active_count(), 1);
        assert!(session.is_ducking());

        session
            .handle_engine_event(EngineEvent::Cancelled { id: id.clone() })
            .unwrap();
        assert_eq!(session.active_count(), 0);
        assert!(!session.is_ducking());
    }

    #[test]
    fn control_requests_for_unknown_ids_are_noops() {
        let (session, engine) = session_with(RecordingEngine::default());
        let ghost = UtteranceId::from("ghost");

        assert!(!session.stop(&ghost).unwrap());
        assert!(!session.pause(&ghost).unwrap());
        assert!(!session.resume(&ghost).unwrap());
        assert!(engine.calls().is_empty());
    }

    #[test]
    fn pause_and_resume_are_forwarded() {
        let (session, engine) = session_with(RecordingEngine::default());
        let id = session
            .speak_with_id("a".into(), "hello", &SpeechOptions::default())
            .unwrap();

        assert!(session.pause(&id).unwrap());
        assert!(session.resume(&id).unwrap());
        let calls = engine.calls();
        assert_eq!(&calls[1..], &[Call::Pause(id.clone()), Call::Resume(id)]);
    }

    #[test]
    fn stop_all_attempts_every_utterance() {
        let (session, engine) = session_with(RecordingEngine {
            refuse_cancel_of: Some("a".into()),
            ..RecordingEngine::default()
        });
        for id in ["a", "b"] {
            session
                .speak_with_id(id.into(), "hello", &SpeechOptions::default())
                .unwrap();
        }

        let err = session.stop_all().unwrap_err();
        assert!(matches!(err, SpeechError::Engine(EngineError::Unavailable(_))));
        let cancels = engine
            .calls()
            .into_iter()
            .filter(|call| matches!(call, Call::Cancel(_)))
            .count();
        assert_eq!(cancels, 2);
    }

    #[test]
    fn shutdown_cancels_locally_and_unducks() {
        let (session, _engine) = session_with(RecordingEngine::default());
        let mut events = session.subscribe();
        for id in ["a", "b"] {
            session
                .speak_with_id(id.into(), "hello", &SpeechOptions::default())
                .unwrap();
        }
        session
            .handle_engine_event(EngineEvent::Started { id: "a".into() })
            .unwrap();
        assert!(session.is_ducking());

        assert_eq!(session.shutdown(), 2);
        assert!(!session.is_ducking());
        assert_eq!(session.status().pending_count, 0);

        // Late acknowledgement from the engine is benign.
        let late = session.handle_engine_event(EngineEvent::Cancelled { id: "a".into() });
        assert!(late.unwrap_err().is_benign());

        let cancelled = drain(&mut events)
            .into_iter()
            .filter(|event| matches!(event, SpeechEvent::Cancelled { .. }))
            .count();
        assert_eq!(cancelled, 2);
    }

    #[test]
    fn invalid_global_options_leave_previous_in_place() {
        let (session, _engine) = session_with(RecordingEngine::default());
        let before = session.global_options();

        assert!(session
            .set_global_options(SpeechOptions::default().volume(1.5))
            .is_err());
        assert_eq!(session.global_options(), before);

        session
            .set_global_options(SpeechOptions::default().pitch(1.5))
            .unwrap();
        session.reset_global_options();
        assert_eq!(session.global_options(), SpeechOptions::with_defaults());
    }

    #[test]
    fn dropped_subscribers_are_pruned() {
        let (session, _engine) = session_with(RecordingEngine::default());
        drop(session.subscribe());
        let mut kept = session.subscribe();

        let id = session.speak("hello", &SpeechOptions::default()).unwrap();
        session
            .handle_engine_event(EngineEvent::Started { id: id.clone() })
            .unwrap();

        assert_eq!(drain(&mut kept), vec![SpeechEvent::Started { id }]);
        assert_eq!(session.lock().subscribers.len(), 1);
    }

    #[test]
    #[should_panic]
    fn event_loop_needs_a_runtime() {
        let (session, _engine) = session_with(RecordingEngine::default());
        let (_sink, stream) = engine_channel();
        session.spawn_event_loop(stream);
    }

    #[test]
    fn status_serializes_camel_case() {
        let (session, _engine) = session_with(RecordingEngine::default());
        let json = serde_json::to_value(session.status()).unwrap();
        assert_eq!(json["activeCount"], 0);
        assert_eq!(json["isDucking"], false);
        assert_eq!(json["globalOptions"]["rate"], 1.0);
    }
}
