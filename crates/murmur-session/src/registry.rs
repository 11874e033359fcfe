//! Utterance registry: arena of live utterances and the active count.
//!
//! The registry is the only owner of [`Utterance`] values between
//! registration and their terminal transition. Everything else refers to
//! them by [`UtteranceId`], so a callback for an utterance that has already
//! been removed resolves to [`RegistryError::AlreadyTerminal`] instead of
//! touching stale state.
//!
//! ```text
//!   register ──► Pending ──mark_speaking──► Speaking ──mark_finished──► (removed)
//!                   │                          ├──mark_cancelled──────► (removed)
//!                   │                          └──mark_failed─────────► (removed)
//!                   ├──mark_cancelled──────────────────────────────────► (removed)
//!                   ├──mark_failed─────────────────────────────────────► (removed)
//!                   └──mark_finished (implicit start)──────────────────► (removed)
//! ```
//!
//! An utterance claims the audio channel from `register` until its terminal
//! transition, so queued utterances waiting behind a speaking one keep the
//! count above zero. `mark_speaking` changes the state only.
//!
//! Every transition that moves the active count across the 0 / non-0
//! boundary notifies the [`OccupancyObserver`] before the call returns.

use std::collections::HashMap;

use murmur_core::{RegistryError, Utterance, UtteranceId, UtteranceState};

/// Receives active-set occupancy transitions.
///
/// Called with `true` on 0→1 and with `false` on 1→0. Never called for
/// transitions that stay on the same side of the boundary.
pub trait OccupancyObserver {
    fn on_active_transition(&mut self, now_active: bool);
}

struct Entry {
    /// Registration order, for stable iteration.
    seq: u64,
    utterance: Utterance,
}

/// Arena of live utterances keyed by identifier.
pub struct UtteranceRegistry<O: OccupancyObserver> {
    entries: HashMap<UtteranceId, Entry>,
    active: usize,
    next_seq: u64,
    observer: O,
}

impl<O: OccupancyObserver> UtteranceRegistry<O> {
    /// Create an empty registry that reports occupancy changes to `observer`.
    pub fn new(observer: O) -> Self {
        Self {
            entries: HashMap::new(),
            active: 0,
            next_seq: 0,
            observer,
        }
    }

    /// Track a new utterance in the `Pending` state and count it as active.
    ///
    /// Whatever state the incoming value carries is reset to `Pending`.
    pub fn register(&mut self, mut utterance: Utterance) -> Result<UtteranceId, RegistryError> {
        if self.entries.contains_key(&utterance.id) {
            return Err(RegistryError::DuplicateIdentifier(utterance.id));
        }

        utterance.state = UtteranceState::Pending;
        utterance.paused = false;
        utterance.failure = None;

        let id = utterance.id.clone();
        let seq = self.next_seq;
        self.next_seq += 1;
        self.entries.insert(id.clone(), Entry { seq, utterance });
        self.increment_active();

        tracing::trace!(id = %id, active = self.active, "Utterance registered");
        Ok(id)
    }

    /// Move a `Pending` utterance to `Speaking`. The active count is unchanged.
    ///
    /// Returns `Ok(true)` when the transition happened and `Ok(false)` for a
    /// duplicate start on an utterance that is already speaking.
    pub fn mark_speaking(&mut self, id: &UtteranceId) -> Result<bool, RegistryError> {
        let entry = self
            .entries
            .get_mut(id)
            .ok_or_else(|| RegistryError::AlreadyTerminal(id.clone()))?;

        match entry.utterance.state {
            UtteranceState::Pending => {
                entry.utterance.state = UtteranceState::Speaking;
                Ok(true)
            }
            UtteranceState::Speaking => Ok(false),
            // Terminal entries are removed eagerly; this arm is unreachable in
            // practice but keeps the match total.
            UtteranceState::Finished | UtteranceState::Cancelled | UtteranceState::Failed => {
                Err(RegistryError::AlreadyTerminal(id.clone()))
            }
        }
    }

    /// Terminal transition to `Finished`.
    ///
    /// Legal from `Pending` too: a finish the engine reports without a prior
    /// start is an implicit start followed by a finish, and releases the
    /// channel claim exactly once.
    pub fn mark_finished(&mut self, id: &UtteranceId) -> Result<Utterance, RegistryError> {
        self.terminate(id, UtteranceState::Finished, None)
    }

    /// Terminal transition to `Cancelled`. Legal from `Pending` too.
    pub fn mark_cancelled(&mut self, id: &UtteranceId) -> Result<Utterance, RegistryError> {
        self.terminate(id, UtteranceState::Cancelled, None)
    }

    /// Terminal transition to `Failed`, recording `reason`.
    pub fn mark_failed(
        &mut self,
        id: &UtteranceId,
        reason: impl Into<String>,
    ) -> Result<Utterance, RegistryError> {
        self.terminate(id, UtteranceState::Failed, Some(reason.into()))
    }

    /// Record a pause or resume acknowledgement.
    ///
    /// Never changes the active count: a paused utterance keeps its claim on
    /// the audio channel.
    pub fn set_paused(&mut self, id: &UtteranceId, paused: bool) -> Result<(), RegistryError> {
        let entry = self
            .entries
            .get_mut(id)
            .ok_or_else(|| RegistryError::AlreadyTerminal(id.clone()))?;
        entry.utterance.paused = paused;
        Ok(())
    }

    /// Number of live utterances (pending or speaking) claiming the channel.
    pub const fn active_count(&self) -> usize {
        self.active
    }

    /// Number of utterances still waiting for the engine to start them.
    pub fn pending_count(&self) -> usize {
        self.entries
            .values()
            .filter(|e| e.utterance.state == UtteranceState::Pending)
            .count()
    }

    /// Number of live (non-terminal) utterances.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no utterance is live.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Look up a live utterance.
    pub fn get(&self, id: &UtteranceId) -> Option<&Utterance> {
        self.entries.get(id).map(|e| &e.utterance)
    }

    /// Identifiers of all live utterances, in registration order.
    pub fn live_ids(&self) -> Vec<UtteranceId> {
        let mut live: Vec<(u64, &UtteranceId)> =
            self.entries.iter().map(|(id, e)| (e.seq, id)).collect();
        live.sort_unstable_by_key(|(seq, _)| *seq);
        live.into_iter().map(|(_, id)| id.clone()).collect()
    }

    /// Borrow the occupancy observer.
    pub const fn observer(&self) -> &O {
        &self.observer
    }

    /// Mutably borrow the occupancy observer.
    pub const fn observer_mut(&mut self) -> &mut O {
        &mut self.observer
    }

    // ── Internal helpers ───────────────────────────────────────────

    fn terminate(
        &mut self,
        id: &UtteranceId,
        terminal: UtteranceState,
        failure: Option<String>,
    ) -> Result<Utterance, RegistryError> {
        let Entry { mut utterance, .. } = self
            .entries
            .remove(id)
            .ok_or_else(|| RegistryError::AlreadyTerminal(id.clone()))?;

        debug_assert!(utterance.state.is_active(), "terminal entry left in arena");
        utterance.state = terminal;
        utterance.paused = false;
        utterance.failure = failure;

        self.decrement_active();

        tracing::trace!(id = %id, state = %terminal, active = self.active, "Utterance terminal");
        Ok(utterance)
    }

    fn increment_active(&mut self) {
        self.active += 1;
        if self.active == 1 {
            self.observer.on_active_transition(true);
        }
    }

    fn decrement_active(&mut self) {
        debug_assert!(self.active > 0, "active count underflow");
        self.active = self.active.saturating_sub(1);
        if self.active == 0 {
            self.observer.on_active_transition(false);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use murmur_core::SpeechOptions;

    /// Observer that records every transition it receives.
    #[derive(Default)]
    struct Recorder {
        transitions: Vec<bool>,
    }

    impl OccupancyObserver for Recorder {
        fn on_active_transition(&mut self, now_active: bool) {
            self.transitions.push(now_active);
        }
    }

    fn utterance(id: &str) -> Utterance {
        Utterance::new(id.into(), "hello", SpeechOptions::default())
    }

    fn registry() -> UtteranceRegistry<Recorder> {
        UtteranceRegistry::new(Recorder::default())
    }

    #[test]
    fn register_starts_pending_and_claims_channel() {
        let mut reg = registry();
        let id = reg.register(utterance("a")).unwrap();

        assert_eq!(reg.get(&id).unwrap().state, UtteranceState::Pending);
        assert_eq!(reg.active_count(), 1);
        assert_eq!(reg.pending_count(), 1);
        assert_eq!(reg.observer().transitions, vec![true]);
    }

    #[test]
    fn duplicate_identifier_rejected() {
        let mut reg = registry();
        reg.register(utterance("a")).unwrap();

        let err = reg.register(utterance("a")).unwrap_err();
        assert_eq!(err, RegistryError::DuplicateIdentifier("a".into()));
        assert_eq!(reg.len(), 1);
    }

    #[test]
    fn identifier_reusable_after_terminal() {
        let mut reg = registry();
        let id = reg.register(utterance("a")).unwrap();
        reg.mark_cancelled(&id).unwrap();

        assert!(reg.register(utterance("a")).is_ok());
    }

    #[test]
    fn register_resets_incoming_state() {
        let mut reg = registry();
        let mut utt = utterance("a");
        utt.state = UtteranceState::Speaking;

        let id = reg.register(utt).unwrap();
        assert_eq!(reg.get(&id).unwrap().state, UtteranceState::Pending);
        assert_eq!(reg.active_count(), 1);
    }

    #[test]
    fn first_registration_notifies_once() {
        let mut reg = registry();
        let a = reg.register(utterance("a")).unwrap();
        let b = reg.register(utterance("b")).unwrap();
        assert_eq!(reg.active_count(), 2);

        assert!(reg.mark_speaking(&a).unwrap());
        assert!(reg.mark_speaking(&b).unwrap());

        assert_eq!(reg.active_count(), 2);
        assert_eq!(reg.pending_count(), 0);
        assert_eq!(reg.observer().transitions, vec![true]);
    }

    #[test]
    fn queued_utterances_keep_channel_between_plays() {
        let mut reg = registry();
        let a = reg.register(utterance("a")).unwrap();
        let b = reg.register(utterance("b")).unwrap();

        reg.mark_speaking(&a).unwrap();
        reg.mark_finished(&a).unwrap();
        assert_eq!(reg.active_count(), 1);

        reg.mark_speaking(&b).unwrap();
        reg.mark_finished(&b).unwrap();
        assert_eq!(reg.observer().transitions, vec![true, false]);
    }

    #[test]
    fn duplicate_start_is_noop() {
        let mut reg = registry();
        let a = reg.register(utterance("a")).unwrap();

        assert!(reg.mark_speaking(&a).unwrap());
        assert!(!reg.mark_speaking(&a).unwrap());
        assert_eq!(reg.active_count(), 1);
    }

    #[test]
    fn last_terminal_transition_notifies_inactive() {
        let mut reg = registry();
        let a = reg.register(utterance("a")).unwrap();
        let b = reg.register(utterance("b")).unwrap();
        reg.mark_speaking(&a).unwrap();
        reg.mark_speaking(&b).unwrap();

        reg.mark_finished(&a).unwrap();
        assert_eq!(reg.observer().transitions, vec![true]);

        reg.mark_failed(&b, "engine crashed").unwrap();
        assert_eq!(reg.observer().transitions, vec![true, false]);
        assert_eq!(reg.active_count(), 0);
    }

    #[test]
    fn terminal_calls_are_idempotent() {
        let mut reg = registry();
        let a = reg.register(utterance("a")).unwrap();
        reg.mark_speaking(&a).unwrap();

        let finished = reg.mark_finished(&a).unwrap();
        assert_eq!(finished.state, UtteranceState::Finished);

        assert_eq!(
            reg.mark_finished(&a).unwrap_err(),
            RegistryError::AlreadyTerminal(a.clone())
        );
        assert!(reg.mark_cancelled(&a).is_err());
        assert!(reg.mark_failed(&a, "late").is_err());

        assert_eq!(reg.active_count(), 0);
        assert_eq!(reg.observer().transitions, vec![true, false]);
    }

    #[test]
    fn cancel_from_pending_releases_channel() {
        let mut reg = registry();
        let a = reg.register(utterance("a")).unwrap();

        let cancelled = reg.mark_cancelled(&a).unwrap();
        assert_eq!(cancelled.state, UtteranceState::Cancelled);
        assert_eq!(reg.active_count(), 0);
        assert_eq!(reg.observer().transitions, vec![true, false]);
    }

    #[test]
    fn finish_from_pending_is_implicit_start() {
        let mut reg = registry();
        let a = reg.register(utterance("a")).unwrap();
        let b = reg.register(utterance("b")).unwrap();

        let finished = reg.mark_finished(&a).unwrap();
        assert_eq!(finished.state, UtteranceState::Finished);
        assert_eq!(reg.active_count(), 1);

        reg.mark_failed(&b, "no voice").unwrap();
        assert_eq!(reg.active_count(), 0);
        assert_eq!(reg.observer().transitions, vec![true, false]);
        assert!(reg.mark_speaking(&a).unwrap_err().is_benign());
    }

    #[test]
    fn start_after_terminal_reports_already_terminal() {
        let mut reg = registry();
        let a = reg.register(utterance("a")).unwrap();
        reg.mark_cancelled(&a).unwrap();

        assert!(reg.mark_speaking(&a).unwrap_err().is_benign());
        assert_eq!(reg.active_count(), 0);
    }

    #[test]
    fn unknown_handle_reports_already_terminal() {
        let mut reg = registry();
        let err = reg.mark_finished(&"ghost".into()).unwrap_err();
        assert!(err.is_benign());
    }

    #[test]
    fn failure_reason_recorded() {
        let mut reg = registry();
        let a = reg.register(utterance("a")).unwrap();
        let failed = reg.mark_failed(&a, "voice missing").unwrap();
        assert_eq!(failed.failure.as_deref(), Some("voice missing"));
    }

    #[test]
    fn pause_keeps_active_count() {
        let mut reg = registry();
        let a = reg.register(utterance("a")).unwrap();
        reg.mark_speaking(&a).unwrap();

        reg.set_paused(&a, true).unwrap();
        assert!(reg.get(&a).unwrap().paused);
        assert_eq!(reg.active_count(), 1);
        assert_eq!(reg.observer().transitions, vec![true]);
    }

    #[test]
    fn live_ids_follow_registration_order() {
        let mut reg = registry();
        for id in ["c", "a", "b"] {
            reg.register(utterance(id)).unwrap();
        }
        let ids: Vec<String> = reg.live_ids().iter().map(ToString::to_string).collect();
        assert_eq!(ids, vec!["c", "a", "b"]);
    }

    #[test]
    fn reactivation_after_idle_notifies_again() {
        let mut reg = registry();
        let a = reg.register(utterance("a")).unwrap();
        reg.mark_speaking(&a).unwrap();
        reg.mark_finished(&a).unwrap();

        let b = reg.register(utterance("b")).unwrap();
        reg.mark_speaking(&b).unwrap();

        assert_eq!(reg.observer().transitions, vec![true, false, true]);
    }
}
