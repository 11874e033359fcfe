//! Timer-driven synthesis engine.
//!
//! [`SimulatedEngine`] plays utterances on the tokio clock instead of a sound
//! card. Each utterance lasts `words × 60 / (words_per_minute × rate)`
//! seconds. Playback is either queued (one utterance at a time, in enqueue
//! order) or concurrent (every utterance starts immediately), which makes it
//! possible to exercise overlapping speech without a real device.
//!
//! The engine runs as an actor task. Trait calls only push a command onto
//! its channel, and every outcome comes back through the [`EngineEventSink`]
//! handed to [`SimulatedEngine::spawn`], matching the contract real engines
//! follow.

use std::collections::VecDeque;
use std::time::Duration;

use murmur_core::{EngineError, EngineEvent, SynthesisEngine, Utterance, UtteranceId};
use tokio::sync::mpsc;
use tokio::time::{Instant, MissedTickBehavior};

use crate::session::EngineEventSink;

/// Default speaking speed at rate 1.0.
pub const DEFAULT_WORDS_PER_MINUTE: u32 = 180;

/// Default clock resolution.
pub const DEFAULT_TICK: Duration = Duration::from_millis(10);

/// How simultaneous utterances are scheduled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlaybackMode {
    /// One utterance at a time, in enqueue order.
    #[default]
    Queued,
    /// Every utterance starts as soon as it is enqueued.
    Concurrent,
}

/// Simulated engine configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct SimConfig {
    /// Scheduling policy.
    pub playback: PlaybackMode,
    /// Speaking speed at rate 1.0.
    pub words_per_minute: u32,
    /// Clock resolution.
    pub tick: Duration,
    /// Utterances whose text contains this marker fail instead of playing.
    pub fail_marker: Option<String>,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            playback: PlaybackMode::default(),
            words_per_minute: DEFAULT_WORDS_PER_MINUTE,
            tick: DEFAULT_TICK,
            fail_marker: None,
        }
    }
}

impl SimConfig {
    /// How long an utterance of `words` words plays at `rate`.
    #[allow(clippy::cast_precision_loss)]
    pub fn speaking_duration(&self, words: usize, rate: f32) -> Duration {
        let words_per_second = f64::from(self.words_per_minute.max(1)) / 60.0 * f64::from(rate);
        if words_per_second <= 0.0 || !words_per_second.is_finite() {
            return Duration::ZERO;
        }
        Duration::from_secs_f64(words as f64 / words_per_second)
    }
}

#[derive(Debug)]
enum SimCommand {
    Enqueue(Track),
    Cancel(UtteranceId),
    Pause(UtteranceId),
    Resume(UtteranceId),
}

#[derive(Debug)]
struct Track {
    id: UtteranceId,
    remaining: Duration,
    paused: bool,
    fails: bool,
}

/// Handle to a running simulated engine.
///
/// Dropping the last handle stops the actor task.
pub struct SimulatedEngine {
    commands: mpsc::UnboundedSender<SimCommand>,
    config: SimConfig,
}

impl SimulatedEngine {
    /// Start the engine actor on the current tokio runtime.
    pub fn spawn(sink: EngineEventSink, config: SimConfig) -> Self {
        let (commands, rx) = mpsc::unbounded_channel();
        let actor = SimActor {
            sink,
            playback: config.playback,
            queued: VecDeque::new(),
            playing: Vec::new(),
        };
        tokio::spawn(actor.run(rx, config.tick.max(Duration::from_millis(1))));
        tracing::debug!(
            playback = ?config.playback,
            words_per_minute = config.words_per_minute,
            "Simulated engine started"
        );
        Self { commands, config }
    }

    /// Configuration this engine was started with.
    pub const fn config(&self) -> &SimConfig {
        &self.config
    }

    fn send(&self, command: SimCommand) -> Result<(), EngineError> {
        self.commands
            .send(command)
            .map_err(|_| EngineError::Unavailable("simulated engine stopped".to_string()))
    }
}

impl SynthesisEngine for SimulatedEngine {
    fn enqueue(&self, utterance: &Utterance) -> Result<(), EngineError> {
        let fails = self
            .config
            .fail_marker
            .as_deref()
            .is_some_and(|marker| utterance.text.contains(marker));
        let remaining = self
            .config
            .speaking_duration(utterance.word_count(), utterance.options.effective_rate());

        self.send(SimCommand::Enqueue(Track {
            id: utterance.id.clone(),
            remaining,
            paused: false,
            fails,
        }))
    }

    fn cancel(&self, id: &UtteranceId) -> Result<(), EngineError> {
        self.send(SimCommand::Cancel(id.clone()))
    }

    fn pause(&self, id: &UtteranceId) -> Result<(), EngineError> {
        self.send(SimCommand::Pause(id.clone()))
    }

    fn resume(&self, id: &UtteranceId) -> Result<(), EngineError> {
        self.send(SimCommand::Resume(id.clone()))
    }
}

struct SimActor {
    sink: EngineEventSink,
    playback: PlaybackMode,
    queued: VecDeque<Track>,
    playing: Vec<Track>,
}

impl SimActor {
    async fn run(mut self, mut commands: mpsc::UnboundedReceiver<SimCommand>, tick: Duration) {
        let mut ticker = tokio::time::interval(tick);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut last = Instant::now();

        loop {
            let command = tokio::select! {
                command = commands.recv() => match command {
                    Some(command) => Some(command),
                    None => break,
                },
                _ = ticker.tick() => None,
            };

            let now = Instant::now();
            self.advance(now.saturating_duration_since(last));
            last = now;

            if let Some(command) = command {
                self.apply(command);
                // Requests issued together take effect together.
                while let Ok(command) = commands.try_recv() {
                    self.apply(command);
                }
            }
            self.start_ready();
        }

        tracing::debug!("Simulated engine stopped");
    }

    fn notify(&self, event: EngineEvent) {
        if self.sink.send(event).is_err() {
            tracing::trace!("Engine event dropped: no session listening");
        }
    }

    fn apply(&mut self, command: SimCommand) {
        match command {
            SimCommand::Enqueue(track) => self.queued.push_back(track),
            SimCommand::Cancel(id) => {
                let removed = take_track(&mut self.playing, &id)
                    .or_else(|| take_queued(&mut self.queued, &id));
                if removed.is_some() {
                    self.notify(EngineEvent::Cancelled { id });
                }
            }
            SimCommand::Pause(id) => {
                if let Some(track) = self.find_mut(&id).filter(|track| !track.paused) {
                    track.paused = true;
                    self.notify(EngineEvent::Paused { id });
                }
            }
            SimCommand::Resume(id) => {
                if let Some(track) = self.find_mut(&id).filter(|track| track.paused) {
                    track.paused = false;
                    self.notify(EngineEvent::Resumed { id });
                }
            }
        }
    }

    fn find_mut(&mut self, id: &UtteranceId) -> Option<&mut Track> {
        self.playing
            .iter_mut()
            .chain(self.queued.iter_mut())
            .find(|track| &track.id == id)
    }

    /// Run the clock for playing tracks; paused tracks keep their remaining time.
    fn advance(&mut self, elapsed: Duration) {
        if elapsed.is_zero() {
            return;
        }
        let mut finished = Vec::new();
        self.playing.retain_mut(|track| {
            if track.paused {
                return true;
            }
            track.remaining = track.remaining.saturating_sub(elapsed);
            if track.remaining.is_zero() {
                finished.push(track.id.clone());
                return false;
            }
            true
        });
        for id in finished {
            self.notify(EngineEvent::Finished { id });
        }
    }

    fn start_ready(&mut self) {
        loop {
            if self.playback == PlaybackMode::Queued && !self.playing.is_empty() {
                return;
            }
            let Some(track) = self.queued.pop_front() else {
                return;
            };
            if track.fails {
                self.notify(EngineEvent::Error {
                    id: track.id,
                    reason: "simulated synthesis failure".to_string(),
                });
                continue;
            }
            self.notify(EngineEvent::Started {
                id: track.id.clone(),
            });
            if track.paused {
                self.notify(EngineEvent::Paused {
                    id: track.id.clone(),
                });
            }
            self.playing.push(track);
        }
    }
}

fn take_track(tracks: &mut Vec<Track>, id: &UtteranceId) -> Option<Track> {
    let index = tracks.iter().position(|track| &track.id == id)?;
    Some(tracks.remove(index))
}

fn take_queued(tracks: &mut VecDeque<Track>, id: &UtteranceId) -> Option<Track> {
    let index = tracks.iter().position(|track| &track.id == id)?;
    tracks.remove(index)
}
