//! Speak command handler.
//!
//! Runs one simulated session end to end: every text becomes an utterance,
//! each lifecycle event is written as a JSON line, and the final session
//! status is written once every utterance reached a terminal state.

use std::collections::HashSet;
use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use murmur_core::{SpeechEvent, UtteranceId};
use murmur_session::{PlaybackMode, SessionStatus, SimulatedEngine, SpeechSession, engine_channel};
use tokio::time::{Instant, sleep_until};

use crate::audio::LoggingAudioSession;
use crate::commands::SpeakCommand;
use crate::config::CliConfig;
use crate::error::CliError;

/// Scripted control requests issued while speech is running.
#[derive(Debug, Clone, Copy)]
struct Script {
    stop_at: Option<Instant>,
    pause_at: Option<Instant>,
    resume_at: Option<Instant>,
    pause_for: Duration,
}

impl Script {
    fn new(args: &SpeakCommand, now: Instant) -> Self {
        let pause_for = Duration::from_millis(args.pause_ms.unwrap_or(0));
        Self {
            stop_at: args.stop_after_ms.map(|ms| now + Duration::from_millis(ms)),
            pause_at: args.pause_ms.map(|_| now + pause_for),
            resume_at: None,
            pause_for,
        }
    }
}

/// Execute the speak command. Returns the final session status.
pub async fn execute(
    config: &CliConfig,
    args: &SpeakCommand,
    out: &mut impl Write,
) -> Result<SessionStatus, CliError> {
    let playback = if args.concurrent {
        PlaybackMode::Concurrent
    } else {
        PlaybackMode::Queued
    };

    let (sink, stream) = engine_channel();
    let engine = Arc::new(SimulatedEngine::spawn(sink, config.engine.to_sim_config(playback)));
    let audio = Arc::new(LoggingAudioSession::new());
    let session = SpeechSession::with_global_options(engine, audio, config.defaults.clone())?;
    let event_loop = session.spawn_event_loop(stream);
    let mut events = session.subscribe();

    let overrides = args.overrides();
    let mut outstanding: HashSet<UtteranceId> = HashSet::new();
    let mut first = None;
    for text in &args.texts {
        let id = session.speak(text, &overrides)?;
        tracing::debug!(id = %id, "Queued utterance");
        first.get_or_insert_with(|| id.clone());
        outstanding.insert(id);
    }

    let mut script = Script::new(args, Instant::now());
    while !outstanding.is_empty() {
        tokio::select! {
            event = events.recv() => {
                let Some(event) = event else { break };
                if event.is_terminal() {
                    if let Some(id) = event.utterance_id() {
                        outstanding.remove(id);
                    }
                }
                write_line(out, &event)?;
            }
            () = sleep_until_opt(script.stop_at) => {
                script.stop_at = None;
                let requested = session.stop_all()?;
                tracing::info!(requested, "Stopping all speech");
            }
            () = sleep_until_opt(script.pause_at) => {
                script.pause_at = None;
                if let Some(id) = &first {
                    if session.pause(id)? {
                        script.resume_at = Some(Instant::now() + script.pause_for);
                    }
                }
            }
            () = sleep_until_opt(script.resume_at) => {
                script.resume_at = None;
                if let Some(id) = &first {
                    session.resume(id)?;
                }
            }
        }
    }

    session.shutdown();
    // Events emitted by shutdown, if any utterance was still live.
    while let Ok(event) = events.try_recv() {
        write_line(out, &event)?;
    }
    event_loop.abort();

    let status = session.status();
    serde_json::to_writer(&mut *out, &status)?;
    writeln!(out)?;
    Ok(status)
}

fn write_line(out: &mut impl Write, event: &SpeechEvent) -> Result<(), CliError> {
    serde_json::to_writer(&mut *out, event)?;
    writeln!(out)?;
    Ok(())
}

async fn sleep_until_opt(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}
