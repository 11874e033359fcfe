//! Available commands and their arguments.

use clap::{Args, Subcommand};
use murmur_core::SpeechOptions;

/// Available commands.
#[derive(Subcommand)]
pub enum Commands {
    /// Speak one or more texts through a simulated engine, printing events as JSON lines
    Speak(SpeakCommand),

    /// Print the effective configuration
    Config,
}

/// Arguments for `murmur speak`.
#[derive(Args, Debug, Clone)]
pub struct SpeakCommand {
    /// Texts to speak, one utterance each
    #[arg(required = true)]
    pub texts: Vec<String>,

    /// Voice identifier
    #[arg(long)]
    pub voice: Option<String>,

    /// Speaking rate (0.1-2.0)
    #[arg(long)]
    pub rate: Option<f32>,

    /// Pitch multiplier (0.5-2.0)
    #[arg(long)]
    pub pitch: Option<f32>,

    /// Output volume (0.0-1.0)
    #[arg(long)]
    pub volume: Option<f32>,

    /// Start every utterance immediately instead of queueing them
    #[arg(long)]
    pub concurrent: bool,

    /// Stop all speech after this many milliseconds
    #[arg(long, value_name = "MS")]
    pub stop_after_ms: Option<u64>,

    /// Pause the first utterance after this many milliseconds, then resume it after as many again
    #[arg(long, value_name = "MS")]
    pub pause_ms: Option<u64>,
}

impl SpeakCommand {
    /// Per-utterance overrides taken from the flags.
    pub fn overrides(&self) -> SpeechOptions {
        SpeechOptions {
            voice: self.voice.clone(),
            rate: self.rate,
            pitch: self.pitch,
            volume: self.volume,
        }
    }
}
