#![doc = include_str!(concat!(env!("OUT_DIR"), "/README_GENERATED.md"))]
#![deny(unused_crate_dependencies)]

pub mod domain;
pub mod error;
pub mod events;
pub mod ports;

// Re-export commonly used types for convenience
pub use domain::{
    DEFAULT_PITCH, DEFAULT_RATE, DEFAULT_VOLUME, SpeechOptions, Utterance, UtteranceId,
    UtteranceState, validate_options,
};
pub use error::{AudioSessionError, EngineError, OptionsError, RegistryError, SpeechError};
pub use events::{DuckOperation, SpeechEvent};
pub use ports::{AudioSession, EngineEvent, NoopAudioSession, SynthesisEngine};

// Wire-format tests only
#[cfg(test)]
use serde_json as _;
