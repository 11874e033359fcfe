//! Domain types for speech requests.
//!
//! These are pure data types with no infrastructure dependencies. The
//! registry in `murmur-session` owns [`Utterance`] values for their whole
//! lifetime; everything else refers to them by [`UtteranceId`].

mod options;
mod utterance;

pub use options::{DEFAULT_PITCH, DEFAULT_RATE, DEFAULT_VOLUME, SpeechOptions, validate_options};
pub use utterance::{Utterance, UtteranceId, UtteranceState};
