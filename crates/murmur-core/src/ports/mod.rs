//! Port definitions (trait abstractions) for external collaborators.
//!
//! Ports define the interfaces the coordinator expects from the host
//! platform. They contain no implementation details and use only domain
//! types.
//!
//! # Design Rules
//!
//! - No runtime or channel types in any signature
//! - Every call is fire-and-forget: results that take time arrive later as
//!   [`EngineEvent`]s
//! - Implementations must never call back into the session from inside a
//!   port method

pub mod audio_session;
pub mod engine;

pub use audio_session::{AudioSession, NoopAudioSession};
pub use engine::{EngineEvent, SynthesisEngine};
