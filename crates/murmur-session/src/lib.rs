#![doc = include_str!(concat!(env!("OUT_DIR"), "/README_GENERATED.md"))]
#![deny(unused_crate_dependencies)]

pub mod ducking;
pub mod registry;
pub mod session;
#[cfg(feature = "sim")]
pub mod sim;

// Re-export key types for convenience
pub use ducking::{DuckFailure, DuckingCoordinator};
pub use registry::{OccupancyObserver, UtteranceRegistry};
pub use session::{EngineEventSink, EngineEventStream, SessionStatus, SpeechSession, engine_channel};
#[cfg(feature = "sim")]
pub use sim::{PlaybackMode, SimConfig, SimulatedEngine};

// Used by the integration tests only
#[cfg(test)]
use mockall as _;
#[cfg(test)]
use tokio_test as _;
