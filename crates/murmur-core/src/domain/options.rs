//! Speech options: per-utterance overrides and process-wide defaults.

use serde::{Deserialize, Serialize};

use crate::error::OptionsError;

/// Default speaking rate multiplier.
pub const DEFAULT_RATE: f32 = 1.0;

/// Default pitch multiplier.
pub const DEFAULT_PITCH: f32 = 1.0;

/// Default output volume.
pub const DEFAULT_VOLUME: f32 = 1.0;

const RATE_RANGE: std::ops::RangeInclusive<f32> = 0.1..=2.0;
const PITCH_RANGE: std::ops::RangeInclusive<f32> = 0.5..=2.0;
const VOLUME_RANGE: std::ops::RangeInclusive<f32> = 0.0..=1.0;

/// Voice parameters for synthesis.
///
/// The same type serves two roles:
/// - as the session's Global Options, where unset fields mean "engine default";
/// - as a per-call override passed to `speak`, where unset fields inherit the
///   global value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SpeechOptions {
    /// Engine-specific voice identifier. `None` selects the platform default.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub voice: Option<String>,

    /// Speaking rate multiplier (0.1–2.0).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rate: Option<f32>,

    /// Pitch multiplier (0.5–2.0).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pitch: Option<f32>,

    /// Output volume (0.0–1.0).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub volume: Option<f32>,
}

impl SpeechOptions {
    /// Global options with every numeric field populated.
    #[must_use]
    pub const fn with_defaults() -> Self {
        Self {
            voice: None,
            rate: Some(DEFAULT_RATE),
            pitch: Some(DEFAULT_PITCH),
            volume: Some(DEFAULT_VOLUME),
        }
    }

    /// Builder-style rate override.
    #[must_use]
    pub fn rate(mut self, rate: f32) -> Self {
        self.rate = Some(rate);
        self
    }

    /// Builder-style pitch override.
    #[must_use]
    pub fn pitch(mut self, pitch: f32) -> Self {
        self.pitch = Some(pitch);
        self
    }

    /// Builder-style volume override.
    #[must_use]
    pub fn volume(mut self, volume: f32) -> Self {
        self.volume = Some(volume);
        self
    }

    /// Builder-style voice override.
    #[must_use]
    pub fn voice(mut self, voice: impl Into<String>) -> Self {
        self.voice = Some(voice.into());
        self
    }

    /// Overlay `self` on top of `global`, field by field.
    ///
    /// Fields set on `self` win; unset fields inherit from `global`.
    #[must_use]
    pub fn merged_over(&self, global: &Self) -> Self {
        Self {
            voice: self.voice.clone().or_else(|| global.voice.clone()),
            rate: self.rate.or(global.rate),
            pitch: self.pitch.or(global.pitch),
            volume: self.volume.or(global.volume),
        }
    }

    /// Rate with the default applied.
    #[must_use]
    pub fn effective_rate(&self) -> f32 {
        self.rate.unwrap_or(DEFAULT_RATE)
    }

    /// Pitch with the default applied.
    #[must_use]
    pub fn effective_pitch(&self) -> f32 {
        self.pitch.unwrap_or(DEFAULT_PITCH)
    }

    /// Volume with the default applied.
    #[must_use]
    pub fn effective_volume(&self) -> f32 {
        self.volume.unwrap_or(DEFAULT_VOLUME)
    }

    /// Whether no field is set.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.voice.is_none() && self.rate.is_none() && self.pitch.is_none() && self.volume.is_none()
    }
}

/// Validate the fields that are set.
///
/// Unset fields are always valid; they resolve to defaults later.
pub fn validate_options(options: &SpeechOptions) -> Result<(), OptionsError> {
    if let Some(rate) = options.rate {
        if !RATE_RANGE.contains(&rate) {
            return Err(OptionsError::InvalidRate(rate));
        }
    }

    if let Some(pitch) = options.pitch {
        if !PITCH_RANGE.contains(&pitch) {
            return Err(OptionsError::InvalidPitch(pitch));
        }
    }

    if let Some(volume) = options.volume {
        if !VOLUME_RANGE.contains(&volume) {
            return Err(OptionsError::InvalidVolume(volume));
        }
    }

    if let Some(ref voice) = options.voice {
        if voice.trim().is_empty() {
            return Err(OptionsError::EmptyVoice);
        }
    }

    Ok(())
}
