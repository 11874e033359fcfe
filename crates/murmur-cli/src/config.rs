//! CLI configuration and its layering.
//!
//! Sources are applied in order, later ones winning: built-in defaults, an
//! optional JSON file, then `MURMUR_*` environment variables. Per-command
//! flags are merged on top by the handlers as per-utterance overrides.

use std::fs;
use std::path::Path;
use std::time::Duration;

use murmur_core::{SpeechOptions, validate_options};
use murmur_session::{PlaybackMode, SimConfig};
use serde::{Deserialize, Serialize};

use crate::error::CliError;

/// Environment variable naming the configuration file.
pub const CONFIG_ENV: &str = "MURMUR_CONFIG";

/// Overrides the global voice identifier.
pub const VOICE_ENV: &str = "MURMUR_VOICE";
/// Overrides the global speaking rate.
pub const RATE_ENV: &str = "MURMUR_RATE";
/// Overrides the global pitch multiplier.
pub const PITCH_ENV: &str = "MURMUR_PITCH";
/// Overrides the global volume.
pub const VOLUME_ENV: &str = "MURMUR_VOLUME";

/// Effective CLI configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CliConfig {
    /// Global options for the session.
    pub defaults: SpeechOptions,
    /// Simulated engine settings.
    pub engine: EngineConfig,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            defaults: SpeechOptions::with_defaults(),
            engine: EngineConfig::default(),
        }
    }
}

/// Simulated engine settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EngineConfig {
    /// Speaking speed at rate 1.0.
    pub words_per_minute: u32,
    /// Playback clock granularity in milliseconds.
    pub tick_ms: u64,
    /// Utterances whose text contains this marker fail instead of playing.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fail_marker: Option<String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        let sim = SimConfig::default();
        Self {
            words_per_minute: sim.words_per_minute,
            tick_ms: u64::try_from(sim.tick.as_millis()).unwrap_or(10),
            fail_marker: None,
        }
    }
}

impl EngineConfig {
    /// Engine configuration for the given scheduling policy.
    pub fn to_sim_config(&self, playback: PlaybackMode) -> SimConfig {
        SimConfig {
            playback,
            words_per_minute: self.words_per_minute,
            tick: Duration::from_millis(self.tick_ms),
            fail_marker: self.fail_marker.clone(),
        }
    }
}

impl CliConfig {
    /// Load configuration from every source and validate it.
    pub fn load(path: Option<&Path>) -> Result<Self, CliError> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Read a JSON configuration file. Missing fields keep their defaults.
    pub fn from_file(path: &Path) -> Result<Self, CliError> {
        let text = fs::read_to_string(path)
            .map_err(|e| CliError::Config(format!("{}: {e}", path.display())))?;
        serde_json::from_str(&text)
            .map_err(|e| CliError::Config(format!("{}: {e}", path.display())))
    }

    /// Apply `MURMUR_*` overrides looked up through `lookup`.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<(), CliError> {
        if let Some(voice) = lookup(VOICE_ENV) {
            self.defaults.voice = Some(voice);
        }
        if let Some(value) = lookup(RATE_ENV) {
            self.defaults.rate = Some(parse_number(RATE_ENV, &value)?);
        }
        if let Some(value) = lookup(PITCH_ENV) {
            self.defaults.pitch = Some(parse_number(PITCH_ENV, &value)?);
        }
        if let Some(value) = lookup(VOLUME_ENV) {
            self.defaults.volume = Some(parse_number(VOLUME_ENV, &value)?);
        }
        Ok(())
    }

    /// Check the global options and engine settings.
    pub fn validate(&self) -> Result<(), CliError> {
        validate_options(&self.defaults).map_err(|e| CliError::Config(e.to_string()))?;
        if self.engine.words_per_minute == 0 {
            return Err(CliError::Config(
                "engine.wordsPerMinute must be greater than zero".to_string(),
            ));
        }
        if self.engine.tick_ms == 0 {
            return Err(CliError::Config(
                "engine.tickMs must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

fn parse_number(key: &str, value: &str) -> Result<f32, CliError> {
    value
        .trim()
        .parse()
        .map_err(|_| CliError::Config(format!("{key} must be a number, got {value:?}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn defaults_are_valid() {
        let config = CliConfig::default();
        config.validate().unwrap();
        assert_eq!(config.defaults.rate, Some(1.0));
        assert_eq!(config.engine.words_per_minute, 180);
        assert_eq!(config.engine.tick_ms, 10);
    }

    #[test]
    fn file_fields_override_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{ "defaults": {{ "voice": "en-GB", "rate": 1.5 }}, "engine": {{ "wordsPerMinute": 240 }} }}"#
        )
        .unwrap();

        let config = CliConfig::from_file(file.path()).unwrap();
        assert_eq!(config.defaults.voice.as_deref(), Some("en-GB"));
        assert_eq!(config.defaults.rate, Some(1.5));
        assert_eq!(config.engine.words_per_minute, 240);
        assert_eq!(config.engine.tick_ms, 10);
    }

    #[test]
    fn malformed_file_is_a_config_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();

        let err = CliConfig::from_file(file.path()).unwrap_err();
        assert_eq!(err.exit_code(), 78);
    }

    #[test]
    fn missing_file_is_a_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = CliConfig::load(Some(&dir.path().join("absent.json"))).unwrap_err();
        assert!(matches!(err, CliError::Config(_)));
    }

    #[test]
    fn env_overrides_file() {
        let mut config = CliConfig::default();
        config.defaults.voice = Some("from-file".into());

        config
            .apply_env(env(&[(VOICE_ENV, "from-env"), (PITCH_ENV, " 1.25 ")]))
            .unwrap();

        assert_eq!(config.defaults.voice.as_deref(), Some("from-env"));
        assert_eq!(config.defaults.pitch, Some(1.25));
        assert_eq!(config.defaults.rate, Some(1.0));
    }

    #[test]
    fn non_numeric_env_value_is_rejected() {
        let mut config = CliConfig::default();
        let err = config.apply_env(env(&[(RATE_ENV, "fast")])).unwrap_err();
        assert!(err.to_string().contains(RATE_ENV));
    }

    #[test]
    fn out_of_range_defaults_fail_validation() {
        let mut config = CliConfig::default();
        config.apply_env(env(&[(VOLUME_ENV, "3")])).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn engine_config_maps_to_sim_config() {
        let engine = EngineConfig {
            words_per_minute: 120,
            tick_ms: 5,
            fail_marker: Some("!".into()),
        };
        let sim = engine.to_sim_config(PlaybackMode::Concurrent);
        assert_eq!(sim.playback, PlaybackMode::Concurrent);
        assert_eq!(sim.tick, Duration::from_millis(5));
        assert_eq!(sim.fail_marker.as_deref(), Some("!"));
    }
}
