//! Config command handler.

use std::io::Write;

use serde::Serialize;

use crate::audio::{FocusPolicy, SPEECH_FOCUS};
use crate::config::CliConfig;
use crate::error::CliError;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct EffectiveConfig<'a> {
    #[serde(flatten)]
    config: &'a CliConfig,
    audio_focus: FocusPolicy,
}

/// Print the effective configuration as pretty JSON.
pub fn execute(config: &CliConfig, out: &mut impl Write) -> Result<(), CliError> {
    let effective = EffectiveConfig {
        config,
        audio_focus: SPEECH_FOCUS,
    };
    serde_json::to_writer_pretty(&mut *out, &effective)?;
    writeln!(out)?;
    Ok(())
}
