//! Piano configuration.
//!
//! Every field has a default, so an empty JSON object (`{}`) is a valid
//! configuration. Field names are camelCase in JSON.

use serde::{Deserialize, Serialize};

use crate::dsp::oscillator::Waveform;
use crate::error::ConfigError;
use crate::keymap::{KeyBinding, KeyMap};

/// Longest accepted `autoStopAfter`, in seconds.
pub const MAX_AUTO_STOP_AFTER: f64 = 3600.0;
/// Longest accepted `maxDelayTime`, in seconds.
pub const MAX_DELAY_TIME_LIMIT: f64 = 10.0;

/// Four-point gain envelope: silence, then linear ramps to each level.
/// Times are seconds after the trigger.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EnvelopeConfig {
    pub attack_level: f64,
    pub attack_time: f64,
    pub decay_level: f64,
    pub decay_time: f64,
    pub sustain_level: f64,
    pub sustain_time: f64,
}

impl Default for EnvelopeConfig {
    fn default() -> Self {
        Self {
            attack_level: 0.7,
            attack_time: 0.01,
            decay_level: 0.5,
            decay_time: 0.1,
            sustain_level: 0.4,
            sustain_time: 0.2,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PianoConfig {
    pub envelope: EnvelopeConfig,
    /// Seconds after which a tone is force-stopped.
    pub auto_stop_after: f64,
    /// Longest delay time the delay line can hold, in seconds.
    pub max_delay_time: f64,
    pub waveform: Waveform,
    /// Initial reverb send level.
    pub reverb: f64,
    /// Initial delay time in seconds.
    pub delay: f64,
    /// Initial master volume.
    pub volume: f64,
    /// Relative path of the impulse response for the reverb.
    pub impulse_response: String,
    /// Overrides the built-in key table when present.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key_bindings: Option<Vec<KeyBinding>>,
}

impl Default for PianoConfig {
    fn default() -> Self {
        Self {
            envelope: EnvelopeConfig::default(),
            auto_stop_after: 1.0,
            max_delay_time: 1.0,
            waveform: Waveform::Sine,
            reverb: 0.0,
            delay: 0.0,
            volume: 0.5,
            impulse_response: "impulse-response.wav".to_string(),
            key_bindings: None,
        }
    }
}

impl PianoConfig {
    /// Parse and validate a JSON configuration.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: PianoConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let env = &self.envelope;
        for (field, value) in [
            ("envelope.attackLevel", env.attack_level),
            ("envelope.decayLevel", env.decay_level),
            ("envelope.sustainLevel", env.sustain_level),
            ("reverb", self.reverb),
            ("volume", self.volume),
        ] {
            check(field, value, value >= 0.0)?;
        }

        check("envelope.attackTime", env.attack_time, env.attack_time >= 0.0)?;
        check(
            "envelope.decayTime",
            env.decay_time,
            env.decay_time >= env.attack_time,
        )?;
        check(
            "envelope.sustainTime",
            env.sustain_time,
            env.sustain_time >= env.decay_time,
        )?;
        check(
            "autoStopAfter",
            self.auto_stop_after,
            self.auto_stop_after > 0.0 && self.auto_stop_after <= MAX_AUTO_STOP_AFTER,
        )?;
        check(
            "maxDelayTime",
            self.max_delay_time,
            self.max_delay_time > 0.0 && self.max_delay_time <= MAX_DELAY_TIME_LIMIT,
        )?;
        check(
            "delay",
            self.delay,
            (0.0..=self.max_delay_time).contains(&self.delay),
        )?;

        self.key_map()?;
        Ok(())
    }

    /// The effective key map: the configured bindings or the default table.
    pub fn key_map(&self) -> Result<KeyMap, ConfigError> {
        match &self.key_bindings {
            Some(bindings) => KeyMap::from_config(bindings),
            None => Ok(KeyMap::default()),
        }
    }
}

fn check(field: &'static str, value: f64, ok: bool) -> Result<(), ConfigError> {
    if value.is_finite() && ok {
        Ok(())
    } else {
        Err(ConfigError::OutOfRange { field, value })
    }
}
