//! Engine configuration snapshots and the property-store bridge.
//!
//! The engine never reads configuration on its own: a host builds a
//! [`SynthConfig`] (plus one [`ModulatorConfig`] per modulator voice) and
//! hands the snapshot to the engine. Hosts that keep their settings in a
//! generic key/value store go through `set_property` / `property`, using the
//! key names listed on each struct.

use std::fmt;
use std::str::FromStr;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::dsp::tuning::{DEFAULT_BASE_FREQUENCY, DEFAULT_NOTES_PER_OCTAVE};
use crate::error::ConfigError;

/// Which voice gets reclaimed when a note arrives and the pool is full.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VoicePolicy {
    /// Drop the new note.
    Forget,
    /// Steal the voice with the lowest frequency.
    Lowest,
    /// Steal the voice with the highest frequency.
    Highest,
    /// Steal the voice that has been sounding longest.
    #[default]
    Oldest,
    /// Steal the most recently started voice.
    Newest,
    /// Steal the voice with the lowest velocity * envelope level.
    #[cfg_attr(feature = "serde", serde(rename = "quitest", alias = "quietest"))]
    Quietest,
    /// Steal the voice with the highest velocity * envelope level.
    Loudest,
}

impl VoicePolicy {
    pub const ALL: [VoicePolicy; 7] = [
        VoicePolicy::Forget,
        VoicePolicy::Lowest,
        VoicePolicy::Highest,
        VoicePolicy::Oldest,
        VoicePolicy::Newest,
        VoicePolicy::Quietest,
        VoicePolicy::Loudest,
    ];

    /// Property-store spelling of the policy.
    pub fn name(self) -> &'static str {
        match self {
            VoicePolicy::Forget => "forget",
            VoicePolicy::Lowest => "lowest",
            VoicePolicy::Highest => "highest",
            VoicePolicy::Oldest => "oldest",
            VoicePolicy::Newest => "newest",
            VoicePolicy::Quietest => "quitest",
            VoicePolicy::Loudest => "loudest",
        }
    }
}

impl fmt::Display for VoicePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for VoicePolicy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_ascii_lowercase();
        if lower == "quietest" {
            return Ok(VoicePolicy::Quietest);
        }
        VoicePolicy::ALL
            .into_iter()
            .find(|policy| policy.name() == lower)
            .ok_or_else(|| ConfigError::UnknownPolicy(s.to_string()))
    }
}

/// A value as stored in an external key/value property container.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(untagged))]
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyValue {
    Bool(bool),
    Uint(u64),
    Int(i64),
    Double(f64),
    Text(String),
}

impl PropertyValue {
    fn as_uint(&self, key: &str) -> Result<usize, ConfigError> {
        match *self {
            PropertyValue::Uint(v) => usize::try_from(v).ok(),
            PropertyValue::Int(v) => usize::try_from(v).ok(),
            _ => None,
        }
        .ok_or_else(|| mismatch(key, "non-negative integer"))
    }

    fn as_int(&self, key: &str) -> Result<i32, ConfigError> {
        match *self {
            PropertyValue::Int(v) => i32::try_from(v).ok(),
            PropertyValue::Uint(v) => i32::try_from(v).ok(),
            _ => None,
        }
        .ok_or_else(|| mismatch(key, "integer"))
    }

    fn as_double(&self, key: &str) -> Result<f64, ConfigError> {
        match *self {
            PropertyValue::Double(v) => Ok(v),
            PropertyValue::Int(v) => Ok(v as f64),
            PropertyValue::Uint(v) => Ok(v as f64),
            _ => Err(mismatch(key, "number")),
        }
    }

    fn as_bool(&self, key: &str) -> Result<bool, ConfigError> {
        match *self {
            PropertyValue::Bool(v) => Ok(v),
            _ => Err(mismatch(key, "boolean")),
        }
    }
}

fn mismatch(key: &str, expected: &'static str) -> ConfigError {
    ConfigError::TypeMismatch {
        key: key.to_string(),
        expected,
    }
}

/// Primary engine configuration.
///
/// | key                     | field                   |
/// |-------------------------|-------------------------|
/// | `number-voices`         | `number_voices`         |
/// | `voice-policy`          | `voice_policy`          |
/// | `volume`                | `volume`                |
/// | `number-unisono-voices` | `unison_voices`         |
/// | `real-unisono`          | `combined_unison`       |
/// | `unisono-note-step`     | `unison_note_step`      |
/// | `unisono-detune`        | `unison_detune`         |
/// | `number-mod-voices`     | `number_mod_voices`     |
/// | `base-freq`             | `base_frequency`        |
/// | `notes-per-octave`      | `notes_per_octave`      |
/// | `attack` .. `release`   | primary envelope        |
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
#[derive(Debug, Clone, PartialEq)]
pub struct SynthConfig {
    pub number_voices: usize,
    pub voice_policy: VoicePolicy,
    pub volume: f64,
    /// Unison layers per note. 0 and 1 both mean no unison.
    pub unison_voices: usize,
    /// true: layers share one voice slot. false: each layer takes its own slot.
    pub combined_unison: bool,
    /// Note offset between consecutive unison layers.
    pub unison_note_step: i32,
    /// Random detune range in cents.
    pub unison_detune: f64,
    pub number_mod_voices: usize,
    pub base_frequency: f64,
    pub notes_per_octave: f64,
    pub attack: f64,
    pub decay: f64,
    pub sustain: f64,
    pub release: f64,
}

impl Default for SynthConfig {
    fn default() -> Self {
        Self {
            number_voices: 16,
            voice_policy: VoicePolicy::Oldest,
            volume: 0.5,
            unison_voices: 1,
            combined_unison: true,
            unison_note_step: 0,
            unison_detune: 10.0,
            number_mod_voices: 0,
            base_frequency: DEFAULT_BASE_FREQUENCY,
            notes_per_octave: DEFAULT_NOTES_PER_OCTAVE,
            attack: 0.01,
            decay: 0.2,
            sustain: 0.6,
            release: 0.3,
        }
    }
}

impl SynthConfig {
    pub const KEYS: [&'static str; 14] = [
        "number-voices",
        "voice-policy",
        "volume",
        "number-unisono-voices",
        "real-unisono",
        "unisono-note-step",
        "unisono-detune",
        "number-mod-voices",
        "base-freq",
        "notes-per-octave",
        "attack",
        "decay",
        "sustain",
        "release",
    ];

    /// Write one property-store entry into the snapshot.
    pub fn set_property(&mut self, key: &str, value: &PropertyValue) -> Result<(), ConfigError> {
        match key {
            "number-voices" => self.number_voices = value.as_uint(key)?,
            "voice-policy" => {
                self.voice_policy = match value {
                    PropertyValue::Text(name) => name.parse()?,
                    _ => return Err(mismatch(key, "text")),
                }
            }
            "volume" => self.volume = value.as_double(key)?,
            "number-unisono-voices" => self.unison_voices = value.as_uint(key)?,
            "real-unisono" => self.combined_unison = value.as_bool(key)?,
            "unisono-note-step" => self.unison_note_step = value.as_int(key)?,
            "unisono-detune" => self.unison_detune = value.as_double(key)?,
            "number-mod-voices" => self.number_mod_voices = value.as_uint(key)?,
            "base-freq" => self.base_frequency = value.as_double(key)?,
            "notes-per-octave" => self.notes_per_octave = value.as_double(key)?,
            "attack" => self.attack = value.as_double(key)?,
            "decay" => self.decay = value.as_double(key)?,
            "sustain" => self.sustain = value.as_double(key)?,
            "release" => self.release = value.as_double(key)?,
            _ => return Err(ConfigError::UnknownKey(key.to_string())),
        }
        Ok(())
    }

    /// Read one property-store entry from the snapshot.
    pub fn property(&self, key: &str) -> Option<PropertyValue> {
        let value = match key {
            "number-voices" => PropertyValue::Uint(self.number_voices as u64),
            "voice-policy" => PropertyValue::Text(self.voice_policy.name().to_string()),
            "volume" => PropertyValue::Double(self.volume),
            "number-unisono-voices" => PropertyValue::Uint(self.unison_voices as u64),
            "real-unisono" => PropertyValue::Bool(self.combined_unison),
            "unisono-note-step" => PropertyValue::Int(self.unison_note_step as i64),
            "unisono-detune" => PropertyValue::Double(self.unison_detune),
            "number-mod-voices" => PropertyValue::Uint(self.number_mod_voices as u64),
            "base-freq" => PropertyValue::Double(self.base_frequency),
            "notes-per-octave" => PropertyValue::Double(self.notes_per_octave),
            "attack" => PropertyValue::Double(self.attack),
            "decay" => PropertyValue::Double(self.decay),
            "sustain" => PropertyValue::Double(self.sustain),
            "release" => PropertyValue::Double(self.release),
            _ => return None,
        };
        Some(value)
    }
}

/// Envelope and routing for one modulator voice.
///
/// Keys: `volume`, `freq-mul`, `mod-add`, `mod-am`, `mod-fm`, `mod-pm`,
/// `attack`, `decay`, `sustain`, `release`.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
#[derive(Debug, Clone, PartialEq)]
pub struct ModulatorConfig {
    /// Scales the note velocity into the modulator's output level.
    pub volume: f64,
    /// Modulator frequency relative to the carrier's first layer.
    pub freq_mul: f64,
    /// Amount mixed straight into the voice output.
    pub mod_add: f64,
    pub mod_am: f64,
    pub mod_fm: f64,
    pub mod_pm: f64,
    pub attack: f64,
    pub decay: f64,
    pub sustain: f64,
    pub release: f64,
}

impl Default for ModulatorConfig {
    fn default() -> Self {
        Self {
            volume: 1.0,
            freq_mul: 1.0,
            mod_add: 0.0,
            mod_am: 0.0,
            mod_fm: 0.0,
            mod_pm: 0.0,
            attack: 0.01,
            decay: 0.2,
            sustain: 0.6,
            release: 0.3,
        }
    }
}

impl ModulatorConfig {
    pub const KEYS: [&'static str; 10] = [
        "volume", "freq-mul", "mod-add", "mod-am", "mod-fm", "mod-pm", "attack", "decay",
        "sustain", "release",
    ];

    pub fn set_property(&mut self, key: &str, value: &PropertyValue) -> Result<(), ConfigError> {
        let field = match key {
            "volume" => &mut self.volume,
            "freq-mul" => &mut self.freq_mul,
            "mod-add" => &mut self.mod_add,
            "mod-am" => &mut self.mod_am,
            "mod-fm" => &mut self.mod_fm,
            "mod-pm" => &mut self.mod_pm,
            "attack" => &mut self.attack,
            "decay" => &mut self.decay,
            "sustain" => &mut self.sustain,
            "release" => &mut self.release,
            _ => return Err(ConfigError::UnknownKey(key.to_string())),
        };
        *field = value.as_double(key)?;
        Ok(())
    }

    pub fn property(&self, key: &str) -> Option<PropertyValue> {
        let value = match key {
            "volume" => self.volume,
            "freq-mul" => self.freq_mul,
            "mod-add" => self.mod_add,
            "mod-am" => self.mod_am,
            "mod-fm" => self.mod_fm,
            "mod-pm" => self.mod_pm,
            "attack" => self.attack,
            "decay" => self.decay,
            "sustain" => self.sustain,
            "release" => self.release,
            _ => return None,
        };
        Some(PropertyValue::Double(value))
    }
}
