pub mod dsp; // Oscillators, envelopes and tuning
pub mod error;
pub mod synth; // Voice management and polyphony

pub use error::ConfigError;
pub use synth::{Engine, ModulatorConfig, PolySynth, SynthConfig, SynthMessage, VoicePolicy};

/// Largest block the demo renderer and benches hand to the engine at once.
pub const MAX_BLOCK_SIZE: usize = 2048;
