//! Per-sample building blocks for the synth voices.
//!
//! Nothing here allocates after construction, so every type can live inside a
//! voice slot and be driven from the audio thread. Scheduling and voice
//! management live in `synth`.

/// Exponential attack/decay/sustain/release envelope generator.
pub mod envelope;
/// Sine phase accumulators.
pub mod oscillator;
/// Note index to frequency mapping.
pub mod tuning;

pub use envelope::{Envelope, EnvelopeState};
pub use oscillator::PhaseOsc;
pub use tuning::Tuning;
