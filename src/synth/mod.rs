// Voice pool, note scheduling, stealing and the message-driven front end.
// Sits on top of the dsp primitives.

pub mod config;
pub mod engine;
pub mod message;
pub mod poly;
pub mod steal;
pub mod voice;

pub use config::{ModulatorConfig, PropertyValue, SynthConfig, VoicePolicy};
pub use engine::{Engine, VoiceCallback};
pub use message::{MessageReceiver, SynthMessage};
pub use poly::PolySynth;
pub use voice::{ModulatorVoice, Voice, VoiceId, VoiceTag};
