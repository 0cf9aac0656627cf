use crate::dsp::{
    envelope::Envelope,
    oscillator::{sine, wrap_phase, PhaseOsc},
};
use crate::synth::config::{ModulatorConfig, SynthConfig};

/// Index of a voice in the engine's pool.
pub type VoiceId = usize;

/// Caller-supplied correlation data stored with a voice.
///
/// The engine never interprets `data`; `index` is what
/// [`Engine::note_off_by_index`](crate::synth::engine::Engine::note_off_by_index)
/// matches against, so re-triggered identical pitches can be released
/// individually.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct VoiceTag {
    pub index: Option<i64>,
    pub data: Option<u64>,
}

impl VoiceTag {
    pub fn index(index: i64) -> Self {
        Self {
            index: Some(index),
            data: None,
        }
    }

    pub fn with_data(mut self, data: u64) -> Self {
        self.data = Some(data);
        self
    }
}

/// A modulator operator attached to a voice.
#[derive(Debug, Clone)]
pub struct ModulatorVoice {
    pub phase: f64,
    pub freq_mul: f64,
    pub mod_add: f64,
    pub mod_am: f64,
    pub mod_fm: f64,
    pub mod_pm: f64,
    pub envelope: Envelope,
    /// Note velocity scaled by the modulator volume.
    pub velocity: f64,
}

impl ModulatorVoice {
    pub fn new(sample_rate: f64) -> Self {
        Self {
            phase: 0.0,
            freq_mul: 1.0,
            mod_add: 0.0,
            mod_am: 0.0,
            mod_fm: 0.0,
            mod_pm: 0.0,
            envelope: Envelope::new(sample_rate),
            velocity: 0.0,
        }
    }

    /// Overwrite every per-note field from a configuration block.
    pub fn configure(&mut self, config: &ModulatorConfig, velocity: f64, sample_rate: f64) {
        self.phase = 0.0;
        self.freq_mul = config.freq_mul;
        self.mod_add = config.mod_add;
        self.mod_am = config.mod_am;
        self.mod_fm = config.mod_fm;
        self.mod_pm = config.mod_pm;
        self.velocity = velocity * config.volume;
        self.envelope.set_sample_rate(sample_rate);
        self.envelope
            .set_adsr(config.attack, config.decay, config.sustain, config.release);
        self.envelope.stop();
    }
}

/// Runtime state of one pool slot.
#[derive(Debug, Clone)]
pub struct Voice {
    pub(crate) index: VoiceId,

    pub(crate) active: bool,
    pub(crate) cued: bool,
    pub(crate) cued_for_stop: bool,

    pub(crate) note: i32,
    pub(crate) start_sample: usize,
    pub(crate) stop_sample: usize,
    pub(crate) frequency: f64,
    pub(crate) velocity: f64,

    /// One phase accumulator per unison layer sharing this slot.
    pub(crate) layers: Vec<PhaseOsc>,
    pub(crate) envelope: Envelope,
    pub(crate) modulators: Vec<ModulatorVoice>,

    /// Samples rendered since the voice started.
    pub(crate) lifetime: u64,
    pub(crate) next_unison: Option<VoiceId>,
    pub(crate) tag: VoiceTag,
}

impl Voice {
    pub fn new(index: VoiceId, sample_rate: f64) -> Self {
        Self {
            index,
            active: false,
            cued: false,
            cued_for_stop: false,
            note: 0,
            start_sample: 0,
            stop_sample: 0,
            frequency: 0.0,
            velocity: 0.0,
            layers: Vec::new(),
            envelope: Envelope::new(sample_rate),
            modulators: Vec::new(),
            lifetime: 0,
            next_unison: None,
            tag: VoiceTag::default(),
        }
    }

    /// Reset the slot for a new note. Nothing from the previous note survives.
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn reset(
        &mut self,
        note: i32,
        frequency: f64,
        velocity: f64,
        start_sample: usize,
        tag: VoiceTag,
        sample_rate: f64,
        config: &SynthConfig,
        modulators: &[ModulatorConfig],
    ) {
        self.lifetime = 0;
        self.active = false;
        self.cued = true;
        self.cued_for_stop = false;
        self.note = note;
        self.frequency = frequency;
        self.velocity = velocity;
        self.start_sample = start_sample;
        self.stop_sample = 0;
        self.next_unison = None;
        self.tag = tag;

        self.layers.clear();
        self.layers.push(PhaseOsc::new(frequency, sample_rate));

        self.envelope.set_sample_rate(sample_rate);
        self.envelope
            .set_adsr(config.attack, config.decay, config.sustain, config.release);
        self.envelope.stop();

        self.modulators
            .resize_with(modulators.len(), || ModulatorVoice::new(sample_rate));
        for (modulator, block) in self.modulators.iter_mut().zip(modulators) {
            modulator.configure(block, velocity, sample_rate);
        }
    }

    /// Make room for `layers` unison layers and `modulators` operators.
    pub(crate) fn reserve(&mut self, layers: usize, modulators: usize) {
        self.layers.reserve(layers.saturating_sub(self.layers.len()));
        self.modulators
            .reserve(modulators.saturating_sub(self.modulators.len()));
    }

    /// Add another unison layer to this slot.
    pub(crate) fn push_layer(&mut self, frequency: f64, sample_rate: f64) {
        self.layers.push(PhaseOsc::new(frequency, sample_rate));
    }

    /// Gate the carrier and every modulator envelope.
    pub(crate) fn start(&mut self) {
        self.envelope.trigger(0.0);
        for modulator in &mut self.modulators {
            modulator.envelope.trigger(0.0);
        }
        self.active = true;
        self.cued = false;
    }

    /// Silence the voice immediately and free the slot.
    pub(crate) fn kill(&mut self) {
        self.envelope.stop();
        for modulator in &mut self.modulators {
            modulator.envelope.stop();
        }
        self.active = false;
        self.cued = false;
        self.cued_for_stop = false;
    }

    /// Compute the raw (un-enveloped) oscillator output for one sample.
    pub fn calc_sample(&mut self) -> f64 {
        if self.modulators.is_empty() {
            return self.layers.iter_mut().map(PhaseOsc::next_sine).sum();
        }

        let base_coef = self.layers.first().map_or(0.0, |layer| layer.freq_coef);

        let mut phase_mod = 0.0;
        let mut freq_mod = 0.0;
        let mut amp_mod = 0.0;
        let mut additive = 0.0;

        for modulator in &mut self.modulators {
            let level = modulator.envelope.next();
            modulator.phase = wrap_phase(modulator.phase + base_coef * modulator.freq_mul);
            let m = modulator.velocity * level * sine(modulator.phase);

            phase_mod += m * modulator.mod_pm;
            freq_mod += m * modulator.mod_fm;
            amp_mod += m * modulator.mod_am;
            additive += m * modulator.mod_add;
        }

        let mut sum = additive;
        for layer in &mut self.layers {
            let phase = layer.advance(1.0 + freq_mod);
            let mut sam = sine(phase + phase_mod);
            sam += amp_mod * (amp_mod * sam - sam);
            sum += sam;
        }
        sum
    }

    pub fn index(&self) -> VoiceId {
        self.index
    }

    /// Sounding (triggered and not yet finished).
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Waiting for its start sample.
    pub fn is_cued(&self) -> bool {
        self.cued
    }

    pub fn is_cued_for_stop(&self) -> bool {
        self.cued_for_stop
    }

    /// Neither sounding nor waiting to sound.
    pub fn is_free(&self) -> bool {
        !self.active && !self.cued
    }

    pub fn note(&self) -> i32 {
        self.note
    }

    pub fn frequency(&self) -> f64 {
        self.frequency
    }

    pub fn velocity(&self) -> f64 {
        self.velocity
    }

    pub fn start_sample(&self) -> usize {
        self.start_sample
    }

    pub fn stop_sample(&self) -> usize {
        self.stop_sample
    }

    pub fn lifetime(&self) -> u64 {
        self.lifetime
    }

    pub fn envelope(&self) -> &Envelope {
        &self.envelope
    }

    /// Velocity times the current envelope value.
    pub fn loudness(&self) -> f64 {
        self.velocity * self.envelope.value()
    }

    pub fn unison_layers(&self) -> &[PhaseOsc] {
        &self.layers
    }

    pub fn modulators(&self) -> &[ModulatorVoice] {
        &self.modulators
    }

    pub fn next_unison_voice(&self) -> Option<VoiceId> {
        self.next_unison
    }

    pub fn tag(&self) -> VoiceTag {
        self.tag
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::TAU;

    const SAMPLE_RATE: f64 = 48_000.0;

    fn voice_with(modulators: &[ModulatorConfig]) -> Voice {
        let mut voice = Voice::new(0, SAMPLE_RATE);
        voice.reset(
            57,
            440.0,
            1.0,
            0,
            VoiceTag::default(),
            SAMPLE_RATE,
            &SynthConfig::default(),
            modulators,
        );
        voice.start();
        voice
    }

    #[test]
    fn plain_voice_is_a_sine() {
        let mut voice = voice_with(&[]);
        for n in 1..=64 {
            let expected = (TAU * 440.0 * n as f64 / SAMPLE_RATE).sin();
            let actual = voice.calc_sample();
            assert!((actual - expected).abs() < 1e-9, "sample {n}: {actual} != {expected}");
        }
    }

    #[test]
    fn silent_modulator_leaves_carrier_untouched() {
        // Routing amounts of zero must not alter the carrier
        let block = ModulatorConfig {
            freq_mul: 2.0,
            ..ModulatorConfig::default()
        };
        let mut modulated = voice_with(&[block]);
        let mut plain = voice_with(&[]);
        for _ in 0..256 {
            assert!((modulated.calc_sample() - plain.calc_sample()).abs() < 1e-12);
        }
    }

    /// One modulator held at full level from the first sample.
    fn held_modulator(block: ModulatorConfig) -> ModulatorConfig {
        ModulatorConfig {
            attack: 0.0,
            sustain: 1.0,
            ..block
        }
    }

    /// Run `voice` against a hand-computed reference. `expected` receives the
    /// carrier phase increment and the modulator sample and returns the
    /// expected voice output.
    fn assert_matches_reference<F>(mut voice: Voice, freq_mul: f64, mut expected: F)
    where
        F: FnMut(f64, f64) -> f64,
    {
        let coef = voice.unison_layers()[0].freq_coef;
        let mut modulator_phase = 0.0;
        for n in 0..512 {
            modulator_phase = wrap_phase(modulator_phase + coef * freq_mul);
            let m = sine(modulator_phase);
            let reference = expected(coef, m);
            let actual = voice.calc_sample();
            assert!(
                (actual - reference).abs() < 1e-12,
                "sample {n}: {actual} != {reference}"
            );
        }
    }

    #[test]
    fn amplitude_modulation_uses_squared_blend() {
        let voice = voice_with(&[held_modulator(ModulatorConfig {
            freq_mul: 3.0,
            mod_am: 0.5,
            ..ModulatorConfig::default()
        })]);

        let mut carrier = 0.0;
        assert_matches_reference(voice, 3.0, |coef, m| {
            carrier = wrap_phase(carrier + coef);
            let am = m * 0.5;
            let sam = sine(carrier);
            // sam * (1 - am + am^2), not sam * am
            sam + am * (am * sam - sam)
        });
    }

    #[test]
    fn phase_modulation_shifts_carrier_phase_forward() {
        let voice = voice_with(&[held_modulator(ModulatorConfig {
            freq_mul: 2.0,
            mod_pm: 0.3,
            ..ModulatorConfig::default()
        })]);

        let mut carrier = 0.0;
        assert_matches_reference(voice, 2.0, |coef, m| {
            carrier = wrap_phase(carrier + coef);
            sine(carrier + m * 0.3)
        });
    }

    #[test]
    fn frequency_modulation_scales_phase_increment() {
        let voice = voice_with(&[held_modulator(ModulatorConfig {
            freq_mul: 0.5,
            mod_fm: 0.1,
            mod_add: 0.25,
            ..ModulatorConfig::default()
        })]);

        let mut carrier = 0.0;
        assert_matches_reference(voice, 0.5, |coef, m| {
            carrier = wrap_phase(carrier + coef * (1.0 + m * 0.1));
            m * 0.25 + sine(carrier)
        });
    }

    #[test]
    fn frequency_modulation_changes_the_waveform() {
        let block = ModulatorConfig {
            mod_fm: 0.5,
            attack: 0.0,
            sustain: 1.0,
            ..ModulatorConfig::default()
        };
        let mut modulated = voice_with(&[block]);
        let mut plain = voice_with(&[]);

        let diff: f64 = (0..512)
            .map(|_| (modulated.calc_sample() - plain.calc_sample()).abs())
            .sum();
        assert!(diff > 1.0, "FM should audibly change the output");
    }

    #[test]
    fn reset_overwrites_previous_note() {
        let blocks = [ModulatorConfig::default(), ModulatorConfig::default()];
        let mut voice = voice_with(&blocks);
        voice.push_layer(445.0, SAMPLE_RATE);
        voice.cued_for_stop = true;
        voice.next_unison = Some(3);
        for _ in 0..100 {
            voice.calc_sample();
        }

        voice.reset(
            60,
            523.25,
            0.5,
            7,
            VoiceTag::index(9),
            SAMPLE_RATE,
            &SynthConfig::default(),
            &blocks[..1],
        );

        assert!(voice.is_cued());
        assert!(!voice.is_active());
        assert!(!voice.is_cued_for_stop());
        assert_eq!(voice.note(), 60);
        assert_eq!(voice.start_sample(), 7);
        assert_eq!(voice.unison_layers().len(), 1);
        assert_eq!(voice.unison_layers()[0].phase, 0.0);
        assert_eq!(voice.modulators().len(), 1);
        assert_eq!(voice.modulators()[0].phase, 0.0);
        assert_eq!(voice.modulators()[0].velocity, 0.5);
        assert_eq!(voice.next_unison_voice(), None);
        assert_eq!(voice.tag().index, Some(9));
        assert_eq!(voice.envelope().value(), 0.0);
    }
}
