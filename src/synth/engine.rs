//! The polyphonic engine: voice pool, scheduling, stealing, unison and mixing.
//!
//! All work happens on the caller's thread. A typical audio callback looks
//! like this:
//!
//! ```ignore
//! engine.note_on(57, 0.8, 32);   // A4 starting 32 samples into the block
//! engine.note_off(48, 100);      // release C4 at sample 100
//! engine.process(&mut block);    // render, then hand the block to the device
//! ```
//!
//! Start and stop offsets are measured from the start of the next block
//! passed to `process`. Offsets past the end of that block stay pending and
//! are carried over to the following blocks.

use log::{debug, trace, warn};
use rand::{rngs::SmallRng, Rng, SeedableRng};

use crate::dsp::tuning::Tuning;
use crate::synth::config::{ModulatorConfig, SynthConfig};
use crate::synth::message::SynthMessage;
use crate::synth::steal::select_victim;
use crate::synth::voice::{Voice, VoiceId, VoiceTag};

/// Rate used when a constructor is handed an unusable sample rate.
pub const DEFAULT_SAMPLE_RATE: f64 = 48_000.0;

/// Start/end notification. Receives the voice that changed state.
pub type VoiceCallback = Box<dyn FnMut(&Voice) + Send>;

/// Outcome of advancing one voice by one sample.
enum Tick {
    /// Not sounding at this sample.
    Idle,
    /// Sounding; carries the mixed-ready sample.
    Sample(f64),
    /// Finished at this sample; carries its last sample (zero on a hard stop).
    Ended(f64),
}

pub struct Engine {
    voices: Vec<Voice>,
    config: SynthConfig,
    modulators: Vec<ModulatorConfig>,
    tuning: Tuning,
    sample_rate: f64,
    rng: SmallRng,
    on_voice_started: Option<VoiceCallback>,
    on_voice_ended: Option<VoiceCallback>,
}

impl Engine {
    /// Engine with the default configuration.
    pub fn new(sample_rate: f64) -> Self {
        Self::with_rng(sample_rate, SmallRng::from_os_rng())
    }

    /// Engine whose unison detune sequence is reproducible.
    pub fn with_seed(sample_rate: f64, seed: u64) -> Self {
        Self::with_rng(sample_rate, SmallRng::seed_from_u64(seed))
    }

    fn with_rng(sample_rate: f64, rng: SmallRng) -> Self {
        let sample_rate = if sample_rate.is_finite() && sample_rate > 0.0 {
            sample_rate
        } else {
            warn!("invalid sample rate {sample_rate}, using {DEFAULT_SAMPLE_RATE}");
            DEFAULT_SAMPLE_RATE
        };
        let config = SynthConfig::default();
        let mut engine = Self {
            voices: (0..config.number_voices)
                .map(|index| Voice::new(index, sample_rate))
                .collect(),
            modulators: vec![ModulatorConfig::default(); config.number_mod_voices],
            tuning: Tuning::equal(config.base_frequency, config.notes_per_octave),
            config,
            sample_rate,
            rng,
            on_voice_started: None,
            on_voice_ended: None,
        };
        engine.reserve_voice_storage();
        engine
    }

    // === Configuration ===

    /// Apply a configuration snapshot.
    ///
    /// Changing `number_voices` rebuilds the pool: every sounding voice is
    /// ended (firing the end callback) and all pending cues are dropped. The
    /// tuning is rebuilt as equal temperament when the base frequency or the
    /// notes-per-octave value changes.
    pub fn set_config(&mut self, config: SynthConfig) {
        if config.number_voices != self.voices.len() {
            self.resize_pool(config.number_voices);
        }

        if config.number_mod_voices != self.modulators.len() {
            debug!(
                "modulator bank resized from {} to {}",
                self.modulators.len(),
                config.number_mod_voices
            );
            self.modulators
                .resize_with(config.number_mod_voices, ModulatorConfig::default);
        }

        if config.base_frequency != self.config.base_frequency
            || config.notes_per_octave != self.config.notes_per_octave
        {
            self.tuning = Tuning::equal(config.base_frequency, config.notes_per_octave);
        }

        self.config = config;
        self.reserve_voice_storage();
    }

    /// Size every voice for the configured unison and modulator counts, so
    /// starting a note never allocates.
    fn reserve_voice_storage(&mut self) {
        let layers = self.config.unison_voices.max(1);
        let modulators = self.config.number_mod_voices;
        for voice in &mut self.voices {
            voice.reserve(layers, modulators);
        }
    }

    /// Replace the configuration block of modulator `index`.
    ///
    /// `index` must be below `number_mod_voices`.
    pub fn set_modulator_config(&mut self, index: usize, config: ModulatorConfig) {
        debug_assert!(
            index < self.modulators.len(),
            "modulator index {index} out of range ({} configured)",
            self.modulators.len()
        );
        self.modulators[index] = config;
    }

    /// Install a custom tuning, e.g. a rational scale.
    pub fn set_tuning(&mut self, tuning: Tuning) {
        self.tuning = tuning;
    }

    pub fn set_sample_rate(&mut self, sample_rate: f64) {
        if !(sample_rate.is_finite() && sample_rate > 0.0) {
            warn!("ignoring invalid sample rate {sample_rate}");
            return;
        }
        debug!("sample rate changed from {} to {sample_rate}", self.sample_rate);
        self.sample_rate = sample_rate;
        for voice in &mut self.voices {
            voice.envelope.set_sample_rate(sample_rate);
            for modulator in &mut voice.modulators {
                modulator.envelope.set_sample_rate(sample_rate);
            }
        }
    }

    /// Called whenever a voice starts sounding. Replaces any earlier callback.
    pub fn set_voice_started_callback<F>(&mut self, callback: F)
    where
        F: FnMut(&Voice) + Send + 'static,
    {
        self.on_voice_started = Some(Box::new(callback));
    }

    /// Called whenever a sounding voice ends, whether by release, steal,
    /// panic, pool resize or engine drop. Replaces any earlier callback.
    pub fn set_voice_ended_callback<F>(&mut self, callback: F)
    where
        F: FnMut(&Voice) + Send + 'static,
    {
        self.on_voice_ended = Some(Box::new(callback));
    }

    fn resize_pool(&mut self, number_voices: usize) {
        debug!("voice pool resized from {} to {number_voices}", self.voices.len());
        for index in 0..self.voices.len() {
            self.silence_voice(index);
        }
        let sample_rate = self.sample_rate;
        self.voices = (0..number_voices)
            .map(|index| Voice::new(index, sample_rate))
            .collect();
    }

    // === Note events ===

    /// Start `note` at `start_sample` into the next processed block.
    pub fn note_on(&mut self, note: i32, velocity: f64, start_sample: usize) -> Option<VoiceId> {
        self.note_on_tagged(note, velocity, start_sample, VoiceTag::default())
    }

    /// Like [`note_on`](Self::note_on), storing `tag` with every voice the
    /// note occupies.
    ///
    /// Returns the lead voice, or `None` when the pool is full and the policy
    /// is `Forget`. With independent unison the remaining layers hang off the
    /// lead voice's `next_unison_voice` chain; layers that find no room are
    /// dropped silently.
    pub fn note_on_tagged(
        &mut self,
        note: i32,
        velocity: f64,
        start_sample: usize,
        tag: VoiceTag,
    ) -> Option<VoiceId> {
        let unison = self.config.unison_voices.max(1);
        if unison >= 2 && !self.config.combined_unison {
            return self.note_on_independent(note, velocity, start_sample, tag, unison);
        }

        let frequency = self.tuning.frequency(note);
        let id = self.allocate(note, frequency, velocity, start_sample, tag, None)?;
        for k in 1..unison {
            let layer_frequency = self.detuned_frequency(self.layer_note(note, k));
            self.voices[id].push_layer(layer_frequency, self.sample_rate);
        }
        Some(id)
    }

    fn note_on_independent(
        &mut self,
        note: i32,
        velocity: f64,
        start_sample: usize,
        tag: VoiceTag,
        unison: usize,
    ) -> Option<VoiceId> {
        let count = unison.min(self.voices.len());
        if count == 0 {
            return None;
        }
        let velocity = velocity / count as f64;

        let frequency = self.tuning.frequency(note);
        let lead = self.allocate(note, frequency, velocity, start_sample, tag, None)?;

        let mut tail = lead;
        for k in 1..count {
            let layer_note = self.layer_note(note, k);
            let layer_frequency = self.detuned_frequency(layer_note);
            match self.allocate(layer_note, layer_frequency, velocity, start_sample, tag, Some(lead)) {
                Some(id) => {
                    self.voices[tail].next_unison = Some(id);
                    tail = id;
                }
                None => {
                    debug!("unison for note {note} limited to {k} of {count} voices");
                    break;
                }
            }
        }
        Some(lead)
    }

    fn layer_note(&self, note: i32, layer: usize) -> i32 {
        note + layer as i32 * self.config.unison_note_step
    }

    /// Frequency of `note` with a random unison detune applied.
    fn detuned_frequency(&mut self, note: i32) -> f64 {
        let frequency = self.tuning.frequency(note);
        let semitone = self.tuning.frequency(note + 1) - frequency;
        let spread = self.config.unison_detune / 200.0 * semitone;
        frequency + spread * self.rng.random_range(-1.0..=1.0f64)
    }

    /// Find a slot for a note (stealing if needed) and reset it.
    ///
    /// `chain` names the lead of an independent unison group being built; its
    /// members are never stolen to make room for the group itself.
    fn allocate(
        &mut self,
        note: i32,
        frequency: f64,
        velocity: f64,
        start_sample: usize,
        tag: VoiceTag,
        chain: Option<VoiceId>,
    ) -> Option<VoiceId> {
        let id = match self.voices.iter().position(Voice::is_free) {
            Some(id) => id,
            None => {
                let policy = self.config.voice_policy;
                let voices = &self.voices;
                let victim = select_victim(policy, voices, |voice| {
                    chain.map_or(true, |lead| !in_chain(voices, lead, voice.index()))
                });
                let Some(victim) = victim else {
                    trace!("voice pool full, dropping note {note} ({policy})");
                    return None;
                };
                trace!("stealing voice {victim} for note {note} ({policy})");
                self.silence_voice(victim);
                victim
            }
        };

        self.detach(id);
        self.voices[id].reset(
            note,
            frequency,
            velocity,
            start_sample,
            tag,
            self.sample_rate,
            &self.config,
            &self.modulators,
        );
        Some(id)
    }

    /// Drop every unison link that points at `id`.
    fn detach(&mut self, id: VoiceId) {
        for voice in &mut self.voices {
            if voice.next_unison == Some(id) {
                voice.next_unison = None;
            }
        }
    }

    /// Free a slot immediately, notifying if it was sounding.
    fn silence_voice(&mut self, id: VoiceId) {
        let voice = &mut self.voices[id];
        let was_active = voice.active;
        voice.kill();
        if was_active {
            if let Some(callback) = self.on_voice_ended.as_mut() {
                callback(&*voice);
            }
        }
    }

    /// Release `note` at `stop_sample`.
    pub fn note_off(&mut self, note: i32, stop_sample: usize) {
        for id in 0..self.voices.len() {
            let voice = &self.voices[id];
            if voice.note == note && stoppable(voice, stop_sample) {
                self.cue_stop(id, stop_sample);
            }
        }
    }

    /// Release every voice whose tag index equals `index` at `stop_sample`.
    pub fn note_off_by_index(&mut self, index: i64, stop_sample: usize) {
        for id in 0..self.voices.len() {
            let voice = &self.voices[id];
            if voice.tag.index == Some(index) && stoppable(voice, stop_sample) {
                self.cue_stop(id, stop_sample);
            }
        }
    }

    /// Release every sounding or pending voice at `stop_sample`.
    pub fn notes_off(&mut self, stop_sample: usize) {
        for voice in &mut self.voices {
            if voice.active || voice.cued {
                voice.cued_for_stop = true;
                voice.stop_sample = stop_sample;
            }
        }
    }

    /// Silence everything now, skipping the release stage.
    pub fn panic(&mut self) {
        for id in 0..self.voices.len() {
            self.silence_voice(id);
        }
    }

    /// Cue a stop on `id` and on the rest of its unison chain.
    fn cue_stop(&mut self, id: VoiceId, stop_sample: usize) {
        let mut cursor = Some(id);
        for _ in 0..self.voices.len() {
            let Some(current) = cursor else { break };
            let voice = &mut self.voices[current];
            if stoppable(voice, stop_sample) {
                voice.cued_for_stop = true;
                voice.stop_sample = stop_sample;
            }
            cursor = voice.next_unison;
        }
    }

    pub fn handle_message(&mut self, message: SynthMessage) {
        match message {
            SynthMessage::NoteOn {
                note,
                velocity,
                start_sample,
                tag,
            } => {
                self.note_on_tagged(note, velocity, start_sample, tag);
            }
            SynthMessage::NoteOff { note, stop_sample } => self.note_off(note, stop_sample),
            SynthMessage::NoteOffByIndex { index, stop_sample } => {
                self.note_off_by_index(index, stop_sample)
            }
            SynthMessage::AllNotesOff { stop_sample } => self.notes_off(stop_sample),
            SynthMessage::Panic => self.panic(),
        }
    }

    // === Rendering ===

    /// Render every voice mixed into one mono buffer.
    pub fn process(&mut self, out: &mut [f32]) {
        out.fill(0.0);
        for (s, frame) in out.iter_mut().enumerate() {
            let mut mix = 0.0;
            for id in 0..self.voices.len() {
                match self.tick_voice(id, s) {
                    Tick::Sample(sample) | Tick::Ended(sample) => mix += sample,
                    Tick::Idle => {}
                }
            }
            *frame += mix as f32;
        }
        self.carry_over(out.len());
    }

    /// Render each voice into its own buffer (`outputs[i]` for voice `i`).
    ///
    /// All buffers should have the same length. Voices without a buffer are
    /// still advanced so their timing stays consistent; buffers without a
    /// voice are zeroed.
    pub fn process_voices<B: AsMut<[f32]>>(&mut self, outputs: &mut [B]) {
        let frames = outputs
            .iter_mut()
            .map(|buffer| buffer.as_mut().len())
            .min()
            .unwrap_or(0);

        for id in 0..self.voices.len() {
            match outputs.get_mut(id) {
                Some(buffer) => {
                    let buffer = buffer.as_mut();
                    debug_assert_eq!(buffer.len(), frames, "per-voice buffers differ in length");
                    buffer[frames..].fill(0.0);
                    self.render_voice(id, &mut buffer[..frames]);
                }
                None => self.render_voice_silently(id, frames),
            }
        }
        // Buffers beyond the pool, e.g. left over from a larger pool
        for buffer in outputs.iter_mut().skip(self.voices.len()) {
            buffer.as_mut().fill(0.0);
        }
        self.carry_over(frames);
    }

    fn render_voice(&mut self, id: VoiceId, out: &mut [f32]) {
        if self.voices[id].is_free() {
            out.fill(0.0);
            return;
        }

        for s in 0..out.len() {
            match self.tick_voice(id, s) {
                Tick::Idle => out[s] = 0.0,
                Tick::Sample(sample) => out[s] = sample as f32,
                Tick::Ended(sample) => {
                    out[s] = sample as f32;
                    out[s + 1..].fill(0.0);
                    return;
                }
            }
        }
    }

    fn render_voice_silently(&mut self, id: VoiceId, frames: usize) {
        if self.voices[id].is_free() {
            return;
        }
        for s in 0..frames {
            if let Tick::Ended(_) = self.tick_voice(id, s) {
                return;
            }
        }
    }

    /// Advance voice `id` through sample `s` of the current block.
    fn tick_voice(&mut self, id: VoiceId, s: usize) -> Tick {
        let volume = self.config.volume;
        let release = self.config.release;
        let voice = &mut self.voices[id];

        if voice.cued && voice.start_sample == s {
            voice.start();
            if let Some(callback) = self.on_voice_started.as_mut() {
                callback(&*voice);
            }
        }

        if voice.cued_for_stop && voice.stop_sample == s {
            voice.cued_for_stop = false;
            if voice.active {
                if release > 0.0 {
                    voice.envelope.release();
                } else {
                    voice.kill();
                    if let Some(callback) = self.on_voice_ended.as_mut() {
                        callback(&*voice);
                    }
                    return Tick::Ended(0.0);
                }
            } else if voice.cued {
                // Stopped before it ever started: the note never sounds
                voice.kill();
                return Tick::Ended(0.0);
            }
        }

        if !voice.active {
            return Tick::Idle;
        }

        voice.lifetime += 1;
        let sample = voice.calc_sample() * volume * voice.velocity * voice.envelope.value();
        voice.envelope.next();

        if voice.envelope.is_active() {
            return Tick::Sample(sample);
        }

        voice.kill();
        if let Some(callback) = self.on_voice_ended.as_mut() {
            callback(&*voice);
        }
        Tick::Ended(sample)
    }

    /// Rebase cues that lie beyond the block just rendered.
    fn carry_over(&mut self, frames: usize) {
        for voice in &mut self.voices {
            if voice.cued {
                voice.start_sample = voice.start_sample.saturating_sub(frames);
            }
            if voice.cued_for_stop {
                voice.stop_sample = voice.stop_sample.saturating_sub(frames);
            }
        }
    }

    // === Accessors ===

    pub fn voice(&self, id: VoiceId) -> Option<&Voice> {
        self.voices.get(id)
    }

    pub fn voices(&self) -> &[Voice] {
        &self.voices
    }

    /// Voices currently sounding.
    pub fn active_voice_count(&self) -> usize {
        self.voices.iter().filter(|v| v.active).count()
    }

    /// Voices sounding or waiting for their start sample.
    pub fn busy_voice_count(&self) -> usize {
        self.voices.iter().filter(|v| !v.is_free()).count()
    }

    /// Voice ids of the independent unison chain starting at `lead`, lead first.
    pub fn unison_chain(&self, lead: VoiceId) -> Vec<VoiceId> {
        let mut chain = Vec::new();
        let mut cursor = Some(lead);
        while let Some(id) = cursor {
            if chain.len() >= self.voices.len() {
                break;
            }
            chain.push(id);
            cursor = self.voices.get(id).and_then(|v| v.next_unison);
        }
        chain
    }

    pub fn config(&self) -> &SynthConfig {
        &self.config
    }

    pub fn modulator_config(&self, index: usize) -> Option<&ModulatorConfig> {
        self.modulators.get(index)
    }

    pub fn tuning(&self) -> &Tuning {
        &self.tuning
    }

    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }
}

impl Drop for Engine {
    fn drop(&mut self) {
        if let Some(callback) = self.on_voice_ended.as_mut() {
            for voice in self.voices.iter().filter(|v| v.active) {
                callback(voice);
            }
        }
    }
}

/// A voice can take a stop cue if it sounds, or is pending no later than the stop.
fn stoppable(voice: &Voice, stop_sample: usize) -> bool {
    voice.active || (voice.cued && voice.start_sample <= stop_sample)
}

/// Whether `id` belongs to the unison chain starting at `lead`.
fn in_chain(voices: &[Voice], lead: VoiceId, id: VoiceId) -> bool {
    let mut cursor = Some(lead);
    for _ in 0..voices.len() {
        match cursor {
            Some(current) if current == id => return true,
            Some(current) => cursor = voices[current].next_unison,
            None => return false,
        }
    }
    false
}
