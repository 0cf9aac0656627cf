/*
ADSR Envelope Implementation
============================

This module implements an exponential-approach ADSR envelope generator. Every
stage moves the level a fixed fraction of the remaining distance towards its
target on each sample, which gives the familiar "RC curve" shape of analog
envelopes.

Vocabulary
----------

  value         The envelope's current output (0.0 to 1.0). Multiplies the
                voice's oscillator output.

  state         Attack, Decay, Sustain or Release. Ordered in that sequence so
                that voices can be compared by how far along they are.

  active        False once the envelope has fallen silent (or was stopped).
                An inactive envelope always reads 0.0.

  coefficient   Fraction of the remaining distance covered per sample.


The Shape: Exponential Approach
-------------------------------

  Value
    1.0 ┐    .-'''-.
        │   /       '-.______________
    S   │  /                         '.
        │ /                            '.
    0.0 └/───────────────────────────────'──→ Time
        Attack  Decay     Sustain      Release

Each stage computes

    value += coefficient * (target - value)

Attack targets 1.0, Decay targets the sustain level, Release targets 0.0.
Because the curve only approaches its target asymptotically, stage changes
happen at thresholds: Attack ends at 0.999, Decay ends within 0.001 of the
sustain level, Release ends at 0.0001.


The Math: Time to Coefficient
-----------------------------

    coefficient = 8 / max(8, seconds * sample_rate)

After `seconds * sample_rate` samples the remaining distance has shrunk by
roughly e^-8, i.e. the stage is audibly complete in the configured time. The
max(8, ..) clamp keeps the coefficient at most 1.0, so zero, negative or tiny
times jump straight to the target instead of overshooting, and no division by
zero is possible.


The State Machine
-----------------

    trigger ──→ Attack ──(>= 0.999)──→ Decay ──(near sustain)──→ Sustain
                                         │                          │
                                         │ sustain == 0             │ release()
                                         ↓                          ↓
                                       stop() ←──(<= 0.0001)──── Release

A decay towards a sustain level of zero stops the envelope by itself: such a
note never needs a note-off to fall silent.
*/

/// Fraction-of-remaining-distance constant shared by every stage.
const CURVE: f64 = 8.0;

const ATTACK_TARGET: f64 = 0.999;
const DECAY_TOLERANCE: f64 = 0.001;
const RELEASE_FLOOR: f64 = 0.0001;

/// Envelope stage. Ordered by progress towards silence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum EnvelopeState {
    Attack,
    Decay,
    Sustain,
    Release,
}

#[derive(Debug, Clone)]
pub struct Envelope {
    // ADSR parameters in seconds (sustain is a level)
    attack: f64,
    decay: f64,
    sustain: f64,
    release: f64,

    // Per-sample coefficients derived from the times above
    attack_coef: f64,
    decay_coef: f64,
    release_coef: f64,

    state: EnvelopeState,
    active: bool,
    value: f64,
    sample_rate: f64,
}

fn coefficient(seconds: f64, sample_rate: f64) -> f64 {
    let samples = seconds * sample_rate;
    // NaN compares false, so max() falls back to the curve constant
    CURVE / samples.max(CURVE)
}

impl Envelope {
    pub fn new(sample_rate: f64) -> Self {
        Self::adsr(sample_rate, 0.01, 0.1, 0.7, 0.3)
    }

    pub fn adsr(sample_rate: f64, attack: f64, decay: f64, sustain: f64, release: f64) -> Self {
        Self {
            attack,
            decay,
            sustain,
            release,
            attack_coef: coefficient(attack, sample_rate),
            decay_coef: coefficient(decay, sample_rate),
            release_coef: coefficient(release, sample_rate),
            state: EnvelopeState::Attack,
            active: false,
            value: 0.0,
            sample_rate,
        }
    }

    pub fn set_attack(&mut self, seconds: f64) {
        self.attack = seconds;
        self.attack_coef = coefficient(seconds, self.sample_rate);
    }

    pub fn set_decay(&mut self, seconds: f64) {
        self.decay = seconds;
        self.decay_coef = coefficient(seconds, self.sample_rate);
    }

    pub fn set_sustain(&mut self, level: f64) {
        self.sustain = level;
    }

    pub fn set_release(&mut self, seconds: f64) {
        self.release = seconds;
        self.release_coef = coefficient(seconds, self.sample_rate);
    }

    /// Set all four parameters at once.
    pub fn set_adsr(&mut self, attack: f64, decay: f64, sustain: f64, release: f64) {
        self.set_attack(attack);
        self.set_decay(decay);
        self.set_sustain(sustain);
        self.set_release(release);
    }

    /// Change the sample rate and re-derive the coefficients.
    pub fn set_sample_rate(&mut self, sample_rate: f64) {
        self.sample_rate = sample_rate;
        self.attack_coef = coefficient(self.attack, sample_rate);
        self.decay_coef = coefficient(self.decay, sample_rate);
        self.release_coef = coefficient(self.release, sample_rate);
    }

    /// Gate high: start the attack phase from `init_value`.
    pub fn trigger(&mut self, init_value: f64) {
        self.state = EnvelopeState::Attack;
        self.active = true;
        self.value = init_value;
    }

    /// Gate low: fall from the current value towards silence.
    pub fn release(&mut self) {
        self.state = EnvelopeState::Release;
    }

    /// Hard stop. The envelope is silent immediately.
    pub fn stop(&mut self) {
        self.active = false;
        self.value = 0.0;
    }

    /// Advance the envelope by one sample and return the new value.
    pub fn next(&mut self) -> f64 {
        match self.state {
            EnvelopeState::Attack => {
                self.value += self.attack_coef * (1.0 - self.value);
                if self.value >= ATTACK_TARGET {
                    self.state = EnvelopeState::Decay;
                }
            }
            EnvelopeState::Decay => {
                self.value += self.decay_coef * (self.sustain - self.value);
                if (self.value - self.sustain).abs() < DECAY_TOLERANCE {
                    if self.sustain > 0.0 {
                        self.state = EnvelopeState::Sustain;
                    } else {
                        self.stop();
                    }
                }
            }
            EnvelopeState::Release => {
                self.value -= self.release_coef * self.value;
                if self.value <= RELEASE_FLOOR {
                    self.stop();
                }
            }
            EnvelopeState::Sustain => {}
        }

        self.value
    }

    /// True if this envelope is further along towards silence than `other`.
    pub fn later_than(&self, other: &Envelope) -> bool {
        self.state > other.state
    }

    /// True if this envelope is less far along towards silence than `other`.
    pub fn earlier_than(&self, other: &Envelope) -> bool {
        self.state < other.state
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn value(&self) -> f64 {
        self.value
    }

    pub fn state(&self) -> EnvelopeState {
        self.state
    }

    pub fn sustain(&self) -> f64 {
        self.sustain
    }

    pub fn release_time(&self) -> f64 {
        self.release
    }
}
