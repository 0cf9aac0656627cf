use std::f64::consts::TAU;

/// Sine of a phase measured in cycles.
#[inline]
pub fn sine(phase: f64) -> f64 {
    (TAU * phase).sin()
}

/// Wrap a phase into `[0, 1)`. Works for phases running backwards too.
#[inline]
pub fn wrap_phase(phase: f64) -> f64 {
    phase - phase.floor()
}

/// Phase accumulator for one sine partial.
///
/// `freq_coef` is the frequency divided by the sample rate, i.e. the phase
/// increment per sample in cycles.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PhaseOsc {
    pub phase: f64,
    pub freq_coef: f64,
}

impl PhaseOsc {
    pub fn new(frequency: f64, sample_rate: f64) -> Self {
        Self {
            phase: 0.0,
            freq_coef: frequency / sample_rate,
        }
    }

    /// Advance by `freq_coef * ratio` and return the new phase.
    #[inline]
    pub fn advance(&mut self, ratio: f64) -> f64 {
        self.phase = wrap_phase(self.phase + self.freq_coef * ratio);
        self.phase
    }

    /// Advance at the nominal rate and return the sine output.
    #[inline]
    pub fn next_sine(&mut self) -> f64 {
        sine(self.advance(1.0))
    }
}
