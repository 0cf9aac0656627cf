//! Spectrum analysis of rendered audio
//!
//! Hann-windowed FFT used to report the strongest partial of a block.

use rustfft::{num_complex::Complex, Fft, FftPlanner};
use std::sync::Arc;

pub struct SpectrumAnalyzer {
    /// Hann window coefficients
    window: Vec<f32>,
    fft: Arc<dyn Fft<f32>>,
    /// Scratch buffer for FFT computation
    scratch: Vec<Complex<f32>>,
    sample_rate: f32,
}

impl SpectrumAnalyzer {
    /// * `buffer_len` - FFT size
    /// * `sample_rate` - Audio sample rate in Hz
    pub fn new(buffer_len: usize, sample_rate: f32) -> Self {
        let mut planner = FftPlanner::new();
        let fft = planner.plan_fft_forward(buffer_len);

        // Hann window - reduces spectral leakage
        let window = (0..buffer_len)
            .map(|i| {
                if buffer_len > 1 {
                    let denom = (buffer_len - 1) as f32;
                    0.5 * (1.0 - (2.0 * std::f32::consts::PI * i as f32 / denom).cos())
                } else {
                    1.0
                }
            })
            .collect();

        Self {
            window,
            fft,
            scratch: vec![Complex::new(0.0, 0.0); buffer_len],
            sample_rate,
        }
    }

    /// Frequency (Hz) and level (dB) of the loudest bin above DC.
    ///
    /// Returns `None` if the buffer length doesn't match the FFT size or the
    /// buffer is silent.
    pub fn dominant(&mut self, buffer: &[f32]) -> Option<(f32, f32)> {
        if buffer.len() != self.window.len() || buffer.len() < 4 {
            return None;
        }

        for (i, sample) in buffer.iter().enumerate() {
            self.scratch[i].re = *sample * self.window[i];
            self.scratch[i].im = 0.0;
        }
        self.fft.process(&mut self.scratch);

        let half = self.scratch.len() / 2;
        let (index, power) = self.scratch[1..half]
            .iter()
            .map(|bin| bin.re * bin.re + bin.im * bin.im)
            .enumerate()
            .max_by(|(_, a), (_, b)| a.total_cmp(b))?;

        if power <= 1e-12 {
            return None;
        }
        let bin = index + 1;
        let frequency = bin as f32 * self.sample_rate / self.scratch.len() as f32;
        Some((frequency, 10.0 * power.log10()))
    }

    /// Width of one FFT bin in Hz.
    pub fn resolution(&self) -> f32 {
        self.sample_rate / self.scratch.len().max(1) as f32
    }
}
