//! Benchmarks for the phase accumulator and sine evaluation.

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion};
use polyfm::dsp::oscillator::{sine, PhaseOsc};

use crate::{BLOCK_SIZES, SAMPLE_RATE};

pub fn bench_oscillator(c: &mut Criterion) {
    let mut group = c.benchmark_group("dsp/oscillator");

    for &size in BLOCK_SIZES {
        let mut buffer = vec![0.0f32; size];

        // Plain sine partial
        let mut osc = PhaseOsc::new(440.0, SAMPLE_RATE);
        group.bench_with_input(BenchmarkId::new("sine", size), &size, |b, _| {
            b.iter(|| {
                for sample in buffer.iter_mut() {
                    *sample = osc.next_sine() as f32;
                }
                black_box(&mut buffer);
            })
        });

        // Phase advance with a varying ratio, as frequency modulation does
        let mut osc = PhaseOsc::new(440.0, SAMPLE_RATE);
        let mut lfo = PhaseOsc::new(5.0, SAMPLE_RATE);
        group.bench_with_input(BenchmarkId::new("sine_fm", size), &size, |b, _| {
            b.iter(|| {
                for sample in buffer.iter_mut() {
                    let ratio = 1.0 + 0.1 * lfo.next_sine();
                    *sample = sine(osc.advance(black_box(ratio))) as f32;
                }
                black_box(&mut buffer);
            })
        });
    }

    group.finish();
}
