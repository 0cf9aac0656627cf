//! Benchmarks for ADSR envelope generator.

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion};
use polyfm::dsp::envelope::Envelope;

use crate::{BLOCK_SIZES, SAMPLE_RATE};

fn render(env: &mut Envelope, buffer: &mut [f32]) {
    for sample in buffer.iter_mut() {
        *sample = env.next() as f32;
    }
}

pub fn bench_envelope(c: &mut Criterion) {
    let mut group = c.benchmark_group("dsp/envelope");

    for &size in BLOCK_SIZES {
        let mut buffer = vec![0.0f32; size];

        // Attack phase (ramping up). A long attack keeps it there.
        let mut env = Envelope::adsr(SAMPLE_RATE, 100.0, 0.1, 0.7, 0.3);
        env.trigger(0.0);
        group.bench_with_input(BenchmarkId::new("attack", size), &size, |b, _| {
            b.iter(|| render(&mut env, black_box(&mut buffer)))
        });

        // Sustain phase (holding steady)
        let mut env = Envelope::adsr(SAMPLE_RATE, 0.001, 0.001, 0.7, 0.3);
        env.trigger(0.0);
        // Advance past attack/decay
        for _ in 0..2_000 {
            env.next();
        }
        group.bench_with_input(BenchmarkId::new("sustain", size), &size, |b, _| {
            b.iter(|| render(&mut env, black_box(&mut buffer)))
        });

        // Release phase (ramping down), re-triggered once it falls silent
        let mut env = Envelope::adsr(SAMPLE_RATE, 0.0, 0.0, 0.7, 10.0);
        group.bench_with_input(BenchmarkId::new("release", size), &size, |b, _| {
            b.iter(|| {
                if !env.is_active() {
                    env.trigger(0.7);
                    env.release();
                }
                render(&mut env, black_box(&mut buffer))
            })
        });
    }

    group.finish();
}
