//! Benchmarks for a single sounding note through the engine.
//!
//! These test realistic patches, from a bare sine to stacked modulators
//! with unison.

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion};
use polyfm::{Engine, ModulatorConfig, SynthConfig};

use crate::{BLOCK_SIZES, SAMPLE_RATE};

/// One held note (sustain > 0 so it never finishes).
fn held_note(config: SynthConfig, modulators: &[ModulatorConfig]) -> Engine {
    let mut engine = Engine::with_seed(SAMPLE_RATE, 1);
    engine.set_config(SynthConfig {
        number_voices: 1,
        number_mod_voices: modulators.len(),
        sustain: 0.7,
        ..config
    });
    for (index, modulator) in modulators.iter().enumerate() {
        engine.set_modulator_config(index, modulator.clone());
    }
    engine.note_on(45, 0.8, 0); // A2, typical bass note
    engine
}

pub fn bench_voices(c: &mut Criterion) {
    let mut group = c.benchmark_group("scenarios/voices");

    let pm = ModulatorConfig {
        freq_mul: 2.0,
        mod_pm: 0.5,
        ..ModulatorConfig::default()
    };
    let fm = ModulatorConfig {
        freq_mul: 0.5,
        mod_fm: 0.1,
        ..ModulatorConfig::default()
    };
    let am = ModulatorConfig {
        freq_mul: 3.0,
        mod_am: 0.3,
        mod_add: 0.2,
        ..ModulatorConfig::default()
    };

    for &size in BLOCK_SIZES {
        let mut buffer = vec![0.0f32; size];

        // === PLAIN SINE ===
        // Baseline for what a voice costs without modulation
        let mut plain = held_note(SynthConfig::default(), &[]);
        group.bench_with_input(BenchmarkId::new("sine", size), &size, |b, _| {
            b.iter(|| plain.process(black_box(&mut buffer)))
        });

        // === TWO OPERATOR ===
        // Classic carrier + phase modulator
        let mut two_op = held_note(SynthConfig::default(), &[pm.clone()]);
        group.bench_with_input(BenchmarkId::new("two_op", size), &size, |b, _| {
            b.iter(|| two_op.process(black_box(&mut buffer)))
        });

        // === FOUR OPERATOR ===
        // Every modulation route in use
        let mut four_op = held_note(SynthConfig::default(), &[pm.clone(), fm.clone(), am.clone()]);
        group.bench_with_input(BenchmarkId::new("four_op", size), &size, |b, _| {
            b.iter(|| four_op.process(black_box(&mut buffer)))
        });

        // === SUPERSAW-STYLE UNISON ===
        // Seven detuned layers sharing one voice and one modulator
        let unison = SynthConfig {
            unison_voices: 7,
            unison_detune: 25.0,
            ..SynthConfig::default()
        };
        let mut stacked = held_note(unison, &[pm.clone()]);
        group.bench_with_input(BenchmarkId::new("unison7", size), &size, |b, _| {
            b.iter(|| stacked.process(black_box(&mut buffer)))
        });
    }

    group.finish();
}
