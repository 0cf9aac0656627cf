//! Benchmarks for the full polyphonic engine.
//!
//! Full pools, per-voice output and a note storm that forces stealing on
//! every block.

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion};
use polyfm::{Engine, ModulatorConfig, SynthConfig, VoicePolicy};

use crate::{BLOCK_SIZES, SAMPLE_RATE};

fn engine(voices: usize, policy: VoicePolicy) -> Engine {
    let mut engine = Engine::with_seed(SAMPLE_RATE, 1);
    engine.set_config(SynthConfig {
        number_voices: voices,
        voice_policy: policy,
        number_mod_voices: 1,
        sustain: 0.7,
        ..SynthConfig::default()
    });
    engine.set_modulator_config(
        0,
        ModulatorConfig {
            freq_mul: 2.0,
            mod_pm: 0.4,
            ..ModulatorConfig::default()
        },
    );
    engine
}

pub fn bench_engine(c: &mut Criterion) {
    let mut group = c.benchmark_group("scenarios/engine");

    for &size in BLOCK_SIZES {
        let mut buffer = vec![0.0f32; size];

        // === FULL POOL ===
        // 16 held notes mixed to mono
        let mut full = engine(16, VoicePolicy::Oldest);
        for note in 0..16 {
            full.note_on(36 + note * 2, 0.6, 0);
        }
        group.bench_with_input(BenchmarkId::new("poly16_mono", size), &size, |b, _| {
            b.iter(|| full.process(black_box(&mut buffer)))
        });

        // === PER-VOICE OUTPUT ===
        let mut split = engine(16, VoicePolicy::Oldest);
        for note in 0..16 {
            split.note_on(36 + note * 2, 0.6, 0);
        }
        let mut outputs = vec![vec![0.0f32; size]; 16];
        group.bench_with_input(BenchmarkId::new("poly16_split", size), &size, |b, _| {
            b.iter(|| split.process_voices(black_box(&mut outputs)))
        });

        // === NOTE STORM ===
        // Four new notes per block into a full 8-voice pool
        for policy in [VoicePolicy::Oldest, VoicePolicy::Quietest] {
            let mut storm = engine(8, policy);
            let mut note = 0;
            let id = format!("storm_{}", policy.name());
            group.bench_with_input(BenchmarkId::new(id, size), &size, |b, _| {
                b.iter(|| {
                    for k in 0..4 {
                        storm.note_on(36 + note % 36, 0.7, k * size / 4);
                        note += 1;
                    }
                    storm.process(black_box(&mut buffer));
                })
            });
        }
    }

    group.finish();
}
