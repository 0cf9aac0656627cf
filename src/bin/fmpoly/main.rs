//! fmpoly - offline FM phrase renderer
//!
//! Renders a short phrase through the engine block by block and prints level
//! statistics plus the dominant frequency of each chord.
//!
//! Run with: cargo run --bin fmpoly [-- <sample-rate>]

mod sequencer;
mod spectrum;

use std::collections::VecDeque;

use log::info;
use polyfm::{Engine, ModulatorConfig, PolySynth, SynthConfig, VoicePolicy, MAX_BLOCK_SIZE};

use sequencer::{PhraseNote, Sequencer};
use spectrum::SpectrumAnalyzer;

const BLOCK_SIZE: usize = 512;
const BPM: f64 = 120.0;
/// Keep rendering this long after the last note-off so releases finish.
const TAIL_SECONDS: f64 = 1.0;

fn phrase() -> Vec<PhraseNote> {
    let note = |start, length, note, velocity| PhraseNote {
        start,
        length,
        note,
        velocity,
    };
    vec![
        // C minor, then A flat major, then a held G
        note(0.0, 2.0, 48, 0.8),
        note(0.0, 2.0, 51, 0.7),
        note(0.0, 2.0, 55, 0.7),
        note(2.0, 2.0, 44, 0.8),
        note(2.0, 2.0, 48, 0.7),
        note(2.0, 2.0, 51, 0.7),
        note(4.0, 3.0, 43, 0.9),
        note(4.5, 0.5, 55, 0.6),
        note(5.0, 0.5, 58, 0.6),
        note(5.5, 1.5, 62, 0.6),
    ]
}

fn engine(sample_rate: f64) -> Engine {
    let mut engine = Engine::new(sample_rate);
    engine.set_config(SynthConfig {
        number_voices: 8,
        voice_policy: VoicePolicy::Oldest,
        volume: 0.25,
        unison_voices: 2,
        combined_unison: true,
        unison_detune: 12.0,
        number_mod_voices: 1,
        attack: 0.005,
        decay: 0.3,
        sustain: 0.5,
        release: 0.4,
        ..SynthConfig::default()
    });
    engine.set_modulator_config(
        0,
        ModulatorConfig {
            freq_mul: 2.0,
            mod_pm: 0.6,
            attack: 0.001,
            decay: 0.5,
            sustain: 0.2,
            release: 0.3,
            ..ModulatorConfig::default()
        },
    );
    engine.set_voice_started_callback(|voice| {
        log::debug!("voice {} started note {}", voice.index(), voice.note())
    });
    engine
}

fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;
    env_logger::builder()
        .filter_level(log::LevelFilter::Info)
        .init();

    let sample_rate = match std::env::args().nth(1) {
        Some(arg) => arg.parse::<f64>()?,
        None => 48_000.0,
    };
    if !(sample_rate.is_finite() && sample_rate > 0.0) {
        return Err(color_eyre::eyre::eyre!("invalid sample rate {sample_rate}"));
    }

    let mut sequencer = Sequencer::new(&phrase(), BPM, sample_rate);
    let mut synth = PolySynth::new(engine(sample_rate), VecDeque::new());
    let total = sequencer.end() + (TAIL_SECONDS * sample_rate) as u64;
    info!(
        "rendering {:.2}s at {sample_rate} Hz in blocks of {BLOCK_SIZE}",
        total as f64 / sample_rate
    );

    let mut rendered = Vec::with_capacity(total as usize);
    let mut block = vec![0.0f32; BLOCK_SIZE];
    while sequencer.position() < total {
        let queue = synth.receiver_mut();
        sequencer.advance(BLOCK_SIZE, |message| queue.push_back(message));
        synth.render_block(&mut block);
        rendered.extend_from_slice(&block);
    }

    // Per half-beat statistics
    let window = (sample_rate * 30.0 / BPM) as usize;
    println!("{:>7}  {:>7}  {:>7}", "time", "peak", "rms");
    for (i, chunk) in rendered.chunks(window.max(1)).enumerate() {
        let peak = chunk.iter().fold(0.0f32, |m, s| m.max(s.abs()));
        let rms = (chunk.iter().map(|s| s * s).sum::<f32>() / chunk.len() as f32).sqrt();
        println!(
            "{:>6.2}s  {:>7.4}  {:>7.4}",
            (i * window) as f64 / sample_rate,
            peak,
            rms
        );
    }

    let mut analyzer = SpectrumAnalyzer::new(MAX_BLOCK_SIZE, sample_rate as f32);
    println!("\nFFT resolution {:.2} Hz", analyzer.resolution());
    for beat in [1.0, 3.0, 6.0] {
        let at = (beat * sample_rate * 60.0 / BPM) as usize;
        let Some(slice) = rendered.get(at..at + MAX_BLOCK_SIZE) else {
            continue;
        };
        match analyzer.dominant(slice) {
            Some((frequency, db)) => {
                println!("beat {beat:>4}: dominant {frequency:8.2} Hz ({db:6.1} dB)")
            }
            None => println!("beat {beat:>4}: silent"),
        }
    }

    info!(
        "done, {} voices still sounding",
        synth.engine().active_voice_count()
    );
    Ok(())
}
