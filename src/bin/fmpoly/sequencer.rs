//! Sequencer - sample-accurate phrase playback
//!
//! Turns beat-based phrase events into block-relative note messages.

use polyfm::{synth::VoiceTag, SynthMessage};

/// One note of the phrase, in beats.
#[derive(Debug, Clone, Copy)]
pub struct PhraseNote {
    pub start: f64,
    pub length: f64,
    pub note: i32,
    pub velocity: f64,
}

/// A note event at an absolute sample position.
#[derive(Debug, Clone, Copy)]
struct Event {
    at: u64,
    message: SynthMessage,
}

pub struct Sequencer {
    events: Vec<Event>,
    /// Next event not yet emitted
    cursor: usize,
    /// Absolute sample position of the next block
    position: u64,
    /// Sample position of the last note-off
    end: u64,
}

impl Sequencer {
    pub fn new(phrase: &[PhraseNote], bpm: f64, sample_rate: f64) -> Self {
        let samples_per_beat = sample_rate * 60.0 / bpm;
        let to_samples = |beats: f64| (beats * samples_per_beat).round() as u64;

        let mut events = Vec::with_capacity(phrase.len() * 2);
        for (i, note) in phrase.iter().enumerate() {
            // Tag every note so overlapping repeats of a pitch release separately
            let tag = VoiceTag::index(i as i64);
            events.push(Event {
                at: to_samples(note.start),
                message: SynthMessage::NoteOn {
                    note: note.note,
                    velocity: note.velocity,
                    start_sample: 0,
                    tag,
                },
            });
            events.push(Event {
                at: to_samples(note.start + note.length),
                message: SynthMessage::NoteOffByIndex {
                    index: i as i64,
                    stop_sample: 0,
                },
            });
        }
        events.sort_by_key(|e| e.at);
        let end = events.last().map_or(0, |e| e.at);

        Self {
            events,
            cursor: 0,
            position: 0,
            end,
        }
    }

    /// Emit the messages falling inside the next `block_len` samples, with
    /// their offsets rewritten relative to the block start.
    pub fn advance(&mut self, block_len: usize, mut emit: impl FnMut(SynthMessage)) {
        let block_end = self.position + block_len as u64;
        while let Some(event) = self.events.get(self.cursor) {
            if event.at >= block_end {
                break;
            }
            let offset = (event.at - self.position) as usize;
            emit(with_offset(event.message, offset));
            self.cursor += 1;
        }
        self.position = block_end;
    }

    /// Absolute sample position of the final note-off.
    pub fn end(&self) -> u64 {
        self.end
    }

    pub fn position(&self) -> u64 {
        self.position
    }
}

fn with_offset(message: SynthMessage, offset: usize) -> SynthMessage {
    match message {
        SynthMessage::NoteOn {
            note,
            velocity,
            tag,
            ..
        } => SynthMessage::NoteOn {
            note,
            velocity,
            start_sample: offset,
            tag,
        },
        SynthMessage::NoteOff { note, .. } => SynthMessage::NoteOff {
            note,
            stop_sample: offset,
        },
        SynthMessage::NoteOffByIndex { index, .. } => SynthMessage::NoteOffByIndex {
            index,
            stop_sample: offset,
        },
        SynthMessage::AllNotesOff { .. } => SynthMessage::AllNotesOff {
            stop_sample: offset,
        },
        SynthMessage::Panic => SynthMessage::Panic,
    }
}
