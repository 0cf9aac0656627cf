#[cfg(feature = "rtrb")]
use rtrb::Consumer;

use crate::synth::voice::VoiceTag;

/// Control events sent from a UI/MIDI thread to the audio thread.
///
/// Sample offsets are relative to the start of the next rendered block.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum SynthMessage {
    NoteOn {
        note: i32,
        velocity: f64,
        start_sample: usize,
        tag: VoiceTag,
    },
    NoteOff {
        note: i32,
        stop_sample: usize,
    },
    NoteOffByIndex {
        index: i64,
        stop_sample: usize,
    },
    AllNotesOff {
        stop_sample: usize,
    },
    Panic,
}

impl SynthMessage {
    /// Untagged note-on at the start of the next block.
    pub fn note_on(note: i32, velocity: f64) -> Self {
        Self::NoteOn {
            note,
            velocity,
            start_sample: 0,
            tag: VoiceTag::default(),
        }
    }

    pub fn note_off(note: i32) -> Self {
        Self::NoteOff {
            note,
            stop_sample: 0,
        }
    }
}

pub trait MessageReceiver {
    fn pop(&mut self) -> Option<SynthMessage>;
}

#[cfg(feature = "rtrb")]
impl MessageReceiver for Consumer<SynthMessage> {
    fn pop(&mut self) -> Option<SynthMessage> {
        Consumer::pop(self).ok()
    }
}

/// Any `VecDeque` works as a single-threaded queue, handy for offline renders.
impl MessageReceiver for std::collections::VecDeque<SynthMessage> {
    fn pop(&mut self) -> Option<SynthMessage> {
        self.pop_front()
    }
}
