use crate::synth::{
    engine::Engine,
    message::{MessageReceiver, SynthMessage},
};

/// An [`Engine`] fed from a message queue.
///
/// The UI side pushes [`SynthMessage`]s into the producer half of a ring
/// buffer; the audio callback owns this struct and calls
/// [`render_block`](Self::render_block) once per device block.
pub struct PolySynth<R: MessageReceiver> {
    engine: Engine,
    rx: R,
    frame_counter: u64,
}

impl<R: MessageReceiver> PolySynth<R> {
    pub fn new(engine: Engine, rx: R) -> Self {
        Self {
            engine,
            rx,
            frame_counter: 0,
        }
    }

    pub fn render_block(&mut self, out: &mut [f32]) {
        // Process control messages
        while let Some(msg) = self.rx.pop() {
            self.engine.handle_message(msg);
        }

        self.engine.process(out);
        self.frame_counter += out.len() as u64;
    }

    /// Samples rendered so far.
    pub fn frame_counter(&self) -> u64 {
        self.frame_counter
    }

    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut Engine {
        &mut self.engine
    }

    /// The receiving end, e.g. to feed a single-threaded queue.
    pub fn receiver_mut(&mut self) -> &mut R {
        &mut self.rx
    }

    pub fn into_parts(self) -> (Engine, R) {
        (self.engine, self.rx)
    }
}
