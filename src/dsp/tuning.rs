//! Note index to frequency mapping.
//!
//! Notes are plain integers counted from the base frequency: note 0 sounds at
//! `base_frequency`, note `notes_per_octave` one octave above it. With the
//! defaults (12 notes, base C0 ≈ 16.35 Hz) note 57 is A4 = 440 Hz.

/// Frequency of C0 in 12-TET with A4 = 440 Hz.
pub const DEFAULT_BASE_FREQUENCY: f64 = 16.351_597_831_287_414;
pub const DEFAULT_NOTES_PER_OCTAVE: f64 = 12.0;

/// Smallest accepted notes-per-octave value.
const MIN_NOTES_PER_OCTAVE: f64 = 1e-9;

#[derive(Debug, Clone, PartialEq)]
enum Scale {
    /// Equal steps of `2^(1/notes_per_octave)`.
    Equal { step: f64 },
    /// Explicit ratios for the degrees of one octave, starting at 1/1.
    Ratios(Vec<f64>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Tuning {
    base_frequency: f64,
    notes_per_octave: f64,
    scale: Scale,
}

impl Default for Tuning {
    fn default() -> Self {
        Self::equal(DEFAULT_BASE_FREQUENCY, DEFAULT_NOTES_PER_OCTAVE)
    }
}

impl Tuning {
    /// Equal temperament with `notes_per_octave` steps per octave.
    pub fn equal(base_frequency: f64, notes_per_octave: f64) -> Self {
        let mut tuning = Self {
            base_frequency,
            notes_per_octave: DEFAULT_NOTES_PER_OCTAVE,
            scale: Scale::Equal { step: 1.0 },
        };
        tuning.set_notes_per_octave(notes_per_octave);
        tuning
    }

    /// Rational scale built from the frequency ratios of one octave.
    ///
    /// `ratios[0]` is the unison and should be 1.0; the octave itself is
    /// implied. An empty ratio list falls back to a single 1/1 degree, which
    /// makes every note an octave apart.
    ///
    /// ```ignore
    /// // 5-limit just major scale on C
    /// let just = Tuning::ratios(261.63, vec![1.0, 9.0 / 8.0, 5.0 / 4.0, 4.0 / 3.0, 3.0 / 2.0, 5.0 / 3.0, 15.0 / 8.0]);
    /// ```
    pub fn ratios(base_frequency: f64, ratios: Vec<f64>) -> Self {
        let ratios = if ratios.is_empty() { vec![1.0] } else { ratios };
        Self {
            base_frequency,
            notes_per_octave: ratios.len() as f64,
            scale: Scale::Ratios(ratios),
        }
    }

    pub fn base_frequency(&self) -> f64 {
        self.base_frequency
    }

    pub fn set_base_frequency(&mut self, base_frequency: f64) {
        self.base_frequency = base_frequency;
    }

    pub fn notes_per_octave(&self) -> f64 {
        self.notes_per_octave
    }

    /// Switches to equal temperament with the given number of steps.
    pub fn set_notes_per_octave(&mut self, notes_per_octave: f64) {
        let notes = notes_per_octave.max(MIN_NOTES_PER_OCTAVE);
        self.notes_per_octave = notes;
        self.scale = Scale::Equal {
            step: 2.0_f64.powf(1.0 / notes),
        };
    }

    /// Frequency in Hz of `note`.
    pub fn frequency(&self, note: i32) -> f64 {
        match &self.scale {
            Scale::Equal { step } => self.base_frequency * step.powi(note),
            Scale::Ratios(ratios) => {
                let len = ratios.len() as i32;
                let octave = note.div_euclid(len);
                let degree = note.rem_euclid(len) as usize;
                self.base_frequency * 2.0_f64.powi(octave) * ratios[degree]
            }
        }
    }

    /// Octaves between the base frequency and `frequency`.
    pub fn octave(&self, frequency: f64) -> f64 {
        (frequency / self.base_frequency).log2()
    }
}
