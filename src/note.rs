use serde::Serialize;

use crate::error::{Error, Result};
use crate::pitch::{PitchClass, PitchModel};

/// Frequency of C at octave 0, in Hz.
pub const F0: f64 = 16.352;

/// Highest octave a note may sit in.
pub const MAX_OCTAVE: u8 = 8;

/// Equal-tempered semitone ratio, 2^(1/12).
fn semitone_ratio() -> f64 {
    2f64.powf(1.0 / 12.0)
}

/// A single pitched note with its length in beats.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Note {
    pub pitch_class: PitchClass,
    pub octave: u8,
    /// Length in beats (quarter notes).
    pub duration: f64,
    /// Frequency in Hz.
    pub frequency: f64,
    /// MIDI note number.
    pub pitch: i32,
}

impl Note {
    pub fn new(pitch_class: PitchClass, octave: u8, duration: f64, model: &PitchModel) -> Result<Self> {
        if octave > MAX_OCTAVE {
            return Err(Error::Bounds(format!(
                "octave {} is outside 0..={}",
                octave, MAX_OCTAVE
            )));
        }
        if !duration.is_finite() || duration <= 0.0 {
            return Err(Error::Bounds(format!(
                "note duration must be positive, got {}",
                duration
            )));
        }

        let semitones = 12 * octave as i32 + model.distance_from_root(pitch_class) as i32;
        let frequency = F0 * semitone_ratio().powi(semitones);

        // Concert pitch A4 = 440 Hz = MIDI 69
        let pitch = (69.0 + 12.0 * (frequency / 440.0).log2()).round() as i32;

        Ok(Note {
            pitch_class,
            octave,
            duration,
            frequency,
            pitch,
        })
    }
}
