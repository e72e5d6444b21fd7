use rand::seq::SliceRandom;
use rand::Rng;
use serde::Serialize;
use tracing::debug;

use crate::error::{Error, Result};
use crate::note::Note;
use crate::pitch::{PitchClass, PitchModel};
use crate::scale::ScaleRepository;
use crate::weights::{choose, duration_table, octave_table};

/// Octave the opening note of every riff sits in.
pub const START_OCTAVE: u8 = 4;

/// Bounds on how many notes follow the opening note.
pub const MIN_EXTRA_NOTES: usize = 2;
pub const MAX_EXTRA_NOTES: usize = 6;

/// A short generated phrase.
#[derive(Debug, Clone, Serialize)]
pub struct Riff {
    pub start_note: PitchClass,
    pub scale: String,
    pub notes: Vec<Note>,
}

impl Riff {
    /// Generate a riff opening on `start_note` and wandering over the notes
    /// of `scale_name`.
    ///
    /// The first note is `start_note` in octave 4. Two to six more follow,
    /// each a uniform pick from the scale with octave and length drawn from
    /// the shared weighted tables.
    pub fn generate<R: Rng + ?Sized>(
        start_note: PitchClass,
        scale_name: &str,
        scales: &ScaleRepository,
        model: &PitchModel,
        rng: &mut R,
    ) -> Result<Self> {
        let available = scales.get(scale_name)?.notes_from(start_note, model);

        let mut notes = Vec::with_capacity(MAX_EXTRA_NOTES + 1);
        let opening_duration = choose(duration_table(), rng)?;
        notes.push(Note::new(start_note, START_OCTAVE, opening_duration, model)?);

        let extra = rng.gen_range(MIN_EXTRA_NOTES..=MAX_EXTRA_NOTES);
        for _ in 0..extra {
            let pitch = *available.choose(rng).ok_or(Error::EmptyDistribution)?;
            let duration = choose(duration_table(), rng)?;
            let octave = choose(octave_table(), rng)?;
            notes.push(Note::new(pitch, octave, duration, model)?);
        }

        debug!(
            start = %start_note,
            scale = scale_name,
            len = notes.len(),
            "generated riff"
        );

        Ok(Riff {
            start_note,
            scale: scale_name.to_string(),
            notes,
        })
    }

    /// Total length in beats.
    pub fn beats(&self) -> f64 {
        self.notes.iter().map(|note| note.duration).sum()
    }
}
