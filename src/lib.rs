//! RiffBeats: procedural riff and song-structure composer.
//!
//! A song is built from short generated riffs, one per active section
//! (verse, chorus, prechorus, solo, intro, outro), and a playback order that
//! never plays the same section twice in a row before each entry is
//! stretched into a block of two or four repeats.
//!
//! - [`weights`]: weighted sampling and the bell-shaped duration/octave tables
//! - [`pitch`]: pitch classes and the half-step successor graph
//! - [`scale`]: scales and the named scale repository
//! - [`note`]: notes with frequency and MIDI pitch
//! - [`riff`]: riff generation
//! - [`song`]: section table, structure assembly and the composer entry point
//! - [`midi`]: Standard MIDI File output
//! - [`audio`]: sine-wave preview rendering and playback
//!
//! All randomness comes from a caller-supplied [`rand::Rng`], so a seeded
//! generator reproduces the same song.

pub mod audio;
pub mod error;
pub mod midi;
pub mod note;
pub mod pitch;
pub mod riff;
pub mod scale;
pub mod song;
pub mod weights;

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

pub use error::{Error, Result};
pub use note::Note;
pub use pitch::{PitchClass, PitchModel};
pub use riff::Riff;
pub use scale::{Scale, ScaleRepository};
pub use song::{ComposeRequest, Section, Song};

/// A reproducible random source for the given seed.
pub fn seeded_rng(seed: u64) -> ChaCha8Rng {
    ChaCha8Rng::seed_from_u64(seed)
}
