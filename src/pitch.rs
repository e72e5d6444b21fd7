use rust_music_theory::note::PitchClass as TheoryPitchClass;
use serde::Serialize;
use std::collections::VecDeque;
use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

/// Number of pitch classes in the chromatic cycle.
pub const PITCH_CLASS_COUNT: usize = 12;

/// One of the twelve chromatic note names, spelled with sharps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum PitchClass {
    A,
    #[serde(rename = "A#")]
    As,
    B,
    C,
    #[serde(rename = "C#")]
    Cs,
    D,
    #[serde(rename = "D#")]
    Ds,
    E,
    F,
    #[serde(rename = "F#")]
    Fs,
    G,
    #[serde(rename = "G#")]
    Gs,
}

impl PitchClass {
    /// Chain order of the successor graph: each entry is one semitone above
    /// the previous, and `Gs` wraps back to `A`.
    pub const ALL: [PitchClass; PITCH_CLASS_COUNT] = [
        PitchClass::A,
        PitchClass::As,
        PitchClass::B,
        PitchClass::C,
        PitchClass::Cs,
        PitchClass::D,
        PitchClass::Ds,
        PitchClass::E,
        PitchClass::F,
        PitchClass::Fs,
        PitchClass::G,
        PitchClass::Gs,
    ];

    /// The pitch class all distances are measured from.
    pub const REFERENCE: PitchClass = PitchClass::C;

    fn index(self) -> usize {
        self as usize
    }

    pub fn name(self) -> &'static str {
        match self {
            PitchClass::A => "A",
            PitchClass::As => "A#",
            PitchClass::B => "B",
            PitchClass::C => "C",
            PitchClass::Cs => "C#",
            PitchClass::D => "D",
            PitchClass::Ds => "D#",
            PitchClass::E => "E",
            PitchClass::F => "F",
            PitchClass::Fs => "F#",
            PitchClass::G => "G",
            PitchClass::Gs => "G#",
        }
    }
}

impl fmt::Display for PitchClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for PitchClass {
    type Err = Error;

    /// Accepts `C#` as well as `Cs` spellings.
    fn from_str(s: &str) -> Result<Self> {
        let normalized = s.trim().replace('s', "#");
        PitchClass::ALL
            .iter()
            .copied()
            .find(|pitch| pitch.name().eq_ignore_ascii_case(&normalized))
            .ok_or_else(|| Error::Bounds(format!("'{}' is not a pitch class", s)))
    }
}

impl From<TheoryPitchClass> for PitchClass {
    fn from(pitch: TheoryPitchClass) -> Self {
        match pitch {
            TheoryPitchClass::C => PitchClass::C,
            TheoryPitchClass::Cs => PitchClass::Cs,
            TheoryPitchClass::D => PitchClass::D,
            TheoryPitchClass::Ds => PitchClass::Ds,
            TheoryPitchClass::E => PitchClass::E,
            TheoryPitchClass::F => PitchClass::F,
            TheoryPitchClass::Fs => PitchClass::Fs,
            TheoryPitchClass::G => PitchClass::G,
            TheoryPitchClass::Gs => PitchClass::Gs,
            TheoryPitchClass::A => PitchClass::A,
            TheoryPitchClass::As => PitchClass::As,
            TheoryPitchClass::B => PitchClass::B,
        }
    }
}

impl From<PitchClass> for TheoryPitchClass {
    fn from(pitch: PitchClass) -> Self {
        match pitch {
            PitchClass::C => TheoryPitchClass::C,
            PitchClass::Cs => TheoryPitchClass::Cs,
            PitchClass::D => TheoryPitchClass::D,
            PitchClass::Ds => TheoryPitchClass::Ds,
            PitchClass::E => TheoryPitchClass::E,
            PitchClass::F => TheoryPitchClass::F,
            PitchClass::Fs => TheoryPitchClass::Fs,
            PitchClass::G => TheoryPitchClass::G,
            PitchClass::Gs => TheoryPitchClass::Gs,
            PitchClass::A => TheoryPitchClass::A,
            PitchClass::As => TheoryPitchClass::As,
            PitchClass::B => TheoryPitchClass::B,
        }
    }
}

/// Directed half-step graph over the twelve pitch classes.
///
/// Every node has exactly one outgoing edge to the pitch a semitone above it.
/// Distances are shortest paths from [`PitchClass::REFERENCE`] along those
/// edges, which equal the semitone offset above C.
#[derive(Debug, Clone)]
pub struct PitchModel {
    successors: [PitchClass; PITCH_CLASS_COUNT],
    distances: [u8; PITCH_CLASS_COUNT],
}

impl PitchModel {
    pub fn new() -> Self {
        let mut successors = PitchClass::ALL;

        // The chromatic chain, then one edge closing it into a cycle.
        for pair in PitchClass::ALL.windows(2) {
            successors[pair[0].index()] = pair[1];
        }
        successors[PitchClass::Gs.index()] = PitchClass::A;

        let distances = shortest_paths(&successors, PitchClass::REFERENCE);
        PitchModel {
            successors,
            distances,
        }
    }

    /// The pitch class one semitone above `pitch`.
    pub fn successor(&self, pitch: PitchClass) -> PitchClass {
        self.successors[pitch.index()]
    }

    /// Follow `hops` successor edges from `pitch`.
    pub fn step(&self, pitch: PitchClass, hops: u32) -> PitchClass {
        let mut current = pitch;
        for _ in 0..hops as usize % PITCH_CLASS_COUNT {
            current = self.successor(current);
        }
        current
    }

    /// Semitones above C, in `0..12`.
    pub fn distance_from_root(&self, pitch: PitchClass) -> u8 {
        self.distances[pitch.index()]
    }
}

impl Default for PitchModel {
    fn default() -> Self {
        Self::new()
    }
}

/// Breadth-first search along successor edges from `root`.
fn shortest_paths(
    successors: &[PitchClass; PITCH_CLASS_COUNT],
    root: PitchClass,
) -> [u8; PITCH_CLASS_COUNT] {
    let mut distances = [u8::MAX; PITCH_CLASS_COUNT];
    let mut queue = VecDeque::new();

    distances[root.index()] = 0;
    queue.push_back(root);

    while let Some(pitch) = queue.pop_front() {
        let next = successors[pitch.index()];
        if distances[next.index()] == u8::MAX {
            distances[next.index()] = distances[pitch.index()] + 1;
            queue.push_back(next);
        }
    }

    distances
}
