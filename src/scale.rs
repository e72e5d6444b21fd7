use rust_music_theory::note::{Notes, PitchClass as TheoryPitchClass};
use rust_music_theory::scale::{Direction, Mode, Scale as TheoryScale, ScaleType};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::debug;

use crate::error::{Error, Result};
use crate::pitch::{PitchClass, PitchModel, PITCH_CLASS_COUNT};

/// Scale definitions shipped with the crate, one `name step,step,...` per line.
const BUILTIN_SCALES: &str = include_str!("../scales.txt");

/// Church modes pulled from the music theory library.
const MODES: [(&str, Mode); 7] = [
    ("ionian", Mode::Ionian),
    ("dorian", Mode::Dorian),
    ("phrygian", Mode::Phrygian),
    ("lydian", Mode::Lydian),
    ("mixolydian", Mode::Mixolydian),
    ("aeolian", Mode::Aeolian),
    ("locrian", Mode::Locrian),
];

/// An ordered list of semitone hops between consecutive scale notes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scale {
    steps: Vec<u32>,
}

impl Scale {
    pub fn new(steps: Vec<u32>) -> Self {
        Scale { steps }
    }

    pub fn steps(&self) -> &[u32] {
        &self.steps
    }

    /// Walk the scale upward from `start`.
    ///
    /// Returns `steps.len() + 1` pitch classes beginning with `start`. Zero
    /// steps repeat a pitch and steps above 12 wrap around the cycle.
    pub fn notes_from(&self, start: PitchClass, model: &PitchModel) -> Vec<PitchClass> {
        let mut notes = Vec::with_capacity(self.steps.len() + 1);
        notes.push(start);
        let mut current = start;
        for &step in &self.steps {
            current = model.step(current, step);
            notes.push(current);
        }
        notes
    }
}

/// Named scales available to the composer, iterated in name order.
#[derive(Debug, Clone, Default)]
pub struct ScaleRepository {
    scales: BTreeMap<String, Scale>,
}

impl ScaleRepository {
    /// Parse scale definitions from text.
    ///
    /// Each non-blank line is a name and a comma-separated list of
    /// non-negative step sizes separated by a single space.
    pub fn parse(text: &str) -> Result<Self> {
        let mut repository = ScaleRepository::default();
        for (i, line) in text.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            let (name, scale) = parse_line(line).map_err(|reason| Error::Config {
                line: i + 1,
                content: line.to_string(),
                reason,
            })?;
            if repository.scales.contains_key(&name) {
                return Err(Error::Config {
                    line: i + 1,
                    content: line.to_string(),
                    reason: format!("scale '{}' is defined twice", name),
                });
            }
            repository.scales.insert(name, scale);
        }
        debug!(count = repository.len(), "parsed scale definitions");
        Ok(repository)
    }

    /// Read scale definitions from a file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::parse(&text)
    }

    /// The embedded scale list plus the seven diatonic modes.
    pub fn builtin() -> Result<Self> {
        let mut repository = Self::parse(BUILTIN_SCALES)?;
        for (name, mode) in MODES {
            let scale = diatonic_mode(mode)?;
            repository.scales.insert(name.to_string(), scale);
        }
        Ok(repository)
    }

    pub fn get(&self, name: &str) -> Result<&Scale> {
        self.scales
            .get(name)
            .ok_or_else(|| Error::UnknownScale(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.scales.contains_key(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Scale)> {
        self.scales.iter().map(|(name, scale)| (name.as_str(), scale))
    }

    pub fn len(&self) -> usize {
        self.scales.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scales.is_empty()
    }
}

fn parse_line(line: &str) -> std::result::Result<(String, Scale), String> {
    let (name, steps) = line
        .split_once(' ')
        .ok_or_else(|| "expected '<name> <step>,<step>,...'".to_string())?;
    if name.is_empty() {
        return Err("missing scale name".to_string());
    }

    let steps = steps
        .trim()
        .split(',')
        .map(|step| {
            step.trim()
                .parse::<u32>()
                .map_err(|_| format!("'{}' is not a step size", step.trim()))
        })
        .collect::<std::result::Result<Vec<u32>, String>>()?;

    Ok((name.to_string(), Scale::new(steps)))
}

/// Derive step sizes for a diatonic mode from the notes the theory library
/// spells out, closing the octave if the library leaves it open.
fn diatonic_mode(mode: Mode) -> Result<Scale> {
    let scale = TheoryScale::new(
        ScaleType::Diatonic,
        TheoryPitchClass::C,
        4,
        Some(mode),
        Direction::Ascending,
    )
    .map_err(|e| Error::Bounds(format!("theory scale unavailable: {:?}", e)))?;

    let model = PitchModel::new();
    let semitones: Vec<u32> = scale
        .notes()
        .iter()
        .map(|note| model.distance_from_root(PitchClass::from(note.pitch_class)) as u32)
        .collect();

    let octave = PITCH_CLASS_COUNT as u32;
    let mut steps: Vec<u32> = semitones
        .windows(2)
        .map(|pair| (pair[1] + octave - pair[0]) % octave)
        .collect();
    let covered = steps.iter().sum::<u32>() % octave;
    if covered != 0 {
        steps.push(octave - covered);
    }
    Ok(Scale::new(steps))
}
