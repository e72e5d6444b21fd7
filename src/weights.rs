use rand::Rng;
use std::sync::OnceLock;
use tracing::error;

use crate::error::{Error, Result};

/// A discrete distribution: candidate values paired with integer weights.
pub type WeightedTable<T> = Vec<(T, u32)>;

/// Note lengths in beats, longest first. A beat is a quarter note.
pub const DURATION_CANDIDATES: [f64; 12] = [
    8.0,
    4.0,
    2.0,
    1.0,
    1.0 / 2.0,
    1.0 / 4.0,
    1.0 / 8.0,
    1.0 / 16.0,
    1.0 / 32.0,
    1.0 / 64.0,
    1.0 / 128.0,
    1.0 / 256.0,
];

/// Octaves a riff note may sound in.
pub const OCTAVE_CANDIDATES: [u8; 9] = [0, 1, 2, 3, 4, 5, 6, 7, 8];

const DURATION_PEAK: f64 = 1.0;
const OCTAVE_PEAK: u8 = 4;
const SMOOTHNESS: f64 = 1.5;

/// Draw one value from a weighted distribution.
///
/// Picks `r` uniformly in `[0, total)` and returns the first value whose
/// cumulative weight is strictly greater than `r`, so zero-weight entries are
/// never returned.
pub fn choose<T: Copy, R: Rng + ?Sized>(distribution: &[(T, u32)], rng: &mut R) -> Result<T> {
    let total: u64 = distribution.iter().map(|&(_, weight)| weight as u64).sum();
    if total == 0 {
        return Err(Error::EmptyDistribution);
    }

    let r = rng.gen_range(0..total);
    let mut upto = 0u64;
    for &(value, weight) in distribution {
        upto += weight as u64;
        if upto > r {
            return Ok(value);
        }
    }

    // The cumulative sum ends at `total`, which is always greater than `r`.
    Err(Error::EmptyDistribution)
}

/// Build bell-shaped weights biased toward `peak`.
///
/// Returns `values.len() - 1` weights; weight `x - 1` scores candidate
/// `values[x]` for `x` in `1..n`. The peak index defaults to the midpoint
/// `n / 2` when no peak is given. Raw scores are shifted by the absolute value
/// of their minimum and truncated to integers.
pub fn shape<T: PartialEq>(values: &[T], peak: Option<&T>, smoothness: f64) -> Result<Vec<u32>> {
    let n = values.len();
    if n < 2 {
        return Err(Error::Bounds(format!(
            "distribution needs at least 2 candidates, got {}",
            n
        )));
    }
    if !smoothness.is_finite() || smoothness <= 0.0 {
        return Err(Error::Bounds(format!(
            "smoothness must be positive, got {}",
            smoothness
        )));
    }

    let n_f = n as f64;
    let peak_index = match peak {
        Some(peak) => values
            .iter()
            .position(|value| value == peak)
            .ok_or_else(|| Error::Bounds("peak is not one of the candidates".to_string()))?
            as f64,
        None => n_f / 2.0,
    };

    let raw: Vec<f64> = (1..n)
        .map(|x| {
            let x = x as f64;
            let distance = (peak_index - x).abs();
            x + (1.0 / n_f - distance) * smoothness.powf(n_f - distance / smoothness)
        })
        .collect();

    let shift = raw.iter().copied().fold(f64::INFINITY, f64::min).abs();
    Ok(raw.iter().map(|weight| (weight + shift) as u32).collect())
}

/// Shape weights for `values` and pair them with `values[1..]`.
///
/// The first candidate gets no weight and so never appears in the table.
pub fn weighted_table<T: Copy + PartialEq>(
    values: &[T],
    peak: Option<&T>,
    smoothness: f64,
) -> Result<WeightedTable<T>> {
    let weights = shape(values, peak, smoothness)?;
    Ok(values[1..].iter().copied().zip(weights).collect())
}

static DURATION_TABLE: OnceLock<WeightedTable<f64>> = OnceLock::new();
static OCTAVE_TABLE: OnceLock<WeightedTable<u8>> = OnceLock::new();

/// Process-wide note-length distribution, peaking at one beat.
pub fn duration_table() -> &'static [(f64, u32)] {
    DURATION_TABLE.get_or_init(|| {
        table_or_empty(
            "duration",
            weighted_table(&DURATION_CANDIDATES, Some(&DURATION_PEAK), SMOOTHNESS),
        )
    })
}

/// Process-wide octave distribution, peaking at octave 4.
pub fn octave_table() -> &'static [(u8, u32)] {
    OCTAVE_TABLE.get_or_init(|| {
        table_or_empty(
            "octave",
            weighted_table(&OCTAVE_CANDIDATES, Some(&OCTAVE_PEAK), SMOOTHNESS),
        )
    })
}

/// Fall back to an empty table, which every later draw reports as
/// `EmptyDistribution`, after logging why it could not be built.
fn table_or_empty<T>(name: &str, table: Result<WeightedTable<T>>) -> WeightedTable<T> {
    table.unwrap_or_else(|e| {
        error!(table = name, error = %e, "failed to build weighted table");
        Vec::new()
    })
}
