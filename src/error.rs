use thiserror::Error;

use crate::song::Section;

/// Everything that can go wrong while loading scales, composing, or rendering.
#[derive(Debug, Error)]
pub enum Error {
    /// A scale definition line could not be parsed.
    #[error("scale definition line {line} ('{content}'): {reason}")]
    Config {
        line: usize,
        content: String,
        reason: String,
    },

    #[error("unknown scale '{0}'")]
    UnknownScale(String),

    /// The sampler was handed no entries, or only zero weights.
    #[error("cannot sample from an empty or zero-weight distribution")]
    EmptyDistribution,

    #[error("structure assembly needs the '{0}' section to be active")]
    MissingRequiredSection(Section),

    /// A numeric parameter was outside its allowed range.
    #[error("out of bounds: {0}")]
    Bounds(String),

    #[error("midi encoding failed: {0}")]
    Midi(String),

    #[error("audio output unavailable: {0}")]
    AudioStream(#[from] rodio::StreamError),

    #[error("audio playback failed: {0}")]
    AudioPlay(#[from] rodio::PlayError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
