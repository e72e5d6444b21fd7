use midly::{
    num::{u15, u24, u28, u4, u7},
    Format, Header, MetaMessage, MidiMessage, Smf, Timing, Track, TrackEvent, TrackEventKind,
};
use std::path::Path;
use tracing::info;

use crate::error::{Error, Result};
use crate::song::Song;

/// Ticks per beat. Divisible by 256 so the shortest note length is whole.
pub const TICKS_PER_BEAT: u16 = 768;

/// Velocity of every note.
pub const VELOCITY: u8 = 100;

pub const TRACK_NAME: &str = "RiffBeats";

const CHANNEL: u8 = 0;
const MAX_U24: u32 = 0x00FF_FFFF;
const MAX_U28: u64 = 0x0FFF_FFFF;

/// Encode a song and write it to `path`.
pub fn write_midi(song: &Song, path: &Path) -> Result<()> {
    let bytes = to_bytes(song)?;
    std::fs::write(path, &bytes)?;
    info!(path = %path.display(), bytes = bytes.len(), "wrote midi file");
    Ok(())
}

/// Encode a song as Standard MIDI File bytes.
pub fn to_bytes(song: &Song) -> Result<Vec<u8>> {
    let smf = song_to_smf(song)?;
    let mut buf = Vec::new();
    smf.write_std(&mut buf)?;
    Ok(buf)
}

/// Convert a song to an in-memory SMF.
///
/// Every note of each structure entry's riff is written back to back on a
/// single format 0 track, advancing a beat cursor by each note's duration.
pub fn song_to_smf(song: &Song) -> Result<Smf<'static>> {
    let mut smf = Smf::new(Header::new(
        Format::SingleTrack,
        Timing::Metrical(u15::new(TICKS_PER_BEAT)),
    ));

    let mut track: Track<'static> = Vec::new();
    track.push(TrackEvent {
        delta: u28::new(0),
        kind: TrackEventKind::Meta(MetaMessage::TrackName(TRACK_NAME.as_bytes())),
    });
    track.push(TrackEvent {
        delta: u28::new(0),
        kind: TrackEventKind::Meta(MetaMessage::Tempo(tempo_micros(song.tempo)?)),
    });

    let mut cursor = 0.0;
    let mut last_tick = 0u64;
    for &section in &song.structure {
        let riff = song
            .riff(section)
            .ok_or_else(|| Error::Midi(format!("no riff for section '{}'", section)))?;

        for note in &riff.notes {
            let key = midi_key(note.pitch)?;
            let start = beats_to_ticks(cursor)?;
            cursor += note.duration;
            let end = beats_to_ticks(cursor)?;

            track.push(note_event(
                start - last_tick,
                MidiMessage::NoteOn {
                    key,
                    vel: u7::new(VELOCITY),
                },
            ));
            track.push(note_event(
                end - start,
                MidiMessage::NoteOff {
                    key,
                    vel: u7::new(0),
                },
            ));
            last_tick = end;
        }
    }

    track.push(TrackEvent {
        delta: u28::new(0),
        kind: TrackEventKind::Meta(MetaMessage::EndOfTrack),
    });
    smf.tracks.push(track);
    Ok(smf)
}

fn note_event(delta: u64, message: MidiMessage) -> TrackEvent<'static> {
    TrackEvent {
        // Deltas are bounded by the absolute tick check in beats_to_ticks.
        delta: u28::new(delta as u32),
        kind: TrackEventKind::Midi {
            channel: u4::new(CHANNEL),
            message,
        },
    }
}

fn tempo_micros(bpm: u32) -> Result<u24> {
    if bpm == 0 {
        return Err(Error::Bounds("tempo must be positive".to_string()));
    }
    let micros = 60_000_000 / bpm;
    if micros > MAX_U24 {
        return Err(Error::Midi(format!("tempo {} bpm is too slow to encode", bpm)));
    }
    Ok(u24::new(micros))
}

fn midi_key(pitch: i32) -> Result<u7> {
    if !(0..=127).contains(&pitch) {
        return Err(Error::Midi(format!("pitch {} is outside the MIDI range", pitch)));
    }
    Ok(u7::new(pitch as u8))
}

fn beats_to_ticks(beats: f64) -> Result<u64> {
    let ticks = (beats * TICKS_PER_BEAT as f64).round() as u64;
    if ticks > MAX_U28 {
        return Err(Error::Midi(format!("song runs past tick {}", MAX_U28)));
    }
    Ok(ticks)
}
