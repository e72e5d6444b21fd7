use dasp_signal::Signal;
use rodio::buffer::SamplesBuffer;
use rodio::{OutputStream, Sink};
use tracing::info;

use crate::error::Result;
use crate::note::Note;
use crate::song::Song;

/// CD-quality audio (44.1 kHz)
pub const SAMPLE_RATE: u32 = 44100;

/// Share of each note that sounds; the rest is silence between notes.
const ARTICULATION: f64 = 0.85;

/// Half amplitude to leave headroom.
const AMPLITUDE: f64 = 0.5;

/// Samples one note occupies, sound plus gap.
fn samples_for_note(note: &Note, seconds_per_beat: f64, sample_rate: u32) -> usize {
    (sample_rate as f64 * note.duration * seconds_per_beat) as usize
}

/// Render a song as a mono sine-wave preview.
///
/// Each note plays at its own frequency for its share of the beat, so the
/// preview follows the same structure and timing the MIDI output does.
pub fn render_samples(song: &Song, sample_rate: u32) -> Vec<f32> {
    let seconds_per_beat = 60.0 / song.tempo.max(1) as f64;
    let mut samples = Vec::new();

    for &section in &song.structure {
        let Some(riff) = song.riff(section) else {
            continue;
        };
        for note in &riff.notes {
            let total = samples_for_note(note, seconds_per_beat, sample_rate);
            let sound = (total as f64 * ARTICULATION) as usize;

            let mut tone = dasp_signal::rate(sample_rate as f64)
                .const_hz(note.frequency)
                .sine()
                .map(|x| (x * AMPLITUDE) as f32);
            samples.extend((0..sound).map(|_| tone.next()));
            samples.extend(std::iter::repeat(0.0).take(total - sound));
        }
    }

    samples
}

/// Play a song on the default output device, blocking until it ends.
pub fn play(song: &Song) -> Result<()> {
    let samples = render_samples(song, SAMPLE_RATE);
    let seconds = samples.len() as f64 / SAMPLE_RATE as f64;

    let (_stream, stream_handle) = OutputStream::try_default()?;
    let sink = Sink::try_new(&stream_handle)?;
    sink.append(SamplesBuffer::new(1, SAMPLE_RATE, samples));

    info!(seconds, "playing preview");
    sink.sleep_until_end();
    Ok(())
}
