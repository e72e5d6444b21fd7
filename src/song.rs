use rand::seq::SliceRandom;
use rand::Rng;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::pitch::{PitchClass, PitchModel};
use crate::riff::Riff;
use crate::scale::ScaleRepository;

/// How far the final tempo may drift from the requested one, either way.
pub const TEMPO_JITTER: i64 = 3;

/// Largest base tempo whose jittered value still fits in a `u32`.
pub const MAX_BASE_TEMPO: i64 = u32::MAX as i64 - TEMPO_JITTER;

/// A labelled part of a song. Ordering follows the section table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Section {
    Verse,
    Chorus,
    Prechorus,
    Solo,
    Intro,
    Outro,
}

impl Section {
    pub fn name(self) -> &'static str {
        match self {
            Section::Verse => "verse",
            Section::Chorus => "chorus",
            Section::Prechorus => "prechorus",
            Section::Solo => "solo",
            Section::Intro => "intro",
            Section::Outro => "outro",
        }
    }

    /// Intro and outro bracket the song instead of taking part in sequencing.
    pub fn is_bookend(self) -> bool {
        matches!(self, Section::Intro | Section::Outro)
    }
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// How many times a section's riff may be scheduled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SectionTemplate {
    pub section: Section,
    pub min_repeat: u32,
    pub max_repeat: u32,
}

/// Sections in activation order: complexity `n` enables the first `n`.
pub const SECTION_TABLE: [SectionTemplate; 6] = [
    SectionTemplate {
        section: Section::Verse,
        min_repeat: 2,
        max_repeat: 4,
    },
    SectionTemplate {
        section: Section::Chorus,
        min_repeat: 2,
        max_repeat: 4,
    },
    SectionTemplate {
        section: Section::Prechorus,
        min_repeat: 1,
        max_repeat: 3,
    },
    SectionTemplate {
        section: Section::Solo,
        min_repeat: 1,
        max_repeat: 2,
    },
    SectionTemplate {
        section: Section::Intro,
        min_repeat: 1,
        max_repeat: 1,
    },
    SectionTemplate {
        section: Section::Outro,
        min_repeat: 1,
        max_repeat: 1,
    },
];

/// Multiset of section labels, iterated in section-table order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SectionCounter {
    counts: BTreeMap<Section, u32>,
}

impl SectionCounter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, section: Section, count: u32) {
        if count > 0 {
            *self.counts.entry(section).or_insert(0) += count;
        }
    }

    /// Take one instance of `section` out. Returns false if none was left.
    pub fn remove_one(&mut self, section: Section) -> bool {
        match self.counts.get_mut(&section) {
            Some(count) => {
                *count -= 1;
                if *count == 0 {
                    self.counts.remove(&section);
                }
                true
            }
            None => false,
        }
    }

    pub fn count(&self, section: Section) -> u32 {
        self.counts.get(&section).copied().unwrap_or(0)
    }

    /// Number of different labels still present.
    pub fn distinct(&self) -> usize {
        self.counts.len()
    }

    /// Distinct labels other than `excluded`, in table order.
    pub fn candidates_except(&self, excluded: Section) -> Vec<Section> {
        self.counts
            .keys()
            .copied()
            .filter(|&section| section != excluded)
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    pub fn total(&self) -> u32 {
        self.counts.values().sum()
    }
}

/// Parameters for one composition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComposeRequest {
    /// Base tempo in beats per minute, before jitter.
    pub tempo: u32,
    /// Names of scales riffs may draw from.
    pub scales: Vec<String>,
    /// How many sections to activate; values above 6 are clamped.
    pub complexity: i32,
}

impl ComposeRequest {
    pub fn new(tempo: u32, scales: Vec<String>, complexity: i32) -> Self {
        ComposeRequest {
            tempo,
            scales,
            complexity,
        }
    }

    fn validate(&self, scales: &ScaleRepository) -> Result<()> {
        if self.complexity <= 0 {
            return Err(Error::Bounds(format!(
                "complexity must be at least 1, got {}",
                self.complexity
            )));
        }
        if self.scales.is_empty() {
            return Err(Error::Bounds("scale pool is empty".to_string()));
        }
        if (self.tempo as i64) <= TEMPO_JITTER || (self.tempo as i64) > MAX_BASE_TEMPO {
            return Err(Error::Bounds(format!(
                "tempo must be within {}..={}, got {}",
                TEMPO_JITTER + 1,
                MAX_BASE_TEMPO,
                self.tempo
            )));
        }
        for name in &self.scales {
            scales.get(name)?;
        }
        Ok(())
    }
}

/// The riff scheduled for one section and how often it is repeated.
#[derive(Debug, Clone, Serialize)]
pub struct SectionRiff {
    pub riff: Riff,
    pub repeats: u32,
    pub base_note: PitchClass,
}

/// A composed piece: per-section riffs plus the order they are played in.
#[derive(Debug, Clone, Serialize)]
pub struct Song {
    pub tempo: u32,
    pub scale_pool: Vec<String>,
    pub complexity: usize,
    pub base_notes: Vec<PitchClass>,
    pub sections: BTreeMap<Section, SectionRiff>,
    /// Section sequence before block expansion.
    pub order: Vec<Section>,
    /// Final playback sequence.
    pub structure: Vec<Section>,
}

impl Song {
    /// Compose a song.
    ///
    /// Randomness is drawn in a fixed order: tempo, starting scale, root,
    /// one base note per section, then per section the riff scale, the riff
    /// itself and its repeat count, then sequencing and block expansion.
    /// Replaying the same random source reproduces the same song.
    pub fn compose<R: Rng + ?Sized>(
        request: &ComposeRequest,
        scales: &ScaleRepository,
        model: &PitchModel,
        rng: &mut R,
    ) -> Result<Self> {
        request.validate(scales)?;

        let tempo = request.tempo as i64 + rng.gen_range(-TEMPO_JITTER..=TEMPO_JITTER);
        let tempo = u32::try_from(tempo)
            .map_err(|_| Error::Bounds(format!("jittered tempo {} does not fit", tempo)))?;

        let start_scale = pick(&request.scales, rng)?;
        let start_root = *pick(&PitchClass::ALL, rng)?;
        let available_roots = scales.get(start_scale)?.notes_from(start_root, model);
        debug!(scale = %start_scale, root = %start_root, "picked key");

        let complexity = (request.complexity as usize).min(SECTION_TABLE.len());
        let active = &SECTION_TABLE[..complexity];

        let base_notes = active
            .iter()
            .map(|_| pick(&available_roots, rng).copied())
            .collect::<Result<Vec<PitchClass>>>()?;

        let mut sections = BTreeMap::new();
        for (template, &base_note) in active.iter().zip(&base_notes) {
            let scale_name = pick(&request.scales, rng)?;
            let riff = Riff::generate(base_note, scale_name, scales, model, rng)?;
            let repeats = rng.gen_range(template.min_repeat..=template.max_repeat);
            sections.insert(
                template.section,
                SectionRiff {
                    riff,
                    repeats,
                    base_note,
                },
            );
        }

        let repeats: BTreeMap<Section, u32> = sections
            .iter()
            .map(|(&section, entry)| (section, entry.repeats))
            .collect();
        let order = assemble_structure(&repeats, rng)?;

        // Bookend blocks are drawn after the body blocks.
        let body = expand_blocks(&order, rng);
        let mut structure = Vec::with_capacity(body.len() + 8);
        if sections.contains_key(&Section::Intro) {
            structure.extend(std::iter::repeat(Section::Intro).take(block_len(rng)));
        }
        structure.extend(body);
        if sections.contains_key(&Section::Outro) {
            structure.extend(std::iter::repeat(Section::Outro).take(block_len(rng)));
        }

        info!(
            tempo,
            complexity,
            sections = order.len(),
            blocks = structure.len(),
            "composed song"
        );

        Ok(Song {
            tempo,
            scale_pool: request.scales.clone(),
            complexity,
            base_notes,
            sections,
            order,
            structure,
        })
    }

    /// The riff for `section`, if that section is active.
    pub fn riff(&self, section: Section) -> Option<&Riff> {
        self.sections.get(&section).map(|entry| &entry.riff)
    }

    /// Total playback length in beats.
    pub fn beats(&self) -> f64 {
        self.structure
            .iter()
            .filter_map(|&section| self.riff(section))
            .map(Riff::beats)
            .sum()
    }
}

/// Sequence the non-bookend sections so that no label follows itself.
///
/// Every label goes into a pool `repeats[label]` times. The sequence starts
/// with a verse; while the pool still holds two or more distinct labels, one
/// label other than the last one played is drawn uniformly and taken out of
/// the pool. Whatever remains once a single label is left is discarded.
pub fn assemble_structure<R: Rng + ?Sized>(
    repeats: &BTreeMap<Section, u32>,
    rng: &mut R,
) -> Result<Vec<Section>> {
    if !repeats.contains_key(&Section::Verse) {
        return Err(Error::MissingRequiredSection(Section::Verse));
    }

    let mut pool = SectionCounter::new();
    for (&section, &count) in repeats {
        if !section.is_bookend() {
            pool.add(section, count);
        }
    }

    if !pool.remove_one(Section::Verse) {
        return Err(Error::MissingRequiredSection(Section::Verse));
    }
    let mut order = vec![Section::Verse];

    let mut last = Section::Verse;
    while pool.distinct() >= 2 {
        let candidates = pool.candidates_except(last);
        let next = *pick(&candidates, rng)?;
        pool.remove_one(next);
        order.push(next);
        last = next;
    }

    if !pool.is_empty() {
        warn!(
            section = %last,
            leftover = pool.total(),
            "fewer than two distinct sections left, discarding the rest"
        );
    }
    debug!(?order, "assembled section order");
    Ok(order)
}

/// Replace every entry with a block of two or four copies of itself.
pub fn expand_blocks<R: Rng + ?Sized>(order: &[Section], rng: &mut R) -> Vec<Section> {
    let mut expanded = Vec::with_capacity(order.len() * 4);
    for &section in order {
        expanded.extend(std::iter::repeat(section).take(block_len(rng)));
    }
    expanded
}

/// Two or four, with equal odds.
fn block_len<R: Rng + ?Sized>(rng: &mut R) -> usize {
    rng.gen_range(1..=2) * 2
}

fn pick<'a, T, R: Rng + ?Sized>(items: &'a [T], rng: &mut R) -> Result<&'a T> {
    items.choose(rng).ok_or(Error::EmptyDistribution)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::seeded_rng;
    use pretty_assertions::assert_eq;

    fn fixtures() -> (ScaleRepository, PitchModel) {
        (ScaleRepository::builtin().unwrap(), PitchModel::new())
    }

    fn request(complexity: i32) -> ComposeRequest {
        ComposeRequest::new(
            80,
            vec![
                "blues".to_string(),
                "enigmatica".to_string(),
                "orientale".to_string(),
            ],
            complexity,
        )
    }

    /// Lengths of maximal runs of equal labels.
    fn runs(structure: &[Section]) -> Vec<(Section, usize)> {
        let mut runs: Vec<(Section, usize)> = Vec::new();
        for &section in structure {
            match runs.last_mut() {
                Some((last, len)) if *last == section => *len += 1,
                _ => runs.push((section, 1)),
            }
        }
        runs
    }

    #[test]
    fn single_section_song_is_all_verse() {
        let (scales, model) = fixtures();
        let req = ComposeRequest::new(80, vec!["blues".to_string()], 1);
        for seed in 0..50 {
            let song = Song::compose(&req, &scales, &model, &mut seeded_rng(seed)).unwrap();
            assert_eq!(song.order, vec![Section::Verse]);
            assert!(song.structure.len() == 2 || song.structure.len() == 4);
            assert!(song.structure.iter().all(|&s| s == Section::Verse));
            assert_eq!(song.sections.len(), 1);
        }
    }

    #[test]
    fn zero_or_negative_complexity_is_rejected() {
        let (scales, model) = fixtures();
        for complexity in [0, -2] {
            let result = Song::compose(&request(complexity), &scales, &model, &mut seeded_rng(0));
            assert!(matches!(result, Err(Error::Bounds(_))));
        }
    }

    #[test]
    fn bad_pools_and_tempos_are_rejected() {
        let (scales, model) = fixtures();
        let empty = ComposeRequest::new(80, Vec::new(), 3);
        assert!(matches!(
            Song::compose(&empty, &scales, &model, &mut seeded_rng(0)),
            Err(Error::Bounds(_))
        ));

        let unknown = ComposeRequest::new(80, vec!["blues".to_string(), "polka".to_string()], 3);
        assert!(matches!(
            Song::compose(&unknown, &scales, &model, &mut seeded_rng(0)),
            Err(Error::UnknownScale(name)) if name == "polka"
        ));

        let slow = ComposeRequest::new(3, vec!["blues".to_string()], 3);
        assert!(matches!(
            Song::compose(&slow, &scales, &model, &mut seeded_rng(0)),
            Err(Error::Bounds(_))
        ));
    }

    #[test]
    fn complexity_is_clamped_to_the_section_table() {
        let (scales, model) = fixtures();
        let song = Song::compose(&request(10), &scales, &model, &mut seeded_rng(5)).unwrap();
        assert_eq!(song.complexity, 6);
        assert_eq!(song.sections.len(), 6);
        assert_eq!(song.base_notes.len(), 6);
        assert_eq!(song.structure.first(), Some(&Section::Intro));
        assert_eq!(song.structure.last(), Some(&Section::Outro));
    }

    #[test]
    fn tempo_stays_within_jitter() {
        let (scales, model) = fixtures();
        for seed in 0..50 {
            let song = Song::compose(&request(2), &scales, &model, &mut seeded_rng(seed)).unwrap();
            assert!((77..=83).contains(&song.tempo), "tempo {}", song.tempo);
        }
    }

    #[test]
    fn structure_is_built_from_blocks_of_two_or_four() {
        let (scales, model) = fixtures();
        for seed in 0..200 {
            let song = Song::compose(&request(6), &scales, &model, &mut seeded_rng(seed)).unwrap();
            for (section, len) in runs(&song.structure) {
                assert!(len == 2 || len == 4, "seed {}: {} run of {}", seed, section, len);
            }
            // Bookends only appear at the edges.
            let intro_run = runs(&song.structure)[0];
            assert_eq!(intro_run.0, Section::Intro);
            assert_eq!(
                song.structure.iter().filter(|&&s| s == Section::Intro).count(),
                intro_run.1
            );
        }
    }

    #[test]
    fn order_never_repeats_a_section_back_to_back() {
        let (scales, model) = fixtures();
        for seed in 0..200 {
            let song = Song::compose(&request(4), &scales, &model, &mut seeded_rng(seed)).unwrap();
            assert_eq!(song.order[0], Section::Verse);
            for pair in song.order.windows(2) {
                assert_ne!(pair[0], pair[1], "seed {}", seed);
            }
            for (&section, entry) in &song.sections {
                let used = song.order.iter().filter(|&&s| s == section).count() as u32;
                assert!(used <= entry.repeats);
            }
        }
    }

    #[test]
    fn repeat_counts_follow_the_table() {
        let (scales, model) = fixtures();
        for seed in 0..50 {
            let song = Song::compose(&request(6), &scales, &model, &mut seeded_rng(seed)).unwrap();
            for template in SECTION_TABLE {
                let entry = &song.sections[&template.section];
                assert!(entry.repeats >= template.min_repeat && entry.repeats <= template.max_repeat);
                assert_eq!(entry.riff.start_note, entry.base_note);
            }
        }
    }

    #[test]
    fn same_seed_same_song() {
        let (scales, model) = fixtures();
        let a = Song::compose(&request(6), &scales, &model, &mut seeded_rng(99)).unwrap();
        let b = Song::compose(&request(6), &scales, &model, &mut seeded_rng(99)).unwrap();
        assert_eq!(a.tempo, b.tempo);
        assert_eq!(a.base_notes, b.base_notes);
        assert_eq!(a.structure, b.structure);
        for (section, entry) in &a.sections {
            assert_eq!(entry.riff.notes, b.sections[section].riff.notes);
        }
    }

    #[test]
    fn tempo_near_the_integer_limit_is_rejected() {
        let (scales, model) = fixtures();
        for tempo in [u32::MAX, u32::MAX - 2] {
            let req = ComposeRequest::new(tempo, vec!["blues".to_string()], 1);
            for seed in 0..20 {
                let result = Song::compose(&req, &scales, &model, &mut seeded_rng(seed));
                assert!(matches!(result, Err(Error::Bounds(_))), "tempo {} seed {}", tempo, seed);
            }
        }

        let req = ComposeRequest::new(MAX_BASE_TEMPO as u32, vec!["blues".to_string()], 1);
        for seed in 0..20 {
            let song = Song::compose(&req, &scales, &model, &mut seeded_rng(seed)).unwrap();
            assert!(song.tempo >= MAX_BASE_TEMPO as u32 - 3);
        }
    }

    #[test]
    fn draws_follow_the_documented_order() {
        let (scales, model) = fixtures();
        let req = request(6);
        let song = Song::compose(&req, &scales, &model, &mut seeded_rng(17)).unwrap();

        let mut rng = seeded_rng(17);
        let tempo = 80 + rng.gen_range(-TEMPO_JITTER..=TEMPO_JITTER);
        let start_scale = req.scales.choose(&mut rng).unwrap();
        let root = *PitchClass::ALL.choose(&mut rng).unwrap();
        let roots = scales.get(start_scale).unwrap().notes_from(root, &model);
        let base_notes: Vec<PitchClass> = (0..6)
            .map(|_| *roots.choose(&mut rng).unwrap())
            .collect();
        let verse_scale = req.scales.choose(&mut rng).unwrap();
        let opening = crate::weights::choose(crate::weights::duration_table(), &mut rng).unwrap();

        assert_eq!(song.tempo as i64, tempo);
        assert_eq!(song.base_notes, base_notes);
        let verse = &song.sections[&Section::Verse];
        assert_eq!(verse.base_note, base_notes[0]);
        assert_eq!(&verse.riff.scale, verse_scale);
        assert_eq!(verse.riff.notes[0].duration, opening);
    }

    #[test]
    fn assembly_rejects_a_verse_with_no_repeats() {
        let repeats = BTreeMap::from([(Section::Verse, 0), (Section::Chorus, 2), (Section::Solo, 2)]);
        for seed in 0..10 {
            let result = assemble_structure(&repeats, &mut seeded_rng(seed));
            assert!(matches!(result, Err(Error::MissingRequiredSection(Section::Verse))));
        }
    }

    #[test]
    fn assembly_requires_a_verse() {
        let repeats = BTreeMap::from([(Section::Chorus, 2), (Section::Solo, 1)]);
        let result = assemble_structure(&repeats, &mut seeded_rng(0));
        assert!(matches!(result, Err(Error::MissingRequiredSection(Section::Verse))));
    }

    #[test]
    fn assembly_alternates_when_forced() {
        let repeats = BTreeMap::from([(Section::Verse, 2), (Section::Chorus, 2)]);
        for seed in 0..20 {
            let order = assemble_structure(&repeats, &mut seeded_rng(seed)).unwrap();
            assert_eq!(order, vec![Section::Verse, Section::Chorus, Section::Verse]);
        }
    }

    #[test]
    fn assembly_discards_a_lone_leftover_label() {
        let repeats = BTreeMap::from([(Section::Verse, 1), (Section::Chorus, 3), (Section::Intro, 1)]);
        let order = assemble_structure(&repeats, &mut seeded_rng(0)).unwrap();
        assert_eq!(order, vec![Section::Verse]);
    }

    #[test]
    fn expansion_uses_blocks_of_two_or_four() {
        let order = [Section::Verse, Section::Chorus, Section::Verse];
        let expanded = expand_blocks(&order, &mut seeded_rng(8));
        let blocks = runs(&expanded);
        assert_eq!(blocks.len(), 3);
        for ((section, len), expected) in blocks.into_iter().zip(order) {
            assert_eq!(section, expected);
            assert!(len == 2 || len == 4);
        }
    }

    #[test]
    fn counter_tracks_distinct_labels() {
        let mut counter = SectionCounter::new();
        counter.add(Section::Solo, 1);
        counter.add(Section::Verse, 2);
        counter.add(Section::Chorus, 0);
        assert_eq!(counter.distinct(), 2);
        assert_eq!(counter.total(), 3);
        assert_eq!(counter.candidates_except(Section::Chorus), vec![Section::Verse, Section::Solo]);
        assert!(counter.remove_one(Section::Solo));
        assert!(!counter.remove_one(Section::Solo));
        assert_eq!(counter.count(Section::Verse), 2);
        assert_eq!(counter.candidates_except(Section::Verse), Vec::<Section>::new());
    }
}
