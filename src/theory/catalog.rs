// Chord and scale templates, pre-rotated through all twelve roots

use serde::{Deserialize, Serialize};

use super::pitch::{PitchClass, PitchClassSet};
use super::{Result, TheoryError};

/// An interval pattern relative to a root.
///
/// Intervals are semitone offsets, first one always 0. Values above 11 are
/// compound intervals (a ninth is 14, not 2) and are kept as written; only the
/// signature folds them into the octave.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChordTemplate {
    pub name: String,
    pub intervals: Vec<u8>,
}

impl ChordTemplate {
    pub fn new(name: impl Into<String>, intervals: &[u8]) -> Self {
        Self {
            name: name.into(),
            intervals: intervals.to_vec(),
        }
    }

    /// Bitmask of this template rooted at `root`.
    pub fn signature(&self, root: PitchClass) -> PitchClassSet {
        self.intervals.iter().fold(PitchClassSet::EMPTY, |set, &interval| {
            set.with(root.transpose(interval as i32))
        })
    }

    /// Number of distinct pitch classes the template covers
    pub fn pitch_class_count(&self) -> usize {
        self.signature(PitchClass::C).len()
    }

    fn validate(&self) -> Result<()> {
        match self.intervals.first() {
            None => Err(TheoryError::InvalidTemplate(format!(
                "'{}' has no intervals",
                self.name
            ))),
            Some(&first) if first != 0 => Err(TheoryError::InvalidTemplate(format!(
                "'{}' starts at {} instead of the root",
                self.name, first
            ))),
            _ => Ok(()),
        }
    }
}

/// A template together with its twelve rooted signatures
#[derive(Debug, Clone)]
pub struct CatalogEntry {
    pub template: ChordTemplate,
    signatures: [PitchClassSet; 12],
}

impl CatalogEntry {
    fn build(template: ChordTemplate) -> Self {
        let mut signatures = [PitchClassSet::EMPTY; 12];
        for root in PitchClass::all() {
            signatures[root.index()] = template.signature(root);
        }
        Self {
            template,
            signatures,
        }
    }

    pub fn signature(&self, root: PitchClass) -> PitchClassSet {
        self.signatures[root.index()]
    }

    pub fn signatures(&self) -> &[PitchClassSet; 12] {
        &self.signatures
    }

    pub fn name(&self) -> &str {
        &self.template.name
    }

    /// Smallest rotation that maps the signature onto itself (12 when none does).
    pub fn rotational_period(&self) -> usize {
        (1..12)
            .find(|&p| self.signatures[p] == self.signatures[0])
            .unwrap_or(12)
    }
}

/// Immutable, ordered table of templates.
///
/// Order is priority: earlier entries are matched (and seed combined chords)
/// before later ones.
#[derive(Debug, Clone)]
pub struct ChordCatalog {
    entries: Vec<CatalogEntry>,
}

impl ChordCatalog {
    /// Validate the templates and precompute every rotation.
    pub fn new(templates: Vec<ChordTemplate>) -> Result<Self> {
        for template in &templates {
            template.validate()?;
        }

        let entries: Vec<CatalogEntry> = templates.into_iter().map(CatalogEntry::build).collect();
        log::debug!("Built chord catalog with {} templates", entries.len());

        Ok(Self { entries })
    }

    /// The chord table: extended chords, sevenths, triads, suspended triads, fifth.
    pub fn standard() -> Self {
        Self::from_static(STANDARD_CHORDS)
    }

    /// The scale table: modes, heptatonic, pentatonic and other scales.
    pub fn scales() -> Self {
        Self::from_static(SCALES)
    }

    fn from_static(table: &[(&str, &[u8])]) -> Self {
        let entries = table
            .iter()
            .map(|(name, intervals)| CatalogEntry::build(ChordTemplate::new(*name, intervals)))
            .collect();
        Self { entries }
    }

    pub fn entries(&self) -> &[CatalogEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&CatalogEntry> {
        self.entries.get(index)
    }

    pub fn find(&self, name: &str) -> Option<&CatalogEntry> {
        self.entries.iter().find(|e| e.template.name == name)
    }

    /// Signature of template `index` rooted at `root` (0..11).
    pub fn signature_for(&self, index: usize, root: u8) -> Result<PitchClassSet> {
        let root = PitchClass::root(root)?;
        self.entries
            .get(index)
            .map(|entry| entry.signature(root))
            .ok_or(TheoryError::UnknownTemplate(index))
    }
}

impl Default for ChordCatalog {
    fn default() -> Self {
        Self::standard()
    }
}

const STANDARD_CHORDS: &[(&str, &[u8])] = &[
    // Extended chords: voicings above the seventh
    ("Dominant thirteenth Chord", &[0, 4, 7, 10, 14, 21]),
    ("Major eleventh Chord", &[0, 4, 7, 11, 14, 17]),
    ("Dominant ninth Chord", &[0, 4, 7, 10, 14]),
    ("Major ninth Chord", &[0, 4, 7, 11, 14]),
    ("Minor ninth Chord", &[0, 3, 7, 10, 14]),
    // Tertian seventh chords: stacked major and/or minor thirds
    ("Major seventh Chord", &[0, 4, 7, 11]),
    ("Minor seventh Chord", &[0, 3, 7, 10]),
    ("Dominant seventh Chord", &[0, 4, 7, 10]),
    ("Diminished seventh Chord", &[0, 3, 6, 9]),
    ("Half-diminished seventh Chord", &[0, 3, 6, 10]),
    ("Minor major seventh Chord", &[0, 3, 7, 11]),
    ("Augmented major seventh Chord", &[0, 4, 8, 11]),
    // Non-tertian seventh chords: augmented or diminished thirds
    ("Augmented minor seventh Chord", &[0, 4, 8, 10]),
    ("Diminished major seventh Chord", &[0, 3, 6, 11]),
    ("Dominant seventh flat five Chord", &[0, 4, 6, 10]),
    ("Major seventh flat five Chord", &[0, 4, 6, 11]),
    // Primary triads
    ("Major Triad", &[0, 4, 7]),
    ("Minor Triad", &[0, 3, 7]),
    ("Diminished Triad", &[0, 3, 6]),
    ("Augmented Triad", &[0, 4, 8]),
    // Suspended triads
    ("Sus2 Triad", &[0, 2, 7]),
    ("Sus4 Triad", &[0, 5, 7]),
    // Dyads
    ("Perfect fifth", &[0, 7]),
];

const SCALES: &[(&str, &[u8])] = &[
    // Diatonic modes
    ("Lydian", &[0, 2, 4, 6, 7, 9, 11]),
    ("Ionian", &[0, 2, 4, 5, 7, 9, 11]),
    ("Mixolydian", &[0, 2, 4, 5, 7, 9, 10]),
    ("Dorian", &[0, 2, 3, 5, 7, 9, 10]),
    ("Aeolian", &[0, 2, 3, 5, 7, 8, 10]),
    ("Phrygian", &[0, 1, 3, 5, 7, 8, 10]),
    ("Locrian", &[0, 1, 3, 5, 6, 8, 10]),
    // Melodic modes
    ("Lydian sharp fifth", &[0, 2, 4, 6, 8, 9, 11]),
    ("Lydian/Mixolydian", &[0, 2, 4, 6, 7, 9, 10]),
    ("Melodic minor", &[0, 2, 3, 5, 7, 9, 11]),
    ("Mixolydian/Aeolian", &[0, 2, 4, 5, 7, 8, 10]),
    ("Dorian/Phrygian", &[0, 1, 3, 5, 7, 9, 10]),
    ("Aeolian/Locrian", &[0, 2, 3, 5, 6, 8, 10]),
    ("Locrian flat fourth", &[0, 1, 3, 4, 6, 8, 10]),
    // Major and minor heptatonic
    ("Harmonic major", &[0, 2, 4, 5, 7, 8, 11]),
    ("Locrian major", &[0, 2, 4, 5, 6, 8, 10]),
    ("Harmonic minor", &[0, 2, 3, 5, 7, 8, 11]),
    // Pentatonic
    ("Major pentatonic", &[0, 2, 4, 7, 9]),
    ("Blues major pentatonic", &[0, 2, 5, 7, 9]),
    ("Suspended pentatonic", &[0, 2, 5, 7, 10]),
    ("Minor pentatonic", &[0, 3, 5, 7, 10]),
    ("Blues minor pentatonic", &[0, 3, 5, 8, 10]),
    // Other scales
    ("Neapolitan major", &[0, 1, 3, 5, 7, 9, 11]),
    ("Neapolitan minor", &[0, 1, 3, 5, 7, 8, 11]),
    ("Bebop dominant", &[0, 2, 4, 5, 7, 9, 10, 11]),
    ("Bebop major", &[0, 2, 4, 5, 7, 8, 9, 11]),
    ("Bebop dorian", &[0, 2, 3, 4, 5, 7, 9, 10]),
    ("Bebop dorian (major seventh)", &[0, 2, 3, 5, 7, 9, 10, 11]),
    ("Bebop melodic minor", &[0, 2, 3, 5, 7, 8, 9, 11]),
    ("Bebop harmonic minor", &[0, 2, 3, 5, 7, 8, 10, 11]),
    ("Bebop locrian", &[0, 1, 3, 5, 6, 7, 8, 10]),
    ("Arabian", &[0, 1, 4, 5, 7, 8, 11]),
    ("Blues", &[0, 4, 6, 7, 8, 10]),
    ("Enigmatic", &[0, 1, 4, 6, 8, 10, 11]),
    ("Japanese", &[0, 1, 5, 7, 10]),
    ("Hungarian minor", &[0, 2, 3, 6, 7, 8, 11]),
    ("Whole tone", &[0, 2, 4, 6, 8, 10]),
    ("Diminished", &[0, 2, 3, 5, 6, 8, 9, 11]),
    ("Chromatic", &[0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11]),
];
