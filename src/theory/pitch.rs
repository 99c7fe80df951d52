// Pitch classes and 12-bit pitch-class sets

use serde::{Deserialize, Serialize};
use std::fmt;

use super::{Result, TheoryError};

/// Sharp-based names indexed by pitch class (0 = C)
pub const NOTE_NAMES: [&str; 12] = [
    "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
];

/// All twelve pitch classes set
pub const FULL_MASK: u16 = 0x0FFF;

/// A chromatic pitch class, 0 (C) to 11 (B)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct PitchClass(u8);

impl PitchClass {
    pub const C: PitchClass = PitchClass(0);

    /// Checked constructor for a pitch class coming from tracker input.
    pub fn new(value: u8) -> Result<Self> {
        if value < 12 {
            Ok(Self(value))
        } else {
            Err(TheoryError::InvalidPitchClass(value))
        }
    }

    /// Checked constructor for a chord or key root.
    pub fn root(value: u8) -> Result<Self> {
        if value < 12 {
            Ok(Self(value))
        } else {
            Err(TheoryError::InvalidRoot(value))
        }
    }

    /// Pitch class of a MIDI note number (octave folded away).
    pub fn from_midi_note(note: u8) -> Self {
        Self(note % 12)
    }

    /// Reduce any integer modulo 12.
    pub fn wrapping(value: i32) -> Self {
        Self(value.rem_euclid(12) as u8)
    }

    pub fn value(self) -> u8 {
        self.0
    }

    pub fn index(self) -> usize {
        self.0 as usize
    }

    /// Transpose up by `semitones` (may be negative), wrapping around the octave.
    pub fn transpose(self, semitones: i32) -> Self {
        Self::wrapping(self.0 as i32 + semitones)
    }

    /// Upward distance in semitones from `other` to `self`, 0..11.
    pub fn semitones_above(self, other: PitchClass) -> u8 {
        (self.0 + 12 - other.0) % 12
    }

    pub fn name(self) -> &'static str {
        NOTE_NAMES[self.index()]
    }

    /// All pitch classes in ascending order
    pub fn all() -> impl Iterator<Item = PitchClass> {
        (0..12).map(PitchClass)
    }
}

impl fmt::Display for PitchClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl TryFrom<u8> for PitchClass {
    type Error = TheoryError;

    fn try_from(value: u8) -> Result<Self> {
        PitchClass::root(value)
    }
}

impl From<PitchClass> for u8 {
    fn from(pc: PitchClass) -> u8 {
        pc.0
    }
}

/// Set of active pitch classes; bit `i` set means pitch class `i` is present.
///
/// The value is always within `0..=0xFFF`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "u16", into = "u16")]
pub struct PitchClassSet(u16);

impl PitchClassSet {
    pub const EMPTY: PitchClassSet = PitchClassSet(0);
    pub const CHROMATIC: PitchClassSet = PitchClassSet(FULL_MASK);

    /// Build from raw bits; anything above bit 11 is dropped.
    pub fn from_bits(bits: u16) -> Self {
        Self(bits & FULL_MASK)
    }

    /// Build from pitch-class numbers, folding each modulo 12.
    pub fn from_pitch_classes(classes: &[u8]) -> Self {
        classes
            .iter()
            .fold(Self::EMPTY, |set, &pc| set.with(PitchClass::from_midi_note(pc)))
    }

    /// Build from MIDI note numbers.
    pub fn from_midi_notes(notes: &[u8]) -> Self {
        Self::from_pitch_classes(notes)
    }

    pub fn bits(self) -> u16 {
        self.0
    }

    pub fn with(self, pc: PitchClass) -> Self {
        Self(self.0 | (1 << pc.0))
    }

    pub fn without(self, pc: PitchClass) -> Self {
        Self(self.0 & !(1 << pc.0))
    }

    pub fn contains(self, pc: PitchClass) -> bool {
        self.0 & (1 << pc.0) != 0
    }

    /// True when every pitch class of `other` is also in `self`.
    pub fn is_superset_of(self, other: PitchClassSet) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn is_subset_of(self, other: PitchClassSet) -> bool {
        other.is_superset_of(self)
    }

    /// True when the two sets share at least one pitch class.
    pub fn overlaps(self, other: PitchClassSet) -> bool {
        self.0 & other.0 != 0
    }

    pub fn union(self, other: PitchClassSet) -> Self {
        Self(self.0 | other.0)
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn len(self) -> usize {
        self.0.count_ones() as usize
    }

    /// Rotate every member up by `semitones`.
    pub fn transpose(self, semitones: i32) -> Self {
        let shift = semitones.rem_euclid(12) as u32;
        let bits = self.0 as u32;
        let rotated = ((bits << shift) | (bits >> (12 - shift))) & FULL_MASK as u32;
        Self(rotated as u16)
    }

    /// Members in ascending order
    pub fn iter(self) -> impl Iterator<Item = PitchClass> {
        PitchClass::all().filter(move |pc| self.contains(*pc))
    }
}

impl From<u16> for PitchClassSet {
    fn from(bits: u16) -> Self {
        Self::from_bits(bits)
    }
}

impl From<PitchClassSet> for u16 {
    fn from(set: PitchClassSet) -> u16 {
        set.0
    }
}

impl FromIterator<PitchClass> for PitchClassSet {
    fn from_iter<I: IntoIterator<Item = PitchClass>>(iter: I) -> Self {
        iter.into_iter().fold(Self::EMPTY, |set, pc| set.with(pc))
    }
}

impl fmt::Display for PitchClassSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.iter().map(PitchClass::name).collect();
        write!(f, "{{{}}}", names.join(", "))
    }
}

/// Parse a note name ("C", "F#", "Bb", "e") or a MIDI note number into a pitch class.
pub fn parse_pitch_class(text: &str) -> Option<PitchClass> {
    if let Ok(number) = text.parse::<u8>() {
        return Some(PitchClass::from_midi_note(number));
    }

    let mut chars = text.trim().chars();
    let letter = chars.next()?.to_ascii_uppercase();
    let base: i32 = match letter {
        'C' => 0,
        'D' => 2,
        'E' => 4,
        'F' => 5,
        'G' => 7,
        'A' => 9,
        'B' => 11,
        _ => return None,
    };

    let mut offset = 0;
    for accidental in chars {
        match accidental {
            '#' | '♯' => offset += 1,
            'b' | '♭' => offset -= 1,
            'x' => offset += 2,
            _ => return None,
        }
    }

    Some(PitchClass::wrapping(base + offset))
}
