// Pitch-class harmony: chord signatures, chord matching and key finding
//
// Everything in here is pure computation over 12-bit pitch-class masks and
// 12-bin histograms. Callers pass snapshots by value; nothing here locks.

pub mod catalog;
pub mod combiner;
pub mod key;
pub mod matcher;
pub mod pitch;
pub mod profiles;
pub mod spelling;

pub use catalog::{CatalogEntry, ChordCatalog, ChordTemplate};
pub use combiner::{combine_matches, CombinedChord};
pub use key::{find_key, CorrelationMethod, KeyCandidate, KeyCorrelator, KeyScores, Mode};
pub use matcher::{match_chords, scales_containing, ChordMatch, RootOrder};
pub use pitch::{PitchClass, PitchClassSet};
pub use profiles::{KeyProfile, ProfileKind, ProfilePair};

/// Error type for harmony computations
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TheoryError {
    #[error("Root {0} is outside 0..11")]
    InvalidRoot(u8),

    #[error("Pitch class {0} is outside 0..11")]
    InvalidPitchClass(u8),

    #[error("Pitch class delta must be +1 or -1, got {0}")]
    InvalidDelta(i32),

    #[error("No chord template at catalog index {0}")]
    UnknownTemplate(usize),

    #[error("Invalid chord template: {0}")]
    InvalidTemplate(String),

    #[error("Invalid key profile: {0}")]
    InvalidProfile(String),

    #[error("Invalid histogram: {0}")]
    InvalidHistogram(String),

    #[error("Histogram has no variance, no key can be determined")]
    DegenerateHistogram,
}

pub type Result<T> = std::result::Result<T, TheoryError>;

/// Find the combined chords present in a pitch-class mask.
///
/// Matches every catalog template against `mask` (roots scanned starting at
/// `root_hint`) and merges the overlapping matches into maximal chords.
pub fn find_chords(
    mask: PitchClassSet,
    root_hint: u8,
    catalog: &ChordCatalog,
) -> Result<Vec<CombinedChord>> {
    let hint = PitchClass::root(root_hint)?;
    let matches = match_chords(mask, catalog, RootOrder::StartingAt(hint));
    log::debug!(
        "Mask {:#05x}: {} raw matches (root hint {})",
        mask.bits(),
        matches.len(),
        hint
    );
    Ok(combine_matches(matches))
}
