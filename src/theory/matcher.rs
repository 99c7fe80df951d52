// Subset matching of catalog signatures against an active pitch-class set

use serde::{Deserialize, Serialize};

use super::catalog::ChordCatalog;
use super::pitch::{PitchClass, PitchClassSet};

/// One (template, root) whose signature is contained in the active set
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChordMatch {
    pub signature: PitchClassSet,
    pub root: PitchClass,
    pub name: String,
    pub intervals: Vec<u8>,
}

/// Order in which roots are scanned for every template
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RootOrder {
    /// 0, 1, ..., 11
    #[default]
    Ascending,
    /// h, h+1, ..., h+11 (mod 12)
    StartingAt(PitchClass),
}

impl RootOrder {
    pub fn roots(self) -> impl Iterator<Item = PitchClass> {
        let start = match self {
            RootOrder::Ascending => PitchClass::C,
            RootOrder::StartingAt(hint) => hint,
        };
        (0..12).map(move |step| start.transpose(step))
    }
}

/// Every match whose signature is a subset of `active`.
///
/// Results are grouped by catalog order, then by root in `order`. An empty
/// set matches nothing.
pub fn match_chords(
    active: PitchClassSet,
    catalog: &ChordCatalog,
    order: RootOrder,
) -> Vec<ChordMatch> {
    if active.is_empty() {
        return Vec::new();
    }

    let mut matches = Vec::new();
    for entry in catalog.entries() {
        for root in order.roots() {
            let signature = entry.signature(root);
            if active.is_superset_of(signature) {
                matches.push(ChordMatch {
                    signature,
                    root,
                    name: entry.template.name.clone(),
                    intervals: entry.template.intervals.clone(),
                });
            }
        }
    }
    matches
}

/// Every (template, root) whose signature contains all of `active`.
///
/// Used with [`ChordCatalog::scales`] to list the scales that could host a
/// set of notes. An empty set returns nothing.
pub fn scales_containing(active: PitchClassSet, catalog: &ChordCatalog) -> Vec<ChordMatch> {
    if active.is_empty() {
        return Vec::new();
    }

    let mut found = Vec::new();
    for entry in catalog.entries() {
        for root in PitchClass::all() {
            let signature = entry.signature(root);
            // Symmetric scales repeat signatures; report each distinct one once
            let seen = found
                .iter()
                .any(|m: &ChordMatch| m.signature == signature && m.name == entry.template.name);
            if signature.is_superset_of(active) && !seen {
                found.push(ChordMatch {
                    signature,
                    root,
                    name: entry.template.name.clone(),
                    intervals: entry.template.intervals.clone(),
                });
            }
        }
    }
    found
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_set_matches_nothing() {
        let catalog = ChordCatalog::standard();
        assert!(match_chords(PitchClassSet::EMPTY, &catalog, RootOrder::Ascending).is_empty());
        assert!(scales_containing(PitchClassSet::EMPTY, &ChordCatalog::scales()).is_empty());
    }

    #[test]
    fn test_triad_matches_in_catalog_order() {
        let catalog = ChordCatalog::standard();
        let c_major = PitchClassSet::from_pitch_classes(&[0, 4, 7]);
        let matches = match_chords(c_major, &catalog, RootOrder::Ascending);

        let found: Vec<(&str, u8)> = matches.iter().map(|m| (m.name.as_str(), m.root.value())).collect();
        assert_eq!(found, vec![("Major Triad", 0), ("Perfect fifth", 0)]);
    }

    #[test]
    fn test_extra_notes_do_not_block_a_match() {
        let catalog = ChordCatalog::standard();
        let cluster = PitchClassSet::from_pitch_classes(&[0, 1, 4, 7]);
        let matches = match_chords(cluster, &catalog, RootOrder::Ascending);
        assert!(matches.iter().any(|m| m.name == "Major Triad" && m.root == PitchClass::C));
    }

    #[test]
    fn test_root_order_starting_at_hint() {
        let hint = PitchClass::root(10).unwrap();
        let roots: Vec<u8> = RootOrder::StartingAt(hint).roots().map(PitchClass::value).collect();
        assert_eq!(roots, vec![10, 11, 0, 1, 2, 3, 4, 5, 6, 7, 8, 9]);

        let ascending: Vec<u8> = RootOrder::Ascending.roots().map(PitchClass::value).collect();
        let from_c: Vec<u8> = RootOrder::StartingAt(PitchClass::C).roots().map(PitchClass::value).collect();
        assert_eq!(ascending, from_c);
    }

    #[test]
    fn test_symmetric_chord_matches_every_rotation() {
        let catalog = ChordCatalog::standard();
        let dim7 = PitchClassSet::from_pitch_classes(&[0, 3, 6, 9]);
        let roots: Vec<u8> = match_chords(dim7, &catalog, RootOrder::Ascending)
            .into_iter()
            .filter(|m| m.name == "Diminished seventh Chord")
            .map(|m| m.root.value())
            .collect();
        assert_eq!(roots, vec![0, 3, 6, 9]);
    }

    #[test]
    fn test_scales_containing_c_major_triad() {
        let scales = ChordCatalog::scales();
        let c_major = PitchClassSet::from_pitch_classes(&[0, 4, 7]);
        let hosts = scales_containing(c_major, &scales);

        assert!(hosts.iter().any(|m| m.name == "Ionian" && m.root == PitchClass::C));
        assert!(hosts.iter().any(|m| m.name == "Ionian" && m.root.value() == 7));
        assert!(hosts.iter().any(|m| m.name == "Aeolian" && m.root.value() == 9));
        assert!(!hosts.iter().any(|m| m.name == "Ionian" && m.root.value() == 2));
        assert_eq!(hosts.iter().filter(|m| m.name == "Chromatic").count(), 1);
    }
}
