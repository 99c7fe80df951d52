// Greedy merge of overlapping chord matches into maximal chords

use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, VecDeque};
use std::fmt;

use super::matcher::ChordMatch;
use super::pitch::{PitchClass, PitchClassSet};

/// A maximal chord built from one seed match and everything merged into it.
///
/// `intervals` are relative to `root`, sorted and distinct. Intervals merged
/// from a differently rooted match are offset into the seed's frame but not
/// reduced modulo 12, so compound intervals (a ninth as 14) survive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CombinedChord {
    pub signature: PitchClassSet,
    pub root: PitchClass,
    pub name: String,
    pub intervals: Vec<u8>,
}

impl fmt::Display for CombinedChord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} on {}", self.name, self.root)
    }
}

impl From<CombinedChord> for ChordMatch {
    fn from(chord: CombinedChord) -> Self {
        ChordMatch {
            signature: chord.signature,
            root: chord.root,
            name: chord.name,
            intervals: chord.intervals,
        }
    }
}

/// Accumulator for the chord currently being grown
struct Seed {
    signature: PitchClassSet,
    root: PitchClass,
    name: String,
    intervals: BTreeSet<u8>,
}

impl Seed {
    fn new(seed: ChordMatch) -> Self {
        Self {
            signature: seed.signature,
            root: seed.root,
            name: seed.name,
            intervals: seed.intervals.into_iter().collect(),
        }
    }

    fn absorb(&mut self, other: ChordMatch) {
        self.signature = self.signature.union(other.signature);

        let offset = other.root.semitones_above(self.root);
        self.intervals
            .extend(other.intervals.iter().map(|&i| i.saturating_add(offset)));

        if other.root == self.root {
            self.name.push_str(&format!(" + {}", other.name));
        } else {
            self.name.push_str(&format!(" + {} on {}", other.name, other.root));
        }
    }

    fn finish(self) -> CombinedChord {
        CombinedChord {
            signature: self.signature,
            root: self.root,
            name: self.name,
            intervals: self.intervals.into_iter().collect(),
        }
    }
}

/// Collapse a match list into maximal, pairwise disjoint chords.
///
/// The first pending match seeds a chord. Candidates whose signature is
/// already covered are dropped, partially overlapping ones are merged (and
/// the scan restarts, since the grown signature may now reach candidates it
/// passed over), disjoint ones wait for a later seed. Output is in seed order.
pub fn combine_matches(matches: Vec<ChordMatch>) -> Vec<CombinedChord> {
    let mut pending: VecDeque<ChordMatch> = matches.into();
    let mut combined = Vec::new();

    while let Some(first) = pending.pop_front() {
        let mut seed = Seed::new(first);

        let mut index = 0;
        while index < pending.len() {
            let candidate = pending[index].signature;
            if seed.signature.is_superset_of(candidate) {
                pending.remove(index);
            } else if seed.signature.overlaps(candidate) {
                if let Some(other) = pending.remove(index) {
                    log::trace!("Merging {} on {} into {}", other.name, other.root, seed.name);
                    seed.absorb(other);
                }
                index = 0;
            } else {
                index += 1;
            }
        }

        combined.push(seed.finish());
    }

    combined
}
