// Key finding by circular correlation against major/minor key profiles

use serde::{Deserialize, Serialize};
use std::fmt;

use super::pitch::PitchClass;
use super::profiles::{zscore, ProfilePair};
use super::spelling::KeySpelling;
use super::{Result, TheoryError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Major,
    Minor,
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::Major => f.write_str("major"),
            Mode::Minor => f.write_str("minor"),
        }
    }
}

/// One of the 24 keys with its score for a given histogram
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct KeyCandidate {
    pub root: PitchClass,
    pub mode: Mode,
    pub score: f64,
}

impl KeyCandidate {
    /// Pearson correlation coefficient in [-1, 1].
    ///
    /// Only meaningful for [`CorrelationMethod::Pearson`] scores, which are a
    /// dot product of two z-scored 12-vectors.
    pub fn correlation(&self) -> f64 {
        self.score / 12.0
    }

    /// Key name spelled for its signature, e.g. "Eb minor"
    pub fn name(&self) -> String {
        format!(
            "{} {}",
            KeySpelling::for_key(self.root, self.mode).tonic_name(),
            self.mode
        )
    }
}

impl fmt::Display for KeyCandidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name())
    }
}

/// How a histogram is compared against a profile
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CorrelationMethod {
    /// Dot product of the z-scored histogram and z-scored profile
    #[default]
    Pearson,
    /// Raw profile weights summed over the pitch classes present in the histogram
    WeightedSum,
}

/// Scores for all 24 keys.
///
/// Stored in scan order: the twelve major keys from C, then the twelve minor
/// keys from C. Ties resolve to the earlier entry, so major wins over minor
/// and a lower root over a higher one.
#[derive(Debug, Clone, PartialEq)]
pub struct KeyScores {
    candidates: Vec<KeyCandidate>,
    method: CorrelationMethod,
}

impl KeyScores {
    pub fn method(&self) -> CorrelationMethod {
        self.method
    }

    pub fn iter(&self) -> impl Iterator<Item = &KeyCandidate> {
        self.candidates.iter()
    }

    /// Highest scoring key; the first one in scan order on a tie.
    pub fn best(&self) -> KeyCandidate {
        let mut best = self.candidates[0];
        for candidate in &self.candidates[1..] {
            if tie_key(candidate.score) > tie_key(best.score) {
                best = *candidate;
            }
        }
        best
    }

    /// All 24 keys, best first
    pub fn ranked(&self) -> Vec<KeyCandidate> {
        let mut ranked = self.candidates.clone();
        // Stable, so equal scores keep scan order
        ranked.sort_by_key(|c| std::cmp::Reverse(tie_key(c.score)));
        ranked
    }

    pub fn top(&self, n: usize) -> Vec<KeyCandidate> {
        let mut ranked = self.ranked();
        ranked.truncate(n);
        ranked
    }

    /// Margin between the best key and the runner-up
    pub fn clarity(&self) -> f64 {
        let ranked = self.ranked();
        ranked[0].score - ranked[1].score
    }

    pub fn get(&self, root: PitchClass, mode: Mode) -> KeyCandidate {
        let offset = match mode {
            Mode::Major => 0,
            Mode::Minor => 12,
        };
        self.candidates[offset + root.index()]
    }
}

/// Scores histograms against one profile pair
#[derive(Debug, Clone, Default)]
pub struct KeyCorrelator {
    profiles: ProfilePair,
    method: CorrelationMethod,
}

impl KeyCorrelator {
    pub fn new(profiles: ProfilePair) -> Self {
        Self {
            profiles,
            method: CorrelationMethod::Pearson,
        }
    }

    pub fn with_method(mut self, method: CorrelationMethod) -> Self {
        self.method = method;
        self
    }

    pub fn profiles(&self) -> &ProfilePair {
        &self.profiles
    }

    pub fn method(&self) -> CorrelationMethod {
        self.method
    }

    /// Score every key against `histogram`.
    ///
    /// Bins must be finite and non-negative. A histogram with no variance
    /// (silence, or every class equal) has no key and yields
    /// [`TheoryError::DegenerateHistogram`].
    pub fn scores(&self, histogram: &[f64; 12]) -> Result<KeyScores> {
        if let Some((pc, bad)) = histogram
            .iter()
            .enumerate()
            .find(|(_, w)| !w.is_finite() || **w < 0.0)
        {
            return Err(TheoryError::InvalidHistogram(format!(
                "bin {} has weight {}",
                pc, bad
            )));
        }

        let (observed, major, minor) = match self.method {
            CorrelationMethod::Pearson => {
                let observed = zscore(histogram).ok_or(TheoryError::DegenerateHistogram)?;
                (observed, *self.profiles.major_z(), *self.profiles.minor_z())
            }
            CorrelationMethod::WeightedSum => {
                let mut present = [0.0; 12];
                for (p, w) in present.iter_mut().zip(histogram) {
                    if *w > 0.0 {
                        *p = 1.0;
                    }
                }
                let count = present.iter().filter(|p| **p > 0.0).count();
                if count == 0 || count == 12 {
                    return Err(TheoryError::DegenerateHistogram);
                }
                (present, self.profiles.major().0, self.profiles.minor().0)
            }
        };

        let mut candidates = Vec::with_capacity(24);
        for (mode, profile) in [(Mode::Major, &major), (Mode::Minor, &minor)] {
            for root in PitchClass::all() {
                candidates.push(KeyCandidate {
                    root,
                    mode,
                    score: rotated_dot(&observed, profile, root),
                });
            }
        }

        Ok(KeyScores {
            candidates,
            method: self.method,
        })
    }

    /// Best key for `histogram`, or `None` when it has no variance.
    pub fn best(&self, histogram: &[f64; 12]) -> Result<Option<KeyCandidate>> {
        match self.scores(histogram) {
            Ok(scores) => Ok(Some(scores.best())),
            Err(TheoryError::DegenerateHistogram) => {
                log::debug!("No key for histogram without variance: {:?}", histogram);
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }
}

/// Scores closer than this count as equal
const TIE_RESOLUTION: f64 = 1e-9;

fn tie_key(score: f64) -> i64 {
    (score / TIE_RESOLUTION).round() as i64
}

/// `sum_k x[k] * p[(k - t) mod 12]`, summed in profile order so that a
/// rotated histogram reproduces the same terms in the same order
fn rotated_dot(observed: &[f64; 12], profile: &[f64; 12], tonic: PitchClass) -> f64 {
    profile
        .iter()
        .zip(PitchClass::all())
        .map(|(weight, degree)| weight * observed[tonic.transpose(degree.value() as i32).index()])
        .sum()
}

/// Most likely key of a pitch-class histogram using Pearson correlation.
///
/// Returns `Ok(None)` for a histogram with no variance (including silence).
pub fn find_key(histogram: &[f64; 12], profiles: &ProfilePair) -> Result<Option<KeyCandidate>> {
    KeyCorrelator::new(profiles.clone()).best(histogram)
}
