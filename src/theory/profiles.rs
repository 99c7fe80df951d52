// Key profiles: empirical scale-degree weights for major and minor keys

use serde::{Deserialize, Serialize};

use super::{Result, TheoryError};

/// Twelve weights, index 0 = tonic, index k = k semitones above the tonic
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct KeyProfile(pub [f64; 12]);

impl KeyProfile {
    pub fn weights(&self) -> &[f64; 12] {
        &self.0
    }
}

/// Named profile tables
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProfileKind {
    #[default]
    KrumhanslKessler,
    AardenEssen,
    SimplePitch,
    BellmanBudge,
    TemperleyKostkaPayne,
}

impl ProfileKind {
    pub const ALL: [ProfileKind; 5] = [
        ProfileKind::KrumhanslKessler,
        ProfileKind::AardenEssen,
        ProfileKind::SimplePitch,
        ProfileKind::BellmanBudge,
        ProfileKind::TemperleyKostkaPayne,
    ];

    /// Raw (major, minor) weights of this table.
    pub fn tables(self) -> (KeyProfile, KeyProfile) {
        match self {
            ProfileKind::KrumhanslKessler => (KRUMHANSL_MAJOR, KRUMHANSL_MINOR),
            ProfileKind::AardenEssen => (AARDEN_MAJOR, AARDEN_MINOR),
            ProfileKind::SimplePitch => (SIMPLE_MAJOR, SIMPLE_MINOR),
            ProfileKind::BellmanBudge => (BELLMAN_MAJOR, BELLMAN_MINOR),
            ProfileKind::TemperleyKostkaPayne => (TEMPERLEY_MAJOR, TEMPERLEY_MINOR),
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ProfileKind::KrumhanslKessler => "Krumhansl-Kessler",
            ProfileKind::AardenEssen => "Aarden-Essen",
            ProfileKind::SimplePitch => "Simple pitch",
            ProfileKind::BellmanBudge => "Bellman-Budge",
            ProfileKind::TemperleyKostkaPayne => "Temperley-Kostka-Payne",
        }
    }
}

/// A validated major/minor profile pair, standardized once at construction
#[derive(Debug, Clone, PartialEq)]
pub struct ProfilePair {
    major: KeyProfile,
    minor: KeyProfile,
    major_z: [f64; 12],
    minor_z: [f64; 12],
}

impl ProfilePair {
    /// Validate both profiles and precompute their z-scores.
    ///
    /// Weights must be finite and non-negative, and neither profile may be flat.
    pub fn new(major: KeyProfile, minor: KeyProfile) -> Result<Self> {
        let major_z = standardize_profile("major", &major)?;
        let minor_z = standardize_profile("minor", &minor)?;
        Ok(Self {
            major,
            minor,
            major_z,
            minor_z,
        })
    }

    /// Pair for one of the built-in tables.
    pub fn from_kind(kind: ProfileKind) -> Self {
        let (major, minor) = kind.tables();
        // Built-in tables are finite, non-negative and have variance
        Self {
            major,
            minor,
            major_z: zscore(major.weights()).unwrap_or([0.0; 12]),
            minor_z: zscore(minor.weights()).unwrap_or([0.0; 12]),
        }
    }

    pub fn krumhansl_kessler() -> Self {
        Self::from_kind(ProfileKind::KrumhanslKessler)
    }

    pub fn major(&self) -> &KeyProfile {
        &self.major
    }

    pub fn minor(&self) -> &KeyProfile {
        &self.minor
    }

    pub fn major_z(&self) -> &[f64; 12] {
        &self.major_z
    }

    pub fn minor_z(&self) -> &[f64; 12] {
        &self.minor_z
    }
}

impl Default for ProfilePair {
    fn default() -> Self {
        Self::krumhansl_kessler()
    }
}

fn standardize_profile(label: &str, profile: &KeyProfile) -> Result<[f64; 12]> {
    if let Some(bad) = profile.0.iter().find(|w| !w.is_finite() || **w < 0.0) {
        return Err(TheoryError::InvalidProfile(format!(
            "{} profile has weight {}",
            label, bad
        )));
    }
    zscore(profile.weights())
        .ok_or_else(|| TheoryError::InvalidProfile(format!("{} profile has no variance", label)))
}

/// Zero mean, unit variance using the population standard deviation.
///
/// Values are first divided by their largest magnitude, so the result does
/// not depend on the overall scale. Returns `None` when the values have no
/// variance.
pub(crate) fn zscore(values: &[f64; 12]) -> Option<[f64; 12]> {
    let peak = values.iter().fold(0.0f64, |m, v| m.max(v.abs()));
    if peak == 0.0 || !peak.is_finite() {
        return None;
    }
    let scaled = values.map(|v| v / peak);

    let mean = scaled.iter().sum::<f64>() / 12.0;
    let variance = scaled.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / 12.0;
    let std = variance.sqrt();
    if !std.is_finite() || std <= f64::EPSILON {
        return None;
    }

    Some(scaled.map(|v| (v - mean) / std))
}

pub const KRUMHANSL_MAJOR: KeyProfile = KeyProfile([
    6.35, 2.23, 3.48, 2.33, 4.38, 4.09, 2.52, 5.19, 2.39, 3.66, 2.29, 2.88,
]);
pub const KRUMHANSL_MINOR: KeyProfile = KeyProfile([
    6.33, 2.68, 3.52, 5.38, 2.60, 3.53, 2.54, 4.75, 3.98, 2.69, 3.34, 3.17,
]);

pub const AARDEN_MAJOR: KeyProfile = KeyProfile([
    17.7661, 0.145624, 14.9265, 0.160186, 19.8049, 11.3587, 0.291248, 22.062, 0.145624, 8.15494,
    0.232998, 4.95122,
]);
pub const AARDEN_MINOR: KeyProfile = KeyProfile([
    18.2648, 0.737619, 14.0499, 16.8599, 0.702494, 14.4362, 0.702494, 18.6161, 4.56621, 1.93186,
    7.37619, 1.75623,
]);

pub const SIMPLE_MAJOR: KeyProfile = KeyProfile([
    2.0, 0.0, 1.0, 0.0, 1.0, 1.0, 0.0, 2.0, 0.0, 1.0, 0.0, 1.0,
]);
pub const SIMPLE_MINOR: KeyProfile = KeyProfile([
    2.0, 0.0, 1.0, 1.0, 0.0, 1.0, 0.0, 2.0, 1.0, 0.0, 0.5, 0.5,
]);

pub const BELLMAN_MAJOR: KeyProfile = KeyProfile([
    16.80, 0.86, 12.95, 1.41, 13.49, 11.93, 1.25, 20.28, 1.80, 8.04, 0.62, 10.57,
]);
pub const BELLMAN_MINOR: KeyProfile = KeyProfile([
    18.16, 0.69, 12.99, 13.34, 1.07, 11.15, 1.38, 21.07, 7.49, 1.53, 0.92, 10.21,
]);

pub const TEMPERLEY_MAJOR: KeyProfile = KeyProfile([
    0.748, 0.060, 0.488, 0.082, 0.670, 0.460, 0.096, 0.715, 0.104, 0.366, 0.057, 0.400,
]);
pub const TEMPERLEY_MINOR: KeyProfile = KeyProfile([
    0.712, 0.084, 0.474, 0.618, 0.049, 0.460, 0.105, 0.747, 0.404, 0.067, 0.133, 0.330,
]);
