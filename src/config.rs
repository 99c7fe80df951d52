// Configuration management for Chordscope

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::theory::{CorrelationMethod, KeyCorrelator, ProfileKind, ProfilePair};

/// Application configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Key finding
    #[serde(default)]
    pub key: KeyConfig,

    /// MIDI file analysis
    #[serde(default)]
    pub analysis: AnalysisConfig,

    /// Live MIDI input
    #[serde(default)]
    pub live: LiveConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct KeyConfig {
    /// Profile table correlated against pitch histograms
    #[serde(default)]
    pub profile: ProfileKind,

    /// Pearson correlation, or the plain weighted sum over active classes
    #[serde(default)]
    pub method: CorrelationMethod,
}

impl KeyConfig {
    /// Correlator for the configured profile and method
    pub fn correlator(&self) -> KeyCorrelator {
        KeyCorrelator::new(ProfilePair::from_kind(self.profile)).with_method(self.method)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// Segment length for per-segment chords and keys
    #[serde(default)]
    pub segmentation: Segmentation,

    /// What a note contributes to its segment's histogram
    #[serde(default)]
    pub weighting: Weighting,

    /// Whether notes on channel 10 (General MIDI percussion) count
    #[serde(default)]
    pub include_drums: bool,

    /// Root scanned first when matching chords (0 = C)
    #[serde(default)]
    pub root_hint: u8,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            segmentation: Segmentation::default(),
            weighting: Weighting::default(),
            include_drums: false,
            root_hint: 0,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Segmentation {
    #[default]
    Bar,
    Beat,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Weighting {
    /// Sounding time within the segment, in beats
    #[default]
    Duration,
    /// One per note starting in the segment
    Onsets,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LiveConfig {
    /// Input port index, used when no port name is set
    #[serde(default)]
    pub port_index: usize,

    /// Substring of the input port name
    #[serde(default)]
    pub port_name: Option<String>,

    /// Sampling interval of the harmony monitor
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Length of the rolling window used for key finding
    #[serde(default = "default_key_window_secs")]
    pub key_window_secs: u32,
}

impl Default for LiveConfig {
    fn default() -> Self {
        Self {
            port_index: 0,
            port_name: None,
            poll_interval_ms: default_poll_interval_ms(),
            key_window_secs: default_key_window_secs(),
        }
    }
}

impl Config {
    /// Load config from disk or return default
    pub fn load_or_default(path: &Path) -> Self {
        if path.exists() {
            match std::fs::read_to_string(path) {
                Ok(contents) => match toml::from_str(&contents) {
                    Ok(config) => {
                        log::info!("Loaded config from {}", path.display());
                        return config;
                    }
                    Err(e) => {
                        log::warn!("Failed to parse config: {}", e);
                    }
                },
                Err(e) => {
                    log::warn!("Failed to read config file: {}", e);
                }
            }
        }

        Self::default()
    }

    /// Save config to disk
    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)?;
        std::fs::write(path, contents)?;

        Ok(())
    }
}

/// Get the config file path
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("chordscope")
        .join("config.toml")
}

/// Default monitor interval: the 1/120 s redraw cadence, rounded (for serde)
fn default_poll_interval_ms() -> u64 {
    8
}

/// Default key window (for serde)
fn default_key_window_secs() -> u32 {
    8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut config = Config::default();
        config.key.profile = ProfileKind::BellmanBudge;
        config.key.method = CorrelationMethod::WeightedSum;
        config.analysis.segmentation = Segmentation::Beat;
        config.live.port_name = Some("Keystation".into());
        config.save(&path).unwrap();

        assert_eq!(Config::load_or_default(&path), config);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[key]\nprofile = \"aarden_essen\"\n\n[live]\nport_index = 2\n").unwrap();

        let config = Config::load_or_default(&path);
        assert_eq!(config.key.profile, ProfileKind::AardenEssen);
        assert_eq!(config.key.method, CorrelationMethod::Pearson);
        assert_eq!(config.live.port_index, 2);
        assert_eq!(config.live.poll_interval_ms, 8);
        assert_eq!(config.analysis, AnalysisConfig::default());
    }

    #[test]
    fn test_parse_error_falls_back_to_default() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[key]\nprofile = \"nonexistent\"\n").unwrap();
        assert_eq!(Config::load_or_default(&path), Config::default());

        assert_eq!(Config::load_or_default(&dir.path().join("missing.toml")), Config::default());
    }

    #[test]
    fn test_default_path_ends_in_app_dir() {
        let path = default_config_path();
        assert!(path.ends_with("chordscope/config.toml"));
    }
}
