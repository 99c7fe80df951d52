// Per-segment chord and key report for a MIDI file

use serde::Serialize;
use std::path::Path;

use crate::config::Config;
use crate::theory::{find_chords, ChordCatalog, CombinedChord, KeyCandidate, KeyCorrelator, Mode, PitchClass, PitchClassSet};

use super::midi_parser::{parse_midi, MidiParseResult, TrackInfo};
use super::segments::{segment_histograms, total_histogram, SegmentGrid};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KeyReport {
    pub name: String,
    pub root: PitchClass,
    pub mode: Mode,
    pub score: f64,
}

impl From<KeyCandidate> for KeyReport {
    fn from(key: KeyCandidate) -> Self {
        Self {
            name: key.name(),
            root: key.root,
            mode: key.mode,
            score: key.score,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SegmentReport {
    pub index: usize,
    pub start_tick: u64,
    pub start_seconds: f64,
    pub mask: PitchClassSet,
    pub key: Option<KeyReport>,
    pub chords: Vec<CombinedChord>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrackReport {
    #[serde(flatten)]
    pub info: TrackInfo,
    /// Key of the track's onset histogram
    pub key: Option<KeyReport>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FileReport {
    pub ticks_per_beat: u16,
    pub duration_seconds: f64,
    pub segments: Vec<SegmentReport>,
    pub overall_key: Option<KeyReport>,
    pub tracks: Vec<TrackReport>,
}

/// Parse and analyze a MIDI file.
pub fn analyze_file(path: &Path, config: &Config) -> anyhow::Result<FileReport> {
    let parsed = parse_midi(path)?;
    analyze(&parsed, config)
}

/// Chords and key per segment, the whole-file key, and per-track keys.
pub fn analyze(parsed: &MidiParseResult, config: &Config) -> anyhow::Result<FileReport> {
    let settings = &config.analysis;
    let catalog = ChordCatalog::standard();
    let correlator = config.key.correlator();
    let root_hint = PitchClass::root(settings.root_hint)?;

    let grid = SegmentGrid::new(
        &parsed.time_signatures,
        parsed.ticks_per_beat,
        parsed.end_tick,
        settings.segmentation,
    )?;
    let histograms = segment_histograms(
        &parsed.events,
        &grid,
        parsed.ticks_per_beat,
        settings.weighting,
        settings.include_drums,
    );

    let mut segments = Vec::with_capacity(grid.len());
    for (segment, content) in grid.segments().iter().zip(&histograms) {
        let key = correlator.best(&content.histogram)?;
        // Seed the chord scan at the segment's tonic when it has one
        let hint = key.map(|k| k.root).unwrap_or(root_hint);
        let chords = find_chords(content.mask, hint.value(), &catalog)?;

        segments.push(SegmentReport {
            index: segment.index,
            start_tick: segment.start_tick,
            start_seconds: parsed.tick_to_seconds(segment.start_tick),
            mask: content.mask,
            key: key.map(KeyReport::from),
            chords,
        });
    }

    let overall = total_histogram(
        &parsed.events,
        parsed.ticks_per_beat,
        settings.weighting,
        settings.include_drums,
    );
    let overall_key = correlator.best(&overall)?.map(KeyReport::from);

    let tracks = parsed
        .tracks
        .iter()
        .map(|info| track_report(info, &correlator))
        .collect::<anyhow::Result<Vec<_>>>()?;

    log::info!(
        "Analyzed {} segments, overall key {}",
        segments.len(),
        overall_key
            .as_ref()
            .map(|k| k.name.as_str())
            .unwrap_or("undetermined")
    );

    Ok(FileReport {
        ticks_per_beat: parsed.ticks_per_beat,
        duration_seconds: parsed.duration_seconds(),
        segments,
        overall_key,
        tracks,
    })
}

fn track_report(info: &TrackInfo, correlator: &KeyCorrelator) -> anyhow::Result<TrackReport> {
    let mut histogram = [0.0; 12];
    for (bin, count) in histogram.iter_mut().zip(info.onset_histogram) {
        *bin = count as f64;
    }
    Ok(TrackReport {
        info: info.clone(),
        key: correlator.best(&histogram)?.map(KeyReport::from),
    })
}
