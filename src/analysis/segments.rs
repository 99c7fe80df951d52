// Bar/beat segmentation and per-segment pitch-class histograms

use serde::Serialize;

use crate::config::{Segmentation, Weighting};
use crate::theory::{PitchClass, PitchClassSet};

use super::midi_parser::{NoteEvent, TimeSignatureEvent};

/// Most segments a grid may hold before the file is rejected
pub const MAX_SEGMENTS: u64 = 100_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Segment {
    pub index: usize,
    pub start_tick: u64,
    pub end_tick: u64,
}

impl Segment {
    fn overlap(&self, start: u64, end: u64) -> u64 {
        end.min(self.end_tick).saturating_sub(start.max(self.start_tick))
    }

    fn contains(&self, tick: u64) -> bool {
        tick >= self.start_tick && tick < self.end_tick
    }
}

/// Consecutive bars (or beats) covering a file.
///
/// Segment length follows the time-signature map; a meter change cuts the
/// running segment short and restarts the grid at the change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SegmentGrid {
    segments: Vec<Segment>,
}

impl SegmentGrid {
    pub fn new(
        time_signatures: &[TimeSignatureEvent],
        ticks_per_beat: u16,
        end_tick: u64,
        segmentation: Segmentation,
    ) -> anyhow::Result<Self> {
        let common = [TimeSignatureEvent::common_time()];
        let signatures = if time_signatures.is_empty() {
            &common[..]
        } else {
            time_signatures
        };

        let regions: Vec<(u64, u64, u64)> = signatures
            .iter()
            .enumerate()
            .map(|(i, signature)| {
                let region_start = if i == 0 { 0 } else { signature.tick.min(end_tick) };
                let region_end = signatures
                    .get(i + 1)
                    .map(|next| next.tick.min(end_tick))
                    .unwrap_or(end_tick);
                let step = match segmentation {
                    Segmentation::Bar => signature.ticks_per_bar(ticks_per_beat),
                    Segmentation::Beat => signature.ticks_per_beat_unit(ticks_per_beat),
                };
                (region_start, region_end, step)
            })
            .collect();

        let count: u64 = regions
            .iter()
            .map(|&(start, end, step)| end.saturating_sub(start).div_ceil(step))
            .sum();
        if count > MAX_SEGMENTS {
            anyhow::bail!(
                "File would split into {} segments (limit {}); ticks per beat {}, last tick {}",
                count,
                MAX_SEGMENTS,
                ticks_per_beat,
                end_tick
            );
        }

        let mut segments = Vec::with_capacity(count as usize);
        for (region_start, region_end, step) in regions {
            let mut start = region_start;
            while start < region_end {
                let end = (start + step).min(region_end);
                segments.push(Segment {
                    index: segments.len(),
                    start_tick: start,
                    end_tick: end,
                });
                start = end;
            }
        }

        Ok(Self { segments })
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Index of the segment containing `tick`
    pub fn segment_at(&self, tick: u64) -> Option<usize> {
        let idx = self.segments.partition_point(|s| s.end_tick <= tick);
        self.segments
            .get(idx)
            .filter(|s| s.contains(tick))
            .map(|s| s.index)
    }
}

/// Pitch content of one segment
#[derive(Debug, Clone, PartialEq)]
pub struct SegmentHistogram {
    pub histogram: [f64; 12],
    /// Classes sounding at any point in the segment
    pub mask: PitchClassSet,
}

impl Default for SegmentHistogram {
    fn default() -> Self {
        Self {
            histogram: [0.0; 12],
            mask: PitchClassSet::EMPTY,
        }
    }
}

/// One histogram per grid segment.
///
/// With [`Weighting::Duration`] each note adds the beats it sounds inside a
/// segment; with [`Weighting::Onsets`] it adds 1 to the segment it starts in.
/// Drum-channel notes are skipped unless `include_drums` is set.
pub fn segment_histograms(
    events: &[NoteEvent],
    grid: &SegmentGrid,
    ticks_per_beat: u16,
    weighting: Weighting,
    include_drums: bool,
) -> Vec<SegmentHistogram> {
    let mut out = vec![SegmentHistogram::default(); grid.len()];
    let tpb = ticks_per_beat.max(1) as f64;

    for note in events.iter().filter(|n| include_drums || !n.is_drum()) {
        let Some(first) = grid.segment_at(note.start_tick) else {
            continue;
        };
        let pc = PitchClass::from_midi_note(note.pitch);

        match weighting {
            Weighting::Onsets => {
                out[first].histogram[pc.index()] += 1.0;
                out[first].mask = out[first].mask.with(pc);
            }
            Weighting::Duration => {
                out[first].mask = out[first].mask.with(pc);
                for segment in &grid.segments()[first..] {
                    if segment.start_tick >= note.end_tick() {
                        break;
                    }
                    let overlap = segment.overlap(note.start_tick, note.end_tick());
                    let slot = &mut out[segment.index];
                    slot.histogram[pc.index()] += overlap as f64 / tpb;
                    slot.mask = slot.mask.with(pc);
                }
            }
        }
    }

    out
}

/// Histogram of a whole note list, weighted like [`segment_histograms`].
pub fn total_histogram(
    events: &[NoteEvent],
    ticks_per_beat: u16,
    weighting: Weighting,
    include_drums: bool,
) -> [f64; 12] {
    let tpb = ticks_per_beat.max(1) as f64;
    let mut histogram = [0.0; 12];
    for note in events.iter().filter(|n| include_drums || !n.is_drum()) {
        histogram[(note.pitch % 12) as usize] += match weighting {
            Weighting::Duration => note.duration_ticks as f64 / tpb,
            Weighting::Onsets => 1.0,
        };
    }
    histogram
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn note(pitch: u8, start_tick: u64, duration_ticks: u64) -> NoteEvent {
        NoteEvent {
            pitch,
            velocity: 90,
            start_tick,
            duration_ticks,
            channel: 0,
            track: 0,
        }
    }

    fn meter(tick: u64, numerator: u8) -> TimeSignatureEvent {
        TimeSignatureEvent {
            tick,
            numerator,
            ..TimeSignatureEvent::common_time()
        }
    }

    #[test]
    fn test_bars_follow_meter_changes() {
        // Two bars of 4/4, then 3/4
        let grid = SegmentGrid::new(&[meter(0, 4), meter(3840, 3)], 480, 3840 + 2880, Segmentation::Bar).unwrap();
        let starts: Vec<u64> = grid.segments().iter().map(|s| s.start_tick).collect();
        assert_eq!(starts, vec![0, 1920, 3840, 5280]);
        assert_eq!(grid.segments()[3].end_tick, 6720);
    }

    #[test]
    fn test_meter_change_mid_bar_cuts_the_bar() {
        let grid = SegmentGrid::new(&[meter(0, 4), meter(960, 3)], 480, 2400, Segmentation::Bar).unwrap();
        let bounds: Vec<(u64, u64)> = grid.segments().iter().map(|s| (s.start_tick, s.end_tick)).collect();
        assert_eq!(bounds, vec![(0, 960), (960, 2400)]);
    }

    #[test]
    fn test_beats_grid() {
        let grid = SegmentGrid::new(&[meter(0, 3)], 480, 1440, Segmentation::Beat).unwrap();
        assert_eq!(grid.len(), 3);
        assert_eq!(grid.segment_at(479), Some(0));
        assert_eq!(grid.segment_at(480), Some(1));
        assert_eq!(grid.segment_at(1440), None);
    }

    #[test]
    fn test_oversized_grid_is_rejected() {
        // One tick per beat stretched over 2^24 ticks
        let err = SegmentGrid::new(&[meter(0, 4)], 1, 1 << 24, Segmentation::Beat).unwrap_err();
        assert!(err.to_string().contains("segments"));

        let grid = SegmentGrid::new(&[meter(0, 4)], 1, MAX_SEGMENTS, Segmentation::Beat).unwrap();
        assert_eq!(grid.len() as u64, MAX_SEGMENTS);
    }

    #[test]
    fn test_empty_file_has_no_segments() {
        let grid = SegmentGrid::new(&[], 480, 0, Segmentation::Bar).unwrap();
        assert!(grid.is_empty());
    }

    #[test]
    fn test_duration_spreads_across_bars() {
        let grid = SegmentGrid::new(&[meter(0, 4)], 480, 3840, Segmentation::Bar).unwrap();
        // Starts on beat 3 of bar 1, lasts 4 beats
        let events = vec![note(67, 960, 1920)];
        let hist = segment_histograms(&events, &grid, 480, Weighting::Duration, false);

        assert_relative_eq!(hist[0].histogram[7], 2.0);
        assert_relative_eq!(hist[1].histogram[7], 2.0);
        assert!(hist[0].mask.contains(PitchClass::root(7).unwrap()));
        assert!(hist[1].mask.contains(PitchClass::root(7).unwrap()));
    }

    #[test]
    fn test_onsets_count_in_starting_segment() {
        let grid = SegmentGrid::new(&[meter(0, 4)], 480, 3840, Segmentation::Bar).unwrap();
        let events = vec![note(60, 0, 3000), note(72, 480, 100), note(64, 2000, 10)];
        let hist = segment_histograms(&events, &grid, 480, Weighting::Onsets, false);

        assert_relative_eq!(hist[0].histogram[0], 2.0);
        assert_relative_eq!(hist[1].histogram[0], 0.0);
        assert_relative_eq!(hist[1].histogram[4], 1.0);
        assert_eq!(hist[1].mask, PitchClassSet::from_pitch_classes(&[4]));
    }

    #[test]
    fn test_drums_skipped_by_default() {
        let grid = SegmentGrid::new(&[meter(0, 4)], 480, 1920, Segmentation::Bar).unwrap();
        let mut kick = note(36, 0, 240);
        kick.channel = 9;
        let events = vec![kick];

        let hist = segment_histograms(&events, &grid, 480, Weighting::Duration, false);
        assert!(hist[0].mask.is_empty());

        let hist = segment_histograms(&events, &grid, 480, Weighting::Duration, true);
        assert_relative_eq!(hist[0].histogram[0], 0.5);
    }

    #[test]
    fn test_total_histogram() {
        let events = vec![note(60, 0, 960), note(64, 0, 480), note(72, 960, 480)];
        let h = total_histogram(&events, 480, Weighting::Duration, false);
        assert_relative_eq!(h[0], 3.0);
        assert_relative_eq!(h[4], 1.0);
        let h = total_histogram(&events, 480, Weighting::Onsets, false);
        assert_relative_eq!(h[0], 2.0);
    }
}
