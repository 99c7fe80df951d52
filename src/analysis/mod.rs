// MIDI file analysis: note extraction, segmentation and reports

pub mod midi_parser;
pub mod report;
pub mod segments;

pub use midi_parser::{parse_midi, parse_midi_bytes, MidiParseResult, NoteEvent};
pub use report::{analyze, analyze_file, FileReport, KeyReport, SegmentReport, TrackReport};
pub use segments::{segment_histograms, SegmentGrid, SegmentHistogram};
