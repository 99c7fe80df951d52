// Standard MIDI File parser: notes with sustain pedal, tempo and meter maps

use std::collections::HashMap;
use std::path::Path;

use midly::{MetaMessage, MidiMessage, Smf, Timing, TrackEventKind};

/// Fallback resolution for SMPTE-timed files
const DEFAULT_TICKS_PER_BEAT: u16 = 480;
/// 120 BPM
const DEFAULT_TEMPO_US: u32 = 500_000;
/// General MIDI percussion channel (10, zero-based 9)
pub const DRUM_CHANNEL: u8 = 9;
/// CC64: damper/sustain pedal
const CC_SUSTAIN: u8 = 64;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoteEvent {
    pub pitch: u8,
    pub velocity: u8,
    pub start_tick: u64,
    pub duration_ticks: u64,
    pub channel: u8,
    pub track: usize,
}

impl NoteEvent {
    pub fn end_tick(&self) -> u64 {
        self.start_tick + self.duration_ticks
    }

    pub fn is_drum(&self) -> bool {
        self.channel == DRUM_CHANNEL
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TempoEvent {
    pub tick: u64,
    pub microseconds_per_beat: u32,
}

/// Meter change as stored in the file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeSignatureEvent {
    pub tick: u64,
    pub numerator: u8,
    /// Denominator as a power of two (2 = quarter note)
    pub denominator_pow2: u8,
    pub clocks_per_click: u8,
    pub thirty_seconds_per_quarter: u8,
}

impl TimeSignatureEvent {
    /// 4/4 from tick 0
    pub fn common_time() -> Self {
        Self {
            tick: 0,
            numerator: 4,
            denominator_pow2: 2,
            clocks_per_click: 24,
            thirty_seconds_per_quarter: 8,
        }
    }

    pub fn denominator(&self) -> u64 {
        1u64 << self.denominator_pow2.min(6)
    }

    /// `tpb * numerator * 32nds_per_quarter / denominator / 2`
    pub fn ticks_per_bar(&self, ticks_per_beat: u16) -> u64 {
        let bar = ticks_per_beat as u64
            * self.numerator.max(1) as u64
            * self.thirty_seconds_per_quarter.max(1) as u64
            / (self.denominator() * 2);
        bar.max(1)
    }

    /// Length of one denominator note
    pub fn ticks_per_beat_unit(&self, ticks_per_beat: u16) -> u64 {
        (self.ticks_per_bar(ticks_per_beat) / self.numerator.max(1) as u64).max(1)
    }
}

/// Per-track summary
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct TrackInfo {
    pub index: usize,
    pub name: String,
    pub note_count: usize,
    /// Note-on count per pitch class
    pub onset_histogram: [u32; 12],
    /// Program changes seen in the track
    pub programs: Vec<u8>,
}

pub struct MidiParseResult {
    pub events: Vec<NoteEvent>,
    pub ticks_per_beat: u16,
    pub tempo_map: Vec<TempoEvent>,
    /// Never empty; 4/4 at tick 0 when the file has none
    pub time_signatures: Vec<TimeSignatureEvent>,
    pub tracks: Vec<TrackInfo>,
    /// Tick where the last note ends
    pub end_tick: u64,
}

impl MidiParseResult {
    pub fn tick_to_seconds(&self, tick: u64) -> f64 {
        tick_to_seconds(tick, self.ticks_per_beat, &self.tempo_map)
    }

    pub fn duration_seconds(&self) -> f64 {
        self.tick_to_seconds(self.end_tick)
    }
}

/// Convert a tick position to seconds using the tempo map.
pub fn tick_to_seconds(tick: u64, ticks_per_beat: u16, tempo_map: &[TempoEvent]) -> f64 {
    let tpb = ticks_per_beat.max(1) as f64;
    let mut seconds = 0.0;
    let mut last_tick = 0u64;
    let mut usec_per_beat = DEFAULT_TEMPO_US as f64;

    for te in tempo_map {
        if te.tick >= tick {
            break;
        }
        let delta_ticks = te.tick - last_tick;
        seconds += (delta_ticks as f64 / tpb) * (usec_per_beat / 1_000_000.0);
        last_tick = te.tick;
        usec_per_beat = te.microseconds_per_beat as f64;
    }

    let delta_ticks = tick - last_tick;
    seconds += (delta_ticks as f64 / tpb) * (usec_per_beat / 1_000_000.0);
    seconds
}

/// Parse a MIDI file into note events with sustain pedal handling.
pub fn parse_midi(path: &Path) -> anyhow::Result<MidiParseResult> {
    let data = std::fs::read(path)
        .map_err(|e| anyhow::anyhow!("Failed to read {}: {}", path.display(), e))?;
    let result = parse_midi_bytes(&data)?;
    log::info!(
        "Parsed {}: {} tracks, {} notes, {:.1}s",
        path.display(),
        result.tracks.len(),
        result.events.len(),
        result.duration_seconds()
    );
    Ok(result)
}

/// Parse an in-memory Standard MIDI File.
pub fn parse_midi_bytes(data: &[u8]) -> anyhow::Result<MidiParseResult> {
    let smf = Smf::parse(data).map_err(|e| anyhow::anyhow!("Invalid MIDI file: {}", e))?;

    let ticks_per_beat = match smf.header.timing {
        Timing::Metrical(tpb) => tpb.as_int(),
        Timing::Timecode(fps, sub) => {
            log::warn!(
                "SMPTE timing ({} fps, {} subframes) not supported, assuming {} ticks per beat",
                fps.as_f32(),
                sub,
                DEFAULT_TICKS_PER_BEAT
            );
            DEFAULT_TICKS_PER_BEAT
        }
    };

    let mut notes: Vec<NoteEvent> = Vec::new();
    let mut tempo_map: Vec<TempoEvent> = Vec::new();
    let mut time_signatures: Vec<TimeSignatureEvent> = Vec::new();
    let mut tracks: Vec<TrackInfo> = Vec::new();

    for (index, track) in smf.tracks.iter().enumerate() {
        let mut state = TrackState::new(index);
        let mut info = TrackInfo {
            index,
            name: String::new(),
            note_count: 0,
            onset_histogram: [0; 12],
            programs: Vec::new(),
        };

        for event in track {
            state.tick += event.delta.as_int() as u64;

            match event.kind {
                TrackEventKind::Meta(MetaMessage::Tempo(t)) => tempo_map.push(TempoEvent {
                    tick: state.tick,
                    microseconds_per_beat: t.as_int(),
                }),
                TrackEventKind::Meta(MetaMessage::TimeSignature(num, den, clocks, n32)) => {
                    time_signatures.push(TimeSignatureEvent {
                        tick: state.tick,
                        numerator: num,
                        denominator_pow2: den,
                        clocks_per_click: clocks,
                        thirty_seconds_per_quarter: n32,
                    })
                }
                TrackEventKind::Meta(MetaMessage::TrackName(name)) if info.name.is_empty() => {
                    info.name = String::from_utf8_lossy(name).trim().to_string();
                }
                TrackEventKind::Midi { channel, message } => {
                    let ch = channel.as_int();
                    match message {
                        MidiMessage::NoteOn { key, vel } if vel.as_int() > 0 => {
                            let pitch = key.as_int();
                            info.onset_histogram[(pitch % 12) as usize] += 1;
                            info.note_count += 1;
                            state.note_on(pitch, vel.as_int(), ch, &mut notes);
                        }
                        MidiMessage::NoteOn { key, .. } | MidiMessage::NoteOff { key, .. } => {
                            state.note_off(key.as_int(), ch, &mut notes);
                        }
                        MidiMessage::Controller { controller, value }
                            if controller.as_int() == CC_SUSTAIN =>
                        {
                            state.sustain(ch, value.as_int() >= 64, &mut notes);
                        }
                        MidiMessage::ProgramChange { program } => {
                            if !info.programs.contains(&program.as_int()) {
                                info.programs.push(program.as_int());
                            }
                        }
                        _ => {}
                    }
                }
                _ => {}
            }
        }

        state.finish(&mut notes);
        log::debug!(
            "Track {} '{}': {} notes, programs {:?}",
            index,
            info.name,
            info.note_count,
            info.programs
        );
        tracks.push(info);
    }

    notes.sort_by_key(|n| (n.start_tick, n.pitch));
    // Trailing meta events do not extend the music
    let end_tick = notes.iter().map(NoteEvent::end_tick).max().unwrap_or(0);

    // Sort and dedup tempo map
    tempo_map.sort_by_key(|t| t.tick);
    tempo_map.dedup_by_key(|t| t.tick);
    if tempo_map.is_empty() {
        tempo_map.push(TempoEvent {
            tick: 0,
            microseconds_per_beat: DEFAULT_TEMPO_US,
        });
    }

    // Later entries at the same tick win
    time_signatures.sort_by_key(|t| t.tick);
    time_signatures.reverse();
    time_signatures.dedup_by_key(|t| t.tick);
    time_signatures.reverse();
    if time_signatures.first().map(|t| t.tick > 0).unwrap_or(true) {
        time_signatures.insert(0, TimeSignatureEvent::common_time());
    }

    Ok(MidiParseResult {
        events: notes,
        ticks_per_beat,
        tempo_map,
        time_signatures,
        tracks,
        end_tick,
    })
}

/// Note-on start: (velocity, start tick)
type Held = (u8, u64);

/// Held and pedal-sustained notes of one track
struct TrackState {
    track: usize,
    tick: u64,
    active: HashMap<(u8, u8), Held>,
    pedal_down: [bool; 16],
    /// Released while the pedal was down: (pitch, channel) -> start
    sustained: HashMap<(u8, u8), Held>,
}

impl TrackState {
    fn new(track: usize) -> Self {
        Self {
            track,
            tick: 0,
            active: HashMap::new(),
            pedal_down: [false; 16],
            sustained: HashMap::new(),
        }
    }

    fn emit(&self, notes: &mut Vec<NoteEvent>, pitch: u8, channel: u8, (velocity, start): Held) {
        notes.push(NoteEvent {
            pitch,
            velocity,
            start_tick: start,
            duration_ticks: self.tick.saturating_sub(start),
            channel,
            track: self.track,
        });
    }

    fn note_on(&mut self, pitch: u8, velocity: u8, channel: u8, notes: &mut Vec<NoteEvent>) {
        // A re-strike ends the sustained or still-held previous instance
        if let Some(held) = self.sustained.remove(&(pitch, channel)) {
            self.emit(notes, pitch, channel, held);
        }
        if let Some(held) = self.active.remove(&(pitch, channel)) {
            self.emit(notes, pitch, channel, held);
        }
        self.active.insert((pitch, channel), (velocity, self.tick));
    }

    fn note_off(&mut self, pitch: u8, channel: u8, notes: &mut Vec<NoteEvent>) {
        let Some(held) = self.active.remove(&(pitch, channel)) else {
            return;
        };
        if self.pedal_down[channel as usize & 0x0F] {
            self.sustained.insert((pitch, channel), held);
        } else {
            self.emit(notes, pitch, channel, held);
        }
    }

    fn sustain(&mut self, channel: u8, down: bool, notes: &mut Vec<NoteEvent>) {
        let slot = &mut self.pedal_down[channel as usize & 0x0F];
        let was_down = std::mem::replace(slot, down);
        if was_down && !down {
            let released: Vec<_> = self
                .sustained
                .iter()
                .filter(|((_, ch), _)| *ch == channel)
                .map(|(key, held)| (*key, *held))
                .collect();
            for ((pitch, ch), held) in released {
                self.sustained.remove(&(pitch, ch));
                self.emit(notes, pitch, ch, held);
            }
        }
    }

    /// Close everything still sounding at the end of the track.
    fn finish(mut self, notes: &mut Vec<NoteEvent>) {
        let remaining: Vec<_> = self.active.drain().chain(self.sustained.drain()).collect();
        for ((pitch, channel), held) in remaining {
            self.emit(notes, pitch, channel, held);
        }
    }
}
