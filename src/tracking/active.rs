// Reference-counted pitch-class activity fed by note events

use parking_lot::Mutex;
use std::sync::Arc;

use crate::theory::{PitchClass, PitchClassSet, Result, TheoryError};

use super::midi_input::NoteMessage;

/// Number of currently sounding notes per pitch class.
///
/// A class is active while its count is above zero, so releasing one of two
/// doubled octaves keeps it active.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PitchClassCounter {
    counts: [u32; 12],
}

impl PitchClassCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Press (`+1`) or release (`-1`) one instance of pitch class `pc`.
    pub fn update_pitch_class(&mut self, pc: u8, delta: i32) -> Result<()> {
        let pc = PitchClass::new(pc)?;
        match delta {
            1 => self.press(pc),
            -1 => self.release(pc),
            other => return Err(TheoryError::InvalidDelta(other)),
        }
        Ok(())
    }

    pub fn press(&mut self, pc: PitchClass) {
        let count = &mut self.counts[pc.index()];
        *count = count.saturating_add(1);
    }

    /// Counts saturate at zero.
    pub fn release(&mut self, pc: PitchClass) {
        let count = &mut self.counts[pc.index()];
        if *count == 0 {
            log::warn!("Release of inactive pitch class {}, ignoring", pc);
        } else {
            *count -= 1;
        }
    }

    pub fn count(&self, pc: PitchClass) -> u32 {
        self.counts[pc.index()]
    }

    pub fn current_mask(&self) -> PitchClassSet {
        PitchClass::all()
            .filter(|pc| self.counts[pc.index()] > 0)
            .collect()
    }

    pub fn clear(&mut self) {
        self.counts = [0; 12];
    }
}

/// Held notes per MIDI key, with one bit per channel holding it.
///
/// Sits on top of [`PitchClassCounter`]: a repeated note-on for a key that a
/// channel already holds does not count twice, and a note-off for a key that
/// was never pressed is dropped.
#[derive(Debug, Clone)]
pub struct NoteTracker {
    held: [u16; 128],
    counter: PitchClassCounter,
}

impl Default for NoteTracker {
    fn default() -> Self {
        Self {
            held: [0; 128],
            counter: PitchClassCounter::default(),
        }
    }
}

impl NoteTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true when the note was not already held on this channel.
    pub fn note_on(&mut self, note: u8, channel: u8) -> bool {
        let (Some(channels), Some(bit)) = (self.held.get_mut(note as usize), channel_bit(channel)) else {
            log::warn!("Ignoring note-on for note {} channel {}", note, channel);
            return false;
        };
        if *channels & bit != 0 {
            return false;
        }
        *channels |= bit;
        self.counter.press(PitchClass::from_midi_note(note));
        true
    }

    /// Returns true when the note was held on this channel.
    pub fn note_off(&mut self, note: u8, channel: u8) -> bool {
        let (Some(channels), Some(bit)) = (self.held.get_mut(note as usize), channel_bit(channel)) else {
            return false;
        };
        if *channels & bit == 0 {
            log::debug!("Note-off for unpressed note {} on channel {}", note, channel);
            return false;
        }
        *channels &= !bit;
        self.counter.release(PitchClass::from_midi_note(note));
        true
    }

    /// Release every note on every channel.
    pub fn all_notes_off(&mut self) {
        self.held = [0; 128];
        self.counter.clear();
    }

    /// Release every note held on one channel.
    pub fn channel_notes_off(&mut self, channel: u8) {
        for note in 0..128u8 {
            self.note_off(note, channel);
        }
    }

    /// Apply a decoded MIDI message; returns true when the active mask may have changed.
    pub fn apply(&mut self, message: NoteMessage) -> bool {
        match message {
            NoteMessage::NoteOn { channel, note, .. } => self.note_on(note, channel),
            NoteMessage::NoteOff { channel, note } => self.note_off(note, channel),
            NoteMessage::AllNotesOff { channel } => {
                self.channel_notes_off(channel);
                true
            }
        }
    }

    pub fn held_notes(&self) -> Vec<u8> {
        (0..128u8).filter(|&n| self.held[n as usize] != 0).collect()
    }

    pub fn counter(&self) -> &PitchClassCounter {
        &self.counter
    }

    pub fn current_mask(&self) -> PitchClassSet {
        self.counter.current_mask()
    }
}

fn channel_bit(channel: u8) -> Option<u16> {
    (channel < 16).then(|| 1u16 << channel)
}

/// Note tracker shared between the MIDI callback thread and samplers
#[derive(Debug, Clone, Default)]
pub struct SharedNoteState {
    inner: Arc<Mutex<NoteTracker>>,
}

impl SharedNoteState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn apply(&self, message: NoteMessage) -> bool {
        self.inner.lock().apply(message)
    }

    pub fn note_on(&self, note: u8, channel: u8) -> bool {
        self.inner.lock().note_on(note, channel)
    }

    pub fn note_off(&self, note: u8, channel: u8) -> bool {
        self.inner.lock().note_off(note, channel)
    }

    pub fn all_notes_off(&self) {
        self.inner.lock().all_notes_off();
    }

    /// Copy of the active mask taken under the lock
    pub fn snapshot(&self) -> PitchClassSet {
        self.inner.lock().current_mask()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_doubled_octave_stays_active() {
        let mut counter = PitchClassCounter::new();
        counter.update_pitch_class(0, 1).unwrap();
        counter.update_pitch_class(0, 1).unwrap();
        counter.update_pitch_class(0, -1).unwrap();
        assert!(counter.current_mask().contains(PitchClass::C));
        counter.update_pitch_class(0, -1).unwrap();
        assert!(counter.current_mask().is_empty());
    }

    #[test]
    fn test_tracker_counts_octaves_per_class() {
        let mut tracker = NoteTracker::new();
        assert!(tracker.note_on(48, 0));
        assert!(tracker.note_on(60, 0));
        assert!(tracker.note_on(127, 15));
        assert_eq!(tracker.counter().count(PitchClass::C), 2);
        assert_eq!(tracker.counter().count(PitchClass::root(7).unwrap()), 1);

        assert!(tracker.note_off(48, 0));
        assert_eq!(tracker.counter().count(PitchClass::C), 1);
        assert!(!tracker.note_off(48, 0));
        assert_eq!(tracker.counter().count(PitchClass::C), 1);
        assert_eq!(tracker.current_mask(), PitchClassSet::from_pitch_classes(&[0, 7]));
    }

    #[test]
    fn test_release_of_inactive_class_saturates() {
        let mut counter = PitchClassCounter::new();
        counter.update_pitch_class(4, -1).unwrap();
        assert_eq!(counter.count(PitchClass::root(4).unwrap()), 0);
        counter.update_pitch_class(4, 1).unwrap();
        assert_eq!(counter.current_mask().bits(), 0x010);
    }

    #[test]
    fn test_counter_rejects_bad_input() {
        let mut counter = PitchClassCounter::new();
        assert_eq!(counter.update_pitch_class(12, 1), Err(TheoryError::InvalidPitchClass(12)));
        assert_eq!(counter.update_pitch_class(3, 2), Err(TheoryError::InvalidDelta(2)));
        assert_eq!(counter.update_pitch_class(3, 0), Err(TheoryError::InvalidDelta(0)));
    }

    #[test]
    fn test_tracker_ignores_duplicates_and_strays() {
        let mut tracker = NoteTracker::new();
        assert!(tracker.note_on(60, 0));
        assert!(!tracker.note_on(60, 0));
        assert!(tracker.note_on(72, 0));
        assert!(!tracker.note_off(64, 0));

        assert!(tracker.note_off(60, 0));
        assert_eq!(tracker.current_mask(), PitchClassSet::from_pitch_classes(&[0]));
        assert!(tracker.note_off(72, 0));
        assert!(tracker.current_mask().is_empty());
    }

    #[test]
    fn test_same_note_on_two_channels() {
        let mut tracker = NoteTracker::new();
        tracker.note_on(67, 0);
        tracker.note_on(67, 9);
        tracker.note_off(67, 0);
        assert_eq!(tracker.held_notes(), vec![67]);
        assert!(tracker.current_mask().contains(PitchClass::root(7).unwrap()));
        assert!(!tracker.note_on(67, 16));
    }

    #[test]
    fn test_all_notes_off() {
        let mut tracker = NoteTracker::new();
        for note in [60, 64, 67] {
            tracker.note_on(note, 1);
        }
        tracker.note_on(62, 2);
        tracker.apply(NoteMessage::AllNotesOff { channel: 1 });
        assert_eq!(tracker.held_notes(), vec![62]);

        tracker.all_notes_off();
        assert!(tracker.current_mask().is_empty());
    }

    #[test]
    fn test_shared_state_snapshot_across_threads() {
        let state = SharedNoteState::new();
        let writer = state.clone();
        std::thread::spawn(move || {
            for note in [60, 64, 67] {
                writer.note_on(note, 0);
            }
        })
        .join()
        .unwrap();
        assert_eq!(state.snapshot().bits(), 0x091);
    }
}
