// Harmony monitor: samples the shared note state and reports chord/key changes

use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use crate::config::LiveConfig;
use crate::theory::{
    find_chords, ChordCatalog, CombinedChord, KeyCandidate, KeyCorrelator, Mode, PitchClass,
    PitchClassSet,
};

use super::active::SharedNoteState;
use super::window::RollingHistogram;

/// Keys kept in the history before the oldest is dropped
const KEY_HISTORY_LIMIT: usize = 256;

/// What changed on one tick
#[derive(Debug, Clone, PartialEq)]
pub struct HarmonyChange {
    pub at: DateTime<Utc>,
    pub mask: PitchClassSet,
    pub chords: Vec<CombinedChord>,
    pub key: Option<KeyCandidate>,
    pub chords_changed: bool,
    pub key_changed: bool,
}

/// Selected keys over time, one entry per change of key
#[derive(Debug, Clone, Default)]
pub struct KeyHistory {
    entries: Vec<(DateTime<Utc>, KeyCandidate)>,
}

impl KeyHistory {
    /// Append `key` unless it is the same key as the last entry.
    pub fn record(&mut self, at: DateTime<Utc>, key: KeyCandidate) -> bool {
        let same = self
            .entries
            .last()
            .map(|(_, last)| (last.root, last.mode) == (key.root, key.mode))
            .unwrap_or(false);
        if same {
            return false;
        }
        if self.entries.len() == KEY_HISTORY_LIMIT {
            self.entries.remove(0);
        }
        self.entries.push((at, key));
        true
    }

    pub fn entries(&self) -> &[(DateTime<Utc>, KeyCandidate)] {
        &self.entries
    }

    pub fn current(&self) -> Option<&KeyCandidate> {
        self.entries.last().map(|(_, key)| key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Re-runs chord matching and key finding against snapshots of a
/// [`SharedNoteState`].
///
/// Chords are recomputed when the mask or the scan's starting root changes.
/// The chord scan is seeded at the current key's tonic once a key is known,
/// otherwise at the configured root hint.
pub struct HarmonyMonitor {
    state: SharedNoteState,
    catalog: ChordCatalog,
    correlator: KeyCorrelator,
    window: RollingHistogram,
    root_hint: PitchClass,
    poll_interval: Duration,
    last_mask: Option<PitchClassSet>,
    last_hint: Option<PitchClass>,
    last_chords: Vec<CombinedChord>,
    last_key: Option<(PitchClass, Mode)>,
    history: KeyHistory,
}

impl HarmonyMonitor {
    pub fn new(
        state: SharedNoteState,
        catalog: ChordCatalog,
        correlator: KeyCorrelator,
        config: &LiveConfig,
        root_hint: u8,
    ) -> crate::theory::Result<Self> {
        Ok(Self {
            state,
            catalog,
            correlator,
            window: RollingHistogram::new(config.key_window_secs),
            root_hint: PitchClass::root(root_hint)?,
            poll_interval: Duration::from_millis(config.poll_interval_ms.max(1)),
            last_mask: None,
            last_hint: None,
            last_chords: Vec::new(),
            last_key: None,
            history: KeyHistory::default(),
        })
    }

    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    pub fn history(&self) -> &KeyHistory {
        &self.history
    }

    /// Sample the note state once; returns the change if chords or key moved.
    pub fn tick(&mut self, now: Instant) -> Option<HarmonyChange> {
        let mask = self.state.snapshot();
        self.window.record(mask, now);

        let key = match self.correlator.best(&self.window.histogram()) {
            Ok(key) => key,
            Err(e) => {
                log::warn!("Key evaluation failed: {}", e);
                None
            }
        };
        let key_id = key.map(|k| (k.root, k.mode));
        let key_changed = key_id != self.last_key;
        self.last_key = key_id;

        let hint = key.map(|k| k.root).unwrap_or(self.root_hint);
        let chords_changed = if self.last_mask != Some(mask) || self.last_hint != Some(hint) {
            self.last_mask = Some(mask);
            self.last_hint = Some(hint);
            let chords = match find_chords(mask, hint.value(), &self.catalog) {
                Ok(chords) => chords,
                Err(e) => {
                    log::warn!("Chord evaluation failed: {}", e);
                    Vec::new()
                }
            };
            let changed = chords != self.last_chords;
            self.last_chords = chords;
            changed
        } else {
            false
        };

        if !chords_changed && !key_changed {
            return None;
        }

        let at = Utc::now();
        if let Some(key) = key {
            if self.history.record(at, key) {
                log::debug!("Key is now {} (score {:.3})", key, key.score);
            }
        }

        Some(HarmonyChange {
            at,
            mask,
            chords: self.last_chords.clone(),
            key,
            chords_changed,
            key_changed,
        })
    }

    /// Tick on the poll interval until `stop` is set.
    pub fn run(&mut self, stop: &AtomicBool, mut on_change: impl FnMut(&HarmonyChange)) {
        log::info!("Harmony monitor running every {:?}", self.poll_interval);
        while !stop.load(Ordering::SeqCst) {
            if let Some(change) = self.tick(Instant::now()) {
                on_change(&change);
            }
            std::thread::sleep(self.poll_interval);
        }
        log::info!("Harmony monitor stopped after {} key changes", self.history.len());
    }

    /// Run on a background thread.
    pub fn spawn(
        mut self,
        mut on_change: impl FnMut(&HarmonyChange) + Send + 'static,
    ) -> anyhow::Result<MonitorHandle> {
        let stop = Arc::new(AtomicBool::new(false));
        let stop_flag = stop.clone();

        let handle = std::thread::Builder::new()
            .name("chordscope-monitor".into())
            .spawn(move || {
                self.run(&stop_flag, &mut on_change);
                self.history
            })?;

        Ok(MonitorHandle {
            stop,
            handle: Some(handle),
        })
    }
}

/// Handle to a monitor thread; stops it on drop
pub struct MonitorHandle {
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<KeyHistory>>,
}

impl MonitorHandle {
    pub fn stop_flag(&self) -> Arc<AtomicBool> {
        self.stop.clone()
    }

    /// Stop the thread and return the keys it selected.
    pub fn stop(mut self) -> KeyHistory {
        self.shutdown().unwrap_or_default()
    }

    fn shutdown(&mut self) -> Option<KeyHistory> {
        self.stop.store(true, Ordering::SeqCst);
        self.handle.take().and_then(|handle| handle.join().ok())
    }
}

impl Drop for MonitorHandle {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::theory::ProfilePair;

    fn monitor(state: &SharedNoteState) -> HarmonyMonitor {
        HarmonyMonitor::new(
            state.clone(),
            ChordCatalog::standard(),
            KeyCorrelator::new(ProfilePair::krumhansl_kessler()),
            &LiveConfig::default(),
            0,
        )
        .unwrap()
    }

    #[test]
    fn test_rejects_bad_root_hint() {
        let result = HarmonyMonitor::new(
            SharedNoteState::new(),
            ChordCatalog::standard(),
            KeyCorrelator::default(),
            &LiveConfig::default(),
            12,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_reports_chord_change_once() {
        let state = SharedNoteState::new();
        let mut monitor = monitor(&state);
        let start = Instant::now();

        assert!(monitor.tick(start).is_none());

        for note in [60, 64, 67] {
            state.note_on(note, 0);
        }
        let change = monitor.tick(start + Duration::from_millis(8)).unwrap();
        assert!(change.chords_changed);
        assert_eq!(change.mask.bits(), 0x091);
        assert_eq!(change.chords.len(), 1);
        assert_eq!(change.chords[0].name, "Major Triad");

        // Same notes: the chord stays, the key settles from the first sample
        let settled = monitor.tick(start + Duration::from_millis(16));
        assert!(settled.map(|c| !c.chords_changed).unwrap_or(true));
    }

    #[test]
    fn test_key_history_follows_window() {
        let state = SharedNoteState::new();
        let mut monitor = monitor(&state);
        let start = Instant::now();

        for note in [60, 62, 64, 65, 67, 69, 71] {
            state.note_on(note, 0);
        }
        monitor.tick(start);
        monitor.tick(start + Duration::from_millis(100));

        let key = monitor.history().current().copied().unwrap();
        assert_eq!((key.root, key.mode), (PitchClass::C, Mode::Major));
        assert_eq!(monitor.history().len(), 1);
    }

    #[test]
    fn test_key_change_reseeds_held_chord() {
        let state = SharedNoteState::new();
        let mut monitor = monitor(&state);
        let start = Instant::now();

        for note in [60, 62, 64, 65, 67, 69, 71] {
            state.note_on(note, 0);
        }
        monitor.tick(start);
        monitor.tick(start + Duration::from_secs(1));

        // C7 and F#7 together, heard while the window still says C major
        state.all_notes_off();
        for note in [60, 64, 67, 70, 66, 61] {
            state.note_on(note, 0);
        }
        let first = monitor.tick(start + Duration::from_millis(1008)).unwrap();
        assert_eq!(first.key.map(|k| k.root), Some(PitchClass::C));
        assert_eq!(first.chords[0].root, PitchClass::C);

        // Same notes once the scale has left the window: E minor seeds at F#
        let later = monitor.tick(start + Duration::from_secs(20)).unwrap();
        assert_eq!(later.mask, first.mask);
        assert_eq!(later.key.map(|k| (k.root.value(), k.mode)), Some((4, Mode::Minor)));
        assert!(later.chords_changed);
        assert_eq!(later.chords[0].root.value(), 6);
        assert_eq!(later.chords[0].name, "Dominant seventh Chord + Dominant seventh Chord on C");
    }

    #[test]
    fn test_key_history_skips_repeats() {
        let mut history = KeyHistory::default();
        let key = KeyCandidate {
            root: PitchClass::C,
            mode: Mode::Major,
            score: 9.0,
        };
        assert!(history.record(Utc::now(), key));
        assert!(!history.record(Utc::now(), KeyCandidate { score: 8.0, ..key }));
        assert!(history.record(Utc::now(), KeyCandidate { mode: Mode::Minor, ..key }));
        assert_eq!(history.len(), 2);
    }

    #[test]
    fn test_spawned_monitor_stops() {
        let state = SharedNoteState::new();
        let handle = monitor(&state).spawn(|_| {}).unwrap();
        for note in [57, 60, 64] {
            state.note_on(note, 0);
        }
        std::thread::sleep(Duration::from_millis(50));
        let history = handle.stop();
        assert!(history.len() <= KEY_HISTORY_LIMIT);
    }
}
