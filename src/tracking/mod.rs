// Live note tracking: held notes, rolling histograms and the harmony monitor

pub mod active;
pub mod midi_input;
pub mod monitor;
pub mod window;

pub use active::{NoteTracker, PitchClassCounter, SharedNoteState};
pub use midi_input::{decode_message, NoteMessage};
pub use monitor::{HarmonyChange, HarmonyMonitor, KeyHistory, MonitorHandle};
pub use window::RollingHistogram;
