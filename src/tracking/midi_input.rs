// MIDI input: raw message decoding and live port connection

use midly::live::LiveEvent;
use midly::MidiMessage;

/// CC 120: all sound off
const CC_ALL_SOUND_OFF: u8 = 120;
/// CC 123: all notes off
const CC_ALL_NOTES_OFF: u8 = 123;

/// The subset of channel messages that change which notes are held
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoteMessage {
    NoteOn { channel: u8, note: u8, velocity: u8 },
    NoteOff { channel: u8, note: u8 },
    AllNotesOff { channel: u8 },
}

/// Decode one raw MIDI message.
///
/// A note-on with velocity 0 is a note-off. Returns `None` for anything that
/// does not affect held notes (controllers, clock, sysex, malformed bytes).
pub fn decode_message(bytes: &[u8]) -> Option<NoteMessage> {
    let event = LiveEvent::parse(bytes).ok()?;
    let LiveEvent::Midi { channel, message } = event else {
        return None;
    };
    let channel = channel.as_int();

    match message {
        MidiMessage::NoteOn { key, vel } if vel.as_int() > 0 => Some(NoteMessage::NoteOn {
            channel,
            note: key.as_int(),
            velocity: vel.as_int(),
        }),
        MidiMessage::NoteOn { key, .. } | MidiMessage::NoteOff { key, .. } => {
            Some(NoteMessage::NoteOff {
                channel,
                note: key.as_int(),
            })
        }
        MidiMessage::Controller { controller, .. }
            if matches!(controller.as_int(), CC_ALL_SOUND_OFF | CC_ALL_NOTES_OFF) =>
        {
            Some(NoteMessage::AllNotesOff { channel })
        }
        _ => None,
    }
}

#[cfg(feature = "live")]
pub use live::{list_input_ports, LiveMidiInput};

#[cfg(feature = "live")]
mod live {
    use chrono::{DateTime, Utc};
    use midir::{MidiInput, MidiInputConnection};

    use super::decode_message;
    use crate::tracking::active::SharedNoteState;

    /// Names of the available MIDI input ports, by index
    pub fn list_input_ports() -> anyhow::Result<Vec<String>> {
        let midi_in = MidiInput::new("chordscope-enum")?;
        let names = midi_in
            .ports()
            .iter()
            .filter_map(|port| midi_in.port_name(port).ok())
            .collect();
        Ok(names)
    }

    /// An open MIDI input port feeding a [`SharedNoteState`]
    pub struct LiveMidiInput {
        port_name: String,
        connection: Option<MidiInputConnection<()>>,
        started_at: DateTime<Utc>,
    }

    impl LiveMidiInput {
        /// Connect to a port chosen by name substring, or else by index.
        pub fn connect(
            state: SharedNoteState,
            port_name: Option<&str>,
            port_index: usize,
        ) -> anyhow::Result<Self> {
            let midi_in = MidiInput::new("chordscope-input")?;
            let ports = midi_in.ports();

            let mut port_info: Vec<(usize, String)> = Vec::new();
            for (idx, port) in ports.iter().enumerate() {
                if let Ok(name) = midi_in.port_name(port) {
                    port_info.push((idx, name));
                }
            }
            log::debug!("Available MIDI ports: {:?}", port_info);

            let index = match port_name {
                Some(wanted) => port_info
                    .iter()
                    .find(|(_, name)| name.contains(wanted))
                    .map(|(idx, _)| *idx)
                    .ok_or_else(|| anyhow::anyhow!("No MIDI port matching '{}'", wanted))?,
                None => port_index,
            };
            let port = ports
                .get(index)
                .ok_or_else(|| anyhow::anyhow!("MIDI port not found: {}", index))?;
            let name = midi_in.port_name(port).unwrap_or_else(|_| format!("port {}", index));

            let connection = midi_in
                .connect(
                    port,
                    "chordscope-input",
                    move |_timestamp_us, data, _| {
                        if let Some(message) = decode_message(data) {
                            state.apply(message);
                        }
                    },
                    (),
                )
                .map_err(|e| anyhow::anyhow!("Failed to connect to MIDI port: {}", e))?;

            log::info!("Listening on MIDI input '{}'", name);

            Ok(Self {
                port_name: name,
                connection: Some(connection),
                started_at: Utc::now(),
            })
        }

        pub fn port_name(&self) -> &str {
            &self.port_name
        }

        pub fn started_at(&self) -> DateTime<Utc> {
            self.started_at
        }

        /// Close the port
        pub fn close(&mut self) {
            if let Some(connection) = self.connection.take() {
                connection.close();
                log::info!(
                    "Closed MIDI input '{}' after {}s",
                    self.port_name,
                    (Utc::now() - self.started_at).num_seconds()
                );
            }
        }
    }

    impl Drop for LiveMidiInput {
        fn drop(&mut self) {
            self.close();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_note_on_and_off() {
        assert_eq!(
            decode_message(&[0x90, 60, 100]),
            Some(NoteMessage::NoteOn { channel: 0, note: 60, velocity: 100 })
        );
        assert_eq!(
            decode_message(&[0x83, 64, 0]),
            Some(NoteMessage::NoteOff { channel: 3, note: 64 })
        );
    }

    #[test]
    fn test_zero_velocity_note_on_is_release() {
        assert_eq!(
            decode_message(&[0x95, 67, 0]),
            Some(NoteMessage::NoteOff { channel: 5, note: 67 })
        );
    }

    #[test]
    fn test_all_notes_off_controllers() {
        assert_eq!(
            decode_message(&[0xB2, 123, 0]),
            Some(NoteMessage::AllNotesOff { channel: 2 })
        );
        assert_eq!(
            decode_message(&[0xB0, 120, 0]),
            Some(NoteMessage::AllNotesOff { channel: 0 })
        );
        // Sustain pedal does not release anything by itself
        assert_eq!(decode_message(&[0xB0, 64, 127]), None);
    }

    #[test]
    fn test_ignores_non_note_messages() {
        assert_eq!(decode_message(&[0xF8]), None);
        assert_eq!(decode_message(&[0xC0, 5]), None);
        assert_eq!(decode_message(&[]), None);
    }
}
