#![doc = r#"
The events a track chunk is made of.

Every event is a delta time followed by one of three message families:

```text
<delta:VLQ> F0|F7 <len:VLQ> <bytes>        system exclusive
<delta:VLQ> FF <type> <len:VLQ> <bytes>    meta
<delta:VLQ> [status] data1 [data2]         channel voice (status may be omitted)
```

Each family can decode itself, describe itself through [`Display`](core::fmt::Display),
and apply its playback effect to a [`PlaybackTarget`].
"#]

mod channel;
pub use channel::*;

mod meta;
pub use meta::*;

mod sysex;
pub use sysex::*;

use core::fmt;

use itertools::Itertools;
use tracing::warn;

use crate::{
    note::Note,
    reader::{ReadResult, Reader},
    tempo::Tempo,
};

/// Receives the playback effects of track events.
///
/// Percussion (channel 10) never reaches a target; [`TrackMessage::apply`]
/// filters it out.
pub trait PlaybackTarget {
    /// Start or retrigger a note. Velocity of 0 or 1 stops it instead.
    fn note_on(&self, channel: Channel, note: Note, velocity: u8);
    /// Stop a note
    fn note_off(&self, channel: Channel, note: Note);
    /// Select a program for a channel
    fn set_program(&self, channel: Channel, program: u8);
    /// Channel volume, controller 7
    fn set_volume(&self, channel: Channel, volume: u8);
    /// Expression, controller 11
    fn set_expression(&self, channel: Channel, expression: u8);
    /// 14-bit pitch bend, 8192 is centered
    fn set_pitch_bend(&self, channel: Channel, value: u16);
    /// A new tempo for every track
    fn set_tempo(&self, tempo: Tempo);
    /// The track reached its end-of-track marker
    fn end_of_track(&self, track: usize);
}

/// One of the three event families
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrackMessage {
    /// Channel voice, system common and real-time messages
    ChannelVoice(ChannelVoiceMessage),
    /// System exclusive messages
    SystemExclusive(SystemExclusiveMessage),
    /// Meta events
    Meta(MetaMessage),
}

impl TrackMessage {
    /// Dispatch this message's playback effect
    pub fn apply<T: PlaybackTarget + ?Sized>(&self, target: &T, track: usize) {
        match self {
            Self::ChannelVoice(msg) => apply_voice(msg, target),
            Self::Meta(meta) => match meta.meta_type() {
                Some(MetaType::Tempo) => match meta.tempo() {
                    Some(tempo) => target.set_tempo(tempo),
                    None => warn!(track, payload = ?meta.bytes(), "ignoring malformed tempo"),
                },
                Some(MetaType::EndOfTrack) => target.end_of_track(track),
                _ => {}
            },
            Self::SystemExclusive(_) => {}
        }
    }
}

fn apply_voice<T: PlaybackTarget + ?Sized>(msg: &ChannelVoiceMessage, target: &T) {
    let (Some(kind), Some(channel)) = (msg.kind(), msg.channel()) else {
        return;
    };
    if channel.is_percussion() {
        return;
    }
    match kind {
        VoiceKind::NoteOff => target.note_off(channel, msg.note()),
        VoiceKind::NoteOn => target.note_on(channel, msg.note(), msg.data2()),
        VoiceKind::ControlChange => match Controller::try_from(msg.data1()) {
            Ok(Controller::ChannelVolume) => target.set_volume(channel, msg.data2()),
            Ok(Controller::Expression) => target.set_expression(channel, msg.data2()),
            _ => {}
        },
        VoiceKind::ProgramChange => target.set_program(channel, msg.data1()),
        VoiceKind::PitchBend => target.set_pitch_bend(channel, msg.pitch_bend()),
        VoiceKind::PolyphonicKeyPressure | VoiceKind::ChannelPressure => {}
    }
}

impl fmt::Display for TrackMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ChannelVoice(msg) => write!(f, "MIDI Event: {msg}"),
            Self::SystemExclusive(msg) => write!(f, "SysEx Event: {msg}"),
            Self::Meta(msg) => write!(f, "Meta Event: {msg}"),
        }
    }
}

impl From<ChannelVoiceMessage> for TrackMessage {
    fn from(value: ChannelVoiceMessage) -> Self {
        Self::ChannelVoice(value)
    }
}

impl From<MetaMessage> for TrackMessage {
    fn from(value: MetaMessage) -> Self {
        Self::Meta(value)
    }
}

impl From<SystemExclusiveMessage> for TrackMessage {
    fn from(value: SystemExclusiveMessage) -> Self {
        Self::SystemExclusive(value)
    }
}

#[doc = r#"
A message and the ticks since the previous event of the same track
"#]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackEvent {
    delta_ticks: u32,
    message: TrackMessage,
}

impl TrackEvent {
    /// Pair a message with its delta time
    pub fn new(delta_ticks: u32, message: impl Into<TrackMessage>) -> Self {
        Self {
            delta_ticks,
            message: message.into(),
        }
    }

    /// Read one event. `running_status` carries the last status byte seen in
    /// this chunk.
    pub(crate) fn read(reader: &mut Reader<'_>, running_status: &mut Option<u8>) -> ReadResult<Self> {
        let delta_ticks = reader.read_vlq()?;
        let first_byte = reader.read_u8()?;
        let message = match first_byte {
            0xF0 | 0xF7 => SystemExclusiveMessage::read(reader, first_byte)?.into(),
            0xFF => MetaMessage::read(reader)?.into(),
            _ => ChannelVoiceMessage::read(reader, running_status, first_byte)?.into(),
        };
        Ok(Self {
            delta_ticks,
            message,
        })
    }

    /// Ticks since the previous event in the track
    pub const fn delta_ticks(&self) -> u32 {
        self.delta_ticks
    }

    /// The message itself
    pub const fn message(&self) -> &TrackMessage {
        &self.message
    }
}

/// Upper-case hex bytes separated by spaces
pub(crate) fn hex_dump(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02X}")).join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use pretty_assertions::assert_eq;

    #[derive(Default)]
    struct Recorder(Mutex<Vec<String>>);

    impl Recorder {
        fn push(&self, s: String) {
            self.0.lock().push(s);
        }
        fn take(&self) -> Vec<String> {
            core::mem::take(&mut *self.0.lock())
        }
    }

    impl PlaybackTarget for Recorder {
        fn note_on(&self, channel: Channel, note: Note, velocity: u8) {
            self.push(format!("on {channel} {} {velocity}", note.byte()));
        }
        fn note_off(&self, channel: Channel, note: Note) {
            self.push(format!("off {channel} {}", note.byte()));
        }
        fn set_program(&self, channel: Channel, program: u8) {
            self.push(format!("program {channel} {program}"));
        }
        fn set_volume(&self, channel: Channel, volume: u8) {
            self.push(format!("volume {channel} {volume}"));
        }
        fn set_expression(&self, channel: Channel, expression: u8) {
            self.push(format!("expression {channel} {expression}"));
        }
        fn set_pitch_bend(&self, channel: Channel, value: u16) {
            self.push(format!("bend {channel} {value}"));
        }
        fn set_tempo(&self, tempo: Tempo) {
            self.push(format!("tempo {}", tempo.micros_per_quarter_note()));
        }
        fn end_of_track(&self, track: usize) {
            self.push(format!("end {track}"));
        }
    }

    fn voice(status: u8, data1: u8, data2: u8) -> TrackMessage {
        ChannelVoiceMessage::new(status, data1, data2).into()
    }

    #[test]
    fn dispatches_by_status() {
        let recorder = Recorder::default();
        for msg in [
            voice(0x80, 60, 0),
            voice(0x91, 61, 90),
            voice(0xB2, 7, 80),
            voice(0xB2, 11, 70),
            voice(0xB2, 10, 64),
            voice(0xC3, 5, 0),
            voice(0xE4, 0x00, 0x40),
            voice(0xD0, 3, 0),
            voice(0xF8, 0, 0),
            MetaMessage::new(0x51, vec![0x07, 0xA1, 0x20]).into(),
            MetaMessage::new(0x03, b"lead".to_vec()).into(),
            MetaMessage::new(0x2F, Vec::new()).into(),
            SystemExclusiveMessage::new(false, vec![0x7E, 0xF7]).into(),
        ] {
            msg.apply(&recorder, 2);
        }
        assert_eq!(
            recorder.take(),
            vec![
                "off 1 60",
                "on 2 61 90",
                "volume 3 80",
                "expression 3 70",
                "program 4 5",
                "bend 5 8192",
                "tempo 500000",
                "end 2",
            ]
        );
    }

    #[test]
    fn percussion_channel_never_dispatches() {
        let recorder = Recorder::default();
        for status in [0x89, 0x99, 0xB9, 0xC9, 0xE9] {
            voice(status, 7, 100).apply(&recorder, 0);
        }
        assert!(recorder.take().is_empty());
    }

    #[test]
    fn reads_each_family() {
        let bytes = [
            0x00, 0xFF, 0x03, 0x02, b'h', b'i', // meta
            0x81, 0x00, 0xF0, 0x02, 0x7E, 0xF7, // sysex after 128 ticks
            0x00, 0x90, 0x45, 0x64, // note on
            0x10, 0x45, 0x00, // running status
        ];
        let mut reader = Reader::from_byte_slice(&bytes);
        let mut running = None;
        let mut events = Vec::new();
        while !reader.is_at_end() {
            events.push(TrackEvent::read(&mut reader, &mut running).unwrap());
        }
        assert_eq!(
            events,
            vec![
                TrackEvent::new(0, MetaMessage::new(0x03, b"hi".to_vec())),
                TrackEvent::new(128, SystemExclusiveMessage::new(false, vec![0x7E, 0xF7])),
                TrackEvent::new(0, ChannelVoiceMessage::new(0x90, 0x45, 0x64)),
                TrackEvent::new(16, ChannelVoiceMessage::new(0x90, 0x45, 0x00)),
            ]
        );
    }

    #[test]
    fn describes_with_family_prefix() {
        assert_eq!(
            TrackMessage::from(SystemExclusiveMessage::new(false, vec![0x43, 0x10, 0xF7]))
                .to_string(),
            "SysEx Event: 3 byte message: 43 10 F7"
        );
        assert_eq!(
            voice(0x80, 69, 64).to_string(),
            "MIDI Event: Chan 1 Note OFF: A4, Velocity (0 - 127): 64"
        );
        assert_eq!(
            TrackMessage::from(MetaMessage::new(0x2F, Vec::new())).to_string(),
            "Meta Event: End of Track"
        );
    }
}
