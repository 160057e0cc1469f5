#![doc = r#"
Channel voice messages and the system common/real-time messages that share
their running-status slot in a track.

# Layout
```text
status  data1  [data2]
 |  \
 |   low nibble: channel 0-15 (shown as 1-16)
 high nibble: message kind 0x8-0xE
```
"#]
mod controller;
pub use controller::*;

use core::fmt;

use num_enum::TryFromPrimitive;

use crate::{
    ParseError,
    engine::{DEFAULT_PITCH_BEND_SEMITONES, pitch_bend_factor},
    note::Note,
    reader::{ReadResult, Reader, inv_data},
};

/// One of the 16 logical MIDI channels, numbered 1 through 16.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Channel(u8);

impl Channel {
    /// Channel 10, reserved for percussion
    pub const PERCUSSION: Self = Self(10);

    /// Create a channel from its 1-based number. Returns `None` outside 1..=16.
    pub const fn new(number: u8) -> Option<Self> {
        if number >= 1 && number <= 16 {
            Some(Self(number))
        } else {
            None
        }
    }

    /// Channel encoded in the low nibble of a status byte
    pub const fn from_status(status: u8) -> Self {
        Self((status & 0x0F) + 1)
    }

    /// Every channel, 1 through 16
    pub fn all() -> impl Iterator<Item = Channel> {
        (1..=16).map(Self)
    }

    /// The 1-based channel number
    pub const fn number(&self) -> u8 {
        self.0
    }

    /// The 0-based index, for per-channel tables
    pub const fn index(&self) -> usize {
        (self.0 - 1) as usize
    }

    /// True for channel 10
    pub const fn is_percussion(&self) -> bool {
        self.0 == Self::PERCUSSION.0
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// The kind of channel voice message, taken from the high nibble of its status
#[derive(Debug, Clone, Copy, PartialEq, Eq, TryFromPrimitive)]
#[repr(u8)]
pub enum VoiceKind {
    /// 0x8n
    NoteOff = 0x8,
    /// 0x9n
    NoteOn = 0x9,
    /// 0xAn
    PolyphonicKeyPressure = 0xA,
    /// 0xBn, also carries the channel mode messages
    ControlChange = 0xB,
    /// 0xCn
    ProgramChange = 0xC,
    /// 0xDn
    ChannelPressure = 0xD,
    /// 0xEn
    PitchBend = 0xE,
}

#[doc = r#"
A status byte followed by up to two data bytes.

Unused data bytes are zero. Statuses 0x80 to 0xEF are channel voice messages;
0xF1 to 0xFE are system common or real-time messages that happen to appear
in a track without an escape.
"#]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelVoiceMessage {
    status: u8,
    data1: u8,
    data2: u8,
}

impl ChannelVoiceMessage {
    /// Build a message from raw bytes
    pub const fn new(status: u8, data1: u8, data2: u8) -> Self {
        Self {
            status,
            data1,
            data2,
        }
    }

    /// How many data bytes follow a status byte
    pub const fn data_byte_count(status: u8) -> usize {
        match status {
            0xC0..=0xDF => 1,
            0xF1 | 0xF3 => 1,
            0xF2 => 2,
            0xF4..=0xFF => 0,
            _ => 2,
        }
    }

    /// Decode a message whose first byte has already been consumed.
    ///
    /// A first byte below 0x80 is a data byte: the track's running status
    /// supplies the status. Any other first byte is the status and becomes the
    /// new running status.
    pub(crate) fn read(
        reader: &mut Reader<'_>,
        running_status: &mut Option<u8>,
        first_byte: u8,
    ) -> ReadResult<Self> {
        let (status, data1) = if first_byte < 0x80 {
            let Some(status) = *running_status else {
                return Err(inv_data(
                    reader,
                    ParseError::MissingRunningStatus(first_byte),
                ));
            };
            (status, Some(first_byte))
        } else {
            *running_status = Some(first_byte);
            (first_byte, None)
        };

        let count = Self::data_byte_count(status);
        let data1 = match data1 {
            Some(byte) => byte,
            None if count >= 1 => reader.read_u8()?,
            None => 0,
        };
        let data2 = if count == 2 { reader.read_u8()? } else { 0 };

        Ok(Self::new(status, data1, data2))
    }

    /// The raw status byte
    pub const fn status(&self) -> u8 {
        self.status
    }

    /// First data byte
    pub const fn data1(&self) -> u8 {
        self.data1
    }

    /// Second data byte
    pub const fn data2(&self) -> u8 {
        self.data2
    }

    /// The message kind, if this is a channel voice status
    pub fn kind(&self) -> Option<VoiceKind> {
        VoiceKind::try_from(self.status >> 4).ok()
    }

    /// The channel, if this is a channel voice status
    pub fn channel(&self) -> Option<Channel> {
        self.kind().map(|_| Channel::from_status(self.status))
    }

    /// The note, for note and polyphonic pressure messages
    pub const fn note(&self) -> Note {
        Note::from_byte(self.data1)
    }

    /// The 14-bit pitch bend value, centered on 8192
    pub const fn pitch_bend(&self) -> u16 {
        ((self.data2 as u16 & 0x7F) << 7) | (self.data1 as u16 & 0x7F)
    }

    fn fmt_system(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.status {
            0xF1 => write!(f, "MIDI Time Code Quarter Frame: {}", self.data1),
            0xF2 => write!(
                f,
                "Song Position Pointer: {}",
                (u16::from(self.data2) << 7) | u16::from(self.data1)
            ),
            0xF3 => write!(f, "Song Select: {}", self.data1),
            0xF6 => write!(f, "Tune Request"),
            0xF8 => write!(f, "Timing Clock"),
            0xFA => write!(f, "Start"),
            0xFB => write!(f, "Continue"),
            0xFC => write!(f, "Stop"),
            0xFE => write!(f, "Active Sensing"),
            status => write!(f, "Unknown (Code {status:#04x})"),
        }
    }
}

impl fmt::Display for ChannelVoiceMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (Some(kind), Some(channel)) = (self.kind(), self.channel()) else {
            return self.fmt_system(f);
        };
        write!(f, "Chan {channel} ")?;
        match kind {
            VoiceKind::NoteOff => write!(
                f,
                "Note OFF: {}, Velocity (0 - 127): {}",
                self.note(),
                self.data2
            ),
            VoiceKind::NoteOn => write!(
                f,
                "Note ON: {}, Velocity (0 - 127): {}",
                self.note(),
                self.data2
            ),
            VoiceKind::PolyphonicKeyPressure => write!(
                f,
                "Polyphonic Key Pressure: {}, Pressure (0 - 127): {}",
                self.note(),
                self.data2
            ),
            VoiceKind::ControlChange => write!(
                f,
                "Control/Mode Change: {}",
                ControllerChange::new(self.data1, self.data2)
            ),
            VoiceKind::ProgramChange => {
                write!(f, "Program Change: Select Program (0-127): {}", self.data1)
            }
            VoiceKind::ChannelPressure => {
                write!(f, "Channel Pressure (0 - 127): {}", self.data1)
            }
            VoiceKind::PitchBend => {
                let value = self.pitch_bend();
                let factor = pitch_bend_factor(value, DEFAULT_PITCH_BEND_SEMITONES);
                write!(f, "Pitch Bend Change (0-16383): {value} (factor=={factor:.5})")
            }
        }
    }
}
