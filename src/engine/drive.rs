#![doc = r#"
Stepper-motor drives: which channel owns which drive, and the packets that
tell a drive what to play.

A drive plays one pitch at a time over a narrow range, so notes are shifted
down and folded by octaves into that range before they are sent.

# Packet layout
```text
byte 0      bytes 1..=3 (little-endian)
drive id    round(frequency * pitch bend * 10000), 24 bits
```
A stop packet carries the drive id and a zero frequency field.
"#]

use core::fmt;

use crate::{
    file::MidiFile,
    message::{Channel, TrackMessage, VoiceKind},
    note::{Note, frequency_of},
};

use super::channel::is_valid_program;

const FREQUENCY_SCALE: f64 = 10_000.0;
const FREQUENCY_MASK: u32 = 0x00FF_FFFF;

/// Index of one physical drive
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DriveId(u8);

impl DriveId {
    /// Wrap a drive index
    pub const fn new(index: u8) -> Self {
        Self(index)
    }

    /// The drive index
    pub const fn index(&self) -> u8 {
        self.0
    }
}

impl fmt::Display for DriveId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// When a channel is given a drive
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriveAssignment {
    /// The first time the channel sounds a note during playback
    Sequential,
    /// In the order channels first sound a note in the file, decided before
    /// playback by [`DrivePlan::scan`]
    FirstSeen,
}

impl DriveAssignment {
    /// The policy this build was compiled with
    pub const fn from_build() -> Self {
        if cfg!(feature = "first-seen-drives") {
            Self::FirstSeen
        } else {
            Self::Sequential
        }
    }
}

impl Default for DriveAssignment {
    fn default() -> Self {
        Self::from_build()
    }
}

/// Physical limits of the drives
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DriveSettings {
    /// Drives on the controller
    pub count: u8,
    /// Lowest playable note after folding
    pub min_note: u8,
    /// Highest playable note after folding
    pub max_note: u8,
    /// Semitones every note is lowered by before folding
    pub down_shift: u8,
    /// Notes with `expression * volume` below this are not sent
    pub min_loudness: u32,
}

impl Default for DriveSettings {
    fn default() -> Self {
        Self {
            count: 15,
            min_note: 25,
            max_note: 57,
            down_shift: 12,
            min_loudness: 1000,
        }
    }
}

impl DriveSettings {
    /// Shift `note` down, then move it by whole octaves into the playable range
    pub fn fold(&self, note: Note) -> i32 {
        let (low, high) = (i32::from(self.min_note), i32::from(self.max_note));
        let mut folded = i32::from(note.byte()) - i32::from(self.down_shift);
        while folded > high {
            folded -= 12;
        }
        while folded < low {
            folded += 12;
        }
        folded
    }

    /// Frequency a drive plays for `note`
    pub fn frequency(&self, note: Note) -> f64 {
        frequency_of(self.fold(note))
    }

    /// True when a channel at this volume and expression is loud enough to send
    pub fn is_audible(&self, volume: u8, expression: u8) -> bool {
        u32::from(volume) * u32::from(expression) >= self.min_loudness
    }
}

/// Hands out drives in order until there are none left
#[derive(Debug, Clone)]
pub struct DrivePool {
    next: u8,
    capacity: u8,
}

impl DrivePool {
    /// A pool of `capacity` drives
    pub const fn new(capacity: u8) -> Self {
        Self { next: 0, capacity }
    }

    /// Claim the next drive, or `None` once every drive is taken
    pub fn claim(&mut self) -> Option<DriveId> {
        if self.next >= self.capacity {
            return None;
        }
        let id = DriveId(self.next);
        self.next += 1;
        Some(id)
    }

    /// Drives handed out so far
    pub fn claimed(&self) -> impl Iterator<Item = DriveId> + use<> {
        (0..self.next).map(DriveId)
    }
}

/// A 4-byte command for the drive controller
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DriveCommand {
    /// Play a frequency
    Play {
        /// target drive
        drive: DriveId,
        /// frequency in Hz, pitch bend included
        frequency: f64,
    },
    /// Go silent
    Stop {
        /// target drive
        drive: DriveId,
    },
}

impl DriveCommand {
    /// Encode as the packet sent on the wire
    pub fn to_packet(&self) -> [u8; 4] {
        let word = match *self {
            Self::Play { drive, frequency } => {
                let quantized = (frequency * FREQUENCY_SCALE).round() as u32 & FREQUENCY_MASK;
                u32::from(drive.0) | (quantized << 8)
            }
            Self::Stop { drive } => u32::from(drive.0),
        };
        word.to_le_bytes()
    }
}

#[doc = r#"
Channels in the order they first sound a note, walking the tracks in file
order.

Program changes are followed along the way, so a channel switched to an
unvoiceable program before its first note is skipped. Percussion never counts.
"#]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DrivePlan {
    channels: Vec<Channel>,
}

impl DrivePlan {
    /// Walk every track of `file`
    pub fn scan(file: &MidiFile) -> Self {
        let mut programs = [0u8; 16];
        let mut channels: Vec<Channel> = Vec::new();
        let messages = file
            .tracks()
            .iter()
            .flat_map(|track| track.events())
            .filter_map(|event| match event.message() {
                TrackMessage::ChannelVoice(msg) => Some(*msg),
                _ => None,
            });
        for msg in messages {
            let (Some(kind), Some(channel)) = (msg.kind(), msg.channel()) else {
                continue;
            };
            match kind {
                VoiceKind::ProgramChange => programs[channel.index()] = msg.data1(),
                VoiceKind::NoteOn
                    if !channel.is_percussion()
                        && is_valid_program(programs[channel.index()])
                        && !channels.contains(&channel) =>
                {
                    channels.push(channel);
                }
                _ => {}
            }
        }
        Self { channels }
    }

    /// Every channel that sounds, in first-seen order
    pub fn channels(&self) -> &[Channel] {
        &self.channels
    }

    /// Number of distinct channels that sound
    pub fn len(&self) -> usize {
        self.channels.len()
    }

    /// True when nothing in the file sounds
    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn packet_layout() {
        let play = DriveCommand::Play {
            drive: DriveId::new(3),
            frequency: 110.0,
        };
        // 110 Hz -> 1_100_000 = 0x10C8E0
        assert_eq!(play.to_packet(), [0x03, 0xE0, 0xC8, 0x10]);
        let stop = DriveCommand::Stop {
            drive: DriveId::new(3),
        };
        assert_eq!(stop.to_packet(), [0x03, 0, 0, 0]);
    }

    #[test]
    fn frequency_field_is_rounded_and_masked() {
        let rounded = DriveCommand::Play {
            drive: DriveId::new(0),
            frequency: 0.000_06,
        };
        assert_eq!(rounded.to_packet(), [0, 1, 0, 0]);
        let huge = DriveCommand::Play {
            drive: DriveId::new(1),
            frequency: 2000.0,
        };
        // 20_000_000 = 0x1312D00, top byte dropped
        assert_eq!(huge.to_packet(), [1, 0x00, 0x2D, 0x31]);
    }

    #[test]
    fn notes_fold_into_drive_range() {
        let settings = DriveSettings::default();
        assert_eq!(settings.fold(Note::A4), 57);
        assert_eq!(settings.fold(Note::from_byte(81)), 57);
        assert_eq!(settings.fold(Note::from_byte(100)), 52);
        assert_eq!(settings.fold(Note::from_byte(30)), 30);
        assert_eq!(settings.fold(Note::from_byte(0)), 36);
        assert_eq!(settings.frequency(Note::A4), 220.0);
    }

    #[test]
    fn pool_saturates() {
        let mut pool = DrivePool::new(2);
        assert_eq!(pool.claim(), Some(DriveId::new(0)));
        assert_eq!(pool.claim(), Some(DriveId::new(1)));
        assert_eq!(pool.claim(), None);
        assert_eq!(pool.claimed().collect::<Vec<_>>(), vec![DriveId::new(0), DriveId::new(1)]);
    }

    #[test]
    fn loudness_threshold_is_inclusive() {
        let settings = DriveSettings::default();
        assert!(settings.is_audible(10, 100));
        assert!(!settings.is_audible(9, 111));
    }
}
