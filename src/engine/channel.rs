use crate::output::VoiceSlot;

use super::drive::DriveId;

/// False for percussion kits and sound effects, which neither voices nor
/// drives can approximate
pub const fn is_valid_program(program: u8) -> bool {
    !(program > 112 || (program >= 97 && program <= 104))
}

/// A note holding a voice slot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActiveNote {
    /// The slot sounding the note
    pub slot: VoiceSlot,
    /// Velocity of the most recent note on
    pub velocity: u8,
}

/// Everything one channel remembers during a session
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelState {
    pub(crate) program: u8,
    pub(crate) volume: u8,
    pub(crate) expression: u8,
    pub(crate) pitch_bend: f64,
    pub(crate) active: [Option<ActiveNote>; 128],
    pub(crate) drive: Option<DriveId>,
    pub(crate) has_been_used: bool,
    pub(crate) sounding_on_drive: bool,
    pub(crate) drive_frequency: f64,
}

impl Default for ChannelState {
    fn default() -> Self {
        Self {
            program: 0,
            volume: 100,
            expression: 127,
            pitch_bend: 1.0,
            active: [None; 128],
            drive: None,
            has_been_used: false,
            sounding_on_drive: false,
            drive_frequency: 0.0,
        }
    }
}

impl ChannelState {
    /// Current program
    pub fn program(&self) -> u8 {
        self.program
    }

    /// Channel volume, 0-127
    pub fn volume(&self) -> u8 {
        self.volume
    }

    /// Expression, 0-127
    pub fn expression(&self) -> u8 {
        self.expression
    }

    /// Pitch bend as a frequency multiplier
    pub fn pitch_bend(&self) -> f64 {
        self.pitch_bend
    }

    /// The drive this channel plays on, if it has one
    pub fn drive(&self) -> Option<DriveId> {
        self.drive
    }

    /// True while the channel's drive is playing a note
    pub fn is_sounding_on_drive(&self) -> bool {
        self.sounding_on_drive
    }

    /// Frequency last sent to the drive, before pitch bend
    pub fn drive_frequency(&self) -> f64 {
        self.drive_frequency
    }

    /// True when the current program can be voiced
    pub fn has_valid_program(&self) -> bool {
        is_valid_program(self.program)
    }

    /// The voice sounding `note`, if any
    pub fn active_note(&self, note: usize) -> Option<ActiveNote> {
        self.active.get(note).copied().flatten()
    }

    /// Number of notes holding a voice
    pub fn active_count(&self) -> usize {
        self.active.iter().flatten().count()
    }

    /// Notes holding a voice, with their note numbers
    pub fn active_notes(&self) -> impl Iterator<Item = (usize, ActiveNote)> + '_ {
        self.active
            .iter()
            .enumerate()
            .filter_map(|(note, active)| active.map(|a| (note, a)))
    }
}
