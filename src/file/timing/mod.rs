mod smpte;
pub use smpte::*;

use core::fmt;

use crate::{
    HeaderError,
    reader::{ReadResult, Reader, inv_data},
    tempo::Tempo,
};

/// The header timing type.
///
/// This is either the number of ticks per quarter note or
/// an SMPTE frame rate and ticks per frame, decoded from the division word.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Timing {
    /// The midi file's delta times are defined using a tick rate per quarter note
    TicksPerQuarterNote(TicksPerQuarterNote),

    /// The midi file's delta times are defined using SMPTE frames
    Smpte(SmpteHeader),
}

impl Timing {
    /// The tickrate per quarter note defines what a "quarter note" means.
    ///
    /// The leading bit of the u16 is disregarded, so 1-32767
    pub const fn new_ticks_per_quarter_note(tpqn: u16) -> Self {
        Self::TicksPerQuarterNote(TicksPerQuarterNote(tpqn & 0x7FFF))
    }

    /// Define the timing in terms of fps and ticks per frame
    pub const fn new_smpte(fps: SmpteFps, ticks_per_frame: u8) -> Self {
        Self::Smpte(SmpteHeader {
            fps,
            ticks_per_frame,
        })
    }

    /// Decode the division word of a header chunk
    pub fn from_division(division: u16) -> Result<Self, HeaderError> {
        let [high, low] = division.to_be_bytes();
        let timing = if high >> 7 == 0 {
            Self::new_ticks_per_quarter_note(division)
        } else {
            Self::new_smpte(SmpteFps::from_division_byte(high as i8), low)
        };
        if timing.ticks() == 0 {
            return Err(HeaderError::ZeroTicks(division));
        }
        Ok(timing)
    }

    pub(crate) fn read(reader: &mut Reader<'_>) -> ReadResult<Self> {
        let division = reader.read_u16_be()?;
        Self::from_division(division).map_err(|e| inv_data(reader, e))
    }

    /// Encode back into a division word
    pub const fn division(&self) -> u16 {
        match self {
            Self::TicksPerQuarterNote(t) => t.0,
            Self::Smpte(s) => {
                let high = (s.fps.as_division() as i8).wrapping_neg() as u8;
                u16::from_be_bytes([high, s.ticks_per_frame])
            }
        }
    }

    /// Returns Some if the midi timing is defined
    /// as ticks per quarter note
    pub const fn ticks_per_quarter_note(&self) -> Option<u16> {
        match self {
            Self::TicksPerQuarterNote(t) => Some(t.0),
            _ => None,
        }
    }

    const fn ticks(&self) -> u16 {
        match self {
            Self::TicksPerQuarterNote(t) => t.0,
            Self::Smpte(s) => s.ticks_per_frame as u16,
        }
    }

    /// Ticks per second under `tempo`.
    ///
    /// Quarter-note timing scales with the tempo; SMPTE timing does not.
    pub fn ticks_per_second(&self, tempo: Tempo) -> f64 {
        match self {
            Self::TicksPerQuarterNote(t) => {
                1_000_000.0 * f64::from(t.0) / f64::from(tempo.micros_per_quarter_note())
            }
            Self::Smpte(s) => f64::from(s.ticks_per_frame) * s.fps.as_f64(),
        }
    }
}

impl fmt::Display for Timing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TicksPerQuarterNote(t) => write!(f, "{} ticks per quarter note", t.0),
            Self::Smpte(s) => write!(f, "{}, {} ticks per frame", s.fps, s.ticks_per_frame),
        }
    }
}

/// A representation of the `tpqn` timing for a MIDI file
#[derive(Debug, Clone, PartialEq, Eq, Copy)]
pub struct TicksPerQuarterNote(u16);

impl TicksPerQuarterNote {
    /// Returns the ticks per quarter note for the file.
    pub const fn ticks_per_quarter_note(&self) -> u16 {
        self.0
    }
}

/// A representation of the `smpte` timing for a MIDI file
#[derive(Debug, Clone, PartialEq, Eq, Copy)]
pub struct SmpteHeader {
    fps: SmpteFps,
    ticks_per_frame: u8,
}

impl SmpteHeader {
    /// Returns the frames per second
    pub const fn fps(&self) -> SmpteFps {
        self.fps
    }

    /// Returns the ticks per frame
    pub const fn ticks_per_frame(&self) -> u8 {
        self.ticks_per_frame
    }
}
