#![doc = r#"
SMPTE frame rates for SMPTE-timed files.

When the top bit of the header's division is set, the high byte holds the
negated frame rate and the low byte the ticks per frame. Four rates are
standard; 29 stands for the 29.97 fps drop-frame rate of NTSC color video.
Any other rate is kept as written and counted at face value.
"#]

use core::fmt;

/// The possible FPS (Frames Per Second) for SMPTE-timed files
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SmpteFps {
    /// 24 frames per second, film
    TwentyFour,
    /// 25 frames per second, PAL/SECAM
    TwentyFive,
    /// 29.97 frames per second, NTSC drop-frame
    TwentyNine,
    /// 30 frames per second
    Thirty,
    /// A non-standard rate, in whole frames per second
    Other(u8),
}

impl SmpteFps {
    /// Interpret the signed high byte of an SMPTE division
    pub const fn from_division_byte(byte: i8) -> Self {
        match byte.unsigned_abs() {
            24 => Self::TwentyFour,
            25 => Self::TwentyFive,
            29 => Self::TwentyNine,
            30 => Self::Thirty,
            other => Self::Other(other),
        }
    }

    /// The nominal rate as written in the division byte
    pub const fn as_division(&self) -> u8 {
        match self {
            Self::TwentyFour => 24,
            Self::TwentyFive => 25,
            Self::TwentyNine => 29,
            Self::Thirty => 30,
            Self::Other(fps) => *fps,
        }
    }

    /// The actual frame rate, fractional for drop-frame
    pub const fn as_f64(&self) -> f64 {
        match self {
            Self::TwentyFour => 24.,
            Self::TwentyFive => 25.,
            Self::TwentyNine => DROP_FRAME,
            Self::Thirty => 30.,
            Self::Other(fps) => *fps as f64,
        }
    }
}

impl fmt::Display for SmpteFps {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TwentyNine => f.write_str("29.97 fps"),
            other => write!(f, "{} fps", other.as_division()),
        }
    }
}

/// NTSC drop-frame rate as counted by sequencers
const DROP_FRAME: f64 = 29.97;
