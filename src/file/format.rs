use core::fmt;

use num_enum::TryFromPrimitive;

#[doc = r#"
How the tracks of a file relate to each other.

- Format 0 holds a single track carrying every channel.
- Format 1 holds tracks that play at the same time, sharing the tempo set on
  the first track.
- Format 2 holds independent patterns that play one after another.
"#]
#[derive(Debug, Clone, Copy, PartialEq, Eq, TryFromPrimitive)]
#[repr(u16)]
pub enum FormatType {
    /// Format 0
    SingleMultiChannel = 0,
    /// Format 1
    Simultaneous = 1,
    /// Format 2
    SequentiallyIndependent = 2,
}

impl FormatType {
    /// True when tracks start together and play in parallel
    pub const fn is_simultaneous(&self) -> bool {
        matches!(self, Self::Simultaneous)
    }
}

impl fmt::Display for FormatType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SingleMultiChannel => f.write_str("0 (single multi-channel track)"),
            Self::Simultaneous => f.write_str("1 (simultaneous tracks)"),
            Self::SequentiallyIndependent => f.write_str("2 (sequentially independent tracks)"),
        }
    }
}
