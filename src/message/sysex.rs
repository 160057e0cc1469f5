use core::fmt;

use crate::{
    message::hex_dump,
    reader::{ReadResult, Reader},
};

/// A system exclusive event, `F0 <len:VLQ> <bytes>` or the `F7` escape form.
///
/// These are kept for the structure report and never affect playback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SystemExclusiveMessage {
    escape: bool,
    bytes: Vec<u8>,
}

impl SystemExclusiveMessage {
    /// Build a message. `escape` marks the `F7` form.
    pub fn new(escape: bool, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            escape,
            bytes: bytes.into(),
        }
    }

    /// Decode after the `F0`/`F7` byte has been consumed
    pub(crate) fn read(reader: &mut Reader<'_>, first_byte: u8) -> ReadResult<Self> {
        let len = reader.read_vlq()?;
        let bytes = reader.read_raw(len as usize)?;
        Ok(Self::new(first_byte == 0xF7, bytes))
    }

    /// True for the `F7` escape form
    pub const fn is_escape(&self) -> bool {
        self.escape
    }

    /// The payload
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }
}

impl fmt::Display for SystemExclusiveMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} byte message: {}",
            self.bytes.len(),
            hex_dump(&self.bytes)
        )
    }
}
