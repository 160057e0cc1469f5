use thiserror::Error;

#[doc = r#"
Errors raised while interpreting bytes as MIDI structures.

These never carry a position on their own; the [`Reader`](crate::reader::Reader)
wraps them in a [`ReaderError`](crate::reader::ReaderError) with the offset and
chunk where they occurred.
"#]
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// The `MThd` chunk is malformed
    #[error("Header: {0}")]
    Header(#[from] HeaderError),
    /// An `MTrk` chunk is malformed
    #[error("Chunk: {0}")]
    Chunk(#[from] ChunkError),
    /// A data byte appeared where a status byte was needed
    #[error("Data byte {0:#04x} with no running status to reuse")]
    MissingRunningStatus(u8),
    /// A variable length quantity decoded past 32 bits
    #[error("Variable length quantity overflows 32 bits")]
    VlqOverflow,
}

/// Problems with the header chunk
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum HeaderError {
    /// Fewer bytes than the fixed header requires
    #[error("File is {0} bytes, too short for a header")]
    TooShort(usize),
    /// First four bytes were not `MThd`
    #[error("Expected MThd, found {0:?}")]
    InvalidTag([u8; 4]),
    /// Format word outside of 0..=2
    #[error("Unknown format {0}")]
    InvalidFormat(u16),
    /// Division declares zero ticks per quarter note or per frame
    #[error("Division {0:#06x} declares zero ticks")]
    ZeroTicks(u16),
}

/// Problems with a track chunk
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ChunkError {
    /// Chunk tag was not `MTrk`
    #[error("Expected MTrk, found {0:?}")]
    InvalidTrackTag([u8; 4]),
    /// Events ran past the length the chunk declared
    #[error("Events end at {end}, past the declared chunk end {declared}")]
    Overrun {
        /// where the chunk said it ends
        declared: usize,
        /// where the last event actually ended
        end: usize,
    },
    /// A format 0 file held more than one track chunk
    #[error("Format 0 files hold a single track, found a second one")]
    MultipleTracksForSingleMultiChannel,
}
