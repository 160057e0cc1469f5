#![doc = r#"
Rusty representation of a [`MidiFile`]

A file is parsed in one pass: the header chunk first, then track chunks until
the buffer is exhausted. Parsing can be cancelled between chunks.
"#]

mod format;
pub use format::*;

mod header;
pub use header::*;

mod track;
pub use track::*;

mod timing;
pub use timing::*;

use std::path::{Path, PathBuf};

use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::{
    ChunkError,
    reader::{ReadResult, Reader, ReaderError, ReaderErrorKind},
};

/// Files larger than this are refused unless configured otherwise
pub const DEFAULT_MAX_FILE_BYTES: u64 = 2_000_000;

/// Errors from [`MidiFile::load`]
#[derive(Debug, Error)]
pub enum LoadError {
    /// The file could not be opened or read
    #[error("Failed to read {path}: {source}")]
    Io {
        /// the file
        path: PathBuf,
        /// the underlying failure
        source: std::io::Error,
    },
    /// The file is above the size cap
    #[error("{path} is {size} bytes, above the limit of {limit}")]
    TooLarge {
        /// the file
        path: PathBuf,
        /// its size
        size: u64,
        /// the cap
        limit: u64,
    },
    /// The bytes are not a valid MIDI file
    #[error(transparent)]
    Read(#[from] ReaderError),
}

impl LoadError {
    /// True when parsing stopped because it was cancelled
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Read(e) if e.is_cancelled())
    }
}

#[doc = r#"
A parsed Standard MIDI File.

Owns every event; the byte buffer it was parsed from can be dropped.

# Example
```rust
# use floppymidi::prelude::*;
let bytes = [
    b'M', b'T', b'h', b'd', 0, 0, 0, 6, 0, 0, 0, 1, 0, 96,
    b'M', b'T', b'r', b'k', 0, 0, 0, 4, 0, 0xFF, 0x2F, 0,
];
let file = MidiFile::parse(&bytes).unwrap();
assert_eq!(file.tracks().len(), 1);
assert_eq!(file.header().timing().ticks_per_quarter_note(), Some(96));
```
"#]
#[derive(Clone, Debug, PartialEq)]
pub struct MidiFile {
    header: MidiFileHeader,
    tracks: Vec<TrackChunk>,
}

impl MidiFile {
    /// Build a file from parts
    pub fn new(header: MidiFileHeader, tracks: Vec<TrackChunk>) -> Self {
        Self { header, tracks }
    }

    /// Parse a set of bytes into a file struct
    pub fn parse(bytes: &[u8]) -> ReadResult<Self> {
        Self::parse_cancellable(bytes, &CancellationToken::new())
    }

    /// Parse, checking `cancel` before every track chunk.
    ///
    /// A cancelled parse returns an error for which
    /// [`ReaderError::is_cancelled`] is true, and keeps none of the tracks read so far.
    pub fn parse_cancellable(bytes: &[u8], cancel: &CancellationToken) -> ReadResult<Self> {
        let mut reader = Reader::from_byte_slice(bytes);
        let header = MidiFileHeader::read(&mut reader)?;
        debug!(
            format = ?header.format(),
            tracks = header.track_count(),
            timing = %header.timing(),
            "parsed header"
        );

        let mut tracks = Vec::with_capacity(usize::from(header.track_count()));
        while !reader.is_at_end() {
            let index = tracks.len();
            reader.set_chunk(Some(index));
            if cancel.is_cancelled() {
                return Err(ReaderError::new(
                    reader.buffer_position(),
                    ReaderErrorKind::Cancelled,
                )
                .in_chunk(Some(index)));
            }
            if index == 1 && header.format() == FormatType::SingleMultiChannel {
                return Err(ReaderError::new(
                    reader.buffer_position(),
                    ReaderErrorKind::chunk(ChunkError::MultipleTracksForSingleMultiChannel),
                )
                .in_chunk(Some(index)));
            }
            let track = TrackChunk::read(&mut reader)?;
            debug!(index, events = track.len(), "parsed track chunk");
            tracks.push(track);
        }

        if tracks.len() != usize::from(header.track_count()) {
            warn!(
                declared = header.track_count(),
                found = tracks.len(),
                "track count in header does not match the chunks in the file"
            );
        }
        Ok(Self { header, tracks })
    }

    /// Read and parse a file, refusing anything above `max_bytes`
    pub fn load(path: impl AsRef<Path>, max_bytes: u64) -> Result<Self, LoadError> {
        Self::load_cancellable(path, max_bytes, &CancellationToken::new())
    }

    /// [`load`](Self::load), giving up between chunks once `cancel` fires
    pub fn load_cancellable(
        path: impl AsRef<Path>,
        max_bytes: u64,
        cancel: &CancellationToken,
    ) -> Result<Self, LoadError> {
        let path = path.as_ref();
        let io_err = |source| LoadError::Io {
            path: path.to_path_buf(),
            source,
        };
        let size = std::fs::metadata(path).map_err(io_err)?.len();
        if size > max_bytes {
            return Err(LoadError::TooLarge {
                path: path.to_path_buf(),
                size,
                limit: max_bytes,
            });
        }
        let bytes = std::fs::read(path).map_err(io_err)?;
        Ok(Self::parse_cancellable(&bytes, cancel)?)
    }

    /// Returns header info
    pub fn header(&self) -> &MidiFileHeader {
        &self.header
    }

    /// Returns the timing of the file
    pub fn timing(&self) -> Timing {
        *self.header.timing()
    }

    /// Returns the format type for the file.
    pub fn format_type(&self) -> FormatType {
        self.header.format()
    }

    /// Returns the track list
    pub fn tracks(&self) -> &[TrackChunk] {
        &self.tracks
    }
}
