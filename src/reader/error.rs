use super::Reader;
use crate::{ChunkError, ParseError};
use thiserror::Error;

#[doc = r#"
A set of errors that can occur while reading a file into the midi representation
"#]
#[derive(Debug, Error)]
#[error("Reading at Position {position}{}, {kind}", chunk_context(.chunk))]
pub struct ReaderError {
    position: usize,
    chunk: Option<usize>,
    pub(crate) kind: ReaderErrorKind,
}

/// A kind of error that a reader can produce
#[derive(Debug, Error)]
pub enum ReaderErrorKind {
    /// Parsing errors
    #[error("Parsing {0}")]
    ParseError(#[from] ParseError),
    /// Reading out of bounds.
    #[error("Read out of bounds!")]
    OutOfBounds,
    /// Parsing was stopped from outside before the file was fully read
    #[error("Cancelled")]
    Cancelled,
}

impl ReaderErrorKind {
    pub(crate) const fn chunk(chunk_err: ChunkError) -> Self {
        Self::ParseError(ParseError::Chunk(chunk_err))
    }
}

fn chunk_context(chunk: &Option<usize>) -> String {
    match chunk {
        Some(index) => format!(" in track chunk {index}"),
        None => String::new(),
    }
}

impl ReaderError {
    /// Create a reader error from a position and kind
    pub const fn new(position: usize, kind: ReaderErrorKind) -> Self {
        Self {
            position,
            chunk: None,
            kind,
        }
    }
    /// Attach the index of the track chunk being read
    pub const fn in_chunk(mut self, chunk: Option<usize>) -> Self {
        self.chunk = chunk;
        self
    }
    /// True if out of bounds or unexpected end of file
    pub const fn is_out_of_bounds(&self) -> bool {
        matches!(self.kind, ReaderErrorKind::OutOfBounds)
    }
    /// True if parsing was cancelled rather than failing on the input
    pub const fn is_cancelled(&self) -> bool {
        matches!(self.kind, ReaderErrorKind::Cancelled)
    }
    /// Returns the error kind of the reader.
    pub fn error_kind(&self) -> &ReaderErrorKind {
        &self.kind
    }
    /// Returns the position where the read error occurred.
    pub fn position(&self) -> usize {
        self.position
    }
    /// Returns the track chunk being read when the error occurred, if any.
    pub fn chunk(&self) -> Option<usize> {
        self.chunk
    }

    /// Create a new invalid data error
    pub const fn parse_error(position: usize, error: ParseError) -> Self {
        Self::new(position, ReaderErrorKind::ParseError(error))
    }

    /// Create a new out of bounds error
    pub const fn oob(position: usize) -> Self {
        Self::new(position, ReaderErrorKind::OutOfBounds)
    }
}

/// The Read Result type (see [`ReaderError`])
pub type ReadResult<T> = Result<T, ReaderError>;

pub(crate) fn inv_data(reader: &Reader<'_>, v: impl Into<ParseError>) -> ReaderError {
    ReaderError::parse_error(reader.buffer_position(), v.into()).in_chunk(reader.chunk())
}
