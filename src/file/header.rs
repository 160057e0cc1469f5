use crate::{
    HeaderError,
    file::{FormatType, Timing},
    reader::{ReadResult, Reader, inv_data},
};

/// `MThd`, 4 byte length, format, track count, division
pub(crate) const MIN_HEADER_LEN: usize = 14;

#[doc = r#"
   The contents of the `MThd` chunk
"#]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MidiFileHeader {
    format: FormatType,
    track_count: u16,
    timing: Timing,
}

impl MidiFileHeader {
    /// Create a new header
    pub fn new(format: FormatType, track_count: u16, timing: Timing) -> Self {
        Self {
            format,
            track_count,
            timing,
        }
    }

    /// Read the header chunk.
    ///
    /// Whatever length the chunk declares, the cursor ends up just past it, so
    /// header extensions are skipped without being interpreted.
    pub(crate) fn read(reader: &mut Reader<'_>) -> ReadResult<Self> {
        if reader.len() < MIN_HEADER_LEN {
            return Err(inv_data(reader, HeaderError::TooShort(reader.len())));
        }
        let tag: [u8; 4] = reader.read_exact_size()?;
        if &tag != b"MThd" {
            return Err(inv_data(reader, HeaderError::InvalidTag(tag)));
        }
        let length = reader.read_u32_be()?;
        let format_word = reader.read_u16_be()?;
        let format = FormatType::try_from(format_word)
            .map_err(|_| inv_data(reader, HeaderError::InvalidFormat(format_word)))?;
        let track_count = reader.read_u16_be()?;
        let timing = Timing::read(reader)?;

        reader.seek(8 + length as usize);

        Ok(Self::new(format, track_count, timing))
    }

    /// The file format
    pub fn format(&self) -> FormatType {
        self.format
    }

    /// Number of track chunks the header announces
    pub fn track_count(&self) -> u16 {
        self.track_count
    }

    /// Get the timing props
    pub fn timing(&self) -> &Timing {
        &self.timing
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ParseError, reader::ReaderErrorKind};
    use pretty_assertions::assert_eq;

    fn header_kind(bytes: &[u8]) -> ReaderErrorKind {
        let mut reader = Reader::from_byte_slice(bytes);
        MidiFileHeader::read(&mut reader).unwrap_err().kind
    }

    #[test]
    fn skips_header_extensions() {
        let bytes = [
            b'M', b'T', b'h', b'd', 0, 0, 0, 8, 0, 1, 0, 3, 0x01, 0xE0, 0xAA, 0xBB, b'M',
        ];
        let mut reader = Reader::from_byte_slice(&bytes);
        let header = MidiFileHeader::read(&mut reader).unwrap();
        assert_eq!(header.format(), FormatType::Simultaneous);
        assert_eq!(header.track_count(), 3);
        assert_eq!(header.timing().ticks_per_quarter_note(), Some(480));
        assert_eq!(reader.buffer_position(), 16);
    }

    #[test]
    fn rejects_bad_headers() {
        assert!(matches!(
            header_kind(b"MThd\0\0\0\x06\0"),
            ReaderErrorKind::ParseError(ParseError::Header(HeaderError::TooShort(9)))
        ));
        assert!(matches!(
            header_kind(b"RIFF\0\0\0\x06\0\0\0\x01\0\x60"),
            ReaderErrorKind::ParseError(ParseError::Header(HeaderError::InvalidTag(_)))
        ));
        assert!(matches!(
            header_kind(b"MThd\0\0\0\x06\0\x03\0\x01\0\x60"),
            ReaderErrorKind::ParseError(ParseError::Header(HeaderError::InvalidFormat(3)))
        ));
    }
}
