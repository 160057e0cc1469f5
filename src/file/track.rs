use crate::{
    ChunkError,
    message::TrackEvent,
    reader::{ReadResult, Reader, inv_data},
};

#[doc = r#"
One `MTrk` chunk: the length it declared and the events it held, in order.
"#]
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TrackChunk {
    length: u32,
    events: Vec<TrackEvent>,
}

impl TrackChunk {
    /// Create a track from events directly
    pub fn new(length: u32, events: Vec<TrackEvent>) -> Self {
        Self { length, events }
    }

    /// Read a whole track chunk starting at its tag.
    ///
    /// Running status starts empty for every chunk. The last event must end
    /// exactly at the declared chunk end.
    pub(crate) fn read(reader: &mut Reader<'_>) -> ReadResult<Self> {
        let chunk_start = reader.buffer_position();
        let tag: [u8; 4] = reader.read_exact_size()?;
        if &tag != b"MTrk" {
            return Err(inv_data(reader, ChunkError::InvalidTrackTag(tag)));
        }
        let length = reader.read_u32_be()?;
        let declared_end = chunk_start + 8 + length as usize;

        let mut running_status = None;
        let mut events = Vec::new();
        while reader.buffer_position() < declared_end {
            events.push(TrackEvent::read(reader, &mut running_status)?);
        }

        let end = reader.buffer_position();
        if end != declared_end {
            return Err(inv_data(
                reader,
                ChunkError::Overrun {
                    declared: declared_end,
                    end,
                },
            ));
        }
        Ok(Self { length, events })
    }

    /// The length the chunk declared, in bytes
    pub const fn length(&self) -> u32 {
        self.length
    }

    /// The events, in file order
    pub fn events(&self) -> &[TrackEvent] {
        &self.events
    }

    /// Number of events
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// True when the chunk held no events
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Sum of every delta time in the track
    pub fn total_ticks(&self) -> u64 {
        self.events.iter().map(|e| u64::from(e.delta_ticks())).sum()
    }
}
