use core::fmt;

use num_enum::TryFromPrimitive;

use crate::{
    file::SmpteFps,
    message::hex_dump,
    reader::{ReadResult, Reader},
    tempo::Tempo,
};

/// The meta event types this crate gives a name to
#[derive(Debug, Clone, Copy, PartialEq, Eq, TryFromPrimitive)]
#[repr(u8)]
#[allow(missing_docs)]
pub enum MetaType {
    SequenceNumber = 0x00,
    Text = 0x01,
    Copyright = 0x02,
    TrackName = 0x03,
    InstrumentName = 0x04,
    Lyric = 0x05,
    Marker = 0x06,
    CuePoint = 0x07,
    ProgramName = 0x08,
    DeviceName = 0x09,
    ChannelPrefix = 0x20,
    Port = 0x21,
    EndOfTrack = 0x2F,
    Tempo = 0x51,
    SmpteOffset = 0x54,
    TimeSignature = 0x58,
    KeySignature = 0x59,
    SequencerSpecific = 0x7F,
}

#[doc = r#"
A meta event: `FF <type> <len:VLQ> <bytes>`.

Only [`MetaType::Tempo`] and [`MetaType::EndOfTrack`] change playback; every
other type is informational.
"#]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetaMessage {
    meta_type: u8,
    bytes: Vec<u8>,
}

impl MetaMessage {
    /// Build a meta message from its type byte and payload
    pub fn new(meta_type: u8, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            meta_type,
            bytes: bytes.into(),
        }
    }

    /// Decode after the `0xFF` escape has been consumed
    pub(crate) fn read(reader: &mut Reader<'_>) -> ReadResult<Self> {
        let meta_type = reader.read_u8()?;
        let len = reader.read_vlq()?;
        let bytes = reader.read_raw(len as usize)?;
        Ok(Self::new(meta_type, bytes))
    }

    /// The raw type byte
    pub const fn meta_type_byte(&self) -> u8 {
        self.meta_type
    }

    /// The named type, if known
    pub fn meta_type(&self) -> Option<MetaType> {
        MetaType::try_from(self.meta_type).ok()
    }

    /// The payload
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// True for the end-of-track marker
    pub fn is_end_of_track(&self) -> bool {
        self.meta_type() == Some(MetaType::EndOfTrack)
    }

    /// The tempo carried by a set-tempo event with a well formed, non-zero payload
    pub fn tempo(&self) -> Option<Tempo> {
        match self.meta_type() {
            Some(MetaType::Tempo) => Tempo::from_meta_payload(&self.bytes),
            _ => None,
        }
    }

    fn text(&self) -> String {
        String::from_utf8_lossy(&self.bytes).into_owned()
    }

    fn fmt_smpte_offset(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [hour_byte, minute, second, frame, subframe] = self.bytes[..] else {
            return write!(f, "SMPTE Offset: malformed ({})", hex_dump(&self.bytes));
        };
        // bits 5-6 of the hour byte select the frame rate
        let fps = match (hour_byte >> 5) & 0b11 {
            0 => SmpteFps::TwentyFour,
            1 => SmpteFps::TwentyFive,
            2 => SmpteFps::TwentyNine,
            _ => SmpteFps::Thirty,
        };
        write!(
            f,
            "SMPTE Offset: {:02}:{minute:02}:{second:02} and {frame} frames, {subframe} subframes at {fps}",
            hour_byte & 0x1F
        )
    }

    fn fmt_time_signature(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [numerator, denominator_pow, clocks, thirty_seconds] = self.bytes[..] else {
            return write!(f, "Time Signature: malformed ({})", hex_dump(&self.bytes));
        };
        let denominator = 1u32.checked_shl(u32::from(denominator_pow)).unwrap_or(0);
        write!(
            f,
            "Time Signature: {numerator}/{denominator}, {clocks} MIDI clocks per metronome click, \
             {thirty_seconds} notated 32nd notes per quarter note"
        )
    }

    fn fmt_key_signature(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        const MAJOR: [&str; 15] = [
            "Cb", "Gb", "Db", "Ab", "Eb", "Bb", "F", "C", "G", "D", "A", "E", "B", "F#", "C#",
        ];
        const MINOR: [&str; 15] = [
            "Ab", "Eb", "Bb", "F", "C", "G", "D", "A", "E", "B", "F#", "C#", "G#", "D#", "A#",
        ];
        let [sharps_flats, mode] = self.bytes[..] else {
            return write!(f, "Key Signature: malformed ({})", hex_dump(&self.bytes));
        };
        let sharps_flats = sharps_flats as i8;
        let accidentals = match sharps_flats {
            0 => "no sharps or flats".to_string(),
            n if n > 0 => format!("{n} sharp(s)"),
            n => format!("{} flat(s)", n.unsigned_abs()),
        };
        let table = if mode == 0 { &MAJOR } else { &MINOR };
        let scale = if mode == 0 { "major" } else { "minor" };
        match usize::try_from(i16::from(sharps_flats) + 7)
            .ok()
            .and_then(|i| table.get(i))
        {
            Some(name) => write!(f, "Key Signature: {name} {scale} ({accidentals})"),
            None => write!(f, "Key Signature: {scale} ({accidentals})"),
        }
    }
}

impl fmt::Display for MetaMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Some(kind) = self.meta_type() else {
            return match self.meta_type {
                // undefined text types
                0x0A..=0x0F => write!(f, "Text: {}", self.text()),
                other => write!(f, "Unknown (Code {other:#04x}): {}", hex_dump(&self.bytes)),
            };
        };
        match kind {
            MetaType::SequenceNumber => match self.bytes[..] {
                [hi, lo] => write!(f, "Sequence Number: {}", u16::from_be_bytes([hi, lo])),
                _ => write!(f, "Sequence Number: (position in file)"),
            },
            MetaType::Text => write!(f, "Text: {}", self.text()),
            MetaType::Copyright => write!(f, "Copyright Notice: {}", self.text()),
            MetaType::TrackName => write!(f, "Track Name: {}", self.text()),
            MetaType::InstrumentName => write!(f, "Instrument Name: {}", self.text()),
            MetaType::Lyric => write!(f, "Lyric: {}", self.text()),
            MetaType::Marker => write!(f, "Marker: {}", self.text()),
            MetaType::CuePoint => write!(f, "Cue Point: {}", self.text()),
            MetaType::ProgramName => write!(f, "Program Name: {}", self.text()),
            MetaType::DeviceName => write!(f, "Device Name: {}", self.text()),
            MetaType::ChannelPrefix => match self.bytes.first() {
                Some(channel) => write!(f, "MIDI Channel: {}", u16::from(*channel) + 1),
                None => write!(f, "MIDI Channel: malformed"),
            },
            MetaType::Port => match self.bytes.first() {
                Some(port) => write!(f, "MIDI Port: {port}"),
                None => write!(f, "MIDI Port: malformed"),
            },
            MetaType::EndOfTrack => write!(f, "End of Track"),
            MetaType::Tempo => match self.tempo() {
                Some(tempo) => write!(
                    f,
                    "Set Tempo: {} microsec per quarter note ({:.2} bpm)",
                    tempo.micros_per_quarter_note(),
                    tempo.beats_per_minute()
                ),
                None => write!(f, "Set Tempo: malformed ({})", hex_dump(&self.bytes)),
            },
            MetaType::SmpteOffset => self.fmt_smpte_offset(f),
            MetaType::TimeSignature => self.fmt_time_signature(f),
            MetaType::KeySignature => self.fmt_key_signature(f),
            MetaType::SequencerSpecific => {
                write!(f, "Sequencer Specific Data: {}", hex_dump(&self.bytes))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn reads_type_length_and_payload() {
        let mut reader = Reader::from_byte_slice(&[0x51, 0x03, 0x07, 0xA1, 0x20, 0x99]);
        let meta = MetaMessage::read(&mut reader).unwrap();
        assert_eq!(meta.meta_type(), Some(MetaType::Tempo));
        assert_eq!(meta.tempo().map(|t| t.micros_per_quarter_note()), Some(500_000));
        assert_eq!(reader.buffer_position(), 5);
    }

    #[test]
    fn short_tempo_payload_is_ignored() {
        let meta = MetaMessage::new(0x51, vec![0x07, 0xA1]);
        assert_eq!(meta.tempo(), None);
        assert_eq!(meta.to_string(), "Set Tempo: malformed (07 A1)");
    }

    #[test]
    fn describes_informational_types() {
        assert_eq!(
            MetaMessage::new(0x03, b"Piano".to_vec()).to_string(),
            "Track Name: Piano"
        );
        assert_eq!(
            MetaMessage::new(0x58, vec![6, 3, 24, 8]).to_string(),
            "Time Signature: 6/8, 24 MIDI clocks per metronome click, \
             8 notated 32nd notes per quarter note"
        );
        assert_eq!(
            MetaMessage::new(0x59, vec![0xFD, 1]).to_string(),
            "Key Signature: C minor (3 flat(s))"
        );
        assert_eq!(
            MetaMessage::new(0x54, vec![0b0010_0001, 2, 3, 4, 5]).to_string(),
            "SMPTE Offset: 01:02:03 and 4 frames, 5 subframes at 25 fps"
        );
        assert_eq!(
            MetaMessage::new(0x60, vec![0xAB]).to_string(),
            "Unknown (Code 0x60): AB"
        );
    }
}
