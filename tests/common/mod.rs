#![allow(dead_code)]
//! Byte builders for hand-made Standard MIDI Files

/// Encode `value` as a variable length quantity
pub fn vlq(mut value: u32) -> Vec<u8> {
    let mut bytes = vec![(value & 0x7F) as u8];
    value >>= 7;
    while value > 0 {
        bytes.push(0x80 | (value & 0x7F) as u8);
        value >>= 7;
    }
    bytes.reverse();
    bytes
}

/// An `MThd` chunk
pub fn header(format: u16, track_count: u16, division: u16) -> Vec<u8> {
    let mut bytes = Vec::new();
    bytes.extend_from_slice(b"MThd"); // Header chunk type
    bytes.extend_from_slice(&6u32.to_be_bytes()); // Header length (6 bytes)
    bytes.extend_from_slice(&format.to_be_bytes());
    bytes.extend_from_slice(&track_count.to_be_bytes());
    bytes.extend_from_slice(&division.to_be_bytes());
    bytes
}

/// Collects the events of one track chunk
#[derive(Default)]
pub struct TrackBytes {
    events: Vec<u8>,
}

impl TrackBytes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append raw event bytes after a delta time
    pub fn event(mut self, delta: u32, bytes: &[u8]) -> Self {
        self.events.extend(vlq(delta));
        self.events.extend_from_slice(bytes);
        self
    }

    pub fn note_on(self, delta: u32, channel: u8, note: u8, velocity: u8) -> Self {
        self.event(delta, &[0x90 | (channel - 1), note, velocity])
    }

    pub fn note_off(self, delta: u32, channel: u8, note: u8) -> Self {
        self.event(delta, &[0x80 | (channel - 1), note, 0])
    }

    pub fn program(self, delta: u32, channel: u8, program: u8) -> Self {
        self.event(delta, &[0xC0 | (channel - 1), program])
    }

    pub fn tempo(self, delta: u32, micros: u32) -> Self {
        let [_, a, b, c] = micros.to_be_bytes();
        self.event(delta, &[0xFF, 0x51, 0x03, a, b, c])
    }

    pub fn end(self) -> Self {
        self.event(0, &[0xFF, 0x2F, 0x00])
    }

    /// The `MTrk` chunk, with its length patched in
    pub fn build(self) -> Vec<u8> {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(b"MTrk"); // Track chunk type
        let length_pos = bytes.len();
        bytes.extend_from_slice(&[0x00, 0x00, 0x00, 0x00]); // Placeholder for length
        let track_start = bytes.len();
        bytes.extend(self.events);
        let length = (bytes.len() - track_start) as u32;
        bytes[length_pos..length_pos + 4].copy_from_slice(&length.to_be_bytes());
        bytes
    }
}

/// A whole file with one header and the given chunks
pub fn smf(format: u16, division: u16, tracks: &[Vec<u8>]) -> Vec<u8> {
    let mut bytes = header(format, tracks.len() as u16, division);
    for track in tracks {
        bytes.extend_from_slice(track);
    }
    bytes
}
