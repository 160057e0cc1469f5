#![doc = r#"
The two things playback drives: sine voices and stepper-motor drives.

The engine only talks to them through [`VoiceSink`] and [`DriveTransport`], so
either can be swapped for a recorder in tests or left out entirely.
"#]

mod serial;
pub use serial::*;

mod synth;
pub use synth::*;

use core::fmt;
use std::io;

use thiserror::Error;

/// Index of one synthesis voice
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct VoiceSlot(u16);

impl VoiceSlot {
    /// Wrap a slot index
    pub const fn new(index: u16) -> Self {
        Self(index)
    }

    /// The slot index
    pub const fn index(&self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for VoiceSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// What a voice should sound like
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VoiceParams {
    /// Base frequency of the note, in Hz
    pub frequency: f64,
    /// Multiplier from the channel's pitch bend
    pub pitch_bend: f64,
    /// Note velocity, channel volume and expression, combined into 0..=1
    pub amplitude: f32,
}

/// Sound output for single sine voices
pub trait VoiceSink: Send + Sync {
    /// Restart the voice from silence and fade it in
    fn start_voice(&self, slot: VoiceSlot, params: VoiceParams);
    /// Change pitch or loudness without restarting
    fn update_voice(&self, slot: VoiceSlot, params: VoiceParams);
    /// Let the voice fade out
    fn stop_voice(&self, slot: VoiceSlot);
}

/// A byte link to the drive controller
pub trait DriveTransport: Send {
    /// True when the link is open
    fn is_connected(&self) -> bool;
    /// Send a whole packet
    fn write(&mut self, bytes: &[u8]) -> io::Result<()>;
    /// Read whatever the controller sent, returning how many bytes arrived
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize>;
}

/// Failures opening an output
#[derive(Debug, Error)]
pub enum OutputError {
    /// The audio device could not be started
    #[error("Audio device unavailable: {0}")]
    Device(String),
}
