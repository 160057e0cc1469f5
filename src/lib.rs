#![warn(missing_docs)]
#![doc = r#"
Standard MIDI file parsing and real-time playback on sine voices and
stepper-motor drives.

```text
bytes ─▶ reader ─▶ file::MidiFile ─▶ player::Player ─▶ engine::PlaybackEngine ─┬─▶ output::VoiceSink
                                          │                                      └─▶ output::DriveTransport
                                          └─ tempo::TempoClock
```

Parse a file with [`MidiFile::parse`](file::MidiFile::parse), print it with
[`StructureReport`](report::StructureReport) and play it with a
[`Player`](player::Player).
"#]

mod error;
pub use error::*;

pub mod config;
pub mod engine;
pub mod file;
pub mod message;
pub mod note;
pub mod output;
pub mod player;
pub mod reader;
pub mod report;
pub mod tempo;

/// Commonly used types
pub mod prelude {
    pub use crate::{
        ChunkError, HeaderError, ParseError,
        engine::{DriveAssignment, DrivePlan, EngineConfig, PlaybackEngine},
        file::{FormatType, LoadError, MidiFile, MidiFileHeader, SmpteFps, Timing, TrackChunk},
        message::{
            Channel, ChannelVoiceMessage, MetaMessage, MetaType, PlaybackTarget,
            SystemExclusiveMessage, TrackEvent, TrackMessage,
        },
        note::{Key, Note, Octave},
        player::{PlaybackConfig, PlaybackOutcome, Player},
        reader::{ReadResult, Reader, ReaderError},
        tempo::{Tempo, TempoClock},
    };
}
