#![doc = r#"
A text dump of a parsed file.

The report walks every track in file order and prints one line per event,
preceded by its delta time. Tempo events also show the tick rate they set.
The walk doubles as the first-seen drive scan: the report ends with the
number of channels that sound.

```text
>>> Track 0:
# of events: 3
    0 | Meta Event: Set Tempo: 500000 microsec per quarter note (120 bpm)
      |   Ticks/QtrNote Method: 192 delta-time ticks per second
   96 | MIDI Event: Chan 1 Note ON: A4, Velocity (0 - 127): 100
```
"#]

use core::fmt;
use std::{io, path::Path};

use crate::{
    engine::DrivePlan,
    file::{MidiFile, Timing},
    message::TrackMessage,
};

/// The structure of one file, ready to print
#[derive(Debug)]
pub struct StructureReport<'a> {
    name: &'a str,
    size: u64,
    file: &'a MidiFile,
    plan: DrivePlan,
}

impl<'a> StructureReport<'a> {
    /// Describe `file`, which was read from `name` and is `size` bytes long
    pub fn new(name: &'a str, size: u64, file: &'a MidiFile) -> Self {
        Self {
            name,
            size,
            file,
            plan: DrivePlan::scan(file),
        }
    }

    /// Channels that sound, in first-seen order
    pub fn plan(&self) -> &DrivePlan {
        &self.plan
    }

    /// Give up the report, keeping the drive plan
    pub fn into_plan(self) -> DrivePlan {
        self.plan
    }

    /// Write the report to `path`, replacing whatever is there
    pub fn write_to(&self, path: impl AsRef<Path>) -> io::Result<()> {
        std::fs::write(path, self.to_string())
    }
}

impl fmt::Display for StructureReport<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let header = self.file.header();
        let timing = header.timing();
        writeln!(f, "Stepping through parsed MIDI structure:")?;
        writeln!(f, "File Name: {}", self.name)?;
        writeln!(f, "File Size (bytes): {}", self.size)?;
        writeln!(f)?;
        writeln!(f, "> Delta-times appear before each event.")?;
        writeln!(f)?;
        writeln!(f, ">>> MIDI Header:")?;
        writeln!(f, "File format: {}", header.format())?;
        writeln!(f, "Division: {} ({timing})", timing.division())?;
        writeln!(f, "# of tracks: {}", header.track_count())?;

        for (index, track) in self.file.tracks().iter().enumerate() {
            writeln!(f)?;
            writeln!(f, ">>> Track {index}:")?;
            writeln!(f, "# of events: {}", track.len())?;
            for event in track.events() {
                writeln!(f, "{:>5} | {}", event.delta_ticks(), event.message())?;
                if let TrackMessage::Meta(meta) = event.message() {
                    if let Some(tempo) = meta.tempo() {
                        let method = match timing {
                            Timing::TicksPerQuarterNote(_) => "Ticks/QtrNote Method",
                            Timing::Smpte(_) => "FPS Method",
                        };
                        writeln!(
                            f,
                            "      |   {method}: {} delta-time ticks per second",
                            timing.ticks_per_second(tempo)
                        )?;
                    }
                }
            }
        }

        writeln!(f)?;
        writeln!(f, "Total channels used: {}", self.plan.len())
    }
}
