#![doc = r#"
Tempo and the shared tick rate used during playback.

A [`Tempo`] is the length of a quarter note in microseconds. Together with the
file's [`Timing`] it yields the number of ticks per second. SMPTE timed files
ignore the tempo entirely.
"#]

use core::time::Duration;

use parking_lot::Mutex;
use tracing::debug;

use crate::file::Timing;

/// Microseconds per quarter note
#[derive(PartialEq, Eq, PartialOrd, Ord, Debug, Clone, Copy)]
pub struct Tempo(u32);

impl Default for Tempo {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl Tempo {
    /// 120 beats per minute, assumed until a tempo event says otherwise
    pub const DEFAULT: Self = Self(500_000);

    /// Create a tempo. Zero is not a tempo.
    pub const fn new(micros_per_quarter_note: u32) -> Option<Self> {
        if micros_per_quarter_note == 0 {
            None
        } else {
            Some(Self(micros_per_quarter_note))
        }
    }

    /// Decode the 3-byte big-endian payload of a set-tempo meta event
    pub fn from_meta_payload(bytes: &[u8]) -> Option<Self> {
        match *bytes {
            [a, b, c] => Self::new(u32::from_be_bytes([0, a, b, c])),
            _ => None,
        }
    }

    /// Microseconds per quarter note
    pub const fn micros_per_quarter_note(&self) -> u32 {
        self.0
    }

    /// Quarter notes per minute
    pub fn beats_per_minute(&self) -> f64 {
        60_000_000.0 / f64::from(self.0)
    }
}

#[derive(Debug, Clone, Copy)]
struct ClockState {
    tempo: Tempo,
    ticks_per_second: f64,
}

#[doc = r#"
The tick rate shared by every track of a playing file.

Setting a tempo recomputes the rate immediately. Deadlines already computed
keep the old rate; only later delta times use the new one.
"#]
#[derive(Debug)]
pub struct TempoClock {
    timing: Timing,
    state: Mutex<ClockState>,
}

impl TempoClock {
    /// Start at the default tempo
    pub fn new(timing: Timing) -> Self {
        let tempo = Tempo::DEFAULT;
        Self {
            timing,
            state: Mutex::new(ClockState {
                tempo,
                ticks_per_second: timing.ticks_per_second(tempo),
            }),
        }
    }

    /// The division this clock was built from
    pub const fn timing(&self) -> Timing {
        self.timing
    }

    /// The current tempo
    pub fn tempo(&self) -> Tempo {
        self.state.lock().tempo
    }

    /// Replace the tempo and return the new tick rate
    pub fn set_tempo(&self, tempo: Tempo) -> f64 {
        let ticks_per_second = self.timing.ticks_per_second(tempo);
        let mut state = self.state.lock();
        state.tempo = tempo;
        state.ticks_per_second = ticks_per_second;
        debug!(
            micros_per_quarter = tempo.micros_per_quarter_note(),
            ticks_per_second, "tempo change"
        );
        ticks_per_second
    }

    /// Ticks per second at the current tempo
    pub fn ticks_per_second(&self) -> f64 {
        self.state.lock().ticks_per_second
    }

    /// Real time spanned by `ticks` at the current rate
    pub fn duration_of(&self, ticks: u32) -> Duration {
        Duration::from_secs_f64(f64::from(ticks) / self.ticks_per_second())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::file::SmpteFps;
    use pretty_assertions::assert_eq;

    #[test]
    fn default_tempo_at_96_tpqn() {
        let clock = TempoClock::new(Timing::new_ticks_per_quarter_note(96));
        assert_eq!(clock.ticks_per_second(), 192.0);
        assert_eq!(clock.duration_of(96), Duration::from_millis(500));
    }

    #[test]
    fn applying_a_tempo_twice_is_idempotent() {
        let clock = TempoClock::new(Timing::new_ticks_per_quarter_note(480));
        let tempo = Tempo::from_meta_payload(&[0x09, 0x27, 0xC0]).unwrap();
        let once = clock.set_tempo(tempo);
        let twice = clock.set_tempo(tempo);
        assert_eq!(once, twice);
        assert_eq!(clock.ticks_per_second(), once);
        assert_eq!(clock.tempo().micros_per_quarter_note(), 600_000);
        assert_eq!(once, 800.0);
    }

    #[test]
    fn smpte_ignores_tempo() {
        let clock = TempoClock::new(Timing::new_smpte(SmpteFps::TwentyFive, 40));
        assert_eq!(clock.ticks_per_second(), 1000.0);
        clock.set_tempo(Tempo::new(250_000).unwrap());
        assert_eq!(clock.ticks_per_second(), 1000.0);
    }

    #[test]
    fn rejects_zero_and_short_payloads() {
        assert_eq!(Tempo::from_meta_payload(&[0, 0, 0]), None);
        assert_eq!(Tempo::from_meta_payload(&[0x07, 0xA1]), None);
        assert_eq!(Tempo::default().beats_per_minute(), 120.0);
    }
}
