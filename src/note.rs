//! Note numbers, pitch classes and their frequencies
use core::fmt;

#[doc = r#"
A MIDI note number.

Notes 0 through 127 cover `C-1` to `G9`; note 69 is `A4`, tuned to 440 Hz.

# Example
```rust
# use floppymidi::prelude::*;
let a4 = Note::from_byte(69);

assert_eq!(a4.key(), Key::A);
assert_eq!(a4.octave().value(), 4);
assert_eq!(a4.frequency(), 440.0);
```
"#]
#[derive(Copy, Clone, PartialEq, Eq, Ord, PartialOrd, Debug, Hash)]
pub struct Note(u8);

/// Equal temperament frequency of a (possibly out of range) note number
pub fn frequency_of(note: i32) -> f64 {
    440.0 * 2f64.powf(f64::from(note - 69) / 12.0)
}

impl Note {
    /// Concert A
    pub const A4: Self = Self(69);

    /// Create a note from its byte. Values above 127 are kept as is.
    pub const fn from_byte(byte: u8) -> Self {
        Self(byte)
    }

    /// Identifies the key of the note
    #[inline]
    pub const fn key(&self) -> Key {
        Key::from_byte(self.0)
    }

    /// Identifies the octave of the note
    #[inline]
    pub const fn octave(&self) -> Octave {
        Octave::from_byte(self.0)
    }

    /// Returns the underlying byte of the note
    pub const fn byte(&self) -> u8 {
        self.0
    }

    /// Index into a 128 entry per-note table
    pub const fn index(&self) -> usize {
        (self.0 & 0x7F) as usize
    }

    /// Frequency in Hz, `440 * 2^((n - 69) / 12)`
    pub fn frequency(&self) -> f64 {
        frequency_of(i32::from(self.0))
    }
}

impl fmt::Display for Note {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.key(), self.octave())
    }
}

#[allow(missing_docs)]
#[derive(Copy, Clone, PartialEq, Eq, Debug, Hash)]
#[doc = r#"
The pitch class of a [`Note`]
"#]
pub enum Key {
    C,
    CSharp,
    D,
    DSharp,
    E,
    F,
    FSharp,
    G,
    GSharp,
    A,
    ASharp,
    B,
}

impl Key {
    /// Identify the key from a note byte.
    #[inline]
    pub const fn from_byte(byte: u8) -> Self {
        use Key::*;
        match byte % 12 {
            0 => C,
            1 => CSharp,
            2 => D,
            3 => DSharp,
            4 => E,
            5 => F,
            6 => FSharp,
            7 => G,
            8 => GSharp,
            9 => A,
            10 => ASharp,
            _ => B,
        }
    }

    /// Returns true if the key is sharp.
    #[inline]
    pub const fn is_sharp(&self) -> bool {
        use Key::*;
        matches!(self, CSharp | DSharp | FSharp | GSharp | ASharp)
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use Key::*;
        let name = match self {
            C => "C",
            CSharp => "C#",
            D => "D",
            DSharp => "D#",
            E => "E",
            F => "F",
            FSharp => "F#",
            G => "G",
            GSharp => "G#",
            A => "A",
            ASharp => "A#",
            B => "B",
        };
        f.write_str(name)
    }
}

/// The octave of a [`Note`], from -1 upwards
#[derive(PartialEq, Eq, Debug, Clone, Copy)]
pub struct Octave(i8);

impl Octave {
    /// Identify an octave from a note byte.
    pub const fn from_byte(byte: u8) -> Self {
        Self((byte / 12) as i8 - 1)
    }

    /// The octave number
    pub const fn value(&self) -> i8 {
        self.0
    }
}

impl fmt::Display for Octave {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}
