use core::fmt;

use num_enum::TryFromPrimitive;

/// Controller numbers with a defined meaning in a control change message.
///
/// Numbers missing here are undefined or general purpose controllers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, TryFromPrimitive)]
#[repr(u8)]
#[allow(missing_docs)]
pub enum Controller {
    BankSelect = 0x00,
    ModulationWheel = 0x01,
    BreathController = 0x02,
    FootController = 0x04,
    PortamentoTime = 0x05,
    DataEntryMsb = 0x06,
    ChannelVolume = 0x07,
    Balance = 0x08,
    Pan = 0x0A,
    Expression = 0x0B,
    EffectControl1 = 0x0C,
    EffectControl2 = 0x0D,
    Sustain = 0x40,
    Portamento = 0x41,
    Sostenuto = 0x42,
    SoftPedal = 0x43,
    Legato = 0x44,
    Hold2 = 0x45,
    SoundVariation = 0x46,
    Timbre = 0x47,
    ReleaseTime = 0x48,
    AttackTime = 0x49,
    Brightness = 0x4A,
    DecayTime = 0x4B,
    VibratoRate = 0x4C,
    VibratoDepth = 0x4D,
    VibratoDelay = 0x4E,
    SoundController10 = 0x4F,
    ReverbDepth = 0x5B,
    TremoloDepth = 0x5C,
    ChorusDepth = 0x5D,
    DetuneDepth = 0x5E,
    PhaserDepth = 0x5F,
    DataIncrement = 0x60,
    DataDecrement = 0x61,
    NrpnLsb = 0x62,
    NrpnMsb = 0x63,
    RpnLsb = 0x64,
    RpnMsb = 0x65,
    AllSoundOff = 0x78,
    ResetAllControllers = 0x79,
    LocalControl = 0x7A,
    AllNotesOff = 0x7B,
    OmniModeOff = 0x7C,
    OmniModeOn = 0x7D,
    MonoModeOn = 0x7E,
    PolyModeOn = 0x7F,
}

impl Controller {
    /// Human readable name
    pub const fn name(&self) -> &'static str {
        use Controller::*;
        match self {
            BankSelect => "Bank Select",
            ModulationWheel => "Modulation Wheel",
            BreathController => "Breath Controller",
            FootController => "Foot Controller",
            PortamentoTime => "Portamento Time",
            DataEntryMsb => "Data Entry, MSB",
            ChannelVolume => "Channel Volume",
            Balance => "Balance",
            Pan => "Channel Pan",
            Expression => "Expression Control",
            EffectControl1 => "Effect Control 1",
            EffectControl2 => "Effect Control 2",
            Sustain => "Damper/Sustain",
            Portamento => "Portamento",
            Sostenuto => "Sostenuto",
            SoftPedal => "Soft Pedal",
            Legato => "Legato Footswitch",
            Hold2 => "Hold 2",
            SoundVariation => "Sound Controller 1 (default: Sound Variation)",
            Timbre => "Sound Controller 2 (default: Timbre/Harmonic Intens.)",
            ReleaseTime => "Sound Controller 3 (default: Release Time)",
            AttackTime => "Sound Controller 4 (default: Attack Time)",
            Brightness => "Sound Controller 5 (default: Brightness)",
            DecayTime => "Sound Controller 6 (default: Decay Time)",
            VibratoRate => "Sound Controller 7 (default: Vibrato Rate)",
            VibratoDepth => "Sound Controller 8 (default: Vibrato Depth)",
            VibratoDelay => "Sound Controller 9 (default: Vibrato Delay)",
            SoundController10 => "Sound Controller 10",
            ReverbDepth => "Effects 1 (Reverb) Depth",
            TremoloDepth => "Effects 2 (Tremolo) Depth",
            ChorusDepth => "Effects 3 (Chorus) Depth",
            DetuneDepth => "Effects 4 (Celeste/Detune) Depth",
            PhaserDepth => "Effects 5 (Phaser) Depth",
            DataIncrement => "Data Increment",
            DataDecrement => "Data Decrement",
            NrpnLsb => "NRPN LSB",
            NrpnMsb => "NRPN MSB",
            RpnLsb => "RPN LSB",
            RpnMsb => "RPN MSB",
            AllSoundOff => "All Sound OFF",
            ResetAllControllers => "Reset All Controllers",
            LocalControl => "Local Control",
            AllNotesOff => "All Notes OFF",
            OmniModeOff => "Omni Mode OFF",
            OmniModeOn => "Omni Mode ON",
            MonoModeOn => "Mono Mode ON",
            PolyModeOn => "Poly Mode ON",
        }
    }
}

/// A controller number paired with its value, for display
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControllerChange {
    number: u8,
    value: u8,
}

impl ControllerChange {
    /// Pair a controller number with its value
    pub const fn new(number: u8, value: u8) -> Self {
        Self { number, value }
    }

    /// The named controller, if the number has a defined meaning
    pub fn controller(&self) -> Option<Controller> {
        Controller::try_from(self.number).ok()
    }
}

impl fmt::Display for ControllerChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use Controller::*;
        let on_off = if self.value >= 64 { "ON" } else { "OFF" };
        match self.controller() {
            Some(c @ (Sustain | Portamento | Sostenuto | SoftPedal | Legato | Hold2)) => {
                write!(f, "{} {on_off}", c.name())
            }
            Some(LocalControl) => {
                let state = if self.value == 0 { "OFF" } else { "ON" };
                write!(f, "Local Control: {state}")
            }
            Some(
                c @ (AllSoundOff | ResetAllControllers | AllNotesOff | OmniModeOff | OmniModeOn
                | MonoModeOn | PolyModeOn),
            ) => f.write_str(c.name()),
            Some(c) => write!(f, "{} (0-127): {}", c.name(), self.value),
            None if (0x20..=0x3F).contains(&self.number) => write!(
                f,
                "LSB for Control {} (0-127): {}",
                self.number - 0x20,
                self.value
            ),
            None => write!(
                f,
                "Undefined Controller {} (0-127): {}",
                self.number, self.value
            ),
        }
    }
}
