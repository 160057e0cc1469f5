#![doc = r#"
A bank of sine voices rendered from a lookup table.

The engine holds a [`SynthHandle`] and sends commands; the audio callback owns
the [`SineBank`], drains those commands and fills interleaved buffers. Voices
never stop abruptly: a started voice grows from a small level up to full scale
and a stopped one shrinks until it drops below audibility.
"#]

use std::f64::consts::TAU;

use crossbeam_channel::{Receiver, Sender};
use tracing::trace;

use super::{VoiceParams, VoiceSink, VoiceSlot};

/// Entries in one period of the sine table
pub const TABLE_SIZE: usize = 100_000;
/// Output sample rate
pub const DEFAULT_SAMPLE_RATE: u32 = 44_100;

const GROWTH_FACTOR: f32 = 1.01;
const SHRINK_FACTOR: f32 = 0.997;
const INITIAL_LEVEL: f32 = 0.006;
const MAX_LEVEL: f32 = 1.0;
const MIN_LEVEL: f32 = 0.001;

/// A message from the engine to the renderer
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum VoiceCommand {
    /// Restart the voice and fade it in
    Start(VoiceSlot, VoiceParams),
    /// Change pitch or loudness
    Update(VoiceSlot, VoiceParams),
    /// Fade the voice out
    Stop(VoiceSlot),
}

/// The engine's end of the synthesizer
#[derive(Debug, Clone)]
pub struct SynthHandle {
    commands: Sender<VoiceCommand>,
}

impl SynthHandle {
    fn send(&self, command: VoiceCommand) {
        if self.commands.send(command).is_err() {
            trace!(?command, "sine renderer is gone, dropping command");
        }
    }
}

impl VoiceSink for SynthHandle {
    fn start_voice(&self, slot: VoiceSlot, params: VoiceParams) {
        self.send(VoiceCommand::Start(slot, params));
    }

    fn update_voice(&self, slot: VoiceSlot, params: VoiceParams) {
        self.send(VoiceCommand::Update(slot, params));
    }

    fn stop_voice(&self, slot: VoiceSlot) {
        self.send(VoiceCommand::Stop(slot));
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct VoiceState {
    phase: usize,
    increment: usize,
    level: f32,
    factor: f32,
    amplitude: f32,
}

/// The renderer's end of the synthesizer
#[derive(Debug)]
pub struct SineBank {
    commands: Receiver<VoiceCommand>,
    table: Vec<f32>,
    voices: Vec<VoiceState>,
    sample_rate: u32,
}

/// Create a connected handle and renderer with `voices` slots
pub fn sine_bank(voices: usize, sample_rate: u32) -> (SynthHandle, SineBank) {
    let (commands, receiver) = crossbeam_channel::unbounded();
    let table = (0..TABLE_SIZE)
        .map(|i| (TAU * i as f64 / TABLE_SIZE as f64).sin() as f32)
        .collect();
    (
        SynthHandle { commands },
        SineBank {
            commands: receiver,
            table,
            voices: vec![VoiceState::default(); voices],
            sample_rate,
        },
    )
}

impl SineBank {
    fn increment(&self, params: &VoiceParams) -> usize {
        (params.frequency * params.pitch_bend * TABLE_SIZE as f64 / f64::from(self.sample_rate)
            + 0.5) as usize
    }

    fn apply(&mut self, command: VoiceCommand) {
        match command {
            VoiceCommand::Start(slot, params) => {
                let increment = self.increment(&params);
                if let Some(voice) = self.voices.get_mut(slot.index()) {
                    *voice = VoiceState {
                        phase: 0,
                        increment,
                        level: INITIAL_LEVEL,
                        factor: GROWTH_FACTOR,
                        amplitude: params.amplitude,
                    };
                }
            }
            VoiceCommand::Update(slot, params) => {
                let increment = self.increment(&params);
                if let Some(voice) = self.voices.get_mut(slot.index()) {
                    voice.increment = increment;
                    voice.amplitude = params.amplitude;
                }
            }
            VoiceCommand::Stop(slot) => {
                if let Some(voice) = self.voices.get_mut(slot.index()) {
                    voice.factor = SHRINK_FACTOR;
                }
            }
        }
    }

    /// Number of voices still above audibility
    pub fn sounding(&self) -> usize {
        self.voices.iter().filter(|v| v.level > MIN_LEVEL).count()
    }

    /// Apply pending commands, then fill `out` with interleaved frames of
    /// `channels` identical samples each.
    pub fn render(&mut self, out: &mut [f32], channels: usize) {
        while let Ok(command) = self.commands.try_recv() {
            self.apply(command);
        }
        let channels = channels.max(1);
        for frame in out.chunks_mut(channels) {
            let mut sample = 0.0;
            for voice in self.voices.iter_mut().filter(|v| v.level > MIN_LEVEL) {
                voice.level = (voice.level * voice.factor).min(MAX_LEVEL);
                sample += voice.level * voice.amplitude * self.table[voice.phase];
                voice.phase = (voice.phase + voice.increment) % TABLE_SIZE;
            }
            frame.fill(sample);
        }
    }
}

/// Play a sine bank on the default output device until the device is dropped
#[cfg(feature = "audio")]
pub fn run_sine_output(
    mut bank: SineBank,
    sample_rate: u32,
) -> Result<tinyaudio::OutputDevice, super::OutputError> {
    use tinyaudio::prelude::*;

    let params = OutputDeviceParameters {
        channels_count: 2,
        sample_rate: sample_rate as usize,
        channel_sample_count: sample_rate as usize / 100,
    };
    run_output_device(params, move |data| bank.render(data, 2))
        .map_err(|e| super::OutputError::Device(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn a440(amplitude: f32) -> VoiceParams {
        VoiceParams {
            frequency: 440.0,
            pitch_bend: 1.0,
            amplitude,
        }
    }

    #[test]
    fn silent_until_started() {
        let (_handle, mut bank) = sine_bank(4, DEFAULT_SAMPLE_RATE);
        let mut out = vec![1.0; 64];
        bank.render(&mut out, 2);
        assert!(out.iter().all(|s| *s == 0.0));
    }

    #[test]
    fn started_voice_fades_in_and_interleaves() {
        let (handle, mut bank) = sine_bank(4, DEFAULT_SAMPLE_RATE);
        handle.start_voice(VoiceSlot::new(1), a440(0.5));
        let mut out = vec![0.0; 2 * 4410];
        bank.render(&mut out, 2);
        assert_eq!(bank.sounding(), 1);
        for frame in out.chunks(2) {
            assert_eq!(frame[0], frame[1]);
        }
        let peak = out.iter().fold(0.0f32, |m, s| m.max(s.abs()));
        assert!(peak > 0.4 && peak <= 0.5, "peak was {peak}");
    }

    #[test]
    fn stopped_voice_decays_to_silence() {
        let (handle, mut bank) = sine_bank(2, DEFAULT_SAMPLE_RATE);
        handle.start_voice(VoiceSlot::new(0), a440(1.0));
        let mut out = vec![0.0; 2048];
        bank.render(&mut out, 2);
        handle.stop_voice(VoiceSlot::new(0));
        let mut long = vec![0.0; 2 * 44_100];
        bank.render(&mut long, 2);
        assert_eq!(bank.sounding(), 0);
    }

    #[test]
    fn phase_increment_rounds() {
        let (_handle, bank) = sine_bank(1, DEFAULT_SAMPLE_RATE);
        assert_eq!(bank.increment(&a440(1.0)), 998);
    }
}
