#![doc = r#"
Maps the 16 logical channels onto a fixed set of voices and drives.

Every channel keeps its program, volume, expression, pitch bend and a table
of which note holds which voice. Voices come from a shared FIFO pool; drives
are claimed once per channel and never given back during a session.

# Locking
Each channel has its own lock. The voice and drive pools share one lock that
is only taken while a channel lock is held, and only for a single pop, push
or claim. The drive transport has its own lock, taken last.
"#]

mod channel;
pub use channel::*;

mod drive;
pub use drive::*;

mod pool;
pub use pool::*;

use std::{
    io,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
};

use parking_lot::Mutex;
use tracing::{debug, info, trace, warn};

use crate::{
    message::Channel,
    note::Note,
    output::{DriveTransport, VoiceParams, VoiceSink},
};

/// Semitones a full pitch bend covers unless configured otherwise
pub const DEFAULT_PITCH_BEND_SEMITONES: f64 = 2.3;

/// Tuning for a [`PlaybackEngine`]
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    /// Voices that may sound at once
    pub max_voices: usize,
    /// Note velocity that maps to full amplitude. Above 127 leaves headroom.
    pub velocity_full_scale: f64,
    /// Semitones covered by a full pitch bend in either direction
    pub pitch_bend_semitones: f64,
    /// Drive limits
    pub drives: DriveSettings,
    /// When channels are given drives
    pub drive_assignment: DriveAssignment,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_voices: 200,
            velocity_full_scale: 1500.0,
            pitch_bend_semitones: DEFAULT_PITCH_BEND_SEMITONES,
            drives: DriveSettings::default(),
            drive_assignment: DriveAssignment::from_build(),
        }
    }
}

#[derive(Debug)]
struct Pools {
    voices: VoicePool,
    drives: DrivePool,
}

/// Turns channel events into voice and drive output
pub struct PlaybackEngine {
    config: EngineConfig,
    channels: [Mutex<ChannelState>; 16],
    pools: Mutex<Pools>,
    voices: Option<Arc<dyn VoiceSink>>,
    transport: Option<Mutex<Box<dyn DriveTransport>>>,
    silenced: AtomicBool,
}

impl PlaybackEngine {
    /// Create an engine. Either output may be absent.
    pub fn new(
        config: EngineConfig,
        voices: Option<Arc<dyn VoiceSink>>,
        transport: Option<Box<dyn DriveTransport>>,
    ) -> Self {
        let pools = Pools {
            voices: VoicePool::new(config.max_voices),
            drives: DrivePool::new(config.drives.count),
        };
        Self {
            channels: Default::default(),
            pools: Mutex::new(pools),
            voices,
            transport: transport.map(Mutex::new),
            silenced: AtomicBool::new(false),
            config,
        }
    }

    /// The engine's tuning
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// A copy of one channel's state
    pub fn channel(&self, channel: Channel) -> ChannelState {
        self.channels[channel.index()].lock().clone()
    }

    /// True when a drive transport is present and open
    pub fn drives_connected(&self) -> bool {
        self.transport
            .as_ref()
            .is_some_and(|t| t.lock().is_connected())
    }

    /// Read from the drive transport, for the startup handshake
    pub fn read_drive_transport(&self, buf: &mut [u8]) -> io::Result<usize> {
        match &self.transport {
            Some(transport) => transport.lock().read(buf),
            None => Err(io::Error::new(
                io::ErrorKind::NotConnected,
                "no drive transport",
            )),
        }
    }

    /// Give drives to channels in the order of `plan`
    pub fn apply_drive_plan(&self, plan: &DrivePlan) {
        for &channel in plan.channels() {
            let mut state = self.channels[channel.index()].lock();
            self.assign_drive(&mut state, channel);
        }
    }

    fn assign_drive(&self, state: &mut ChannelState, channel: Channel) {
        if state.has_been_used {
            return;
        }
        state.has_been_used = true;
        match self.pools.lock().drives.claim() {
            Some(drive) => {
                info!(channel = channel.number(), drive = drive.index(), "channel assigned to drive");
                state.drive = Some(drive);
            }
            None => debug!(channel = channel.number(), "no drive left for channel"),
        }
    }

    fn params(&self, state: &ChannelState, note: usize, velocity: u8) -> VoiceParams {
        let amplitude = f64::from(velocity) / self.config.velocity_full_scale
            * f64::from(state.volume)
            / 127.0
            * f64::from(state.expression)
            / 127.0;
        VoiceParams {
            frequency: Note::from_byte(note as u8).frequency(),
            pitch_bend: state.pitch_bend,
            amplitude: amplitude as f32,
        }
    }

    fn send(&self, command: DriveCommand) {
        let Some(transport) = &self.transport else {
            return;
        };
        if let Err(e) = transport.lock().write(&command.to_packet()) {
            warn!(?command, error = %e, "failed to send drive command");
        }
    }

    fn send_drive_note(&self, state: &ChannelState) {
        let Some(drive) = state.drive else {
            return;
        };
        if self.config.drives.is_audible(state.volume, state.expression) {
            self.send(DriveCommand::Play {
                drive,
                frequency: state.drive_frequency * state.pitch_bend,
            });
        }
    }

    /// Start a note, or retrigger it if it is already sounding.
    ///
    /// Velocity 0 or 1, or an unvoiceable program, stops the note instead.
    pub fn note_on(&self, channel: Channel, note: Note, velocity: u8) {
        if channel.is_percussion() {
            return;
        }
        let mut guard = self.channels[channel.index()].lock();
        if self.is_silenced() {
            trace!(channel = channel.number(), %note, "note on after teardown dropped");
            return;
        }
        let state = &mut *guard;
        if self.config.drive_assignment == DriveAssignment::Sequential
            && state.has_valid_program()
        {
            self.assign_drive(state, channel);
        }

        if velocity <= 1 || !state.has_valid_program() {
            self.release(state, channel, note);
            return;
        }

        if let Some(sink) = &self.voices {
            let index = note.index();
            let params = self.params(state, index, velocity);
            if let Some(active) = state.active[index].as_mut() {
                active.velocity = velocity;
                sink.update_voice(active.slot, params);
            } else {
                let slot = self.pools.lock().voices.acquire();
                match slot {
                    Some(slot) => {
                        state.active[index] = Some(ActiveNote { slot, velocity });
                        sink.start_voice(slot, params);
                    }
                    None => warn!(
                        channel = channel.number(),
                        %note,
                        "too many simultaneous voices, dropping note"
                    ),
                }
            }
        }

        if state.drive.is_some() && self.drives_connected() {
            state.drive_frequency = self.config.drives.frequency(note);
            state.sounding_on_drive = true;
            self.send_drive_note(state);
        }
        trace!(channel = channel.number(), %note, velocity, "note on");
    }

    /// Stop a note and return its voice to the pool
    pub fn note_off(&self, channel: Channel, note: Note) {
        if channel.is_percussion() {
            return;
        }
        let mut state = self.channels[channel.index()].lock();
        self.release(&mut state, channel, note);
    }

    fn release(&self, state: &mut ChannelState, channel: Channel, note: Note) {
        if let Some(active) = state.active[note.index()].take() {
            if let Some(sink) = &self.voices {
                sink.stop_voice(active.slot);
            }
            self.pools.lock().voices.release(active.slot);
        }
        if let Some(drive) = state.drive {
            if self.drives_connected() {
                state.sounding_on_drive = false;
                self.send(DriveCommand::Stop { drive });
            }
        }
        trace!(channel = channel.number(), %note, "note off");
    }

    /// Refresh every sounding note of a channel after a controller change
    fn refresh(&self, state: &ChannelState) {
        if self.is_silenced() {
            return;
        }
        if let Some(sink) = &self.voices {
            for (note, active) in state.active_notes() {
                sink.update_voice(active.slot, self.params(state, note, active.velocity));
            }
        }
        if state.sounding_on_drive {
            self.send_drive_note(state);
        }
    }

    /// Select a program
    pub fn set_program(&self, channel: Channel, program: u8) {
        if channel.is_percussion() {
            return;
        }
        self.channels[channel.index()].lock().program = program;
        debug!(channel = channel.number(), program, "program change");
    }

    /// Channel volume
    pub fn set_volume(&self, channel: Channel, volume: u8) {
        if channel.is_percussion() {
            return;
        }
        let mut state = self.channels[channel.index()].lock();
        state.volume = volume;
        self.refresh(&state);
        debug!(channel = channel.number(), volume, "channel volume");
    }

    /// Expression
    pub fn set_expression(&self, channel: Channel, expression: u8) {
        if channel.is_percussion() {
            return;
        }
        let mut state = self.channels[channel.index()].lock();
        state.expression = expression;
        self.refresh(&state);
        debug!(channel = channel.number(), expression, "expression");
    }

    /// Pitch bend from its 14-bit value
    pub fn set_pitch_bend(&self, channel: Channel, value: u16) {
        if channel.is_percussion() {
            return;
        }
        let factor = pitch_bend_factor(value, self.config.pitch_bend_semitones);
        let mut state = self.channels[channel.index()].lock();
        state.pitch_bend = factor;
        self.refresh(&state);
        debug!(channel = channel.number(), value, factor, "pitch bend");
    }

    /// Stop every voice and every claimed drive.
    ///
    /// Only the first call does anything. Note and controller events that
    /// arrive afterwards are dropped, so nothing can sound again.
    pub fn silence_all(&self) {
        if self.silenced.swap(true, Ordering::AcqRel) {
            return;
        }
        for channel in &self.channels {
            let mut state = channel.lock();
            for active in state.active.iter_mut().filter_map(Option::take) {
                self.pools.lock().voices.release(active.slot);
            }
            state.sounding_on_drive = false;
        }
        let (slots, drives) = {
            let pools = self.pools.lock();
            (pools.voices.slots(), pools.drives.claimed())
        };
        if let Some(sink) = &self.voices {
            for slot in slots {
                sink.stop_voice(slot);
            }
        }
        if self.drives_connected() {
            for drive in drives {
                self.send(DriveCommand::Stop { drive });
            }
        }
        info!("all voices and drives silenced");
    }

    /// True once [`silence_all`](Self::silence_all) has started
    pub fn is_silenced(&self) -> bool {
        self.silenced.load(Ordering::Acquire)
    }

    /// Voice slots ready to be handed out
    pub fn free_voices(&self) -> usize {
        self.pools.lock().voices.available()
    }

    /// Voice slots held by sounding notes
    pub fn active_voices(&self) -> usize {
        self.channels.iter().map(|c| c.lock().active_count()).sum()
    }

    /// Voice slots in the pool
    pub fn total_voices(&self) -> usize {
        self.pools.lock().voices.total()
    }
}

/// Frequency multiplier for a 14-bit pitch bend, `semitones` at full deflection
pub fn pitch_bend_factor(value: u16, semitones: f64) -> f64 {
    2f64.powf(semitones * (f64::from(value) - 8192.0) / 8192.0 / 12.0)
}
