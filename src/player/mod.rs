#![doc = r#"
Real-time playback of a parsed [`MidiFile`].

Each track runs as a unit that sleeps until the deadline of its next non-zero
delta and then dispatches events to the shared [`PlaybackEngine`]. Deadlines
are measured from a start instant fixed before the first unit runs, so every
track accumulates

```text
start + Σ delta_i / ticks_per_second_i
```

where the tick rate is the one in force when the delta is reached.

Format 1 tracks play at the same time. Track 0 is launched alone and the
others wait until it reaches its first non-zero delta or its end, so tempo
events at the head of track 0 are in force before any note plays. Formats 0
and 2 play their tracks one after another, each timed from its own launch.
"#]

use std::{sync::Arc, time::Duration};

use tokio::{
    sync::watch,
    task::JoinSet,
    time::{self, Instant},
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::{
    engine::PlaybackEngine,
    file::{MidiFile, Timing},
    message::{Channel, PlaybackTarget},
    note::Note,
    tempo::{Tempo, TempoClock},
};

/// Waits around playback
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlaybackConfig {
    /// Interval between reads while waiting for the drive controller
    pub handshake_poll: Duration,
    /// Pause between the controller becoming ready and the first note
    pub settle: Duration,
    /// Pause after everything is silenced, for envelopes and drives to stop
    pub tail: Duration,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            handshake_poll: Duration::from_millis(1),
            settle: Duration::from_millis(2000),
            tail: Duration::from_millis(300),
        }
    }
}

/// How a whole session ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackOutcome {
    /// Every track reached its end
    Finished,
    /// The cancellation token fired
    Cancelled,
}

/// How a single track ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackOutcome {
    /// Every event was dispatched
    Finished,
    /// Stopped early and silenced the engine
    Cancelled,
}

/// Plays files through an engine
pub struct Player {
    engine: Arc<PlaybackEngine>,
    clock: Arc<TempoClock>,
    cancel: CancellationToken,
    config: PlaybackConfig,
}

impl Player {
    /// A player for files with the given timing
    pub fn new(
        engine: Arc<PlaybackEngine>,
        timing: Timing,
        cancel: CancellationToken,
        config: PlaybackConfig,
    ) -> Self {
        Self {
            engine,
            clock: Arc::new(TempoClock::new(timing)),
            cancel,
            config,
        }
    }

    /// The engine notes are sent to
    pub fn engine(&self) -> &Arc<PlaybackEngine> {
        &self.engine
    }

    /// The tick rate shared by all tracks
    pub fn clock(&self) -> &Arc<TempoClock> {
        &self.clock
    }

    /// Sleep for `duration`, returning false if cancelled first
    async fn pause(&self, duration: Duration) -> bool {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => false,
            _ = time::sleep(duration) => true,
        }
    }

    /// Wait for the drive controller to report ready, then let it settle.
    ///
    /// Nothing is sounding yet, so a cancelled preparation leaves the engine
    /// untouched.
    pub async fn prepare(&self) -> PlaybackOutcome {
        if self.engine.drives_connected() {
            info!("waiting for the drive controller to signal ready");
            loop {
                let engine = Arc::clone(&self.engine);
                let read = tokio::task::spawn_blocking(move || {
                    let mut buf = [0u8; 4];
                    engine.read_drive_transport(&mut buf)
                });
                let ready = tokio::select! {
                    biased;
                    _ = self.cancel.cancelled() => return PlaybackOutcome::Cancelled,
                    result = read => match result {
                        Ok(Ok(n)) => n > 0,
                        Ok(Err(e)) => {
                            debug!(error = %e, "no handshake yet");
                            false
                        }
                        Err(e) => {
                            warn!(error = %e, "handshake read did not complete");
                            false
                        }
                    },
                };
                if ready {
                    break;
                }
                if !self.pause(self.config.handshake_poll).await {
                    return PlaybackOutcome::Cancelled;
                }
            }
            info!("drive controller ready");
        }
        if self.pause(self.config.settle).await {
            PlaybackOutcome::Finished
        } else {
            PlaybackOutcome::Cancelled
        }
    }

    /// Play every track of `file`, then silence the engine
    pub async fn play(&self, file: Arc<MidiFile>) -> PlaybackOutcome {
        info!(
            format = %file.format_type(),
            tracks = file.tracks().len(),
            "launching playback"
        );
        let outcome = if file.format_type().is_simultaneous() && !file.tracks().is_empty() {
            self.play_simultaneous(file).await
        } else {
            self.play_sequential(file).await
        };
        self.engine.silence_all();
        if outcome == PlaybackOutcome::Finished {
            time::sleep(self.config.tail).await;
            info!("playback finished");
        } else {
            info!("playback cancelled");
        }
        outcome
    }

    fn unit(
        &self,
        file: &Arc<MidiFile>,
        index: usize,
        ready: Option<watch::Sender<bool>>,
    ) -> TrackUnit {
        TrackUnit {
            index,
            file: Arc::clone(file),
            engine: Arc::clone(&self.engine),
            clock: Arc::clone(&self.clock),
            cancel: self.cancel.clone(),
            ready,
        }
    }

    async fn play_simultaneous(&self, file: Arc<MidiFile>) -> PlaybackOutcome {
        let start = Instant::now();
        let (ready_tx, mut ready_rx) = watch::channel(false);
        let mut tasks = JoinSet::new();
        tasks.spawn(self.unit(&file, 0, Some(ready_tx)).run(start));

        tokio::select! {
            _ = self.cancel.cancelled() => {}
            // an error means track 0 is gone, which releases the barrier too
            _ = ready_rx.wait_for(|ready| *ready) => {}
        }
        let mut outcome = PlaybackOutcome::Finished;
        if self.cancel.is_cancelled() {
            outcome = PlaybackOutcome::Cancelled;
        } else {
            debug!("track 0 released the remaining tracks");
            for index in 1..file.tracks().len() {
                tasks.spawn(self.unit(&file, index, None).run(start));
            }
        }

        while let Some(result) = tasks.join_next().await {
            match result {
                Ok(TrackOutcome::Finished) => {}
                Ok(TrackOutcome::Cancelled) => outcome = PlaybackOutcome::Cancelled,
                Err(e) => warn!(error = %e, "track task failed"),
            }
        }
        outcome
    }

    async fn play_sequential(&self, file: Arc<MidiFile>) -> PlaybackOutcome {
        for index in 0..file.tracks().len() {
            let outcome = self.unit(&file, index, None).run(Instant::now()).await;
            if outcome == TrackOutcome::Cancelled {
                return PlaybackOutcome::Cancelled;
            }
        }
        PlaybackOutcome::Finished
    }
}

/// One track being played
struct TrackUnit {
    index: usize,
    file: Arc<MidiFile>,
    engine: Arc<PlaybackEngine>,
    clock: Arc<TempoClock>,
    cancel: CancellationToken,
    ready: Option<watch::Sender<bool>>,
}

impl TrackUnit {
    fn release_barrier(&self) {
        if let Some(ready) = &self.ready {
            ready.send_if_modified(|released| !std::mem::replace(released, true));
        }
    }

    fn cancelled(&self) -> TrackOutcome {
        self.engine.silence_all();
        debug!(track = self.index, "track cancelled");
        TrackOutcome::Cancelled
    }

    async fn run(self, start: Instant) -> TrackOutcome {
        debug!(track = self.index, "track launched");
        let file = Arc::clone(&self.file);
        let events = file
            .tracks()
            .get(self.index)
            .map(|track| track.events())
            .unwrap_or_default();

        let mut elapsed_ms = 0.0;
        for event in events {
            let delta = event.delta_ticks();
            if delta != 0 {
                self.release_barrier();
                elapsed_ms += f64::from(delta) / self.clock.ticks_per_second() * 1000.0;
                let deadline = start + Duration::from_secs_f64(elapsed_ms / 1000.0);
                tokio::select! {
                    biased;
                    _ = self.cancel.cancelled() => return self.cancelled(),
                    _ = time::sleep_until(deadline) => {}
                }
            }
            if self.cancel.is_cancelled() {
                return self.cancelled();
            }
            event.message().apply(&self, self.index);
        }

        self.release_barrier();
        debug!(track = self.index, elapsed_secs = elapsed_ms / 1000.0, "track finished");
        TrackOutcome::Finished
    }
}

impl PlaybackTarget for TrackUnit {
    fn note_on(&self, channel: Channel, note: Note, velocity: u8) {
        self.engine.note_on(channel, note, velocity);
    }

    fn note_off(&self, channel: Channel, note: Note) {
        self.engine.note_off(channel, note);
    }

    fn set_program(&self, channel: Channel, program: u8) {
        self.engine.set_program(channel, program);
    }

    fn set_volume(&self, channel: Channel, volume: u8) {
        self.engine.set_volume(channel, volume);
    }

    fn set_expression(&self, channel: Channel, expression: u8) {
        self.engine.set_expression(channel, expression);
    }

    fn set_pitch_bend(&self, channel: Channel, value: u16) {
        self.engine.set_pitch_bend(channel, value);
    }

    fn set_tempo(&self, tempo: Tempo) {
        let ticks_per_second = self.clock.set_tempo(tempo);
        debug!(track = self.index, ticks_per_second, "new tempo");
    }

    fn end_of_track(&self, track: usize) {
        self.release_barrier();
        debug!(track, "end of track");
    }
}
