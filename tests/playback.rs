mod common;

use std::{io, sync::Arc, time::Duration};

use common::{TrackBytes, smf};
use floppymidi::{
    engine::{DriveCommand, DriveId, DrivePlan},
    output::{DriveTransport, VoiceParams, VoiceSink, VoiceSlot},
    prelude::*,
};
use parking_lot::Mutex;
use pretty_assertions::assert_eq;
use rand::{Rng, SeedableRng, rngs::StdRng};
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, PartialEq)]
enum Voice {
    Start(VoiceSlot, VoiceParams),
    Update(VoiceSlot, VoiceParams),
    Stop(VoiceSlot),
}

#[derive(Default)]
struct Voices(Mutex<Vec<Voice>>);

impl Voices {
    fn starts(&self) -> Vec<f64> {
        self.0
            .lock()
            .iter()
            .filter_map(|v| match v {
                Voice::Start(_, params) => Some(params.frequency),
                _ => None,
            })
            .collect()
    }
}

impl VoiceSink for Voices {
    fn start_voice(&self, slot: VoiceSlot, params: VoiceParams) {
        self.0.lock().push(Voice::Start(slot, params));
    }
    fn update_voice(&self, slot: VoiceSlot, params: VoiceParams) {
        self.0.lock().push(Voice::Update(slot, params));
    }
    fn stop_voice(&self, slot: VoiceSlot) {
        self.0.lock().push(Voice::Stop(slot));
    }
}

/// A drive controller that records packets and answers the handshake after
/// `silent_reads` empty reads
#[derive(Clone, Default)]
struct Controller {
    packets: Arc<Mutex<Vec<[u8; 4]>>>,
    reads: Arc<Mutex<usize>>,
    silent_reads: usize,
}

impl DriveTransport for Controller {
    fn is_connected(&self) -> bool {
        true
    }
    fn write(&mut self, bytes: &[u8]) -> io::Result<()> {
        let mut packet = [0; 4];
        packet.copy_from_slice(bytes);
        self.packets.lock().push(packet);
        Ok(())
    }
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let mut reads = self.reads.lock();
        *reads += 1;
        if *reads > self.silent_reads {
            buf[0] = 1;
            Ok(1)
        } else {
            Ok(0)
        }
    }
}

fn engine(
    config: EngineConfig,
) -> (Arc<PlaybackEngine>, Arc<Voices>, Controller) {
    let voices = Arc::new(Voices::default());
    let controller = Controller::default();
    let engine = PlaybackEngine::new(
        config,
        Some(voices.clone() as Arc<dyn VoiceSink>),
        Some(Box::new(controller.clone())),
    );
    (Arc::new(engine), voices, controller)
}

fn sequential() -> EngineConfig {
    EngineConfig {
        drive_assignment: DriveAssignment::Sequential,
        ..Default::default()
    }
}

fn ch(n: u8) -> Channel {
    Channel::new(n).unwrap()
}

fn play(drive: u8, frequency: f64) -> [u8; 4] {
    DriveCommand::Play {
        drive: DriveId::new(drive),
        frequency,
    }
    .to_packet()
}

fn stop(drive: u8) -> [u8; 4] {
    DriveCommand::Stop {
        drive: DriveId::new(drive),
    }
    .to_packet()
}

#[test]
fn a4_sounds_at_440_hz() {
    let (engine, voices, _) = engine(sequential());
    engine.note_on(ch(1), Note::from_byte(69), 100);
    assert_eq!(voices.starts(), vec![440.0]);
    assert_eq!(engine.active_voices(), 1);
}

#[test]
fn velocity_one_releases_the_note() {
    let (engine, voices, controller) = engine(sequential());
    engine.note_on(ch(1), Note::from_byte(69), 100);
    engine.note_on(ch(1), Note::from_byte(69), 1);
    assert_eq!(engine.active_voices(), 0);
    assert_eq!(engine.free_voices(), engine.total_voices());
    assert!(matches!(voices.0.lock().last(), Some(Voice::Stop(_))));
    assert_eq!(controller.packets.lock().clone(), vec![play(0, 220.0), stop(0)]);
}

#[test]
fn sound_effect_programs_stay_silent() {
    let (engine, voices, controller) = engine(sequential());
    engine.set_program(ch(1), 118);
    engine.note_on(ch(1), Note::from_byte(60), 100);
    assert!(voices.0.lock().is_empty());
    assert!(controller.packets.lock().is_empty());
    assert_eq!(engine.channel(ch(1)).drive(), None);

    // switching back makes the channel playable again
    engine.set_program(ch(1), 0);
    engine.note_on(ch(1), Note::from_byte(60), 100);
    assert_eq!(engine.channel(ch(1)).drive(), Some(DriveId::new(0)));
}

#[test]
fn percussion_is_ignored() {
    let (engine, voices, controller) = engine(sequential());
    engine.note_on(Channel::PERCUSSION, Note::from_byte(36), 100);
    engine.set_volume(Channel::PERCUSSION, 20);
    assert!(voices.0.lock().is_empty());
    assert!(controller.packets.lock().is_empty());
    assert_eq!(engine.channel(Channel::PERCUSSION).volume(), 100);
}

#[test]
fn drives_saturate_at_the_configured_count() {
    let mut config = sequential();
    config.drives.count = 2;
    let (engine, _, controller) = engine(config);
    for channel in [3, 1, 2] {
        engine.note_on(ch(channel), Note::from_byte(69), 100);
    }
    assert_eq!(engine.channel(ch(3)).drive(), Some(DriveId::new(0)));
    assert_eq!(engine.channel(ch(1)).drive(), Some(DriveId::new(1)));
    assert_eq!(engine.channel(ch(2)).drive(), None);
    assert_eq!(controller.packets.lock().len(), 2);

    engine.silence_all();
    assert_eq!(controller.packets.lock()[2..], [stop(0), stop(1)]);
}

#[test]
fn first_seen_plan_follows_file_order() {
    let first = TrackBytes::new()
        .program(0, 4, 100)
        .note_on(0, 4, 60, 100)
        .note_on(0, 7, 60, 100)
        .end()
        .build();
    let second = TrackBytes::new()
        .note_on(0, 2, 60, 100)
        .note_on(0, 10, 60, 100)
        .note_on(0, 7, 62, 100)
        .end()
        .build();
    let file = MidiFile::parse(&smf(1, 96, &[first, second])).unwrap();
    let plan = DrivePlan::scan(&file);
    let order: Vec<u8> = plan.channels().iter().map(|c| c.number()).collect();
    assert_eq!(order, vec![7, 2]);

    let (engine, _, _) = engine(EngineConfig {
        drive_assignment: DriveAssignment::FirstSeen,
        ..Default::default()
    });
    engine.apply_drive_plan(&plan);
    engine.apply_drive_plan(&plan);
    assert_eq!(engine.channel(ch(7)).drive(), Some(DriveId::new(0)));
    assert_eq!(engine.channel(ch(2)).drive(), Some(DriveId::new(1)));
    assert_eq!(engine.channel(ch(4)).drive(), None);
}

#[test]
fn voice_pool_is_conserved() {
    let mut rng = StdRng::seed_from_u64(0x5EED);
    let mut config = sequential();
    config.max_voices = 24;
    let (engine, _, _) = engine(config);
    let total = engine.total_voices();
    for _ in 0..5000 {
        let channel = ch(rng.gen_range(1..=16));
        let note = Note::from_byte(rng.gen_range(40..80));
        match rng.gen_range(0..10) {
            0..=5 => engine.note_on(channel, note, rng.gen_range(0..128)),
            6..=8 => engine.note_off(channel, note),
            _ => engine.set_program(channel, rng.gen_range(0..128)),
        }
        assert_eq!(engine.free_voices() + engine.active_voices(), total);
    }
    engine.silence_all();
    assert_eq!(engine.free_voices(), total);
}

#[tokio::test(start_paused = true)]
async fn file_plays_through_to_the_drives() {
    let conductor = TrackBytes::new().tempo(0, 250_000).end().build();
    let melody = TrackBytes::new()
        .note_on(0, 1, 69, 100)
        .event(48, &[0xE0, 0x7F, 0x7F])
        .note_off(48, 1, 69)
        .end()
        .build();
    let file = Arc::new(MidiFile::parse(&smf(1, 96, &[conductor, melody])).unwrap());
    let (engine, voices, controller) = engine(sequential());
    let player = Player::new(
        Arc::clone(&engine),
        file.timing(),
        CancellationToken::new(),
        PlaybackConfig::default(),
    );

    let before = tokio::time::Instant::now();
    assert_eq!(player.play(file).await, PlaybackOutcome::Finished);
    // 96 ticks at 384 ticks per second, then the tail
    let elapsed = before.elapsed();
    assert!(elapsed >= Duration::from_millis(549), "{elapsed:?}");
    assert!(elapsed <= Duration::from_millis(552), "{elapsed:?}");

    let bend = 2f64.powf(2.3 * 8191.0 / 8192.0 / 12.0);
    assert_eq!(
        controller.packets.lock().clone(),
        vec![play(0, 220.0), play(0, 220.0 * bend), stop(0), stop(0)]
    );
    assert_eq!(voices.starts(), vec![440.0]);
    assert_eq!(engine.free_voices(), engine.total_voices());
}

/// Records when each voice starts, relative to `origin`
struct Onsets {
    origin: tokio::time::Instant,
    starts: Mutex<Vec<(f64, u64)>>,
}

impl VoiceSink for Onsets {
    fn start_voice(&self, _slot: VoiceSlot, params: VoiceParams) {
        let millis = (self.origin.elapsed().as_secs_f64() * 1000.0).round() as u64;
        self.starts.lock().push((params.frequency, millis));
    }
    fn update_voice(&self, _slot: VoiceSlot, _params: VoiceParams) {}
    fn stop_voice(&self, _slot: VoiceSlot) {}
}

#[tokio::test(start_paused = true)]
async fn conductor_tempo_change_retimes_later_deltas() {
    // 96 tpqn: 192 ticks per second until the conductor switches to
    // 250 000 us per quarter note one second in, 384 afterwards
    let conductor = TrackBytes::new()
        .tempo(0, 500_000)
        .tempo(192, 250_000)
        .end()
        .build();
    let melody = TrackBytes::new()
        .note_on(96, 1, 69, 100)
        .note_on(192, 1, 71, 100)
        .note_on(192, 1, 72, 100)
        .end()
        .build();
    let file = Arc::new(MidiFile::parse(&smf(1, 96, &[conductor, melody])).unwrap());

    let onsets = Arc::new(Onsets {
        origin: tokio::time::Instant::now(),
        starts: Mutex::new(Vec::new()),
    });
    let engine = Arc::new(PlaybackEngine::new(
        sequential(),
        Some(onsets.clone() as Arc<dyn VoiceSink>),
        None,
    ));
    let player = Player::new(
        engine,
        file.timing(),
        CancellationToken::new(),
        PlaybackConfig::default(),
    );
    assert_eq!(player.play(file).await, PlaybackOutcome::Finished);
    assert_eq!(player.clock().ticks_per_second(), 384.0);

    let starts: Vec<u64> = onsets.starts.lock().iter().map(|(_, at)| *at).collect();
    // the second note was already scheduled before the tempo change
    assert_eq!(starts, vec![500, 1500, 2000]);
    let frequencies: Vec<f64> = onsets.starts.lock().iter().map(|(f, _)| *f).collect();
    assert_eq!(frequencies[0], 440.0);
}

#[tokio::test(start_paused = true)]
async fn prepare_waits_for_the_handshake() {
    let voices = Arc::new(Voices::default());
    let controller = Controller {
        silent_reads: 3,
        ..Default::default()
    };
    let engine = PlaybackEngine::new(
        sequential(),
        Some(voices as Arc<dyn VoiceSink>),
        Some(Box::new(controller.clone())),
    );
    let player = Player::new(
        Arc::new(engine),
        Timing::new_ticks_per_quarter_note(96),
        CancellationToken::new(),
        PlaybackConfig::default(),
    );
    assert_eq!(player.prepare().await, PlaybackOutcome::Finished);
    assert_eq!(*controller.reads.lock(), 4);
}

#[tokio::test(start_paused = true)]
async fn prepare_gives_up_when_cancelled() {
    let controller = Controller {
        silent_reads: usize::MAX,
        ..Default::default()
    };
    let engine = PlaybackEngine::new(sequential(), None, Some(Box::new(controller)));
    let cancel = CancellationToken::new();
    cancel.cancel();
    let player = Player::new(
        Arc::new(engine),
        Timing::new_ticks_per_quarter_note(96),
        cancel,
        PlaybackConfig::default(),
    );
    assert_eq!(player.prepare().await, PlaybackOutcome::Cancelled);
}
