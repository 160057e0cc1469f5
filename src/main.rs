use std::{path::PathBuf, sync::Arc};

use anyhow::{Context, Result};
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use floppymidi::{
    config::PlayerConfig,
    engine::{DriveAssignment, PlaybackEngine},
    file::MidiFile,
    output::{DriveTransport, SerialTransport, VoiceSink},
    player::{PlaybackOutcome, Player},
    report::StructureReport,
};

/// Play a Standard MIDI File on sine voices and stepper-motor drives
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    /// The MIDI file to play
    file: PathBuf,

    /// Config file, used instead of ./floppymidi.toml
    #[arg(long)]
    config: Option<PathBuf>,

    /// Where to write the structure report
    #[arg(long)]
    report: Option<PathBuf>,

    /// Do not play sine voices
    #[arg(long)]
    no_audio: bool,

    /// Do not play on the drives
    #[arg(long)]
    no_drives: bool,

    /// Write the structure report and exit
    #[arg(long)]
    parse_only: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let (mut config, sources) =
        PlayerConfig::load(cli.config.as_deref()).context("Failed to load configuration")?;
    if let Some(report) = cli.report {
        config.input.report_path = report;
    }
    config.audio.enabled &= !cli.no_audio;
    config.drives.enabled &= !cli.no_drives;

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log.level));
    tracing_subscriber::fmt().with_env_filter(filter).init();
    info!(files = ?sources.files, env = ?sources.env_overrides, "configuration loaded");

    let cancel = CancellationToken::new();
    tokio::spawn({
        let cancel = cancel.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("Received SIGINT, stopping playback");
                cancel.cancel();
            }
        }
    });

    let file = match MidiFile::load_cancellable(&cli.file, config.input.max_file_bytes, &cancel) {
        Ok(file) => Arc::new(file),
        Err(e) if e.is_cancelled() => return Ok(()),
        Err(e) => return Err(e).context("Failed to load MIDI file"),
    };
    let size = std::fs::metadata(&cli.file).map(|m| m.len()).unwrap_or_default();
    let name = cli.file.display().to_string();

    let report = StructureReport::new(&name, size, &file);
    match report.write_to(&config.input.report_path) {
        Ok(()) => info!(path = %config.input.report_path.display(), "structure report written"),
        Err(e) => warn!(
            path = %config.input.report_path.display(),
            error = %e,
            "failed to write structure report"
        ),
    }
    let plan = report.into_plan();
    info!("Total channels used: {}", plan.len());
    if cli.parse_only {
        return Ok(());
    }

    // the device stops when dropped
    let (voices, _device) = start_voices(&config);
    let transport = if config.drives.enabled {
        Some(Box::new(SerialTransport::open(&config.drives.port)) as Box<dyn DriveTransport>)
    } else {
        None
    };

    let engine = Arc::new(PlaybackEngine::new(config.engine_config(), voices, transport));
    if engine.config().drive_assignment == DriveAssignment::FirstSeen {
        engine.apply_drive_plan(&plan);
    }

    let player = Player::new(
        engine,
        file.timing(),
        cancel.clone(),
        config.playback_config(),
    );
    if player.prepare().await == PlaybackOutcome::Cancelled {
        // a handshake read may still be blocked on the port
        std::process::exit(0);
    }
    player.play(file).await;
    Ok(())
}

#[cfg(feature = "audio")]
fn start_voices(
    config: &PlayerConfig,
) -> (Option<Arc<dyn VoiceSink>>, Option<tinyaudio::OutputDevice>) {
    if !config.audio.enabled {
        return (None, None);
    }
    let (handle, bank) =
        floppymidi::output::sine_bank(config.audio.max_voices, config.audio.sample_rate);
    match floppymidi::output::run_sine_output(bank, config.audio.sample_rate) {
        Ok(device) => {
            info!(sample_rate = config.audio.sample_rate, "sine output started");
            (Some(Arc::new(handle) as Arc<dyn VoiceSink>), Some(device))
        }
        Err(e) => {
            warn!(error = %e, "sine output unavailable");
            (None, None)
        }
    }
}

#[cfg(not(feature = "audio"))]
fn start_voices(config: &PlayerConfig) -> (Option<Arc<dyn VoiceSink>>, Option<()>) {
    if config.audio.enabled {
        warn!("built without the audio feature, sine output unavailable");
    }
    (None, None)
}
