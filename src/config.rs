#![doc = r#"
Player configuration.

Files are loaded in order, later values winning key by key:

1. the user config, `~/.config/floppymidi/config.toml` on Linux
2. `./floppymidi.toml`, or the path given with `--config` instead
3. environment variables `FLOPPYMIDI_PORT`, `FLOPPYMIDI_LOG_LEVEL` and
   `FLOPPYMIDI_REPORT`

Missing keys keep their defaults. Values that would break playback, such as
a zero `velocity_full_scale` or a drive range narrower than an octave, are
rejected when the files are loaded.

```toml
[input]
max_file_bytes = 2000000
report_path = "midi_log.txt"

[audio]
enabled = true
sample_rate = 44100
max_voices = 200
velocity_full_scale = 1500.0

[drives]
enabled = true
port = "/dev/ttyACM0"
count = 15
min_note = 25
max_note = 57
down_shift = 12
min_loudness = 1000

[engine]
pitch_bend_semitones = 2.3

[timing]
handshake_poll_us = 1000
settle_ms = 2000
tail_ms = 300

[log]
level = "info"
```
"#]

use std::{
    env,
    path::{Path, PathBuf},
    time::Duration,
};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    engine::{DEFAULT_PITCH_BEND_SEMITONES, DriveAssignment, DriveSettings, EngineConfig},
    file::DEFAULT_MAX_FILE_BYTES,
    output::DEFAULT_SAMPLE_RATE,
    player::PlaybackConfig,
};

/// Configuration loading errors
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A config file exists but could not be read
    #[error("Failed to read config file {path}: {source}")]
    FileRead {
        /// the file
        path: PathBuf,
        /// the underlying failure
        source: std::io::Error,
    },
    /// A config file is not valid TOML or has values of the wrong type
    #[error("Failed to parse config file {path}: {message}")]
    Parse {
        /// the file
        path: PathBuf,
        /// what the parser reported
        message: String,
    },
    /// A value parsed but is out of range
    #[error("Invalid config value {field}: {message}")]
    Invalid {
        /// the offending key, as `section.key`
        field: &'static str,
        /// the accepted range and the value found
        message: String,
    },
}

/// Upper bound on `[audio] max_voices`, each voice owning renderer state
pub const MAX_VOICES: usize = 4096;

/// `[input]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InputConfig {
    /// Files above this size are refused
    pub max_file_bytes: u64,
    /// Where the structure report is written
    pub report_path: PathBuf,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            max_file_bytes: DEFAULT_MAX_FILE_BYTES,
            report_path: PathBuf::from("midi_log.txt"),
        }
    }
}

/// `[audio]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    /// Play sine voices
    pub enabled: bool,
    /// Output sample rate
    pub sample_rate: u32,
    /// Voices that may sound at once
    pub max_voices: usize,
    /// Velocity that maps to full amplitude
    pub velocity_full_scale: f64,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            sample_rate: DEFAULT_SAMPLE_RATE,
            max_voices: 200,
            velocity_full_scale: 1500.0,
        }
    }
}

/// `[drives]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DrivesConfig {
    /// Play on the drives
    pub enabled: bool,
    /// Serial device of the drive controller
    pub port: PathBuf,
    /// Drives on the controller
    pub count: u8,
    /// Lowest note a drive plays
    pub min_note: u8,
    /// Highest note a drive plays
    pub max_note: u8,
    /// Semitones notes are lowered by before folding into range
    pub down_shift: u8,
    /// Minimum `volume * expression` for a note to reach a drive
    pub min_loudness: u32,
}

impl Default for DrivesConfig {
    fn default() -> Self {
        let drives = DriveSettings::default();
        Self {
            enabled: true,
            port: PathBuf::from("/dev/ttyACM0"),
            count: drives.count,
            min_note: drives.min_note,
            max_note: drives.max_note,
            down_shift: drives.down_shift,
            min_loudness: drives.min_loudness,
        }
    }
}

/// `[engine]`, tuning shared by voices and drives
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineSection {
    /// Semitones covered by a full pitch bend
    pub pitch_bend_semitones: f64,
}

impl Default for EngineSection {
    fn default() -> Self {
        Self {
            pitch_bend_semitones: DEFAULT_PITCH_BEND_SEMITONES,
        }
    }
}

/// `[timing]`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    /// Microseconds between handshake reads
    pub handshake_poll_us: u64,
    /// Milliseconds between the handshake and the first note
    pub settle_ms: u64,
    /// Milliseconds to wait after playback
    pub tail_ms: u64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            handshake_poll_us: 1000,
            settle_ms: 2000,
            tail_ms: 300,
        }
    }
}

/// `[log]`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Filter used when `RUST_LOG` is not set
    pub level: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// Everything the player can be told
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerConfig {
    /// Input file handling
    pub input: InputConfig,
    /// Sine voices
    pub audio: AudioConfig,
    /// Stepper drives
    pub drives: DrivesConfig,
    /// Shared voice and drive tuning
    pub engine: EngineSection,
    /// Waits around playback
    pub timing: TimingConfig,
    /// Logging
    pub log: LogConfig,
}

/// Where configuration values came from
#[derive(Debug, Clone, Default)]
pub struct ConfigSources {
    /// Files loaded, in order
    pub files: Vec<PathBuf>,
    /// Environment variables that overrode a value
    pub env_overrides: Vec<String>,
}

impl PlayerConfig {
    /// Load from the standard locations, with `config_path` replacing the
    /// local file when given
    pub fn load(config_path: Option<&Path>) -> Result<(Self, ConfigSources), ConfigError> {
        let files = discover_config_files(config_path);
        let mut config = Self::from_files(&files)?;
        let env_overrides = config.apply_env_overrides(|key| env::var(key).ok());
        Ok((
            config,
            ConfigSources {
                files,
                env_overrides,
            },
        ))
    }

    /// Merge `files` in order, later keys winning
    pub fn from_files(files: &[PathBuf]) -> Result<Self, ConfigError> {
        let mut merged = toml::Table::new();
        for path in files {
            let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::FileRead {
                path: path.clone(),
                source,
            })?;
            let table: toml::Table = contents.parse().map_err(|e: toml::de::Error| {
                ConfigError::Parse {
                    path: path.clone(),
                    message: e.to_string(),
                }
            })?;
            merge_tables(&mut merged, table);
        }
        let path = files.last().cloned().unwrap_or_default();
        let config: Self =
            toml::Value::Table(merged)
                .try_into()
                .map_err(|e: toml::de::Error| ConfigError::Parse {
                    path,
                    message: e.to_string(),
                })?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the engine and renderer cannot work with
    pub fn validate(&self) -> Result<(), ConfigError> {
        let scale = self.audio.velocity_full_scale;
        if !(scale.is_finite() && scale > 0.0) {
            return Err(invalid(
                "audio.velocity_full_scale",
                format!("must be greater than 0, got {scale}"),
            ));
        }
        if !(1..=MAX_VOICES).contains(&self.audio.max_voices) {
            return Err(invalid(
                "audio.max_voices",
                format!("must be between 1 and {MAX_VOICES}, got {}", self.audio.max_voices),
            ));
        }
        if self.audio.sample_rate == 0 {
            return Err(invalid("audio.sample_rate", "must not be 0".to_string()));
        }
        let (min, max) = (self.drives.min_note, self.drives.max_note);
        if max > 127 {
            return Err(invalid(
                "drives.max_note",
                format!("must be a MIDI note (0-127), got {max}"),
            ));
        }
        if max < min || max - min < 11 {
            return Err(invalid(
                "drives.max_note",
                format!("must be at least 11 above min_note ({min}), got {max}"),
            ));
        }
        let bend = self.engine.pitch_bend_semitones;
        if !(0.0..=24.0).contains(&bend) {
            return Err(invalid(
                "engine.pitch_bend_semitones",
                format!("must be between 0 and 24, got {bend}"),
            ));
        }
        Ok(())
    }

    /// Apply overrides from `lookup` and return the names of those used
    pub fn apply_env_overrides(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Vec<String> {
        let mut used = Vec::new();
        if let Some(port) = lookup("FLOPPYMIDI_PORT") {
            self.drives.port = PathBuf::from(port);
            used.push("FLOPPYMIDI_PORT".to_string());
        }
        if let Some(level) = lookup("FLOPPYMIDI_LOG_LEVEL") {
            self.log.level = level;
            used.push("FLOPPYMIDI_LOG_LEVEL".to_string());
        }
        if let Some(report) = lookup("FLOPPYMIDI_REPORT") {
            self.input.report_path = PathBuf::from(report);
            used.push("FLOPPYMIDI_REPORT".to_string());
        }
        used
    }

    /// Engine tuning from the `[audio]`, `[drives]` and `[engine]` sections
    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            max_voices: self.audio.max_voices,
            velocity_full_scale: self.audio.velocity_full_scale,
            pitch_bend_semitones: self.engine.pitch_bend_semitones,
            drives: DriveSettings {
                count: self.drives.count,
                min_note: self.drives.min_note,
                max_note: self.drives.max_note,
                down_shift: self.drives.down_shift,
                min_loudness: self.drives.min_loudness,
            },
            drive_assignment: DriveAssignment::from_build(),
        }
    }

    /// Waits from the `[timing]` section
    pub fn playback_config(&self) -> PlaybackConfig {
        PlaybackConfig {
            handshake_poll: Duration::from_micros(self.timing.handshake_poll_us),
            settle: Duration::from_millis(self.timing.settle_ms),
            tail: Duration::from_millis(self.timing.tail_ms),
        }
    }
}

/// Config files that exist, in load order
pub fn discover_config_files(cli_path: Option<&Path>) -> Vec<PathBuf> {
    let mut files = Vec::new();

    if let Some(dirs) = directories::BaseDirs::new() {
        let user = dirs.config_dir().join("floppymidi/config.toml");
        if user.exists() {
            files.push(user);
        }
    }

    // an explicit path is used even if missing, so the read error surfaces
    if let Some(path) = cli_path {
        files.push(path.to_path_buf());
        return files;
    }

    let local = PathBuf::from("floppymidi.toml");
    if local.exists() {
        files.push(local);
    }
    files
}

fn invalid(field: &'static str, message: String) -> ConfigError {
    ConfigError::Invalid { field, message }
}

fn merge_tables(base: &mut toml::Table, overlay: toml::Table) {
    for (key, value) in overlay {
        match (base.get_mut(&key), value) {
            (Some(toml::Value::Table(base)), toml::Value::Table(overlay)) => {
                merge_tables(base, overlay)
            }
            (_, value) => {
                base.insert(key, value);
            }
        }
    }
}
