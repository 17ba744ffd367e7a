//! Configuration loaded from a TOML file
//!
//! Every section and field has a default, so an empty (or missing) file is a
//! valid configuration.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::model::PlaybackMode;

pub const MIN_RATE: f64 = 0.5;
pub const MAX_RATE: f64 = 2.0;
pub const MAX_TIME_UPDATES_PER_SECOND: u32 = 1000;

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub player: PlayerConfig,
    pub logging: LoggingConfig,
    pub resume: ResumeConfig,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerConfig {
    /// Whether a freshly prepared item starts playing once ready
    pub autoplay: bool,
    /// Forward buffer hint for the engine; 0 lets the engine choose
    pub preferred_buffer_ms: u64,
    /// Position ticks per second
    pub time_updates_per_second: u32,
    pub rate: f64,
    pub volume: f64,
    pub muted: bool,
    pub allow_background_playback: bool,
    /// How many times a stalled stream is nudged before giving up
    pub max_stall_retries: u32,
    pub mode: PlaybackMode,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            autoplay: true,
            preferred_buffer_ms: 0,
            time_updates_per_second: 10,
            rate: 1.0,
            volume: 1.0,
            muted: false,
            allow_background_playback: true,
            max_stall_retries: 3,
            mode: PlaybackMode::Sequential,
        }
    }
}

impl PlayerConfig {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_secs(1) / self.time_updates_per_second.clamp(1, MAX_TIME_UPDATES_PER_SECOND)
    }

    pub fn preferred_buffer(&self) -> Duration {
        Duration::from_millis(self.preferred_buffer_ms)
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub dir: PathBuf,
    pub file_prefix: String,
    /// Used when `RUST_LOG` is not set
    pub filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from(".logs"),
            file_prefix: "audio-player".to_string(),
            filter: "audio_player=debug,audio_player_rs=debug,warn".to_string(),
        }
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ResumeConfig {
    /// JSON file holding resume positions; in-memory only when unset
    pub path: Option<PathBuf>,
}

impl Config {
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml(&content)
    }

    /// Like [`load`](Self::load), but a missing file yields the defaults
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self> {
        if path.as_ref().exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn validate(&self) -> Result<()> {
        let player = &self.player;
        if !(MIN_RATE..=MAX_RATE).contains(&player.rate) {
            return Err(Error::Config(format!(
                "player.rate must be between {} and {}, got {}",
                MIN_RATE, MAX_RATE, player.rate
            )));
        }
        if !(0.0..=1.0).contains(&player.volume) {
            return Err(Error::Config(format!(
                "player.volume must be between 0 and 1, got {}",
                player.volume
            )));
        }
        if !(1..=MAX_TIME_UPDATES_PER_SECOND).contains(&player.time_updates_per_second) {
            return Err(Error::Config(format!(
                "player.time_updates_per_second must be between 1 and {}, got {}",
                MAX_TIME_UPDATES_PER_SECOND, player.time_updates_per_second
            )));
        }
        Ok(())
    }
}
