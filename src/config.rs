use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::warn;

use crate::app_dirs::AppDirs;
use crate::board::{DEFAULT_ROUND_DURATION, MAX_ROUND_DURATION};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// seconds available in one round
    pub round_duration: f64,
    /// map size in pixel-space units
    pub map_width: f64,
    pub map_height: f64,
    /// cursor movement per arrow key press
    pub cursor_step: f64,
    /// how close the pointer must be to grab a marker or vertex
    pub hit_radius: f64,
    /// round seconds played back per wall-clock second
    pub playback_speed: f64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            round_duration: DEFAULT_ROUND_DURATION,
            map_width: 1024.0,
            map_height: 768.0,
            cursor_step: 15.0,
            hit_radius: 12.0,
            playback_speed: 1.0,
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConfigError {
    #[error("{field} must be a positive number, got {value}")]
    NotPositive { field: &'static str, value: f64 },
    #[error("{field} must be at most {max}, got {value}")]
    TooLarge {
        field: &'static str,
        value: f64,
        max: f64,
    },
}

impl Config {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let fields = [
            ("round_duration", self.round_duration),
            ("map_width", self.map_width),
            ("map_height", self.map_height),
            ("cursor_step", self.cursor_step),
            ("hit_radius", self.hit_radius),
            ("playback_speed", self.playback_speed),
        ];
        if let Some((field, value)) = fields
            .into_iter()
            .find(|(_, value)| !value.is_finite() || *value <= 0.0)
        {
            return Err(ConfigError::NotPositive { field, value });
        }
        if self.round_duration > MAX_ROUND_DURATION {
            return Err(ConfigError::TooLarge {
                field: "round_duration",
                value: self.round_duration,
                max: MAX_ROUND_DURATION,
            });
        }
        Ok(())
    }
}

pub trait ConfigStore {
    fn load(&self) -> Config;
    fn save(&self, cfg: &Config) -> std::io::Result<()>;
}

#[derive(Debug, Clone)]
pub struct FileConfigStore {
    path: PathBuf,
}

impl FileConfigStore {
    pub fn new() -> Self {
        Self {
            path: AppDirs::config_path(),
        }
    }

    pub fn with_path<P: AsRef<Path>>(p: P) -> Self {
        Self {
            path: p.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Default for FileConfigStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigStore for FileConfigStore {
    /// Missing, unreadable or invalid files fall back to defaults
    fn load(&self) -> Config {
        let path = self.path.display();
        if let Ok(bytes) = fs::read(&self.path) {
            match serde_json::from_slice::<Config>(&bytes) {
                Ok(cfg) => match cfg.validate() {
                    Ok(()) => return cfg,
                    Err(e) => warn!(%path, error = %e, "ignoring invalid config"),
                },
                Err(e) => warn!(%path, error = %e, "ignoring unparsable config"),
            }
        }
        Config::default()
    }

    fn save(&self, cfg: &Config) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let data = serde_json::to_vec_pretty(cfg).unwrap_or_default();
        fs::write(&self.path, data)
    }
}
