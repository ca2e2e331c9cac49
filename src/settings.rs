//! Game settings and preferences
//!
//! Persisted as JSON next to the high score table.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::consts::*;
use crate::persistence::{self, StorageError};
use crate::speed::{ConfigError, SpeedTuning};

/// Speed Mode pace presets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum Pace {
    Relaxed,
    #[default]
    Normal,
    Frantic,
}

impl Pace {
    pub fn as_str(&self) -> &'static str {
        match self {
            Pace::Relaxed => "Relaxed",
            Pace::Normal => "Normal",
            Pace::Frantic => "Frantic",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "relaxed" | "easy" => Some(Pace::Relaxed),
            "normal" => Some(Pace::Normal),
            "frantic" | "hard" => Some(Pace::Frantic),
            _ => None,
        }
    }

    /// Loop tuning for this pace
    pub fn tuning(&self) -> SpeedTuning {
        let normal = SpeedTuning::default();
        match self {
            Pace::Relaxed => SpeedTuning {
                initial_interval: 2.0,
                interval_step: 0.04,
                min_interval: 0.25,
                ..normal
            },
            Pace::Normal => normal,
            Pace::Frantic => SpeedTuning {
                phase_duration: 2.0,
                initial_interval: 1.2,
                interval_step: 0.06,
                ..normal
            },
        }
    }
}

/// Game settings/preferences
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Speed Mode pace preset
    pub pace: Pace,
    /// Hand-edited loop tuning; `None` follows the `pace` preset
    pub speed: Option<SpeedTuning>,
    /// Bubbles on the Speed board
    pub bubble_count: usize,
    /// Fixed RNG seed for reproducible runs
    pub seed: Option<u64>,

    // === Audio ===
    pub sound_enabled: bool,
    /// Master volume (0.0 - 1.0)
    pub master_volume: f32,
    /// Sound effects volume (0.0 - 1.0)
    pub sfx_volume: f32,
    /// Music volume (0.0 - 1.0)
    pub music_volume: f32,

    // === Feedback / Accessibility ===
    /// Vibrate on pop
    pub vibration: bool,
    /// Reduced motion (no pop bursts)
    pub reduced_motion: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            pace: Pace::Normal,
            speed: None,
            bubble_count: DEFAULT_BUBBLE_COUNT,
            seed: None,

            sound_enabled: true,
            master_volume: 0.8,
            sfx_volume: 1.0,
            music_volume: 0.7,

            vibration: true,
            reduced_motion: false,
        }
    }
}

impl Settings {
    /// Create settings from a pace preset
    pub fn from_pace(pace: Pace) -> Self {
        let mut settings = Self::default();
        settings.apply_pace(pace);
        settings
    }

    /// Switch preset, discarding any hand-edited tuning
    pub fn apply_pace(&mut self, pace: Pace) {
        self.pace = pace;
        self.speed = None;
    }

    /// Loop tuning in effect
    pub fn tuning(&self) -> SpeedTuning {
        self.speed.unwrap_or_else(|| self.pace.tuning())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.bubble_count == 0 {
            return Err(ConfigError::NoBubbles);
        }
        self.tuning().validate()
    }

    pub fn try_load(path: &Path) -> Result<Self, StorageError> {
        persistence::load_json(path)
    }

    /// Load settings, falling back to defaults when the file is missing,
    /// unreadable or invalid
    pub fn load(path: &Path) -> Self {
        let settings: Self = persistence::load_or_default(path, "settings");
        if let Err(err) = settings.validate() {
            log::warn!("Invalid settings ({}), using defaults", err);
            return Self::default();
        }
        settings
    }

    pub fn save(&self, path: &Path) -> Result<(), StorageError> {
        persistence::save_json(path, self)?;
        log::info!("Settings saved");
        Ok(())
    }
}
