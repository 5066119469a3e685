//! Player tunables.
//!
//! Every field has a default matching the shipped behaviour; a JSON document
//! only needs to name the values it overrides.

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid player config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid player config: {field} {reason}")]
    OutOfRange { field: &'static str, reason: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerConfig {
    pub playback: PlaybackConfig,
    pub scale: ScaleConfig,
    pub gesture: GestureConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaybackConfig {
    /// Cadence of status ticks requested from the audio resource.
    pub status_interval_ms: u64,
    pub autoplay: bool,
    /// Skip-back distance used by the mini-player.
    pub skip_back_seconds: f64,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            status_interval_ms: 1000,
            autoplay: true,
            skip_back_seconds: 15.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpringConfig {
    pub mass: f32,
    pub damping: f32,
    pub stiffness: f32,
}

impl Default for SpringConfig {
    fn default() -> Self {
        Self {
            mass: 1.0,
            damping: 28.0,
            stiffness: 300.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScaleConfig {
    /// Background scale while the modal player is fully open.
    pub scale_factor: f32,
    pub spring: SpringConfig,
}

impl Default for ScaleConfig {
    fn default() -> Self {
        Self {
            scale_factor: 0.83,
            spring: SpringConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GestureConfig {
    /// Drag distance over which the background scales from open to rest.
    pub interpolation_distance: f32,
    pub vertical_threshold_ratio: f32,
    pub vertical_threshold_cap: f32,
    pub horizontal_threshold_ratio: f32,
    pub horizontal_threshold_cap: f32,
    pub direction_lock_degrees: f32,
    /// Movement needed before the drag direction is locked.
    pub direction_lock_slop: f32,
    pub horizontal_dismiss: bool,
    pub exit_duration_ms: u32,
}

impl Default for GestureConfig {
    fn default() -> Self {
        Self {
            interpolation_distance: 300.0,
            vertical_threshold_ratio: 0.20,
            vertical_threshold_cap: 150.0,
            horizontal_threshold_ratio: 0.51,
            horizontal_threshold_cap: 80.0,
            direction_lock_degrees: 45.0,
            direction_lock_slop: 10.0,
            horizontal_dismiss: false,
            exit_duration_ms: 250,
        }
    }
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            playback: PlaybackConfig::default(),
            scale: ScaleConfig::default(),
            gesture: GestureConfig::default(),
        }
    }
}

impl PlayerConfig {
    pub fn from_json(document: &str) -> Result<Self, ConfigError> {
        let config: PlayerConfig = serde_json::from_str(document)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let scale_factor = self.scale.scale_factor;
        if !(scale_factor > 0.0 && scale_factor < 1.0) {
            return Err(ConfigError::OutOfRange {
                field: "scale.scale_factor",
                reason: format!("must be within (0, 1), got {scale_factor}"),
            });
        }
        let spring = self.scale.spring;
        if spring.mass <= 0.0 || spring.stiffness <= 0.0 || spring.damping < 0.0 {
            return Err(ConfigError::OutOfRange {
                field: "scale.spring",
                reason: "mass and stiffness must be positive, damping non-negative".to_string(),
            });
        }
        if self.playback.status_interval_ms == 0 {
            return Err(ConfigError::OutOfRange {
                field: "playback.status_interval_ms",
                reason: "must be greater than zero".to_string(),
            });
        }
        if self.gesture.interpolation_distance <= 0.0 {
            return Err(ConfigError::OutOfRange {
                field: "gesture.interpolation_distance",
                reason: "must be greater than zero".to_string(),
            });
        }
        Ok(())
    }
}
