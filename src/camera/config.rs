//! Camera tuning
//!
//! Stored as RON. Every field has a default, so a config file only needs
//! the values it overrides (an empty `()` is a valid config).

use std::fs;
use std::path::Path;
use serde::{Serialize, Deserialize};
use thiserror::Error;

use crate::world::SECTOR_SIZE;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Parse error: {0}")]
    Parse(#[from] ron::error::SpannedError),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    /// Distance behind the target with empty hands
    pub follow_offset: f32,
    /// Distance behind the target with weapons drawn
    pub combat_offset: f32,
    pub follow_speed: f32,
    pub combat_speed: f32,
    /// Trigger speeds are scaled by this for static views
    pub static_speed_scale: f32,

    /// Vertical field of view (degrees) and near plane, third person
    pub fov: f32,
    pub near: f32,
    /// Same for first person
    pub first_person_fov: f32,
    pub first_person_near: f32,
    pub far: f32,

    /// Seconds of idle input before the view swings back behind the owner
    pub recenter_delay: f32,
    /// Recentre rate, fraction per second
    pub recenter_rate: f32,
    /// Radians per pointer pixel
    pub pointer_sensitivity: f32,
    /// Radians per second at full stick deflection
    pub stick_rate: f32,
    /// Pitch limit in degrees
    pub max_pitch: f32,
    /// Minimum cosine between the owner's facing and a look-at target
    pub look_at_cone: f32,
    /// Aim at the centre of the owner's bounding box instead of its origin
    pub center_view: bool,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            follow_offset: 1536.0,
            combat_offset: 2560.0,
            follow_speed: 12.0,
            combat_speed: 8.0,
            static_speed_scale: 8.0,
            fov: 65.0,
            near: 32.0,
            first_person_fov: 90.0,
            first_person_near: 8.0,
            far: 45.0 * SECTOR_SIZE,
            recenter_delay: 1.0,
            recenter_rate: 10.0,
            pointer_sensitivity: 0.01,
            stick_rate: 2.0,
            max_pitch: 85.0,
            look_at_cone: 0.5,
            center_view: false,
        }
    }
}

impl CameraConfig {
    pub fn from_ron_str(s: &str) -> Result<Self, ConfigError> {
        Ok(ron::from_str(s)?)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path)?;
        let config = Self::from_ron_str(&contents)?;
        tracing::debug!(path = %path.display(), "camera config loaded");
        Ok(config)
    }
}
