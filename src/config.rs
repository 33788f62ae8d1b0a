use std::path::Path;

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::GooeyError;
use crate::params::AnimationParams;
use crate::shape::PieceMode;

/// Physics timing
pub const PHYSICS_HZ: f64 = 60.0;
pub const FIXED_DT: f32 = 1.0 / PHYSICS_HZ as f32;

/// Gravity (world units per second squared; +Y up)
pub const GRAVITY: Vec3 = Vec3::new(0.0, -9.8, 0.0);

/// Camera rig: perspective camera on +Z looking at the origin.
pub const CAMERA_FOV_DEGREES: f32 = 50.0;
pub const CAMERA_DISTANCE: f32 = 20.0;

/// Orbit controls: radians per dragged pixel, and the share of the pending
/// rotation applied each frame.
pub const ORBIT_YAW_SENSITIVITY: f32 = 0.0035;
pub const ORBIT_PITCH_SENSITIVITY: f32 = 0.0030;
pub const ORBIT_DAMPING: f32 = 0.05;
pub const ORBIT_MAX_PITCH: f32 = 1.55;

/// Floor sits this fraction of the visible half-height below the origin.
pub const FLOOR_FRACTION: f32 = 0.75;
pub const FLOOR_EXTENT: f32 = 100.0;

/// Text geometry (world units, before gooeyness scaling)
pub const TEXT_SIZE: f32 = 3.0;
pub const TEXT_DEPTH: f32 = 2.0;
pub const BEVEL_THICKNESS: f32 = 0.5;
pub const BEVEL_SIZE: f32 = 0.3;
pub const BEVEL_SEGMENTS: usize = 10;
pub const CURVE_SEGMENTS: usize = 24;

/// Text body defaults
pub const BODY_MASS: f32 = 1.0;
pub const SPAWN_CLEARANCE: f32 = 3.5;
pub const SPAWN_VELOCITY: Vec3 = Vec3::new(0.0, -5.0, 0.0);
pub const LINEAR_DAMPING: f32 = 0.3;
pub const ANGULAR_DAMPING: f32 = 0.3;
pub const MAX_RESTITUTION: f32 = 0.95;

/// Sleep thresholds for dynamic bodies
pub const SLEEP_SPEED_LIMIT: f32 = 0.1;
pub const SLEEP_TIME_LIMIT: f32 = 1.0;

/// Parameter ranges exposed to the host and the control panel
pub const BOUNCE_SPEED_MAX: f32 = 5.0;
pub const LIGHT_INTENSITY_MAX: f32 = 5.0;

/// Light scale: one unit of `light_intensity` in lumens for the point light
pub const POINT_LIGHT_LUMENS_PER_UNIT: f32 = 400_000.0;
pub const POINT_LIGHT_RANGE: f32 = 120.0;
pub const DIRECTIONAL_LUX: f32 = 6_000.0;
pub const AMBIENT_BRIGHTNESS: f32 = 250.0;

/// Constants of the per-frame squash / bounce / wobble pass.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StepTuning {
    /// Extra downward velocity per frame while floating; 0 disables it.
    pub gravity_nudge: f32,
    /// Gap above the floor beyond which the nudge applies.
    pub nudge_height: f32,
    /// Gap to the floor that still counts as touching it.
    pub impact_gap: f32,
    pub min_impact_speed: f32,
    pub impact_force_floor: f32,
    pub impact_force_offset: f32,
    pub flatten_gain: f32,
    pub max_flatten: f32,
    pub min_scale_y: f32,
    /// Horizontal/depth growth per unit of flatten.
    pub spread_ratio: f32,
    pub rebound_offset: f32,
    /// Fraction of the remaining distance to unit scale recovered per frame.
    pub recovery_rate: f32,
    /// Radians per second of animation clock.
    pub wobble_frequency: f32,
    pub wobble_gain: f32,
}

impl Default for StepTuning {
    fn default() -> Self {
        Self {
            gravity_nudge: 0.1,
            nudge_height: 1.0,
            impact_gap: 0.05,
            min_impact_speed: 0.5,
            impact_force_floor: 0.3,
            impact_force_offset: 0.8,
            flatten_gain: 0.15,
            max_flatten: 0.5,
            min_scale_y: 0.3,
            spread_ratio: 0.4,
            rebound_offset: 0.8,
            recovery_rate: 0.3,
            wobble_frequency: 5.0,
            wobble_gain: 0.3,
        }
    }
}

/// Everything a host can configure before the widget starts.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GooeyConfig {
    pub params: AnimationParams,
    /// Asset path of a `.ttf`/`.otf` file; `None` uses the built-in block glyphs.
    pub font_path: Option<String>,
    pub piece_mode: PieceMode,
    pub tuning: StepTuning,
}

impl GooeyConfig {
    pub fn from_json(text: &str) -> Result<Self, GooeyError> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, GooeyError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| GooeyError::ConfigRead {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&text)
    }
}
