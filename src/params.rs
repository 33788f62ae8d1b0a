use bevy::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::GooeyError;

/// The host-owned, single mutable source of truth for the widget.
#[derive(Resource, Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AnimationParams {
    pub text: String,
    pub is_animating: bool,
    /// 0..=1
    pub gooeyness: f32,
    /// 0..=5
    pub bounce_speed: f32,
    pub blob_color: String,
    pub background_color: String,
    /// 0..=5
    pub light_intensity: f32,
    /// Opened on click when non-empty.
    pub link: String,
}

impl Default for AnimationParams {
    fn default() -> Self {
        Self {
            text: "Gooey".into(),
            is_animating: true,
            gooeyness: 0.1,
            bounce_speed: 0.1,
            blob_color: "#ff69b4".into(),
            background_color: "#111".into(),
            light_intensity: 2.5,
            link: String::new(),
        }
    }
}

/// Previous-cycle copy of the parameters, diffed against the live ones.
#[derive(Resource, Clone, Debug, Default)]
pub struct ParamsSnapshot(pub AnimationParams);

/// One field that differs between two parameter snapshots.
#[derive(Clone, Debug, PartialEq)]
pub enum ParamChange {
    Text(String),
    Animating(bool),
    Gooeyness(f32),
    BounceSpeed(f32),
    BlobColor(String),
    BackgroundColor(String),
    LightIntensity(f32),
    Link(String),
}

impl ParamChange {
    /// Text and gooeyness reshape the pieces; everything else restyles in place.
    pub fn needs_rebuild(&self) -> bool {
        matches!(self, ParamChange::Text(_) | ParamChange::Gooeyness(_))
    }
}

impl AnimationParams {
    /// Field-by-field diff, in declaration order.
    pub fn diff(&self, previous: &AnimationParams) -> Vec<ParamChange> {
        let mut changes = Vec::new();
        if self.text != previous.text {
            changes.push(ParamChange::Text(self.text.clone()));
        }
        if self.is_animating != previous.is_animating {
            changes.push(ParamChange::Animating(self.is_animating));
        }
        if self.gooeyness != previous.gooeyness {
            changes.push(ParamChange::Gooeyness(self.gooeyness));
        }
        if self.bounce_speed != previous.bounce_speed {
            changes.push(ParamChange::BounceSpeed(self.bounce_speed));
        }
        if self.blob_color != previous.blob_color {
            changes.push(ParamChange::BlobColor(self.blob_color.clone()));
        }
        if self.background_color != previous.background_color {
            changes.push(ParamChange::BackgroundColor(self.background_color.clone()));
        }
        if self.light_intensity != previous.light_intensity {
            changes.push(ParamChange::LightIntensity(self.light_intensity));
        }
        if self.link != previous.link {
            changes.push(ParamChange::Link(self.link.clone()));
        }
        changes
    }
}

/// Parse `#rgb`, `#rrggbb` (and alpha variants) into a color.
pub fn parse_hex_color(hex: &str) -> Result<Srgba, GooeyError> {
    Srgba::hex(hex).map_err(|_| GooeyError::InvalidColor(hex.to_string()))
}

pub fn color_to_rgb_u8(color: Srgba) -> [u8; 3] {
    let channel = |c: f32| (c.clamp(0.0, 1.0) * 255.0).round() as u8;
    [channel(color.red), channel(color.green), channel(color.blue)]
}

pub fn rgb_u8_to_hex(rgb: [u8; 3]) -> String {
    format!("#{:02x}{:02x}{:02x}", rgb[0], rgb[1], rgb[2])
}
