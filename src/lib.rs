//! Gooey bouncing 3D text.
//!
//! A word (or its individual glyphs) is extruded into bevelled meshes that
//! drop onto a floor, squash on impact, rebound and wobble. Everything under
//! [`scene`], [`animation`], [`physics`] and [`shape`] is plain data and can be
//! driven without a window; [`GooeyTextPlugin`] wires it into a Bevy app.

pub mod animation;
pub mod camera;
pub mod config;
pub mod debug;
pub mod error;
pub mod interaction;
pub mod panel;
pub mod params;
pub mod physics;
pub mod plugin;
pub mod scene;
pub mod shape;

pub use animation::Animator;
pub use config::{GooeyConfig, StepTuning};
pub use error::GooeyError;
pub use params::AnimationParams;
pub use plugin::GooeyTextPlugin;
pub use scene::{SceneManager, SceneState};
