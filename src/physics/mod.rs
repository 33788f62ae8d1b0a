//! Rigid-body simulation behind a small backend trait.
//!
//! The animation pass only talks to [`PhysicsBackend`]; [`RapierWorld`] is the
//! rapier3d-backed implementation shipped with the widget.

use bevy::prelude::*;

pub mod body;
pub mod setup;
pub mod world;

pub use body::{BodyDesc, BodyKind};
pub use setup::{floor_body, restitution_for, text_body};
pub use world::RapierWorld;

/// Opaque reference to a body inside a backend. Stale handles resolve to nothing.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct BodyHandle {
    pub(crate) index: u32,
    pub(crate) generation: u32,
}

/// What the scene and animation layers need from a physics engine.
pub trait PhysicsBackend: Send + Sync + 'static {
    /// Advance the simulation by exactly `dt` seconds.
    fn step(&mut self, dt: f32);

    fn add_body(&mut self, desc: BodyDesc) -> BodyHandle;
    /// Returns false when the handle was already gone.
    fn remove_body(&mut self, handle: BodyHandle) -> bool;
    fn body_count(&self) -> usize;

    fn gravity(&self) -> Vec3;

    fn position(&self, handle: BodyHandle) -> Option<Vec3>;
    fn velocity(&self, handle: BodyHandle) -> Option<Vec3>;
    fn set_position(&mut self, handle: BodyHandle, position: Vec3);
    /// Also wakes a sleeping body.
    fn set_velocity(&mut self, handle: BodyHandle, velocity: Vec3);
    fn set_restitution(&mut self, handle: BodyHandle, restitution: f32);
    /// Disallowing sleep wakes the body.
    fn set_sleep_allowed(&mut self, handle: BodyHandle, allowed: bool);
    fn is_sleeping(&self, handle: BodyHandle) -> bool;

    /// Downward speed at which the body struck a static surface during the
    /// last `step`, if it did.
    fn impact_speed(&self, handle: BodyHandle) -> Option<f32>;
}
