//! Per-frame physics step plus the procedural squash / rebound / wobble pass.

use bevy::prelude::*;

use crate::config::{FIXED_DT, StepTuning};
use crate::params::AnimationParams;
use crate::physics::{PhysicsBackend, restitution_for};
use crate::scene::{SceneManager, TextPiece};

/// Peak wobble added to the vertical scale for a gooeyness in `0..=1`.
pub fn wobble_amplitude(gooeyness: f32, tuning: &StepTuning) -> f32 {
    gooeyness.clamp(0.0, 1.0) * tuning.wobble_gain
}

/// Fastest upward launch from `y` that stays under `ceiling` (both piece centers).
pub fn max_rebound_speed(y: f32, ceiling: f32, gravity: f32) -> f32 {
    let room = (ceiling - y).max(0.0);
    if gravity <= f32::EPSILON {
        return f32::MAX;
    }
    (2.0 * gravity * room).sqrt()
}

/// Frame-invariant inputs shared by every piece.
struct FrameInputs {
    bounce_speed: f32,
    gooeyness: f32,
    floor_level: f32,
    top_boundary: f32,
    gravity: f32,
    clock: f32,
}

/// Drives the scene one fixed step at a time. The clock only advances on
/// animated frames, so pausing and resuming continues from the same state.
#[derive(Resource, Debug, Clone)]
pub struct Animator {
    pub tuning: StepTuning,
    clock: f32,
    frames: u64,
}

impl Default for Animator {
    fn default() -> Self {
        Self::new(StepTuning::default())
    }
}

impl Animator {
    pub fn new(tuning: StepTuning) -> Self {
        Self {
            tuning,
            clock: 0.0,
            frames: 0,
        }
    }

    pub fn clock(&self) -> f32 {
        self.clock
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// One animation frame: fixed physics step first, then per-piece updates.
    /// Does nothing once the scene is not live.
    pub fn frame<B: PhysicsBackend>(&mut self, scene: &mut SceneManager<B>, params: &AnimationParams) {
        let floor_level = scene.floor_level();
        let top_boundary = scene.top_boundary();
        let Some((world, pieces)) = scene.frame_parts() else {
            return;
        };

        world.step(FIXED_DT);
        self.clock += FIXED_DT;
        self.frames += 1;

        let inputs = FrameInputs {
            bounce_speed: params.bounce_speed,
            gooeyness: params.gooeyness,
            floor_level,
            top_boundary,
            gravity: -world.gravity().y,
            clock: self.clock,
        };
        for piece in pieces.iter_mut() {
            self.step_piece(world, piece, &inputs);
        }
    }

    fn step_piece<B: PhysicsBackend>(&self, world: &mut B, piece: &mut TextPiece, inputs: &FrameInputs) {
        let t = &self.tuning;
        let Some(handle) = piece.body else {
            return;
        };
        let (Some(mut position), Some(mut velocity)) = (world.position(handle), world.velocity(handle))
        else {
            return;
        };

        let half_height = piece.half_extents.y;
        let ceiling = inputs.top_boundary - half_height;
        if position.y > ceiling {
            position.y = ceiling;
            velocity.y = velocity.y.min(0.0);
            world.set_position(handle, position);
        }
        piece.renderable.translation = position;

        let bouncing = inputs.bounce_speed > 0.0;
        world.set_sleep_allowed(handle, !bouncing);

        let gap = position.y - half_height - inputs.floor_level;
        if bouncing && t.gravity_nudge > 0.0 && gap > t.nudge_height && velocity.y >= 0.0 {
            velocity.y -= t.gravity_nudge;
        }

        let impact = world
            .impact_speed(handle)
            .filter(|&speed| gap <= t.impact_gap && speed > t.min_impact_speed);
        if let Some(speed) = impact {
            let force = (speed + t.impact_force_offset).max(t.impact_force_floor);
            let flatten = (force * t.flatten_gain).min(t.max_flatten);
            piece.squash = Vec3::new(
                1.0 + flatten * t.spread_ratio,
                (1.0 - flatten).max(t.min_scale_y),
                1.0 + flatten * t.spread_ratio,
            );
            if bouncing {
                let rebound = force * (inputs.bounce_speed + t.rebound_offset);
                velocity.y = rebound.min(max_rebound_speed(position.y, ceiling, inputs.gravity));
            }
        } else {
            piece.squash += (Vec3::ONE - piece.squash) * t.recovery_rate;
        }

        world.set_velocity(handle, velocity);

        let mut scale = piece.squash;
        if inputs.gooeyness > 0.0 && !world.is_sleeping(handle) {
            let wobble = (inputs.clock * t.wobble_frequency).sin()
                * wobble_amplitude(inputs.gooeyness, t);
            scale.y += wobble;
            scale.x -= wobble * 0.5;
        }
        piece.renderable.scale = scale;
    }

    /// Bounce-speed change: new restitution for every body and, when
    /// bouncing, an upward kick that stays under the top boundary.
    pub fn set_bounciness<B: PhysicsBackend>(&self, scene: &mut SceneManager<B>, bounce_speed: f32) {
        let top_boundary = scene.top_boundary();
        let Some((world, pieces)) = scene.frame_parts() else {
            return;
        };
        let gravity = -world.gravity().y;
        let restitution = restitution_for(bounce_speed);
        for piece in pieces.iter() {
            let Some(handle) = piece.body else {
                continue;
            };
            world.set_restitution(handle, restitution);
            world.set_sleep_allowed(handle, bounce_speed <= 0.0);
            if bounce_speed <= 0.0 {
                continue;
            }
            let (Some(position), Some(mut velocity)) = (world.position(handle), world.velocity(handle))
            else {
                continue;
            };
            let ceiling = top_boundary - piece.half_extents.y;
            velocity.y = (bounce_speed * 2.5)
                .max(1.0)
                .min(max_rebound_speed(position.y, ceiling, gravity));
            world.set_velocity(handle, velocity);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::physics::RapierWorld;
    use crate::scene::Viewport;
    use crate::shape::{BlockGlyphs, PieceMode};

    fn scene_with(params: &AnimationParams) -> SceneManager {
        let mut scene = SceneManager::new(RapierWorld::default(), PieceMode::Word);
        scene.initialize(Viewport::default(), params);
        scene.rebuild(&BlockGlyphs, params).unwrap();
        scene
    }

    #[test]
    fn wobble_amplitude_is_monotone_in_gooeyness() {
        let tuning = StepTuning::default();
        let mut last = -1.0;
        for i in 0..=20 {
            let a = wobble_amplitude(i as f32 / 20.0, &tuning);
            assert!(a >= last);
            last = a;
        }
        assert_eq!(wobble_amplitude(0.0, &tuning), 0.0);
    }

    #[test]
    fn max_rebound_reaches_exactly_the_ceiling() {
        let v = max_rebound_speed(0.0, 10.0, 9.8);
        assert!((v * v / (2.0 * 9.8) - 10.0).abs() < 1e-3);
        assert_eq!(max_rebound_speed(12.0, 10.0, 9.8), 0.0);
    }

    #[test]
    fn first_impact_squashes_then_recovers() {
        let params = AnimationParams {
            gooeyness: 0.0,
            ..Default::default()
        };
        let mut scene = scene_with(&params);
        let mut animator = Animator::default();

        let mut impact_frame = None;
        for frame in 0..120 {
            animator.frame(&mut scene, &params);
            if scene.pieces()[0].squash.y < 1.0 {
                impact_frame = Some(frame);
                break;
            }
        }
        assert!(impact_frame.is_some(), "piece never hit the floor");
        assert!(scene.pieces()[0].renderable.scale.x > 1.0);

        for _ in 0..20 {
            animator.frame(&mut scene, &params);
        }
        assert!((scene.pieces()[0].squash.y - 1.0).abs() < 0.01);
    }

    #[test]
    fn missing_body_is_skipped() {
        let params = AnimationParams::default();
        let mut scene = scene_with(&params);
        let handle = scene.pieces()[0].body.unwrap();
        scene.world_mut().remove_body(handle);
        let before = scene.pieces()[0].renderable.clone();

        let mut animator = Animator::default();
        animator.frame(&mut scene, &params);
        assert_eq!(scene.pieces()[0].renderable, before);
        assert_eq!(animator.frames(), 1);
    }

    #[test]
    fn nudge_can_be_disabled() {
        let params = AnimationParams::default();
        let mut with = scene_with(&params);
        let mut without = scene_with(&params);
        let mut a = Animator::default();
        let mut b = Animator::new(StepTuning {
            gravity_nudge: 0.0,
            ..Default::default()
        });
        // kick both upward so the nudge applies
        a.set_bounciness(&mut with, 2.0);
        b.set_bounciness(&mut without, 2.0);
        a.frame(&mut with, &params);
        b.frame(&mut without, &params);

        let h = with.pieces()[0].body.unwrap();
        let vy_with = with.world().velocity(h).unwrap().y;
        let h = without.pieces()[0].body.unwrap();
        let vy_without = without.world().velocity(h).unwrap().y;
        assert!((vy_without - vy_with - 0.1).abs() < 1e-4);
    }

    #[test]
    fn set_bounciness_updates_restitution_and_kicks() {
        let params = AnimationParams::default();
        let mut scene = scene_with(&params);
        let animator = Animator::default();
        animator.set_bounciness(&mut scene, 1.0);
        let h = scene.pieces()[0].body.unwrap();
        assert_eq!(scene.world().velocity(h).unwrap().y, 2.5);
        assert_eq!(scene.world().restitution(h), Some(restitution_for(1.0)));

        animator.set_bounciness(&mut scene, 0.0);
        assert_eq!(scene.world().restitution(h), Some(0.0));
    }

    #[test]
    fn disposed_scene_is_not_stepped() {
        let params = AnimationParams::default();
        let mut scene = scene_with(&params);
        scene.dispose();
        let mut animator = Animator::default();
        animator.frame(&mut scene, &params);
        assert_eq!(animator.frames(), 0);
        assert_eq!(animator.clock(), 0.0);
    }
}
