use bevy::prelude::*;

use super::body::{BodyDesc, BodyKind};
use crate::config::{
    ANGULAR_DAMPING, BODY_MASS, BOUNCE_SPEED_MAX, LINEAR_DAMPING, MAX_RESTITUTION,
    SPAWN_CLEARANCE, SPAWN_VELOCITY,
};

/// Restitution for a bounce speed in `0..=BOUNCE_SPEED_MAX`.
pub fn restitution_for(bounce_speed: f32) -> f32 {
    (bounce_speed.clamp(0.0, BOUNCE_SPEED_MAX) * 0.2).clamp(0.0, MAX_RESTITUTION)
}

/// The zero-mass ground plane.
pub fn floor_body(floor_level: f32) -> BodyDesc {
    BodyDesc {
        kind: BodyKind::Plane,
        mass: 0.0,
        position: Vec3::new(0.0, floor_level, 0.0),
        velocity: Vec3::ZERO,
        restitution: 0.0,
        linear_damping: 0.0,
        angular_damping: 0.0,
        allow_sleep: false,
    }
}

/// Body for one text piece: a box around its bounds, dropped from a little
/// above the floor. Depends on nothing but its arguments.
pub fn text_body(half_extents: Vec3, x: f32, floor_level: f32, bounce_speed: f32) -> BodyDesc {
    BodyDesc {
        kind: BodyKind::Box { half_extents },
        mass: BODY_MASS,
        position: Vec3::new(x, floor_level + half_extents.y + SPAWN_CLEARANCE, 0.0),
        velocity: SPAWN_VELOCITY,
        restitution: restitution_for(bounce_speed),
        linear_damping: LINEAR_DAMPING,
        angular_damping: ANGULAR_DAMPING,
        allow_sleep: bounce_speed <= 0.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_body_is_a_pure_function_of_its_inputs() {
        let a = text_body(Vec3::new(4.0, 1.5, 1.0), -2.0, -7.0, 0.7);
        let b = text_body(Vec3::new(4.0, 1.5, 1.0), -2.0, -7.0, 0.7);
        assert_eq!(a, b);
    }

    #[test]
    fn text_body_starts_above_floor_moving_down() {
        let d = text_body(Vec3::new(4.0, 1.5, 1.0), 0.0, -7.0, 0.1);
        assert!(d.position.y - 1.5 > -7.0);
        assert!(d.velocity.y < 0.0);
        assert!(d.mass > 0.0);
        assert!(d.linear_damping > 0.0 && d.angular_damping > 0.0);
        assert!(!d.allow_sleep);
    }

    #[test]
    fn zero_bounce_means_no_restitution_and_sleep() {
        let d = text_body(Vec3::ONE, 0.0, 0.0, 0.0);
        assert_eq!(d.restitution, 0.0);
        assert!(d.allow_sleep);
    }

    #[test]
    fn restitution_is_monotone_and_capped() {
        let mut last = -1.0;
        for i in 0..=50 {
            let r = restitution_for(i as f32 * 0.1);
            assert!(r >= last);
            assert!(r <= MAX_RESTITUTION);
            last = r;
        }
    }

    #[test]
    fn floor_is_static() {
        assert_eq!(floor_body(-3.0).mass, 0.0);
        assert_eq!(floor_body(-3.0).kind, BodyKind::Plane);
    }
}
