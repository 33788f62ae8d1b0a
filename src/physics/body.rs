use rapier3d::na as nalgebra;
use bevy::math::Vec3;
use rapier3d::prelude::{
    Collider, ColliderBuilder, CoefficientCombineRule, Group, InteractionGroups, Real,
    RigidBody, RigidBodyBuilder, Vector, vector,
};

use crate::config::{SLEEP_SPEED_LIMIT, SLEEP_TIME_LIMIT};

/// Collision shape of a body.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum BodyKind {
    Box { half_extents: Vec3 },
    /// Infinite horizontal plane facing +Y through the body's position.
    Plane,
}

/// Everything needed to create a body. Mass 0 makes it fixed.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BodyDesc {
    pub kind: BodyKind,
    pub mass: f32,
    pub position: Vec3,
    pub velocity: Vec3,
    pub restitution: f32,
    pub linear_damping: f32,
    pub angular_damping: f32,
    pub allow_sleep: bool,
}

impl Default for BodyDesc {
    fn default() -> Self {
        Self {
            kind: BodyKind::Box {
                half_extents: Vec3::splat(0.5),
            },
            mass: 1.0,
            position: Vec3::ZERO,
            velocity: Vec3::ZERO,
            restitution: 0.3,
            linear_damping: 0.01,
            angular_damping: 0.01,
            allow_sleep: true,
        }
    }
}

/// Static geometry sits in group 1; pieces in group 2 only touch group 1,
/// so pieces pass through each other.
const STATIC_GROUP: Group = Group::GROUP_1;
const PIECE_GROUP: Group = Group::GROUP_2;

const PIECE_FRICTION: Real = 0.3;

pub(crate) fn to_vector(v: Vec3) -> Vector<Real> {
    vector![v.x, v.y, v.z]
}

pub(crate) fn from_vector(v: &Vector<Real>) -> Vec3 {
    Vec3::new(v.x, v.y, v.z)
}

pub(crate) fn sleep_allowed(body: &RigidBody) -> bool {
    body.activation().normalized_linear_threshold >= 0.0
}

/// Negative thresholds keep rapier from ever putting the body to sleep.
pub(crate) fn set_sleep_thresholds(body: &mut RigidBody, allowed: bool) {
    let threshold = if allowed { SLEEP_SPEED_LIMIT } else { -1.0 };
    let activation = body.activation_mut();
    activation.normalized_linear_threshold = threshold;
    activation.angular_threshold = threshold;
    activation.time_until_sleep = SLEEP_TIME_LIMIT;
}

impl BodyDesc {
    pub fn is_fixed(&self) -> bool {
        self.mass <= 0.0
    }

    /// Rapier body for this descriptor. Pieces never tumble: only the
    /// renderable deforms, the collision box stays upright.
    pub fn rigid_body(&self) -> RigidBody {
        if self.is_fixed() {
            return RigidBodyBuilder::fixed()
                .translation(to_vector(self.position))
                .build();
        }
        let mut body = RigidBodyBuilder::dynamic()
            .translation(to_vector(self.position))
            .linvel(to_vector(self.velocity))
            .linear_damping(self.linear_damping)
            .angular_damping(self.angular_damping)
            .lock_rotations()
            .ccd_enabled(true)
            .build();
        set_sleep_thresholds(&mut body, self.allow_sleep);
        body
    }

    pub fn collider(&self) -> Collider {
        match self.kind {
            BodyKind::Plane => ColliderBuilder::halfspace(Vector::y_axis())
                .restitution(self.restitution)
                .collision_groups(InteractionGroups::new(STATIC_GROUP, Group::ALL))
                .build(),
            BodyKind::Box { half_extents } => {
                let builder =
                    ColliderBuilder::cuboid(half_extents.x, half_extents.y, half_extents.z)
                        .restitution(self.restitution)
                        // the piece alone decides how bouncy a contact is
                        .restitution_combine_rule(CoefficientCombineRule::Max)
                        .friction(PIECE_FRICTION);
                let builder = if self.is_fixed() {
                    builder.collision_groups(InteractionGroups::new(STATIC_GROUP, Group::ALL))
                } else {
                    builder
                        .mass(self.mass)
                        .collision_groups(InteractionGroups::new(PIECE_GROUP, STATIC_GROUP))
                };
                builder.build()
            }
        }
    }
}
