use std::collections::HashMap;

use bevy::math::Vec3;
use rapier3d::prelude::{
    CCDSolver, DefaultBroadPhase, ImpulseJointSet, IntegrationParameters, IslandManager,
    MultibodyJointSet, NarrowPhase, PhysicsPipeline, QueryPipeline, Real, RigidBodyHandle,
    ColliderSet, RigidBodySet, Vector,
};

use super::body::{BodyDesc, from_vector, set_sleep_thresholds, sleep_allowed, to_vector};
use super::{BodyHandle, PhysicsBackend};

impl From<RigidBodyHandle> for BodyHandle {
    fn from(handle: RigidBodyHandle) -> Self {
        let (index, generation) = handle.into_raw_parts();
        Self { index, generation }
    }
}

impl From<BodyHandle> for RigidBodyHandle {
    fn from(handle: BodyHandle) -> Self {
        RigidBodyHandle::from_raw_parts(handle.index, handle.generation)
    }
}

/// Rapier world stepped at whatever `dt` the caller hands in.
pub struct RapierWorld {
    gravity: Vector<Real>,
    params: IntegrationParameters,
    pipeline: PhysicsPipeline,
    islands: IslandManager,
    broad_phase: DefaultBroadPhase,
    narrow_phase: NarrowPhase,
    bodies: RigidBodySet,
    colliders: ColliderSet,
    impulse_joints: ImpulseJointSet,
    multibody_joints: MultibodyJointSet,
    ccd_solver: CCDSolver,
    query_pipeline: QueryPipeline,
    /// Downward speed per body that hit something during the last step.
    impacts: HashMap<RigidBodyHandle, f32>,
}

impl Default for RapierWorld {
    fn default() -> Self {
        Self::new(crate::config::GRAVITY)
    }
}

/// Speculative contacts reach this far, enough for the fastest drop to
/// stop on the floor instead of sinking into it for a step.
const PREDICTION_DISTANCE: Real = 0.5;

impl RapierWorld {
    pub fn new(gravity: Vec3) -> Self {
        Self {
            gravity: to_vector(gravity),
            params: IntegrationParameters {
                normalized_prediction_distance: PREDICTION_DISTANCE,
                ..Default::default()
            },
            pipeline: PhysicsPipeline::new(),
            islands: IslandManager::new(),
            broad_phase: DefaultBroadPhase::new(),
            narrow_phase: NarrowPhase::new(),
            bodies: RigidBodySet::new(),
            colliders: ColliderSet::new(),
            impulse_joints: ImpulseJointSet::new(),
            multibody_joints: MultibodyJointSet::new(),
            ccd_solver: CCDSolver::new(),
            query_pipeline: QueryPipeline::new(),
            impacts: HashMap::new(),
        }
    }

    /// Restitution of the body's first collider.
    pub fn restitution(&self, handle: BodyHandle) -> Option<f32> {
        let body = self.bodies.get(handle.into())?;
        let collider = body.colliders().first()?;
        self.colliders.get(*collider).map(|c| c.restitution())
    }

    pub fn sleep_allowed(&self, handle: BodyHandle) -> Option<bool> {
        self.bodies.get(handle.into()).map(sleep_allowed)
    }

    fn touching(&self, handle: RigidBodyHandle) -> bool {
        self.bodies.get(handle).is_some_and(|body| {
            body.colliders().iter().any(|&c| {
                self.narrow_phase
                    .contact_pairs_with(c)
                    .any(|pair| pair.has_any_active_contact)
            })
        })
    }
}

impl PhysicsBackend for RapierWorld {
    fn step(&mut self, dt: f32) {
        let before: Vec<(RigidBodyHandle, f32)> = self
            .bodies
            .iter()
            .filter(|(_, b)| b.is_dynamic() && !b.is_sleeping())
            .map(|(h, b)| (h, b.linvel().y))
            .collect();

        self.params.dt = dt;
        self.pipeline.step(
            &self.gravity,
            &self.params,
            &mut self.islands,
            &mut self.broad_phase,
            &mut self.narrow_phase,
            &mut self.bodies,
            &mut self.colliders,
            &mut self.impulse_joints,
            &mut self.multibody_joints,
            &mut self.ccd_solver,
            Some(&mut self.query_pipeline),
            &(),
            &(),
        );

        // A contact that slowed a falling body is an impact at its pre-step speed.
        self.impacts.clear();
        for (handle, vy) in before {
            let Some(body) = self.bodies.get(handle) else {
                continue;
            };
            if vy < 0.0 && body.linvel().y > vy && self.touching(handle) {
                self.impacts.insert(handle, -vy);
            }
        }
    }

    fn add_body(&mut self, desc: BodyDesc) -> BodyHandle {
        let handle = self.bodies.insert(desc.rigid_body());
        self.colliders
            .insert_with_parent(desc.collider(), handle, &mut self.bodies);
        handle.into()
    }

    fn remove_body(&mut self, handle: BodyHandle) -> bool {
        let handle = RigidBodyHandle::from(handle);
        self.impacts.remove(&handle);
        self.bodies
            .remove(
                handle,
                &mut self.islands,
                &mut self.colliders,
                &mut self.impulse_joints,
                &mut self.multibody_joints,
                true,
            )
            .is_some()
    }

    fn body_count(&self) -> usize {
        self.bodies.len()
    }

    fn gravity(&self) -> Vec3 {
        from_vector(&self.gravity)
    }

    fn position(&self, handle: BodyHandle) -> Option<Vec3> {
        self.bodies
            .get(handle.into())
            .map(|b| from_vector(b.translation()))
    }

    fn velocity(&self, handle: BodyHandle) -> Option<Vec3> {
        self.bodies.get(handle.into()).map(|b| from_vector(b.linvel()))
    }

    fn set_position(&mut self, handle: BodyHandle, position: Vec3) {
        if let Some(b) = self.bodies.get_mut(handle.into()) {
            b.set_translation(to_vector(position), true);
        }
    }

    fn set_velocity(&mut self, handle: BodyHandle, velocity: Vec3) {
        if let Some(b) = self.bodies.get_mut(handle.into()) {
            let velocity = to_vector(velocity);
            // writing back an unchanged velocity must not keep a sleeper awake
            if *b.linvel() != velocity {
                b.set_linvel(velocity, true);
            }
        }
    }

    fn set_restitution(&mut self, handle: BodyHandle, restitution: f32) {
        let Some(body) = self.bodies.get(handle.into()) else {
            return;
        };
        for &c in body.colliders() {
            if let Some(collider) = self.colliders.get_mut(c) {
                collider.set_restitution(restitution);
            }
        }
    }

    fn set_sleep_allowed(&mut self, handle: BodyHandle, allowed: bool) {
        let Some(b) = self.bodies.get_mut(handle.into()) else {
            return;
        };
        if sleep_allowed(b) == allowed {
            return;
        }
        set_sleep_thresholds(b, allowed);
        if !allowed {
            b.wake_up(true);
        }
    }

    fn is_sleeping(&self, handle: BodyHandle) -> bool {
        self.bodies.get(handle.into()).is_some_and(|b| b.is_sleeping())
    }

    fn impact_speed(&self, handle: BodyHandle) -> Option<f32> {
        self.impacts.get(&RigidBodyHandle::from(handle)).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::physics::floor_body;

    const DT: f32 = 1.0 / 60.0;

    fn boxed(y: f32) -> BodyDesc {
        BodyDesc {
            position: Vec3::new(0.0, y, 0.0),
            ..Default::default()
        }
    }

    fn settle(world: &mut RapierWorld, frames: usize) {
        for _ in 0..frames {
            world.step(DT);
        }
    }

    #[test]
    fn removed_handles_go_stale() {
        let mut world = RapierWorld::default();
        let a = world.add_body(boxed(1.0));
        assert_eq!(world.body_count(), 1);
        assert!(world.remove_body(a));
        assert!(!world.remove_body(a));
        assert_eq!(world.body_count(), 0);
        assert!(world.position(a).is_none());

        let b = world.add_body(boxed(2.0));
        assert_ne!(b, a);
        assert_eq!(world.position(b), Some(Vec3::new(0.0, 2.0, 0.0)));
        assert!(world.position(a).is_none());
    }

    #[test]
    fn boxes_land_on_the_floor_and_report_the_impact() {
        let mut world = RapierWorld::default();
        let floor = world.add_body(floor_body(-5.0));
        let piece = world.add_body(boxed(0.0));

        let mut impacts = Vec::new();
        for _ in 0..240 {
            world.step(DT);
            if let Some(speed) = world.impact_speed(piece) {
                impacts.push(speed);
            }
            let y = world.position(piece).unwrap().y;
            assert!(y >= -5.0 + 0.5 - 0.02, "sank to {y}");
        }
        // ~sqrt(2 g h) for a 4.5 unit drop
        assert!(impacts.iter().any(|&s| s > 8.0), "{impacts:?}");
        assert_eq!(world.position(floor), Some(Vec3::new(0.0, -5.0, 0.0)));
    }

    #[test]
    fn boxes_pass_through_each_other() {
        let mut world = RapierWorld::default();
        world.add_body(floor_body(-5.0));
        let low = world.add_body(boxed(-4.5));
        let high = world.add_body(boxed(-3.0));
        settle(&mut world, 240);
        let a = world.position(low).unwrap().y;
        let b = world.position(high).unwrap().y;
        assert!((a - b).abs() < 0.05, "stacked at {a} / {b}");
    }

    #[test]
    fn resting_body_sleeps_only_when_allowed() {
        let mut world = RapierWorld::default();
        world.add_body(floor_body(0.0));
        let h = world.add_body(BodyDesc {
            restitution: 0.0,
            allow_sleep: false,
            ..boxed(0.5)
        });
        settle(&mut world, 240);
        assert!(!world.is_sleeping(h));

        world.set_sleep_allowed(h, true);
        assert_eq!(world.sleep_allowed(h), Some(true));
        settle(&mut world, 240);
        assert!(world.is_sleeping(h));

        world.set_sleep_allowed(h, false);
        assert!(!world.is_sleeping(h));
    }

    #[test]
    fn setting_a_new_velocity_wakes_a_sleeper() {
        let mut world = RapierWorld::default();
        world.add_body(floor_body(0.0));
        let h = world.add_body(BodyDesc {
            restitution: 0.0,
            ..boxed(0.5)
        });
        settle(&mut world, 240);
        assert!(world.is_sleeping(h));

        let resting = world.velocity(h).unwrap();
        world.set_velocity(h, resting);
        assert!(world.is_sleeping(h));

        world.set_velocity(h, Vec3::new(0.0, 3.0, 0.0));
        assert!(!world.is_sleeping(h));
        world.step(DT);
        assert!(world.position(h).unwrap().y > 0.5);
    }

    #[test]
    fn restitution_updates_every_collider() {
        let mut world = RapierWorld::default();
        let h = world.add_body(boxed(0.0));
        world.set_restitution(h, 0.8);
        assert_eq!(world.restitution(h), Some(0.8));
    }
}
