use bevy::input::mouse::MouseMotion;
use bevy::prelude::*;
use bevy_egui::EguiContexts;

use crate::config::{
    CAMERA_DISTANCE, ORBIT_DAMPING, ORBIT_MAX_PITCH, ORBIT_PITCH_SENSITIVITY,
    ORBIT_YAW_SENSITIVITY,
};

/// Damped orbit around the origin. Drags queue up rotation; every frame a
/// `damping` share of what is queued is applied, so the camera eases in and
/// keeps gliding briefly after the button is released.
#[derive(Resource, Debug, Clone, Copy, PartialEq)]
pub struct OrbitControls {
    pub yaw: f32,
    pub pitch: f32,
    pub distance: f32,
    pub damping: f32,
    /// Queued (yaw, pitch) not yet applied.
    pending: Vec2,
}

impl Default for OrbitControls {
    fn default() -> Self {
        Self::new(CAMERA_DISTANCE)
    }
}

impl OrbitControls {
    pub fn new(distance: f32) -> Self {
        Self {
            yaw: 0.0,
            pitch: 0.0,
            distance,
            damping: ORBIT_DAMPING,
            pending: Vec2::ZERO,
        }
    }

    /// Dragging right swings the camera left around the target; dragging
    /// down raises it.
    pub fn drag(&mut self, pixels: Vec2) {
        self.pending += Vec2::new(
            -pixels.x * ORBIT_YAW_SENSITIVITY,
            -pixels.y * ORBIT_PITCH_SENSITIVITY,
        );
    }

    pub fn is_settled(&self) -> bool {
        self.pending == Vec2::ZERO
    }

    pub fn ease(&mut self) {
        let step = self.pending * self.damping;
        self.yaw += step.x;
        self.pitch = (self.pitch + step.y).clamp(-ORBIT_MAX_PITCH, ORBIT_MAX_PITCH);
        self.pending *= 1.0 - self.damping;
        if self.pending.length_squared() < 1e-12 {
            self.pending = Vec2::ZERO;
        }
    }

    pub fn transform(&self) -> Transform {
        let rotation = Quat::from_euler(EulerRot::YXZ, self.yaw, self.pitch, 0.0);
        Transform::from_translation(rotation * Vec3::Z * self.distance).with_rotation(rotation)
    }
}

/// Left drag outside the control panel orbits the camera.
pub fn orbit_camera(
    mut orbit: ResMut<OrbitControls>,
    buttons: Res<ButtonInput<MouseButton>>,
    mut motion: MessageReader<MouseMotion>,
    mut contexts: EguiContexts,
    mut cameras: Query<&mut Transform, With<Camera3d>>,
) {
    let delta: Vec2 = motion.read().map(|m| m.delta).sum();
    let over_panel = contexts
        .ctx_mut()
        .is_ok_and(|ctx| ctx.wants_pointer_input() || ctx.is_pointer_over_area());
    if buttons.pressed(MouseButton::Left) && !over_panel && delta != Vec2::ZERO {
        orbit.drag(delta);
    }
    if orbit.is_settled() {
        return;
    }
    orbit.ease();
    let target = orbit.transform();
    for mut tf in &mut cameras {
        *tf = target;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resting_camera_sits_on_z_facing_the_origin() {
        let tf = OrbitControls::new(20.0).transform();
        assert!((tf.translation - Vec3::new(0.0, 0.0, 20.0)).length() < 1e-5);
        assert!(tf.forward().dot(Vec3::NEG_Z) > 0.9999);
    }

    #[test]
    fn drag_eases_in_over_frames() {
        let mut orbit = OrbitControls::new(20.0);
        orbit.drag(Vec2::new(100.0, 0.0));
        let total = -100.0 * ORBIT_YAW_SENSITIVITY;

        orbit.ease();
        assert!((orbit.yaw - total * ORBIT_DAMPING).abs() < 1e-6);
        for _ in 0..400 {
            orbit.ease();
        }
        assert!((orbit.yaw - total).abs() < 1e-4);
        assert!(orbit.is_settled());
    }

    #[test]
    fn orbiting_keeps_the_distance_and_the_aim() {
        let mut orbit = OrbitControls::new(20.0);
        orbit.drag(Vec2::new(-300.0, 120.0));
        for _ in 0..30 {
            orbit.ease();
        }
        let tf = orbit.transform();
        assert!((tf.translation.length() - 20.0).abs() < 1e-4);
        assert!(tf.forward().dot(-tf.translation.normalize()) > 0.9999);
        // dragged down, so looking down from above
        assert!(tf.translation.y > 0.0);
    }

    #[test]
    fn pitch_stops_short_of_the_poles() {
        let mut orbit = OrbitControls::new(20.0);
        orbit.drag(Vec2::new(0.0, -10_000.0));
        for _ in 0..400 {
            orbit.ease();
        }
        assert_eq!(orbit.pitch, ORBIT_MAX_PITCH);
    }
}
