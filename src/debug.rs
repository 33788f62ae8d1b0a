use bevy::prelude::*;

use crate::panel::PanelHandle;
use crate::scene::SceneManager;

const LINE_HALF_WIDTH: f32 = 30.0;

/// Floor line, top boundary and each piece's current bounds, toggled from
/// the control panel.
pub fn draw_bounds_gizmo(mut gizmos: Gizmos, panel: Res<PanelHandle>, scene: Res<SceneManager>) {
    if !panel.panel().is_some_and(|p| p.show_bounds) {
        return;
    }
    let floor = scene.floor_level();
    let top = scene.top_boundary();
    gizmos.line(
        Vec3::new(-LINE_HALF_WIDTH, floor, 0.0),
        Vec3::new(LINE_HALF_WIDTH, floor, 0.0),
        Color::srgba(0.2, 1.0, 0.2, 0.8),
    );
    gizmos.line(
        Vec3::new(-LINE_HALF_WIDTH, top, 0.0),
        Vec3::new(LINE_HALF_WIDTH, top, 0.0),
        Color::srgba(1.0, 0.2, 0.2, 0.8),
    );

    for piece in scene.pieces() {
        let (min, max) = piece.world_bounds();
        // front face only; depth reads poorly from a head-on camera
        let z = max.z;
        let corners = [
            Vec3::new(min.x, min.y, z),
            Vec3::new(max.x, min.y, z),
            Vec3::new(max.x, max.y, z),
            Vec3::new(min.x, max.y, z),
        ];
        for i in 0..corners.len() {
            gizmos.line(corners[i], corners[(i + 1) % corners.len()], Color::WHITE);
        }
    }
}
