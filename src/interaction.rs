use bevy::prelude::*;
use bevy::window::PrimaryWindow;
use bevy_egui::EguiContexts;
use tracing::{debug, info};

use crate::params::AnimationParams;
use crate::scene::{SceneManager, TextPiece};
use crate::shape::PieceGeometry;

/// Slab test. Returns the entry distance along `direction`, 0 when the
/// origin is already inside.
pub fn ray_hits_aabb(origin: Vec3, direction: Vec3, min: Vec3, max: Vec3) -> Option<f32> {
    let inv = direction.recip();
    let t1 = (min - origin) * inv;
    let t2 = (max - origin) * inv;
    let t_near = t1.min(t2).max_element().max(0.0);
    let t_far = t1.max(t2).min_element();
    (t_far >= t_near).then_some(t_near)
}

/// Möller–Trumbore, both faces. Distance along `direction`.
pub fn ray_hits_triangle(origin: Vec3, direction: Vec3, [a, b, c]: [Vec3; 3]) -> Option<f32> {
    let ab = b - a;
    let ac = c - a;
    let p = direction.cross(ac);
    let det = ab.dot(p);
    if det.abs() < 1e-8 {
        return None;
    }
    let inv_det = 1.0 / det;
    let to_origin = origin - a;
    let u = to_origin.dot(p) * inv_det;
    if !(0.0..=1.0).contains(&u) {
        return None;
    }
    let q = to_origin.cross(ab);
    let v = direction.dot(q) * inv_det;
    if v < 0.0 || u + v > 1.0 {
        return None;
    }
    let t = ac.dot(q) * inv_det;
    (t >= 0.0).then_some(t)
}

/// Nearest triangle the ray crosses.
pub fn ray_hits_geometry(origin: Vec3, direction: Vec3, geometry: &PieceGeometry) -> Option<f32> {
    let vertex = |i: u32| Vec3::from_array(geometry.positions[i as usize]);
    geometry
        .indices
        .chunks_exact(3)
        .filter_map(|tri| {
            ray_hits_triangle(
                origin,
                direction,
                [vertex(tri[0]), vertex(tri[1]), vertex(tri[2])],
            )
        })
        .min_by(f32::total_cmp)
}

/// Bounds first, then the mesh itself. The ray is moved into the piece's
/// unscaled frame, which keeps distances along it comparable between pieces.
pub fn ray_hits_piece(origin: Vec3, direction: Vec3, piece: &TextPiece) -> Option<f32> {
    let (min, max) = piece.world_bounds();
    ray_hits_aabb(origin, direction, min, max)?;
    let r = &piece.renderable;
    if r.scale.abs().min_element() <= f32::EPSILON {
        return None;
    }
    ray_hits_geometry(
        (origin - r.translation) / r.scale,
        direction / r.scale,
        &r.geometry,
    )
}

/// Index of the nearest piece whose surface the ray crosses.
pub fn pick_piece(origin: Vec3, direction: Vec3, pieces: &[TextPiece]) -> Option<usize> {
    pieces
        .iter()
        .enumerate()
        .filter_map(|(i, piece)| ray_hits_piece(origin, direction, piece).map(|t| (i, t)))
        .min_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(i, _)| i)
}

/// Open `link` in a new browsing context.
#[cfg(target_arch = "wasm32")]
pub fn open_link(link: &str) {
    let Some(window) = web_sys::window() else {
        tracing::warn!("no browser window to open {link}");
        return;
    };
    if let Err(err) = window.open_with_url_and_target(link, "_blank") {
        tracing::warn!("failed to open {link}: {err:?}");
    }
}

/// Native builds have no browsing context; the activation is only logged.
#[cfg(not(target_arch = "wasm32"))]
pub fn open_link(link: &str) {
    info!(link, "link activated");
}

/// Left click on a piece opens the configured link.
pub fn open_link_on_click(
    buttons: Res<ButtonInput<MouseButton>>,
    windows: Query<&Window, With<PrimaryWindow>>,
    cameras: Query<(&Camera, &GlobalTransform), With<Camera3d>>,
    scene: Res<SceneManager>,
    params: Res<AnimationParams>,
    mut contexts: EguiContexts,
) {
    if !buttons.just_pressed(MouseButton::Left) || params.link.is_empty() {
        return;
    }
    if let Ok(ctx) = contexts.ctx_mut() {
        if ctx.wants_pointer_input() || ctx.is_pointer_over_area() {
            return;
        }
    }
    let Ok(window) = windows.single() else {
        return;
    };
    let Some(cursor) = window.cursor_position() else {
        return;
    };
    let Ok((camera, camera_tf)) = cameras.single() else {
        debug!("click ignored: no camera yet");
        return;
    };
    if scene.pieces().is_empty() {
        debug!("click ignored: no text pieces yet");
        return;
    }
    let Ok(ray) = camera.viewport_to_world(camera_tf, cursor) else {
        return;
    };
    if let Some(index) = pick_piece(ray.origin, *ray.direction, scene.pieces()) {
        debug!(piece = %scene.pieces()[index].label, "piece clicked");
        open_link(&params.link);
    }
}
