//! Scene state: camera rig, lights, floor, simulation world and text pieces.
//!
//! [`SceneManager`] is renderer-agnostic; `systems` mirrors it into Bevy
//! entities and assets.

use bevy::prelude::*;
use tracing::{debug, info, warn};

use crate::config::{CAMERA_DISTANCE, CAMERA_FOV_DEGREES, FLOOR_FRACTION};
use crate::error::GooeyError;
use crate::params::{AnimationParams, parse_hex_color};
use crate::physics::{BodyHandle, PhysicsBackend, RapierWorld, floor_body, text_body};
use crate::shape::{GlyphSource, PieceGeometry, PieceMode, ShapeStyle, build_pieces};

pub mod systems;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SceneState {
    Uninitialized,
    Initialized,
    Rebuilding,
    Idle,
    Disposed,
}

/// Perspective camera on +Z looking at the origin.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Viewport {
    /// Vertical field of view in radians.
    pub fov_y: f32,
    pub camera_distance: f32,
    pub aspect: f32,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            fov_y: CAMERA_FOV_DEGREES.to_radians(),
            camera_distance: CAMERA_DISTANCE,
            aspect: 16.0 / 9.0,
        }
    }
}

impl Viewport {
    pub fn with_aspect(aspect: f32) -> Self {
        Self {
            aspect: if aspect.is_finite() && aspect > 0.0 { aspect } else { 1.0 },
            ..Default::default()
        }
    }

    /// Half of the visible height in the z = 0 plane.
    pub fn half_height(&self) -> f32 {
        self.camera_distance * (self.fov_y * 0.5).tan()
    }

    pub fn top_boundary(&self) -> f32 {
        self.half_height()
    }

    pub fn floor_level(&self) -> f32 {
        -self.half_height() * FLOOR_FRACTION
    }

    pub fn camera_position(&self) -> Vec3 {
        Vec3::new(0.0, 0.0, self.camera_distance)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Renderable {
    pub geometry: PieceGeometry,
    pub translation: Vec3,
    pub scale: Vec3,
    pub color: Srgba,
}

/// One renderable unit of the text and, when physical, its body.
#[derive(Clone, Debug)]
pub struct TextPiece {
    pub label: String,
    pub renderable: Renderable,
    pub body: Option<BodyHandle>,
    pub half_extents: Vec3,
    /// Squash state without the cosmetic wobble.
    pub squash: Vec3,
}

impl TextPiece {
    /// Decorative piece with no body.
    pub fn decorative(label: impl Into<String>, geometry: PieceGeometry, color: Srgba) -> Self {
        let half_extents = geometry.half_extents();
        Self {
            label: label.into(),
            renderable: Renderable {
                geometry,
                translation: Vec3::ZERO,
                scale: Vec3::ONE,
                color,
            },
            body: None,
            half_extents,
            squash: Vec3::ONE,
        }
    }

    /// World-space bounds of the renderable as currently scaled.
    pub fn world_bounds(&self) -> (Vec3, Vec3) {
        let r = &self.renderable;
        let a = r.geometry.min * r.scale + r.translation;
        let b = r.geometry.max * r.scale + r.translation;
        (a.min(b), a.max(b))
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Lighting {
    /// Point light intensity in `0..=LIGHT_INTENSITY_MAX` units.
    pub point_intensity: f32,
}

#[derive(Resource)]
pub struct SceneManager<B: PhysicsBackend = RapierWorld> {
    state: SceneState,
    world: B,
    viewport: Viewport,
    floor_level: f32,
    floor: Option<BodyHandle>,
    pieces: Vec<TextPiece>,
    piece_mode: PieceMode,
    blob_color: Srgba,
    background: Srgba,
    lighting: Lighting,
    generation: u64,
    style_generation: u64,
}

fn color_or(hex: &str, fallback: Srgba) -> Srgba {
    parse_hex_color(hex).unwrap_or_else(|e| {
        warn!("{e}; using fallback color");
        fallback
    })
}

impl<B: PhysicsBackend> SceneManager<B> {
    pub fn new(world: B, piece_mode: PieceMode) -> Self {
        Self {
            state: SceneState::Uninitialized,
            world,
            viewport: Viewport::default(),
            floor_level: 0.0,
            floor: None,
            pieces: Vec::new(),
            piece_mode,
            blob_color: Srgba::WHITE,
            background: Srgba::BLACK,
            lighting: Lighting {
                point_intensity: 0.0,
            },
            generation: 0,
            style_generation: 0,
        }
    }

    /// One-time setup of viewport, floor and lights. Repeated calls are no-ops.
    pub fn initialize(&mut self, viewport: Viewport, params: &AnimationParams) {
        if self.state != SceneState::Uninitialized {
            debug!("scene already initialized ({:?})", self.state);
            return;
        }
        self.viewport = viewport;
        self.floor_level = viewport.floor_level();
        self.floor = Some(self.world.add_body(floor_body(self.floor_level)));
        self.blob_color = color_or(&params.blob_color, Srgba::rgb_u8(0xff, 0x69, 0xb4));
        self.background = color_or(&params.background_color, Srgba::BLACK);
        self.lighting.point_intensity = params.light_intensity;
        self.state = SceneState::Initialized;
        info!(
            floor_level = self.floor_level,
            top = viewport.top_boundary(),
            "scene initialized"
        );
    }

    /// Dispose every piece and build new ones from the current parameters.
    /// Returns the new piece count.
    pub fn rebuild(
        &mut self,
        glyphs: &dyn GlyphSource,
        params: &AnimationParams,
    ) -> Result<usize, GooeyError> {
        match self.state {
            SceneState::Initialized | SceneState::Idle => {}
            other => return Err(GooeyError::SceneNotReady(other)),
        }
        let style = ShapeStyle::for_gooeyness(params.gooeyness);
        let shapes = build_pieces(glyphs, &params.text, &style, self.piece_mode)?;

        self.state = SceneState::Rebuilding;
        self.clear_pieces();
        for shape in shapes {
            let mut piece = TextPiece::decorative(shape.label, shape.geometry, self.blob_color);
            let desc = text_body(
                piece.half_extents,
                shape.offset.x,
                self.floor_level,
                params.bounce_speed,
            );
            piece.renderable.translation = desc.position;
            piece.body = Some(self.world.add_body(desc));
            self.pieces.push(piece);
        }
        self.generation += 1;
        self.state = SceneState::Idle;
        info!(
            pieces = self.pieces.len(),
            generation = self.generation,
            "text pieces rebuilt"
        );
        Ok(self.pieces.len())
    }

    fn clear_pieces(&mut self) {
        for piece in self.pieces.drain(..) {
            if let Some(body) = piece.body {
                self.world.remove_body(body);
            }
        }
    }

    pub fn set_blob_color(&mut self, color: Srgba) {
        self.blob_color = color;
        for piece in &mut self.pieces {
            piece.renderable.color = color;
        }
        self.style_generation += 1;
    }

    pub fn set_background(&mut self, color: Srgba) {
        self.background = color;
        self.style_generation += 1;
    }

    pub fn set_light_intensity(&mut self, intensity: f32) {
        self.lighting.point_intensity = intensity;
        self.style_generation += 1;
    }

    /// Release every piece, body and the floor. Nothing steps afterwards.
    pub fn dispose(&mut self) {
        if self.state == SceneState::Disposed {
            return;
        }
        self.clear_pieces();
        if let Some(floor) = self.floor.take() {
            self.world.remove_body(floor);
        }
        self.state = SceneState::Disposed;
        info!("scene disposed");
    }

    /// World and pieces for one animation frame; `None` unless the scene is live.
    pub fn frame_parts(&mut self) -> Option<(&mut B, &mut [TextPiece])> {
        match self.state {
            SceneState::Initialized | SceneState::Idle => {
                Some((&mut self.world, self.pieces.as_mut_slice()))
            }
            _ => None,
        }
    }

    pub fn state(&self) -> SceneState {
        self.state
    }

    pub fn floor_level(&self) -> f32 {
        self.floor_level
    }

    pub fn top_boundary(&self) -> f32 {
        self.viewport.top_boundary()
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    /// Aspect follows the window; floor level stays as constructed.
    pub fn set_aspect(&mut self, aspect: f32) {
        if aspect.is_finite() && aspect > 0.0 {
            self.viewport.aspect = aspect;
        }
    }

    pub fn pieces(&self) -> &[TextPiece] {
        &self.pieces
    }

    pub fn world(&self) -> &B {
        &self.world
    }

    pub fn world_mut(&mut self) -> &mut B {
        &mut self.world
    }

    pub fn blob_color(&self) -> Srgba {
        self.blob_color
    }

    pub fn background(&self) -> Srgba {
        self.background
    }

    pub fn lighting(&self) -> Lighting {
        self.lighting
    }

    pub fn piece_mode(&self) -> PieceMode {
        self.piece_mode
    }

    /// Bumped by every rebuild.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Bumped by every in-place style change.
    pub fn style_generation(&self) -> u64 {
        self.style_generation
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shape::BlockGlyphs;

    fn live_scene(mode: PieceMode) -> (SceneManager, AnimationParams) {
        let params = AnimationParams::default();
        let mut scene = SceneManager::new(RapierWorld::default(), mode);
        scene.initialize(Viewport::default(), &params);
        (scene, params)
    }

    #[test]
    fn rebuild_before_initialize_is_refused() {
        let mut scene: SceneManager = SceneManager::new(RapierWorld::default(), PieceMode::Word);
        let err = scene
            .rebuild(&BlockGlyphs, &AnimationParams::default())
            .unwrap_err();
        assert!(matches!(
            err,
            GooeyError::SceneNotReady(SceneState::Uninitialized)
        ));
    }

    #[test]
    fn initialize_builds_floor_once() {
        let (mut scene, params) = live_scene(PieceMode::Word);
        assert_eq!(scene.state(), SceneState::Initialized);
        assert_eq!(scene.world().body_count(), 1);
        assert!(scene.floor_level() < 0.0);
        assert!(scene.top_boundary() > 0.0);

        scene.initialize(Viewport::with_aspect(2.0), &params);
        assert_eq!(scene.world().body_count(), 1);
        assert_eq!(scene.viewport().aspect, Viewport::default().aspect);
    }

    #[test]
    fn rebuild_replaces_pieces_and_bodies() {
        let (mut scene, mut params) = live_scene(PieceMode::Glyphs);
        assert_eq!(scene.rebuild(&BlockGlyphs, &params).unwrap(), 5);
        assert_eq!(scene.state(), SceneState::Idle);
        assert_eq!(scene.world().body_count(), 1 + 5);
        let old = scene.pieces()[0].body.unwrap();

        params.text = "Hi".into();
        assert_eq!(scene.rebuild(&BlockGlyphs, &params).unwrap(), 2);
        assert_eq!(scene.world().body_count(), 1 + 2);
        assert_eq!(scene.generation(), 2);
        assert!(scene.world().position(old).is_none());
    }

    #[test]
    fn identical_rebuilds_match() {
        let (mut scene, params) = live_scene(PieceMode::Glyphs);
        scene.rebuild(&BlockGlyphs, &params).unwrap();
        let first: Vec<(f32, Vec3)> = scene
            .pieces()
            .iter()
            .map(|p| (p.renderable.geometry.width(), p.renderable.translation))
            .collect();
        scene.rebuild(&BlockGlyphs, &params).unwrap();
        let second: Vec<(f32, Vec3)> = scene
            .pieces()
            .iter()
            .map(|p| (p.renderable.geometry.width(), p.renderable.translation))
            .collect();
        assert_eq!(first, second);
    }

    #[test]
    fn empty_text_leaves_only_the_floor() {
        let (mut scene, mut params) = live_scene(PieceMode::Word);
        params.text.clear();
        assert_eq!(scene.rebuild(&BlockGlyphs, &params).unwrap(), 0);
        assert_eq!(scene.world().body_count(), 1);
    }

    #[test]
    fn color_change_restyles_in_place() {
        let (mut scene, params) = live_scene(PieceMode::Word);
        scene.rebuild(&BlockGlyphs, &params).unwrap();
        let before = scene.pieces()[0].clone();
        let generation = scene.generation();

        let green = Srgba::rgb(0.0, 1.0, 0.0);
        scene.set_blob_color(green);

        let after = &scene.pieces()[0];
        assert_eq!(after.renderable.color, green);
        assert_eq!(after.renderable.geometry, before.renderable.geometry);
        assert_eq!(after.renderable.translation, before.renderable.translation);
        assert_eq!(after.body, before.body);
        assert_eq!(scene.generation(), generation);
        assert_eq!(scene.style_generation(), 1);
    }

    #[test]
    fn dispose_releases_everything_and_stops_frames() {
        let (mut scene, params) = live_scene(PieceMode::Word);
        scene.rebuild(&BlockGlyphs, &params).unwrap();
        scene.dispose();
        assert_eq!(scene.state(), SceneState::Disposed);
        assert!(scene.pieces().is_empty());
        assert_eq!(scene.world().body_count(), 0);
        assert!(scene.frame_parts().is_none());
        assert!(scene.rebuild(&BlockGlyphs, &params).is_err());
    }

    #[test]
    fn bad_initial_colors_fall_back() {
        let params = AnimationParams {
            blob_color: "nope".into(),
            ..Default::default()
        };
        let mut scene = SceneManager::new(RapierWorld::default(), PieceMode::Word);
        scene.initialize(Viewport::default(), &params);
        assert_eq!(scene.state(), SceneState::Initialized);
        assert_eq!(scene.background(), parse_hex_color("#111").unwrap());
    }

    #[test]
    fn viewport_floor_sits_below_top() {
        let v = Viewport::default();
        assert!((v.half_height() - 20.0 * 25f32.to_radians().tan()).abs() < 1e-4);
        assert!(v.floor_level() < 0.0 && v.floor_level() > -v.half_height());
    }
}
