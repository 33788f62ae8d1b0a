use bevy::asset::{LoadState, RenderAssetUsages};
use bevy::mesh::{Indices, PrimitiveTopology};
use bevy::prelude::*;
use bevy::window::{PrimaryWindow, WindowResized};
use tracing::{debug, info, warn};

use super::{SceneManager, TextPiece, Viewport};
use crate::animation::Animator;
use crate::config::{
    AMBIENT_BRIGHTNESS, DIRECTIONAL_LUX, FLOOR_EXTENT, POINT_LIGHT_LUMENS_PER_UNIT,
    POINT_LIGHT_RANGE,
};
use crate::params::{AnimationParams, ParamChange, ParamsSnapshot, parse_hex_color};
use crate::shape::{BlockGlyphs, GlyphFont, PieceGeometry};

/// The widget's root entity; everything it spawns hangs below it.
#[derive(Component)]
pub struct GooeyRoot;

#[derive(Component)]
pub struct PieceEntity {
    pub index: usize,
}

#[derive(Component)]
pub struct FloorPlane;

/// Marker for the point light driven by `light_intensity`.
#[derive(Component)]
pub struct ScenePointLight;

/// Where glyph outlines come from.
#[derive(Resource, Debug, Clone, Default)]
pub enum FontSource {
    #[default]
    Blocks,
    /// Asset path not requested yet.
    Path(String),
    Asset {
        handle: Handle<GlyphFont>,
        failure_logged: bool,
    },
}

/// Set when text or gooeyness changed; cleared once a rebuild ran.
#[derive(Resource, Debug, Default)]
pub struct PendingRebuild(pub bool);

/// Render-side mirror of the scene's pieces.
#[derive(Resource, Debug, Default)]
pub struct PieceAssets {
    generation: u64,
    style_generation: u64,
    entries: Vec<(Entity, Handle<Mesh>, Handle<StandardMaterial>)>,
}

impl PieceAssets {
    fn release(
        &mut self,
        commands: &mut Commands,
        meshes: &mut Assets<Mesh>,
        materials: &mut Assets<StandardMaterial>,
    ) {
        for (entity, mesh, material) in self.entries.drain(..) {
            commands.entity(entity).try_despawn();
            meshes.remove(&mesh);
            materials.remove(&material);
        }
    }
}

pub fn piece_mesh(geometry: &PieceGeometry) -> Mesh {
    Mesh::new(PrimitiveTopology::TriangleList, RenderAssetUsages::default())
        .with_inserted_attribute(Mesh::ATTRIBUTE_POSITION, geometry.positions.clone())
        .with_inserted_attribute(Mesh::ATTRIBUTE_NORMAL, geometry.normals.clone())
        .with_inserted_indices(Indices::U32(geometry.indices.clone()))
}

fn piece_material(color: Srgba) -> StandardMaterial {
    StandardMaterial {
        base_color: color.into(),
        metallic: 0.3,
        perceptual_roughness: 0.15,
        reflectance: 0.8,
        clearcoat: 1.0,
        clearcoat_perceptual_roughness: 0.02,
        ..default()
    }
}

fn piece_transform(piece: &TextPiece) -> Transform {
    Transform::from_translation(piece.renderable.translation).with_scale(piece.renderable.scale)
}

/// Startup: viewport, lights, floor and camera, then ask for the first rebuild.
pub fn setup_scene(
    mut commands: Commands,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
    windows: Query<&Window, With<PrimaryWindow>>,
    mut scene: ResMut<SceneManager>,
    params: Res<AnimationParams>,
    mut pending: ResMut<PendingRebuild>,
) {
    let viewport = windows
        .single()
        .map(|w| Viewport::with_aspect(w.width() / w.height()))
        .unwrap_or_default();
    scene.initialize(viewport, &params);
    commands.insert_resource(ClearColor(scene.background().into()));

    let root = commands
        .spawn((GooeyRoot, Name::new("gooey-text"), Transform::default(), Visibility::default()))
        .id();

    commands.spawn((
        Camera3d::default(),
        Projection::from(PerspectiveProjection {
            fov: viewport.fov_y,
            ..default()
        }),
        Transform::from_translation(viewport.camera_position()).looking_at(Vec3::ZERO, Vec3::Y),
        AmbientLight {
            color: Color::srgb_u8(0x40, 0x40, 0x40),
            brightness: AMBIENT_BRIGHTNESS,
            ..default()
        },
        ChildOf(root),
    ));

    // strong shadows under each piece
    commands.spawn((
        DirectionalLight {
            illuminance: DIRECTIONAL_LUX,
            shadows_enabled: true,
            ..default()
        },
        Transform::from_xyz(0.0, 50.0, 10.0).looking_at(Vec3::ZERO, Vec3::Y),
        ChildOf(root),
    ));

    commands.spawn((
        ScenePointLight,
        PointLight {
            intensity: scene.lighting().point_intensity * POINT_LIGHT_LUMENS_PER_UNIT,
            range: POINT_LIGHT_RANGE,
            shadows_enabled: true,
            ..default()
        },
        Transform::from_xyz(0.0, 30.0, 10.0),
        ChildOf(root),
    ));

    commands.spawn((
        FloorPlane,
        Mesh3d(meshes.add(Plane3d::default().mesh().size(FLOOR_EXTENT, FLOOR_EXTENT))),
        MeshMaterial3d(materials.add(StandardMaterial {
            base_color: Color::srgb_u8(0x22, 0x22, 0x22),
            perceptual_roughness: 0.8,
            metallic: 0.1,
            ..default()
        })),
        Transform::from_xyz(0.0, scene.floor_level(), 0.0),
        ChildOf(root),
    ));

    pending.0 = true;
}

/// Startup: kick off the async font load when a font path is configured.
pub fn load_font(mut source: ResMut<FontSource>, asset_server: Res<AssetServer>) {
    if let FontSource::Path(path) = &*source {
        info!(path = %path, "loading font");
        *source = FontSource::Asset {
            handle: asset_server.load(path.clone()),
            failure_logged: false,
        };
    }
}

/// Diff the live parameters against last cycle's and dispatch each change.
pub fn dispatch_param_changes(
    params: Res<AnimationParams>,
    mut snapshot: ResMut<ParamsSnapshot>,
    mut scene: ResMut<SceneManager>,
    animator: Res<Animator>,
    mut pending: ResMut<PendingRebuild>,
) {
    let changes = params.diff(&snapshot.0);
    if changes.is_empty() {
        return;
    }
    for change in changes {
        if change.needs_rebuild() {
            pending.0 = true;
            continue;
        }
        match change {
            ParamChange::Text(_) | ParamChange::Gooeyness(_) => {}
            ParamChange::Animating(on) => info!(on, "animation toggled"),
            ParamChange::BounceSpeed(value) => animator.set_bounciness(&mut scene, value),
            ParamChange::BlobColor(hex) => match parse_hex_color(&hex) {
                Ok(color) => scene.set_blob_color(color),
                Err(e) => warn!("{e}; keeping blob color"),
            },
            ParamChange::BackgroundColor(hex) => match parse_hex_color(&hex) {
                Ok(color) => scene.set_background(color),
                Err(e) => warn!("{e}; keeping background"),
            },
            ParamChange::LightIntensity(value) => scene.set_light_intensity(value),
            ParamChange::Link(link) => debug!(link = %link, "link changed"),
        }
    }
    snapshot.0 = params.clone();
}

/// Rebuild once glyphs are available. A font that never loads leaves the
/// previous pieces in place.
pub fn rebuild_when_font_ready(
    mut pending: ResMut<PendingRebuild>,
    mut source: ResMut<FontSource>,
    fonts: Res<Assets<GlyphFont>>,
    asset_server: Res<AssetServer>,
    mut scene: ResMut<SceneManager>,
    params: Res<AnimationParams>,
) {
    if !pending.0 {
        return;
    }
    let result = match &mut *source {
        FontSource::Blocks => scene.rebuild(&BlockGlyphs, &params),
        FontSource::Path(_) => return,
        FontSource::Asset {
            handle,
            failure_logged,
        } => {
            let Some(font) = fonts.get(handle.id()) else {
                if !*failure_logged {
                    if let Some(LoadState::Failed(err)) = asset_server.get_load_state(handle.id()) {
                        warn!("font failed to load, keeping current text: {err}");
                        *failure_logged = true;
                    }
                }
                return;
            };
            font.glyphs().and_then(|glyphs| scene.rebuild(&glyphs, &params))
        }
    };
    pending.0 = false;
    if let Err(e) = result {
        warn!("rebuild failed: {e}");
    }
}

/// Replace piece entities and their mesh/material assets after a rebuild.
pub fn sync_piece_entities(
    mut commands: Commands,
    scene: Res<SceneManager>,
    mut assets: ResMut<PieceAssets>,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
    roots: Query<Entity, With<GooeyRoot>>,
) {
    if assets.generation == scene.generation() {
        return;
    }
    assets.release(&mut commands, &mut meshes, &mut materials);

    let root = roots.iter().next();
    for (index, piece) in scene.pieces().iter().enumerate() {
        let mesh = meshes.add(piece_mesh(&piece.renderable.geometry));
        let material = materials.add(piece_material(piece.renderable.color));
        let mut entity = commands.spawn((
            PieceEntity { index },
            Name::new(format!("piece {}", piece.label)),
            Mesh3d(mesh.clone()),
            MeshMaterial3d(material.clone()),
            piece_transform(piece),
        ));
        if let Some(root) = root {
            entity.insert(ChildOf(root));
        }
        assets.entries.push((entity.id(), mesh, material));
    }
    assets.generation = scene.generation();
    assets.style_generation = scene.style_generation();
}

pub fn sync_piece_transforms(scene: Res<SceneManager>, mut q: Query<(&PieceEntity, &mut Transform)>) {
    for (piece, mut tf) in &mut q {
        if let Some(p) = scene.pieces().get(piece.index) {
            *tf = piece_transform(p);
        }
    }
}

/// Push in-place style changes (color, background, light) to the renderer.
pub fn sync_scene_style(
    scene: Res<SceneManager>,
    mut assets: ResMut<PieceAssets>,
    mut materials: ResMut<Assets<StandardMaterial>>,
    mut clear: ResMut<ClearColor>,
    mut lights: Query<&mut PointLight, With<ScenePointLight>>,
) {
    if assets.style_generation == scene.style_generation() {
        return;
    }
    for (index, (_, _, handle)) in assets.entries.iter().enumerate() {
        let (Some(piece), Some(mut material)) = (scene.pieces().get(index), materials.get_mut(handle))
        else {
            continue;
        };
        material.base_color = piece.renderable.color.into();
    }
    clear.0 = scene.background().into();
    for mut light in &mut lights {
        light.intensity = scene.lighting().point_intensity * POINT_LIGHT_LUMENS_PER_UNIT;
    }
    assets.style_generation = scene.style_generation();
}

pub fn track_viewport_resize(mut resized: MessageReader<WindowResized>, mut scene: ResMut<SceneManager>) {
    for ev in resized.read() {
        if ev.height > 0.0 {
            scene.set_aspect(ev.width / ev.height);
            debug!(width = ev.width, height = ev.height, "viewport resized");
        }
    }
}

pub fn animation_enabled(params: Res<AnimationParams>) -> bool {
    params.is_animating
}

/// Fixed-step animation; only scheduled while animation is enabled.
pub fn animate_scene(
    mut scene: ResMut<SceneManager>,
    mut animator: ResMut<Animator>,
    params: Res<AnimationParams>,
) {
    animator.frame(&mut scene, &params);
}

/// Release pieces, floor and world when the app is shutting down.
pub fn dispose_on_exit(
    mut exits: MessageReader<AppExit>,
    mut commands: Commands,
    mut scene: ResMut<SceneManager>,
    mut assets: ResMut<PieceAssets>,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
    roots: Query<Entity, With<GooeyRoot>>,
) {
    if exits.read().next().is_none() {
        return;
    }
    scene.dispose();
    assets.release(&mut commands, &mut meshes, &mut materials);
    for root in &roots {
        commands.entity(root).try_despawn();
    }
}

/// Native-only quit: press Esc to exit the app.
/// (No-op on wasm32.)
pub fn exit_on_esc_if_native(keys: Res<ButtonInput<KeyCode>>, mut exit: MessageWriter<AppExit>) {
    if cfg!(not(target_arch = "wasm32")) && keys.just_pressed(KeyCode::Escape) {
        exit.write(AppExit::Success);
    }
}
