use bevy::prelude::*;
use bevy_egui::{EguiPlugin, EguiPrimaryContextPass};

use crate::animation::Animator;
use crate::camera::{OrbitControls, orbit_camera};
use crate::config::{GRAVITY, GooeyConfig};
use crate::debug::draw_bounds_gizmo;
use crate::interaction::open_link_on_click;
use crate::panel::{PanelHandle, draw_control_panel, open_control_panel};
use crate::params::ParamsSnapshot;
use crate::physics::RapierWorld;
use crate::scene::SceneManager;
use crate::scene::systems::{
    FontSource, PendingRebuild, PieceAssets, animate_scene, animation_enabled,
    dispatch_param_changes, dispose_on_exit, exit_on_esc_if_native, load_font,
    rebuild_when_font_ready, setup_scene, sync_piece_entities, sync_piece_transforms,
    sync_scene_style, track_viewport_resize,
};
use crate::shape::{GlyphFont, GlyphFontLoader};

/// Plug this into your App with `.add_plugins(GooeyTextPlugin::default())`.
/// The fixed timestep rate is set in main via `Time::<Fixed>`.
#[derive(Default)]
pub struct GooeyTextPlugin {
    pub config: GooeyConfig,
}

impl GooeyTextPlugin {
    pub fn new(config: GooeyConfig) -> Self {
        Self { config }
    }
}

impl Plugin for GooeyTextPlugin {
    fn build(&self, app: &mut App) {
        let config = &self.config;
        let font = config
            .font_path
            .clone()
            .map(FontSource::Path)
            .unwrap_or_default();

        app.init_asset::<GlyphFont>()
            .init_asset_loader::<GlyphFontLoader>();
        if !app.is_plugin_added::<EguiPlugin>() {
            app.add_plugins(EguiPlugin::default());
        }

        app.insert_resource(config.params.clone())
            .insert_resource(ParamsSnapshot(config.params.clone()))
            .insert_resource(SceneManager::new(RapierWorld::new(GRAVITY), config.piece_mode))
            .insert_resource(Animator::new(config.tuning))
            .insert_resource(font)
            .init_resource::<PendingRebuild>()
            .init_resource::<PieceAssets>()
            .init_resource::<PanelHandle>()
            .init_resource::<OrbitControls>()
            .add_systems(
                Startup,
                (setup_scene, load_font, open_control_panel).chain(),
            )
            // squash / rebound at a fixed timestep, paused with the toggle
            .add_systems(FixedUpdate, animate_scene.run_if(animation_enabled))
            .add_systems(
                Update,
                (
                    dispatch_param_changes,
                    rebuild_when_font_ready,
                    sync_piece_entities,
                    sync_piece_transforms,
                    sync_scene_style,
                )
                    .chain(),
            )
            .add_systems(
                Update,
                (
                    track_viewport_resize,
                    orbit_camera,
                    open_link_on_click,
                    draw_bounds_gizmo,
                    exit_on_esc_if_native,
                ),
            )
            .add_systems(Last, dispose_on_exit)
            .add_systems(EguiPrimaryContextPass, draw_control_panel);
    }
}
