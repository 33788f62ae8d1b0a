//! Live-tuning debug panel bound to [`AnimationParams`].
//!
//! The host owns a single [`PanelHandle`]; opening a panel replaces (and tears
//! down) whatever panel it held before.

use bevy::prelude::*;
use bevy_egui::{EguiContexts, egui};
use tracing::info;

use crate::config::{BOUNCE_SPEED_MAX, LIGHT_INTENSITY_MAX};
use crate::error::GooeyError;
use crate::params::{AnimationParams, color_to_rgb_u8, parse_hex_color, rgb_u8_to_hex};
use crate::scene::systems::GooeyRoot;

#[derive(Debug, Clone, PartialEq)]
pub struct ControlPanel {
    owner: Entity,
    title: String,
    /// Draw floor, top boundary and piece bounds.
    pub show_bounds: bool,
}

impl ControlPanel {
    pub fn new(owner: Option<Entity>) -> Result<Self, GooeyError> {
        let owner = owner.ok_or(GooeyError::PanelWithoutOwner)?;
        Ok(Self {
            owner,
            title: "Gooey Text".into(),
            show_bounds: false,
        })
    }

    pub fn owner(&self) -> Entity {
        self.owner
    }

    pub fn title(&self) -> &str {
        &self.title
    }
}

#[derive(Resource, Debug, Default)]
pub struct PanelHandle {
    panel: Option<ControlPanel>,
    opened: u32,
}

impl PanelHandle {
    /// Install `panel`, returning the torn-down previous one.
    pub fn open(&mut self, panel: ControlPanel) -> Option<ControlPanel> {
        let previous = self.close();
        self.opened += 1;
        info!(owner = ?panel.owner, opened = self.opened, "control panel opened");
        self.panel = Some(panel);
        previous
    }

    pub fn close(&mut self) -> Option<ControlPanel> {
        let previous = self.panel.take();
        if let Some(old) = &previous {
            info!(owner = ?old.owner, "control panel torn down");
        }
        previous
    }

    pub fn panel(&self) -> Option<&ControlPanel> {
        self.panel.as_ref()
    }

    pub fn panel_mut(&mut self) -> Option<&mut ControlPanel> {
        self.panel.as_mut()
    }

    /// How many panels have been opened over the handle's lifetime.
    pub fn opened(&self) -> u32 {
        self.opened
    }
}

/// Startup: a panel without a widget to control is a fatal setup error.
pub fn open_control_panel(
    roots: Query<Entity, With<GooeyRoot>>,
    mut handle: ResMut<PanelHandle>,
) -> Result {
    let panel = ControlPanel::new(roots.iter().next())?;
    handle.open(panel);
    Ok(())
}

fn color_row(ui: &mut egui::Ui, label: &str, hex: &mut String) {
    ui.horizontal(|ui| {
        ui.label(label);
        let Ok(color) = parse_hex_color(hex) else {
            ui.label(format!("invalid {hex}"));
            return;
        };
        let mut rgb = color_to_rgb_u8(color);
        if ui.color_edit_button_srgb(&mut rgb).changed() {
            *hex = rgb_u8_to_hex(rgb);
        }
    });
}

pub fn draw_control_panel(
    mut contexts: EguiContexts,
    mut handle: ResMut<PanelHandle>,
    mut params: ResMut<AnimationParams>,
) -> Result {
    let Some(panel) = handle.panel_mut() else {
        return Ok(());
    };
    let ctx = contexts.ctx_mut()?;

    let mut edited = params.clone();
    egui::Window::new(panel.title.clone())
        .default_pos([12.0, 12.0])
        .resizable(false)
        .show(ctx, |ui| {
            ui.checkbox(&mut edited.is_animating, "Animate");
            ui.add(
                egui::Slider::new(&mut edited.bounce_speed, 0.0..=BOUNCE_SPEED_MAX)
                    .step_by(0.1)
                    .text("Bounce Speed"),
            );
            ui.add(
                egui::Slider::new(&mut edited.gooeyness, 0.0..=1.0)
                    .step_by(0.05)
                    .text("Gooeyness"),
            );
            color_row(ui, "Blob Color", &mut edited.blob_color);
            color_row(ui, "Background", &mut edited.background_color);
            ui.horizontal(|ui| {
                ui.label("Text");
                ui.text_edit_singleline(&mut edited.text);
            });
            ui.add(
                egui::Slider::new(&mut edited.light_intensity, 0.0..=LIGHT_INTENSITY_MAX)
                    .step_by(0.1)
                    .text("Light Intensity"),
            );
            ui.separator();
            ui.checkbox(&mut panel.show_bounds, "Show bounds");
        });

    if edited != *params {
        *params = edited;
    }
    Ok(())
}
