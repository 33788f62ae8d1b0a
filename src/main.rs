use bevy::prelude::*;
use bevy::window::WindowPlugin;
use gooey_text::config::PHYSICS_HZ;
use gooey_text::{GooeyConfig, GooeyError, GooeyTextPlugin};

fn main() -> Result<(), GooeyError> {
    // optional first argument: path to a JSON config
    let config = match std::env::args().nth(1) {
        Some(path) => GooeyConfig::load(path)?,
        None => GooeyConfig::default(),
    };

    App::new()
        // Configure the fixed timestep clock (used in FixedUpdate)
        .insert_resource(Time::<Fixed>::from_hz(PHYSICS_HZ))
        .add_plugins(DefaultPlugins.set(WindowPlugin {
            primary_window: Some(Window {
                title: "Gooey Text".into(),
                fit_canvas_to_parent: true,
                ..default()
            }),
            ..default()
        }))
        .add_plugins(GooeyTextPlugin::new(config))
        .run();
    Ok(())
}
