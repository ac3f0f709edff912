//! Scene setup: camera and lights. Bodies are spawned by the render sync.

use bevy::prelude::*;

use crate::camera::MainCamera;

pub fn setup_scene(mut commands: Commands) {
    use bevy::core_pipeline::tonemapping::Tonemapping;

    // TonyMcMapFace (default) requires tonemapping_luts, unavailable in WebGL2
    commands.spawn((
        Camera3d::default(),
        Transform::from_xyz(0.0, 3.0, -5.0).looking_at(Vec3::new(0.0, 1.0, 0.0), Vec3::Y),
        Tonemapping::None,
        bevy::render::view::Msaa::Off,
        MainCamera,
    ));

    // Materials are forced unlit by fix_materials, ambient carries the scene
    commands.insert_resource(AmbientLight {
        color: Color::WHITE,
        brightness: 2000.0,
    });
}
