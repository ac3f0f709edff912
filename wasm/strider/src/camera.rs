//! Camera systems for the walker.
//!
//! The core crate owns the chase smoothing; this side only applies the pose and a
//! user zoom factor.

use bevy::prelude::*;

use crate::web_bevy::StriderState;

/// Main camera marker.
#[derive(Component)]
pub struct MainCamera;

/// Scroll zoom applied on top of the chase offsets.
#[derive(Resource)]
pub struct CameraZoom {
    pub factor: f32,
}

impl Default for CameraZoom {
    fn default() -> Self {
        Self { factor: 1.0 }
    }
}

/// Minimum height above ground (Y=0 is the top of the ground slab)
const MIN_CAMERA_HEIGHT: f32 = 1.0;

/// Scroll to zoom
pub fn zoom_input(mut zoom: ResMut<CameraZoom>, mut mouse_wheel: EventReader<bevy::input::mouse::MouseWheel>) {
    for ev in mouse_wheel.read() {
        let zoom_sensitivity = 0.05;
        zoom.factor = (zoom.factor - ev.y * zoom_sensitivity).clamp(0.4, 3.0);
    }
}

/// Zoom scales the offset from the look target, then the height floor applies.
pub fn framed_position(position: Vec3, look_at: Vec3, zoom: f32) -> Vec3 {
    let mut pos = look_at + (position - look_at) * zoom;
    if pos.y < MIN_CAMERA_HEIGHT {
        pos.y = MIN_CAMERA_HEIGHT;
    }
    pos
}

/// Place the camera at the chase pose from the last tick
pub fn apply_chase_camera(
    state: Res<StriderState>,
    zoom: Res<CameraZoom>,
    mut camera_query: Query<&mut Transform, With<MainCamera>>,
) {
    let Some(pose) = state.sim.camera().pose() else {
        return;
    };
    let look_at = Vec3::new(pose.look_at.x, pose.look_at.y, pose.look_at.z);
    let position = Vec3::new(pose.position.x, pose.position.y, pose.position.z);
    let pos = framed_position(position, look_at, zoom.factor);

    if let Ok(mut camera_transform) = camera_query.get_single_mut() {
        *camera_transform = Transform::from_translation(pos).looking_at(look_at, Vec3::Y);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zoom_scales_offset_from_target() {
        let pos = framed_position(Vec3::new(0.0, 3.0, -4.0), Vec3::new(0.0, 1.0, 0.0), 2.0);
        assert_eq!(pos, Vec3::new(0.0, 5.0, -8.0));
    }

    #[test]
    fn test_camera_never_below_floor() {
        let pos = framed_position(Vec3::new(0.0, 1.2, -4.0), Vec3::new(0.0, 1.5, 0.0), 3.0);
        assert_eq!(pos.y, MIN_CAMERA_HEIGHT);
    }
}
