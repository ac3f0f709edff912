//! Chase camera that trails the torso along its ground heading.

use nalgebra as na;

use crate::body_plan::CameraProfile;
use crate::controller::LocomotionDriver;
use crate::physics::Pose;

const BLEND_BASE: f32 = 0.04;
const BLEND_PER_SECOND: f32 = 2.4;
pub const MAX_BLEND: f32 = 0.12;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraPose {
    pub position: na::Vector3<f32>,
    pub look_at: na::Vector3<f32>,
}

#[derive(Debug, Clone)]
pub struct ChaseCamera {
    profile: CameraProfile,
    pose: Option<CameraPose>,
}

impl ChaseCamera {
    pub fn new(profile: CameraProfile) -> Self {
        Self { profile, pose: None }
    }

    pub fn profile(&self) -> &CameraProfile {
        &self.profile
    }

    /// Switch profile; the next [`update`](Self::update) eases toward the new offsets.
    pub fn set_profile(&mut self, profile: CameraProfile) {
        self.profile = profile;
    }

    /// Current pose, `None` until the first update or snap.
    pub fn pose(&self) -> Option<CameraPose> {
        self.pose
    }

    /// Behind, beside and above the torso; looking at a point ahead of it.
    pub fn desired_pose(profile: &CameraProfile, torso: &Pose) -> CameraPose {
        let heading = LocomotionDriver::heading(&torso.orientation);
        let up = na::Vector3::y();
        let left = up.cross(&heading);
        CameraPose {
            position: torso.position - heading * profile.distance
                + left * profile.lateral_offset
                + up * profile.height,
            look_at: torso.position + heading * profile.look_ahead,
        }
    }

    /// Smoothing factor for one tick, always within `[0, MAX_BLEND]`.
    pub fn blend_factor(dt: f32) -> f32 {
        let dt = if dt.is_finite() { dt.max(0.0) } else { 0.0 };
        (BLEND_BASE + dt * BLEND_PER_SECOND).clamp(0.0, MAX_BLEND)
    }

    /// Ease the position toward the desired pose. The look target is not smoothed.
    pub fn update(&mut self, torso: &Pose, dt: f32) -> CameraPose {
        let desired = Self::desired_pose(&self.profile, torso);
        let pose = match self.pose {
            Some(current) => CameraPose {
                position: current.position.lerp(&desired.position, Self::blend_factor(dt)),
                look_at: desired.look_at,
            },
            None => desired,
        };
        self.pose = Some(pose);
        pose
    }

    pub fn snap(&mut self, torso: &Pose) -> CameraPose {
        let pose = Self::desired_pose(&self.profile, torso);
        self.pose = Some(pose);
        pose
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::body_plan::BodyPlanDescriptor;
    use approx::assert_relative_eq;

    fn torso_at(x: f32, z: f32, yaw: f32) -> Pose {
        Pose::new(
            na::Vector3::new(x, 0.9, z),
            na::UnitQuaternion::from_axis_angle(&na::Vector3::y_axis(), yaw),
        )
    }

    #[test]
    fn test_blend_factor_bounds() {
        for dt in [0.0, 1e-4, 1.0 / 60.0, 1.0 / 30.0, 0.5, 10.0, -1.0, f32::NAN, f32::INFINITY] {
            let b = ChaseCamera::blend_factor(dt);
            assert!((0.0..=MAX_BLEND).contains(&b), "dt {dt} -> {b}");
        }
        assert_eq!(ChaseCamera::blend_factor(1.0), MAX_BLEND);
        assert!(ChaseCamera::blend_factor(1.0 / 60.0) < MAX_BLEND);
    }

    #[test]
    fn test_desired_pose_trails_heading() {
        let profile = BodyPlanDescriptor::quadruped().camera;
        let pose = ChaseCamera::desired_pose(&profile, &torso_at(0.0, 0.0, 0.0));
        assert_relative_eq!(
            pose.position,
            na::Vector3::new(profile.lateral_offset, 0.9 + profile.height, -profile.distance)
        );
        assert_relative_eq!(pose.look_at, na::Vector3::new(0.0, 0.9, profile.look_ahead));
    }

    #[test]
    fn test_mobile_profile_sits_farther_back() {
        let torso = torso_at(2.0, -1.0, 0.8);
        let near = ChaseCamera::desired_pose(&BodyPlanDescriptor::quadruped().camera, &torso);
        let far = ChaseCamera::desired_pose(&BodyPlanDescriptor::mobile().camera, &torso);
        assert!((far.position - torso.position).norm() > (near.position - torso.position).norm());
    }

    #[test]
    fn test_update_never_overshoots() {
        let mut camera = ChaseCamera::new(BodyPlanDescriptor::humanoid().camera);
        camera.snap(&torso_at(0.0, 0.0, 0.0));

        for (i, dt) in [1.0 / 60.0, 0.25, 1.0 / 144.0, 3.0].into_iter().enumerate() {
            let k = (i + 1) as f32;
            let torso = torso_at(k * 1.5, k, k * 0.6);
            let before = camera.pose().unwrap().position;
            let desired = ChaseCamera::desired_pose(camera.profile(), &torso);
            let after = camera.update(&torso, dt);

            let span = desired.position - before;
            let moved = after.position - before;
            let t = moved.dot(&span) / span.norm_squared();
            assert!((0.0..=MAX_BLEND + 1e-6).contains(&t));
            assert_relative_eq!(moved, span * t, epsilon = 1e-4);
            assert_eq!(after.look_at, desired.look_at);
        }
    }

    #[test]
    fn test_first_update_snaps() {
        let mut camera = ChaseCamera::new(BodyPlanDescriptor::quadruped().camera);
        assert!(camera.pose().is_none());
        let torso = torso_at(3.0, 3.0, 1.0);
        assert_eq!(camera.update(&torso, 1.0 / 60.0), ChaseCamera::desired_pose(camera.profile(), &torso));
    }
}
