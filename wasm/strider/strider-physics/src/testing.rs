//! Recording adapter used by unit tests: wraps a real world, logs every command
//! and can be told to refuse construction after a number of successful calls.

use nalgebra as na;

use crate::error::PhysicsError;
use crate::physics::{
    BodyDesc, BodyHandle, ColliderDesc, JointHandle, MotorSettings, PhysicsAdapter, PhysicsWorld,
    Pose, RevoluteDesc, Velocity,
};

#[derive(Default)]
pub(crate) struct Recorder {
    pub inner: PhysicsWorld,
    pub fail_body_after: Option<usize>,
    pub fail_joint_after: Option<usize>,
    /// Refuse new joints while this many are alive.
    pub max_live_joints: Option<usize>,
    /// Refuse every teleport.
    pub fail_set_pose: bool,
    pub bodies_created: usize,
    pub joints_created: usize,
    pub impulses: Vec<(BodyHandle, na::Vector3<f32>)>,
    pub torques: Vec<(BodyHandle, na::Vector3<f32>)>,
    pub motors: Vec<(JointHandle, MotorSettings)>,
    pub steps: usize,
}

impl Recorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear_log(&mut self) {
        self.impulses.clear();
        self.torques.clear();
        self.motors.clear();
    }

    pub fn last_motor(&self, joint: JointHandle) -> Option<MotorSettings> {
        self.motors
            .iter()
            .rev()
            .find(|(j, _)| *j == joint)
            .map(|(_, m)| *m)
    }
}

impl PhysicsAdapter for Recorder {
    fn create_body(&mut self, desc: &BodyDesc) -> Result<BodyHandle, PhysicsError> {
        if matches!(self.fail_body_after, Some(n) if self.bodies_created >= n) {
            return Err(PhysicsError::Rejected {
                reason: format!("body budget of {} exhausted", self.bodies_created),
            });
        }
        let body = self.inner.create_body(desc)?;
        self.bodies_created += 1;
        Ok(body)
    }

    fn create_collider(&mut self, desc: &ColliderDesc, parent: BodyHandle) -> Result<(), PhysicsError> {
        self.inner.create_collider(desc, parent)
    }

    fn create_revolute_joint(
        &mut self,
        desc: &RevoluteDesc,
        parent_a: BodyHandle,
        parent_b: BodyHandle,
    ) -> Result<JointHandle, PhysicsError> {
        let exhausted = matches!(self.fail_joint_after, Some(n) if self.joints_created >= n)
            || matches!(self.max_live_joints, Some(n) if self.inner.joint_count() >= n);
        if exhausted {
            return Err(PhysicsError::Rejected {
                reason: format!("joint budget of {} exhausted", self.joints_created),
            });
        }
        let joint = self.inner.create_revolute_joint(desc, parent_a, parent_b)?;
        self.joints_created += 1;
        Ok(joint)
    }

    fn set_joint_limits(&mut self, joint: JointHandle, min: f32, max: f32) -> Result<(), PhysicsError> {
        self.inner.set_joint_limits(joint, min, max)
    }

    fn configure_motor(&mut self, joint: JointHandle, motor: MotorSettings) -> Result<(), PhysicsError> {
        self.inner.configure_motor(joint, motor)?;
        self.motors.push((joint, motor));
        Ok(())
    }

    fn remove_body(&mut self, body: BodyHandle) -> bool {
        self.inner.remove_body(body)
    }

    fn step(&mut self) {
        self.steps += 1;
        self.inner.step();
    }

    fn body_pose(&self, body: BodyHandle) -> Option<Pose> {
        self.inner.body_pose(body)
    }

    fn body_velocity(&self, body: BodyHandle) -> Option<Velocity> {
        self.inner.body_velocity(body)
    }

    fn apply_impulse(&mut self, body: BodyHandle, impulse: na::Vector3<f32>) -> Result<(), PhysicsError> {
        self.inner.apply_impulse(body, impulse)?;
        self.impulses.push((body, impulse));
        Ok(())
    }

    fn apply_torque_impulse(&mut self, body: BodyHandle, torque: na::Vector3<f32>) -> Result<(), PhysicsError> {
        self.inner.apply_torque_impulse(body, torque)?;
        self.torques.push((body, torque));
        Ok(())
    }

    fn set_pose(&mut self, body: BodyHandle, pose: &Pose) -> Result<(), PhysicsError> {
        if self.fail_set_pose {
            return Err(PhysicsError::Rejected {
                reason: "teleport refused".to_string(),
            });
        }
        self.inner.set_pose(body, pose)
    }

    fn set_velocity(&mut self, body: BodyHandle, velocity: &Velocity) -> Result<(), PhysicsError> {
        self.inner.set_velocity(body, velocity)
    }

    fn joint_motor(&self, joint: JointHandle) -> Option<MotorSettings> {
        self.inner.joint_motor(joint)
    }

    fn joint_limits(&self, joint: JointHandle) -> Option<[f32; 2]> {
        self.inner.joint_limits(joint)
    }

    fn body_count(&self) -> usize {
        self.inner.body_count()
    }

    fn joint_count(&self) -> usize {
        self.inner.joint_count()
    }
}
