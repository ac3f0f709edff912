//! Rapier-backed rigid body world and the narrow interface the walker drives it through.
//!
//! Controllers only ever see [`BodyHandle`] / [`JointHandle`] indices into the
//! arenas owned by [`PhysicsWorld`]; they never hold references into rapier sets.

use nalgebra as na;
use rapier3d::prelude::*;

use crate::config::StriderConfig;
use crate::error::PhysicsError;

mod types;

pub use types::{
    BodyDesc, BodyKind, ColliderDesc, CollisionLayer, LinkShape, MotorSettings, Pose,
    RevoluteDesc, Velocity,
};

/// Index of a rigid body inside the adapter's body arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BodyHandle(pub(crate) RigidBodyHandle);

/// Index of a motorised revolute joint inside the adapter's joint arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct JointHandle(pub(crate) ImpulseJointHandle);

/// Everything the walker needs from a rigid body solver.
///
/// Construction calls may be refused; the caller is responsible for rolling back
/// whatever it created before the refusal.
pub trait PhysicsAdapter {
    fn create_body(&mut self, desc: &BodyDesc) -> Result<BodyHandle, PhysicsError>;

    fn create_collider(&mut self, desc: &ColliderDesc, parent: BodyHandle) -> Result<(), PhysicsError>;

    fn create_revolute_joint(
        &mut self,
        desc: &RevoluteDesc,
        parent_a: BodyHandle,
        parent_b: BodyHandle,
    ) -> Result<JointHandle, PhysicsError>;

    fn set_joint_limits(&mut self, joint: JointHandle, min: f32, max: f32) -> Result<(), PhysicsError>;

    fn configure_motor(&mut self, joint: JointHandle, motor: MotorSettings) -> Result<(), PhysicsError>;

    /// Remove a body together with its colliders and attached joints.
    /// Returns `false` when the body was already gone.
    fn remove_body(&mut self, body: BodyHandle) -> bool;

    /// Advance the simulation by one fixed timestep.
    fn step(&mut self);

    fn body_pose(&self, body: BodyHandle) -> Option<Pose>;

    fn body_velocity(&self, body: BodyHandle) -> Option<Velocity>;

    fn apply_impulse(&mut self, body: BodyHandle, impulse: na::Vector3<f32>) -> Result<(), PhysicsError>;

    fn apply_torque_impulse(&mut self, body: BodyHandle, torque: na::Vector3<f32>) -> Result<(), PhysicsError>;

    /// Teleport a body. Only `reset` uses this.
    fn set_pose(&mut self, body: BodyHandle, pose: &Pose) -> Result<(), PhysicsError>;

    fn set_velocity(&mut self, body: BodyHandle, velocity: &Velocity) -> Result<(), PhysicsError>;

    fn joint_motor(&self, joint: JointHandle) -> Option<MotorSettings>;

    fn joint_limits(&self, joint: JointHandle) -> Option<[f32; 2]>;

    fn body_count(&self) -> usize;

    fn joint_count(&self) -> usize;

    fn contains_body(&self, body: BodyHandle) -> bool {
        self.body_pose(body).is_some()
    }
}

pub struct PhysicsWorld {
    pub rigid_body_set: RigidBodySet,
    pub collider_set: ColliderSet,
    pub impulse_joint_set: ImpulseJointSet,
    pub multibody_joint_set: MultibodyJointSet,
    pub gravity: Vector<f32>,
    pub integration_parameters: IntegrationParameters,
    pub physics_pipeline: PhysicsPipeline,
    pub island_manager: IslandManager,
    pub broad_phase: DefaultBroadPhase,
    pub narrow_phase: NarrowPhase,
    pub ccd_solver: CCDSolver,
    pub query_pipeline: QueryPipeline,
}

impl Default for PhysicsWorld {
    fn default() -> Self {
        Self::new()
    }
}

impl PhysicsWorld {
    pub fn new() -> Self {
        let mut integration_parameters = IntegrationParameters::default();
        integration_parameters.dt = StriderConfig::DT;
        if let Some(iterations) = std::num::NonZeroUsize::new(StriderConfig::SOLVER_ITERATIONS) {
            integration_parameters.num_solver_iterations = iterations;
        }

        Self {
            rigid_body_set: RigidBodySet::new(),
            collider_set: ColliderSet::new(),
            impulse_joint_set: ImpulseJointSet::new(),
            multibody_joint_set: MultibodyJointSet::new(),
            gravity: vector![0.0, StriderConfig::GRAVITY, 0.0],
            integration_parameters,
            physics_pipeline: PhysicsPipeline::new(),
            island_manager: IslandManager::new(),
            broad_phase: DefaultBroadPhase::new(),
            narrow_phase: NarrowPhase::new(),
            ccd_solver: CCDSolver::new(),
            query_pipeline: QueryPipeline::new(),
        }
    }

    pub fn collider_count(&self) -> usize {
        self.collider_set.len()
    }

    fn body_mut(&mut self, body: BodyHandle) -> Result<&mut RigidBody, PhysicsError> {
        self.rigid_body_set
            .get_mut(body.0)
            .ok_or(PhysicsError::UnknownBody(body))
    }

    fn joint_mut(&mut self, joint: JointHandle) -> Result<&mut ImpulseJoint, PhysicsError> {
        self.impulse_joint_set
            .get_mut(joint.0)
            .ok_or(PhysicsError::UnknownJoint(joint))
    }
}

impl PhysicsAdapter for PhysicsWorld {
    fn create_body(&mut self, desc: &BodyDesc) -> Result<BodyHandle, PhysicsError> {
        if !desc.pose.is_finite() {
            return Err(PhysicsError::NonFinite { what: "body pose" });
        }

        let builder = match desc.kind {
            BodyKind::Fixed => RigidBodyBuilder::fixed(),
            BodyKind::Dynamic => RigidBodyBuilder::dynamic(),
        };
        let rb = builder
            .position(desc.pose.to_isometry())
            .linear_damping(desc.linear_damping)
            .angular_damping(desc.angular_damping)
            .can_sleep(desc.can_sleep)
            .build();

        Ok(BodyHandle(self.rigid_body_set.insert(rb)))
    }

    fn create_collider(&mut self, desc: &ColliderDesc, parent: BodyHandle) -> Result<(), PhysicsError> {
        if !self.rigid_body_set.contains(parent.0) {
            return Err(PhysicsError::UnknownBody(parent));
        }
        if !desc.density.is_finite() || desc.density <= 0.0 {
            return Err(PhysicsError::InvalidDensity(desc.density));
        }
        desc.shape.validate()?;

        let builder = match desc.shape {
            LinkShape::Cuboid { half_extents: h } => ColliderBuilder::cuboid(h.x, h.y, h.z),
            LinkShape::Ball { radius } => ColliderBuilder::ball(radius),
        };
        let collider = builder
            .density(desc.density)
            .friction(desc.friction)
            .restitution(desc.restitution)
            .collision_groups(desc.layer.groups())
            .build();
        self.collider_set
            .insert_with_parent(collider, parent.0, &mut self.rigid_body_set);
        Ok(())
    }

    fn create_revolute_joint(
        &mut self,
        desc: &RevoluteDesc,
        parent_a: BodyHandle,
        parent_b: BodyHandle,
    ) -> Result<JointHandle, PhysicsError> {
        for body in [parent_a, parent_b] {
            if !self.rigid_body_set.contains(body.0) {
                return Err(PhysicsError::UnknownBody(body));
            }
        }
        if parent_a == parent_b {
            return Err(PhysicsError::SelfJoint(parent_a));
        }
        if !desc.anchor_a.coords.iter().chain(desc.anchor_b.coords.iter()).all(|c| c.is_finite()) {
            return Err(PhysicsError::NonFinite { what: "joint anchor" });
        }
        let [min, max] = desc.limits;
        if !(min.is_finite() && max.is_finite()) || min > max {
            return Err(PhysicsError::InvalidLimits { min, max });
        }
        let axis_len = desc.axis.norm();
        if !axis_len.is_finite() || axis_len <= f32::EPSILON {
            return Err(PhysicsError::DegenerateAxis);
        }

        let joint = RevoluteJointBuilder::new(UnitVector::new_normalize(desc.axis))
            .local_anchor1(desc.anchor_a)
            .local_anchor2(desc.anchor_b)
            .limits(desc.limits)
            .motor_model(MotorModel::ForceBased)
            .motor_position(desc.motor.target, desc.motor.stiffness, desc.motor.damping)
            .motor_max_force(desc.max_force)
            .build();
        let handle = self
            .impulse_joint_set
            .insert(parent_a.0, parent_b.0, joint, true);
        Ok(JointHandle(handle))
    }

    fn set_joint_limits(&mut self, joint: JointHandle, min: f32, max: f32) -> Result<(), PhysicsError> {
        if !(min.is_finite() && max.is_finite()) || min > max {
            return Err(PhysicsError::InvalidLimits { min, max });
        }
        let joint = self.joint_mut(joint)?;
        joint.data.set_limits(JointAxis::AngX, [min, max]);
        Ok(())
    }

    fn configure_motor(&mut self, joint: JointHandle, motor: MotorSettings) -> Result<(), PhysicsError> {
        if !motor.is_finite() {
            return Err(PhysicsError::NonFinite { what: "motor settings" });
        }
        let joint = self.joint_mut(joint)?;
        joint
            .data
            .set_motor_position(JointAxis::AngX, motor.target, motor.stiffness, motor.damping);
        Ok(())
    }

    fn remove_body(&mut self, body: BodyHandle) -> bool {
        self.rigid_body_set
            .remove(
                body.0,
                &mut self.island_manager,
                &mut self.collider_set,
                &mut self.impulse_joint_set,
                &mut self.multibody_joint_set,
                true,
            )
            .is_some()
    }

    fn step(&mut self) {
        self.physics_pipeline.step(
            &self.gravity,
            &self.integration_parameters,
            &mut self.island_manager,
            &mut self.broad_phase,
            &mut self.narrow_phase,
            &mut self.rigid_body_set,
            &mut self.collider_set,
            &mut self.impulse_joint_set,
            &mut self.multibody_joint_set,
            &mut self.ccd_solver,
            Some(&mut self.query_pipeline),
            &(),
            &(),
        );
    }

    fn body_pose(&self, body: BodyHandle) -> Option<Pose> {
        self.rigid_body_set.get(body.0).map(|rb| Pose {
            position: *rb.translation(),
            orientation: *rb.rotation(),
        })
    }

    fn body_velocity(&self, body: BodyHandle) -> Option<Velocity> {
        self.rigid_body_set.get(body.0).map(|rb| Velocity {
            linear: *rb.linvel(),
            angular: *rb.angvel(),
        })
    }

    fn apply_impulse(&mut self, body: BodyHandle, impulse: na::Vector3<f32>) -> Result<(), PhysicsError> {
        if !impulse.iter().all(|c| c.is_finite()) {
            return Err(PhysicsError::NonFinite { what: "impulse" });
        }
        self.body_mut(body)?.apply_impulse(impulse, true);
        Ok(())
    }

    fn apply_torque_impulse(&mut self, body: BodyHandle, torque: na::Vector3<f32>) -> Result<(), PhysicsError> {
        if !torque.iter().all(|c| c.is_finite()) {
            return Err(PhysicsError::NonFinite { what: "torque impulse" });
        }
        self.body_mut(body)?.apply_torque_impulse(torque, true);
        Ok(())
    }

    fn set_pose(&mut self, body: BodyHandle, pose: &Pose) -> Result<(), PhysicsError> {
        if !pose.is_finite() {
            return Err(PhysicsError::NonFinite { what: "body pose" });
        }
        self.body_mut(body)?.set_position(pose.to_isometry(), true);
        Ok(())
    }

    fn set_velocity(&mut self, body: BodyHandle, velocity: &Velocity) -> Result<(), PhysicsError> {
        let rb = self.body_mut(body)?;
        rb.set_linvel(velocity.linear, true);
        rb.set_angvel(velocity.angular, true);
        Ok(())
    }

    fn joint_motor(&self, joint: JointHandle) -> Option<MotorSettings> {
        let joint = self.impulse_joint_set.get(joint.0)?;
        joint.data.motor(JointAxis::AngX).map(|motor| MotorSettings {
            target: motor.target_pos,
            stiffness: motor.stiffness,
            damping: motor.damping,
        })
    }

    fn joint_limits(&self, joint: JointHandle) -> Option<[f32; 2]> {
        let joint = self.impulse_joint_set.get(joint.0)?;
        joint
            .data
            .limits(JointAxis::AngX)
            .map(|limits| [limits.min, limits.max])
    }

    fn body_count(&self) -> usize {
        self.rigid_body_set.len()
    }

    fn joint_count(&self) -> usize {
        self.impulse_joint_set.len()
    }
}
