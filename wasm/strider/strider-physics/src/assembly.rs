//! Robot assembly: turns a [`BodyPlanDescriptor`] into bodies and motorised joints.
//!
//! Every leg is a two-link chain hanging from the torso:
//!
//! ```text
//!   torso --hip--> upper link --knee--> lower link
//! ```
//!
//! Both joints rotate about the torso's lateral axis, pointing right (-X), so a
//! positive hip angle swings the foot forward and a negative knee angle folds the
//! foot back and up. A [`RobotModel`] only stores handles; the physics adapter owns
//! the bodies.

use nalgebra as na;

use crate::body_plan::{BodyPlanDescriptor, JointRange, LegSpec, LinkDims, Variant};
use crate::config::StriderConfig;
use crate::error::{AssemblyError, PhysicsError};
use crate::physics::{
    BodyDesc, BodyHandle, ColliderDesc, JointHandle, LinkShape, MotorSettings, PhysicsAdapter,
    Pose, RevoluteDesc, Velocity,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LinkRole {
    Torso,
    UpperLeg(usize),
    LowerLeg(usize),
}

/// A body owned by the model together with what it looks like.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrackedLink {
    pub body: BodyHandle,
    pub role: LinkRole,
    pub shape: LinkShape,
}

/// Handles of one leg chain.
#[derive(Debug, Clone, PartialEq)]
pub struct LegRig {
    pub spec: LegSpec,
    pub upper: BodyHandle,
    pub lower: BodyHandle,
    pub hip: JointHandle,
    pub knee: JointHandle,
}

/// An assembled robot. Not `Clone`: each handle belongs to exactly one model.
#[derive(Debug)]
pub struct RobotModel {
    plan: BodyPlanDescriptor,
    torso: BodyHandle,
    legs: Vec<LegRig>,
    links: Vec<TrackedLink>,
    gait_phase: f32,
    gait_cycles: u64,
    disposed: bool,
}

impl RobotModel {
    pub fn plan(&self) -> &BodyPlanDescriptor {
        &self.plan
    }

    pub fn variant(&self) -> Variant {
        self.plan.variant
    }

    pub fn torso(&self) -> BodyHandle {
        self.torso
    }

    pub fn legs(&self) -> &[LegRig] {
        &self.legs
    }

    pub fn links(&self) -> &[TrackedLink] {
        &self.links
    }

    pub fn joints(&self) -> impl Iterator<Item = JointHandle> + '_ {
        self.legs.iter().flat_map(|leg| [leg.hip, leg.knee])
    }

    /// Oscillator phase in cycles, wrapped into `[0, 1)`.
    pub fn gait_phase(&self) -> f32 {
        self.gait_phase
    }

    /// Whole cycles completed since the last reset.
    pub fn gait_cycles(&self) -> u64 {
        self.gait_cycles
    }

    /// Unwrapped phase (cycles + fraction). Never decreases between resets.
    pub fn elapsed_phase(&self) -> f64 {
        self.gait_cycles as f64 + f64::from(self.gait_phase)
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    pub fn spawn_pose(&self) -> Pose {
        spawn_pose(&self.plan)
    }

    pub(crate) fn advance_phase(&mut self, delta: f32) {
        if !(delta.is_finite() && delta > 0.0) {
            return;
        }
        let next = self.gait_phase + delta;
        let whole = next.floor();
        self.gait_cycles += whole as u64;
        self.gait_phase = next - whole;
    }

    fn reset_phase(&mut self) {
        self.gait_phase = 0.0;
        self.gait_cycles = 0;
    }
}

fn spawn_pose(plan: &BodyPlanDescriptor) -> Pose {
    Pose::at(na::Vector3::new(0.0, plan.spawn_height, 0.0))
}

/// Poses of every leg's upper and lower link hanging straight below its hip,
/// for a torso at `torso`.
fn rest_layout(plan: &BodyPlanDescriptor, torso: &Pose) -> Vec<(Pose, Pose)> {
    let upper_h = plan.upper_leg.half_height();
    let lower_h = plan.lower_leg.half_height();
    plan.legs
        .iter()
        .map(|spec| {
            let hip = spec.attach();
            let upper = hip - na::Vector3::y() * upper_h;
            let lower = hip - na::Vector3::y() * (2.0 * upper_h + lower_h);
            (
                Pose::new(torso.transform_point(&upper), torso.orientation),
                Pose::new(torso.transform_point(&lower), torso.orientation),
            )
        })
        .collect()
}

pub struct RobotAssembly;

impl RobotAssembly {
    /// Build the skeleton for `plan`. On any rejection every body created by this
    /// call is removed again before the error is returned.
    pub fn build<P: PhysicsAdapter + ?Sized>(
        physics: &mut P,
        plan: &BodyPlanDescriptor,
    ) -> Result<RobotModel, AssemblyError> {
        plan.validate()?;

        let mut created = Vec::with_capacity(plan.body_count());
        match Self::build_parts(physics, plan, &mut created) {
            Ok(model) => {
                log::info!(
                    "Built '{}' ({:?}): {} bodies, {} joints",
                    plan.name,
                    plan.variant,
                    model.links.len(),
                    model.legs.len() * 2
                );
                Ok(model)
            }
            Err(err) => {
                for body in created.iter().rev() {
                    physics.remove_body(*body);
                }
                log::warn!(
                    "Build of '{}' failed, rolled back {} bodies: {}",
                    plan.name,
                    created.len(),
                    err
                );
                Err(err)
            }
        }
    }

    /// Remove every body (and with them every joint) of `model`. Idempotent.
    /// Returns how many bodies were actually removed.
    pub fn dispose<P: PhysicsAdapter + ?Sized>(physics: &mut P, model: &mut RobotModel) -> usize {
        if model.disposed {
            return 0;
        }
        let removed = model
            .links
            .iter()
            .filter(|link| physics.remove_body(link.body))
            .count();
        model.disposed = true;
        log::info!("Disposed '{}': removed {} bodies", model.plan.name, removed);
        removed
    }

    /// Put the torso back at the spawn pose, at rest, and zero the gait phase.
    ///
    /// Leg links are carried along rigidly with the torso, so the joint angles they
    /// had are kept and only the motors bring them back to their targets. Every
    /// link ends up at rest.
    pub fn reset<P: PhysicsAdapter + ?Sized>(
        physics: &mut P,
        model: &mut RobotModel,
    ) -> Result<(), PhysicsError> {
        let current = physics
            .body_pose(model.torso)
            .ok_or(PhysicsError::UnknownBody(model.torso))?;
        let spawn = model.spawn_pose();
        let carry = spawn.to_isometry() * current.to_isometry().inverse();
        let rest = rest_layout(&model.plan, &spawn);

        for (leg, (upper_rest, lower_rest)) in model.legs.iter().zip(rest) {
            for (body, rest_pose) in [(leg.upper, upper_rest), (leg.lower, lower_rest)] {
                let carried = physics
                    .body_pose(body)
                    .filter(|pose| current.is_finite() && pose.is_finite())
                    .map(|pose| Pose::from_isometry(&(carry * pose.to_isometry())));
                physics.set_pose(body, &carried.unwrap_or(rest_pose))?;
                physics.set_velocity(body, &Velocity::ZERO)?;
            }
        }
        physics.set_pose(model.torso, &spawn)?;
        physics.set_velocity(model.torso, &Velocity::ZERO)?;
        model.reset_phase();
        log::debug!("Reset '{}' to spawn height {}", model.plan.name, model.plan.spawn_height);
        Ok(())
    }

    fn build_parts<P: PhysicsAdapter + ?Sized>(
        physics: &mut P,
        plan: &BodyPlanDescriptor,
        created: &mut Vec<BodyHandle>,
    ) -> Result<RobotModel, AssemblyError> {
        let spawn = spawn_pose(plan);
        let torso = Self::spawn_link(physics, &spawn, &plan.torso, "torso", created)?;
        let mut links = vec![TrackedLink {
            body: torso,
            role: LinkRole::Torso,
            shape: plan.torso.shape(),
        }];

        let upper_h = plan.upper_leg.half_height();
        let lower_h = plan.lower_leg.half_height();
        let rest = rest_layout(plan, &spawn);
        let idle_knee = MotorSettings::new(
            plan.gait.knee_base_flex,
            plan.gait.base_stiffness,
            plan.gait.base_damping,
        );
        let idle_hip = MotorSettings::new(0.0, plan.gait.base_stiffness, plan.gait.base_damping);

        let mut legs = Vec::with_capacity(plan.legs.len());
        for (i, (spec, (upper_pose, lower_pose))) in plan.legs.iter().zip(rest).enumerate() {
            let hip_anchor = spec.attach();
            let upper = Self::spawn_link(
                physics,
                &upper_pose,
                &plan.upper_leg,
                &format!("{} upper link", spec.name),
                created,
            )?;
            let lower = Self::spawn_link(
                physics,
                &lower_pose,
                &plan.lower_leg,
                &format!("{} lower link", spec.name),
                created,
            )?;

            let hip = Self::motor_joint(
                physics,
                torso,
                upper,
                na::Point3::from(hip_anchor),
                na::Point3::new(0.0, upper_h, 0.0),
                plan.hip_limits,
                idle_hip,
                &format!("{} hip", spec.name),
            )?;
            let knee = Self::motor_joint(
                physics,
                upper,
                lower,
                na::Point3::new(0.0, -upper_h, 0.0),
                na::Point3::new(0.0, lower_h, 0.0),
                plan.knee_limits,
                idle_knee,
                &format!("{} knee", spec.name),
            )?;

            links.push(TrackedLink {
                body: upper,
                role: LinkRole::UpperLeg(i),
                shape: plan.upper_leg.shape(),
            });
            links.push(TrackedLink {
                body: lower,
                role: LinkRole::LowerLeg(i),
                shape: plan.lower_leg.shape(),
            });
            legs.push(LegRig {
                spec: spec.clone(),
                upper,
                lower,
                hip,
                knee,
            });
        }

        Ok(RobotModel {
            plan: plan.clone(),
            torso,
            legs,
            links,
            gait_phase: 0.0,
            gait_cycles: 0,
            disposed: false,
        })
    }

    fn spawn_link<P: PhysicsAdapter + ?Sized>(
        physics: &mut P,
        pose: &Pose,
        dims: &LinkDims,
        part: &str,
        created: &mut Vec<BodyHandle>,
    ) -> Result<BodyHandle, AssemblyError> {
        let body = physics
            .create_body(&BodyDesc::dynamic(*pose))
            .map_err(|e| AssemblyError::physics(part, e))?;
        created.push(body);
        physics
            .create_collider(&ColliderDesc::robot(dims.shape(), dims.density, dims.friction), body)
            .map_err(|e| AssemblyError::physics(part, e))?;
        Ok(body)
    }

    #[allow(clippy::too_many_arguments)]
    fn motor_joint<P: PhysicsAdapter + ?Sized>(
        physics: &mut P,
        parent: BodyHandle,
        child: BodyHandle,
        anchor_parent: na::Point3<f32>,
        anchor_child: na::Point3<f32>,
        limits: JointRange,
        motor: MotorSettings,
        part: &str,
    ) -> Result<JointHandle, AssemblyError> {
        if limits.min > limits.max {
            return Err(AssemblyError::InvalidLimits {
                joint: part.to_string(),
                min: limits.min,
                max: limits.max,
            });
        }
        let desc = RevoluteDesc {
            anchor_a: anchor_parent,
            anchor_b: anchor_child,
            axis: -na::Vector3::x(),
            limits: [limits.min, limits.max],
            motor,
            max_force: StriderConfig::MOTOR_MAX_FORCE,
        };
        physics
            .create_revolute_joint(&desc, parent, child)
            .map_err(|e| AssemblyError::physics(part, e))
    }
}
