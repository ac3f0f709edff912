use nalgebra as na;

use crate::assembly::RobotModel;
use crate::body_plan::{BodyPlanDescriptor, Variant};
use crate::config::StriderConfig;
use crate::error::PhysicsError;
use crate::intent::IntentVector;
use crate::physics::PhysicsAdapter;

const DEGENERATE_HEADING: f32 = 1e-4;

/// Torso tilt in radians. Positive pitch is nose down, positive roll lifts the left side.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Tilt {
    pub pitch: f32,
    pub roll: f32,
}

/// What the drive reads from the torso each tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TorsoState {
    pub orientation: na::UnitQuaternion<f32>,
    pub angular_velocity: na::Vector3<f32>,
}

impl TorsoState {
    pub fn at_rest(orientation: na::UnitQuaternion<f32>) -> Self {
        Self {
            orientation,
            angular_velocity: na::Vector3::zeros(),
        }
    }
}

/// Impulses for one tick, in world space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DriveCommand {
    pub heading: na::Vector3<f32>,
    pub forward_impulse: na::Vector3<f32>,
    pub yaw_torque: na::Vector3<f32>,
    pub jump_impulse: Option<na::Vector3<f32>>,
    pub upright_torque: Option<na::Vector3<f32>>,
}

impl DriveCommand {
    pub fn is_idle(&self) -> bool {
        self.forward_impulse == na::Vector3::zeros()
            && self.yaw_torque == na::Vector3::zeros()
            && self.jump_impulse.is_none()
    }
}

/// Heading, turning, jumping and uprighting applied to the torso as a whole.
pub struct LocomotionDriver;

impl LocomotionDriver {
    /// Torso forward axis projected onto the ground plane, unit length.
    pub fn heading(orientation: &na::UnitQuaternion<f32>) -> na::Vector3<f32> {
        let forward = orientation * na::Vector3::z();
        if let Some(heading) = flatten(&forward) {
            return heading;
        }
        // Nose straight up or down: the torso's up axis points backward or forward.
        let up = orientation * na::Vector3::y();
        flatten(&(up * -forward.y.signum())).unwrap_or_else(na::Vector3::z)
    }

    pub fn tilt(orientation: &na::UnitQuaternion<f32>) -> Tilt {
        let forward = orientation * na::Vector3::z();
        let lateral = orientation * na::Vector3::x();
        Tilt {
            pitch: (-forward.y).atan2(forward.xz().norm()),
            roll: lateral.y.atan2(lateral.xz().norm()),
        }
    }

    pub fn plan(body: &BodyPlanDescriptor, torso: &TorsoState, intent: &IntentVector, dt: f32) -> DriveCommand {
        let drive = &body.drive;
        let turbo = if intent.turbo { body.gait.turbo_multiplier } else { 1.0 };
        let heading = Self::heading(&torso.orientation);

        let forward_impulse = heading * (drive.forward_impulse_gain * intent.forward * turbo * dt);
        let turn_gain = drive.base_turn_gain + intent.forward.abs() * drive.turn_boost;
        let yaw_torque = na::Vector3::y() * (intent.turn * turn_gain * turbo * dt);
        let jump_impulse = intent
            .jump
            .then(|| na::Vector3::y() * drive.jump_impulse);

        DriveCommand {
            heading,
            forward_impulse,
            yaw_torque,
            jump_impulse,
            upright_torque: Self::upright_torque(body, torso),
        }
    }

    /// Per-tick torque impulse pulling a biped torso back to level. Each tick removes
    /// `gain` rad/s of pitch and roll rate per radian of tilt plus `damping` of the
    /// current tilt rate, applied through the whole robot's balance inertia.
    pub fn upright_torque(body: &BodyPlanDescriptor, torso: &TorsoState) -> Option<na::Vector3<f32>> {
        if body.variant != Variant::Humanoid {
            return None;
        }
        let gain = body.drive.upright_gain?;
        let damping = body.drive.upright_damping;
        let tilt = Self::tilt(&torso.orientation);
        let lateral = torso.orientation * na::Vector3::x();
        let forward = torso.orientation * na::Vector3::z();
        let pitch_rate = torso.angular_velocity.dot(&lateral);
        let roll_rate = torso.angular_velocity.dot(&forward);

        let inertia = body.balance_inertia();
        let pitch = -(gain * tilt.pitch + damping * pitch_rate);
        let roll = -(gain * tilt.roll + damping * roll_rate);
        Some((lateral * pitch + forward * roll) * inertia)
    }

    /// Read the torso pose and spin, plan and apply this tick's impulses.
    pub fn step<P: PhysicsAdapter + ?Sized>(
        physics: &mut P,
        model: &RobotModel,
        intent: &IntentVector,
        dt: f32,
    ) -> Result<DriveCommand, PhysicsError> {
        let dt = StriderConfig::clamp_dt(dt);
        let torso = model.torso();
        let pose = physics.body_pose(torso).ok_or(PhysicsError::UnknownBody(torso))?;
        let velocity = physics.body_velocity(torso).ok_or(PhysicsError::UnknownBody(torso))?;
        let state = TorsoState {
            orientation: pose.orientation,
            angular_velocity: velocity.angular,
        };
        let command = Self::plan(model.plan(), &state, intent, dt);

        if intent.forward != 0.0 {
            physics.apply_impulse(torso, command.forward_impulse)?;
        }
        if intent.turn != 0.0 {
            physics.apply_torque_impulse(torso, command.yaw_torque)?;
        }
        if let Some(impulse) = command.jump_impulse {
            physics.apply_impulse(torso, impulse)?;
        }
        if let Some(torque) = command.upright_torque {
            physics.apply_torque_impulse(torso, torque)?;
        }
        Ok(command)
    }
}

fn flatten(v: &na::Vector3<f32>) -> Option<na::Vector3<f32>> {
    na::Vector3::new(v.x, 0.0, v.z).try_normalize(DEGENERATE_HEADING)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assembly::RobotAssembly;
    use crate::body_plan::BodyPlanDescriptor;
    use crate::testing::Recorder;
    use approx::{assert_abs_diff_eq, assert_relative_eq};
    use std::f32::consts::FRAC_PI_2;

    fn yaw(angle: f32) -> na::UnitQuaternion<f32> {
        na::UnitQuaternion::from_axis_angle(&na::Vector3::y_axis(), angle)
    }

    fn pitch(angle: f32) -> na::UnitQuaternion<f32> {
        na::UnitQuaternion::from_axis_angle(&na::Vector3::x_axis(), angle)
    }

    #[test]
    fn test_heading_ignores_pitch_and_roll() {
        let base = yaw(0.7);
        let expected = base * na::Vector3::z();
        for tilt in [pitch(0.4), pitch(-0.9), na::UnitQuaternion::from_axis_angle(&na::Vector3::z_axis(), 0.5)] {
            let h = LocomotionDriver::heading(&(base * tilt));
            assert_abs_diff_eq!(h.y, 0.0);
            assert_relative_eq!(h.norm(), 1.0, epsilon = 1e-5);
            assert_relative_eq!(h, expected, epsilon = 1e-5);
        }
    }

    #[test]
    fn test_heading_when_nose_vertical() {
        // Rotating -90 degrees about X tips the nose straight up.
        let up = LocomotionDriver::heading(&pitch(-FRAC_PI_2));
        assert_relative_eq!(up, na::Vector3::z(), epsilon = 1e-5);

        let down = LocomotionDriver::heading(&pitch(FRAC_PI_2));
        assert_relative_eq!(down, na::Vector3::z(), epsilon = 1e-5);
    }

    #[test]
    fn test_tilt_signs() {
        assert_eq!(LocomotionDriver::tilt(&yaw(1.2)), Tilt::default());
        let nose_down = LocomotionDriver::tilt(&pitch(0.3));
        assert_relative_eq!(nose_down.pitch, 0.3, epsilon = 1e-5);
        assert_abs_diff_eq!(nose_down.roll, 0.0, epsilon = 1e-6);

        let rolled = LocomotionDriver::tilt(&na::UnitQuaternion::from_axis_angle(&na::Vector3::z_axis(), 0.2));
        assert_relative_eq!(rolled.roll, 0.2, epsilon = 1e-5);
    }

    #[test]
    fn test_plan_scales_with_dt_and_turbo() {
        let plan = BodyPlanDescriptor::quadruped();
        let walk = IntentVector::new(1, 1, false, false);
        let run = IntentVector::new(1, 1, true, false);
        let dt = StriderConfig::DT;
        let level = TorsoState::at_rest(na::UnitQuaternion::identity());

        let a = LocomotionDriver::plan(&plan, &level, &walk, dt);
        assert_relative_eq!(a.forward_impulse, na::Vector3::z() * plan.drive.forward_impulse_gain * dt);
        assert_relative_eq!(
            a.yaw_torque.y,
            (plan.drive.base_turn_gain + plan.drive.turn_boost) * dt
        );

        let b = LocomotionDriver::plan(&plan, &level, &run, dt);
        assert_relative_eq!(b.forward_impulse, a.forward_impulse * 1.8, epsilon = 1e-6);
        assert_relative_eq!(b.yaw_torque, a.yaw_torque * 1.8, epsilon = 1e-6);

        let half = LocomotionDriver::plan(&plan, &level, &walk, dt / 2.0);
        assert_relative_eq!(half.forward_impulse * 2.0, a.forward_impulse, epsilon = 1e-6);
    }

    #[test]
    fn test_turn_left_is_positive_yaw() {
        let plan = BodyPlanDescriptor::quadruped();
        let left = LocomotionDriver::plan(
            &plan,
            &TorsoState::at_rest(yaw(0.0)),
            &IntentVector::new(0, 1, false, false),
            0.02,
        );
        assert!(left.yaw_torque.y > 0.0);
        assert_eq!(left.forward_impulse, na::Vector3::zeros());
    }

    #[test]
    fn test_jump_is_fixed_per_tick() {
        let plan = BodyPlanDescriptor::quadruped();
        let jump = IntentVector::new(0, 0, false, true);
        let level = TorsoState::at_rest(na::UnitQuaternion::identity());
        for dt in [0.0, 0.01, 1.0 / 30.0] {
            let cmd = LocomotionDriver::plan(&plan, &level, &jump, dt);
            assert_eq!(cmd.jump_impulse, Some(na::Vector3::y() * plan.drive.jump_impulse));
        }
        assert!(LocomotionDriver::plan(&plan, &level, &IntentVector::IDLE, 0.01).is_idle());
    }

    #[test]
    fn test_upright_only_for_biped() {
        let tilted = TorsoState::at_rest(pitch(0.25));
        let quad = BodyPlanDescriptor::quadruped();
        let human = BodyPlanDescriptor::humanoid();

        let q = LocomotionDriver::plan(&quad, &tilted, &IntentVector::IDLE, 0.016);
        assert!(q.upright_torque.is_none());

        let h = LocomotionDriver::plan(&human, &tilted, &IntentVector::IDLE, 0.016);
        let torque = h.upright_torque.unwrap();
        let gain = human.drive.upright_gain.unwrap();
        assert_relative_eq!(torque.x, -gain * 0.25 * human.balance_inertia(), epsilon = 1e-3);
        assert_abs_diff_eq!(torque.z, 0.0, epsilon = 1e-4);
    }

    #[test]
    fn test_quadruped_never_gets_upright_torque() {
        // Even a hand-built plan carrying a gain stays passive on four legs.
        let mut quad = BodyPlanDescriptor::quadruped();
        quad.drive.upright_gain = Some(1.0);
        assert!(LocomotionDriver::upright_torque(&quad, &TorsoState::at_rest(pitch(0.3))).is_none());
    }

    #[test]
    fn test_upright_damps_tilt_rate() {
        let human = BodyPlanDescriptor::humanoid();
        let level = na::UnitQuaternion::identity();

        let still = LocomotionDriver::upright_torque(&human, &TorsoState::at_rest(level)).unwrap();
        assert_abs_diff_eq!(still.norm(), 0.0, epsilon = 1e-6);

        // Pitching nose down (spin about +X) is opposed.
        let pitching = TorsoState {
            orientation: level,
            angular_velocity: na::Vector3::new(2.0, 0.0, 0.0),
        };
        let torque = LocomotionDriver::upright_torque(&human, &pitching).unwrap();
        assert_relative_eq!(
            torque.x,
            -human.drive.upright_damping * 2.0 * human.balance_inertia(),
            epsilon = 1e-3
        );

        // Yaw spin is left to the turn torque.
        let turning = TorsoState {
            orientation: level,
            angular_velocity: na::Vector3::new(0.0, 3.0, 0.0),
        };
        let torque = LocomotionDriver::upright_torque(&human, &turning).unwrap();
        assert_abs_diff_eq!(torque.norm(), 0.0, epsilon = 1e-6);
    }

    #[test]
    fn test_roll_is_pushed_back() {
        let human = BodyPlanDescriptor::humanoid();
        let rolled = na::UnitQuaternion::from_axis_angle(&na::Vector3::z_axis(), 0.2);
        let torque = LocomotionDriver::upright_torque(&human, &TorsoState::at_rest(rolled)).unwrap();
        assert!(torque.z < 0.0);
        assert_abs_diff_eq!(torque.x, 0.0, epsilon = 1e-4);
    }

    #[test]
    fn test_step_applies_recorded_impulses() {
        let mut rec = Recorder::new();
        let model = RobotAssembly::build(&mut rec, &BodyPlanDescriptor::humanoid()).unwrap();

        LocomotionDriver::step(&mut rec, &model, &IntentVector::IDLE, StriderConfig::DT).unwrap();
        assert!(rec.impulses.is_empty());
        // Upright torque is always applied to the biped.
        assert_eq!(rec.torques.len(), 1);

        rec.clear_log();
        let intent = IntentVector::new(1, -1, false, true);
        let cmd = LocomotionDriver::step(&mut rec, &model, &intent, StriderConfig::DT).unwrap();
        assert_eq!(rec.impulses.len(), 2);
        assert_eq!(rec.torques.len(), 2);
        assert!(rec.impulses.iter().all(|(body, _)| *body == model.torso()));
        assert_eq!(rec.impulses[0].1, cmd.forward_impulse);
        assert!(cmd.yaw_torque.y < 0.0);
    }
}
