use std::f32::consts::TAU;

use crate::assembly::RobotModel;
use crate::body_plan::{GaitParams, JointRange, LegSpec};
use crate::config::StriderConfig;
use crate::error::PhysicsError;
use crate::intent::IntentVector;
use crate::physics::{MotorSettings, PhysicsAdapter};

/// Motor targets for one leg at one phase.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LegTargets {
    /// Oscillator angle for this leg, radians (not wrapped).
    pub cycle: f32,
    pub hip: f32,
    pub knee: f32,
}

/// What the oscillator did on one tick.
#[derive(Debug, Clone, PartialEq)]
pub struct GaitFrame {
    pub phase: f32,
    pub frequency: f32,
    pub stride_amplitude: f32,
    pub knee_lift: f32,
    pub stiffness: f32,
    pub damping: f32,
    /// One entry per leg, in the model's leg order.
    pub legs: Vec<LegTargets>,
}

/// Sinusoidal central pattern generator shared by every body plan.
pub struct GaitController;

impl GaitController {
    pub fn turbo_scale(params: &GaitParams, intent: &IntentVector) -> f32 {
        if intent.turbo {
            params.turbo_multiplier
        } else {
            1.0
        }
    }

    /// Oscillation frequency in cycles per second.
    pub fn frequency(params: &GaitParams, intent: &IntentVector) -> f32 {
        (params.base_frequency
            + intent.forward.abs() * params.frequency_forward_gain
            + intent.turn.abs() * params.frequency_turn_gain)
            * Self::turbo_scale(params, intent)
    }

    pub fn stride_amplitude(params: &GaitParams, intent: &IntentVector) -> f32 {
        (params.base_stride + intent.forward.abs() * params.stride_gain) * Self::turbo_scale(params, intent)
    }

    pub fn knee_lift(params: &GaitParams, intent: &IntentVector) -> f32 {
        params.base_lift + intent.forward.abs() * params.lift_gain
    }

    /// Motor `(stiffness, damping)`; both grow with intended speed.
    pub fn gains(params: &GaitParams, intent: &IntentVector) -> (f32, f32) {
        let speed = intent.forward.abs();
        (
            params.base_stiffness + speed * params.stiffness_gain,
            params.base_damping + speed * params.damping_gain,
        )
    }

    /// `phase` is in cycles; the result is in radians.
    pub fn cycle(params: &GaitParams, leg: &LegSpec, intent: &IntentVector, phase: f32) -> f32 {
        phase * TAU + leg.phase_offset + intent.turn * params.turn_skew * leg.side.sign()
    }

    pub fn leg_targets(params: &GaitParams, leg: &LegSpec, intent: &IntentVector, phase: f32) -> LegTargets {
        let cycle = Self::cycle(params, leg, intent, phase);
        LegTargets {
            cycle,
            hip: cycle.sin() * Self::stride_amplitude(params, intent),
            knee: params.knee_base_flex - cycle.cos().max(0.0) * Self::knee_lift(params, intent),
        }
    }

    /// Advance the model's phase by `dt` and write hip and knee motors for every leg.
    pub fn step<P: PhysicsAdapter + ?Sized>(
        physics: &mut P,
        model: &mut RobotModel,
        intent: &IntentVector,
        dt: f32,
    ) -> Result<GaitFrame, PhysicsError> {
        let dt = StriderConfig::clamp_dt(dt);
        let params = model.plan().gait;
        let hip_limits = model.plan().hip_limits;
        let knee_limits = model.plan().knee_limits;

        let frequency = Self::frequency(&params, intent);
        model.advance_phase(dt * frequency);
        let phase = model.gait_phase();
        let (stiffness, damping) = Self::gains(&params, intent);

        let mut legs = Vec::with_capacity(model.legs().len());
        for leg in model.legs() {
            let targets = Self::leg_targets(&params, &leg.spec, intent, phase);
            physics.configure_motor(
                leg.hip,
                MotorSettings::new(clamp_to(targets.hip, hip_limits), stiffness, damping),
            )?;
            physics.configure_motor(
                leg.knee,
                MotorSettings::new(clamp_to(targets.knee, knee_limits), stiffness, damping),
            )?;
            legs.push(targets);
        }

        Ok(GaitFrame {
            phase,
            frequency,
            stride_amplitude: Self::stride_amplitude(&params, intent),
            knee_lift: Self::knee_lift(&params, intent),
            stiffness,
            damping,
            legs,
        })
    }
}

fn clamp_to(angle: f32, range: JointRange) -> f32 {
    angle.max(range.min).min(range.max)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assembly::RobotAssembly;
    use crate::body_plan::BodyPlanDescriptor;
    use crate::testing::Recorder;
    use approx::{assert_abs_diff_eq, assert_relative_eq};
    use std::f32::consts::PI;

    fn intents() -> Vec<IntentVector> {
        let mut all = Vec::new();
        for forward in [-1, 0, 1] {
            for turn in [-1, 0, 1] {
                for turbo in [false, true] {
                    all.push(IntentVector::new(forward, turn, turbo, false));
                }
            }
        }
        all
    }

    fn phases() -> impl Iterator<Item = f32> {
        (0..64).map(|i| i as f32 / 64.0)
    }

    fn leg<'a>(plan: &'a BodyPlanDescriptor, name: &str) -> &'a LegSpec {
        plan.legs.iter().find(|l| l.name == name).unwrap()
    }

    #[test]
    fn test_forward_stride_amplitude() {
        let plan = BodyPlanDescriptor::quadruped();
        let walk = IntentVector::new(1, 0, false, false);
        assert_eq!(
            GaitController::stride_amplitude(&plan.gait, &walk),
            plan.gait.base_stride + plan.gait.stride_gain
        );
        assert_eq!(
            GaitController::stride_amplitude(&plan.gait, &IntentVector::IDLE),
            plan.gait.base_stride
        );
    }

    #[test]
    fn test_turbo_scales_frequency_and_stride_only() {
        let plan = BodyPlanDescriptor::quadruped();
        let walk = IntentVector::new(1, 0, false, false);
        let run = IntentVector::new(1, 0, true, false);
        let g = &plan.gait;

        assert_relative_eq!(
            GaitController::frequency(g, &run),
            GaitController::frequency(g, &walk) * 1.8
        );
        assert_relative_eq!(
            GaitController::stride_amplitude(g, &run),
            GaitController::stride_amplitude(g, &walk) * 1.8
        );
        assert_eq!(GaitController::knee_lift(g, &run), GaitController::knee_lift(g, &walk));
        assert_eq!(GaitController::gains(g, &run), GaitController::gains(g, &walk));
    }

    #[test]
    fn test_gains_grow_with_speed() {
        let g = BodyPlanDescriptor::humanoid().gait;
        let (k0, d0) = GaitController::gains(&g, &IntentVector::IDLE);
        let (k1, d1) = GaitController::gains(&g, &IntentVector::new(-1, 0, false, false));
        assert!(k1 > k0);
        assert!(d1 > d0);
    }

    #[test]
    fn test_trot_diagonals_in_lockstep() {
        let plan = BodyPlanDescriptor::quadruped();
        let g = &plan.gait;
        for intent in intents().into_iter().filter(|i| i.turn == 0.0) {
            for phase in phases() {
                for (a, b) in [("front_left", "back_right"), ("front_right", "back_left")] {
                    let ta = GaitController::leg_targets(g, leg(&plan, a), &intent, phase);
                    let tb = GaitController::leg_targets(g, leg(&plan, b), &intent, phase);
                    assert_eq!(ta.hip, tb.hip);
                    assert_eq!(ta.knee, tb.knee);
                }

                let fl = GaitController::leg_targets(g, leg(&plan, "front_left"), &intent, phase);
                let fr = GaitController::leg_targets(g, leg(&plan, "front_right"), &intent, phase);
                assert_abs_diff_eq!(fl.hip, -fr.hip, epsilon = 1e-5);
            }
        }
    }

    #[test]
    fn test_turning_skews_sides_apart() {
        let plan = BodyPlanDescriptor::quadruped();
        let turn = IntentVector::new(1, 1, false, false);
        let fl = GaitController::cycle(&plan.gait, leg(&plan, "front_left"), &turn, 0.3);
        let br = GaitController::cycle(&plan.gait, leg(&plan, "back_right"), &turn, 0.3);
        assert_relative_eq!(fl - br, 2.0 * plan.gait.turn_skew, epsilon = 1e-5);
    }

    #[test]
    fn test_biped_legs_half_cycle_apart() {
        let plan = BodyPlanDescriptor::humanoid();
        let (left, right) = (&plan.legs[0], &plan.legs[1]);
        for intent in intents() {
            for phase in phases() {
                let a = GaitController::cycle(&plan.gait, left, &intent, phase);
                let b = GaitController::cycle(&plan.gait, right, &intent, phase);
                assert_abs_diff_eq!((b - a).abs(), PI, epsilon = 1e-5);
            }
        }
    }

    #[test]
    fn test_targets_stay_inside_limits() {
        for plan in [BodyPlanDescriptor::quadruped(), BodyPlanDescriptor::humanoid()] {
            for intent in intents() {
                for phase in phases() {
                    for spec in &plan.legs {
                        let t = GaitController::leg_targets(&plan.gait, spec, &intent, phase);
                        assert!(plan.hip_limits.contains(t.hip), "{} hip {}", plan.name, t.hip);
                        assert!(plan.knee_limits.contains(t.knee), "{} knee {}", plan.name, t.knee);
                        assert!(t.knee <= plan.gait.knee_base_flex);
                    }
                }
            }
        }
    }

    #[test]
    fn test_step_writes_every_joint() {
        let mut rec = Recorder::new();
        let mut model = RobotAssembly::build(&mut rec, &BodyPlanDescriptor::quadruped()).unwrap();
        let intent = IntentVector::new(1, 0, false, false);

        let frame = GaitController::step(&mut rec, &mut model, &intent, StriderConfig::DT).unwrap();
        assert_eq!(rec.motors.len(), 8);
        assert_eq!(frame.legs.len(), 4);
        assert_relative_eq!(frame.phase, StriderConfig::DT * frame.frequency, epsilon = 1e-6);

        for (rig, targets) in model.legs().iter().zip(&frame.legs) {
            let hip = rec.last_motor(rig.hip).unwrap();
            assert_eq!(hip.target, targets.hip);
            assert_eq!(hip.stiffness, frame.stiffness);
            assert_eq!(rec.joint_motor(rig.knee).unwrap().target, targets.knee);
        }
    }

    #[test]
    fn test_phase_strictly_increases() {
        let mut rec = Recorder::new();
        let mut model = RobotAssembly::build(&mut rec, &BodyPlanDescriptor::humanoid()).unwrap();
        let mut last = model.elapsed_phase();
        for (i, dt) in [1e-3, 1.0 / 60.0, 1.0 / 30.0, 0.5, 1.0 / 144.0].iter().cycle().take(400).enumerate() {
            let intent = if i % 3 == 0 {
                IntentVector::IDLE
            } else {
                IntentVector::new(1, -1, true, false)
            };
            let frame = GaitController::step(&mut rec, &mut model, &intent, *dt).unwrap();
            assert!(model.elapsed_phase() > last);
            assert!((0.0..1.0).contains(&frame.phase));
            last = model.elapsed_phase();
        }
        assert!(model.gait_cycles() > 0);
    }

    #[test]
    fn test_large_dt_is_clamped() {
        let mut rec = Recorder::new();
        let mut model = RobotAssembly::build(&mut rec, &BodyPlanDescriptor::quadruped()).unwrap();
        let frame = GaitController::step(&mut rec, &mut model, &IntentVector::IDLE, 5.0).unwrap();
        assert_relative_eq!(
            model.elapsed_phase() as f32,
            StriderConfig::MAX_FRAME_DT * frame.frequency,
            epsilon = 1e-6
        );
    }

    #[test]
    fn test_zero_dt_holds_phase() {
        let mut rec = Recorder::new();
        let mut model = RobotAssembly::build(&mut rec, &BodyPlanDescriptor::quadruped()).unwrap();
        GaitController::step(&mut rec, &mut model, &IntentVector::IDLE, 0.0).unwrap();
        assert_eq!(model.elapsed_phase(), 0.0);
        assert_eq!(rec.motors.len(), 8);
    }

    #[test]
    fn test_step_on_disposed_model_fails() {
        let mut rec = Recorder::new();
        let mut model = RobotAssembly::build(&mut rec, &BodyPlanDescriptor::quadruped()).unwrap();
        RobotAssembly::dispose(&mut rec, &mut model);
        let err = GaitController::step(&mut rec, &mut model, &IntentVector::IDLE, StriderConfig::DT);
        assert!(matches!(err, Err(PhysicsError::UnknownJoint(_))));
    }
}
