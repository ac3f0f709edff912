//! Data-driven body plans.
//!
//! Quadruped and humanoid differ only in leg count, geometry and gains, so both are
//! described by a single [`BodyPlanDescriptor`] that one assembly routine and one
//! gait routine consume.

use std::f32::consts::{PI, TAU};
use std::fmt;
use std::str::FromStr;

use nalgebra as na;
use serde::{Deserialize, Serialize};

use crate::error::AssemblyError;
use crate::physics::LinkShape;

const PHASE_TOLERANCE: f32 = 1e-4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Variant {
    Quadruped,
    Humanoid,
}

impl Variant {
    pub fn leg_count(self) -> usize {
        match self {
            Variant::Quadruped => 4,
            Variant::Humanoid => 2,
        }
    }
}

/// Which side of the torso a leg hangs from. Left is +X.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    Left,
    Right,
}

impl Side {
    pub fn sign(self) -> f32 {
        match self {
            Side::Left => 1.0,
            Side::Right => -1.0,
        }
    }
}

/// Declared phase relationship between legs, checked by [`BodyPlanDescriptor::validate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GaitPattern {
    /// Diagonal pairs in lockstep, the two diagonals half a cycle apart.
    Trot,
    /// Two legs half a cycle apart.
    Alternate,
    /// No phase constraint. Must be chosen explicitly.
    Custom,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LegSpec {
    pub name: String,
    /// Hip anchor in the torso frame (X lateral, Y up, Z forward).
    pub attach_offset: [f32; 3],
    /// Phase offset in radians added to the shared oscillator.
    pub phase_offset: f32,
    pub side: Side,
}

impl LegSpec {
    pub fn new(name: &str, attach_offset: [f32; 3], phase_offset: f32, side: Side) -> Self {
        Self {
            name: name.to_string(),
            attach_offset,
            phase_offset,
            side,
        }
    }

    pub fn attach(&self) -> na::Vector3<f32> {
        na::Vector3::from(self.attach_offset)
    }

    pub fn is_front(&self) -> bool {
        self.attach_offset[2] >= 0.0
    }

    /// Diagonally opposite: other side and other end of the torso.
    pub fn is_diagonal_to(&self, other: &LegSpec) -> bool {
        self.side != other.side && self.is_front() != other.is_front()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LinkDims {
    pub half_extents: [f32; 3],
    pub density: f32,
    pub friction: f32,
}

impl LinkDims {
    pub fn shape(&self) -> LinkShape {
        let [hx, hy, hz] = self.half_extents;
        LinkShape::cuboid(hx, hy, hz)
    }

    pub fn half_height(&self) -> f32 {
        self.half_extents[1]
    }

    pub fn mass(&self) -> f32 {
        let [hx, hy, hz] = self.half_extents;
        8.0 * hx * hy * hz * self.density
    }

    fn is_valid(&self) -> bool {
        self.half_extents.iter().all(|h| h.is_finite() && *h > 0.0)
            && self.density.is_finite()
            && self.density > 0.0
            && self.friction >= 0.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct JointRange {
    pub min: f32,
    pub max: f32,
}

impl JointRange {
    pub const fn new(min: f32, max: f32) -> Self {
        Self { min, max }
    }

    pub fn contains(&self, angle: f32) -> bool {
        angle >= self.min && angle <= self.max
    }
}

/// Oscillator gains. Frequencies are in cycles per second, angles in radians.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GaitParams {
    pub base_frequency: f32,
    pub frequency_forward_gain: f32,
    pub frequency_turn_gain: f32,
    pub turbo_multiplier: f32,
    pub base_stride: f32,
    pub stride_gain: f32,
    pub knee_base_flex: f32,
    pub base_lift: f32,
    pub lift_gain: f32,
    /// Extra phase (radians per unit turn) applied with the leg's side sign.
    pub turn_skew: f32,
    pub base_stiffness: f32,
    pub stiffness_gain: f32,
    pub base_damping: f32,
    pub damping_gain: f32,
}

/// Whole-body impulse gains.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DriveParams {
    /// Forward impulse per second of held forward intent.
    pub forward_impulse_gain: f32,
    pub base_turn_gain: f32,
    pub turn_boost: f32,
    /// Vertical impulse applied on every tick jump is held.
    pub jump_impulse: f32,
    /// Uprighting gain: angular velocity removed per tick for each radian of pitch
    /// or roll, scaled by [`BodyPlanDescriptor::balance_inertia`]. `None` for
    /// passively stable plans.
    pub upright_gain: Option<f32>,
    /// Share of the pitch and roll rate removed per tick while uprighting.
    #[serde(default)]
    pub upright_damping: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CameraProfile {
    pub distance: f32,
    pub lateral_offset: f32,
    pub height: f32,
    pub look_ahead: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BodyPlanDescriptor {
    pub name: String,
    pub variant: Variant,
    pub pattern: GaitPattern,
    pub torso: LinkDims,
    pub upper_leg: LinkDims,
    pub lower_leg: LinkDims,
    pub legs: Vec<LegSpec>,
    pub hip_limits: JointRange,
    pub knee_limits: JointRange,
    pub spawn_height: f32,
    pub gait: GaitParams,
    pub drive: DriveParams,
    pub camera: CameraProfile,
}

impl BodyPlanDescriptor {
    pub fn quadruped() -> Self {
        Self {
            name: "quadruped".to_string(),
            variant: Variant::Quadruped,
            pattern: GaitPattern::Trot,
            torso: LinkDims {
                half_extents: [0.32, 0.12, 0.55],
                density: 250.0,
                friction: 0.6,
            },
            upper_leg: LinkDims {
                half_extents: [0.05, 0.18, 0.05],
                density: 400.0,
                friction: 0.8,
            },
            lower_leg: LinkDims {
                half_extents: [0.04, 0.17, 0.04],
                density: 400.0,
                friction: crate::config::StriderConfig::FOOT_FRICTION,
            },
            legs: vec![
                LegSpec::new("front_left", [0.36, -0.1, 0.42], 0.0, Side::Left),
                LegSpec::new("front_right", [-0.36, -0.1, 0.42], PI, Side::Right),
                LegSpec::new("back_left", [0.36, -0.1, -0.42], PI, Side::Left),
                LegSpec::new("back_right", [-0.36, -0.1, -0.42], 0.0, Side::Right),
            ],
            hip_limits: JointRange::new(-0.7, 0.7),
            knee_limits: JointRange::new(-1.35, 0.2),
            spawn_height: 0.95,
            gait: GaitParams {
                base_frequency: 0.8,
                frequency_forward_gain: 1.2,
                frequency_turn_gain: 0.6,
                turbo_multiplier: 1.8,
                base_stride: 0.08,
                stride_gain: 0.22,
                knee_base_flex: -0.15,
                base_lift: 0.2,
                lift_gain: 0.35,
                turn_skew: 0.25,
                base_stiffness: 300.0,
                stiffness_gain: 150.0,
                base_damping: 12.0,
                damping_gain: 6.0,
            },
            drive: DriveParams {
                forward_impulse_gain: 60.0,
                base_turn_gain: 40.0,
                turn_boost: 20.0,
                jump_impulse: 10.0,
                upright_gain: None,
                upright_damping: 0.0,
            },
            camera: CameraProfile {
                distance: 4.5,
                lateral_offset: 0.8,
                height: 2.2,
                look_ahead: 1.5,
            },
        }
    }

    pub fn humanoid() -> Self {
        Self {
            name: "humanoid".to_string(),
            variant: Variant::Humanoid,
            pattern: GaitPattern::Alternate,
            torso: LinkDims {
                half_extents: [0.22, 0.32, 0.14],
                density: 250.0,
                friction: 0.6,
            },
            upper_leg: LinkDims {
                half_extents: [0.06, 0.22, 0.06],
                density: 400.0,
                friction: 0.8,
            },
            lower_leg: LinkDims {
                half_extents: [0.05, 0.21, 0.09],
                density: 400.0,
                friction: crate::config::StriderConfig::FOOT_FRICTION,
            },
            legs: vec![
                LegSpec::new("left", [0.14, -0.32, 0.0], 0.0, Side::Left),
                LegSpec::new("right", [-0.14, -0.32, 0.0], PI, Side::Right),
            ],
            hip_limits: JointRange::new(-0.65, 0.65),
            knee_limits: JointRange::new(-1.35, 0.2),
            spawn_height: 1.25,
            gait: GaitParams {
                base_frequency: 0.6,
                frequency_forward_gain: 1.0,
                frequency_turn_gain: 0.5,
                turbo_multiplier: 1.8,
                base_stride: 0.10,
                stride_gain: 0.25,
                knee_base_flex: 0.0,
                base_lift: 0.15,
                lift_gain: 0.4,
                turn_skew: 0.0,
                base_stiffness: 700.0,
                stiffness_gain: 200.0,
                base_damping: 28.0,
                damping_gain: 8.0,
            },
            drive: DriveParams {
                forward_impulse_gain: 30.0,
                base_turn_gain: 10.0,
                turn_boost: 6.0,
                jump_impulse: 6.0,
                upright_gain: Some(1.0),
                upright_damping: 0.08,
            },
            camera: CameraProfile {
                distance: 4.0,
                lateral_offset: 0.6,
                height: 2.0,
                look_ahead: 1.2,
            },
        }
    }

    /// Quadruped body with the farther, higher camera used on small screens.
    pub fn mobile() -> Self {
        Self {
            name: "mobile".to_string(),
            camera: CameraProfile {
                distance: 6.5,
                lateral_offset: 1.0,
                height: 3.2,
                look_ahead: 1.5,
            },
            ..Self::quadruped()
        }
    }

    /// Parse and validate a custom descriptor.
    pub fn from_json(json: &str) -> Result<Self, AssemblyError> {
        let plan: Self = serde_json::from_str(json)?;
        plan.validate()?;
        Ok(plan)
    }

    pub fn to_json(&self) -> Result<String, AssemblyError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn body_count(&self) -> usize {
        1 + 2 * self.legs.len()
    }

    pub fn joint_count(&self) -> usize {
        2 * self.legs.len()
    }

    /// Moment of inertia (kg*m^2) of the standing robot about its feet, from the
    /// link boxes and densities with every leg hanging straight.
    pub fn balance_inertia(&self) -> f32 {
        let upper_h = self.upper_leg.half_height();
        let lower_h = self.lower_leg.half_height();
        let hip_drop = self.legs.iter().map(|leg| -leg.attach_offset[1]).fold(0.0, f32::max);
        let torso_height = hip_drop + 2.0 * (upper_h + lower_h);

        let [_, hy, hz] = self.torso.half_extents;
        let torso_mass = self.torso.mass();
        let torso = torso_mass * (torso_height * torso_height + (hy * hy + hz * hz) / 3.0);
        let upper = self.upper_leg.mass() * (2.0 * lower_h + upper_h).powi(2);
        let lower = self.lower_leg.mass() * lower_h * lower_h;
        let leg = upper + lower;
        torso + leg * self.legs.len() as f32
    }

    pub fn validate(&self) -> Result<(), AssemblyError> {
        let invalid = |reason: String| AssemblyError::InvalidPlan {
            plan: self.name.clone(),
            reason,
        };

        let expected = self.variant.leg_count();
        if self.legs.len() != expected {
            return Err(invalid(format!(
                "{:?} needs {} legs, found {}",
                self.variant,
                expected,
                self.legs.len()
            )));
        }

        for (joint, range) in [("hip", self.hip_limits), ("knee", self.knee_limits)] {
            if !(range.min.is_finite() && range.max.is_finite()) || range.min > range.max {
                return Err(AssemblyError::InvalidLimits {
                    joint: joint.to_string(),
                    min: range.min,
                    max: range.max,
                });
            }
        }

        for (part, dims) in [
            ("torso", &self.torso),
            ("upper_leg", &self.upper_leg),
            ("lower_leg", &self.lower_leg),
        ] {
            if !dims.is_valid() {
                return Err(invalid(format!("{part} has non-positive dimensions or density")));
            }
        }

        if !(self.spawn_height.is_finite() && self.spawn_height > 0.0) {
            return Err(invalid(format!("spawn height {}", self.spawn_height)));
        }
        if !(self.gait.turbo_multiplier.is_finite() && self.gait.turbo_multiplier > 0.0) {
            return Err(invalid(format!("turbo multiplier {}", self.gait.turbo_multiplier)));
        }
        match (self.variant, self.drive.upright_gain) {
            (Variant::Quadruped, Some(_)) => {
                return Err(invalid("quadrupeds balance passively and take no upright gain".to_string()));
            }
            (_, Some(gain)) if !(gain.is_finite() && gain >= 0.0) => {
                return Err(invalid(format!("upright gain {gain}")));
            }
            _ => {}
        }
        if !(self.drive.upright_damping.is_finite() && (0.0..1.0).contains(&self.drive.upright_damping)) {
            return Err(invalid(format!("upright damping {}", self.drive.upright_damping)));
        }

        for (i, leg) in self.legs.iter().enumerate() {
            if !leg.attach_offset.iter().all(|c| c.is_finite()) || !leg.phase_offset.is_finite() {
                return Err(invalid(format!("leg '{}' has non-finite geometry", leg.name)));
            }
            if leg.attach_offset[0] * leg.side.sign() <= 0.0 {
                return Err(invalid(format!(
                    "leg '{}' declared {:?} but attaches at x = {}",
                    leg.name, leg.side, leg.attach_offset[0]
                )));
            }
            if self.legs[..i].iter().any(|other| other.name == leg.name) {
                return Err(invalid(format!("duplicate leg name '{}'", leg.name)));
            }
        }

        self.validate_pattern().map_err(invalid)
    }

    fn validate_pattern(&self) -> Result<(), String> {
        match self.pattern {
            GaitPattern::Custom => {
                log::info!("Body plan '{}' uses a custom phase table", self.name);
                Ok(())
            }
            GaitPattern::Alternate => {
                let [a, b] = self.legs.as_slice() else {
                    return Err("alternate pattern needs exactly two legs".to_string());
                };
                if phases_match(a.phase_offset + PI, b.phase_offset) {
                    Ok(())
                } else {
                    Err(format!("legs '{}' and '{}' are not half a cycle apart", a.name, b.name))
                }
            }
            GaitPattern::Trot => {
                if self.legs.len() != 4 {
                    return Err("trot pattern needs exactly four legs".to_string());
                }
                for leg in &self.legs {
                    let partners: Vec<&LegSpec> =
                        self.legs.iter().filter(|other| leg.is_diagonal_to(other)).collect();
                    let [partner] = partners.as_slice() else {
                        return Err(format!("leg '{}' has no unique diagonal partner", leg.name));
                    };
                    if !phases_match(leg.phase_offset, partner.phase_offset) {
                        return Err(format!(
                            "diagonal legs '{}' and '{}' are out of phase",
                            leg.name, partner.name
                        ));
                    }
                    for other in &self.legs {
                        let same_end = other.is_front() == leg.is_front() && other.side != leg.side;
                        if same_end && !phases_match(leg.phase_offset + PI, other.phase_offset) {
                            return Err(format!(
                                "legs '{}' and '{}' must be half a cycle apart",
                                leg.name, other.name
                            ));
                        }
                    }
                }
                Ok(())
            }
        }
    }
}

fn phases_match(a: f32, b: f32) -> bool {
    let diff = (a - b).rem_euclid(TAU);
    diff < PHASE_TOLERANCE || TAU - diff < PHASE_TOLERANCE
}

/// External body-plan command: `quadruped | humanoid | mobile`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BodyPlanSelector {
    Quadruped,
    Humanoid,
    Mobile,
}

impl BodyPlanSelector {
    pub const ALL: [BodyPlanSelector; 3] = [
        BodyPlanSelector::Quadruped,
        BodyPlanSelector::Humanoid,
        BodyPlanSelector::Mobile,
    ];

    pub fn descriptor(self) -> BodyPlanDescriptor {
        match self {
            BodyPlanSelector::Quadruped => BodyPlanDescriptor::quadruped(),
            BodyPlanSelector::Humanoid => BodyPlanDescriptor::humanoid(),
            BodyPlanSelector::Mobile => BodyPlanDescriptor::mobile(),
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            BodyPlanSelector::Quadruped => "quadruped",
            BodyPlanSelector::Humanoid => "humanoid",
            BodyPlanSelector::Mobile => "mobile",
        }
    }
}

impl fmt::Display for BodyPlanSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for BodyPlanSelector {
    type Err = AssemblyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "quadruped" => Ok(BodyPlanSelector::Quadruped),
            "humanoid" | "biped" => Ok(BodyPlanSelector::Humanoid),
            "mobile" => Ok(BodyPlanSelector::Mobile),
            _ => Err(AssemblyError::UnknownBodyPlan(s.to_string())),
        }
    }
}
