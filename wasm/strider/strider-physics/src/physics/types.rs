use nalgebra as na;
use rapier3d::prelude::*;

use crate::config::StriderConfig;
use crate::error::PhysicsError;

/// Position + orientation snapshot of a body.
///
/// Pulled from the physics world every tick and never kept longer; the rigid
/// body is always the authoritative source.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pose {
    pub position: na::Vector3<f32>,
    pub orientation: na::UnitQuaternion<f32>,
}

impl Default for Pose {
    fn default() -> Self {
        Self::identity()
    }
}

impl Pose {
    pub fn new(position: na::Vector3<f32>, orientation: na::UnitQuaternion<f32>) -> Self {
        Self { position, orientation }
    }

    pub fn identity() -> Self {
        Self::new(na::Vector3::zeros(), na::UnitQuaternion::identity())
    }

    pub fn at(position: na::Vector3<f32>) -> Self {
        Self::new(position, na::UnitQuaternion::identity())
    }

    /// Map a point expressed in this pose's local frame to world space.
    pub fn transform_point(&self, local: &na::Vector3<f32>) -> na::Vector3<f32> {
        self.position + self.orientation * local
    }

    pub fn is_finite(&self) -> bool {
        self.position.iter().all(|c| c.is_finite())
            && self.orientation.coords.iter().all(|c| c.is_finite())
    }

    pub fn to_isometry(&self) -> Isometry<f32> {
        Isometry::from_parts(Translation::from(self.position), self.orientation)
    }

    pub fn from_isometry(iso: &Isometry<f32>) -> Self {
        Self::new(iso.translation.vector, iso.rotation)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Velocity {
    pub linear: na::Vector3<f32>,
    pub angular: na::Vector3<f32>,
}

impl Velocity {
    pub const ZERO: Self = Self {
        linear: na::Vector3::new(0.0, 0.0, 0.0),
        angular: na::Vector3::new(0.0, 0.0, 0.0),
    };
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BodyKind {
    Fixed,
    Dynamic,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BodyDesc {
    pub kind: BodyKind,
    pub pose: Pose,
    pub linear_damping: f32,
    pub angular_damping: f32,
    pub can_sleep: bool,
}

impl BodyDesc {
    pub fn fixed(pose: Pose) -> Self {
        Self {
            kind: BodyKind::Fixed,
            pose,
            linear_damping: 0.0,
            angular_damping: 0.0,
            can_sleep: true,
        }
    }

    /// Robot link: damped and never put to sleep so motors keep acting.
    pub fn dynamic(pose: Pose) -> Self {
        Self {
            kind: BodyKind::Dynamic,
            pose,
            linear_damping: StriderConfig::LINEAR_DAMPING,
            angular_damping: StriderConfig::ANGULAR_DAMPING,
            can_sleep: false,
        }
    }

    /// Loose prop (obstacle crate): undamped and allowed to sleep.
    pub fn prop(pose: Pose) -> Self {
        Self {
            kind: BodyKind::Dynamic,
            pose,
            linear_damping: 0.0,
            angular_damping: 0.0,
            can_sleep: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LinkShape {
    Cuboid { half_extents: na::Vector3<f32> },
    Ball { radius: f32 },
}

impl LinkShape {
    pub fn cuboid(hx: f32, hy: f32, hz: f32) -> Self {
        Self::Cuboid {
            half_extents: na::Vector3::new(hx, hy, hz),
        }
    }

    pub fn validate(&self) -> Result<(), PhysicsError> {
        match self {
            LinkShape::Cuboid { half_extents } => {
                if half_extents.iter().all(|h| h.is_finite() && *h > 0.0) {
                    Ok(())
                } else {
                    Err(PhysicsError::InvalidShape {
                        reason: format!("cuboid half extents {:?}", half_extents.as_slice()),
                    })
                }
            }
            LinkShape::Ball { radius } => {
                if radius.is_finite() && *radius > 0.0 {
                    Ok(())
                } else {
                    Err(PhysicsError::InvalidShape {
                        reason: format!("ball radius {radius}"),
                    })
                }
            }
        }
    }
}

/// Collision layer. Robot parts only hit the world, never each other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CollisionLayer {
    World,
    Robot,
}

impl CollisionLayer {
    pub fn groups(self) -> InteractionGroups {
        match self {
            CollisionLayer::World => InteractionGroups::new(Group::GROUP_1, Group::ALL),
            CollisionLayer::Robot => InteractionGroups::new(Group::GROUP_2, Group::GROUP_1),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColliderDesc {
    pub shape: LinkShape,
    pub density: f32,
    pub friction: f32,
    pub restitution: f32,
    pub layer: CollisionLayer,
}

impl ColliderDesc {
    pub fn robot(shape: LinkShape, density: f32, friction: f32) -> Self {
        Self {
            shape,
            density,
            friction,
            restitution: 0.0,
            layer: CollisionLayer::Robot,
        }
    }

    pub fn world(shape: LinkShape, density: f32, friction: f32, restitution: f32) -> Self {
        Self {
            shape,
            density,
            friction,
            restitution,
            layer: CollisionLayer::World,
        }
    }
}

/// Position-target PD motor configuration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MotorSettings {
    pub target: f32,
    pub stiffness: f32,
    pub damping: f32,
}

impl MotorSettings {
    pub fn new(target: f32, stiffness: f32, damping: f32) -> Self {
        Self { target, stiffness, damping }
    }

    pub fn is_finite(&self) -> bool {
        self.target.is_finite() && self.stiffness.is_finite() && self.damping.is_finite()
    }
}

/// Revolute joint between two bodies. Anchors are in each body's local frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RevoluteDesc {
    pub anchor_a: na::Point3<f32>,
    pub anchor_b: na::Point3<f32>,
    pub axis: na::Vector3<f32>,
    pub limits: [f32; 2],
    pub motor: MotorSettings,
    pub max_force: f32,
}
