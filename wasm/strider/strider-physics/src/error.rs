//! Error types for physics construction and robot assembly.

use thiserror::Error;

use crate::physics::{BodyHandle, JointHandle};

/// Rejections raised by a [`PhysicsAdapter`](crate::physics::PhysicsAdapter).
#[derive(Debug, Error, Clone, PartialEq)]
pub enum PhysicsError {
    /// Referenced body is not (or no longer) registered.
    #[error("unknown body {0:?}")]
    UnknownBody(BodyHandle),

    /// Referenced joint is not (or no longer) registered.
    #[error("unknown joint {0:?}")]
    UnknownJoint(JointHandle),

    /// Pose, anchor or impulse contained NaN or infinity.
    #[error("non-finite {what}")]
    NonFinite {
        /// Which quantity was rejected.
        what: &'static str,
    },

    /// Collider density must be strictly positive.
    #[error("invalid density {0} (must be positive and finite)")]
    InvalidDensity(f32),

    /// Collider dimensions must be strictly positive.
    #[error("invalid collider shape: {reason}")]
    InvalidShape {
        /// Description of the problem.
        reason: String,
    },

    /// Joint axis has zero length.
    #[error("degenerate joint axis")]
    DegenerateAxis,

    /// A joint cannot connect a body to itself.
    #[error("joint would connect body {0:?} to itself")]
    SelfJoint(BodyHandle),

    /// Angle limits with `min > max`.
    #[error("invalid joint limits [{min}, {max}]")]
    InvalidLimits {
        /// Lower bound.
        min: f32,
        /// Upper bound.
        max: f32,
    },

    /// Construction refused for an adapter-specific reason.
    #[error("physics rejected construction: {reason}")]
    Rejected {
        /// Description of the rejection.
        reason: String,
    },
}

/// Errors surfaced while selecting, validating or building a body plan.
#[derive(Debug, Error)]
pub enum AssemblyError {
    /// Selector string names no known body plan.
    #[error("unknown body plan: {0}")]
    UnknownBodyPlan(String),

    /// Descriptor is internally inconsistent.
    #[error("invalid body plan '{plan}': {reason}")]
    InvalidPlan {
        /// Descriptor name.
        plan: String,
        /// Description of the inconsistency.
        reason: String,
    },

    /// A joint was declared with `min > max`.
    #[error("joint {joint} has invalid limits [{min}, {max}]")]
    InvalidLimits {
        /// Joint label.
        joint: String,
        /// Lower bound.
        min: f32,
        /// Upper bound.
        max: f32,
    },

    /// The physics adapter refused a body, collider or joint during `build`.
    #[error("failed to build {part}: {source}")]
    Physics {
        /// Which part was being created.
        part: String,
        /// Underlying rejection.
        #[source]
        source: PhysicsError,
    },

    /// Custom descriptor could not be parsed.
    #[error("malformed body plan JSON: {0}")]
    Json(#[from] serde_json::Error),
}

impl AssemblyError {
    pub(crate) fn physics(part: impl Into<String>, source: PhysicsError) -> Self {
        Self::Physics {
            part: part.into(),
            source,
        }
    }
}
