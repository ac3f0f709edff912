//! Per-tick controllers: the leg oscillator and the whole-body driver.
//!
//! Both only read body state and write motor configuration or impulses through
//! the [`PhysicsAdapter`](crate::physics::PhysicsAdapter); neither touches body
//! poses directly.

mod gait;
mod locomotion;

pub use gait::{GaitController, GaitFrame, LegTargets};
pub use locomotion::{DriveCommand, LocomotionDriver, Tilt, TorsoState};
