//! Strider walker core - Rapier physics, robot assembly and procedural gait.
//!
//! Headless: nothing here renders or reads input devices. The Bevy frontend feeds
//! [`InputEvent`]s in, calls [`Simulation::tick`] once per frame and mirrors bodies
//! through a [`RenderAdapter`].

pub mod assembly;
pub mod body_plan;
pub mod camera;
pub mod config;
pub mod controller;
pub mod error;
pub mod intent;
pub mod physics;
pub mod session;
pub mod terrain;

#[cfg(test)]
mod testing;

pub use assembly::{LegRig, LinkRole, RobotAssembly, RobotModel, TrackedLink};
pub use body_plan::{BodyPlanDescriptor, BodyPlanSelector, GaitPattern, LegSpec, Side, Variant};
pub use camera::{CameraPose, ChaseCamera};
pub use config::StriderConfig;
pub use controller::{DriveCommand, GaitController, GaitFrame, LegTargets, LocomotionDriver, TorsoState};
pub use error::{AssemblyError, PhysicsError};
pub use intent::{InputEvent, IntentState, IntentVector, LogicalKey};
pub use physics::{BodyHandle, JointHandle, LinkShape, PhysicsAdapter, PhysicsWorld, Pose, Velocity};
pub use session::{BodyTag, FrameReport, RenderAdapter, RenderEvent, Simulation, SimulationSettings};
pub use terrain::{Obstacle, SpawnedTerrain, TerrainLayout};
