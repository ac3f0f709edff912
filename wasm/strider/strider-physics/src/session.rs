//! One simulation session: physics world, terrain, the active robot and its camera.
//!
//! A tick runs, in order: gait oscillator, whole-body drive, one physics step,
//! chase camera. Rendering is pulled separately through [`Simulation::flush_render`].

use crate::assembly::{LinkRole, RobotAssembly, RobotModel};
use crate::body_plan::{BodyPlanDescriptor, BodyPlanSelector};
use crate::camera::{CameraPose, ChaseCamera};
use crate::config::StriderConfig;
use crate::controller::{DriveCommand, GaitController, GaitFrame, LocomotionDriver};
use crate::error::{AssemblyError, PhysicsError};
use crate::intent::{InputEvent, IntentState, IntentVector, LogicalKey};
use crate::physics::{BodyHandle, LinkShape, PhysicsAdapter, PhysicsWorld, Pose};
use crate::terrain::{SpawnedTerrain, TerrainLayout};

/// What a render body stands for.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BodyTag {
    Robot(LinkRole),
    Ground,
    Crate { hue: f32 },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RenderEvent {
    Added {
        body: BodyHandle,
        shape: LinkShape,
        tag: BodyTag,
    },
    Removed {
        body: BodyHandle,
    },
}

/// Scene graph the session pushes into. Implemented by the frontend.
pub trait RenderAdapter {
    fn add_mesh(&mut self, body: BodyHandle, shape: &LinkShape, tag: BodyTag);

    fn remove_mesh(&mut self, body: BodyHandle);

    fn sync_pose(&mut self, body: BodyHandle, pose: &Pose);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SimulationSettings {
    pub body_plan: BodyPlanSelector,
    pub terrain_seed: u64,
    pub crate_count: usize,
}

impl Default for SimulationSettings {
    fn default() -> Self {
        Self {
            body_plan: BodyPlanSelector::Quadruped,
            terrain_seed: 7,
            crate_count: 50,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FrameReport {
    /// Clamped delta the controllers actually used.
    pub dt: f32,
    pub intent: IntentVector,
    pub gait: Option<GaitFrame>,
    pub drive: Option<DriveCommand>,
    pub camera: Option<CameraPose>,
}

pub struct Simulation<P: PhysicsAdapter = PhysicsWorld> {
    physics: P,
    terrain: SpawnedTerrain,
    model: Option<RobotModel>,
    intent: IntentState,
    camera: ChaseCamera,
    pending: Vec<RenderEvent>,
    ticks: u64,
}

impl Simulation<PhysicsWorld> {
    pub fn new(settings: SimulationSettings) -> Result<Self, AssemblyError> {
        Self::with_physics(PhysicsWorld::new(), settings)
    }
}

impl<P: PhysicsAdapter> Simulation<P> {
    pub fn with_physics(mut physics: P, settings: SimulationSettings) -> Result<Self, AssemblyError> {
        let layout = TerrainLayout::scattered(settings.terrain_seed, settings.crate_count);
        let terrain = layout
            .spawn(&mut physics)
            .map_err(|e| AssemblyError::physics("terrain", e))?;

        let plan = settings.body_plan.descriptor();
        let mut pending = vec![RenderEvent::Added {
            body: terrain.ground,
            shape: terrain.ground_shape,
            tag: BodyTag::Ground,
        }];
        pending.extend(terrain.obstacles.iter().map(|(body, shape, hue)| RenderEvent::Added {
            body: *body,
            shape: *shape,
            tag: BodyTag::Crate { hue: *hue },
        }));

        let mut sim = Self {
            physics,
            terrain,
            model: None,
            intent: IntentState::new(),
            camera: ChaseCamera::new(plan.camera),
            pending,
            ticks: 0,
        };
        sim.load_plan(plan)?;
        Ok(sim)
    }

    pub fn physics(&self) -> &P {
        &self.physics
    }

    pub fn model(&self) -> Option<&RobotModel> {
        self.model.as_ref()
    }

    pub fn terrain(&self) -> &SpawnedTerrain {
        &self.terrain
    }

    pub fn intent(&self) -> IntentVector {
        self.intent.intent()
    }

    pub fn intent_state(&self) -> &IntentState {
        &self.intent
    }

    pub fn camera(&self) -> &ChaseCamera {
        &self.camera
    }

    pub fn tick_count(&self) -> u64 {
        self.ticks
    }

    pub fn torso_pose(&self) -> Option<Pose> {
        self.model
            .as_ref()
            .and_then(|model| self.physics.body_pose(model.torso()))
    }

    pub fn handle_input(&mut self, event: InputEvent) {
        self.intent = self.intent.apply(event);
    }

    /// Raw key name from a device. Unknown keys are ignored.
    pub fn handle_key(&mut self, name: &str, pressed: bool) -> bool {
        match LogicalKey::from_name(name) {
            Some(key) if pressed => {
                self.handle_input(InputEvent::Pressed(key));
                true
            }
            Some(key) => {
                self.handle_input(InputEvent::Released(key));
                true
            }
            None => false,
        }
    }

    pub fn release_all(&mut self) {
        self.intent = self.intent.clear();
    }

    pub fn select_body_plan(&mut self, selector: BodyPlanSelector) -> Result<(), AssemblyError> {
        self.load_plan(selector.descriptor())
    }

    /// Parse a selector name and switch to it. Unknown names leave the session untouched.
    pub fn select_body_plan_by_name(&mut self, name: &str) -> Result<(), AssemblyError> {
        let selector: BodyPlanSelector = name.parse()?;
        self.select_body_plan(selector)
    }

    pub fn load_custom_plan(&mut self, plan: BodyPlanDescriptor) -> Result<(), AssemblyError> {
        self.load_plan(plan)
    }

    /// Teleport the robot back to its spawn pose and zero its gait.
    pub fn reset(&mut self) -> Result<(), PhysicsError> {
        let Some(model) = self.model.as_mut() else {
            return Ok(());
        };
        RobotAssembly::reset(&mut self.physics, model)?;
        if let Some(pose) = self.physics.body_pose(model.torso()) {
            self.camera.snap(&pose);
        }
        Ok(())
    }

    /// Tear the current robot down and build the same plan again from scratch.
    pub fn rebuild(&mut self) -> Result<(), AssemblyError> {
        match self.model.as_ref() {
            Some(model) => {
                let plan = model.plan().clone();
                self.load_plan(plan)
            }
            None => Ok(()),
        }
    }

    /// Validate, dispose the current model, then build and reset. If either is rejected the
    /// previous plan is rebuilt so the session keeps a valid robot.
    fn load_plan(&mut self, plan: BodyPlanDescriptor) -> Result<(), AssemblyError> {
        plan.validate()?;

        let previous = self.model.take().map(|mut old| {
            RobotAssembly::dispose(&mut self.physics, &mut old);
            self.pending.extend(
                old.links()
                    .iter()
                    .map(|link| RenderEvent::Removed { body: link.body }),
            );
            old.plan().clone()
        });

        let installed = RobotAssembly::build(&mut self.physics, &plan).and_then(|model| self.install(model));
        if let Err(err) = installed {
            if let Some(previous) = previous {
                match RobotAssembly::build(&mut self.physics, &previous).and_then(|model| self.install(model)) {
                    Ok(()) => log::warn!("Kept '{}' after rejected switch to '{}'", previous.name, plan.name),
                    Err(restore) => log::error!("Could not restore '{}': {}", previous.name, restore),
                }
            }
            return Err(err);
        }
        Ok(())
    }

    /// Reset a freshly built model and make it active. A model that cannot be
    /// reset is disposed before the error is returned.
    fn install(&mut self, mut model: RobotModel) -> Result<(), AssemblyError> {
        if let Err(e) = RobotAssembly::reset(&mut self.physics, &mut model) {
            RobotAssembly::dispose(&mut self.physics, &mut model);
            return Err(AssemblyError::physics("reset", e));
        }
        self.pending.extend(model.links().iter().map(|link| RenderEvent::Added {
            body: link.body,
            shape: link.shape,
            tag: BodyTag::Robot(link.role),
        }));
        self.camera.set_profile(model.plan().camera);
        self.camera.snap(&model.spawn_pose());
        log::info!("Active body plan: '{}'", model.plan().name);
        self.model = Some(model);
        Ok(())
    }

    /// Advance one frame. `raw_dt` is the wall-clock delta and is clamped before use.
    pub fn tick(&mut self, raw_dt: f32) -> Result<FrameReport, PhysicsError> {
        let dt = StriderConfig::clamp_dt(raw_dt);
        let intent = self.intent.intent();

        let (gait, drive) = match self.model.as_mut() {
            Some(model) => {
                let gait = GaitController::step(&mut self.physics, model, &intent, dt)?;
                let drive = LocomotionDriver::step(&mut self.physics, model, &intent, dt)?;
                (Some(gait), Some(drive))
            }
            None => (None, None),
        };

        self.physics.step();

        let camera = match self.torso_pose() {
            Some(torso) => Some(self.camera.update(&torso, dt)),
            None => self.camera.pose(),
        };
        self.ticks += 1;

        Ok(FrameReport {
            dt,
            intent,
            gait,
            drive,
            camera,
        })
    }

    /// Deliver queued mesh additions and removals, then push every tracked pose.
    /// Returns the number of poses pushed.
    pub fn flush_render<R: RenderAdapter + ?Sized>(&mut self, renderer: &mut R) -> usize {
        for event in self.pending.drain(..) {
            match event {
                RenderEvent::Added { body, shape, tag } => renderer.add_mesh(body, &shape, tag),
                RenderEvent::Removed { body } => renderer.remove_mesh(body),
            }
        }

        let mut pushed = 0;
        for body in self.tracked_bodies() {
            if let Some(pose) = self.physics.body_pose(body) {
                renderer.sync_pose(body, &pose);
                pushed += 1;
            }
        }
        pushed
    }

    fn tracked_bodies(&self) -> Vec<BodyHandle> {
        let mut bodies = vec![self.terrain.ground];
        bodies.extend(self.terrain.obstacles.iter().map(|(body, _, _)| *body));
        if let Some(model) = &self.model {
            bodies.extend(model.links().iter().map(|link| link.body));
        }
        bodies
    }
}
