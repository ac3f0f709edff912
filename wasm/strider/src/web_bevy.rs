//! WASM entrypoint for the Bevy-based walker.
//!
//! Module structure:
//! - input: keyboard and focus handling
//! - simulation: one core tick per frame
//! - render: ground grid, primitive meshes, pose sync, visual skins
//! - scene: camera and lights
//! - camera: applies the chase camera pose
//! - ui: egui control panel and touch pad

use bevy::prelude::*;
use bevy_egui::EguiPlugin;
use wasm_bindgen::prelude::*;

use strider_physics::{AssemblyError, BodyPlanSelector, FrameReport, Simulation, SimulationSettings};

use crate::{camera, input, render, scene, simulation, ui};

/// WebHandle for the walker WASM app.
#[wasm_bindgen]
pub struct WebHandle {}

#[wasm_bindgen]
impl WebHandle {
    #[wasm_bindgen(constructor)]
    pub fn new() -> Self {
        console_error_panic_hook::set_once();
        Self {}
    }

    #[wasm_bindgen]
    pub async fn start(&self, canvas: web_sys::HtmlCanvasElement) -> Result<(), JsValue> {
        let canvas_id = canvas.id();
        let selector = if canvas_id.is_empty() {
            "#bevy-canvas".to_string()
        } else {
            format!("#{}", canvas_id)
        };

        // Optional visual skins are served from /strider-assets/
        const ASSET_PATH: &str = "/strider-assets";

        App::new()
            .add_plugins(
                DefaultPlugins
                    .set(WindowPlugin {
                        primary_window: Some(Window {
                            title: "Strider".into(),
                            canvas: Some(selector),
                            fit_canvas_to_parent: true,
                            prevent_default_event_handling: false,
                            ..Default::default()
                        }),
                        ..Default::default()
                    })
                    .set(AssetPlugin {
                        meta_check: bevy::asset::AssetMetaCheck::Never,
                        file_path: ASSET_PATH.to_string(),
                        ..Default::default()
                    }),
            )
            .add_plugins(EguiPlugin)
            .add_plugins(StriderPlugin::default())
            .run();

        Ok(())
    }

    #[wasm_bindgen]
    pub fn destroy(&self) {}
}

impl Default for WebHandle {
    fn default() -> Self {
        Self::new()
    }
}

/// Walker plugin for Bevy.
#[derive(Default)]
pub struct StriderPlugin {
    pub settings: SimulationSettings,
}

/// Systems run in this order every frame.
#[derive(SystemSet, Debug, Clone, PartialEq, Eq, Hash)]
pub enum StriderSet {
    Input,
    Simulate,
    Sync,
    Camera,
    Ui,
}

impl Plugin for StriderPlugin {
    fn build(&self, app: &mut App) {
        match StriderState::new(self.settings) {
            Ok(state) => {
                app.insert_resource(state);
            }
            Err(err) => {
                log::error!("Walker failed to start: {}", err);
                return;
            }
        }

        app.insert_resource(ClearColor(Color::srgb(0.05, 0.06, 0.08)))
            .init_resource::<render::BodyEntities>()
            .init_resource::<render::SkinSlot>()
            .init_resource::<camera::CameraZoom>()
            .init_resource::<ui::TouchPad>()
            .configure_sets(
                Update,
                (
                    StriderSet::Input,
                    StriderSet::Simulate,
                    StriderSet::Sync,
                    StriderSet::Camera,
                    StriderSet::Ui,
                )
                    .chain(),
            )
            .add_systems(Startup, scene::setup_scene)
            .add_systems(Update, render::draw_ground_grid)
            .add_systems(
                Update,
                (input::keyboard_input, input::focus_lost, camera::zoom_input).in_set(StriderSet::Input),
            )
            .add_systems(Update, simulation::simulation_step.in_set(StriderSet::Simulate))
            .add_systems(
                Update,
                (render::sync_bodies, render::manage_skin)
                    .chain()
                    .in_set(StriderSet::Sync),
            )
            .add_systems(Update, camera::apply_chase_camera.in_set(StriderSet::Camera))
            .add_systems(Update, (ui::apply_theme, ui::ui_system).chain().in_set(StriderSet::Ui))
            // Fix glTF skin materials for WebGL2 compatibility
            .add_systems(PostUpdate, render::fix_materials);
    }
}

/// Main simulation state.
#[derive(Resource)]
pub struct StriderState {
    pub sim: Simulation,
    pub selected: BodyPlanSelector,
    pub last_report: Option<FrameReport>,
    pub last_error: Option<String>,
    pub paused: bool,
    pub ui_visible: bool,
}

impl StriderState {
    pub fn new(settings: SimulationSettings) -> Result<Self, AssemblyError> {
        Ok(Self {
            sim: Simulation::new(settings)?,
            selected: settings.body_plan,
            last_report: None,
            last_error: None,
            paused: false,
            ui_visible: true,
        })
    }

    /// Switch body plan, remembering the error for the panel if it is rejected.
    pub fn select(&mut self, selector: BodyPlanSelector) {
        match self.sim.select_body_plan(selector) {
            Ok(()) => {
                self.selected = selector;
                self.last_error = None;
            }
            Err(err) => {
                log::warn!("Body plan '{}' rejected: {}", selector, err);
                self.last_error = Some(err.to_string());
            }
        }
    }

    pub fn reset(&mut self) {
        if let Err(err) = self.sim.reset() {
            log::warn!("Reset failed: {}", err);
            self.last_error = Some(err.to_string());
        }
    }

    pub fn rebuild(&mut self) {
        if let Err(err) = self.sim.rebuild() {
            log::warn!("Rebuild failed: {}", err);
            self.last_error = Some(err.to_string());
        }
    }
}

#[wasm_bindgen(start)]
pub fn wasm_main() {}
