//! Strider walker WASM simulation - Bevy 3D over the headless `strider-physics` core.

pub mod camera;
pub mod input;
pub mod render;
pub mod scene;
pub mod simulation;
pub mod ui;

mod web_bevy;
pub use web_bevy::{StriderPlugin, StriderSet, StriderState, WebHandle};
