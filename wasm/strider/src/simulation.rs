//! Simulation step for the walker.
//!
//! One core tick per rendered frame; the core clamps the frame delta itself.

use bevy::prelude::*;

use crate::web_bevy::StriderState;

/// Run gait, drive, physics and chase camera for this frame
pub fn simulation_step(mut state: ResMut<StriderState>, time: Res<Time>) {
    if state.paused {
        return;
    }

    match state.sim.tick(time.delta_secs()) {
        Ok(report) => state.last_report = Some(report),
        Err(err) => {
            log::error!("Simulation tick failed: {}", err);
            state.last_error = Some(err.to_string());
            state.paused = true;
        }
    }
}
