//! Keyboard input for the walker.
//!
//! Key transitions become [`InputEvent`]s; the core derives the intent from them.

use bevy::prelude::*;
use bevy::window::WindowFocused;

use strider_physics::{InputEvent, LogicalKey};

use crate::ui::TouchPad;
use crate::web_bevy::StriderState;

const KEY_MAP: [(KeyCode, LogicalKey); 11] = [
    (KeyCode::KeyW, LogicalKey::Forward),
    (KeyCode::ArrowUp, LogicalKey::Forward),
    (KeyCode::KeyS, LogicalKey::Back),
    (KeyCode::ArrowDown, LogicalKey::Back),
    (KeyCode::KeyA, LogicalKey::TurnLeft),
    (KeyCode::ArrowLeft, LogicalKey::TurnLeft),
    (KeyCode::KeyD, LogicalKey::TurnRight),
    (KeyCode::ArrowRight, LogicalKey::TurnRight),
    (KeyCode::ShiftLeft, LogicalKey::Turbo),
    (KeyCode::ShiftRight, LogicalKey::Turbo),
    (KeyCode::Space, LogicalKey::Jump),
];

/// Whether any key bound to `key` is down.
pub fn keyboard_holds(keyboard: &ButtonInput<KeyCode>, key: LogicalKey) -> bool {
    KEY_MAP.iter().any(|(code, k)| *k == key && keyboard.pressed(*code))
}

/// Forward key transitions to the simulation
pub fn keyboard_input(mut state: ResMut<StriderState>, keyboard: Res<ButtonInput<KeyCode>>, pad: Res<TouchPad>) {
    if keyboard.just_pressed(KeyCode::Tab) {
        state.ui_visible = !state.ui_visible;
    }
    if keyboard.just_pressed(KeyCode::KeyP) {
        state.paused = !state.paused;
    }
    if keyboard.just_pressed(KeyCode::Backspace) {
        state.reset();
    }

    for (code, key) in KEY_MAP {
        if keyboard.just_pressed(code) {
            state.sim.handle_input(InputEvent::Pressed(key));
        }
        if keyboard.just_released(code) {
            // Aliased keys share a logical key; keep it held while the other is down.
            if !keyboard_holds(&keyboard, key) && !pad.holds(key) {
                state.sim.handle_input(InputEvent::Released(key));
            }
        }
    }
}

/// Release everything when the canvas loses focus so no key sticks down
pub fn focus_lost(mut state: ResMut<StriderState>, mut events: EventReader<WindowFocused>) {
    if events.read().any(|event| !event.focused) {
        state.sim.release_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_aliases_hold_the_same_key() {
        let mut keyboard = ButtonInput::<KeyCode>::default();
        assert!(!keyboard_holds(&keyboard, LogicalKey::Forward));

        keyboard.press(KeyCode::ArrowUp);
        assert!(keyboard_holds(&keyboard, LogicalKey::Forward));
        assert!(!keyboard_holds(&keyboard, LogicalKey::Back));

        keyboard.press(KeyCode::KeyW);
        keyboard.release(KeyCode::ArrowUp);
        assert!(keyboard_holds(&keyboard, LogicalKey::Forward));

        keyboard.release(KeyCode::KeyW);
        assert!(!keyboard_holds(&keyboard, LogicalKey::Forward));
    }
}
