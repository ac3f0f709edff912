//! Steering intent derived from held logical keys.
//!
//! Input devices are not touched here: the frontend normalises keyboard and touch
//! events into [`InputEvent`]s and folds them through [`IntentState::apply`].

use serde::{Deserialize, Serialize};

/// Logical control keys (`w/a/s/d/shift/space`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogicalKey {
    Forward,
    Back,
    TurnLeft,
    TurnRight,
    Turbo,
    Jump,
}

impl LogicalKey {
    pub const ALL: [LogicalKey; 6] = [
        LogicalKey::Forward,
        LogicalKey::Back,
        LogicalKey::TurnLeft,
        LogicalKey::TurnRight,
        LogicalKey::Turbo,
        LogicalKey::Jump,
    ];

    /// Map a raw key name to a logical key. Unknown names map to `None`.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "w" | "arrowup" => Some(LogicalKey::Forward),
            "s" | "arrowdown" => Some(LogicalKey::Back),
            "a" | "arrowleft" => Some(LogicalKey::TurnLeft),
            "d" | "arrowright" => Some(LogicalKey::TurnRight),
            "shift" | "shiftleft" | "shiftright" => Some(LogicalKey::Turbo),
            " " | "space" => Some(LogicalKey::Jump),
            _ => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            LogicalKey::Forward => "W",
            LogicalKey::Back => "S",
            LogicalKey::TurnLeft => "A",
            LogicalKey::TurnRight => "D",
            LogicalKey::Turbo => "Shift",
            LogicalKey::Jump => "Space",
        }
    }
}

/// Key or touch transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InputEvent {
    Pressed(LogicalKey),
    Released(LogicalKey),
}

/// Normalised steering vector consumed by the controllers.
///
/// `forward` and `turn` only ever take the values -1, 0 or 1.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct IntentVector {
    pub forward: f32,
    pub turn: f32,
    pub turbo: bool,
    pub jump: bool,
}

impl IntentVector {
    pub const IDLE: Self = Self {
        forward: 0.0,
        turn: 0.0,
        turbo: false,
        jump: false,
    };

    pub fn new(forward: i8, turn: i8, turbo: bool, jump: bool) -> Self {
        Self {
            forward: f32::from(forward.signum()),
            turn: f32::from(turn.signum()),
            turbo,
            jump,
        }
    }

    pub fn is_idle(&self) -> bool {
        *self == Self::IDLE
    }
}

/// Set of currently held logical keys plus the intent derived from it.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct IntentState {
    held: [bool; 6],
    intent: IntentVector,
}

impl IntentState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one event into the state. Pure: the receiver is consumed and a new
    /// state returned.
    pub fn apply(mut self, event: InputEvent) -> Self {
        match event {
            InputEvent::Pressed(key) => self.held[key as usize] = true,
            InputEvent::Released(key) => self.held[key as usize] = false,
        }
        self.intent = self.derive();
        self
    }

    /// Release everything (focus loss, body plan switch).
    pub fn clear(self) -> Self {
        Self::default()
    }

    pub fn is_held(&self, key: LogicalKey) -> bool {
        self.held[key as usize]
    }

    pub fn intent(&self) -> IntentVector {
        self.intent
    }

    fn derive(&self) -> IntentVector {
        let axis = |pos: LogicalKey, neg: LogicalKey| -> i8 {
            i8::from(self.is_held(pos)) - i8::from(self.is_held(neg))
        };
        IntentVector::new(
            axis(LogicalKey::Forward, LogicalKey::Back),
            axis(LogicalKey::TurnLeft, LogicalKey::TurnRight),
            self.is_held(LogicalKey::Turbo),
            self.is_held(LogicalKey::Jump),
        )
    }
}
