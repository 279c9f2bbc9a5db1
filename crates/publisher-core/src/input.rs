//! Input events consumed by the tool state machine.
//!
//! Hosts either build [`InputEvent`]s directly or feed raw pointer events
//! through [`InputState`], which tracks modifiers and turns a quick second
//! click into [`InputEvent::DoubleActivate`].

use kurbo::Point;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

/// Mouse button identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MouseButton {
    Left,
    Right,
    Middle,
}

/// Modifier keys state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Modifiers {
    pub shift: bool,
    pub ctrl: bool,
    pub alt: bool,
}

impl Modifiers {
    pub const NONE: Modifiers = Modifiers {
        shift: false,
        ctrl: false,
        alt: false,
    };

    pub const SHIFT: Modifiers = Modifiers {
        shift: true,
        ctrl: false,
        alt: false,
    };
}

/// Keys the tools react to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Key {
    Escape,
    Enter,
    Delete,
    Backspace,
}

/// An input event in page coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum InputEvent {
    Press { position: Point, modifiers: Modifiers },
    Move { position: Point, modifiers: Modifiers },
    Release { position: Point, modifiers: Modifiers },
    Key { key: Key, modifiers: Modifiers },
    DoubleActivate { position: Point },
}

impl InputEvent {
    pub fn press(position: Point) -> Self {
        InputEvent::Press {
            position,
            modifiers: Modifiers::NONE,
        }
    }

    pub fn moved(position: Point) -> Self {
        InputEvent::Move {
            position,
            modifiers: Modifiers::NONE,
        }
    }

    pub fn release(position: Point) -> Self {
        InputEvent::Release {
            position,
            modifiers: Modifiers::NONE,
        }
    }

    pub fn key(key: Key) -> Self {
        InputEvent::Key {
            key,
            modifiers: Modifiers::NONE,
        }
    }

    /// Pointer position carried by the event, if any.
    pub fn position(&self) -> Option<Point> {
        match self {
            InputEvent::Press { position, .. }
            | InputEvent::Move { position, .. }
            | InputEvent::Release { position, .. }
            | InputEvent::DoubleActivate { position } => Some(*position),
            InputEvent::Key { .. } => None,
        }
    }

    pub fn modifiers(&self) -> Modifiers {
        match self {
            InputEvent::Press { modifiers, .. }
            | InputEvent::Move { modifiers, .. }
            | InputEvent::Release { modifiers, .. }
            | InputEvent::Key { modifiers, .. } => *modifiers,
            InputEvent::DoubleActivate { .. } => Modifiers::NONE,
        }
    }
}

/// Raw pointer event from the host.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum PointerEvent {
    Down { position: Point, button: MouseButton },
    Up { position: Point, button: MouseButton },
    Move { position: Point },
}

/// Double-click detection constants.
const DOUBLE_CLICK_TIME: Duration = Duration::from_millis(500);
const DOUBLE_CLICK_DISTANCE: f64 = 5.0;

/// Turns raw pointer events into tool input events.
#[derive(Debug, Clone, Default)]
pub struct InputState {
    pub modifiers: Modifiers,
    /// Whether the left button is held.
    pub is_dragging: bool,
    last_click: Option<(Instant, Point)>,
}

impl InputState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Update modifier keys state.
    pub fn set_modifiers(&mut self, modifiers: Modifiers) {
        self.modifiers = modifiers;
    }

    /// Translate a pointer event observed at `now`. Only the left button drives tools.
    pub fn process(&mut self, event: PointerEvent, now: Instant) -> Vec<InputEvent> {
        let modifiers = self.modifiers;
        match event {
            PointerEvent::Down {
                position,
                button: MouseButton::Left,
            } => {
                let double = self.last_click.is_some_and(|(time, pos)| {
                    now.duration_since(time) < DOUBLE_CLICK_TIME
                        && (position - pos).hypot() < DOUBLE_CLICK_DISTANCE
                });
                // Reset so a triple click is not a second double click.
                self.last_click = if double { None } else { Some((now, position)) };
                self.is_dragging = true;
                let mut out = vec![InputEvent::Press { position, modifiers }];
                if double {
                    out.push(InputEvent::DoubleActivate { position });
                }
                out
            }
            PointerEvent::Up {
                position,
                button: MouseButton::Left,
            } => {
                self.is_dragging = false;
                vec![InputEvent::Release { position, modifiers }]
            }
            PointerEvent::Move { position } => vec![InputEvent::Move { position, modifiers }],
            PointerEvent::Down { .. } | PointerEvent::Up { .. } => Vec::new(),
        }
    }
}
