//! Pointer and keyboard input consumed by the interaction machine.

use kurbo::Point;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

/// Pointer button identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PointerButton {
    Primary,
    Middle,
    Secondary,
}

/// Modifier keys state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Modifiers {
    pub shift: bool,
    pub ctrl: bool,
    pub alt: bool,
    pub meta: bool,
}

impl Modifiers {
    pub const NONE: Modifiers = Modifiers { shift: false, ctrl: false, alt: false, meta: false };

    pub fn shift() -> Self {
        Self { shift: true, ..Self::default() }
    }

    pub fn command() -> Self {
        Self { ctrl: true, ..Self::default() }
    }

    pub fn alt() -> Self {
        Self { alt: true, ..Self::default() }
    }

    /// Ctrl on most platforms, Cmd on macOS.
    pub fn is_command(&self) -> bool {
        self.ctrl || self.meta
    }

    /// Holding Alt disables grid snapping for the current drag.
    pub fn bypasses_snap(&self) -> bool {
        self.alt
    }

    /// Holding Shift snaps rotation to fixed increments.
    pub fn snaps_angle(&self) -> bool {
        self.shift
    }
}

/// A pointer event in screen coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointerInput {
    pub position: Point,
    pub button: PointerButton,
    pub modifiers: Modifiers,
    pub time: Instant,
}

impl PointerInput {
    pub fn primary(position: Point, time: Instant) -> Self {
        Self {
            position,
            button: PointerButton::Primary,
            modifiers: Modifiers::default(),
            time,
        }
    }

    pub fn with_button(mut self, button: PointerButton) -> Self {
        self.button = button;
        self
    }

    pub fn with_modifiers(mut self, modifiers: Modifiers) -> Self {
        self.modifiers = modifiers;
        self
    }
}

/// Keys the editor reacts to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Key {
    Character(char),
    Delete,
    Backspace,
    Escape,
    Enter,
}

/// A key press with the modifiers held at the time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyInput {
    pub key: Key,
    pub modifiers: Modifiers,
}

impl KeyInput {
    pub fn new(key: Key, modifiers: Modifiers) -> Self {
        Self { key, modifiers }
    }

    pub fn char(c: char) -> Self {
        Self::new(Key::Character(c.to_ascii_lowercase()), Modifiers::default())
    }

    pub fn command(c: char) -> Self {
        Self::new(Key::Character(c.to_ascii_lowercase()), Modifiers::command())
    }
}

/// Double-click detection constants.
const DOUBLE_CLICK_TIME: Duration = Duration::from_millis(500);
const DOUBLE_CLICK_DISTANCE: f64 = 5.0;

/// Detects double-clicks from a stream of primary presses.
#[derive(Debug, Clone, Default)]
pub struct ClickTracker {
    last_click: Option<(Instant, Point)>,
}

impl ClickTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a press; returns true when it completes a double-click.
    pub fn register(&mut self, position: Point, at: Instant) -> bool {
        if let Some((last_time, last_pos)) = self.last_click {
            let elapsed = at.saturating_duration_since(last_time);
            if elapsed < DOUBLE_CLICK_TIME && last_pos.distance(position) < DOUBLE_CLICK_DISTANCE {
                // Reset so a triple click is not a second double-click.
                self.last_click = None;
                return true;
            }
        }
        self.last_click = Some((at, position));
        false
    }
}
