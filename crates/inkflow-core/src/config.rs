//! Runtime settings for the editor and collaboration session.

use crate::history::MAX_UNDO_HISTORY;
use crate::shapes::{ArrowType, Routing};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Editor behaviour knobs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorSettings {
    pub grid_size: f64,
    pub snap_to_grid: bool,
    pub undo_capacity: usize,
    pub default_routing: Routing,
    pub default_arrow: ArrowType,
    pub laser_ttl_ms: u64,
    /// Radial distance used to thin freehand strokes on commit.
    pub ink_min_distance: f64,
    /// Minimum gap between two board saves.
    pub save_interval_ms: u64,
}

impl Default for EditorSettings {
    fn default() -> Self {
        Self {
            grid_size: crate::geometry::GRID_SIZE,
            snap_to_grid: true,
            undo_capacity: MAX_UNDO_HISTORY,
            default_routing: Routing::Ortho,
            default_arrow: ArrowType::Forward,
            laser_ttl_ms: 1500,
            ink_min_distance: 2.0,
            save_interval_ms: 1000,
        }
    }
}

impl EditorSettings {
    pub fn laser_ttl(&self) -> Duration {
        Duration::from_millis(self.laser_ttl_ms)
    }

    pub fn save_interval(&self) -> Duration {
        Duration::from_millis(self.save_interval_ms)
    }
}

/// Collaboration timing and endpoint settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Negotiate endpoint queried for a one-time socket URL.
    pub negotiate_url: String,
    pub reconnect_delay_ms: u64,
    pub cursor_throttle_ms: u64,
    /// Wait between joining the room group and announcing ourselves.
    pub announce_delay_ms: u64,
    /// How long a peer stays highlighted as editing after a cursor update.
    pub editing_hold_ms: u64,
    /// Interval between presence re-announcements.
    pub heartbeat_ms: u64,
    /// Peers silent for this long are dropped from the roster.
    pub peer_timeout_ms: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            negotiate_url: "http://localhost:3030/negotiate".to_string(),
            reconnect_delay_ms: 3000,
            cursor_throttle_ms: 50,
            announce_delay_ms: 250,
            editing_hold_ms: 1000,
            heartbeat_ms: 5000,
            peer_timeout_ms: 15000,
        }
    }
}

impl SessionConfig {
    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect_delay_ms)
    }

    pub fn cursor_throttle(&self) -> Duration {
        Duration::from_millis(self.cursor_throttle_ms)
    }

    pub fn announce_delay(&self) -> Duration {
        Duration::from_millis(self.announce_delay_ms)
    }

    pub fn editing_hold(&self) -> Duration {
        Duration::from_millis(self.editing_hold_ms)
    }

    pub fn heartbeat(&self) -> Duration {
        Duration::from_millis(self.heartbeat_ms)
    }

    pub fn peer_timeout(&self) -> Duration {
        Duration::from_millis(self.peer_timeout_ms)
    }
}
