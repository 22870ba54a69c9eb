//! Fading laser-pointer trail.
//!
//! The trail drives its own frame loop: pushing a point requests a tick if
//! none is pending, and every tick expires old points and asks for another
//! tick only while something is left to draw. Each request supersedes the
//! previous one, so at most one loop is ever live.

use kurbo::Point;
use std::collections::VecDeque;
use std::time::{Duration, Instant};

/// How long a trail point stays visible.
pub const LASER_TTL: Duration = Duration::from_millis(1500);

/// Handle for a scheduled frame. Ticks with a stale handle are ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickHandle(u64);

/// Timestamped laser points plus the scheduling state of their fade loop.
#[derive(Debug, Clone)]
pub struct LaserTrail {
    points: VecDeque<(Point, Instant)>,
    ttl: Duration,
    generation: u64,
    pending: Option<TickHandle>,
}

impl Default for LaserTrail {
    fn default() -> Self {
        Self::with_ttl(LASER_TTL)
    }
}

impl LaserTrail {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            points: VecDeque::new(),
            ttl,
            generation: 0,
            pending: None,
        }
    }

    /// Add a point. Returns a handle when the caller must schedule a frame.
    pub fn push(&mut self, point: Point, at: Instant) -> Option<TickHandle> {
        self.points.push_back((point, at));
        if self.pending.is_some() {
            return None;
        }
        Some(self.schedule())
    }

    /// Run one frame of the fade loop.
    ///
    /// Returns the handle for the next frame, or `None` once the trail is
    /// empty (or `handle` was superseded).
    pub fn tick(&mut self, handle: TickHandle, now: Instant) -> Option<TickHandle> {
        if self.pending != Some(handle) {
            return None;
        }
        self.pending = None;
        self.expire(now);
        if self.points.is_empty() {
            return None;
        }
        Some(self.schedule())
    }

    /// Cancel any pending frame and drop all points.
    pub fn clear(&mut self) {
        self.points.clear();
        self.pending = None;
        self.generation += 1;
    }

    /// Visible points with their remaining opacity in `[0, 1]`.
    pub fn visible(&self, now: Instant) -> Vec<(Point, f64)> {
        let ttl = self.ttl.as_secs_f64();
        self.points
            .iter()
            .filter_map(|&(p, at)| {
                let age = now.saturating_duration_since(at).as_secs_f64();
                (age < ttl).then(|| (p, 1.0 - age / ttl))
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Whether a frame is currently scheduled.
    pub fn is_animating(&self) -> bool {
        self.pending.is_some()
    }

    fn expire(&mut self, now: Instant) {
        while let Some(&(_, at)) = self.points.front() {
            if now.saturating_duration_since(at) >= self.ttl {
                self.points.pop_front();
            } else {
                break;
            }
        }
    }

    fn schedule(&mut self) -> TickHandle {
        self.generation += 1;
        let handle = TickHandle(self.generation);
        self.pending = Some(handle);
        handle
    }
}
