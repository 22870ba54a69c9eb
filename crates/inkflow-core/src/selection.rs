//! Selection set and manipulation handles.

use crate::geometry::{ANGLE_SNAP_INCREMENT, rotate_point, snap_angle};
use crate::shapes::{ElementId, Shape};
use kurbo::{Point, Rect, Vec2};

/// Handle hit tolerance in screen pixels.
pub const HANDLE_HIT_TOLERANCE: f64 = 8.0;

/// Distance of the rotate handle above the top edge, in canvas units.
pub const ROTATE_HANDLE_OFFSET: f64 = 25.0;

/// Smallest width or height a resize can produce.
pub const MIN_SHAPE_SIZE: f64 = 10.0;

/// One of the eight resize handles, numbered clockwise from the top-left corner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ResizeHandle(pub u8);

impl ResizeHandle {
    pub const TOP_LEFT: ResizeHandle = ResizeHandle(0);
    pub const TOP: ResizeHandle = ResizeHandle(1);
    pub const TOP_RIGHT: ResizeHandle = ResizeHandle(2);
    pub const RIGHT: ResizeHandle = ResizeHandle(3);
    pub const BOTTOM_RIGHT: ResizeHandle = ResizeHandle(4);
    pub const BOTTOM: ResizeHandle = ResizeHandle(5);
    pub const BOTTOM_LEFT: ResizeHandle = ResizeHandle(6);
    pub const LEFT: ResizeHandle = ResizeHandle(7);

    pub fn all() -> impl Iterator<Item = ResizeHandle> {
        (0..8).map(ResizeHandle)
    }

    /// Which edges this handle drags: `(left, top, right, bottom)`.
    fn edges(self) -> (bool, bool, bool, bool) {
        match self.0 % 8 {
            0 => (true, true, false, false),
            1 => (false, true, false, false),
            2 => (false, true, true, false),
            3 => (false, false, true, false),
            4 => (false, false, true, true),
            5 => (false, false, false, true),
            6 => (true, false, false, true),
            _ => (true, false, false, false),
        }
    }

    /// Position on the un-rotated bounds.
    fn anchor(self, b: Rect) -> Point {
        let c = b.center();
        match self.0 % 8 {
            0 => Point::new(b.x0, b.y0),
            1 => Point::new(c.x, b.y0),
            2 => Point::new(b.x1, b.y0),
            3 => Point::new(b.x1, c.y),
            4 => Point::new(b.x1, b.y1),
            5 => Point::new(c.x, b.y1),
            6 => Point::new(b.x0, b.y1),
            _ => Point::new(b.x0, c.y),
        }
    }
}

/// What a handle does when dragged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandleKind {
    Resize(ResizeHandle),
    Rotate,
}

/// A manipulation handle in canvas coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Handle {
    pub position: Point,
    pub kind: HandleKind,
}

impl Handle {
    pub fn hit_test(&self, point: Point, tolerance: f64) -> bool {
        self.position.distance(point) <= tolerance
    }
}

/// Resize and rotate handles for `shape`, rotated with it.
pub fn handles(shape: &Shape) -> Vec<Handle> {
    let bounds = shape.bounds();
    let center = bounds.center();
    let place = |p: Point| rotate_point(p, center, shape.rotation);
    let mut handles: Vec<Handle> = ResizeHandle::all()
        .map(|h| Handle {
            position: place(h.anchor(bounds)),
            kind: HandleKind::Resize(h),
        })
        .collect();
    handles.push(Handle {
        position: place(Point::new(center.x, bounds.y0 - ROTATE_HANDLE_OFFSET)),
        kind: HandleKind::Rotate,
    });
    handles
}

/// First handle of `shape` within `tolerance` of `point`. Rotate wins over resize.
pub fn hit_test_handles(shape: &Shape, point: Point, tolerance: f64) -> Option<HandleKind> {
    let all = handles(shape);
    all.iter()
        .rev()
        .find(|h| h.hit_test(point, tolerance))
        .map(|h| h.kind)
}

/// New bounds after dragging `handle` of `original` by `delta` (canvas units).
///
/// The delta is taken into the shape's local frame so rotated shapes resize
/// along their own axes. Width and height never drop below [`MIN_SHAPE_SIZE`];
/// the point opposite the handle keeps its canvas position.
pub fn apply_resize(original: &Shape, handle: ResizeHandle, delta: Vec2) -> Rect {
    let local = rotate_point(Point::ZERO + delta, Point::ZERO, -original.rotation).to_vec2();
    let (left, top, right, bottom) = handle.edges();
    let b = original.bounds();

    let (mut x0, mut x1) = (b.x0, b.x1);
    if right {
        x1 = (b.x1 + local.x).max(b.x0 + MIN_SHAPE_SIZE);
    } else if left {
        x0 = (b.x0 + local.x).min(b.x1 - MIN_SHAPE_SIZE);
    }
    let (mut y0, mut y1) = (b.y0, b.y1);
    if bottom {
        y1 = (b.y1 + local.y).max(b.y0 + MIN_SHAPE_SIZE);
    } else if top {
        y0 = (b.y0 + local.y).min(b.y1 - MIN_SHAPE_SIZE);
    }
    let resized = Rect::new(x0, y0, x1, y1);
    if original.rotation == 0.0 {
        return resized;
    }

    // Rotation is about the centre, which moves with the resize.
    let anchor = |r: Rect| {
        let x = if right { r.x0 } else if left { r.x1 } else { r.center().x };
        let y = if bottom { r.y0 } else if top { r.y1 } else { r.center().y };
        Point::new(x, y)
    };
    let fixed = rotate_point(anchor(b), b.center(), original.rotation);
    let moved = rotate_point(anchor(resized), resized.center(), original.rotation);
    resized + (fixed - moved)
}

/// Rotation after dragging the rotate handle from `start` to `current`.
///
/// The pointer's angular travel around the centre is added to the original
/// rotation, optionally snapped to 15° steps.
pub fn apply_rotation(original_rotation: f64, center: Point, start: Point, current: Point, snap: bool) -> f64 {
    let angle = |p: Point| (p.y - center.y).atan2(p.x - center.x).to_degrees();
    let rotation = original_rotation + angle(current) - angle(start);
    if snap {
        snap_angle(rotation, ANGLE_SNAP_INCREMENT)
    } else {
        rotation
    }
}

/// Ordered set of selected element ids.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    ids: Vec<ElementId>,
}

impl Selection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ids(&self) -> &[ElementId] {
        &self.ids
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.ids.iter().any(|s| s == id)
    }

    /// Replace the selection.
    pub fn set(&mut self, ids: impl IntoIterator<Item = ElementId>) {
        self.ids.clear();
        for id in ids {
            self.add(id);
        }
    }

    pub fn add(&mut self, id: ElementId) {
        if !self.contains(&id) {
            self.ids.push(id);
        }
    }

    /// Add if absent, remove if present.
    pub fn toggle(&mut self, id: &str) {
        if self.contains(id) {
            self.ids.retain(|s| s != id);
        } else {
            self.ids.push(id.to_string());
        }
    }

    pub fn clear(&mut self) {
        self.ids.clear();
    }

    /// Drop ids for which `exists` is false.
    pub fn retain(&mut self, exists: impl Fn(&str) -> bool) {
        self.ids.retain(|id| exists(id));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::SequentialIds;
    use crate::shapes::ShapeKind;

    fn shape() -> Shape {
        let mut ids = SequentialIds::new();
        Shape::new(&mut ids, ShapeKind::Rectangle, Rect::new(100.0, 100.0, 200.0, 150.0))
    }

    #[test]
    fn test_handle_positions() {
        let s = shape();
        let all = handles(&s);
        assert_eq!(all.len(), 9);
        assert_eq!(all[0].position, Point::new(100.0, 100.0));
        assert_eq!(all[3].position, Point::new(200.0, 125.0));
        assert_eq!(all[8].kind, HandleKind::Rotate);
        assert_eq!(all[8].position, Point::new(150.0, 75.0));
    }

    #[test]
    fn test_hit_test_handles() {
        let s = shape();
        assert_eq!(
            hit_test_handles(&s, Point::new(201.0, 151.0), 4.0),
            Some(HandleKind::Resize(ResizeHandle::BOTTOM_RIGHT))
        );
        assert_eq!(hit_test_handles(&s, Point::new(150.0, 76.0), 4.0), Some(HandleKind::Rotate));
        assert_eq!(hit_test_handles(&s, Point::new(150.0, 125.0), 4.0), None);
    }

    #[test]
    fn test_resize_each_handle() {
        let s = shape();
        let d = Vec2::new(10.0, 20.0);
        assert_eq!(apply_resize(&s, ResizeHandle::TOP_LEFT, d), Rect::new(110.0, 120.0, 200.0, 150.0));
        assert_eq!(apply_resize(&s, ResizeHandle::TOP, d), Rect::new(100.0, 120.0, 200.0, 150.0));
        assert_eq!(apply_resize(&s, ResizeHandle::TOP_RIGHT, d), Rect::new(100.0, 120.0, 210.0, 150.0));
        assert_eq!(apply_resize(&s, ResizeHandle::RIGHT, d), Rect::new(100.0, 100.0, 210.0, 150.0));
        assert_eq!(apply_resize(&s, ResizeHandle::BOTTOM_RIGHT, d), Rect::new(100.0, 100.0, 210.0, 170.0));
        assert_eq!(apply_resize(&s, ResizeHandle::BOTTOM, d), Rect::new(100.0, 100.0, 200.0, 170.0));
        assert_eq!(apply_resize(&s, ResizeHandle::BOTTOM_LEFT, d), Rect::new(110.0, 100.0, 200.0, 170.0));
        assert_eq!(apply_resize(&s, ResizeHandle::LEFT, d), Rect::new(110.0, 100.0, 200.0, 150.0));
    }

    #[test]
    fn test_resize_floors_at_minimum() {
        let s = shape();
        let r = apply_resize(&s, ResizeHandle::TOP_LEFT, Vec2::new(500.0, 500.0));
        assert!((r.width() - MIN_SHAPE_SIZE).abs() < f64::EPSILON);
        assert!((r.height() - MIN_SHAPE_SIZE).abs() < f64::EPSILON);
        // Opposite corner is anchored.
        assert!((r.x1 - 200.0).abs() < f64::EPSILON);
        assert!((r.y1 - 150.0).abs() < f64::EPSILON);

        let r = apply_resize(&s, ResizeHandle::RIGHT, Vec2::new(-500.0, 0.0));
        assert!((r.width() - MIN_SHAPE_SIZE).abs() < f64::EPSILON);
        assert!((r.x0 - 100.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_resize_rotated_uses_local_axes() {
        let mut s = shape();
        s.rotation = 90.0;
        // Rotated a quarter turn, the bottom edge faces left on screen.
        let r = apply_resize(&s, ResizeHandle::BOTTOM, Vec2::new(-10.0, 0.0));
        assert!((r.height() - 60.0).abs() < 1e-9);
    }

    #[test]
    fn test_resize_rotated_keeps_opposite_corner() {
        let mut s = shape();
        s.rotation = 90.0;
        let top_left = |s: &Shape| rotate_point(Point::new(s.x, s.y), s.center(), s.rotation);
        let before = top_left(&s);

        // A downward drag on screen is +x in the shape's frame.
        let r = apply_resize(&s, ResizeHandle::BOTTOM_RIGHT, Vec2::new(0.0, 40.0));
        assert!((r.width() - 140.0).abs() < 1e-9);
        assert!((r.height() - 50.0).abs() < 1e-9);

        let mut resized = s.clone();
        resized.set_bounds(r);
        let after = top_left(&resized);
        assert!((after - before).hypot() < 1e-9, "{before:?} -> {after:?}");
    }

    #[test]
    fn test_resize_rotated_edge_keeps_opposite_edge() {
        let mut s = shape();
        s.rotation = 30.0;
        let left_mid = |s: &Shape| rotate_point(Point::new(s.x, s.y + s.height / 2.0), s.center(), s.rotation);
        let before = left_mid(&s);

        let r = apply_resize(&s, ResizeHandle::RIGHT, Vec2::new(25.0, 10.0));
        let mut resized = s.clone();
        resized.set_bounds(r);
        assert!((left_mid(&resized) - before).hypot() < 1e-9);
    }

    #[test]
    fn test_rotation_delta_and_snap() {
        let c = Point::new(0.0, 0.0);
        let r = apply_rotation(10.0, c, Point::new(10.0, 0.0), Point::new(0.0, 10.0), false);
        assert!((r - 100.0).abs() < 1e-9);
        let r = apply_rotation(0.0, c, Point::new(10.0, 0.0), Point::new(10.0, 4.0), true);
        assert!((r - 15.0).abs() < 1e-9);
    }

    #[test]
    fn test_selection_set_ops() {
        let mut sel = Selection::new();
        sel.set(vec!["a".to_string(), "b".to_string(), "a".to_string()]);
        assert_eq!(sel.len(), 2);
        sel.toggle("a");
        assert!(!sel.contains("a"));
        sel.toggle("c");
        assert_eq!(sel.ids(), &["b".to_string(), "c".to_string()]);
        sel.retain(|id| id != "b");
        assert_eq!(sel.ids(), &["c".to_string()]);
    }
}
