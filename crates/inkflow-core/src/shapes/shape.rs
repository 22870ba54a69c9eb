//! Box-like shapes with connector ports.

use super::{ElementId, ElementStyle};
use crate::ids::IdGenerator;
use kurbo::{Affine, Point, Rect, Size, Vec2};
use serde::{Deserialize, Serialize};

/// The kind of a box-like shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShapeKind {
    Rectangle,
    Ellipse,
    Diamond,
    Text,
}

impl ShapeKind {
    /// Size used when a create drag is too small to be meaningful.
    pub fn default_size(self) -> Size {
        match self {
            ShapeKind::Rectangle => Size::new(160.0, 80.0),
            ShapeKind::Ellipse => Size::new(120.0, 80.0),
            ShapeKind::Diamond => Size::new(120.0, 120.0),
            ShapeKind::Text => Size::new(160.0, 40.0),
        }
    }
}

/// Side of a shape's bounding box a port lives on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PortSide {
    Top,
    Right,
    Bottom,
    Left,
}

impl PortSide {
    pub const ALL: [PortSide; 4] = [PortSide::Top, PortSide::Right, PortSide::Bottom, PortSide::Left];

    /// Axis-aligned outward unit vector (y grows downward).
    pub fn normal(self) -> Vec2 {
        match self {
            PortSide::Top => Vec2::new(0.0, -1.0),
            PortSide::Right => Vec2::new(1.0, 0.0),
            PortSide::Bottom => Vec2::new(0.0, 1.0),
            PortSide::Left => Vec2::new(-1.0, 0.0),
        }
    }

    /// True for left/right.
    pub fn is_horizontal(self) -> bool {
        matches!(self, PortSide::Left | PortSide::Right)
    }

    pub fn opposite(self) -> Self {
        match self {
            PortSide::Top => PortSide::Bottom,
            PortSide::Right => PortSide::Left,
            PortSide::Bottom => PortSide::Top,
            PortSide::Left => PortSide::Right,
        }
    }

    /// The side whose outward normal best matches `direction`.
    pub fn facing(direction: Vec2) -> Self {
        if direction.x.abs() >= direction.y.abs() {
            if direction.x >= 0.0 { PortSide::Right } else { PortSide::Left }
        } else if direction.y >= 0.0 {
            PortSide::Bottom
        } else {
            PortSide::Top
        }
    }
}

/// A parametrized attachment point along one side of a shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Port {
    /// Unique within the owning shape.
    pub id: ElementId,
    pub side: PortSide,
    /// Position along the side in `[0, 1]`; top/bottom run left to right,
    /// left/right run top to bottom.
    pub offset: f64,
}

/// One port at the midpoint of every side.
pub fn default_ports(ids: &mut dyn IdGenerator) -> Vec<Port> {
    PortSide::ALL
        .iter()
        .map(|&side| Port {
            id: ids.next_id("port"),
            side,
            offset: 0.5,
        })
        .collect()
}

/// A rectangle, ellipse, diamond or text block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Shape {
    pub id: ElementId,
    pub kind: ShapeKind,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    /// Degrees about the centre, clockwise on screen. Unconstrained range.
    #[serde(default)]
    pub rotation: f64,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub style: ElementStyle,
    #[serde(default)]
    pub ports: Vec<Port>,
    #[serde(default)]
    pub z_index: i64,
    #[serde(default)]
    pub created_by: Option<String>,
}

impl Shape {
    /// Create a shape covering `rect` with the default port set.
    pub fn new(ids: &mut dyn IdGenerator, kind: ShapeKind, rect: Rect) -> Self {
        let rect = rect.abs();
        Self {
            id: ids.next_id("shape"),
            kind,
            x: rect.x0,
            y: rect.y0,
            width: rect.width(),
            height: rect.height(),
            rotation: 0.0,
            text: String::new(),
            style: ElementStyle::default(),
            ports: default_ports(ids),
            z_index: 0,
            created_by: None,
        }
    }

    /// Un-rotated bounding box.
    pub fn bounds(&self) -> Rect {
        Rect::new(self.x, self.y, self.x + self.width, self.y + self.height)
    }

    pub fn center(&self) -> Point {
        self.bounds().center()
    }

    /// Transform from the shape's local frame to canvas space.
    pub fn rotation_transform(&self) -> Affine {
        Affine::rotate_about(self.rotation.to_radians(), self.center())
    }

    /// Bounding box of the rotated shape.
    pub fn rotated_bounds(&self) -> Rect {
        if self.rotation.rem_euclid(360.0) == 0.0 {
            return self.bounds();
        }
        self.rotation_transform().transform_rect_bbox(self.bounds())
    }

    /// Whether `point` lies inside the (rotated) bounding box.
    pub fn contains_point(&self, point: Point) -> bool {
        let local = self.rotation_transform().inverse() * point;
        self.bounds().contains(local) || on_max_edge(self.bounds(), local)
    }

    pub fn port(&self, port_id: &str) -> Option<&Port> {
        self.ports.iter().find(|p| p.id == port_id)
    }

    /// Port on `side` closest to the side's midpoint.
    pub fn port_on_side(&self, side: PortSide) -> Option<&Port> {
        self.ports
            .iter()
            .filter(|p| p.side == side)
            .min_by(|a, b| (a.offset - 0.5).abs().total_cmp(&(b.offset - 0.5).abs()))
    }

    /// Replace every port id, keeping sides and offsets. Returns `(old, new)` pairs.
    pub fn regenerate_ports(&mut self, ids: &mut dyn IdGenerator) -> Vec<(ElementId, ElementId)> {
        if self.ports.is_empty() {
            self.ports = default_ports(ids);
            return Vec::new();
        }
        self.ports
            .iter_mut()
            .map(|port| {
                let fresh = ids.next_id("port");
                (std::mem::replace(&mut port.id, fresh.clone()), fresh)
            })
            .collect()
    }

    pub fn translate(&mut self, delta: Vec2) {
        self.x += delta.x;
        self.y += delta.y;
    }

    pub fn set_bounds(&mut self, rect: Rect) {
        self.x = rect.x0;
        self.y = rect.y0;
        self.width = rect.width();
        self.height = rect.height();
    }
}

// `Rect::contains` excludes the max edges.
fn on_max_edge(rect: Rect, p: Point) -> bool {
    (p.x == rect.x1 && p.y >= rect.y0 && p.y <= rect.y1)
        || (p.y == rect.y1 && p.x >= rect.x0 && p.x <= rect.x1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::SequentialIds;

    #[test]
    fn test_new_shape_has_four_ports() {
        let mut ids = SequentialIds::new();
        let shape = Shape::new(&mut ids, ShapeKind::Rectangle, Rect::new(10.0, 10.0, 110.0, 60.0));
        assert_eq!(shape.ports.len(), 4);
        for side in PortSide::ALL {
            assert!(shape.port_on_side(side).is_some());
        }
        assert!((shape.width - 100.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_new_shape_normalizes_rect() {
        let mut ids = SequentialIds::new();
        let shape = Shape::new(&mut ids, ShapeKind::Ellipse, Rect::new(50.0, 50.0, 10.0, 20.0));
        assert!((shape.x - 10.0).abs() < f64::EPSILON);
        assert!((shape.y - 20.0).abs() < f64::EPSILON);
        assert!((shape.height - 30.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_contains_point_rotated() {
        let mut ids = SequentialIds::new();
        let mut shape = Shape::new(&mut ids, ShapeKind::Rectangle, Rect::new(0.0, 40.0, 100.0, 60.0));
        // Thin horizontal bar; (50, 5) is outside until rotated upright.
        assert!(!shape.contains_point(Point::new(50.0, 5.0)));
        shape.rotation = 90.0;
        assert!(shape.contains_point(Point::new(50.0, 5.0)));
        assert!(!shape.contains_point(Point::new(5.0, 50.0)));
    }

    #[test]
    fn test_regenerate_ports_keeps_layout() {
        let mut ids = SequentialIds::new();
        let mut shape = Shape::new(&mut ids, ShapeKind::Diamond, Rect::new(0.0, 0.0, 10.0, 10.0));
        let before = shape.ports.clone();
        let mapping = shape.regenerate_ports(&mut ids);
        assert_eq!(mapping.len(), 4);
        for (old, new) in before.iter().zip(&shape.ports) {
            assert_ne!(old.id, new.id);
            assert_eq!(old.side, new.side);
        }
    }

    #[test]
    fn test_missing_optional_fields_default() {
        let json = r#"{"id":"s1","kind":"rectangle","x":1,"y":2,"width":3,"height":4}"#;
        let shape: Shape = serde_json::from_str(json).unwrap();
        assert!(shape.rotation.abs() < f64::EPSILON);
        assert!(shape.ports.is_empty());
        assert_eq!(shape.z_index, 0);
    }

    #[test]
    fn test_side_facing() {
        assert_eq!(PortSide::facing(Vec2::new(5.0, 1.0)), PortSide::Right);
        assert_eq!(PortSide::facing(Vec2::new(-5.0, 1.0)), PortSide::Left);
        assert_eq!(PortSide::facing(Vec2::new(0.0, -3.0)), PortSide::Top);
        assert_eq!(PortSide::facing(Vec2::new(1.0, 3.0)), PortSide::Bottom);
    }
}
