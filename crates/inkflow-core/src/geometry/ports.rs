//! Port placement and orientation.

use crate::shapes::{Port, PortSide, Shape, ShapeKind};
use kurbo::{Point, Vec2};

/// Absolute position of `port` on `shape`.
///
/// With `include_rotation == false` the point is in the shape's local
/// (un-rotated) frame, for drawing inside an already rotated group.
pub fn port_position(shape: &Shape, port: &Port, include_rotation: bool) -> Point {
    let t = port.offset.clamp(0.0, 1.0);
    let local = match shape.kind {
        ShapeKind::Rectangle | ShapeKind::Text => rect_port(shape, port.side, t),
        ShapeKind::Ellipse => ellipse_port(shape, port.side, t),
        ShapeKind::Diamond => diamond_port(shape, port.side, t),
    };
    if include_rotation && shape.rotation.rem_euclid(360.0) != 0.0 {
        super::rotate_point(local, shape.center(), shape.rotation)
    } else {
        local
    }
}

/// Port closest to `point` (canvas space). The first port wins ties.
pub fn nearest_port<'a>(shape: &'a Shape, point: Point) -> Option<&'a Port> {
    let mut best: Option<(&Port, f64)> = None;
    for port in &shape.ports {
        let dist = port_position(shape, port, true).distance(point);
        if best.is_none_or(|(_, d)| dist < d) {
            best = Some((port, dist));
        }
    }
    best.map(|(port, _)| port)
}

/// Outward direction at `port`, rotated with the shape. Not normalized.
pub fn port_outward_normal(shape: &Shape, port: &Port) -> Vec2 {
    let t = port.offset.clamp(0.0, 1.0);
    let local = match shape.kind {
        ShapeKind::Rectangle | ShapeKind::Text => port.side.normal(),
        ShapeKind::Ellipse => {
            let v = ellipse_port(shape, port.side, t) - shape.center();
            if v.hypot2() > 0.0 { v } else { port.side.normal() }
        }
        ShapeKind::Diamond => diamond_normal(shape, port.side, t),
    };
    rotate_vec(local, shape.rotation)
}

fn rect_port(shape: &Shape, side: PortSide, t: f64) -> Point {
    let b = shape.bounds();
    match side {
        PortSide::Top => Point::new(b.x0 + b.width() * t, b.y0),
        PortSide::Right => Point::new(b.x1, b.y0 + b.height() * t),
        PortSide::Bottom => Point::new(b.x0 + b.width() * t, b.y1),
        PortSide::Left => Point::new(b.x0, b.y0 + b.height() * t),
    }
}

/// Each side covers a 90° arc centred on its direction (right = 0°,
/// top = 90°), traversed in the same direction as `rect_port`.
fn ellipse_port(shape: &Shape, side: PortSide, t: f64) -> Point {
    let (base, sign) = match side {
        PortSide::Right => (0.0, -1.0),
        PortSide::Top => (90.0, -1.0),
        PortSide::Left => (180.0, 1.0),
        PortSide::Bottom => (270.0, 1.0),
    };
    let theta = (base + sign * (t - 0.5) * 90.0_f64).to_radians();
    let c = shape.center();
    let (rx, ry) = (shape.width / 2.0, shape.height / 2.0);
    // Canvas y grows downward, so positive angles go up.
    Point::new(c.x + rx * theta.cos(), c.y - ry * theta.sin())
}

struct DiamondVertices {
    top: Point,
    right: Point,
    bottom: Point,
    left: Point,
}

fn diamond_vertices(shape: &Shape) -> DiamondVertices {
    let b = shape.bounds();
    let c = b.center();
    DiamondVertices {
        top: Point::new(c.x, b.y0),
        right: Point::new(b.x1, c.y),
        bottom: Point::new(c.x, b.y1),
        left: Point::new(b.x0, c.y),
    }
}

/// `(start, vertex, end)` for the two half-edges a side maps onto.
fn diamond_chain(v: &DiamondVertices, side: PortSide) -> (Point, Point, Point) {
    match side {
        PortSide::Top => (v.left, v.top, v.right),
        PortSide::Right => (v.top, v.right, v.bottom),
        PortSide::Bottom => (v.left, v.bottom, v.right),
        PortSide::Left => (v.top, v.left, v.bottom),
    }
}

fn diamond_port(shape: &Shape, side: PortSide, t: f64) -> Point {
    let (start, vertex, end) = diamond_chain(&diamond_vertices(shape), side);
    if t <= 0.5 {
        start.lerp(vertex, t * 2.0)
    } else {
        vertex.lerp(end, (t - 0.5) * 2.0)
    }
}

/// Per-edge normals: perpendicular to each diamond edge, pointing away from
/// the centre. At the vertex itself the side's axis normal is used.
fn diamond_normal(shape: &Shape, side: PortSide, t: f64) -> Vec2 {
    let (w, h) = (shape.width, shape.height);
    if t == 0.5 || (w == 0.0 && h == 0.0) {
        return side.normal();
    }
    let upper_left = Vec2::new(-h, -w);
    let upper_right = Vec2::new(h, -w);
    let lower_right = Vec2::new(h, w);
    let lower_left = Vec2::new(-h, w);
    let first_half = t < 0.5;
    match (side, first_half) {
        (PortSide::Top, true) => upper_left,
        (PortSide::Top, false) => upper_right,
        (PortSide::Right, true) => upper_right,
        (PortSide::Right, false) => lower_right,
        (PortSide::Bottom, true) => lower_left,
        (PortSide::Bottom, false) => lower_right,
        (PortSide::Left, true) => upper_left,
        (PortSide::Left, false) => lower_left,
    }
}

fn rotate_vec(v: Vec2, degrees: f64) -> Vec2 {
    let (sin, cos) = degrees.to_radians().sin_cos();
    Vec2::new(v.x * cos - v.y * sin, v.x * sin + v.y * cos)
}
