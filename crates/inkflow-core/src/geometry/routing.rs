//! Connector routing.

use super::ports::{port_outward_normal, port_position};
use crate::document::CanvasState;
use crate::shapes::{Connector, ConnectorEnd, PortSide, Routing, point_to_polyline_dist};
use kurbo::{CubicBez, ParamCurve, Point, Vec2};

/// Distance an orthogonal route travels straight out of a port before turning.
pub const ORTHO_GAP: f64 = 20.0;

/// Minimum distance of a default control point from its end.
const MIN_CONTROL_DISTANCE: f64 = 30.0;

/// Fraction of the end-to-end distance used for control point placement.
const CONTROL_DISTANCE_RATIO: f64 = 0.4;

/// Samples used when measuring distance to a curve.
const CURVE_SAMPLES: usize = 32;

/// Axis-aligned polyline from `from` to `to`.
///
/// Both ends first extend [`ORTHO_GAP`] along their side's normal. Sides on
/// the same axis produce an S-shape through the midpoint; perpendicular
/// sides produce an L-shape with a single corner.
pub fn orthogonal_path(from: Point, to: Point, from_side: PortSide, to_side: PortSide) -> Vec<Point> {
    let a = from + from_side.normal() * ORTHO_GAP;
    let b = to + to_side.normal() * ORTHO_GAP;
    let mut path = vec![from, a];
    match (from_side.is_horizontal(), to_side.is_horizontal()) {
        (true, true) => {
            let mid_x = (a.x + b.x) / 2.0;
            path.push(Point::new(mid_x, a.y));
            path.push(Point::new(mid_x, b.y));
        }
        (false, false) => {
            let mid_y = (a.y + b.y) / 2.0;
            path.push(Point::new(a.x, mid_y));
            path.push(Point::new(b.x, mid_y));
        }
        (true, false) => path.push(Point::new(b.x, a.y)),
        (false, true) => path.push(Point::new(a.x, b.y)),
    }
    path.push(b);
    path.push(to);
    path
}

/// Bezier control points that leave each end along its outward normal.
///
/// Ends without a usable normal fall back to 1/3 and 2/3 along the
/// straight line.
pub fn default_control_points(
    source: Point,
    target: Point,
    source_normal: Option<Vec2>,
    target_normal: Option<Vec2>,
) -> [Point; 2] {
    let distance = source.distance(target);
    let reach = MIN_CONTROL_DISTANCE.max(CONTROL_DISTANCE_RATIO * distance);
    let line = target - source;
    let c1 = match source_normal.and_then(unit) {
        Some(n) => source + n * reach,
        None => source + line / 3.0,
    };
    let c2 = match target_normal.and_then(unit) {
        Some(n) => target + n * reach,
        None => source + line * (2.0 / 3.0),
    };
    [c1, c2]
}

fn unit(v: Vec2) -> Option<Vec2> {
    let len = v.hypot();
    (len > f64::EPSILON).then(|| v / len)
}

/// A connector end resolved against the current document.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResolvedEnd {
    pub point: Point,
    /// Outward normal when bound to a port.
    pub normal: Option<Vec2>,
}

/// Resolve `end` to canvas coordinates. Dangling shape or port ids yield `None`.
pub fn resolve_end(state: &CanvasState, end: &ConnectorEnd) -> Option<ResolvedEnd> {
    match end {
        ConnectorEnd::Free(point) => Some(ResolvedEnd { point: *point, normal: None }),
        ConnectorEnd::Bound { shape_id, port_id } => {
            let shape = state.shape(shape_id)?;
            let port = shape.port(port_id)?;
            Some(ResolvedEnd {
                point: port_position(shape, port, true),
                normal: Some(port_outward_normal(shape, port)),
            })
        }
    }
}

/// Render-time geometry of a connector.
#[derive(Debug, Clone, PartialEq)]
pub enum ConnectorRoute {
    Polyline(Vec<Point>),
    Curve(CubicBez),
}

impl ConnectorRoute {
    pub fn start(&self) -> Point {
        match self {
            ConnectorRoute::Polyline(points) => points.first().copied().unwrap_or(Point::ZERO),
            ConnectorRoute::Curve(c) => c.p0,
        }
    }

    pub fn end(&self) -> Point {
        match self {
            ConnectorRoute::Polyline(points) => points.last().copied().unwrap_or(Point::ZERO),
            ConnectorRoute::Curve(c) => c.p3,
        }
    }
}

/// Compute the route of `connector`, or `None` if either end dangles.
pub fn connector_route(state: &CanvasState, connector: &Connector) -> Option<ConnectorRoute> {
    let source = resolve_end(state, &connector.source)?;
    let target = resolve_end(state, &connector.target)?;
    let route = match connector.routing {
        Routing::Straight => ConnectorRoute::Polyline(vec![source.point, target.point]),
        Routing::Ortho => {
            let from_side = side_for(source, target.point);
            let to_side = side_for(target, source.point);
            ConnectorRoute::Polyline(orthogonal_path(source.point, target.point, from_side, to_side))
        }
        Routing::Smooth => {
            let [c1, c2] = connector.control_points.unwrap_or_else(|| {
                default_control_points(source.point, target.point, source.normal, target.normal)
            });
            ConnectorRoute::Curve(CubicBez::new(source.point, c1, c2, target.point))
        }
    };
    Some(route)
}

// Rotated ports exit along the axis nearest their normal; free ends face the other end.
fn side_for(end: ResolvedEnd, other: Point) -> PortSide {
    match end.normal {
        Some(n) if n.hypot2() > 0.0 => PortSide::facing(n),
        _ => PortSide::facing(other - end.point),
    }
}

/// Shortest distance from `point` to a route.
pub fn route_distance(route: &ConnectorRoute, point: Point) -> f64 {
    match route {
        ConnectorRoute::Polyline(points) => point_to_polyline_dist(point, points),
        ConnectorRoute::Curve(curve) => {
            let samples: Vec<Point> = (0..=CURVE_SAMPLES)
                .map(|i| curve.eval(i as f64 / CURVE_SAMPLES as f64))
                .collect();
            point_to_polyline_dist(point, &samples)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::SequentialIds;
    use crate::shapes::{Shape, ShapeKind};
    use kurbo::Rect;

    fn is_axis_aligned(path: &[Point]) -> bool {
        path.windows(2).all(|w| w[0].x == w[1].x || w[0].y == w[1].y)
    }

    #[test]
    fn test_ortho_s_shape() {
        let path = orthogonal_path(Point::new(0.0, 0.0), Point::new(200.0, 100.0), PortSide::Right, PortSide::Left);
        assert_eq!(path.len(), 6);
        assert_eq!(path[1], Point::new(20.0, 0.0));
        assert_eq!(path[2], Point::new(100.0, 0.0));
        assert_eq!(path[3], Point::new(100.0, 100.0));
        assert_eq!(path[4], Point::new(180.0, 100.0));
        assert!(is_axis_aligned(&path));
    }

    #[test]
    fn test_ortho_l_shape() {
        let path = orthogonal_path(Point::new(0.0, 0.0), Point::new(200.0, 100.0), PortSide::Right, PortSide::Top);
        assert_eq!(path.len(), 5);
        assert_eq!(path[2], Point::new(200.0, 0.0));
        assert_eq!(path[3], Point::new(200.0, 80.0));
        assert!(is_axis_aligned(&path));

        let path = orthogonal_path(Point::new(0.0, 0.0), Point::new(200.0, 100.0), PortSide::Bottom, PortSide::Left);
        assert_eq!(path[2], Point::new(0.0, 100.0));
        assert!(is_axis_aligned(&path));
    }

    #[test]
    fn test_ortho_vertical_s_shape() {
        let path = orthogonal_path(Point::new(0.0, 0.0), Point::new(50.0, 200.0), PortSide::Bottom, PortSide::Top);
        assert_eq!(path[2], Point::new(0.0, 100.0));
        assert_eq!(path[3], Point::new(50.0, 100.0));
        assert!(is_axis_aligned(&path));
    }

    #[test]
    fn test_control_points_follow_normals() {
        let [c1, c2] = default_control_points(
            Point::new(0.0, 0.0),
            Point::new(200.0, 0.0),
            Some(Vec2::new(0.0, -5.0)),
            Some(Vec2::new(0.0, 1.0)),
        );
        // 0.4 * 200 = 80 > 30
        assert!((c1.y + 80.0).abs() < 1e-10);
        assert!((c2.y - 80.0).abs() < 1e-10);
        assert!((c2.x - 200.0).abs() < 1e-10);
    }

    #[test]
    fn test_control_points_minimum_reach() {
        let [c1, _] = default_control_points(Point::ZERO, Point::new(10.0, 0.0), Some(Vec2::new(1.0, 0.0)), None);
        assert!((c1.x - 30.0).abs() < 1e-10);
    }

    #[test]
    fn test_control_points_fallback_thirds() {
        let [c1, c2] = default_control_points(Point::ZERO, Point::new(90.0, 30.0), None, Some(Vec2::ZERO));
        assert!((c1.x - 30.0).abs() < 1e-10 && (c1.y - 10.0).abs() < 1e-10);
        assert!((c2.x - 60.0).abs() < 1e-10 && (c2.y - 20.0).abs() < 1e-10);
    }

    #[test]
    fn test_dangling_route_is_none() {
        let mut ids = SequentialIds::new();
        let mut state = CanvasState::default();
        let shape = Shape::new(&mut ids, ShapeKind::Rectangle, Rect::new(0.0, 0.0, 50.0, 50.0));
        let port_id = shape.ports[0].id.clone();
        let shape_id = shape.id.clone();
        state.shapes.push(shape);

        let ok = Connector::new("c1".into(), ConnectorEnd::bound(&shape_id, &port_id), ConnectorEnd::Free(Point::new(200.0, 200.0)));
        assert!(connector_route(&state, &ok).is_some());

        let missing_shape = Connector::new("c2".into(), ConnectorEnd::bound("ghost", &port_id), ConnectorEnd::Free(Point::ZERO));
        assert!(connector_route(&state, &missing_shape).is_none());

        let missing_port = Connector::new("c3".into(), ConnectorEnd::bound(&shape_id, "ghost"), ConnectorEnd::Free(Point::ZERO));
        assert!(connector_route(&state, &missing_port).is_none());
    }

    #[test]
    fn test_route_distance_curve() {
        let mut c = Connector::new("c".into(), ConnectorEnd::Free(Point::ZERO), ConnectorEnd::Free(Point::new(100.0, 0.0)));
        c.routing = Routing::Smooth;
        c.control_points = Some([Point::new(33.0, 0.0), Point::new(66.0, 0.0)]);
        let route = connector_route(&CanvasState::default(), &c).unwrap();
        assert!(route_distance(&route, Point::new(50.0, 3.0)) < 3.5);
        assert!(route_distance(&route, Point::new(50.0, 40.0)) > 30.0);
        assert_eq!(route.end(), Point::new(100.0, 0.0));
    }
}
