//! Pure geometry over canvas elements.
//!
//! Nothing here mutates state; every function is O(1) or linear in the
//! number of ports/points it is given.

mod ink;
mod ports;
mod routing;
mod snap;

pub use ink::{simplify_points, smooth_points};
pub use ports::{nearest_port, port_outward_normal, port_position};
pub use routing::{
    ConnectorRoute, ORTHO_GAP, connector_route, default_control_points, orthogonal_path,
    resolve_end, route_distance,
};
pub use snap::{ANGLE_SNAP_INCREMENT, GRID_SIZE, snap_angle, snap_point, snap_to_grid};

use kurbo::{Point, Rect};

/// Axis-aligned overlap test. Touching edges count as overlapping.
pub fn bounds_overlap(a: Rect, b: Rect) -> bool {
    let (a, b) = (a.abs(), b.abs());
    let disjoint_x = a.x1 < b.x0 || b.x1 < a.x0;
    let disjoint_y = a.y1 < b.y0 || b.y1 < a.y0;
    !disjoint_x && !disjoint_y
}

/// Rotate `point` about `center` by `degrees` (clockwise on screen).
pub fn rotate_point(point: Point, center: Point, degrees: f64) -> Point {
    let (sin, cos) = degrees.to_radians().sin_cos();
    let d = point - center;
    Point::new(center.x + d.x * cos - d.y * sin, center.y + d.x * sin + d.y * cos)
}
