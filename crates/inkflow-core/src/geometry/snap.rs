//! Grid and angle snapping.

use kurbo::Point;

/// Grid size for snapping (matches the visual grid).
pub const GRID_SIZE: f64 = 20.0;

/// Angle snap increment in degrees.
pub const ANGLE_SNAP_INCREMENT: f64 = 15.0;

/// Round `value` to the nearest multiple of `grid_size`.
///
/// A non-positive grid size disables snapping.
pub fn snap_to_grid(value: f64, grid_size: f64) -> f64 {
    if grid_size <= 0.0 {
        return value;
    }
    (value / grid_size).round() * grid_size
}

/// Snap both coordinates of a point to the grid.
pub fn snap_point(point: Point, grid_size: f64) -> Point {
    Point::new(snap_to_grid(point.x, grid_size), snap_to_grid(point.y, grid_size))
}

/// Snap an angle in degrees to the nearest increment, preserving its range.
pub fn snap_angle(angle_degrees: f64, increment: f64) -> f64 {
    snap_to_grid(angle_degrees, increment)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snap_to_grid() {
        assert!((snap_to_grid(29.0, 20.0) - 20.0).abs() < f64::EPSILON);
        assert!((snap_to_grid(31.0, 20.0) - 40.0).abs() < f64::EPSILON);
        assert!((snap_to_grid(-9.0, 20.0) - 0.0).abs() < f64::EPSILON);
        assert!((snap_to_grid(-11.0, 20.0) + 20.0).abs() < f64::EPSILON);
        assert!((snap_to_grid(13.7, 0.0) - 13.7).abs() < f64::EPSILON);
    }

    #[test]
    fn test_snap_point() {
        let p = snap_point(Point::new(12.0, 47.0), GRID_SIZE);
        assert_eq!(p, Point::new(20.0, 40.0));
    }

    #[test]
    fn test_snap_angle_keeps_range() {
        assert!((snap_angle(37.0, ANGLE_SNAP_INCREMENT) - 30.0).abs() < f64::EPSILON);
        assert!((snap_angle(-52.0, ANGLE_SNAP_INCREMENT) + 45.0).abs() < f64::EPSILON);
        assert!((snap_angle(368.0, ANGLE_SNAP_INCREMENT) - 375.0).abs() < f64::EPSILON);
    }
}
