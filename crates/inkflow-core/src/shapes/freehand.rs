//! Freehand ink strokes.

use super::{ElementId, ElementStyle, point_to_polyline_dist};
use kurbo::{Point, Rect};
use serde::{Deserialize, Serialize};

/// A committed pen stroke.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FreehandPath {
    pub id: ElementId,
    pub points: Vec<Point>,
    #[serde(default)]
    pub style: ElementStyle,
    #[serde(default)]
    pub z_index: i64,
}

impl FreehandPath {
    pub fn new(id: ElementId, points: Vec<Point>) -> Self {
        Self {
            id,
            points,
            style: ElementStyle::default(),
            z_index: 0,
        }
    }

    pub fn bounds(&self) -> Rect {
        let Some(first) = self.points.first() else {
            return Rect::ZERO;
        };
        self.points
            .iter()
            .fold(Rect::from_points(*first, *first), |acc, p| acc.union_pt(*p))
    }

    /// Whether `point` is within `tolerance` of the stroke.
    pub fn hit_test(&self, point: Point, tolerance: f64) -> bool {
        point_to_polyline_dist(point, &self.points) <= tolerance + self.style.stroke_width / 2.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bounds() {
        let path = FreehandPath::new(
            "f1".into(),
            vec![Point::new(5.0, 10.0), Point::new(-5.0, 20.0), Point::new(0.0, 0.0)],
        );
        assert_eq!(path.bounds(), Rect::new(-5.0, 0.0, 5.0, 20.0));
        assert_eq!(FreehandPath::new("e".into(), vec![]).bounds(), Rect::ZERO);
    }

    #[test]
    fn test_hit_test() {
        let path = FreehandPath::new("f1".into(), vec![Point::new(0.0, 0.0), Point::new(100.0, 0.0)]);
        assert!(path.hit_test(Point::new(50.0, 4.0), 4.0));
        assert!(!path.hit_test(Point::new(50.0, 20.0), 4.0));
    }
}
