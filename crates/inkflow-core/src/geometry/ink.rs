//! Freehand stroke smoothing and simplification.

use kurbo::Point;

/// Chaikin corner cutting.
///
/// Each iteration replaces every segment with points at 1/4 and 3/4 along
/// it; the first and last points stay fixed. Inputs with fewer than three
/// points are returned unchanged.
pub fn smooth_points(points: &[Point], iterations: usize) -> Vec<Point> {
    let mut current = points.to_vec();
    if current.len() < 3 {
        return current;
    }
    for _ in 0..iterations {
        let (Some(&first), Some(&last)) = (current.first(), current.last()) else {
            break;
        };
        let mut next = Vec::with_capacity(current.len() * 2);
        next.push(first);
        for w in current.windows(2) {
            next.push(w[0].lerp(w[1], 0.25));
            next.push(w[0].lerp(w[1], 0.75));
        }
        next.push(last);
        current = next;
    }
    current
}

/// Radial distance reduction.
///
/// A point survives only if it is at least `min_dist` from the last kept
/// point. The first and last points always survive.
pub fn simplify_points(points: &[Point], min_dist: f64) -> Vec<Point> {
    let [first, interior @ .., last] = points else {
        return points.to_vec();
    };
    let mut kept = vec![*first];
    let mut anchor = *first;
    for &p in interior {
        if p.distance(anchor) >= min_dist {
            kept.push(p);
            anchor = p;
        }
    }
    kept.push(*last);
    kept
}
