// src/geometry.rs - Polygon measurements for traced contours

use nalgebra::{Point2, Vector2};
use std::f64::consts::FRAC_PI_2;

/// Tolerance for collinearity and on-edge tests
const GEOMETRY_EPSILON: f64 = 1e-9;

/// Absolute polygon area by the shoelace formula
pub fn polygon_area(points: &[Point2<f64>]) -> f64 {
    if points.len() < 3 {
        return 0.0;
    }

    let n = points.len();
    let twice_area: f64 = (0..n)
        .map(|i| {
            let a = points[i];
            let b = points[(i + 1) % n];
            a.x * b.y - b.x * a.y
        })
        .sum();

    twice_area.abs() / 2.0
}

/// Perimeter of the closed polygon through `points`
pub fn closed_arc_length(points: &[Point2<f64>]) -> f64 {
    if points.len() < 2 {
        return 0.0;
    }

    let n = points.len();
    (0..n)
        .map(|i| (points[(i + 1) % n] - points[i]).norm())
        .sum()
}

/// Convex hull by Andrew's monotone chain, counter-clockwise, without
/// collinear points
pub fn convex_hull(points: &[Point2<f64>]) -> Vec<Point2<f64>> {
    let mut sorted: Vec<Point2<f64>> = points.to_vec();
    sorted.sort_by(|a, b| a.x.total_cmp(&b.x).then(a.y.total_cmp(&b.y)));
    sorted.dedup();

    if sorted.len() < 3 {
        return sorted;
    }

    let turn = |o: &Point2<f64>, a: &Point2<f64>, b: &Point2<f64>| (a - o).perp(&(b - o));

    let mut lower: Vec<Point2<f64>> = Vec::with_capacity(sorted.len());
    for p in &sorted {
        while lower.len() >= 2 && turn(&lower[lower.len() - 2], &lower[lower.len() - 1], p) <= GEOMETRY_EPSILON {
            lower.pop();
        }
        lower.push(*p);
    }

    let mut upper: Vec<Point2<f64>> = Vec::with_capacity(sorted.len());
    for p in sorted.iter().rev() {
        while upper.len() >= 2 && turn(&upper[upper.len() - 2], &upper[upper.len() - 1], p) <= GEOMETRY_EPSILON {
            upper.pop();
        }
        upper.push(*p);
    }

    // Endpoints of each chain are shared with the other
    lower.pop();
    upper.pop();
    lower.extend(upper);
    lower
}

/// Width and height of the minimum-area bounding rectangle.
///
/// One side of the optimal rectangle is collinear with a hull edge, so every
/// hull edge is tried. The edge direction is folded into [0°, 90°); `width`
/// is the extent along that folded direction and `height` the extent across
/// it, which makes an axis-aligned W x H box report (W, H).
pub fn min_area_rect(points: &[Point2<f64>]) -> Option<(f64, f64)> {
    let hull = convex_hull(points);
    if hull.len() < 2 {
        return None;
    }

    let n = hull.len();
    let mut best: Option<(f64, f64, f64)> = None;

    for i in 0..n {
        let edge: Vector2<f64> = hull[(i + 1) % n] - hull[i];
        let length = edge.norm();
        if length <= GEOMETRY_EPSILON {
            continue;
        }
        let dir = edge / length;
        let normal = Vector2::new(-dir.y, dir.x);

        let (mut min_u, mut max_u) = (f64::INFINITY, f64::NEG_INFINITY);
        let (mut min_v, mut max_v) = (f64::INFINITY, f64::NEG_INFINITY);
        for p in &hull {
            let offset = p - hull[i];
            let u = offset.dot(&dir);
            let v = offset.dot(&normal);
            min_u = min_u.min(u);
            max_u = max_u.max(u);
            min_v = min_v.min(v);
            max_v = max_v.max(v);
        }

        let along = max_u - min_u;
        let across = max_v - min_v;
        let area = along * across;

        if best.map_or(true, |(best_area, _, _)| area < best_area - GEOMETRY_EPSILON) {
            // Odd quarter turns swap which side lies along the folded direction
            let quarter_turns = (dir.y.atan2(dir.x) / FRAC_PI_2).floor() as i64;
            let (width, height) = if quarter_turns.rem_euclid(2) == 1 {
                (across, along)
            } else {
                (along, across)
            };
            best = Some((area, width, height));
        }
    }

    best.map(|(_, width, height)| (width, height))
}

/// Point-in-polygon test; points on an edge count as inside
pub fn point_in_polygon(point: &Point2<f64>, polygon: &[Point2<f64>]) -> bool {
    let n = polygon.len();
    if n == 0 {
        return false;
    }
    if n == 1 {
        return (polygon[0] - point).norm() <= GEOMETRY_EPSILON;
    }

    let mut inside = false;
    for i in 0..n {
        let a = polygon[i];
        let b = polygon[(i + 1) % n];

        if on_segment(point, &a, &b) {
            return true;
        }

        // Crossing number: count edges straddling the horizontal ray
        if (a.y > point.y) != (b.y > point.y) {
            let x_cross = a.x + (point.y - a.y) * (b.x - a.x) / (b.y - a.y);
            if point.x < x_cross {
                inside = !inside;
            }
        }
    }

    inside
}

fn on_segment(p: &Point2<f64>, a: &Point2<f64>, b: &Point2<f64>) -> bool {
    let cross = (b - a).perp(&(p - a));
    if cross.abs() > GEOMETRY_EPSILON {
        return false;
    }
    p.x >= a.x.min(b.x) - GEOMETRY_EPSILON
        && p.x <= a.x.max(b.x) + GEOMETRY_EPSILON
        && p.y >= a.y.min(b.y) - GEOMETRY_EPSILON
        && p.y <= a.y.max(b.y) + GEOMETRY_EPSILON
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    fn pts(coords: &[(f64, f64)]) -> Vec<Point2<f64>> {
        coords.iter().map(|&(x, y)| Point2::new(x, y)).collect()
    }

    #[test]
    fn rectangle_area_and_perimeter() {
        let rect = pts(&[(0.0, 0.0), (4.0, 0.0), (4.0, 3.0), (0.0, 3.0)]);
        assert_approx_eq!(polygon_area(&rect), 12.0, 1e-12);
        assert_approx_eq!(closed_arc_length(&rect), 14.0, 1e-12);

        // Orientation does not matter
        let reversed: Vec<_> = rect.iter().rev().cloned().collect();
        assert_approx_eq!(polygon_area(&reversed), 12.0, 1e-12);
    }

    #[test]
    fn degenerate_polygons_have_no_area() {
        assert_eq!(polygon_area(&pts(&[(0.0, 0.0), (5.0, 5.0)])), 0.0);
        assert_eq!(closed_arc_length(&pts(&[(1.0, 1.0)])), 0.0);
        // A two-point "polygon" is walked there and back
        assert_approx_eq!(closed_arc_length(&pts(&[(0.0, 0.0), (3.0, 4.0)])), 10.0, 1e-12);
    }

    #[test]
    fn hull_drops_interior_and_collinear_points() {
        let points = pts(&[
            (0.0, 0.0), (2.0, 0.0), (4.0, 0.0), (4.0, 4.0), (0.0, 4.0), (2.0, 2.0), (1.0, 3.0),
        ]);
        let hull = convex_hull(&points);
        assert_eq!(hull.len(), 4);
        assert_approx_eq!(polygon_area(&hull), 16.0, 1e-12);
    }

    #[test]
    fn hull_of_concave_polygon_is_larger() {
        // L-shape: 4x4 square missing its 2x2 top-right corner
        let l_shape = pts(&[(0.0, 0.0), (4.0, 0.0), (4.0, 2.0), (2.0, 2.0), (2.0, 4.0), (0.0, 4.0)]);
        let hull = convex_hull(&l_shape);
        assert_approx_eq!(polygon_area(&l_shape), 12.0, 1e-12);
        assert_approx_eq!(polygon_area(&hull), 14.0, 1e-12);
    }

    #[test]
    fn min_area_rect_of_axis_aligned_box() {
        let rect = pts(&[(10.0, 10.0), (50.0, 10.0), (50.0, 30.0), (10.0, 30.0)]);
        let (width, height) = min_area_rect(&rect).unwrap();
        assert_approx_eq!(width, 40.0, 1e-9);
        assert_approx_eq!(height, 20.0, 1e-9);

        let tall = pts(&[(0.0, 0.0), (5.0, 0.0), (5.0, 15.0), (0.0, 15.0)]);
        let (width, height) = min_area_rect(&tall).unwrap();
        assert_approx_eq!(width / height, 1.0 / 3.0, 1e-9);
    }

    #[test]
    fn min_area_rect_of_rotated_square() {
        // Diamond with diagonal 2: side sqrt(2)
        let diamond = pts(&[(1.0, 0.0), (2.0, 1.0), (1.0, 2.0), (0.0, 1.0)]);
        let (width, height) = min_area_rect(&diamond).unwrap();
        assert_approx_eq!(width, 2f64.sqrt(), 1e-9);
        assert_approx_eq!(height, 2f64.sqrt(), 1e-9);
    }

    #[test]
    fn min_area_rect_of_segment_is_flat() {
        let (width, height) = min_area_rect(&pts(&[(0.0, 0.0), (6.0, 0.0), (3.0, 0.0)])).unwrap();
        assert_approx_eq!(width, 6.0, 1e-9);
        assert_approx_eq!(height, 0.0, 1e-9);
        assert!(min_area_rect(&pts(&[(1.0, 1.0)])).is_none());
    }

    #[test]
    fn point_in_polygon_inside_outside_and_boundary() {
        let square = pts(&[(0.0, 0.0), (10.0, 0.0), (10.0, 10.0), (0.0, 10.0)]);
        assert!(point_in_polygon(&Point2::new(5.0, 5.0), &square));
        assert!(!point_in_polygon(&Point2::new(15.0, 5.0), &square));
        assert!(!point_in_polygon(&Point2::new(-1.0, -1.0), &square));
        assert!(point_in_polygon(&Point2::new(10.0, 4.0), &square));
        assert!(point_in_polygon(&Point2::new(0.0, 0.0), &square));
    }

    #[test]
    fn point_in_concave_polygon() {
        let l_shape = pts(&[(0.0, 0.0), (4.0, 0.0), (4.0, 2.0), (2.0, 2.0), (2.0, 4.0), (0.0, 4.0)]);
        assert!(point_in_polygon(&Point2::new(1.0, 3.0), &l_shape));
        assert!(!point_in_polygon(&Point2::new(3.0, 3.0), &l_shape));
    }
}
