// src/shape_analysis.rs - Contour shape statistics for binary images

use image::GrayImage;
use imageproc::contours::{find_contours, BorderType, Contour};
use log::debug;
use nalgebra::Point2;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

use crate::config::{Config, ContourRetrieval};
use crate::dimension::mean_and_variance;
use crate::geometry::{closed_arc_length, convex_hull, min_area_rect, point_in_polygon, polygon_area};

/// Aggregated contour descriptors of one image
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ContourFeatures {
    pub contour_count: usize,
    pub total_perimeter: f64,
    pub avg_area: f64,
    pub contour_complexity: f64,
    pub circularity_mean: f64,
    pub circularity_std: f64,
    pub convexity_mean: f64,
    pub aspect_ratio_mean: f64,
    pub contour_hierarchy_depth: usize,
}

/// Measurements of a single contour
#[derive(Debug, Clone)]
pub struct ContourShape {
    pub points: Vec<Point2<f64>>,
    pub area: f64,
    pub perimeter: f64,
}

impl ContourShape {
    pub fn from_points(points: Vec<Point2<f64>>) -> Self {
        let area = polygon_area(&points);
        let perimeter = closed_arc_length(&points);
        Self { points, area, perimeter }
    }

    pub fn circularity(&self) -> f64 {
        calculate_circularity(self.area, self.perimeter)
    }

    /// Area over convex hull area; None when the hull is degenerate
    pub fn convexity(&self) -> Option<f64> {
        let hull_area = polygon_area(&convex_hull(&self.points));
        if hull_area > 0.0 {
            Some(self.area / hull_area)
        } else {
            None
        }
    }

    /// Width over height of the minimum-area bounding rectangle
    pub fn aspect_ratio(&self) -> Option<f64> {
        match min_area_rect(&self.points) {
            Some((width, height)) if height > 0.0 => Some(width / height),
            _ => None,
        }
    }
}

/// Calculate circularity of a shape (4π * Area / Perimeter²)
/// 1.0 for a perfect circle, < 1.0 for other shapes
pub fn calculate_circularity(area: f64, perimeter: f64) -> f64 {
    if perimeter <= 0.0 {
        return 0.0;
    }
    (4.0 * PI * area) / (perimeter * perimeter)
}

/// Extracts contours from a binary image and summarises their shapes
#[derive(Debug, Clone)]
pub struct ContourAnalyzer {
    pub min_contour_area: f64,
    pub retrieval: ContourRetrieval,
}

impl Default for ContourAnalyzer {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

impl ContourAnalyzer {
    pub fn from_config(config: &Config) -> Self {
        Self {
            min_contour_area: config.min_contour_area,
            retrieval: config.contour_retrieval,
        }
    }

    /// Trace the outer borders of the foreground regions and keep the ones
    /// whose polygon area reaches `min_contour_area`
    pub fn find_shapes(&self, image: &GrayImage) -> Vec<ContourShape> {
        let contours: Vec<Contour<i32>> = find_contours::<i32>(image);

        contours
            .into_iter()
            .filter(|c| matches!(c.border_type, BorderType::Outer))
            .filter(|c| match self.retrieval {
                ContourRetrieval::External => c.parent.is_none(),
                ContourRetrieval::All => true,
            })
            .map(|c| {
                let points = c.points.iter().map(|p| Point2::new(p.x as f64, p.y as f64)).collect();
                ContourShape::from_points(points)
            })
            .filter(|shape| shape.area >= self.min_contour_area)
            .collect()
    }

    /// Contour descriptors of the image; all zero when no contour survives
    /// the area filter
    pub fn extract(&self, image: &GrayImage) -> ContourFeatures {
        let shapes = self.find_shapes(image);
        if shapes.is_empty() {
            return ContourFeatures::default();
        }
        let features = analyze_contours(&shapes);

        debug!(
            "{} contours, circularity {:.3}, convexity {:.3}, hierarchy depth {}",
            features.contour_count,
            features.circularity_mean,
            features.convexity_mean,
            features.contour_hierarchy_depth
        );

        features
    }
}

/// Aggregate statistics over already filtered contours
pub fn analyze_contours(shapes: &[ContourShape]) -> ContourFeatures {
    let mut areas = Vec::new();
    let mut complexities = Vec::new();
    let mut circularities = Vec::new();
    let mut convexities = Vec::new();
    let mut aspect_ratios = Vec::new();
    let mut total_perimeter = 0.0;

    for shape in shapes {
        if shape.area <= 0.0 || shape.perimeter <= 0.0 {
            continue;
        }

        areas.push(shape.area);
        total_perimeter += shape.perimeter;
        complexities.push(shape.perimeter / shape.area.sqrt());
        circularities.push(shape.circularity());

        if let Some(convexity) = shape.convexity() {
            convexities.push(convexity);
        }
        if let Some(aspect_ratio) = shape.aspect_ratio() {
            aspect_ratios.push(aspect_ratio);
        }
    }

    let (circularity_mean, circularity_variance) = mean_and_variance(&circularities);

    ContourFeatures {
        contour_count: shapes.len(),
        total_perimeter,
        avg_area: mean(&areas),
        contour_complexity: mean(&complexities),
        circularity_mean,
        circularity_std: circularity_variance.sqrt(),
        convexity_mean: mean(&convexities),
        aspect_ratio_mean: mean(&aspect_ratios),
        contour_hierarchy_depth: estimate_hierarchy_depth(shapes),
    }
}

/// Approximate nesting depth.
///
/// This is not a true tree depth: contours are ranked by area (largest
/// first) and, for each rank i, the first smaller contour whose first point
/// lies inside contour i raises the depth to i + 1.
pub fn estimate_hierarchy_depth(shapes: &[ContourShape]) -> usize {
    if shapes.len() <= 1 {
        return 0;
    }

    let mut ranked: Vec<&ContourShape> = shapes.iter().collect();
    ranked.sort_by(|a, b| b.area.total_cmp(&a.area));

    let mut depth = 0;
    for (i, outer) in ranked[..ranked.len() - 1].iter().enumerate() {
        let contains_smaller = ranked[i + 1..].iter().any(|inner| {
            inner
                .points
                .first()
                .map_or(false, |p| point_in_polygon(p, &outer.points))
        });
        if contains_smaller {
            depth = depth.max(i + 1);
        }
    }

    depth
}

fn mean(values: &[f64]) -> f64 {
    mean_and_variance(values).0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image_utils::binary_from_fn;
    use assert_approx_eq::assert_approx_eq;

    fn in_box(x: u32, y: u32, lo: u32, hi: u32) -> bool {
        x >= lo && x <= hi && y >= lo && y <= hi
    }

    fn square_shape(x0: f64, y0: f64, side: f64) -> ContourShape {
        ContourShape::from_points(vec![
            Point2::new(x0, y0),
            Point2::new(x0 + side, y0),
            Point2::new(x0 + side, y0 + side),
            Point2::new(x0, y0 + side),
        ])
    }

    #[test]
    fn circularity_of_known_shapes() {
        // Circle of radius r: 4π·πr² / (2πr)² = 1
        let r: f64 = 10.0;
        assert_approx_eq!(calculate_circularity(PI * r * r, 2.0 * PI * r), 1.0, 1e-12);
        // Square: 4π·s² / (4s)² = π/4
        assert_approx_eq!(calculate_circularity(100.0, 40.0), PI / 4.0, 1e-12);
        assert_eq!(calculate_circularity(10.0, 0.0), 0.0);
    }

    #[test]
    fn filled_square_descriptors() {
        // Border pixels 10..=49 trace a 39 x 39 polygon
        let image = binary_from_fn(64, 64, |x, y| in_box(x, y, 10, 49));
        let features = ContourAnalyzer::default().extract(&image);

        assert_eq!(features.contour_count, 1);
        assert_approx_eq!(features.avg_area, 1521.0, 1e-6);
        assert_approx_eq!(features.total_perimeter, 156.0, 1e-6);
        assert_approx_eq!(features.contour_complexity, 4.0, 1e-6);
        assert_approx_eq!(features.circularity_mean, PI / 4.0, 1e-6);
        assert_approx_eq!(features.circularity_std, 0.0, 1e-12);
        assert_approx_eq!(features.convexity_mean, 1.0, 1e-6);
        assert_approx_eq!(features.aspect_ratio_mean, 1.0, 1e-6);
        assert_eq!(features.contour_hierarchy_depth, 0);
    }

    #[test]
    fn small_blobs_are_filtered_out() {
        let image = binary_from_fn(64, 64, |x, y| in_box(x, y, 20, 24));
        let features = ContourAnalyzer::default().extract(&image);
        assert_eq!(features, ContourFeatures::default());
    }

    #[test]
    fn empty_image_yields_zero_features() {
        let features = ContourAnalyzer::default().extract(&GrayImage::new(32, 32));
        assert_eq!(features.contour_count, 0);
        assert_eq!(features.total_perimeter, 0.0);
        assert_eq!(features.contour_hierarchy_depth, 0);
    }

    #[test]
    fn nested_square_only_visible_with_all_retrieval() {
        // Frame 5..=74 with a 3 pixel wall, and a filled square inside its hole
        let image = binary_from_fn(80, 80, |x, y| {
            (in_box(x, y, 5, 74) && !in_box(x, y, 8, 71)) || in_box(x, y, 30, 49)
        });

        let external = ContourAnalyzer::default().extract(&image);
        assert_eq!(external.contour_count, 1);
        assert_approx_eq!(external.avg_area, 69.0 * 69.0, 1e-6);
        assert_eq!(external.contour_hierarchy_depth, 0);

        let all = ContourAnalyzer {
            retrieval: ContourRetrieval::All,
            ..ContourAnalyzer::default()
        }
        .extract(&image);
        assert_eq!(all.contour_count, 2);
        assert_eq!(all.contour_hierarchy_depth, 1);
    }

    #[test]
    fn hierarchy_depth_ranks_by_area() {
        let big = square_shape(0.0, 0.0, 100.0);
        let middle = square_shape(10.0, 10.0, 50.0);
        let small = square_shape(20.0, 20.0, 10.0);
        let outside = square_shape(200.0, 200.0, 5.0);

        assert_eq!(estimate_hierarchy_depth(&[big.clone()]), 0);
        assert_eq!(estimate_hierarchy_depth(&[small.clone(), big.clone()]), 1);
        assert_eq!(estimate_hierarchy_depth(&[small.clone(), middle.clone(), big.clone()]), 2);
        assert_eq!(estimate_hierarchy_depth(&[big, outside]), 0);
    }

    #[test]
    fn concave_shape_has_lower_convexity() {
        let l_shape = ContourShape::from_points(vec![
            Point2::new(0.0, 0.0),
            Point2::new(40.0, 0.0),
            Point2::new(40.0, 20.0),
            Point2::new(20.0, 20.0),
            Point2::new(20.0, 40.0),
            Point2::new(0.0, 40.0),
        ]);
        let convexity = l_shape.convexity().unwrap();
        assert_approx_eq!(convexity, 1200.0 / 1400.0, 1e-9);
    }
}
