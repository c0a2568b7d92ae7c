// src/dimension.rs - Box-counting (Hausdorff) dimension estimation
//
// The dimension D is the exponent of count(s) ∝ s^(-D): the slope of
// ln(count) against ln(1/s) over a range of box sizes s. The same fit is
// repeated on a grid of sub-regions to obtain local dimensions, whose spread
// describes how uniform the structure is.

use std::fmt;

use log::{debug, warn};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::box_counting::{count_occupied_boxes, generate_box_sizes};
use crate::config::Config;
use crate::image_utils::{count_foreground, crop_region, region_bounds, BinaryImage};

/// Guards the complexity ratio against a zero mean
const COMPLEXITY_EPSILON: f64 = 1e-6;

/// Local dimensions are clamped into this interval
const LOCAL_DIMENSION_MAX: f64 = 3.0;

/// A single scale of the log-log regression
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DimensionSample {
    pub box_size: u32,
    pub inverse_box_size: f64,
    pub occupied_count: usize,
}

/// Whether enough scales were available for the regression
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ScaleStatus {
    #[default]
    Ok,
    /// Fewer than two box sizes had a non-zero count
    InsufficientScaleData,
    /// The image was not analysed (too little content or an internal fault)
    Skipped,
}

/// Result of one box-counting regression, including fit metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DimensionEstimate {
    pub dimension: f64,
    pub r_squared: f64,
    /// Fitted (slope, intercept) of ln(count) = slope * ln(1/s) + intercept
    pub coefficients: (f64, f64),
    /// Every generated box size, before zero counts were dropped
    pub box_sizes: Vec<u32>,
    /// Scales with a non-zero count, ascending by box size
    pub samples: Vec<DimensionSample>,
    pub status: ScaleStatus,
}

impl DimensionEstimate {
    fn insufficient(box_sizes: Vec<u32>, samples: Vec<DimensionSample>) -> Self {
        Self {
            dimension: 0.0,
            r_squared: 0.0,
            coefficients: (0.0, 0.0),
            box_sizes,
            samples,
            status: ScaleStatus::InsufficientScaleData,
        }
    }

    /// Placeholder for images that were never fitted
    pub fn skipped() -> Self {
        Self {
            dimension: 0.0,
            r_squared: 0.0,
            coefficients: (0.0, 0.0),
            box_sizes: Vec::new(),
            samples: Vec::new(),
            status: ScaleStatus::Skipped,
        }
    }

    /// Number of scales used by the fit
    pub fn valid_points(&self) -> usize {
        self.samples.len()
    }
}

/// Coarse structural label derived from the global dimension and the
/// variance of the local dimensions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FractalType {
    LinearSparse,
    SmoothCurve,
    BranchedLinear,
    SelfSimilar,
    IrregularBranching,
    DenseFractal,
    SpaceFilling,
    InsufficientContent,
    Error,
}

impl FractalType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FractalType::LinearSparse => "linear_sparse",
            FractalType::SmoothCurve => "smooth_curve",
            FractalType::BranchedLinear => "branched_linear",
            FractalType::SelfSimilar => "self_similar",
            FractalType::IrregularBranching => "irregular_branching",
            FractalType::DenseFractal => "dense_fractal",
            FractalType::SpaceFilling => "space_filling",
            FractalType::InsufficientContent => "insufficient_content",
            FractalType::Error => "error",
        }
    }
}

impl fmt::Display for FractalType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Label a structure from its global dimension and local-dimension variance
pub fn classify_fractal_type(hausdorff_dimension: f64, variance: f64) -> FractalType {
    if hausdorff_dimension < 1.2 {
        FractalType::LinearSparse
    } else if hausdorff_dimension < 1.5 {
        if variance < 0.1 {
            FractalType::SmoothCurve
        } else {
            FractalType::BranchedLinear
        }
    } else if hausdorff_dimension < 1.8 {
        if variance < 0.2 {
            FractalType::SelfSimilar
        } else {
            FractalType::IrregularBranching
        }
    } else if hausdorff_dimension < 2.2 {
        FractalType::DenseFractal
    } else {
        FractalType::SpaceFilling
    }
}

/// Dimension-derived part of the feature record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DimensionFeatures {
    pub hausdorff_dimension: f64,
    pub local_dimensions: Vec<f64>,
    pub dimension_variance: f64,
    pub dimension_complexity: f64,
    pub fractal_type: FractalType,
    pub estimate: DimensionEstimate,
}

impl DimensionFeatures {
    /// Zeroed features tagged with `fractal_type`; `regions²` local entries
    pub fn degenerate(regions: u32, fractal_type: FractalType) -> Self {
        let cells = (regions as usize) * (regions as usize);
        Self {
            hausdorff_dimension: 0.0,
            local_dimensions: vec![0.0; cells],
            dimension_variance: 0.0,
            dimension_complexity: 0.0,
            fractal_type,
            estimate: DimensionEstimate::skipped(),
        }
    }
}

/// Box-counting estimator over a configurable scale range
#[derive(Debug, Clone)]
pub struct DimensionEstimator {
    pub min_box_size: u32,
    pub max_box_size: u32,
    pub regions: u32,
    pub local_min_foreground: u64,
    pub insufficient_content_threshold: u64,
    pub use_parallel: bool,
}

impl Default for DimensionEstimator {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

impl DimensionEstimator {
    pub fn from_config(config: &Config) -> Self {
        Self {
            min_box_size: config.min_box_size,
            max_box_size: config.max_box_size,
            regions: config.regions,
            local_min_foreground: config.local_min_foreground,
            insufficient_content_threshold: config.insufficient_content_threshold,
            use_parallel: config.use_parallel,
        }
    }

    /// Box sizes used for every fit
    pub fn box_sizes(&self) -> Vec<u32> {
        generate_box_sizes(self.min_box_size, self.max_box_size)
    }

    /// Fit the box-counting dimension of the whole image.
    ///
    /// Never fails: with fewer than two non-empty scales the estimate is 0.0
    /// and its status is `InsufficientScaleData`.
    pub fn estimate(&self, image: &BinaryImage) -> DimensionEstimate {
        let box_sizes = self.box_sizes();

        let counts: Vec<usize> = if self.use_parallel {
            box_sizes.par_iter().map(|&size| count_occupied_boxes(image, size)).collect()
        } else {
            box_sizes.iter().map(|&size| count_occupied_boxes(image, size)).collect()
        };

        let samples: Vec<DimensionSample> = box_sizes
            .iter()
            .zip(counts)
            .filter(|&(_, count)| count > 0)
            .map(|(&box_size, occupied_count)| DimensionSample {
                box_size,
                inverse_box_size: 1.0 / box_size as f64,
                occupied_count,
            })
            .collect();

        if samples.len() < 2 {
            warn!(
                "Insufficient scales for box-counting regression ({} valid of {})",
                samples.len(),
                box_sizes.len()
            );
            return DimensionEstimate::insufficient(box_sizes, samples);
        }

        let xs: Vec<f64> = samples.iter().map(|s| s.inverse_box_size.ln()).collect();
        let ys: Vec<f64> = samples.iter().map(|s| (s.occupied_count as f64).ln()).collect();
        let (slope, intercept, r_squared) = fit_line(&xs, &ys);

        DimensionEstimate {
            dimension: slope,
            r_squared,
            coefficients: (slope, intercept),
            box_sizes,
            samples,
            status: ScaleStatus::Ok,
        }
    }

    /// Local dimensions over a `regions` x `regions` grid, in row-major order.
    ///
    /// Regions with no more than `local_min_foreground` pixels get 0.0; the
    /// others are fitted independently and clamped to [0, 3].
    pub fn local_dimensions(&self, image: &BinaryImage) -> Vec<f64> {
        let (width, height) = image.dimensions();
        let regions = self.regions;
        let side = regions as usize;
        let cells = side * side;

        let local_dimension = |index: usize| -> f64 {
            let (row, col) = ((index / side) as u32, (index % side) as u32);
            let (x, y, w, h) = region_bounds(width, height, regions, row, col);
            if w == 0 || h == 0 {
                return 0.0;
            }
            let region = crop_region(image, x, y, w, h);
            if count_foreground(&region) <= self.local_min_foreground {
                return 0.0;
            }
            self.estimate(&region).dimension.clamp(0.0, LOCAL_DIMENSION_MAX)
        };

        if self.use_parallel {
            (0..cells).into_par_iter().map(local_dimension).collect()
        } else {
            (0..cells).map(local_dimension).collect()
        }
    }

    /// Global and local dimensions plus their derived statistics
    pub fn extract(&self, image: &BinaryImage) -> DimensionFeatures {
        let foreground = count_foreground(image);
        if foreground < self.insufficient_content_threshold {
            warn!(
                "Image has too little content for fractal analysis ({} foreground pixels, need {})",
                foreground, self.insufficient_content_threshold
            );
            return DimensionFeatures::degenerate(self.regions, FractalType::InsufficientContent);
        }

        let estimate = self.estimate(image);
        let local_dimensions = self.local_dimensions(image);

        let (mean, variance) = mean_and_variance(&local_dimensions);
        let dimension_complexity = variance.sqrt() / (mean + COMPLEXITY_EPSILON);
        let fractal_type = classify_fractal_type(estimate.dimension, variance);

        debug!(
            "Box-counting dimension {:.4} (R² {:.4}, {} scales), local variance {:.4}, type {}",
            estimate.dimension,
            estimate.r_squared,
            estimate.valid_points(),
            variance,
            fractal_type
        );

        DimensionFeatures {
            hausdorff_dimension: estimate.dimension,
            local_dimensions,
            dimension_variance: variance,
            dimension_complexity,
            fractal_type,
            estimate,
        }
    }
}

/// Ordinary least squares: returns (slope, intercept, R²).
/// R² is 0 when the ys carry no variance.
fn fit_line(xs: &[f64], ys: &[f64]) -> (f64, f64, f64) {
    let n = xs.len() as f64;
    let mean_x = xs.iter().sum::<f64>() / n;
    let mean_y = ys.iter().sum::<f64>() / n;

    let sxy: f64 = xs.iter().zip(ys).map(|(x, y)| (x - mean_x) * (y - mean_y)).sum();
    let sxx: f64 = xs.iter().map(|x| (x - mean_x).powi(2)).sum();

    let slope = if sxx > 0.0 { sxy / sxx } else { 0.0 };
    let intercept = mean_y - slope * mean_x;

    let ss_res: f64 = xs
        .iter()
        .zip(ys)
        .map(|(x, y)| (y - (slope * x + intercept)).powi(2))
        .sum();
    let ss_tot: f64 = ys.iter().map(|y| (y - mean_y).powi(2)).sum();
    let r_squared = if ss_tot != 0.0 { 1.0 - ss_res / ss_tot } else { 0.0 };

    (slope, intercept, r_squared)
}

/// Population mean and variance; (0, 0) for an empty slice
pub(crate) fn mean_and_variance(values: &[f64]) -> (f64, f64) {
    if values.is_empty() {
        return (0.0, 0.0);
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    (mean, variance)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image_utils::binary_from_fn;
    use assert_approx_eq::assert_approx_eq;
    use image::GrayImage;

    fn sequential() -> DimensionEstimator {
        DimensionEstimator {
            use_parallel: false,
            ..DimensionEstimator::default()
        }
    }

    #[test]
    fn filled_square_is_two_dimensional() {
        let image = binary_from_fn(128, 128, |_, _| true);
        let estimate = sequential().estimate(&image);

        assert_eq!(estimate.status, ScaleStatus::Ok);
        assert_eq!(estimate.valid_points(), 7);
        assert_approx_eq!(estimate.dimension, 2.0, 1e-9);
        assert_approx_eq!(estimate.r_squared, 1.0, 1e-9);
    }

    #[test]
    fn straight_line_is_one_dimensional() {
        let image = binary_from_fn(128, 128, |_, y| y == 0);
        let estimate = sequential().estimate(&image);

        assert_approx_eq!(estimate.dimension, 1.0, 1e-9);
        assert_approx_eq!(estimate.r_squared, 1.0, 1e-9);
        // ln(count) = ln(128) + 1 * ln(1/s)
        assert_approx_eq!(estimate.coefficients.1, (128f64).ln(), 1e-9);
    }

    #[test]
    fn samples_record_every_scale() {
        let image = binary_from_fn(128, 128, |_, _| true);
        let estimate = sequential().estimate(&image);

        assert_eq!(estimate.box_sizes, vec![2, 4, 8, 16, 32, 64, 128]);
        let counts: Vec<usize> = estimate.samples.iter().map(|s| s.occupied_count).collect();
        assert_eq!(counts, vec![4096, 1024, 256, 64, 16, 4, 1]);
        assert_approx_eq!(estimate.samples[0].inverse_box_size, 0.5, 1e-12);
    }

    #[test]
    fn single_scale_is_insufficient() {
        let estimator = DimensionEstimator {
            min_box_size: 8,
            max_box_size: 8,
            ..sequential()
        };
        let image = binary_from_fn(64, 64, |_, _| true);
        let estimate = estimator.estimate(&image);

        assert_eq!(estimate.status, ScaleStatus::InsufficientScaleData);
        assert_eq!(estimate.dimension, 0.0);
        assert_eq!(estimate.valid_points(), 1);
    }

    #[test]
    fn empty_image_is_insufficient_for_regression() {
        let estimate = sequential().estimate(&GrayImage::new(64, 64));
        assert_eq!(estimate.status, ScaleStatus::InsufficientScaleData);
        assert!(estimate.samples.is_empty());
        assert_eq!(estimate.box_sizes.len(), 7);
    }

    #[test]
    fn constant_counts_have_zero_r_squared() {
        let image = binary_from_fn(4, 4, |x, y| x == 0 && y == 0);
        let estimate = sequential().estimate(&image);
        assert_eq!(estimate.status, ScaleStatus::Ok);
        assert_approx_eq!(estimate.dimension, 0.0, 1e-12);
        assert_eq!(estimate.r_squared, 0.0);
    }

    #[test]
    fn uniform_image_has_uniform_local_dimensions() {
        let image = binary_from_fn(128, 128, |_, _| true);
        let features = sequential().extract(&image);

        assert_eq!(features.local_dimensions.len(), 16);
        let first = features.local_dimensions[0];
        assert!(first > 0.0 && first <= 3.0);
        for d in &features.local_dimensions {
            assert_approx_eq!(*d, first, 1e-12);
        }
        assert_approx_eq!(features.dimension_variance, 0.0, 1e-12);
        assert_approx_eq!(features.dimension_complexity, 0.0, 1e-9);
        assert_eq!(features.fractal_type, FractalType::DenseFractal);
    }

    #[test]
    fn sparse_regions_get_zero_local_dimension() {
        // Only the top-left 32x32 region has content
        let image = binary_from_fn(128, 128, |x, y| x < 32 && y < 32);
        let local = sequential().local_dimensions(&image);

        assert_eq!(local.len(), 16);
        assert!(local[0] > 0.0);
        assert!(local[1..].iter().all(|&d| d == 0.0));
    }

    #[test]
    fn grid_larger_than_image_keeps_cell_count() {
        // 300 x 300 cells on a 64 x 64 image: every cell is empty
        let estimator = DimensionEstimator {
            regions: 300,
            ..sequential()
        };
        let image = binary_from_fn(64, 64, |x, y| (x + y) % 3 == 0);
        let local = estimator.local_dimensions(&image);

        assert_eq!(local.len(), 90_000);
        assert!(local.iter().all(|&d| d == 0.0));
        assert_eq!(
            DimensionFeatures::degenerate(300, FractalType::Error).local_dimensions.len(),
            local.len()
        );
    }

    #[test]
    fn region_threshold_is_exclusive() {
        // Exactly 50 pixels in the first region: not above the threshold
        let image = binary_from_fn(128, 128, |x, y| (y == 0 || y == 2) && x < 25);
        let local = sequential().local_dimensions(&image);
        assert_eq!(local[0], 0.0);
    }

    #[test]
    fn parallel_and_sequential_agree() {
        let image = binary_from_fn(96, 80, |x, y| (x * y) % 7 == 0 || x == 40);
        let parallel = DimensionEstimator::default().extract(&image);
        let serial = sequential().extract(&image);
        assert_eq!(parallel, serial);
    }

    #[test]
    fn blank_image_is_insufficient_content() {
        let features = sequential().extract(&GrayImage::new(200, 150));
        assert_eq!(features.fractal_type, FractalType::InsufficientContent);
        assert_eq!(features.hausdorff_dimension, 0.0);
        assert_eq!(features.local_dimensions, vec![0.0; 16]);
        assert_eq!(features.estimate.status, ScaleStatus::Skipped);
    }

    #[test]
    fn content_threshold_applies_before_fitting() {
        let image = binary_from_fn(64, 64, |x, y| y == 10 && x < 29);
        let features = sequential().extract(&image);
        assert_eq!(features.fractal_type, FractalType::InsufficientContent);

        let image = binary_from_fn(64, 64, |x, y| y == 10 && x < 30);
        let features = sequential().extract(&image);
        assert_ne!(features.fractal_type, FractalType::InsufficientContent);
    }

    #[test]
    fn degenerate_record_follows_region_count() {
        let estimator = DimensionEstimator {
            regions: 3,
            ..sequential()
        };
        let features = estimator.extract(&GrayImage::new(10, 10));
        assert_eq!(features.local_dimensions, vec![0.0; 9]);
    }

    #[test]
    fn fractal_type_thresholds() {
        assert_eq!(classify_fractal_type(1.19, 0.0), FractalType::LinearSparse);
        assert_eq!(classify_fractal_type(1.2, 0.05), FractalType::SmoothCurve);
        assert_eq!(classify_fractal_type(1.4, 0.1), FractalType::BranchedLinear);
        assert_eq!(classify_fractal_type(1.5, 0.19), FractalType::SelfSimilar);
        assert_eq!(classify_fractal_type(1.7, 0.2), FractalType::IrregularBranching);
        assert_eq!(classify_fractal_type(1.8, 5.0), FractalType::DenseFractal);
        assert_eq!(classify_fractal_type(2.2, 0.0), FractalType::SpaceFilling);
        assert_eq!(classify_fractal_type(-0.5, 0.0), FractalType::LinearSparse);
    }

    #[test]
    fn fractal_type_serializes_snake_case() {
        let json = serde_json::to_string(&FractalType::InsufficientContent).unwrap();
        assert_eq!(json, "\"insufficient_content\"");
        assert_eq!(FractalType::IrregularBranching.to_string(), "irregular_branching");
    }

    #[test]
    fn variance_is_population_variance() {
        let (mean, variance) = mean_and_variance(&[1.0, 2.0, 3.0, 4.0]);
        assert_approx_eq!(mean, 2.5, 1e-12);
        assert_approx_eq!(variance, 1.25, 1e-12);
        assert_eq!(mean_and_variance(&[]), (0.0, 0.0));
    }
}
