// src/feature_extraction.rs - Feature extractors and the combined feature record

use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::dimension::{DimensionEstimator, DimensionFeatures, FractalType, ScaleStatus};
use crate::image_utils::BinaryImage;
use crate::shape_analysis::{ContourAnalyzer, ContourFeatures};

/// Everything measured on one binary image.
///
/// Flat on the wire: numbers, strings and the fixed-length
/// `local_dimensions` sequence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FractalFeatureRecord {
    pub hausdorff_dimension: f64,
    /// Row-major, regions² entries, each in [0, 3]
    pub local_dimensions: Vec<f64>,
    pub dimension_variance: f64,
    pub dimension_complexity: f64,
    pub fractal_type: FractalType,

    /// Quality of the global log-log fit
    pub r_squared: f64,
    pub valid_scales: usize,
    pub dimension_status: ScaleStatus,

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

impl FractalFeatureRecord {
    /// Merge the two partial feature sets
    pub fn from_parts(dimension: DimensionFeatures, contours: ContourFeatures) -> Self {
        Self {
            hausdorff_dimension: dimension.hausdorff_dimension,
            local_dimensions: dimension.local_dimensions,
            dimension_variance: dimension.dimension_variance,
            dimension_complexity: dimension.dimension_complexity,
            fractal_type: dimension.fractal_type,
            r_squared: dimension.estimate.r_squared,
            valid_scales: dimension.estimate.valid_points(),
            dimension_status: dimension.estimate.status,
            contour_count: contours.contour_count,
            total_perimeter: contours.total_perimeter,
            avg_area: contours.avg_area,
            contour_complexity: contours.contour_complexity,
            circularity_mean: contours.circularity_mean,
            circularity_std: contours.circularity_std,
            convexity_mean: contours.convexity_mean,
            aspect_ratio_mean: contours.aspect_ratio_mean,
            contour_hierarchy_depth: contours.contour_hierarchy_depth,
        }
    }

    /// Zeroed record tagged `fractal_type = error`
    pub fn error(regions: u32) -> Self {
        Self::from_parts(
            DimensionFeatures::degenerate(regions, FractalType::Error),
            ContourFeatures::default(),
        )
    }
}

/// Partial feature set produced by one extractor
#[derive(Debug, Clone, PartialEq)]
pub enum PartialFeatures {
    Dimension(DimensionFeatures),
    Contour(ContourFeatures),
}

/// Takes a binary image and returns a named partial feature set
pub trait FeatureExtractor: Send + Sync {
    fn name(&self) -> &'static str;
    fn extract(&self, image: &BinaryImage) -> PartialFeatures;
}

/// Global and local box-counting dimensions
#[derive(Debug, Clone, Default)]
pub struct HausdorffExtractor {
    pub estimator: DimensionEstimator,
}

impl HausdorffExtractor {
    pub fn from_config(config: &Config) -> Self {
        Self {
            estimator: DimensionEstimator::from_config(config),
        }
    }
}

impl FeatureExtractor for HausdorffExtractor {
    fn name(&self) -> &'static str {
        "hausdorff"
    }

    fn extract(&self, image: &BinaryImage) -> PartialFeatures {
        PartialFeatures::Dimension(self.estimator.extract(image))
    }
}

/// Contour shape statistics
#[derive(Debug, Clone, Default)]
pub struct ContourExtractor {
    pub analyzer: ContourAnalyzer,
}

impl ContourExtractor {
    pub fn from_config(config: &Config) -> Self {
        Self {
            analyzer: ContourAnalyzer::from_config(config),
        }
    }
}

impl FeatureExtractor for ContourExtractor {
    fn name(&self) -> &'static str {
        "contours"
    }

    fn extract(&self, image: &BinaryImage) -> PartialFeatures {
        PartialFeatures::Contour(self.analyzer.extract(image))
    }
}

/// Run the dimension and contour extractors and merge their output.
///
/// The two extractors are independent and run concurrently when
/// `parallel` is set.
pub fn generate_features(
    dimension_extractor: &dyn FeatureExtractor,
    contour_extractor: &dyn FeatureExtractor,
    image: &BinaryImage,
    regions: u32,
    parallel: bool,
) -> FractalFeatureRecord {
    let (first, second) = if parallel {
        rayon::join(
            || dimension_extractor.extract(image),
            || contour_extractor.extract(image),
        )
    } else {
        (dimension_extractor.extract(image), contour_extractor.extract(image))
    };

    let mut dimension = None;
    let mut contours = None;
    for partial in [first, second] {
        match partial {
            PartialFeatures::Dimension(features) => dimension = Some(features),
            PartialFeatures::Contour(features) => contours = Some(features),
        }
    }

    FractalFeatureRecord::from_parts(
        dimension.unwrap_or_else(|| DimensionFeatures::degenerate(regions, FractalType::Error)),
        contours.unwrap_or_default(),
    )
}
