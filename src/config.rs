// src/config.rs - Analysis, scoring and arbitration parameters

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::errors::{FractalError, Result};

/// Largest accepted local dimension grid side
pub const MAX_REGIONS: u32 = 256;

/// Configuration for fractal dimension estimation and classification
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct Config {
    // Box-counting scale range
    #[serde(default = "default_min_box_size")]
    pub min_box_size: u32,

    #[serde(default = "default_max_box_size")]
    pub max_box_size: u32,

    // Passed through to the edge detector
    #[serde(default = "default_edge_threshold1")]
    pub edge_threshold1: f32,

    #[serde(default = "default_edge_threshold2")]
    pub edge_threshold2: f32,

    #[serde(default = "default_edge_blur_sigma")]
    pub edge_blur_sigma: f32,

    // Local dimension grid (regions x regions)
    #[serde(default = "default_regions")]
    pub regions: u32,

    #[serde(default = "default_local_min_foreground")]
    pub local_min_foreground: u64,

    #[serde(default = "default_insufficient_content_threshold")]
    pub insufficient_content_threshold: u64,

    // Contour analysis
    #[serde(default = "default_min_contour_area")]
    pub min_contour_area: f64,

    #[serde(default)]
    pub contour_retrieval: ContourRetrieval,

    #[serde(default = "default_parallel")]
    pub use_parallel: bool,

    #[serde(default)]
    pub scoring: ScoringParams,

    #[serde(default)]
    pub arbitration: ArbitrationParams,
}

/// Which traced borders take part in contour analysis
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ContourRetrieval {
    /// Outermost borders only (no enclosing border)
    #[default]
    External,
    /// Every outer border, including ones nested inside holes
    All,
}

/// Coefficients of the cluster scoring rules.
///
/// The defaults are empirically chosen reference values; tests pin them as
/// golden values.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct ScoringParams {
    /// Score lost between the centre and the edge of a range
    pub in_range_decay: f64,
    /// Score just outside a range
    pub out_of_range_base: f64,
    /// Score lost per unit of distance outside a range
    pub out_of_range_slope: f64,
    /// Contour complexity is divided by this before bucketing
    pub contour_complexity_scale: f64,
    /// Upper bound (exclusive) of the low complexity bucket
    pub low_complexity_limit: f64,
    /// Upper bound (exclusive) of the medium complexity bucket
    pub medium_complexity_limit: f64,
    pub variance_penalty: f64,
    pub convexity_penalty: f64,
    /// Contour count is divided by this before comparison
    pub contour_count_scale: f64,
    pub contour_count_penalty: f64,
}

impl Default for ScoringParams {
    fn default() -> Self {
        Self {
            in_range_decay: 0.2,
            out_of_range_base: 0.5,
            out_of_range_slope: 0.1,
            contour_complexity_scale: 10.0,
            low_complexity_limit: 0.3,
            medium_complexity_limit: 0.7,
            variance_penalty: 2.0,
            convexity_penalty: 1.5,
            contour_count_scale: 100.0,
            contour_count_penalty: 1.2,
        }
    }
}

/// Thresholds of the rule-based / K-means arbitration table
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct ArbitrationParams {
    pub high_rule_confidence: f64,
    pub agreement_bonus: f64,
    pub agreement_cap: f64,
    pub significant_gap: f64,
    pub gap_bonus_factor: f64,
    pub kmeans_base_confidence: f64,
    pub disagreement_factor: f64,
}

impl Default for ArbitrationParams {
    fn default() -> Self {
        Self {
            high_rule_confidence: 0.8,
            agreement_bonus: 0.3,
            agreement_cap: 0.95,
            significant_gap: 0.2,
            gap_bonus_factor: 0.5,
            kmeans_base_confidence: 0.6,
            disagreement_factor: 0.7,
        }
    }
}

fn default_min_box_size() -> u32 {
    2
}

fn default_max_box_size() -> u32 {
    128
}

fn default_edge_threshold1() -> f32 {
    50.0
}

fn default_edge_threshold2() -> f32 {
    150.0
}

fn default_edge_blur_sigma() -> f32 {
    0.8 // Equivalent of a 3x3 Gaussian kernel
}

fn default_regions() -> u32 {
    4
}

fn default_local_min_foreground() -> u64 {
    50
}

fn default_insufficient_content_threshold() -> u64 {
    30
}

fn default_min_contour_area() -> f64 {
    50.0
}

fn default_parallel() -> bool {
    true
}

impl Default for Config {
    fn default() -> Self {
        Self {
            min_box_size: default_min_box_size(),
            max_box_size: default_max_box_size(),
            edge_threshold1: default_edge_threshold1(),
            edge_threshold2: default_edge_threshold2(),
            edge_blur_sigma: default_edge_blur_sigma(),
            regions: default_regions(),
            local_min_foreground: default_local_min_foreground(),
            insufficient_content_threshold: default_insufficient_content_threshold(),
            min_contour_area: default_min_contour_area(),
            contour_retrieval: ContourRetrieval::External,
            use_parallel: default_parallel(),
            scoring: ScoringParams::default(),
            arbitration: ArbitrationParams::default(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            FractalError::Config(format!("Failed to read config file '{}': {}", path.display(), e))
        })?;

        toml::from_str(&content).map_err(|source| FractalError::ConfigLoad {
            source,
            path: path.to_path_buf(),
        })
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.min_box_size == 0 {
            return Err(FractalError::Config(
                "min_box_size must be > 0".to_string(),
            ));
        }

        if self.max_box_size < self.min_box_size {
            return Err(FractalError::Config(
                "max_box_size must be >= min_box_size".to_string(),
            ));
        }

        if self.regions == 0 {
            return Err(FractalError::Config(
                "regions must be > 0".to_string(),
            ));
        }

        if self.regions > MAX_REGIONS {
            return Err(FractalError::Config(format!(
                "regions must be <= {}, got {}",
                MAX_REGIONS, self.regions
            )));
        }

        if self.edge_threshold1 < 0.0 || self.edge_threshold2 < self.edge_threshold1 {
            return Err(FractalError::Config(
                "edge thresholds must satisfy 0 <= edge_threshold1 <= edge_threshold2".to_string(),
            ));
        }

        if self.edge_blur_sigma <= 0.0 {
            return Err(FractalError::Config(
                "edge_blur_sigma must be > 0.0".to_string(),
            ));
        }

        if !(self.min_contour_area >= 0.0) {
            return Err(FractalError::Config(
                "min_contour_area must be >= 0.0".to_string(),
            ));
        }

        let scoring = &self.scoring;
        if scoring.contour_complexity_scale <= 0.0 || scoring.contour_count_scale <= 0.0 {
            return Err(FractalError::Config(
                "scoring normalization scales must be > 0.0".to_string(),
            ));
        }

        if scoring.low_complexity_limit > scoring.medium_complexity_limit {
            return Err(FractalError::Config(
                "low_complexity_limit must be <= medium_complexity_limit".to_string(),
            ));
        }

        Ok(())
    }

    /// Save configuration to a TOML file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        fs::write(path, self.to_toml()?)?;
        Ok(())
    }

    /// Render configuration as TOML
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| {
            FractalError::Config(format!("Failed to serialize config: {}", e))
        })
    }
}
