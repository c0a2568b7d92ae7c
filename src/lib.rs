// src/lib.rs - Library interface for fractal family classification

pub mod arbitration;
pub mod box_counting;
pub mod classifier;
pub mod config;
pub mod dimension;
pub mod edge_detection;
pub mod errors;
pub mod feature_extraction;
pub mod geometry;
pub mod image_utils;
pub mod knowledge_base;
pub mod output;
pub mod pipeline;
pub mod shape_analysis;

// Re-export commonly used types and functions
pub use errors::{FractalError, Result};
pub use config::{ArbitrationParams, Config, ContourRetrieval, ScoringParams};
pub use pipeline::{AnalysisReport, FractalAnalyzer};

// Re-export dimension estimation
pub use box_counting::{count_occupied_boxes, generate_box_sizes};
pub use dimension::{
    classify_fractal_type,
    DimensionEstimate,
    DimensionEstimator,
    DimensionFeatures,
    FractalType,
    ScaleStatus,
};

// Re-export contour analysis
pub use shape_analysis::{ContourAnalyzer, ContourFeatures};

// Re-export feature extraction and classification
pub use feature_extraction::{
    ContourExtractor,
    FeatureExtractor,
    FractalFeatureRecord,
    HausdorffExtractor,
    PartialFeatures,
};
pub use classifier::{ClassificationResult, ClassificationStatus, ClusterScorer, FeatureVector};
pub use knowledge_base::{cluster_name, describe_cluster, ClusterDefinition, VisualPattern, CLUSTERS};
pub use arbitration::{arbitrate, ArbitrationMethod, ArbitrationOutcome};
pub use edge_detection::{CannyEdgeDetector, EdgeDetector};
