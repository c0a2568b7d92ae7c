// src/pipeline.rs - Binary image to features to fractal family

use image::GrayImage;
use log::{debug, error, info};
use rayon::prelude::*;
use serde::Serialize;
use std::panic::{self, AssertUnwindSafe};

use crate::arbitration::{arbitrate_with, ArbitrationOutcome};
use crate::classifier::{ClassificationResult, ClusterScorer, FeatureVector};
use crate::config::Config;
use crate::edge_detection::{CannyEdgeDetector, EdgeDetector};
use crate::errors::Result;
use crate::feature_extraction::{
    generate_features, ContourExtractor, FeatureExtractor, FractalFeatureRecord, HausdorffExtractor,
};
use crate::image_utils::BinaryImage;
use crate::knowledge_base::cluster_name;

/// Features and classification of one image
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisReport {
    pub features: FractalFeatureRecord,
    pub classification: ClassificationResult,
    pub cluster_name: String,
    /// Up to three runner-up clusters, best first
    pub similar_clusters: Vec<(usize, f64)>,
}

/// Runs the dimension and contour extractors and the cluster scorer with
/// one configuration
pub struct FractalAnalyzer {
    config: Config,
    dimension_extractor: Box<dyn FeatureExtractor>,
    contour_extractor: Box<dyn FeatureExtractor>,
    scorer: ClusterScorer,
}

impl Default for FractalAnalyzer {
    fn default() -> Self {
        Self::from_valid_config(Config::default())
    }
}

impl FractalAnalyzer {
    /// Build an analyzer; the configuration is validated first
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;
        Ok(Self::from_valid_config(config))
    }

    fn from_valid_config(config: Config) -> Self {
        Self {
            dimension_extractor: Box::new(HausdorffExtractor::from_config(&config)),
            contour_extractor: Box::new(ContourExtractor::from_config(&config)),
            scorer: ClusterScorer::new(config.scoring.clone()),
            config,
        }
    }

    /// Replace the default extractors
    pub fn with_extractors(
        mut self,
        dimension_extractor: Box<dyn FeatureExtractor>,
        contour_extractor: Box<dyn FeatureExtractor>,
    ) -> Self {
        self.dimension_extractor = dimension_extractor;
        self.contour_extractor = contour_extractor;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn scorer(&self) -> &ClusterScorer {
        &self.scorer
    }

    /// Feature record of a binary image.
    ///
    /// A panic inside an extractor is caught and turned into a zeroed
    /// record with `fractal_type = error`.
    pub fn extract_features(&self, image: &BinaryImage) -> FractalFeatureRecord {
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            generate_features(
                self.dimension_extractor.as_ref(),
                self.contour_extractor.as_ref(),
                image,
                self.config.regions,
                self.config.use_parallel,
            )
        }));

        match outcome {
            Ok(record) => record,
            Err(_) => {
                error!(
                    "Feature extraction panicked on a {}x{} image",
                    image.width(),
                    image.height()
                );
                FractalFeatureRecord::error(self.config.regions)
            }
        }
    }

    /// Classify an already extracted feature vector
    pub fn classify(&self, features: &FeatureVector) -> ClassificationResult {
        self.scorer.classify(features)
    }

    /// Features, classification and similar clusters of a binary image
    pub fn analyze(&self, image: &BinaryImage) -> AnalysisReport {
        let features = self.extract_features(image);
        self.report(features)
    }

    /// Run `detector` first, then analyze the edge map
    pub fn analyze_grayscale(&self, image: &GrayImage, detector: &dyn EdgeDetector) -> AnalysisReport {
        let edges = match panic::catch_unwind(AssertUnwindSafe(|| detector.detect(image))) {
            Ok(edges) => edges,
            Err(_) => {
                error!("Edge detection panicked");
                return self.report(FractalFeatureRecord::error(self.config.regions));
            }
        };
        self.analyze(&edges)
    }

    /// `analyze_grayscale` with the configured Canny detector
    pub fn analyze_grayscale_default(&self, image: &GrayImage) -> AnalysisReport {
        self.analyze_grayscale(image, &CannyEdgeDetector::from_config(&self.config))
    }

    /// Analyze many binary images; results keep the input order
    pub fn analyze_batch(&self, images: &[BinaryImage]) -> Vec<AnalysisReport> {
        info!("Analyzing {} images", images.len());
        if self.config.use_parallel {
            images.par_iter().map(|image| self.analyze(image)).collect()
        } else {
            images.iter().map(|image| self.analyze(image)).collect()
        }
    }

    /// Combine the rule-based result of `report` with an external K-means label
    pub fn arbitrate(&self, kmeans_id: usize, report: &AnalysisReport) -> ArbitrationOutcome {
        arbitrate_with(kmeans_id, &report.classification, &self.config.arbitration)
    }

    fn report(&self, features: FractalFeatureRecord) -> AnalysisReport {
        let vector = FeatureVector::from(&features);
        let classification = self.scorer.classify(&vector);
        let similar_clusters = self
            .scorer
            .suggest_similar_clusters(classification.cluster_id, &vector);

        debug!(
            "D = {:.4} ({}), cluster {} with confidence {:.3}",
            features.hausdorff_dimension,
            features.fractal_type,
            classification.cluster_id,
            classification.confidence
        );

        AnalysisReport {
            cluster_name: cluster_name(classification.cluster_id),
            features,
            classification,
            similar_clusters,
        }
    }
}
