// src/classifier.rs - Rule-based multi-feature cluster scoring

use log::{debug, error};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::panic::{self, AssertUnwindSafe};

use crate::config::ScoringParams;
use crate::errors::{FractalError, Result};
use crate::feature_extraction::FractalFeatureRecord;
use crate::knowledge_base::{
    cluster, ClusterDefinition, ComplexityLevel, FeatureWeights, CLUSTERS, CLUSTER_COUNT,
    FEATURE_WEIGHTS,
};

/// The seven weighted features; `None` means the feature is absent and its
/// weight is left out of the normalization
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct FeatureVector {
    pub hausdorff_dimension: Option<f64>,
    pub dimension_complexity: Option<f64>,
    pub circularity_mean: Option<f64>,
    pub contour_complexity: Option<f64>,
    pub dimension_variance: Option<f64>,
    pub convexity_mean: Option<f64>,
    pub contour_count: Option<f64>,
}

impl FeatureVector {
    pub const FEATURE_NAMES: [&'static str; 7] = [
        "hausdorff_dimension",
        "dimension_complexity",
        "circularity_mean",
        "contour_complexity",
        "dimension_variance",
        "convexity_mean",
        "contour_count",
    ];

    /// Read the weighted features out of a JSON object. Missing keys are
    /// absent features; other keys are ignored.
    pub fn from_json_map(map: &Map<String, Value>) -> Result<Self> {
        let mut values = [None; 7];
        for (slot, name) in values.iter_mut().zip(Self::FEATURE_NAMES) {
            if let Some(value) = map.get(name) {
                let number = value.as_f64().ok_or_else(|| FractalError::MalformedFeatureInput {
                    feature: name.to_string(),
                    reason: format!("expected a number, got {}", value),
                })?;
                *slot = Some(number);
            }
        }

        let [hausdorff_dimension, dimension_complexity, circularity_mean, contour_complexity, dimension_variance, convexity_mean, contour_count] =
            values;
        Ok(Self {
            hausdorff_dimension,
            dimension_complexity,
            circularity_mean,
            contour_complexity,
            dimension_variance,
            convexity_mean,
            contour_count,
        })
    }

    pub fn from_json_value(value: &Value) -> Result<Self> {
        match value {
            Value::Object(map) => Self::from_json_map(map),
            other => Err(FractalError::MalformedFeatureInput {
                feature: "<record>".to_string(),
                reason: format!("expected a JSON object, got {}", other),
            }),
        }
    }

    /// Name/value pairs in weight order
    pub fn entries(&self) -> [(&'static str, Option<f64>); 7] {
        [
            ("hausdorff_dimension", self.hausdorff_dimension),
            ("dimension_complexity", self.dimension_complexity),
            ("circularity_mean", self.circularity_mean),
            ("contour_complexity", self.contour_complexity),
            ("dimension_variance", self.dimension_variance),
            ("convexity_mean", self.convexity_mean),
            ("contour_count", self.contour_count),
        ]
    }

    /// Every present value must be finite
    pub fn validate(&self) -> Result<()> {
        for (name, value) in self.entries() {
            if let Some(v) = value {
                if !v.is_finite() {
                    return Err(FractalError::MalformedFeatureInput {
                        feature: name.to_string(),
                        reason: format!("non-finite value {}", v),
                    });
                }
            }
        }
        Ok(())
    }

    pub fn present_count(&self) -> usize {
        self.entries().iter().filter(|(_, v)| v.is_some()).count()
    }
}

impl From<&FractalFeatureRecord> for FeatureVector {
    fn from(record: &FractalFeatureRecord) -> Self {
        Self {
            hausdorff_dimension: Some(record.hausdorff_dimension),
            dimension_complexity: Some(record.dimension_complexity),
            circularity_mean: Some(record.circularity_mean),
            contour_complexity: Some(record.contour_complexity),
            dimension_variance: Some(record.dimension_variance),
            convexity_mean: Some(record.convexity_mean),
            contour_count: Some(record.contour_count as f64),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassificationStatus {
    Classified,
    FailedClosed,
}

/// Best cluster, its separation from the runner-up and every cluster's score
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationResult {
    pub cluster_id: usize,
    pub confidence: f64,
    pub scores: BTreeMap<usize, f64>,
    pub status: ClassificationStatus,
}

impl ClassificationResult {
    /// Cluster 0, confidence 0 and all-zero scores
    pub fn failed_closed() -> Self {
        Self {
            cluster_id: 0,
            confidence: 0.0,
            scores: (0..CLUSTER_COUNT).map(|id| (id, 0.0)).collect(),
            status: ClassificationStatus::FailedClosed,
        }
    }

    pub fn is_failed_closed(&self) -> bool {
        self.status == ClassificationStatus::FailedClosed
    }

    /// Gap between the two best scores
    pub fn score_gap(&self) -> f64 {
        let mut sorted: Vec<f64> = self.scores.values().copied().collect();
        sorted.sort_by(|a, b| b.total_cmp(a));
        match sorted.as_slice() {
            [first, second, ..] => first - second,
            [only] => *only,
            [] => 0.0,
        }
    }
}

/// How one feature compares with a cluster's expected interval
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeatureMatch {
    pub value: f64,
    pub expected_range: (f64, f64),
    pub matches: bool,
    pub score: f64,
}

/// Why a record fits (or does not fit) a given cluster
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClusterAnalysis {
    pub cluster_id: usize,
    pub cluster_name: String,
    pub cluster_description: String,
    pub feature_matches: BTreeMap<String, FeatureMatch>,
    pub recommendations: Vec<String>,
}

/// Scores feature vectors against the built-in cluster table
#[derive(Debug, Clone)]
pub struct ClusterScorer {
    pub params: ScoringParams,
    pub weights: FeatureWeights,
}

impl Default for ClusterScorer {
    fn default() -> Self {
        Self::new(ScoringParams::default())
    }
}

impl ClusterScorer {
    pub fn new(params: ScoringParams) -> Self {
        Self {
            params,
            weights: FEATURE_WEIGHTS,
        }
    }

    /// 1.0 at the interval center, 1 - decay at its edges, and falling
    /// linearly to 0 outside it
    pub fn score_in_range(&self, value: f64, (lo, hi): (f64, f64)) -> f64 {
        if lo <= value && value <= hi {
            let half_width = (hi - lo) / 2.0;
            if half_width > 0.0 {
                let center = (lo + hi) / 2.0;
                1.0 - ((value - center).abs() / half_width) * self.params.in_range_decay
            } else {
                1.0
            }
        } else {
            let distance = if value < lo { lo - value } else { value - hi };
            (self.params.out_of_range_base - distance * self.params.out_of_range_slope).max(0.0)
        }
    }

    pub fn complexity_level(&self, contour_complexity: f64) -> ComplexityLevel {
        let normalized = (contour_complexity / self.params.contour_complexity_scale).min(1.0);
        if normalized < self.params.low_complexity_limit {
            ComplexityLevel::Low
        } else if normalized < self.params.medium_complexity_limit {
            ComplexityLevel::Medium
        } else {
            ComplexityLevel::High
        }
    }

    fn proximity(value: f64, preferred: f64, penalty: f64) -> f64 {
        (1.0 - (value - preferred).abs() * penalty).max(0.0)
    }

    /// Weighted similarity of `features` to one cluster, in [0, 1]
    pub fn cluster_score(&self, features: &FeatureVector, def: &ClusterDefinition) -> f64 {
        let profile = def.visual_pattern.profile();
        let params = &self.params;
        let weights = &self.weights;

        let sub_scores = [
            (
                features.hausdorff_dimension.map(|v| self.score_in_range(v, def.hausdorff_range)),
                weights.hausdorff_dimension,
            ),
            (
                features.dimension_complexity.map(|v| self.score_in_range(v, def.complexity_range)),
                weights.dimension_complexity,
            ),
            (
                features.circularity_mean.map(|v| self.score_in_range(v, def.circularity_range)),
                weights.circularity_mean,
            ),
            (
                features
                    .contour_complexity
                    .map(|v| profile.complexity_affinity(self.complexity_level(v))),
                weights.contour_complexity,
            ),
            (
                features
                    .dimension_variance
                    .map(|v| Self::proximity(v, profile.preferred_variance, params.variance_penalty)),
                weights.dimension_variance,
            ),
            (
                features
                    .convexity_mean
                    .map(|v| Self::proximity(v, profile.preferred_convexity, params.convexity_penalty)),
                weights.convexity_mean,
            ),
            (
                features.contour_count.map(|count| {
                    let normalized = (count / params.contour_count_scale).min(1.0);
                    Self::proximity(normalized, profile.preferred_contour_count, params.contour_count_penalty)
                }),
                weights.contour_count,
            ),
        ];

        let mut total_score = 0.0;
        let mut total_weight = 0.0;
        for (score, weight) in sub_scores {
            if let Some(score) = score {
                total_score += score * weight;
                total_weight += weight;
            }
        }

        if total_weight > 0.0 {
            (total_score / total_weight).clamp(0.0, 1.0)
        } else {
            0.0
        }
    }

    /// Score every cluster and pick the best one.
    ///
    /// Ties go to the lowest cluster id. Malformed input or an internal
    /// panic yields the fail-closed result; nothing is propagated.
    pub fn classify(&self, features: &FeatureVector) -> ClassificationResult {
        if let Err(e) = features.validate() {
            error!("Classification failed closed: {}", e);
            return ClassificationResult::failed_closed();
        }

        match panic::catch_unwind(AssertUnwindSafe(|| self.classify_valid(features))) {
            Ok(result) => result,
            Err(_) => {
                error!("Classification failed closed: scorer panicked");
                ClassificationResult::failed_closed()
            }
        }
    }

    /// Classify a JSON feature object
    pub fn classify_json(&self, value: &Value) -> ClassificationResult {
        match FeatureVector::from_json_value(value) {
            Ok(features) => self.classify(&features),
            Err(e) => {
                error!("Classification failed closed: {}", e);
                ClassificationResult::failed_closed()
            }
        }
    }

    pub fn classify_record(&self, record: &FractalFeatureRecord) -> ClassificationResult {
        self.classify(&FeatureVector::from(record))
    }

    fn classify_valid(&self, features: &FeatureVector) -> ClassificationResult {
        let scores: BTreeMap<usize, f64> = CLUSTERS
            .iter()
            .map(|def| (def.id, self.cluster_score(features, def)))
            .collect();

        // Strict comparison in ascending id order keeps the lowest id on ties
        let mut best_id = 0;
        let mut best_score = f64::NEG_INFINITY;
        for (&id, &score) in &scores {
            if score > best_score {
                best_id = id;
                best_score = score;
            }
        }

        let mut result = ClassificationResult {
            cluster_id: best_id,
            confidence: 0.0,
            scores,
            status: ClassificationStatus::Classified,
        };
        result.confidence = result.score_gap().clamp(0.0, 1.0);

        debug!(
            "Best cluster {} (score {:.4}, confidence {:.4}) from {} features",
            best_id,
            best_score,
            result.confidence,
            features.present_count()
        );

        result
    }

    /// Per-feature comparison against one cluster's intervals, plus
    /// follow-up recommendations. None for an unknown cluster id.
    pub fn cluster_analysis(&self, cluster_id: usize, features: &FeatureVector) -> Option<ClusterAnalysis> {
        let def = cluster(cluster_id)?;

        let mut feature_matches = BTreeMap::new();
        let ranged = [
            ("hausdorff_dimension", features.hausdorff_dimension, def.hausdorff_range),
            ("dimension_complexity", features.dimension_complexity, def.complexity_range),
            ("circularity_mean", features.circularity_mean, def.circularity_range),
        ];
        for (name, value, range) in ranged {
            if let Some(value) = value {
                feature_matches.insert(
                    name.to_string(),
                    FeatureMatch {
                        value,
                        expected_range: range,
                        matches: range.0 <= value && value <= range.1,
                        score: self.score_in_range(value, range),
                    },
                );
            }
        }

        let recommendations = match cluster_id {
            0 | 1 => vec!["Verificar parámetros de iteración para mejor resolución de detalles fractales"],
            3 | 6 => vec!["Considerar análisis de ramificación y puntos de bifurcación"],
            8 => vec!["Realizar análisis multifractal completo con espectro de singularidades"],
            _ => Vec::new(),
        };

        Some(ClusterAnalysis {
            cluster_id,
            cluster_name: def.name.to_string(),
            cluster_description: def.description.to_string(),
            feature_matches,
            recommendations: recommendations.into_iter().map(String::from).collect(),
        })
    }

    /// The three best-scoring clusters other than `cluster_id`, best first
    pub fn suggest_similar_clusters(&self, cluster_id: usize, features: &FeatureVector) -> Vec<(usize, f64)> {
        let result = self.classify(features);

        let mut similar: Vec<(usize, f64)> = result
            .scores
            .into_iter()
            .filter(|(id, _)| *id != cluster_id)
            .collect();
        // Stable sort keeps ascending ids among equal scores
        similar.sort_by(|a, b| b.1.total_cmp(&a.1));
        similar.truncate(3);
        similar
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;
    use serde_json::json;

    fn full(h: f64, dc: f64, circ: f64, cc: f64, var: f64, conv: f64, count: f64) -> FeatureVector {
        FeatureVector {
            hausdorff_dimension: Some(h),
            dimension_complexity: Some(dc),
            circularity_mean: Some(circ),
            contour_complexity: Some(cc),
            dimension_variance: Some(var),
            convexity_mean: Some(conv),
            contour_count: Some(count),
        }
    }

    fn round_circle() -> FeatureVector {
        full(1.9, 0.45, 0.9, 3.6, 0.4, 0.98, 1.0)
    }

    #[test]
    fn range_score_reference_points() {
        let scorer = ClusterScorer::default();
        assert_approx_eq!(scorer.score_in_range(2.0, (1.8, 2.2)), 1.0, 1e-12);
        assert_approx_eq!(scorer.score_in_range(1.8, (1.8, 2.2)), 0.8, 1e-12);
        assert_approx_eq!(scorer.score_in_range(2.2, (1.8, 2.2)), 0.8, 1e-12);
        assert_approx_eq!(scorer.score_in_range(1.9, (1.8, 2.2)), 0.9, 1e-12);
        // Outside: 0.5 - distance * 0.1
        assert_approx_eq!(scorer.score_in_range(3.2, (1.8, 2.2)), 0.4, 1e-12);
        assert_approx_eq!(scorer.score_in_range(-10.0, (0.0, 1.0)), 0.0, 1e-12);
        // Zero-width interval
        assert_eq!(scorer.score_in_range(1.0, (1.0, 1.0)), 1.0);
    }

    #[test]
    fn complexity_buckets() {
        let scorer = ClusterScorer::default();
        assert_eq!(scorer.complexity_level(2.9), ComplexityLevel::Low);
        assert_eq!(scorer.complexity_level(3.0), ComplexityLevel::Medium);
        assert_eq!(scorer.complexity_level(6.99), ComplexityLevel::Medium);
        assert_eq!(scorer.complexity_level(7.0), ComplexityLevel::High);
        assert_eq!(scorer.complexity_level(500.0), ComplexityLevel::High);
        assert_eq!(scorer.complexity_level(-4.0), ComplexityLevel::Low);
    }

    #[test]
    fn round_compact_shape_matches_concentric_cluster() {
        let result = ClusterScorer::default().classify(&round_circle());

        assert_eq!(result.status, ClassificationStatus::Classified);
        assert_eq!(result.cluster_id, 0);
        assert_approx_eq!(result.scores[&0], 0.8791, 1e-9);
        assert_approx_eq!(result.scores[&1], 0.764433333333, 1e-9);
        assert_approx_eq!(result.scores[&5], 0.7246, 1e-9);
        assert_approx_eq!(result.confidence, 0.8791 - 0.764433333333, 1e-9);
    }

    #[test]
    fn golden_scores_for_dust_like_record() {
        let result = ClusterScorer::default().classify(&full(1.0, 0.2, 0.25, 2.0, 0.1, 0.9, 80.0));
        let expected = [
            0.46125, 0.58675, 0.98, 0.463, 0.422, 0.6835, 0.36325, 0.44175, 0.4275, 0.40025,
        ];
        for (id, value) in expected.iter().enumerate() {
            assert_approx_eq!(result.scores[&id], *value, 1e-9);
        }
        assert_eq!(result.cluster_id, 2);
        assert_approx_eq!(result.confidence, 0.98 - 0.6835, 1e-9);
    }

    #[test]
    fn missing_features_renormalize_weights() {
        let features = FeatureVector {
            hausdorff_dimension: Some(1.1),
            ..FeatureVector::default()
        };
        let result = ClusterScorer::default().classify(&features);

        assert_eq!(result.cluster_id, 2);
        assert_approx_eq!(result.scores[&2], 1.0, 1e-12);
        assert_approx_eq!(result.scores[&5], 0.866666666667, 1e-9);
        assert_approx_eq!(result.confidence, 1.0 - 0.866666666667, 1e-9);
        assert!(result.scores.values().all(|s| (0.0..=1.0).contains(s)));
    }

    #[test]
    fn empty_vector_scores_zero_and_picks_lowest_id() {
        let result = ClusterScorer::default().classify(&FeatureVector::default());
        assert_eq!(result.cluster_id, 0);
        assert_eq!(result.confidence, 0.0);
        assert_eq!(result.scores.len(), CLUSTER_COUNT);
        assert!(result.scores.values().all(|s| *s == 0.0));
        assert_eq!(result.status, ClassificationStatus::Classified);
    }

    #[test]
    fn extreme_values_stay_bounded() {
        let result = ClusterScorer::default().classify(&full(-1e9, 1e12, -5.0, 1e6, -3.0, 1e9, 1e7));
        assert_eq!(result.cluster_id, 8);
        assert_approx_eq!(result.scores[&8], 0.194, 1e-9);
        assert_approx_eq!(result.confidence, 0.012, 1e-9);

        let huge = ClusterScorer::default().classify(&full(f64::MAX, f64::MAX, f64::MIN, f64::MAX, f64::MAX, f64::MIN, f64::MAX));
        assert!(huge.scores.values().all(|s| (0.0..=1.0).contains(s)));
        assert!((0.0..=1.0).contains(&huge.confidence));
    }

    #[test]
    fn non_finite_input_fails_closed() {
        let mut features = round_circle();
        features.circularity_mean = Some(f64::NAN);
        let result = ClusterScorer::default().classify(&features);
        assert_eq!(result, ClassificationResult::failed_closed());

        features.circularity_mean = Some(f64::INFINITY);
        assert!(ClusterScorer::default().classify(&features).is_failed_closed());
    }

    #[test]
    fn json_input_parsing() {
        let scorer = ClusterScorer::default();

        let value = json!({
            "hausdorff_dimension": 1.9,
            "dimension_complexity": 0.45,
            "circularity_mean": 0.9,
            "contour_complexity": 3.6,
            "dimension_variance": 0.4,
            "convexity_mean": 0.98,
            "contour_count": 1,
            "fractal_type": "dense_fractal"
        });
        assert_eq!(scorer.classify_json(&value), scorer.classify(&round_circle()));

        let malformed = json!({ "hausdorff_dimension": "high" });
        assert!(FeatureVector::from_json_value(&malformed).is_err());
        assert!(scorer.classify_json(&malformed).is_failed_closed());

        assert!(scorer.classify_json(&json!([1.0, 2.0])).is_failed_closed());
    }

    #[test]
    fn classification_is_deterministic() {
        let scorer = ClusterScorer::default();
        let features = full(1.55, 0.6, 0.35, 8.0, 0.7, 0.4, 45.0);
        assert_eq!(scorer.classify(&features), scorer.classify(&features));
    }

    #[test]
    fn analysis_reports_ranges_and_recommendations() {
        let scorer = ClusterScorer::default();
        let analysis = scorer.cluster_analysis(0, &round_circle()).unwrap();

        assert_eq!(analysis.cluster_name, "Mandelbrot Clásico");
        let hausdorff = &analysis.feature_matches["hausdorff_dimension"];
        assert!(hausdorff.matches);
        assert_approx_eq!(hausdorff.score, 0.9, 1e-12);
        assert_approx_eq!(analysis.feature_matches["dimension_complexity"].score, 0.95, 1e-12);
        // Upper bound is inclusive
        let circularity = &analysis.feature_matches["circularity_mean"];
        assert!(circularity.matches);
        assert_approx_eq!(circularity.score, 0.8, 1e-9);
        assert_eq!(analysis.recommendations.len(), 1);

        assert!(scorer.cluster_analysis(4, &round_circle()).unwrap().recommendations.is_empty());
        assert!(scorer.cluster_analysis(10, &round_circle()).is_none());
    }

    #[test]
    fn similar_clusters_exclude_the_assigned_one() {
        let scorer = ClusterScorer::default();
        let similar = scorer.suggest_similar_clusters(0, &round_circle());
        let ids: Vec<usize> = similar.iter().map(|(id, _)| *id).collect();
        assert_eq!(ids, vec![1, 5, 7]);

        // All zero: ties fall back to ascending id
        let ties = scorer.suggest_similar_clusters(0, &FeatureVector::default());
        assert_eq!(ties, vec![(1, 0.0), (2, 0.0), (3, 0.0)]);
    }
}
