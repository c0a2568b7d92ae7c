// src/arbitration.rs - Combine an external K-means label with the rule-based result

use log::debug;
use serde::{Deserialize, Serialize};

use crate::classifier::ClassificationResult;
use crate::config::ArbitrationParams;

/// Which branch of the decision table produced the final label
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArbitrationMethod {
    RuleHighConfidence,
    Agreement,
    RuleSignificantGap,
    RuleHigherConfidence,
    KmeansWithDisagreement,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ArbitrationOutcome {
    pub cluster_id: usize,
    pub confidence: f64,
    pub method: ArbitrationMethod,
}

/// Pick between the two labels. Branches are tried in order:
/// confident rules, agreement, a large score gap, rules more confident than
/// the K-means baseline, and finally K-means with a disagreement discount.
pub fn arbitrate(
    kmeans_id: usize,
    rule_id: usize,
    rule_confidence: f64,
    score_gap: f64,
    params: &ArbitrationParams,
) -> ArbitrationOutcome {
    let (cluster_id, confidence, method) = if rule_confidence > params.high_rule_confidence {
        (rule_id, rule_confidence, ArbitrationMethod::RuleHighConfidence)
    } else if kmeans_id == rule_id {
        (
            rule_id,
            (rule_confidence + params.agreement_bonus).min(params.agreement_cap),
            ArbitrationMethod::Agreement,
        )
    } else if score_gap > params.significant_gap {
        (
            rule_id,
            rule_confidence + score_gap * params.gap_bonus_factor,
            ArbitrationMethod::RuleSignificantGap,
        )
    } else if rule_confidence > params.kmeans_base_confidence {
        (rule_id, rule_confidence, ArbitrationMethod::RuleHigherConfidence)
    } else {
        (
            kmeans_id,
            params.kmeans_base_confidence * params.disagreement_factor,
            ArbitrationMethod::KmeansWithDisagreement,
        )
    };

    debug!(
        "Arbitration kmeans={} rules={} -> {} ({:?})",
        kmeans_id, rule_id, cluster_id, method
    );

    ArbitrationOutcome {
        cluster_id,
        confidence: confidence.clamp(0.0, 1.0),
        method,
    }
}

/// Arbitrate against a finished rule-based classification
pub fn arbitrate_with(
    kmeans_id: usize,
    result: &ClassificationResult,
    params: &ArbitrationParams,
) -> ArbitrationOutcome {
    arbitrate(
        kmeans_id,
        result.cluster_id,
        result.confidence,
        result.score_gap(),
        params,
    )
}
