// src/knowledge_base.rs - Built-in fractal family definitions and feature weights

use serde::{Deserialize, Serialize};
use std::fmt;

/// Number of built-in clusters
pub const CLUSTER_COUNT: usize = 10;

/// Visual category a cluster is tagged with; selects the compatibility
/// profile used for the qualitative sub-scores
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VisualPattern {
    ConcentricCircular,
    SymmetricConnected,
    DisconnectedDust,
    BranchingTree,
    DivergentEscape,
    LinearCurve,
    ChaoticAttractor,
    CrystallineDla,
    Multifractal,
    PercolationNetwork,
}

/// Bucket of normalized contour complexity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComplexityLevel {
    Low,
    Medium,
    High,
}

/// Per-pattern compatibility table
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PatternProfile {
    pub low_complexity: f64,
    pub medium_complexity: f64,
    pub high_complexity: f64,
    pub preferred_variance: f64,
    pub preferred_convexity: f64,
    /// Preferred contour count after normalizing into [0, 1]
    pub preferred_contour_count: f64,
}

impl PatternProfile {
    pub fn complexity_affinity(&self, level: ComplexityLevel) -> f64 {
        match level {
            ComplexityLevel::Low => self.low_complexity,
            ComplexityLevel::Medium => self.medium_complexity,
            ComplexityLevel::High => self.high_complexity,
        }
    }
}

const fn profile(
    low: f64,
    medium: f64,
    high: f64,
    variance: f64,
    convexity: f64,
    contour_count: f64,
) -> PatternProfile {
    PatternProfile {
        low_complexity: low,
        medium_complexity: medium,
        high_complexity: high,
        preferred_variance: variance,
        preferred_convexity: convexity,
        preferred_contour_count: contour_count,
    }
}

static CONCENTRIC_CIRCULAR: PatternProfile = profile(0.3, 1.0, 0.7, 0.3, 0.8, 0.3);
static SYMMETRIC_CONNECTED: PatternProfile = profile(0.6, 1.0, 0.4, 0.2, 0.7, 0.2);
static DISCONNECTED_DUST: PatternProfile = profile(1.0, 0.4, 0.2, 0.1, 0.9, 0.8);
static BRANCHING_TREE: PatternProfile = profile(0.3, 0.7, 1.0, 0.6, 0.3, 0.6);
static DIVERGENT_ESCAPE: PatternProfile = profile(0.2, 0.8, 1.0, 0.8, 0.4, 0.4);
static LINEAR_CURVE: PatternProfile = profile(0.8, 1.0, 0.3, 0.4, 0.6, 0.1);
static CHAOTIC_ATTRACTOR: PatternProfile = profile(0.1, 0.6, 1.0, 0.9, 0.2, 0.7);
static CRYSTALLINE_DLA: PatternProfile = profile(0.4, 1.0, 0.6, 0.5, 0.6, 0.5);
static MULTIFRACTAL: PatternProfile = profile(0.1, 0.5, 1.0, 1.0, 0.4, 0.9);
static PERCOLATION_NETWORK: PatternProfile = profile(0.3, 1.0, 0.8, 0.7, 0.3, 0.8);

impl VisualPattern {
    pub fn profile(&self) -> &'static PatternProfile {
        match self {
            VisualPattern::ConcentricCircular => &CONCENTRIC_CIRCULAR,
            VisualPattern::SymmetricConnected => &SYMMETRIC_CONNECTED,
            VisualPattern::DisconnectedDust => &DISCONNECTED_DUST,
            VisualPattern::BranchingTree => &BRANCHING_TREE,
            VisualPattern::DivergentEscape => &DIVERGENT_ESCAPE,
            VisualPattern::LinearCurve => &LINEAR_CURVE,
            VisualPattern::ChaoticAttractor => &CHAOTIC_ATTRACTOR,
            VisualPattern::CrystallineDla => &CRYSTALLINE_DLA,
            VisualPattern::Multifractal => &MULTIFRACTAL,
            VisualPattern::PercolationNetwork => &PERCOLATION_NETWORK,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            VisualPattern::ConcentricCircular => "concentric_circular",
            VisualPattern::SymmetricConnected => "symmetric_connected",
            VisualPattern::DisconnectedDust => "disconnected_dust",
            VisualPattern::BranchingTree => "branching_tree",
            VisualPattern::DivergentEscape => "divergent_escape",
            VisualPattern::LinearCurve => "linear_curve",
            VisualPattern::ChaoticAttractor => "chaotic_attractor",
            VisualPattern::CrystallineDla => "crystalline_dla",
            VisualPattern::Multifractal => "multifractal",
            VisualPattern::PercolationNetwork => "percolation_network",
        }
    }
}

impl fmt::Display for VisualPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Descriptive only; not used in scoring
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelfSimilarity {
    Low,
    Medium,
    High,
    VeryHigh,
    Variable,
}

/// One fractal family
#[derive(Debug, Clone, Serialize)]
pub struct ClusterDefinition {
    pub id: usize,
    pub name: &'static str,
    pub description: &'static str,
    /// Closed intervals
    pub hausdorff_range: (f64, f64),
    pub complexity_range: (f64, f64),
    pub circularity_range: (f64, f64),
    pub visual_pattern: VisualPattern,
    pub self_similarity: SelfSimilarity,
    pub typical_traits: &'static [&'static str],
}

/// The ten fractal families, indexed by id
pub static CLUSTERS: [ClusterDefinition; CLUSTER_COUNT] = [
    ClusterDefinition {
        id: 0,
        name: "Mandelbrot Clásico",
        description: "Formas circulares concéntricas con estructura de bulbo principal y cardioide",
        hausdorff_range: (1.8, 2.2),
        complexity_range: (0.3, 0.7),
        circularity_range: (0.6, 0.9),
        visual_pattern: VisualPattern::ConcentricCircular,
        self_similarity: SelfSimilarity::High,
        typical_traits: &["main_bulb", "cardioid_shape", "spiral_tendrils"],
    },
    ClusterDefinition {
        id: 1,
        name: "Julia Set Conectado",
        description: "Conjuntos de Julia conectados con simetría axial y estructura fractal coherente",
        hausdorff_range: (1.5, 1.9),
        complexity_range: (0.2, 0.5),
        circularity_range: (0.4, 0.8),
        visual_pattern: VisualPattern::SymmetricConnected,
        self_similarity: SelfSimilarity::Medium,
        typical_traits: &["axial_symmetry", "connected_structure", "smooth_boundary"],
    },
    ClusterDefinition {
        id: 2,
        name: "Julia Set Desconectado (Polvo de Cantor)",
        description: "Conjuntos de Julia desconectados con estructura de polvo fractal",
        hausdorff_range: (0.8, 1.4),
        complexity_range: (0.1, 0.3),
        circularity_range: (0.1, 0.4),
        visual_pattern: VisualPattern::DisconnectedDust,
        self_similarity: SelfSimilarity::High,
        typical_traits: &["disconnected_points", "cantor_dust", "sparse_distribution"],
    },
    ClusterDefinition {
        id: 3,
        name: "Fractal Arborescente (IFS)",
        description: "Estructuras tipo árbol, helecho o sistema vascular generadas por IFS",
        hausdorff_range: (1.2, 1.7),
        complexity_range: (0.4, 0.8),
        circularity_range: (0.1, 0.3),
        visual_pattern: VisualPattern::BranchingTree,
        self_similarity: SelfSimilarity::High,
        typical_traits: &["branching_structure", "hierarchical_levels", "organic_appearance"],
    },
    ClusterDefinition {
        id: 4,
        name: "Fractales de Escape Divergente",
        description: "Patrones con escape rápido, bordes difusos y transiciones graduales",
        hausdorff_range: (1.6, 2.0),
        complexity_range: (0.5, 0.9),
        circularity_range: (0.2, 0.6),
        visual_pattern: VisualPattern::DivergentEscape,
        self_similarity: SelfSimilarity::Low,
        typical_traits: &["blurred_boundaries", "gradient_transitions", "escape_patterns"],
    },
    ClusterDefinition {
        id: 5,
        name: "Fractales Lineales y Curvas",
        description: "Curvas fractales como Koch, Peano, y curvas de relleno del espacio",
        hausdorff_range: (1.0, 1.6),
        complexity_range: (0.3, 0.6),
        circularity_range: (0.1, 0.4),
        visual_pattern: VisualPattern::LinearCurve,
        self_similarity: SelfSimilarity::VeryHigh,
        typical_traits: &["curve_dominated", "linear_segments"],
    },
    ClusterDefinition {
        id: 6,
        name: "Fractales de Atractor Extraño",
        description: "Atractores caóticos como Lorenz, Rössler, con trayectorias complejas",
        hausdorff_range: (1.4, 2.1),
        complexity_range: (0.6, 1.0),
        circularity_range: (0.3, 0.7),
        visual_pattern: VisualPattern::ChaoticAttractor,
        self_similarity: SelfSimilarity::Medium,
        typical_traits: &["chaotic_trajectory", "strange_attractor", "phase_space"],
    },
    ClusterDefinition {
        id: 7,
        name: "Fractales Cristalinos",
        description: "Estructuras con simetría cristalina, agregados de difusión limitada (DLA)",
        hausdorff_range: (1.5, 1.8),
        complexity_range: (0.4, 0.7),
        circularity_range: (0.5, 0.8),
        visual_pattern: VisualPattern::CrystallineDla,
        self_similarity: SelfSimilarity::Medium,
        typical_traits: &["crystalline_symmetry", "dla_growth", "radial_structure"],
    },
    ClusterDefinition {
        id: 8,
        name: "Fractales Multifractales",
        description: "Patrones con múltiples dimensiones fractales, estructuras heterogéneas",
        hausdorff_range: (1.3, 2.3),
        complexity_range: (0.7, 1.2),
        circularity_range: (0.2, 0.8),
        visual_pattern: VisualPattern::Multifractal,
        self_similarity: SelfSimilarity::Variable,
        typical_traits: &["multiple_dimensions", "heterogeneous_scaling", "varying_density"],
    },
    ClusterDefinition {
        id: 9,
        name: "Fractales de Percolación",
        description: "Estructuras de percolación, redes complejas y clusters conectados",
        hausdorff_range: (1.6, 2.0),
        complexity_range: (0.5, 0.9),
        circularity_range: (0.3, 0.6),
        visual_pattern: VisualPattern::PercolationNetwork,
        self_similarity: SelfSimilarity::Low,
        typical_traits: &["percolation_clusters", "network_topology", "connectivity_patterns"],
    },
];

/// Weight of each scored feature; the seven weights sum to 1.0
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FeatureWeights {
    pub hausdorff_dimension: f64,
    pub dimension_complexity: f64,
    pub circularity_mean: f64,
    pub contour_complexity: f64,
    pub dimension_variance: f64,
    pub convexity_mean: f64,
    pub contour_count: f64,
}

pub const FEATURE_WEIGHTS: FeatureWeights = FeatureWeights {
    hausdorff_dimension: 0.30,
    dimension_complexity: 0.20,
    circularity_mean: 0.15,
    contour_complexity: 0.15,
    dimension_variance: 0.10,
    convexity_mean: 0.05,
    contour_count: 0.05,
};

impl FeatureWeights {
    pub fn total(&self) -> f64 {
        self.hausdorff_dimension
            + self.dimension_complexity
            + self.circularity_mean
            + self.contour_complexity
            + self.dimension_variance
            + self.convexity_mean
            + self.contour_count
    }
}

/// Look up a cluster by id
pub fn cluster(id: usize) -> Option<&'static ClusterDefinition> {
    CLUSTERS.get(id)
}

/// "name: description", or a placeholder for unknown ids
pub fn describe_cluster(id: usize) -> String {
    match cluster(id) {
        Some(def) => format!("{}: {}", def.name, def.description),
        None => format!("Cluster {}: Sin descripción asignada.", id),
    }
}

pub fn cluster_name(id: usize) -> String {
    match cluster(id) {
        Some(def) => def.name.to_string(),
        None => format!("Cluster {}", id),
    }
}
