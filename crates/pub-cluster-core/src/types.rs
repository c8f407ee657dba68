//! Core domain types for the clustering engine.
//!
//! All entities here are constructed fresh per clustering call, immutable once
//! returned, and never persisted by the engine. Input documents are read-only.
//!
//! # Key Types
//!
//! - [`Document`]: input record with an optional precomputed embedding
//! - [`ClusterRecord`]: one discovered group with descriptive metadata
//! - [`ParameterSweep`]: the full candidate-k diagnostic table
//! - [`QualityReport`]: silhouette / noise-share / sweep diagnostics
//! - [`ClusteringOutcome`]: the one composite result object per call

use std::collections::HashMap;

use serde::{Deserialize, Deserializer, Serialize};

/// Noise label used by density-based methods for unassigned points.
pub const NOISE_LABEL: i32 = -1;

// =============================================================================
// Document
// =============================================================================

/// An input document with a precomputed embedding vector.
///
/// The embedding may be absent or malformed; the engine substitutes a
/// zero-vector sentinel and excludes the document from every cluster.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    /// Unique, non-empty identifier.
    pub id: String,

    /// Precomputed semantic embedding, expected to be L2-normalizable.
    #[serde(default)]
    pub content_vector: Option<Vec<f32>>,

    /// Title, used for cluster sample titles.
    #[serde(default)]
    pub title: Option<String>,

    /// Keywords; accepts either a JSON list or a single scalar string.
    #[serde(default, deserialize_with = "list_or_scalar")]
    pub keywords: Vec<String>,

    /// Year of publication, if known.
    #[serde(default)]
    pub publication_year: Option<i32>,

    /// Publication type (article, monograph, ...), used by batch analytics.
    #[serde(default)]
    pub publication_type: Option<String>,
}

impl Document {
    /// Create a document with just an id and a vector. Metadata stays empty.
    pub fn new(id: impl Into<String>, content_vector: Vec<f32>) -> Self {
        Self {
            id: id.into(),
            content_vector: Some(content_vector),
            title: None,
            keywords: Vec::new(),
            publication_year: None,
            publication_type: None,
        }
    }

    /// Set the title.
    #[must_use]
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Set the keywords.
    #[must_use]
    pub fn with_keywords(mut self, keywords: Vec<String>) -> Self {
        self.keywords = keywords;
        self
    }

    /// Set the publication year.
    #[must_use]
    pub fn with_year(mut self, year: i32) -> Self {
        self.publication_year = Some(year);
        self
    }
}

/// Deserialize a field that may be a JSON array of strings or a bare string.
fn list_or_scalar<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum ListOrScalar {
        List(Vec<String>),
        Scalar(String),
    }

    Ok(match Option::<ListOrScalar>::deserialize(deserializer)? {
        Some(ListOrScalar::List(list)) => list,
        Some(ListOrScalar::Scalar(s)) => vec![s],
        None => Vec::new(),
    })
}

// =============================================================================
// Cluster records
// =============================================================================

/// Publication-year span of a cluster. Years missing on members are ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct YearRange {
    /// Earliest publication year among members, if any member has one.
    pub min: Option<i32>,
    /// Latest publication year among members, if any member has one.
    pub max: Option<i32>,
}

/// One discovered cluster with descriptive metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClusterRecord {
    /// Cluster label (>= 0; noise points never form a record).
    pub label: i32,

    /// Member document ids, in input order.
    pub members: Vec<String>,

    /// 2-D projected points, parallel to `members`.
    pub points: Vec<[f32; 2]>,

    /// Member count.
    pub size: usize,

    /// Top-10 keyword frequencies, count descending.
    pub keywords: Vec<(String, usize)>,

    /// Publication-year span.
    pub years: YearRange,

    /// First 5 member titles in input order.
    pub sample_titles: Vec<String>,
}

// =============================================================================
// Quality diagnostics
// =============================================================================

/// Full candidate-k diagnostic table recorded during a parameter sweep.
///
/// All vectors are parallel to `k_range`. Degenerate candidates carry sentinel
/// metrics (silhouette −1, CH 0, DB +∞).
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ParameterSweep {
    /// The candidate cluster counts that were evaluated.
    pub k_range: Vec<usize>,
    /// Raw silhouette score per candidate.
    pub silhouette: Vec<f32>,
    /// Raw Calinski-Harabasz score per candidate.
    pub calinski_harabasz: Vec<f32>,
    /// Raw Davies-Bouldin score per candidate.
    pub davies_bouldin: Vec<f32>,
    /// Weighted blend of normalized metrics per candidate.
    pub composite: Vec<f32>,
    /// Composite minus the simplicity penalty; the argmax picks k*.
    pub adjusted: Vec<f32>,
}

/// Quality diagnostics for a finished clustering call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QualityReport {
    /// Silhouette over non-noise points, or NaN when undefined
    /// (< 3 non-noise points or < 2 distinct non-noise labels).
    pub silhouette: f32,

    /// Fraction of valid documents labeled as noise.
    pub noise_share: f32,

    /// The parameter sweep, when an adaptive sweep ran.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sweep: Option<ParameterSweep>,

    /// The 2-D projection method actually used ("pca", "neighbor_graph", ...).
    pub projection_method: String,
}

// =============================================================================
// Outcome
// =============================================================================

/// Successful clustering output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClusteringOutput {
    /// Discovered clusters, sorted by size descending (ties: label ascending).
    pub clusters: Vec<ClusterRecord>,

    /// Number of clusters (distinct non-noise labels).
    pub cluster_count: usize,

    /// Human-readable method label, possibly with embedded sub-parameters,
    /// e.g. `"kmeans_adaptive (PCA=37, variance=90.0%)"`.
    pub method_label: String,

    /// Number of documents that entered clustering (valid vectors).
    pub total_documents: usize,

    /// Quality diagnostics.
    pub quality: QualityReport,

    /// Document id -> cluster label (−1 for noise).
    pub assignment: HashMap<String, i32>,
}

/// The one composite result object produced per clustering call.
///
/// A batch with fewer than 3 valid embeddings is an expected outcome, not an
/// error: the caller always receives something renderable.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ClusteringOutcome {
    /// Clustering ran to completion.
    Clustered(ClusteringOutput),

    /// Too few documents with a valid embedding to cluster.
    InsufficientInput {
        /// How many documents had a valid (non-zero) vector.
        valid_documents: usize,
        /// The minimum required (3).
        required: usize,
        /// Friendly message for direct display.
        message: String,
    },
}

impl ClusteringOutcome {
    /// Construct the insufficient-input outcome with the standard message.
    pub fn insufficient(valid_documents: usize) -> Self {
        Self::InsufficientInput {
            valid_documents,
            required: 3,
            message: "Too few documents with valid embeddings to cluster".to_string(),
        }
    }

    /// The successful output, if clustering ran.
    pub fn output(&self) -> Option<&ClusteringOutput> {
        match self {
            Self::Clustered(out) => Some(out),
            Self::InsufficientInput { .. } => None,
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
