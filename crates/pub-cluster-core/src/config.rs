//! Configuration for the clustering engine.
//!
//! Two layers, both validated explicitly (values are NOT auto-clamped —
//! call `validate()` to check):
//!
//! - [`EngineConfig`]: per-instance numeric knobs (embedding dimension,
//!   variance threshold, k-means effort, base seed).
//! - [`ClusterParams`]: per-call request parameters (method string, k_max,
//!   min cluster size, adaptive flag, projection method).

use serde::{Deserialize, Serialize};

use crate::error::ClusterError;

/// Default embedding dimension (multilingual MiniLM output).
pub const DEFAULT_EMBEDDING_DIM: usize = 384;

/// Fixed seed for every stochastic routine; makes sweeps reproducible for
/// identical input ordering and vectors.
pub const DEFAULT_SEED: u64 = 42;

// =============================================================================
// EngineConfig
// =============================================================================

/// Per-instance engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Expected embedding dimension. Vectors of any other length are treated
    /// as invalid and replaced by the zero-vector sentinel.
    pub embedding_dim: usize,

    /// Cumulative explained-variance threshold for the clustering-compute
    /// PCA (0, 1].
    pub variance_threshold: f32,

    /// Upper bound on PCA components for the clustering-compute reduction.
    pub max_pca_dims: usize,

    /// Number of seeded k-means restarts during the adaptive sweep.
    pub kmeans_n_init: usize,

    /// Maximum Lloyd iterations per k-means run.
    pub kmeans_max_iter: usize,

    /// Base RNG seed for all stochastic routines.
    pub seed: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            embedding_dim: DEFAULT_EMBEDDING_DIM,
            variance_threshold: 0.9,
            max_pca_dims: 100,
            kmeans_n_init: 20,
            kmeans_max_iter: 500,
            seed: DEFAULT_SEED,
        }
    }
}

impl EngineConfig {
    /// Set the embedding dimension.
    #[must_use]
    pub fn with_embedding_dim(mut self, dim: usize) -> Self {
        self.embedding_dim = dim;
        self
    }

    /// Set the cumulative explained-variance threshold.
    #[must_use]
    pub fn with_variance_threshold(mut self, threshold: f32) -> Self {
        self.variance_threshold = threshold;
        self
    }

    /// Set the base seed.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ClusterError::InvalidParameter` if any value is out of range.
    pub fn validate(&self) -> Result<(), ClusterError> {
        if self.embedding_dim == 0 {
            return Err(ClusterError::invalid_parameter(
                "embedding_dim must be > 0",
            ));
        }
        if !(self.variance_threshold > 0.0 && self.variance_threshold <= 1.0) {
            return Err(ClusterError::invalid_parameter(format!(
                "variance_threshold must be in (0, 1], got {}",
                self.variance_threshold
            )));
        }
        if self.max_pca_dims < 2 {
            return Err(ClusterError::invalid_parameter(
                "max_pca_dims must be >= 2",
            ));
        }
        if self.kmeans_n_init == 0 {
            return Err(ClusterError::invalid_parameter(
                "kmeans_n_init must be > 0",
            ));
        }
        if self.kmeans_max_iter == 0 {
            return Err(ClusterError::invalid_parameter(
                "kmeans_max_iter must be > 0",
            ));
        }
        Ok(())
    }
}

// =============================================================================
// ClusterParams
// =============================================================================

/// Per-call clustering request parameters.
///
/// The method is a free-form string on purpose: unknown values fall back to
/// k-means with a warning instead of failing the request. Recognized values:
/// `auto`, `kmeans`, `hierarchical`, `hdbscan` (alias `density`), and
/// `adaptive` (sweep over a k-means base regardless of the adaptive flag).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClusterParams {
    /// Requested clustering method.
    pub method: String,

    /// Upper bound on the cluster count.
    pub k_max: usize,

    /// Minimum cluster size, density method only (floored at 3).
    pub min_cluster_size: usize,

    /// Whether to run the adaptive sweep for centroid/linkage methods.
    pub adaptive: bool,

    /// Requested 2-D display projection: `auto`, `pca`, or `neighbor`.
    pub projection: String,
}

impl Default for ClusterParams {
    fn default() -> Self {
        Self {
            method: "auto".to_string(),
            k_max: 10,
            min_cluster_size: 3,
            adaptive: true,
            projection: "auto".to_string(),
        }
    }
}

impl ClusterParams {
    /// Set the method string.
    #[must_use]
    pub fn with_method(mut self, method: impl Into<String>) -> Self {
        self.method = method.into();
        self
    }

    /// Set the cluster-count upper bound.
    #[must_use]
    pub fn with_k_max(mut self, k_max: usize) -> Self {
        self.k_max = k_max;
        self
    }

    /// Set the minimum cluster size for the density method.
    #[must_use]
    pub fn with_min_cluster_size(mut self, size: usize) -> Self {
        self.min_cluster_size = size;
        self
    }

    /// Enable or disable the adaptive sweep.
    #[must_use]
    pub fn with_adaptive(mut self, adaptive: bool) -> Self {
        self.adaptive = adaptive;
        self
    }

    /// Set the projection method string.
    #[must_use]
    pub fn with_projection(mut self, projection: impl Into<String>) -> Self {
        self.projection = projection.into();
        self
    }

    /// Validate the request parameters.
    ///
    /// Only numeric bounds are validated; the method string is never rejected
    /// (unknown methods fall back at dispatch).
    ///
    /// # Errors
    ///
    /// Returns `ClusterError::InvalidParameter` if `k_max < 2` or
    /// `min_cluster_size < 1`.
    pub fn validate(&self) -> Result<(), ClusterError> {
        if self.k_max < 2 {
            return Err(ClusterError::invalid_parameter(format!(
                "k_max must be >= 2, got {}",
                self.k_max
            )));
        }
        if self.min_cluster_size < 1 {
            return Err(ClusterError::invalid_parameter(
                "min_cluster_size must be >= 1",
            ));
        }
        Ok(())
    }
}

// =============================================================================
// Tests
// =============================================================================
