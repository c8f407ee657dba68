//! Method resolution and clustering dispatch.
//!
//! Resolution is pure: the requested method string, the adaptive flag, the
//! dataset size and the capability registry fold into a [`ResolvedMethod`]
//! before anything runs. Unknown method strings and unavailable capabilities
//! resolve to k-means with a warning rather than an error; callers always get
//! a clustering.

use tracing::{info, warn};

use crate::algorithms::{
    Capability, CapabilityRegistry, ClusteringStrategy, DensityStrategy, HierarchicalStrategy,
    KMeansStrategy, Linkage,
};
use crate::config::{ClusterParams, EngineConfig};
use crate::reduction;
use crate::selection::{ClusterCountSelector, SweepBase};
use crate::types::ParameterSweep;

/// Below this size auto picks hierarchical clustering.
const AUTO_SMALL: usize = 15;
/// From here up auto always picks k-means.
const AUTO_LARGE: usize = 150;
/// The explicit (non-adaptive) paths reduce to at most this many dimensions.
const EXPLICIT_REDUCE_DIM: usize = 50;

/// Base algorithm carried under the adaptive cluster-count sweep.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdaptiveBase {
    KMeans,
    Hierarchical,
}

impl AdaptiveBase {
    fn name(&self) -> &'static str {
        match self {
            AdaptiveBase::KMeans => "kmeans",
            AdaptiveBase::Hierarchical => "hierarchical",
        }
    }

    fn sweep_base(&self) -> SweepBase {
        match self {
            AdaptiveBase::KMeans => SweepBase::KMeans,
            AdaptiveBase::Hierarchical => SweepBase::Hierarchical,
        }
    }
}

/// What will actually run, fully decided.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolvedMethod {
    /// Dimensionality reduction plus a cluster-count sweep over the base.
    Adaptive { base: AdaptiveBase },
    /// Single k-means fit with a size-derived k.
    KMeans,
    /// Single ward agglomerative fit with a size-derived k.
    Hierarchical,
    /// Noise-aware density clustering.
    Density,
}

/// Resolve a requested method into a concrete one.
///
/// Auto rules by dataset size: hierarchical below 15 documents, density
/// between 15 and 149 when available, k-means otherwise. The adaptive flag
/// applies to k-means and hierarchical bases only; density ignores it, and
/// requesting `"adaptive"` by name runs the sweep regardless of the flag.
pub fn resolve(
    method: &str,
    adaptive: bool,
    n: usize,
    registry: &CapabilityRegistry,
) -> ResolvedMethod {
    let requested = method.trim().to_ascii_lowercase();
    let density_ok = registry.is_available(Capability::Density);

    let concrete = match requested.as_str() {
        "adaptive" => {
            return ResolvedMethod::Adaptive {
                base: AdaptiveBase::KMeans,
            };
        }
        "auto" => {
            if n < AUTO_SMALL {
                "hierarchical"
            } else if n < AUTO_LARGE && density_ok {
                "density"
            } else {
                "kmeans"
            }
        }
        "kmeans" | "hierarchical" => requested.as_str(),
        "density" | "hdbscan" => {
            if density_ok {
                "density"
            } else {
                warn!("density clustering unavailable, falling back to kmeans");
                "kmeans"
            }
        }
        other => {
            warn!(method = other, "unknown clustering method, falling back to kmeans");
            "kmeans"
        }
    };

    match (concrete, adaptive) {
        ("density", _) => ResolvedMethod::Density,
        ("hierarchical", true) => ResolvedMethod::Adaptive {
            base: AdaptiveBase::Hierarchical,
        },
        ("hierarchical", false) => ResolvedMethod::Hierarchical,
        (_, true) => ResolvedMethod::Adaptive {
            base: AdaptiveBase::KMeans,
        },
        (_, false) => ResolvedMethod::KMeans,
    }
}

/// Labels plus the evidence of how they were produced.
#[derive(Debug, Clone)]
pub struct MethodRun {
    pub labels: Vec<i32>,
    pub method_label: String,
    pub sweep: Option<ParameterSweep>,
}

/// Runs a resolved method against a batch of vectors.
#[derive(Debug)]
pub struct MethodDispatcher<'a> {
    config: &'a EngineConfig,
    registry: &'a CapabilityRegistry,
}

impl<'a> MethodDispatcher<'a> {
    pub fn new(config: &'a EngineConfig, registry: &'a CapabilityRegistry) -> Self {
        Self { config, registry }
    }

    /// Resolve and run. `x` holds one valid vector per document, input order.
    pub fn run(&self, x: &[Vec<f32>], params: &ClusterParams) -> MethodRun {
        let resolved = resolve(&params.method, params.adaptive, x.len(), self.registry);
        info!(requested = %params.method, ?resolved, n = x.len(), "method resolved");

        match resolved {
            ResolvedMethod::Adaptive { base } => self.run_adaptive(x, base, params.k_max),
            ResolvedMethod::KMeans => self.run_kmeans(x, params.k_max),
            ResolvedMethod::Hierarchical => self.run_hierarchical(x, params.k_max),
            ResolvedMethod::Density => self.run_density(x, params.min_cluster_size),
        }
    }

    /// k derived from dataset size for the single-fit paths.
    fn explicit_k(n: usize, k_max: usize) -> usize {
        k_max.min(((n as f64 / 2.0).sqrt() as usize).max(2))
    }

    fn run_adaptive(&self, x: &[Vec<f32>], base: AdaptiveBase, k_max: usize) -> MethodRun {
        let threshold = self.config.variance_threshold;
        let (work, dims) = match reduction::optimize_dimensions(
            x,
            threshold,
            self.config.max_pca_dims,
        ) {
            Ok(reduction) => {
                let dims = reduction.dims;
                (reduction.reduced, dims)
            }
            Err(error) => {
                warn!(%error, "dimensionality reduction failed, clustering at full dimensionality");
                (None, x.first().map(Vec::len).unwrap_or(0))
            }
        };
        let reduced = work.is_some();
        let work: &[Vec<f32>] = work.as_deref().unwrap_or(x);

        let n = work.len();
        let min_k = (k_max.saturating_sub(1)).min(3).max(2);
        let max_k = k_max.min((n as f64).sqrt() as usize);

        let selection =
            ClusterCountSelector::new(self.config).optimize(work, min_k, max_k, base.sweep_base());

        // The reduction suffix only appears when a projection was applied.
        let method_label = if reduced {
            format!(
                "{}_adaptive (PCA={}, variance={:.1}%)",
                base.name(),
                dims,
                threshold * 100.0
            )
        } else {
            format!("{}_adaptive", base.name())
        };

        MethodRun {
            labels: selection.labels,
            method_label,
            sweep: Some(selection.sweep),
        }
    }

    fn run_kmeans(&self, x: &[Vec<f32>], k_max: usize) -> MethodRun {
        let work = match reduction::reduce_to(x, EXPLICIT_REDUCE_DIM) {
            Ok(reduced) => reduced,
            Err(error) => {
                warn!(%error, "reduction failed, clustering at full dimensionality");
                None
            }
        };
        let work: &[Vec<f32>] = work.as_deref().unwrap_or(x);
        let dims = work.first().map(Vec::len).unwrap_or(0);

        let k = Self::explicit_k(work.len(), k_max);
        let labels = KMeansStrategy::new(
            k,
            self.config.kmeans_n_init,
            self.config.kmeans_max_iter,
            self.config.seed,
        )
        .fit(work);

        MethodRun {
            labels,
            method_label: format!("kmeans (PCA={})", dims),
            sweep: None,
        }
    }

    fn run_hierarchical(&self, x: &[Vec<f32>], k_max: usize) -> MethodRun {
        let k = Self::explicit_k(x.len(), k_max);
        let labels = HierarchicalStrategy::new(k, Linkage::Ward).fit(x);

        MethodRun {
            labels,
            method_label: "hierarchical".to_string(),
            sweep: None,
        }
    }

    fn run_density(&self, x: &[Vec<f32>], min_cluster_size: usize) -> MethodRun {
        let strategy = DensityStrategy::new(min_cluster_size);
        let labels = strategy.fit(x);

        MethodRun {
            labels,
            method_label: "hdbscan".to_string(),
            sweep: None,
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> CapabilityRegistry {
        CapabilityRegistry::default()
    }

    #[test]
    fn test_auto_picks_by_size() {
        let r = registry();
        assert_eq!(
            resolve("auto", false, 10, &r),
            ResolvedMethod::Hierarchical
        );
        assert_eq!(resolve("auto", false, 80, &r), ResolvedMethod::Density);
        assert_eq!(resolve("auto", false, 200, &r), ResolvedMethod::KMeans);

        println!("[PASS] test_auto_picks_by_size");
    }

    #[test]
    fn test_auto_density_fallback_when_unavailable() {
        let r = registry().without(Capability::Density);
        assert_eq!(resolve("auto", false, 80, &r), ResolvedMethod::KMeans);
        assert_eq!(resolve("hdbscan", false, 80, &r), ResolvedMethod::KMeans);

        println!("[PASS] test_auto_density_fallback_when_unavailable");
    }

    #[test]
    fn test_adaptive_flag_wraps_base() {
        let r = registry();
        assert_eq!(
            resolve("kmeans", true, 100, &r),
            ResolvedMethod::Adaptive {
                base: AdaptiveBase::KMeans
            }
        );
        assert_eq!(
            resolve("auto", true, 10, &r),
            ResolvedMethod::Adaptive {
                base: AdaptiveBase::Hierarchical
            }
        );
        // Density never goes through the sweep.
        assert_eq!(resolve("auto", true, 80, &r), ResolvedMethod::Density);

        println!("[PASS] test_adaptive_flag_wraps_base");
    }

    #[test]
    fn test_adaptive_method_string_always_sweeps() {
        // Requesting "adaptive" by name runs the sweep even when the flag
        // is off.
        let r = registry();
        for flag in [true, false] {
            assert_eq!(
                resolve("adaptive", flag, 100, &r),
                ResolvedMethod::Adaptive {
                    base: AdaptiveBase::KMeans
                }
            );
        }

        println!("[PASS] test_adaptive_method_string_always_sweeps");
    }

    #[test]
    fn test_unknown_method_resolves_to_kmeans() {
        let r = registry();
        assert_eq!(resolve("banana", false, 100, &r), ResolvedMethod::KMeans);
        assert_eq!(
            resolve("banana", true, 100, &r),
            ResolvedMethod::Adaptive {
                base: AdaptiveBase::KMeans
            }
        );

        println!("[PASS] test_unknown_method_resolves_to_kmeans");
    }

    #[test]
    fn test_method_string_is_case_insensitive() {
        let r = registry();
        assert_eq!(resolve(" KMeans ", false, 100, &r), ResolvedMethod::KMeans);

        println!("[PASS] test_method_string_is_case_insensitive");
    }

    #[test]
    fn test_explicit_k_formula() {
        assert_eq!(MethodDispatcher::explicit_k(8, 10), 2);
        assert_eq!(MethodDispatcher::explicit_k(50, 10), 5);
        assert_eq!(MethodDispatcher::explicit_k(800, 10), 10);

        println!("[PASS] test_explicit_k_formula");
    }

    #[test]
    fn test_adaptive_run_labels_every_sample() {
        let config = EngineConfig::default();
        let r = registry();
        let dispatcher = MethodDispatcher::new(&config, &r);

        let mut x = Vec::new();
        for i in 0..20 {
            x.push(vec![0.1 * i as f32, 0.0]);
        }
        for i in 0..20 {
            x.push(vec![30.0 + 0.1 * i as f32, 0.0]);
        }

        let params = ClusterParams::default()
            .with_method("kmeans")
            .with_adaptive(true)
            .with_k_max(6);
        let run = dispatcher.run(&x, &params);

        assert_eq!(run.labels.len(), x.len());
        // 2-D input is never reduced, so the label carries no suffix.
        assert_eq!(run.method_label, "kmeans_adaptive");
        assert!(run.sweep.is_some());

        println!("[PASS] test_adaptive_run_labels_every_sample - {}", run.method_label);
    }

    #[test]
    fn test_adaptive_label_reports_reduction() {
        let config = EngineConfig::default();
        let r = registry();
        let dispatcher = MethodDispatcher::new(&config, &r);

        // 60 features with all variance on two axes forces a projection.
        let x: Vec<Vec<f32>> = (0..40)
            .map(|i| {
                let mut v = vec![0.0f32; 60];
                v[0] = if i < 20 { 0.0 } else { 30.0 } + 0.1 * i as f32;
                v[1] = (i % 5) as f32;
                v
            })
            .collect();

        let params = ClusterParams::default()
            .with_method("kmeans")
            .with_adaptive(true)
            .with_k_max(6);
        let run = dispatcher.run(&x, &params);

        assert_eq!(run.method_label, "kmeans_adaptive (PCA=2, variance=90.0%)");

        println!("[PASS] test_adaptive_label_reports_reduction - {}", run.method_label);
    }

    #[test]
    fn test_explicit_kmeans_run() {
        let config = EngineConfig::default();
        let r = registry();
        let dispatcher = MethodDispatcher::new(&config, &r);

        let x: Vec<Vec<f32>> = (0..12)
            .map(|i| vec![if i < 6 { 0.0 } else { 9.0 } + 0.1 * i as f32, 0.0])
            .collect();
        let params = ClusterParams::default()
            .with_method("kmeans")
            .with_adaptive(false);
        let run = dispatcher.run(&x, &params);

        assert_eq!(run.method_label, "kmeans (PCA=2)");
        assert!(run.sweep.is_none());
        assert_eq!(run.labels.len(), 12);

        println!("[PASS] test_explicit_kmeans_run");
    }

    #[test]
    fn test_density_run_uses_caller_vocabulary() {
        let config = EngineConfig::default();
        let r = registry();
        let dispatcher = MethodDispatcher::new(&config, &r);

        let mut x = Vec::new();
        for i in 0..8 {
            x.push(vec![0.1 * i as f32, 0.0]);
        }
        for i in 0..8 {
            x.push(vec![25.0 + 0.1 * i as f32, 0.0]);
        }

        let params = ClusterParams::default().with_method("hdbscan");
        let run = dispatcher.run(&x, &params);

        assert_eq!(run.method_label, "hdbscan");

        println!("[PASS] test_density_run_uses_caller_vocabulary");
    }
}
