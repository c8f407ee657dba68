//! Cluster-count selection by sweeping k over a candidate range.
//!
//! Every k in the range is clustered once, scored on silhouette,
//! Calinski-Harabasz and Davies-Bouldin, and the three metrics are
//! min-max normalized across the sweep into a weighted composite. A
//! small simplicity penalty nudges the argmax toward fewer clusters,
//! and the winning labels are the ones recorded during the sweep.

use tracing::{debug, info, warn};

use crate::algorithms::{ClusteringStrategy, HierarchicalStrategy, KMeansStrategy, Linkage};
use crate::config::EngineConfig;
use crate::metrics::{calinski_harabasz, davies_bouldin, silhouette};
use crate::types::ParameterSweep;

/// Sweep upper bound never exceeds this many clusters.
const K_HARD_CAP: usize = 20;
/// Restarts for the fallback k-means sweep.
const FALLBACK_N_INIT: usize = 10;

const SILHOUETTE_SENTINEL: f32 = -1.0;
const CH_SENTINEL: f32 = 0.0;
const DB_SENTINEL: f32 = f32::INFINITY;

const W_SILHOUETTE: f32 = 0.6;
const W_CALINSKI: f32 = 0.25;
const W_DAVIES: f32 = 0.15;
const SIMPLICITY_PENALTY: f32 = 0.01;

/// Base algorithm the sweep runs for each candidate k.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SweepBase {
    /// Fully configured k-means (n_init, max_iter, seed from the engine).
    KMeans,
    /// Agglomerative, best linkage of {ward, complete, average} per k.
    Hierarchical,
    /// Lighter k-means restarts for methods without a dedicated sweep.
    Fallback,
}

/// One candidate k, evaluated.
#[derive(Debug, Clone)]
pub enum CandidateOutcome {
    /// All three metrics computed on a non-degenerate partition.
    Scored {
        labels: Vec<i32>,
        silhouette: f32,
        calinski_harabasz: f32,
        davies_bouldin: f32,
    },
    /// Partition collapsed or a metric was undefined; scored with sentinels.
    Degenerate { labels: Vec<i32>, reason: String },
}

impl CandidateOutcome {
    fn labels(&self) -> &[i32] {
        match self {
            CandidateOutcome::Scored { labels, .. } => labels,
            CandidateOutcome::Degenerate { labels, .. } => labels,
        }
    }

    fn scores(&self) -> (f32, f32, f32) {
        match self {
            CandidateOutcome::Scored {
                silhouette,
                calinski_harabasz,
                davies_bouldin,
                ..
            } => (*silhouette, *calinski_harabasz, *davies_bouldin),
            CandidateOutcome::Degenerate { .. } => {
                (SILHOUETTE_SENTINEL, CH_SENTINEL, DB_SENTINEL)
            }
        }
    }
}

/// Winning k plus the evidence behind the choice.
#[derive(Debug, Clone)]
pub struct Selection {
    pub k: usize,
    pub labels: Vec<i32>,
    pub sweep: ParameterSweep,
}

/// Sweeps candidate cluster counts and picks the best one.
#[derive(Debug)]
pub struct ClusterCountSelector<'a> {
    config: &'a EngineConfig,
}

impl<'a> ClusterCountSelector<'a> {
    pub fn new(config: &'a EngineConfig) -> Self {
        Self { config }
    }

    /// Clamp a requested range to what the dataset supports. The upper bound
    /// is capped so every cluster could hold at least 5 points; an inverted
    /// range resets to a safe default.
    fn guard_range(n: usize, min_k: usize, max_k: usize) -> (usize, usize) {
        let mut max_k = max_k.min(n / 5).min(K_HARD_CAP);
        let mut min_k = min_k.min(max_k.saturating_sub(1));
        if min_k >= max_k {
            min_k = 2;
            max_k = (n / 5).max(3).min(K_HARD_CAP);
        }
        (min_k, max_k)
    }

    fn run_candidate(&self, x: &[Vec<f32>], k: usize, base: SweepBase) -> Vec<i32> {
        match base {
            SweepBase::KMeans => KMeansStrategy::new(
                k,
                self.config.kmeans_n_init,
                self.config.kmeans_max_iter,
                self.config.seed,
            )
            .fit(x),
            SweepBase::Hierarchical => {
                // Best linkage by raw silhouette; a collapsed sub-run scores -1.
                let mut best: Option<(f32, Vec<i32>)> = None;
                for linkage in Linkage::all() {
                    let labels = HierarchicalStrategy::new(k, linkage).fit(x);
                    let score = silhouette(x, &labels).unwrap_or(SILHOUETTE_SENTINEL);
                    if best.as_ref().map(|(s, _)| score > *s).unwrap_or(true) {
                        best = Some((score, labels));
                    }
                }
                best.map(|(_, labels)| labels).unwrap_or_default()
            }
            SweepBase::Fallback => KMeansStrategy::new(
                k,
                FALLBACK_N_INIT,
                self.config.kmeans_max_iter,
                self.config.seed,
            )
            .fit(x),
        }
    }

    fn evaluate(x: &[Vec<f32>], k: usize, labels: Vec<i32>) -> CandidateOutcome {
        let distinct: std::collections::HashSet<i32> = labels.iter().copied().collect();
        if distinct.len() < 2 {
            return CandidateOutcome::Degenerate {
                labels,
                reason: format!("partition collapsed to {} cluster(s) at k={}", distinct.len(), k),
            };
        }
        match (
            silhouette(x, &labels),
            calinski_harabasz(x, &labels),
            davies_bouldin(x, &labels),
        ) {
            (Some(sil), Some(ch), Some(db)) => CandidateOutcome::Scored {
                labels,
                silhouette: sil,
                calinski_harabasz: ch,
                davies_bouldin: db,
            },
            _ => CandidateOutcome::Degenerate {
                labels,
                reason: format!("validity metrics undefined at k={}", k),
            },
        }
    }

    /// Sweep `[min_k, max_k]` (after guarding) with the given base algorithm
    /// and select the k maximizing the penalized composite score.
    pub fn optimize(
        &self,
        x: &[Vec<f32>],
        min_k: usize,
        max_k: usize,
        base: SweepBase,
    ) -> Selection {
        let n = x.len();
        let (min_k, max_k) = Self::guard_range(n, min_k, max_k);
        info!(n, min_k, max_k, ?base, "sweeping cluster counts");

        let k_range: Vec<usize> = (min_k..=max_k).collect();
        let outcomes: Vec<CandidateOutcome> = k_range
            .iter()
            .map(|&k| {
                let labels = self.run_candidate(x, k, base);
                let outcome = Self::evaluate(x, k, labels);
                if let CandidateOutcome::Degenerate { reason, .. } = &outcome {
                    debug!(k, reason, "degenerate sweep candidate");
                }
                outcome
            })
            .collect();

        let sil_raw: Vec<f32> = outcomes.iter().map(|o| o.scores().0).collect();
        let ch_raw: Vec<f32> = outcomes.iter().map(|o| o.scores().1).collect();
        let db_raw: Vec<f32> = outcomes.iter().map(|o| o.scores().2).collect();

        let sil_norm = normalize_higher_better(&sil_raw, SILHOUETTE_SENTINEL);
        let ch_norm = normalize_higher_better(&ch_raw, CH_SENTINEL);
        let db_norm = normalize_lower_better(&db_raw);

        let composite: Vec<f32> = (0..k_range.len())
            .map(|i| W_SILHOUETTE * sil_norm[i] + W_CALINSKI * ch_norm[i] + W_DAVIES * db_norm[i])
            .collect();
        let adjusted: Vec<f32> = k_range
            .iter()
            .zip(&composite)
            .map(|(&k, &c)| c - SIMPLICITY_PENALTY * (k - min_k) as f32)
            .collect();

        // First maximum wins, so ties go to the smaller k.
        let mut best = 0;
        for (i, &score) in adjusted.iter().enumerate() {
            if score > adjusted[best] {
                best = i;
            }
        }

        if weak_separation(&sil_raw) {
            warn!(
                k = k_range[best],
                silhouette = sil_raw[best],
                "no candidate cluster count separates the data well"
            );
        }
        info!(
            k = k_range[best],
            silhouette = sil_raw[best],
            adjusted = adjusted[best],
            "cluster count selected"
        );

        Selection {
            k: k_range[best],
            labels: outcomes[best].labels().to_vec(),
            sweep: ParameterSweep {
                k_range,
                silhouette: sil_raw,
                calinski_harabasz: ch_raw,
                davies_bouldin: db_raw,
                composite,
                adjusted,
            },
        }
    }
}

/// Whether even the best raw silhouette anywhere in the sweep is below 0.1.
fn weak_separation(silhouettes: &[f32]) -> bool {
    silhouettes
        .iter()
        .copied()
        .fold(f32::NEG_INFINITY, f32::max)
        < 0.1
}

/// Min-max to [0, 1] for a higher-is-better metric. Sentinel entries map to 0;
/// when every non-sentinel value is equal they all map to 1.
fn normalize_higher_better(values: &[f32], sentinel: f32) -> Vec<f32> {
    let real: Vec<f32> = values.iter().copied().filter(|&v| v != sentinel).collect();
    if real.is_empty() {
        return vec![0.0; values.len()];
    }
    let min = real.iter().copied().fold(f32::INFINITY, f32::min);
    let max = real.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    values
        .iter()
        .map(|&v| {
            if v == sentinel {
                0.0
            } else if max > min {
                (v - min) / (max - min)
            } else {
                1.0
            }
        })
        .collect()
}

/// Inverted min-max for Davies-Bouldin, where lower is better. Sentinel
/// (infinite) entries map to 0, as does a constant or all-sentinel column.
fn normalize_lower_better(values: &[f32]) -> Vec<f32> {
    let real: Vec<f32> = values.iter().copied().filter(|v| v.is_finite()).collect();
    if real.is_empty() {
        return vec![0.0; values.len()];
    }
    let min = real.iter().copied().fold(f32::INFINITY, f32::min);
    let max = real.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    if max <= min {
        return vec![0.0; values.len()];
    }
    values
        .iter()
        .map(|&v| if v.is_finite() { (max - v) / (max - min) } else { 0.0 })
        .collect()
}

// =============================================================================
// Tests
// =============================================================================
