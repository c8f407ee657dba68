//! Agglomerative clustering with Lance-Williams updates.
//!
//! Naive O(n³) merging over a full pairwise matrix: fine for the batch sizes
//! this engine sweeps (the dispatcher routes large batches to k-means).
//! Ward operates on squared Euclidean distances, complete and average on
//! plain distances. Merge ties break toward the smallest pair of cluster
//! indices, which keeps the dendrogram deterministic.

use serde::{Deserialize, Serialize};

use crate::metrics::{dist, dist_sq};

use super::ClusteringStrategy;

/// Merge rule for agglomerative clustering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Linkage {
    /// Minimize within-cluster variance increase.
    #[default]
    Ward,
    /// Maximum pairwise distance between clusters.
    Complete,
    /// Mean pairwise distance between clusters.
    Average,
}

impl Linkage {
    /// All linkages, in the order the adaptive sweep tries them.
    pub fn all() -> [Linkage; 3] {
        [Linkage::Ward, Linkage::Complete, Linkage::Average]
    }

    /// Lowercase name used in logs.
    pub fn name(&self) -> &'static str {
        match self {
            Linkage::Ward => "ward",
            Linkage::Complete => "complete",
            Linkage::Average => "average",
        }
    }
}

/// Agglomerative clustering with bound hyperparameters.
#[derive(Debug, Clone)]
pub struct HierarchicalStrategy {
    /// Target number of clusters.
    pub k: usize,
    /// Merge rule.
    pub linkage: Linkage,
}

impl HierarchicalStrategy {
    /// Create a hierarchical strategy.
    pub fn new(k: usize, linkage: Linkage) -> Self {
        Self { k, linkage }
    }
}

impl ClusteringStrategy for HierarchicalStrategy {
    fn fit(&self, x: &[Vec<f32>]) -> Vec<i32> {
        let n = x.len();
        if n == 0 {
            return Vec::new();
        }
        let k = self.k.clamp(1, n);

        // Initial pairwise distances between singleton clusters.
        let mut d = vec![vec![0.0f64; n]; n];
        for i in 0..n {
            for j in (i + 1)..n {
                let value = match self.linkage {
                    Linkage::Ward => dist_sq(&x[i], &x[j]),
                    Linkage::Complete | Linkage::Average => dist(&x[i], &x[j]),
                };
                d[i][j] = value;
                d[j][i] = value;
            }
        }

        let mut active: Vec<bool> = vec![true; n];
        let mut size: Vec<usize> = vec![1; n];
        // membership[point] = current cluster index (a representative point).
        let mut membership: Vec<usize> = (0..n).collect();
        let mut remaining = n;

        while remaining > k {
            // Closest active pair; ties break toward the smallest indices.
            let mut best: Option<(usize, usize, f64)> = None;
            for i in 0..n {
                if !active[i] {
                    continue;
                }
                for j in (i + 1)..n {
                    if !active[j] {
                        continue;
                    }
                    if best.map(|(_, _, w)| d[i][j] < w).unwrap_or(true) {
                        best = Some((i, j, d[i][j]));
                    }
                }
            }

            let (a, b, d_ab) = match best {
                Some(found) => found,
                None => break,
            };

            // Lance-Williams update of distances from the merged cluster a∪b
            // to every other active cluster.
            for c in 0..n {
                if !active[c] || c == a || c == b {
                    continue;
                }
                let (na, nb, nc) = (size[a] as f64, size[b] as f64, size[c] as f64);
                let updated = match self.linkage {
                    Linkage::Ward => {
                        ((na + nc) * d[a][c] + (nb + nc) * d[b][c] - nc * d_ab) / (na + nb + nc)
                    }
                    Linkage::Complete => d[a][c].max(d[b][c]),
                    Linkage::Average => (na * d[a][c] + nb * d[b][c]) / (na + nb),
                };
                d[a][c] = updated;
                d[c][a] = updated;
            }

            size[a] += size[b];
            active[b] = false;
            for m in membership.iter_mut() {
                if *m == b {
                    *m = a;
                }
            }
            remaining -= 1;
        }

        // Relabel clusters 0..k-1 in order of first appearance.
        let mut relabel: Vec<Option<i32>> = vec![None; n];
        let mut next = 0i32;
        membership
            .iter()
            .map(|&rep| {
                *relabel[rep].get_or_insert_with(|| {
                    let label = next;
                    next += 1;
                    label
                })
            })
            .collect()
    }
}

// =============================================================================
// Tests
// =============================================================================
