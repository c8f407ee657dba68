//! Density-based clustering over a mutual-reachability spanning tree.
//!
//! HDBSCAN-family behavior without the full condensed-tree machinery:
//! core distances smooth the metric, a minimum spanning tree over mutual
//! reachability is cut at unusually long edges, and components smaller
//! than the minimum cluster size become noise. Points that end up in no
//! cluster carry [`NOISE_LABEL`].

use tracing::debug;

use crate::metrics::dist;
use crate::types::NOISE_LABEL;

use super::ClusteringStrategy;

/// Edges longer than median + EDGE_CUT_MAD_SIGMA * MAD are removed from the
/// tree. Median and MAD, unlike mean and std, keep a single extreme edge
/// from inflating the threshold past a genuine inter-cluster bridge.
const EDGE_CUT_MAD_SIGMA: f64 = 3.0;

/// Density clustering with bound hyperparameters.
#[derive(Debug, Clone)]
pub struct DensityStrategy {
    /// Smallest group of points accepted as a cluster; smaller groups are noise.
    pub min_cluster_size: usize,
}

impl DensityStrategy {
    /// Create a density strategy. The effective minimum cluster size is
    /// never below 3, matching the engine's floor for meaningful clusters.
    pub fn new(min_cluster_size: usize) -> Self {
        Self {
            min_cluster_size: min_cluster_size.max(3),
        }
    }

    /// Distance to the k-th nearest neighbor of each point, with
    /// k = min_cluster_size (clamped to the sample count).
    fn core_distances(&self, x: &[Vec<f32>]) -> Vec<f64> {
        let n = x.len();
        let k = self.min_cluster_size.min(n.saturating_sub(1)).max(1);
        (0..n)
            .map(|i| {
                let mut dists: Vec<f64> = (0..n)
                    .filter(|&j| j != i)
                    .map(|j| dist(&x[i], &x[j]))
                    .collect();
                dists.sort_by(|a, b| a.total_cmp(b));
                dists.get(k - 1).copied().unwrap_or(0.0)
            })
            .collect()
    }
}

impl ClusteringStrategy for DensityStrategy {
    fn fit(&self, x: &[Vec<f32>]) -> Vec<i32> {
        let n = x.len();
        if n == 0 {
            return Vec::new();
        }
        if n < self.min_cluster_size {
            return vec![NOISE_LABEL; n];
        }

        let core = self.core_distances(x);

        // Prim's algorithm over the mutual reachability metric:
        // mr(i, j) = max(core(i), core(j), dist(i, j)).
        let mut in_tree = vec![false; n];
        let mut best_cost = vec![f64::INFINITY; n];
        let mut best_from = vec![0usize; n];
        in_tree[0] = true;
        for j in 1..n {
            best_cost[j] = dist(&x[0], &x[j]).max(core[0]).max(core[j]);
        }

        // (u, v, weight) for the n-1 tree edges.
        let mut edges: Vec<(usize, usize, f64)> = Vec::with_capacity(n - 1);
        for _ in 1..n {
            let mut next = None;
            for j in 0..n {
                if in_tree[j] {
                    continue;
                }
                if next.map(|(_, w)| best_cost[j] < w).unwrap_or(true) {
                    next = Some((j, best_cost[j]));
                }
            }
            let (j, weight) = match next {
                Some(found) => found,
                None => break,
            };
            in_tree[j] = true;
            edges.push((best_from[j], j, weight));
            for m in 0..n {
                if in_tree[m] {
                    continue;
                }
                let mr = dist(&x[j], &x[m]).max(core[j]).max(core[m]);
                if mr < best_cost[m] {
                    best_cost[m] = mr;
                    best_from[m] = j;
                }
            }
        }

        // Cut edges that are outliers among the tree weights. The floor at
        // twice the median keeps ordinary in-cluster jitter intact when the
        // tree weights are so uniform that the MAD is near zero.
        let mut weights: Vec<f64> = edges.iter().map(|e| e.2).collect();
        weights.sort_by(|a, b| a.total_cmp(b));
        let median = median_of_sorted(&weights);
        let mut deviations: Vec<f64> = weights.iter().map(|w| (w - median).abs()).collect();
        deviations.sort_by(|a, b| a.total_cmp(b));
        let mad = median_of_sorted(&deviations);
        let threshold = (median + EDGE_CUT_MAD_SIGMA * mad).max(2.0 * median);

        let mut parent: Vec<usize> = (0..n).collect();
        fn find(parent: &mut Vec<usize>, i: usize) -> usize {
            if parent[i] != i {
                let root = find(parent, parent[i]);
                parent[i] = root;
            }
            parent[i]
        }
        let mut cut = 0usize;
        for &(u, v, w) in &edges {
            if w <= threshold {
                let (ru, rv) = (find(&mut parent, u), find(&mut parent, v));
                if ru != rv {
                    parent[ru] = rv;
                }
            } else {
                cut += 1;
            }
        }

        // Components below the minimum size are noise; the rest get labels
        // ordered by their first member index.
        let mut component_size: std::collections::HashMap<usize, usize> =
            std::collections::HashMap::new();
        for i in 0..n {
            *component_size.entry(find(&mut parent, i)).or_insert(0) += 1;
        }

        let mut labels = vec![NOISE_LABEL; n];
        let mut assigned: std::collections::HashMap<usize, i32> = std::collections::HashMap::new();
        let mut next_label = 0i32;
        for i in 0..n {
            let root = find(&mut parent, i);
            if component_size[&root] < self.min_cluster_size {
                continue;
            }
            let label = *assigned.entry(root).or_insert_with(|| {
                let l = next_label;
                next_label += 1;
                l
            });
            labels[i] = label;
        }

        debug!(
            clusters = next_label,
            cut_edges = cut,
            noise = labels.iter().filter(|&&l| l == NOISE_LABEL).count(),
            "density clustering complete"
        );

        labels
    }
}

fn median_of_sorted(values: &[f64]) -> f64 {
    let n = values.len();
    if n == 0 {
        return 0.0;
    }
    if n % 2 == 1 {
        values[n / 2]
    } else {
        (values[n / 2 - 1] + values[n / 2]) / 2.0
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn dense_pair_with_outlier() -> Vec<Vec<f32>> {
        let mut x = Vec::new();
        for i in 0..6 {
            x.push(vec![0.1 * i as f32, 0.0]);
        }
        for i in 0..6 {
            x.push(vec![20.0 + 0.1 * i as f32, 0.0]);
        }
        x.push(vec![100.0, 100.0]);
        x
    }

    #[test]
    fn test_finds_dense_groups() {
        let labels = DensityStrategy::new(3).fit(&dense_pair_with_outlier());

        assert!(labels[..6].iter().all(|&l| l == labels[0]));
        assert!(labels[6..12].iter().all(|&l| l == labels[6]));
        assert_ne!(labels[0], labels[6]);
        assert!(labels[0] >= 0 && labels[6] >= 0);

        println!("[PASS] test_finds_dense_groups - labels={:?}", labels);
    }

    #[test]
    fn test_isolated_point_is_noise() {
        let labels = DensityStrategy::new(3).fit(&dense_pair_with_outlier());
        assert_eq!(labels[12], NOISE_LABEL);

        println!("[PASS] test_isolated_point_is_noise");
    }

    #[test]
    fn test_extreme_outlier_does_not_mask_group_split() {
        // One enormous tree edge must not stretch the cut threshold past the
        // bridge between the two dense groups.
        let mut x = Vec::new();
        for i in 0..6 {
            x.push(vec![0.1 * i as f32, 0.0]);
        }
        for i in 0..6 {
            x.push(vec![20.0 + 0.1 * i as f32, 0.0]);
        }
        x.push(vec![1000.0, 1000.0]);

        let labels = DensityStrategy::new(3).fit(&x);
        assert_ne!(labels[0], labels[6], "groups must stay separate");
        assert_eq!(labels[12], NOISE_LABEL);

        println!(
            "[PASS] test_extreme_outlier_does_not_mask_group_split - labels={:?}",
            labels
        );
    }

    #[test]
    fn test_min_cluster_size_floor() {
        let strategy = DensityStrategy::new(1);
        assert_eq!(strategy.min_cluster_size, 3);

        println!("[PASS] test_min_cluster_size_floor");
    }

    #[test]
    fn test_tiny_input_all_noise() {
        let x = vec![vec![0.0], vec![1.0]];
        let labels = DensityStrategy::new(3).fit(&x);
        assert_eq!(labels, vec![NOISE_LABEL, NOISE_LABEL]);

        println!("[PASS] test_tiny_input_all_noise");
    }

    #[test]
    fn test_labels_ordered_by_first_member() {
        let labels = DensityStrategy::new(3).fit(&dense_pair_with_outlier());
        assert_eq!(labels[0], 0);
        assert_eq!(labels[6], 1);

        println!("[PASS] test_labels_ordered_by_first_member");
    }

    #[test]
    fn test_deterministic() {
        let x = dense_pair_with_outlier();
        let strategy = DensityStrategy::new(3);
        assert_eq!(strategy.fit(&x), strategy.fit(&x));

        println!("[PASS] test_deterministic");
    }
}
