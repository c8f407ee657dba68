//! Seeded k-means with k-means++ initialization.
//!
//! Lloyd's algorithm over multiple seeded restarts; the restart with the
//! lowest inertia wins (first winner on ties). Every random draw comes from a
//! `ChaCha8Rng` seeded from the configured base seed, so identical input
//! yields identical labels.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::metrics::dist_sq;

use super::ClusteringStrategy;

const CONVERGENCE_TOL: f64 = 1e-8;

/// K-means with bound hyperparameters.
#[derive(Debug, Clone)]
pub struct KMeansStrategy {
    /// Number of clusters.
    pub k: usize,
    /// Number of seeded restarts.
    pub n_init: usize,
    /// Maximum Lloyd iterations per restart.
    pub max_iter: usize,
    /// Base RNG seed; restart `i` uses `seed + i`.
    pub seed: u64,
}

impl KMeansStrategy {
    /// Create a k-means strategy.
    pub fn new(k: usize, n_init: usize, max_iter: usize, seed: u64) -> Self {
        Self {
            k,
            n_init,
            max_iter,
            seed,
        }
    }

    /// Run one seeded restart; returns labels and inertia.
    fn run_once(&self, x: &[Vec<f32>], seed: u64) -> (Vec<i32>, f64) {
        let n = x.len();
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let mut centroids = plus_plus_init(x, self.k, &mut rng);
        let mut labels = vec![0usize; n];

        for _ in 0..self.max_iter {
            // Assignment step.
            for (i, point) in x.iter().enumerate() {
                labels[i] = nearest(point, &centroids).0;
            }

            // Update step.
            let (new_centroids, counts) = recompute(x, &labels, self.k);
            let mut centroids_next = new_centroids;

            // Reseed empty clusters with the point farthest from its centroid.
            for (cluster, &count) in counts.iter().enumerate() {
                if count == 0 {
                    if let Some(farthest) = x
                        .iter()
                        .enumerate()
                        .max_by(|(i, a), (j, b)| {
                            let da = dist_sq(a, &centroids_next[labels[*i]]);
                            let db = dist_sq(b, &centroids_next[labels[*j]]);
                            da.partial_cmp(&db).unwrap_or(std::cmp::Ordering::Equal)
                        })
                        .map(|(i, _)| i)
                    {
                        centroids_next[cluster] = x[farthest].clone();
                        labels[farthest] = cluster;
                    }
                }
            }

            let movement = centroids
                .iter()
                .zip(centroids_next.iter())
                .map(|(old, new)| dist_sq(old, new))
                .fold(0.0f64, f64::max);

            centroids = centroids_next;
            if movement < CONVERGENCE_TOL {
                break;
            }
        }

        let inertia: f64 = x
            .iter()
            .zip(labels.iter())
            .map(|(point, &label)| dist_sq(point, &centroids[label]))
            .sum();

        (labels.into_iter().map(|l| l as i32).collect(), inertia)
    }
}

impl ClusteringStrategy for KMeansStrategy {
    fn fit(&self, x: &[Vec<f32>]) -> Vec<i32> {
        let n = x.len();
        if n == 0 {
            return Vec::new();
        }
        let k = self.k.clamp(1, n);
        if k == 1 {
            return vec![0; n];
        }

        let strategy = Self { k, ..self.clone() };
        let mut best: Option<(Vec<i32>, f64)> = None;
        for init in 0..self.n_init.max(1) {
            let (labels, inertia) = strategy.run_once(x, self.seed.wrapping_add(init as u64));
            let better = best
                .as_ref()
                .map(|(_, best_inertia)| inertia < *best_inertia)
                .unwrap_or(true);
            if better {
                best = Some((labels, inertia));
            }
        }

        best.map(|(labels, _)| labels).unwrap_or_default()
    }
}

/// k-means++ seeding: first centroid uniform, the rest sampled with
/// probability proportional to squared distance from the nearest chosen one.
fn plus_plus_init(x: &[Vec<f32>], k: usize, rng: &mut ChaCha8Rng) -> Vec<Vec<f32>> {
    let n = x.len();
    let mut centroids: Vec<Vec<f32>> = Vec::with_capacity(k);
    centroids.push(x[rng.gen_range(0..n)].clone());

    let mut min_dists: Vec<f64> = x.iter().map(|p| dist_sq(p, &centroids[0])).collect();

    while centroids.len() < k {
        let total: f64 = min_dists.iter().sum();
        let next = if total > 0.0 {
            let mut target = rng.gen::<f64>() * total;
            let mut chosen = n - 1;
            for (i, d) in min_dists.iter().enumerate() {
                target -= d;
                if target <= 0.0 {
                    chosen = i;
                    break;
                }
            }
            chosen
        } else {
            // All points coincide with chosen centroids.
            rng.gen_range(0..n)
        };

        centroids.push(x[next].clone());
        let newest = centroids.len() - 1;
        for (i, point) in x.iter().enumerate() {
            let d = dist_sq(point, &centroids[newest]);
            if d < min_dists[i] {
                min_dists[i] = d;
            }
        }
    }

    centroids
}

fn nearest(point: &[f32], centroids: &[Vec<f32>]) -> (usize, f64) {
    let mut best = (0usize, f64::MAX);
    for (i, c) in centroids.iter().enumerate() {
        let d = dist_sq(point, c);
        if d < best.1 {
            best = (i, d);
        }
    }
    best
}

fn recompute(x: &[Vec<f32>], labels: &[usize], k: usize) -> (Vec<Vec<f32>>, Vec<usize>) {
    let dim = x[0].len();
    let mut sums = vec![vec![0.0f64; dim]; k];
    let mut counts = vec![0usize; k];

    for (point, &label) in x.iter().zip(labels.iter()) {
        counts[label] += 1;
        for (acc, v) in sums[label].iter_mut().zip(point.iter()) {
            *acc += *v as f64;
        }
    }

    let centroids = sums
        .into_iter()
        .zip(counts.iter())
        .map(|(sum, &count)| {
            if count > 0 {
                sum.into_iter().map(|v| (v / count as f64) as f32).collect()
            } else {
                vec![0.0f32; dim]
            }
        })
        .collect();

    (centroids, counts)
}

// =============================================================================
// Tests
// =============================================================================
