//! 2-D projection for display, independent of the clustering-compute
//! reduction.
//!
//! Tiny batches are truncated or zero-padded to 2 dimensions. Otherwise the
//! auto rule prefers PCA at the extremes (very small and very large batches)
//! and a neighbor-graph spectral embedding in between, when that capability
//! is available. Any failure in the chosen projector falls back to PCA, and
//! a PCA failure falls back to truncation; projection never fails the call.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing::{debug, warn};

use crate::algorithms::{Capability, CapabilityRegistry};
use crate::metrics::dist;
use crate::reduction::Pca;

/// Below this many samples the vectors are truncated/padded directly.
const MIN_PROJECTABLE: usize = 5;
/// Auto uses PCA below this size.
const NEIGHBOR_MIN: usize = 50;
/// Auto uses PCA at and above this size.
const NEIGHBOR_MAX: usize = 5000;

const SPECTRAL_MAX_ITER: usize = 1000;
const SPECTRAL_TOL: f64 = 1e-6;

/// 2-D coordinates plus the name of the projector that produced them.
#[derive(Debug, Clone)]
pub struct Projection {
    pub points: Vec<[f32; 2]>,
    pub method: String,
}

/// Projects document vectors onto 2-D display coordinates.
#[derive(Debug)]
pub struct DisplayProjector<'a> {
    registry: &'a CapabilityRegistry,
    seed: u64,
}

impl<'a> DisplayProjector<'a> {
    pub fn new(registry: &'a CapabilityRegistry, seed: u64) -> Self {
        Self { registry, seed }
    }

    /// Project `x` using the requested method ("auto", "pca" or "neighbor").
    pub fn project(&self, x: &[Vec<f32>], requested: &str) -> Projection {
        let n = x.len();
        if n < MIN_PROJECTABLE {
            return Projection {
                points: truncate_to_2d(x),
                method: "truncation".to_string(),
            };
        }

        let neighbor_ok = self
            .registry
            .is_available(Capability::NeighborGraphProjection);
        let use_neighbor = match requested.trim().to_ascii_lowercase().as_str() {
            "pca" => false,
            "neighbor" => neighbor_ok,
            _ => neighbor_ok && (NEIGHBOR_MIN..NEIGHBOR_MAX).contains(&n),
        };

        if use_neighbor {
            match self.neighbor_graph_embed(x) {
                Ok(points) => {
                    return Projection {
                        points,
                        method: "neighbor_graph".to_string(),
                    }
                }
                Err(message) => {
                    warn!(message, "neighbor-graph projection failed, falling back to PCA");
                }
            }
        }

        match pca_2d(x) {
            Some(points) => Projection {
                points,
                method: "pca".to_string(),
            },
            None => {
                warn!("display PCA failed, truncating vectors");
                Projection {
                    points: truncate_to_2d(x),
                    method: "truncation".to_string(),
                }
            }
        }
    }

    /// Spectral embedding of a symmetric k-NN affinity graph. The first two
    /// non-trivial eigenvectors of the normalized adjacency become the
    /// coordinates. Non-convergence of the power iteration is a failure.
    fn neighbor_graph_embed(&self, x: &[Vec<f32>]) -> Result<Vec<[f32; 2]>, &'static str> {
        let n = x.len();
        let k = (n / 10).clamp(5, 15);
        debug!(n, k, "building neighbor graph");

        // Symmetric binary affinity over mutual-or-one-way k-NN.
        let mut adjacency = vec![vec![0.0f64; n]; n];
        for i in 0..n {
            let mut order: Vec<usize> = (0..n).filter(|&j| j != i).collect();
            order.sort_by(|&a, &b| dist(&x[i], &x[a]).total_cmp(&dist(&x[i], &x[b])));
            for &j in order.iter().take(k) {
                adjacency[i][j] = 1.0;
                adjacency[j][i] = 1.0;
            }
        }

        // Normalized adjacency D^-1/2 A D^-1/2; its leading eigenvector is
        // the trivial D^1/2 * 1, deflated away before extracting coordinates.
        let degree: Vec<f64> = adjacency
            .iter()
            .map(|row| row.iter().sum::<f64>().max(1.0))
            .collect();
        let inv_sqrt: Vec<f64> = degree.iter().map(|d| 1.0 / d.sqrt()).collect();
        for i in 0..n {
            for j in 0..n {
                adjacency[i][j] *= inv_sqrt[i] * inv_sqrt[j];
            }
        }

        let mut trivial: Vec<f64> = degree.iter().map(|d| d.sqrt()).collect();
        normalize_in_place(&mut trivial);

        let mut rng = ChaCha8Rng::seed_from_u64(self.seed);
        let mut axes: Vec<Vec<f64>> = Vec::with_capacity(2);
        for _ in 0..2 {
            let mut basis: Vec<&[f64]> = vec![&trivial];
            basis.extend(axes.iter().map(|a| a.as_slice()));
            let axis = power_iterate(&adjacency, &basis, &mut rng)?;
            axes.push(axis);
        }

        Ok((0..n)
            .map(|i| [axes[0][i] as f32, axes[1][i] as f32])
            .collect())
    }
}

/// Power iteration on `m`, re-orthogonalized against `basis` each step.
fn power_iterate(
    m: &[Vec<f64>],
    basis: &[&[f64]],
    rng: &mut ChaCha8Rng,
) -> Result<Vec<f64>, &'static str> {
    let n = m.len();
    let mut v: Vec<f64> = (0..n).map(|_| rng.gen::<f64>() - 0.5).collect();
    orthogonalize(&mut v, basis);
    normalize_in_place(&mut v);

    let mut eigenvalue = 0.0f64;
    for _ in 0..SPECTRAL_MAX_ITER {
        let mut next = vec![0.0f64; n];
        for i in 0..n {
            for j in 0..n {
                next[i] += m[i][j] * v[j];
            }
        }
        orthogonalize(&mut next, basis);
        let norm = next.iter().map(|a| a * a).sum::<f64>().sqrt();
        if norm < 1e-12 {
            return Err("graph spectrum collapsed");
        }
        for value in next.iter_mut() {
            *value /= norm;
        }
        let rayleigh: f64 = next.iter().zip(&v).map(|(a, b)| a * b).sum();
        v = next;
        if (rayleigh.abs() - eigenvalue.abs()).abs() < SPECTRAL_TOL {
            return Ok(v);
        }
        eigenvalue = rayleigh;
    }
    Err("power iteration did not converge")
}

fn orthogonalize(v: &mut [f64], basis: &[&[f64]]) {
    for b in basis {
        let projection: f64 = v.iter().zip(b.iter()).map(|(a, c)| a * c).sum();
        for (value, c) in v.iter_mut().zip(b.iter()) {
            *value -= projection * c;
        }
    }
}

fn normalize_in_place(v: &mut [f64]) {
    let norm = v.iter().map(|a| a * a).sum::<f64>().sqrt();
    if norm > 1e-12 {
        for value in v.iter_mut() {
            *value /= norm;
        }
    }
}

fn pca_2d(x: &[Vec<f32>]) -> Option<Vec<[f32; 2]>> {
    let pca = Pca::fit(x, 2).ok()?;
    let components = pca.n_components().min(2);
    let reduced = pca.transform(x, components);
    Some(
        reduced
            .iter()
            .map(|row| {
                [
                    row.first().copied().unwrap_or(0.0),
                    row.get(1).copied().unwrap_or(0.0),
                ]
            })
            .collect(),
    )
}

fn truncate_to_2d(x: &[Vec<f32>]) -> Vec<[f32; 2]> {
    x.iter()
        .map(|row| {
            [
                row.first().copied().unwrap_or(0.0),
                row.get(1).copied().unwrap_or(0.0),
            ]
        })
        .collect()
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn spread(n: usize, dim: usize) -> Vec<Vec<f32>> {
        (0..n)
            .map(|i| {
                let mut v = vec![0.0f32; dim];
                v[0] = i as f32;
                v[1 % dim] += (i % 7) as f32;
                v
            })
            .collect()
    }

    #[test]
    fn test_tiny_batch_truncates() {
        let registry = CapabilityRegistry::default();
        let projector = DisplayProjector::new(&registry, 42);
        let projection = projector.project(&[vec![1.0, 2.0, 3.0], vec![4.0, 5.0, 6.0]], "auto");

        assert_eq!(projection.method, "truncation");
        assert_eq!(projection.points, vec![[1.0, 2.0], [4.0, 5.0]]);

        println!("[PASS] test_tiny_batch_truncates");
    }

    #[test]
    fn test_one_dimensional_input_pads() {
        let registry = CapabilityRegistry::default();
        let projector = DisplayProjector::new(&registry, 42);
        let projection = projector.project(&[vec![1.0], vec![2.0]], "auto");

        assert_eq!(projection.points, vec![[1.0, 0.0], [2.0, 0.0]]);

        println!("[PASS] test_one_dimensional_input_pads");
    }

    #[test]
    fn test_small_auto_uses_pca() {
        let registry = CapabilityRegistry::default();
        let projector = DisplayProjector::new(&registry, 42);
        let projection = projector.project(&spread(20, 6), "auto");

        assert_eq!(projection.method, "pca");
        assert_eq!(projection.points.len(), 20);

        println!("[PASS] test_small_auto_uses_pca");
    }

    #[test]
    fn test_mid_auto_uses_neighbor_graph() {
        let registry = CapabilityRegistry::default();
        let projector = DisplayProjector::new(&registry, 42);
        let projection = projector.project(&spread(60, 6), "auto");

        assert_eq!(projection.method, "neighbor_graph");
        assert_eq!(projection.points.len(), 60);
        assert!(projection
            .points
            .iter()
            .all(|p| p[0].is_finite() && p[1].is_finite()));

        println!("[PASS] test_mid_auto_uses_neighbor_graph");
    }

    #[test]
    fn test_neighbor_unavailable_falls_back_to_pca() {
        let registry =
            CapabilityRegistry::default().without(Capability::NeighborGraphProjection);
        let projector = DisplayProjector::new(&registry, 42);
        let projection = projector.project(&spread(60, 6), "auto");

        assert_eq!(projection.method, "pca");

        println!("[PASS] test_neighbor_unavailable_falls_back_to_pca");
    }

    #[test]
    fn test_explicit_pca_request() {
        let registry = CapabilityRegistry::default();
        let projector = DisplayProjector::new(&registry, 42);
        let projection = projector.project(&spread(60, 6), "pca");

        assert_eq!(projection.method, "pca");

        println!("[PASS] test_explicit_pca_request");
    }

    #[test]
    fn test_deterministic_for_fixed_seed() {
        let registry = CapabilityRegistry::default();
        let projector = DisplayProjector::new(&registry, 42);
        let x = spread(60, 6);
        let a = projector.project(&x, "auto");
        let b = projector.project(&x, "auto");
        assert_eq!(a.points, b.points);

        println!("[PASS] test_deterministic_for_fixed_seed");
    }
}
