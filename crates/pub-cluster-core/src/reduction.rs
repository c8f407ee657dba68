//! Variance-driven linear projection for clustering compute.
//!
//! Implements PCA over the sample covariance matrix with power iteration and
//! deflation. Accumulation is f64; the public surface stays f32. Explained
//! variance ratios are computed against the covariance trace, so they are
//! non-negative and their cumulative sum is non-decreasing and bounded by 1
//! even when fewer components than features are extracted.
//!
//! [`optimize_dimensions`] is the clustering-oriented entry point: it keeps
//! small feature spaces untouched and otherwise picks the smallest component
//! prefix whose cumulative explained variance crosses the threshold.

use crate::error::{ClusterError, ClusterResult};

/// Feature counts at or below this are never reduced.
pub const NO_REDUCTION_DIM: usize = 50;

const POWER_MAX_ITER: usize = 300;
const POWER_TOL: f64 = 1e-10;

// =============================================================================
// Pca
// =============================================================================

/// A fitted principal-component model.
#[derive(Debug, Clone)]
pub struct Pca {
    mean: Vec<f64>,
    /// Unit-length components, strongest first.
    components: Vec<Vec<f64>>,
    /// Fraction of total variance captured per component.
    explained_variance_ratio: Vec<f32>,
}

impl Pca {
    /// Fit up to `n_components` principal components.
    ///
    /// # Errors
    ///
    /// Returns `ClusterError::NumericFailure` when the covariance is
    /// degenerate (zero total variance) — the caller is expected to fall back
    /// to a no-reduction path.
    pub fn fit(x: &[Vec<f32>], n_components: usize) -> ClusterResult<Self> {
        let n = x.len();
        if n < 2 {
            return Err(ClusterError::numeric(
                "pca",
                format!("need at least 2 samples, got {}", n),
            ));
        }
        let dim = x[0].len();
        let n_components = n_components.min(n).min(dim);

        let mean = column_means(x);
        let mut cov = covariance(x, &mean);

        let total_variance: f64 = (0..dim).map(|i| cov[i][i]).sum();
        if !(total_variance > 0.0) || !total_variance.is_finite() {
            return Err(ClusterError::numeric(
                "pca",
                "degenerate covariance: total variance is zero or non-finite",
            ));
        }

        let mut components = Vec::with_capacity(n_components);
        let mut ratios = Vec::with_capacity(n_components);

        for _ in 0..n_components {
            let (eigenvalue, vector) = match dominant_eigenpair(&cov) {
                Some(pair) => pair,
                None => break, // remaining spectrum is numerically zero
            };

            ratios.push((eigenvalue / total_variance).max(0.0) as f32);
            deflate(&mut cov, eigenvalue, &vector);
            components.push(vector);
        }

        Ok(Self {
            mean,
            components,
            explained_variance_ratio: ratios,
        })
    }

    /// Explained-variance ratios, strongest component first.
    pub fn explained_variance_ratio(&self) -> &[f32] {
        &self.explained_variance_ratio
    }

    /// Number of fitted components.
    pub fn n_components(&self) -> usize {
        self.components.len()
    }

    /// Project samples onto the first `k` components.
    pub fn transform(&self, x: &[Vec<f32>], k: usize) -> Vec<Vec<f32>> {
        let k = k.min(self.components.len());
        x.iter()
            .map(|point| {
                (0..k)
                    .map(|c| {
                        point
                            .iter()
                            .zip(self.mean.iter())
                            .zip(self.components[c].iter())
                            .map(|((v, m), w)| (*v as f64 - m) * w)
                            .sum::<f64>() as f32
                    })
                    .collect()
            })
            .collect()
    }
}

fn column_means(x: &[Vec<f32>]) -> Vec<f64> {
    let dim = x[0].len();
    let mut mean = vec![0.0f64; dim];
    for point in x {
        for (acc, v) in mean.iter_mut().zip(point.iter()) {
            *acc += *v as f64;
        }
    }
    for v in &mut mean {
        *v /= x.len() as f64;
    }
    mean
}

fn covariance(x: &[Vec<f32>], mean: &[f64]) -> Vec<Vec<f64>> {
    let n = x.len();
    let dim = mean.len();
    let mut cov = vec![vec![0.0f64; dim]; dim];

    for point in x {
        let centered: Vec<f64> = point
            .iter()
            .zip(mean.iter())
            .map(|(v, m)| *v as f64 - m)
            .collect();
        for i in 0..dim {
            let ci = centered[i];
            if ci == 0.0 {
                continue;
            }
            for j in i..dim {
                cov[i][j] += ci * centered[j];
            }
        }
    }

    let denom = (n - 1) as f64;
    for i in 0..dim {
        for j in i..dim {
            cov[i][j] /= denom;
            cov[j][i] = cov[i][j];
        }
    }
    cov
}

/// Power iteration for the dominant eigenpair of a symmetric matrix.
///
/// Deterministic start: the axis with the largest diagonal entry. Returns
/// `None` when the remaining spectrum is numerically zero.
fn dominant_eigenpair(m: &[Vec<f64>]) -> Option<(f64, Vec<f64>)> {
    let dim = m.len();
    let start = (0..dim).max_by(|&a, &b| {
        m[a][a]
            .partial_cmp(&m[b][b])
            .unwrap_or(std::cmp::Ordering::Equal)
    })?;
    if m[start][start] <= 1e-12 {
        return None;
    }

    let mut v = vec![0.0f64; dim];
    v[start] = 1.0;

    let mut eigenvalue = 0.0f64;
    for _ in 0..POWER_MAX_ITER {
        let mut next = mat_vec(m, &v);
        let norm = next.iter().map(|x| x * x).sum::<f64>().sqrt();
        if norm <= 1e-300 {
            return None;
        }
        for x in &mut next {
            *x /= norm;
        }

        let new_eigenvalue = rayleigh(m, &next);
        let converged = (new_eigenvalue - eigenvalue).abs() <= POWER_TOL * new_eigenvalue.abs().max(1.0);
        v = next;
        eigenvalue = new_eigenvalue;
        if converged {
            break;
        }
    }

    if eigenvalue <= 1e-12 {
        None
    } else {
        Some((eigenvalue, v))
    }
}

fn mat_vec(m: &[Vec<f64>], v: &[f64]) -> Vec<f64> {
    m.iter()
        .map(|row| row.iter().zip(v.iter()).map(|(a, b)| a * b).sum())
        .collect()
}

fn rayleigh(m: &[Vec<f64>], v: &[f64]) -> f64 {
    mat_vec(m, v).iter().zip(v.iter()).map(|(a, b)| a * b).sum()
}

/// Hotelling deflation: remove a found eigenpair from the matrix.
fn deflate(m: &mut [Vec<f64>], eigenvalue: f64, v: &[f64]) {
    let dim = m.len();
    for i in 0..dim {
        for j in 0..dim {
            m[i][j] -= eigenvalue * v[i] * v[j];
        }
    }
}

// =============================================================================
// optimize_dimensions
// =============================================================================

/// Result of the clustering-oriented reduction.
#[derive(Debug, Clone)]
pub struct Reduction {
    /// The dimension the data ends up with.
    pub dims: usize,
    /// Projected samples, present only when a projection was applied.
    pub reduced: Option<Vec<Vec<f32>>>,
}

/// Pick a working dimensionality for clustering compute.
///
/// Feature count <= 50 is returned unchanged. Otherwise a model with up to
/// `min(samples, features, max_dims)` components is fitted and the smallest
/// prefix whose cumulative explained variance reaches `variance_threshold`
/// is selected (never crossing selects a single component), clamped to >= 2.
/// Data is projected only when the chosen dimension is below the original.
///
/// # Errors
///
/// Propagates `ClusterError::NumericFailure` from a degenerate fit; the
/// dispatcher catches it and resolves to a no-reduction path.
pub fn optimize_dimensions(
    x: &[Vec<f32>],
    variance_threshold: f32,
    max_dims: usize,
) -> ClusterResult<Reduction> {
    let n = x.len();
    let dim = x.first().map(Vec::len).unwrap_or(0);

    if dim <= NO_REDUCTION_DIM || n < 2 {
        return Ok(Reduction {
            dims: dim,
            reduced: None,
        });
    }

    let max_possible = n.min(dim).min(max_dims);
    let pca = Pca::fit(x, max_possible)?;

    let mut cumulative = 0.0f32;
    let mut crossing = None;
    for (i, ratio) in pca.explained_variance_ratio().iter().enumerate() {
        cumulative += ratio;
        if cumulative >= variance_threshold {
            crossing = Some(i + 1);
            break;
        }
    }
    let optimal = crossing.unwrap_or(1).max(2);

    if optimal < dim {
        let reduced = pca.transform(x, optimal);
        Ok(Reduction {
            dims: optimal,
            reduced: Some(reduced),
        })
    } else {
        Ok(Reduction {
            dims: dim,
            reduced: None,
        })
    }
}

/// Plain fixed-dimension reduction (explicit k-means path, display PCA).
///
/// Returns the input unchanged when it already fits in `target_dims`.
pub fn reduce_to(x: &[Vec<f32>], target_dims: usize) -> ClusterResult<Option<Vec<Vec<f32>>>> {
    let dim = x.first().map(Vec::len).unwrap_or(0);
    if dim <= target_dims || x.len() < 2 {
        return Ok(None);
    }
    let pca = Pca::fit(x, target_dims)?;
    Ok(Some(pca.transform(x, target_dims)))
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    /// 60-dimensional samples where nearly all variance lives on 2 axes.
    fn two_axis_data(n: usize) -> Vec<Vec<f32>> {
        (0..n)
            .map(|i| {
                let mut v = vec![0.0f32; 60];
                v[0] = (i as f32) * 1.0;
                v[1] = ((i * 7) % 13) as f32 * 0.8;
                // Tiny noise on the remaining axes.
                for (j, item) in v.iter_mut().enumerate().skip(2) {
                    *item = (((i * 31 + j * 17) % 97) as f32 - 48.0) * 1e-4;
                }
                v
            })
            .collect()
    }

    #[test]
    fn test_no_reduction_at_or_below_50_features() {
        let x: Vec<Vec<f32>> = (0..20).map(|i| vec![i as f32; 50]).collect();
        let r = optimize_dimensions(&x, 0.9, 100).unwrap();
        assert_eq!(r.dims, 50);
        assert!(r.reduced.is_none(), "input must pass through unchanged");

        println!("[PASS] test_no_reduction_at_or_below_50_features");
    }

    #[test]
    fn test_reduces_low_rank_data() {
        let x = two_axis_data(40);
        let r = optimize_dimensions(&x, 0.9, 100).unwrap();
        assert!(r.dims >= 2);
        assert!(r.dims < 60, "60-feature low-rank data must be reduced");
        let reduced = r.reduced.expect("projection applied");
        assert_eq!(reduced.len(), 40);
        assert_eq!(reduced[0].len(), r.dims);

        println!("[PASS] test_reduces_low_rank_data - dims={}", r.dims);
    }

    #[test]
    fn test_dims_clamped_to_at_least_2() {
        // Variance concentrated on a single axis: the first component alone
        // crosses the threshold, but the result is clamped to 2.
        let x: Vec<Vec<f32>> = (0..30)
            .map(|i| {
                let mut v = vec![0.0f32; 60];
                v[0] = i as f32;
                v[1] = (i % 3) as f32 * 1e-3;
                v
            })
            .collect();
        let r = optimize_dimensions(&x, 0.9, 100).unwrap();
        assert_eq!(r.dims, 2);

        println!("[PASS] test_dims_clamped_to_at_least_2");
    }

    #[test]
    fn test_ratios_non_negative_and_cumulative_bounded() {
        let x = two_axis_data(40);
        let pca = Pca::fit(&x, 10).unwrap();
        let mut cumulative = 0.0f32;
        let mut previous = f32::INFINITY;
        for &ratio in pca.explained_variance_ratio() {
            assert!(ratio >= 0.0);
            assert!(ratio <= previous + 1e-4, "ratios must be non-increasing");
            previous = ratio;
            cumulative += ratio;
        }
        assert!(cumulative <= 1.0 + 1e-4);

        println!(
            "[PASS] test_ratios_non_negative_and_cumulative_bounded - cum={}",
            cumulative
        );
    }

    #[test]
    fn test_degenerate_covariance_errors() {
        let x: Vec<Vec<f32>> = (0..10).map(|_| vec![1.0f32; 60]).collect();
        let result = optimize_dimensions(&x, 0.9, 100);
        assert!(result.is_err(), "constant data has zero variance");

        println!("[PASS] test_degenerate_covariance_errors");
    }

    #[test]
    fn test_first_component_captures_dominant_axis() {
        let x = two_axis_data(40);
        let pca = Pca::fit(&x, 3).unwrap();
        let ratios = pca.explained_variance_ratio();
        assert!(
            ratios[0] > 0.5,
            "dominant axis should own most variance, got {:?}",
            ratios
        );

        println!("[PASS] test_first_component_captures_dominant_axis");
    }

    #[test]
    fn test_reduce_to_passthrough_when_small() {
        let x: Vec<Vec<f32>> = (0..5).map(|i| vec![i as f32; 10]).collect();
        assert!(reduce_to(&x, 50).unwrap().is_none());

        println!("[PASS] test_reduce_to_passthrough_when_small");
    }

    #[test]
    fn test_reduce_to_projects() {
        let x = two_axis_data(30);
        let reduced = reduce_to(&x, 5).unwrap().expect("should project");
        assert_eq!(reduced[0].len(), 5);

        println!("[PASS] test_reduce_to_projects");
    }

    #[test]
    fn test_transform_is_deterministic() {
        let x = two_axis_data(25);
        let a = Pca::fit(&x, 4).unwrap().transform(&x, 4);
        let b = Pca::fit(&x, 4).unwrap().transform(&x, 4);
        assert_eq!(a, b);

        println!("[PASS] test_transform_is_deterministic");
    }
}
