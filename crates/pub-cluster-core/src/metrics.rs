//! Internal cluster-validity metrics.
//!
//! Three complementary scores drive candidate ranking:
//!
//! - silhouette: per-point cohesion vs. separation, averaged; range −1..1
//! - Calinski-Harabasz: between/within dispersion ratio; higher is better
//! - Davies-Bouldin: average worst-case inter-cluster similarity; lower is
//!   better
//!
//! Each returns `None` for mathematically undefined partitions (fewer than 2
//! distinct labels, or too few points); callers map that to sentinel scores.
//! All accumulation happens in f64; inputs and results are f32.

use std::collections::BTreeMap;

/// Squared Euclidean distance.
#[inline]
pub(crate) fn dist_sq(a: &[f32], b: &[f32]) -> f64 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| {
            let d = *x as f64 - *y as f64;
            d * d
        })
        .sum()
}

/// Euclidean distance.
#[inline]
pub(crate) fn dist(a: &[f32], b: &[f32]) -> f64 {
    dist_sq(a, b).sqrt()
}

/// Mean of each cluster's points. Labels must be >= 0.
pub(crate) fn centroids(x: &[Vec<f32>], labels: &[i32]) -> BTreeMap<i32, Vec<f64>> {
    let dim = x.first().map(Vec::len).unwrap_or(0);
    let mut sums: BTreeMap<i32, (Vec<f64>, usize)> = BTreeMap::new();

    for (point, &label) in x.iter().zip(labels.iter()) {
        let entry = sums.entry(label).or_insert_with(|| (vec![0.0; dim], 0));
        for (acc, v) in entry.0.iter_mut().zip(point.iter()) {
            *acc += *v as f64;
        }
        entry.1 += 1;
    }

    sums.into_iter()
        .map(|(label, (mut sum, count))| {
            for v in &mut sum {
                *v /= count as f64;
            }
            (label, sum)
        })
        .collect()
}

#[inline]
fn dist_to_centroid(point: &[f32], centroid: &[f64]) -> f64 {
    point
        .iter()
        .zip(centroid.iter())
        .map(|(p, c)| {
            let d = *p as f64 - c;
            d * d
        })
        .sum::<f64>()
        .sqrt()
}

/// Mean silhouette coefficient.
///
/// Singleton clusters contribute 0 for their point. Returns `None` when fewer
/// than 2 distinct labels or fewer than 3 points are present.
pub fn silhouette(x: &[Vec<f32>], labels: &[i32]) -> Option<f32> {
    let n = x.len();
    if n < 3 {
        return None;
    }

    let mut cluster_sizes: BTreeMap<i32, usize> = BTreeMap::new();
    for &label in labels {
        *cluster_sizes.entry(label).or_insert(0) += 1;
    }
    if cluster_sizes.len() < 2 {
        return None;
    }

    let mut total = 0.0f64;
    for i in 0..n {
        let own = labels[i];
        if cluster_sizes[&own] == 1 {
            continue; // s(i) = 0 for singletons
        }

        // Mean distance to every cluster.
        let mut sums: BTreeMap<i32, f64> = BTreeMap::new();
        for j in 0..n {
            if i == j {
                continue;
            }
            *sums.entry(labels[j]).or_insert(0.0) += dist(&x[i], &x[j]);
        }

        let a = sums.get(&own).copied().unwrap_or(0.0) / (cluster_sizes[&own] - 1) as f64;
        let b = sums
            .iter()
            .filter(|(label, _)| **label != own)
            .map(|(label, sum)| sum / cluster_sizes[label] as f64)
            .fold(f64::INFINITY, f64::min);

        let denom = a.max(b);
        if denom > 0.0 {
            total += (b - a) / denom;
        }
    }

    Some((total / n as f64) as f32)
}

/// Calinski-Harabasz score (variance-ratio criterion).
///
/// Returns `None` when fewer than 2 distinct labels are present or when
/// `n <= k` (the ratio is undefined).
pub fn calinski_harabasz(x: &[Vec<f32>], labels: &[i32]) -> Option<f32> {
    let n = x.len();
    let by_cluster = centroids(x, labels);
    let k = by_cluster.len();
    if k < 2 || n <= k {
        return None;
    }

    let dim = x[0].len();
    let mut global = vec![0.0f64; dim];
    for point in x {
        for (acc, v) in global.iter_mut().zip(point.iter()) {
            *acc += *v as f64;
        }
    }
    for v in &mut global {
        *v /= n as f64;
    }

    let mut counts: BTreeMap<i32, usize> = BTreeMap::new();
    for &label in labels {
        *counts.entry(label).or_insert(0) += 1;
    }

    let between: f64 = by_cluster
        .iter()
        .map(|(label, c)| {
            let sq: f64 = c
                .iter()
                .zip(global.iter())
                .map(|(a, b)| (a - b) * (a - b))
                .sum();
            counts[label] as f64 * sq
        })
        .sum();

    let within: f64 = x
        .iter()
        .zip(labels.iter())
        .map(|(point, label)| {
            let c = &by_cluster[label];
            point
                .iter()
                .zip(c.iter())
                .map(|(p, cv)| {
                    let d = *p as f64 - cv;
                    d * d
                })
                .sum::<f64>()
        })
        .sum();

    // Identical points within every cluster would zero the denominator.
    let within = within.max(1e-12);
    let score = (between / (k - 1) as f64) / (within / (n - k) as f64);
    Some(score as f32)
}

/// Davies-Bouldin score.
///
/// Returns `None` when fewer than 2 distinct labels are present.
pub fn davies_bouldin(x: &[Vec<f32>], labels: &[i32]) -> Option<f32> {
    let by_cluster = centroids(x, labels);
    let k = by_cluster.len();
    if k < 2 {
        return None;
    }

    // Mean distance of each cluster's points to its centroid.
    let mut scatter: BTreeMap<i32, (f64, usize)> = BTreeMap::new();
    for (point, label) in x.iter().zip(labels.iter()) {
        let entry = scatter.entry(*label).or_insert((0.0, 0));
        entry.0 += dist_to_centroid(point, &by_cluster[label]);
        entry.1 += 1;
    }
    let scatter: BTreeMap<i32, f64> = scatter
        .into_iter()
        .map(|(label, (sum, count))| (label, sum / count as f64))
        .collect();

    let labels_sorted: Vec<i32> = by_cluster.keys().copied().collect();
    let mut total = 0.0f64;
    for &i in &labels_sorted {
        let mut worst = 0.0f64;
        for &j in &labels_sorted {
            if i == j {
                continue;
            }
            let sep = by_cluster[&i]
                .iter()
                .zip(by_cluster[&j].iter())
                .map(|(a, b)| (a - b) * (a - b))
                .sum::<f64>()
                .sqrt()
                .max(1e-12);
            worst = worst.max((scatter[&i] + scatter[&j]) / sep);
        }
        total += worst;
    }

    Some((total / k as f64) as f32)
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    /// Two tight, well-separated pairs.
    fn separated() -> (Vec<Vec<f32>>, Vec<i32>) {
        (
            vec![
                vec![0.0, 0.0],
                vec![0.1, 0.0],
                vec![10.0, 10.0],
                vec![10.1, 10.0],
            ],
            vec![0, 0, 1, 1],
        )
    }

    #[test]
    fn test_silhouette_well_separated_is_high() {
        let (x, labels) = separated();
        let s = silhouette(&x, &labels).unwrap();
        assert!(s > 0.9, "expected silhouette > 0.9, got {}", s);
        assert!(s <= 1.0);

        println!("[PASS] test_silhouette_well_separated_is_high - s={}", s);
    }

    #[test]
    fn test_silhouette_single_cluster_undefined() {
        let x = vec![vec![0.0], vec![1.0], vec![2.0]];
        assert!(silhouette(&x, &[0, 0, 0]).is_none());

        println!("[PASS] test_silhouette_single_cluster_undefined");
    }

    #[test]
    fn test_silhouette_too_few_points_undefined() {
        let x = vec![vec![0.0], vec![1.0]];
        assert!(silhouette(&x, &[0, 1]).is_none());

        println!("[PASS] test_silhouette_too_few_points_undefined");
    }

    #[test]
    fn test_silhouette_range() {
        // Interleaved labels: poor clustering, silhouette near or below 0.
        let x = vec![vec![0.0], vec![1.0], vec![2.0], vec![3.0]];
        let s = silhouette(&x, &[0, 1, 0, 1]).unwrap();
        assert!((-1.0..=1.0).contains(&s));
        assert!(s < 0.3, "interleaved labels should score poorly, got {}", s);

        println!("[PASS] test_silhouette_range - s={}", s);
    }

    #[test]
    fn test_calinski_harabasz_prefers_separation() {
        let (x, good) = separated();
        let bad = vec![0, 1, 0, 1];
        let ch_good = calinski_harabasz(&x, &good).unwrap();
        let ch_bad = calinski_harabasz(&x, &bad).unwrap();
        assert!(
            ch_good > ch_bad,
            "good {} should beat bad {}",
            ch_good,
            ch_bad
        );

        println!(
            "[PASS] test_calinski_harabasz_prefers_separation - good={}, bad={}",
            ch_good, ch_bad
        );
    }

    #[test]
    fn test_calinski_harabasz_undefined_cases() {
        let x = vec![vec![0.0], vec![1.0], vec![2.0]];
        assert!(calinski_harabasz(&x, &[0, 0, 0]).is_none(), "single label");
        assert!(calinski_harabasz(&x, &[0, 1, 2]).is_none(), "n == k");

        println!("[PASS] test_calinski_harabasz_undefined_cases");
    }

    #[test]
    fn test_davies_bouldin_prefers_separation() {
        let (x, good) = separated();
        let bad = vec![0, 1, 0, 1];
        let db_good = davies_bouldin(&x, &good).unwrap();
        let db_bad = davies_bouldin(&x, &bad).unwrap();
        assert!(
            db_good < db_bad,
            "lower is better: good {} vs bad {}",
            db_good,
            db_bad
        );

        println!(
            "[PASS] test_davies_bouldin_prefers_separation - good={}, bad={}",
            db_good, db_bad
        );
    }

    #[test]
    fn test_davies_bouldin_single_cluster_undefined() {
        let x = vec![vec![0.0], vec![1.0]];
        assert!(davies_bouldin(&x, &[0, 0]).is_none());

        println!("[PASS] test_davies_bouldin_single_cluster_undefined");
    }

    #[test]
    fn test_centroids_are_means() {
        let x = vec![vec![0.0, 0.0], vec![2.0, 4.0], vec![10.0, 10.0]];
        let c = centroids(&x, &[0, 0, 1]);
        assert_eq!(c[&0], vec![1.0, 2.0]);
        assert_eq!(c[&1], vec![10.0, 10.0]);

        println!("[PASS] test_centroids_are_means");
    }
}
