//! Quality diagnostics for a finished clustering.

use tracing::debug;

use crate::metrics::silhouette;
use crate::types::{ParameterSweep, QualityReport, NOISE_LABEL};

/// Build the quality report for a labeling of `x` (full-dimensional vectors,
/// not the reduced ones clustering may have run on).
///
/// Silhouette is computed over non-noise points only and comes back NaN when
/// it is undefined: fewer than 3 non-noise points or fewer than 2 distinct
/// non-noise labels. `noise_share` is the fraction of points labeled noise.
pub fn build_quality(
    x: &[Vec<f32>],
    labels: &[i32],
    sweep: Option<ParameterSweep>,
    projection_method: String,
) -> QualityReport {
    let n = labels.len();
    let kept: Vec<usize> = labels
        .iter()
        .enumerate()
        .filter(|(_, &l)| l != NOISE_LABEL)
        .map(|(i, _)| i)
        .collect();
    let noise_share = if n == 0 {
        0.0
    } else {
        1.0 - kept.len() as f32 / n as f32
    };

    let distinct: std::collections::HashSet<i32> =
        kept.iter().map(|&i| labels[i]).collect();
    let silhouette_score = if kept.len() < 3 || distinct.len() < 2 {
        f32::NAN
    } else {
        let sub_x: Vec<Vec<f32>> = kept.iter().map(|&i| x[i].clone()).collect();
        let sub_labels: Vec<i32> = kept.iter().map(|&i| labels[i]).collect();
        silhouette(&sub_x, &sub_labels).unwrap_or(f32::NAN)
    };

    debug!(
        silhouette = silhouette_score,
        noise_share,
        clusters = distinct.len(),
        "quality computed"
    );

    QualityReport {
        silhouette: silhouette_score,
        noise_share,
        sweep,
        projection_method,
    }
}

// =============================================================================
// Tests
// =============================================================================
