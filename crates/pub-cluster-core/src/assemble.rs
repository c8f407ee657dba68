//! Turning raw label assignments into descriptive cluster records.

use std::collections::BTreeMap;

use crate::types::{ClusterRecord, Document, YearRange, NOISE_LABEL};

/// Keyword frequencies reported per cluster.
const TOP_KEYWORDS: usize = 10;
/// Member titles sampled per cluster.
const SAMPLE_TITLES: usize = 5;

/// Group labeled documents into cluster records with metadata.
///
/// `docs`, `labels` and `points` are parallel and in input order. Noise
/// labels never form a record. Records come back sorted by size descending,
/// ties broken by label ascending.
pub fn assemble_clusters(
    docs: &[&Document],
    labels: &[i32],
    points: &[[f32; 2]],
) -> Vec<ClusterRecord> {
    let mut by_label: BTreeMap<i32, Vec<usize>> = BTreeMap::new();
    for (index, &label) in labels.iter().enumerate() {
        if label == NOISE_LABEL {
            continue;
        }
        by_label.entry(label).or_default().push(index);
    }

    let mut records: Vec<ClusterRecord> = by_label
        .into_iter()
        .map(|(label, indices)| build_record(label, &indices, docs, points))
        .collect();

    records.sort_by(|a, b| b.size.cmp(&a.size).then(a.label.cmp(&b.label)));
    records
}

fn build_record(
    label: i32,
    indices: &[usize],
    docs: &[&Document],
    points: &[[f32; 2]],
) -> ClusterRecord {
    let members: Vec<String> = indices.iter().map(|&i| docs[i].id.clone()).collect();
    let member_points: Vec<[f32; 2]> = indices.iter().map(|&i| points[i]).collect();

    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for &i in indices {
        for keyword in &docs[i].keywords {
            *counts.entry(keyword.as_str()).or_insert(0) += 1;
        }
    }
    // Count descending, then keyword ascending for a stable report.
    let mut keywords: Vec<(String, usize)> = counts
        .into_iter()
        .map(|(keyword, count)| (keyword.to_string(), count))
        .collect();
    keywords.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
    keywords.truncate(TOP_KEYWORDS);

    let years: Vec<i32> = indices
        .iter()
        .filter_map(|&i| docs[i].publication_year)
        .collect();
    let year_range = YearRange {
        min: years.iter().min().copied(),
        max: years.iter().max().copied(),
    };

    let sample_titles: Vec<String> = indices
        .iter()
        .filter_map(|&i| docs[i].title.clone())
        .take(SAMPLE_TITLES)
        .collect();

    ClusterRecord {
        label,
        size: members.len(),
        members,
        points: member_points,
        keywords,
        years: year_range,
        sample_titles,
    }
}

// =============================================================================
// Tests
// =============================================================================
