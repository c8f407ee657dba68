//! Corpus-level analytics over a document batch.
//!
//! Descriptive counts only, no clustering involved: a publication timeline,
//! publication-type counts and the most frequent keywords, shaped for direct
//! rendering at the service boundary.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::types::Document;

/// Keywords reported in the corpus summary.
const TOP_KEYWORDS: usize = 40;
/// Publication years outside this range are treated as data errors.
const YEAR_MIN: i32 = 1000;
const YEAR_MAX: i32 = 2100;

/// Descriptive statistics for a batch of documents.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CorpusAnalytics {
    /// (year, count), sorted by year ascending.
    pub timeline: Vec<(i32, usize)>,
    /// (publication type, count), count descending.
    pub types: Vec<(String, usize)>,
    /// Top keyword frequencies, count descending.
    pub keywords: Vec<(String, usize)>,
    /// Batch size.
    pub total_documents: usize,
}

/// Summarize a batch. Documents with missing fields simply contribute less;
/// implausible years are logged and skipped.
pub fn build_analytics(docs: &[Document]) -> CorpusAnalytics {
    let mut timeline: BTreeMap<i32, usize> = BTreeMap::new();
    let mut types: BTreeMap<String, usize> = BTreeMap::new();
    let mut keywords: BTreeMap<String, usize> = BTreeMap::new();

    for doc in docs {
        if let Some(year) = doc.publication_year {
            if (YEAR_MIN..=YEAR_MAX).contains(&year) {
                *timeline.entry(year).or_insert(0) += 1;
            } else {
                warn!(id = %doc.id, year, "implausible publication year skipped");
            }
        }
        if let Some(kind) = &doc.publication_type {
            *types.entry(kind.clone()).or_insert(0) += 1;
        }
        for keyword in &doc.keywords {
            *keywords.entry(keyword.clone()).or_insert(0) += 1;
        }
    }

    let mut types: Vec<(String, usize)> = types.into_iter().collect();
    types.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));

    let mut keywords: Vec<(String, usize)> = keywords.into_iter().collect();
    keywords.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
    keywords.truncate(TOP_KEYWORDS);

    CorpusAnalytics {
        timeline: timeline.into_iter().collect(),
        types,
        keywords,
        total_documents: docs.len(),
    }
}

// =============================================================================
// Tests
// =============================================================================
