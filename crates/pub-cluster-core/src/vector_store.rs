//! Memoized, validated access to document embedding vectors.
//!
//! The store shields every numeric routine from malformed input: an absent
//! vector, a wrong-dimension vector, or a vector containing NaN is replaced by
//! a zero-vector sentinel and never raises. Valid vectors are L2-normalized
//! once and cached by document id.
//!
//! The cache is instance-scoped and never evicted. Unbounded growth across a
//! long-lived engine instance is a known production gap; eviction is out of
//! scope here.

use std::collections::HashMap;

use crate::types::Document;

/// Cache of validated, L2-normalized embedding vectors keyed by document id.
#[derive(Debug)]
pub struct VectorStore {
    dim: usize,
    cache: HashMap<String, Vec<f32>>,
}

impl VectorStore {
    /// Create a store for vectors of the given dimension.
    pub fn new(dim: usize) -> Self {
        Self {
            dim,
            cache: HashMap::new(),
        }
    }

    /// The expected embedding dimension.
    #[inline]
    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Number of cached vectors.
    #[inline]
    pub fn len(&self) -> usize {
        self.cache.len()
    }

    /// Whether the cache is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }

    /// Get the validated, normalized vector for a document.
    ///
    /// Idempotent: the first call per id validates and normalizes, later calls
    /// return the cached result. Malformed input yields the zero-vector
    /// sentinel; callers detect it with [`is_zero`].
    pub fn get(&mut self, doc: &Document) -> &[f32] {
        if !self.cache.contains_key(&doc.id) {
            let vec = self.normalize(doc.content_vector.as_deref());
            self.cache.insert(doc.id.clone(), vec);
        }
        self.cache
            .get(&doc.id)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    fn normalize(&self, raw: Option<&[f32]>) -> Vec<f32> {
        let raw = match raw {
            Some(r) => r,
            None => return vec![0.0; self.dim],
        };

        if raw.len() != self.dim || raw.iter().any(|v| !v.is_finite()) {
            return vec![0.0; self.dim];
        }

        let norm = raw.iter().map(|v| (*v as f64).powi(2)).sum::<f64>().sqrt();
        if norm > 0.0 {
            raw.iter().map(|v| (*v as f64 / norm) as f32).collect()
        } else {
            raw.to_vec()
        }
    }
}

/// Whether a vector is the zero sentinel (all components zero).
pub fn is_zero(vec: &[f32]) -> bool {
    vec.iter().all(|v| *v == 0.0)
}

// =============================================================================
// Tests
// =============================================================================
