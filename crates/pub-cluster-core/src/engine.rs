//! The document clustering engine.
//!
//! One engine instance per concurrent request: the engine owns a vector
//! cache and is `Send`, but concurrent callers need their own instance or
//! external synchronization.

use std::collections::{HashMap, HashSet};

use tracing::info;

use crate::algorithms::CapabilityRegistry;
use crate::assemble::assemble_clusters;
use crate::config::{ClusterParams, EngineConfig};
use crate::dispatch::MethodDispatcher;
use crate::error::ClusterResult;
use crate::projection::DisplayProjector;
use crate::quality::build_quality;
use crate::types::{ClusteringOutcome, ClusteringOutput, Document, NOISE_LABEL};
use crate::vector_store::{self, VectorStore};

/// Fewest valid documents that can be clustered.
const MIN_CLUSTERABLE: usize = 3;

/// Adaptive clustering over document batches with precomputed embeddings.
#[derive(Debug)]
pub struct DocumentClusteringEngine {
    config: EngineConfig,
    store: VectorStore,
    registry: CapabilityRegistry,
}

impl Default for DocumentClusteringEngine {
    fn default() -> Self {
        Self::with_registry(EngineConfig::default(), CapabilityRegistry::default())
    }
}

impl DocumentClusteringEngine {
    /// Create an engine after validating the configuration.
    pub fn new(config: EngineConfig) -> ClusterResult<Self> {
        config.validate()?;
        Ok(Self::with_registry(config, CapabilityRegistry::default()))
    }

    /// Create an engine with an explicit capability registry. The config is
    /// taken as-is; use [`DocumentClusteringEngine::new`] to validate it.
    pub fn with_registry(config: EngineConfig, registry: CapabilityRegistry) -> Self {
        let store = VectorStore::new(config.embedding_dim);
        Self {
            config,
            store,
            registry,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Cluster a batch of documents.
    ///
    /// Every numeric difficulty inside degrades to a fallback path; `Err`
    /// arises only from invalid call parameters.
    pub fn cluster_documents(
        &mut self,
        docs: &[Document],
        params: &ClusterParams,
    ) -> ClusterResult<ClusteringOutcome> {
        params.validate()?;

        // Valid documents keep input order throughout.
        let mut valid_docs: Vec<&Document> = Vec::new();
        let mut x: Vec<Vec<f32>> = Vec::new();
        for doc in docs {
            let vector = self.store.get(doc);
            if !vector_store::is_zero(vector) {
                let vector = vector.to_vec();
                valid_docs.push(doc);
                x.push(vector);
            }
        }

        if valid_docs.len() < MIN_CLUSTERABLE {
            info!(
                valid = valid_docs.len(),
                total = docs.len(),
                "too few valid embeddings to cluster"
            );
            return Ok(ClusteringOutcome::insufficient(valid_docs.len()));
        }

        let projection =
            DisplayProjector::new(&self.registry, self.config.seed).project(&x, &params.projection);

        let run = MethodDispatcher::new(&self.config, &self.registry).run(&x, params);

        let quality = build_quality(&x, &run.labels, run.sweep, projection.method.clone());
        let clusters = assemble_clusters(&valid_docs, &run.labels, &projection.points);

        let cluster_count = run
            .labels
            .iter()
            .filter(|&&l| l != NOISE_LABEL)
            .collect::<HashSet<_>>()
            .len();
        let assignment: HashMap<String, i32> = valid_docs
            .iter()
            .zip(&run.labels)
            .map(|(doc, &label)| (doc.id.clone(), label))
            .collect();

        info!(
            clusters = cluster_count,
            method = %run.method_label,
            documents = valid_docs.len(),
            silhouette = quality.silhouette,
            "clustering complete"
        );

        Ok(ClusteringOutcome::Clustered(ClusteringOutput {
            clusters,
            cluster_count,
            method_label: run.method_label,
            total_documents: valid_docs.len(),
            quality,
            assignment,
        }))
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn doc_at(id: &str, x: f32, y: f32) -> Document {
        Document::new(id, vec![x, y, 0.0])
    }

    fn two_groups() -> Vec<Document> {
        let mut docs = Vec::new();
        for i in 0..6 {
            docs.push(doc_at(&format!("a{}", i), 0.0 + 0.01 * i as f32, 1.0));
        }
        for i in 0..6 {
            docs.push(doc_at(&format!("b{}", i), 1.0, 0.0 + 0.01 * i as f32));
        }
        docs
    }

    fn engine() -> DocumentClusteringEngine {
        DocumentClusteringEngine::with_registry(
            EngineConfig::default().with_embedding_dim(3),
            CapabilityRegistry::default(),
        )
    }

    #[test]
    fn test_insufficient_input() {
        let mut engine = engine();
        let docs = vec![doc_at("a", 1.0, 0.0), doc_at("b", 0.0, 1.0)];
        let outcome = engine
            .cluster_documents(&docs, &ClusterParams::default())
            .unwrap();

        match outcome {
            ClusteringOutcome::InsufficientInput {
                valid_documents,
                required,
                ..
            } => {
                assert_eq!(valid_documents, 2);
                assert_eq!(required, 3);
            }
            ClusteringOutcome::Clustered(_) => panic!("expected insufficient input"),
        }

        println!("[PASS] test_insufficient_input");
    }

    #[test]
    fn test_invalid_vectors_do_not_count() {
        let mut engine = engine();
        let mut docs = two_groups();
        docs.push(Document::new("bad", vec![f32::NAN, 0.0, 0.0]));
        docs.push(Document::new("short", vec![1.0]));

        let outcome = engine
            .cluster_documents(&docs, &ClusterParams::default())
            .unwrap();
        let output = outcome.output().unwrap();

        assert_eq!(output.total_documents, 12);
        assert!(!output.assignment.contains_key("bad"));
        assert!(!output.assignment.contains_key("short"));
        for cluster in &output.clusters {
            assert!(!cluster.members.contains(&"bad".to_string()));
            assert!(!cluster.members.contains(&"short".to_string()));
        }

        println!("[PASS] test_invalid_vectors_do_not_count");
    }

    #[test]
    fn test_invalid_params_error() {
        let mut engine = engine();
        let params = ClusterParams::default().with_k_max(1);
        assert!(engine.cluster_documents(&two_groups(), &params).is_err());

        println!("[PASS] test_invalid_params_error");
    }

    #[test]
    fn test_assignment_covers_all_valid_documents() {
        let mut engine = engine();
        let docs = two_groups();
        let params = ClusterParams::default().with_method("kmeans").with_adaptive(false);
        let outcome = engine.cluster_documents(&docs, &params).unwrap();
        let output = outcome.output().unwrap();

        assert_eq!(output.assignment.len(), docs.len());
        let member_total: usize = output.clusters.iter().map(|c| c.size).sum();
        assert!(member_total <= output.total_documents);

        println!("[PASS] test_assignment_covers_all_valid_documents");
    }

    #[test]
    fn test_config_validation_at_construction() {
        let config = EngineConfig::default().with_variance_threshold(1.5);
        assert!(DocumentClusteringEngine::new(config).is_err());

        println!("[PASS] test_config_validation_at_construction");
    }
}
