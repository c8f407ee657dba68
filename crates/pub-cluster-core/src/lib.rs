//! Publication Clustering Core Library
//!
//! Adaptive clustering engine for document batches with precomputed semantic
//! embeddings: the engine picks the working dimensionality and the cluster
//! count itself, attaches descriptive metadata to every cluster, and reports
//! the metrics behind each decision.
//!
//! # Architecture
//!
//! This crate provides:
//! - Input/output types (`Document`, `ClusteringOutcome`, `QualityReport`)
//! - The engine (`DocumentClusteringEngine`) and its configuration
//! - Clustering algorithms (k-means, agglomerative, density) behind the
//!   `ClusteringStrategy` trait
//! - Adaptive machinery: variance-driven PCA, the cluster-count sweep,
//!   method resolution and 2-D display projection
//!
//! # Example
//!
//! ```
//! use pub_cluster_core::{ClusterParams, Document, DocumentClusteringEngine, EngineConfig};
//!
//! let mut engine = DocumentClusteringEngine::new(
//!     EngineConfig::default().with_embedding_dim(3),
//! ).unwrap();
//!
//! let docs: Vec<Document> = (0..12)
//!     .map(|i| {
//!         let x = if i < 6 { 0.0 } else { 10.0 };
//!         Document::new(format!("doc-{i}"), vec![x + i as f32 * 0.01, 1.0, 0.0])
//!     })
//!     .collect();
//!
//! let params = ClusterParams::default().with_method("kmeans").with_adaptive(false);
//! let outcome = engine.cluster_documents(&docs, &params).unwrap();
//! assert!(outcome.output().is_some());
//! ```

pub mod algorithms;
pub mod analytics;
pub mod assemble;
pub mod config;
pub mod dispatch;
pub mod engine;
pub mod error;
pub mod metrics;
pub mod projection;
pub mod quality;
pub mod reduction;
pub mod selection;
pub mod types;
pub mod vector_store;

pub use algorithms::{Capability, CapabilityRegistry, ClusteringStrategy};
pub use analytics::{build_analytics, CorpusAnalytics};
pub use config::{ClusterParams, EngineConfig, DEFAULT_EMBEDDING_DIM, DEFAULT_SEED};
pub use engine::DocumentClusteringEngine;
pub use error::{ClusterError, ClusterResult};
pub use types::{
    ClusterRecord, ClusteringOutcome, ClusteringOutput, Document, ParameterSweep, QualityReport,
    YearRange, NOISE_LABEL,
};
