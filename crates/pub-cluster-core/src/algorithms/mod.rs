//! Concrete clustering algorithms and the capability registry.
//!
//! Each algorithm is a [`ClusteringStrategy`]: a fitted-parameters struct with
//! a single `fit(X) -> labels` operation. Optional capabilities (the density
//! method, the neighbor-graph display projector) are consulted through
//! [`CapabilityRegistry`] at method-resolution time, never at call time —
//! selection decides the fallback once, up front.

pub mod density;
pub mod hierarchical;
pub mod kmeans;

pub use density::DensityStrategy;
pub use hierarchical::{HierarchicalStrategy, Linkage};
pub use kmeans::KMeansStrategy;

/// A clustering algorithm with all hyperparameters bound.
pub trait ClusteringStrategy {
    /// Assign a label to every sample. Labels are >= 0, or −1 for noise
    /// (density methods only). Never panics on valid numeric input.
    fn fit(&self, x: &[Vec<f32>]) -> Vec<i32>;
}

/// Optional capabilities that may be absent at runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    /// Density-based clustering (noise-aware).
    Density,
    /// Non-linear neighbor-graph 2-D projection for display.
    NeighborGraphProjection,
}

/// Availability registry for optional capabilities.
///
/// Both capabilities ship built-in and default to available; the registry
/// exists so deployments can disable one and so fallback paths stay testable
/// without manufacturing numeric failures.
#[derive(Debug, Clone)]
pub struct CapabilityRegistry {
    density: bool,
    neighbor_graph: bool,
}

impl Default for CapabilityRegistry {
    fn default() -> Self {
        Self {
            density: true,
            neighbor_graph: true,
        }
    }
}

impl CapabilityRegistry {
    /// Whether a capability is available.
    pub fn is_available(&self, capability: Capability) -> bool {
        match capability {
            Capability::Density => self.density,
            Capability::NeighborGraphProjection => self.neighbor_graph,
        }
    }

    /// Return a registry with one capability disabled.
    #[must_use]
    pub fn without(mut self, capability: Capability) -> Self {
        match capability {
            Capability::Density => self.density = false,
            Capability::NeighborGraphProjection => self.neighbor_graph = false,
        }
        self
    }
}
