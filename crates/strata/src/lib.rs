#![forbid(unsafe_code)]

//! Headless graph layout: depth layers from a root node plus a force-directed spring embedder.
//!
//! The layered algorithm stacks layers along z and spreads siblings radially; layers with more
//! members than `crowding_threshold` are re-spaced by a short local force simulation. The
//! force-directed algorithm runs the same simulation on the whole graph from a seeded random
//! start. Both emit `{edges, nodes}` with a 3-component `location` per node.

pub mod algo;
pub mod error;
pub mod geometry;
pub mod graph;
pub mod palette;
pub mod rng;

pub use algo::{Algorithm, Dimensionality, ForceParams, LayoutOptions};
pub use error::{Error, Result};
pub use geometry::Vec3;
pub use graph::{Edge, Graph, LayoutGraph, LayoutResult, NodeId, PlacedNode, SpacedLayer};
pub use palette::{NodeColors, apply_colors};
pub use rng::{Jitter, SeededJitter};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Headless layout entry point.
pub fn layout(graph: &Graph, algorithm: &Algorithm, opts: &LayoutOptions) -> Result<LayoutResult> {
    match algorithm {
        Algorithm::Layered { root } => algo::layered::layout(graph, root, opts),
        Algorithm::ForceDirected => algo::force::layout(graph, opts),
    }
}
