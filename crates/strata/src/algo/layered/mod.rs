pub mod assign;
pub mod spacing;

use crate::algo::LayoutOptions;
use crate::error::{Error, Result};
use crate::graph::{Graph, LayoutGraph, LayoutResult, NodeId, SpacedLayer};
use crate::rng::SeededJitter;
use assign::{LayerParams, assign_layers};
use rayon::prelude::*;
use rustc_hash::FxHashSet;
use spacing::SpacingOutcome;

pub fn layout(graph: &Graph, root: &str, opts: &LayoutOptions) -> Result<LayoutResult> {
    let _span = tracing::debug_span!("layered_layout", root).entered();
    opts.validate()?;
    graph.validate()?;

    let mut available: FxHashSet<&str> = graph.node_ids().into_iter().collect();
    if !available.contains(root) {
        return Err(Error::UnknownRoot {
            root: root.to_string(),
        });
    }

    let params = LayerParams {
        separation: opts.separation,
        radial_distance: opts.radial_distance,
        dimensionality: opts.dimensionality(),
    };
    let nodes = assign_layers(&graph.edges, &mut available, root, 0, (0.0, 0.0), &params);
    if !available.is_empty() {
        tracing::warn!(
            unreachable = available.len(),
            "nodes not connected to the root are left out of the layout"
        );
    }

    let mut out = LayoutGraph {
        edges: graph.edges.clone(),
        nodes,
    };
    let crowded: Vec<(usize, Vec<NodeId>)> = out
        .layers()
        .into_iter()
        .filter(|(_, members)| members.len() > opts.crowding_threshold)
        .collect();
    tracing::debug!(
        nodes = out.nodes.len(),
        crowded_layers = crowded.len(),
        threshold = opts.crowding_threshold,
        "layers assigned"
    );

    // Layers are disjoint, so each pass reads the same snapshot; write-back happens afterwards
    // in ascending depth order.
    let spacing_params = opts.spacing_params();
    let jitter = SeededJitter::new(opts.seed);
    let snapshot = &out.nodes;
    let space_layer = |(depth, members): &(usize, Vec<NodeId>)| -> Result<SpacingOutcome> {
        let _span = tracing::trace_span!("space_layer", depth, members = members.len()).entered();
        spacing::space(
            snapshot,
            members,
            &spacing_params,
            &jitter.stream(*depth as u64),
            opts.parallel,
        )
    };
    let outcomes: Vec<Result<SpacingOutcome>> = if opts.parallel {
        crowded.par_iter().map(space_layer).collect()
    } else {
        crowded.iter().map(space_layer).collect()
    };

    let mut spaced_layers = Vec::with_capacity(crowded.len());
    for ((depth, members), outcome) in crowded.into_iter().zip(outcomes) {
        let outcome = outcome?;
        outcome.apply(&mut out.nodes);
        spaced_layers.push(SpacedLayer {
            depth,
            members,
            synthetic_edges: outcome.synthetic_edges,
        });
    }

    Ok(LayoutResult {
        graph: out,
        spaced_layers,
    })
}
