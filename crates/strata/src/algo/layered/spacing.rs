//! De-crowding of a single layer.
//!
//! The members of a crowded layer usually sit on top of each other or on a few rings. They are
//! treated as a graph of their own: a path is threaded through them by two greedy
//! nearest-neighbor walks that start at the two members furthest apart, and a short 2D force
//! simulation on that path spreads them out. Only `x` and `y` are written back.

use crate::algo::force::Simulation;
use crate::algo::{Dimensionality, ForceParams};
use crate::error::Result;
use crate::geometry::{self, Vec3};
use crate::graph::{Edge, NodeId, PlacedNode};
use crate::rng::Jitter;
use indexmap::IndexMap;
use nalgebra::DMatrix;

/// Refined planar positions for one layer, plus the edges used to compute them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SpacingOutcome {
    pub refined: IndexMap<NodeId, (f64, f64)>,
    pub synthetic_edges: Vec<Edge>,
}

impl SpacingOutcome {
    /// Writes the refined `(x, y)` into `nodes`; `z` and `depth` are left untouched.
    pub fn apply(&self, nodes: &mut IndexMap<NodeId, PlacedNode>) {
        for (id, &(x, y)) in &self.refined {
            if let Some(n) = nodes.get_mut(id) {
                n.location[0] = x;
                n.location[1] = y;
            }
        }
    }
}

/// Computes spread-out `(x, y)` positions for the nodes named in `layer`.
///
/// Ids missing from `nodes` are ignored. Fewer than two members yields an empty outcome.
pub fn space<J: Jitter + ?Sized>(
    nodes: &IndexMap<NodeId, PlacedNode>,
    layer: &[NodeId],
    params: &ForceParams,
    jitter: &J,
    parallel: bool,
) -> Result<SpacingOutcome> {
    let members: IndexMap<NodeId, Vec3> = layer
        .iter()
        .filter_map(|id| nodes.get(id).map(|n| (id.clone(), n.location)))
        .collect();
    if members.len() < 2 {
        return Ok(SpacingOutcome::default());
    }

    let ids: Vec<&NodeId> = members.keys().collect();
    let points: Vec<(f64, f64)> = members.values().map(|l| (l[0], l[1])).collect();
    let synthetic_edges: Vec<Edge> = synthetic_path(&distance_matrix(&points))
        .into_iter()
        .map(|(a, b)| Edge::new(ids[a].clone(), ids[b].clone()))
        .collect();
    tracing::trace!(
        members = members.len(),
        synthetic_edges = synthetic_edges.len(),
        "spacing layer"
    );

    let refined = Simulation::new(*params, Dimensionality::Two, jitter)
        .parallel(parallel)
        .run(&synthetic_edges, &members)?
        .into_iter()
        .map(|(id, loc)| (id, (loc[0], loc[1])))
        .collect();

    Ok(SpacingOutcome {
        refined,
        synthetic_edges,
    })
}

/// Symmetric planar distance matrix with a zero diagonal.
pub fn distance_matrix(points: &[(f64, f64)]) -> DMatrix<f64> {
    let n = points.len();
    let mut m = DMatrix::<f64>::zeros(n, n);
    for i in 0..n {
        for j in (i + 1)..n {
            let d = geometry::euclidean_distance(
                &[points[i].0, points[i].1],
                &[points[j].0, points[j].1],
            );
            m[(i, j)] = d;
            m[(j, i)] = d;
        }
    }
    m
}

/// First pair `(i, j)`, `i < j`, at maximum distance in row-major order.
fn farthest_pair(dist: &DMatrix<f64>) -> (usize, usize) {
    let n = dist.nrows();
    let mut best = (0, 1);
    for i in 0..n {
        for j in (i + 1)..n {
            if dist[(i, j)] > dist[best] {
                best = (i, j);
            }
        }
    }
    best
}

/// Nearest index to `from` that is not excluded; ties go to the lower index.
fn nearest(dist: &DMatrix<f64>, from: usize, excluded: &[bool]) -> Option<usize> {
    let mut best: Option<usize> = None;
    for j in 0..dist.ncols() {
        if j == from || excluded[j] {
            continue;
        }
        if best.is_none_or(|b| dist[(from, j)] < dist[(from, b)]) {
            best = Some(j);
        }
    }
    best
}

#[derive(Debug)]
struct Walk {
    head: usize,
    exhausted: bool,
}

impl Walk {
    fn step(
        &mut self,
        dist: &DMatrix<f64>,
        excluded: &mut [bool],
        edges: &mut Vec<(usize, usize)>,
    ) {
        if self.exhausted {
            return;
        }
        match nearest(dist, self.head, excluded) {
            Some(next) => {
                edges.push((self.head, next));
                excluded[next] = true;
                self.head = next;
            }
            None => self.exhausted = true,
        }
    }
}

/// Index pairs of a path through every point of `dist`.
///
/// Two greedy walks start at the farthest pair and take turns claiming their nearest unclaimed
/// point; once both run dry their heads are joined. For `n >= 2` points the result has
/// exactly `n - 1` edges and no point is claimed twice.
///
/// Because the walks share the claimed set, each one covers only part of the layer and the
/// two halves would otherwise be two disconnected chains. The closing edge links them, so the
/// simulation sees one connected path and springs keep both halves together instead of
/// letting repulsion push them apart.
pub fn synthetic_path(dist: &DMatrix<f64>) -> Vec<(usize, usize)> {
    let n = dist.nrows();
    if n < 2 {
        return Vec::new();
    }

    let (start, end) = farthest_pair(dist);
    let mut excluded = vec![false; n];
    excluded[start] = true;
    excluded[end] = true;

    let mut forward = Walk {
        head: start,
        exhausted: false,
    };
    let mut reverse = Walk {
        head: end,
        exhausted: false,
    };
    let mut edges: Vec<(usize, usize)> = Vec::with_capacity(n - 1);
    for _ in 0..n {
        forward.step(dist, &mut excluded, &mut edges);
        reverse.step(dist, &mut excluded, &mut edges);
        if forward.exhausted && reverse.exhausted {
            break;
        }
    }
    edges.push((forward.head, reverse.head));
    edges
}
