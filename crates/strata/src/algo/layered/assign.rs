//! Depth assignment: a pre-order walk from the root that claims each node once and places
//! siblings on a circle around their parent.

use crate::algo::Dimensionality;
use crate::geometry::{layer_z, polar_to_cartesian};
use crate::graph::{Edge, NodeId, PlacedNode};
use indexmap::{IndexMap, IndexSet};
use rustc_hash::{FxHashMap, FxHashSet};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayerParams {
    /// Distance between consecutive layers along z.
    pub separation: f64,
    /// Radius of the circle siblings are spread on.
    pub radial_distance: f64,
    /// `Two` keeps every node at `z == 0.0`.
    pub dimensionality: Dimensionality,
}

/// Symmetric adjacency in edge order. Duplicates are kept; callers deduplicate.
pub fn adjacency(edges: &[Edge]) -> FxHashMap<&str, Vec<&str>> {
    let mut adj: FxHashMap<&str, Vec<&str>> = FxHashMap::default();
    for e in edges {
        adj.entry(e.source.as_str()).or_default().push(e.target.as_str());
        adj.entry(e.target.as_str()).or_default().push(e.source.as_str());
    }
    adj
}

/// Assigns a depth and an initial location to every node reachable from `root` through
/// nodes still in `available`, removing each from `available` as it is claimed.
///
/// `root` gets `depth` and `origin`. A node with several unvisited neighbors spreads them at
/// equal angles on a circle of `radial_distance` around itself; a single unvisited neighbor
/// inherits the parent's `(x, y)`. Each child's subtree is finished before the next sibling is
/// visited, so under cycles the first path to reach a node decides its depth.
///
/// Returns nodes in visiting order. If `root` is not in `available` nothing is assigned.
pub fn assign_layers(
    edges: &[Edge],
    available: &mut FxHashSet<&str>,
    root: &str,
    depth: usize,
    origin: (f64, f64),
    params: &LayerParams,
) -> IndexMap<NodeId, PlacedNode> {
    let adj = adjacency(edges);
    let mut out: IndexMap<NodeId, PlacedNode> = IndexMap::new();
    let mut stack: Vec<(&str, usize, (f64, f64))> = vec![(root, depth, origin)];

    while let Some((id, depth, (x, y))) = stack.pop() {
        // Claimed by an earlier sibling's subtree.
        if !available.remove(id) {
            continue;
        }
        let z = match params.dimensionality {
            Dimensionality::Three => layer_z(params.separation, depth),
            Dimensionality::Two => 0.0,
        };
        out.insert(id.to_string(), PlacedNode::layered(depth, [x, y, z]));

        let children: IndexSet<&str> = adj
            .get(id)
            .into_iter()
            .flatten()
            .copied()
            .filter(|n| available.contains(*n))
            .collect();

        let count = children.len();
        let placed: Vec<(&str, usize, (f64, f64))> = if count == 1 {
            children.iter().map(|&c| (c, depth + 1, (x, y))).collect()
        } else {
            children
                .iter()
                .enumerate()
                .map(|(i, &c)| {
                    let angle = std::f64::consts::TAU * i as f64 / count as f64;
                    let (dx, dy) = polar_to_cartesian(params.radial_distance, angle);
                    (c, depth + 1, (x + dx, y + dy))
                })
                .collect()
        };
        // Reversed so the first child is popped (and fully explored) first.
        stack.extend(placed.into_iter().rev());
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params() -> LayerParams {
        LayerParams {
            separation: 10.0,
            radial_distance: 20.0,
            dimensionality: Dimensionality::Three,
        }
    }

    fn run(edges: &[Edge], root: &str) -> IndexMap<NodeId, PlacedNode> {
        let mut available: FxHashSet<&str> = edges
            .iter()
            .flat_map(|e| [e.source.as_str(), e.target.as_str()])
            .collect();
        assign_layers(edges, &mut available, root, 0, (0.0, 0.0), &params())
    }

    #[test]
    fn adjacency_is_symmetric_and_ordered() {
        let edges = vec![Edge::new("a", "b"), Edge::new("c", "a")];
        let adj = adjacency(&edges);
        assert_eq!(adj["a"], vec!["b", "c"]);
        assert_eq!(adj["b"], vec!["a"]);
        assert_eq!(adj["c"], vec!["a"]);
    }

    #[test]
    fn visiting_order_is_depth_first_preorder() {
        let edges = vec![
            Edge::new("r", "a"),
            Edge::new("r", "b"),
            Edge::new("a", "a1"),
            Edge::new("b", "b1"),
        ];
        let out = run(&edges, "r");
        let order: Vec<&str> = out.keys().map(String::as_str).collect();
        assert_eq!(order, vec!["r", "a", "a1", "b", "b1"]);
    }

    #[test]
    fn earlier_subtree_claims_shared_node() {
        // `x` is a direct neighbor of `r`, but `a` comes first and its subtree reaches `x`
        // before the walk gets back to `r`'s second child.
        let edges = vec![
            Edge::new("r", "a"),
            Edge::new("r", "x"),
            Edge::new("a", "x"),
        ];
        let out = run(&edges, "r");
        assert_eq!(out["a"].depth, Some(1));
        assert_eq!(out["x"].depth, Some(2));
        assert_eq!(out.len(), 3);
    }

    #[test]
    fn duplicate_and_self_edges_do_not_add_children() {
        let edges = vec![
            Edge::new("r", "a"),
            Edge::new("a", "r"),
            Edge::new("r", "r"),
        ];
        let out = run(&edges, "r");
        // Only one unvisited neighbor: no radial spread.
        assert_eq!(out["a"].location, [0.0, 0.0, -10.0]);
    }

    #[test]
    fn missing_root_assigns_nothing() {
        let edges = vec![Edge::new("a", "b")];
        let mut available: FxHashSet<&str> = ["a"].into_iter().collect();
        let out = assign_layers(&edges, &mut available, "b", 0, (0.0, 0.0), &params());
        assert!(out.is_empty());
        assert!(available.contains("a"));
    }

    #[test]
    fn two_dimensional_layers_stay_flat() {
        let edges = vec![Edge::new("a", "b"), Edge::new("b", "c")];
        let mut available: FxHashSet<&str> = ["a", "b", "c"].into_iter().collect();
        let flat = LayerParams {
            dimensionality: Dimensionality::Two,
            ..params()
        };
        let out = assign_layers(&edges, &mut available, "a", 0, (1.0, 2.0), &flat);
        for n in out.values() {
            assert_eq!(n.location, [1.0, 2.0, 0.0]);
        }
        assert_eq!(out["c"].depth, Some(2));
    }
}
