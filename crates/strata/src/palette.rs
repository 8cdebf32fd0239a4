//! Node colors from an externally supplied classification table.

use crate::graph::{LayoutGraph, NodeId};
use std::collections::BTreeMap;

/// Color name per node id, e.g. `{"12": "red"}`.
pub type NodeColors = BTreeMap<NodeId, String>;

/// Sets `color` on every laid-out node listed in `colors` and returns how many were set.
/// Entries for nodes that are not part of the layout are ignored.
pub fn apply_colors(graph: &mut LayoutGraph, colors: &NodeColors) -> usize {
    let mut colored = 0;
    for (id, node) in graph.nodes.iter_mut() {
        if let Some(color) = colors.get(id) {
            node.color = Some(color.clone());
            colored += 1;
        }
    }
    colored
}
