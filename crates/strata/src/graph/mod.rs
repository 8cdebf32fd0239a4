use crate::error::{Error, Result};
use crate::geometry::Vec3;
use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Deserializer, Serialize};

pub type NodeId = String;

/// A node id as it appears in JSON input: strings are taken verbatim, numbers are coerced to
/// their decimal token (`1` → `"1"`).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct NodeToken(NodeId);

impl<'de> Deserialize<'de> for NodeToken {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        match serde_json::Value::deserialize(deserializer)? {
            serde_json::Value::String(s) => Ok(NodeToken(s)),
            serde_json::Value::Number(n) => Ok(NodeToken(n.to_string())),
            other => Err(serde::de::Error::custom(format!(
                "node id must be a string or a number, got {other}"
            ))),
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum EdgeRepr {
    Pair(NodeToken, NodeToken),
    Object { source: NodeToken, target: NodeToken },
}

impl From<EdgeRepr> for Edge {
    fn from(value: EdgeRepr) -> Self {
        match value {
            EdgeRepr::Pair(s, t) | EdgeRepr::Object {
                source: s,
                target: t,
            } => Edge::new(s.0, t.0),
        }
    }
}

/// Directed for rendering purposes; layering and forces treat it as undirected.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "EdgeRepr")]
pub struct Edge {
    pub source: NodeId,
    pub target: NodeId,
}

impl Edge {
    pub fn new(source: impl Into<NodeId>, target: impl Into<NodeId>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum GraphRepr {
    Edges(Vec<Edge>),
    Object {
        #[serde(default)]
        nodes: Option<Vec<NodeToken>>,
        edges: Vec<Edge>,
    },
}

impl From<GraphRepr> for Graph {
    fn from(value: GraphRepr) -> Self {
        match value {
            GraphRepr::Edges(edges) => Graph { nodes: None, edges },
            GraphRepr::Object { nodes, edges } => Graph {
                nodes: nodes.map(|ns| ns.into_iter().map(|n| n.0).collect()),
                edges,
            },
        }
    }
}

/// Layout input: an edge list plus an optional declared node list.
///
/// Deserializes from a bare edge list (`[["a", "b"], ...]`) or from
/// `{"nodes": [...], "edges": [...]}`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(from = "GraphRepr")]
pub struct Graph {
    /// When present, every edge endpoint must be one of these ids.
    pub nodes: Option<Vec<NodeId>>,
    pub edges: Vec<Edge>,
}

impl Graph {
    pub fn from_edges<S, T>(edges: impl IntoIterator<Item = (S, T)>) -> Self
    where
        S: Into<NodeId>,
        T: Into<NodeId>,
    {
        Self {
            nodes: None,
            edges: edges.into_iter().map(|(s, t)| Edge::new(s, t)).collect(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        let Some(declared) = &self.nodes else {
            return Ok(());
        };
        let declared: rustc_hash::FxHashSet<&str> = declared.iter().map(String::as_str).collect();
        for e in &self.edges {
            for endpoint in [&e.source, &e.target] {
                if !declared.contains(endpoint.as_str()) {
                    return Err(Error::MissingEndpoint {
                        from: e.source.clone(),
                        to: e.target.clone(),
                        node: endpoint.clone(),
                    });
                }
            }
        }
        Ok(())
    }

    /// Declared nodes followed by edge endpoints, in first-appearance order.
    pub fn node_ids(&self) -> IndexSet<&str> {
        let mut ids: IndexSet<&str> = IndexSet::new();
        if let Some(declared) = &self.nodes {
            ids.extend(declared.iter().map(String::as_str));
        }
        for e in &self.edges {
            ids.insert(e.source.as_str());
            ids.insert(e.target.as_str());
        }
        ids
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlacedNode {
    /// Layer index from the root. Absent for force-directed layouts.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub depth: Option<usize>,
    pub location: Vec3,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

impl PlacedNode {
    pub fn at(location: Vec3) -> Self {
        Self {
            depth: None,
            location,
            color: None,
        }
    }

    pub fn layered(depth: usize, location: Vec3) -> Self {
        Self {
            depth: Some(depth),
            location,
            color: None,
        }
    }
}

/// The emitted structure: input edges plus coordinate-annotated nodes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LayoutGraph {
    pub edges: Vec<Edge>,
    pub nodes: IndexMap<NodeId, PlacedNode>,
}

impl LayoutGraph {
    /// Node ids grouped by depth, ascending, each group in layout order.
    pub fn layers(&self) -> std::collections::BTreeMap<usize, Vec<NodeId>> {
        let mut out: std::collections::BTreeMap<usize, Vec<NodeId>> =
            std::collections::BTreeMap::new();
        for (id, n) in &self.nodes {
            if let Some(depth) = n.depth {
                out.entry(depth).or_default().push(id.clone());
            }
        }
        out
    }
}

/// Record of one de-crowding pass.
#[derive(Debug, Clone, PartialEq)]
pub struct SpacedLayer {
    pub depth: usize,
    pub members: Vec<NodeId>,
    /// Temporary edges the pass simulated with; never part of the emitted graph.
    pub synthetic_edges: Vec<Edge>,
}

#[derive(Debug, Clone)]
pub struct LayoutResult {
    pub graph: LayoutGraph,
    /// Empty unless the layered driver found crowded layers.
    pub spaced_layers: Vec<SpacedLayer>,
}
