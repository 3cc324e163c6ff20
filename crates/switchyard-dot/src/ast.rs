use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A parsed `digraph`.
///
/// `nodes` and `edges` are flattened across subgraphs and keep declaration
/// order: a node appears at the position of the first statement that mentions
/// it, whether a node statement or an edge statement.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DotGraph {
    pub name: Option<String>,
    pub attrs: HashMap<String, AttributeValue>,
    pub nodes: Vec<NodeDef>,
    pub edges: Vec<EdgeDef>,
    pub subgraphs: Vec<SubgraphDef>,
    pub node_defaults: HashMap<String, AttributeValue>,
    pub edge_defaults: HashMap<String, AttributeValue>,
}

impl DotGraph {
    /// Look up a node by id.
    pub fn node(&self, id: &str) -> Option<&NodeDef> {
        self.nodes.iter().find(|n| n.id == id)
    }

    /// Returns `true` if a node with this id was declared or referenced.
    pub fn contains_node(&self, id: &str) -> bool {
        self.node(id).is_some()
    }

    /// Edges leaving `id`, in declaration order.
    pub fn outgoing<'a>(&'a self, id: &'a str) -> impl Iterator<Item = &'a EdgeDef> + 'a {
        self.edges.iter().filter(move |e| e.from == id)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeDef {
    pub id: String,
    pub attrs: HashMap<String, AttributeValue>,
}

impl NodeDef {
    /// The `label` attribute, when it is a string.
    pub fn label(&self) -> Option<&str> {
        self.attrs.get("label").and_then(AttributeValue::as_str)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EdgeDef {
    pub from: String,
    pub to: String,
    pub attrs: HashMap<String, AttributeValue>,
}

impl EdgeDef {
    /// The `label` attribute, when it is a string.
    pub fn label(&self) -> Option<&str> {
        self.attrs.get("label").and_then(AttributeValue::as_str)
    }
}

/// Membership record of a `subgraph` block. Its nodes and edges are also
/// present, in order, on the owning [`DotGraph`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubgraphDef {
    pub name: Option<String>,
    pub attrs: HashMap<String, AttributeValue>,
    pub node_ids: Vec<String>,
    pub edge_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AttributeValue {
    String(String),
    Integer(i64),
    Float(f64),
    Boolean(bool),
}

impl AttributeValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            AttributeValue::String(s) => Some(s),
            _ => None,
        }
    }
}
