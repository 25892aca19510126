//! Graph data types shared by the model builder, the edge classifier and the layouts
//!
//! Nodes carry their kind-specific data as a tagged union so that layout code never
//! has to inspect an untyped attribute bag. Positions are not part of a node; layouts
//! return positioned copies instead.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Closed set of node categories
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    Root,
    Field,
    Topic,
    Concept,
    Section,
}

impl NodeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeKind::Root => "root",
            NodeKind::Field => "field",
            NodeKind::Topic => "topic",
            NodeKind::Concept => "concept",
            NodeKind::Section => "section",
        }
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NodeKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "root" => Ok(NodeKind::Root),
            "field" => Ok(NodeKind::Field),
            "topic" => Ok(NodeKind::Topic),
            "concept" => Ok(NodeKind::Concept),
            "section" => Ok(NodeKind::Section),
            other => Err(format!("unknown node kind: {other}")),
        }
    }
}

/// Kind-specific node data
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NodeDetail {
    /// The single hub every field hangs off
    Root,

    /// A field defines its own sector; its group key is its id
    Field {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        description: Option<String>,
    },

    /// A dated entry on a field's timeline
    Topic {
        /// Owning field, used as the sector group
        #[serde(default, skip_serializing_if = "Option::is_none")]
        field_id: Option<String>,

        /// Ordering scalar (a year); `None` means unknown time
        #[serde(default, skip_serializing_if = "Option::is_none")]
        time_value: Option<i32>,

        #[serde(default, skip_serializing_if = "Option::is_none")]
        slug: Option<String>,

        /// One-sentence abstract of the entry
        #[serde(default, skip_serializing_if = "Option::is_none")]
        summary: Option<String>,
    },

    /// A term referenced from content via `[[Term]]`
    Concept {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        description: Option<String>,

        #[serde(default, skip_serializing_if = "Option::is_none")]
        slug: Option<String>,
    },

    /// A keyword section inside a topic page
    Section {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        topic_id: Option<String>,
    },
}

impl NodeDetail {
    pub fn kind(&self) -> NodeKind {
        match self {
            NodeDetail::Root => NodeKind::Root,
            NodeDetail::Field { .. } => NodeKind::Field,
            NodeDetail::Topic { .. } => NodeKind::Topic,
            NodeDetail::Concept { .. } => NodeKind::Concept,
            NodeDetail::Section { .. } => NodeKind::Section,
        }
    }
}

/// A node in the graph model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    /// Stable unique identifier (e.g., "classical", "c1")
    pub id: String,

    /// Human-readable label for display
    pub label: String,

    #[serde(flatten)]
    pub detail: NodeDetail,
}

impl Node {
    pub fn root(id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            detail: NodeDetail::Root,
        }
    }

    pub fn field(id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            detail: NodeDetail::Field { description: None },
        }
    }

    pub fn topic(
        id: impl Into<String>,
        label: impl Into<String>,
        field_id: Option<&str>,
        time_value: Option<i32>,
    ) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            detail: NodeDetail::Topic {
                field_id: field_id.map(str::to_string),
                time_value,
                slug: None,
                summary: None,
            },
        }
    }

    pub fn concept(id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            detail: NodeDetail::Concept {
                description: None,
                slug: None,
            },
        }
    }

    pub fn section(id: impl Into<String>, label: impl Into<String>, topic_id: Option<&str>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            detail: NodeDetail::Section {
                topic_id: topic_id.map(str::to_string),
            },
        }
    }

    pub fn kind(&self) -> NodeKind {
        self.detail.kind()
    }

    /// Sector group this node declares itself.
    ///
    /// Fields group under their own id and topics under their owning field.
    /// Concepts and sections declare none; see `model::resolve_groups` for inheritance.
    pub fn group_key(&self) -> Option<&str> {
        match &self.detail {
            NodeDetail::Field { .. } => Some(self.id.as_str()),
            NodeDetail::Topic { field_id, .. } => field_id.as_deref(),
            _ => None,
        }
    }

    /// Ordering scalar; only topics carry one
    pub fn time_value(&self) -> Option<i32> {
        match &self.detail {
            NodeDetail::Topic { time_value, .. } => *time_value,
            _ => None,
        }
    }
}

/// Edge categories consulted by the layouts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeKind {
    /// Structural containment (root -> field, field -> topic, topic -> section)
    Hierarchy,
    /// Stored sequential ordering within a field
    Temporal,
    /// Content cross-reference
    Mentions,
    /// Synthesized sequential ordering (backbone)
    Run,
}

impl EdgeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EdgeKind::Hierarchy => "hierarchy",
            EdgeKind::Temporal => "temporal",
            EdgeKind::Mentions => "mentions",
            EdgeKind::Run => "run",
        }
    }
}

impl fmt::Display for EdgeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EdgeKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "hierarchy" => Ok(EdgeKind::Hierarchy),
            "temporal" => Ok(EdgeKind::Temporal),
            "mentions" => Ok(EdgeKind::Mentions),
            "run" => Ok(EdgeKind::Run),
            other => Err(format!("unknown edge kind: {other}")),
        }
    }
}

/// A directed edge between two node ids
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Edge {
    /// Source node ID
    pub source: String,

    /// Target node ID
    pub target: String,

    pub kind: EdgeKind,
}

impl Edge {
    pub fn new(source: impl Into<String>, target: impl Into<String>, kind: EdgeKind) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            kind,
        }
    }

    /// Identity used for de-duplication and store upserts
    pub fn key(&self) -> (&str, &str, EdgeKind) {
        (self.source.as_str(), self.target.as_str(), self.kind)
    }
}

impl fmt::Display for Edge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -[{}]-> {}", self.source, self.kind, self.target)
    }
}

/// Nodes and edges of one data load.
///
/// Layouts treat a model as read-only and return positioned copies.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphModel {
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
}

impl GraphModel {
    pub fn new(nodes: Vec<Node>, edges: Vec<Edge>) -> Self {
        Self { nodes, edges }
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Id-indexed view of the nodes
    pub fn index(&self) -> HashMap<&str, &Node> {
        self.nodes.iter().map(|n| (n.id.as_str(), n)).collect()
    }

    pub fn node(&self, id: &str) -> Option<&Node> {
        self.nodes.iter().find(|n| n.id == id)
    }

    /// Copy of the model restricted to the nodes matching `keep`.
    ///
    /// Edges are carried over untouched; consumers drop the ones left dangling.
    pub fn retain_nodes(&self, keep: impl Fn(&Node) -> bool) -> GraphModel {
        GraphModel {
            nodes: self.nodes.iter().filter(|n| keep(n)).cloned().collect(),
            edges: self.edges.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn node_serializes_with_kind_tag() {
        let node = Node::topic("c1", "Newton's Laws of Motion", Some("classical"), Some(1687));
        let json = serde_json::to_value(&node).unwrap();

        assert_eq!(json["id"], "c1");
        assert_eq!(json["kind"], "topic");
        assert_eq!(json["field_id"], "classical");
        assert_eq!(json["time_value"], 1687);
        assert!(json.get("slug").is_none());
    }

    #[test]
    fn node_round_trips_through_json() {
        let node = Node::section("k1", "First Law (Inertia)", Some("c1"));
        let json = serde_json::to_string(&node).unwrap();
        let back: Node = serde_json::from_str(&json).unwrap();
        assert_eq!(back, node);
    }

    #[test]
    fn group_key_follows_kind() {
        assert_eq!(Node::field("quantum", "Quantum").group_key(), Some("quantum"));
        assert_eq!(
            Node::topic("q1", "Planck", Some("quantum"), Some(1900)).group_key(),
            Some("quantum")
        );
        assert_eq!(Node::concept("x", "X").group_key(), None);
        assert_eq!(Node::root("root", "PHYSICS").group_key(), None);
    }

    #[test]
    fn only_topics_carry_time() {
        assert_eq!(
            Node::topic("q1", "Planck", Some("quantum"), Some(1900)).time_value(),
            Some(1900)
        );
        assert_eq!(Node::field("quantum", "Quantum").time_value(), None);
    }

    #[test]
    fn edge_kind_parses_case_insensitive() {
        assert_eq!("Mentions".parse::<EdgeKind>(), Ok(EdgeKind::Mentions));
        assert_eq!(" run ".parse::<EdgeKind>(), Ok(EdgeKind::Run));
        assert!("relational".parse::<EdgeKind>().is_err());
    }

    #[test]
    fn edge_display_names_kind() {
        let edge = Edge::new("classical", "c1", EdgeKind::Hierarchy);
        assert_eq!(edge.to_string(), "classical -[hierarchy]-> c1");
    }

    #[test]
    fn retain_nodes_keeps_edges() {
        let model = GraphModel::new(
            vec![Node::root("root", "PHYSICS"), Node::field("quantum", "Quantum")],
            vec![Edge::new("root", "quantum", EdgeKind::Hierarchy)],
        );
        let filtered = model.retain_nodes(|n| n.kind() != NodeKind::Root);

        assert_eq!(filtered.nodes.len(), 1);
        assert_eq!(filtered.edges.len(), 1);
        assert!(filtered.index().contains_key("quantum"));
    }
}
