//! Layout strategies
//!
//! Two independent ways of placing a graph model on a plane:
//!
//! - [`chronological`]: deterministic lanes, one per field, with time on the x axis.
//! - [`network`]: a force simulation whose free nodes are held in angular sectors by
//!   field, around a pinned root and pinned field anchors.
//!
//! Both return positioned copies of the model's nodes in model order and never
//! modify the model.

pub mod chronological;
pub mod network;

use serde::{Deserialize, Serialize};

use crate::graph_types::{Node, NodeKind};

pub use crate::classify::LayoutMode;
pub use chronological::{ChronologicalConfig, layout_chronological, layout_chronological_with};
pub use network::{NetworkConfig, PreviousPositions, layout_network, layout_network_with};

/// A node together with the position a layout assigned to it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionedNode {
    #[serde(flatten)]
    pub node: Node,

    /// Sector group, own or inherited
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,

    pub x: f64,
    pub y: f64,
}

impl PositionedNode {
    pub fn new(node: &Node, group: Option<&str>, x: f64, y: f64) -> Self {
        Self {
            node: node.clone(),
            group: group.map(str::to_string),
            x,
            y,
        }
    }

    pub fn id(&self) -> &str {
        &self.node.id
    }

    pub fn kind(&self) -> NodeKind {
        self.node.kind()
    }
}

/// Positions keyed by node id, for warm-starting a later layout
pub fn positions_by_id(nodes: &[PositionedNode]) -> PreviousPositions {
    nodes
        .iter()
        .map(|n| (n.node.id.clone(), (n.x, n.y)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn positioned_node_serializes_flat() {
        let node = Node::topic("q1", "Planck", Some("quantum"), Some(1900));
        let positioned = PositionedNode::new(&node, Some("quantum"), 12.5, -3.0);
        let json = serde_json::to_value(&positioned).unwrap();

        assert_eq!(json["id"], "q1");
        assert_eq!(json["kind"], "topic");
        assert_eq!(json["group"], "quantum");
        assert_eq!(json["x"], 12.5);
        assert_eq!(json["y"], -3.0);
    }

    #[test]
    fn positions_by_id_collects_coordinates() {
        let nodes = vec![
            PositionedNode::new(&Node::root("root", "PHYSICS"), None, 0.0, 0.0),
            PositionedNode::new(&Node::field("quantum", "Quantum"), Some("quantum"), 1.0, 2.0),
        ];
        let positions = positions_by_id(&nodes);
        assert_eq!(positions.get("quantum"), Some(&(1.0, 2.0)));
        assert_eq!(positions.len(), 2);
    }
}
