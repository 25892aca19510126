//! Edge selection per presentation mode
//!
//! Stored edges are not drawn as-is. The chronological view keeps the structural and
//! temporal skeleton; the network view replaces same-field topic links with a
//! synthesized backbone chain so that dated topics do not form triangles.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::graph_types::{Edge, EdgeKind, GraphModel, Node, NodeKind};

/// Which layout the edges are selected for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LayoutMode {
    Chronological,
    Network,
}

impl fmt::Display for LayoutMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LayoutMode::Chronological => f.write_str("chronological"),
            LayoutMode::Network => f.write_str("network"),
        }
    }
}

impl FromStr for LayoutMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "chronological" | "timeline" => Ok(LayoutMode::Chronological),
            "network" => Ok(LayoutMode::Network),
            other => Err(format!("unknown layout mode: {other}")),
        }
    }
}

/// Chronological chain of dated topics per field.
///
/// For every group of topics having both a group key and a time value: one
/// `hierarchy` edge from the field to the earliest topic, then one `run` edge between
/// each consecutive pair ordered by time, ties broken by id. Groups are emitted in
/// order of first appearance.
pub fn synthesize_backbone(model: &GraphModel) -> Vec<Edge> {
    let mut groups: Vec<(&str, Vec<(i32, &str)>)> = Vec::new();
    let mut slots: HashMap<&str, usize> = HashMap::new();

    for node in model.nodes.iter().filter(|n| n.kind() == NodeKind::Topic) {
        let (Some(group), Some(time)) = (node.group_key(), node.time_value()) else {
            continue;
        };
        let slot = *slots.entry(group).or_insert_with(|| {
            groups.push((group, Vec::new()));
            groups.len() - 1
        });
        groups[slot].1.push((time, node.id.as_str()));
    }

    let mut edges = Vec::new();
    for (group, mut topics) in groups {
        topics.sort();
        if let Some((_, first)) = topics.first() {
            edges.push(Edge::new(group, *first, EdgeKind::Hierarchy));
        }
        for pair in topics.windows(2) {
            edges.push(Edge::new(pair[0].1, pair[1].1, EdgeKind::Run));
        }
    }
    edges
}

/// Both endpoints are dated topics of the same field
fn is_backbone_redundant(source: &Node, target: &Node) -> bool {
    source.kind() == NodeKind::Topic
        && target.kind() == NodeKind::Topic
        && source.time_value().is_some()
        && target.time_value().is_some()
        && source.group_key().is_some()
        && source.group_key() == target.group_key()
}

/// Edges to draw and simulate for `mode`.
///
/// - chronological: `temporal` and `mentions` edges, plus `hierarchy` edges leaving a
///   field or a topic.
/// - network: every stored edge except `hierarchy`/`temporal` links between dated
///   topics of one field, followed by the synthesized backbone.
///
/// Edges whose endpoints are not both among the model's nodes are dropped, as are
/// repeated `(source, target, kind)` triples.
pub fn classify_for_mode(model: &GraphModel, mode: LayoutMode) -> Vec<Edge> {
    let index = model.index();

    let candidates: Vec<Edge> = match mode {
        LayoutMode::Chronological => model
            .edges
            .iter()
            .filter(|e| match e.kind {
                EdgeKind::Temporal | EdgeKind::Mentions => true,
                EdgeKind::Hierarchy => index
                    .get(e.source.as_str())
                    .is_some_and(|n| matches!(n.kind(), NodeKind::Field | NodeKind::Topic)),
                EdgeKind::Run => false,
            })
            .cloned()
            .collect(),
        LayoutMode::Network => model
            .edges
            .iter()
            .filter(|e| {
                if !matches!(e.kind, EdgeKind::Hierarchy | EdgeKind::Temporal) {
                    return true;
                }
                match (index.get(e.source.as_str()), index.get(e.target.as_str())) {
                    (Some(source), Some(target)) => !is_backbone_redundant(source, target),
                    _ => true,
                }
            })
            .cloned()
            .chain(synthesize_backbone(model))
            .collect(),
    };

    let mut seen: HashSet<(String, String, EdgeKind)> = HashSet::new();
    candidates
        .into_iter()
        .filter(|e| {
            let resolved =
                index.contains_key(e.source.as_str()) && index.contains_key(e.target.as_str());
            if !resolved {
                tracing::debug!(edge = %e, "dropping dangling edge");
            }
            resolved
        })
        .filter(|e| seen.insert((e.source.clone(), e.target.clone(), e.kind)))
        .collect()
}
