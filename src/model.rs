//! Graph model construction
//!
//! A model is the union of a static baseline derived from the taxonomy and the
//! nodes/edges persisted in the external store. Models are rebuilt wholesale on every
//! load; nothing here patches an existing model.

use std::collections::{HashMap, HashSet};

use crate::error::GraphResult;
use crate::graph_types::{Edge, EdgeKind, GraphModel, Node, NodeDetail, NodeKind};
use crate::store::{GraphStore, StoredGraph};
use crate::taxonomy::{Taxonomy, TopicEntry, parse_time_value};

/// Id of the root node of every static model
pub const ROOT_ID: &str = "root";

/// Build the static baseline from a taxonomy.
///
/// Produces the root, one node per field hung off the root, and one node per topic
/// hung off its field and chained to the previous dated topic of the same field.
/// Sections become children of their topic. The first occurrence of an id wins.
pub fn build_static_model(taxonomy: &Taxonomy) -> GraphModel {
    let mut nodes = vec![Node::root(ROOT_ID, taxonomy.root_label.clone())];
    let mut edges = Vec::new();
    let mut seen: HashSet<&str> = HashSet::from([ROOT_ID]);

    for field in &taxonomy.fields {
        if !seen.insert(field.id.as_str()) {
            tracing::debug!(id = %field.id, "duplicate field id in taxonomy");
            continue;
        }
        nodes.push(Node {
            id: field.id.clone(),
            label: field.name.clone(),
            detail: NodeDetail::Field {
                description: field.description.clone(),
            },
        });
        edges.push(Edge::new(ROOT_ID, field.id.clone(), EdgeKind::Hierarchy));
    }

    let mut topics: Vec<(&TopicEntry, Option<i32>)> = Vec::new();
    for topic in &taxonomy.topics {
        if taxonomy.field(&topic.field_id).is_none() {
            tracing::debug!(id = %topic.id, field = %topic.field_id, "topic of unknown field");
            continue;
        }
        if !seen.insert(topic.id.as_str()) {
            tracing::debug!(id = %topic.id, "duplicate topic id in taxonomy");
            continue;
        }
        topics.push((topic, parse_time_value(&topic.year)));
    }

    for field in &taxonomy.fields {
        let mut field_topics: Vec<&(&TopicEntry, Option<i32>)> =
            topics.iter().filter(|(t, _)| t.field_id == field.id).collect();
        // Dated topics first, chronologically; undated ones keep declared order
        field_topics.sort_by(|(a, ta), (b, tb)| match (ta, tb) {
            (Some(x), Some(y)) => x.cmp(y).then_with(|| a.id.cmp(&b.id)),
            (Some(_), None) => std::cmp::Ordering::Less,
            (None, Some(_)) => std::cmp::Ordering::Greater,
            (None, None) => std::cmp::Ordering::Equal,
        });

        let mut previous: Option<&str> = None;
        for (topic, time_value) in field_topics {
            nodes.push(Node {
                id: topic.id.clone(),
                label: topic.title.clone(),
                detail: NodeDetail::Topic {
                    field_id: Some(field.id.clone()),
                    time_value: *time_value,
                    slug: topic.slug.clone(),
                    summary: topic.summary.clone(),
                },
            });
            edges.push(Edge::new(field.id.clone(), topic.id.clone(), EdgeKind::Hierarchy));

            if time_value.is_some() {
                if let Some(prev) = previous {
                    edges.push(Edge::new(prev, topic.id.clone(), EdgeKind::Temporal));
                }
                previous = Some(topic.id.as_str());
            }
        }
    }

    let topic_ids: HashSet<&str> = topics.iter().map(|(t, _)| t.id.as_str()).collect();
    for section in &taxonomy.sections {
        if !topic_ids.contains(section.topic_id.as_str()) {
            tracing::debug!(id = %section.id, topic = %section.topic_id, "section of unknown topic");
            continue;
        }
        if !seen.insert(section.id.as_str()) {
            tracing::debug!(id = %section.id, "duplicate section id in taxonomy");
            continue;
        }
        nodes.push(Node::section(
            section.id.clone(),
            section.title.clone(),
            Some(section.topic_id.as_str()),
        ));
        edges.push(Edge::new(
            section.topic_id.clone(),
            section.id.clone(),
            EdgeKind::Hierarchy,
        ));
    }

    GraphModel::new(nodes, edges)
}

/// Static baseline of the bundled physics taxonomy
pub fn build_default_model() -> GraphModel {
    build_static_model(&Taxonomy::physics())
}

/// Merge dynamic data over a static baseline.
///
/// A dynamic node replaces any node with the same id in place. Edges from both
/// sides are unioned and de-duplicated on `(source, target, kind)`.
pub fn merge_models(base: GraphModel, dynamic: GraphModel) -> GraphModel {
    let mut nodes: Vec<Node> = Vec::with_capacity(base.nodes.len() + dynamic.nodes.len());
    let mut positions: HashMap<String, usize> = HashMap::new();
    for node in base.nodes {
        if !positions.contains_key(&node.id) {
            positions.insert(node.id.clone(), nodes.len());
            nodes.push(node);
        }
    }

    for node in dynamic.nodes {
        match positions.get(&node.id) {
            Some(&index) => {
                tracing::debug!(id = %node.id, "stored node overrides static node");
                nodes[index] = node;
            }
            None => {
                positions.insert(node.id.clone(), nodes.len());
                nodes.push(node);
            }
        }
    }

    let mut seen: HashSet<(String, String, EdgeKind)> = HashSet::new();
    let edges = base
        .edges
        .into_iter()
        .chain(dynamic.edges)
        .filter(|e| seen.insert((e.source.clone(), e.target.clone(), e.kind)))
        .collect();

    GraphModel::new(nodes, edges)
}

/// Fetch the persisted graph and merge it over the taxonomy baseline.
///
/// Nodes and edges come from a single read of the store, so both belong to the same
/// version. A store failure surfaces as `GraphError::DataUnavailable`; it is not retried.
pub async fn fetch_merged_model<S: GraphStore>(
    taxonomy: &Taxonomy,
    store: &S,
) -> GraphResult<GraphModel> {
    let StoredGraph {
        nodes: stored_nodes,
        edges: stored_edges,
    } = store
        .fetch_graph()
        .await
        .inspect_err(|e| tracing::warn!(error = %e, "failed to read stored graph"))?;

    let dynamic = GraphModel::new(
        stored_nodes.iter().filter_map(|n| n.to_node()).collect(),
        stored_edges.iter().filter_map(|e| e.to_edge()).collect(),
    );
    let model = merge_models(build_static_model(taxonomy), dynamic);

    tracing::info!(
        nodes = model.nodes.len(),
        edges = model.edges.len(),
        stored_nodes = stored_nodes.len(),
        stored_edges = stored_edges.len(),
        "graph model loaded"
    );
    Ok(model)
}

/// Sector group of every node that has one.
///
/// Nodes without a group of their own inherit the group of the source of an incoming
/// `hierarchy` or `mentions` edge, first edge in model order winning. Inheritance
/// is repeated until nothing changes, so chains (topic -> section -> concept) resolve.
pub fn resolve_groups(model: &GraphModel) -> HashMap<&str, &str> {
    let mut groups: HashMap<&str, &str> = model
        .nodes
        .iter()
        .filter_map(|n| n.group_key().map(|g| (n.id.as_str(), g)))
        .collect();
    let inheriting: HashSet<&str> = model
        .nodes
        .iter()
        .filter(|n| n.kind() != NodeKind::Root && n.group_key().is_none())
        .map(|n| n.id.as_str())
        .collect();

    for _ in 0..=inheriting.len() {
        let mut changed = false;
        for edge in &model.edges {
            if !matches!(edge.kind, EdgeKind::Hierarchy | EdgeKind::Mentions) {
                continue;
            }
            let target = edge.target.as_str();
            if !inheriting.contains(target) || groups.contains_key(target) {
                continue;
            }
            if let Some(&group) = groups.get(edge.source.as_str()) {
                groups.insert(target, group);
                changed = true;
            }
        }
        if !changed {
            break;
        }
    }
    groups
}
