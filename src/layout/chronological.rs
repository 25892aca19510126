//! Chronological lane layout
//!
//! One horizontal lane per field in declared order, time mapped linearly onto the x
//! axis. Pure function of the model and canvas width: no simulation, no randomness.

use std::collections::HashMap;

use crate::graph_types::{EdgeKind, GraphModel, NodeKind};
use crate::layout::PositionedNode;
use crate::model::resolve_groups;
use crate::taxonomy::Taxonomy;

/// Configuration for the chronological layout
#[derive(Debug, Clone, PartialEq)]
pub struct ChronologicalConfig {
    /// Field ids, one lane each, top to bottom
    pub lanes: Vec<String>,
    /// Time mapped to the left edge of the timeline
    pub min_time: i32,
    /// Time mapped to the right edge of the timeline
    pub max_time: i32,
    pub lane_height: f64,
    /// Label column of the root
    pub root_x: f64,
    /// Label column of the fields
    pub field_x: f64,
    /// Where the timeline starts
    pub timeline_x: f64,
    /// Space kept free right of the timeline; undated topics sit on its edge
    pub right_margin: f64,
    /// Vertical step between topics sharing a field and time
    pub stack_step: f64,
    /// Horizontal distance of the first child column from its parent
    pub child_offset_x: f64,
    pub child_column_width: f64,
    pub child_row_height: f64,
    pub children_per_column: usize,
}

impl Default for ChronologicalConfig {
    fn default() -> Self {
        Self::for_taxonomy(&Taxonomy::physics())
    }
}

impl ChronologicalConfig {
    /// Lanes follow the taxonomy's field order
    pub fn for_taxonomy(taxonomy: &Taxonomy) -> Self {
        Self {
            lanes: taxonomy.field_order(),
            min_time: 1600,
            max_time: 2030,
            lane_height: 150.0,
            root_x: 50.0,
            field_x: 220.0,
            timeline_x: 400.0,
            right_margin: 50.0,
            stack_step: 40.0,
            child_offset_x: 140.0,
            child_column_width: 120.0,
            child_row_height: 35.0,
            children_per_column: 6,
        }
    }
}

/// Vertical offset of the `count`-th topic in one (field, time) bucket: 0, +k, -k, +2k, -2k, ...
pub fn stack_offset(count: usize, step: f64) -> f64 {
    if count == 0 {
        return 0.0;
    }
    let direction = if count % 2 == 0 { -1.0 } else { 1.0 };
    direction * count.div_ceil(2) as f64 * step
}

/// Lay out `model` on a canvas `canvas_width` wide with the default configuration
pub fn layout_chronological(model: &GraphModel, canvas_width: f64) -> Vec<PositionedNode> {
    layout_chronological_with(model, canvas_width, &ChronologicalConfig::default())
}

/// Lay out `model` on a canvas `canvas_width` wide.
///
/// - root: root column, vertically centred across all lanes
/// - field: field column of its lane; fields without a lane stay at the origin
/// - topic: x from its time value, y from its field's lane (first lane if the field has
///   none); undated topics go to the right edge of their lane
/// - concept/section: small grid next to the first already-placed node linking to it
///   through `mentions` or a `hierarchy` edge leaving a topic, edges taken in target id order
///
/// Nodes that none of these rules reach stay at the origin.
pub fn layout_chronological_with(
    model: &GraphModel,
    canvas_width: f64,
    config: &ChronologicalConfig,
) -> Vec<PositionedNode> {
    let lane_index: HashMap<&str, usize> = config
        .lanes
        .iter()
        .enumerate()
        .map(|(i, id)| (id.as_str(), i))
        .collect();
    let lane_y = |group: Option<&str>| -> f64 {
        group
            .and_then(|g| lane_index.get(g))
            .map_or(0.0, |&i| i as f64 * config.lane_height)
    };

    let time_span = f64::from((config.max_time - config.min_time).max(1));
    let available = canvas_width - config.timeline_x - config.right_margin;
    let px_per_time = available / time_span;

    let mut buckets: HashMap<(&str, i32), usize> = HashMap::new();
    let mut placed: Vec<Option<(f64, f64)>> = Vec::with_capacity(model.nodes.len());

    for node in &model.nodes {
        let position = match node.kind() {
            NodeKind::Root => Some((
                config.root_x,
                config.lanes.len() as f64 * config.lane_height / 2.0 - config.lane_height / 2.0,
            )),
            NodeKind::Field => lane_index
                .get(node.id.as_str())
                .map(|&i| (config.field_x, i as f64 * config.lane_height)),
            NodeKind::Topic => {
                let group = node.group_key();
                let lane = lane_y(group);
                match node.time_value() {
                    Some(time) => {
                        let elapsed = f64::from(time) - f64::from(config.min_time);
                        let x = config.timeline_x + elapsed * px_per_time;
                        let count = buckets.entry((group.unwrap_or(""), time)).or_insert(0);
                        let y = lane + stack_offset(*count, config.stack_step);
                        *count += 1;
                        Some((x, y))
                    }
                    None => Some((canvas_width - config.right_margin, lane)),
                }
            }
            NodeKind::Concept | NodeKind::Section => None,
        };
        placed.push(position);
    }

    place_children(model, config, &mut placed);

    let groups = resolve_groups(model);
    model
        .nodes
        .iter()
        .zip(placed)
        .map(|(node, position)| {
            let (x, y) = position.unwrap_or((0.0, 0.0));
            PositionedNode::new(node, groups.get(node.id.as_str()).copied(), x, y)
        })
        .collect()
}

/// Grid concepts and sections next to their first placed parent
fn place_children(
    model: &GraphModel,
    config: &ChronologicalConfig,
    placed: &mut [Option<(f64, f64)>],
) {
    let index: HashMap<&str, usize> = model
        .nodes
        .iter()
        .enumerate()
        .map(|(i, n)| (n.id.as_str(), i))
        .collect();

    let mut links: Vec<(usize, usize, &str)> = model
        .edges
        .iter()
        .filter_map(|e| {
            let source = *index.get(e.source.as_str())?;
            let target = *index.get(e.target.as_str())?;
            let relevant = match e.kind {
                EdgeKind::Mentions => true,
                EdgeKind::Hierarchy => model.nodes[source].kind() == NodeKind::Topic,
                EdgeKind::Temporal | EdgeKind::Run => false,
            };
            relevant.then_some((source, target, e.target.as_str()))
        })
        .collect();
    // Stable: edges with the same target keep model order
    links.sort_by(|a, b| a.2.cmp(b.2));

    let per_column = config.children_per_column.max(1);
    let mut child_count: HashMap<usize, usize> = HashMap::new();
    for (source, target, _) in links {
        if !matches!(
            model.nodes[target].kind(),
            NodeKind::Concept | NodeKind::Section
        ) || placed[target].is_some()
        {
            continue;
        }
        let Some((px, py)) = placed[source] else {
            continue;
        };

        let count = child_count.entry(source).or_insert(0);
        let column = *count / per_column;
        let row = *count % per_column;
        *count += 1;

        let dx = config.child_offset_x + column as f64 * config.child_column_width;
        let dy = (row as f64 - (per_column - 1) as f64 / 2.0) * config.child_row_height;
        placed[target] = Some((px + dx, py + dy));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph_types::{Edge, Node};
    use crate::model::build_default_model;

    fn find<'a>(nodes: &'a [PositionedNode], id: &str) -> &'a PositionedNode {
        nodes.iter().find(|n| n.id() == id).unwrap()
    }

    /// 880 px leaves exactly one pixel per year of the default time range
    const ONE_PX_PER_YEAR: f64 = 880.0;

    #[test]
    fn stack_offsets_alternate_and_grow() {
        let offsets: Vec<f64> = (0..5).map(|c| stack_offset(c, 40.0)).collect();
        assert_eq!(offsets, vec![0.0, 40.0, -40.0, 80.0, -80.0]);
    }

    #[test]
    fn shared_year_topics_are_stacked_deterministically() {
        let model = GraphModel::new(
            vec![
                Node::field("classical", "Classical"),
                Node::topic("a", "A", Some("classical"), Some(1905)),
                Node::topic("b", "B", Some("classical"), Some(1905)),
                Node::topic("c", "C", Some("classical"), Some(1905)),
            ],
            vec![],
        );

        let first = layout_chronological(&model, ONE_PX_PER_YEAR);
        let second = layout_chronological(&model, ONE_PX_PER_YEAR);
        assert_eq!(first, second);

        let ys: Vec<f64> = first[1..].iter().map(|n| n.y).collect();
        assert_eq!(ys, vec![0.0, 40.0, -40.0]);
        assert!(first[1..].iter().all(|n| n.x == 705.0));
    }

    #[test]
    fn lanes_follow_declared_field_order() {
        let nodes = layout_chronological(&build_default_model(), 2000.0);

        assert_eq!(find(&nodes, "classical").y, 0.0);
        assert_eq!(find(&nodes, "electrodynamics").y, 150.0);
        assert_eq!(find(&nodes, "statistical").y, 300.0);
        assert_eq!(find(&nodes, "quantum").y, 450.0);
        assert_eq!(find(&nodes, "quantum").x, 220.0);

        let root = find(&nodes, "root");
        assert_eq!((root.x, root.y), (50.0, 300.0));
    }

    #[test]
    fn undated_topics_go_to_right_edge() {
        let model = GraphModel::new(
            vec![
                Node::field("quantum", "Quantum"),
                Node::topic("qx", "Undated", Some("quantum"), None),
            ],
            vec![],
        );
        let nodes = layout_chronological(&model, 2000.0);
        let undated = find(&nodes, "qx");
        assert_eq!((undated.x, undated.y), (1950.0, 450.0));
    }

    #[test]
    fn extreme_years_map_without_overflow() {
        let model = GraphModel::new(
            vec![
                Node::field("quantum", "Quantum"),
                Node::topic("first", "First", Some("quantum"), Some(i32::MIN)),
                Node::topic("last", "Last", Some("quantum"), Some(i32::MAX)),
            ],
            vec![],
        );
        let nodes = layout_chronological(&model, ONE_PX_PER_YEAR);

        let first = find(&nodes, "first");
        let last = find(&nodes, "last");
        assert_eq!(first.x, 400.0 + (f64::from(i32::MIN) - 1600.0));
        assert_eq!(last.x, 400.0 + (f64::from(i32::MAX) - 1600.0));
        assert_eq!((first.y, last.y), (450.0, 450.0));
    }

    #[test]
    fn children_are_gridded_next_to_parent() {
        let mut model = GraphModel::new(
            vec![
                Node::field("classical", "Classical"),
                Node::topic("c1", "Newton", Some("classical"), Some(1687)),
            ],
            vec![],
        );
        for i in 0..7 {
            let id = format!("k{i}");
            model.nodes.push(Node::section(id.clone(), id.clone(), Some("c1")));
            model.edges.push(Edge::new("c1", id, EdgeKind::Hierarchy));
        }

        let nodes = layout_chronological(&model, ONE_PX_PER_YEAR);
        let parent = find(&nodes, "c1");
        assert_eq!((parent.x, parent.y), (487.0, 0.0));

        let first = find(&nodes, "k0");
        assert_eq!((first.x, first.y), (487.0 + 140.0, -87.5));
        let sixth = find(&nodes, "k5");
        assert_eq!((sixth.x, sixth.y), (487.0 + 140.0, 87.5));
        let seventh = find(&nodes, "k6");
        assert_eq!((seventh.x, seventh.y), (487.0 + 260.0, -87.5));
        assert_eq!(seventh.group.as_deref(), Some("classical"));
    }

    #[test]
    fn first_parent_wins() {
        let model = GraphModel::new(
            vec![
                Node::field("classical", "Classical"),
                Node::field("quantum", "Quantum"),
                Node::topic("c1", "Newton", Some("classical"), Some(1687)),
                Node::topic("q1", "Planck", Some("quantum"), Some(1900)),
                Node::concept("energy", "Energy"),
            ],
            vec![
                Edge::new("q1", "energy", EdgeKind::Mentions),
                Edge::new("c1", "energy", EdgeKind::Mentions),
            ],
        );

        let nodes = layout_chronological(&model, ONE_PX_PER_YEAR);
        let energy = find(&nodes, "energy");
        assert_eq!(energy.x, 700.0 + 140.0);
        assert_eq!(energy.y, 450.0 - 87.5);
    }

    #[test]
    fn unlinked_concepts_stay_at_origin() {
        let model = GraphModel::new(vec![Node::concept("orphan", "Orphan")], vec![]);
        let nodes = layout_chronological(&model, 2000.0);
        assert_eq!((nodes[0].x, nodes[0].y), (0.0, 0.0));
    }

    #[test]
    fn chronological_layout_snapshot() {
        let model = GraphModel::new(
            vec![
                Node::root("root", "PHYSICS"),
                Node::field("classical", "Classical Mechanics"),
                Node::field("quantum", "Quantum Mechanics"),
                Node::topic("c6", "Special Relativity", Some("classical"), Some(1905)),
                Node::topic("c7", "Photoelectric Effect", Some("classical"), Some(1905)),
                Node::topic("q1", "Planck's Quantization", Some("quantum"), Some(1900)),
                Node::topic("qx", "Undated", Some("quantum"), None),
                Node::concept("light", "Light"),
            ],
            vec![Edge::new("c7", "light", EdgeKind::Mentions)],
        );
        let config = ChronologicalConfig {
            lanes: vec!["classical".to_string(), "quantum".to_string()],
            ..ChronologicalConfig::default()
        };

        let rendered: String = layout_chronological_with(&model, ONE_PX_PER_YEAR, &config)
            .iter()
            .map(|n| format!("{:<6} {:>7.1} {:>7.1}\n", n.id(), n.x, n.y))
            .collect();

        insta::assert_snapshot!(rendered, @r"
        root      50.0    75.0
        classical   220.0     0.0
        quantum   220.0   150.0
        c6       705.0     0.0
        c7       705.0    40.0
        q1       700.0   150.0
        qx       830.0   150.0
        light    845.0   -47.5
        ");
    }
}
