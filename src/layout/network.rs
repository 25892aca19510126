//! Sector-constrained network layout
//!
//! The root is pinned at the origin and each sectored field is pinned on a circle at
//! the centre of its angular sector. Every other node starts inside its group's sector
//! (dated topics further out the later they are) and is then relaxed by the force
//! simulation, with a tangential restoring force holding it near the sector axis.

use std::collections::HashMap;
use std::f64::consts::TAU;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::classify::{LayoutMode, classify_for_mode};
use crate::graph_types::{GraphModel, Node, NodeKind};
use crate::layout::PositionedNode;
use crate::model::resolve_groups;
use crate::simulation::{SimEdge, SimNode, SimulationConfig, sector_restoring_force, simulate};
use crate::taxonomy::Taxonomy;

/// Positions of an earlier layout keyed by node id
pub type PreviousPositions = HashMap<String, (f64, f64)>;

/// Configuration for the network layout
#[derive(Debug, Clone, PartialEq)]
pub struct NetworkConfig {
    /// Groups owning a sector, in angular order starting at angle 0
    pub sectors: Vec<String>,
    pub iterations: usize,
    /// Distance of the pinned field anchors from the origin
    pub field_radius: f64,
    /// Initial radius of a topic dated at `time_origin`
    pub topic_base_radius: f64,
    /// Radius added per `time_span` after `time_origin`
    pub topic_radius_growth: f64,
    pub time_origin: i32,
    pub time_span: i32,
    /// Initial radius of undated nodes inside a sector, before the random part
    pub fallback_radius: f64,
    /// Width of the random part of the fallback radius
    pub fallback_spread: f64,
    /// Total width of the tangential jitter across the sector axis
    pub tangential_jitter: f64,
    /// Side of the square unsectored nodes are scattered over, centred on the origin
    pub scatter: f64,
    pub seed: u64,
    pub simulation: SimulationConfig,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self::for_taxonomy(&Taxonomy::physics())
    }
}

impl NetworkConfig {
    pub fn for_taxonomy(taxonomy: &Taxonomy) -> Self {
        Self {
            sectors: taxonomy.sector_groups(),
            iterations: 500,
            field_radius: 300.0,
            topic_base_radius: 350.0,
            topic_radius_growth: 600.0,
            time_origin: 1600,
            time_span: 400,
            fallback_radius: 400.0,
            fallback_spread: 200.0,
            tangential_jitter: 50.0,
            scatter: 1000.0,
            seed: 0x5eed,
            simulation: SimulationConfig::default(),
        }
    }

    /// Sector axis of `group`, if it owns one
    pub fn sector_angle(&self, group: &str) -> Option<f64> {
        let index = self.sectors.iter().position(|s| s == group)?;
        Some(index as f64 * TAU / self.sectors.len() as f64)
    }
}

/// Lay out `model` with the default configuration, warm-starting free nodes from
/// `previous` when given
pub fn layout_network(
    model: &GraphModel,
    previous: Option<&PreviousPositions>,
) -> Vec<PositionedNode> {
    layout_network_with(model, previous, &NetworkConfig::default())
}

/// Lay out `model`.
///
/// Output is in model order. Identical inputs, including `previous` and the seed,
/// give identical positions.
pub fn layout_network_with(
    model: &GraphModel,
    previous: Option<&PreviousPositions>,
    config: &NetworkConfig,
) -> Vec<PositionedNode> {
    if model.nodes.is_empty() {
        return Vec::new();
    }

    let groups = resolve_groups(model);
    let angles: HashMap<&str, f64> = model
        .nodes
        .iter()
        .filter_map(|n| {
            let group = groups.get(n.id.as_str())?;
            Some((n.id.as_str(), config.sector_angle(group)?))
        })
        .collect();

    let mut rng = StdRng::seed_from_u64(config.seed);
    let mut sim_nodes: Vec<SimNode> = Vec::with_capacity(model.nodes.len());
    let mut warm = 0usize;
    for node in &model.nodes {
        let angle = angles.get(node.id.as_str()).copied();
        let sim_node = match (node.kind(), angle) {
            (NodeKind::Root, _) => SimNode::pinned(&node.id, 0.0, 0.0),
            (NodeKind::Field, Some(angle)) => SimNode::pinned(
                &node.id,
                angle.cos() * config.field_radius,
                angle.sin() * config.field_radius,
            ),
            _ => {
                // Drawn even when warm-starting so later nodes get the same start either way
                let (x, y) = initial_position(node, angle, config, &mut rng);
                match previous.and_then(|p| p.get(&node.id)) {
                    Some(&(px, py)) if px.is_finite() && py.is_finite() => {
                        warm += 1;
                        SimNode::new(&node.id, px, py)
                    }
                    _ => SimNode::new(&node.id, x, y),
                }
            }
        };
        sim_nodes.push(sim_node);
    }

    let edges: Vec<SimEdge> = classify_for_mode(model, LayoutMode::Network)
        .iter()
        .map(SimEdge::from)
        .collect();

    tracing::debug!(
        nodes = sim_nodes.len(),
        edges = edges.len(),
        warm,
        iterations = config.iterations,
        "running network layout"
    );

    let constraint = |node: &SimNode| match angles.get(node.id.as_str()) {
        Some(&angle) => sector_restoring_force(node.x, node.y, angle, &config.simulation),
        None => (0.0, 0.0),
    };
    simulate(
        &mut sim_nodes,
        &edges,
        config.iterations,
        &config.simulation,
        Some(&constraint),
    );

    model
        .nodes
        .iter()
        .zip(sim_nodes)
        .map(|(node, sim)| {
            PositionedNode::new(node, groups.get(node.id.as_str()).copied(), sim.x, sim.y)
        })
        .collect()
}

/// Start position of a free node: along its sector axis when it has one, anywhere in
/// the scatter square otherwise
fn initial_position(
    node: &Node,
    angle: Option<f64>,
    config: &NetworkConfig,
    rng: &mut StdRng,
) -> (f64, f64) {
    let Some(angle) = angle else {
        return (
            (rng.r#gen::<f64>() - 0.5) * config.scatter,
            (rng.r#gen::<f64>() - 0.5) * config.scatter,
        );
    };

    let radius = match (node.kind(), node.time_value()) {
        (NodeKind::Topic, Some(time)) => {
            let elapsed = f64::from(time) - f64::from(config.time_origin);
            // Topics older than the time origin start just outside the field ring
            (config.topic_base_radius
                + elapsed / f64::from(config.time_span.max(1)) * config.topic_radius_growth)
                .max(config.field_radius)
        }
        _ => config.fallback_radius + rng.r#gen::<f64>() * config.fallback_spread,
    };
    let jitter = (rng.r#gen::<f64>() - 0.5) * config.tangential_jitter;

    let (sin, cos) = angle.sin_cos();
    (cos * radius - sin * jitter, sin * radius + cos * jitter)
}
