//! Force simulation primitive
//!
//! Evolves point masses under pairwise repulsion, spring attraction along edges, an
//! optional per-node constraint force and a weak pull towards the origin, for a fixed
//! number of steps. Knows nothing about fields or topics; the network layout supplies
//! the domain through the constraint callback.
//!
//! Forces are applied in a fixed order every step (repulsion, springs, constraint,
//! centering, integration). Changing that order changes the numbers.

use std::collections::hash_map::DefaultHasher;
use std::collections::{HashMap, HashSet};
use std::f64::consts::{PI, TAU};
use std::hash::{Hash, Hasher};

use crate::graph_types::{Edge, EdgeKind};

/// A point mass being simulated
#[derive(Debug, Clone, PartialEq)]
pub struct SimNode {
    /// Node ID (from the graph model)
    pub id: String,
    /// Position in 2D space
    pub x: f64,
    pub y: f64,
    /// Velocity
    pub vx: f64,
    pub vy: f64,
    /// Fixed position; a pinned node never moves
    pub pinned: Option<(f64, f64)>,
}

impl SimNode {
    pub fn new(id: impl Into<String>, x: f64, y: f64) -> Self {
        Self {
            id: id.into(),
            x,
            y,
            vx: 0.0,
            vy: 0.0,
            pinned: None,
        }
    }

    /// A node fixed at `(x, y)`
    pub fn pinned(id: impl Into<String>, x: f64, y: f64) -> Self {
        Self {
            pinned: Some((x, y)),
            ..Self::new(id, x, y)
        }
    }

    pub fn is_pinned(&self) -> bool {
        self.pinned.is_some()
    }

    pub fn radius(&self) -> f64 {
        (self.x * self.x + self.y * self.y).sqrt()
    }
}

/// A spring between two node ids
#[derive(Debug, Clone, PartialEq)]
pub struct SimEdge {
    pub source: String,
    pub target: String,
    /// Selects the rest length
    pub kind: EdgeKind,
}

impl From<&Edge> for SimEdge {
    fn from(edge: &Edge) -> Self {
        Self {
            source: edge.source.clone(),
            target: edge.target.clone(),
            kind: edge.kind,
        }
    }
}

/// Configuration for the force simulation
#[derive(Debug, Clone, PartialEq)]
pub struct SimulationConfig {
    /// Repulsion constant between every pair of nodes
    pub repulsion: f64,
    /// Added to the squared distance in the repulsion denominator
    pub softening: f64,
    /// Hooke constant of every spring
    pub spring_strength: f64,
    /// Rest length of relational springs
    pub rest_length: f64,
    /// Rest length of `hierarchy` and `run` springs
    pub backbone_rest_length: f64,
    /// Gain of the sector restoring force
    pub sector_strength: f64,
    /// Extra scale on the sector restoring force
    pub sector_scale: f64,
    /// Pull towards the origin
    pub center_strength: f64,
    /// Velocity kept after each step (friction)
    pub damping: f64,
    /// Floor substituted for vanishing distances
    pub min_distance: f64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            repulsion: 40_000.0,
            softening: 500.0,
            spring_strength: 0.15,
            rest_length: 80.0,
            backbone_rest_length: 50.0,
            sector_strength: 0.1,
            sector_scale: 0.1,
            center_strength: 0.01,
            damping: 0.9,
            min_distance: 0.1,
        }
    }
}

impl SimulationConfig {
    pub fn rest_length(&self, kind: EdgeKind) -> f64 {
        match kind {
            EdgeKind::Hierarchy | EdgeKind::Run => self.backbone_rest_length,
            EdgeKind::Temporal | EdgeKind::Mentions => self.rest_length,
        }
    }
}

/// Per-node force callback, evaluated once per step for every unpinned node
pub type Constraint<'a> = &'a dyn Fn(&SimNode) -> (f64, f64);

/// Tangential force turning a point at `(x, y)` towards `target_angle` around the origin.
///
/// The force is perpendicular to the radius vector, signed to shrink the angular
/// deviation, and grows with both the deviation and the distance from the origin.
pub fn sector_restoring_force(
    x: f64,
    y: f64,
    target_angle: f64,
    config: &SimulationConfig,
) -> (f64, f64) {
    let radius = (x * x + y * y).sqrt();
    if radius < config.min_distance {
        return (0.0, 0.0);
    }
    let deviation = (target_angle - y.atan2(x) + PI).rem_euclid(TAU) - PI;
    let restore = deviation * config.sector_strength * radius * config.sector_scale;

    // (-y, x) is the counter-clockwise tangent
    (-y / radius * restore, x / radius * restore)
}

/// Stable pseudo-random pair in [-1, 1] derived from an id
fn stable_pair(id: &str, salt: u32) -> (f64, f64) {
    let mut hasher = DefaultHasher::new();
    id.hash(&mut hasher);
    salt.hash(&mut hasher);
    let hash = hasher.finish();

    let x = (hash & 0xffff_ffff) as f64 / u32::MAX as f64;
    let y = ((hash >> 32) & 0xffff_ffff) as f64 / u32::MAX as f64;
    (x * 2.0 - 1.0, y * 2.0 - 1.0)
}

/// Move every pinned node onto its fixed position with zero velocity
pub fn snap_pinned(nodes: &mut [SimNode]) {
    for node in nodes.iter_mut() {
        if let Some((x, y)) = node.pinned {
            node.x = x;
            node.y = y;
            node.vx = 0.0;
            node.vy = 0.0;
        }
    }
}

/// Nudge unpinned nodes that sit exactly on top of an earlier node.
///
/// The offset is derived from the node id, so the result is reproducible. Runs once
/// before stepping.
pub fn separate_coincident(nodes: &mut [SimNode], spread: f64) {
    let mut occupied: HashSet<(u64, u64)> = HashSet::with_capacity(nodes.len());
    for node in nodes.iter_mut() {
        let mut salt = 0;
        while !node.is_pinned() && occupied.contains(&(node.x.to_bits(), node.y.to_bits())) {
            let (jx, jy) = stable_pair(&node.id, salt);
            node.x += jx * spread;
            node.y += jy * spread;
            salt += 1;
        }
        occupied.insert((node.x.to_bits(), node.y.to_bits()));
    }
}

/// A spring resolved to node indices
#[derive(Debug, Clone, Copy)]
struct Link {
    source: usize,
    target: usize,
    rest_length: f64,
}

/// One simulation run over a borrowed node slice
pub struct Simulation<'a> {
    nodes: &'a mut [SimNode],
    links: Vec<Link>,
    config: &'a SimulationConfig,
}

impl<'a> Simulation<'a> {
    /// Resolve edges against the nodes; edges naming unknown ids are skipped
    pub fn new(nodes: &'a mut [SimNode], edges: &[SimEdge], config: &'a SimulationConfig) -> Self {
        let index: HashMap<&str, usize> = nodes
            .iter()
            .enumerate()
            .map(|(i, n)| (n.id.as_str(), i))
            .collect();

        let links = edges
            .iter()
            .filter_map(|e| {
                let resolved = index
                    .get(e.source.as_str())
                    .zip(index.get(e.target.as_str()));
                if resolved.is_none() {
                    tracing::debug!(from = %e.source, to = %e.target, "skipping spring with unknown endpoint");
                }
                let (&source, &target) = resolved?;
                (source != target).then(|| Link {
                    source,
                    target,
                    rest_length: config.rest_length(e.kind),
                })
            })
            .collect();

        Self {
            nodes,
            links,
            config,
        }
    }

    /// Run one simulation step
    pub fn tick(&mut self, constraint: Option<Constraint<'_>>) {
        if self.nodes.is_empty() {
            return;
        }

        self.apply_many_body_force();
        self.apply_link_force();
        if let Some(constraint) = constraint {
            self.apply_constraint(constraint);
        }
        self.apply_center_force();
        self.integrate();
    }

    pub fn run(&mut self, iterations: usize, constraint: Option<Constraint<'_>>) {
        for _ in 0..iterations {
            self.tick(constraint);
        }
    }

    fn push(&mut self, i: usize, fx: f64, fy: f64) {
        let node = &mut self.nodes[i];
        if !node.is_pinned() {
            node.vx += fx;
            node.vy += fy;
        }
    }

    /// Softened inverse-square repulsion between all node pairs
    fn apply_many_body_force(&mut self) {
        if self.config.repulsion == 0.0 {
            return;
        }
        let n = self.nodes.len();
        let floor = self.config.min_distance * self.config.min_distance;

        for i in 0..n {
            for j in (i + 1)..n {
                let dx = self.nodes[i].x - self.nodes[j].x;
                let dy = self.nodes[i].y - self.nodes[j].y;
                let raw_sq = dx * dx + dy * dy;
                if raw_sq == 0.0 {
                    continue;
                }
                let dist_sq = raw_sq.max(floor);
                let dist = dist_sq.sqrt();

                let force = self.config.repulsion / (dist_sq + self.config.softening);
                let fx = dx / dist * force;
                let fy = dy / dist * force;

                self.push(i, fx, fy);
                self.push(j, -fx, -fy);
            }
        }
    }

    /// Hooke springs along every resolved edge
    fn apply_link_force(&mut self) {
        for k in 0..self.links.len() {
            let Link {
                source,
                target,
                rest_length,
            } = self.links[k];

            let dx = self.nodes[target].x - self.nodes[source].x;
            let dy = self.nodes[target].y - self.nodes[source].y;
            let dist = (dx * dx + dy * dy).sqrt().max(self.config.min_distance);

            let force = (dist - rest_length) * self.config.spring_strength;
            let fx = dx / dist * force;
            let fy = dy / dist * force;

            self.push(source, fx, fy);
            self.push(target, -fx, -fy);
        }
    }

    fn apply_constraint(&mut self, constraint: Constraint<'_>) {
        for node in self.nodes.iter_mut().filter(|n| !n.is_pinned()) {
            let (fx, fy) = constraint(node);
            if fx.is_finite() && fy.is_finite() {
                node.vx += fx;
                node.vy += fy;
            }
        }
    }

    /// Weak pull towards the origin
    fn apply_center_force(&mut self) {
        let strength = self.config.center_strength;
        for node in self.nodes.iter_mut().filter(|n| !n.is_pinned()) {
            node.vx -= node.x * strength;
            node.vy -= node.y * strength;
        }
    }

    /// Damp velocities and move
    fn integrate(&mut self) {
        let damping = self.config.damping;
        for node in self.nodes.iter_mut().filter(|n| !n.is_pinned()) {
            node.vx *= damping;
            node.vy *= damping;
            node.x += node.vx;
            node.y += node.vy;
        }
    }
}

/// Run `iterations` steps over `nodes`, mutating positions and velocities in place.
///
/// Pinned nodes are moved onto their pin and stopped. Coincident unpinned nodes are
/// separated once before the first step.
pub fn simulate(
    nodes: &mut [SimNode],
    edges: &[SimEdge],
    iterations: usize,
    config: &SimulationConfig,
    constraint: Option<Constraint<'_>>,
) {
    snap_pinned(nodes);
    separate_coincident(nodes, config.min_distance.max(1.0));
    let mut simulation = Simulation::new(nodes, edges, config);
    simulation.run(iterations, constraint);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn edge(source: &str, target: &str, kind: EdgeKind) -> SimEdge {
        SimEdge {
            source: source.to_string(),
            target: target.to_string(),
            kind,
        }
    }

    fn small_system() -> (Vec<SimNode>, Vec<SimEdge>) {
        let nodes = vec![
            SimNode::pinned("root", 0.0, 0.0),
            SimNode::new("a", 120.0, 10.0),
            SimNode::new("b", -40.0, 90.0),
            SimNode::new("c", 15.0, -200.0),
        ];
        let edges = vec![
            edge("root", "a", EdgeKind::Hierarchy),
            edge("a", "b", EdgeKind::Run),
            edge("b", "c", EdgeKind::Mentions),
        ];
        (nodes, edges)
    }

    fn distance(a: &SimNode, b: &SimNode) -> f64 {
        ((a.x - b.x).powi(2) + (a.y - b.y).powi(2)).sqrt()
    }

    #[test]
    fn simulation_is_deterministic() {
        let config = SimulationConfig::default();
        let (mut first, edges) = small_system();
        let (mut second, _) = small_system();

        simulate(&mut first, &edges, 300, &config, None);
        simulate(&mut second, &edges, 300, &config, None);

        for (a, b) in first.iter().zip(&second) {
            assert_eq!(a.x.to_bits(), b.x.to_bits());
            assert_eq!(a.y.to_bits(), b.y.to_bits());
        }
    }

    #[test]
    fn coincident_nodes_stay_finite() {
        let config = SimulationConfig::default();
        let mut nodes: Vec<SimNode> = (0..6).map(|i| SimNode::new(format!("n{i}"), 5.0, 5.0)).collect();
        let edges = vec![edge("n0", "n1", EdgeKind::Mentions)];

        simulate(&mut nodes, &edges, 200, &config, None);

        for node in &nodes {
            assert!(node.x.is_finite() && node.y.is_finite());
            assert!(node.vx.is_finite() && node.vy.is_finite());
        }
    }

    #[test]
    fn coincident_nodes_are_separated_reproducibly() {
        let mut first = vec![SimNode::new("a", 0.0, 0.0), SimNode::new("b", 0.0, 0.0)];
        let mut second = first.clone();

        separate_coincident(&mut first, 1.0);
        separate_coincident(&mut second, 1.0);

        assert_eq!(first, second);
        assert!(distance(&first[0], &first[1]) > 0.0);
        assert_eq!((first[0].x, first[0].y), (0.0, 0.0));
    }

    #[test]
    fn pinned_nodes_do_not_move() {
        let config = SimulationConfig::default();
        let (mut nodes, edges) = small_system();
        nodes.push(SimNode::pinned("anchor", 300.0, -300.0));

        simulate(&mut nodes, &edges, 250, &config, Some(&|_: &SimNode| (5.0, 5.0)));

        assert_eq!((nodes[0].x, nodes[0].y), (0.0, 0.0));
        assert_eq!((nodes[4].x, nodes[4].y), (300.0, -300.0));
    }

    #[test]
    fn pin_overrides_stored_position() {
        let config = SimulationConfig::default();
        let mut nodes = vec![
            SimNode {
                pinned: Some((0.0, 0.0)),
                vx: 3.0,
                ..SimNode::new("root", 5.0, 5.0)
            },
            SimNode::new("a", 120.0, 10.0),
        ];

        simulate(&mut nodes, &[], 0, &config, None);
        assert_eq!((nodes[0].x, nodes[0].y, nodes[0].vx), (0.0, 0.0, 0.0));

        nodes[0].x = 5.0;
        simulate(&mut nodes, &[], 50, &config, None);
        assert_eq!((nodes[0].x, nodes[0].y), (0.0, 0.0));
    }

    #[test]
    fn zero_iterations_leave_positions_alone() {
        let config = SimulationConfig::default();
        let (mut nodes, edges) = small_system();
        let before = nodes.clone();

        simulate(&mut nodes, &edges, 0, &config, None);
        assert_eq!(nodes, before);
    }

    #[test]
    fn lone_pinned_root_stays_at_origin() {
        let config = SimulationConfig::default();
        let mut nodes = vec![SimNode::pinned("root", 0.0, 0.0)];

        simulate(&mut nodes, &[], 500, &config, None);
        assert_eq!((nodes[0].x, nodes[0].y), (0.0, 0.0));
    }

    #[test]
    fn spring_settles_at_rest_length() {
        let config = SimulationConfig {
            repulsion: 0.0,
            center_strength: 0.0,
            ..SimulationConfig::default()
        };
        let mut nodes = vec![SimNode::new("a", 0.0, 0.0), SimNode::new("b", 500.0, 0.0)];
        let edges = vec![edge("a", "b", EdgeKind::Mentions)];

        simulate(&mut nodes, &edges, 1000, &config, None);

        let settled = distance(&nodes[0], &nodes[1]);
        assert!((settled - 80.0).abs() < 0.5, "distance {settled} should settle near 80");
    }

    #[test]
    fn backbone_springs_are_shorter() {
        let config = SimulationConfig::default();
        assert!(config.rest_length(EdgeKind::Run) < config.rest_length(EdgeKind::Mentions));
        assert_eq!(
            config.rest_length(EdgeKind::Hierarchy),
            config.rest_length(EdgeKind::Run)
        );
    }

    #[test]
    fn unknown_endpoints_are_skipped() {
        let config = SimulationConfig::default();
        let mut nodes = vec![SimNode::new("a", 10.0, 0.0), SimNode::new("b", -10.0, 0.0)];
        let edges = vec![
            edge("a", "ghost", EdgeKind::Mentions),
            edge("a", "b", EdgeKind::Mentions),
        ];

        let simulation = Simulation::new(&mut nodes, &edges, &config);
        assert_eq!(simulation.links.len(), 1);
    }

    #[test]
    fn empty_simulation_is_a_no_op() {
        let config = SimulationConfig::default();
        let mut nodes: Vec<SimNode> = Vec::new();
        simulate(&mut nodes, &[], 100, &config, None);
        assert!(nodes.is_empty());
    }

    #[test]
    fn sector_force_turns_towards_target() {
        let config = SimulationConfig::default();

        // On the +x axis, target straight up: push counter-clockwise (+y)
        let (fx, fy) = sector_restoring_force(100.0, 0.0, PI / 2.0, &config);
        assert!(fx.abs() < 1e-9);
        assert!(fy > 0.0);

        // Target straight down: push clockwise (-y)
        let (_, fy) = sector_restoring_force(100.0, 0.0, -PI / 2.0, &config);
        assert!(fy < 0.0);

        // Farther out, same deviation: stronger push
        let (_, near) = sector_restoring_force(100.0, 0.0, 0.5, &config);
        let (_, far) = sector_restoring_force(400.0, 0.0, 0.5, &config);
        assert!(far > near);
    }

    #[test]
    fn sector_force_wraps_across_pi() {
        let config = SimulationConfig::default();
        // Just below the negative x axis, target just above it: short way is clockwise
        let angle = -PI + 0.1;
        let (x, y) = (100.0 * angle.cos(), 100.0 * angle.sin());
        let (fx, fy) = sector_restoring_force(x, y, PI - 0.1, &config);
        // Clockwise tangent at that point points towards +y
        assert!(fy > 0.0);
        assert!(fx.is_finite());
    }

    #[test]
    fn sector_force_vanishes_at_origin() {
        let config = SimulationConfig::default();
        assert_eq!(sector_restoring_force(0.0, 0.0, 1.0, &config), (0.0, 0.0));
    }

    #[test]
    fn constraint_moves_free_nodes() {
        let config = SimulationConfig {
            repulsion: 0.0,
            center_strength: 0.0,
            ..SimulationConfig::default()
        };
        let mut nodes = vec![SimNode::new("a", 0.0, 0.0)];

        simulate(&mut nodes, &[], 10, &config, Some(&|_: &SimNode| (1.0, 0.0)));
        assert!(nodes[0].x > 0.0);
        assert_eq!(nodes[0].y, 0.0);
    }
}
