//! Layout session
//!
//! Owns one loaded graph model and the layout derived from it, and walks the
//! `Unloaded -> Loading -> LaidOut -> ReLaidOut` lifecycle. The network layout is
//! expensive, so its result is cached under a structural fingerprint of the model and
//! reused when the user merely switches modes.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use serde::Serialize;

use crate::classify::{LayoutMode, classify_for_mode};
use crate::error::GraphResult;
use crate::graph_types::{Edge, GraphModel};
use crate::layout::{
    ChronologicalConfig, NetworkConfig, PositionedNode, PreviousPositions,
    layout_chronological_with, layout_network_with, positions_by_id,
};
use crate::model::fetch_merged_model;
use crate::store::GraphStore;
use crate::taxonomy::Taxonomy;

/// Default canvas width of the chronological layout
pub const DEFAULT_CANVAS_WIDTH: f64 = 1600.0;

/// Lifecycle of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    /// Nothing loaded yet
    Unloaded,
    /// Awaiting the model fetch
    Loading,
    /// First layout computed
    LaidOut,
    /// Layout recomputed after a mode switch or a data refresh
    ReLaidOut,
}

/// Structural identity of a model's node set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LayoutFingerprint {
    pub node_count: usize,
    /// Hash of the sorted node ids
    pub id_hash: u64,
}

impl LayoutFingerprint {
    pub fn of(model: &GraphModel) -> Self {
        let mut ids: Vec<&str> = model.nodes.iter().map(|n| n.id.as_str()).collect();
        ids.sort_unstable();

        let mut hasher = DefaultHasher::new();
        ids.hash(&mut hasher);
        Self {
            node_count: ids.len(),
            id_hash: hasher.finish(),
        }
    }
}

/// What a renderer needs for one mode: positioned nodes and the edges to draw
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LayoutView {
    pub mode: LayoutMode,
    pub nodes: Vec<PositionedNode>,
    pub edges: Vec<Edge>,
}

#[derive(Debug, Clone)]
struct NetworkCache {
    fingerprint: LayoutFingerprint,
    nodes: Vec<PositionedNode>,
}

/// One loaded model plus its current layout
#[derive(Debug)]
pub struct GraphSession {
    taxonomy: Taxonomy,
    chronological: ChronologicalConfig,
    network: NetworkConfig,
    canvas_width: f64,
    mode: LayoutMode,
    state: SessionState,
    model: Option<GraphModel>,
    network_cache: Option<NetworkCache>,
    /// Positions of a network layout computed before the last refresh
    warm_start: Option<PreviousPositions>,
    current: Option<LayoutView>,
}

impl GraphSession {
    /// Session over `taxonomy`, with lanes and sectors taken from its fields
    pub fn new(taxonomy: Taxonomy) -> Self {
        Self {
            chronological: ChronologicalConfig::for_taxonomy(&taxonomy),
            network: NetworkConfig::for_taxonomy(&taxonomy),
            taxonomy,
            canvas_width: DEFAULT_CANVAS_WIDTH,
            mode: LayoutMode::Chronological,
            state: SessionState::Unloaded,
            model: None,
            network_cache: None,
            warm_start: None,
            current: None,
        }
    }

    pub fn with_canvas_width(mut self, canvas_width: f64) -> Self {
        self.canvas_width = canvas_width;
        self
    }

    pub fn with_network_config(mut self, config: NetworkConfig) -> Self {
        self.network = config;
        self.network_cache = None;
        self
    }

    pub fn with_mode(mut self, mode: LayoutMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn mode(&self) -> LayoutMode {
        self.mode
    }

    pub fn taxonomy(&self) -> &Taxonomy {
        &self.taxonomy
    }

    pub fn model(&self) -> Option<&GraphModel> {
        self.model.as_ref()
    }

    /// The most recently computed layout
    pub fn current(&self) -> Option<&LayoutView> {
        self.current.as_ref()
    }

    /// Fingerprint the cached network layout was computed for
    pub fn cached_fingerprint(&self) -> Option<LayoutFingerprint> {
        self.network_cache.as_ref().map(|c| c.fingerprint)
    }

    /// Fetch a fresh model from `store` and lay it out in the current mode.
    ///
    /// The new model replaces the old one wholesale. On failure the previous model,
    /// layout and state are left untouched and the error is returned for the caller
    /// to offer a retry.
    pub async fn load<S: GraphStore>(&mut self, store: &S) -> GraphResult<()> {
        let previous = self.state;
        self.state = SessionState::Loading;

        let model = match fetch_merged_model(&self.taxonomy, store).await {
            Ok(model) => model,
            Err(err) => {
                self.state = previous;
                return Err(err);
            }
        };

        // A refresh never reuses the cached layout as-is, only as a starting point
        if let Some(cache) = self.network_cache.take() {
            self.warm_start = Some(positions_by_id(&cache.nodes));
        }
        self.model = Some(model);
        self.state = previous;
        self.layout(self.mode);
        Ok(())
    }

    /// Lay the loaded model out in `mode`, making it the current mode.
    ///
    /// Returns `None` while no model has been loaded.
    pub fn layout(&mut self, mode: LayoutMode) -> Option<&LayoutView> {
        let model = self.model.as_ref()?;

        let nodes = match mode {
            LayoutMode::Chronological => {
                layout_chronological_with(model, self.canvas_width, &self.chronological)
            }
            LayoutMode::Network => cached_network_layout(
                model,
                &self.network,
                &mut self.network_cache,
                &mut self.warm_start,
            ),
        };
        let edges = classify_for_mode(model, mode);

        self.state = match self.state {
            SessionState::LaidOut | SessionState::ReLaidOut => SessionState::ReLaidOut,
            SessionState::Unloaded | SessionState::Loading => SessionState::LaidOut,
        };
        self.mode = mode;
        self.current = Some(LayoutView { mode, nodes, edges });
        self.current.as_ref()
    }
}

fn cached_network_layout(
    model: &GraphModel,
    config: &NetworkConfig,
    cache: &mut Option<NetworkCache>,
    warm_start: &mut Option<PreviousPositions>,
) -> Vec<PositionedNode> {
    let fingerprint = LayoutFingerprint::of(model);

    if let Some(cached) = cache.as_ref() {
        if cached.fingerprint == fingerprint {
            tracing::debug!(nodes = fingerprint.node_count, "network layout cache hit");
            return cached.nodes.clone();
        }
    }

    tracing::debug!(
        nodes = fingerprint.node_count,
        stale = cache.is_some(),
        "network layout cache miss"
    );
    let previous = match cache.take() {
        Some(stale) => Some(positions_by_id(&stale.nodes)),
        None => warm_start.take(),
    };
    let nodes = layout_network_with(model, previous.as_ref(), config);
    *cache = Some(NetworkCache {
        fingerprint,
        nodes: nodes.clone(),
    });
    nodes
}
