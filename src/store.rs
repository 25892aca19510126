//! Persisted graph store
//!
//! The dynamic half of the graph model lives in an external store holding two
//! collections, nodes and edges. This module defines the row shapes as they are
//! persisted, the `GraphStore` trait the model builder reads through, and two
//! backends: an in-memory store and a JSON document on disk.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::graph_types::{Edge, EdgeKind, Node, NodeDetail, NodeKind};
use crate::taxonomy::parse_time_value;

/// Errors that can occur while reading or writing the store
#[derive(Error, Debug)]
pub enum StoreError {
    /// An I/O error occurred
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The stored document could not be decoded
    #[error("parse error: {0}")]
    Parse(String),

    /// The store could not be reached at all
    #[error("store unreachable: {0}")]
    Unreachable(String),
}

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Loosely typed attribute bag of a stored node
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StoredNodeData {
    #[serde(default, alias = "fieldId", skip_serializing_if = "Option::is_none")]
    pub field_id: Option<String>,

    /// Stored either as a number or as a string
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year: Option<serde_json::Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slug: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,

    #[serde(default, alias = "topicId", skip_serializing_if = "Option::is_none")]
    pub topic_id: Option<String>,
}

/// A row of the nodes collection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredNode {
    pub id: String,

    #[serde(alias = "type")]
    pub kind: String,

    pub label: String,

    #[serde(default)]
    pub data: StoredNodeData,
}

/// A row of the edges collection; the kind is stored as a label string
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredEdge {
    pub source: String,
    pub target: String,

    #[serde(alias = "type", alias = "kind")]
    pub label: String,
}

/// Both collections as one document
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StoredGraph {
    #[serde(default)]
    pub nodes: Vec<StoredNode>,

    #[serde(default)]
    pub edges: Vec<StoredEdge>,
}

fn stored_year(value: &serde_json::Value) -> Option<i32> {
    match value {
        serde_json::Value::Number(n) => n
            .as_i64()
            .and_then(|y| i32::try_from(y).ok())
            .filter(|y| *y != 0),
        serde_json::Value::String(s) => parse_time_value(s),
        _ => None,
    }
}

impl StoredNode {
    /// Convert into a typed node; rows of an unknown kind yield `None`
    pub fn to_node(&self) -> Option<Node> {
        let kind = match self.kind.parse::<NodeKind>() {
            Ok(kind) => kind,
            Err(e) => {
                tracing::debug!(id = %self.id, error = %e, "skipping stored node");
                return None;
            }
        };
        let data = &self.data;
        let detail = match kind {
            NodeKind::Root => NodeDetail::Root,
            NodeKind::Field => NodeDetail::Field {
                description: data.description.clone(),
            },
            NodeKind::Topic => NodeDetail::Topic {
                field_id: data.field_id.clone(),
                time_value: data.year.as_ref().and_then(stored_year),
                slug: data.slug.clone(),
                summary: data.summary.clone(),
            },
            NodeKind::Concept => NodeDetail::Concept {
                description: data.description.clone(),
                slug: data.slug.clone(),
            },
            NodeKind::Section => NodeDetail::Section {
                topic_id: data.topic_id.clone(),
            },
        };
        Some(Node {
            id: self.id.clone(),
            label: self.label.clone(),
            detail,
        })
    }

    pub fn from_node(node: &Node) -> Self {
        let mut data = StoredNodeData::default();
        match &node.detail {
            NodeDetail::Root => {}
            NodeDetail::Field { description } => data.description = description.clone(),
            NodeDetail::Topic {
                field_id,
                time_value,
                slug,
                summary,
            } => {
                data.field_id = field_id.clone();
                data.year = Some(serde_json::Value::String(
                    time_value.unwrap_or(0).to_string(),
                ));
                data.slug = slug.clone();
                data.summary = summary.clone();
            }
            NodeDetail::Concept { description, slug } => {
                data.description = description.clone();
                data.slug = slug.clone();
            }
            NodeDetail::Section { topic_id } => data.topic_id = topic_id.clone(),
        }
        Self {
            id: node.id.clone(),
            kind: node.kind().to_string(),
            label: node.label.clone(),
            data,
        }
    }
}

impl StoredEdge {
    /// Convert into a typed edge; unknown labels yield `None`
    pub fn to_edge(&self) -> Option<Edge> {
        match self.label.parse::<EdgeKind>() {
            Ok(kind) => Some(Edge::new(self.source.clone(), self.target.clone(), kind)),
            Err(e) => {
                tracing::debug!(from = %self.source, to = %self.target, error = %e, "skipping stored edge");
                None
            }
        }
    }

    pub fn from_edge(edge: &Edge) -> Self {
        Self {
            source: edge.source.clone(),
            target: edge.target.clone(),
            label: edge.kind.to_string(),
        }
    }

    fn same_key(&self, other: &StoredEdge) -> bool {
        self.source == other.source
            && self.target == other.target
            && self.label.trim().eq_ignore_ascii_case(other.label.trim())
    }
}

impl StoredGraph {
    /// Insert or replace nodes by id
    pub fn upsert_nodes(&mut self, nodes: Vec<StoredNode>) {
        for node in nodes {
            match self.nodes.iter().position(|n| n.id == node.id) {
                Some(index) => self.nodes[index] = node,
                None => self.nodes.push(node),
            }
        }
    }

    /// Insert edges whose `(source, target, kind)` is not stored yet
    pub fn upsert_edges(&mut self, edges: Vec<StoredEdge>) {
        for edge in edges {
            if !self.edges.iter().any(|e| e.same_key(&edge)) {
                self.edges.push(edge);
            }
        }
    }
}

/// Read/write access to the persisted graph collections
///
/// Reads are bulk reads of a whole collection. Writes are idempotent upserts keyed
/// by `id` for nodes and by `(source, target, kind)` for edges.
pub trait GraphStore {
    /// Read every stored node
    fn fetch_nodes(&self) -> impl Future<Output = StoreResult<Vec<StoredNode>>> + Send;

    /// Read every stored edge
    fn fetch_edges(&self) -> impl Future<Output = StoreResult<Vec<StoredEdge>>> + Send;

    /// Read both collections from one consistent snapshot
    fn fetch_graph(&self) -> impl Future<Output = StoreResult<StoredGraph>> + Send;

    /// Insert or replace nodes by id
    fn upsert_nodes(&self, nodes: Vec<StoredNode>)
    -> impl Future<Output = StoreResult<()>> + Send;

    /// Insert edges, ignoring ones already stored
    fn upsert_edges(&self, edges: Vec<StoredEdge>)
    -> impl Future<Output = StoreResult<()>> + Send;

    /// Replace both collections wholesale
    fn replace_all(&self, graph: StoredGraph) -> impl Future<Output = StoreResult<()>> + Send;
}

/// Store kept entirely in memory
#[derive(Debug)]
pub struct MemoryStore {
    graph: Mutex<StoredGraph>,
    available: AtomicBool,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new(StoredGraph::default())
    }
}

impl MemoryStore {
    pub fn new(graph: StoredGraph) -> Self {
        Self {
            graph: Mutex::new(graph),
            available: AtomicBool::new(true),
        }
    }

    /// Toggle reachability; an unavailable store fails every call
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    fn with_graph<T>(&self, f: impl FnOnce(&mut StoredGraph) -> T) -> StoreResult<T> {
        if !self.available.load(Ordering::SeqCst) {
            return Err(StoreError::Unreachable("memory store is offline".to_string()));
        }
        let mut graph = self
            .graph
            .lock()
            .map_err(|_| StoreError::Unreachable("memory store lock poisoned".to_string()))?;
        Ok(f(&mut graph))
    }
}

impl GraphStore for MemoryStore {
    fn fetch_nodes(&self) -> impl Future<Output = StoreResult<Vec<StoredNode>>> + Send {
        let result = self.with_graph(|g| g.nodes.clone());
        async move { result }
    }

    fn fetch_edges(&self) -> impl Future<Output = StoreResult<Vec<StoredEdge>>> + Send {
        let result = self.with_graph(|g| g.edges.clone());
        async move { result }
    }

    fn fetch_graph(&self) -> impl Future<Output = StoreResult<StoredGraph>> + Send {
        let result = self.with_graph(|g| g.clone());
        async move { result }
    }

    fn upsert_nodes(
        &self,
        nodes: Vec<StoredNode>,
    ) -> impl Future<Output = StoreResult<()>> + Send {
        let result = self.with_graph(|g| g.upsert_nodes(nodes));
        async move { result }
    }

    fn upsert_edges(
        &self,
        edges: Vec<StoredEdge>,
    ) -> impl Future<Output = StoreResult<()>> + Send {
        let result = self.with_graph(|g| g.upsert_edges(edges));
        async move { result }
    }

    fn replace_all(&self, graph: StoredGraph) -> impl Future<Output = StoreResult<()>> + Send {
        let result = self.with_graph(|g| *g = graph);
        async move { result }
    }
}

/// Store backed by one JSON document on disk
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read(path: &Path) -> StoreResult<StoredGraph> {
        let content = tokio::fs::read_to_string(path).await?;
        serde_json::from_str(&content).map_err(|e| StoreError::Parse(e.to_string()))
    }

    async fn write(path: &Path, graph: &StoredGraph) -> StoreResult<()> {
        let content =
            serde_json::to_string_pretty(graph).map_err(|e| StoreError::Parse(e.to_string()))?;
        tokio::fs::write(path, content).await?;
        Ok(())
    }

    /// Read-modify-write; a missing file starts from an empty graph
    async fn update(path: PathBuf, f: impl FnOnce(&mut StoredGraph) + Send) -> StoreResult<()> {
        let mut graph = match Self::read(&path).await {
            Ok(graph) => graph,
            Err(StoreError::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                StoredGraph::default()
            }
            Err(e) => return Err(e),
        };
        f(&mut graph);
        Self::write(&path, &graph).await
    }
}

impl GraphStore for JsonFileStore {
    fn fetch_nodes(&self) -> impl Future<Output = StoreResult<Vec<StoredNode>>> + Send {
        let path = self.path.clone();
        async move { Ok(Self::read(&path).await?.nodes) }
    }

    fn fetch_edges(&self) -> impl Future<Output = StoreResult<Vec<StoredEdge>>> + Send {
        let path = self.path.clone();
        async move { Ok(Self::read(&path).await?.edges) }
    }

    fn fetch_graph(&self) -> impl Future<Output = StoreResult<StoredGraph>> + Send {
        let path = self.path.clone();
        async move { Self::read(&path).await }
    }

    fn upsert_nodes(
        &self,
        nodes: Vec<StoredNode>,
    ) -> impl Future<Output = StoreResult<()>> + Send {
        Self::update(self.path.clone(), move |g| g.upsert_nodes(nodes))
    }

    fn upsert_edges(
        &self,
        edges: Vec<StoredEdge>,
    ) -> impl Future<Output = StoreResult<()>> + Send {
        Self::update(self.path.clone(), move |g| g.upsert_edges(edges))
    }

    fn replace_all(&self, graph: StoredGraph) -> impl Future<Output = StoreResult<()>> + Send {
        let path = self.path.clone();
        async move { Self::write(&path, &graph).await }
    }
}
