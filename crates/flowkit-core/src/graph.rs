//! Graph model: nodes, edges and their referential integrity.

use crate::anchor::AnchorId;
use crate::dataset::{Dataset, EdgeRecord, NodeRecord};
use crate::error::{LoadError, ReferenceError};
use crate::style::{
    LineStyle, NodeStyle, PROPERTY_COLOR, PROPERTY_FILL, PROPERTY_LABEL, PROPERTY_LINE_STYLE,
    PROPERTY_OUTLINE, PROPERTY_TEXT, PROPERTY_TEXT_COLOR, SerializableColor,
};
use kurbo::{Point, Rect, Size};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::borrow::Borrow;
use std::collections::HashMap;
use std::fmt;
use uuid::Uuid;

/// Maximum number of undo states to keep.
const MAX_UNDO_HISTORY: usize = 50;

/// Size given to nodes created without an explicit size.
pub const DEFAULT_NODE_SIZE: Size = Size::new(120.0, 80.0);

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Generate a fresh unique id.
            pub fn generate() -> Self {
                Self(Uuid::new_v4().to_string())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self(id.to_string())
            }
        }

        impl Borrow<str> for $name {
            fn borrow(&self) -> &str {
                &self.0
            }
        }
    };
}

string_id!(
    /// Unique identifier for nodes.
    NodeId
);
string_id!(
    /// Unique identifier for edges.
    EdgeId
);

/// Type tag selecting a node or edge view (e.g. `"decision"`, `"yes"`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TypeTag(String);

impl TypeTag {
    /// Tag of the fallback view entry.
    pub const DEFAULT: &'static str = "default";

    pub fn new(tag: impl Into<String>) -> Self {
        Self(tag.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_default(&self) -> bool {
        self.0 == Self::DEFAULT
    }
}

impl Default for TypeTag {
    fn default() -> Self {
        Self(Self::DEFAULT.to_string())
    }
}

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TypeTag {
    fn from(tag: &str) -> Self {
        Self(tag.to_string())
    }
}

/// A node in the graph.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub(crate) id: NodeId,
    /// View type tag.
    pub type_tag: TypeTag,
    /// Top-left corner position.
    pub position: Point,
    /// Width and height.
    pub size: Size,
    /// User payload (style attributes, text, anything else).
    pub payload: Map<String, Value>,
}

impl Node {
    pub fn id(&self) -> &NodeId {
        &self.id
    }

    /// Bounding box in world coordinates.
    pub fn bounds(&self) -> Rect {
        Rect::from_origin_size(self.position, self.size)
    }

    /// Style attributes, falling back to defaults for missing or unparsable colors.
    pub fn style(&self) -> NodeStyle {
        let defaults = NodeStyle::default();
        NodeStyle {
            fill: color_property(&self.payload, PROPERTY_FILL).unwrap_or(defaults.fill),
            outline: color_property(&self.payload, PROPERTY_OUTLINE).unwrap_or(defaults.outline),
            text_color: color_property(&self.payload, PROPERTY_TEXT_COLOR)
                .unwrap_or(defaults.text_color),
        }
    }

    /// Text shown inside the node.
    pub fn text(&self) -> &str {
        self.payload
            .get(PROPERTY_TEXT)
            .and_then(Value::as_str)
            .unwrap_or("")
    }

    fn from_record(record: NodeRecord) -> Self {
        Self {
            id: record.id,
            type_tag: record.type_tag,
            position: Point::new(record.x, record.y),
            size: Size::new(record.w, record.h),
            payload: record.payload,
        }
    }

    fn to_record(&self) -> NodeRecord {
        NodeRecord {
            id: self.id.clone(),
            type_tag: self.type_tag.clone(),
            x: self.position.x,
            y: self.position.y,
            w: self.size.width,
            h: self.size.height,
            payload: self.payload.clone(),
        }
    }
}

/// A directed edge between two nodes.
#[derive(Debug, Clone, PartialEq)]
pub struct Edge {
    pub(crate) id: EdgeId,
    /// View type tag (e.g. "yes"/"no").
    pub type_tag: TypeTag,
    pub(crate) source: NodeId,
    pub(crate) target: NodeId,
    /// Anchor on the source node (None = chosen when routing).
    pub source_anchor: Option<AnchorId>,
    /// Anchor on the target node (None = chosen when routing).
    pub target_anchor: Option<AnchorId>,
    /// User payload (label, color, line style, anything else).
    pub payload: Map<String, Value>,
}

impl Edge {
    pub fn id(&self) -> &EdgeId {
        &self.id
    }

    pub fn source(&self) -> &NodeId {
        &self.source
    }

    pub fn target(&self) -> &NodeId {
        &self.target
    }

    /// Check if the edge touches the given node.
    pub fn is_incident_to(&self, node: &NodeId) -> bool {
        &self.source == node || &self.target == node
    }

    pub fn label(&self) -> &str {
        self.payload
            .get(PROPERTY_LABEL)
            .and_then(Value::as_str)
            .unwrap_or("")
    }

    pub fn color(&self) -> SerializableColor {
        color_property(&self.payload, PROPERTY_COLOR).unwrap_or(crate::style::DEFAULT_STROKE)
    }

    pub fn line_style(&self) -> LineStyle {
        self.payload
            .get(PROPERTY_LINE_STYLE)
            .and_then(Value::as_str)
            .and_then(LineStyle::parse)
            .unwrap_or_default()
    }

    fn from_record(record: EdgeRecord) -> Self {
        Self {
            id: record.id,
            type_tag: record.type_tag,
            source: record.source,
            target: record.target,
            source_anchor: record.source_anchor,
            target_anchor: record.target_anchor,
            payload: record.payload,
        }
    }

    fn to_record(&self) -> EdgeRecord {
        EdgeRecord {
            id: self.id.clone(),
            type_tag: self.type_tag.clone(),
            source: self.source.clone(),
            target: self.target.clone(),
            source_anchor: self.source_anchor,
            target_anchor: self.target_anchor,
            payload: self.payload.clone(),
        }
    }
}

fn color_property(payload: &Map<String, Value>, key: &str) -> Option<SerializableColor> {
    payload
        .get(key)
        .and_then(Value::as_str)
        .and_then(SerializableColor::parse)
}

/// A snapshot of graph state for undo/redo.
#[derive(Debug, Clone)]
struct GraphSnapshot {
    nodes: HashMap<NodeId, Node>,
    node_order: Vec<NodeId>,
    edges: HashMap<EdgeId, Edge>,
    edge_order: Vec<EdgeId>,
}

/// Owns all nodes and edges and keeps every edge endpoint resolvable.
#[derive(Debug, Clone)]
pub struct GraphModel {
    nodes: HashMap<NodeId, Node>,
    /// Node insertion order (back to front).
    node_order: Vec<NodeId>,
    edges: HashMap<EdgeId, Edge>,
    edge_order: Vec<EdgeId>,
    default_node_size: Size,
    revision: u64,
    dirty: bool,
    undo_stack: Vec<GraphSnapshot>,
    redo_stack: Vec<GraphSnapshot>,
}

impl Default for GraphModel {
    fn default() -> Self {
        Self::new()
    }
}

impl GraphModel {
    /// Create an empty graph.
    pub fn new() -> Self {
        Self::with_default_node_size(DEFAULT_NODE_SIZE)
    }

    /// Create an empty graph whose `add_node` uses the given size.
    pub fn with_default_node_size(size: Size) -> Self {
        Self {
            nodes: HashMap::new(),
            node_order: Vec::new(),
            edges: HashMap::new(),
            edge_order: Vec::new(),
            default_node_size: size,
            revision: 0,
            dirty: false,
            undo_stack: Vec::new(),
            redo_stack: Vec::new(),
        }
    }

    /// Size used for nodes added without one.
    pub fn default_node_size(&self) -> Size {
        self.default_node_size
    }

    /// Replace the whole graph with a dataset.
    ///
    /// The dataset is validated first; on error the graph is unchanged.
    /// Undo history does not survive a load.
    pub fn load(&mut self, dataset: Dataset) -> Result<(), LoadError> {
        dataset.validate()?;

        let mut nodes = HashMap::with_capacity(dataset.nodes.len());
        let mut node_order = Vec::with_capacity(dataset.nodes.len());
        for record in dataset.nodes {
            node_order.push(record.id.clone());
            nodes.insert(record.id.clone(), Node::from_record(record));
        }
        let mut edges = HashMap::with_capacity(dataset.edges.len());
        let mut edge_order = Vec::with_capacity(dataset.edges.len());
        for record in dataset.edges {
            edge_order.push(record.id.clone());
            edges.insert(record.id.clone(), Edge::from_record(record));
        }

        self.nodes = nodes;
        self.node_order = node_order;
        self.edges = edges;
        self.edge_order = edge_order;
        self.undo_stack.clear();
        self.redo_stack.clear();
        self.touch();
        log::info!(
            "Loaded dataset with {} nodes and {} edges",
            self.nodes.len(),
            self.edges.len()
        );
        Ok(())
    }

    /// Parse, validate and load a JSON dataset.
    pub fn load_json(&mut self, json: &str) -> Result<(), LoadError> {
        let dataset = Dataset::from_json(json)?;
        self.load(dataset)
    }

    /// Snapshot the graph in the dataset format (inverse of `load`).
    pub fn export(&self) -> Dataset {
        Dataset {
            nodes: self.nodes().map(Node::to_record).collect(),
            edges: self.edges().map(Edge::to_record).collect(),
        }
    }

    /// Add a node with the default size. Returns its generated id.
    pub fn add_node(
        &mut self,
        type_tag: TypeTag,
        position: Point,
        payload: Map<String, Value>,
    ) -> NodeId {
        let size = self.default_node_size;
        self.add_node_with_size(type_tag, position, size, payload)
    }

    /// Add a node with an explicit size. Returns its generated id.
    pub fn add_node_with_size(
        &mut self,
        type_tag: TypeTag,
        position: Point,
        size: Size,
        payload: Map<String, Value>,
    ) -> NodeId {
        let id = NodeId::generate();
        let node = Node {
            id: id.clone(),
            type_tag,
            position,
            size,
            payload,
        };
        self.node_order.push(id.clone());
        self.nodes.insert(id.clone(), node);
        self.touch();
        id
    }

    /// Add an edge of the default type.
    pub fn add_edge(
        &mut self,
        source: &NodeId,
        target: &NodeId,
        source_anchor: Option<AnchorId>,
        target_anchor: Option<AnchorId>,
        payload: Map<String, Value>,
    ) -> Result<EdgeId, ReferenceError> {
        self.add_edge_typed(
            TypeTag::default(),
            source,
            target,
            source_anchor,
            target_anchor,
            payload,
        )
    }

    /// Add an edge. Fails without side effects if either endpoint is missing.
    pub fn add_edge_typed(
        &mut self,
        type_tag: TypeTag,
        source: &NodeId,
        target: &NodeId,
        source_anchor: Option<AnchorId>,
        target_anchor: Option<AnchorId>,
        payload: Map<String, Value>,
    ) -> Result<EdgeId, ReferenceError> {
        for endpoint in [source, target] {
            if !self.nodes.contains_key(endpoint) {
                return Err(ReferenceError::Node(endpoint.clone()));
            }
        }
        let id = EdgeId::generate();
        let edge = Edge {
            id: id.clone(),
            type_tag,
            source: source.clone(),
            target: target.clone(),
            source_anchor,
            target_anchor,
            payload,
        };
        self.edge_order.push(id.clone());
        self.edges.insert(id.clone(), edge);
        self.touch();
        Ok(id)
    }

    /// Remove a node and every edge touching it.
    ///
    /// Returns the ids of the removed edges. Absent ids are a no-op.
    pub fn delete_node(&mut self, id: &NodeId) -> Vec<EdgeId> {
        if self.nodes.remove(id).is_none() {
            return Vec::new();
        }
        self.node_order.retain(|node_id| node_id != id);

        let incident: Vec<EdgeId> = self
            .edge_order
            .iter()
            .filter(|edge_id| {
                self.edges
                    .get(*edge_id)
                    .is_some_and(|edge| edge.is_incident_to(id))
            })
            .cloned()
            .collect();
        for edge_id in &incident {
            self.edges.remove(edge_id);
        }
        self.edge_order.retain(|edge_id| self.edges.contains_key(edge_id));

        if !incident.is_empty() {
            log::debug!("Deleting node {id} removed {} incident edges", incident.len());
        }
        self.touch();
        incident
    }

    /// Remove an edge. Returns false if it did not exist.
    pub fn delete_edge(&mut self, id: &EdgeId) -> bool {
        if self.edges.remove(id).is_none() {
            return false;
        }
        self.edge_order.retain(|edge_id| edge_id != id);
        self.touch();
        true
    }

    /// Move a node to a new top-left position. Overlaps are allowed.
    pub fn move_node(&mut self, id: &NodeId, position: Point) -> bool {
        let Some(node) = self.nodes.get_mut(id) else {
            return false;
        };
        node.position = position;
        self.touch();
        true
    }

    /// Resize a node.
    pub fn resize_node(&mut self, id: &NodeId, size: Size) -> bool {
        let Some(node) = self.nodes.get_mut(id) else {
            return false;
        };
        node.size = size;
        self.touch();
        true
    }

    /// Set (or with `Value::Null`, remove) a node payload field.
    pub fn update_node_payload(
        &mut self,
        id: &NodeId,
        key: &str,
        value: Value,
    ) -> Result<(), ReferenceError> {
        let node = self
            .nodes
            .get_mut(id)
            .ok_or_else(|| ReferenceError::Node(id.clone()))?;
        set_payload(&mut node.payload, key, value);
        self.touch();
        Ok(())
    }

    /// Set (or with `Value::Null`, remove) an edge payload field.
    pub fn update_edge_payload(
        &mut self,
        id: &EdgeId,
        key: &str,
        value: Value,
    ) -> Result<(), ReferenceError> {
        let edge = self
            .edges
            .get_mut(id)
            .ok_or_else(|| ReferenceError::Edge(id.clone()))?;
        set_payload(&mut edge.payload, key, value);
        self.touch();
        Ok(())
    }

    /// Get a node by id.
    pub fn node(&self, id: &NodeId) -> Option<&Node> {
        self.nodes.get(id)
    }

    /// Get an edge by id.
    pub fn edge(&self, id: &EdgeId) -> Option<&Edge> {
        self.edges.get(id)
    }

    pub fn contains_node(&self, id: &NodeId) -> bool {
        self.nodes.contains_key(id)
    }

    pub fn contains_edge(&self, id: &EdgeId) -> bool {
        self.edges.contains_key(id)
    }

    /// Nodes in insertion order.
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.node_order.iter().filter_map(|id| self.nodes.get(id))
    }

    /// Edges in insertion order.
    pub fn edges(&self) -> impl Iterator<Item = &Edge> {
        self.edge_order.iter().filter_map(|id| self.edges.get(id))
    }

    /// Edges touching a node.
    pub fn incident_edges<'a>(&'a self, node: &'a NodeId) -> impl Iterator<Item = &'a Edge> {
        self.edges().filter(move |edge| edge.is_incident_to(node))
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Get the bounding box of all nodes.
    pub fn bounds(&self) -> Option<Rect> {
        self.nodes()
            .map(Node::bounds)
            .reduce(|acc, bounds| acc.union(bounds))
    }

    /// Find nodes at a point, front-most first.
    pub fn nodes_at_point(&self, point: Point, tolerance: f64) -> Vec<NodeId> {
        self.node_order
            .iter()
            .rev()
            .filter(|id| {
                self.nodes
                    .get(*id)
                    .is_some_and(|node| node.bounds().inflate(tolerance, tolerance).contains(point))
            })
            .cloned()
            .collect()
    }

    /// Find nodes whose bounds intersect a rectangle.
    pub fn nodes_in_rect(&self, rect: Rect) -> Vec<NodeId> {
        self.nodes()
            .filter(|node| rect.intersect(node.bounds()).area() > 0.0)
            .map(|node| node.id.clone())
            .collect()
    }

    /// Check that order lists match the maps and every edge endpoint exists.
    pub fn is_consistent(&self) -> bool {
        self.node_order.len() == self.nodes.len()
            && self.edge_order.len() == self.edges.len()
            && self.node_order.iter().all(|id| self.nodes.contains_key(id))
            && self.edge_order.iter().all(|id| self.edges.contains_key(id))
            && self
                .edges
                .values()
                .all(|edge| self.nodes.contains_key(&edge.source) && self.nodes.contains_key(&edge.target))
    }

    /// Monotonic counter bumped by every mutation.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Returns whether the graph changed since the last call, and resets the flag.
    pub fn take_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }

    fn touch(&mut self) {
        self.revision += 1;
        self.dirty = true;
    }

    fn snapshot(&self) -> GraphSnapshot {
        GraphSnapshot {
            nodes: self.nodes.clone(),
            node_order: self.node_order.clone(),
            edges: self.edges.clone(),
            edge_order: self.edge_order.clone(),
        }
    }

    fn restore(&mut self, snapshot: GraphSnapshot) {
        self.nodes = snapshot.nodes;
        self.node_order = snapshot.node_order;
        self.edges = snapshot.edges;
        self.edge_order = snapshot.edge_order;
        self.touch();
    }

    /// Push current state to undo stack (call before making changes).
    pub fn push_undo(&mut self) {
        let snapshot = self.snapshot();
        self.undo_stack.push(snapshot);
        self.redo_stack.clear();
        if self.undo_stack.len() > MAX_UNDO_HISTORY {
            self.undo_stack.remove(0);
        }
    }

    /// Undo the last change.
    /// Returns true if undo was performed, false if nothing to undo.
    pub fn undo(&mut self) -> bool {
        let Some(snapshot) = self.undo_stack.pop() else {
            return false;
        };
        let current = self.snapshot();
        self.redo_stack.push(current);
        self.restore(snapshot);
        true
    }

    /// Redo the last undone change.
    /// Returns true if redo was performed, false if nothing to redo.
    pub fn redo(&mut self) -> bool {
        let Some(snapshot) = self.redo_stack.pop() else {
            return false;
        };
        let current = self.snapshot();
        self.undo_stack.push(current);
        self.restore(snapshot);
        true
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }
}

fn set_payload(payload: &mut Map<String, Value>, key: &str, value: Value) {
    if value.is_null() {
        payload.remove(key);
    } else {
        payload.insert(key.to_string(), value);
    }
}
