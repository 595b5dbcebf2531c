//! Declarative view bindings: how each node and edge type is drawn and
//! which action each input event triggers.
//!
//! The table is resolved once when built. Lookups for unknown type tags fall
//! back to the default entry, which the builder requires.

use crate::error::ConfigurationError;
use crate::graph::{Edge, Node, TypeTag};
use crate::palette::{ShapeKind, ShapeLibrary};
use crate::style::{PROPERTY_LABEL, PROPERTY_TEXT};
use serde_json::{Map, Value};
use std::collections::HashMap;

/// Input event kinds a view can bind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventName {
    Tap,
    Click,
    DoubleClick,
}

/// What a bound event does.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Replace the selection with the target.
    SelectOnly,
    /// Add the target when shift is held and something of the same kind is
    /// already selected, otherwise select only the target.
    SelectAccumulating,
    ClearSelection,
    /// Delete the target entity.
    DeleteEntity,
}

/// Event name to action bindings.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EventTable {
    bindings: HashMap<EventName, Action>,
}

impl EventTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind an event, replacing any earlier binding.
    pub fn on(mut self, event: EventName, action: Action) -> Self {
        self.bindings.insert(event, action);
        self
    }

    pub fn action(&self, event: EventName) -> Option<Action> {
        self.bindings.get(&event).copied()
    }
}

/// How to draw a node.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeRecipe {
    /// Fixed outline. `None` takes the shape registered for the node's type.
    pub shape: Option<ShapeKind>,
    pub label_template: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NodeView {
    pub recipe: NodeRecipe,
    /// Maximum incident edges. `None` is unlimited.
    pub max_connections: Option<usize>,
    pub events: EventTable,
}

impl NodeView {
    /// Outline shape for a node drawn with this view.
    pub fn shape_for(&self, node: &Node, library: &ShapeLibrary) -> ShapeKind {
        self.recipe
            .shape
            .or_else(|| library.shape(node.type_tag.as_str()).map(|shape| shape.kind))
            .unwrap_or(ShapeKind::Rectangle)
    }

    pub fn label(&self, node: &Node) -> String {
        render_label(&self.recipe.label_template, &node.payload)
    }
}

/// Connector geometry for an edge type.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ConnectorKind {
    Orthogonal { stub: f64 },
}

/// Decoration drawn along an edge.
#[derive(Debug, Clone, PartialEq)]
pub enum Overlay {
    /// Text placed at a fraction of the path length.
    Label { template: String, location: f64 },
    /// Affordance that deletes the edge when clicked.
    DeleteButton,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EdgeView {
    pub connector: ConnectorKind,
    pub label_template: Option<String>,
    /// Width of the invisible hit area around the path.
    pub outline_width: f64,
    pub overlays: Vec<Overlay>,
    pub events: EventTable,
}

impl EdgeView {
    pub fn label(&self, edge: &Edge) -> Option<String> {
        self.label_template
            .as_deref()
            .map(|template| render_label(template, &edge.payload))
    }

    pub fn has_delete_button(&self) -> bool {
        self.overlays.contains(&Overlay::DeleteButton)
    }

    /// Rendered label overlays with their path locations.
    pub fn label_overlays(&self, edge: &Edge) -> Vec<(String, f64)> {
        self.overlays
            .iter()
            .filter_map(|overlay| match overlay {
                Overlay::Label { template, location } => {
                    Some((render_label(template, &edge.payload), *location))
                }
                Overlay::DeleteButton => None,
            })
            .collect()
    }
}

/// Resolved view table.
#[derive(Debug, Clone, PartialEq)]
pub struct ViewBindings {
    nodes: HashMap<TypeTag, NodeView>,
    default_node: NodeView,
    edges: HashMap<TypeTag, EdgeView>,
    default_edge: EdgeView,
    canvas_events: EventTable,
}

impl ViewBindings {
    pub fn builder() -> ViewBindingsBuilder {
        ViewBindingsBuilder::default()
    }

    /// The flowchart editor's bindings.
    ///
    /// Nodes take their outline from the shape library and select on tap
    /// (shift accumulates). Edges use an orthogonal connector with the given
    /// stub, a midpoint label and a delete button, and select on click
    /// (shift accumulates). Clicking the canvas clears the selection.
    pub fn flowchart(stub: f64) -> Self {
        let label = format!("{{{{{PROPERTY_LABEL}}}}}");
        Self {
            nodes: HashMap::new(),
            default_node: NodeView {
                recipe: NodeRecipe {
                    shape: None,
                    label_template: format!("{{{{{PROPERTY_TEXT}}}}}"),
                },
                max_connections: None,
                events: EventTable::new().on(EventName::Tap, Action::SelectAccumulating),
            },
            edges: HashMap::new(),
            default_edge: EdgeView {
                connector: ConnectorKind::Orthogonal { stub },
                label_template: Some(label.clone()),
                outline_width: 10.0,
                overlays: vec![
                    Overlay::Label {
                        template: label,
                        location: 0.5,
                    },
                    Overlay::DeleteButton,
                ],
                events: EventTable::new().on(EventName::Click, Action::SelectAccumulating),
            },
            canvas_events: EventTable::new().on(EventName::Click, Action::ClearSelection),
        }
    }

    /// View for a node type, falling back to the default.
    pub fn node_view(&self, tag: &TypeTag) -> &NodeView {
        self.nodes.get(tag).unwrap_or(&self.default_node)
    }

    /// View for an edge type, falling back to the default.
    pub fn edge_view(&self, tag: &TypeTag) -> &EdgeView {
        self.edges.get(tag).unwrap_or(&self.default_edge)
    }

    pub fn canvas_action(&self, event: EventName) -> Option<Action> {
        self.canvas_events.action(event)
    }
}

/// Collects view entries; `build` checks that default entries exist.
#[derive(Debug, Clone, Default)]
pub struct ViewBindingsBuilder {
    nodes: HashMap<TypeTag, NodeView>,
    edges: HashMap<TypeTag, EdgeView>,
    canvas_events: EventTable,
}

impl ViewBindingsBuilder {
    pub fn node(mut self, tag: impl Into<TypeTag>, view: NodeView) -> Self {
        self.nodes.insert(tag.into(), view);
        self
    }

    pub fn edge(mut self, tag: impl Into<TypeTag>, view: EdgeView) -> Self {
        self.edges.insert(tag.into(), view);
        self
    }

    pub fn canvas_event(mut self, event: EventName, action: Action) -> Self {
        self.canvas_events = self.canvas_events.on(event, action);
        self
    }

    pub fn build(mut self) -> Result<ViewBindings, ConfigurationError> {
        let default_tag = TypeTag::default();
        let default_node = self
            .nodes
            .remove(&default_tag)
            .ok_or(ConfigurationError::MissingDefaultView("node"))?;
        let default_edge = self
            .edges
            .remove(&default_tag)
            .ok_or(ConfigurationError::MissingDefaultView("edge"))?;
        for (tag, view) in &self.edges {
            let ConnectorKind::Orthogonal { stub } = view.connector;
            if !(stub.is_finite() && stub > 0.0) {
                return Err(ConfigurationError::InvalidValue {
                    field: "connector.stub",
                    reason: format!("edge view {tag} has stub {stub}"),
                });
            }
        }
        Ok(ViewBindings {
            nodes: self.nodes,
            default_node,
            edges: self.edges,
            default_edge,
            canvas_events: self.canvas_events,
        })
    }
}

/// Substitute `{{key}}` placeholders with payload values.
///
/// Strings are inserted verbatim, other values as JSON, missing keys and
/// nulls as nothing. An unterminated `{{` is kept literally.
pub fn render_label(template: &str, payload: &Map<String, Value>) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(start) = rest.find("{{") {
        let Some(len) = rest[start + 2..].find("}}") else {
            break;
        };
        out.push_str(&rest[..start]);
        let key = rest[start + 2..start + 2 + len].trim();
        match payload.get(key) {
            Some(Value::String(s)) => out.push_str(s),
            Some(Value::Null) | None => {}
            Some(other) => out.push_str(&other.to_string()),
        }
        rest = &rest[start + 2 + len + 2..];
    }
    out.push_str(rest);
    out
}
