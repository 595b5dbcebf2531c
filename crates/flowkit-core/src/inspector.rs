//! Property inspector for the single selected entity.

use crate::graph::{EdgeId, GraphModel, NodeId};
use crate::selection::{EntityRef, SelectionController};
use crate::style::{
    LineStyle, NodeStyle, PROPERTY_COLOR, PROPERTY_FILL, PROPERTY_LABEL, PROPERTY_LINE_STYLE,
    PROPERTY_OUTLINE, PROPERTY_TEXT, PROPERTY_TEXT_COLOR, SerializableColor,
};
use serde_json::Value;

/// Editable properties of the inspected entity.
#[derive(Debug, Clone, PartialEq)]
pub enum InspectorTarget {
    Node {
        id: NodeId,
        text: String,
        style: NodeStyle,
    },
    Edge {
        id: EdgeId,
        label: String,
        color: SerializableColor,
        line_style: LineStyle,
    },
}

impl InspectorTarget {
    /// Build the target for the current selection.
    ///
    /// Only a single selected entity can be inspected.
    pub fn from_selection(selection: &SelectionController, model: &GraphModel) -> Option<Self> {
        match selection.single()? {
            EntityRef::Node(id) => {
                let node = model.node(&id)?;
                Some(InspectorTarget::Node {
                    text: node.text().to_string(),
                    style: node.style(),
                    id,
                })
            }
            EntityRef::Edge(id) => {
                let edge = model.edge(&id)?;
                Some(InspectorTarget::Edge {
                    label: edge.label().to_string(),
                    color: edge.color(),
                    line_style: edge.line_style(),
                    id,
                })
            }
        }
    }

    pub fn entity(&self) -> EntityRef {
        match self {
            InspectorTarget::Node { id, .. } => EntityRef::Node(id.clone()),
            InspectorTarget::Edge { id, .. } => EntityRef::Edge(id.clone()),
        }
    }
}

/// A single property change made in the inspector.
#[derive(Debug, Clone, PartialEq)]
pub enum InspectorEdit {
    NodeText(String),
    NodeFill(SerializableColor),
    NodeOutline(SerializableColor),
    NodeTextColor(SerializableColor),
    EdgeLabel(String),
    EdgeColor(SerializableColor),
    EdgeLineStyle(LineStyle),
}

impl InspectorEdit {
    pub fn applies_to_node(&self) -> bool {
        matches!(
            self,
            InspectorEdit::NodeText(_)
                | InspectorEdit::NodeFill(_)
                | InspectorEdit::NodeOutline(_)
                | InspectorEdit::NodeTextColor(_)
        )
    }

    /// Payload key and value written by this edit.
    pub fn property(&self) -> (&'static str, Value) {
        match self {
            InspectorEdit::NodeText(text) => (PROPERTY_TEXT, Value::from(text.as_str())),
            InspectorEdit::NodeFill(color) => (PROPERTY_FILL, Value::from(color.to_hex())),
            InspectorEdit::NodeOutline(color) => (PROPERTY_OUTLINE, Value::from(color.to_hex())),
            InspectorEdit::NodeTextColor(color) => {
                (PROPERTY_TEXT_COLOR, Value::from(color.to_hex()))
            }
            InspectorEdit::EdgeLabel(label) => (PROPERTY_LABEL, Value::from(label.as_str())),
            InspectorEdit::EdgeColor(color) => (PROPERTY_COLOR, Value::from(color.to_hex())),
            InspectorEdit::EdgeLineStyle(style) => (PROPERTY_LINE_STYLE, Value::from(style.as_str())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::TypeTag;
    use kurbo::Point;
    use serde_json::{Map, json};

    fn payload(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => Map::new(),
        }
    }

    #[test]
    fn test_requires_single_selection() {
        let mut model = GraphModel::new();
        let a = model.add_node(TypeTag::default(), Point::ZERO, payload(json!({"text": "A"})));
        let b = model.add_node(TypeTag::default(), Point::ZERO, Map::new());
        let mut selection = SelectionController::new();
        assert!(InspectorTarget::from_selection(&selection, &model).is_none());

        selection.select_only(a.clone().into());
        let target = InspectorTarget::from_selection(&selection, &model).unwrap();
        assert!(matches!(&target, InspectorTarget::Node { text, .. } if text == "A"));
        assert_eq!(target.entity(), EntityRef::Node(a));

        selection.add_to_selection(b.into());
        assert!(InspectorTarget::from_selection(&selection, &model).is_none());
    }

    #[test]
    fn test_edge_target_defaults() {
        let mut model = GraphModel::new();
        let a = model.add_node(TypeTag::default(), Point::ZERO, Map::new());
        let e = model.add_edge(&a, &a, None, None, Map::new()).unwrap();
        let mut selection = SelectionController::new();
        selection.select_only(e.into());
        match InspectorTarget::from_selection(&selection, &model) {
            Some(InspectorTarget::Edge { label, color, line_style, .. }) => {
                assert_eq!(label, "");
                assert_eq!(color, crate::style::DEFAULT_STROKE);
                assert_eq!(line_style, LineStyle::TargetArrow);
            }
            other => panic!("expected edge target, got {other:?}"),
        }
    }

    #[test]
    fn test_edit_properties() {
        let (key, value) = InspectorEdit::EdgeLineStyle(LineStyle::Dashed).property();
        assert_eq!(key, "lineStyle");
        assert_eq!(value, "dashed");
        let (key, value) = InspectorEdit::NodeFill(SerializableColor::black()).property();
        assert_eq!(key, "fill");
        assert_eq!(value, "#000000");
        assert!(InspectorEdit::NodeText("x".into()).applies_to_node());
        assert!(!InspectorEdit::EdgeLabel("x".into()).applies_to_node());
    }
}
