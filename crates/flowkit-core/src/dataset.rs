//! Dataset load/export format.
//!
//! A dataset is a JSON document with an ordered list of node records and an
//! ordered list of edge records. Any field a record does not name explicitly
//! is kept as payload, so an export reproduces the loaded document.

use crate::anchor::AnchorId;
use crate::error::LoadError;
use crate::graph::{EdgeId, NodeId, TypeTag};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashSet;

/// A node as stored in a dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeRecord {
    pub id: NodeId,
    #[serde(rename = "type", default)]
    pub type_tag: TypeTag,
    #[serde(serialize_with = "write_number")]
    pub x: f64,
    #[serde(serialize_with = "write_number")]
    pub y: f64,
    #[serde(serialize_with = "write_number")]
    pub w: f64,
    #[serde(serialize_with = "write_number")]
    pub h: f64,
    #[serde(flatten)]
    pub payload: Map<String, Value>,
}

/// Integral coordinates are written as JSON integers so exports match their source.
fn write_number<S: serde::Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
    const MAX_EXACT: f64 = 9_007_199_254_740_992.0;
    if value.fract() == 0.0 && value.abs() < MAX_EXACT {
        serializer.serialize_i64(*value as i64)
    } else {
        serializer.serialize_f64(*value)
    }
}

/// An edge as stored in a dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EdgeRecord {
    pub id: EdgeId,
    #[serde(rename = "type", default)]
    pub type_tag: TypeTag,
    pub source: NodeId,
    pub target: NodeId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_anchor: Option<AnchorId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_anchor: Option<AnchorId>,
    #[serde(flatten)]
    pub payload: Map<String, Value>,
}

/// A complete graph document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    #[serde(default)]
    pub nodes: Vec<NodeRecord>,
    #[serde(default)]
    pub edges: Vec<EdgeRecord>,
}

impl Dataset {
    /// Parse and validate a dataset from JSON.
    pub fn from_json(json: &str) -> Result<Self, LoadError> {
        let dataset: Dataset = serde_json::from_str(json)?;
        dataset.validate()?;
        Ok(dataset)
    }

    /// Serialize the dataset to pretty JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Check ids, references and geometry without touching any model.
    pub fn validate(&self) -> Result<(), LoadError> {
        let mut node_ids = HashSet::with_capacity(self.nodes.len());
        for node in &self.nodes {
            if !node_ids.insert(&node.id) {
                return Err(LoadError::DuplicateNode(node.id.clone()));
            }
            if !(node.x.is_finite() && node.y.is_finite()) {
                return Err(LoadError::InvalidGeometry {
                    node: node.id.clone(),
                    reason: "position is not finite".to_string(),
                });
            }
            if !(node.w.is_finite() && node.h.is_finite() && node.w > 0.0 && node.h > 0.0) {
                return Err(LoadError::InvalidGeometry {
                    node: node.id.clone(),
                    reason: format!("size {}x{} must be positive", node.w, node.h),
                });
            }
        }

        let mut edge_ids = HashSet::with_capacity(self.edges.len());
        for edge in &self.edges {
            if !edge_ids.insert(&edge.id) {
                return Err(LoadError::DuplicateEdge(edge.id.clone()));
            }
            for endpoint in [&edge.source, &edge.target] {
                if !node_ids.contains(endpoint) {
                    return Err(LoadError::DanglingEdge {
                        edge: edge.id.clone(),
                        node: endpoint.clone(),
                    });
                }
            }
        }
        Ok(())
    }
}
