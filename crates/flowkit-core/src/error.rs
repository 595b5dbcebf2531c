//! Error types shared across the editor core.

use crate::graph::{EdgeId, NodeId};
use crate::storage::StorageError;
use thiserror::Error;

/// A dataset could not be loaded. The model keeps its previous state.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("Invalid dataset JSON: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("Duplicate node id: {0}")]
    DuplicateNode(NodeId),
    #[error("Duplicate edge id: {0}")]
    DuplicateEdge(EdgeId),
    #[error("Edge {edge} references unknown node {node}")]
    DanglingEdge { edge: EdgeId, node: NodeId },
    #[error("Node {node} has invalid geometry: {reason}")]
    InvalidGeometry { node: NodeId, reason: String },
    #[error("Could not fetch dataset: {0}")]
    Storage(#[from] StorageError),
}

/// An operation referenced an entity that does not exist.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReferenceError {
    #[error("Unknown node: {0}")]
    Node(NodeId),
    #[error("Unknown edge: {0}")]
    Edge(EdgeId),
    #[error("Unknown palette shape: {0}")]
    Shape(String),
}

/// A new connection was refused.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConnectError {
    #[error(transparent)]
    Reference(#[from] ReferenceError),
    #[error("Node {node} already has the maximum of {limit} connections")]
    ConnectionLimit { node: NodeId, limit: usize },
}

/// Editor configuration is unusable. Raised at startup only.
#[derive(Debug, Error)]
pub enum ConfigurationError {
    #[error("No default {0} view is configured")]
    MissingDefaultView(&'static str),
    #[error("Invalid configuration value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },
    #[error("Invalid configuration JSON: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("Could not read configuration: {0}")]
    Io(#[from] std::io::Error),
}
