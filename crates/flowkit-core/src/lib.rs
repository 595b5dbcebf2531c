//! Flowkit Core Library
//!
//! Platform-agnostic graph editing core for the flowkit flowchart editor:
//! graph model, selection, orthogonal connector routing and view bindings.

pub mod anchor;
pub mod config;
pub mod dataset;
pub mod editor;
pub mod error;
pub mod graph;
pub mod inspector;
pub mod palette;
pub mod routing;
pub mod selection;
pub mod snap;
pub mod storage;
pub mod style;
pub mod view;

/// Tolerance for coordinate comparisons.
pub const EPSILON: f64 = 1e-6;

pub use anchor::{AnchorId, Direction};
pub use config::{EditorConfig, GRID_SIZE, RouterConfig};
pub use dataset::{Dataset, EdgeRecord, NodeRecord};
pub use editor::{ChangeNotice, Editor, EditorObserver, EventTarget, InputEvent, LoadEvent, LoadOutcome, LoadToken};
pub use error::{ConfigurationError, ConnectError, LoadError, ReferenceError};
pub use graph::{Edge, EdgeId, GraphModel, Node, NodeId, TypeTag};
pub use inspector::{InspectorEdit, InspectorTarget};
pub use palette::{DefaultPayload, PayloadGenerator, ShapeDefinition, ShapeKind, ShapeLibrary, ShapeSet};
pub use routing::{ConnectorRouter, Port, Route, RouteRequest};
pub use selection::{EntityRef, Selection, SelectionController};
pub use snap::{SnapResult, snap_point, snap_to_grid};
pub use storage::{FileStorage, MemoryStorage, Storage, StorageError};
pub use style::{LineStyle, NodeStyle, SerializableColor};
pub use view::{Action, ConnectorKind, EdgeView, EventName, NodeView, Overlay, ViewBindings};
