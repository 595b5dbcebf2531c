//! Editor context: owns the graph, the selection and the view table, turns
//! input events into typed calls and tells observers when something changed.
//!
//! Every public mutation runs inside [`Editor::batch`]. Observers hear about
//! a batch once, after its outermost closure returns, so a handler that makes
//! several edits produces a single notification.

use crate::EPSILON;
use crate::anchor::AnchorId;
use crate::config::{EditorConfig, RouterConfig};
use crate::dataset::Dataset;
use crate::error::{ConfigurationError, ConnectError, LoadError, ReferenceError};
use crate::graph::{EdgeId, GraphModel, Node, NodeId, TypeTag};
use crate::inspector::{InspectorEdit, InspectorTarget};
use crate::palette::{PayloadGenerator, ShapeLibrary};
use crate::routing::{ConnectorRouter, Port, Route, RouteRequest};
use crate::selection::{EntityRef, SelectionController};
use crate::snap::snap_point;
use crate::storage::{Storage, StorageResult};
use crate::style::{DEFAULT_STROKE, LineStyle, PROPERTY_COLOR, PROPERTY_LABEL, PROPERTY_LINE_STYLE};
use crate::view::{Action, ConnectorKind, EventName, ViewBindings};
use kurbo::{Line, ParamCurveNearest, Point, Rect, Shape, Size};
use serde_json::{Map, Value};

/// What an input event was aimed at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventTarget {
    Canvas,
    Node(NodeId),
    Edge(EdgeId),
    /// The delete button overlay of an edge.
    DeleteButton(EdgeId),
}

/// A pointer event delivered by the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputEvent {
    pub target: EventTarget,
    pub name: EventName,
    pub shift: bool,
    /// An earlier handler already consumed the event.
    pub default_prevented: bool,
}

impl InputEvent {
    pub fn new(target: EventTarget, name: EventName) -> Self {
        Self {
            target,
            name,
            shift: false,
            default_prevented: false,
        }
    }

    pub fn tap(target: EventTarget) -> Self {
        Self::new(target, EventName::Tap)
    }

    pub fn click(target: EventTarget) -> Self {
        Self::new(target, EventName::Click)
    }

    pub fn with_shift(mut self) -> Self {
        self.shift = true;
        self
    }

    pub fn prevented(mut self) -> Self {
        self.default_prevented = true;
        self
    }
}

/// Summary of one batch, delivered to observers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChangeNotice {
    /// Graph revision after the batch.
    pub revision: u64,
    pub graph_changed: bool,
    pub selection_changed: bool,
}

/// Receives change notifications (typically the renderer).
pub trait EditorObserver {
    fn on_change(
        &mut self,
        notice: &ChangeNotice,
        model: &GraphModel,
        selection: &SelectionController,
    );
}

impl<F> EditorObserver for F
where
    F: FnMut(&ChangeNotice, &GraphModel, &SelectionController),
{
    fn on_change(
        &mut self,
        notice: &ChangeNotice,
        model: &GraphModel,
        selection: &SelectionController,
    ) {
        self(notice, model, selection)
    }
}

/// Identifies one call to [`Editor::begin_load`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LoadToken(u64);

/// How a pending load ended, as reported to its callback.
#[derive(Debug)]
pub enum LoadEvent<'a> {
    Applied,
    Failed(&'a LoadError),
    /// A newer load replaced this one.
    Cancelled,
}

/// Result of [`Editor::finish_load`].
#[derive(Debug)]
pub enum LoadOutcome {
    Applied,
    /// The dataset was rejected; the graph is unchanged.
    Failed(LoadError),
    /// The token is no longer current and the result was discarded.
    Superseded,
}

type LoadCallback = Box<dyn FnOnce(LoadEvent<'_>)>;

struct PendingLoad {
    token: LoadToken,
    callback: LoadCallback,
}

/// The editor context.
pub struct Editor {
    config: EditorConfig,
    model: GraphModel,
    selection: SelectionController,
    views: ViewBindings,
    router: ConnectorRouter,
    library: ShapeLibrary,
    observers: Vec<Box<dyn EditorObserver>>,
    batch_depth: usize,
    pending_load: Option<PendingLoad>,
    next_load: u64,
}

impl Editor {
    /// Create an editor with an empty graph.
    pub fn new(config: EditorConfig, views: ViewBindings) -> Result<Self, ConfigurationError> {
        config.validate()?;
        log::debug!(
            "Editor created: grid {}x{}, snapping {}, stub {}",
            config.grid.width,
            config.grid.height,
            config.snap_to_grid,
            config.routing.stub_length
        );
        Ok(Self {
            model: GraphModel::with_default_node_size(config.default_node_size),
            selection: SelectionController::new(),
            router: ConnectorRouter::new(config.routing),
            library: ShapeLibrary::default(),
            observers: Vec::new(),
            batch_depth: 0,
            pending_load: None,
            next_load: 0,
            views,
            config,
        })
    }

    /// Create an editor with the flowchart view bindings.
    pub fn flowchart(config: EditorConfig) -> Result<Self, ConfigurationError> {
        let views = ViewBindings::flowchart(config.routing.stub_length);
        Self::new(config, views)
    }

    /// Replace the shape palette.
    pub fn with_library(mut self, library: ShapeLibrary) -> Self {
        self.library = library;
        self
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    pub fn model(&self) -> &GraphModel {
        &self.model
    }

    pub fn selection(&self) -> &SelectionController {
        &self.selection
    }

    pub fn views(&self) -> &ViewBindings {
        &self.views
    }

    pub fn library(&self) -> &ShapeLibrary {
        &self.library
    }

    pub fn subscribe(&mut self, observer: impl EditorObserver + 'static) {
        self.observers.push(Box::new(observer));
    }

    /// Run `f` as one batch. Nested batches join the outermost one.
    pub fn batch<R>(&mut self, f: impl FnOnce(&mut Self) -> R) -> R {
        self.batch_depth += 1;
        let result = f(self);
        self.batch_depth -= 1;
        if self.batch_depth == 0 {
            self.selection.retain_existing(&self.model);
            self.notify();
        }
        result
    }

    fn notify(&mut self) {
        let graph_changed = self.model.take_dirty();
        let selection_changed = self.selection.take_changed();
        if !graph_changed && !selection_changed {
            return;
        }
        let notice = ChangeNotice {
            revision: self.model.revision(),
            graph_changed,
            selection_changed,
        };
        for observer in &mut self.observers {
            observer.on_change(&notice, &self.model, &self.selection);
        }
    }

    /// Mutate the graph directly inside a batch.
    pub fn update<R>(&mut self, f: impl FnOnce(&mut GraphModel) -> R) -> R {
        self.batch(|editor| f(&mut editor.model))
    }

    // --- Input ---

    /// Handle an input event. Returns the action it triggered, if any.
    pub fn dispatch(&mut self, event: InputEvent) -> Option<Action> {
        let action = self.resolve(&event)?;
        log::debug!("{:?} on {:?} -> {:?}", event.name, event.target, action);
        self.batch(|editor| editor.apply_action(action, &event));
        Some(action)
    }

    fn resolve(&self, event: &InputEvent) -> Option<Action> {
        match &event.target {
            EventTarget::Canvas => self.views.canvas_action(event.name),
            EventTarget::Node(id) => {
                let node = self.model.node(id)?;
                self.views.node_view(&node.type_tag).events.action(event.name)
            }
            EventTarget::Edge(id) => {
                if event.default_prevented {
                    return None;
                }
                let edge = self.model.edge(id)?;
                self.views.edge_view(&edge.type_tag).events.action(event.name)
            }
            EventTarget::DeleteButton(id) => {
                let edge = self.model.edge(id)?;
                let has_button = self.views.edge_view(&edge.type_tag).has_delete_button();
                (has_button && event.name == EventName::Click).then_some(Action::DeleteEntity)
            }
        }
    }

    fn apply_action(&mut self, action: Action, event: &InputEvent) {
        let entity = match &event.target {
            EventTarget::Canvas => None,
            EventTarget::Node(id) => Some(EntityRef::Node(id.clone())),
            EventTarget::Edge(id) | EventTarget::DeleteButton(id) => {
                Some(EntityRef::Edge(id.clone()))
            }
        };
        match (action, entity) {
            (Action::ClearSelection, _) => self.selection.clear(),
            (Action::SelectOnly, Some(entity)) => self.selection.select_only(entity),
            (Action::SelectAccumulating, Some(entity)) => {
                let same_kind_selected = match &entity {
                    EntityRef::Node(_) => self.selection.nodes().next().is_some(),
                    EntityRef::Edge(_) => self.selection.edges().next().is_some(),
                };
                if event.shift && same_kind_selected {
                    self.selection.add_to_selection(entity);
                } else {
                    self.selection.select_only(entity);
                }
            }
            (Action::DeleteEntity, Some(entity)) => {
                self.model.push_undo();
                match entity {
                    EntityRef::Node(id) => {
                        self.model.delete_node(&id);
                    }
                    EntityRef::Edge(id) => {
                        self.model.delete_edge(&id);
                    }
                }
            }
            (_, None) => {}
        }
    }

    /// The front-most thing under a world point.
    ///
    /// Nodes win over edges. A node is hit inside the outline of its shape,
    /// an edge within half its view's outline width of its routed path.
    pub fn hit_test(&self, point: Point) -> EventTarget {
        for id in self.model.nodes_at_point(point, 0.0) {
            let Some(node) = self.model.node(&id) else {
                continue;
            };
            let shape = self.views.node_view(&node.type_tag).shape_for(node, &self.library);
            if shape.outline(node.bounds()).contains(point) {
                return EventTarget::Node(id);
            }
        }
        let edges: Vec<_> = self.model.edges().collect();
        for edge in edges.into_iter().rev() {
            let half = self.views.edge_view(&edge.type_tag).outline_width / 2.0;
            let Some(route) = self.route_edge(edge.id()) else {
                continue;
            };
            let hit = route
                .segments()
                .any(|(a, b)| Line::new(a, b).nearest(point, 1e-6).distance_sq <= half * half);
            if hit {
                return EventTarget::Edge(edge.id().clone());
            }
        }
        EventTarget::Canvas
    }

    /// Select every node intersecting a lasso rectangle. A lasso that
    /// catches no node selects the edges whose routed path it encloses.
    pub fn lasso(&mut self, rect: Rect) {
        let nodes = self.model.nodes_in_rect(rect);
        let edges: Vec<EdgeId> = if nodes.is_empty() {
            let area = rect.abs().inflate(EPSILON, EPSILON);
            self.route_all()
                .into_iter()
                .filter(|(_, route)| route.points.iter().all(|point| area.contains(*point)))
                .map(|(id, _)| id)
                .collect()
        } else {
            Vec::new()
        };
        self.batch(|editor| {
            if nodes.is_empty() {
                editor.selection.select_edges(edges);
            } else {
                editor.selection.select_nodes(nodes);
            }
        });
    }

    // --- Loading ---

    /// Start loading a dataset. Any load still pending is cancelled and its
    /// callback receives [`LoadEvent::Cancelled`].
    pub fn begin_load(&mut self, callback: impl FnOnce(LoadEvent<'_>) + 'static) -> LoadToken {
        self.next_load += 1;
        let token = LoadToken(self.next_load);
        let previous = self.pending_load.replace(PendingLoad {
            token,
            callback: Box::new(callback),
        });
        if let Some(previous) = previous {
            log::debug!("Load {:?} cancelled by {:?}", previous.token, token);
            (previous.callback)(LoadEvent::Cancelled);
        }
        token
    }

    /// Deliver the result of a load started with `begin_load`.
    ///
    /// Results for a token that is no longer current are discarded. An
    /// applied load clears the selection.
    pub fn finish_load(
        &mut self,
        token: LoadToken,
        result: Result<Dataset, LoadError>,
    ) -> LoadOutcome {
        let pending = match self.pending_load.take() {
            Some(pending) if pending.token == token => pending,
            other => {
                self.pending_load = other;
                log::debug!("Discarding result of superseded load {token:?}");
                return LoadOutcome::Superseded;
            }
        };

        let result = result.and_then(|dataset| {
            self.batch(|editor| {
                editor.model.load(dataset)?;
                editor.selection.clear();
                Ok(())
            })
        });
        match result {
            Ok(()) => {
                (pending.callback)(LoadEvent::Applied);
                LoadOutcome::Applied
            }
            Err(err) => {
                log::warn!("Load failed: {err}");
                (pending.callback)(LoadEvent::Failed(&err));
                LoadOutcome::Failed(err)
            }
        }
    }

    /// Fetch a dataset from storage and load it.
    pub async fn load_from(&mut self, storage: &dyn Storage, id: &str) -> LoadOutcome {
        let token = self.begin_load(|_| {});
        let result = storage.load(id).await.map_err(LoadError::from);
        self.finish_load(token, result)
    }

    /// Save the current graph to storage.
    pub async fn save_to(&self, storage: &dyn Storage, id: &str) -> StorageResult<()> {
        let dataset = self.model.export();
        storage.save(id, &dataset).await
    }

    pub fn export_json(&self) -> Result<String, serde_json::Error> {
        self.model.export().to_json()
    }

    // --- Editing ---

    /// Drop a palette shape at a world position.
    pub fn drop_shape(
        &mut self,
        shape_id: &str,
        position: Point,
        generator: &dyn PayloadGenerator,
    ) -> Result<NodeId, ReferenceError> {
        let shape = self
            .library
            .shape(shape_id)
            .cloned()
            .ok_or_else(|| ReferenceError::Shape(shape_id.to_string()))?;
        let position = snap_point(position, self.config.snap_to_grid, self.config.grid).point;
        let size = shape.size.unwrap_or(self.config.default_node_size);
        let payload = generator.generate(&shape);
        let id = self.batch(|editor| {
            editor.model.push_undo();
            editor
                .model
                .add_node_with_size(TypeTag::new(shape.id.as_str()), position, size, payload)
        });
        log::debug!("Dropped {shape_id} as node {id} at {position:?}");
        Ok(id)
    }

    /// Connect two nodes with a default-type edge.
    pub fn connect(
        &mut self,
        source: &NodeId,
        target: &NodeId,
        source_anchor: Option<AnchorId>,
        target_anchor: Option<AnchorId>,
    ) -> Result<EdgeId, ConnectError> {
        self.connect_typed(TypeTag::default(), source, target, source_anchor, target_anchor)
    }

    /// Connect two nodes. The new edge starts with an empty label, the
    /// default stroke color and a target arrow.
    pub fn connect_typed(
        &mut self,
        type_tag: TypeTag,
        source: &NodeId,
        target: &NodeId,
        source_anchor: Option<AnchorId>,
        target_anchor: Option<AnchorId>,
    ) -> Result<EdgeId, ConnectError> {
        for endpoint in [source, target] {
            let node = self
                .model
                .node(endpoint)
                .ok_or_else(|| ReferenceError::Node(endpoint.clone()))?;
            if let Some(limit) = self.views.node_view(&node.type_tag).max_connections {
                if self.model.incident_edges(endpoint).count() >= limit {
                    return Err(ConnectError::ConnectionLimit {
                        node: endpoint.clone(),
                        limit,
                    });
                }
            }
        }

        let mut payload = Map::new();
        payload.insert(PROPERTY_LABEL.to_string(), Value::from(""));
        payload.insert(PROPERTY_COLOR.to_string(), Value::from(DEFAULT_STROKE.to_hex()));
        payload.insert(
            PROPERTY_LINE_STYLE.to_string(),
            Value::from(LineStyle::TargetArrow.as_str()),
        );

        let id = self.batch(|editor| {
            editor.model.push_undo();
            editor.model.add_edge_typed(
                type_tag,
                source,
                target,
                source_anchor,
                target_anchor,
                payload,
            )
        })?;
        Ok(id)
    }

    /// Move a node, snapping its top-left corner when snapping is on.
    pub fn move_node(&mut self, id: &NodeId, position: Point) -> bool {
        if !self.model.contains_node(id) {
            return false;
        }
        let position = snap_point(position, self.config.snap_to_grid, self.config.grid).point;
        self.batch(|editor| {
            editor.model.push_undo();
            editor.model.move_node(id, position)
        })
    }

    /// Resize a node. With snapping on, each side becomes a whole number of
    /// grid cells, at least one.
    pub fn resize_node(&mut self, id: &NodeId, size: Size) -> bool {
        if !self.model.contains_node(id) || !(size.width > 0.0 && size.height > 0.0) {
            return false;
        }
        let size = if self.config.snap_to_grid {
            let grid = self.config.grid;
            Size::new(
                ((size.width / grid.width).round() * grid.width).max(grid.width),
                ((size.height / grid.height).round() * grid.height).max(grid.height),
            )
        } else {
            size
        };
        self.batch(|editor| {
            editor.model.push_undo();
            editor.model.resize_node(id, size)
        })
    }

    /// Delete everything selected. Returns the number of entities removed,
    /// including edges removed along with their nodes.
    pub fn delete_selection(&mut self) -> usize {
        let nodes: Vec<NodeId> = self.selection.nodes().cloned().collect();
        let edges: Vec<EdgeId> = self.selection.edges().cloned().collect();
        if nodes.is_empty() && edges.is_empty() {
            return 0;
        }
        self.batch(|editor| {
            editor.model.push_undo();
            let mut removed = 0;
            for id in &nodes {
                removed += 1 + editor.model.delete_node(id).len();
            }
            for id in &edges {
                if editor.model.delete_edge(id) {
                    removed += 1;
                }
            }
            removed
        })
    }

    pub fn undo(&mut self) -> bool {
        self.batch(|editor| editor.model.undo())
    }

    pub fn redo(&mut self) -> bool {
        self.batch(|editor| editor.model.redo())
    }

    // --- Inspector ---

    pub fn inspect(&self) -> Option<InspectorTarget> {
        InspectorTarget::from_selection(&self.selection, &self.model)
    }

    /// Apply an inspector edit to the single selected entity.
    ///
    /// Returns `Ok(false)` when nothing suitable is selected.
    pub fn apply_edit(&mut self, edit: InspectorEdit) -> Result<bool, ReferenceError> {
        let Some(entity) = self.selection.single() else {
            return Ok(false);
        };
        let (key, value) = edit.property();
        match entity {
            EntityRef::Node(id) if edit.applies_to_node() => self.batch(|editor| {
                editor.model.push_undo();
                editor.model.update_node_payload(&id, key, value)
            })?,
            EntityRef::Edge(id) if !edit.applies_to_node() => self.batch(|editor| {
                editor.model.push_undo();
                editor.model.update_edge_payload(&id, key, value)
            })?,
            _ => return Ok(false),
        }
        Ok(true)
    }

    // --- Routing ---

    /// Route one edge around every node it does not touch.
    ///
    /// Missing anchors face the other endpoint. A self-loop without anchors
    /// leaves and re-enters on the right side.
    pub fn route_edge(&self, id: &EdgeId) -> Option<Route> {
        let edge = self.model.edge(id)?;
        let source = self.model.node(edge.source())?;
        let target = self.model.node(edge.target())?;
        let (source_default, target_default) = if source.id() == target.id() {
            (AnchorId::Right, AnchorId::Right)
        } else {
            AnchorId::facing(source.bounds(), target.bounds())
        };
        let request = RouteRequest {
            source: Port::on_node(source.bounds(), edge.source_anchor.unwrap_or(source_default)),
            target: Port::on_node(target.bounds(), edge.target_anchor.unwrap_or(target_default)),
            obstacles: self
                .model
                .nodes()
                .filter(|node| !edge.is_incident_to(node.id()))
                .map(Node::bounds)
                .collect(),
        };
        let ConnectorKind::Orthogonal { stub } = self.views.edge_view(&edge.type_tag).connector;
        let router = ConnectorRouter::new(RouterConfig {
            stub_length: stub,
            ..*self.router.config()
        });
        Some(router.route(&request))
    }

    /// Rendered label overlays of an edge, placed along its route.
    pub fn edge_labels(&self, id: &EdgeId) -> Vec<(String, Point)> {
        let (Some(edge), Some(route)) = (self.model.edge(id), self.route_edge(id)) else {
            return Vec::new();
        };
        self.views
            .edge_view(&edge.type_tag)
            .label_overlays(edge)
            .into_iter()
            .filter_map(|(text, location)| route.point_at(location).map(|point| (text, point)))
            .collect()
    }

    /// Route every edge, in insertion order.
    pub fn route_all(&self) -> Vec<(EdgeId, Route)> {
        self.model
            .edges()
            .filter_map(|edge| {
                self.route_edge(edge.id())
                    .map(|route| (edge.id().clone(), route))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::palette::DefaultPayload;
    use crate::selection::Selection;
    use crate::storage::{MemoryStorage, StorageError, block_on};
    use crate::view::{EdgeView, EventTable, NodeRecipe, NodeView};
    use std::cell::RefCell;
    use std::collections::HashSet;
    use std::rc::Rc;

    fn editor() -> Editor {
        Editor::flowchart(EditorConfig::default()).unwrap()
    }

    fn drop_at(editor: &mut Editor, x: f64, y: f64) -> NodeId {
        editor
            .drop_shape("process", Point::new(x, y), &DefaultPayload)
            .unwrap()
    }

    fn recorder(editor: &mut Editor) -> Rc<RefCell<Vec<ChangeNotice>>> {
        let notices = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&notices);
        editor.subscribe(
            move |notice: &ChangeNotice, _: &GraphModel, _: &SelectionController| {
                sink.borrow_mut().push(*notice);
            },
        );
        notices
    }

    const TWO_NODES: &str = r#"{
        "nodes": [
            {"id": "a", "type": "process", "x": 0, "y": 0, "w": 100, "h": 50, "text": "A"},
            {"id": "b", "type": "process", "x": 300, "y": 0, "w": 100, "h": 50, "text": "B"}
        ],
        "edges": [
            {"id": "e", "type": "default", "source": "a", "target": "b", "label": "go"}
        ]
    }"#;

    #[test]
    fn test_tap_selects_and_shift_accumulates() {
        let mut editor = editor();
        let a = drop_at(&mut editor, 0.0, 0.0);
        let b = drop_at(&mut editor, 300.0, 0.0);

        // Shift with nothing selected still selects only the target.
        let action = editor.dispatch(InputEvent::tap(EventTarget::Node(a.clone())).with_shift());
        assert_eq!(action, Some(Action::SelectAccumulating));
        assert_eq!(editor.selection().single(), Some(EntityRef::Node(a.clone())));

        editor.dispatch(InputEvent::tap(EventTarget::Node(b.clone())).with_shift());
        assert_eq!(
            editor.selection().selection(),
            &Selection::Nodes(HashSet::from([a.clone(), b.clone()]))
        );

        editor.dispatch(InputEvent::tap(EventTarget::Node(b.clone())));
        assert_eq!(editor.selection().single(), Some(EntityRef::Node(b)));
    }

    #[test]
    fn test_edge_click_replaces_node_selection() {
        let mut editor = editor();
        let a = drop_at(&mut editor, 0.0, 0.0);
        let b = drop_at(&mut editor, 300.0, 0.0);
        let e = editor.connect(&a, &b, None, None).unwrap();

        editor.dispatch(InputEvent::tap(EventTarget::Node(a)));
        editor.dispatch(InputEvent::click(EventTarget::Edge(e.clone())));
        assert_eq!(
            editor.selection().selection(),
            &Selection::Edges(HashSet::from([e.clone()]))
        );

        // Shift-tapping a node while edges are selected starts over.
        editor.dispatch(InputEvent::tap(EventTarget::Node(b.clone())).with_shift());
        assert_eq!(editor.selection().single(), Some(EntityRef::Node(b)));
    }

    #[test]
    fn test_prevented_edge_click_is_ignored() {
        let mut editor = editor();
        let a = drop_at(&mut editor, 0.0, 0.0);
        let b = drop_at(&mut editor, 300.0, 0.0);
        let e = editor.connect(&a, &b, None, None).unwrap();
        editor.dispatch(InputEvent::tap(EventTarget::Node(a.clone())));

        let action = editor.dispatch(InputEvent::click(EventTarget::Edge(e)).prevented());
        assert_eq!(action, None);
        assert_eq!(editor.selection().single(), Some(EntityRef::Node(a)));
    }

    #[test]
    fn test_canvas_click_clears() {
        let mut editor = editor();
        let a = drop_at(&mut editor, 0.0, 0.0);
        editor.dispatch(InputEvent::tap(EventTarget::Node(a)));
        assert_eq!(
            editor.dispatch(InputEvent::click(EventTarget::Canvas)),
            Some(Action::ClearSelection)
        );
        assert!(editor.selection().is_empty());
    }

    #[test]
    fn test_unbound_events_do_nothing() {
        let mut editor = editor();
        let a = drop_at(&mut editor, 0.0, 0.0);
        assert_eq!(
            editor.dispatch(InputEvent::new(EventTarget::Node(a), EventName::DoubleClick)),
            None
        );
        assert_eq!(
            editor.dispatch(InputEvent::tap(EventTarget::Node(NodeId::new("ghost")))),
            None
        );
        assert!(editor.selection().is_empty());
    }

    #[test]
    fn test_delete_button_removes_edge_and_selection() {
        let mut editor = editor();
        let a = drop_at(&mut editor, 0.0, 0.0);
        let b = drop_at(&mut editor, 300.0, 0.0);
        let e = editor.connect(&a, &b, None, None).unwrap();
        editor.dispatch(InputEvent::click(EventTarget::Edge(e.clone())));

        let action = editor.dispatch(InputEvent::click(EventTarget::DeleteButton(e.clone())));
        assert_eq!(action, Some(Action::DeleteEntity));
        assert!(!editor.model().contains_edge(&e));
        assert!(editor.selection().is_empty());
        assert_eq!(editor.model().node_count(), 2);

        assert!(editor.undo());
        assert!(editor.model().contains_edge(&e));
    }

    #[test]
    fn test_add_node_then_edge_selects_edge() {
        let mut editor = editor();
        let a = drop_at(&mut editor, 0.0, 0.0);
        let b = drop_at(&mut editor, 300.0, 0.0);
        let e = editor.connect(&a, &b, None, None).unwrap();

        editor.dispatch(InputEvent::tap(EventTarget::Node(a)));
        editor.dispatch(InputEvent::click(EventTarget::Edge(e.clone())).with_shift());
        assert_eq!(editor.selection().selection(), &Selection::Edges(HashSet::from([e])));
    }

    #[test]
    fn test_batch_coalesces_notifications() {
        let mut editor = editor();
        let notices = recorder(&mut editor);

        editor.batch(|editor| {
            let a = drop_at(editor, 0.0, 0.0);
            let b = drop_at(editor, 300.0, 0.0);
            editor.connect(&a, &b, None, None).unwrap();
            editor.dispatch(InputEvent::tap(EventTarget::Node(a)));
        });

        let notices = notices.borrow();
        assert_eq!(notices.len(), 1);
        assert!(notices[0].graph_changed);
        assert!(notices[0].selection_changed);
        assert_eq!(notices[0].revision, editor.model().revision());
    }

    #[test]
    fn test_no_notification_without_change() {
        let mut editor = editor();
        let notices = recorder(&mut editor);
        editor.dispatch(InputEvent::click(EventTarget::Canvas));
        assert_eq!(editor.delete_selection(), 0);
        assert!(notices.borrow().is_empty());
    }

    #[test]
    fn test_observer_sees_mutation() {
        let mut editor = editor();
        let seen = Rc::new(RefCell::new(0usize));
        let sink = Rc::clone(&seen);
        editor.subscribe(
            move |_: &ChangeNotice, model: &GraphModel, _: &SelectionController| {
                *sink.borrow_mut() = model.node_count();
            },
        );
        drop_at(&mut editor, 0.0, 0.0);
        assert_eq!(*seen.borrow(), 1);
    }

    #[test]
    fn test_drop_shape_snaps_and_sizes() {
        let mut editor = editor();
        let id = editor
            .drop_shape("decision", Point::new(33.0, 47.0), &DefaultPayload)
            .unwrap();
        let node = editor.model().node(&id).unwrap();
        assert_eq!(node.position, Point::new(40.0, 40.0));
        assert_eq!(node.size, kurbo::Size::new(120.0, 120.0));
        assert_eq!(node.type_tag.as_str(), "decision");
        assert_eq!(node.payload["outline"], "#008080");

        let err = editor
            .drop_shape("hologram", Point::ZERO, &DefaultPayload)
            .unwrap_err();
        assert_eq!(err, ReferenceError::Shape("hologram".to_string()));
        assert_eq!(editor.model().node_count(), 1);
    }

    #[test]
    fn test_drop_without_snapping() {
        let config = EditorConfig {
            snap_to_grid: false,
            ..EditorConfig::default()
        };
        let mut editor = Editor::flowchart(config).unwrap();
        let id = drop_at(&mut editor, 33.0, 47.0);
        assert_eq!(editor.model().node(&id).unwrap().position, Point::new(33.0, 47.0));
    }

    #[test]
    fn test_connect_defaults() {
        let mut editor = editor();
        let a = drop_at(&mut editor, 0.0, 0.0);
        let b = drop_at(&mut editor, 300.0, 0.0);
        let e = editor.connect(&a, &b, Some(AnchorId::Bottom), None).unwrap();
        let edge = editor.model().edge(&e).unwrap();
        assert_eq!(edge.label(), "");
        assert_eq!(edge.color(), DEFAULT_STROKE);
        assert_eq!(edge.line_style(), LineStyle::TargetArrow);
        assert_eq!(edge.source_anchor, Some(AnchorId::Bottom));

        let err = editor
            .connect(&a, &NodeId::new("ghost"), None, None)
            .unwrap_err();
        assert_eq!(err, ConnectError::Reference(ReferenceError::Node(NodeId::new("ghost"))));
    }

    #[test]
    fn test_connection_limit() {
        let limited = NodeView {
            recipe: NodeRecipe {
                shape: None,
                label_template: String::new(),
            },
            max_connections: Some(1),
            events: EventTable::new(),
        };
        let unlimited = NodeView {
            max_connections: None,
            ..limited.clone()
        };
        let edge = EdgeView {
            connector: ConnectorKind::Orthogonal { stub: 20.0 },
            label_template: None,
            outline_width: 10.0,
            overlays: Vec::new(),
            events: EventTable::new(),
        };
        let views = ViewBindings::builder()
            .node(TypeTag::DEFAULT, unlimited)
            .node("terminus", limited)
            .edge(TypeTag::DEFAULT, edge)
            .build()
            .unwrap();
        let mut editor = Editor::new(EditorConfig::default(), views).unwrap();
        let start = editor
            .drop_shape("terminus", Point::ZERO, &DefaultPayload)
            .unwrap();
        let a = drop_at(&mut editor, 200.0, 0.0);
        let b = drop_at(&mut editor, 400.0, 0.0);

        editor.connect(&start, &a, None, None).unwrap();
        let err = editor.connect(&start, &b, None, None).unwrap_err();
        assert_eq!(
            err,
            ConnectError::ConnectionLimit {
                node: start,
                limit: 1
            }
        );
        editor.connect(&a, &b, None, None).unwrap();
        assert_eq!(editor.model().edge_count(), 2);
    }

    #[test]
    fn test_load_lifecycle() {
        let mut editor = editor();
        let events = Rc::new(RefCell::new(Vec::new()));

        let sink = Rc::clone(&events);
        let first = editor.begin_load(move |event| {
            sink.borrow_mut().push(format!("first {event:?}"));
        });
        let sink = Rc::clone(&events);
        let second = editor.begin_load(move |event| {
            sink.borrow_mut().push(format!("second {event:?}"));
        });
        assert_eq!(events.borrow().as_slice(), ["first Cancelled"]);

        let stale = Dataset::from_json(r#"{"nodes": [{"id": "x", "x": 0, "y": 0, "w": 1, "h": 1}]}"#)
            .unwrap();
        assert!(matches!(
            editor.finish_load(first, Ok(stale)),
            LoadOutcome::Superseded
        ));
        assert!(editor.model().is_empty());

        let dataset = Dataset::from_json(TWO_NODES).unwrap();
        assert!(matches!(
            editor.finish_load(second, Ok(dataset)),
            LoadOutcome::Applied
        ));
        assert_eq!(editor.model().node_count(), 2);
        assert_eq!(events.borrow().last().map(String::as_str), Some("second Applied"));

        // A finished token cannot be reused.
        assert!(matches!(
            editor.finish_load(second, Ok(Dataset::default())),
            LoadOutcome::Superseded
        ));
        assert_eq!(editor.model().node_count(), 2);
    }

    #[test]
    fn test_load_clears_selection() {
        let mut editor = editor();
        let a = drop_at(&mut editor, 0.0, 0.0);
        editor.dispatch(InputEvent::tap(EventTarget::Node(a)));
        let token = editor.begin_load(|_| {});
        let outcome = editor.finish_load(token, Dataset::from_json(TWO_NODES));
        assert!(matches!(outcome, LoadOutcome::Applied));
        assert!(editor.selection().is_empty());
    }

    #[test]
    fn test_failed_load_keeps_graph() {
        let mut editor = editor();
        let a = drop_at(&mut editor, 0.0, 0.0);
        editor.dispatch(InputEvent::tap(EventTarget::Node(a.clone())));
        let notices = recorder(&mut editor);

        let failed = Rc::new(RefCell::new(false));
        let sink = Rc::clone(&failed);
        let token = editor.begin_load(move |event| {
            *sink.borrow_mut() = matches!(event, LoadEvent::Failed(LoadError::DanglingEdge { .. }));
        });
        let broken = Dataset::from_json(r#"{"edges": [{"id": "e", "source": "a", "target": "b"}]}"#);
        let outcome = editor.finish_load(token, broken);
        assert!(matches!(outcome, LoadOutcome::Failed(LoadError::DanglingEdge { .. })));
        assert!(*failed.borrow());
        assert!(editor.model().contains_node(&a));
        assert_eq!(editor.selection().single(), Some(EntityRef::Node(a)));
        assert!(notices.borrow().is_empty());
    }

    #[test]
    fn test_load_from_storage() {
        let storage = MemoryStorage::new();
        let dataset = Dataset::from_json(TWO_NODES).unwrap();
        block_on(storage.save("flow", &dataset)).unwrap();

        let mut editor = editor();
        let outcome = block_on(editor.load_from(&storage, "flow"));
        assert!(matches!(outcome, LoadOutcome::Applied));
        assert_eq!(editor.model().export(), dataset);

        let outcome = block_on(editor.load_from(&storage, "missing"));
        assert!(matches!(
            outcome,
            LoadOutcome::Failed(LoadError::Storage(StorageError::NotFound(_)))
        ));
        assert_eq!(editor.model().node_count(), 2);
    }

    #[test]
    fn test_save_to_storage() {
        let storage = MemoryStorage::new();
        let mut editor = editor();
        let a = drop_at(&mut editor, 0.0, 0.0);
        block_on(editor.save_to(&storage, "saved")).unwrap();
        let loaded = block_on(storage.load("saved")).unwrap();
        assert_eq!(loaded.nodes.len(), 1);
        assert_eq!(loaded.nodes[0].id, a);
    }

    #[test]
    fn test_export_json_round_trip() {
        let mut editor = editor();
        let token = editor.begin_load(|_| {});
        editor.finish_load(token, Dataset::from_json(TWO_NODES));
        let json = editor.export_json().unwrap();
        let original: Value = serde_json::from_str(TWO_NODES).unwrap();
        let exported: Value = serde_json::from_str(&json).unwrap();
        assert_eq!(original, exported);
    }

    #[test]
    fn test_delete_selection_cascades() {
        let mut editor = editor();
        let a = drop_at(&mut editor, 0.0, 0.0);
        let b = drop_at(&mut editor, 200.0, 0.0);
        let c = drop_at(&mut editor, 400.0, 0.0);
        editor.connect(&a, &b, None, None).unwrap();
        editor.connect(&b, &c, None, None).unwrap();

        editor.dispatch(InputEvent::tap(EventTarget::Node(b.clone())));
        assert_eq!(editor.delete_selection(), 3);
        assert!(editor.selection().is_empty());
        assert_eq!(editor.model().node_count(), 2);
        assert_eq!(editor.model().edge_count(), 0);
        assert!(editor.model().is_consistent());
    }

    #[test]
    fn test_move_node_snaps() {
        let mut editor = editor();
        let a = drop_at(&mut editor, 0.0, 0.0);
        assert!(editor.move_node(&a, Point::new(51.0, 69.0)));
        assert_eq!(editor.model().node(&a).unwrap().position, Point::new(60.0, 60.0));
        assert!(!editor.move_node(&NodeId::new("ghost"), Point::ZERO));
        assert!(editor.undo());
        assert_eq!(editor.model().node(&a).unwrap().position, Point::ZERO);
    }

    #[test]
    fn test_inspector_edits() {
        let mut editor = editor();
        let a = drop_at(&mut editor, 0.0, 0.0);
        let b = drop_at(&mut editor, 300.0, 0.0);
        let e = editor.connect(&a, &b, None, None).unwrap();

        assert!(editor.inspect().is_none());
        assert!(!editor.apply_edit(InspectorEdit::EdgeLabel("yes".into())).unwrap());

        editor.dispatch(InputEvent::click(EventTarget::Edge(e.clone())));
        assert!(matches!(editor.inspect(), Some(InspectorTarget::Edge { .. })));
        assert!(editor.apply_edit(InspectorEdit::EdgeLabel("yes".into())).unwrap());
        assert!(editor.apply_edit(InspectorEdit::EdgeLineStyle(LineStyle::Dashed)).unwrap());
        // Node edits do not apply to an edge.
        assert!(!editor.apply_edit(InspectorEdit::NodeText("x".into())).unwrap());

        let edge = editor.model().edge(&e).unwrap();
        assert_eq!(edge.label(), "yes");
        assert_eq!(edge.line_style(), LineStyle::Dashed);
        assert_eq!(
            editor.views().edge_view(&edge.type_tag).label(edge).as_deref(),
            Some("yes")
        );
    }

    #[test]
    fn test_shift_click_accumulates_edges() {
        let mut editor = editor();
        let a = drop_at(&mut editor, 0.0, 0.0);
        let b = drop_at(&mut editor, 300.0, 0.0);
        let c = drop_at(&mut editor, 300.0, 200.0);
        let e1 = editor.connect(&a, &b, None, None).unwrap();
        let e2 = editor.connect(&a, &c, None, None).unwrap();

        editor.dispatch(InputEvent::click(EventTarget::Edge(e1.clone())));
        let action = editor.dispatch(InputEvent::click(EventTarget::Edge(e2.clone())).with_shift());
        assert_eq!(action, Some(Action::SelectAccumulating));
        assert_eq!(
            editor.selection().selection(),
            &Selection::Edges(HashSet::from([e1, e2.clone()]))
        );

        // A plain click starts over.
        editor.dispatch(InputEvent::click(EventTarget::Edge(e2.clone())));
        assert_eq!(editor.selection().single(), Some(EntityRef::Edge(e2)));
    }

    #[test]
    fn test_resize_node_snaps() {
        let mut editor = editor();
        let a = drop_at(&mut editor, 0.0, 0.0);
        let before = editor.model().node(&a).unwrap().size;

        assert!(editor.resize_node(&a, Size::new(95.0, 31.0)));
        assert_eq!(editor.model().node(&a).unwrap().size, Size::new(100.0, 40.0));
        assert!(editor.resize_node(&a, Size::new(4.0, 4.0)));
        assert_eq!(editor.model().node(&a).unwrap().size, Size::new(20.0, 20.0));

        assert!(!editor.resize_node(&a, Size::new(0.0, 40.0)));
        assert!(!editor.resize_node(&NodeId::new("ghost"), Size::new(40.0, 40.0)));

        assert!(editor.undo());
        assert!(editor.undo());
        assert_eq!(editor.model().node(&a).unwrap().size, before);
    }

    #[test]
    fn test_edge_labels_follow_route() {
        let mut editor = editor();
        let token = editor.begin_load(|_| {});
        editor.finish_load(token, Dataset::from_json(TWO_NODES));

        let labels = editor.edge_labels(&EdgeId::new("e"));
        assert_eq!(labels, vec![("go".to_string(), Point::new(200.0, 25.0))]);
        assert!(editor.edge_labels(&EdgeId::new("ghost")).is_empty());
    }

    #[test]
    fn test_hit_test_follows_shape_outline() {
        let mut editor = editor();
        let d = editor
            .drop_shape("decision", Point::ZERO, &DefaultPayload)
            .unwrap();
        let bounds = editor.model().node(&d).unwrap().bounds();

        assert_eq!(editor.hit_test(bounds.center()), EventTarget::Node(d));
        // Inside the bounding box but outside the diamond.
        assert_eq!(
            editor.hit_test(Point::new(bounds.x0 + 5.0, bounds.y0 + 5.0)),
            EventTarget::Canvas
        );
    }

    #[test]
    fn test_lasso_selects_enclosed_edges() {
        let mut editor = editor();
        let token = editor.begin_load(|_| {});
        editor.finish_load(token, Dataset::from_json(TWO_NODES));

        // Touches both nodes along their sides without covering them.
        editor.lasso(Rect::new(100.0, 0.0, 300.0, 40.0));
        assert_eq!(
            editor.selection().selection(),
            &Selection::Edges(HashSet::from([EdgeId::new("e")]))
        );

        // Only part of the route.
        editor.lasso(Rect::new(150.0, 0.0, 250.0, 40.0));
        assert!(editor.selection().is_empty());

        // Any node caught wins over edges.
        editor.lasso(Rect::new(50.0, 0.0, 300.0, 40.0));
        assert_eq!(editor.selection().single(), Some(EntityRef::Node(NodeId::new("a"))));
    }

    #[test]
    fn test_lasso_selects_nodes() {
        let mut editor = editor();
        let a = drop_at(&mut editor, 0.0, 0.0);
        let b = drop_at(&mut editor, 200.0, 0.0);
        drop_at(&mut editor, 0.0, 400.0);
        editor.lasso(Rect::new(-10.0, -10.0, 400.0, 100.0));
        assert_eq!(editor.selection().selection(), &Selection::Nodes(HashSet::from([a, b])));
    }

    #[test]
    fn test_route_edge_uses_facing_anchors() {
        let mut editor = editor();
        let token = editor.begin_load(|_| {});
        editor.finish_load(token, Dataset::from_json(TWO_NODES));

        let route = editor.route_edge(&EdgeId::new("e")).unwrap();
        assert!(route.is_orthogonal());
        assert!(!route.fallback);
        assert_eq!(route.points.first(), Some(&Point::new(100.0, 25.0)));
        assert_eq!(route.points.last(), Some(&Point::new(300.0, 25.0)));
        assert_eq!(route.segment_count(), 1);

        assert!(editor.route_edge(&EdgeId::new("ghost")).is_none());
        assert_eq!(editor.route_all().len(), 1);
    }

    #[test]
    fn test_route_avoids_other_nodes() {
        let mut editor = editor();
        let token = editor.begin_load(|_| {});
        editor.finish_load(token, Dataset::from_json(TWO_NODES));
        // Drop a node between a and b.
        editor.update(|model| {
            model.add_node_with_size(
                TypeTag::new("process"),
                Point::new(180.0, -40.0),
                kurbo::Size::new(40.0, 130.0),
                Map::new(),
            )
        });
        let route = editor.route_edge(&EdgeId::new("e")).unwrap();
        assert!(!route.fallback);
        assert!(route.segment_count() > 1);
        let blocker = Rect::new(180.0, -40.0, 220.0, 90.0);
        for (a, b) in route.segments() {
            assert!(!crate::routing::segment_crosses(a, b, blocker));
        }
    }

    #[test]
    fn test_self_loop_route() {
        let mut editor = editor();
        let a = drop_at(&mut editor, 0.0, 0.0);
        let e = editor.connect(&a, &a, None, None).unwrap();
        let route = editor.route_edge(&e).unwrap();
        assert!(route.segment_count() >= 2);
        assert!(route.length() > 0.0);
    }

    #[test]
    fn test_hit_test() {
        let mut editor = editor();
        let token = editor.begin_load(|_| {});
        editor.finish_load(token, Dataset::from_json(TWO_NODES));
        assert_eq!(
            editor.hit_test(Point::new(50.0, 25.0)),
            EventTarget::Node(NodeId::new("a"))
        );
        assert_eq!(
            editor.hit_test(Point::new(200.0, 29.0)),
            EventTarget::Edge(EdgeId::new("e"))
        );
        assert_eq!(editor.hit_test(Point::new(200.0, 100.0)), EventTarget::Canvas);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = EditorConfig {
            grid: kurbo::Size::new(0.0, 20.0),
            ..EditorConfig::default()
        };
        assert!(matches!(
            Editor::flowchart(config),
            Err(ConfigurationError::InvalidValue { field: "grid", .. })
        ));
    }
}
