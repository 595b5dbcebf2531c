//! Isolated-mode selection: either nodes or edges, never both.

use crate::graph::{EdgeId, GraphModel, NodeId};
use std::collections::HashSet;

/// Reference to a selectable entity.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EntityRef {
    Node(NodeId),
    Edge(EdgeId),
}

impl EntityRef {
    pub fn is_node(&self) -> bool {
        matches!(self, EntityRef::Node(_))
    }

    pub fn is_edge(&self) -> bool {
        matches!(self, EntityRef::Edge(_))
    }
}

impl From<NodeId> for EntityRef {
    fn from(id: NodeId) -> Self {
        EntityRef::Node(id)
    }
}

impl From<EdgeId> for EntityRef {
    fn from(id: EdgeId) -> Self {
        EntityRef::Edge(id)
    }
}

/// Current selection state. The non-empty variants never hold an empty set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Selection {
    #[default]
    Empty,
    Nodes(HashSet<NodeId>),
    Edges(HashSet<EdgeId>),
}

impl Selection {
    pub fn len(&self) -> usize {
        match self {
            Selection::Empty => 0,
            Selection::Nodes(ids) => ids.len(),
            Selection::Edges(ids) => ids.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Selection::Empty)
    }

    pub fn contains(&self, entity: &EntityRef) -> bool {
        match (self, entity) {
            (Selection::Nodes(ids), EntityRef::Node(id)) => ids.contains(id),
            (Selection::Edges(ids), EntityRef::Edge(id)) => ids.contains(id),
            _ => false,
        }
    }

    fn of(entity: EntityRef) -> Self {
        match entity {
            EntityRef::Node(id) => Selection::Nodes(HashSet::from([id])),
            EntityRef::Edge(id) => Selection::Edges(HashSet::from([id])),
        }
    }

    /// Collapse emptied sets back to `Empty`.
    fn normalize(&mut self) {
        if self.len() == 0 {
            *self = Selection::Empty;
        }
    }
}

/// Selection state machine driven by tap/click events.
#[derive(Debug, Clone, Default)]
pub struct SelectionController {
    selection: Selection,
    changed: bool,
}

impl SelectionController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    /// Replace the selection with a single entity.
    pub fn select_only(&mut self, entity: EntityRef) {
        let next = Selection::of(entity);
        self.set(next);
    }

    /// Add an entity to the selection.
    ///
    /// Adding an entity of the other kind discards the current selection
    /// and selects only the new entity.
    pub fn add_to_selection(&mut self, entity: EntityRef) {
        let inserted = match (&mut self.selection, &entity) {
            (Selection::Nodes(ids), EntityRef::Node(id)) => Some(ids.insert(id.clone())),
            (Selection::Edges(ids), EntityRef::Edge(id)) => Some(ids.insert(id.clone())),
            _ => None,
        };
        match inserted {
            Some(true) => self.changed = true,
            Some(false) => {}
            None => self.select_only(entity),
        }
    }

    /// Remove one entity, if selected.
    pub fn remove(&mut self, entity: &EntityRef) {
        let removed = match (&mut self.selection, entity) {
            (Selection::Nodes(ids), EntityRef::Node(id)) => ids.remove(id),
            (Selection::Edges(ids), EntityRef::Edge(id)) => ids.remove(id),
            _ => false,
        };
        if removed {
            self.selection.normalize();
            self.changed = true;
        }
    }

    /// Replace the selection with a set of nodes (lasso result).
    pub fn select_nodes(&mut self, ids: impl IntoIterator<Item = NodeId>) {
        let mut next = Selection::Nodes(ids.into_iter().collect());
        next.normalize();
        self.set(next);
    }

    /// Replace the selection with a set of edges.
    pub fn select_edges(&mut self, ids: impl IntoIterator<Item = EdgeId>) {
        let mut next = Selection::Edges(ids.into_iter().collect());
        next.normalize();
        self.set(next);
    }

    /// Clear the selection.
    pub fn clear(&mut self) {
        self.set(Selection::Empty);
    }

    /// Drop ids that no longer exist in the model.
    pub fn retain_existing(&mut self, model: &GraphModel) {
        let before = self.selection.len();
        match &mut self.selection {
            Selection::Empty => return,
            Selection::Nodes(ids) => ids.retain(|id| model.contains_node(id)),
            Selection::Edges(ids) => ids.retain(|id| model.contains_edge(id)),
        }
        if self.selection.len() != before {
            self.selection.normalize();
            self.changed = true;
        }
    }

    pub fn is_selected(&self, entity: &EntityRef) -> bool {
        self.selection.contains(entity)
    }

    pub fn is_empty(&self) -> bool {
        self.selection.is_empty()
    }

    pub fn len(&self) -> usize {
        self.selection.len()
    }

    /// The selected entity, if exactly one is selected.
    pub fn single(&self) -> Option<EntityRef> {
        match &self.selection {
            Selection::Nodes(ids) if ids.len() == 1 => {
                ids.iter().next().cloned().map(EntityRef::Node)
            }
            Selection::Edges(ids) if ids.len() == 1 => {
                ids.iter().next().cloned().map(EntityRef::Edge)
            }
            _ => None,
        }
    }

    /// Selected node ids (empty when edges are selected).
    pub fn nodes(&self) -> impl Iterator<Item = &NodeId> {
        let ids = match &self.selection {
            Selection::Nodes(ids) => Some(ids.iter()),
            _ => None,
        };
        ids.into_iter().flatten()
    }

    /// Selected edge ids (empty when nodes are selected).
    pub fn edges(&self) -> impl Iterator<Item = &EdgeId> {
        let ids = match &self.selection {
            Selection::Edges(ids) => Some(ids.iter()),
            _ => None,
        };
        ids.into_iter().flatten()
    }

    /// Returns whether the selection changed since the last call, and resets the flag.
    pub fn take_changed(&mut self) -> bool {
        std::mem::take(&mut self.changed)
    }

    fn set(&mut self, next: Selection) {
        if self.selection != next {
            self.selection = next;
            self.changed = true;
        }
    }
}
