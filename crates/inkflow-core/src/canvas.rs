//! Local editing state wrapped around the document.

use crate::config::EditorSettings;
use crate::document::{CanvasState, Change, Element};
use crate::history::History;
use crate::ids::{IdGenerator, UuidIds};
use crate::selection::Selection;
use crate::shapes::{Connector, ElementId, PortSide, Shape};
use crate::viewport::Viewport;
use kurbo::Vec2;

/// Copied shapes and the connectors among them.
#[derive(Debug, Clone, Default)]
pub struct Clipboard {
    shapes: Vec<Shape>,
    connectors: Vec<Connector>,
    pastes: u32,
}

impl Clipboard {
    pub fn is_empty(&self) -> bool {
        self.shapes.is_empty() && self.connectors.is_empty()
    }
}

/// The document plus everything one user needs to edit it.
pub struct Canvas {
    pub document: CanvasState,
    pub viewport: Viewport,
    pub selection: Selection,
    pub history: History,
    pub settings: EditorSettings,
    /// Stamped into `created_by` of new shapes.
    pub local_user: Option<String>,
    clipboard: Clipboard,
    ids: Box<dyn IdGenerator>,
}

impl Default for Canvas {
    fn default() -> Self {
        Self::new(Box::new(UuidIds))
    }
}

impl std::fmt::Debug for Canvas {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Canvas")
            .field("document", &self.document)
            .field("viewport", &self.viewport)
            .field("selection", &self.selection)
            .finish_non_exhaustive()
    }
}

impl Canvas {
    pub fn new(ids: Box<dyn IdGenerator>) -> Self {
        Self::with_settings(ids, EditorSettings::default())
    }

    pub fn with_settings(ids: Box<dyn IdGenerator>, settings: EditorSettings) -> Self {
        Self {
            document: CanvasState::default(),
            viewport: Viewport::default(),
            selection: Selection::default(),
            history: History::with_capacity(settings.undo_capacity),
            settings,
            local_user: None,
            clipboard: Clipboard::default(),
            ids,
        }
    }

    pub fn next_id(&mut self, prefix: &str) -> ElementId {
        self.ids.next_id(prefix)
    }

    pub fn id_generator(&mut self) -> &mut dyn IdGenerator {
        self.ids.as_mut()
    }

    /// Snapshot the document before a mutation.
    pub fn push_undo(&mut self) {
        self.history.push(self.document.clone());
    }

    /// Returns the changes the undo made, empty if there was nothing to undo.
    pub fn undo(&mut self) -> Vec<Change> {
        let current = self.document.clone();
        match self.history.undo(current) {
            Some(previous) => self.swap_document(previous),
            None => Vec::new(),
        }
    }

    pub fn redo(&mut self) -> Vec<Change> {
        let current = self.document.clone();
        match self.history.redo(current) {
            Some(next) => self.swap_document(next),
            None => Vec::new(),
        }
    }

    fn swap_document(&mut self, state: CanvasState) -> Vec<Change> {
        let changes = self.document.diff(&state);
        self.document = state;
        self.prune_selection();
        changes
    }

    /// Replace the whole board (load or clear). Local history is dropped.
    pub fn load(&mut self, state: CanvasState) {
        self.document = state;
        self.selection.clear();
        self.history.clear();
    }

    /// Replace the document with a state received from a peer.
    pub fn replace_document(&mut self, state: CanvasState) {
        self.document = state;
        self.prune_selection();
    }

    /// Forget selected ids that no longer exist.
    pub fn prune_selection(&mut self) {
        let doc = &self.document;
        self.selection.retain(|id| doc.element(id).is_some());
    }

    pub fn select_all(&mut self) {
        let ids = self
            .document
            .shapes
            .iter()
            .map(|s| s.id.clone())
            .chain(self.document.connectors.iter().map(|c| c.id.clone()))
            .chain(self.document.freehand_paths.iter().map(|f| f.id.clone()));
        self.selection.set(ids);
    }

    /// Delete the selection, cascading to attached connectors.
    pub fn delete_selected(&mut self) -> Vec<Change> {
        if self.selection.is_empty() {
            return Vec::new();
        }
        self.push_undo();
        let ids = self.selection.ids().to_vec();
        let changes = self.document.delete_ids(&ids);
        self.selection.clear();
        changes
    }

    pub fn copy_selection(&mut self) {
        let (shapes, connectors) = self.document.collect_copies(self.selection.ids());
        if shapes.is_empty() && connectors.is_empty() {
            return;
        }
        self.clipboard = Clipboard {
            shapes,
            connectors,
            pastes: 0,
        };
    }

    pub fn has_clipboard(&self) -> bool {
        !self.clipboard.is_empty()
    }

    /// Paste the clipboard, each paste one grid step further from the original.
    pub fn paste(&mut self) -> Vec<Change> {
        if self.clipboard.is_empty() {
            return Vec::new();
        }
        self.clipboard.pastes += 1;
        let step = self.settings.grid_size * f64::from(self.clipboard.pastes);
        let shapes = self.clipboard.shapes.clone();
        let connectors = self.clipboard.connectors.clone();
        self.insert_copies(&shapes, &connectors, Vec2::new(step, step))
    }

    /// Copy the selection in place, shifted by one grid step.
    pub fn duplicate_selected(&mut self) -> Vec<Change> {
        let (shapes, connectors) = self.document.collect_copies(self.selection.ids());
        if shapes.is_empty() && connectors.is_empty() {
            return Vec::new();
        }
        let step = self.settings.grid_size;
        self.insert_copies(&shapes, &connectors, Vec2::new(step, step))
    }

    fn insert_copies(&mut self, shapes: &[Shape], connectors: &[Connector], offset: Vec2) -> Vec<Change> {
        self.push_undo();
        let mut changes = self.document.insert_copies(shapes, connectors, offset, self.ids.as_mut());
        self.stamp_created_by(&mut changes);
        self.selection.set(changes.iter().filter_map(|c| match c {
            Change::Added(element) => Some(element.id().to_string()),
            _ => None,
        }));
        changes
    }

    /// Clone a shape beside `side` and connect the pair.
    pub fn quick_connect(&mut self, shape_id: &str, side: PortSide) -> Vec<Change> {
        if self.document.shape(shape_id).is_none() {
            return Vec::new();
        }
        self.push_undo();
        let routing = self.settings.default_routing;
        let mut changes = self.document.quick_connect(shape_id, side, routing, self.ids.as_mut());
        self.stamp_created_by(&mut changes);
        if let Some(Change::Added(sibling)) = changes.first() {
            self.selection.set([sibling.id().to_string()]);
        }
        changes
    }

    /// Mark shapes added by `changes` as made by the local user.
    fn stamp_created_by(&mut self, changes: &mut [Change]) {
        let Some(user) = &self.local_user else {
            return;
        };
        for change in changes {
            if let Change::Added(Element::Shape(shape)) = change {
                shape.created_by = Some(user.clone());
                if let Some(live) = self.document.shape_mut(&shape.id) {
                    live.created_by = Some(user.clone());
                }
            }
        }
    }

    pub fn bring_selection_to_front(&mut self) -> Vec<Change> {
        if self.selection.is_empty() {
            return Vec::new();
        }
        self.push_undo();
        let ids = self.selection.ids().to_vec();
        self.document.bring_to_front(&ids)
    }

    pub fn send_selection_to_back(&mut self) -> Vec<Change> {
        if self.selection.is_empty() {
            return Vec::new();
        }
        self.push_undo();
        let ids = self.selection.ids().to_vec();
        self.document.send_to_back(&ids)
    }

    /// Set the label of a shape as one undo step.
    pub fn set_shape_text(&mut self, shape_id: &str, text: &str) -> Vec<Change> {
        match self.document.shape(shape_id) {
            Some(shape) if shape.text != text => {}
            _ => return Vec::new(),
        }
        self.push_undo();
        let Some(shape) = self.document.shape_mut(shape_id) else {
            return Vec::new();
        };
        shape.text = text.to_string();
        vec![Change::Updated(Element::Shape(shape.clone()))]
    }
}
