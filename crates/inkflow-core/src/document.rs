//! The canvas document: shapes, connectors and freehand ink.
//!
//! [`CanvasState`] is the unit of snapshotting, persistence and full-state
//! synchronization. Every mutation that other parties need to hear about is
//! reported as a list of [`Change`]s.

use crate::geometry::{bounds_overlap, connector_route, route_distance};
use crate::ids::IdGenerator;
use crate::shapes::{
    Connector, ConnectorEnd, ElementId, FreehandPath, PortSide, Routing, Shape, ShapeKind,
};
use kurbo::{Point, Rect, Vec2};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Space left between a shape and its quick-connect sibling.
pub const QUICK_CONNECT_GAP: f64 = 80.0;

/// All persistent content of a board.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CanvasState {
    #[serde(default)]
    pub shapes: Vec<Shape>,
    #[serde(default)]
    pub connectors: Vec<Connector>,
    #[serde(default)]
    pub freehand_paths: Vec<FreehandPath>,
}

/// Any single document element.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "element", rename_all = "snake_case")]
pub enum Element {
    Shape(Shape),
    Connector(Connector),
    FreehandPath(FreehandPath),
}

impl Element {
    pub fn id(&self) -> &str {
        match self {
            Element::Shape(s) => &s.id,
            Element::Connector(c) => &c.id,
            Element::FreehandPath(f) => &f.id,
        }
    }

    pub fn to_ref(&self) -> ElementRef {
        let id = self.id().to_string();
        match self {
            Element::Shape(_) => ElementRef::Shape { id },
            Element::Connector(_) => ElementRef::Connector { id },
            Element::FreehandPath(_) => ElementRef::FreehandPath { id },
        }
    }
}

/// Reference to an element by kind and id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "element", rename_all = "snake_case")]
pub enum ElementRef {
    Shape { id: ElementId },
    Connector { id: ElementId },
    FreehandPath { id: ElementId },
}

impl ElementRef {
    pub fn id(&self) -> &str {
        match self {
            ElementRef::Shape { id } | ElementRef::Connector { id } | ElementRef::FreehandPath { id } => id,
        }
    }
}

/// A committed document mutation.
#[derive(Debug, Clone, PartialEq)]
pub enum Change {
    Added(Element),
    Updated(Element),
    Deleted(ElementRef),
}

impl CanvasState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn is_empty(&self) -> bool {
        self.shapes.is_empty() && self.connectors.is_empty() && self.freehand_paths.is_empty()
    }

    pub fn clear(&mut self) {
        self.shapes.clear();
        self.connectors.clear();
        self.freehand_paths.clear();
    }

    pub fn shape(&self, id: &str) -> Option<&Shape> {
        self.shapes.iter().find(|s| s.id == id)
    }

    pub fn shape_mut(&mut self, id: &str) -> Option<&mut Shape> {
        self.shapes.iter_mut().find(|s| s.id == id)
    }

    pub fn connector(&self, id: &str) -> Option<&Connector> {
        self.connectors.iter().find(|c| c.id == id)
    }

    pub fn connector_mut(&mut self, id: &str) -> Option<&mut Connector> {
        self.connectors.iter_mut().find(|c| c.id == id)
    }

    pub fn freehand(&self, id: &str) -> Option<&FreehandPath> {
        self.freehand_paths.iter().find(|f| f.id == id)
    }

    /// Clone of the element with `id`, whatever its kind.
    pub fn element(&self, id: &str) -> Option<Element> {
        if let Some(s) = self.shape(id) {
            return Some(Element::Shape(s.clone()));
        }
        if let Some(c) = self.connector(id) {
            return Some(Element::Connector(c.clone()));
        }
        self.freehand(id).map(|f| Element::FreehandPath(f.clone()))
    }

    /// One above the current topmost element.
    pub fn next_z_index(&self) -> i64 {
        self.z_indices().max().map_or(0, |z| z + 1)
    }

    fn z_indices(&self) -> impl Iterator<Item = i64> + '_ {
        self.shapes
            .iter()
            .map(|s| s.z_index)
            .chain(self.connectors.iter().map(|c| c.z_index))
            .chain(self.freehand_paths.iter().map(|f| f.z_index))
    }

    /// Insert `element`, replacing any element of the same kind and id.
    pub fn upsert(&mut self, element: Element) {
        fn put<T>(items: &mut Vec<T>, item: T, same: impl Fn(&T) -> bool) {
            match items.iter_mut().find(|existing| same(existing)) {
                Some(slot) => *slot = item,
                None => items.push(item),
            }
        }
        match element {
            Element::Shape(s) => {
                let id = s.id.clone();
                put(&mut self.shapes, s, |e| e.id == id);
            }
            Element::Connector(c) => {
                let id = c.id.clone();
                put(&mut self.connectors, c, |e| e.id == id);
            }
            Element::FreehandPath(f) => {
                let id = f.id.clone();
                put(&mut self.freehand_paths, f, |e| e.id == id);
            }
        }
    }

    /// Add a new element on top of everything else.
    pub fn add(&mut self, mut element: Element) -> Change {
        let z = self.next_z_index();
        match &mut element {
            Element::Shape(s) => s.z_index = z,
            Element::Connector(c) => c.z_index = z,
            Element::FreehandPath(f) => f.z_index = z,
        }
        self.upsert(element.clone());
        Change::Added(element)
    }

    /// Remove a shape and every connector bound to it.
    pub fn remove_shape(&mut self, id: &str) -> Vec<Change> {
        let Some(index) = self.shapes.iter().position(|s| s.id == id) else {
            return Vec::new();
        };
        let shape = self.shapes.remove(index);
        let mut changes = vec![Change::Deleted(ElementRef::Shape { id: shape.id })];
        self.connectors.retain(|c| {
            if c.touches(id) {
                changes.push(Change::Deleted(ElementRef::Connector { id: c.id.clone() }));
                false
            } else {
                true
            }
        });
        changes
    }

    /// Remove the referenced element. Shapes cascade to their connectors.
    pub fn remove(&mut self, element: &ElementRef) -> Vec<Change> {
        match element {
            ElementRef::Shape { id } => self.remove_shape(id),
            ElementRef::Connector { id } => {
                let before = self.connectors.len();
                self.connectors.retain(|c| &c.id != id);
                if before == self.connectors.len() {
                    Vec::new()
                } else {
                    vec![Change::Deleted(element.clone())]
                }
            }
            ElementRef::FreehandPath { id } => {
                let before = self.freehand_paths.len();
                self.freehand_paths.retain(|f| &f.id != id);
                if before == self.freehand_paths.len() {
                    Vec::new()
                } else {
                    vec![Change::Deleted(element.clone())]
                }
            }
        }
    }

    /// Delete every element whose id is in `ids`, with cascade.
    pub fn delete_ids(&mut self, ids: &[ElementId]) -> Vec<Change> {
        let mut changes = Vec::new();
        for id in ids {
            let target = if self.shape(id).is_some() {
                ElementRef::Shape { id: id.clone() }
            } else if self.connector(id).is_some() {
                ElementRef::Connector { id: id.clone() }
            } else if self.freehand(id).is_some() {
                ElementRef::FreehandPath { id: id.clone() }
            } else {
                continue;
            };
            changes.extend(self.remove(&target));
        }
        changes
    }

    /// Apply a change received from elsewhere. Updates of unknown elements insert them.
    pub fn apply(&mut self, change: &Change) {
        match change {
            Change::Added(element) | Change::Updated(element) => self.upsert(element.clone()),
            Change::Deleted(target) => {
                self.remove(target);
            }
        }
    }

    /// Shapes in paint order (lowest z first, insertion order breaks ties).
    pub fn shapes_by_z(&self) -> Vec<&Shape> {
        let mut ordered: Vec<&Shape> = self.shapes.iter().collect();
        ordered.sort_by_key(|s| s.z_index);
        ordered
    }

    /// Topmost shape containing `point`.
    pub fn shape_at_point(&self, point: Point) -> Option<&Shape> {
        self.shapes_by_z().into_iter().rev().find(|s| s.contains_point(point))
    }

    /// Topmost connector whose route passes within `tolerance` of `point`.
    pub fn connector_at_point(&self, point: Point, tolerance: f64) -> Option<&Connector> {
        let mut ordered: Vec<&Connector> = self.connectors.iter().collect();
        ordered.sort_by_key(|c| c.z_index);
        ordered.into_iter().rev().find(|c| {
            connector_route(self, c).is_some_and(|route| route_distance(&route, point) <= tolerance)
        })
    }

    /// Topmost freehand path within `tolerance` of `point`.
    pub fn freehand_at_point(&self, point: Point, tolerance: f64) -> Option<&FreehandPath> {
        let mut ordered: Vec<&FreehandPath> = self.freehand_paths.iter().collect();
        ordered.sort_by_key(|f| f.z_index);
        ordered.into_iter().rev().find(|f| f.hit_test(point, tolerance))
    }

    /// Ids of shapes whose bounds overlap `rect`.
    pub fn shapes_in_rect(&self, rect: Rect) -> Vec<ElementId> {
        self.shapes
            .iter()
            .filter(|s| bounds_overlap(s.rotated_bounds(), rect))
            .map(|s| s.id.clone())
            .collect()
    }

    /// Raise the given elements above everything else, keeping their relative order.
    pub fn bring_to_front(&mut self, ids: &[ElementId]) -> Vec<Change> {
        let start = self.next_z_index();
        self.restack(ids, start)
    }

    /// Lower the given elements beneath everything else, keeping their relative order.
    pub fn send_to_back(&mut self, ids: &[ElementId]) -> Vec<Change> {
        let min = self.z_indices().min().unwrap_or(0);
        let start = min - ids.len() as i64;
        self.restack(ids, start)
    }

    fn restack(&mut self, ids: &[ElementId], start: i64) -> Vec<Change> {
        let mut targets: Vec<(i64, ElementId)> = ids
            .iter()
            .filter_map(|id| self.element(id).map(|e| (z_of(&e), id.clone())))
            .collect();
        targets.sort_by_key(|(z, _)| *z);
        let mut changes = Vec::new();
        for (offset, (_, id)) in targets.into_iter().enumerate() {
            let z = start + offset as i64;
            if let Some(s) = self.shape_mut(&id) {
                s.z_index = z;
            } else if let Some(c) = self.connector_mut(&id) {
                c.z_index = z;
            } else if let Some(f) = self.freehand_paths.iter_mut().find(|f| f.id == id) {
                f.z_index = z;
            }
            if let Some(element) = self.element(&id) {
                changes.push(Change::Updated(element));
            }
        }
        changes
    }

    /// Changes that turn `self` into `after`.
    pub fn diff(&self, after: &CanvasState) -> Vec<Change> {
        let mut changes = Vec::new();
        diff_kind(&self.shapes, &after.shapes, |s| &s.id, Element::Shape, |id| ElementRef::Shape { id }, &mut changes);
        diff_kind(
            &self.connectors,
            &after.connectors,
            |c| &c.id,
            Element::Connector,
            |id| ElementRef::Connector { id },
            &mut changes,
        );
        diff_kind(
            &self.freehand_paths,
            &after.freehand_paths,
            |f| &f.id,
            Element::FreehandPath,
            |id| ElementRef::FreehandPath { id },
            &mut changes,
        );
        changes
    }

    /// Shapes with `ids` plus connectors among them, ready for [`Self::insert_copies`].
    ///
    /// A connector is included when it is named in `ids` or links two named
    /// shapes, and none of its bound ends points outside the set.
    pub fn collect_copies(&self, ids: &[ElementId]) -> (Vec<Shape>, Vec<Connector>) {
        let shapes: Vec<Shape> = self
            .shapes
            .iter()
            .filter(|s| ids.contains(&s.id))
            .cloned()
            .collect();
        let inside = |end: &ConnectorEnd| match end.shape_id() {
            Some(id) => shapes.iter().any(|s| s.id == id),
            None => true,
        };
        let connectors = self
            .connectors
            .iter()
            .filter(|c| {
                let linked = c.source.shape_id().is_some() && c.target.shape_id().is_some();
                (ids.contains(&c.id) || linked) && inside(&c.source) && inside(&c.target)
            })
            .cloned()
            .collect();
        (shapes, connectors)
    }

    /// Insert fresh copies of `shapes` and `connectors`, shifted by `offset`.
    ///
    /// Every copy gets a new id and new ports; connector ends are remapped
    /// onto the copied shapes. Returns the `Added` changes.
    pub fn insert_copies(
        &mut self,
        shapes: &[Shape],
        connectors: &[Connector],
        offset: Vec2,
        ids: &mut dyn IdGenerator,
    ) -> Vec<Change> {
        let mut shape_map: HashMap<&str, ElementId> = HashMap::new();
        let mut port_map: HashMap<(&str, ElementId), ElementId> = HashMap::new();
        let mut changes = Vec::new();

        let mut ordered: Vec<&Shape> = shapes.iter().collect();
        ordered.sort_by_key(|s| s.z_index);
        for source in ordered {
            let mut copy = source.clone();
            copy.id = ids.next_id("shape");
            for (old, new) in copy.regenerate_ports(ids) {
                port_map.insert((source.id.as_str(), old), new);
            }
            copy.translate(offset);
            shape_map.insert(source.id.as_str(), copy.id.clone());
            changes.push(self.add(Element::Shape(copy)));
        }

        let remap = |end: &ConnectorEnd| -> Option<ConnectorEnd> {
            match end {
                ConnectorEnd::Free(p) => Some(ConnectorEnd::Free(*p + offset)),
                ConnectorEnd::Bound { shape_id, port_id } => Some(ConnectorEnd::Bound {
                    shape_id: shape_map.get(shape_id.as_str())?.clone(),
                    port_id: port_map.get(&(shape_id.as_str(), port_id.clone()))?.clone(),
                }),
            }
        };
        let mut remapped = Vec::new();
        for source in connectors {
            let (Some(from), Some(to)) = (remap(&source.source), remap(&source.target)) else {
                continue;
            };
            let mut copy = source.clone();
            copy.id = ids.next_id("connector");
            copy.source = from;
            copy.target = to;
            copy.control_points = source.control_points.map(|[a, b]| [a + offset, b + offset]);
            remapped.push(copy);
        }
        for copy in remapped {
            changes.push(self.add(Element::Connector(copy)));
        }
        changes
    }

    /// Clone `shape_id` beside its `side` and link the two with a connector.
    pub fn quick_connect(
        &mut self,
        shape_id: &str,
        side: PortSide,
        routing: Routing,
        ids: &mut dyn IdGenerator,
    ) -> Vec<Change> {
        let Some(source) = self.shape(shape_id).cloned() else {
            return Vec::new();
        };
        let offset = match side {
            PortSide::Right => Vec2::new(source.width + QUICK_CONNECT_GAP, 0.0),
            PortSide::Left => Vec2::new(-(source.width + QUICK_CONNECT_GAP), 0.0),
            PortSide::Bottom => Vec2::new(0.0, source.height + QUICK_CONNECT_GAP),
            PortSide::Top => Vec2::new(0.0, -(source.height + QUICK_CONNECT_GAP)),
        };
        let mut sibling = source.clone();
        sibling.id = ids.next_id("shape");
        sibling.regenerate_ports(ids);
        sibling.translate(offset);
        sibling.text.clear();
        if sibling.kind == ShapeKind::Text {
            sibling.kind = ShapeKind::Rectangle;
        }

        let (Some(from_port), Some(to_port)) = (
            source.port_on_side(side).map(|p| p.id.clone()),
            sibling.port_on_side(side.opposite()).map(|p| p.id.clone()),
        ) else {
            return Vec::new();
        };
        let mut connector = Connector::new(
            ids.next_id("connector"),
            ConnectorEnd::bound(source.id.clone(), from_port),
            ConnectorEnd::bound(sibling.id.clone(), to_port),
        );
        connector.routing = routing;

        vec![
            self.add(Element::Shape(sibling)),
            self.add(Element::Connector(connector)),
        ]
    }
}

fn z_of(element: &Element) -> i64 {
    match element {
        Element::Shape(s) => s.z_index,
        Element::Connector(c) => c.z_index,
        Element::FreehandPath(f) => f.z_index,
    }
}

fn diff_kind<T: Clone + PartialEq>(
    before: &[T],
    after: &[T],
    id: impl Fn(&T) -> &ElementId,
    wrap: impl Fn(T) -> Element,
    reference: impl Fn(ElementId) -> ElementRef,
    changes: &mut Vec<Change>,
) {
    for item in after {
        match before.iter().find(|b| id(b) == id(item)) {
            None => changes.push(Change::Added(wrap(item.clone()))),
            Some(old) if old != item => changes.push(Change::Updated(wrap(item.clone()))),
            Some(_) => {}
        }
    }
    for item in before {
        if !after.iter().any(|a| id(a) == id(item)) {
            changes.push(Change::Deleted(reference(id(item).clone())));
        }
    }
}
