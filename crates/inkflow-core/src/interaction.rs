//! Pointer and keyboard state machine.
//!
//! Exactly one [`DragState`] is active at a time. Pointer-down picks the
//! variant from the active tool, the target under the pointer and the
//! button; pointer-move updates it; pointer-up commits and always returns
//! to [`DragState::None`].
//!
//! The first document mutation of a drag pushes one undo snapshot, so a
//! whole drag is a single undo step. The render layer reads a
//! [`Projection`] instead of the raw drag state.

use crate::canvas::Canvas;
use crate::document::{CanvasState, Change, Element};
use crate::geometry::{nearest_port, port_position, simplify_points, smooth_points, snap_point};
use crate::input::{ClickTracker, Key, KeyInput, PointerButton, PointerInput};
use crate::laser::{LaserTrail, TickHandle};
use crate::selection::{HANDLE_HIT_TOLERANCE, HandleKind, ResizeHandle, apply_resize, apply_rotation, hit_test_handles};
use crate::shapes::{Connector, ConnectorEnd, ElementId, FreehandPath, Shape, ShapeKind};
use crate::tools::ToolKind;
use kurbo::{Point, Rect, Vec2};
use std::time::Instant;

/// Port hit radius in screen pixels.
pub const PORT_HIT_TOLERANCE: f64 = 8.0;

/// Connector and ink hit radius in screen pixels.
pub const STROKE_HIT_TOLERANCE: f64 = 6.0;

/// Drags shorter than this (screen pixels) count as clicks.
pub const CLICK_SLOP: f64 = 3.0;

/// Smallest create drag, per axis, that is kept as drawn.
pub const MIN_CREATE_SIZE: f64 = 10.0;

/// Chaikin passes applied to the ink preview.
const INK_PREVIEW_SMOOTHING: usize = 2;

/// What lies under the pointer.
#[derive(Debug, Clone, PartialEq)]
pub enum PointerTarget {
    Empty,
    Shape(ElementId),
    Resize(ElementId, ResizeHandle),
    Rotate(ElementId),
    Port { shape_id: ElementId, port_id: ElementId },
    Connector(ElementId),
    Freehand(ElementId),
}

/// The in-progress pointer operation.
#[derive(Debug, Clone, Default)]
pub enum DragState {
    #[default]
    None,
    Pan {
        last: Point,
    },
    Move {
        start: Point,
        originals: Vec<Element>,
        moved: bool,
    },
    Create {
        kind: ShapeKind,
        start: Point,
        current: Point,
        shape_id: Option<ElementId>,
    },
    Marquee {
        start: Point,
        current: Point,
    },
    Connector {
        source: ConnectorEnd,
        origin: Point,
        current: Point,
    },
    Resize {
        shape_id: ElementId,
        handle: ResizeHandle,
        start: Point,
        original: Shape,
    },
    Rotate {
        shape_id: ElementId,
        start: Point,
        original: Shape,
    },
    Freehand {
        points: Vec<Point>,
    },
    Laser,
}

impl DragState {
    pub fn is_none(&self) -> bool {
        matches!(self, DragState::None)
    }

    pub fn name(&self) -> &'static str {
        match self {
            DragState::None => "none",
            DragState::Pan { .. } => "pan",
            DragState::Move { .. } => "move",
            DragState::Create { .. } => "create",
            DragState::Marquee { .. } => "marquee",
            DragState::Connector { .. } => "connector",
            DragState::Resize { .. } => "resize",
            DragState::Rotate { .. } => "rotate",
            DragState::Freehand { .. } => "freehand",
            DragState::Laser => "laser",
        }
    }
}

/// What the render layer draws for the current drag.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Projection {
    pub marquee: Option<Rect>,
    /// Straight preview from the connector source to the pointer.
    pub connector_preview: Option<(Point, Point)>,
    /// Port the connector would bind to if released now.
    pub connector_snap: Option<Point>,
    pub ink_preview: Vec<Point>,
    /// Centre and current angle while rotating.
    pub rotation_guide: Option<(Point, f64)>,
    /// Laser points with their remaining opacity.
    pub laser_trail: Vec<(Point, f64)>,
}

/// Side effects the host must carry out after an input event.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Response {
    /// Committed document changes to broadcast and persist.
    pub changes: Vec<Change>,
    /// Schedule a laser frame with this handle.
    pub schedule_tick: Option<TickHandle>,
    /// Open a text editor on this shape.
    pub begin_text_edit: Option<ElementId>,
    /// Viewport, selection or preview changed; redraw.
    pub redraw: bool,
}

impl Response {
    fn redraw() -> Self {
        Self { redraw: true, ..Self::default() }
    }

    fn with_changes(changes: Vec<Change>) -> Self {
        Self { changes, redraw: true, ..Self::default() }
    }
}

/// Input state machine for one canvas.
#[derive(Debug, Default)]
pub struct Interaction {
    tool: ToolKind,
    drag: DragState,
    /// Pre-drag document, present once the drag has mutated it.
    before: Option<CanvasState>,
    clicks: ClickTracker,
    /// Shape whose label is being edited.
    editing: Option<ElementId>,
    laser: LaserTrail,
}

impl Interaction {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_laser_ttl(ttl: std::time::Duration) -> Self {
        Self {
            laser: LaserTrail::with_ttl(ttl),
            ..Self::default()
        }
    }

    pub fn tool(&self) -> ToolKind {
        self.tool
    }

    /// Switch tools. Ignored mid-drag.
    pub fn set_tool(&mut self, tool: ToolKind) {
        if self.drag.is_none() {
            self.tool = tool;
        }
    }

    pub fn drag(&self) -> &DragState {
        &self.drag
    }

    pub fn editing(&self) -> Option<&str> {
        self.editing.as_deref()
    }

    pub fn laser(&self) -> &LaserTrail {
        &self.laser
    }

    /// Advance the laser fade loop.
    pub fn laser_tick(&mut self, handle: TickHandle, now: Instant) -> Option<TickHandle> {
        self.laser.tick(handle, now)
    }

    /// Classify what lies under `world`.
    pub fn target_at(&self, canvas: &Canvas, world: Point) -> PointerTarget {
        let zoom = canvas.viewport.zoom;
        let handle_tol = HANDLE_HIT_TOLERANCE / zoom;
        for id in canvas.selection.ids() {
            let Some(shape) = canvas.document.shape(id) else {
                continue;
            };
            match hit_test_handles(shape, world, handle_tol) {
                Some(HandleKind::Rotate) => return PointerTarget::Rotate(id.clone()),
                Some(HandleKind::Resize(h)) => return PointerTarget::Resize(id.clone(), h),
                None => {}
            }
        }
        if let Some((shape_id, port_id)) = port_at(&canvas.document, world, PORT_HIT_TOLERANCE / zoom) {
            return PointerTarget::Port { shape_id, port_id };
        }
        if let Some(shape) = canvas.document.shape_at_point(world) {
            return PointerTarget::Shape(shape.id.clone());
        }
        let stroke_tol = STROKE_HIT_TOLERANCE / zoom;
        if let Some(c) = canvas.document.connector_at_point(world, stroke_tol) {
            return PointerTarget::Connector(c.id.clone());
        }
        if let Some(f) = canvas.document.freehand_at_point(world, stroke_tol) {
            return PointerTarget::Freehand(f.id.clone());
        }
        PointerTarget::Empty
    }

    pub fn pointer_down(&mut self, canvas: &mut Canvas, input: &PointerInput) -> Response {
        // A lost pointer-up leaves a stale drag. Whatever it already changed
        // is committed so peers and storage see it too.
        let stale = if self.before.is_some() {
            self.pointer_up(canvas, input).changes
        } else {
            Vec::new()
        };
        self.reset();
        let mut response = self.press(canvas, input);
        if !stale.is_empty() {
            let mut changes = stale;
            changes.append(&mut response.changes);
            response.changes = changes;
            response.redraw = true;
        }
        response
    }

    fn press(&mut self, canvas: &mut Canvas, input: &PointerInput) -> Response {
        let world = canvas.viewport.screen_to_world(input.position);

        if input.button != PointerButton::Primary {
            self.drag = DragState::Pan { last: input.position };
            return Response::default();
        }

        let mut response = Response::default();
        if let Some(editing) = self.editing.take() {
            if canvas.document.shape(&editing).is_some_and(|s| s.contains_point(world)) {
                self.editing = Some(editing);
                return response;
            }
            response.redraw = true;
        }

        let double_click = self.clicks.register(input.position, input.time);
        if double_click && self.tool == ToolKind::Select {
            return self.double_click(canvas, world);
        }

        match self.tool {
            ToolKind::Pan => {
                self.drag = DragState::Pan { last: input.position };
            }
            ToolKind::Laser => {
                self.drag = DragState::Laser;
                response.schedule_tick = self.laser.push(world, input.time);
                response.redraw = true;
            }
            ToolKind::Pen => {
                self.drag = DragState::Freehand { points: vec![world] };
            }
            ToolKind::Rectangle | ToolKind::Ellipse | ToolKind::Diamond | ToolKind::Text => {
                let Some(kind) = self.tool.creates() else {
                    return response;
                };
                let start = self.snap(canvas, world, input);
                self.drag = DragState::Create {
                    kind,
                    start,
                    current: start,
                    shape_id: None,
                };
            }
            ToolKind::Connector => {
                let (source, origin) = match self.target_at(canvas, world) {
                    PointerTarget::Port { shape_id, port_id } => {
                        let origin = bound_point(&canvas.document, &shape_id, &port_id).unwrap_or(world);
                        (ConnectorEnd::Bound { shape_id, port_id }, origin)
                    }
                    PointerTarget::Shape(id) | PointerTarget::Resize(id, _) | PointerTarget::Rotate(id) => {
                        match nearest_bound_end(&canvas.document, &id, world) {
                            Some(bound) => bound,
                            None => (ConnectorEnd::Free(world), world),
                        }
                    }
                    _ => (ConnectorEnd::Free(world), world),
                };
                self.drag = DragState::Connector {
                    source,
                    origin,
                    current: world,
                };
            }
            ToolKind::Select => {
                response.redraw = true;
                self.select_press(canvas, world, input);
            }
        }
        response
    }

    fn select_press(&mut self, canvas: &mut Canvas, world: Point, input: &PointerInput) {
        match self.target_at(canvas, world) {
            PointerTarget::Resize(shape_id, handle) => {
                if let Some(original) = canvas.document.shape(&shape_id).cloned() {
                    self.drag = DragState::Resize {
                        shape_id,
                        handle,
                        start: world,
                        original,
                    };
                }
            }
            PointerTarget::Rotate(shape_id) => {
                if let Some(original) = canvas.document.shape(&shape_id).cloned() {
                    self.drag = DragState::Rotate {
                        shape_id,
                        start: world,
                        original,
                    };
                }
            }
            PointerTarget::Port { shape_id, port_id } => {
                let origin = bound_point(&canvas.document, &shape_id, &port_id).unwrap_or(world);
                self.drag = DragState::Connector {
                    source: ConnectorEnd::Bound { shape_id, port_id },
                    origin,
                    current: world,
                };
            }
            PointerTarget::Shape(id) | PointerTarget::Freehand(id) => {
                if input.modifiers.shift {
                    canvas.selection.toggle(&id);
                } else if !canvas.selection.contains(&id) {
                    canvas.selection.set([id]);
                }
                let originals: Vec<Element> = canvas
                    .selection
                    .ids()
                    .iter()
                    .filter_map(|id| match canvas.document.element(id) {
                        Some(e @ (Element::Shape(_) | Element::FreehandPath(_))) => Some(e),
                        _ => None,
                    })
                    .collect();
                if !originals.is_empty() {
                    self.drag = DragState::Move {
                        start: world,
                        originals,
                        moved: false,
                    };
                }
            }
            PointerTarget::Connector(id) => {
                if input.modifiers.shift {
                    canvas.selection.toggle(&id);
                } else {
                    canvas.selection.set([id]);
                }
            }
            PointerTarget::Empty => {
                self.drag = DragState::Marquee {
                    start: world,
                    current: world,
                };
            }
        }
    }

    fn double_click(&mut self, canvas: &mut Canvas, world: Point) -> Response {
        if let Some(shape) = canvas.document.shape_at_point(world) {
            let id = shape.id.clone();
            canvas.selection.set([id.clone()]);
            self.editing = Some(id.clone());
            return Response {
                begin_text_edit: Some(id),
                redraw: true,
                ..Response::default()
            };
        }
        let size = ShapeKind::Text.default_size();
        let origin = world - Vec2::new(size.width / 2.0, size.height / 2.0);
        let mut shape = Shape::new(canvas.id_generator(), ShapeKind::Text, Rect::from_origin_size(origin, size));
        shape.created_by = canvas.local_user.clone();
        let id = shape.id.clone();
        canvas.push_undo();
        let change = canvas.document.add(Element::Shape(shape));
        canvas.selection.set([id.clone()]);
        self.editing = Some(id.clone());
        Response {
            changes: vec![change],
            begin_text_edit: Some(id),
            redraw: true,
            ..Response::default()
        }
    }

    pub fn pointer_move(&mut self, canvas: &mut Canvas, input: &PointerInput) -> Response {
        let world = canvas.viewport.screen_to_world(input.position);
        let mut drag = std::mem::take(&mut self.drag);
        let mut response = Response::redraw();
        match &mut drag {
            DragState::None => response.redraw = false,
            DragState::Pan { last } => {
                canvas.viewport.pan(input.position - *last);
                *last = input.position;
            }
            DragState::Move { start, originals, moved } => {
                let delta = world - *start;
                if !*moved && delta.hypot() * canvas.viewport.zoom < CLICK_SLOP {
                    response.redraw = false;
                } else {
                    *moved = true;
                    self.begin_mutation(canvas);
                    let snap = canvas.settings.snap_to_grid && !input.modifiers.bypasses_snap();
                    for original in originals.iter() {
                        translate_element(canvas, original, delta, snap);
                    }
                }
            }
            DragState::Create { kind, start, current, shape_id } => {
                *current = self.snap(canvas, world, input);
                let rect = Rect::from_points(*start, *current);
                match shape_id {
                    Some(id) => {
                        if let Some(shape) = canvas.document.shape_mut(id) {
                            shape.set_bounds(rect);
                        }
                    }
                    None if rect.width() > 0.0 || rect.height() > 0.0 => {
                        self.begin_mutation(canvas);
                        let mut shape = Shape::new(canvas.id_generator(), *kind, rect);
                        shape.created_by = canvas.local_user.clone();
                        *shape_id = Some(shape.id.clone());
                        canvas.document.add(Element::Shape(shape));
                    }
                    None => {}
                }
            }
            DragState::Marquee { current, .. } => *current = world,
            DragState::Connector { current, .. } => *current = world,
            DragState::Resize { shape_id, handle, start, original } => {
                self.begin_mutation(canvas);
                let bounds = apply_resize(original, *handle, world - *start);
                if let Some(shape) = canvas.document.shape_mut(shape_id) {
                    shape.set_bounds(bounds);
                }
            }
            DragState::Rotate { shape_id, start, original } => {
                self.begin_mutation(canvas);
                let rotation = apply_rotation(
                    original.rotation,
                    original.center(),
                    *start,
                    world,
                    input.modifiers.snaps_angle(),
                );
                if let Some(shape) = canvas.document.shape_mut(shape_id) {
                    shape.rotation = rotation;
                }
            }
            DragState::Freehand { points } => {
                if points.last() != Some(&world) {
                    points.push(world);
                }
            }
            DragState::Laser => {
                response.schedule_tick = self.laser.push(world, input.time);
            }
        }
        self.drag = drag;
        response
    }

    pub fn pointer_up(&mut self, canvas: &mut Canvas, input: &PointerInput) -> Response {
        let world = canvas.viewport.screen_to_world(input.position);
        let drag = std::mem::take(&mut self.drag);
        let mut response = Response::redraw();
        match drag {
            DragState::None => response.redraw = false,
            DragState::Pan { .. } | DragState::Laser => {}
            DragState::Move { originals, moved, .. } => {
                if moved {
                    response.changes = originals
                        .iter()
                        .filter_map(|o| canvas.document.element(o.id()))
                        .map(Change::Updated)
                        .collect();
                }
            }
            DragState::Create { kind, start, shape_id, .. } => {
                let shape_id = match shape_id {
                    Some(id) => id,
                    None => {
                        self.begin_mutation(canvas);
                        let mut shape = Shape::new(canvas.id_generator(), kind, Rect::from_origin_size(start, kind.default_size()));
                        shape.created_by = canvas.local_user.clone();
                        let id = shape.id.clone();
                        canvas.document.add(Element::Shape(shape));
                        id
                    }
                };
                if let Some(shape) = canvas.document.shape_mut(&shape_id) {
                    if shape.width < MIN_CREATE_SIZE && shape.height < MIN_CREATE_SIZE {
                        let size = kind.default_size();
                        shape.width = size.width;
                        shape.height = size.height;
                    }
                    response.changes.push(Change::Added(Element::Shape(shape.clone())));
                }
                canvas.selection.set([shape_id.clone()]);
                if kind == ShapeKind::Text {
                    self.editing = Some(shape_id.clone());
                    response.begin_text_edit = Some(shape_id);
                }
            }
            DragState::Marquee { start, .. } => {
                let rect = Rect::from_points(start, world);
                canvas.selection.set(canvas.document.shapes_in_rect(rect));
            }
            DragState::Connector { source, origin, .. } => {
                if let Some(change) = self.finish_connector(canvas, source, origin, world) {
                    response.changes.push(change);
                }
            }
            DragState::Resize { shape_id, .. } | DragState::Rotate { shape_id, .. } => {
                if self.before.is_some() {
                    if let Some(shape) = canvas.document.shape(&shape_id) {
                        response.changes.push(Change::Updated(Element::Shape(shape.clone())));
                    }
                }
            }
            DragState::Freehand { mut points } => {
                if points.last() != Some(&world) {
                    points.push(world);
                }
                let points = simplify_points(&points, canvas.settings.ink_min_distance);
                if points.len() >= 2 {
                    self.begin_mutation(canvas);
                    let id = canvas.next_id("ink");
                    response.changes.push(canvas.document.add(Element::FreehandPath(FreehandPath::new(id, points))));
                }
            }
        }
        self.reset();
        response
    }

    fn finish_connector(&mut self, canvas: &mut Canvas, source: ConnectorEnd, origin: Point, world: Point) -> Option<Change> {
        let target = match canvas.document.shape_at_point(world) {
            Some(shape) if !source.is_bound_to(&shape.id) => match nearest_port(shape, world) {
                Some(port) => ConnectorEnd::bound(shape.id.clone(), port.id.clone()),
                // Portless shapes take a loose end where the pointer landed.
                None => ConnectorEnd::Free(world),
            },
            Some(_) => return None,
            None if origin.distance(world) * canvas.viewport.zoom >= CLICK_SLOP => ConnectorEnd::Free(world),
            None => return None,
        };
        self.begin_mutation(canvas);
        let mut connector = Connector::new(canvas.next_id("connector"), source, target);
        connector.routing = canvas.settings.default_routing;
        connector.arrow_type = canvas.settings.default_arrow;
        let id = connector.id.clone();
        let change = canvas.document.add(Element::Connector(connector));
        canvas.selection.set([id]);
        Some(change)
    }

    /// Abort the active drag, putting back the elements it changed.
    pub fn cancel(&mut self, canvas: &mut Canvas) -> bool {
        if self.drag.is_none() {
            return false;
        }
        if self.before.take().is_some() {
            // Only the dragged elements are put back; remote edits made
            // during the drag stay.
            let restore = |canvas: &mut Canvas, original: &Element| {
                if canvas.document.element(original.id()).is_some() {
                    canvas.document.upsert(original.clone());
                }
            };
            match &self.drag {
                DragState::Move { originals, .. } => {
                    for original in originals {
                        restore(canvas, original);
                    }
                }
                DragState::Resize { original, .. } | DragState::Rotate { original, .. } => {
                    restore(canvas, &Element::Shape(original.clone()));
                }
                DragState::Create { shape_id: Some(id), .. } => {
                    canvas.document.remove_shape(id);
                }
                _ => {}
            }
            canvas.history.discard_last();
            canvas.prune_selection();
        }
        self.reset();
        true
    }

    /// Commit the label typed into the shape being edited.
    pub fn commit_text(&mut self, canvas: &mut Canvas, text: &str) -> Response {
        match self.editing.take() {
            Some(id) => Response::with_changes(canvas.set_shape_text(&id, text)),
            None => Response::default(),
        }
    }

    /// Tool shortcuts, clipboard and history accelerators, Escape and Delete.
    pub fn key_down(&mut self, canvas: &mut Canvas, key: &KeyInput) -> Response {
        if self.editing.is_some() && key.key != Key::Escape {
            // Keystrokes belong to the text editor.
            return Response::default();
        }
        let command = key.modifiers.is_command();
        match (&key.key, command) {
            (Key::Escape, _) => {
                if self.cancel(canvas) {
                    return Response::redraw();
                }
                if self.editing.take().is_some() {
                    return Response::redraw();
                }
                canvas.selection.clear();
                Response::redraw()
            }
            (_, _) if !self.drag.is_none() => Response::default(),
            (Key::Delete | Key::Backspace, _) => Response::with_changes(canvas.delete_selected()),
            (Key::Character('z'), true) if key.modifiers.shift => Response::with_changes(canvas.redo()),
            (Key::Character('z'), true) => Response::with_changes(canvas.undo()),
            (Key::Character('y'), true) => Response::with_changes(canvas.redo()),
            (Key::Character('c'), true) => {
                canvas.copy_selection();
                Response::default()
            }
            (Key::Character('x'), true) => {
                canvas.copy_selection();
                Response::with_changes(canvas.delete_selected())
            }
            (Key::Character('v'), true) => Response::with_changes(canvas.paste()),
            (Key::Character('d'), true) => Response::with_changes(canvas.duplicate_selected()),
            (Key::Character('a'), true) => {
                canvas.select_all();
                Response::redraw()
            }
            (Key::Character(']'), false) => Response::with_changes(canvas.bring_selection_to_front()),
            (Key::Character('['), false) => Response::with_changes(canvas.send_selection_to_back()),
            (Key::Enter, false) => {
                let [id] = canvas.selection.ids() else {
                    return Response::default();
                };
                if canvas.document.shape(id).is_none() {
                    return Response::default();
                }
                self.editing = Some(id.clone());
                Response {
                    begin_text_edit: Some(id.clone()),
                    redraw: true,
                    ..Response::default()
                }
            }
            (Key::Character(c), false) => match ToolKind::from_shortcut(*c) {
                Some(tool) => {
                    self.set_tool(tool);
                    Response::redraw()
                }
                None => Response::default(),
            },
            _ => Response::default(),
        }
    }

    /// Render-facing view of the active drag.
    pub fn projection(&self, canvas: &Canvas, now: Instant) -> Projection {
        let mut projection = Projection {
            laser_trail: self.laser.visible(now),
            ..Projection::default()
        };
        match &self.drag {
            DragState::Marquee { start, current } => {
                projection.marquee = Some(Rect::from_points(*start, *current));
            }
            DragState::Connector { origin, current, source } => {
                projection.connector_preview = Some((*origin, *current));
                projection.connector_snap = canvas
                    .document
                    .shape_at_point(*current)
                    .filter(|s| !source.is_bound_to(&s.id))
                    .and_then(|s| nearest_port(s, *current).map(|p| port_position(s, p, true)));
            }
            DragState::Freehand { points } => {
                projection.ink_preview = smooth_points(points, INK_PREVIEW_SMOOTHING);
            }
            DragState::Rotate { shape_id, original, .. } => {
                let angle = canvas.document.shape(shape_id).map_or(original.rotation, |s| s.rotation);
                projection.rotation_guide = Some((original.center(), angle));
            }
            _ => {}
        }
        projection
    }

    fn begin_mutation(&mut self, canvas: &mut Canvas) {
        if self.before.is_none() {
            let snapshot = canvas.document.clone();
            canvas.history.push(snapshot.clone());
            self.before = Some(snapshot);
        }
    }

    fn snap(&self, canvas: &Canvas, world: Point, input: &PointerInput) -> Point {
        if canvas.settings.snap_to_grid && !input.modifiers.bypasses_snap() {
            snap_point(world, canvas.settings.grid_size)
        } else {
            world
        }
    }

    fn reset(&mut self) {
        self.drag = DragState::None;
        self.before = None;
    }
}

fn port_at(doc: &CanvasState, world: Point, tolerance: f64) -> Option<(ElementId, ElementId)> {
    doc.shapes_by_z().into_iter().rev().find_map(|shape| {
        shape
            .ports
            .iter()
            .find(|p| port_position(shape, p, true).distance(world) <= tolerance)
            .map(|p| (shape.id.clone(), p.id.clone()))
    })
}

fn bound_point(doc: &CanvasState, shape_id: &str, port_id: &str) -> Option<Point> {
    let shape = doc.shape(shape_id)?;
    Some(port_position(shape, shape.port(port_id)?, true))
}

fn nearest_bound_end(doc: &CanvasState, shape_id: &str, world: Point) -> Option<(ConnectorEnd, Point)> {
    let shape = doc.shape(shape_id)?;
    let port = nearest_port(shape, world)?;
    Some((
        ConnectorEnd::bound(shape.id.clone(), port.id.clone()),
        port_position(shape, port, true),
    ))
}

fn translate_element(canvas: &mut Canvas, original: &Element, delta: Vec2, snap: bool) {
    let grid = canvas.settings.grid_size;
    match original {
        Element::Shape(o) => {
            let mut origin = Point::new(o.x, o.y) + delta;
            if snap {
                origin = snap_point(origin, grid);
            }
            if let Some(shape) = canvas.document.shape_mut(&o.id) {
                shape.x = origin.x;
                shape.y = origin.y;
            }
        }
        Element::FreehandPath(o) => {
            if let Some(path) = canvas.document.freehand_paths.iter_mut().find(|f| f.id == o.id) {
                path.points = o.points.iter().map(|p| *p + delta).collect();
            }
        }
        Element::Connector(_) => {}
    }
}
