//! Host-facing editor: canvas, input machine, collaboration and persistence.
//!
//! Every committed local change is broadcast at once. Local and remote
//! changes mark the board dirty; [`Editor::tick`] saves it at most once per
//! save interval, and [`Editor::flush`] saves immediately. Saving never fails
//! loudly.

use crate::canvas::Canvas;
use crate::document::Change;
use crate::input::{Key, KeyInput, PointerButton, PointerInput};
use crate::interaction::{Interaction, Projection, Response};
use crate::laser::TickHandle;
use crate::session::{CollabSession, SessionEvent};
use crate::shapes::PortSide;
use crate::storage::{Persistence, StorageResult};
use crate::tools::ToolKind;
use crate::transport::{NativeTransport, Transport};
use std::time::Instant;

/// Tools a view-only participant may use.
const VIEW_TOOLS: [ToolKind; 3] = [ToolKind::Select, ToolKind::Pan, ToolKind::Laser];

pub struct Editor<T: Transport = NativeTransport> {
    pub canvas: Canvas,
    interaction: Interaction,
    session: Option<CollabSession<T>>,
    persistence: Option<Persistence>,
    dirty: bool,
    last_save: Option<Instant>,
}

impl<T: Transport> std::fmt::Debug for Editor<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Editor")
            .field("canvas", &self.canvas)
            .field("tool", &self.interaction.tool())
            .field("session", &self.session)
            .field("persistence", &self.persistence)
            .field("dirty", &self.dirty)
            .finish()
    }
}

impl<T: Transport> Editor<T> {
    pub fn new(canvas: Canvas) -> Self {
        let interaction = Interaction::with_laser_ttl(canvas.settings.laser_ttl());
        Self {
            canvas,
            interaction,
            session: None,
            persistence: None,
            dirty: false,
            last_save: None,
        }
    }

    /// Attach a save sink and load its board if one exists.
    pub fn with_persistence(mut self, persistence: Persistence) -> StorageResult<Self> {
        if let Some(state) = persistence.load()? {
            self.canvas.load(state);
        }
        self.persistence = Some(persistence);
        Ok(self)
    }

    pub fn interaction(&self) -> &Interaction {
        &self.interaction
    }

    pub fn session(&self) -> Option<&CollabSession<T>> {
        self.session.as_ref()
    }

    pub fn session_mut(&mut self) -> Option<&mut CollabSession<T>> {
        self.session.as_mut()
    }

    /// Join a room and start connecting.
    pub fn join(&mut self, mut session: CollabSession<T>, now: Instant) {
        self.leave();
        self.canvas.local_user = Some(session.identity().id.clone());
        session.connect(now);
        self.session = Some(session);
        if self.read_only() && !VIEW_TOOLS.contains(&self.interaction.tool()) {
            self.interaction.set_tool(ToolKind::Select);
        }
    }

    /// Leave the current room, if any.
    pub fn leave(&mut self) {
        if let Some(mut session) = self.session.take() {
            session.disconnect();
        }
    }

    /// Whether the local user is a view-only participant.
    pub fn read_only(&self) -> bool {
        self.session.as_ref().is_some_and(|s| !s.can_edit())
    }

    pub fn tool(&self) -> ToolKind {
        self.interaction.tool()
    }

    pub fn set_tool(&mut self, tool: ToolKind) {
        if !self.read_only() || VIEW_TOOLS.contains(&tool) {
            self.interaction.set_tool(tool);
        }
    }

    pub fn pointer_down(&mut self, input: &PointerInput) -> Response {
        if self.read_only() && self.interaction.tool() == ToolKind::Select {
            // Viewers may look around but not grab anything.
            let pan = PointerInput {
                button: PointerButton::Middle,
                ..*input
            };
            return self.interaction.pointer_down(&mut self.canvas, &pan);
        }
        let response = self.interaction.pointer_down(&mut self.canvas, input);
        self.cursor(input, true);
        self.commit(response)
    }

    pub fn pointer_move(&mut self, input: &PointerInput) -> Response {
        let response = self.interaction.pointer_move(&mut self.canvas, input);
        let pressing = !self.interaction.drag().is_none();
        self.cursor(input, pressing);
        // Live drag edits are broadcast on release.
        response
    }

    pub fn pointer_up(&mut self, input: &PointerInput) -> Response {
        let response = self.interaction.pointer_up(&mut self.canvas, input);
        self.cursor(input, false);
        self.commit(response)
    }

    pub fn key_down(&mut self, key: &KeyInput) -> Response {
        if self.read_only() {
            if let Key::Character(c) = key.key {
                if !key.modifiers.is_command() {
                    if let Some(tool) = ToolKind::from_shortcut(c) {
                        self.set_tool(tool);
                    }
                    return Response::default();
                }
            }
            if key.key != Key::Escape {
                return Response::default();
            }
        }
        let response = self.interaction.key_down(&mut self.canvas, key);
        self.commit(response)
    }

    /// Finish editing a shape label.
    pub fn commit_text(&mut self, text: &str) -> Response {
        let response = self.interaction.commit_text(&mut self.canvas, text);
        self.commit(response)
    }

    /// Clone `shape_id` beside its `side` port and connect the two.
    pub fn quick_connect(&mut self, shape_id: &str, side: PortSide) -> Vec<Change> {
        if self.read_only() {
            return Vec::new();
        }
        let changes = self.canvas.quick_connect(shape_id, side);
        self.publish(&changes);
        changes
    }

    pub fn undo(&mut self) -> Vec<Change> {
        if self.read_only() {
            return Vec::new();
        }
        let changes = self.canvas.undo();
        self.publish(&changes);
        changes
    }

    pub fn redo(&mut self) -> Vec<Change> {
        if self.read_only() {
            return Vec::new();
        }
        let changes = self.canvas.redo();
        self.publish(&changes);
        changes
    }

    pub fn laser_tick(&mut self, handle: TickHandle, now: Instant) -> Option<TickHandle> {
        self.interaction.laser_tick(handle, now)
    }

    pub fn projection(&self, now: Instant) -> Projection {
        self.interaction.projection(&self.canvas, now)
    }

    /// Run session timers and the throttled save.
    pub fn tick(&mut self, now: Instant) -> Vec<SessionEvent> {
        let events = match &mut self.session {
            Some(session) => session.tick(now),
            None => Vec::new(),
        };
        let interval = self.canvas.settings.save_interval();
        if self.dirty && self.last_save.is_none_or(|last| now.saturating_duration_since(last) >= interval) {
            self.last_save = Some(now);
            self.flush();
        }
        events
    }

    /// Whether changes are waiting to be saved.
    pub fn has_unsaved_changes(&self) -> bool {
        self.dirty
    }

    /// Save now if anything changed since the last save.
    pub fn flush(&mut self) {
        if !self.dirty {
            return;
        }
        self.dirty = false;
        if let Some(persistence) = &self.persistence {
            persistence.save_quietly(&self.canvas.document);
        }
    }

    /// Apply inbound network traffic to the document.
    pub fn poll_network(&mut self, now: Instant) -> Vec<SessionEvent> {
        let Some(session) = &mut self.session else {
            return Vec::new();
        };
        let events = session.poll(now, &mut self.canvas.document);
        let mutated = events
            .iter()
            .any(|e| matches!(e, SessionEvent::DocumentChanged(_) | SessionEvent::StateReplaced));
        if mutated {
            self.canvas.prune_selection();
            self.dirty = true;
        }
        events
    }

    fn cursor(&mut self, input: &PointerInput, pressing: bool) {
        if let Some(session) = &mut self.session {
            let world = self.canvas.viewport.screen_to_world(input.position);
            session.send_cursor(world, pressing, input.time);
        }
    }

    fn commit(&mut self, response: Response) -> Response {
        self.publish(&response.changes);
        response
    }

    fn publish(&mut self, changes: &[Change]) {
        if changes.is_empty() {
            return;
        }
        if let Some(session) = &mut self.session {
            session.broadcast(changes);
        }
        self.dirty = true;
    }
}

impl<T: Transport> Drop for Editor<T> {
    fn drop(&mut self) {
        self.flush();
    }
}
