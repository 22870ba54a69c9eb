//! Realtime collaboration session.
//!
//! Connection lifecycle:
//!
//! ```text
//! Disconnected -> Connecting -> Connected -> Disconnected -> (after backoff) Connecting
//! ```
//!
//! On open the session joins the room group, waits a short grace delay,
//! announces itself and (unless it is the host) asks for a full state
//! resync. Remote operations are applied straight to the caller's
//! [`CanvasState`]; concurrent edits are last-applied-wins.
//!
//! Presence is re-announced every heartbeat. Peers that stay silent past
//! the peer timeout are dropped as if they had sent `leave`.

use crate::config::SessionConfig;
use crate::document::{CanvasState, Change};
use crate::protocol::{
    CursorPayload, Envelope, Identity, JoinPayload, Message, Permission, ProtocolError, RelayFrame,
    now_millis,
};
use crate::transport::{Transport, TransportEvent};
use kurbo::Point;
use std::collections::HashMap;
use std::time::Instant;

/// Connection state, for status display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
}

/// A remote participant.
#[derive(Debug, Clone, PartialEq)]
pub struct CollabUser {
    pub id: String,
    pub name: String,
    pub colour: String,
    pub cursor: Option<Point>,
    pub pressing: bool,
    pub permission: Permission,
    pub is_host: bool,
    editing_until: Option<Instant>,
    last_seen: Instant,
}

impl CollabUser {
    fn new(id: String, now: Instant) -> Self {
        Self {
            id,
            name: String::new(),
            colour: String::new(),
            cursor: None,
            pressing: false,
            permission: Permission::Edit,
            is_host: false,
            editing_until: None,
            last_seen: now,
        }
    }

    /// Whether the user moved their cursor recently.
    pub fn is_editing(&self, now: Instant) -> bool {
        self.editing_until.is_some_and(|until| now < until)
    }
}

/// Notable things that happened while polling.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    Connected,
    Disconnected,
    UserJoined(String),
    UserLeft(String),
    CursorMoved(String),
    /// Remote operations were applied to the document.
    DocumentChanged(Vec<Change>),
    /// The document was replaced by a `state_sync`.
    StateReplaced,
}

/// One user's membership in one room.
pub struct CollabSession<T: Transport> {
    transport: T,
    config: SessionConfig,
    identity: Identity,
    room_id: String,
    state: ConnectionState,
    /// The user wants to be connected; cleared by [`CollabSession::disconnect`].
    active: bool,
    retry_at: Option<Instant>,
    announce_at: Option<Instant>,
    heartbeat_at: Option<Instant>,
    last_cursor_sent: Option<Instant>,
    pending_cursor: Option<CursorPayload>,
    roster: HashMap<String, CollabUser>,
}

impl<T: Transport> std::fmt::Debug for CollabSession<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CollabSession")
            .field("room_id", &self.room_id)
            .field("user", &self.identity.id)
            .field("state", &self.state)
            .field("peers", &self.roster.len())
            .finish_non_exhaustive()
    }
}

impl<T: Transport> CollabSession<T> {
    pub fn new(transport: T, config: SessionConfig, identity: Identity, room_id: impl Into<String>) -> Self {
        Self {
            transport,
            config,
            identity,
            room_id: room_id.into(),
            state: ConnectionState::Disconnected,
            active: false,
            retry_at: None,
            announce_at: None,
            heartbeat_at: None,
            last_cursor_sent: None,
            pending_cursor: None,
            roster: HashMap::new(),
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn is_connected(&self) -> bool {
        self.state == ConnectionState::Connected
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    pub fn room_id(&self) -> &str {
        &self.room_id
    }

    pub fn can_edit(&self) -> bool {
        self.identity.permission == Permission::Edit
    }

    pub fn roster(&self) -> impl Iterator<Item = &CollabUser> {
        self.roster.values()
    }

    pub fn user(&self, id: &str) -> Option<&CollabUser> {
        self.roster.get(id)
    }

    /// When the next reconnect attempt is due, if one is scheduled.
    pub fn retry_at(&self) -> Option<Instant> {
        self.retry_at
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// Start connecting. No-op unless disconnected.
    pub fn connect(&mut self, now: Instant) {
        self.active = true;
        if self.state != ConnectionState::Disconnected {
            return;
        }
        self.retry_at = None;
        self.state = ConnectionState::Connecting;
        log::info!("session: connecting to room {}", self.room_id);
        if let Err(e) = self
            .transport
            .open(&self.config.negotiate_url, &self.room_id, &self.identity.id)
        {
            log::warn!("session: {}", e);
            self.dropped(now);
        }
    }

    /// Leave the room and stop reconnecting.
    pub fn disconnect(&mut self) {
        self.active = false;
        self.retry_at = None;
        self.announce_at = None;
        self.heartbeat_at = None;
        if self.state == ConnectionState::Connected {
            self.send_message(&Message::Leave);
            self.send_frame(&RelayFrame::LeaveGroup { group: self.room_id.clone() });
        }
        self.transport.close();
        self.state = ConnectionState::Disconnected;
        self.roster.clear();
    }

    /// Run timers: reconnect backoff, the announce grace delay, presence
    /// heartbeats, peer expiry and the trailing cursor update.
    pub fn tick(&mut self, now: Instant) -> Vec<SessionEvent> {
        if self.retry_at.is_some_and(|at| now >= at) {
            self.retry_at = None;
            if self.active {
                self.connect(now);
            }
        }

        if self.state != ConnectionState::Connected {
            return Vec::new();
        }

        if self.announce_at.is_some_and(|at| now >= at) {
            self.announce_at = None;
            self.announce(now);
        } else if self.heartbeat_at.is_some_and(|at| now >= at) {
            self.heartbeat_at = Some(now + self.config.heartbeat());
            self.send_message(&self.presence());
        }

        if let Some(cursor) = self.pending_cursor {
            if self.cursor_window_open(now) {
                self.pending_cursor = None;
                self.last_cursor_sent = Some(now);
                self.send_message(&Message::Cursor(cursor));
            }
        }

        self.expire_peers(now)
    }

    /// Drain transport events, applying remote changes to `doc`.
    pub fn poll(&mut self, now: Instant, doc: &mut CanvasState) -> Vec<SessionEvent> {
        let mut events = Vec::new();
        for event in self.transport.poll_events() {
            match event {
                TransportEvent::Opened => {
                    log::info!("session: connected to room {}", self.room_id);
                    self.state = ConnectionState::Connected;
                    self.send_frame(&RelayFrame::JoinGroup { group: self.room_id.clone() });
                    self.announce_at = Some(now + self.config.announce_delay());
                    events.push(SessionEvent::Connected);
                }
                TransportEvent::Message(text) => match self.receive(&text, now, doc) {
                    Ok(received) => events.extend(received),
                    Err(e) => log::warn!("session: dropping message: {}", e),
                },
                TransportEvent::Closed | TransportEvent::Error(_) => {
                    if let TransportEvent::Error(e) = &event {
                        log::warn!("session: transport error: {}", e);
                    }
                    if self.state != ConnectionState::Disconnected {
                        self.dropped(now);
                        events.push(SessionEvent::Disconnected);
                    }
                }
            }
        }
        events
    }

    /// Queue a cursor update, sent at most once per throttle window.
    pub fn send_cursor(&mut self, position: Point, pressing: bool, now: Instant) {
        if self.state != ConnectionState::Connected {
            return;
        }
        let cursor = CursorPayload {
            x: position.x,
            y: position.y,
            pressing,
        };
        if self.cursor_window_open(now) {
            self.pending_cursor = None;
            self.last_cursor_sent = Some(now);
            self.send_message(&Message::Cursor(cursor));
        } else {
            self.pending_cursor = Some(cursor);
        }
    }

    /// Broadcast committed local changes.
    pub fn broadcast(&mut self, changes: &[Change]) {
        if self.state != ConnectionState::Connected || !self.can_edit() {
            return;
        }
        for change in changes {
            self.send_message(&Message::Op(change.clone()));
        }
    }

    /// Push the whole document to peers.
    pub fn send_state(&mut self, doc: &CanvasState) {
        if self.state == ConnectionState::Connected {
            self.send_message(&Message::StateSync(doc.clone()));
        }
    }

    fn cursor_window_open(&self, now: Instant) -> bool {
        self.last_cursor_sent
            .is_none_or(|last| now.saturating_duration_since(last) >= self.config.cursor_throttle())
    }

    fn presence(&self) -> Message {
        Message::Join(JoinPayload {
            name: self.identity.name.clone(),
            colour: self.identity.colour.clone(),
            is_host: self.identity.is_host,
            permission: self.identity.permission,
        })
    }

    fn announce(&mut self, now: Instant) {
        self.send_message(&self.presence());
        if !self.identity.is_host {
            self.send_message(&Message::RequestState);
        }
        self.heartbeat_at = Some(now + self.config.heartbeat());
    }

    fn expire_peers(&mut self, now: Instant) -> Vec<SessionEvent> {
        let timeout = self.config.peer_timeout();
        let stale: Vec<String> = self
            .roster
            .values()
            .filter(|user| now.saturating_duration_since(user.last_seen) > timeout)
            .map(|user| user.id.clone())
            .collect();
        for id in &stale {
            log::info!("session: {} timed out", id);
            self.roster.remove(id);
        }
        stale.into_iter().map(SessionEvent::UserLeft).collect()
    }

    fn dropped(&mut self, now: Instant) {
        self.state = ConnectionState::Disconnected;
        self.announce_at = None;
        self.heartbeat_at = None;
        self.pending_cursor = None;
        self.roster.clear();
        if self.active {
            let delay = self.config.reconnect_delay();
            log::info!("session: reconnecting in {}ms", delay.as_millis());
            self.retry_at = Some(now + delay);
        }
    }

    fn receive(&mut self, text: &str, now: Instant, doc: &mut CanvasState) -> Result<Vec<SessionEvent>, ProtocolError> {
        let envelope = Envelope::from_json(text)?;
        if envelope.sender_id == self.identity.id || envelope.room_id != self.room_id {
            return Ok(Vec::new());
        }
        let message = envelope.message()?;

        if let Message::Leave = message {
            return Ok(self
                .roster
                .remove(&envelope.sender_id)
                .map(|user| SessionEvent::UserLeft(user.id))
                .into_iter()
                .collect());
        }

        let is_new = !self.roster.contains_key(&envelope.sender_id);
        let user = self
            .roster
            .entry(envelope.sender_id.clone())
            .or_insert_with(|| CollabUser::new(envelope.sender_id.clone(), now));
        user.last_seen = now;
        user.name = envelope.sender_name.clone();
        user.colour = envelope.sender_colour.clone();
        let mut events: Vec<SessionEvent> = is_new
            .then(|| SessionEvent::UserJoined(envelope.sender_id.clone()))
            .into_iter()
            .collect();

        let event = match message {
            Message::Join(join) => {
                user.name = join.name;
                user.colour = join.colour;
                user.is_host = join.is_host;
                user.permission = join.permission;
                None
            }
            Message::Leave => None,
            Message::Cursor(cursor) => {
                user.cursor = Some(Point::new(cursor.x, cursor.y));
                user.pressing = cursor.pressing;
                user.editing_until = Some(now + self.config.editing_hold());
                Some(SessionEvent::CursorMoved(envelope.sender_id.clone()))
            }
            Message::Op(change) => {
                if user.permission == Permission::View {
                    log::debug!("session: ignoring op from view-only {}", envelope.sender_id);
                    None
                } else {
                    doc.apply(&change);
                    Some(SessionEvent::DocumentChanged(vec![change]))
                }
            }
            Message::StateSync(state) => {
                if self.identity.is_host {
                    None
                } else {
                    *doc = state;
                    Some(SessionEvent::StateReplaced)
                }
            }
            Message::RequestState => {
                if self.identity.is_host {
                    self.send_message(&Message::StateSync(doc.clone()));
                }
                None
            }
        };
        events.extend(event);
        Ok(events)
    }

    fn send_message(&mut self, message: &Message) {
        let data = match Envelope::new(&self.identity, &self.room_id, message, now_millis()).and_then(|e| e.to_json()) {
            Ok(data) => data,
            Err(e) => {
                log::error!("session: failed to encode {:?}: {}", message.kind(), e);
                return;
            }
        };
        self.send_frame(&RelayFrame::Publish {
            group: self.room_id.clone(),
            data,
        });
    }

    fn send_frame(&mut self, frame: &RelayFrame) {
        let text = match frame.to_json() {
            Ok(text) => text,
            Err(e) => {
                log::error!("session: failed to encode frame: {}", e);
                return;
            }
        };
        if let Err(e) = self.transport.send(text) {
            log::warn!("session: send failed: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Element;
    use crate::ids::SequentialIds;
    use crate::protocol::MessageType;
    use crate::shapes::{Shape, ShapeKind};
    use crate::transport::mock::MockTransport;
    use kurbo::Rect;
    use std::time::Duration;

    fn session(identity: Identity) -> CollabSession<MockTransport> {
        CollabSession::new(MockTransport::default(), SessionConfig::default(), identity, "abc234")
    }

    fn connected(identity: Identity, t0: Instant) -> CollabSession<MockTransport> {
        let mut s = session(identity);
        s.connect(t0);
        s.transport_mut().push(TransportEvent::Opened);
        s.poll(t0, &mut CanvasState::new());
        s.transport_mut().take_sent();
        s
    }

    /// Decode the envelopes published in `frames`.
    fn published(frames: &[String]) -> Vec<Envelope> {
        frames
            .iter()
            .filter_map(|f| match serde_json::from_str::<RelayFrame>(f).ok()? {
                RelayFrame::Publish { data, .. } => Envelope::from_json(&data).ok(),
                _ => None,
            })
            .collect()
    }

    fn envelope_from(sender: &Identity, message: &Message) -> String {
        Envelope::new(sender, "abc234", message, 0).unwrap().to_json().unwrap()
    }

    fn bob() -> Identity {
        Identity::new("u-bob", "Bob", "#1971c2")
    }

    fn doc_with_shape() -> CanvasState {
        let mut ids = SequentialIds::new();
        let mut doc = CanvasState::new();
        doc.add(Element::Shape(Shape::new(&mut ids, ShapeKind::Ellipse, Rect::new(0.0, 0.0, 80.0, 40.0))));
        doc
    }

    #[test]
    fn test_open_joins_group_then_announces() {
        let t0 = Instant::now();
        let mut s = session(Identity::new("u-alice", "Alice", "#000"));
        s.connect(t0);
        assert_eq!(s.state(), ConnectionState::Connecting);
        assert_eq!(s.transport().opens[0].1, "abc234");
        assert_eq!(s.transport().opens[0].2, "u-alice");

        s.transport_mut().push(TransportEvent::Opened);
        let events = s.poll(t0, &mut CanvasState::new());
        assert_eq!(events, vec![SessionEvent::Connected]);
        let sent = s.transport_mut().take_sent();
        assert_eq!(sent, vec![r#"{"type":"join_group","group":"abc234"}"#.to_string()]);

        // Nothing before the grace delay.
        s.tick(t0 + Duration::from_millis(100));
        assert!(s.transport().sent.is_empty());

        s.tick(t0 + Duration::from_millis(300));
        let kinds: Vec<_> = published(&s.transport_mut().take_sent()).iter().map(|e| e.kind).collect();
        assert_eq!(kinds, vec![MessageType::Join, MessageType::RequestState]);
    }

    #[test]
    fn test_host_does_not_request_state() {
        let t0 = Instant::now();
        let mut s = connected(Identity::new("u-h", "Host", "#000").host(), t0);
        s.tick(t0 + Duration::from_secs(1));
        let kinds: Vec<_> = published(&s.transport_mut().take_sent()).iter().map(|e| e.kind).collect();
        assert_eq!(kinds, vec![MessageType::Join]);
    }

    #[test]
    fn test_drop_schedules_single_retry() {
        let t0 = Instant::now();
        let mut s = connected(bob(), t0);
        s.transport_mut().push(TransportEvent::Error("reset".into()));
        s.transport_mut().push(TransportEvent::Closed);
        let events = s.poll(t0, &mut CanvasState::new());
        assert_eq!(events, vec![SessionEvent::Disconnected]);
        assert_eq!(s.state(), ConnectionState::Disconnected);
        assert_eq!(s.retry_at(), Some(t0 + Duration::from_secs(3)));

        s.tick(t0 + Duration::from_secs(2));
        assert_eq!(s.transport().opens.len(), 1);
        s.tick(t0 + Duration::from_secs(3));
        assert_eq!(s.transport().opens.len(), 2);
        assert_eq!(s.state(), ConnectionState::Connecting);
    }

    #[test]
    fn test_negotiate_failure_treated_as_drop() {
        let t0 = Instant::now();
        let mut s = session(bob());
        s.transport_mut().fail_open = true;
        s.connect(t0);
        assert_eq!(s.state(), ConnectionState::Disconnected);
        assert_eq!(s.retry_at(), Some(t0 + Duration::from_secs(3)));
    }

    #[test]
    fn test_disconnect_cancels_retry_and_leaves() {
        let t0 = Instant::now();
        let mut s = connected(bob(), t0);
        s.disconnect();
        let sent = s.transport_mut().take_sent();
        assert_eq!(published(&sent)[0].kind, MessageType::Leave);
        assert_eq!(sent[1], r#"{"type":"leave_group","group":"abc234"}"#);
        assert_eq!(s.transport().closed, 1);

        // A late close event does not schedule a reconnect.
        s.transport_mut().push(TransportEvent::Closed);
        s.poll(t0, &mut CanvasState::new());
        assert_eq!(s.retry_at(), None);
        s.tick(t0 + Duration::from_secs(10));
        assert_eq!(s.transport().opens.len(), 1);
    }

    #[test]
    fn test_cursor_throttle() {
        let t0 = Instant::now();
        let mut s = connected(bob(), t0);
        for i in 0..100u64 {
            s.send_cursor(Point::new(i as f64, 0.0), false, t0 + Duration::from_millis(i * 2));
        }
        assert!(s.transport().sent.len() <= 4);
        assert_eq!(s.transport().sent.len(), 4);
    }

    #[test]
    fn test_trailing_cursor_flushed_on_tick() {
        let t0 = Instant::now();
        let mut s = connected(bob(), t0);
        s.send_cursor(Point::new(1.0, 1.0), false, t0);
        s.send_cursor(Point::new(9.0, 9.0), true, t0 + Duration::from_millis(10));
        s.tick(t0 + Duration::from_millis(20));
        assert_eq!(s.transport().sent.len(), 1);
        s.tick(t0 + Duration::from_millis(60));
        let sent = published(&s.transport_mut().take_sent());
        let Ok(Message::Cursor(last)) = sent[1].message() else {
            panic!("expected cursor");
        };
        assert_eq!((last.x, last.pressing), (9.0, true));
    }

    #[test]
    fn test_heartbeat_reannounces_presence() {
        let t0 = Instant::now();
        let mut s = connected(bob(), t0);
        s.tick(t0 + Duration::from_millis(300));
        s.transport_mut().take_sent();

        s.tick(t0 + Duration::from_secs(3));
        assert!(s.transport().sent.is_empty());
        s.tick(t0 + Duration::from_millis(5400));
        let kinds: Vec<_> = published(&s.transport_mut().take_sent()).iter().map(|e| e.kind).collect();
        assert_eq!(kinds, vec![MessageType::Join]);
    }

    #[test]
    fn test_silent_peer_expires() {
        let t0 = Instant::now();
        let mut s = connected(Identity::new("u-alice", "Alice", "#000"), t0);
        let mut doc = CanvasState::new();
        let hello = envelope_from(&bob(), &Message::Cursor(CursorPayload { x: 1.0, y: 2.0, pressing: false }));

        s.transport_mut().push(TransportEvent::Message(hello.clone()));
        s.poll(t0, &mut doc);
        assert!(s.tick(t0 + Duration::from_secs(10)).is_empty());

        // Still talking: the timeout restarts.
        s.transport_mut().push(TransportEvent::Message(hello));
        s.poll(t0 + Duration::from_secs(10), &mut doc);
        assert!(s.tick(t0 + Duration::from_secs(20)).is_empty());
        assert!(s.user("u-bob").is_some());

        let events = s.tick(t0 + Duration::from_secs(26));
        assert_eq!(events, vec![SessionEvent::UserLeft("u-bob".into())]);
        assert!(s.user("u-bob").is_none());
    }

    #[test]
    fn test_remote_ops_apply_and_roster_upserts() {
        let t0 = Instant::now();
        let mut s = connected(Identity::new("u-alice", "Alice", "#000"), t0);
        let mut doc = CanvasState::new();
        let remote = doc_with_shape();
        let element = Element::Shape(remote.shapes[0].clone());

        s.transport_mut()
            .push(TransportEvent::Message(envelope_from(&bob(), &Message::Op(Change::Added(element.clone())))));
        let events = s.poll(t0, &mut doc);
        assert_eq!(events.len(), 2);
        assert_eq!(events[0], SessionEvent::UserJoined("u-bob".into()));
        assert_eq!(events[1], SessionEvent::DocumentChanged(vec![Change::Added(element.clone())]));
        assert_eq!(doc, remote);
        assert_eq!(s.user("u-bob").unwrap().name, "Bob");

        s.transport_mut()
            .push(TransportEvent::Message(envelope_from(&bob(), &Message::Op(Change::Deleted(element.to_ref())))));
        let events = s.poll(t0, &mut doc);
        assert!(matches!(events[0], SessionEvent::DocumentChanged(_)));
        assert!(doc.is_empty());
    }

    #[test]
    fn test_own_and_malformed_messages_ignored() {
        let t0 = Instant::now();
        let alice = Identity::new("u-alice", "Alice", "#000");
        let mut s = connected(alice.clone(), t0);
        let mut doc = CanvasState::new();
        let element = Element::Shape(doc_with_shape().shapes[0].clone());

        s.transport_mut().push(TransportEvent::Message("{garbage".into()));
        s.transport_mut()
            .push(TransportEvent::Message(envelope_from(&alice, &Message::Op(Change::Added(element.clone())))));
        s.transport_mut()
            .push(TransportEvent::Message(envelope_from(&bob(), &Message::Cursor(CursorPayload { x: 5.0, y: 6.0, pressing: true }))));
        let events = s.poll(t0, &mut doc);
        assert!(doc.is_empty());
        assert_eq!(
            events,
            vec![SessionEvent::UserJoined("u-bob".into()), SessionEvent::CursorMoved("u-bob".into())]
        );
        let user = s.user("u-bob").unwrap();
        assert_eq!(user.cursor, Some(Point::new(5.0, 6.0)));
        assert!(user.is_editing(t0 + Duration::from_millis(500)));
        assert!(!user.is_editing(t0 + Duration::from_millis(1500)));
    }

    #[test]
    fn test_view_only_peer_ops_ignored() {
        let t0 = Instant::now();
        let mut s = connected(Identity::new("u-alice", "Alice", "#000"), t0);
        let viewer = Identity::new("u-v", "Viewer", "#999").with_permission(Permission::View);
        let join = JoinPayload {
            name: viewer.name.clone(),
            colour: viewer.colour.clone(),
            is_host: false,
            permission: Permission::View,
        };
        let element = Element::Shape(doc_with_shape().shapes[0].clone());
        s.transport_mut().push(TransportEvent::Message(envelope_from(&viewer, &Message::Join(join))));
        s.transport_mut()
            .push(TransportEvent::Message(envelope_from(&viewer, &Message::Op(Change::Added(element)))));
        let mut doc = CanvasState::new();
        s.poll(t0, &mut doc);
        assert!(doc.is_empty());
        assert_eq!(s.user("u-v").unwrap().permission, Permission::View);
    }

    #[test]
    fn test_leave_removes_user() {
        let t0 = Instant::now();
        let mut s = connected(Identity::new("u-alice", "Alice", "#000"), t0);
        let mut doc = CanvasState::new();
        s.transport_mut()
            .push(TransportEvent::Message(envelope_from(&bob(), &Message::Cursor(CursorPayload { x: 0.0, y: 0.0, pressing: false }))));
        s.transport_mut().push(TransportEvent::Message(envelope_from(&bob(), &Message::Leave)));
        let events = s.poll(t0, &mut doc);
        assert_eq!(
            events,
            vec![
                SessionEvent::UserJoined("u-bob".into()),
                SessionEvent::CursorMoved("u-bob".into()),
                SessionEvent::UserLeft("u-bob".into()),
            ]
        );
        assert!(s.user("u-bob").is_none());
    }

    #[test]
    fn test_late_joiner_receives_host_state() {
        let t0 = Instant::now();
        let mut host = connected(Identity::new("u-host", "Host", "#000").host(), t0);
        let mut host_doc = doc_with_shape();

        let mut joiner = connected(bob(), t0);
        let mut joiner_doc = CanvasState::new();
        joiner.tick(t0 + Duration::from_secs(1));

        // Relay the joiner's announcements to the host.
        for frame in joiner.transport_mut().take_sent() {
            if let Ok(RelayFrame::Publish { data, .. }) = serde_json::from_str(&frame) {
                host.transport_mut().push(TransportEvent::Message(data));
            }
        }
        host.poll(t0, &mut host_doc);

        // Relay the host's answer back.
        let answers = host.transport_mut().take_sent();
        assert_eq!(published(&answers)[0].kind, MessageType::StateSync);
        for frame in answers {
            if let Ok(RelayFrame::Publish { data, .. }) = serde_json::from_str(&frame) {
                joiner.transport_mut().push(TransportEvent::Message(data));
            }
        }
        let events = joiner.poll(t0, &mut joiner_doc);
        assert!(events.contains(&SessionEvent::StateReplaced));
        assert_eq!(joiner_doc, host_doc);
    }

    #[test]
    fn test_broadcast_only_when_connected() {
        let t0 = Instant::now();
        let element = Element::Shape(doc_with_shape().shapes[0].clone());
        let mut s = session(bob());
        s.broadcast(&[Change::Added(element.clone())]);
        assert!(s.transport().sent.is_empty());

        let mut s = connected(bob(), t0);
        s.broadcast(&[Change::Added(element.clone()), Change::Deleted(element.to_ref())]);
        let kinds: Vec<_> = published(&s.transport_mut().take_sent()).iter().map(|e| e.kind).collect();
        assert_eq!(kinds, vec![MessageType::OpAdd, MessageType::OpDelete]);

        let mut viewer = connected(bob().with_permission(Permission::View), t0);
        viewer.broadcast(&[Change::Added(element)]);
        assert!(viewer.transport().sent.is_empty());
    }
}
