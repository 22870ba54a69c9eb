//! Wire format for collaboration messages.
//!
//! Every message is an [`Envelope`] carrying the sender's identity, the room
//! and a `type`-dependent payload. Envelopes travel inside relay frames
//! ([`RelayFrame`]) that tell the relay which room group to fan them out to.

use crate::document::{CanvasState, Change, Element, ElementRef};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Inbound decode failures. Always logged and dropped.
#[derive(Error, Debug)]
pub enum ProtocolError {
    #[error("malformed message: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("unexpected payload for {0:?}")]
    UnexpectedPayload(MessageType),
}

/// Message taxonomy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageType {
    Join,
    Leave,
    Cursor,
    StateSync,
    OpAdd,
    OpUpdate,
    OpDelete,
    RequestState,
}

/// What a peer may do in a room.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Permission {
    #[default]
    Edit,
    View,
}

/// How the local user presents to peers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub id: String,
    pub name: String,
    pub colour: String,
    pub is_host: bool,
    pub permission: Permission,
}

impl Identity {
    pub fn new(id: impl Into<String>, name: impl Into<String>, colour: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            colour: colour.into(),
            is_host: false,
            permission: Permission::Edit,
        }
    }

    pub fn host(mut self) -> Self {
        self.is_host = true;
        self
    }

    pub fn with_permission(mut self, permission: Permission) -> Self {
        self.permission = permission;
        self
    }
}

/// The JSON envelope every collaboration message travels in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    #[serde(rename = "type")]
    pub kind: MessageType,
    pub sender_id: String,
    pub sender_name: String,
    pub sender_colour: String,
    pub room_id: String,
    #[serde(default)]
    pub payload: Value,
    /// Milliseconds since the Unix epoch.
    pub timestamp: u64,
}

/// Payload of `join`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JoinPayload {
    pub name: String,
    pub colour: String,
    #[serde(default)]
    pub is_host: bool,
    #[serde(default)]
    pub permission: Permission,
}

/// Payload of `cursor`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CursorPayload {
    pub x: f64,
    pub y: f64,
    #[serde(default)]
    pub pressing: bool,
}

/// Typed view of an envelope's payload.
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    Join(JoinPayload),
    Leave,
    Cursor(CursorPayload),
    StateSync(CanvasState),
    Op(Change),
    RequestState,
}

impl Message {
    pub fn kind(&self) -> MessageType {
        match self {
            Message::Join(_) => MessageType::Join,
            Message::Leave => MessageType::Leave,
            Message::Cursor(_) => MessageType::Cursor,
            Message::StateSync(_) => MessageType::StateSync,
            Message::Op(Change::Added(_)) => MessageType::OpAdd,
            Message::Op(Change::Updated(_)) => MessageType::OpUpdate,
            Message::Op(Change::Deleted(_)) => MessageType::OpDelete,
            Message::RequestState => MessageType::RequestState,
        }
    }

    fn payload(&self) -> Result<Value, serde_json::Error> {
        match self {
            Message::Join(join) => serde_json::to_value(join),
            Message::Leave | Message::RequestState => Ok(Value::Null),
            Message::Cursor(cursor) => serde_json::to_value(cursor),
            Message::StateSync(state) => serde_json::to_value(state),
            Message::Op(Change::Added(element) | Change::Updated(element)) => serde_json::to_value(element),
            Message::Op(Change::Deleted(target)) => serde_json::to_value(target),
        }
    }
}

impl Envelope {
    /// Wrap `message` for sending from `sender` into `room_id`.
    pub fn new(sender: &Identity, room_id: &str, message: &Message, timestamp: u64) -> Result<Self, ProtocolError> {
        Ok(Self {
            kind: message.kind(),
            sender_id: sender.id.clone(),
            sender_name: sender.name.clone(),
            sender_colour: sender.colour.clone(),
            room_id: room_id.to_string(),
            payload: message.payload()?,
            timestamp,
        })
    }

    pub fn from_json(json: &str) -> Result<Self, ProtocolError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> Result<String, ProtocolError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Decode the payload according to `type`.
    pub fn message(&self) -> Result<Message, ProtocolError> {
        let payload = self.payload.clone();
        let message = match self.kind {
            MessageType::Join => Message::Join(self.decode(payload)?),
            MessageType::Leave => Message::Leave,
            MessageType::Cursor => Message::Cursor(self.decode(payload)?),
            MessageType::StateSync => Message::StateSync(self.decode(payload)?),
            MessageType::OpAdd => Message::Op(Change::Added(self.decode::<Element>(payload)?)),
            MessageType::OpUpdate => Message::Op(Change::Updated(self.decode::<Element>(payload)?)),
            MessageType::OpDelete => Message::Op(Change::Deleted(self.decode::<ElementRef>(payload)?)),
            MessageType::RequestState => Message::RequestState,
        };
        Ok(message)
    }

    fn decode<T: serde::de::DeserializeOwned>(&self, payload: Value) -> Result<T, ProtocolError> {
        if payload.is_null() {
            return Err(ProtocolError::UnexpectedPayload(self.kind));
        }
        Ok(serde_json::from_value(payload)?)
    }
}

/// Frames exchanged with the relay.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RelayFrame {
    JoinGroup { group: String },
    LeaveGroup { group: String },
    Publish { group: String, data: String },
}

impl RelayFrame {
    pub fn to_json(&self) -> Result<String, ProtocolError> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Milliseconds since the Unix epoch, for envelope timestamps.
pub fn now_millis() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::SequentialIds;
    use crate::shapes::{Shape, ShapeKind};
    use kurbo::Rect;

    fn alice() -> Identity {
        Identity::new("u-alice", "Alice", "#e03131").host()
    }

    #[test]
    fn test_envelope_field_names() {
        let envelope = Envelope::new(
            &alice(),
            "abc234",
            &Message::Cursor(CursorPayload { x: 1.0, y: 2.0, pressing: false }),
            42,
        )
        .unwrap();
        let json: Value = serde_json::from_str(&envelope.to_json().unwrap()).unwrap();
        assert_eq!(json["type"], "cursor");
        assert_eq!(json["sender_id"], "u-alice");
        assert_eq!(json["sender_colour"], "#e03131");
        assert_eq!(json["room_id"], "abc234");
        assert_eq!(json["payload"]["x"], 1.0);
        assert_eq!(json["timestamp"], 42);
    }

    #[test]
    fn test_op_messages_decode() {
        let mut ids = SequentialIds::new();
        let shape = Shape::new(&mut ids, ShapeKind::Diamond, Rect::new(0.0, 0.0, 50.0, 50.0));
        let element = Element::Shape(shape);
        for change in [
            Change::Added(element.clone()),
            Change::Updated(element.clone()),
            Change::Deleted(element.to_ref()),
        ] {
            let message = Message::Op(change);
            let envelope = Envelope::new(&alice(), "r", &message, 0).unwrap();
            let decoded = Envelope::from_json(&envelope.to_json().unwrap()).unwrap();
            assert_eq!(decoded.message().unwrap(), message);
        }
    }

    #[test]
    fn test_op_type_names() {
        let json = r##"{"type":"op_delete","sender_id":"b","sender_name":"Bob","sender_colour":"#000",
            "room_id":"r","payload":{"element":"connector","id":"c-1"},"timestamp":1}"##;
        let envelope = Envelope::from_json(json).unwrap();
        assert_eq!(envelope.kind, MessageType::OpDelete);
        assert_eq!(
            envelope.message().unwrap(),
            Message::Op(Change::Deleted(ElementRef::Connector { id: "c-1".into() }))
        );
    }

    #[test]
    fn test_missing_payload_rejected() {
        let json = r##"{"type":"state_sync","sender_id":"b","sender_name":"Bob","sender_colour":"#000",
            "room_id":"r","timestamp":1}"##;
        let envelope = Envelope::from_json(json).unwrap();
        assert!(matches!(
            envelope.message(),
            Err(ProtocolError::UnexpectedPayload(MessageType::StateSync))
        ));
    }

    #[test]
    fn test_garbage_is_malformed() {
        assert!(matches!(Envelope::from_json("{not json"), Err(ProtocolError::Malformed(_))));
        assert!(Envelope::from_json(r#"{"type":"wave"}"#).is_err());
    }

    #[test]
    fn test_join_payload_defaults() {
        let join: JoinPayload = serde_json::from_str(r##"{"name":"Bob","colour":"#123456"}"##).unwrap();
        assert!(!join.is_host);
        assert_eq!(join.permission, Permission::Edit);
    }

    #[test]
    fn test_relay_frame_shape() {
        let frame = RelayFrame::Publish { group: "abc".into(), data: "{}".into() };
        assert_eq!(frame.to_json().unwrap(), r#"{"type":"publish","group":"abc","data":"{}"}"#);
        let join: RelayFrame = serde_json::from_str(r#"{"type":"join_group","group":"abc"}"#).unwrap();
        assert_eq!(join, RelayFrame::JoinGroup { group: "abc".into() });
    }
}
