//! InkFlow Core Library
//!
//! Geometry, document model, undo history, interaction state machine and
//! realtime collaboration for the InkFlow diagramming canvas. Rendering and
//! windowing live in the host application.

pub mod canvas;
pub mod config;
pub mod document;
pub mod editor;
pub mod geometry;
pub mod history;
pub mod ids;
pub mod input;
pub mod interaction;
pub mod laser;
pub mod protocol;
pub mod selection;
pub mod session;
pub mod shapes;
pub mod storage;
pub mod tools;
pub mod transport;
pub mod viewport;

pub use canvas::Canvas;
pub use config::{EditorSettings, SessionConfig};
pub use document::{CanvasState, Change, Element, ElementRef};
pub use editor::Editor;
pub use history::History;
pub use ids::{IdGenerator, SequentialIds, UuidIds, generate_room_id};
pub use input::{Key, KeyInput, Modifiers, PointerButton, PointerInput};
pub use interaction::{DragState, Interaction, Projection, Response};
pub use protocol::{Envelope, Identity, MessageType, Permission};
pub use selection::Selection;
pub use session::{CollabSession, CollabUser, ConnectionState, SessionEvent};
pub use storage::{FileStorage, MemoryStorage, Persistence, Storage, StorageError};
pub use tools::ToolKind;
pub use transport::{NativeTransport, Transport, TransportError};
pub use viewport::Viewport;
