//! InkFlow room relay.
//!
//! Clients first call the negotiate endpoint to swap a room and user id for
//! a single-use WebSocket URL, then exchange relay frames:
//!
//! ```json
//! { "type": "join_group", "group": "abc234" }
//! { "type": "leave_group", "group": "abc234" }
//! { "type": "publish", "group": "abc234", "data": "<envelope json>" }
//! ```
//!
//! The relay forwards the `data` of each publish, verbatim, to every other
//! member of the group. It never inspects envelopes.

use axum::{
    Json, Router,
    extract::{
        Query, State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};
use dashmap::DashMap;
use futures_util::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use std::{
    collections::HashSet,
    net::SocketAddr,
    sync::Arc,
    time::{Duration, Instant},
};
use thiserror::Error;
use tokio::sync::broadcast;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{debug, info, warn};
use uuid::Uuid;

const CHANNEL_CAPACITY: usize = 256;

const DEFAULT_BIND: &str = "0.0.0.0:3030";
const DEFAULT_PUBLIC_URL: &str = "ws://localhost:3030";
const DEFAULT_TICKET_TTL_SECS: u64 = 60;

/// Relay settings, read from `INKFLOW_*` environment variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub bind: SocketAddr,
    /// Base WebSocket URL handed out by the negotiate endpoint.
    pub public_url: String,
    pub ticket_ttl: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([0, 0, 0, 0], 3030)),
            public_url: DEFAULT_PUBLIC_URL.to_string(),
            ticket_ttl: Duration::from_secs(DEFAULT_TICKET_TTL_SECS),
        }
    }
}

impl ServerConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup. Invalid values fall back to defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();

        let bind = match lookup("INKFLOW_BIND") {
            Some(raw) => raw.parse().unwrap_or_else(|e| {
                warn!("INKFLOW_BIND={:?} is invalid ({}), using {}", raw, e, DEFAULT_BIND);
                defaults.bind
            }),
            None => defaults.bind,
        };

        let public_url = lookup("INKFLOW_PUBLIC_URL")
            .map(|url| url.trim_end_matches('/').to_string())
            .filter(|url| {
                let ok = url.starts_with("ws://") || url.starts_with("wss://");
                if !ok {
                    warn!("INKFLOW_PUBLIC_URL={:?} is not a ws:// URL, using {}", url, DEFAULT_PUBLIC_URL);
                }
                ok
            })
            .unwrap_or(defaults.public_url);

        let ticket_ttl = match lookup("INKFLOW_TICKET_TTL_SECS") {
            Some(raw) => match raw.parse::<u64>() {
                Ok(secs) if secs > 0 => Duration::from_secs(secs),
                _ => {
                    warn!("INKFLOW_TICKET_TTL_SECS={:?} is invalid, using {}", raw, DEFAULT_TICKET_TTL_SECS);
                    defaults.ticket_ttl
                }
            },
            None => defaults.ticket_ttl,
        };

        Self {
            bind,
            public_url,
            ticket_ttl,
        }
    }
}

/// Errors surfaced to HTTP clients.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RelayError {
    #[error("missing query parameter {0}")]
    MissingParameter(&'static str),
    #[error("unknown or already used ticket")]
    UnknownTicket,
    #[error("ticket expired")]
    ExpiredTicket,
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        let status = match self {
            RelayError::MissingParameter(_) => StatusCode::BAD_REQUEST,
            RelayError::UnknownTicket | RelayError::ExpiredTicket => StatusCode::UNAUTHORIZED,
        };
        (status, self.to_string()).into_response()
    }
}

/// Frames a client sends on the socket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientFrame {
    JoinGroup { group: String },
    LeaveGroup { group: String },
    Publish { group: String, data: String },
}

/// A negotiated, not yet redeemed connection.
#[derive(Debug, Clone)]
struct Ticket {
    room: String,
    user: String,
    issued: Instant,
}

/// Room state
struct Room {
    /// Fan-out channel carrying (connection id, data)
    tx: broadcast::Sender<(String, String)>,
    members: HashSet<String>,
}

impl Room {
    fn new() -> Self {
        let (tx, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self {
            tx,
            members: HashSet::new(),
        }
    }
}

/// Shared application state
pub struct AppState {
    config: ServerConfig,
    tickets: DashMap<String, Ticket>,
    rooms: DashMap<String, Room>,
}

impl AppState {
    pub fn new(config: ServerConfig) -> Self {
        Self {
            config,
            tickets: DashMap::new(),
            rooms: DashMap::new(),
        }
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Issue a single-use socket URL for `user` in `room`.
    pub fn issue_ticket(&self, room: &str, user: &str) -> String {
        self.purge_expired();
        let ticket = Uuid::new_v4().simple().to_string();
        self.tickets.insert(
            ticket.clone(),
            Ticket {
                room: room.to_string(),
                user: user.to_string(),
                issued: Instant::now(),
            },
        );
        format!("{}/ws?ticket={}", self.config.public_url, ticket)
    }

    /// Consume a ticket, returning its (room, user).
    fn redeem(&self, ticket: &str) -> Result<(String, String), RelayError> {
        let (_, ticket) = self.tickets.remove(ticket).ok_or(RelayError::UnknownTicket)?;
        if ticket.issued.elapsed() > self.config.ticket_ttl {
            return Err(RelayError::ExpiredTicket);
        }
        Ok((ticket.room, ticket.user))
    }

    fn purge_expired(&self) {
        let ttl = self.config.ticket_ttl;
        self.tickets.retain(|_, t| t.issued.elapsed() <= ttl);
    }

    /// Number of live rooms.
    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    /// Add a connection to a group
    fn join_group(&self, group: &str, conn_id: &str) -> broadcast::Receiver<(String, String)> {
        let mut room = self.rooms.entry(group.to_string()).or_insert_with(Room::new);
        room.members.insert(conn_id.to_string());
        room.tx.subscribe()
    }

    /// Remove a connection from a group, dropping the room once empty
    fn leave_group(&self, group: &str, conn_id: &str) {
        if let Some(mut room) = self.rooms.get_mut(group) {
            room.members.remove(conn_id);
            if room.members.is_empty() {
                drop(room);
                self.rooms.remove_if(group, |_, room| room.members.is_empty());
            }
        }
    }

    fn publish(&self, group: &str, conn_id: &str, data: String) {
        if let Some(room) = self.rooms.get(group) {
            let _ = room.tx.send((conn_id.to_string(), data));
        }
    }
}

/// Build the relay router.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/health", get(health))
        .route("/negotiate", get(negotiate))
        .route("/ws", get(ws_handler))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Bind and serve until the process is stopped.
pub async fn serve(config: ServerConfig) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(config.bind).await?;
    info!("InkFlow relay listening on {}", listener.local_addr()?);
    info!("Public WebSocket base: {}", config.public_url);
    let state = Arc::new(AppState::new(config));
    axum::serve(listener, router(state)).await
}

/// Index page
async fn index() -> &'static str {
    "InkFlow Relay Server - negotiate at /negotiate?room=&user="
}

/// Health check
async fn health() -> &'static str {
    "ok"
}

#[derive(Debug, Deserialize)]
struct NegotiateParams {
    room: Option<String>,
    user: Option<String>,
}

#[derive(Debug, Serialize)]
struct NegotiateResponse {
    url: String,
}

async fn negotiate(
    State(state): State<Arc<AppState>>,
    Query(params): Query<NegotiateParams>,
) -> Result<Json<NegotiateResponse>, RelayError> {
    let room = params
        .room
        .filter(|r| !r.is_empty())
        .ok_or(RelayError::MissingParameter("room"))?;
    let user = params
        .user
        .filter(|u| !u.is_empty())
        .ok_or(RelayError::MissingParameter("user"))?;
    debug!("Negotiated ticket for {} in {}", user, room);
    Ok(Json(NegotiateResponse {
        url: state.issue_ticket(&room, &user),
    }))
}

#[derive(Debug, Deserialize)]
struct WsParams {
    ticket: Option<String>,
}

/// WebSocket upgrade handler
async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
    Query(params): Query<WsParams>,
) -> Result<Response, RelayError> {
    let ticket = params.ticket.ok_or(RelayError::MissingParameter("ticket"))?;
    let (room, user) = state.redeem(&ticket)?;
    Ok(ws.on_upgrade(move |socket| handle_socket(socket, state, room, user)))
}

/// Handle a WebSocket connection
async fn handle_socket(socket: WebSocket, state: Arc<AppState>, room: String, user: String) {
    let conn_id = Uuid::new_v4().to_string();
    info!("Connection {} for user {} (room {})", conn_id, user, room);

    let (mut sender, mut receiver) = socket.split();
    let mut current_group: Option<String> = None;
    let mut group_rx: Option<broadcast::Receiver<(String, String)>> = None;

    loop {
        tokio::select! {
            msg = receiver.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        match serde_json::from_str::<ClientFrame>(text.as_str()) {
                            Ok(ClientFrame::JoinGroup { group }) => {
                                if let Some(old) = current_group.take() {
                                    state.leave_group(&old, &conn_id);
                                }
                                group_rx = Some(state.join_group(&group, &conn_id));
                                info!("{} joined group {}", conn_id, group);
                                current_group = Some(group);
                            }
                            Ok(ClientFrame::LeaveGroup { group }) => {
                                if current_group.as_deref() == Some(group.as_str()) {
                                    state.leave_group(&group, &conn_id);
                                    info!("{} left group {}", conn_id, group);
                                    current_group = None;
                                    group_rx = None;
                                }
                            }
                            Ok(ClientFrame::Publish { group, data }) => {
                                if current_group.as_deref() == Some(group.as_str()) {
                                    state.publish(&group, &conn_id, data);
                                } else {
                                    debug!("{} published to {} without joining", conn_id, group);
                                }
                            }
                            Err(e) => warn!("Invalid frame from {}: {}", conn_id, e),
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        warn!("WebSocket error for {}: {}", conn_id, e);
                        break;
                    }
                }
            }

            msg = async {
                match &mut group_rx {
                    Some(rx) => loop {
                        match rx.recv().await {
                            Ok(item) => break Some(item),
                            Err(broadcast::error::RecvError::Lagged(n)) => {
                                warn!("{} lagged, skipped {} messages", conn_id, n);
                            }
                            Err(broadcast::error::RecvError::Closed) => break None,
                        }
                    },
                    None => std::future::pending::<Option<(String, String)>>().await,
                }
            } => {
                match msg {
                    Some((from, data)) => {
                        // Don't echo back to sender
                        if from != conn_id && sender.send(Message::Text(data.into())).await.is_err() {
                            break;
                        }
                    }
                    None => group_rx = None,
                }
            }
        }
    }

    if let Some(group) = current_group {
        state.leave_group(&group, &conn_id);
    }
    info!("Connection closed: {}", conn_id);
}
