//! Connection to the room relay.
//!
//! A [`Transport`] hides the negotiate round-trip and the socket behind a
//! non-blocking, poll-driven interface so the interaction loop never waits
//! on the network.

use serde::Deserialize;
use thiserror::Error;

/// Network failures. All of them are recoverable by reconnecting.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("negotiate failed: {0}")]
    Negotiate(String),
    #[error("connect failed: {0}")]
    Connect(String),
    #[error("connection closed")]
    Closed,
    #[error("send failed: {0}")]
    Send(String),
}

/// Something that happened on the connection since the last poll.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    Opened,
    Message(String),
    Closed,
    Error(String),
}

/// A poll-driven duplex text channel to the relay.
pub trait Transport {
    /// Start negotiating and connecting. Completion arrives as [`TransportEvent::Opened`].
    fn open(&mut self, negotiate_url: &str, room: &str, user: &str) -> Result<(), TransportError>;

    /// Queue a text frame.
    fn send(&mut self, text: String) -> Result<(), TransportError>;

    fn close(&mut self);

    /// Drain pending events without blocking.
    fn poll_events(&mut self) -> Vec<TransportEvent>;
}

/// Negotiate endpoint response body.
#[derive(Debug, Deserialize)]
struct NegotiateResponse {
    url: String,
}

/// Exchange a room and user id for a single-use socket URL.
pub fn negotiate(negotiate_url: &str, room: &str, user: &str) -> Result<String, TransportError> {
    let mut response = ureq::get(negotiate_url)
        .query("room", room)
        .query("user", user)
        .call()
        .map_err(|e| TransportError::Negotiate(e.to_string()))?;
    let body = response
        .body_mut()
        .read_to_string()
        .map_err(|e| TransportError::Negotiate(e.to_string()))?;
    let parsed: NegotiateResponse =
        serde_json::from_str(&body).map_err(|e| TransportError::Negotiate(e.to_string()))?;
    Ok(parsed.url)
}

mod native {
    use super::*;
    use std::sync::mpsc::{Receiver, Sender, TryRecvError, channel};
    use std::io::{Read, Write};
    use std::thread::{self, JoinHandle};
    use std::time::Duration;
    use tungstenite::stream::MaybeTlsStream;
    use tungstenite::{Message, WebSocket, connect};
    use url::Url;

    /// Commands sent to the socket thread.
    enum Command {
        Send(String),
        Close,
    }

    /// Socket on a background thread; commands and events cross via channels.
    #[derive(Default)]
    pub struct NativeTransport {
        cmd_tx: Option<Sender<Command>>,
        event_rx: Option<Receiver<TransportEvent>>,
        _thread: Option<JoinHandle<()>>,
    }

    impl NativeTransport {
        pub fn new() -> Self {
            Self::default()
        }
    }

    impl Transport for NativeTransport {
        fn open(&mut self, negotiate_url: &str, room: &str, user: &str) -> Result<(), TransportError> {
            if self.cmd_tx.is_some() {
                self.close();
            }
            let (cmd_tx, cmd_rx) = channel::<Command>();
            let (event_tx, event_rx) = channel::<TransportEvent>();
            let negotiate_url = negotiate_url.to_string();
            let room = room.to_string();
            let user = user.to_string();

            let handle = thread::spawn(move || {
                match run(&negotiate_url, &room, &user, &cmd_rx, &event_tx) {
                    Ok(()) => {
                        let _ = event_tx.send(TransportEvent::Closed);
                    }
                    Err(e) => {
                        log::warn!("transport: {}", e);
                        let _ = event_tx.send(TransportEvent::Error(e.to_string()));
                    }
                }
            });

            self.cmd_tx = Some(cmd_tx);
            self.event_rx = Some(event_rx);
            self._thread = Some(handle);
            Ok(())
        }

        fn send(&mut self, text: String) -> Result<(), TransportError> {
            match &self.cmd_tx {
                Some(tx) => tx.send(Command::Send(text)).map_err(|_| TransportError::Closed),
                None => Err(TransportError::Closed),
            }
        }

        fn close(&mut self) {
            if let Some(tx) = self.cmd_tx.take() {
                let _ = tx.send(Command::Close);
            }
            self.event_rx = None;
            self._thread = None;
        }

        fn poll_events(&mut self) -> Vec<TransportEvent> {
            let Some(rx) = &self.event_rx else {
                return Vec::new();
            };
            let mut events = Vec::new();
            loop {
                match rx.try_recv() {
                    Ok(event) => events.push(event),
                    Err(TryRecvError::Empty) => break,
                    Err(TryRecvError::Disconnected) => {
                        self.event_rx = None;
                        break;
                    }
                }
            }
            events
        }
    }

    impl Drop for NativeTransport {
        fn drop(&mut self) {
            self.close();
        }
    }

    /// Socket thread body. Returns `Ok` on an orderly close.
    fn run(
        negotiate_url: &str,
        room: &str,
        user: &str,
        cmd_rx: &Receiver<Command>,
        event_tx: &Sender<TransportEvent>,
    ) -> Result<(), TransportError> {
        let ws_url = socket_url(&negotiate(negotiate_url, room, user)?)?;

        log::info!("transport: connecting to {}", ws_url.host_str().unwrap_or("?"));
        let (mut socket, _) = connect(ws_url.as_str()).map_err(|e| TransportError::Connect(e.to_string()))?;
        if let MaybeTlsStream::Plain(tcp) = socket.get_mut() {
            let _ = tcp.set_read_timeout(Some(Duration::from_millis(50)));
            let _ = tcp.set_write_timeout(Some(Duration::from_secs(5)));
        }
        let _ = event_tx.send(TransportEvent::Opened);

        loop {
            if let Flow::Closed = drain_commands(&mut socket, cmd_rx)? {
                return Ok(());
            }

            match socket.read() {
                Ok(Message::Text(text)) => {
                    if event_tx.send(TransportEvent::Message(text.to_string())).is_err() {
                        return Ok(());
                    }
                }
                Ok(Message::Ping(data)) => {
                    let _ = socket.send(Message::Pong(data));
                }
                Ok(Message::Close(_)) => return Ok(()),
                Ok(_) => {}
                Err(tungstenite::Error::Io(ref e))
                    if e.kind() == std::io::ErrorKind::WouldBlock || e.kind() == std::io::ErrorKind::TimedOut => {}
                Err(tungstenite::Error::ConnectionClosed) => return Ok(()),
                Err(e) => return Err(TransportError::Connect(e.to_string())),
            }
        }
    }

    /// The socket is plain TCP only; `wss` needs a TLS-enabled build.
    fn socket_url(raw: &str) -> Result<Url, TransportError> {
        let url = Url::parse(raw).map_err(|e| TransportError::Connect(e.to_string()))?;
        match url.scheme() {
            "ws" => Ok(url),
            other => Err(TransportError::Connect(format!("unsupported scheme {}", other))),
        }
    }

    enum Flow {
        Continue,
        Closed,
    }

    /// Write every queued command, then flush once.
    fn drain_commands<S: Read + Write>(
        socket: &mut WebSocket<S>,
        cmd_rx: &Receiver<Command>,
    ) -> Result<Flow, TransportError> {
        let mut wrote = false;
        loop {
            match cmd_rx.try_recv() {
                Ok(Command::Send(text)) => {
                    socket
                        .write(Message::Text(text))
                        .map_err(|e| TransportError::Send(e.to_string()))?;
                    wrote = true;
                }
                Ok(Command::Close) | Err(TryRecvError::Disconnected) => {
                    let _ = socket.close(None);
                    return Ok(Flow::Closed);
                }
                Err(TryRecvError::Empty) => break,
            }
        }
        if wrote {
            socket.flush().map_err(|e| TransportError::Send(e.to_string()))?;
        }
        Ok(Flow::Continue)
    }

}

pub use native::NativeTransport;

#[cfg(test)]
pub(crate) mod mock {
    use super::*;
    use std::collections::VecDeque;

    /// Scripted transport: records what was sent, replays queued events.
    #[derive(Debug, Default)]
    pub struct MockTransport {
        pub opens: Vec<(String, String, String)>,
        pub sent: Vec<String>,
        pub closed: usize,
        pub fail_open: bool,
        pub fail_send: bool,
        pub incoming: VecDeque<TransportEvent>,
    }

    impl MockTransport {
        pub fn push(&mut self, event: TransportEvent) {
            self.incoming.push_back(event);
        }

        pub fn take_sent(&mut self) -> Vec<String> {
            std::mem::take(&mut self.sent)
        }
    }

    impl Transport for MockTransport {
        fn open(&mut self, negotiate_url: &str, room: &str, user: &str) -> Result<(), TransportError> {
            self.opens.push((negotiate_url.into(), room.into(), user.into()));
            if self.fail_open {
                return Err(TransportError::Negotiate("scripted failure".into()));
            }
            Ok(())
        }

        fn send(&mut self, text: String) -> Result<(), TransportError> {
            if self.fail_send {
                return Err(TransportError::Closed);
            }
            self.sent.push(text);
            Ok(())
        }

        fn close(&mut self) {
            self.closed += 1;
        }

        fn poll_events(&mut self) -> Vec<TransportEvent> {
            self.incoming.drain(..).collect()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_negotiate_unreachable_is_negotiate_error() {
        let err = negotiate("http://127.0.0.1:1/negotiate", "abc234", "u-1").unwrap_err();
        assert!(matches!(err, TransportError::Negotiate(_)));
    }

    #[test]
    fn test_native_transport_reports_failure_as_event() {
        let mut transport = NativeTransport::new();
        transport.open("http://127.0.0.1:1/negotiate", "abc234", "u-1").unwrap();
        let mut events = Vec::new();
        for _ in 0..200 {
            events.extend(transport.poll_events());
            if !events.is_empty() {
                break;
            }
            std::thread::sleep(std::time::Duration::from_millis(10));
        }
        assert!(matches!(events.first(), Some(TransportEvent::Error(_))));
    }

    #[test]
    fn test_send_without_open_is_closed() {
        let mut transport = NativeTransport::new();
        assert_eq!(transport.send("x".into()), Err(TransportError::Closed));
        assert!(transport.poll_events().is_empty());
    }
}
