use futures_util::{SinkExt, StreamExt};
use inkflow_server::{AppState, ServerConfig, router};
use std::{net::SocketAddr, sync::Arc, time::Duration};
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async, tungstenite::Message};

type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

async fn start() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let config = ServerConfig {
        bind: addr,
        public_url: format!("ws://{}", addr),
        ..ServerConfig::default()
    };
    let app = router(Arc::new(AppState::new(config)));
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

async fn get(addr: SocketAddr, path: &str) -> (u16, String) {
    let response = reqwest::get(format!("http://{}{}", addr, path)).await.unwrap();
    let status = response.status().as_u16();
    (status, response.text().await.unwrap())
}

async fn negotiate(addr: SocketAddr, room: &str, user: &str) -> String {
    let url = format!("http://{}/negotiate?room={}&user={}", addr, room, user);
    let response = reqwest::get(url).await.unwrap();
    assert_eq!(response.status().as_u16(), 200);
    let json: serde_json::Value = response.json().await.unwrap();
    json["url"].as_str().unwrap().to_string()
}

async fn join(addr: SocketAddr, room: &str, user: &str) -> Client {
    let url = negotiate(addr, room, user).await;
    let (mut client, _) = connect_async(url.as_str()).await.unwrap();
    let frame = serde_json::json!({"type": "join_group", "group": room}).to_string();
    client.send(Message::Text(frame.into())).await.unwrap();
    client
}

async fn publish(client: &mut Client, room: &str, data: &str) {
    let frame = serde_json::json!({"type": "publish", "group": room, "data": data}).to_string();
    client.send(Message::Text(frame.into())).await.unwrap();
}

async fn next_text(client: &mut Client) -> Option<String> {
    match tokio::time::timeout(Duration::from_millis(500), client.next()).await {
        Ok(Some(Ok(Message::Text(text)))) => Some(text.to_string()),
        _ => None,
    }
}

#[tokio::test]
async fn test_health() {
    let addr = start().await;
    let (status, body) = get(addr, "/health").await;
    assert_eq!(status, 200);
    assert_eq!(body, "ok");
}

#[tokio::test]
async fn test_negotiate_requires_parameters() {
    let addr = start().await;
    let (status, _) = get(addr, "/negotiate?room=abc234").await;
    assert_eq!(status, 400);
}

#[tokio::test]
async fn test_publish_reaches_other_members_only() {
    let addr = start().await;
    let mut alice = join(addr, "abc234", "alice").await;
    let mut bob = join(addr, "abc234", "bob").await;
    let mut carol = join(addr, "zzz999", "carol").await;
    // Let the joins land before publishing.
    tokio::time::sleep(Duration::from_millis(100)).await;

    publish(&mut alice, "abc234", r#"{"type":"cursor"}"#).await;
    assert_eq!(next_text(&mut bob).await.as_deref(), Some(r#"{"type":"cursor"}"#));
    assert_eq!(next_text(&mut alice).await, None);
    assert_eq!(next_text(&mut carol).await, None);
}

#[tokio::test]
async fn test_ticket_is_single_use() {
    let addr = start().await;
    let url = negotiate(addr, "abc234", "alice").await;
    let (_first, _) = connect_async(url.as_str()).await.unwrap();
    assert!(connect_async(url.as_str()).await.is_err());
}

#[tokio::test]
async fn test_unknown_ticket_rejected() {
    let addr = start().await;
    let url = format!("ws://{}/ws?ticket=nope", addr);
    let err = connect_async(url.as_str()).await.unwrap_err();
    match err {
        tokio_tungstenite::tungstenite::Error::Http(response) => assert_eq!(response.status(), 401),
        other => panic!("unexpected error: {other}"),
    }
}
