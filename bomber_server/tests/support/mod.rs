// One-time server bootstrap and WebSocket helpers shared by integration tests.
#![allow(dead_code)]

use futures::{SinkExt, StreamExt};
use serde_json::Value;
use std::{
    sync::{Arc, OnceLock},
    time::Duration,
};
use tokio::net::TcpStream;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async, tungstenite::Message};

pub type Ws = WebSocketStream<MaybeTlsStream<TcpStream>>;

static SERVER_URL: OnceLock<String> = OnceLock::new();
static SERVER_READY: OnceLock<()> = OnceLock::new();

/// Starts the server once per test binary and returns its base URL.
pub fn ensure_server() -> &'static str {
    SERVER_READY.get_or_init(|| {
        let published_url = Arc::new(OnceLock::<String>::new());
        let published_url_thread = Arc::clone(&published_url);
        // The server gets its own OS thread and runtime so it outlives each `#[tokio::test]`.
        std::thread::spawn(move || {
            let runtime = tokio::runtime::Runtime::new().expect("test runtime");
            runtime.block_on(async move {
                let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
                    .await
                    .expect("bind ephemeral test port");
                let addr = listener.local_addr().expect("get local addr");
                let _ = published_url_thread.set(format!("http://{}", addr));
                bomber_server::run(listener).await.expect("server failed");
            });
        });
        wait_for_server_url_and_readiness(published_url);
    });

    SERVER_URL
        .get()
        .expect("server url should be initialized")
        .as_str()
}

fn wait_for_server_url_and_readiness(published_url: Arc<OnceLock<String>>) {
    let base_url = loop {
        if let Some(url) = published_url.get() {
            break url.clone();
        }
        std::thread::sleep(Duration::from_millis(10));
    };
    let _ = SERVER_URL.set(base_url.clone());

    let addr = base_url
        .strip_prefix("http://")
        .expect("base url should use http://");
    for _ in 0..100 {
        if std::net::TcpStream::connect(addr).is_ok() {
            return;
        }
        std::thread::sleep(Duration::from_millis(20));
    }
    panic!("server did not become ready in time");
}

/// Creates a fresh lobby with a random id and returns that id.
pub async fn create_lobby(base_url: &str) -> String {
    let lobby_id = format!("test-{}", uuid::Uuid::new_v4());
    let res = reqwest::Client::new()
        .post(format!("{base_url}/lobbies"))
        .json(&serde_json::json!({ "lobby_id": lobby_id }))
        .send()
        .await
        .expect("request should succeed");
    assert_eq!(res.status(), reqwest::StatusCode::CREATED);
    lobby_id
}

pub fn ws_url(base_url: &str, lobby_id: &str) -> String {
    let host = base_url.strip_prefix("http://").expect("http base url");
    format!("ws://{host}/ws?lobby_id={lobby_id}")
}

pub async fn connect(base_url: &str, lobby_id: &str) -> Ws {
    let (ws, _response) = connect_async(ws_url(base_url, lobby_id))
        .await
        .expect("websocket upgrade");
    ws
}

pub async fn send_json(ws: &mut Ws, value: Value) {
    ws.send(Message::Text(value.to_string().into()))
        .await
        .expect("send message");
}

/// Connects and completes the Join handshake, returning the socket and the identity message.
pub async fn join(base_url: &str, lobby_id: &str) -> (Ws, Value) {
    let mut ws = connect(base_url, lobby_id).await;
    send_json(
        &mut ws,
        serde_json::json!({"type": "Join", "data": {"display_name": "tester"}}),
    )
    .await;
    let first = next_json(&mut ws).await;
    (ws, first)
}

/// Next text frame parsed as JSON; `Value::Null` once the server closes the socket.
pub async fn next_json(ws: &mut Ws) -> Value {
    loop {
        let msg = tokio::time::timeout(Duration::from_secs(5), ws.next())
            .await
            .expect("server message in time");
        match msg {
            Some(Ok(Message::Text(text))) => {
                return serde_json::from_str(&text).expect("valid json");
            }
            Some(Ok(Message::Close(_))) | None | Some(Err(_)) => return Value::Null,
            Some(Ok(_)) => continue,
        }
    }
}

/// Skips messages until one of the given `type` arrives and returns it.
pub async fn next_of_type(ws: &mut Ws, kind: &str) -> Value {
    loop {
        let value = next_json(ws).await;
        assert!(!value.is_null(), "socket closed while waiting for {kind}");
        if value["type"] == kind {
            return value;
        }
    }
}
