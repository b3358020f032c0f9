// Shared primitives for one-time server bootstrapping across integration tests.
#![allow(dead_code)]

use futures_util::{SinkExt, StreamExt};
use serde_json::{Value, json};
use std::{
    sync::{Arc, OnceLock},
    time::Duration,
};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use versus_server::interface_adapters::clients::MemorySessions;
use versus_server::use_cases::HubSettings;

pub type Ws = WebSocketStream<MaybeTlsStream<TcpStream>>;

const RECV_TIMEOUT: Duration = Duration::from_secs(10);

// Address and session store published by the server thread.
static SERVER: OnceLock<(String, Arc<MemorySessions>)> = OnceLock::new();

// Production pacing shortened so a full match finishes in well under a second.
fn fast_settings() -> HubSettings {
    let mut settings = versus_server::hub_settings();
    settings.hello_timeout = Duration::from_millis(500);
    settings.countdown = Duration::from_millis(30);
    settings.between_rounds = Duration::from_millis(30);
    settings
}

// Ensure the test server is running and return its address and session store.
fn ensure_server() -> &'static (String, Arc<MemorySessions>) {
    SERVER.get_or_init(|| {
        let sessions = Arc::new(MemorySessions::new(Duration::from_secs(3600)));
        let (addr_tx, addr_rx) = std::sync::mpsc::channel();
        let verifier = Arc::clone(&sessions);
        // Spawn an OS thread so the server outlives individual `#[tokio::test]` runtimes.
        std::thread::spawn(move || {
            let runtime = tokio::runtime::Runtime::new().expect("test runtime");
            runtime.block_on(async move {
                // Bind to an ephemeral port to avoid collisions with local services.
                let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
                    .await
                    .expect("bind ephemeral test port");
                let addr = listener.local_addr().expect("get local addr");
                addr_tx.send(addr.to_string()).expect("publish addr");
                versus_server::serve(listener, verifier, fast_settings())
                    .await
                    .expect("server failed");
            });
        });
        let addr = addr_rx
            .recv_timeout(Duration::from_secs(5))
            .expect("server did not publish its address");
        (addr, sessions)
    })
}

pub fn base_url() -> String {
    format!("http://{}", ensure_server().0)
}

/// Fresh room code so tests never share a lobby.
pub fn room_code() -> String {
    uuid::Uuid::new_v4().simple().to_string()[..8].to_uppercase()
}

pub async fn issue_token(name: &str, room_code: &str) -> String {
    ensure_server().1.issue(name, room_code).await
}

/// Connects with the token in the query string.
pub async fn connect_with_token(token: &str) -> Ws {
    let url = format!("ws://{}/ws?token={token}", ensure_server().0);
    let (ws, _) = connect_async(url).await.expect("ws connect");
    ws
}

/// Connects bare and sends the token in the first hello.
pub async fn connect_with_hello(token: &str, name: &str) -> Ws {
    let url = format!("ws://{}/ws", ensure_server().0);
    let (mut ws, _) = connect_async(url).await.expect("ws connect");
    send_json(
        &mut ws,
        json!({"type": "hello", "name": name, "version": 1, "token": token}),
    )
    .await;
    ws
}

/// Issues a session for `name` in `room_code` and joins through the query string.
pub async fn join(name: &str, room_code: &str) -> Ws {
    connect_with_token(&issue_token(name, room_code).await).await
}

pub async fn send_json(ws: &mut Ws, value: Value) {
    ws.send(Message::text(value.to_string()))
        .await
        .expect("ws send");
}

pub enum Frame {
    Json(Value),
    Closed(Option<u16>),
}

/// Next JSON message or close, skipping control frames.
pub async fn next_frame(ws: &mut Ws) -> Frame {
    loop {
        let next = tokio::time::timeout(RECV_TIMEOUT, ws.next())
            .await
            .expect("timed out waiting for a frame");
        match next {
            Some(Ok(Message::Text(text))) => {
                return Frame::Json(serde_json::from_str(&text).expect("server sent json"));
            }
            Some(Ok(Message::Close(frame))) => {
                return Frame::Closed(frame.map(|f| u16::from(f.code)));
            }
            Some(Ok(_)) => continue,
            Some(Err(_)) | None => return Frame::Closed(None),
        }
    }
}

/// Skips messages until one of type `kind` arrives.
pub async fn recv_type(ws: &mut Ws, kind: &str) -> Value {
    loop {
        match next_frame(ws).await {
            Frame::Json(value) if value["type"] == kind => return value,
            Frame::Json(_) => continue,
            Frame::Closed(code) => panic!("closed ({code:?}) while waiting for {kind}"),
        }
    }
}

/// Skips messages until the socket closes and returns the close code.
pub async fn recv_close(ws: &mut Ws) -> Option<u16> {
    loop {
        if let Frame::Closed(code) = next_frame(ws).await {
            return code;
        }
    }
}
