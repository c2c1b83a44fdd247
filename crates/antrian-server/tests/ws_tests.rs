//! End-to-end tests for the counter display `WebSocket`.
//!
//! Each test serves the real router on an ephemeral local port and
//! connects a `WebSocket` client, so the upgrade, the subscription
//! handshake, and connection cleanup all run as in production.

#![allow(clippy::unwrap_used)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use antrian_core::QueueStore;
use antrian_core::config::CorsConfig;
use antrian_server::{AppState, build_router};
use antrian_types::{DisplayMessage, Loket};
use axum::body::Body;
use axum::http::{Request, StatusCode};
use futures::{SinkExt, StreamExt};
use serde_json::json;
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tower::ServiceExt;

const WAIT: Duration = Duration::from_secs(3);

type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

async fn serve(state: &Arc<AppState>) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let router = build_router(Arc::clone(state), &CorsConfig::default());
    tokio::spawn(async move { axum::serve(listener, router).await });
    addr
}

async fn connect(addr: SocketAddr, loket: &str) -> Client {
    let (client, _) = connect_async(format!("ws://{addr}/ws/loket/{loket}"))
        .await
        .unwrap();
    client
}

async fn next_frame(client: &mut Client) -> Message {
    tokio::time::timeout(WAIT, client.next())
        .await
        .unwrap()
        .unwrap()
        .unwrap()
}

async fn next_message(client: &mut Client) -> DisplayMessage {
    let frame = next_frame(client).await;
    serde_json::from_str(frame.to_text().unwrap()).unwrap()
}

async fn register(state: &Arc<AppState>, name: &str, specialist: &str) {
    let request = Request::builder()
        .method("POST")
        .uri("/api/patients")
        .header("content-type", "application/json")
        .body(Body::from(
            json!({ "fullName": name, "specialist": specialist }).to_string(),
        ))
        .unwrap();
    let response = build_router(Arc::clone(state), &CorsConfig::default())
        .oneshot(request)
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
}

async fn wait_for_subscribers(state: &Arc<AppState>, expected: usize) {
    tokio::time::timeout(WAIT, async {
        while state.registry.len() != expected {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .unwrap();
}

#[tokio::test]
async fn display_gets_initial_then_live_updates_and_is_removed_on_close() {
    let state = Arc::new(AppState::new(Arc::new(QueueStore::in_memory())));
    register(&state, "Sudah Ada", "Poli Gigi").await;
    let addr = serve(&state).await;

    let mut display = connect(addr, "2").await;
    match next_message(&mut display).await {
        DisplayMessage::Initial { loket, patients } => {
            assert_eq!(loket, Loket::from("2"));
            assert_eq!(patients.len(), 1);
        }
        other => panic!("expected initial, got {other:?}"),
    }
    wait_for_subscribers(&state, 1).await;

    register(&state, "Baru", "Poli Gigi").await;
    match next_message(&mut display).await {
        DisplayMessage::Update { loket, patients } => {
            assert_eq!(loket, Loket::from("2"));
            assert_eq!(patients.len(), 2);
        }
        other => panic!("expected update, got {other:?}"),
    }

    display.close(None).await.unwrap();
    wait_for_subscribers(&state, 0).await;
}

#[tokio::test]
async fn display_ping_is_answered() {
    let state = Arc::new(AppState::new(Arc::new(QueueStore::in_memory())));
    let addr = serve(&state).await;

    let mut display = connect(addr, "1").await;
    assert!(matches!(
        next_message(&mut display).await,
        DisplayMessage::Initial { .. }
    ));

    display
        .send(Message::Ping(b"antrian".to_vec().into()))
        .await
        .unwrap();
    match next_frame(&mut display).await {
        Message::Pong(payload) => assert_eq!(payload.as_ref(), b"antrian"),
        other => panic!("expected pong, got {other:?}"),
    }
}

#[tokio::test]
async fn dropped_connection_is_removed_from_registry() {
    let state = Arc::new(AppState::new(Arc::new(QueueStore::in_memory())));
    let addr = serve(&state).await;

    let mut display = connect(addr, "3").await;
    assert!(matches!(
        next_message(&mut display).await,
        DisplayMessage::Initial { .. }
    ));
    wait_for_subscribers(&state, 1).await;

    // No close frame: the socket just goes away.
    drop(display);
    wait_for_subscribers(&state, 0).await;
}
