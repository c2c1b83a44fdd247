//! `WebSocket` handler for counter displays.
//!
//! A display connects to `GET /ws/loket/{loket}` and is bound to that
//! counter for the life of the connection. It first receives an `initial`
//! message with the counter's full list, then an `update` after every
//! change at the counter and a `recall` whenever a called patient is
//! re-announced there. Anything the display sends, other than ping and
//! close, is ignored.

use std::sync::Arc;

use antrian_types::Loket;
use axum::extract::ws::{Message, WebSocket};
use axum::extract::{Path, State, WebSocketUpgrade};
use axum::response::IntoResponse;
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::state::AppState;

/// Upgrade an HTTP request to a display connection for one counter.
///
/// # Route
///
/// `GET /ws/loket/{loket}`
pub async fn ws_loket(
    ws: WebSocketUpgrade,
    Path(loket): Path<String>,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    let loket = Loket::from(loket);
    ws.on_upgrade(move |socket| handle_ws(socket, loket, state))
}

/// Drive one display connection: subscribe it, forward its outbound
/// frames, and answer pings until either side goes away.
async fn handle_ws(mut socket: WebSocket, loket: Loket, state: Arc<AppState>) {
    let (tx, mut rx) = mpsc::channel(state.subscriber_buffer);
    // Removes the registry entry on every exit path.
    let registration = state.registry.lease();
    let connection = registration.id();

    info!(connection = %connection, loket = %loket, "Display connected");
    state.broadcaster.subscribe(connection, loket.clone(), tx);

    loop {
        tokio::select! {
            frame = rx.recv() => {
                let Some(frame) = frame else {
                    debug!(connection = %connection, "Outbound queue closed");
                    break;
                };
                if socket.send(Message::Text(frame)).await.is_err() {
                    debug!(connection = %connection, "Display disconnected (send failed)");
                    break;
                }
            }
            msg = socket.recv() => {
                match msg {
                    Some(Ok(Message::Close(_))) | None => {
                        debug!(connection = %connection, "Display closed the connection");
                        break;
                    }
                    Some(Ok(Message::Ping(data))) => {
                        if socket.send(Message::Pong(data)).await.is_err() {
                            debug!(connection = %connection, "Display disconnected (pong failed)");
                            break;
                        }
                    }
                    Some(Err(e)) => {
                        debug!(connection = %connection, "WebSocket error: {e}");
                        break;
                    }
                    _ => {}
                }
            }
        }
    }

    // Close the queue first so a subscribe still in flight sees it closed.
    drop(rx);
    drop(registration);
    info!(connection = %connection, loket = %loket, "Display disconnected");
}
