//! WebSocket transport.
//!
//! Each accepted socket gets an outbound queue drained by a writer task,
//! while the upgrade task itself runs the read loop.  Dispatching inline in
//! the read loop keeps one client's events in the order they were sent.

use axum::{
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    response::IntoResponse,
};
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use parley_shared::ClientEvent;

use crate::api::AppState;
use crate::connection::{ClientHandle, ConnId, Connection};

/// GET /ws, upgrades to the chat event protocol.
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: AppState) {
    let (mut sink, mut stream) = socket.split();
    let conn_id = ConnId::new();
    let (tx, mut rx) = mpsc::unbounded_channel::<String>();

    info!(conn = %conn_id, "WebSocket connected");

    // Writer task: drains this connection's outbound queue onto the socket.
    let mut send_task = tokio::spawn(async move {
        while let Some(frame) = rx.recv().await {
            if sink.send(Message::Text(frame)).await.is_err() {
                break;
            }
        }
    });

    let mut conn = Connection::new(conn_id, ClientHandle::new(conn_id, tx));

    loop {
        tokio::select! {
            incoming = stream.next() => {
                match incoming {
                    Some(Ok(Message::Text(text))) => match ClientEvent::from_json(&text) {
                        Ok(event) => state.router.dispatch(&mut conn, event).await,
                        Err(error) => {
                            // Unknown or malformed frames are dropped, never
                            // answered; the protocol has no error channel.
                            debug!(conn = %conn_id, %error, "Dropping unparseable frame");
                        }
                    },
                    Some(Ok(Message::Close(_))) | None => break,
                    // Pings are answered by axum itself; binary frames are
                    // not part of the protocol.
                    Some(Ok(_)) => {}
                    Some(Err(error)) => {
                        warn!(conn = %conn_id, %error, "WebSocket read failed");
                        break;
                    }
                }
            }
            _ = &mut send_task => break,
        }
    }

    state.router.disconnect(&mut conn).await;
    send_task.abort();
    info!(conn = %conn_id, "WebSocket closed");
}
