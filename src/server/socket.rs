//! WebSocket transport for progress events

use super::AppState;
use crate::progress::ProgressHub;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::Response;
use futures_util::{SinkExt, StreamExt};

pub async fn socket_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state.progress))
}

/// Forward the session's events until either side goes away
async fn handle_socket(socket: WebSocket, hub: ProgressHub) {
    let (sid, mut events) = hub.register();
    let (mut sender, mut receiver) = socket.split();

    let send_sid = sid.clone();
    let mut send_task = tokio::spawn(async move {
        while let Some(envelope) = events.recv().await {
            let text = match serde_json::to_string(&envelope) {
                Ok(text) => text,
                Err(e) => {
                    tracing::warn!(error = %e, sid = %send_sid, "failed to encode event");
                    continue;
                }
            };
            if sender.send(Message::Text(text.into())).await.is_err() {
                break;
            }
        }
    });

    // Client messages carry nothing; only a close matters
    let mut recv_task = tokio::spawn(async move {
        while let Some(Ok(message)) = receiver.next().await {
            if let Message::Close(_) = message {
                break;
            }
        }
    });

    tokio::select! {
        _ = &mut send_task => recv_task.abort(),
        _ = &mut recv_task => send_task.abort(),
    }

    hub.unregister(&sid);
}
