use crate::{
    event::{WsMessage as BusMessage, WsMessageKind},
    server::AppState,
};
use axum::{
    extract::{
        State, WebSocketUpgrade,
        ws::{Message, WebSocket},
    },
    response::Response,
};
use chrono::Utc;
use futures::{SinkExt, StreamExt};
use tracing::debug;

pub async fn ws_handler(State(state): State<AppState>, upgrade: WebSocketUpgrade) -> Response {
    upgrade.on_upgrade(move |socket| handle_socket(socket, state))
}

/// One subscriber connection: forward broadcast events out, answer pings, and
/// unregister on any close or send failure.
async fn handle_socket(socket: WebSocket, state: AppState) {
    let (id, mut events) = state.bus.connect();
    let (mut sink, mut stream) = socket.split();

    loop {
        tokio::select! {
            event = events.recv() => {
                let Some(payload) = event else { break };
                if sink.send(Message::Text(payload)).await.is_err() {
                    break;
                }
            }
            incoming = stream.next() => {
                match incoming {
                    Some(Ok(Message::Text(text))) if text.trim() == "ping" => {
                        let pong = BusMessage {
                            kind: WsMessageKind::Pong,
                            agent_id: None,
                            timestamp: Some(Utc::now()),
                            data: serde_json::Value::Null,
                        };
                        let Ok(payload) = serde_json::to_string(&pong) else { continue };
                        if sink.send(Message::Text(payload)).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(Message::Ping(payload))) => {
                        if sink.send(Message::Pong(payload)).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                    Some(Ok(_)) => {}
                }
            }
        }
    }

    state.bus.disconnect(id);
    debug!(connection = id, "websocket subscriber disconnected");
}
