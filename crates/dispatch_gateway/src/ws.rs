//! Per-connection websocket session handling.

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use dispatch_core::commands::{ClientCommand, RegistrationCmd};
use dispatch_core::events::ServerEvent;
use futures_util::{SinkExt, StreamExt};

use crate::protocol::{self, ClientFrame};
use crate::state::AppState;

pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| client_session(socket, state))
}

async fn client_session(socket: WebSocket, state: Arc<AppState>) {
    let conn = state.next_conn_id();
    let (mut sink, mut stream) = socket.split();
    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel::<ServerEvent>();
    state.attach(conn, tx);
    tracing::info!(conn = conn.0, "connection opened");

    let writer = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            let frame = protocol::encode(&event);
            if sink.send(Message::Text(frame.into())).await.is_err() {
                break;
            }
        }
    });

    while let Some(message) = stream.next().await {
        let message = match message {
            Ok(message) => message,
            Err(err) => {
                tracing::debug!(conn = conn.0, %err, "socket error");
                break;
            }
        };
        match message {
            Message::Text(text) => match ClientFrame::parse(text.as_str()) {
                Ok(frame) => state.apply(frame.into_command(conn)),
                Err(err) => {
                    tracing::debug!(conn = conn.0, %err, "malformed frame");
                    state.send_to(conn, protocol::malformed_frame_event(&err));
                }
            },
            Message::Close(_) => break,
            // Pings are answered by axum; binary frames are not part of the
            // protocol.
            _ => {}
        }
    }

    state.apply(ClientCommand::Registration(RegistrationCmd::Disconnect {
        conn,
    }));
    state.detach(conn);
    writer.abort();
    tracing::info!(conn = conn.0, "connection closed");
}
