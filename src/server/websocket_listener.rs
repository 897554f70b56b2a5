use crate::model::OutboundMessage;
use crate::server::{ConnectionHandler, ProtocolRouter};
use axum::extract::ws::{Message, WebSocket};
use axum::extract::WebSocketUpgrade;
use axum::response::IntoResponse;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc::{self, UnboundedReceiver};
use tracing::{debug, error, info, warn};

pub async fn handle_websocket(ws: WebSocketUpgrade, router: ProtocolRouter) -> impl IntoResponse {
    ws.on_upgrade(move |socket| listen(socket, router))
}

async fn listen(socket: WebSocket, router: ProtocolRouter) {
    let (ws_sender, ws_receiver) = socket.split();
    let (tx, rx) = mpsc::unbounded_channel();
    let connection_handler = ConnectionHandler::new(router, tx);
    let connection = connection_handler.connection_id();
    info!(%connection, "Client connected");

    let sender_task = handle_outgoing_messages(rx, ws_sender);
    let receiver_task = handle_incoming_messages(ws_receiver, &connection_handler);

    tokio::select! {
        _ = sender_task => {
            info!(%connection, "Sender task completed");
        }
        _ = receiver_task => {
            info!(%connection, "Receiver task completed");
        }
    }
    connection_handler.disconnect().await;
}

pub async fn handle_outgoing_messages(
    mut rx: UnboundedReceiver<OutboundMessage>,
    mut ws_sender: SplitSink<WebSocket, Message>,
) {
    while let Some(message) = rx.recv().await {
        let text = match serde_json::to_string(&message) {
            Ok(text) => text,
            Err(e) => {
                error!(error = %e, ?message, "Failed to serialize message");
                continue;
            }
        };
        if let Err(e) = ws_sender.send(Message::Text(text)).await {
            error!(error = %e, "Failed to send message");
            break;
        }
    }
}

pub async fn handle_incoming_messages(
    mut receiver: SplitStream<WebSocket>,
    connection_handler: &ConnectionHandler,
) {
    while let Some(message) = receiver.next().await {
        match message {
            Ok(Message::Text(text)) => {
                if let Err(e) = connection_handler.handle_text(&text).await {
                    warn!(error = %e, %text, "Failed to parse message");
                }
            }
            Ok(Message::Close(_)) => {
                info!(connection = %connection_handler.connection_id(), "Client closed connection");
                break;
            }
            Ok(Message::Ping(_)) | Ok(Message::Pong(_)) => {}
            Ok(other) => {
                debug!(?other, "Unsupported message type");
            }
            Err(e) => {
                error!(error = %e, "Failed to receive message");
                break;
            }
        }
    }
}
