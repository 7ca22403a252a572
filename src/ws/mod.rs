pub mod chat;
pub mod handlers;
pub mod student;
pub mod teacher;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Query, State,
    },
    response::IntoResponse,
};
use futures::{
    sink::SinkExt,
    stream::{SplitSink, StreamExt},
};
use serde::Deserialize;
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;

use crate::protocol::{ClientMessage, ServerMessage};
use crate::state::{AppState, Outbound};
use crate::types::{ConnectionId, Role};

pub const PROTOCOL_VERSION: &str = "1.0";

#[derive(Debug, Deserialize)]
pub struct WsQuery {
    pub role: Option<String>,
}

/// Identity of one live connection, fixed for its whole lifetime
#[derive(Debug, Clone, PartialEq)]
pub struct Connection {
    pub id: ConnectionId,
    pub role: Role,
}

impl Connection {
    pub fn new(role: Role) -> Self {
        Self {
            id: ulid::Ulid::new().to_string(),
            role,
        }
    }
}

/// WebSocket upgrade handler
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Query(params): Query<WsQuery>,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    tracing::info!("WebSocket connection request: role={:?}", params.role);

    let conn = Connection::new(Role::from_query(params.role.as_deref()));
    ws.on_upgrade(move |socket| handle_socket(socket, conn, state))
}

/// Serialize and send one message. Returns false once the socket is unusable.
async fn send_json(sender: &mut SplitSink<WebSocket, Message>, msg: &ServerMessage) -> bool {
    match serde_json::to_string(msg) {
        Ok(json) => sender.send(Message::Text(json.into())).await.is_ok(),
        Err(e) => {
            tracing::error!("Failed to serialize message: {}", e);
            true
        }
    }
}

/// Handle individual WebSocket connection
async fn handle_socket(socket: WebSocket, conn: Connection, state: Arc<AppState>) {
    let (mut sender, mut receiver) = socket.split();

    // Subscribe before the welcome so no broadcast after it can be missed
    let mut broadcast_rx = state.broadcast.subscribe();
    let mut direct_rx = state.register_connection(&conn.id).await;

    tracing::info!("WebSocket {} connected with role: {:?}", conn.id, conn.role);

    let welcome = ServerMessage::Welcome {
        protocol: PROTOCOL_VERSION.to_string(),
        connection_id: conn.id.clone(),
        role: conn.role,
        server_now: chrono::Utc::now().to_rfc3339(),
    };

    if send_json(&mut sender, &welcome).await {
        loop {
            tokio::select! {
                // Handle general broadcasts (all clients)
                broadcast_msg = broadcast_rx.recv() => {
                    match broadcast_msg {
                        Ok(msg) => {
                            if !send_json(&mut sender, &msg).await {
                                break;
                            }
                        }
                        Err(RecvError::Lagged(skipped)) => {
                            tracing::warn!("Connection {} lagged, skipped {} broadcasts", conn.id, skipped);
                        }
                        Err(RecvError::Closed) => break,
                    }
                }

                // Handle messages targeted at this connection
                directive = direct_rx.recv() => {
                    match directive {
                        Some(Outbound::Message(msg)) => {
                            if !send_json(&mut sender, &msg).await {
                                break;
                            }
                        }
                        Some(Outbound::Close) | None => {
                            tracing::info!("Closing connection {} on server request", conn.id);
                            let _ = sender.send(Message::Close(None)).await;
                            break;
                        }
                    }
                }

                // Handle client messages
                ws_msg = receiver.next() => {
                    match ws_msg {
                        Some(Ok(Message::Text(text))) => {
                            tracing::debug!("Received message from {}: {}", conn.id, text);

                            let response = match serde_json::from_str::<ClientMessage>(&text) {
                                Ok(client_msg) => handlers::handle_message(client_msg, &conn, &state).await,
                                Err(e) => {
                                    tracing::warn!("Failed to parse client message: {}", e);
                                    Some(ServerMessage::error(
                                        "PARSE_ERROR",
                                        format!("Invalid message format: {}", e),
                                    ))
                                }
                            };

                            if let Some(response) = response {
                                if !send_json(&mut sender, &response).await {
                                    tracing::error!("Failed to send response");
                                    break;
                                }
                            }
                        }
                        Some(Ok(Message::Close(_))) => {
                            tracing::info!("WebSocket closed");
                            break;
                        }
                        Some(Ok(Message::Ping(data))) => {
                            if sender.send(Message::Pong(data)).await.is_err() {
                                break;
                            }
                        }
                        Some(Ok(_)) => {}
                        Some(Err(e)) => {
                            tracing::error!("WebSocket error: {}", e);
                            break;
                        }
                        None => break,
                    }
                }
            }
        }
    } else {
        tracing::error!("Failed to send welcome message");
    }

    // Connection loss is an implicit disconnect, whatever the role
    state.disconnect(&conn.id).await;
    tracing::info!("WebSocket connection {} closed for role: {:?}", conn.id, conn.role);
}
