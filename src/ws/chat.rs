//! Chat message handlers

use crate::protocol::ServerMessage;
use crate::state::AppState;
use std::sync::Arc;

use super::Connection;

pub async fn handle_send_message(
    state: &Arc<AppState>,
    conn: &Connection,
    text: String,
    name: Option<String>,
) -> Option<ServerMessage> {
    // The message itself comes back through the broadcast
    if state
        .send_chat_message(&conn.id, conn.role, text, name)
        .await
        .is_none()
    {
        tracing::debug!("Ignoring empty chat message from {}", conn.id);
    }
    None
}

pub async fn handle_chat_history(state: &Arc<AppState>) -> Option<ServerMessage> {
    Some(ServerMessage::ChatHistory {
        messages: state.chat_history().await,
    })
}

pub async fn handle_clear_chat(state: &Arc<AppState>) -> Option<ServerMessage> {
    state.clear_chat().await;
    None
}
