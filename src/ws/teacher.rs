//! Teacher-only command handlers
//!
//! Authorization is checked in the main dispatch layer before calling these.

use crate::protocol::ServerMessage;
use crate::state::AppState;
use crate::types::ConnectionId;
use std::sync::Arc;

use super::Connection;

pub async fn handle_create_poll(
    state: &Arc<AppState>,
    conn: &Connection,
    question: String,
    options: Vec<String>,
    time_limit: Option<u32>,
) -> Option<ServerMessage> {
    match state
        .create_poll(&conn.id, question, options, time_limit)
        .await
    {
        // The new question is broadcast to everyone, including the teacher
        Ok(_) => None,
        Err(e) => Some(ServerMessage::from(&e)),
    }
}

pub async fn handle_kick(state: &Arc<AppState>, target_id: ConnectionId) -> Option<ServerMessage> {
    match state.kick_participant(&target_id).await {
        Ok(_) => None,
        Err(e) => {
            tracing::info!("Kick of {} failed: {}", target_id, e);
            Some(ServerMessage::from(&e))
        }
    }
}
