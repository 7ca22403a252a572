//! Student message handlers

use crate::protocol::ServerMessage;
use crate::state::AppState;
use std::sync::Arc;

use super::Connection;

pub async fn handle_join(
    state: &Arc<AppState>,
    conn: &Connection,
    name: String,
) -> Option<ServerMessage> {
    // A late joiner gets the running question straight away
    state
        .join_student(&conn.id, name)
        .await
        .map(|poll| ServerMessage::NewQuestion { poll })
}

pub async fn handle_submit_answer(
    state: &Arc<AppState>,
    conn: &Connection,
    answer: String,
) -> Option<ServerMessage> {
    match state.submit_answer(&conn.id, answer).await {
        Ok(results) => Some(ServerMessage::ShowResults { results }),
        Err(e) if e.is_reported() => {
            tracing::info!("Answer from {} rejected: {}", conn.id, e);
            Some(ServerMessage::from(&e))
        }
        Err(e) => {
            tracing::debug!("Ignoring answer from {}: {}", conn.id, e);
            None
        }
    }
}
