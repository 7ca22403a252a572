//! WebSocket message dispatch
//!
//! Maps each inbound command to exactly one session operation. Teacher-only
//! commands are authorized here, then dispatched to role-specific handler
//! modules. The return value goes back to the sending connection only;
//! everything else is fanned out by the session itself.

use crate::protocol::{ClientMessage, ServerMessage};
use crate::state::AppState;
use crate::types::Role;
use std::sync::Arc;

use super::{chat, student, teacher, Connection};

/// Macro to check teacher authorization and return early if unauthorized
macro_rules! check_teacher {
    ($conn:expr, $action:expr) => {
        if $conn.role != Role::Teacher {
            tracing::warn!("Connection {} tried to {} without teacher role", $conn.id, $action);
            return Some(ServerMessage::Error {
                code: "UNAUTHORIZED".to_string(),
                msg: format!("Only the teacher can {}", $action),
            });
        }
    };
}

/// Handle client messages and return optional response
pub async fn handle_message(
    msg: ClientMessage,
    conn: &Connection,
    state: &Arc<AppState>,
) -> Option<ServerMessage> {
    match msg {
        // Student messages
        ClientMessage::JoinStudent { name } => student::handle_join(state, conn, name).await,

        ClientMessage::SubmitAnswer { answer } => {
            student::handle_submit_answer(state, conn, answer).await
        }

        // Shared by every role
        ClientMessage::GetResults => state
            .get_results()
            .await
            .map(|results| ServerMessage::ShowResults { results }),

        ClientMessage::ListParticipants => Some(ServerMessage::Participants {
            participants: state.list_participants().await,
        }),

        // Chat
        ClientMessage::SendMessage { text, name } => {
            chat::handle_send_message(state, conn, text, name).await
        }

        ClientMessage::GetChatHistory => chat::handle_chat_history(state).await,

        // Teacher-only commands (authorization checked before dispatch)
        ClientMessage::CreatePoll {
            question,
            options,
            time_limit,
        } => {
            check_teacher!(conn, "create polls");
            teacher::handle_create_poll(state, conn, question, options, time_limit).await
        }

        ClientMessage::ClearChat => {
            check_teacher!(conn, "clear the chat");
            chat::handle_clear_chat(state).await
        }

        ClientMessage::KickParticipant { target_id } => {
            check_teacher!(conn, "remove participants");
            teacher::handle_kick(state, target_id).await
        }
    }
}
