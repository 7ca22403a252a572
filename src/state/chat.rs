use super::AppState;
use crate::protocol::ServerMessage;
use crate::types::*;

/// Append-only chat buffer. Ids keep increasing across clears.
#[derive(Debug, Default)]
pub struct ChatLog {
    messages: Vec<ChatMessage>,
    last_id: ChatMessageId,
}

impl ChatLog {
    pub fn append(
        &mut self,
        name: String,
        role: Role,
        message: String,
        connection_id: &ConnectionId,
    ) -> ChatMessage {
        self.last_id += 1;
        let msg = ChatMessage {
            id: self.last_id,
            name,
            role,
            message,
            timestamp: chrono::Utc::now().to_rfc3339(),
            connection_id: connection_id.clone(),
        };
        self.messages.push(msg.clone());
        msg
    }

    /// Oldest first
    pub fn history(&self) -> Vec<ChatMessage> {
        self.messages.clone()
    }

    pub fn clear(&mut self) {
        self.messages.clear();
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

impl AppState {
    /// Append a chat message and broadcast it. The sender is resolved from
    /// the registry first, then from the supplied name, then from the
    /// connection's role. Blank messages are dropped.
    pub async fn send_chat_message(
        &self,
        connection_id: &ConnectionId,
        role: Role,
        text: String,
        name: Option<String>,
    ) -> Option<ChatMessage> {
        let text = text.trim();
        if text.is_empty() {
            return None;
        }

        let mut session = self.session.lock().await;

        let (name, role) = if let Some(student) = session.registry.student(connection_id) {
            (student.name.clone(), Role::Student)
        } else if let Some(teacher) = session
            .registry
            .teacher()
            .filter(|t| t.connection_id == *connection_id)
        {
            (teacher.name.clone(), Role::Teacher)
        } else {
            let fallback = match role {
                Role::Teacher => DEFAULT_TEACHER_NAME.to_string(),
                Role::Student => "Anonymous".to_string(),
            };
            let name = name
                .map(|n| n.trim().to_string())
                .filter(|n| !n.is_empty())
                .unwrap_or(fallback);
            (name, role)
        };

        let message = session
            .chat
            .append(name, role, text.to_string(), connection_id);
        tracing::debug!("Chat message {} from {}", message.id, message.name);

        self.broadcast_to_all(ServerMessage::NewMessage {
            message: message.clone(),
        });
        Some(message)
    }

    pub async fn chat_history(&self) -> Vec<ChatMessage> {
        self.session.lock().await.chat.history()
    }

    /// Empty the log and tell everyone. Authorization is the caller's job.
    pub async fn clear_chat(&self) {
        let mut session = self.session.lock().await;
        let cleared = session.chat.len();
        session.chat.clear();
        tracing::info!("Chat cleared ({} messages)", cleared);

        self.broadcast_to_all(ServerMessage::ChatCleared);
    }
}
