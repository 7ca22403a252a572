mod chat;
mod moderation;
mod poll;
mod registry;

pub use chat::ChatLog;
pub use moderation::KICK_NOTICE;
pub use poll::CurrentPoll;
pub use registry::Registry;

use crate::config::SessionConfig;
use crate::protocol::ServerMessage;
use crate::types::ConnectionId;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, Mutex, RwLock};

/// Instruction delivered to a single connection's socket task
#[derive(Debug, Clone)]
pub enum Outbound {
    Message(ServerMessage),
    /// Close the socket (forced disconnect)
    Close,
}

/// All session state. Only ever touched through `AppState::session`, whose
/// lock is held for the whole of one command.
#[derive(Debug, Default)]
pub struct Session {
    pub registry: Registry,
    pub poll: Option<CurrentPoll>,
    pub chat: ChatLog,
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub session: Arc<Mutex<Session>>,
    /// Fan-out to every connected client
    pub broadcast: broadcast::Sender<ServerMessage>,
    /// Per-connection channels for targeted messages and forced disconnects
    pub connections: Arc<RwLock<HashMap<ConnectionId, mpsc::UnboundedSender<Outbound>>>>,
    pub config: Arc<SessionConfig>,
}

impl AppState {
    pub fn new() -> Self {
        Self::with_config(SessionConfig::default())
    }

    pub fn with_config(config: SessionConfig) -> Self {
        let (tx, _rx) = broadcast::channel(config.broadcast_capacity);
        Self {
            session: Arc::new(Mutex::new(Session::default())),
            broadcast: tx,
            connections: Arc::new(RwLock::new(HashMap::new())),
            config: Arc::new(config),
        }
    }

    /// Send a message to every connected client
    pub fn broadcast_to_all(&self, msg: ServerMessage) {
        // Ignore send errors (no receivers connected is fine)
        let _ = self.broadcast.send(msg);
    }

    /// Register a live connection and return the receiving end of its
    /// targeted channel
    pub async fn register_connection(
        &self,
        connection_id: &ConnectionId,
    ) -> mpsc::UnboundedReceiver<Outbound> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.connections
            .write()
            .await
            .insert(connection_id.clone(), tx);
        rx
    }

    pub async fn unregister_connection(&self, connection_id: &ConnectionId) {
        self.connections.write().await.remove(connection_id);
    }

    /// Deliver to a single connection. Returns false if it is gone; the
    /// message is dropped in that case.
    pub async fn send_to(&self, connection_id: &ConnectionId, outbound: Outbound) -> bool {
        match self.connections.read().await.get(connection_id) {
            Some(tx) => tx.send(outbound).is_ok(),
            None => {
                tracing::debug!("Dropping message for unknown connection {}", connection_id);
                false
            }
        }
    }

    pub async fn connection_count(&self) -> usize {
        self.connections.read().await.len()
    }

    /// Tear down a connection: forget its channel, drop it from the registry
    /// and tell everyone about the new roster. Runs for every role.
    pub async fn disconnect(&self, connection_id: &ConnectionId) {
        self.unregister_connection(connection_id).await;
        self.remove_participant(connection_id).await;
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Role;

    #[tokio::test]
    async fn test_targeted_send_reaches_only_registered_connection() {
        let state = AppState::new();
        let mut rx = state.register_connection(&"c1".to_string()).await;

        assert!(
            state
                .send_to(&"c1".to_string(), Outbound::Message(ServerMessage::ChatCleared))
                .await
        );
        assert!(
            !state
                .send_to(&"nobody".to_string(), Outbound::Close)
                .await
        );

        match rx.recv().await {
            Some(Outbound::Message(ServerMessage::ChatCleared)) => {}
            other => panic!("Unexpected outbound: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_disconnect_cleans_up_and_broadcasts_roster() {
        let state = AppState::new();
        let id = "c1".to_string();
        let _direct = state.register_connection(&id).await;
        state.join_student(&id, "Ann".to_string()).await;

        let mut rx = state.broadcast.subscribe();
        state.disconnect(&id).await;

        assert_eq!(state.connection_count().await, 0);
        assert!(state.list_participants().await.is_empty());
        match rx.recv().await {
            Ok(ServerMessage::StudentsUpdate { students }) => assert!(students.is_empty()),
            other => panic!("Expected roster update, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_disconnect_of_teacher_clears_slot() {
        let state = AppState::new();
        let teacher = "t1".to_string();
        state
            .create_poll(
                &teacher,
                "Q?".to_string(),
                vec!["A".to_string(), "B".to_string()],
                Some(30),
            )
            .await
            .unwrap();

        let participants = state.list_participants().await;
        assert_eq!(participants[0].role, Role::Teacher);

        let mut rx = state.broadcast.subscribe();
        state.disconnect(&teacher).await;

        assert!(state.list_participants().await.is_empty());
        assert!(matches!(
            rx.recv().await,
            Ok(ServerMessage::StudentsUpdate { .. })
        ));
    }
}
