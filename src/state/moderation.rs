use super::{AppState, Outbound};
use crate::error::{SessionError, SessionResult};
use crate::protocol::ServerMessage;
use crate::types::*;

pub const KICK_NOTICE: &str = "You have been removed from the session by the teacher.";

impl AppState {
    /// Remove a student, notify them, close their connection and broadcast
    /// the new roster. Kicking an absent id is a no-op reported as NotFound.
    pub async fn kick_participant(&self, target_id: &ConnectionId) -> SessionResult<Student> {
        let mut session = self.session.lock().await;

        let student = session
            .registry
            .remove_student(target_id)
            .ok_or(SessionError::NotFound)?;

        // Notice first, then the close; both travel on the same ordered channel
        self.send_to(
            target_id,
            Outbound::Message(ServerMessage::Kicked {
                msg: KICK_NOTICE.to_string(),
            }),
        )
        .await;
        self.send_to(target_id, Outbound::Close).await;

        self.broadcast_roster(&session.registry);
        tracing::info!("Student {} ({}) was kicked out", student.name, target_id);

        Ok(student)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_kick_sends_notice_then_close() {
        let state = AppState::new();
        let target = "s1".to_string();
        let mut direct = state.register_connection(&target).await;
        state.join_student(&target, "Ann".to_string()).await;
        state.join_student(&"s2".to_string(), "Ben".to_string()).await;
        let mut rx = state.broadcast.subscribe();

        let kicked = state.kick_participant(&target).await.unwrap();
        assert_eq!(kicked.name, "Ann");

        match direct.recv().await {
            Some(Outbound::Message(ServerMessage::Kicked { msg })) => assert_eq!(msg, KICK_NOTICE),
            other => panic!("Expected kick notice, got {:?}", other),
        }
        assert!(matches!(direct.recv().await, Some(Outbound::Close)));

        match rx.recv().await {
            Ok(ServerMessage::StudentsUpdate { students }) => assert_eq!(students, vec!["Ben"]),
            other => panic!("Expected roster update, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_kick_absent_is_not_found_without_broadcast() {
        let state = AppState::new();
        state.join_student(&"s1".to_string(), "Ann".to_string()).await;
        let mut rx = state.broadcast.subscribe();

        assert_eq!(
            state.kick_participant(&"ghost".to_string()).await,
            Err(SessionError::NotFound)
        );
        assert!(state.kick_participant(&"s1".to_string()).await.is_ok());
        assert_eq!(
            state.kick_participant(&"s1".to_string()).await,
            Err(SessionError::NotFound)
        );

        // Only the one successful kick produced a roster update
        assert!(matches!(
            rx.try_recv(),
            Ok(ServerMessage::StudentsUpdate { .. })
        ));
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_kicked_socket_teardown_does_not_repeat_roster() {
        let state = AppState::new();
        let target = "s1".to_string();
        let _direct = state.register_connection(&target).await;
        state.join_student(&target, "Ann".to_string()).await;
        let mut rx = state.broadcast.subscribe();

        state.kick_participant(&target).await.unwrap();
        state.disconnect(&target).await;

        assert!(matches!(
            rx.try_recv(),
            Ok(ServerMessage::StudentsUpdate { .. })
        ));
        assert!(rx.try_recv().is_err());
        assert_eq!(state.connection_count().await, 0);
    }
}
