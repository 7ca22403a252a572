use crate::types::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "t", rename_all = "snake_case")]
pub enum ClientMessage {
    JoinStudent {
        name: String,
    },
    /// Teacher only
    CreatePoll {
        question: String,
        options: Vec<String>,
        /// Seconds; missing or 0 falls back to the configured default
        #[serde(default)]
        time_limit: Option<u32>,
    },
    SubmitAnswer {
        answer: String,
    },
    GetResults,
    SendMessage {
        text: String,
        /// Used only when the sender isn't in the registry
        #[serde(default)]
        name: Option<String>,
    },
    GetChatHistory,
    /// Teacher only
    ClearChat,
    /// Teacher only
    KickParticipant {
        target_id: ConnectionId,
    },
    ListParticipants,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "t", rename_all = "snake_case")]
pub enum ServerMessage {
    Welcome {
        protocol: String,
        connection_id: ConnectionId,
        role: Role,
        server_now: String,
    },
    /// Roster of connected student names, in join order
    StudentsUpdate {
        students: Vec<String>,
    },
    NewQuestion {
        poll: Poll,
    },
    /// Results for the requesting connection (after answering or on request)
    ShowResults {
        results: ResultsSnapshot,
    },
    /// Broadcast once per poll instance when it ends
    PollEnded {
        results: ResultsSnapshot,
    },
    NewMessage {
        message: ChatMessage,
    },
    ChatHistory {
        messages: Vec<ChatMessage>,
    },
    ChatCleared,
    /// Sent to a kicked connection right before it is closed
    Kicked {
        msg: String,
    },
    Participants {
        participants: Vec<ParticipantInfo>,
    },
    Error {
        code: String,
        msg: String,
    },
}

impl ServerMessage {
    pub fn error(code: impl Into<String>, msg: impl Into<String>) -> Self {
        ServerMessage::Error {
            code: code.into(),
            msg: msg.into(),
        }
    }
}

impl From<&crate::error::SessionError> for ServerMessage {
    fn from(e: &crate::error::SessionError) -> Self {
        ServerMessage::error(e.code(), e.to_string())
    }
}

/// Vote tally for one poll instance, with the question echoed back.
/// Every option is present in `results`; options without votes map to 0.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ResultsSnapshot {
    pub poll_id: PollId,
    pub question: String,
    pub options: Vec<String>,
    pub results: HashMap<String, u32>,
    pub total_votes: u32,
    pub phase: PollPhase,
}

impl ResultsSnapshot {
    /// Build a snapshot from the lazily populated vote map
    pub fn new(poll: &Poll, votes: &HashMap<String, u32>, phase: PollPhase) -> Self {
        let results: HashMap<String, u32> = poll
            .options
            .iter()
            .map(|o| (o.clone(), votes.get(o).copied().unwrap_or(0)))
            .collect();
        let total_votes = results.values().sum();

        Self {
            poll_id: poll.id.clone(),
            question: poll.question.clone(),
            options: poll.options.clone(),
            results,
            total_votes,
            phase,
        }
    }

    pub fn votes(&self, option: &str) -> u32 {
        self.results.get(option).copied().unwrap_or(0)
    }

    /// Share of the vote for an option, 0.0 when nobody has voted yet
    pub fn percentage(&self, option: &str) -> f64 {
        if self.total_votes == 0 {
            return 0.0;
        }
        f64::from(self.votes(option)) * 100.0 / f64::from(self.total_votes)
    }
}

/// Detailed roster entry (teacher first, then students in join order)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ParticipantInfo {
    pub connection_id: ConnectionId,
    pub name: String,
    pub role: Role,
    pub has_answered: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn poll() -> Poll {
        Poll {
            id: "p1".to_string(),
            question: "Color?".to_string(),
            options: vec!["Red".to_string(), "Blue".to_string()],
            time_limit: 30,
            started_at: "2024-01-01T00:00:00Z".to_string(),
        }
    }

    #[test]
    fn test_snapshot_reports_zero_votes_explicitly() {
        let votes = HashMap::from([("Red".to_string(), 3)]);
        let snapshot = ResultsSnapshot::new(&poll(), &votes, PollPhase::Active);

        assert_eq!(snapshot.results.len(), 2);
        assert_eq!(snapshot.votes("Blue"), 0);
        assert_eq!(snapshot.total_votes, 3);
        assert_eq!(snapshot.percentage("Red"), 100.0);
        assert_eq!(snapshot.percentage("Blue"), 0.0);
    }

    #[test]
    fn test_percentage_with_no_votes_is_zero() {
        let snapshot = ResultsSnapshot::new(&poll(), &HashMap::new(), PollPhase::Closing);

        assert_eq!(snapshot.total_votes, 0);
        assert_eq!(snapshot.percentage("Red"), 0.0);
        assert_eq!(snapshot.percentage("Blue"), 0.0);
    }

    #[test]
    fn test_client_message_wire_format() {
        let msg: ClientMessage = serde_json::from_str(
            r#"{"t":"create_poll","question":"Q?","options":["A","B"]}"#,
        )
        .unwrap();
        match msg {
            ClientMessage::CreatePoll {
                question,
                options,
                time_limit,
            } => {
                assert_eq!(question, "Q?");
                assert_eq!(options.len(), 2);
                assert_eq!(time_limit, None);
            }
            other => panic!("Unexpected message: {:?}", other),
        }

        let msg: ClientMessage =
            serde_json::from_str(r#"{"t":"kick_participant","target_id":"abc"}"#).unwrap();
        assert!(matches!(msg, ClientMessage::KickParticipant { target_id } if target_id == "abc"));
    }

    #[test]
    fn test_server_message_wire_format() {
        let json = serde_json::to_value(ServerMessage::ChatCleared).unwrap();
        assert_eq!(json, serde_json::json!({"t": "chat_cleared"}));

        let json = serde_json::to_value(ServerMessage::StudentsUpdate {
            students: vec!["Ann".to_string()],
        })
        .unwrap();
        assert_eq!(
            json,
            serde_json::json!({"t": "students_update", "students": ["Ann"]})
        );
    }
}
