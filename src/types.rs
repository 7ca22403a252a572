use serde::{Deserialize, Serialize};

/// Opaque ID types for type safety
pub type ConnectionId = String;
pub type PollId = String;
pub type ChatMessageId = u64;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Teacher,
    Student,
}

impl Role {
    /// Parse the `role` query parameter of a connection. Anything that isn't
    /// "teacher" is treated as a student.
    pub fn from_query(value: Option<&str>) -> Self {
        match value {
            Some(v) if v.eq_ignore_ascii_case("teacher") => Role::Teacher,
            _ => Role::Student,
        }
    }
}

/// A connected student and their answer state for the current poll
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Student {
    pub connection_id: ConnectionId,
    pub name: String,
    pub has_answered: bool,
    pub answer: Option<String>,
}

impl Student {
    pub fn new(connection_id: ConnectionId, name: String) -> Self {
        Self {
            connection_id,
            name,
            has_answered: false,
            answer: None,
        }
    }
}

/// The single tracked teacher identity (no answer state)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Teacher {
    pub connection_id: ConnectionId,
    pub name: String,
}

pub const DEFAULT_TEACHER_NAME: &str = "Teacher";

/// Lifecycle of the current poll. `Idle` is represented by the absence of a poll.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PollPhase {
    /// Accepting answers, auto-close timer armed
    Active,
    /// Ended, results frozen, waiting out the grace period
    Closing,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Poll {
    pub id: PollId,
    pub question: String,
    pub options: Vec<String>,
    pub time_limit: u32,
    /// ISO timestamp of when the poll was created
    pub started_at: String,
}

impl Poll {
    pub fn has_option(&self, label: &str) -> bool {
        self.options.iter().any(|o| o == label)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatMessage {
    pub id: ChatMessageId,
    pub name: String,
    pub role: Role,
    pub message: String,
    pub timestamp: String,
    pub connection_id: ConnectionId,
}
