/// Result type for session operations
pub type SessionResult<T> = Result<T, SessionError>;

/// Per-command failures. None of these are fatal to the server; the gateway
/// decides whether the requester hears about them.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    #[error("Cannot create poll: previous poll still active")]
    PollInProgress,

    #[error("Answer already submitted for this poll")]
    AlreadyAnswered,

    #[error("No active poll")]
    NoActivePoll,

    #[error("Participant not found")]
    NotFound,

    #[error("Invalid poll: {0}")]
    InvalidPoll(String),

    #[error("Unknown option: {0}")]
    UnknownOption(String),
}

impl SessionError {
    /// Stable wire code sent in `ServerMessage::Error`
    pub fn code(&self) -> &'static str {
        match self {
            SessionError::PollInProgress => "POLL_IN_PROGRESS",
            SessionError::AlreadyAnswered => "ALREADY_ANSWERED",
            SessionError::NoActivePoll => "NO_ACTIVE_POLL",
            SessionError::NotFound => "NOT_FOUND",
            SessionError::InvalidPoll(_) => "INVALID_POLL",
            SessionError::UnknownOption(_) => "UNKNOWN_OPTION",
        }
    }

    /// Whether the requester should be told about this failure. Duplicate
    /// answers and commands against a missing poll are silently dropped.
    pub fn is_reported(&self) -> bool {
        !matches!(
            self,
            SessionError::AlreadyAnswered | SessionError::NoActivePoll
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes_and_reporting() {
        assert_eq!(SessionError::PollInProgress.code(), "POLL_IN_PROGRESS");
        assert!(SessionError::PollInProgress.is_reported());
        assert!(SessionError::NotFound.is_reported());
        assert!(!SessionError::AlreadyAnswered.is_reported());
        assert!(!SessionError::NoActivePoll.is_reported());
        assert_eq!(
            SessionError::InvalidPoll("too few options".into()).to_string(),
            "Invalid poll: too few options"
        );
    }
}
