use super::{AppState, Session};
use crate::broadcast::{spawn_poll_clear, spawn_poll_timer};
use crate::config::SessionConfig;
use crate::error::{SessionError, SessionResult};
use crate::protocol::{ResultsSnapshot, ServerMessage};
use crate::types::*;
use std::collections::{HashMap, HashSet};
use std::time::Duration;
use tokio::task::AbortHandle;

/// The poll instance currently held by the session, plus its tally
#[derive(Debug)]
pub struct CurrentPoll {
    pub poll: Poll,
    pub phase: PollPhase,
    /// Votes per option label, populated lazily
    pub votes: HashMap<String, u32>,
    /// Auto-close timer; None once it fired or was cancelled
    timer: Option<AbortHandle>,
}

impl CurrentPoll {
    pub fn snapshot(&self) -> ResultsSnapshot {
        ResultsSnapshot::new(&self.poll, &self.votes, self.phase)
    }

    fn cancel_timer(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.abort();
        }
    }
}

/// Check and normalize the teacher's poll definition. Runs without the
/// session lock held.
fn validate_poll(
    question: String,
    options: Vec<String>,
    time_limit: Option<u32>,
    config: &SessionConfig,
) -> SessionResult<(String, Vec<String>, u32)> {
    let question = question.trim().to_string();
    if question.is_empty() {
        return Err(SessionError::InvalidPoll(
            "question must not be empty".to_string(),
        ));
    }
    if question.chars().count() > config.max_label_len {
        return Err(SessionError::InvalidPoll(format!(
            "question must be at most {} characters",
            config.max_label_len
        )));
    }

    if options.len() < 2 {
        return Err(SessionError::InvalidPoll(
            "at least two options are required".to_string(),
        ));
    }
    if options.len() > config.max_options {
        return Err(SessionError::InvalidPoll(format!(
            "at most {} options are allowed",
            config.max_options
        )));
    }

    let options: Vec<String> = options.into_iter().map(|o| o.trim().to_string()).collect();
    let mut seen = HashSet::with_capacity(options.len());
    for option in &options {
        if option.is_empty() {
            return Err(SessionError::InvalidPoll(
                "options must not be empty".to_string(),
            ));
        }
        if option.chars().count() > config.max_label_len {
            return Err(SessionError::InvalidPoll(format!(
                "options must be at most {} characters",
                config.max_label_len
            )));
        }
        if !seen.insert(option.as_str()) {
            return Err(SessionError::InvalidPoll(format!(
                "duplicate option {:?}",
                option
            )));
        }
    }

    let time_limit = match time_limit {
        None | Some(0) => config.default_time_limit,
        Some(t) if t > config.max_time_limit => {
            return Err(SessionError::InvalidPoll(format!(
                "time limit must be at most {} seconds",
                config.max_time_limit
            )));
        }
        Some(t) => t,
    };

    Ok((question, options, time_limit))
}

impl Session {
    /// A new poll may replace the current one only once every student answered
    pub fn can_create_poll(&self) -> bool {
        self.poll.is_none() || self.registry.all_answered()
    }

    /// The current poll, but only while it still accepts answers
    pub fn active_poll(&self) -> Option<&Poll> {
        self.poll
            .as_ref()
            .filter(|p| p.phase == PollPhase::Active)
            .map(|p| &p.poll)
    }

    pub fn results(&self) -> Option<ResultsSnapshot> {
        self.poll.as_ref().map(CurrentPoll::snapshot)
    }

    fn is_current(&self, poll_id: &PollId, phase: PollPhase) -> bool {
        self.poll
            .as_ref()
            .is_some_and(|p| p.poll.id == *poll_id && p.phase == phase)
    }
}

impl AppState {
    /// Start a new poll on behalf of a teacher connection
    pub async fn create_poll(
        &self,
        teacher_id: &ConnectionId,
        question: String,
        options: Vec<String>,
        time_limit: Option<u32>,
    ) -> SessionResult<Poll> {
        let validated = validate_poll(question, options, time_limit, &self.config);

        let mut session = self.session.lock().await;

        if let Some(displaced) = session.registry.claim_teacher(teacher_id) {
            tracing::warn!(
                "Teacher slot moved from {} to {}",
                displaced.connection_id,
                teacher_id
            );
        }

        if !session.can_create_poll() {
            tracing::info!("Rejected poll from {}: previous poll still active", teacher_id);
            return Err(SessionError::PollInProgress);
        }

        let (question, options, time_limit) = validated?;

        let poll = Poll {
            id: ulid::Ulid::new().to_string(),
            question,
            options,
            time_limit,
            started_at: chrono::Utc::now().to_rfc3339(),
        };

        // Only reachable with zero students; the old timer must not fire
        if let Some(mut previous) = session.poll.take() {
            previous.cancel_timer();
        }

        session.registry.reset_answers();
        let timer = spawn_poll_timer(
            self.clone(),
            poll.id.clone(),
            Duration::from_secs(u64::from(time_limit)),
        );
        session.poll = Some(CurrentPoll {
            poll: poll.clone(),
            phase: PollPhase::Active,
            votes: HashMap::new(),
            timer: Some(timer),
        });

        tracing::info!(
            "Poll {} created: {:?} ({} options, {}s)",
            poll.id,
            poll.question,
            poll.options.len(),
            poll.time_limit
        );

        self.broadcast_to_all(ServerMessage::NewQuestion { poll: poll.clone() });
        Ok(poll)
    }

    /// Record a student's answer. Ends the poll right away if it was the last
    /// outstanding answer.
    pub async fn submit_answer(
        &self,
        connection_id: &ConnectionId,
        answer: String,
    ) -> SessionResult<ResultsSnapshot> {
        let mut session = self.session.lock().await;

        let poll_active = session.active_poll().is_some();
        session.registry.check_can_answer(connection_id, poll_active)?;

        if !session.active_poll().is_some_and(|p| p.has_option(&answer)) {
            return Err(SessionError::UnknownOption(answer));
        }

        session
            .registry
            .record_answer(connection_id, answer.clone(), poll_active)?;

        let Some(current) = session.poll.as_mut() else {
            return Err(SessionError::NoActivePoll);
        };
        *current.votes.entry(answer).or_insert(0) += 1;
        let poll_id = current.poll.id.clone();
        let snapshot = current.snapshot();

        tracing::debug!(
            "Answer from {} recorded ({} total votes)",
            connection_id,
            snapshot.total_votes
        );

        if session.registry.all_answered() {
            tracing::info!("All students answered poll {}", poll_id);
            if let Some(current) = session.poll.as_mut() {
                current.cancel_timer();
            }
            self.finish_poll(&mut session, &poll_id);
        }

        Ok(snapshot)
    }

    /// Current results, while a poll exists (active or closing)
    pub async fn get_results(&self) -> Option<ResultsSnapshot> {
        self.session.lock().await.results()
    }

    /// Timer path: end the poll if `poll_id` is still the active one.
    /// Returns false for a stale timer.
    pub async fn end_poll(&self, poll_id: &PollId) -> bool {
        let mut session = self.session.lock().await;
        if !session.is_current(poll_id, PollPhase::Active) {
            return false;
        }

        tracing::info!("Poll {} timed out", poll_id);
        if let Some(current) = session.poll.as_mut() {
            // Called from the timer task itself, so drop the handle without aborting
            current.timer = None;
        }
        self.finish_poll(&mut session, poll_id)
    }

    /// Grace-period path: clear the poll if `poll_id` is still the closing one
    pub async fn clear_poll(&self, poll_id: &PollId) -> bool {
        let mut session = self.session.lock().await;
        if !session.is_current(poll_id, PollPhase::Closing) {
            return false;
        }

        session.poll = None;
        tracing::info!("Poll {} cleared", poll_id);
        true
    }

    /// Active -> Closing: freeze results, announce them once, schedule clearing
    fn finish_poll(&self, session: &mut Session, poll_id: &PollId) -> bool {
        let Some(current) = session
            .poll
            .as_mut()
            .filter(|p| p.poll.id == *poll_id && p.phase == PollPhase::Active)
        else {
            return false;
        };

        current.phase = PollPhase::Closing;
        let snapshot = current.snapshot();

        tracing::info!(
            "Poll {} ended with {} votes",
            poll_id,
            snapshot.total_votes
        );
        self.broadcast_to_all(ServerMessage::PollEnded { results: snapshot });
        spawn_poll_clear(self.clone(), poll_id.clone(), self.config.grace_period);
        true
    }
}
