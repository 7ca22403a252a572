use super::AppState;
use crate::error::{SessionError, SessionResult};
use crate::protocol::{ParticipantInfo, ServerMessage};
use crate::types::*;

/// Fallback for a student who joins with a blank name
const FALLBACK_STUDENT_NAME: &str = "Student";

/// Generate a friendly display name like "brave-otter"
fn generate_display_name() -> String {
    petname::petname(2, "-").unwrap_or_else(|| FALLBACK_STUDENT_NAME.to_string())
}

/// Connected students (in join order) plus the single teacher slot
#[derive(Debug, Default)]
pub struct Registry {
    students: Vec<Student>,
    teacher: Option<Teacher>,
}

impl Registry {
    /// Register a student. Re-joining on the same connection overwrites the
    /// entry in place and clears its answer state.
    pub fn join(&mut self, connection_id: &ConnectionId, name: String) {
        let student = Student::new(connection_id.clone(), name);
        match self
            .students
            .iter_mut()
            .find(|s| s.connection_id == *connection_id)
        {
            Some(existing) => *existing = student,
            None => self.students.push(student),
        }
    }

    /// Drop a participant of either role. Returns the roles that were removed.
    pub fn remove(&mut self, connection_id: &ConnectionId) -> Vec<Role> {
        let mut removed = Vec::new();
        if self
            .teacher
            .as_ref()
            .is_some_and(|t| t.connection_id == *connection_id)
        {
            self.teacher = None;
            removed.push(Role::Teacher);
        }
        if self.remove_student(connection_id).is_some() {
            removed.push(Role::Student);
        }
        removed
    }

    pub fn remove_student(&mut self, connection_id: &ConnectionId) -> Option<Student> {
        let idx = self
            .students
            .iter()
            .position(|s| s.connection_id == *connection_id)?;
        Some(self.students.remove(idx))
    }

    /// Mark a student's answer for the current poll
    /// Whether `connection_id` may answer right now, without recording anything
    pub fn check_can_answer(
        &self,
        connection_id: &ConnectionId,
        poll_active: bool,
    ) -> SessionResult<()> {
        if !poll_active {
            return Err(SessionError::NoActivePoll);
        }
        match self.student(connection_id) {
            None => Err(SessionError::NotFound),
            Some(s) if s.has_answered => Err(SessionError::AlreadyAnswered),
            Some(_) => Ok(()),
        }
    }

    pub fn record_answer(
        &mut self,
        connection_id: &ConnectionId,
        answer: String,
        poll_active: bool,
    ) -> SessionResult<()> {
        self.check_can_answer(connection_id, poll_active)?;
        let student = self
            .students
            .iter_mut()
            .find(|s| s.connection_id == *connection_id)
            .ok_or(SessionError::NotFound)?;
        student.has_answered = true;
        student.answer = Some(answer);
        Ok(())
    }

    /// True when every registered student has answered. Vacuously true with
    /// no students.
    pub fn all_answered(&self) -> bool {
        self.students.iter().all(|s| s.has_answered)
    }

    pub fn reset_answers(&mut self) {
        for student in &mut self.students {
            student.has_answered = false;
            student.answer = None;
        }
    }

    /// Claim the teacher slot (last writer wins). Returns the displaced
    /// teacher if it was a different connection.
    pub fn claim_teacher(&mut self, connection_id: &ConnectionId) -> Option<Teacher> {
        let previous = self.teacher.replace(Teacher {
            connection_id: connection_id.clone(),
            name: DEFAULT_TEACHER_NAME.to_string(),
        });
        previous.filter(|t| t.connection_id != *connection_id)
    }

    pub fn teacher(&self) -> Option<&Teacher> {
        self.teacher.as_ref()
    }

    pub fn student(&self, connection_id: &ConnectionId) -> Option<&Student> {
        self.students
            .iter()
            .find(|s| s.connection_id == *connection_id)
    }

    pub fn students(&self) -> &[Student] {
        &self.students
    }

    pub fn student_names(&self) -> Vec<String> {
        self.students.iter().map(|s| s.name.clone()).collect()
    }

    /// Detailed roster, teacher (if any) first
    pub fn roster_with_roles(&self) -> Vec<ParticipantInfo> {
        let teacher = self.teacher.iter().map(|t| ParticipantInfo {
            connection_id: t.connection_id.clone(),
            name: t.name.clone(),
            role: Role::Teacher,
            has_answered: false,
        });
        let students = self.students.iter().map(|s| ParticipantInfo {
            connection_id: s.connection_id.clone(),
            name: s.name.clone(),
            role: Role::Student,
            has_answered: s.has_answered,
        });
        teacher.chain(students).collect()
    }
}

impl AppState {
    /// Broadcast the current student names to everyone
    pub(crate) fn broadcast_roster(&self, registry: &Registry) {
        self.broadcast_to_all(ServerMessage::StudentsUpdate {
            students: registry.student_names(),
        });
    }

    /// Register a student and broadcast the roster. Returns the running poll,
    /// if any, so the joiner can be sent the question.
    pub async fn join_student(&self, connection_id: &ConnectionId, name: String) -> Option<Poll> {
        let name = match name.trim() {
            "" => generate_display_name(),
            trimmed => trimmed.to_string(),
        };

        let mut session = self.session.lock().await;
        session.registry.join(connection_id, name.clone());
        tracing::info!("Student {} joined as {:?}", connection_id, name);

        self.broadcast_roster(&session.registry);
        session.active_poll().cloned()
    }

    /// Remove a participant of any role and broadcast the roster
    pub async fn remove_participant(&self, connection_id: &ConnectionId) {
        let mut session = self.session.lock().await;
        let removed = session.registry.remove(connection_id);
        if removed.is_empty() {
            return;
        }
        if removed.contains(&Role::Teacher) {
            tracing::info!("Teacher {} disconnected", connection_id);
        }
        tracing::info!("Connection {} left (roles: {:?})", connection_id, removed);

        self.broadcast_roster(&session.registry);
    }

    pub async fn list_participants(&self) -> Vec<ParticipantInfo> {
        self.session.lock().await.registry.roster_with_roles()
    }

    pub async fn student_names(&self) -> Vec<String> {
        self.session.lock().await.registry.student_names()
    }
}
