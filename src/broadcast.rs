use crate::state::AppState;
use crate::types::PollId;
use std::time::Duration;
use tokio::task::AbortHandle;

/// Spawn the auto-close timer for a poll. The task is tagged with the poll
/// id, so a fire for a poll that already ended or was replaced does nothing.
pub fn spawn_poll_timer(state: AppState, poll_id: PollId, limit: Duration) -> AbortHandle {
    tokio::spawn(async move {
        tokio::time::sleep(limit).await;

        if !state.end_poll(&poll_id).await {
            tracing::debug!("Ignoring stale timer for poll {}", poll_id);
        }
    })
    .abort_handle()
}

/// Spawn the task that clears a closed poll once the grace period is over
pub fn spawn_poll_clear(state: AppState, poll_id: PollId, grace: Duration) {
    tokio::spawn(async move {
        tokio::time::sleep(grace).await;

        if !state.clear_poll(&poll_id).await {
            tracing::debug!("Poll {} was replaced before its grace period ended", poll_id);
        }
    });
}
