//! Per-task bookkeeping held by the broker.

use std::time::Duration;

use tokio::time::Instant;

use super::{FailOutcome, RetryPolicy, TaskState};
use crate::domain::TaskEnvelope;

/// The broker's view of one task. Lanes and the retry heap only carry ids;
/// this is where the state lives.
#[derive(Debug, Clone)]
pub struct TaskRecord {
    pub envelope: TaskEnvelope,
    pub state: TaskState,
    /// Invocations so far, counting the one in flight.
    pub attempts: u32,
    pub backoff: RetryPolicy,
    pub last_error: Option<String>,
    /// Set only while `RetryScheduled`.
    pub retry_at: Option<Instant>,
}

impl TaskRecord {
    pub(crate) fn new(envelope: TaskEnvelope, backoff: RetryPolicy) -> Self {
        Self {
            envelope,
            state: TaskState::Queued,
            attempts: 0,
            backoff,
            last_error: None,
            retry_at: None,
        }
    }

    /// Invocations still allowed after the current one.
    pub fn retries_left(&self) -> u32 {
        self.envelope.max_retry().saturating_sub(self.attempts)
    }

    /// Returns the 1-indexed attempt number.
    pub(crate) fn begin_attempt(&mut self) -> u32 {
        self.state = TaskState::Running;
        self.attempts += 1;
        self.attempts
    }

    pub(crate) fn complete(&mut self) {
        self.state = TaskState::Succeeded;
        self.last_error = None;
    }

    /// 失敗を記録して retry か archive かを決める。
    pub(crate) fn fail_attempt(&mut self, error: String, now: Instant) -> FailOutcome {
        self.last_error = Some(error);
        if self.retries_left() == 0 {
            self.state = TaskState::Archived;
            return FailOutcome::Archived;
        }

        let delay: Duration = self.backoff.next_delay(self.attempts);
        self.state = TaskState::RetryScheduled;
        self.retry_at = Some(now + delay);
        FailOutcome::RetryScheduled { delay }
    }

    /// Backoff elapsed: back to the lane.
    pub(crate) fn release(&mut self) {
        self.state = TaskState::Queued;
        self.retry_at = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Priority, TaskId, TaskKind};

    fn record(max_retry: u32) -> TaskRecord {
        let envelope = TaskEnvelope::new(
            TaskId::generate(),
            TaskKind::Mailing,
            Priority::Default,
            serde_json::json!({}),
            max_retry,
            Duration::from_secs(5),
        );
        TaskRecord::new(
            envelope,
            RetryPolicy::Linear {
                step: Duration::from_secs(10),
            },
        )
    }

    #[test]
    fn last_attempt_failure_archives() {
        let now = Instant::now();
        let mut r = record(2);

        assert_eq!(r.begin_attempt(), 1);
        assert_eq!(
            r.fail_attempt("first".into(), now),
            FailOutcome::RetryScheduled {
                delay: Duration::from_secs(10)
            }
        );
        assert_eq!(r.retry_at, Some(now + Duration::from_secs(10)));

        r.release();
        assert_eq!(r.state, TaskState::Queued);
        assert_eq!(r.begin_attempt(), 2);
        assert_eq!(r.fail_attempt("second".into(), now), FailOutcome::Archived);
        assert_eq!(r.state, TaskState::Archived);
        assert_eq!(r.last_error.as_deref(), Some("second"));
    }

    #[test]
    fn success_clears_the_last_error() {
        let mut r = record(3);
        r.begin_attempt();
        r.fail_attempt("boom".into(), Instant::now());
        r.release();
        r.begin_attempt();
        r.complete();
        assert_eq!(r.state, TaskState::Succeeded);
        assert_eq!(r.last_error, None);
        assert_eq!(r.retries_left(), 1);
    }
}
