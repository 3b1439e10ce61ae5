//! In-memory broker implementation.
//!
//! 3 本の lane（high / default / low）を持ち、lease は常に上位 lane から取る。
//! 下位 lane は上位 lane がすべて空のときだけ処理される（strict priority）。

use std::collections::{BinaryHeap, HashMap, VecDeque};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{Mutex, Notify};
use tokio::time::Instant;

use super::{Broker, FailOutcome, NewTask, TaskLease, TaskRecord, TaskState};
use crate::domain::{Priority, TaskEnvelope, TaskId, TaskKind};
use crate::error::CentralError;
use crate::observability::QueueCounts;
use crate::ports::{IdGenerator, SystemClock, UlidGenerator};

/// Scheduled retry entry.
///
/// We use Reverse ordering so BinaryHeap acts as a min-heap (earliest first).
#[derive(Debug, Clone, PartialEq, Eq)]
struct ScheduledTask {
    next_run_at: Instant,
    task_id: TaskId,
}

impl PartialOrd for ScheduledTask {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ScheduledTask {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        other
            .next_run_at
            .cmp(&self.next_run_at)
            .then_with(|| other.task_id.cmp(&self.task_id))
    }
}

struct BrokerState {
    records: HashMap<TaskId, TaskRecord>,

    /// Enqueue order, for inspection only.
    order: Vec<TaskId>,

    /// Ready lanes indexed by `Priority::lane_index`. FIFO within a lane.
    lanes: [VecDeque<TaskId>; 3],

    /// Retry backoff heap.
    scheduled: BinaryHeap<ScheduledTask>,

    closed: bool,
}

impl BrokerState {
    fn new() -> Self {
        Self {
            records: HashMap::new(),
            order: Vec::new(),
            lanes: [VecDeque::new(), VecDeque::new(), VecDeque::new()],
            scheduled: BinaryHeap::new(),
            closed: false,
        }
    }

    fn push_ready(&mut self, priority: Priority, task_id: TaskId) {
        self.lanes[priority.lane_index()].push_back(task_id);
    }

    /// Move tasks from scheduled to their lane if their time has come.
    fn promote_scheduled_tasks(&mut self) {
        let now = Instant::now();
        while let Some(entry) = self.scheduled.peek() {
            if entry.next_run_at > now {
                break;
            }
            let Some(entry) = self.scheduled.pop() else {
                break;
            };
            if let Some(record) = self.records.get_mut(&entry.task_id)
                && record.state == TaskState::RetryScheduled
            {
                record.release();
                let priority = record.envelope.priority();
                self.push_ready(priority, entry.task_id);
            }
        }
    }

    fn pop_ready(&mut self) -> Option<TaskId> {
        Priority::LANES
            .iter()
            .find_map(|lane| self.lanes[lane.lane_index()].pop_front())
    }

    fn counts_by_state(&self) -> QueueCounts {
        let mut counts = QueueCounts::default();
        for record in self.records.values() {
            match record.state {
                TaskState::Queued => counts.queued += 1,
                TaskState::Running => counts.running += 1,
                TaskState::Succeeded => counts.succeeded += 1,
                TaskState::RetryScheduled => counts.retry_scheduled += 1,
                TaskState::Archived => counts.archived += 1,
            }
        }
        counts.lanes.high = self.lanes[Priority::High.lane_index()].len();
        counts.lanes.default = self.lanes[Priority::Default.lane_index()].len();
        counts.lanes.low = self.lanes[Priority::Low.lane_index()].len();
        counts
    }
}

/// In-memory broker. Single process only; state is lost on restart.
pub struct InMemoryBroker {
    state: Arc<Mutex<BrokerState>>,
    notify: Arc<Notify>,
    ids: Arc<dyn IdGenerator>,
}

impl InMemoryBroker {
    pub fn new(ids: Arc<dyn IdGenerator>) -> Self {
        Self {
            state: Arc::new(Mutex::new(BrokerState::new())),
            notify: Arc::new(Notify::new()),
            ids,
        }
    }

    /// Copy of the record, for inspection.
    pub async fn record(&self, task_id: TaskId) -> Option<TaskRecord> {
        let state = self.state.lock().await;
        state.records.get(&task_id).cloned()
    }

    /// All records of one kind, oldest first.
    pub async fn records_of_kind(&self, kind: TaskKind) -> Vec<TaskRecord> {
        let state = self.state.lock().await;
        state
            .order
            .iter()
            .filter_map(|id| state.records.get(id))
            .filter(|r| r.envelope.kind() == kind)
            .cloned()
            .collect()
    }
}

impl Default for InMemoryBroker {
    fn default() -> Self {
        Self::new(Arc::new(UlidGenerator::new(Arc::new(SystemClock))))
    }
}

#[async_trait]
impl Broker for InMemoryBroker {
    async fn enqueue(&self, task: NewTask) -> Result<TaskId, CentralError> {
        let task_id = self.ids.task_id();
        {
            let mut state = self.state.lock().await;
            if state.closed {
                return Err(CentralError::BrokerClosed);
            }
            let envelope = TaskEnvelope::new(
                task_id,
                task.kind,
                task.priority,
                task.payload,
                task.policy.max_retry,
                task.policy.timeout,
            );
            state
                .records
                .insert(task_id, TaskRecord::new(envelope, task.policy.backoff));
            state.order.push(task_id);
            state.push_ready(task.priority, task_id);
        }

        self.notify.notify_one();
        Ok(task_id)
    }

    async fn lease(&self) -> Option<Box<dyn TaskLease>> {
        loop {
            // close() の notify_waiters を取りこぼさないよう、ロック前に登録しておく
            let notified = self.notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            let next_wake = {
                let mut state = self.state.lock().await;
                if state.closed {
                    return None;
                }
                state.promote_scheduled_tasks();

                if let Some(task_id) = state.pop_ready()
                    && let Some(record) = state.records.get_mut(&task_id)
                {
                    let attempt = record.begin_attempt();
                    let lease = InMemoryLease {
                        task_id,
                        envelope: record.envelope.clone(),
                        attempt,
                        state: Arc::clone(&self.state),
                        notify: Arc::clone(&self.notify),
                    };
                    return Some(Box::new(lease));
                }

                state.scheduled.peek().map(|entry| entry.next_run_at)
            };

            // Wait for notification OR next scheduled task time
            if let Some(wake_time) = next_wake {
                tokio::select! {
                    _ = &mut notified => {},
                    _ = tokio::time::sleep_until(wake_time) => {},
                }
            } else {
                notified.await;
            }
        }
    }

    async fn counts_by_state(&self) -> Result<QueueCounts, CentralError> {
        let state = self.state.lock().await;
        Ok(state.counts_by_state())
    }

    async fn ping(&self) -> Result<(), CentralError> {
        let state = self.state.lock().await;
        if state.closed {
            return Err(CentralError::BrokerClosed);
        }
        Ok(())
    }

    async fn close(&self) {
        self.state.lock().await.closed = true;
        self.notify.notify_waiters();
    }
}

struct InMemoryLease {
    task_id: TaskId,
    envelope: TaskEnvelope,
    attempt: u32,
    state: Arc<Mutex<BrokerState>>,
    notify: Arc<Notify>,
}

#[async_trait]
impl TaskLease for InMemoryLease {
    fn envelope(&self) -> &TaskEnvelope {
        &self.envelope
    }

    fn attempt(&self) -> u32 {
        self.attempt
    }

    async fn ack(self: Box<Self>) -> Result<(), CentralError> {
        let mut state = self.state.lock().await;
        if let Some(record) = state.records.get_mut(&self.task_id) {
            record.complete();
        }
        Ok(())
    }

    async fn fail(self: Box<Self>, error: String) -> Result<FailOutcome, CentralError> {
        let outcome = {
            let mut state = self.state.lock().await;
            let Some(record) = state.records.get_mut(&self.task_id) else {
                return Err(CentralError::Broker(format!(
                    "lease refers to unknown task {}",
                    self.task_id
                )));
            };

            let outcome = record.fail_attempt(error, Instant::now());
            let retry_at = record.retry_at;
            if let Some(next_run_at) = retry_at {
                state.scheduled.push(ScheduledTask {
                    next_run_at,
                    task_id: self.task_id,
                });
            }
            outcome
        };

        // sleep 中の leaser に新しい起床時刻を再計算させる
        if matches!(outcome, FailOutcome::RetryScheduled { .. }) {
            self.notify.notify_one();
        }

        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::TaskPolicy;
    use crate::queue::RetryPolicy;
    use std::time::Duration;

    fn task(kind: TaskKind, priority: Priority, max_retry: u32) -> NewTask {
        NewTask {
            kind,
            priority,
            payload: serde_json::json!({ "kind": kind.as_str() }),
            policy: TaskPolicy {
                max_retry,
                timeout: Duration::from_secs(1),
                backoff: RetryPolicy::Linear {
                    step: Duration::from_millis(10),
                },
                priority,
            },
        }
    }

    async fn lease_now(broker: &InMemoryBroker) -> Box<dyn TaskLease> {
        tokio::time::timeout(Duration::from_millis(500), broker.lease())
            .await
            .expect("lease timed out")
            .expect("broker closed")
    }

    #[tokio::test]
    async fn enqueue_and_counts() {
        let broker = InMemoryBroker::default();
        broker
            .enqueue(task(TaskKind::Mailing, Priority::Default, 3))
            .await
            .unwrap();

        let counts = broker.counts_by_state().await.unwrap();
        assert_eq!(counts.queued, 1);
        assert_eq!(counts.running, 0);
        assert_eq!(counts.lanes.default, 1);
    }

    #[tokio::test]
    async fn lease_transitions_to_running() {
        let broker = InMemoryBroker::default();
        broker
            .enqueue(task(TaskKind::Mailing, Priority::Default, 3))
            .await
            .unwrap();

        let lease = lease_now(&broker).await;
        assert_eq!(lease.envelope().kind(), TaskKind::Mailing);
        assert_eq!(lease.attempt(), 1);

        let counts = broker.counts_by_state().await.unwrap();
        assert_eq!(counts.queued, 0);
        assert_eq!(counts.running, 1);
    }

    #[tokio::test]
    async fn ack_marks_succeeded() {
        let broker = InMemoryBroker::default();
        let id = broker
            .enqueue(task(TaskKind::Mailing, Priority::Default, 3))
            .await
            .unwrap();
        lease_now(&broker).await.ack().await.unwrap();

        let record = broker.record(id).await.unwrap();
        assert_eq!(record.state, TaskState::Succeeded);
        assert_eq!(broker.counts_by_state().await.unwrap().succeeded, 1);
    }

    #[tokio::test]
    async fn higher_lanes_are_drained_first() {
        let broker = InMemoryBroker::default();
        broker
            .enqueue(task(TaskKind::MemeSubscription, Priority::Low, 1))
            .await
            .unwrap();
        broker
            .enqueue(task(TaskKind::Mailing, Priority::Default, 1))
            .await
            .unwrap();
        broker
            .enqueue(task(TaskKind::MailUpdateRecord, Priority::High, 1))
            .await
            .unwrap();
        broker
            .enqueue(task(TaskKind::UserActivation, Priority::High, 1))
            .await
            .unwrap();

        let mut order = Vec::new();
        for _ in 0..4 {
            let lease = lease_now(&broker).await;
            order.push(lease.envelope().kind());
            lease.ack().await.unwrap();
        }

        assert_eq!(
            order,
            vec![
                TaskKind::MailUpdateRecord,
                TaskKind::UserActivation,
                TaskKind::Mailing,
                TaskKind::MemeSubscription,
            ]
        );
    }

    #[tokio::test]
    async fn failed_task_is_retried_after_backoff() {
        let broker = InMemoryBroker::default();
        let id = broker
            .enqueue(task(TaskKind::Mailing, Priority::Default, 3))
            .await
            .unwrap();

        let outcome = lease_now(&broker).await.fail("boom".into()).await.unwrap();
        assert_eq!(
            outcome,
            FailOutcome::RetryScheduled {
                delay: Duration::from_millis(10)
            }
        );
        assert_eq!(broker.record(id).await.unwrap().state, TaskState::RetryScheduled);

        let lease = lease_now(&broker).await;
        assert_eq!(lease.envelope().task_id(), id);
        assert_eq!(lease.attempt(), 2);
    }

    #[tokio::test]
    async fn task_is_invoked_at_most_max_retry_times() {
        let broker = InMemoryBroker::default();
        let id = broker
            .enqueue(task(TaskKind::Mailing, Priority::Default, 3))
            .await
            .unwrap();

        let mut invocations = 0;
        loop {
            let lease = lease_now(&broker).await;
            invocations += 1;
            if lease.fail("always".into()).await.unwrap() == FailOutcome::Archived {
                break;
            }
        }

        assert_eq!(invocations, 3);
        let record = broker.record(id).await.unwrap();
        assert_eq!(record.state, TaskState::Archived);
        assert_eq!(record.last_error.as_deref(), Some("always"));
        assert_eq!(broker.counts_by_state().await.unwrap().archived, 1);
    }

    #[tokio::test]
    async fn close_wakes_idle_leasers_and_rejects_enqueue() {
        let broker = Arc::new(InMemoryBroker::default());
        let waiter = tokio::spawn({
            let broker = Arc::clone(&broker);
            async move { broker.lease().await.is_none() }
        });

        tokio::time::sleep(Duration::from_millis(20)).await;
        broker.close().await;

        assert!(waiter.await.unwrap());
        assert!(matches!(
            broker
                .enqueue(task(TaskKind::Mailing, Priority::Default, 1))
                .await,
            Err(CentralError::BrokerClosed)
        ));
        assert!(broker.ping().await.is_err());
    }
}
