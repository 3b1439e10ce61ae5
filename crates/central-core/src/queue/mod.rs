//! Queue module: broker port, task state, retry logic and the in-memory broker.
//!
//! - Broker が状態遷移（Queued -> Running -> ...）と retry/archive を判断する
//! - Worker は副作用を実行して結果を lease 経由で報告するだけ

mod client;
mod memory;
mod record;
mod retry;
mod state;

pub use client::TaskClient;
pub use memory::InMemoryBroker;
pub use record::TaskRecord;
pub use retry::RetryPolicy;
pub use state::TaskState;

use std::time::Duration;

use async_trait::async_trait;

use crate::domain::{Priority, TaskEnvelope, TaskId, TaskKind};
use crate::error::CentralError;
use crate::observability::QueueCounts;
use crate::policy::TaskPolicy;

/// A task as submitted by a producer, before the broker assigns an id.
#[derive(Debug, Clone)]
pub struct NewTask {
    pub kind: TaskKind,
    pub priority: Priority,
    pub payload: serde_json::Value,
    pub policy: TaskPolicy,
}

/// What the broker decided after a failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailOutcome {
    RetryScheduled { delay: Duration },
    Archived,
}

/// A leased task for processing.
/// The worker owns this lease and must either `ack` or `fail`.
#[async_trait]
pub trait TaskLease: Send {
    fn envelope(&self) -> &TaskEnvelope;

    /// 1-indexed attempt number of this lease.
    fn attempt(&self) -> u32;

    async fn ack(self: Box<Self>) -> Result<(), CentralError>;

    /// Mark failure; the broker decides between retry and archive.
    async fn fail(self: Box<Self>, error: String) -> Result<FailOutcome, CentralError>;
}

/// Broker port.
#[async_trait]
pub trait Broker: Send + Sync {
    async fn enqueue(&self, task: NewTask) -> Result<TaskId, CentralError>;

    /// Waits for the next task, honouring strict lane priority.
    /// Returns `None` once the broker is closed.
    async fn lease(&self) -> Option<Box<dyn TaskLease>>;

    async fn counts_by_state(&self) -> Result<QueueCounts, CentralError>;

    async fn ping(&self) -> Result<(), CentralError>;

    /// Rejects further enqueues and wakes idle leasers.
    async fn close(&self);
}
