//! Broker-side lifecycle of a task.

/// タスクの状態。遷移は [`TaskRecord`](super::TaskRecord) だけが行う。
///
/// `Queued → Running → Succeeded` が正常系。失敗すると予算が残っていれば
/// `RetryScheduled` を経由して元の lane の末尾に戻り、最後の試行で失敗すると
/// `Archived` になる。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskState {
    Queued,
    Running,
    Succeeded,
    /// Waiting out its backoff delay.
    RetryScheduled,
    /// Retry budget spent. Never leased again.
    Archived,
}
