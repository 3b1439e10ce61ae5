use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;

use super::runtime::Runtime;
use crate::queue::{Broker, FailOutcome};

/// Worker group handle.
/// - `request_shutdown()` で新しい lease の取得を止める
/// - `shutdown_and_join()` で実行中の handler の完了を待つ
pub struct WorkerGroup {
    shutdown_tx: watch::Sender<bool>,
    joins: Vec<JoinHandle<()>>,
}

impl WorkerGroup {
    /// Spawn `n` workers (at least one).
    pub fn spawn(n: usize, broker: Arc<dyn Broker>, runtime: Arc<Runtime>) -> Self {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let n = n.max(1);
        let mut joins = Vec::with_capacity(n);
        for worker_id in 0..n {
            let broker = Arc::clone(&broker);
            let runtime = Arc::clone(&runtime);
            let mut rx = shutdown_rx.clone();

            let join = tokio::spawn(async move {
                worker_loop(worker_id, broker, runtime, &mut rx).await;
            });
            joins.push(join);
        }
        tracing::info!(workers = n, "worker pool started");

        Self { shutdown_tx, joins }
    }

    pub fn len(&self) -> usize {
        self.joins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.joins.is_empty()
    }

    /// In-flight handlers are not cancelled; workers just stop leasing.
    pub fn request_shutdown(&self) {
        // receivers may already be gone
        let _ = self.shutdown_tx.send(true);
    }

    pub async fn shutdown_and_join(self) {
        self.request_shutdown();
        for join in self.joins {
            if let Err(e) = join.await {
                tracing::error!(error = %e, "worker panicked");
            }
        }
        tracing::info!("worker pool stopped");
    }
}

async fn worker_loop(
    worker_id: usize,
    broker: Arc<dyn Broker>,
    runtime: Arc<Runtime>,
    shutdown_rx: &mut watch::Receiver<bool>,
) {
    loop {
        if *shutdown_rx.borrow() {
            break;
        }

        // lease は待つので shutdown と競合させる
        let lease = tokio::select! {
            changed = shutdown_rx.changed() => {
                if changed.is_err() {
                    break;
                }
                continue;
            }
            lease = broker.lease() => lease,
        };

        // None は broker が閉じられたことを意味する
        let Some(lease) = lease else {
            break;
        };

        let envelope = lease.envelope().clone();
        let attempt = lease.attempt();
        let task_id = envelope.task_id();
        let kind = envelope.kind();

        tracing::debug!(worker_id, %task_id, %kind, attempt, "task started");

        match runtime.execute(&envelope, attempt).await {
            Ok(()) => {
                if let Err(e) = lease.ack().await {
                    tracing::error!(worker_id, %task_id, %kind, error = %e, "ack failed");
                } else {
                    tracing::debug!(worker_id, %task_id, %kind, attempt, "task succeeded");
                }
            }
            Err(err) => match lease.fail(err.to_string()).await {
                Ok(FailOutcome::RetryScheduled { delay }) => {
                    tracing::warn!(
                        worker_id,
                        %task_id,
                        %kind,
                        attempt,
                        max_retry = envelope.max_retry(),
                        retry_in = ?delay,
                        error = %err,
                        "task failed, retry scheduled"
                    );
                }
                Ok(FailOutcome::Archived) => {
                    tracing::warn!(
                        worker_id,
                        %task_id,
                        %kind,
                        attempt,
                        error = %err,
                        "task archived after exhausting retries"
                    );
                }
                Err(e) => {
                    tracing::error!(worker_id, %task_id, %kind, error = %e, "fail report failed");
                }
            },
        }
    }
    tracing::debug!(worker_id, "worker exited");
}
