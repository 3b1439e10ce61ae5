//! Scheduler - cron に従って定期タスクを enqueue する
//!
//! - tick ごとに独立して enqueue（失敗はログに残してスキップ）
//! - 停止中に逃した tick は取り戻さない（次回時刻は常に「今」から再計算）

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::cron::CronSchedule;
use crate::domain::{Priority, TaskKind};
use crate::error::CentralError;
use crate::ports::Clock;
use crate::queue::TaskClient;
use crate::typed::{PayloadCodec, Task};

type PayloadFactory = Box<dyn Fn() -> Result<serde_json::Value, CentralError> + Send + Sync>;

struct ScheduledEntry {
    schedule: CronSchedule,
    kind: TaskKind,
    priority: Priority,
    factory: PayloadFactory,
    next_run: Option<DateTime<Utc>>,
}

pub struct Scheduler {
    client: TaskClient,
    clock: Arc<dyn Clock>,
    entries: Vec<ScheduledEntry>,
}

impl Scheduler {
    pub fn new(client: TaskClient, clock: Arc<dyn Clock>) -> Self {
        Self {
            client,
            clock,
            entries: Vec::new(),
        }
    }

    /// Adds a recurring entry. `priority` defaults to the kind's lane.
    pub fn register<T, F>(
        &mut self,
        cron: &str,
        priority: Option<Priority>,
        factory: F,
    ) -> Result<(), CentralError>
    where
        T: Task,
        F: Fn() -> T + Send + Sync + 'static,
    {
        let schedule = CronSchedule::parse(cron)?;
        let priority = priority.unwrap_or_else(|| self.client.policies().get(T::KIND).priority);
        let next_run = schedule.next_after(self.clock.now());
        tracing::info!(
            kind = %T::KIND,
            cron = %schedule,
            next_run = ?next_run,
            "scheduled task registered"
        );
        self.entries.push(ScheduledEntry {
            schedule,
            kind: T::KIND,
            priority,
            factory: Box::new(move || PayloadCodec::encode(&factory())),
            next_run,
        });
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Earliest pending run across all entries.
    pub fn next_wake(&self) -> Option<DateTime<Utc>> {
        self.entries.iter().filter_map(|e| e.next_run).min()
    }

    /// Fires every entry that is due, returning how many were enqueued.
    pub async fn tick(&mut self) -> usize {
        let now = self.clock.now();
        let mut enqueued = 0;
        for entry in &mut self.entries {
            let Some(due) = entry.next_run else {
                continue;
            };
            if due > now {
                continue;
            }

            let result = match (entry.factory)() {
                Ok(payload) => {
                    self.client
                        .enqueue_value(entry.kind, payload, entry.priority)
                        .await
                }
                Err(e) => Err(e),
            };
            match result {
                Ok(task_id) => {
                    enqueued += 1;
                    tracing::info!(%task_id, kind = %entry.kind, "scheduled task enqueued");
                }
                Err(e) => {
                    tracing::error!(kind = %entry.kind, error = %e, "scheduled enqueue failed, skipping tick");
                }
            }
            entry.next_run = entry.schedule.next_after(now);
        }
        enqueued
    }

    pub fn spawn(mut self, mut shutdown_rx: watch::Receiver<bool>) -> JoinHandle<()> {
        tokio::spawn(async move {
            loop {
                let wait = match self.next_wake() {
                    Some(at) => (at - self.clock.now()).to_std().unwrap_or_default(),
                    None => {
                        // 何も予定がないので shutdown だけ待つ
                        let _ = shutdown_rx.changed().await;
                        break;
                    }
                };
                tokio::select! {
                    changed = shutdown_rx.changed() => {
                        if changed.is_err() || *shutdown_rx.borrow() {
                            break;
                        }
                    }
                    _ = tokio::time::sleep(wait) => {
                        self.tick().await;
                    }
                }
            }
            tracing::debug!("scheduler stopped");
        })
    }
}
