//! Policy table: per-kind retry budget, timeout, backoff and default lane.
//!
//! `max_retry` is the total number of times a task may be invoked. After the
//! last failed invocation the broker archives the task.

use std::collections::BTreeMap;
use std::time::Duration;

use crate::config::{AppConfig, TaskPolicyConfig, WorkerConfig};
use crate::domain::{Priority, TaskKind};
use crate::error::{CentralError, Result};
use crate::queue::RetryPolicy;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TaskPolicy {
    pub max_retry: u32,
    pub timeout: Duration,
    pub backoff: RetryPolicy,
    /// Lane used when the caller does not pick one.
    pub priority: Priority,
}

#[derive(Debug, Clone)]
pub struct PolicyTable {
    policies: BTreeMap<TaskKind, TaskPolicy>,
}

impl PolicyTable {
    /// Built-in policies. Kinds without a fixed budget use the worker defaults.
    pub fn builtin(worker: &WorkerConfig) -> Self {
        let backoff = RetryPolicy::Linear {
            step: Duration::from_secs(worker.retry_step_secs),
        };
        let configured = TaskPolicy {
            max_retry: worker.default_max_retry.max(1),
            timeout: Duration::from_secs(worker.default_timeout_secs),
            backoff,
            priority: Priority::High,
        };
        let fixed = |max_retry: u32, timeout_secs: u64, priority: Priority| TaskPolicy {
            max_retry,
            timeout: Duration::from_secs(timeout_secs),
            backoff,
            priority,
        };

        let policies = TaskKind::ALL
            .into_iter()
            .map(|kind| {
                let policy = match kind {
                    TaskKind::Mailing => fixed(5, 5, Priority::Default),
                    TaskKind::MailUpdateRecord => fixed(5, 5, Priority::High),
                    TaskKind::ProfilePictureScraping => fixed(10, 20, Priority::High),
                    TaskKind::CreateSecretMessageNode => fixed(100, 10, Priority::High),
                    TaskKind::UserActivation
                    | TaskKind::SetRootMessageNode
                    | TaskKind::SendTelegramMessage
                    | TaskKind::MemeSubscription => configured,
                };
                (kind, policy)
            })
            .collect();

        Self { policies }
    }

    /// Built-in table with `[tasks."<routing key>"]` overrides applied.
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let mut table = Self::builtin(&config.worker);
        for (key, overrides) in &config.tasks {
            let kind: TaskKind = key
                .parse()
                .map_err(|e| CentralError::Config(format!("[tasks]: {e}")))?;
            table.apply(kind, overrides);
        }
        Ok(table)
    }

    fn apply(&mut self, kind: TaskKind, overrides: &TaskPolicyConfig) {
        let Some(policy) = self.policies.get_mut(&kind) else {
            return;
        };
        if let Some(max_retry) = overrides.max_retry {
            policy.max_retry = max_retry.max(1);
        }
        if let Some(secs) = overrides.timeout_secs {
            policy.timeout = Duration::from_secs(secs);
        }
        let step = match (overrides.retry_step_secs, policy.backoff) {
            (Some(secs), _) => Duration::from_secs(secs),
            (None, RetryPolicy::Linear { step }) => step,
            (None, RetryPolicy::Exponential { base_delay, .. }) => base_delay,
        };
        policy.backoff = match overrides.backoff_multiplier {
            Some(multiplier) => RetryPolicy::Exponential {
                base_delay: step,
                multiplier,
            },
            None => RetryPolicy::Linear { step },
        };
    }

    /// Replaces one entry; mostly useful to shrink delays in tests.
    pub fn with_policy(mut self, kind: TaskKind, policy: TaskPolicy) -> Self {
        self.policies.insert(kind, policy);
        self
    }

    /// Applies `f` to every entry.
    pub fn map_all(mut self, f: impl Fn(&mut TaskPolicy)) -> Self {
        self.policies.values_mut().for_each(f);
        self
    }

    pub fn get(&self, kind: TaskKind) -> TaskPolicy {
        // builtin() は全 kind を登録済み
        self.policies.get(&kind).copied().unwrap_or(TaskPolicy {
            max_retry: 1,
            timeout: Duration::from_secs(10),
            backoff: RetryPolicy::default(),
            priority: Priority::Default,
        })
    }

    pub fn iter(&self) -> impl Iterator<Item = (TaskKind, &TaskPolicy)> {
        self.policies.iter().map(|(k, v)| (*k, v))
    }
}

impl Default for PolicyTable {
    fn default() -> Self {
        Self::builtin(&WorkerConfig::default())
    }
}
