use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use super::TaskId;

/// Every task kind the worker service knows how to run.
///
/// `as_str` is the routing string used on the wire and in the policy
/// configuration; it must stay stable across deployments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum TaskKind {
    #[serde(rename = "task:mailing")]
    Mailing,
    #[serde(rename = "task:mailing:update_record")]
    MailUpdateRecord,
    #[serde(rename = "task:user_activation")]
    UserActivation,
    #[serde(rename = "task:siakad_profile_picture_scraping")]
    ProfilePictureScraping,
    #[serde(rename = "task:setting_message_node_to_secret_messaging_session")]
    SetRootMessageNode,
    #[serde(rename = "task:send_telegram_message_to_user")]
    SendTelegramMessage,
    #[serde(rename = "task:creating_secret_message_node")]
    CreateSecretMessageNode,
    #[serde(rename = "task:meme_subscription")]
    MemeSubscription,
}

impl TaskKind {
    pub const ALL: [TaskKind; 8] = [
        TaskKind::Mailing,
        TaskKind::MailUpdateRecord,
        TaskKind::UserActivation,
        TaskKind::ProfilePictureScraping,
        TaskKind::SetRootMessageNode,
        TaskKind::SendTelegramMessage,
        TaskKind::CreateSecretMessageNode,
        TaskKind::MemeSubscription,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            TaskKind::Mailing => "task:mailing",
            TaskKind::MailUpdateRecord => "task:mailing:update_record",
            TaskKind::UserActivation => "task:user_activation",
            TaskKind::ProfilePictureScraping => "task:siakad_profile_picture_scraping",
            TaskKind::SetRootMessageNode => {
                "task:setting_message_node_to_secret_messaging_session"
            }
            TaskKind::SendTelegramMessage => "task:send_telegram_message_to_user",
            TaskKind::CreateSecretMessageNode => "task:creating_secret_message_node",
            TaskKind::MemeSubscription => "task:meme_subscription",
        }
    }
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown task kind: {0}")]
pub struct UnknownTaskKind(pub String);

impl FromStr for TaskKind {
    type Err = UnknownTaskKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TaskKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| UnknownTaskKind(s.to_string()))
    }
}

/// Priority lane. Lanes are drained strictly in declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    High,
    Default,
    Low,
}

impl Priority {
    /// Lanes in the order a worker polls them.
    pub const LANES: [Priority; 3] = [Priority::High, Priority::Default, Priority::Low];

    pub fn as_str(self) -> &'static str {
        match self {
            Priority::High => "high",
            Priority::Default => "default",
            Priority::Low => "low",
        }
    }

    pub(crate) fn lane_index(self) -> usize {
        match self {
            Priority::High => 0,
            Priority::Default => 1,
            Priority::Low => 2,
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// TaskKind + Payload + policy の“運搬用”データ。
///
/// Immutable once the broker accepts it. `max_retry` and `timeout` are
/// copied out of the policy table at enqueue time so a config reload never
/// changes the contract of an already-queued task.
#[derive(Debug, Clone)]
pub struct TaskEnvelope {
    task_id: TaskId,
    kind: TaskKind,
    priority: Priority,
    payload: serde_json::Value,
    max_retry: u32,
    timeout: Duration,
}

impl TaskEnvelope {
    pub fn new(
        task_id: TaskId,
        kind: TaskKind,
        priority: Priority,
        payload: serde_json::Value,
        max_retry: u32,
        timeout: Duration,
    ) -> Self {
        Self {
            task_id,
            kind,
            priority,
            payload,
            max_retry,
            timeout,
        }
    }

    pub fn task_id(&self) -> TaskId {
        self.task_id
    }

    pub fn kind(&self) -> TaskKind {
        self.kind
    }

    pub fn priority(&self) -> Priority {
        self.priority
    }

    pub fn payload(&self) -> &serde_json::Value {
        &self.payload
    }

    pub fn max_retry(&self) -> u32 {
        self.max_retry
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(TaskKind::Mailing, "task:mailing")]
    #[case(TaskKind::MailUpdateRecord, "task:mailing:update_record")]
    #[case(TaskKind::UserActivation, "task:user_activation")]
    #[case(TaskKind::ProfilePictureScraping, "task:siakad_profile_picture_scraping")]
    #[case(
        TaskKind::SetRootMessageNode,
        "task:setting_message_node_to_secret_messaging_session"
    )]
    #[case(TaskKind::SendTelegramMessage, "task:send_telegram_message_to_user")]
    #[case(TaskKind::CreateSecretMessageNode, "task:creating_secret_message_node")]
    #[case(TaskKind::MemeSubscription, "task:meme_subscription")]
    fn routing_strings_are_stable(#[case] kind: TaskKind, #[case] expected: &str) {
        assert_eq!(kind.as_str(), expected);
        assert_eq!(expected.parse::<TaskKind>().unwrap(), kind);
        assert_eq!(
            serde_json::to_value(kind).unwrap(),
            serde_json::Value::String(expected.to_string())
        );
    }

    #[test]
    fn unknown_kind_is_rejected() {
        assert!("task:nope".parse::<TaskKind>().is_err());
    }

    #[test]
    fn lanes_are_ordered_high_first() {
        assert_eq!(
            Priority::LANES.map(Priority::as_str),
            ["high", "default", "low"]
        );
        assert!(Priority::High < Priority::Default);
        assert!(Priority::Default < Priority::Low);
    }
}
