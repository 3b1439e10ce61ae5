//! TaskClient - producer 側の enqueue API
//!
//! payload を JSON にし、policy table から max_retry / timeout / backoff を
//! 付けて broker に渡す。失敗するのは encode か broker のエラーだけ。

use std::sync::Arc;

use crate::domain::{Mail, Priority, SecretMessageNode, SessionId, TaskId, TaskKind};
use crate::error::CentralError;
use crate::policy::PolicyTable;
use crate::typed::PayloadCodec;
use crate::typed::Task;
use crate::typed::payloads::{
    CreateSecretMessageNodeTask, MailUpdateTask, MailingTask, ProfilePictureScrapingTask,
    RelayedMessage, SendTelegramMessageTask, SetRootNodeTask, UserActivationTask,
};

use super::{Broker, NewTask};

#[derive(Clone)]
pub struct TaskClient {
    broker: Arc<dyn Broker>,
    policies: Arc<PolicyTable>,
}

impl TaskClient {
    pub fn new(broker: Arc<dyn Broker>, policies: Arc<PolicyTable>) -> Self {
        Self { broker, policies }
    }

    pub fn policies(&self) -> &PolicyTable {
        &self.policies
    }

    /// Enqueues on the kind's default lane.
    pub async fn enqueue<T: Task>(&self, task: &T) -> Result<TaskId, CentralError> {
        let priority = self.policies.get(T::KIND).priority;
        self.enqueue_with(task, priority).await
    }

    pub async fn enqueue_with<T: Task>(
        &self,
        task: &T,
        priority: Priority,
    ) -> Result<TaskId, CentralError> {
        let payload = PayloadCodec::encode(task)?;
        self.enqueue_value(T::KIND, payload, priority).await
    }

    /// Untyped entry point; the payload must already be in wire form.
    pub async fn enqueue_value(
        &self,
        kind: TaskKind,
        payload: serde_json::Value,
        priority: Priority,
    ) -> Result<TaskId, CentralError> {
        let policy = self.policies.get(kind);
        let task_id = self
            .broker
            .enqueue(NewTask {
                kind,
                priority,
                payload,
                policy,
            })
            .await?;
        tracing::debug!(%task_id, %kind, lane = %priority, "task enqueued");
        Ok(task_id)
    }

    pub async fn enqueue_mailing(
        &self,
        mail: &Mail,
        priority: Priority,
    ) -> Result<TaskId, CentralError> {
        self.enqueue_with(&MailingTask { mail: mail.clone() }, priority)
            .await
    }

    pub async fn enqueue_mail_update(
        &self,
        mail: &Mail,
        priority: Priority,
    ) -> Result<TaskId, CentralError> {
        self.enqueue_with(&MailUpdateTask { mail: mail.clone() }, priority)
            .await
    }

    pub async fn enqueue_user_activation(&self, user_id: &str) -> Result<TaskId, CentralError> {
        self.enqueue(&UserActivationTask {
            user_id: user_id.to_string(),
        })
        .await
    }

    pub async fn enqueue_profile_picture_scraping(
        &self,
        student_id: &str,
    ) -> Result<TaskId, CentralError> {
        self.enqueue(&ProfilePictureScrapingTask {
            student_id: student_id.to_string(),
        })
        .await
    }

    pub async fn enqueue_root_node(
        &self,
        session_id: SessionId,
        message: RelayedMessage,
    ) -> Result<TaskId, CentralError> {
        self.enqueue(&SetRootNodeTask {
            session_id,
            message,
        })
        .await
    }

    pub async fn enqueue_send_telegram_message(
        &self,
        task: &SendTelegramMessageTask,
    ) -> Result<TaskId, CentralError> {
        self.enqueue(task).await
    }

    pub async fn enqueue_create_message_node(
        &self,
        node: &SecretMessageNode,
    ) -> Result<TaskId, CentralError> {
        self.enqueue(&CreateSecretMessageNodeTask { node: node.clone() })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queue::{InMemoryBroker, TaskState};
    use std::time::Duration;

    fn client() -> (Arc<InMemoryBroker>, TaskClient) {
        let broker = Arc::new(InMemoryBroker::default());
        let client = TaskClient::new(broker.clone(), Arc::new(PolicyTable::default()));
        (broker, client)
    }

    #[tokio::test]
    async fn policy_is_stamped_on_the_envelope() {
        let (broker, client) = client();
        let id = client
            .enqueue_profile_picture_scraping("1915061056")
            .await
            .unwrap();

        let record = broker.record(id).await.unwrap();
        assert_eq!(record.state, TaskState::Queued);
        assert_eq!(record.envelope.kind(), TaskKind::ProfilePictureScraping);
        assert_eq!(record.envelope.max_retry(), 10);
        assert_eq!(record.envelope.timeout(), Duration::from_secs(20));
        assert_eq!(record.envelope.priority(), Priority::High);
        assert_eq!(record.envelope.payload(), &serde_json::json!("1915061056"));
    }

    #[tokio::test]
    async fn explicit_lane_wins_over_default() {
        let (broker, client) = client();
        let id = client
            .enqueue_with(
                &UserActivationTask {
                    user_id: "u".into(),
                },
                Priority::Low,
            )
            .await
            .unwrap();
        assert_eq!(
            broker.record(id).await.unwrap().envelope.priority(),
            Priority::Low
        );
    }

    #[tokio::test]
    async fn closed_broker_surfaces_as_error() {
        let (broker, client) = client();
        broker.close().await;
        assert!(matches!(
            client.enqueue_user_activation("u").await,
            Err(CentralError::BrokerClosed)
        ));
    }
}
