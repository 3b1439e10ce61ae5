//! Secret messaging task handlers: root node, delivery and node creation.

use std::sync::Arc;

use async_trait::async_trait;

use crate::domain::{SecretMessageNode, UsecaseError};
use crate::error::CentralError;
use crate::ports::{BotGateway, Clock, InlineButton, OutgoingMessage, StoreError, TelegramUserStore};
use crate::queue::TaskClient;
use crate::secret::SecretMessaging;
use crate::typed::payloads::{
    CreateSecretMessageNodeTask, SendTelegramMessageTask, SetRootNodeTask,
};
use crate::typed::{Handler, TaskContext};

pub struct SetRootNodeHandler {
    protocol: Arc<SecretMessaging>,
}

impl SetRootNodeHandler {
    pub fn new(protocol: Arc<SecretMessaging>) -> Self {
        Self { protocol }
    }
}

#[async_trait]
impl Handler<SetRootNodeTask> for SetRootNodeHandler {
    async fn handle(&self, _ctx: TaskContext, task: SetRootNodeTask) -> Result<(), CentralError> {
        self.protocol
            .record_root_node(task.session_id, &task.message)
            .await
            .inspect_err(|e| {
                tracing::error!(session_id = %task.session_id, error = %e, "failed to set root message node");
            })?;
        tracing::info!(session_id = %task.session_id, node_id = task.message.message_id, "root message node set");
        Ok(())
    }
}

/// Delivers a framed message to one side of a session, then chains the
/// delivered message to the node it came from.
pub struct SendTelegramMessageHandler {
    users: Arc<dyn TelegramUserStore>,
    gateway: Arc<dyn BotGateway>,
    tasks: TaskClient,
    clock: Arc<dyn Clock>,
}

impl SendTelegramMessageHandler {
    pub fn new(
        users: Arc<dyn TelegramUserStore>,
        gateway: Arc<dyn BotGateway>,
        tasks: TaskClient,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            users,
            gateway,
            tasks,
            clock,
        }
    }
}

#[async_trait]
impl Handler<SendTelegramMessageTask> for SendTelegramMessageHandler {
    async fn handle(
        &self,
        _ctx: TaskContext,
        task: SendTelegramMessageTask,
    ) -> Result<(), CentralError> {
        let user = match self.users.find_user(task.user_id).await {
            Ok(user) => user,
            Err(StoreError::NotFound) => {
                tracing::error!(user_id = task.user_id, "recipient of secret message is not registered");
                return Err(UsecaseError::not_found("recipient not registered").into());
            }
            Err(e) => return Err(e.into()),
        };

        let buttons = task
            .buttons
            .iter()
            .map(|b| InlineButton {
                text: b.text.clone(),
                callback_data: b.callback_data.clone(),
            })
            .collect();
        let message = OutgoingMessage::text(user.id, task.text.clone())
            .html()
            .reply_to(task.reply_to_message_id)
            .with_buttons(buttons);

        let sent = self
            .gateway
            .send_message(&message)
            .await
            .map_err(|e| CentralError::Gateway(e.to_string()))?;

        // ここで失敗すると再送で同じ内容が 2 通届く
        let node = SecretMessageNode {
            id: sent.message_id,
            session_id: task.session_id,
            created_at: self.clock.now(),
            text: sent.text,
            previous_node_id: Some(task.message_id),
        };
        self.tasks
            .enqueue_create_message_node(&node)
            .await
            .inspect_err(|e| {
                tracing::error!(session_id = %task.session_id, error = %e, "failed to register create message node task");
            })?;

        tracing::info!(session_id = %task.session_id, delivered = node.id, "secret message delivered");
        Ok(())
    }
}

pub struct CreateMessageNodeHandler {
    protocol: Arc<SecretMessaging>,
}

impl CreateMessageNodeHandler {
    pub fn new(protocol: Arc<SecretMessaging>) -> Self {
        Self { protocol }
    }
}

#[async_trait]
impl Handler<CreateSecretMessageNodeTask> for CreateMessageNodeHandler {
    async fn handle(
        &self,
        _ctx: TaskContext,
        task: CreateSecretMessageNodeTask,
    ) -> Result<(), CentralError> {
        self.protocol.create_message_node(&task.node).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{SessionId, TaskId, TaskKind, TelegramUser};
    use crate::impls::{InMemoryStore, RecordingGateway};
    use crate::policy::PolicyTable;
    use crate::ports::SystemClock;
    use crate::queue::InMemoryBroker;
    use crate::typed::PayloadCodec;
    use crate::typed::payloads::ButtonPayload;
    use std::time::Duration;

    fn ctx() -> TaskContext {
        TaskContext {
            task_id: TaskId::generate(),
            kind: TaskKind::SendTelegramMessage,
            attempt: 1,
            max_retry: 5,
            timeout: Duration::from_secs(10),
        }
    }

    struct Fixture {
        store: Arc<InMemoryStore>,
        gateway: Arc<RecordingGateway>,
        broker: Arc<InMemoryBroker>,
        handler: SendTelegramMessageHandler,
    }

    fn fixture() -> Fixture {
        let store = Arc::new(InMemoryStore::new());
        let gateway = Arc::new(RecordingGateway::default());
        let broker = Arc::new(InMemoryBroker::default());
        let handler = SendTelegramMessageHandler::new(
            store.clone(),
            gateway.clone(),
            TaskClient::new(broker.clone(), Arc::new(PolicyTable::default())),
            Arc::new(SystemClock),
        );
        Fixture {
            store,
            gateway,
            broker,
            handler,
        }
    }

    fn task(session_id: SessionId) -> SendTelegramMessageTask {
        SendTelegramMessageTask {
            user_id: 200,
            text: "<strong>Someone secretly said</strong>: hi".into(),
            message_id: 2,
            reply_to_message_id: Some(1),
            session_id,
            buttons: vec![ButtonPayload {
                text: "Report".into(),
                callback_data: "report_secret_message;2".into(),
            }],
        }
    }

    #[tokio::test]
    async fn delivery_enqueues_the_chained_node() {
        let f = fixture();
        f.store
            .create_user(&TelegramUser::new(200, "Bob"))
            .await
            .unwrap();
        let session_id = SessionId::generate();

        f.handler.handle(ctx(), task(session_id)).await.unwrap();

        let sent = f.gateway.sent();
        assert_eq!(sent.len(), 1);
        let (delivered, message) = &sent[0];
        assert_eq!(message.chat_id, 200);
        assert_eq!(message.reply_to, Some(1));
        assert_eq!(message.buttons.len(), 1);

        let records = f
            .broker
            .records_of_kind(TaskKind::CreateSecretMessageNode)
            .await;
        let node: CreateSecretMessageNodeTask =
            PayloadCodec::decode(records[0].envelope.payload().clone()).unwrap();
        assert_eq!(node.node.id, delivered.message_id);
        assert_eq!(node.node.previous_node_id, Some(2));
        assert_eq!(node.node.session_id, session_id);
    }

    #[tokio::test]
    async fn unknown_recipient_fails_without_sending() {
        let f = fixture();
        assert!(f.handler.handle(ctx(), task(SessionId::generate())).await.is_err());
        assert!(f.gateway.sent().is_empty());
    }

    #[tokio::test]
    async fn gateway_failure_fails_the_task() {
        let f = fixture();
        f.store
            .create_user(&TelegramUser::new(200, "Bob"))
            .await
            .unwrap();
        f.gateway.fail_next();
        let err = f
            .handler
            .handle(ctx(), task(SessionId::generate()))
            .await
            .unwrap_err();
        assert!(matches!(err, CentralError::Gateway(_)));
        assert!(
            f.broker
                .records_of_kind(TaskKind::CreateSecretMessageNode)
                .await
                .is_empty()
        );
    }
}
