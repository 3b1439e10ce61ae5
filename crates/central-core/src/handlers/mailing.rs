//! `task:mailing` and `task:mailing:update_record`.

use std::sync::Arc;

use async_trait::async_trait;

use crate::domain::{Mail, MailResultMetadata, MailStatus, Priority};
use crate::error::CentralError;
use crate::mailing::MailFailover;
use crate::ports::{Clock, MailStore};
use crate::queue::TaskClient;
use crate::typed::payloads::{MailUpdateTask, MailingTask};
use crate::typed::{Handler, TaskContext};

/// Sends a mail through the provider chain, then records the result with a
/// high priority update task.
pub struct MailingHandler {
    failover: Arc<MailFailover>,
    tasks: TaskClient,
    clock: Arc<dyn Clock>,
}

impl MailingHandler {
    pub fn new(failover: Arc<MailFailover>, tasks: TaskClient, clock: Arc<dyn Clock>) -> Self {
        Self {
            failover,
            tasks,
            clock,
        }
    }

    /// 更新 task の enqueue 失敗はログだけ残して握りつぶす
    async fn record(&self, mail: &Mail) {
        if let Err(e) = self.tasks.enqueue_mail_update(mail, Priority::High).await {
            tracing::error!(mail_id = %mail.id, status = ?mail.status, error = %e, "failed to register mail update task");
        }
    }
}

#[async_trait]
impl Handler<MailingTask> for MailingHandler {
    async fn handle(&self, ctx: TaskContext, task: MailingTask) -> Result<(), CentralError> {
        let mut mail = task.mail;
        tracing::info!(mail_id = %mail.id, attempt = ctx.attempt, "handling mailing task");

        // 全 provider が失敗したら record は ON_PROGRESS のまま retry に任せる
        let delivery = self.failover.send_email(&mail).await?;

        let metadata = MailResultMetadata {
            detail: delivery.detail,
            signature: delivery.provider,
        };
        mail.status = MailStatus::Success;
        mail.delivered_at = Some(self.clock.now());
        mail.metadata = Some(serde_json::to_string(&metadata).map_err(|e| {
            CentralError::Other(format!("failed to encode mail metadata: {e}"))
        })?);

        tracing::info!(mail_id = %mail.id, provider = %metadata.signature, "mail delivered");
        self.record(&mail).await;
        Ok(())
    }
}

/// Overwrites the stored mail record. Running it twice is harmless.
pub struct MailUpdateHandler {
    store: Arc<dyn MailStore>,
}

impl MailUpdateHandler {
    pub fn new(store: Arc<dyn MailStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Handler<MailUpdateTask> for MailUpdateHandler {
    async fn handle(&self, _ctx: TaskContext, task: MailUpdateTask) -> Result<(), CentralError> {
        self.store.update_mail(&task.mail).await?;
        tracing::info!(mail_id = %task.mail.id, status = ?task.mail.status, "mail record updated");
        Ok(())
    }
}
