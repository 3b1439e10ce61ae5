//! Mail enqueue use case.

use std::sync::Arc;

use crate::domain::{ErrorKind, Mail, MailingInput, Priority, UsecaseError};
use crate::ports::{Clock, IdGenerator, MailStore};
use crate::queue::TaskClient;

pub const MSG_FAILED_REGISTER_TASK: &str = "failed to register mailing task";

pub struct MailService {
    store: Arc<dyn MailStore>,
    tasks: TaskClient,
    ids: Arc<dyn IdGenerator>,
    clock: Arc<dyn Clock>,
}

impl MailService {
    pub fn new(
        store: Arc<dyn MailStore>,
        tasks: TaskClient,
        ids: Arc<dyn IdGenerator>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            tasks,
            ids,
            clock,
        }
    }

    /// Validates, persists the mail as `ON_PROGRESS` and enqueues delivery on
    /// the default lane.
    pub async fn enqueue(&self, input: MailingInput) -> Result<Mail, UsecaseError> {
        if let Err(field) = input.validate() {
            tracing::info!(field, "rejecting invalid mailing input");
            return Err(UsecaseError::validation(format!("{field} is required")));
        }

        let mail = Mail::from_input(self.ids.mail_id(), input, self.clock.now());

        if let Err(e) = self.store.create_mail(&mail).await {
            tracing::error!(mail_id = %mail.id, error = %e, "failed to save mail");
            return Err(UsecaseError::database());
        }

        if let Err(e) = self.tasks.enqueue_mailing(&mail, Priority::Default).await {
            tracing::error!(mail_id = %mail.id, error = %e, "failed to register mailing task");
            return Err(UsecaseError::new(
                ErrorKind::Internal,
                MSG_FAILED_REGISTER_TASK,
            ));
        }

        tracing::info!(mail_id = %mail.id, "mailing task registered");
        Ok(mail)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{MailAddress, MailStatus, TaskKind};
    use crate::impls::InMemoryStore;
    use crate::policy::PolicyTable;
    use crate::ports::{SystemClock, UlidGenerator};
    use crate::queue::{Broker, InMemoryBroker};

    struct Fixture {
        broker: Arc<InMemoryBroker>,
        store: Arc<InMemoryStore>,
        service: MailService,
    }

    fn fixture() -> Fixture {
        let broker = Arc::new(InMemoryBroker::default());
        let store = Arc::new(InMemoryStore::new());
        let clock = Arc::new(SystemClock);
        let service = MailService::new(
            store.clone(),
            TaskClient::new(broker.clone(), Arc::new(PolicyTable::default())),
            Arc::new(UlidGenerator::new(clock.clone())),
            clock,
        );
        Fixture {
            broker,
            store,
            service,
        }
    }

    fn input() -> MailingInput {
        MailingInput {
            to: vec![MailAddress::new("someone@example.com")],
            html_content: "<p>hi</p>".into(),
            subject: "hello".into(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn valid_input_is_saved_and_enqueued_on_default_lane() {
        let f = fixture();
        let mail = f.service.enqueue(input()).await.unwrap();
        assert_eq!(mail.status, MailStatus::OnProgress);

        let stored = f.store.find_mail(mail.id).await.unwrap();
        assert_eq!(stored, mail);

        let records = f.broker.records_of_kind(TaskKind::Mailing).await;
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].envelope.priority(), Priority::Default);
    }

    #[tokio::test]
    async fn invalid_input_touches_nothing() {
        let f = fixture();
        let err = f
            .service
            .enqueue(MailingInput {
                subject: String::new(),
                ..input()
            })
            .await
            .unwrap_err();
        assert!(err.is(ErrorKind::Validation));
        assert_eq!(err.message, "subject is required");
        assert!(f.broker.records_of_kind(TaskKind::Mailing).await.is_empty());
    }

    #[tokio::test]
    async fn broker_failure_is_internal() {
        let f = fixture();
        f.broker.close().await;
        let err = f.service.enqueue(input()).await.unwrap_err();
        assert!(err.is(ErrorKind::Internal));
        assert_eq!(err.message, MSG_FAILED_REGISTER_TASK);
    }
}
