//! CentralService - 単一プロセス用のワイヤリング
//!
//! in-memory の broker / store / cache の上に use case と handler を組み立てる。
//! 外部に出ていくもの（bot gateway, 画像の取得元）は呼び出し側が渡す。

use std::sync::Arc;

use crate::app::{Scheduler, WorkerServer};
use crate::config::AppConfig;
use crate::error::CentralError;
use crate::handlers::{self, HandlerDeps};
use crate::impls::{InMemoryCache, InMemoryStore, LogModerationSink, MailModerationSink};
use crate::mailing::{self, MailFailover, MailService};
use crate::policy::PolicyTable;
use crate::ports::{
    BotGateway, Clock, IdGenerator, ModerationSink, ProfilePictureSource, UlidGenerator,
};
use crate::queue::{InMemoryBroker, TaskClient};
use crate::secret::{BotCommands, SecretMessaging, SecretMessagingPorts, SecretMessagingSettings};

pub struct CentralService {
    config: AppConfig,
    clock: Arc<dyn Clock>,
    gateway: Arc<dyn BotGateway>,
    picture_source: Arc<dyn ProfilePictureSource>,
    failover: Arc<MailFailover>,
    pub broker: Arc<InMemoryBroker>,
    pub tasks: TaskClient,
    pub store: Arc<InMemoryStore>,
    pub protocol: Arc<SecretMessaging>,
    pub mail: Arc<MailService>,
    pub bot: Arc<BotCommands>,
}

impl CentralService {
    /// Mail providers come from `config.mail`.
    pub fn in_memory(
        config: AppConfig,
        gateway: Arc<dyn BotGateway>,
        picture_source: Arc<dyn ProfilePictureSource>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, CentralError> {
        let failover = mailing::failover_from_config(&config.mail)?;
        Self::with_failover(config, gateway, picture_source, clock, failover)
    }

    pub fn with_failover(
        config: AppConfig,
        gateway: Arc<dyn BotGateway>,
        picture_source: Arc<dyn ProfilePictureSource>,
        clock: Arc<dyn Clock>,
        failover: MailFailover,
    ) -> Result<Self, CentralError> {
        let ids: Arc<dyn IdGenerator> = Arc::new(UlidGenerator::new(clock.clone()));
        let broker = Arc::new(InMemoryBroker::new(ids.clone()));
        let policies = Arc::new(PolicyTable::from_config(&config)?);
        let tasks = TaskClient::new(broker.clone(), policies);
        let store = Arc::new(InMemoryStore::new());

        let mail = Arc::new(MailService::new(
            store.clone(),
            tasks.clone(),
            ids.clone(),
            clock.clone(),
        ));

        let moderation_email = &config.secret_messaging.moderation_email;
        let moderation: Arc<dyn ModerationSink> = if moderation_email.is_empty() {
            tracing::info!("no moderation email configured, reports are only logged");
            Arc::new(LogModerationSink)
        } else {
            Arc::new(MailModerationSink::new(mail.clone(), moderation_email.clone()))
        };

        let protocol = Arc::new(SecretMessaging::new(
            SecretMessagingPorts {
                users: store.clone(),
                sessions: store.clone(),
                cache: Arc::new(InMemoryCache::new(clock.clone())),
                moderation,
                ids,
                clock: clock.clone(),
            },
            tasks.clone(),
            SecretMessagingSettings::from(&config.secret_messaging),
        ));

        let bot = Arc::new(BotCommands::new(
            gateway.clone(),
            protocol.clone(),
            tasks.clone(),
            config.secret_messaging.bot_start_link.clone(),
        ));

        Ok(Self {
            config,
            clock,
            gateway,
            picture_source,
            failover: Arc::new(failover),
            broker,
            tasks,
            store,
            protocol,
            mail,
            bot,
        })
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Worker server with every handler and the configured schedules.
    pub fn worker_server(&self) -> Result<WorkerServer, CentralError> {
        let runtime = handlers::build_runtime(HandlerDeps {
            tasks: self.tasks.clone(),
            clock: self.clock.clone(),
            gateway: self.gateway.clone(),
            protocol: self.protocol.clone(),
            failover: self.failover.clone(),
            mails: self.store.clone(),
            users: self.store.clone(),
            accounts: self.store.clone(),
            pictures: self.store.clone(),
            picture_source: self.picture_source.clone(),
            memes: self.store.clone(),
            subscriptions: self.store.clone(),
        })?;

        let mut scheduler = Scheduler::new(self.tasks.clone(), self.clock.clone());
        handlers::register_schedules(&mut scheduler, &self.config.scheduler)?;

        Ok(WorkerServer::new(self.broker.clone(), runtime, &self.config.worker)
            .with_scheduler(scheduler))
    }
}
