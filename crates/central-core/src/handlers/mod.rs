//! Handlers - one handler per task kind, wired into a [`Runtime`].

pub mod account;
pub mod mailing;
pub mod meme;
pub mod secret;

pub use self::account::{ProfilePictureHandler, UserActivationHandler};
pub use self::mailing::{MailUpdateHandler, MailingHandler};
pub use self::meme::MemeSubscriptionHandler;
pub use self::secret::{CreateMessageNodeHandler, SendTelegramMessageHandler, SetRootNodeHandler};

use std::sync::Arc;

use crate::app::{AppBuilder, Runtime, Scheduler};
use crate::config::SchedulerConfig;
use crate::domain::TaskKind;
use crate::error::CentralError;
use crate::mailing::MailFailover;
use crate::ports::{
    AccountStore, BotGateway, Clock, MailStore, MemeStore, ProfilePictureSource,
    ProfilePictureStore, SubscriptionStore, TelegramUserStore,
};
use crate::queue::TaskClient;
use crate::secret::SecretMessaging;
use crate::typed::payloads::{
    CreateSecretMessageNodeTask, MailUpdateTask, MailingTask, MemeSubscriptionTask,
    ProfilePictureScrapingTask, SendTelegramMessageTask, SetRootNodeTask, UserActivationTask,
};

/// Everything the handlers need.
#[derive(Clone)]
pub struct HandlerDeps {
    pub tasks: TaskClient,
    pub clock: Arc<dyn Clock>,
    pub gateway: Arc<dyn BotGateway>,
    pub protocol: Arc<SecretMessaging>,
    pub failover: Arc<MailFailover>,
    pub mails: Arc<dyn MailStore>,
    pub users: Arc<dyn TelegramUserStore>,
    pub accounts: Arc<dyn AccountStore>,
    pub pictures: Arc<dyn ProfilePictureStore>,
    pub picture_source: Arc<dyn ProfilePictureSource>,
    pub memes: Arc<dyn MemeStore>,
    pub subscriptions: Arc<dyn SubscriptionStore>,
}

/// Registers a handler for every task kind. Fails if one is missing.
pub fn build_runtime(deps: HandlerDeps) -> Result<Runtime, CentralError> {
    let runtime = AppBuilder::new()
        .register::<MailingTask, _>(MailingHandler::new(
            deps.failover,
            deps.tasks.clone(),
            deps.clock.clone(),
        ))?
        .register::<MailUpdateTask, _>(MailUpdateHandler::new(deps.mails))?
        .register::<UserActivationTask, _>(UserActivationHandler::new(deps.accounts))?
        .register::<ProfilePictureScrapingTask, _>(ProfilePictureHandler::new(
            deps.pictures,
            deps.picture_source,
            deps.clock.clone(),
        ))?
        .register::<SetRootNodeTask, _>(SetRootNodeHandler::new(deps.protocol.clone()))?
        .register::<SendTelegramMessageTask, _>(SendTelegramMessageHandler::new(
            deps.users,
            deps.gateway.clone(),
            deps.tasks,
            deps.clock,
        ))?
        .register::<CreateSecretMessageNodeTask, _>(CreateMessageNodeHandler::new(deps.protocol))?
        .register::<MemeSubscriptionTask, _>(MemeSubscriptionHandler::new(
            deps.memes,
            deps.subscriptions,
            deps.gateway,
        ))?
        .expect_tasks(&TaskKind::ALL)
        .build()?;
    Ok(runtime)
}

/// Registers the recurring tasks.
pub fn register_schedules(
    scheduler: &mut Scheduler,
    config: &SchedulerConfig,
) -> Result<(), CentralError> {
    if config.meme_subscription_enabled {
        scheduler.register(&config.meme_subscription_cron, None, MemeSubscriptionTask::default)?;
    } else {
        tracing::info!("meme subscription schedule disabled");
    }
    Ok(())
}
