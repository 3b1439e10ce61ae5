//! `task:meme_subscription` - scheduled broadcast to meme subscribers.

use std::sync::Arc;

use async_trait::async_trait;

use crate::domain::{SubscriptionChannel, SubscriptionType};
use crate::error::CentralError;
use crate::ports::{BotGateway, MemeStore, OutgoingMessage, SubscriptionStore};
use crate::typed::payloads::MemeSubscriptionTask;
use crate::typed::{Handler, TaskContext};

pub struct MemeSubscriptionHandler {
    memes: Arc<dyn MemeStore>,
    subscriptions: Arc<dyn SubscriptionStore>,
    gateway: Arc<dyn BotGateway>,
}

impl MemeSubscriptionHandler {
    pub fn new(
        memes: Arc<dyn MemeStore>,
        subscriptions: Arc<dyn SubscriptionStore>,
        gateway: Arc<dyn BotGateway>,
    ) -> Self {
        Self {
            memes,
            subscriptions,
            gateway,
        }
    }
}

#[async_trait]
impl Handler<MemeSubscriptionTask> for MemeSubscriptionHandler {
    async fn handle(&self, _ctx: TaskContext, _task: MemeSubscriptionTask) -> Result<(), CentralError> {
        let meme = self.memes.random_meme().await?;
        let subscribers = self
            .subscriptions
            .find_subscriptions(SubscriptionType::Meme, SubscriptionChannel::Telegram)
            .await?;

        let text = format!("{}{}", meme.subscription_caption(), meme.media_url);
        let mut delivered = 0usize;
        for subscription in &subscribers {
            let Ok(chat_id) = subscription.user_reference_id.parse::<i64>() else {
                tracing::warn!(subscription_id = %subscription.id, reference = %subscription.user_reference_id, "invalid telegram reference");
                continue;
            };
            match self
                .gateway
                .send_message(&OutgoingMessage::text(chat_id, text.clone()).html())
                .await
            {
                Ok(_) => delivered += 1,
                Err(e) => {
                    tracing::warn!(subscription_id = %subscription.id, chat_id, error = %e, "failed to send meme");
                }
            }
        }

        tracing::info!(meme_id = %meme.id, subscribers = subscribers.len(), delivered, "meme subscription broadcast finished");
        Ok(())
    }
}
