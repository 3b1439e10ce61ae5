//! Secret messaging session protocol.
//!
//! セッションの状態は Uninitiated → Active → {Blocked, Expired}。
//! blocked は永続化された latch、expired は `expired_at` から都度計算する。
//! ここでは送信そのものは行わず、配送は task として broker に積むだけ。

use std::sync::Arc;
use std::time::Duration;

use crate::config::{MAX_SESSION_TTL_HOURS, SecretMessagingConfig};
use crate::domain::secret::{block_cache_key, report_cache_key};
use crate::domain::{
    CallbackAction, Direction, MessageId, SecretMessageNode, SecretMessagingSession, SessionId,
    TaskId, TelegramUser, UsecaseError, UserId,
};
use crate::ports::{
    Cache, Clock, IdGenerator, ModerationReport, ModerationSink, SecretMessagingStore,
    StoreError, TelegramUserStore,
};
use crate::queue::TaskClient;
use crate::typed::payloads::{ButtonPayload, RelayedMessage, SendTelegramMessageTask};

use super::texts;

/// Durations the protocol works with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SecretMessagingSettings {
    pub session_ttl: chrono::Duration,
    pub report_ttl: Duration,
    pub block_ttl: Duration,
}

impl Default for SecretMessagingSettings {
    fn default() -> Self {
        Self::from(&SecretMessagingConfig::default())
    }
}

impl From<&SecretMessagingConfig> for SecretMessagingSettings {
    fn from(config: &SecretMessagingConfig) -> Self {
        Self {
            // AppConfig::validate で弾かれる値もここでは範囲内に収める
            session_ttl: chrono::Duration::hours(
                config.session_ttl_hours.clamp(1, MAX_SESSION_TTL_HOURS),
            ),
            report_ttl: Duration::from_secs(config.report_cache_secs),
            block_ttl: Duration::from_secs(config.block_cache_secs),
        }
    }
}

/// Collaborators of [`SecretMessaging`].
#[derive(Clone)]
pub struct SecretMessagingPorts {
    pub users: Arc<dyn TelegramUserStore>,
    pub sessions: Arc<dyn SecretMessagingStore>,
    pub cache: Arc<dyn Cache>,
    pub moderation: Arc<dyn ModerationSink>,
    pub ids: Arc<dyn IdGenerator>,
    pub clock: Arc<dyn Clock>,
}

/// An inbound chat message that may continue a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayRequest {
    pub sender_id: UserId,
    pub message_id: MessageId,
    pub text: String,
    /// The message this one replies to, if any.
    pub reply_to: Option<MessageId>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelayOutcome {
    Relayed {
        session_id: SessionId,
        direction: Direction,
        recipient: UserId,
        task_id: TaskId,
    },
    /// Not a reply to any known node.
    Unrecognized,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportAck {
    Forwarded,
    /// Already reported within the acknowledgement TTL.
    Duplicate,
}

pub struct SecretMessaging {
    ports: SecretMessagingPorts,
    tasks: TaskClient,
    settings: SecretMessagingSettings,
}

impl SecretMessaging {
    pub fn new(
        ports: SecretMessagingPorts,
        tasks: TaskClient,
        settings: SecretMessagingSettings,
    ) -> Self {
        Self {
            ports,
            tasks,
            settings,
        }
    }

    pub fn settings(&self) -> &SecretMessagingSettings {
        &self.settings
    }

    pub async fn register(&self, user: &TelegramUser) -> Result<(), UsecaseError> {
        if user.is_bot {
            return Err(UsecaseError::forbidden(texts::BOT_NOT_ALLOWED));
        }

        match self.ports.users.find_user(user.id).await {
            Ok(_) => return Err(UsecaseError::already_exists(texts::ALREADY_REGISTERED)),
            Err(StoreError::NotFound) => {}
            Err(e) => {
                tracing::error!(user_id = user.id, error = %e, "failed to find telegram user");
                return Err(UsecaseError::database());
            }
        }

        match self.ports.users.create_user(user).await {
            Ok(()) => {
                tracing::info!(user_id = user.id, "telegram user registered");
                Ok(())
            }
            Err(StoreError::Conflict) => {
                Err(UsecaseError::already_exists(texts::ALREADY_REGISTERED))
            }
            Err(e) => {
                tracing::error!(user_id = user.id, error = %e, "failed to create telegram user");
                Err(UsecaseError::database())
            }
        }
    }

    /// Opens a session from `sender_id` to `target_id`.
    ///
    /// Nothing is written unless every check passes.
    pub async fn initiate(
        &self,
        sender_id: UserId,
        target_id: UserId,
    ) -> Result<(SecretMessagingSession, TelegramUser), UsecaseError> {
        if sender_id == target_id {
            return Err(UsecaseError::validation(texts::SELF_TARGET));
        }

        found(
            self.ports.users.find_user(sender_id).await,
            || UsecaseError::not_found(texts::SENDER_NOT_REGISTERED),
            "sender",
        )?;
        let target = found(
            self.ports.users.find_user(target_id).await,
            || UsecaseError::not_found(texts::target_not_found(target_id)),
            "target",
        )?;

        match self
            .ports
            .cache
            .get(&block_cache_key(sender_id, target_id))
            .await
        {
            Ok(None) => {}
            Ok(Some(_)) => {
                tracing::info!(sender_id, target_id, "initiate refused, sender is blocked");
                return Err(UsecaseError::forbidden(texts::INITIATE_BLOCKED));
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to read block cache");
                return Err(UsecaseError::internal());
            }
        }

        let session = SecretMessagingSession::open(
            self.ports.ids.session_id(),
            sender_id,
            target_id,
            self.ports.clock.now(),
            self.settings.session_ttl,
        )
        .ok_or_else(|| UsecaseError::validation(texts::SELF_TARGET))?;

        if let Err(e) = self.ports.sessions.create_session(&session).await {
            tracing::error!(error = %e, "failed to create secret messaging session");
            return Err(UsecaseError::database());
        }

        tracing::info!(session_id = %session.id, sender_id, target_id, "secret messaging session opened");
        Ok((session, target))
    }

    /// Stores the bot's confirmation message as the first node of a session.
    pub async fn record_root_node(
        &self,
        session_id: SessionId,
        message: &RelayedMessage,
    ) -> Result<(), UsecaseError> {
        let session = found(
            self.ports.sessions.find_session(session_id).await,
            || UsecaseError::not_found(texts::SESSION_NOT_FOUND),
            "session",
        )?;

        self.create_message_node(&SecretMessageNode {
            id: message.message_id,
            session_id: session.id,
            created_at: self.ports.clock.now(),
            text: message.text.clone(),
            previous_node_id: None,
        })
        .await
    }

    /// Continues a session with a reply to one of its nodes.
    pub async fn relay(&self, request: &RelayRequest) -> Result<RelayOutcome, UsecaseError> {
        let Some(reply_to) = request.reply_to else {
            return Ok(RelayOutcome::Unrecognized);
        };

        let parent = match self.ports.sessions.find_node(reply_to).await {
            Ok(node) => node,
            Err(StoreError::NotFound) => return Ok(RelayOutcome::Unrecognized),
            Err(e) => {
                tracing::error!(node_id = reply_to, error = %e, "failed to find message node");
                return Err(UsecaseError::database());
            }
        };

        let session = found(
            self.ports.sessions.find_session(parent.session_id).await,
            || UsecaseError::not_found(texts::SESSION_NOT_FOUND),
            "session",
        )?;

        if session.is_blocked {
            return Err(UsecaseError::forbidden(texts::SESSION_BLOCKED));
        }

        let direction = session
            .direction_of(request.sender_id)
            .ok_or_else(|| UsecaseError::forbidden(texts::NOT_A_PARTY))?;

        // 期限と target の登録確認は initiator → target 方向だけ
        let (recipient, text, buttons) = match direction {
            Direction::ToTarget => {
                if session.is_expired(self.ports.clock.now()) {
                    return Err(UsecaseError::forbidden(texts::SESSION_EXPIRED));
                }
                found(
                    self.ports.users.find_user(session.target_id).await,
                    || UsecaseError::not_found(texts::TARGET_NOT_REGISTERED),
                    "target",
                )?;
                let buttons = vec![
                    ButtonPayload {
                        text: texts::REPORT_BUTTON.into(),
                        callback_data: CallbackAction::Report(request.message_id).encode(),
                    },
                    ButtonPayload {
                        text: texts::BLOCK_BUTTON.into(),
                        callback_data: CallbackAction::Block(session.sender_id).encode(),
                    },
                ];
                (
                    session.target_id,
                    texts::secret_message(&request.text),
                    buttons,
                )
            }
            Direction::ToInitiator => {
                let replier = found(
                    self.ports.users.find_user(session.target_id).await,
                    || UsecaseError::not_found(texts::SESSION_NOT_FOUND),
                    "replier",
                )?;
                (
                    session.sender_id,
                    texts::replied_secret_message(&request.text, &replier.first_name),
                    Vec::new(),
                )
            }
        };

        self.create_message_node(&SecretMessageNode {
            id: request.message_id,
            session_id: session.id,
            created_at: self.ports.clock.now(),
            text: request.text.clone(),
            previous_node_id: Some(parent.id),
        })
        .await?;

        let task = SendTelegramMessageTask {
            user_id: recipient,
            text,
            message_id: request.message_id,
            reply_to_message_id: parent.previous_node_id,
            session_id: session.id,
            buttons,
        };
        let task_id = self
            .tasks
            .enqueue_send_telegram_message(&task)
            .await
            .map_err(|e| {
                tracing::error!(session_id = %session.id, error = %e, "failed to enqueue secret message delivery");
                UsecaseError::internal()
            })?;

        tracing::info!(session_id = %session.id, ?direction, %task_id, "secret message relayed");
        Ok(RelayOutcome::Relayed {
            session_id: session.id,
            direction,
            recipient,
            task_id,
        })
    }

    /// Blocks a session. Only its target may do so; blocking twice is a no-op.
    pub async fn block(
        &self,
        session_id: SessionId,
        requested_by: UserId,
    ) -> Result<SecretMessagingSession, UsecaseError> {
        let mut session = found(
            self.ports.sessions.find_session(session_id).await,
            || UsecaseError::not_found(texts::BLOCK_DATA_NOT_FOUND),
            "session",
        )?;

        if session.target_id != requested_by {
            return Err(UsecaseError::forbidden(texts::BLOCK_NOT_TARGET));
        }

        if !session.is_blocked {
            if let Err(e) = self.ports.sessions.block_session(session.id).await {
                tracing::error!(session_id = %session.id, error = %e, "failed to block session");
                return Err(UsecaseError::database());
            }
            session.is_blocked = true;
        }

        let key = block_cache_key(session.sender_id, session.target_id);
        if let Err(e) = self
            .ports
            .cache
            .set(&key, "1", self.settings.block_ttl)
            .await
        {
            tracing::error!(session_id = %session.id, error = %e, "failed to write block cache");
            return Err(UsecaseError::internal());
        }

        tracing::info!(session_id = %session.id, "secret messaging session blocked");
        Ok(session)
    }

    /// Blocks the latest session `sender_id` opened towards `requested_by`.
    pub async fn block_sender(
        &self,
        sender_id: UserId,
        requested_by: UserId,
    ) -> Result<SecretMessagingSession, UsecaseError> {
        let session = self.find_session_by_users(sender_id, requested_by).await?;
        self.block(session.id, requested_by).await
    }

    pub async fn find_session_by_users(
        &self,
        sender_id: UserId,
        target_id: UserId,
    ) -> Result<SecretMessagingSession, UsecaseError> {
        found(
            self.ports
                .sessions
                .find_session_by_users(sender_id, target_id)
                .await,
            || UsecaseError::not_found(texts::BLOCK_DATA_NOT_FOUND),
            "session",
        )
    }

    pub async fn report(
        &self,
        node_id: MessageId,
        reporter: UserId,
    ) -> Result<ReportAck, UsecaseError> {
        let key = report_cache_key(node_id);
        match self.ports.cache.get(&key).await {
            Ok(Some(_)) => {
                tracing::debug!(node_id, "message already reported");
                return Ok(ReportAck::Duplicate);
            }
            Ok(None) => {}
            Err(e) => {
                tracing::error!(error = %e, "failed to read report cache");
                return Err(UsecaseError::internal());
            }
        }

        let node = found(
            self.ports.sessions.find_node(node_id).await,
            || UsecaseError::not_found(crate::domain::errors::MSG_NOT_FOUND),
            "message node",
        )?;

        let report = ModerationReport { node, reporter };
        if let Err(e) = self.ports.moderation.submit(&report).await {
            tracing::error!(node_id, error = %e, "failed to submit report");
            return Err(UsecaseError::internal());
        }

        // 通知は済んでいるので cache の失敗は成功扱い
        if let Err(e) = self
            .ports
            .cache
            .set(&key, "1", self.settings.report_ttl)
            .await
        {
            tracing::warn!(node_id, error = %e, "failed to record report");
        }

        tracing::info!(node_id, reporter, "secret message reported");
        Ok(ReportAck::Forwarded)
    }

    /// Appends a node. Re-creating the same node counts as already done;
    /// an id already taken by a different node is an error.
    pub async fn create_message_node(&self, node: &SecretMessageNode) -> Result<(), UsecaseError> {
        match self.ports.sessions.create_node(node).await {
            Ok(()) => Ok(()),
            Err(StoreError::Conflict) => {
                let existing = found(
                    self.ports.sessions.find_node(node.id).await,
                    UsecaseError::database,
                    "conflicting message node",
                )?;
                // message id はチャットごとにしか一意でない
                if existing.session_id == node.session_id
                    && existing.previous_node_id == node.previous_node_id
                {
                    tracing::debug!(node_id = node.id, "message node already exists");
                    return Ok(());
                }
                tracing::error!(
                    node_id = node.id,
                    session_id = %node.session_id,
                    existing_session_id = %existing.session_id,
                    "message node id collides with another node"
                );
                Err(UsecaseError::database())
            }
            Err(e) => {
                tracing::error!(node_id = node.id, session_id = %node.session_id, error = %e, "failed to create message node");
                Err(UsecaseError::database())
            }
        }
    }
}

/// `NotFound` becomes the caller's error, anything else a database error.
fn found<T>(
    result: Result<T, StoreError>,
    not_found: impl FnOnce() -> UsecaseError,
    what: &str,
) -> Result<T, UsecaseError> {
    match result {
        Ok(value) => Ok(value),
        Err(StoreError::NotFound) => Err(not_found()),
        Err(e) => {
            tracing::error!(error = %e, "failed to find {}", what);
            Err(UsecaseError::database())
        }
    }
}
