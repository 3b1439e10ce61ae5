//! Payload types, one per task kind.

use serde::{Deserialize, Serialize};

use super::task::Task;
use crate::domain::{Mail, MessageId, SecretMessageNode, SessionId, TaskKind, UserId};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MailingTask {
    pub mail: Mail,
}

impl Task for MailingTask {
    const KIND: TaskKind = TaskKind::Mailing;
}

/// Full record to persist; the handler overwrites whatever is stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MailUpdateTask {
    pub mail: Mail,
}

impl Task for MailUpdateTask {
    const KIND: TaskKind = TaskKind::MailUpdateRecord;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserActivationTask {
    pub user_id: String,
}

impl Task for UserActivationTask {
    const KIND: TaskKind = TaskKind::UserActivation;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProfilePictureScrapingTask {
    pub student_id: String,
}

impl Task for ProfilePictureScrapingTask {
    const KIND: TaskKind = TaskKind::ProfilePictureScraping;
}

/// The chat message a node is created from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelayedMessage {
    pub message_id: MessageId,
    pub text: String,
}

/// Persists the bot's confirmation message as the session's root node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetRootNodeTask {
    pub session_id: SessionId,
    pub message: RelayedMessage,
}

impl Task for SetRootNodeTask {
    const KIND: TaskKind = TaskKind::SetRootMessageNode;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ButtonPayload {
    pub text: String,
    pub callback_data: String,
}

/// Delivers a framed message to one side of a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SendTelegramMessageTask {
    /// Recipient.
    pub user_id: UserId,
    /// Already framed HTML text.
    pub text: String,
    /// Node the delivered message will be chained to.
    pub message_id: MessageId,
    /// Message in the recipient's chat to reply to.
    #[serde(default)]
    pub reply_to_message_id: Option<MessageId>,
    pub session_id: SessionId,
    #[serde(default)]
    pub buttons: Vec<ButtonPayload>,
}

impl Task for SendTelegramMessageTask {
    const KIND: TaskKind = TaskKind::SendTelegramMessage;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CreateSecretMessageNodeTask {
    pub node: SecretMessageNode,
}

impl Task for CreateSecretMessageNodeTask {
    const KIND: TaskKind = TaskKind::CreateSecretMessageNode;
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemeSubscriptionTask {}

impl Task for MemeSubscriptionTask {
    const KIND: TaskKind = TaskKind::MemeSubscription;
}
