//! Store ports - 永続化の抽象化
//!
//! 各 trait は「見つかれば値、なければ `StoreError::NotFound`」を返す。
//! トランザクションは提供しない（レコード単位の操作のみ）。

use async_trait::async_trait;

use crate::domain::{
    GagMeme, Mail, MailId, MessageId, ProfilePicture, SecretMessageNode,
    SecretMessagingSession, SessionId, Subscription, SubscriptionChannel, SubscriptionType,
    TelegramUser, UserId,
};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("record not found")]
    NotFound,

    /// A record with the same key already exists.
    #[error("record already exists")]
    Conflict,

    /// A node points at a parent that was never stored.
    #[error("parent node {0} does not exist")]
    MissingParent(MessageId),

    #[error("store backend failure: {0}")]
    Backend(String),
}

#[async_trait]
pub trait TelegramUserStore: Send + Sync {
    async fn create_user(&self, user: &TelegramUser) -> Result<(), StoreError>;
    async fn find_user(&self, id: UserId) -> Result<TelegramUser, StoreError>;
}

#[async_trait]
pub trait SecretMessagingStore: Send + Sync {
    async fn create_session(&self, session: &SecretMessagingSession) -> Result<(), StoreError>;
    async fn find_session(&self, id: SessionId) -> Result<SecretMessagingSession, StoreError>;

    /// Most recently created session between the two users.
    async fn find_session_by_users(
        &self,
        sender_id: UserId,
        target_id: UserId,
    ) -> Result<SecretMessagingSession, StoreError>;

    async fn block_session(&self, id: SessionId) -> Result<(), StoreError>;

    /// Append-only. `Conflict` when the id exists, `MissingParent` when
    /// `previous_node_id` is not stored yet.
    async fn create_node(&self, node: &SecretMessageNode) -> Result<(), StoreError>;
    async fn find_node(&self, id: MessageId) -> Result<SecretMessageNode, StoreError>;
}

#[async_trait]
pub trait MailStore: Send + Sync {
    async fn create_mail(&self, mail: &Mail) -> Result<(), StoreError>;
    /// Overwrites the whole record.
    async fn update_mail(&self, mail: &Mail) -> Result<(), StoreError>;
    async fn find_mail(&self, id: MailId) -> Result<Mail, StoreError>;
}

#[async_trait]
pub trait AccountStore: Send + Sync {
    async fn activate_user(&self, user_id: &str) -> Result<(), StoreError>;
}

#[async_trait]
pub trait ProfilePictureStore: Send + Sync {
    async fn find_picture(&self, id: &str) -> Result<ProfilePicture, StoreError>;
    async fn save_image(&self, filename: &str, bytes: &[u8]) -> Result<(), StoreError>;
    async fn create_picture(&self, picture: &ProfilePicture) -> Result<(), StoreError>;
}

#[async_trait]
pub trait MemeStore: Send + Sync {
    async fn random_meme(&self) -> Result<GagMeme, StoreError>;
}

#[async_trait]
pub trait SubscriptionStore: Send + Sync {
    async fn find_subscriptions(
        &self,
        kind: SubscriptionType,
        channel: SubscriptionChannel,
    ) -> Result<Vec<Subscription>, StoreError>;
}
