//! InMemoryStore - 開発用・テスト用の store
//!
//! すべての store trait を 1 つの `Mutex<StoreState>` で実装する。
//! レコード単位の操作しか提供しないのは本番用の store と同じ。

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use rand::seq::SliceRandom;
use tokio::sync::Mutex;

use crate::domain::{
    GagMeme, Mail, MailId, MessageId, ProfilePicture, SecretMessageNode,
    SecretMessagingSession, SessionId, Subscription, SubscriptionChannel, SubscriptionType,
    TelegramUser, UserId,
};
use crate::ports::{
    AccountStore, MailStore, MemeStore, ProfilePictureStore, SecretMessagingStore, StoreError,
    SubscriptionStore, TelegramUserStore,
};

#[derive(Default)]
struct StoreState {
    users: HashMap<UserId, TelegramUser>,
    sessions: BTreeMap<SessionId, SecretMessagingSession>,
    nodes: HashMap<MessageId, SecretMessageNode>,
    mails: HashMap<MailId, Mail>,
    /// account id -> activated
    accounts: HashMap<String, bool>,
    pictures: HashMap<String, ProfilePicture>,
    images: HashMap<String, Vec<u8>>,
    memes: Vec<GagMeme>,
    subscriptions: Vec<Subscription>,
}

#[derive(Default)]
pub struct InMemoryStore {
    state: Mutex<StoreState>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an account that can later be activated.
    pub async fn add_account(&self, id: impl Into<String>) {
        self.state.lock().await.accounts.insert(id.into(), false);
    }

    pub async fn is_activated(&self, id: &str) -> bool {
        self.state
            .lock()
            .await
            .accounts
            .get(id)
            .copied()
            .unwrap_or(false)
    }

    pub async fn add_meme(&self, meme: GagMeme) {
        self.state.lock().await.memes.push(meme);
    }

    pub async fn add_subscription(&self, subscription: Subscription) {
        self.state.lock().await.subscriptions.push(subscription);
    }

    pub async fn session_count(&self) -> usize {
        self.state.lock().await.sessions.len()
    }

    pub async fn nodes_of(&self, session_id: SessionId) -> Vec<SecretMessageNode> {
        let mut nodes: Vec<_> = self
            .state
            .lock()
            .await
            .nodes
            .values()
            .filter(|n| n.session_id == session_id)
            .cloned()
            .collect();
        nodes.sort_by_key(|n| n.id);
        nodes
    }

    pub async fn image(&self, filename: &str) -> Option<Vec<u8>> {
        self.state.lock().await.images.get(filename).cloned()
    }
}

#[async_trait]
impl TelegramUserStore for InMemoryStore {
    async fn create_user(&self, user: &TelegramUser) -> Result<(), StoreError> {
        let mut state = self.state.lock().await;
        if state.users.contains_key(&user.id) {
            return Err(StoreError::Conflict);
        }
        state.users.insert(user.id, user.clone());
        Ok(())
    }

    async fn find_user(&self, id: UserId) -> Result<TelegramUser, StoreError> {
        self.state
            .lock()
            .await
            .users
            .get(&id)
            .cloned()
            .ok_or(StoreError::NotFound)
    }
}

#[async_trait]
impl SecretMessagingStore for InMemoryStore {
    async fn create_session(&self, session: &SecretMessagingSession) -> Result<(), StoreError> {
        let mut state = self.state.lock().await;
        if state.sessions.contains_key(&session.id) {
            return Err(StoreError::Conflict);
        }
        state.sessions.insert(session.id, session.clone());
        Ok(())
    }

    async fn find_session(&self, id: SessionId) -> Result<SecretMessagingSession, StoreError> {
        self.state
            .lock()
            .await
            .sessions
            .get(&id)
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    async fn find_session_by_users(
        &self,
        sender_id: UserId,
        target_id: UserId,
    ) -> Result<SecretMessagingSession, StoreError> {
        // SessionId は ULID なので BTreeMap の末尾ほど新しい
        self.state
            .lock()
            .await
            .sessions
            .values()
            .rev()
            .find(|s| s.sender_id == sender_id && s.target_id == target_id)
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    async fn block_session(&self, id: SessionId) -> Result<(), StoreError> {
        let mut state = self.state.lock().await;
        let session = state.sessions.get_mut(&id).ok_or(StoreError::NotFound)?;
        session.is_blocked = true;
        Ok(())
    }

    async fn create_node(&self, node: &SecretMessageNode) -> Result<(), StoreError> {
        let mut state = self.state.lock().await;
        if state.nodes.contains_key(&node.id) {
            return Err(StoreError::Conflict);
        }
        if let Some(parent) = node.previous_node_id
            && !state.nodes.contains_key(&parent)
        {
            return Err(StoreError::MissingParent(parent));
        }
        state.nodes.insert(node.id, node.clone());
        Ok(())
    }

    async fn find_node(&self, id: MessageId) -> Result<SecretMessageNode, StoreError> {
        self.state
            .lock()
            .await
            .nodes
            .get(&id)
            .cloned()
            .ok_or(StoreError::NotFound)
    }
}

#[async_trait]
impl MailStore for InMemoryStore {
    async fn create_mail(&self, mail: &Mail) -> Result<(), StoreError> {
        let mut state = self.state.lock().await;
        if state.mails.contains_key(&mail.id) {
            return Err(StoreError::Conflict);
        }
        state.mails.insert(mail.id, mail.clone());
        Ok(())
    }

    async fn update_mail(&self, mail: &Mail) -> Result<(), StoreError> {
        let mut state = self.state.lock().await;
        let stored = state.mails.get_mut(&mail.id).ok_or(StoreError::NotFound)?;
        *stored = mail.clone();
        Ok(())
    }

    async fn find_mail(&self, id: MailId) -> Result<Mail, StoreError> {
        self.state
            .lock()
            .await
            .mails
            .get(&id)
            .cloned()
            .ok_or(StoreError::NotFound)
    }
}

#[async_trait]
impl AccountStore for InMemoryStore {
    async fn activate_user(&self, user_id: &str) -> Result<(), StoreError> {
        let mut state = self.state.lock().await;
        let activated = state
            .accounts
            .get_mut(user_id)
            .ok_or(StoreError::NotFound)?;
        *activated = true;
        Ok(())
    }
}

#[async_trait]
impl ProfilePictureStore for InMemoryStore {
    async fn find_picture(&self, id: &str) -> Result<ProfilePicture, StoreError> {
        self.state
            .lock()
            .await
            .pictures
            .get(id)
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    async fn save_image(&self, filename: &str, bytes: &[u8]) -> Result<(), StoreError> {
        self.state
            .lock()
            .await
            .images
            .insert(filename.to_string(), bytes.to_vec());
        Ok(())
    }

    async fn create_picture(&self, picture: &ProfilePicture) -> Result<(), StoreError> {
        let mut state = self.state.lock().await;
        if state.pictures.contains_key(&picture.id) {
            return Err(StoreError::Conflict);
        }
        state.pictures.insert(picture.id.clone(), picture.clone());
        Ok(())
    }
}

#[async_trait]
impl MemeStore for InMemoryStore {
    async fn random_meme(&self) -> Result<GagMeme, StoreError> {
        let state = self.state.lock().await;
        state
            .memes
            .choose(&mut rand::thread_rng())
            .cloned()
            .ok_or(StoreError::NotFound)
    }
}

#[async_trait]
impl SubscriptionStore for InMemoryStore {
    async fn find_subscriptions(
        &self,
        kind: SubscriptionType,
        channel: SubscriptionChannel,
    ) -> Result<Vec<Subscription>, StoreError> {
        Ok(self
            .state
            .lock()
            .await
            .subscriptions
            .iter()
            .filter(|s| s.kind == kind && s.channel == channel)
            .cloned()
            .collect())
    }
}
