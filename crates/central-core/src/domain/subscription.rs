use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubscriptionType {
    Meme,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubscriptionChannel {
    Telegram,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subscription {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: SubscriptionType,
    pub channel: SubscriptionChannel,
    /// Channel specific user reference; a chat id for telegram.
    pub user_reference_id: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GagMemeType {
    Image,
    Video,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GagMeme {
    pub id: String,
    pub original_url: String,
    #[serde(rename = "type")]
    pub kind: GagMemeType,
    pub media_url: String,
    pub title: String,
}

impl GagMeme {
    /// HTML caption sent to subscribers.
    pub fn subscription_caption(&self) -> String {
        format!(
            "Meme Subscription\nTitle: <strong>{}</strong>\nOriginal Post: <strong>{}</strong>\n",
            self.title, self.original_url
        )
    }
}
