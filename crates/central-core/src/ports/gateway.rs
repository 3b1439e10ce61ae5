//! Outbound ports: chat bot gateway, moderation sink, picture source.

use std::time::Duration;

use async_trait::async_trait;

use crate::domain::{MessageId, SecretMessageNode, UserId};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GatewayError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("remote api rejected the call: {0}")]
    Api(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseMode {
    Html,
}

impl ParseMode {
    pub fn as_str(self) -> &'static str {
        match self {
            ParseMode::Html => "HTML",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlineButton {
    pub text: String,
    pub callback_data: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingMessage {
    pub chat_id: i64,
    pub text: String,
    pub parse_mode: Option<ParseMode>,
    pub reply_to: Option<MessageId>,
    /// Rendered as a single row of inline buttons.
    pub buttons: Vec<InlineButton>,
}

impl OutgoingMessage {
    pub fn text(chat_id: i64, text: impl Into<String>) -> Self {
        Self {
            chat_id,
            text: text.into(),
            parse_mode: None,
            reply_to: None,
            buttons: Vec::new(),
        }
    }

    pub fn html(mut self) -> Self {
        self.parse_mode = Some(ParseMode::Html);
        self
    }

    pub fn reply_to(mut self, message_id: Option<MessageId>) -> Self {
        self.reply_to = message_id;
        self
    }

    pub fn with_buttons(mut self, buttons: Vec<InlineButton>) -> Self {
        self.buttons = buttons;
        self
    }
}

/// A message the gateway confirmed as delivered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentMessage {
    pub message_id: MessageId,
    pub chat_id: i64,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallbackAnswer {
    pub callback_id: String,
    pub text: String,
    pub show_alert: bool,
    pub cache_time: Option<Duration>,
}

#[async_trait]
pub trait BotGateway: Send + Sync {
    async fn send_message(&self, message: &OutgoingMessage) -> Result<SentMessage, GatewayError>;
    async fn answer_callback(&self, answer: &CallbackAnswer) -> Result<(), GatewayError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModerationReport {
    pub node: SecretMessageNode,
    pub reporter: UserId,
}

/// Receives user reports about relayed messages.
#[async_trait]
pub trait ModerationSink: Send + Sync {
    async fn submit(&self, report: &ModerationReport) -> Result<(), GatewayError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PictureFetch {
    /// The remote has no picture for this id.
    Missing,
    Found { content_type: String, bytes: Vec<u8> },
}

#[async_trait]
pub trait ProfilePictureSource: Send + Sync {
    async fn fetch(&self, student_id: &str) -> Result<PictureFetch, GatewayError>;
}
