//! Telegram Bot API gateway over reqwest.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::config::TelegramConfig;
use crate::domain::{MessageId, TelegramUser};
use crate::error::CentralError;
use crate::ports::{BotGateway, CallbackAnswer, GatewayError, OutgoingMessage, SentMessage};
use crate::secret::{BotUpdate, IncomingCallback, IncomingMessage};

const LONG_POLL_SECS: u64 = 30;

#[derive(Debug, Deserialize)]
struct TelegramApiResponse<T> {
    ok: bool,
    result: Option<T>,
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiUpdate {
    update_id: i64,
    message: Option<ApiMessage>,
    callback_query: Option<ApiCallbackQuery>,
}

#[derive(Debug, Deserialize)]
struct ApiMessage {
    message_id: MessageId,
    from: Option<TelegramUser>,
    chat: ApiChat,
    text: Option<String>,
    reply_to_message: Option<Box<ApiMessage>>,
}

#[derive(Debug, Deserialize)]
struct ApiChat {
    id: i64,
}

#[derive(Debug, Deserialize)]
struct ApiCallbackQuery {
    id: String,
    from: TelegramUser,
    data: Option<String>,
}

#[derive(Debug, Serialize)]
struct ApiButton<'a> {
    text: &'a str,
    callback_data: &'a str,
}

impl ApiUpdate {
    fn into_bot_update(self) -> Option<BotUpdate> {
        if let Some(cb) = self.callback_query {
            return Some(BotUpdate::Callback(IncomingCallback {
                id: cb.id,
                from: cb.from,
                data: cb.data.unwrap_or_default(),
            }));
        }
        let message = self.message?;
        Some(BotUpdate::Message(IncomingMessage {
            message_id: message.message_id,
            chat_id: message.chat.id,
            from: message.from?,
            text: message.text?,
            reply_to: message.reply_to_message.map(|m| m.message_id),
        }))
    }
}

pub struct TelegramGateway {
    client: reqwest::Client,
    base_url: String,
    token: String,
}

impl TelegramGateway {
    pub fn new(config: &TelegramConfig) -> Result<Self, CentralError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(LONG_POLL_SECS + 10))
            .build()
            .map_err(|e| CentralError::Config(format!("failed to build telegram client: {e}")))?;
        Ok(Self {
            client,
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
            token: config.bot_token.clone(),
        })
    }

    fn api_url(&self, method: &str) -> String {
        format!("{}/bot{}/{}", self.base_url, self.token, method)
    }

    async fn call<T: serde::de::DeserializeOwned>(
        &self,
        method: &str,
        body: &serde_json::Value,
    ) -> Result<T, GatewayError> {
        let response = self
            .client
            .post(self.api_url(method))
            .json(body)
            .send()
            .await
            .map_err(|e| GatewayError::Transport(format!("{method} failed: {e}")))?;

        let parsed: TelegramApiResponse<T> = response
            .json()
            .await
            .map_err(|e| GatewayError::Transport(format!("invalid {method} response: {e}")))?;

        if !parsed.ok {
            return Err(GatewayError::Api(parsed.description.unwrap_or_default()));
        }
        parsed
            .result
            .ok_or_else(|| GatewayError::Api(format!("{method} returned no result")))
    }

    /// Long-polls for updates after `offset`. Returns the next offset too.
    pub async fn get_updates(&self, offset: i64) -> Result<(i64, Vec<BotUpdate>), GatewayError> {
        let updates: Vec<ApiUpdate> = self
            .call(
                "getUpdates",
                &json!({
                    "offset": offset,
                    "timeout": LONG_POLL_SECS,
                    "allowed_updates": ["message", "callback_query"],
                }),
            )
            .await?;

        let next = updates
            .iter()
            .map(|u| u.update_id + 1)
            .max()
            .unwrap_or(offset);
        Ok((
            next,
            updates
                .into_iter()
                .filter_map(ApiUpdate::into_bot_update)
                .collect(),
        ))
    }
}

fn send_message_body(message: &OutgoingMessage) -> serde_json::Value {
    let mut body = json!({
        "chat_id": message.chat_id,
        "text": message.text,
    });
    if let Some(mode) = message.parse_mode {
        body["parse_mode"] = json!(mode.as_str());
    }
    if let Some(reply_to) = message.reply_to {
        body["reply_to_message_id"] = json!(reply_to);
        body["allow_sending_without_reply"] = json!(true);
    }
    if !message.buttons.is_empty() {
        let row: Vec<ApiButton<'_>> = message
            .buttons
            .iter()
            .map(|b| ApiButton {
                text: &b.text,
                callback_data: &b.callback_data,
            })
            .collect();
        body["reply_markup"] = json!({ "inline_keyboard": [row] });
    }
    body
}

#[async_trait]
impl BotGateway for TelegramGateway {
    async fn send_message(&self, message: &OutgoingMessage) -> Result<SentMessage, GatewayError> {
        let sent: ApiMessage = self
            .call("sendMessage", &send_message_body(message))
            .await?;
        Ok(SentMessage {
            message_id: sent.message_id,
            chat_id: sent.chat.id,
            text: sent.text.unwrap_or_default(),
        })
    }

    async fn answer_callback(&self, answer: &CallbackAnswer) -> Result<(), GatewayError> {
        let mut body = json!({
            "callback_query_id": answer.callback_id,
            "text": answer.text,
            "show_alert": answer.show_alert,
        });
        if let Some(cache) = answer.cache_time {
            body["cache_time"] = json!(cache.as_secs());
        }
        let _: bool = self.call("answerCallbackQuery", &body).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::InlineButton;

    #[test]
    fn body_carries_reply_and_buttons() {
        let message = OutgoingMessage::text(5, "<b>hi</b>")
            .html()
            .reply_to(Some(9))
            .with_buttons(vec![InlineButton {
                text: "Report".into(),
                callback_data: "report_secret_message;9".into(),
            }]);
        let body = send_message_body(&message);
        assert_eq!(body["parse_mode"], "HTML");
        assert_eq!(body["reply_to_message_id"], 9);
        assert_eq!(
            body["reply_markup"]["inline_keyboard"][0][0]["callback_data"],
            "report_secret_message;9"
        );
    }

    #[test]
    fn plain_body_has_no_optional_fields() {
        let body = send_message_body(&OutgoingMessage::text(5, "hi"));
        assert!(body.get("parse_mode").is_none());
        assert!(body.get("reply_markup").is_none());
    }

    #[test]
    fn updates_convert_to_bot_updates() {
        let raw = serde_json::json!([
            {
                "update_id": 1,
                "message": {
                    "message_id": 10,
                    "from": {"id": 7, "is_bot": false, "first_name": "Ann"},
                    "chat": {"id": 7, "type": "private"},
                    "text": "hello",
                    "reply_to_message": {
                        "message_id": 8,
                        "chat": {"id": 7, "type": "private"}
                    }
                }
            },
            {
                "update_id": 2,
                "callback_query": {
                    "id": "cb",
                    "from": {"id": 7, "is_bot": false, "first_name": "Ann"},
                    "data": "report_secret_message;8"
                }
            }
        ]);
        let updates: Vec<ApiUpdate> = serde_json::from_value(raw).unwrap();
        let converted: Vec<_> = updates
            .into_iter()
            .filter_map(ApiUpdate::into_bot_update)
            .collect();

        match &converted[0] {
            BotUpdate::Message(m) => {
                assert_eq!(m.reply_to, Some(8));
                assert_eq!(m.from.first_name, "Ann");
            }
            other => panic!("unexpected {other:?}"),
        }
        assert!(matches!(&converted[1], BotUpdate::Callback(c) if c.data == "report_secret_message;8"));
    }
}
