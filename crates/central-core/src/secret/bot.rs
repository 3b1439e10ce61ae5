//! Bot command layer: turns chat updates into protocol calls and replies.

use std::sync::Arc;

use crate::domain::{CallbackAction, ErrorKind, MessageId, TelegramUser, UsecaseError, UserId};
use crate::error::CentralError;
use crate::ports::{BotGateway, CallbackAnswer, OutgoingMessage};
use crate::queue::TaskClient;
use crate::typed::payloads::RelayedMessage;

use super::protocol::{RelayOutcome, RelayRequest, SecretMessaging};
use super::texts;

/// A chat message received by the bot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncomingMessage {
    pub message_id: MessageId,
    pub chat_id: i64,
    pub from: TelegramUser,
    pub text: String,
    pub reply_to: Option<MessageId>,
}

/// An inline-button press.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncomingCallback {
    pub id: String,
    pub from: TelegramUser,
    pub data: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BotUpdate {
    Message(IncomingMessage),
    Callback(IncomingCallback),
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Command<'a> {
    Start,
    Register,
    Secret(Option<&'a str>),
}

impl<'a> Command<'a> {
    /// `None` for plain text and unknown commands.
    fn parse(text: &'a str) -> Option<Self> {
        let mut words = text.split_whitespace();
        let head = words.next()?.strip_prefix('/')?;
        // "/secret@SomeBot 123" の形も受ける
        let name = head.split_once('@').map_or(head, |(name, _)| name);
        match name {
            "start" => Some(Command::Start),
            "register" => Some(Command::Register),
            "secret" => Some(Command::Secret(words.next())),
            _ => None,
        }
    }
}

pub struct BotCommands {
    gateway: Arc<dyn BotGateway>,
    protocol: Arc<SecretMessaging>,
    tasks: TaskClient,
    start_link: String,
}

impl BotCommands {
    pub fn new(
        gateway: Arc<dyn BotGateway>,
        protocol: Arc<SecretMessaging>,
        tasks: TaskClient,
        start_link: impl Into<String>,
    ) -> Self {
        Self {
            gateway,
            protocol,
            tasks,
            start_link: start_link.into(),
        }
    }

    pub async fn handle_update(&self, update: BotUpdate) -> Result<(), CentralError> {
        match update {
            BotUpdate::Message(message) => self.handle_message(&message).await,
            BotUpdate::Callback(callback) => self.handle_callback(&callback).await,
        }
    }

    pub async fn handle_message(&self, message: &IncomingMessage) -> Result<(), CentralError> {
        match Command::parse(&message.text) {
            Some(Command::Start) => {
                self.reply(message, OutgoingMessage::text(message.chat_id, texts::START_MESSAGE).html())
                    .await
            }
            Some(Command::Register) => self.register(message).await,
            Some(Command::Secret(arg)) => self.initiate(message, arg).await,
            None => self.relay(message).await,
        }
    }

    async fn register(&self, message: &IncomingMessage) -> Result<(), CentralError> {
        match self.protocol.register(&message.from).await {
            Ok(()) => {}
            Err(e) if e.is(ErrorKind::AlreadyExists) => {}
            Err(e) => {
                let text = texts::unable_to_register(&e.message);
                return self
                    .reply(message, OutgoingMessage::text(message.chat_id, text))
                    .await;
            }
        }

        self.reply(
            message,
            OutgoingMessage::text(message.chat_id, texts::REGISTER_SUCCESS),
        )
        .await?;

        let invitation =
            texts::share_invitation(&message.from.first_name, &self.start_link, message.from.id);
        self.send(OutgoingMessage::text(message.chat_id, invitation))
            .await
            .map(|_| ())
    }

    async fn initiate(
        &self,
        message: &IncomingMessage,
        arg: Option<&str>,
    ) -> Result<(), CentralError> {
        let Some(raw) = arg else {
            return self
                .reply(message, OutgoingMessage::text(message.chat_id, texts::MISSING_USER_ID))
                .await;
        };
        let Ok(target_id) = raw.parse::<UserId>() else {
            return self
                .reply(message, OutgoingMessage::text(message.chat_id, texts::INVALID_USER_ID))
                .await;
        };

        let (session, target) = match self.protocol.initiate(message.from.id, target_id).await {
            Ok(opened) => opened,
            Err(e) => {
                let text = initiate_failure_text(&e);
                return self
                    .reply(message, OutgoingMessage::text(message.chat_id, text))
                    .await;
            }
        };

        let confirmation = OutgoingMessage::text(
            message.chat_id,
            texts::session_started(&target.first_name),
        )
        .reply_to(Some(message.message_id));
        let sent = self.send(confirmation).await?;

        // 返信の起点になるので root node は必ず作る
        self.tasks
            .enqueue_root_node(
                session.id,
                RelayedMessage {
                    message_id: sent.message_id,
                    text: sent.text,
                },
            )
            .await
            .inspect_err(|e| {
                tracing::error!(session_id = %session.id, error = %e, "failed to enqueue root node task");
            })?;
        Ok(())
    }

    async fn relay(&self, message: &IncomingMessage) -> Result<(), CentralError> {
        let request = RelayRequest {
            sender_id: message.from.id,
            message_id: message.message_id,
            text: message.text.clone(),
            reply_to: message.reply_to,
        };

        let text = match self.protocol.relay(&request).await {
            Ok(RelayOutcome::Relayed { .. }) => return Ok(()),
            Ok(RelayOutcome::Unrecognized) => texts::UNKNOWN_COMMAND.to_string(),
            Err(e) if e.is(ErrorKind::Internal) => texts::BOT_UNEXPECTED_ERROR.to_string(),
            Err(e) => e.message,
        };
        self.reply(message, OutgoingMessage::text(message.chat_id, text).html())
            .await
    }

    pub async fn handle_callback(&self, callback: &IncomingCallback) -> Result<(), CentralError> {
        let settings = *self.protocol.settings();
        let answer = match CallbackAction::parse(&callback.data) {
            Some(CallbackAction::Report(node_id)) => {
                match self.protocol.report(node_id, callback.from.id).await {
                    Ok(_) => CallbackAnswer {
                        callback_id: callback.id.clone(),
                        text: texts::REPORT_SENT.into(),
                        show_alert: true,
                        cache_time: Some(settings.report_ttl),
                    },
                    Err(_) => alert(callback, texts::REPORT_FAILED),
                }
            }
            Some(CallbackAction::Block(sender_id)) => {
                match self.protocol.block_sender(sender_id, callback.from.id).await {
                    Ok(_) => CallbackAnswer {
                        callback_id: callback.id.clone(),
                        text: texts::BLOCK_SUCCESS.into(),
                        show_alert: true,
                        cache_time: Some(settings.block_ttl),
                    },
                    Err(e) if e.is(ErrorKind::Internal) => {
                        alert(callback, texts::BOT_UNEXPECTED_ERROR)
                    }
                    Err(e) => alert(callback, &e.message),
                }
            }
            None => {
                tracing::warn!(data = %callback.data, "unknown callback data");
                alert(callback, texts::UNKNOWN_COMMAND)
            }
        };

        self.gateway
            .answer_callback(&answer)
            .await
            .map_err(|e| CentralError::Gateway(e.to_string()))
    }

    async fn reply(
        &self,
        to: &IncomingMessage,
        message: OutgoingMessage,
    ) -> Result<(), CentralError> {
        self.send(message.reply_to(Some(to.message_id)))
            .await
            .map(|_| ())
    }

    async fn send(
        &self,
        message: OutgoingMessage,
    ) -> Result<crate::ports::SentMessage, CentralError> {
        self.gateway.send_message(&message).await.map_err(|e| {
            tracing::error!(chat_id = message.chat_id, error = %e, "failed to send bot reply");
            CentralError::Gateway(e.to_string())
        })
    }
}

fn initiate_failure_text(error: &UsecaseError) -> String {
    match error.kind {
        ErrorKind::NotFound => texts::problem(&error.message),
        ErrorKind::Internal => texts::BOT_PROBLEM.to_string(),
        _ => error.message.clone(),
    }
}

fn alert(callback: &IncomingCallback, text: &str) -> CallbackAnswer {
    CallbackAnswer {
        callback_id: callback.id.clone(),
        text: text.to_string(),
        show_alert: true,
        cache_time: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::TaskKind;
    use crate::impls::{InMemoryCache, InMemoryStore, RecordingGateway, RecordingModerationSink};
    use crate::policy::PolicyTable;
    use crate::ports::{SystemClock, UlidGenerator};
    use crate::queue::InMemoryBroker;
    use crate::secret::protocol::{SecretMessagingPorts, SecretMessagingSettings};
    use rstest::rstest;

    struct Fixture {
        gateway: Arc<RecordingGateway>,
        broker: Arc<InMemoryBroker>,
        bot: BotCommands,
    }

    fn fixture() -> Fixture {
        let clock = Arc::new(SystemClock);
        let store = Arc::new(InMemoryStore::new());
        let gateway = Arc::new(RecordingGateway::default());
        let broker = Arc::new(InMemoryBroker::default());
        let tasks = TaskClient::new(broker.clone(), Arc::new(PolicyTable::default()));
        let protocol = Arc::new(SecretMessaging::new(
            SecretMessagingPorts {
                users: store.clone(),
                sessions: store,
                cache: Arc::new(InMemoryCache::new(clock.clone())),
                moderation: Arc::new(RecordingModerationSink::default()),
                ids: Arc::new(UlidGenerator::new(clock.clone())),
                clock,
            },
            tasks.clone(),
            SecretMessagingSettings::default(),
        ));
        let bot = BotCommands::new(gateway.clone(), protocol, tasks, "https://t.me/central_bot");
        Fixture {
            gateway,
            broker,
            bot,
        }
    }

    fn message(from: UserId, id: MessageId, text: &str) -> IncomingMessage {
        IncomingMessage {
            message_id: id,
            chat_id: from,
            from: TelegramUser::new(from, format!("user{from}")),
            text: text.into(),
            reply_to: None,
        }
    }

    #[rstest]
    #[case("/start", Some(Command::Start))]
    #[case("/register", Some(Command::Register))]
    #[case("/secret 42", Some(Command::Secret(Some("42"))))]
    #[case("/secret@central_bot  42", Some(Command::Secret(Some("42"))))]
    #[case("/secret", Some(Command::Secret(None)))]
    #[case("/help", None)]
    #[case("hello", None)]
    fn commands_parse(#[case] text: &str, #[case] expected: Option<Command<'static>>) {
        assert_eq!(Command::parse(text), expected);
    }

    #[tokio::test]
    async fn start_sends_the_welcome_text() {
        let f = fixture();
        f.bot.handle_message(&message(1, 10, "/start")).await.unwrap();
        let sent = f.gateway.messages();
        assert_eq!(sent[0].text, texts::START_MESSAGE);
        assert_eq!(sent[0].reply_to, Some(10));
    }

    #[tokio::test]
    async fn register_replies_with_the_invitation() {
        let f = fixture();
        f.bot.handle_message(&message(1, 10, "/register")).await.unwrap();
        // second /register still succeeds
        f.bot.handle_message(&message(1, 11, "/register")).await.unwrap();

        let sent = f.gateway.messages();
        assert_eq!(sent.len(), 4);
        assert_eq!(sent[0].text, texts::REGISTER_SUCCESS);
        assert_eq!(
            sent[1].text,
            texts::share_invitation("user1", "https://t.me/central_bot", 1)
        );
    }

    #[rstest]
    #[case("/secret", texts::MISSING_USER_ID)]
    #[case("/secret abc", texts::INVALID_USER_ID)]
    #[case("/secret 1", texts::SELF_TARGET)]
    #[tokio::test]
    async fn bad_secret_arguments_get_guidance(#[case] text: &str, #[case] expected: &str) {
        let f = fixture();
        f.bot.handle_message(&message(1, 10, text)).await.unwrap();
        assert_eq!(f.gateway.messages()[0].text, expected);
    }

    #[tokio::test]
    async fn unregistered_target_is_reported_as_a_problem() {
        let f = fixture();
        f.bot.handle_message(&message(1, 10, "/register")).await.unwrap();
        f.bot.handle_message(&message(1, 11, "/secret 2")).await.unwrap();
        let sent = f.gateway.messages();
        assert_eq!(
            sent.last().unwrap().text,
            texts::problem(&texts::target_not_found(2))
        );
    }

    #[tokio::test]
    async fn secret_confirms_and_enqueues_the_root_node() {
        let f = fixture();
        f.bot.handle_message(&message(1, 10, "/register")).await.unwrap();
        f.bot.handle_message(&message(2, 20, "/register")).await.unwrap();
        f.bot.handle_message(&message(1, 11, "/secret 2")).await.unwrap();

        let confirmation = f.gateway.messages().pop().unwrap();
        assert_eq!(confirmation.text, texts::session_started("user2"));
        assert_eq!(confirmation.reply_to, Some(11));
        assert_eq!(
            f.broker
                .records_of_kind(TaskKind::SetRootMessageNode)
                .await
                .len(),
            1
        );
    }

    #[tokio::test]
    async fn plain_text_is_unknown() {
        let f = fixture();
        f.bot.handle_message(&message(1, 10, "hello")).await.unwrap();
        assert_eq!(f.gateway.messages()[0].text, texts::UNKNOWN_COMMAND);
    }

    #[tokio::test]
    async fn block_callback_without_session_says_data_not_found() {
        let f = fixture();
        f.bot
            .handle_callback(&IncomingCallback {
                id: "cb-1".into(),
                from: TelegramUser::new(2, "user2"),
                data: CallbackAction::Block(1).encode(),
            })
            .await
            .unwrap();
        let answers = f.gateway.answers();
        assert_eq!(answers[0].text, texts::BLOCK_DATA_NOT_FOUND);
        assert_eq!(answers[0].callback_id, "cb-1");
    }

    #[tokio::test]
    async fn failed_report_is_apologised_for() {
        let f = fixture();
        f.bot
            .handle_callback(&IncomingCallback {
                id: "cb-2".into(),
                from: TelegramUser::new(2, "user2"),
                data: CallbackAction::Report(77).encode(),
            })
            .await
            .unwrap();
        assert_eq!(f.gateway.answers()[0].text, texts::REPORT_FAILED);
    }
}
