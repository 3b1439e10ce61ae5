//! RecordingGateway - 送信せずに記録するだけの BotGateway
//!
//! message id は 1000 から連番で払い出す。
//! `fail_next` で次の送信を 1 回だけ失敗させられる。

use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};

use async_trait::async_trait;

use crate::ports::{BotGateway, CallbackAnswer, GatewayError, OutgoingMessage, SentMessage};

const FIRST_MESSAGE_ID: i64 = 1000;

pub struct RecordingGateway {
    next_id: AtomicI64,
    fail_next: AtomicBool,
    messages: Mutex<Vec<(SentMessage, OutgoingMessage)>>,
    answers: Mutex<Vec<CallbackAnswer>>,
}

impl Default for RecordingGateway {
    fn default() -> Self {
        Self {
            next_id: AtomicI64::new(FIRST_MESSAGE_ID),
            fail_next: AtomicBool::new(false),
            messages: Mutex::new(Vec::new()),
            answers: Mutex::new(Vec::new()),
        }
    }
}

impl RecordingGateway {
    pub fn fail_next(&self) {
        self.fail_next.store(true, Ordering::SeqCst);
    }

    pub fn messages(&self) -> Vec<OutgoingMessage> {
        self.sent().into_iter().map(|(_, m)| m).collect()
    }

    /// Messages together with the id they were delivered under.
    pub fn sent(&self) -> Vec<(SentMessage, OutgoingMessage)> {
        self.messages
            .lock()
            .map(|m| m.clone())
            .unwrap_or_default()
    }

    pub fn messages_to(&self, chat_id: i64) -> Vec<(SentMessage, OutgoingMessage)> {
        self.sent()
            .into_iter()
            .filter(|(s, _)| s.chat_id == chat_id)
            .collect()
    }

    pub fn answers(&self) -> Vec<CallbackAnswer> {
        self.answers.lock().map(|a| a.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl BotGateway for RecordingGateway {
    async fn send_message(&self, message: &OutgoingMessage) -> Result<SentMessage, GatewayError> {
        if self.fail_next.swap(false, Ordering::SeqCst) {
            return Err(GatewayError::Transport("injected failure".into()));
        }
        let sent = SentMessage {
            message_id: self.next_id.fetch_add(1, Ordering::SeqCst),
            chat_id: message.chat_id,
            text: message.text.clone(),
        };
        self.messages
            .lock()
            .map_err(|_| GatewayError::Transport("poisoned".into()))?
            .push((sent.clone(), message.clone()));
        Ok(sent)
    }

    async fn answer_callback(&self, answer: &CallbackAnswer) -> Result<(), GatewayError> {
        self.answers
            .lock()
            .map_err(|_| GatewayError::Transport("poisoned".into()))?
            .push(answer.clone());
        Ok(())
    }
}
