//! Secret messaging entities.
//!
//! Nodes form an arena keyed by the chat message id. `previous_node_id` is a
//! foreign key into the same arena, so the reply chain is a forest rooted at
//! the bot's confirmation message of each session.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::SessionId;

/// Chat-platform user id.
pub type UserId = i64;

/// Chat-platform message id; doubles as the node id.
pub type MessageId = i64;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TelegramUser {
    pub id: UserId,
    #[serde(default)]
    pub is_bot: bool,
    pub first_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_premium: Option<bool>,
}

impl TelegramUser {
    pub fn new(id: UserId, first_name: impl Into<String>) -> Self {
        Self {
            id,
            is_bot: false,
            first_name: first_name.into(),
            last_name: None,
            username: None,
            language_code: None,
            is_premium: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecretMessagingSession {
    pub id: SessionId,
    pub sender_id: UserId,
    pub target_id: UserId,
    pub created_at: DateTime<Utc>,
    pub expired_at: DateTime<Utc>,
    /// One-way latch: never goes back to `false`.
    pub is_blocked: bool,
}

impl SecretMessagingSession {
    /// Returns `None` when sender and target are the same user.
    pub fn open(
        id: SessionId,
        sender_id: UserId,
        target_id: UserId,
        now: DateTime<Utc>,
        ttl: Duration,
    ) -> Option<Self> {
        if sender_id == target_id {
            return None;
        }
        Some(Self {
            id,
            sender_id,
            target_id,
            created_at: now,
            expired_at: now + ttl,
            is_blocked: false,
        })
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.expired_at
    }

    pub fn is_owned_by(&self, user_id: UserId) -> bool {
        self.sender_id == user_id
    }

    pub fn direction_of(&self, user_id: UserId) -> Option<Direction> {
        if user_id == self.sender_id {
            Some(Direction::ToTarget)
        } else if user_id == self.target_id {
            Some(Direction::ToInitiator)
        } else {
            None
        }
    }
}

/// Which way a relayed message travels inside a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Initiator (anonymous) to target.
    ToTarget,
    /// Target replying back to the initiator.
    ToInitiator,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecretMessageNode {
    pub id: MessageId,
    pub session_id: SessionId,
    pub created_at: DateTime<Utc>,
    pub text: String,
    #[serde(default)]
    pub previous_node_id: Option<MessageId>,
}

pub fn block_cache_key(sender_id: UserId, target_id: UserId) -> String {
    format!("blocked_secret_messaging_session_{sender_id}_{target_id}")
}

pub fn report_cache_key(node_id: MessageId) -> String {
    format!("reported_secret_message_{node_id}")
}

const CALLBACK_SEPARATOR: char = ';';
pub const REPORT_CALLBACK_PREFIX: &str = "report_secret_message";
pub const BLOCK_CALLBACK_PREFIX: &str = "block_secret_messaging_user";

/// Parsed inline-button payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallbackAction {
    Report(MessageId),
    /// Carries the sender id of the session to block.
    Block(UserId),
}

impl CallbackAction {
    pub fn encode(&self) -> String {
        match self {
            CallbackAction::Report(id) => {
                format!("{REPORT_CALLBACK_PREFIX}{CALLBACK_SEPARATOR}{id}")
            }
            CallbackAction::Block(id) => {
                format!("{BLOCK_CALLBACK_PREFIX}{CALLBACK_SEPARATOR}{id}")
            }
        }
    }

    pub fn parse(data: &str) -> Option<Self> {
        let (prefix, raw) = data.split_once(CALLBACK_SEPARATOR)?;
        let id: i64 = raw.parse().ok()?;
        match prefix {
            REPORT_CALLBACK_PREFIX => Some(CallbackAction::Report(id)),
            BLOCK_CALLBACK_PREFIX => Some(CallbackAction::Block(id)),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rstest::rstest;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn self_session_is_refused() {
        assert!(SecretMessagingSession::open(SessionId::generate(), 7, 7, now(), Duration::hours(1)).is_none());
    }

    #[test]
    fn session_expires_after_ttl() {
        let s = SecretMessagingSession::open(SessionId::generate(), 1, 2, now(), Duration::hours(1)).unwrap();
        assert!(!s.is_expired(now() + Duration::minutes(59)));
        assert!(s.is_expired(now() + Duration::minutes(61)));
    }

    #[rstest]
    #[case(1, Some(Direction::ToTarget))]
    #[case(2, Some(Direction::ToInitiator))]
    #[case(3, None)]
    fn direction_depends_on_party(#[case] user: UserId, #[case] expected: Option<Direction>) {
        let s = SecretMessagingSession::open(SessionId::generate(), 1, 2, now(), Duration::hours(1)).unwrap();
        assert_eq!(s.direction_of(user), expected);
    }

    #[test]
    fn block_key_format() {
        assert_eq!(block_cache_key(10, 20), "blocked_secret_messaging_session_10_20");
    }

    #[rstest]
    #[case(CallbackAction::Report(99), "report_secret_message;99")]
    #[case(CallbackAction::Block(42), "block_secret_messaging_user;42")]
    fn callback_data_is_stable(#[case] action: CallbackAction, #[case] wire: &str) {
        assert_eq!(action.encode(), wire);
        assert_eq!(CallbackAction::parse(wire), Some(action));
    }

    #[rstest]
    #[case("report_secret_message")]
    #[case("report_secret_message;abc")]
    #[case("something_else;1")]
    fn malformed_callback_data_is_rejected(#[case] data: &str) {
        assert_eq!(CallbackAction::parse(data), None);
    }
}
