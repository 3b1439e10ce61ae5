//! IdGenerator port - ID 生成の抽象化
//!
//! broker は TaskId を、secret messaging は SessionId を、
//! mail use case は MailId をここから払い出す。

use std::sync::Arc;

use crate::domain::ids::{MailId, SessionId, TaskId};
use crate::ports::Clock;
use ulid::Ulid;

/// IdGenerator は分散システムで使える ID を生成
pub trait IdGenerator: Send + Sync {
    fn next_ulid(&self) -> Ulid;

    fn task_id(&self) -> TaskId {
        TaskId::from(self.next_ulid())
    }

    fn session_id(&self) -> SessionId {
        SessionId::from(self.next_ulid())
    }

    fn mail_id(&self) -> MailId {
        MailId::from(self.next_ulid())
    }
}

/// UlidGenerator は ULID ベースの ID 生成器
///
/// timestamp 部分は Clock から取る。FixedClock を渡せば時刻部分が決定的になる。
pub struct UlidGenerator {
    clock: Arc<dyn Clock>,
}

impl UlidGenerator {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self { clock }
    }
}

impl IdGenerator for UlidGenerator {
    fn next_ulid(&self) -> Ulid {
        let timestamp_ms = self.clock.now().timestamp_millis().max(0) as u64;
        Ulid::from_parts(timestamp_ms, rand::random())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::{FixedClock, SystemClock};
    use chrono::{TimeZone, Utc};

    #[test]
    fn ulid_generator_generates_unique_ids() {
        let id_gen = UlidGenerator::new(Arc::new(SystemClock));

        let id1 = id_gen.task_id();
        let id2 = id_gen.task_id();
        assert_ne!(id1, id2);
    }

    #[test]
    fn ulid_generator_with_fixed_clock_shares_timestamp() {
        let fixed_time = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();
        let id_gen = UlidGenerator::new(Arc::new(FixedClock::new(fixed_time)));

        let id1 = id_gen.session_id();
        let id2 = id_gen.session_id();

        // ランダム部分があるので ID は異なるが、timestamp 部分は同じ
        assert_ne!(id1, id2);
        assert_eq!(id1.as_ulid().timestamp_ms(), id2.as_ulid().timestamp_ms());
        assert_eq!(id1.as_ulid().timestamp_ms(), fixed_time.timestamp_millis() as u64);
    }

    #[test]
    fn prefixes_follow_id_type() {
        let id_gen = UlidGenerator::new(Arc::new(SystemClock));
        assert!(id_gen.task_id().to_string().starts_with("task-"));
        assert!(id_gen.session_id().to_string().starts_with("sess-"));
        assert!(id_gen.mail_id().to_string().starts_with("mail-"));
    }
}
