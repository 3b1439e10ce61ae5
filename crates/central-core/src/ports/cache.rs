//! Cache port - TTL 付きの key/value
//!
//! 値は読まれない前提のフラグ用途（block / report の記録）が中心。

use std::time::Duration;

use async_trait::async_trait;

use super::StoreError;

#[async_trait]
pub trait Cache: Send + Sync {
    /// `None` when the key is absent or expired.
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;
    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), StoreError>;
}
