//! Observability - ログ初期化とキュー状態のビュー

use serde::{Deserialize, Serialize};
use tracing_subscriber::EnvFilter;

/// Ready tasks waiting in each lane.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LaneCounts {
    pub high: usize,
    pub default: usize,
    pub low: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueCounts {
    pub queued: usize,
    pub running: usize,
    pub succeeded: usize,
    pub retry_scheduled: usize,
    /// Exhausted tasks. Logged when they land here, never alerted.
    pub archived: usize,
    pub lanes: LaneCounts,
}

impl QueueCounts {
    /// Tasks that still have work ahead of them.
    pub fn pending(&self) -> usize {
        self.queued + self.running + self.retry_scheduled
    }
}

/// Installs the global fmt subscriber. `RUST_LOG` wins over `level`.
///
/// 2 回目以降の呼び出し（テストなど）は何もしない。
pub fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pending_excludes_finished_states() {
        let counts = QueueCounts {
            queued: 2,
            running: 1,
            succeeded: 10,
            retry_scheduled: 3,
            archived: 4,
            lanes: LaneCounts::default(),
        };
        assert_eq!(counts.pending(), 6);
    }

    #[test]
    fn init_logging_twice_is_harmless() {
        init_logging("debug");
        init_logging("info");
    }
}
