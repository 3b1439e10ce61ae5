//! Retry policy: decides backoff delays.

use std::time::Duration;

/// Backoff rule applied between attempts of a failed task.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RetryPolicy {
    /// delay = step * attempts
    Linear { step: Duration },

    /// delay = base_delay * multiplier^(attempts - 1)
    Exponential { base_delay: Duration, multiplier: f64 },
}

impl RetryPolicy {
    /// 1 分刻みの線形 backoff（n 回目の失敗のあと n 分待つ）
    pub fn linear_minutes() -> Self {
        RetryPolicy::Linear {
            step: Duration::from_secs(60),
        }
    }

    /// Delay before the next attempt.
    ///
    /// `attempts` is the number of attempts already made (1-indexed), so the
    /// delay after the first failure is `next_delay(1)`.
    ///
    /// Example with `Linear { step: 60s }`:
    /// - attempt 1 failed: 1m
    /// - attempt 2 failed: 2m
    /// - attempt 3 failed: 3m
    pub fn next_delay(&self, attempts: u32) -> Duration {
        let n = attempts.max(1);
        match *self {
            RetryPolicy::Linear { step } => step.saturating_mul(n),
            RetryPolicy::Exponential {
                base_delay,
                multiplier,
            } => {
                let secs = base_delay.as_secs_f64() * multiplier.powi((n - 1) as i32);
                Duration::try_from_secs_f64(secs).unwrap_or(Duration::MAX)
            }
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::linear_minutes()
    }
}
