//! Broker health probe.
//!
//! 定期的に ping するだけ。失敗はログに残すが、worker は止めない。

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::queue::Broker;

pub struct HealthProbe {
    broker: Arc<dyn Broker>,
    interval: Duration,
}

/// `tokio::time::interval` panics on zero.
const MIN_INTERVAL: Duration = Duration::from_millis(1);

impl HealthProbe {
    pub fn new(broker: Arc<dyn Broker>, interval: Duration) -> Self {
        Self {
            broker,
            interval: interval.max(MIN_INTERVAL),
        }
    }

    /// One probe. Returns whether the broker answered.
    pub async fn check(&self) -> bool {
        match self.broker.ping().await {
            Ok(()) => {
                tracing::trace!("broker health check ok");
                true
            }
            Err(e) => {
                tracing::error!(error = %e, "broker health check failed");
                false
            }
        }
    }

    pub fn spawn(self, mut shutdown_rx: watch::Receiver<bool>) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(self.interval);
            // 最初の tick は即時に返るので読み捨てる
            ticker.tick().await;
            loop {
                tokio::select! {
                    changed = shutdown_rx.changed() => {
                        if changed.is_err() || *shutdown_rx.borrow() {
                            break;
                        }
                    }
                    _ = ticker.tick() => {
                        self.check().await;
                    }
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queue::InMemoryBroker;

    #[tokio::test]
    async fn check_reflects_broker_state() {
        let broker = Arc::new(InMemoryBroker::default());
        let probe = HealthProbe::new(broker.clone(), Duration::from_secs(180));
        assert!(probe.check().await);

        broker.close().await;
        assert!(!probe.check().await);
    }

    #[tokio::test]
    async fn probe_loop_stops_on_shutdown() {
        let broker = Arc::new(InMemoryBroker::default());
        let (tx, rx) = watch::channel(false);
        let join = HealthProbe::new(broker, Duration::from_millis(5)).spawn(rx);

        tokio::time::sleep(Duration::from_millis(20)).await;
        tx.send(true).unwrap();
        tokio::time::timeout(Duration::from_secs(1), join)
            .await
            .expect("probe did not stop")
            .unwrap();
    }

    #[tokio::test]
    async fn zero_interval_health_loop_keeps_running() {
        let broker = Arc::new(InMemoryBroker::default());
        let (tx, rx) = watch::channel(false);
        let join = HealthProbe::new(broker, Duration::ZERO).spawn(rx);

        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(!join.is_finished());
        tx.send(true).unwrap();
        tokio::time::timeout(Duration::from_secs(1), join)
            .await
            .expect("health loop did not stop")
            .unwrap();
    }
}
