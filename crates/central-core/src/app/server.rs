//! WorkerServer - worker pool / scheduler / health probe をまとめて起動・停止する

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;

use super::health::HealthProbe;
use super::runtime::Runtime;
use super::scheduler::Scheduler;
use super::worker_loop::WorkerGroup;
use crate::config::WorkerConfig;
use crate::queue::Broker;

pub struct WorkerServer {
    broker: Arc<dyn Broker>,
    runtime: Arc<Runtime>,
    concurrency: usize,
    health_interval: Duration,
    scheduler: Option<Scheduler>,
}

impl WorkerServer {
    pub fn new(broker: Arc<dyn Broker>, runtime: Runtime, config: &WorkerConfig) -> Self {
        Self {
            broker,
            runtime: Arc::new(runtime),
            concurrency: config.concurrency,
            health_interval: Duration::from_secs(config.health_check_interval_secs),
            scheduler: None,
        }
    }

    pub fn with_scheduler(mut self, scheduler: Scheduler) -> Self {
        self.scheduler = Some(scheduler);
        self
    }

    pub fn start(self) -> ServerHandle {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let workers = WorkerGroup::spawn(
            self.concurrency,
            Arc::clone(&self.broker),
            Arc::clone(&self.runtime),
        );

        let mut background = Vec::new();
        background.push(
            HealthProbe::new(Arc::clone(&self.broker), self.health_interval)
                .spawn(shutdown_rx.clone()),
        );
        if let Some(scheduler) = self.scheduler {
            background.push(scheduler.spawn(shutdown_rx));
        }

        tracing::info!(
            concurrency = workers.len(),
            health_interval = ?self.health_interval,
            "worker server started"
        );

        ServerHandle {
            broker: self.broker,
            shutdown_tx,
            workers,
            background,
        }
    }
}

pub struct ServerHandle {
    broker: Arc<dyn Broker>,
    shutdown_tx: watch::Sender<bool>,
    workers: WorkerGroup,
    background: Vec<JoinHandle<()>>,
}

impl ServerHandle {
    /// Cooperative stop: no new leases, in-flight tasks finish, then the
    /// broker is closed.
    pub async fn stop(self) {
        tracing::info!("stopping worker server");
        let _ = self.shutdown_tx.send(true);
        self.workers.shutdown_and_join().await;
        for join in self.background {
            if let Err(e) = join.await {
                tracing::error!(error = %e, "background loop panicked");
            }
        }
        self.broker.close().await;
        tracing::info!("worker server stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::AppBuilder;
    use crate::domain::TaskKind;
    use crate::policy::PolicyTable;
    use crate::queue::{InMemoryBroker, TaskClient, TaskState};
    use crate::typed::handler::testing::CountingHandler;
    use crate::typed::payloads::UserActivationTask;

    #[tokio::test]
    async fn in_flight_task_finishes_before_broker_closes() {
        let broker = Arc::new(InMemoryBroker::default());
        let handler = CountingHandler::slow(Duration::from_millis(100));
        let runtime = AppBuilder::new()
            .register::<UserActivationTask, _>(handler.clone())
            .unwrap()
            .build()
            .unwrap();
        let config = WorkerConfig {
            concurrency: 1,
            ..WorkerConfig::default()
        };
        let handle = WorkerServer::new(broker.clone(), runtime, &config).start();

        let client = TaskClient::new(broker.clone(), Arc::new(PolicyTable::default()));
        let id = client.enqueue_user_activation("user-1").await.unwrap();

        // handler が走り出すのを待ってから止める
        tokio::time::sleep(Duration::from_millis(30)).await;
        handle.stop().await;

        assert_eq!(handler.calls(), 1);
        assert_eq!(broker.record(id).await.unwrap().state, TaskState::Succeeded);
        assert!(broker.ping().await.is_err());
        assert!(client.enqueue_user_activation("user-2").await.is_err());
        assert_eq!(broker.records_of_kind(TaskKind::UserActivation).await.len(), 1);
    }
}
